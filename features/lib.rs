/*!
This crate implements quarry's feature engineering. A [`Recipe`](struct.Recipe.html) is an ordered list of preprocessing steps. Fitting a recipe on a training [`Dataset`](../quarry_dataframe/struct.Dataset.html) produces a [`FittedRecipe`](struct.FittedRecipe.html), whose parameters are frozen and which transforms any compatible dataframe into [`Features`](struct.Features.html).

A fitted recipe cannot be refit. The only way to obtain one is `Recipe::fit`, which only accepts a `Dataset`, so the parameters of every step are always computed from the training data the recipe was fit on.
*/

#![allow(clippy::tabs_in_doc_comments)]

use ndarray::prelude::*;
use quarry_dataframe::{DataFrame, Dataset};
use quarry_util::error::{Error, Result};

mod correlation;
mod near_zero_variance;
mod normalized;
mod one_hot_encoded;
mod selector;

pub use self::correlation::CorrelationFilter;
pub use self::near_zero_variance::NearZeroVarianceFilter;
pub use self::normalized::NormalizedColumn;
pub use self::one_hot_encoded::OneHotEncodedColumn;
pub use self::selector::Selector;

/// The default maximum fraction of rows a column's most frequent value may take up before the near zero variance step removes the column.
pub const DEFAULT_MAX_MOST_FREQUENT_FRACTION: f32 = 0.95;
/// The default correlation magnitude above which the correlation step removes one column of a pair.
pub const DEFAULT_CORRELATION_THRESHOLD: f32 = 0.9;

/// A `Step` describes a single preprocessing transformation before it is fit.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
	/// Remove columns where a single value takes up more than `max_most_frequent_fraction` of the rows.
	NearZeroVariance { max_most_frequent_fraction: f32 },
	/// Transform number columns to zero mean and unit variance.
	Normalize,
	/// Replace enum columns with one indicator column per option seen in training.
	OneHotEncode,
	/// Remove one column from each pair of number columns whose correlation magnitude exceeds `threshold`.
	CorrelationFilter { threshold: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
	pub step: Step,
	pub selector: Selector,
}

/// A `Recipe` is the unfit description of a preprocessing pipeline. Steps are fit and applied in the order they were added, so each step sees the output of the steps before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
	steps: Vec<StepDefinition>,
}

/// A `FittedStep` holds the parameters a step learned from the training data.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FittedStep {
	NearZeroVariance(NearZeroVarianceFilter),
	Normalize { columns: Vec<NormalizedColumn> },
	OneHotEncode { columns: Vec<OneHotEncodedColumn> },
	CorrelationFilter(CorrelationFilter),
}

/// A `FittedRecipe` is a recipe whose step parameters have been computed from a training dataset. It is immutable.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FittedRecipe {
	steps: Vec<FittedStep>,
	/// The names of the columns the fitted steps produced from the training data, in order. Applying the recipe always produces exactly these features.
	feature_names: Vec<String>,
}

/// `Features` is the output of applying a fitted recipe: a dense matrix with one row per example and one named column per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
	column_names: Vec<String>,
	values: Array2<f32>,
}

impl Recipe {
	/// Create a recipe with no steps.
	pub fn new() -> Recipe {
		Recipe { steps: Vec::new() }
	}

	/// Add a step that applies to the columns chosen by `selector`.
	pub fn step(mut self, step: Step, selector: Selector) -> Recipe {
		self.steps.push(StepDefinition { step, selector });
		self
	}

	/// The standard recipe removes near zero variance predictors, normalizes number predictors, one hot encodes enum predictors, and then removes highly correlated number predictors. [`Recipe::default`] is this recipe with the default thresholds.
	pub fn with_thresholds(max_most_frequent_fraction: f32, correlation_threshold: f32) -> Recipe {
		Recipe::new()
			.step(
				Step::NearZeroVariance {
					max_most_frequent_fraction,
				},
				Selector::AllPredictors,
			)
			.step(Step::Normalize, Selector::NumericPredictors)
			.step(Step::OneHotEncode, Selector::CategoricalPredictors)
			.step(
				Step::CorrelationFilter {
					threshold: correlation_threshold,
				},
				Selector::NumericPredictors,
			)
	}

	pub fn steps(&self) -> &[StepDefinition] {
		&self.steps
	}

	/// Fit every step on the predictors of `dataset`, in order. Each step is fit on the output of the previously fitted steps.
	pub fn fit(&self, dataset: &Dataset) -> Result<FittedRecipe> {
		let mut dataframe = dataset.predictors().clone();
		let mut steps = Vec::with_capacity(self.steps.len());
		for StepDefinition { step, selector } in self.steps.iter() {
			let column_indexes = selector.select(&dataframe);
			let fitted_step = match step {
				Step::NearZeroVariance {
					max_most_frequent_fraction,
				} => FittedStep::NearZeroVariance(NearZeroVarianceFilter::fit(
					&dataframe,
					&column_indexes,
					*max_most_frequent_fraction,
				)),
				Step::Normalize => FittedStep::Normalize {
					columns: normalized::fit(&dataframe, &column_indexes)?,
				},
				Step::OneHotEncode => FittedStep::OneHotEncode {
					columns: one_hot_encoded::fit(&dataframe, &column_indexes),
				},
				Step::CorrelationFilter { threshold } => FittedStep::CorrelationFilter(
					CorrelationFilter::fit(&dataframe, &column_indexes, *threshold),
				),
			};
			dataframe = fitted_step.apply(dataframe);
			steps.push(fitted_step);
		}
		log::debug!(
			"fit a recipe with {} steps producing {} features",
			steps.len(),
			dataframe.ncols()
		);
		let feature_names = dataframe
			.columns
			.iter()
			.map(|column| column.name().to_owned())
			.collect();
		Ok(FittedRecipe {
			steps,
			feature_names,
		})
	}
}

impl Default for Recipe {
	fn default() -> Recipe {
		Recipe::with_thresholds(
			DEFAULT_MAX_MOST_FREQUENT_FRACTION,
			DEFAULT_CORRELATION_THRESHOLD,
		)
	}
}

impl FittedStep {
	fn apply(&self, mut dataframe: DataFrame) -> DataFrame {
		match self {
			FittedStep::NearZeroVariance(step) => step.apply(dataframe),
			FittedStep::Normalize { columns } => {
				for column in columns.iter() {
					column.apply(&mut dataframe);
				}
				dataframe
			}
			FittedStep::OneHotEncode { columns } => {
				for column in columns.iter() {
					column.apply(&mut dataframe);
				}
				dataframe
			}
			FittedStep::CorrelationFilter(step) => step.apply(dataframe),
		}
	}
}

impl FittedRecipe {
	pub fn steps(&self) -> &[FittedStep] {
		&self.steps
	}

	/// The names of the features `apply` produces, in order.
	pub fn feature_names(&self) -> &[String] {
		&self.feature_names
	}

	/**
	Transform the predictors of `dataframe` with the frozen parameters of each step. If `dataframe` contains the target column it must be removed first, which is what [`apply_dataset`](#method.apply_dataset) does.

	The features are matched to the training features by name, so the order of the columns in `dataframe` does not matter and extra columns are ignored. If a column needed to produce one of the training features is missing, this returns `Error::UnknownColumn`.
	*/
	pub fn apply(&self, dataframe: &DataFrame) -> Result<Features> {
		self.apply_rows(dataframe, dataframe.nrows())
	}

	/// Transform the predictors of `dataset`. This produces one row per row of `dataset` even if no predictor columns remain.
	pub fn apply_dataset(&self, dataset: &Dataset) -> Result<Features> {
		self.apply_rows(dataset.predictors(), dataset.nrows())
	}

	fn apply_rows(&self, dataframe: &DataFrame, n_rows: usize) -> Result<Features> {
		let dataframe = self
			.steps
			.iter()
			.fold(dataframe.clone(), |dataframe, step| step.apply(dataframe));
		let mut values = Array2::zeros((n_rows, self.feature_names.len()));
		for (mut feature, feature_name) in values
			.axis_iter_mut(Axis(1))
			.zip(self.feature_names.iter())
		{
			let column = dataframe
				.column(feature_name)
				.ok_or_else(|| Error::UnknownColumn(feature_name.clone()))?;
			if column.len() != n_rows {
				return Err(Error::ColumnLength {
					column: feature_name.clone(),
					n_rows: column.len(),
					expected: n_rows,
				});
			}
			for (value, column_value) in feature.iter_mut().zip(column.view().to_f32_vec()) {
				*value = column_value;
			}
		}
		Ok(Features {
			column_names: self.feature_names.clone(),
			values,
		})
	}

	/// Return the names of the columns removed by the filter steps, in the order they were removed.
	pub fn removed_columns(&self) -> Vec<&str> {
		self.steps
			.iter()
			.flat_map(|step| -> Box<dyn Iterator<Item = &str>> {
				match step {
					FittedStep::NearZeroVariance(step) => {
						Box::new(step.removed.iter().map(|name| name.as_str()))
					}
					FittedStep::CorrelationFilter(step) => {
						Box::new(step.removed.iter().map(|name| name.as_str()))
					}
					_ => Box::new(std::iter::empty()),
				}
			})
			.collect()
	}
}

impl Features {
	pub fn column_names(&self) -> &[String] {
		&self.column_names
	}

	pub fn values(&self) -> ArrayView2<f32> {
		self.values.view()
	}

	pub fn nrows(&self) -> usize {
		self.values.nrows()
	}

	pub fn ncols(&self) -> usize {
		self.values.ncols()
	}

	pub fn column(&self, name: &str) -> Option<ArrayView1<f32>> {
		let index = self.column_names.iter().position(|n| n == name)?;
		Some(self.values.column(index))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use quarry_dataframe::{Column, EnumColumn, NumberColumn};
	use quarry_metrics::MeanVariance;

	fn training_dataset() -> Dataset {
		let n = 40;
		let x: Vec<f32> = (0..n).map(|i| i as f32).collect();
		let z: Vec<f32> = (0..n).map(|i| ((i * 7) % 11) as f32).collect();
		// `y` is highly correlated with `x` and also correlated with `z`, so it is the one the correlation filter removes.
		let y: Vec<f32> = (0..n).map(|i| 2.0 * i as f32 + 2.0 * z[i]).collect();
		let constant: Vec<f32> = vec![1.0; n];
		let color: Vec<Option<&str>> = (0..n)
			.map(|i| match i % 3 {
				0 => Some("red"),
				1 => Some("green"),
				_ => Some("blue"),
			})
			.collect();
		let target: Vec<f32> = (0..n).map(|i| i as f32 * 3.0).collect();
		let dataframe = DataFrame::from_columns(vec![
			Column::Number(NumberColumn::new("x".to_owned(), x)),
			Column::Number(NumberColumn::new("y".to_owned(), y)),
			Column::Number(NumberColumn::new("z".to_owned(), z)),
			Column::Number(NumberColumn::new("constant".to_owned(), constant)),
			Column::Enum(EnumColumn::from_strings("color".to_owned(), &color)),
			Column::Number(NumberColumn::new("target".to_owned(), target)),
		])
		.unwrap();
		Dataset::new(dataframe, "target").unwrap()
	}

	#[test]
	fn test_with_thresholds() {
		assert_eq!(
			Recipe::default(),
			Recipe::with_thresholds(
				DEFAULT_MAX_MOST_FREQUENT_FRACTION,
				DEFAULT_CORRELATION_THRESHOLD
			)
		);
		let recipe = Recipe::with_thresholds(0.8, 0.5);
		assert_eq!(recipe.steps().len(), 4);
		assert_eq!(
			recipe.steps()[0].step,
			Step::NearZeroVariance {
				max_most_frequent_fraction: 0.8
			}
		);
		assert_eq!(
			recipe.steps()[3].step,
			Step::CorrelationFilter { threshold: 0.5 }
		);
	}

	#[test]
	fn test_default_recipe() {
		let dataset = training_dataset();
		let recipe = Recipe::default().fit(&dataset).unwrap();
		assert_eq!(recipe.removed_columns(), vec!["constant", "y"]);
		let features = recipe.apply_dataset(&dataset).unwrap();
		assert_eq!(
			features.column_names(),
			&["x", "z", "color_blue", "color_green", "color_red"]
		);
		assert_eq!(features.nrows(), 40);
		assert!(features.column("target").is_none());
	}

	#[test]
	fn test_normalized_training_columns_have_zero_mean_and_unit_variance() {
		let dataset = training_dataset();
		let recipe = Recipe::default().fit(&dataset).unwrap();
		let features = recipe.apply_dataset(&dataset).unwrap();
		for name in &["x", "z"] {
			let column = features.column(name).unwrap().to_vec();
			let mean_variance = MeanVariance::compute(&column);
			assert!(mean_variance.mean.abs() < 1e-5);
			assert!((mean_variance.variance - 1.0).abs() < 1e-4);
		}
	}

	#[test]
	fn test_apply_does_not_change_parameters() {
		let dataset = training_dataset();
		let recipe = Recipe::default().fit(&dataset).unwrap();
		let frozen = recipe.clone();
		let test = dataset.take_rows(&[3, 1, 4, 1, 5]);
		let first = recipe.apply_dataset(&test).unwrap();
		// Applying to very different data must neither refit nor change the output for the original rows.
		let mut shifted = test.predictors().clone();
		if let Column::Number(column) = &mut shifted.columns[0] {
			for value in column.data.iter_mut() {
				*value += 1000.0;
			}
		}
		let _ = recipe.apply(&shifted).unwrap();
		let second = recipe.apply_dataset(&test).unwrap();
		assert_eq!(first, second);
		assert_eq!(recipe, frozen);
	}

	#[test]
	fn test_zero_variance_is_an_error_without_the_filter() {
		let dataset = training_dataset();
		let recipe = Recipe::new().step(Step::Normalize, Selector::NumericPredictors);
		let result = recipe.fit(&dataset);
		assert!(matches!(
			result,
			Err(quarry_util::error::Error::ZeroVariance(ref name)) if name == "constant"
		));
	}

	#[test]
	fn test_unknown_selected_columns_are_skipped() {
		let dataset = training_dataset();
		let recipe = Recipe::new()
			.step(
				Step::Normalize,
				Selector::Columns(vec!["x".to_owned(), "missing".to_owned()]),
			)
			.fit(&dataset)
			.unwrap();
		let features = recipe.apply_dataset(&dataset).unwrap();
		assert_eq!(features.ncols(), 5);
	}

	#[test]
	fn test_apply_matches_features_by_name() {
		let dataset = training_dataset();
		let recipe = Recipe::default().fit(&dataset).unwrap();
		let expected = recipe.apply_dataset(&dataset).unwrap();
		let mut reversed = dataset.predictors().clone();
		reversed.columns.reverse();
		let features = recipe.apply(&reversed).unwrap();
		assert_eq!(features, expected);
		assert_eq!(recipe.feature_names(), expected.column_names());
	}

	#[test]
	fn test_apply_fails_when_a_training_column_is_missing() {
		let dataset = training_dataset();
		let recipe = Recipe::default().fit(&dataset).unwrap();
		let mut predictors = dataset.predictors().clone();
		predictors.remove_column("z");
		assert!(matches!(
			recipe.apply(&predictors),
			Err(quarry_util::error::Error::UnknownColumn(ref name)) if name == "z"
		));
		let mut predictors = dataset.predictors().clone();
		predictors.remove_column("color");
		assert!(matches!(
			recipe.apply(&predictors),
			Err(quarry_util::error::Error::UnknownColumn(ref name)) if name == "color_blue"
		));
	}

	#[test]
	fn test_every_predictor_removed() {
		let n = 12;
		let dataframe = DataFrame::from_columns(vec![
			Column::Number(NumberColumn::new("constant".to_owned(), vec![3.0; n])),
			Column::Enum(EnumColumn::from_strings(
				"color".to_owned(),
				&vec![Some("red"); n],
			)),
			Column::Number(NumberColumn::new(
				"target".to_owned(),
				(0..n).map(|i| i as f32).collect(),
			)),
		])
		.unwrap();
		let dataset = Dataset::new(dataframe, "target").unwrap();
		let recipe = Recipe::default().fit(&dataset).unwrap();
		assert_eq!(recipe.removed_columns(), vec!["constant", "color"]);
		let features = recipe.apply_dataset(&dataset).unwrap();
		assert_eq!(features.nrows(), n);
		assert_eq!(features.ncols(), 0);
	}
}
