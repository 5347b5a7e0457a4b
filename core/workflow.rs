use crate::model::{Model, ModelConfig, TrainedModel};
use ndarray::prelude::*;
use quarry_dataframe::{DataFrame, Dataset};
use quarry_features::{FittedRecipe, Recipe};
use quarry_metrics::RegressionMetricsOutput;
use quarry_util::error::Result;
use std::sync::Arc;

/// A `Workflow` binds a recipe and a configured model so they are fit together. Fitting a workflow fits the recipe on the training data, transforms the training data with it, and trains the model on the result.
#[derive(Clone, Debug)]
pub struct Workflow {
	recipe: Recipe,
	model: Arc<dyn Model>,
	config: ModelConfig,
}

/// A `FittedWorkflow` holds a fitted recipe and the model trained on its output. It is immutable.
#[derive(Debug)]
pub struct FittedWorkflow {
	recipe: FittedRecipe,
	model: Box<dyn TrainedModel>,
	config: ModelConfig,
	feature_names: Vec<String>,
}

impl Workflow {
	pub fn new(recipe: Recipe, model: Arc<dyn Model>, config: ModelConfig) -> Workflow {
		Workflow {
			recipe,
			model,
			config,
		}
	}

	pub fn recipe(&self) -> &Recipe {
		&self.recipe
	}

	pub fn model(&self) -> &Arc<dyn Model> {
		&self.model
	}

	pub fn config(&self) -> &ModelConfig {
		&self.config
	}

	/// Create a workflow with the same recipe and model but a different configuration.
	pub fn with_config(&self, config: ModelConfig) -> Workflow {
		Workflow {
			recipe: self.recipe.clone(),
			model: self.model.clone(),
			config,
		}
	}

	pub fn fit(&self, dataset: &Dataset) -> Result<FittedWorkflow> {
		dataset.validate_target()?;
		let recipe = self.recipe.fit(dataset)?;
		let features = recipe.apply_dataset(dataset)?;
		let labels = ArrayView1::from(dataset.target().data.as_slice());
		let model = self.model.train(features.values(), labels, &self.config)?;
		Ok(FittedWorkflow {
			recipe,
			model,
			config: self.config.clone(),
			feature_names: features.column_names().to_owned(),
		})
	}
}

impl FittedWorkflow {
	pub fn recipe(&self) -> &FittedRecipe {
		&self.recipe
	}

	pub fn config(&self) -> &ModelConfig {
		&self.config
	}

	/// The names of the features the model was trained on.
	pub fn feature_names(&self) -> &[String] {
		&self.feature_names
	}

	/// Apply the fitted recipe to `dataframe` and make a prediction for each row. The columns of `dataframe` are matched to the training columns by name.
	pub fn predict(&self, dataframe: &DataFrame) -> Result<Array1<f32>> {
		let features = self.recipe.apply(dataframe)?;
		Ok(self.model.predict(features.values()))
	}

	/// Make predictions for the rows of `dataset` and score them against its target.
	pub fn evaluate(&self, dataset: &Dataset) -> Result<RegressionMetricsOutput> {
		let features = self.recipe.apply_dataset(dataset)?;
		let predictions = self.model.predict(features.values()).to_vec();
		quarry_metrics::score(&predictions, &dataset.target().data)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::model::{configure, GradientBoosting, RandomForest};
	use quarry_dataframe::{Column, EnumColumn, NumberColumn};
	use std::collections::BTreeMap;

	fn dataset() -> Dataset {
		let n = 60;
		let size: Vec<f32> = (0..n).map(|i| (i % 20) as f32).collect();
		let kind: Vec<Option<&str>> = (0..n)
			.map(|i| match i % 3 {
				0 => Some("a"),
				1 => Some("b"),
				_ => Some("c"),
			})
			.collect();
		let price: Vec<f32> = (0..n)
			.map(|i| 10.0 * (i % 20) as f32 + 50.0 * (i % 3) as f32)
			.collect();
		let dataframe = DataFrame::from_columns(vec![
			Column::Number(NumberColumn::new("size".to_owned(), size)),
			Column::Enum(EnumColumn::from_strings("kind".to_owned(), &kind)),
			Column::Number(NumberColumn::new("price".to_owned(), price)),
		])
		.unwrap();
		Dataset::new(dataframe, "price").unwrap()
	}

	#[test]
	fn test_fit_and_evaluate() {
		let dataset = dataset();
		let model: Arc<dyn Model> = Arc::new(GradientBoosting::default());
		let config = configure(model.as_ref(), &BTreeMap::new()).unwrap();
		let workflow = Workflow::new(Recipe::default(), model, config);
		let fitted = workflow.fit(&dataset).unwrap();
		assert_eq!(fitted.feature_names(), &["size", "kind_a", "kind_b", "kind_c"]);
		let metrics = fitted.evaluate(&dataset).unwrap();
		assert!(metrics.r2 > 0.9);
		// Predicting never refits the recipe, so predicting twice gives identical results.
		let a = fitted.predict(dataset.predictors()).unwrap();
		let b = fitted.predict(dataset.predictors()).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn test_predict_matches_columns_by_name() {
		let dataset = dataset();
		let model: Arc<dyn Model> = Arc::new(GradientBoosting::default());
		let config = configure(model.as_ref(), &BTreeMap::new()).unwrap();
		let fitted = Workflow::new(Recipe::default(), model, config)
			.fit(&dataset)
			.unwrap();
		let expected = fitted.predict(dataset.predictors()).unwrap();
		let mut reversed = dataset.predictors().clone();
		reversed.columns.reverse();
		assert_eq!(fitted.predict(&reversed).unwrap(), expected);
		let mut missing = dataset.predictors().clone();
		missing.remove_column("size");
		assert!(matches!(
			fitted.predict(&missing),
			Err(quarry_util::error::Error::UnknownColumn(ref name)) if name == "size"
		));
	}

	#[test]
	fn test_predicts_the_mean_when_every_predictor_is_removed() {
		let n = 30;
		let dataframe = DataFrame::from_columns(vec![
			Column::Number(NumberColumn::new("constant".to_owned(), vec![1.0; n])),
			Column::Number(NumberColumn::new(
				"price".to_owned(),
				(0..n).map(|i| i as f32).collect(),
			)),
		])
		.unwrap();
		let dataset = Dataset::new(dataframe, "price").unwrap();
		let model: Arc<dyn Model> = Arc::new(RandomForest::default());
		let config = configure(model.as_ref(), &BTreeMap::new()).unwrap();
		let fitted = Workflow::new(Recipe::default(), model, config)
			.fit(&dataset)
			.unwrap();
		assert!(fitted.feature_names().is_empty());
		let metrics = fitted.evaluate(&dataset).unwrap();
		// Every tree is a single leaf holding the mean of its bootstrap sample.
		assert!((metrics.mae - 7.5).abs() < 2.0);
	}

	#[test]
	fn test_fit_rejects_missing_targets() {
		let dataset = dataset();
		let mut predictors = dataset.predictors().clone();
		let mut target = dataset.target().clone();
		target.data[0] = std::f32::NAN;
		predictors.columns.push(Column::Number(target));
		let dataset = Dataset::new(predictors, "price").unwrap();
		let model: Arc<dyn Model> = Arc::new(GradientBoosting::default());
		let config = configure(model.as_ref(), &BTreeMap::new()).unwrap();
		let workflow = Workflow::new(Recipe::default(), model, config);
		assert!(matches!(
			workflow.fit(&dataset),
			Err(quarry_util::error::Error::InvalidTarget { .. })
		));
	}
}
