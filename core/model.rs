/*!
This module defines the seam between the workflow and the regression models it trains. A [`Model`](trait.Model.html) declares its hyperparameters and their valid ranges, and trains a [`TrainedModel`](trait.TrainedModel.html) from a matrix of features and a vector of labels. The workflow never looks inside a model.
*/

use ndarray::prelude::*;
use num_traits::ToPrimitive;
use quarry_tree::{GradientBoostingOptions, RandomForestOptions, TreeOptions};
use quarry_util::error::{Error, Result};
use std::{collections::BTreeMap, sync::Arc};

#[derive(
	Clone,
	Copy,
	Debug,
	PartialEq,
	Eq,
	PartialOrd,
	Ord,
	Hash,
	serde::Deserialize,
	serde::Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Hyperparameter {
	/// The number of features considered at each split. Values larger than the number of features are clamped.
	FeatureSubsetSize,
	/// The number of trees in the ensemble.
	EnsembleSize,
	/// The minimum number of training examples in each leaf.
	MinLeafSize,
	/// The maximum depth of each tree.
	TreeDepth,
	/// The factor each boosted tree's output is scaled by.
	LearningRate,
}

impl Hyperparameter {
	pub fn name(self) -> &'static str {
		match self {
			Hyperparameter::FeatureSubsetSize => "feature_subset_size",
			Hyperparameter::EnsembleSize => "ensemble_size",
			Hyperparameter::MinLeafSize => "min_leaf_size",
			Hyperparameter::TreeDepth => "tree_depth",
			Hyperparameter::LearningRate => "learning_rate",
		}
	}
}

impl std::fmt::Display for Hyperparameter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name())
	}
}

/// The built in models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
	RandomForest,
	GradientBoosting,
}

impl ModelKind {
	pub fn build(self, seed: u64) -> Arc<dyn Model> {
		match self {
			ModelKind::RandomForest => Arc::new(RandomForest { seed }),
			ModelKind::GradientBoosting => Arc::new(GradientBoosting { seed }),
		}
	}
}

impl Default for ModelKind {
	fn default() -> Self {
		ModelKind::RandomForest
	}
}

/// A `HyperparameterRange` declares the values a model accepts for one hyperparameter.
#[derive(Clone, Debug, PartialEq)]
pub struct HyperparameterRange {
	pub hyperparameter: Hyperparameter,
	pub min: f64,
	pub max: f64,
	/// Integer hyperparameters are rounded to the nearest integer.
	pub integer: bool,
	/// The value used when a configuration does not set this hyperparameter. If this is `None`, the model chooses a value when it is trained.
	pub default: Option<f64>,
}

/// A `ModelConfig` maps each hyperparameter to its value. It can only be created by [`configure`](fn.configure.html), which validates the values against the model's declared ranges.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct ModelConfig {
	values: BTreeMap<Hyperparameter, f64>,
}

impl ModelConfig {
	pub fn get(&self, hyperparameter: Hyperparameter) -> Option<f64> {
		self.values.get(&hyperparameter).copied()
	}

	pub fn values(&self) -> &BTreeMap<Hyperparameter, f64> {
		&self.values
	}

	fn get_usize(&self, hyperparameter: Hyperparameter) -> Option<usize> {
		self.get(hyperparameter).and_then(|value| value.to_usize())
	}
}

impl std::fmt::Display for ModelConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let values: Vec<String> = self
			.values
			.iter()
			.map(|(hyperparameter, value)| format!("{}={}", hyperparameter, value))
			.collect();
		write!(f, "{}", values.join(", "))
	}
}

/// A `Model` is a regression estimator that can be trained with a configuration.
pub trait Model: Send + Sync + std::fmt::Debug {
	fn name(&self) -> &'static str;
	/// The hyperparameters this model accepts, in declaration order.
	fn hyperparameters(&self) -> Vec<HyperparameterRange>;
	/// The hyperparameter used to break ties between configurations that score equally. The configuration with the smaller value is preferred.
	fn tie_break(&self) -> Option<Hyperparameter> {
		None
	}
	fn train(
		&self,
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		config: &ModelConfig,
	) -> Result<Box<dyn TrainedModel>>;
}

pub trait TrainedModel: Send + Sync + std::fmt::Debug {
	/// Make a prediction for each row of `features`.
	fn predict(&self, features: ArrayView2<f32>) -> Array1<f32>;
}

/// Validate `values` against the hyperparameters declared by `model` and fill in the defaults of the rest.
pub fn configure(model: &dyn Model, values: &BTreeMap<Hyperparameter, f64>) -> Result<ModelConfig> {
	let ranges = model.hyperparameters();
	for hyperparameter in values.keys() {
		if !ranges
			.iter()
			.any(|range| range.hyperparameter == *hyperparameter)
		{
			return Err(Error::UnknownHyperparameter {
				model: model.name().to_owned(),
				name: hyperparameter.name().to_owned(),
			});
		}
	}
	let mut config = BTreeMap::new();
	for range in ranges.iter() {
		let value = match values.get(&range.hyperparameter) {
			Some(value) => *value,
			None => match range.default {
				Some(default) => default,
				None => continue,
			},
		};
		let value = if range.integer { value.round() } else { value };
		if !(value >= range.min && value <= range.max) {
			return Err(Error::ConfigOutOfRange {
				name: range.hyperparameter.name().to_owned(),
				value,
				min: range.min,
				max: range.max,
			});
		}
		config.insert(range.hyperparameter, value);
	}
	Ok(ModelConfig { values: config })
}

fn tree_options(config: &ModelConfig, n_features: usize, default_depth: usize) -> TreeOptions {
	TreeOptions {
		max_depth: config
			.get_usize(Hyperparameter::TreeDepth)
			.unwrap_or(default_depth),
		min_examples_per_leaf: config
			.get_usize(Hyperparameter::MinLeafSize)
			.unwrap_or(5),
		feature_subset_size: config
			.get_usize(Hyperparameter::FeatureSubsetSize)
			.map(|size| size.min(n_features).max(1)),
	}
}

fn check_training_data(features: ArrayView2<f32>, labels: ArrayView1<f32>) -> Result<()> {
	if features.nrows() == 0 {
		return Err(Error::Model("there are no training examples".to_owned()));
	}
	if features.nrows() != labels.len() {
		return Err(Error::ShapeMismatch {
			predictions: features.nrows(),
			labels: labels.len(),
		});
	}
	Ok(())
}

/// A random forest of bagged regression trees. By default each split considers a third of the features.
#[derive(Clone, Debug, Default)]
pub struct RandomForest {
	pub seed: u64,
}

#[derive(Debug)]
struct TrainedRandomForest(quarry_tree::RandomForest);

impl Model for RandomForest {
	fn name(&self) -> &'static str {
		"random_forest"
	}

	fn hyperparameters(&self) -> Vec<HyperparameterRange> {
		vec![
			HyperparameterRange {
				hyperparameter: Hyperparameter::FeatureSubsetSize,
				min: 1.0,
				max: 10_000.0,
				integer: true,
				default: None,
			},
			HyperparameterRange {
				hyperparameter: Hyperparameter::EnsembleSize,
				min: 1.0,
				max: 10_000.0,
				integer: true,
				default: Some(100.0),
			},
			HyperparameterRange {
				hyperparameter: Hyperparameter::MinLeafSize,
				min: 1.0,
				max: 1_000_000.0,
				integer: true,
				default: Some(5.0),
			},
			HyperparameterRange {
				hyperparameter: Hyperparameter::TreeDepth,
				min: 1.0,
				max: 64.0,
				integer: true,
				default: Some(16.0),
			},
		]
	}

	fn tie_break(&self) -> Option<Hyperparameter> {
		Some(Hyperparameter::EnsembleSize)
	}

	fn train(
		&self,
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		config: &ModelConfig,
	) -> Result<Box<dyn TrainedModel>> {
		check_training_data(features, labels)?;
		let n_features = features.ncols();
		let mut tree_options = tree_options(config, n_features, 16);
		if tree_options.feature_subset_size.is_none() {
			tree_options.feature_subset_size = Some((n_features / 3).max(1));
		}
		let options = RandomForestOptions {
			n_trees: config
				.get_usize(Hyperparameter::EnsembleSize)
				.unwrap_or(100),
			tree_options,
			seed: self.seed,
		};
		let model = quarry_tree::RandomForest::train(features, labels, &options);
		Ok(Box::new(TrainedRandomForest(model)))
	}
}

impl TrainedModel for TrainedRandomForest {
	fn predict(&self, features: ArrayView2<f32>) -> Array1<f32> {
		self.0.predict(features)
	}
}

/// Least squares gradient boosting of shallow regression trees.
#[derive(Clone, Debug, Default)]
pub struct GradientBoosting {
	pub seed: u64,
}

#[derive(Debug)]
struct TrainedGradientBoosting(quarry_tree::GradientBoosting);

impl Model for GradientBoosting {
	fn name(&self) -> &'static str {
		"gradient_boosting"
	}

	fn hyperparameters(&self) -> Vec<HyperparameterRange> {
		vec![
			HyperparameterRange {
				hyperparameter: Hyperparameter::FeatureSubsetSize,
				min: 1.0,
				max: 10_000.0,
				integer: true,
				default: None,
			},
			HyperparameterRange {
				hyperparameter: Hyperparameter::EnsembleSize,
				min: 1.0,
				max: 10_000.0,
				integer: true,
				default: Some(100.0),
			},
			HyperparameterRange {
				hyperparameter: Hyperparameter::MinLeafSize,
				min: 1.0,
				max: 1_000_000.0,
				integer: true,
				default: Some(5.0),
			},
			HyperparameterRange {
				hyperparameter: Hyperparameter::TreeDepth,
				min: 1.0,
				max: 16.0,
				integer: true,
				default: Some(3.0),
			},
			HyperparameterRange {
				hyperparameter: Hyperparameter::LearningRate,
				min: 1e-4,
				max: 1.0,
				integer: false,
				default: Some(0.1),
			},
		]
	}

	fn tie_break(&self) -> Option<Hyperparameter> {
		Some(Hyperparameter::EnsembleSize)
	}

	fn train(
		&self,
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		config: &ModelConfig,
	) -> Result<Box<dyn TrainedModel>> {
		check_training_data(features, labels)?;
		let options = GradientBoostingOptions {
			n_rounds: config
				.get_usize(Hyperparameter::EnsembleSize)
				.unwrap_or(100),
			learning_rate: config
				.get(Hyperparameter::LearningRate)
				.and_then(|value| value.to_f32())
				.unwrap_or(0.1),
			tree_options: tree_options(config, features.ncols(), 3),
			seed: self.seed,
		};
		let model = quarry_tree::GradientBoosting::train(features, labels, &options);
		Ok(Box::new(TrainedGradientBoosting(model)))
	}
}

impl TrainedModel for TrainedGradientBoosting {
	fn predict(&self, features: ArrayView2<f32>) -> Array1<f32> {
		self.0.predict(features)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use maplit::btreemap;

	#[test]
	fn test_configure_fills_defaults() {
		let config = configure(
			&RandomForest::default(),
			&btreemap! { Hyperparameter::EnsembleSize => 10.4 },
		)
		.unwrap();
		insta::assert_debug_snapshot!(config.values(), @r###"
  {
      EnsembleSize: 10.0,
      MinLeafSize: 5.0,
      TreeDepth: 16.0,
  }
  "###);
	}

	#[test]
	fn test_configure_rejects_out_of_range_values() {
		let result = configure(
			&GradientBoosting::default(),
			&btreemap! { Hyperparameter::LearningRate => 2.0 },
		);
		assert!(matches!(
			result,
			Err(Error::ConfigOutOfRange { ref name, .. }) if name == "learning_rate"
		));
		let result = configure(
			&RandomForest::default(),
			&btreemap! { Hyperparameter::LearningRate => 0.1 },
		);
		assert!(matches!(result, Err(Error::UnknownHyperparameter { .. })));
	}

	#[test]
	fn test_feature_subset_size_is_clamped() {
		let features = Array2::from_shape_fn((20, 2), |(i, j)| (i * (j + 1)) as f32);
		let labels = Array1::from_shape_fn(20, |i| i as f32);
		let config = configure(
			&RandomForest::default(),
			&btreemap! {
				Hyperparameter::FeatureSubsetSize => 50.0,
				Hyperparameter::EnsembleSize => 3.0,
			},
		)
		.unwrap();
		let model = RandomForest::default()
			.train(features.view(), labels.view(), &config)
			.unwrap();
		assert_eq!(model.predict(features.view()).len(), 20);
	}

	#[test]
	fn test_train_rejects_empty_data() {
		let config = configure(&GradientBoosting::default(), &BTreeMap::new()).unwrap();
		let result = GradientBoosting::default().train(
			Array2::zeros((0, 3)).view(),
			Array1::zeros(0).view(),
			&config,
		);
		assert!(matches!(result, Err(Error::Model(_))));
	}
}
