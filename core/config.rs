/*!
This module defines the `Config` struct, which is used to configure training with [`train`](../train/fn.train.html). Every field is optional and falls back to the default documented on it.

```yaml
split:
  stratify_by: price
  test_fraction: 0.2
  k_folds: 5
  repeats: 2
model: gradient_boosting
grid:
  - name: ensemble_size
    min: 50
    max: 200
    levels: 3
  - name: learning_rate
    min: 0.01
    max: 0.3
    levels: 3
    scale: log
comparison_metric: mae
```
*/

use crate::{grid::HyperparameterGrid, model::Hyperparameter, model::ModelKind};
use anyhow::{Context, Result};
use quarry_metrics::RegressionMetric;
use std::{collections::BTreeMap, path::Path};

pub const DEFAULT_TEST_FRACTION: f32 = 0.2;
pub const DEFAULT_K_FOLDS: usize = 5;
pub const DEFAULT_REPEATS: usize = 1;
pub const DEFAULT_STRATA_BINS: usize = 10;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Default, serde::Deserialize)]
pub struct Config {
	/// Column types given here are used instead of the inferred types.
	pub column_types: Option<BTreeMap<String, ColumnType>>,
	pub split: Option<SplitConfig>,
	pub recipe: Option<RecipeConfig>,
	/// The model to train. Defaults to `random_forest`.
	pub model: Option<ModelKind>,
	/// The hyperparameters to search. Defaults to a small grid for the chosen model.
	pub grid: Option<Vec<HyperparameterGrid>>,
	/// The metric used to choose the best configuration. Defaults to `rmse`.
	pub comparison_metric: Option<RegressionMetric>,
	/// The hyperparameter used to break ties between configurations. Defaults to the model's choice.
	pub tie_break: Option<Hyperparameter>,
	/// Whether to evaluate grid points in parallel. Defaults to true.
	pub parallel: Option<bool>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ColumnType {
	#[serde(rename = "number")]
	Number,
	#[serde(rename = "enum")]
	Enum { options: Vec<String> },
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct SplitConfig {
	/// The column to stratify by. Defaults to the target column.
	pub stratify_by: Option<String>,
	/// Defaults to 0.2.
	pub test_fraction: Option<f32>,
	/// Defaults to 5.
	pub k_folds: Option<usize>,
	/// Defaults to 1.
	pub repeats: Option<usize>,
	/// The number of quantile bins number strata columns are divided into. Defaults to 10.
	pub strata_bins: Option<usize>,
	/// Defaults to 42.
	pub seed: Option<u64>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct RecipeConfig {
	/// Defaults to 0.95.
	pub max_most_frequent_fraction: Option<f32>,
	/// Defaults to 0.9.
	pub correlation_threshold: Option<f32>,
}

impl From<&ColumnType> for quarry_dataframe::ColumnType {
	fn from(column_type: &ColumnType) -> Self {
		match column_type {
			ColumnType::Number => quarry_dataframe::ColumnType::Number,
			ColumnType::Enum { options } => quarry_dataframe::ColumnType::Enum {
				options: options.clone(),
			},
		}
	}
}

/// Load a config from a `.json` file, or from a yaml file for any other extension. If `config_path` is `None`, the default config is returned.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
	let config_path = match config_path {
		Some(config_path) => config_path,
		None => return Ok(Config::default()),
	};
	let config = std::fs::read_to_string(config_path)
		.with_context(|| format!("failed to read the config file {}", config_path.display()))?;
	let is_json = config_path
		.extension()
		.map(|extension| extension == "json")
		.unwrap_or(false);
	let config = if is_json {
		serde_json::from_str(&config)
			.with_context(|| format!("failed to parse the config file {}", config_path.display()))?
	} else {
		serde_yaml::from_str(&config)
			.with_context(|| format!("failed to parse the config file {}", config_path.display()))?
	};
	Ok(config)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::grid::Scale;

	#[test]
	fn test_parse_yaml() {
		let config: Config = serde_yaml::from_str(
			r#"
column_types:
  zip:
    type: enum
    options: ["02139", "94110"]
split:
  test_fraction: 0.25
  repeats: 3
model: gradient_boosting
grid:
  - name: learning_rate
    min: 0.01
    max: 0.1
    levels: 2
    scale: log
comparison_metric: r2
tie_break: tree_depth
"#,
		)
		.unwrap();
		let split = config.split.unwrap();
		assert_eq!(split.test_fraction, Some(0.25));
		assert_eq!(split.repeats, Some(3));
		assert_eq!(split.k_folds, None);
		assert_eq!(config.model, Some(ModelKind::GradientBoosting));
		let grid = config.grid.unwrap();
		assert_eq!(grid[0].hyperparameter, Hyperparameter::LearningRate);
		assert_eq!(grid[0].scale, Scale::Log);
		assert_eq!(config.comparison_metric, Some(RegressionMetric::R2));
		assert_eq!(config.tie_break, Some(Hyperparameter::TreeDepth));
		assert!(matches!(
			config.column_types.unwrap().get("zip"),
			Some(ColumnType::Enum { .. })
		));
	}

	#[test]
	fn test_parse_json() {
		let config: Config =
			serde_json::from_str(r#"{ "model": "random_forest", "parallel": false }"#).unwrap();
		assert_eq!(config.model, Some(ModelKind::RandomForest));
		assert_eq!(config.parallel, Some(false));
		assert!(config.grid.is_none());
	}

	#[test]
	fn test_load_default_config() {
		let config = load_config(None).unwrap();
		assert!(config.split.is_none());
	}
}
