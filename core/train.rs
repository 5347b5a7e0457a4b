use crate::{
	config::{
		Config, DEFAULT_K_FOLDS, DEFAULT_REPEATS, DEFAULT_SEED, DEFAULT_STRATA_BINS,
		DEFAULT_TEST_FRACTION,
	},
	grid::{compute_grid, default_grid},
	model::ModelConfig,
	split::{fold, split, FoldOptions, SplitOptions},
	tune::{tune, TuneOptions, TuneOutput},
	workflow::Workflow,
};
use anyhow::{format_err, Context, Result};
use quarry_dataframe::{ColumnType, DataFrame, Dataset, FromCsvOptions};
use quarry_features::{FittedRecipe, Recipe};
use quarry_metrics::RegressionMetricsOutput;
use quarry_util::{error::Error, progress_counter::ProgressCounter};
use std::{collections::BTreeMap, path::Path, sync::atomic::AtomicBool};

/// This enum reports the training progress.
#[derive(Debug)]
pub enum Progress {
	/// The csv file is being loaded. The counter is in bytes.
	Loading(ProgressCounter),
	/// The grid is being evaluated. The counter is in (grid point, fold) tasks.
	Tuning(ProgressCounter),
	/// The best configuration is being fit on the whole train set.
	Finalizing,
}

/// The output of [`train`](fn.train.html).
#[derive(Debug, serde::Serialize)]
pub struct TrainOutput {
	pub target_column_name: String,
	pub model: &'static str,
	pub n_rows: usize,
	pub n_train_rows: usize,
	pub n_test_rows: usize,
	pub k_folds: usize,
	pub repeats: usize,
	pub tuning: TuneOutput,
	/// The configuration with the best cross validation metric.
	pub best_config: ModelConfig,
	/// The recipe fit on the whole train set.
	pub recipe: FittedRecipe,
	pub feature_names: Vec<String>,
	/// The metrics of the best configuration, fit on the whole train set, on the test set.
	pub test_metrics: RegressionMetricsOutput,
}

/// Load the csv at `file_path` and run the whole workflow on it with the target column `target_column_name`.
pub fn train(
	file_path: &Path,
	target_column_name: &str,
	config: &Config,
	cancel: Option<&AtomicBool>,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<TrainOutput> {
	let dataframe = load_dataframe(file_path, config, update_progress)?;
	let dataset = Dataset::new(dataframe, target_column_name)?;
	train_dataset(dataset, config, cancel, update_progress)
}

/**
Run the whole workflow on `dataset`:

1. Split the dataset into a train and test set.
2. Split the train set into cross validation folds.
3. Evaluate every point of the grid on every fold and choose the best configuration.
4. Fit the best configuration on the whole train set and evaluate it once on the test set.
*/
pub fn train_dataset(
	dataset: Dataset,
	config: &Config,
	cancel: Option<&AtomicBool>,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<TrainOutput> {
	dataset.validate_target()?;
	let split_config = config.split.as_ref();
	let strata_column = split_config.and_then(|split| split.stratify_by.clone());
	let strata_bins = split_config
		.and_then(|split| split.strata_bins)
		.unwrap_or(DEFAULT_STRATA_BINS);
	let seed = split_config
		.and_then(|split| split.seed)
		.unwrap_or(DEFAULT_SEED);
	let k_folds = split_config
		.and_then(|split| split.k_folds)
		.unwrap_or(DEFAULT_K_FOLDS);
	let repeats = split_config
		.and_then(|split| split.repeats)
		.unwrap_or(DEFAULT_REPEATS);

	// Split the dataset into train and test.
	let train_test_split = split(
		&dataset,
		&SplitOptions {
			strata_column: strata_column.clone(),
			test_fraction: split_config
				.and_then(|split| split.test_fraction)
				.unwrap_or(DEFAULT_TEST_FRACTION),
			strata_bins,
			seed,
		},
	)?;
	let (dataset_train, dataset_test) = train_test_split.datasets(&dataset);
	log::info!(
		"split {} rows into {} train rows and {} test rows",
		dataset.nrows(),
		dataset_train.nrows(),
		dataset_test.nrows(),
	);

	// Split the train set into folds.
	let fold_set = fold(
		&dataset_train,
		&FoldOptions {
			strata_column,
			k: k_folds,
			repeats,
			strata_bins,
			seed,
		},
	)?;

	// Compute the grid.
	let model_kind = config.model.unwrap_or_default();
	let model = model_kind.build(seed);
	let grid = match config.grid.as_ref() {
		Some(grid) => compute_grid(model.as_ref(), grid)?,
		None => compute_grid(model.as_ref(), &default_grid(model_kind))?,
	};

	// Tune.
	let template = Workflow::new(
		recipe(config)?,
		model.clone(),
		crate::model::configure(model.as_ref(), &BTreeMap::new())?,
	);
	let progress_counter = ProgressCounter::new((grid.len() * fold_set.folds.len()) as u64);
	update_progress(Progress::Tuning(progress_counter.clone()));
	let tuning = tune(
		&template,
		&dataset_train,
		&fold_set,
		&grid,
		&TuneOptions {
			metric: config.comparison_metric.unwrap_or_default(),
			tie_break: config.tie_break,
			parallel: config.parallel.unwrap_or(true),
			cancel,
			progress: Some(&progress_counter),
		},
	)?;
	let best = tuning
		.best()
		.ok_or_else(|| format_err!("every configuration in the grid failed on every fold"))?;

	// Fit the best configuration on the whole train set and evaluate it on the test set.
	update_progress(Progress::Finalizing);
	let best_config = best.config.clone();
	let fitted = template
		.with_config(best_config.clone())
		.fit(&dataset_train)
		.context("failed to fit the best configuration on the train set")?;
	let test_metrics = fitted.evaluate(&dataset_test)?;
	log::info!(
		"the best configuration has a test {} of {}",
		tuning.metric.name(),
		test_metrics.get(tuning.metric),
	);

	Ok(TrainOutput {
		target_column_name: dataset.target_column_name().to_owned(),
		model: model.name(),
		n_rows: dataset.nrows(),
		n_train_rows: dataset_train.nrows(),
		n_test_rows: dataset_test.nrows(),
		k_folds,
		repeats,
		best_config,
		recipe: fitted.recipe().clone(),
		feature_names: fitted.feature_names().to_owned(),
		test_metrics,
		tuning,
	})
}

/// Build the standard recipe with the thresholds from the config.
fn recipe(config: &Config) -> Result<Recipe, Error> {
	let recipe_config = config.recipe.as_ref();
	let max_most_frequent_fraction = recipe_config
		.and_then(|recipe| recipe.max_most_frequent_fraction)
		.unwrap_or(quarry_features::DEFAULT_MAX_MOST_FREQUENT_FRACTION);
	let correlation_threshold = recipe_config
		.and_then(|recipe| recipe.correlation_threshold)
		.unwrap_or(quarry_features::DEFAULT_CORRELATION_THRESHOLD);
	for (name, value) in &[
		("max_most_frequent_fraction", max_most_frequent_fraction),
		("correlation_threshold", correlation_threshold),
	] {
		if !(*value > 0.0 && *value <= 1.0) {
			return Err(Error::ConfigOutOfRange {
				name: (*name).to_owned(),
				value: *value as f64,
				min: 0.0,
				max: 1.0,
			});
		}
	}
	Ok(Recipe::with_thresholds(
		max_most_frequent_fraction,
		correlation_threshold,
	))
}

fn load_dataframe(
	file_path: &Path,
	config: &Config,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<DataFrame> {
	let len = std::fs::metadata(file_path)
		.with_context(|| format!("failed to read {}", file_path.display()))?
		.len();
	let progress_counter = ProgressCounter::new(len);
	update_progress(Progress::Loading(progress_counter.clone()));
	let column_types: Option<BTreeMap<String, ColumnType>> =
		config.column_types.as_ref().map(|column_types| {
			column_types
				.iter()
				.map(|(column_name, column_type)| (column_name.clone(), column_type.into()))
				.collect()
		});
	let dataframe = DataFrame::from_path(
		file_path,
		FromCsvOptions {
			column_types,
			..Default::default()
		},
		|byte| progress_counter.set(byte),
	)
	.with_context(|| format!("failed to load {}", file_path.display()))?;
	log::info!(
		"loaded {} rows and {} columns from {}",
		dataframe.nrows(),
		dataframe.ncols(),
		file_path.display(),
	);
	Ok(dataframe)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::config::RecipeConfig;

	#[test]
	fn test_recipe_uses_the_configured_thresholds() {
		assert_eq!(recipe(&Config::default()).unwrap(), Recipe::default());
		let config = Config {
			recipe: Some(RecipeConfig {
				max_most_frequent_fraction: Some(0.8),
				correlation_threshold: Some(0.5),
			}),
			..Default::default()
		};
		assert_eq!(
			recipe(&config).unwrap(),
			Recipe::with_thresholds(0.8, 0.5)
		);
	}

	#[test]
	fn test_recipe_rejects_thresholds_out_of_range() {
		let config = Config {
			recipe: Some(RecipeConfig {
				max_most_frequent_fraction: None,
				correlation_threshold: Some(1.5),
			}),
			..Default::default()
		};
		assert!(matches!(
			recipe(&config),
			Err(Error::ConfigOutOfRange { name, .. }) if name == "correlation_threshold"
		));
	}
}
