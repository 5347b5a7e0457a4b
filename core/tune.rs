/*!
This module implements hyperparameter tuning by cross validation. Every grid point is evaluated on every fold, and the grid point with the best mean comparison metric across its folds is selected.
*/

use crate::{
	grid::GridPoint,
	model::{configure, Hyperparameter, ModelConfig},
	split::FoldSet,
	workflow::Workflow,
};
use itertools::iproduct;
use num_traits::ToPrimitive;
use quarry_dataframe::Dataset;
use quarry_metrics::{RegressionMetric, RegressionMetricsOutput};
use quarry_util::{
	error::{Error, Result},
	progress_counter::ProgressCounter,
};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct TuneOptions<'a> {
	/// The metric grid points are compared by.
	pub metric: RegressionMetric,
	/// The hyperparameter used to break ties. If this is `None`, the model's declared tie break hyperparameter is used.
	pub tie_break: Option<Hyperparameter>,
	/// If this is true, the (grid point, fold) tasks run on the rayon thread pool.
	pub parallel: bool,
	/// If this flag is set while tuning, the remaining tasks are skipped and `tune` returns `Error::Cancelled`.
	pub cancel: Option<&'a AtomicBool>,
	/// This counter is incremented once for each completed task.
	pub progress: Option<&'a ProgressCounter>,
}

/// The outcome of evaluating one grid point on one fold. Exactly one of `metrics` and `error` is set.
#[derive(Clone, Debug, serde::Serialize)]
pub struct FoldOutcome {
	pub repeat: usize,
	pub fold: usize,
	pub metrics: Option<RegressionMetricsOutput>,
	pub error: Option<String>,
}

/// The mean of each metric across the folds that succeeded for a grid point.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CrossValidationMetrics {
	pub mse: f32,
	pub rmse: f32,
	pub mae: f32,
	pub r2: f32,
	/// The standard error of the comparison metric across folds. It is `None` when fewer than two folds succeeded.
	pub std_err: Option<f32>,
	pub n_folds: usize,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct GridPointResult {
	pub config: ModelConfig,
	pub folds: Vec<FoldOutcome>,
	/// This is `None` if every fold failed.
	pub metrics: Option<CrossValidationMetrics>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct TuneOutput {
	pub metric: RegressionMetric,
	pub results: Vec<GridPointResult>,
	/// The index into `results` of the best grid point, or `None` if no grid point produced metrics.
	pub best_index: Option<usize>,
}

impl TuneOutput {
	pub fn best(&self) -> Option<&GridPointResult> {
		self.best_index.map(|index| &self.results[index])
	}
}

/// Evaluate every point of `grid` on every fold of `fold_set`. `template` supplies the recipe and model, and each grid point supplies the model configuration. The folds refer to rows of `dataset`.
pub fn tune(
	template: &Workflow,
	dataset: &Dataset,
	fold_set: &FoldSet,
	grid: &[GridPoint],
	options: &TuneOptions,
) -> Result<TuneOutput> {
	// An invalid configuration is an error in the grid, not in a fold, so it is reported before any work is done.
	let workflows = grid
		.iter()
		.map(|point| {
			let config = configure(template.model().as_ref(), point)?;
			Ok(template.with_config(config))
		})
		.collect::<Result<Vec<Workflow>>>()?;
	// The fold datasets are created once and shared read only by every grid point.
	let fold_datasets: Vec<(Dataset, Dataset)> = fold_set
		.folds
		.iter()
		.map(|fold| (dataset.take_rows(&fold.train), dataset.take_rows(&fold.validation)))
		.collect();
	let tasks: Vec<(usize, usize)> =
		iproduct!(0..workflows.len(), 0..fold_set.folds.len()).collect();
	log::info!(
		"tuning {} grid points on {} folds",
		workflows.len(),
		fold_set.folds.len()
	);

	let run_task = |(grid_index, fold_index): (usize, usize)| -> Result<(usize, FoldOutcome)> {
		if options
			.cancel
			.map(|cancel| cancel.load(Ordering::Relaxed))
			.unwrap_or(false)
		{
			return Err(Error::Cancelled);
		}
		let fold = &fold_set.folds[fold_index];
		let (train, validation) = &fold_datasets[fold_index];
		let result = workflows[grid_index]
			.fit(train)
			.and_then(|fitted| fitted.evaluate(validation));
		let outcome = match result {
			Ok(metrics) => {
				log::debug!(
					"grid point {} repeat {} fold {}: {} = {}",
					grid_index,
					fold.repeat,
					fold.index,
					options.metric.name(),
					metrics.get(options.metric),
				);
				FoldOutcome {
					repeat: fold.repeat,
					fold: fold.index,
					metrics: Some(metrics),
					error: None,
				}
			}
			Err(error) => {
				log::warn!(
					"grid point {} repeat {} fold {} failed: {}",
					grid_index,
					fold.repeat,
					fold.index,
					error,
				);
				FoldOutcome {
					repeat: fold.repeat,
					fold: fold.index,
					metrics: None,
					error: Some(error.to_string()),
				}
			}
		};
		if let Some(progress) = options.progress {
			progress.inc(1);
		}
		Ok((grid_index, outcome))
	};
	let mut outcomes = if options.parallel {
		tasks
			.into_par_iter()
			.map(run_task)
			.collect::<Result<Vec<_>>>()?
	} else {
		tasks
			.into_iter()
			.map(run_task)
			.collect::<Result<Vec<_>>>()?
	};
	if options
		.cancel
		.map(|cancel| cancel.load(Ordering::Relaxed))
		.unwrap_or(false)
	{
		return Err(Error::Cancelled);
	}

	// Reduce in a fixed order so the result does not depend on the order the tasks ran in or the order of the folds.
	outcomes.sort_by_key(|(grid_index, outcome)| (*grid_index, outcome.repeat, outcome.fold));
	let mut folds_by_grid_point: Vec<Vec<FoldOutcome>> = vec![Vec::new(); workflows.len()];
	for (grid_index, outcome) in outcomes {
		folds_by_grid_point[grid_index].push(outcome);
	}
	let results: Vec<GridPointResult> = workflows
		.into_iter()
		.zip(folds_by_grid_point.into_iter())
		.map(|(workflow, folds)| {
			let metrics = aggregate(&folds, options.metric);
			GridPointResult {
				config: workflow.config().clone(),
				folds,
				metrics,
			}
		})
		.collect();
	let tie_break = options.tie_break.or_else(|| template.model().tie_break());
	let best_index = choose_best(&results, options.metric, tie_break);
	if let Some(best) = best_index.map(|index| &results[index]) {
		log::info!(
			"the best configuration is {} with a mean {} of {}",
			best.config,
			options.metric.name(),
			best.metrics
				.as_ref()
				.map(|metrics| metrics.get(options.metric))
				.unwrap_or(std::f32::NAN),
		);
	}
	Ok(TuneOutput {
		metric: options.metric,
		results,
		best_index,
	})
}

impl CrossValidationMetrics {
	pub fn get(&self, metric: RegressionMetric) -> f32 {
		match metric {
			RegressionMetric::Mse => self.mse,
			RegressionMetric::Rmse => self.rmse,
			RegressionMetric::Mae => self.mae,
			RegressionMetric::R2 => self.r2,
		}
	}
}

/// Compute the mean of each metric across the successful folds. Returns `None` if no fold succeeded.
fn aggregate(folds: &[FoldOutcome], metric: RegressionMetric) -> Option<CrossValidationMetrics> {
	let metrics: Vec<&RegressionMetricsOutput> =
		folds.iter().filter_map(|fold| fold.metrics.as_ref()).collect();
	if metrics.is_empty() {
		return None;
	}
	let n = metrics.len().to_f64()?;
	let mean = |metric: RegressionMetric| -> f64 {
		metrics
			.iter()
			.map(|metrics| metrics.get(metric) as f64)
			.sum::<f64>()
			/ n
	};
	let std_err = if metrics.len() >= 2 {
		let comparison_mean = mean(metric);
		let variance = metrics
			.iter()
			.map(|metrics| (metrics.get(metric) as f64 - comparison_mean).powi(2))
			.sum::<f64>()
			/ (n - 1.0);
		Some((variance.sqrt() / n.sqrt()) as f32)
	} else {
		None
	};
	Some(CrossValidationMetrics {
		mse: mean(RegressionMetric::Mse) as f32,
		rmse: mean(RegressionMetric::Rmse) as f32,
		mae: mean(RegressionMetric::Mae) as f32,
		r2: mean(RegressionMetric::R2) as f32,
		std_err,
		n_folds: metrics.len(),
	})
}

/// Choose the grid point with the best mean metric. Ties are broken by the smaller value of `tie_break`, and then by the earlier grid point. Grid points without metrics or with a metric that is not finite are never chosen.
fn choose_best(
	results: &[GridPointResult],
	metric: RegressionMetric,
	tie_break: Option<Hyperparameter>,
) -> Option<usize> {
	let mut best: Option<(usize, f32)> = None;
	for (index, result) in results.iter().enumerate() {
		let value = match result.metrics.as_ref().map(|metrics| metrics.get(metric)) {
			Some(value) if value.is_finite() => value,
			_ => continue,
		};
		let is_better = match best {
			None => true,
			Some((best_index, best_value)) => {
				if metric.is_better(value, best_value) {
					true
				} else if value == best_value {
					let tie_break_value = |index: usize| {
						tie_break
							.and_then(|tie_break| results[index].config.get(tie_break))
							.unwrap_or(0.0)
					};
					tie_break_value(index) < tie_break_value(best_index)
				} else {
					false
				}
			}
		};
		if is_better {
			best = Some((index, value));
		}
	}
	best.map(|(index, _)| index)
}
