use crate::TrainArgs;
use anyhow::{Context, Result};
use quarry_core::{load_config, Progress, TrainOutput};
use quarry_metrics::RegressionMetric;
use quarry_util::table::Table;
use std::collections::BTreeSet;

pub fn train(args: TrainArgs) -> Result<()> {
	let mut config = load_config(args.config.as_deref())?;
	if args.no_parallel {
		config.parallel = Some(false);
	}
	let output = quarry_core::train(&args.file, &args.target, &config, None, &mut |progress| {
		match progress {
			Progress::Loading(counter) => {
				log::info!("loading {} bytes", counter.total())
			}
			Progress::Tuning(counter) => {
				log::info!("evaluating {} (grid point, fold) pairs", counter.total())
			}
			Progress::Finalizing => log::info!("fitting the best configuration"),
		}
	})?;

	println!("{}", report(&output));

	// Write the json report if an output path was given.
	if let Some(output_path) = args.output.as_ref() {
		let file = std::fs::File::create(output_path)
			.with_context(|| format!("failed to create {}", output_path.display()))?;
		serde_json::to_writer_pretty(file, &output)
			.with_context(|| format!("failed to write the report to {}", output_path.display()))?;
		eprintln!("Your report was written to {}.", output_path.display());
	}

	Ok(())
}

/// Render the output of a training run as markdown.
fn report(output: &TrainOutput) -> String {
	let mut report = String::new();
	report.push_str("# Quarry\n\n");
	report.push_str(&format!(
		"Predicting `{}` with `{}` on {} rows: {} train rows in {} folds repeated {} times, and {} test rows.\n\n",
		output.target_column_name,
		output.model,
		output.n_rows,
		output.n_train_rows,
		output.k_folds,
		output.repeats,
		output.n_test_rows,
	));

	// The tuning table has one row per grid point. The best grid point is marked with a star.
	report.push_str(&format!(
		"## Tuning\n\nGrid points are compared by {}.\n\n",
		output.tuning.metric
	));
	let hyperparameters: BTreeSet<_> = output
		.tuning
		.results
		.iter()
		.flat_map(|result| result.config.values().keys().copied())
		.collect();
	let mut header = vec![String::new()];
	header.extend(hyperparameters.iter().map(|hyperparameter| hyperparameter.to_string()));
	header.extend(RegressionMetric::ALL.iter().map(|metric| metric.name().to_owned()));
	header.push("std err".to_owned());
	header.push("folds".to_owned());
	let rows = output
		.tuning
		.results
		.iter()
		.enumerate()
		.map(|(index, result)| {
			let mut row = Vec::new();
			row.push(if Some(index) == output.tuning.best_index {
				"*".to_owned()
			} else {
				String::new()
			});
			row.extend(hyperparameters.iter().map(|hyperparameter| {
				result
					.config
					.get(*hyperparameter)
					.map(|value| value.to_string())
					.unwrap_or_default()
			}));
			match result.metrics.as_ref() {
				Some(metrics) => {
					row.extend(
						RegressionMetric::ALL
							.iter()
							.map(|metric| format!("{:.4}", metrics.get(*metric))),
					);
					row.push(
						metrics
							.std_err
							.map(|std_err| format!("{:.4}", std_err))
							.unwrap_or_default(),
					);
					row.push(format!("{}/{}", metrics.n_folds, result.folds.len()));
				}
				None => {
					row.extend(RegressionMetric::ALL.iter().map(|_| "failed".to_owned()));
					row.push(String::new());
					row.push(format!("0/{}", result.folds.len()));
				}
			}
			row
		})
		.collect();
	report.push_str(&Table::new(header, rows).to_string());

	report.push_str(&format!(
		"\n## Best Configuration\n\n{}\n\n",
		output.best_config
	));

	report.push_str("## Test Metrics\n\n");
	let rows = RegressionMetric::ALL
		.iter()
		.map(|metric| {
			vec![
				metric.to_string(),
				format!("{:.4}", output.test_metrics.get(*metric)),
			]
		})
		.collect();
	report.push_str(&Table::new(vec!["metric".to_owned(), "value".to_owned()], rows).to_string());

	report.push_str("\n## Recipe\n\n");
	let removed_columns = output.recipe.removed_columns();
	if removed_columns.is_empty() {
		report.push_str("No columns were removed.\n");
	} else {
		report.push_str(&format!("Removed columns: {}.\n", removed_columns.join(", ")));
	}
	report.push_str(&format!(
		"Features: {}.",
		output.feature_names.join(", ")
	));
	report
}
