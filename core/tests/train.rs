use quarry_core::{config::Config, train_dataset};
use quarry_dataframe::{DataFrame, Dataset, FromCsvOptions};
use quarry_util::error::Error;
use std::io::{Cursor, Write};

fn csv() -> String {
	let mut csv = String::from("size,kind,region,price\n");
	for i in 0..100 {
		let size = i % 25;
		let kind = ["a", "b", "c"][i % 3];
		let price = 3.0 * size as f32 + 20.0 * (i % 3) as f32 + 0.01 * i as f32;
		csv.push_str(&format!("{},{},north,{}\n", size, kind, price));
	}
	csv
}

fn dataset() -> Dataset {
	let mut reader = csv::Reader::from_reader(Cursor::new(csv().into_bytes()));
	let dataframe = DataFrame::from_csv(&mut reader, FromCsvOptions::default(), |_| {}).unwrap();
	Dataset::new(dataframe, "price").unwrap()
}

fn config(yaml: &str) -> Config {
	serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_train_dataset() {
	let config = config(
		r#"
split:
  k_folds: 4
model: random_forest
grid:
  - name: ensemble_size
    min: 10
    max: 20
    levels: 2
  - name: min_leaf_size
    min: 2
    max: 5
    levels: 2
"#,
	);
	let output = train_dataset(dataset(), &config, None, &mut |_| {}).unwrap();
	assert_eq!(output.n_rows, 100);
	assert_eq!(output.n_train_rows, 80);
	assert_eq!(output.n_test_rows, 20);
	assert_eq!(output.model, "random_forest");
	assert_eq!(output.tuning.results.len(), 4);
	for result in output.tuning.results.iter() {
		assert_eq!(result.folds.len(), 4);
		assert_eq!(result.metrics.as_ref().unwrap().n_folds, 4);
	}
	let best_index = output.tuning.best_index.unwrap();
	assert_eq!(
		output.tuning.results[best_index].config,
		output.best_config
	);
	assert_eq!(output.recipe.removed_columns(), vec!["region"]);
	assert_eq!(
		output.feature_names,
		vec!["size", "kind_a", "kind_b", "kind_c"]
	);
	assert!(output.test_metrics.r2 > 0.5);
	// The report serializes to json.
	let report = serde_json::to_value(&output).unwrap();
	assert_eq!(report["target_column_name"], "price");
}

#[test]
fn test_train_dataset_is_deterministic() {
	let config = config(
		r#"
split:
  k_folds: 3
  seed: 7
model: gradient_boosting
grid:
  - name: ensemble_size
    min: 10
    max: 30
    levels: 2
parallel: true
"#,
	);
	let a = train_dataset(dataset(), &config, None, &mut |_| {}).unwrap();
	let b = train_dataset(dataset(), &config, None, &mut |_| {}).unwrap();
	assert_eq!(a.best_config, b.best_config);
	assert_eq!(a.test_metrics, b.test_metrics);
}

#[test]
fn test_invalid_test_fraction() {
	let config = config("split:\n  test_fraction: 1.5\n");
	let error = train_dataset(dataset(), &config, None, &mut |_| {}).unwrap_err();
	assert!(matches!(
		error.downcast_ref::<Error>(),
		Some(Error::InvalidFraction(_))
	));
}

#[test]
fn test_unknown_strata_column() {
	let config = config("split:\n  stratify_by: color\n");
	let error = train_dataset(dataset(), &config, None, &mut |_| {}).unwrap_err();
	assert!(matches!(
		error.downcast_ref::<Error>(),
		Some(Error::UnknownColumn(_))
	));
}

#[test]
fn test_train_from_path() {
	let path = std::env::temp_dir().join(format!("quarry_train_{}.csv", std::process::id()));
	std::fs::File::create(&path)
		.unwrap()
		.write_all(csv().as_bytes())
		.unwrap();
	let config = config(
		r#"
grid:
  - name: ensemble_size
    min: 5
    max: 5
    levels: 1
parallel: false
"#,
	);
	let mut phases = Vec::new();
	let output = quarry_core::train(&path, "price", &config, None, &mut |progress| {
		phases.push(format!("{:?}", progress).split('(').next().unwrap().to_owned())
	})
	.unwrap();
	std::fs::remove_file(&path).unwrap();
	assert_eq!(output.tuning.results.len(), 1);
	assert_eq!(phases, vec!["Loading", "Tuning", "Finalizing"]);
}
