/*!
This module partitions the rows of a [`Dataset`](../../quarry_dataframe/struct.Dataset.html) into a train and test set, and the train set into cross validation folds. Both partitions are stratified: rows are grouped into strata by the value of a strata column, and each stratum is partitioned on its own so every subset has approximately the same distribution of the strata column.

| strata column | strata                                                             |
|---------------|--------------------------------------------------------------------|
| number        | `strata_bins` quantile bins of the present values, plus one for missing values |
| enum          | one per option, plus one for missing values                        |
*/

use num_traits::ToPrimitive;
use quarry_dataframe::{ColumnView, Dataset};
use quarry_util::{
	error::{Error, Result},
	finite::Finite,
};
use rand::{seq::SliceRandom, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct SplitOptions {
	/// The column to stratify by. If this is `None`, the target column is used.
	pub strata_column: Option<String>,
	/// The fraction of each stratum's rows that are placed in the test set.
	pub test_fraction: f32,
	pub strata_bins: usize,
	pub seed: u64,
}

/// A `Split` holds the row indexes of the train and test sets, each in ascending order.
#[derive(Clone, Debug, PartialEq)]
pub struct Split {
	pub train: Vec<usize>,
	pub test: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FoldOptions {
	/// The column to stratify by. If this is `None`, the target column is used.
	pub strata_column: Option<String>,
	/// The number of folds in each repeat.
	pub k: usize,
	/// The number of times the folds are regenerated with a different shuffle.
	pub repeats: usize,
	pub strata_bins: usize,
	pub seed: u64,
}

/// A `Fold` is one cross validation round. The indexes refer to rows of the dataset the folds were created from, and are in ascending order.
#[derive(Clone, Debug, PartialEq)]
pub struct Fold {
	pub repeat: usize,
	pub index: usize,
	pub train: Vec<usize>,
	pub validation: Vec<usize>,
}

/// A `FoldSet` holds `k` folds for each repeat, ordered by repeat and then by fold index.
#[derive(Clone, Debug, PartialEq)]
pub struct FoldSet {
	pub k: usize,
	pub repeats: usize,
	pub folds: Vec<Fold>,
}

/**
Split `dataset` into a train and test set. From each stratum, `round(test_fraction * n)` rows chosen at random are placed in the test set and the rest in the train set.

A stratum with too few rows to contribute to both sets is pooled with the strata after it, and the last pool absorbs any remainder, so small datasets are not split into an empty train or test set. If the whole dataset is still too small, this returns `Error::InsufficientRows`.
*/
pub fn split(dataset: &Dataset, options: &SplitOptions) -> Result<Split> {
	let test_fraction = options.test_fraction;
	if !(test_fraction > 0.0 && test_fraction < 1.0) {
		return Err(Error::InvalidFraction(test_fraction));
	}
	if dataset.nrows() < 2 {
		return Err(Error::InsufficientRows {
			stratum: 0,
			n_rows: dataset.nrows(),
			required: 2,
		});
	}
	let strata = compute_strata(dataset, options.strata_column.as_deref(), options.strata_bins)?;
	let strata = pool_strata(strata, min_stratum_rows(test_fraction));
	let n_strata = strata.len();
	let mut rng = Xoshiro256Plus::seed_from_u64(options.seed);
	let mut train = Vec::with_capacity(dataset.nrows());
	let mut test = Vec::new();
	for mut rows in strata {
		rows.shuffle(&mut rng);
		let n_rows = rows.len().to_f32().unwrap_or(0.0);
		let n_test = (test_fraction * n_rows).round().to_usize().unwrap_or(0);
		test.extend_from_slice(&rows[..n_test]);
		train.extend_from_slice(&rows[n_test..]);
	}
	if train.is_empty() || test.is_empty() {
		return Err(Error::InsufficientRows {
			stratum: 0,
			n_rows: dataset.nrows(),
			required: min_stratum_rows(test_fraction),
		});
	}
	train.sort_unstable();
	test.sort_unstable();
	log::debug!(
		"split {} rows in {} strata into {} train rows and {} test rows",
		dataset.nrows(),
		n_strata,
		train.len(),
		test.len(),
	);
	Ok(Split { train, test })
}

impl Split {
	/// Create the train and test datasets.
	pub fn datasets(&self, dataset: &Dataset) -> (Dataset, Dataset) {
		(dataset.take_rows(&self.train), dataset.take_rows(&self.test))
	}
}

/// Partition the rows of `train` into `k` stratified folds, `repeats` times. In each repeat, the rows of each stratum are shuffled and dealt to the folds in turn. The turn carries over from one stratum to the next, so fold sizes differ by at most one.
pub fn fold(train: &Dataset, options: &FoldOptions) -> Result<FoldSet> {
	let k = options.k;
	if k < 2 {
		return Err(Error::ConfigOutOfRange {
			name: "k_folds".to_owned(),
			value: k.to_f64().unwrap_or(0.0),
			min: 2.0,
			max: train.nrows().to_f64().unwrap_or(0.0),
		});
	}
	if options.repeats < 1 {
		return Err(Error::ConfigOutOfRange {
			name: "repeats".to_owned(),
			value: 0.0,
			min: 1.0,
			max: std::f64::INFINITY,
		});
	}
	let strata = compute_strata(train, options.strata_column.as_deref(), options.strata_bins)?;
	if let Some((stratum, rows)) = strata.iter().find(|(_, rows)| rows.len() < k) {
		return Err(Error::InsufficientRows {
			stratum: *stratum,
			n_rows: rows.len(),
			required: k,
		});
	}
	let mut folds = Vec::with_capacity(k * options.repeats);
	for repeat in 0..options.repeats {
		let seed = options
			.seed
			.wrapping_add(repeat.to_u64().unwrap_or(0));
		let mut rng = Xoshiro256Plus::seed_from_u64(seed);
		let mut assignments = vec![0; train.nrows()];
		let mut position = 0;
		for rows in strata.values() {
			let mut rows = rows.clone();
			rows.shuffle(&mut rng);
			for row in rows {
				assignments[row] = position % k;
				position += 1;
			}
		}
		for index in 0..k {
			let (validation, train): (Vec<usize>, Vec<usize>) =
				(0..assignments.len()).partition(|row| assignments[*row] == index);
			folds.push(Fold {
				repeat,
				index,
				train,
				validation,
			});
		}
	}
	Ok(FoldSet {
		k,
		repeats: options.repeats,
		folds,
	})
}

/// The smallest number of rows for which `round(test_fraction * n)` is at least one and less than `n`.
fn min_stratum_rows(test_fraction: f32) -> usize {
	let smaller = test_fraction.min(1.0 - test_fraction);
	(1.0 / smaller).ceil().to_usize().unwrap_or(usize::MAX).max(2)
}

/// Merge consecutive strata until each pool has at least `min_rows` rows. A final pool smaller than `min_rows` is merged into the one before it.
fn pool_strata(strata: BTreeMap<usize, Vec<usize>>, min_rows: usize) -> Vec<Vec<usize>> {
	let mut pools: Vec<Vec<usize>> = Vec::new();
	let mut current: Vec<usize> = Vec::new();
	for rows in strata.into_iter().map(|(_, rows)| rows) {
		current.extend(rows);
		if current.len() >= min_rows {
			pools.push(std::mem::take(&mut current));
		}
	}
	if !current.is_empty() {
		match pools.last_mut() {
			Some(last) => last.extend(current),
			None => pools.push(current),
		}
	}
	pools
}

/// Group the rows of `dataset` by stratum. The map is keyed by stratum id and each group lists its rows in ascending order.
pub fn compute_strata(
	dataset: &Dataset,
	strata_column: Option<&str>,
	strata_bins: usize,
) -> Result<BTreeMap<usize, Vec<usize>>> {
	let column_name = strata_column.unwrap_or_else(|| dataset.target_column_name());
	let column = dataset
		.column(column_name)
		.ok_or_else(|| Error::UnknownColumn(column_name.to_owned()))?;
	let stratum_ids = match column {
		ColumnView::Number(column) => quantile_bins(column.data, strata_bins),
		ColumnView::Enum(column) => column
			.data
			.iter()
			.map(|value| value.map(|value| value.get()).unwrap_or(0))
			.collect(),
	};
	let mut strata: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
	for (row, stratum) in stratum_ids.into_iter().enumerate() {
		strata.entry(stratum).or_default().push(row);
	}
	Ok(strata)
}

/// Assign each value to one of `n_bins` bins holding approximately equal numbers of values. Equal values are always assigned to the same bin. Values that are not finite are assigned to bin `n_bins`.
fn quantile_bins(values: &[f32], n_bins: usize) -> Vec<usize> {
	let mut sorted: Vec<(Finite<f32>, usize)> = values
		.iter()
		.enumerate()
		.filter_map(|(row, value)| Finite::new(*value).ok().map(|value| (value, row)))
		.collect();
	sorted.sort();
	let n_bins = n_bins.max(1);
	let n_values = sorted.len();
	let mut bins = vec![n_bins; values.len()];
	let mut previous: Option<(Finite<f32>, usize)> = None;
	for (position, (value, row)) in sorted.into_iter().enumerate() {
		let bin = match previous {
			Some((previous_value, previous_bin)) if previous_value == value => previous_bin,
			_ => position * n_bins / n_values,
		};
		bins[row] = bin;
		previous = Some((value, bin));
	}
	bins
}
