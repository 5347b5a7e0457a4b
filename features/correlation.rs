use itertools::Itertools;
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use quarry_dataframe::{Column, DataFrame};

/**
A `CorrelationFilter` removes number columns that are highly correlated with another number column.

While any remaining pair of columns has a [Pearson correlation](https://en.wikipedia.org/wiki/Pearson_correlation_coefficient) with a magnitude above `threshold`, the pair with the largest magnitude is found, and of the two, the column with the larger mean absolute correlation to the other remaining columns is removed. If both columns have the same mean absolute correlation, the one that comes later in the dataframe is removed.

Correlations are computed from the training rows where both values are present. A pair with fewer than two such rows or where either column is constant has a correlation of zero.
*/
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CorrelationFilter {
	pub threshold: f32,
	pub removed: Vec<String>,
}

impl CorrelationFilter {
	pub fn fit(dataframe: &DataFrame, column_indexes: &[usize], threshold: f32) -> CorrelationFilter {
		let columns: Vec<(&str, &[f32])> = column_indexes
			.iter()
			.filter_map(|column_index| match &dataframe.columns[*column_index] {
				Column::Number(column) => Some((column.name.as_str(), column.data.as_slice())),
				Column::Enum(column) => {
					log::debug!("skipping correlation of enum column {}", column.name);
					None
				}
			})
			.collect();
		let correlations = correlation_matrix(&columns);
		let removed = select_columns_to_remove(correlations.view(), threshold)
			.into_iter()
			.map(|index| {
				log::debug!("removing highly correlated column {}", columns[index].0);
				columns[index].0.to_owned()
			})
			.collect();
		CorrelationFilter { threshold, removed }
	}

	pub fn apply(&self, mut dataframe: DataFrame) -> DataFrame {
		dataframe
			.columns
			.retain(|column| !self.removed.iter().any(|name| name == column.name()));
		dataframe
	}
}

/// Compute the matrix of pairwise Pearson correlations between `columns`. The diagonal is one.
fn correlation_matrix(columns: &[(&str, &[f32])]) -> Array2<f32> {
	let n = columns.len();
	let mut correlations = Array2::<f32>::eye(n);
	for (i, j) in (0..n).tuple_combinations() {
		let correlation = pearson(columns[i].1, columns[j].1);
		correlations[[i, j]] = correlation;
		correlations[[j, i]] = correlation;
	}
	correlations
}

fn pearson(a: &[f32], b: &[f32]) -> f32 {
	let pairs: Vec<(f64, f64)> = a
		.iter()
		.zip(b.iter())
		.filter(|(a, b)| a.is_finite() && b.is_finite())
		.map(|(a, b)| (*a as f64, *b as f64))
		.collect();
	let n = match pairs.len().to_f64() {
		Some(n) if n >= 2.0 => n,
		_ => return 0.0,
	};
	let mean_a = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
	let mean_b = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;
	let mut covariance = 0.0;
	let mut variance_a = 0.0;
	let mut variance_b = 0.0;
	for (a, b) in pairs.iter() {
		covariance += (a - mean_a) * (b - mean_b);
		variance_a += (a - mean_a) * (a - mean_a);
		variance_b += (b - mean_b) * (b - mean_b);
	}
	if variance_a <= 0.0 || variance_b <= 0.0 {
		return 0.0;
	}
	(covariance / (variance_a.sqrt() * variance_b.sqrt())) as f32
}

/// Return the indexes of the columns to remove, in the order they are removed.
fn select_columns_to_remove(correlations: ArrayView2<f32>, threshold: f32) -> Vec<usize> {
	let n = correlations.nrows();
	let mut remaining: Vec<usize> = (0..n).collect();
	let mut removed = Vec::new();
	loop {
		let mut max_pair: Option<(usize, usize, f32)> = None;
		for (i, j) in remaining.iter().copied().tuple_combinations() {
			let magnitude = correlations[[i, j]].abs();
			if magnitude > threshold && max_pair.map(|(_, _, max)| magnitude > max).unwrap_or(true) {
				max_pair = Some((i, j, magnitude));
			}
		}
		let (i, j) = match max_pair {
			Some((i, j, _)) => (i, j),
			None => break,
		};
		let mean_absolute_correlation = |column: usize| -> f32 {
			let others = remaining.iter().filter(|other| **other != column);
			let count = others.clone().count().to_f32().unwrap_or(1.0);
			others
				.map(|other| correlations[[column, *other]].abs())
				.sum::<f32>() / count
		};
		let to_remove = if mean_absolute_correlation(i) > mean_absolute_correlation(j) {
			i
		} else {
			j
		};
		remaining.retain(|column| *column != to_remove);
		removed.push(to_remove);
	}
	removed
}

#[cfg(test)]
mod test {
	use super::*;
	use quarry_dataframe::NumberColumn;

	#[test]
	fn test_pearson() {
		assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-6);
		assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-6);
		assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), 0.0);
		// Rows with a missing value are ignored.
		assert!(
			(pearson(&[1.0, std::f32::NAN, 2.0, 3.0], &[1.0, 100.0, 2.0, 3.0]) - 1.0).abs() < 1e-6
		);
	}

	#[test]
	fn test_removes_the_column_with_the_larger_mean_absolute_correlation() {
		let correlations = array![
			[1.0, 0.95, 0.5, 0.1],
			[0.95, 1.0, 0.2, 0.1],
			[0.5, 0.2, 1.0, 0.0],
			[0.1, 0.1, 0.0, 1.0],
		];
		// Column 0 has a mean absolute correlation of 0.5167 and column 1 has 0.4167.
		assert_eq!(select_columns_to_remove(correlations.view(), 0.9), vec![0]);
	}

	#[test]
	fn test_ties_remove_the_later_column() {
		let correlations = array![[1.0, 0.99, 0.3], [0.99, 1.0, 0.3], [0.3, 0.3, 1.0]];
		assert_eq!(select_columns_to_remove(correlations.view(), 0.9), vec![1]);
	}

	#[test]
	fn test_no_remaining_pair_exceeds_the_threshold() {
		let a: Vec<f32> = (0..50).map(|i| i as f32).collect();
		let b: Vec<f32> = a.iter().map(|a| a * 2.0 + 1.0).collect();
		let c: Vec<f32> = a.iter().map(|a| -a + ((*a as usize) % 3) as f32).collect();
		let d: Vec<f32> = a.iter().map(|a| ((*a as usize * 7) % 5) as f32).collect();
		let dataframe = DataFrame::from_columns(vec![
			Column::Number(NumberColumn::new("a".to_owned(), a)),
			Column::Number(NumberColumn::new("b".to_owned(), b)),
			Column::Number(NumberColumn::new("c".to_owned(), c)),
			Column::Number(NumberColumn::new("d".to_owned(), d)),
		])
		.unwrap();
		let filter = CorrelationFilter::fit(&dataframe, &[0, 1, 2, 3], 0.9);
		let dataframe = filter.apply(dataframe);
		let columns: Vec<(&str, &[f32])> = dataframe
			.columns
			.iter()
			.map(|column| {
				let column = column.as_number().unwrap();
				(column.name.as_str(), column.data.as_slice())
			})
			.collect();
		let correlations = correlation_matrix(&columns);
		for (i, j) in (0..columns.len()).tuple_combinations() {
			assert!(correlations[[i, j]].abs() <= 0.9);
		}
		assert!(columns.iter().any(|(name, _)| *name == "d"));
		assert_eq!(filter.removed.len(), 2);
	}
}
