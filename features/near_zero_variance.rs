use fnv::FnvHashMap;
use num_traits::ToPrimitive;
use quarry_dataframe::{Column, DataFrame};
use quarry_util::finite::Finite;

/// A `NearZeroVarianceFilter` removes columns where a single value takes up more than `max_most_frequent_fraction` of the training rows. Missing values count as a value of their own.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NearZeroVarianceFilter {
	pub max_most_frequent_fraction: f32,
	pub removed: Vec<String>,
}

impl NearZeroVarianceFilter {
	pub fn fit(
		dataframe: &DataFrame,
		column_indexes: &[usize],
		max_most_frequent_fraction: f32,
	) -> NearZeroVarianceFilter {
		let removed = column_indexes
			.iter()
			.map(|column_index| &dataframe.columns[*column_index])
			.filter(|column| {
				let fraction = most_frequent_fraction(column);
				if fraction > max_most_frequent_fraction {
					log::debug!(
						"removing column {} because its most frequent value takes up {} of the rows",
						column.name(),
						fraction,
					);
					true
				} else {
					false
				}
			})
			.map(|column| column.name().to_owned())
			.collect();
		NearZeroVarianceFilter {
			max_most_frequent_fraction,
			removed,
		}
	}

	pub fn apply(&self, mut dataframe: DataFrame) -> DataFrame {
		dataframe
			.columns
			.retain(|column| !self.removed.iter().any(|name| name == column.name()));
		dataframe
	}
}

/// Compute the fraction of values in `column` that are equal to its most frequent value. An empty column has a fraction of zero.
fn most_frequent_fraction(column: &Column) -> f32 {
	let n = column.len();
	if n == 0 {
		return 0.0;
	}
	let max_count = match column {
		Column::Number(column) => {
			let mut counts: FnvHashMap<Option<Finite<f32>>, usize> = FnvHashMap::default();
			for value in column.data.iter() {
				*counts.entry(Finite::new(*value).ok()).or_insert(0) += 1;
			}
			counts.values().copied().max().unwrap_or(0)
		}
		Column::Enum(column) => {
			let mut counts: FnvHashMap<Option<usize>, usize> = FnvHashMap::default();
			for value in column.data.iter() {
				*counts.entry(value.map(|value| value.get())).or_insert(0) += 1;
			}
			counts.values().copied().max().unwrap_or(0)
		}
	};
	max_count.to_f32().unwrap_or(0.0) / n.to_f32().unwrap_or(1.0)
}

#[cfg(test)]
mod test {
	use super::*;
	use quarry_dataframe::{EnumColumn, NumberColumn};

	#[test]
	fn test_near_zero_variance() {
		let mut mostly_zero = vec![0.0; 20];
		mostly_zero[3] = 1.0;
		let mut mostly_missing = vec![std::f32::NAN; 20];
		mostly_missing[0] = 1.0;
		let mut varied = vec![0.0; 20];
		varied[0] = 1.0;
		varied[1] = 2.0;
		let dataframe = DataFrame::from_columns(vec![
			Column::Number(NumberColumn::new("mostly_zero".to_owned(), mostly_zero)),
			Column::Number(NumberColumn::new("mostly_missing".to_owned(), mostly_missing)),
			Column::Number(NumberColumn::new("varied".to_owned(), varied)),
			Column::Enum(EnumColumn::from_strings(
				"single".to_owned(),
				&[Some("a"); 20],
			)),
		])
		.unwrap();
		let filter = NearZeroVarianceFilter::fit(&dataframe, &[0, 1, 2, 3], 0.9);
		// `varied` has a most frequent fraction of exactly 0.9, which is kept.
		assert_eq!(filter.removed, vec!["mostly_zero", "mostly_missing", "single"]);
		let dataframe = filter.apply(dataframe);
		assert_eq!(dataframe.column_names(), vec!["varied"]);
	}
}
