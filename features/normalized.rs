use quarry_dataframe::{Column, DataFrame};
use quarry_metrics::MeanVariance;
use quarry_util::error::{Error, Result};

/**
A `NormalizedColumn` transforms a number column to zero mean and unit variance using the mean and standard deviation of the training data. [Learn more](https://en.wikipedia.org/wiki/Feature_scaling#Standardization_(Z-score_Normalization).

# Example

Training values: `[0.0, 5.2, 1.3, 10.0]`

Mean: 4.125

Standard Deviation: 3.89447

`feature_value = (value - mean) / std`

| dataframe value | feature value                        |
|-----------------|--------------------------------------|
| 0.0             | (0.0 - 4.125) / 3.89447 = -1.05919   |
| 5.2             | (5.2 - 4.125) / 3.89447 = 0.27603    |
| NaN             | 0.0                                  |

Missing values map to `0.0`, which is the normalized training mean.
*/
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NormalizedColumn {
	pub column_name: String,
	pub mean: f32,
	pub std: f32,
}

/// Fit a `NormalizedColumn` for each selected number column. Enum columns are skipped.
pub fn fit(dataframe: &DataFrame, column_indexes: &[usize]) -> Result<Vec<NormalizedColumn>> {
	let mut columns = Vec::new();
	for column_index in column_indexes.iter() {
		let column = match &dataframe.columns[*column_index] {
			Column::Number(column) => column,
			Column::Enum(column) => {
				log::debug!("skipping normalization of enum column {}", column.name);
				continue;
			}
		};
		let mean_variance = MeanVariance::compute(&column.data);
		let std = mean_variance.std();
		if mean_variance.n == 0 || !std.is_finite() || std == 0.0 {
			return Err(Error::ZeroVariance(column.name.clone()));
		}
		columns.push(NormalizedColumn {
			column_name: column.name.clone(),
			mean: mean_variance.mean,
			std,
		});
	}
	Ok(columns)
}

impl NormalizedColumn {
	pub fn normalize(&self, value: f32) -> f32 {
		if value.is_finite() {
			(value - self.mean) / self.std
		} else {
			0.0
		}
	}

	/// Replace the values of the column in place. Does nothing if the column is not present or is not a number column.
	pub fn apply(&self, dataframe: &mut DataFrame) {
		let column = dataframe
			.columns
			.iter_mut()
			.find(|column| column.name() == self.column_name);
		if let Some(Column::Number(column)) = column {
			for value in column.data.iter_mut() {
				*value = self.normalize(*value);
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use quarry_dataframe::NumberColumn;

	#[test]
	fn test_normalize() {
		let mut dataframe = DataFrame::from_columns(vec![Column::Number(NumberColumn::new(
			"values".to_owned(),
			vec![0.0, 5.2, 1.3, 10.0],
		))])
		.unwrap();
		let columns = fit(&dataframe, &[0]).unwrap();
		assert!((columns[0].mean - 4.125).abs() < 1e-5);
		assert!((columns[0].std - 3.894_467).abs() < 1e-4);
		let mut test = DataFrame::from_columns(vec![Column::Number(NumberColumn::new(
			"values".to_owned(),
			vec![4.125, std::f32::NAN],
		))])
		.unwrap();
		columns[0].apply(&mut test);
		assert_eq!(test.columns[0].as_number().unwrap().data, vec![0.0, 0.0]);
		columns[0].apply(&mut dataframe);
		let normalized = &dataframe.columns[0].as_number().unwrap().data;
		assert!((normalized[0] + 1.059_195).abs() < 1e-4);
	}

	#[test]
	fn test_zero_variance() {
		let dataframe = DataFrame::from_columns(vec![Column::Number(NumberColumn::new(
			"same".to_owned(),
			vec![2.0, 2.0, 2.0],
		))])
		.unwrap();
		assert!(matches!(fit(&dataframe, &[0]), Err(Error::ZeroVariance(_))));
	}
}
