use quarry_dataframe::{Column, DataFrame, EnumColumn, NumberColumn};

/**
A `OneHotEncodedColumn` replaces an enum column with one indicator column for each option that appeared in the training data. The indicator columns are named `<column>_<option>`.

# Example

Training values: `["red", "green", "red"]`

| dataframe value | color_green | color_red |
|-----------------|-------------|-----------|
| "red"           | 0           | 1         |
| "green"         | 1           | 0         |
| "blue"          | 0           | 0         |
| missing         | 0           | 0         |

Options that were not seen during training and missing values produce a row of all zeros.
*/
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OneHotEncodedColumn {
	pub column_name: String,
	pub vocabulary: Vec<String>,
}

/// Fit a `OneHotEncodedColumn` for each selected enum column. Number columns are skipped.
pub fn fit(dataframe: &DataFrame, column_indexes: &[usize]) -> Vec<OneHotEncodedColumn> {
	column_indexes
		.iter()
		.filter_map(|column_index| match &dataframe.columns[*column_index] {
			Column::Enum(column) => Some(OneHotEncodedColumn::fit(column)),
			Column::Number(column) => {
				log::debug!("skipping one hot encoding of number column {}", column.name);
				None
			}
		})
		.collect()
}

impl OneHotEncodedColumn {
	fn fit(column: &EnumColumn) -> OneHotEncodedColumn {
		let mut seen = vec![false; column.options.len()];
		for value in column.data.iter().flatten() {
			seen[value.get() - 1] = true;
		}
		let vocabulary = column
			.options
			.iter()
			.zip(seen.iter())
			.filter(|(_, seen)| **seen)
			.map(|(option, _)| option.clone())
			.collect();
		OneHotEncodedColumn {
			column_name: column.name.clone(),
			vocabulary,
		}
	}

	pub fn feature_names(&self) -> Vec<String> {
		self.vocabulary
			.iter()
			.map(|option| format!("{}_{}", self.column_name, option))
			.collect()
	}

	/// Replace the enum column with its indicator columns at the same position. Does nothing if the column is not present or is not an enum column.
	pub fn apply(&self, dataframe: &mut DataFrame) {
		let column_index = match dataframe.column_index(&self.column_name) {
			Some(column_index) => column_index,
			None => return,
		};
		let column = match &dataframe.columns[column_index] {
			Column::Enum(column) => column,
			Column::Number(_) => return,
		};
		// The options of the column being transformed may differ from the training options, so match by option string.
		let option_to_vocabulary_index: Vec<Option<usize>> = column
			.options
			.iter()
			.map(|option| self.vocabulary.iter().position(|entry| entry == option))
			.collect();
		let mut indicators: Vec<Vec<f32>> = vec![vec![0.0; column.data.len()]; self.vocabulary.len()];
		for (row, value) in column.data.iter().enumerate() {
			if let Some(index) = value.and_then(|value| option_to_vocabulary_index[value.get() - 1]) {
				indicators[index][row] = 1.0;
			}
		}
		let indicator_columns = self
			.feature_names()
			.into_iter()
			.zip(indicators.into_iter())
			.map(|(name, data)| Column::Number(NumberColumn::new(name, data)));
		dataframe
			.columns
			.splice(column_index..=column_index, indicator_columns);
	}
}
