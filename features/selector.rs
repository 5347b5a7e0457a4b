use quarry_dataframe::{Column, DataFrame};

/// A `Selector` chooses the columns a recipe step applies to. Selectors are evaluated against the dataframe as it is when the step is fit, so a step that comes after one hot encoding sees the indicator columns as number columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
	AllPredictors,
	NumericPredictors,
	CategoricalPredictors,
	/// Select columns by name. Names that do not exist in the dataframe are skipped.
	Columns(Vec<String>),
}

impl Selector {
	/// Return the indexes of the selected columns, in dataframe order.
	pub fn select(&self, dataframe: &DataFrame) -> Vec<usize> {
		match self {
			Selector::AllPredictors => (0..dataframe.ncols()).collect(),
			Selector::NumericPredictors => dataframe
				.columns
				.iter()
				.enumerate()
				.filter(|(_, column)| matches!(column, Column::Number(_)))
				.map(|(index, _)| index)
				.collect(),
			Selector::CategoricalPredictors => dataframe
				.columns
				.iter()
				.enumerate()
				.filter(|(_, column)| matches!(column, Column::Enum(_)))
				.map(|(index, _)| index)
				.collect(),
			Selector::Columns(names) => {
				for name in names.iter() {
					if dataframe.column_index(name).is_none() {
						log::debug!("selected column {} does not exist, skipping it", name);
					}
				}
				dataframe
					.columns
					.iter()
					.enumerate()
					.filter(|(_, column)| names.iter().any(|name| name == column.name()))
					.map(|(index, _)| index)
					.collect()
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use quarry_dataframe::{EnumColumn, NumberColumn};

	#[test]
	fn test_select() {
		let dataframe = DataFrame::from_columns(vec![
			Column::Enum(EnumColumn::from_strings("a".to_owned(), &[Some("x")])),
			Column::Number(NumberColumn::new("b".to_owned(), vec![1.0])),
			Column::Number(NumberColumn::new("c".to_owned(), vec![2.0])),
		])
		.unwrap();
		assert_eq!(Selector::AllPredictors.select(&dataframe), vec![0, 1, 2]);
		assert_eq!(Selector::NumericPredictors.select(&dataframe), vec![1, 2]);
		assert_eq!(Selector::CategoricalPredictors.select(&dataframe), vec![0]);
		assert_eq!(
			Selector::Columns(vec!["c".to_owned(), "missing".to_owned(), "a".to_owned()])
				.select(&dataframe),
			vec![0, 2]
		);
	}
}
