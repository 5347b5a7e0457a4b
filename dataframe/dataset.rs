use crate::{Column, ColumnView, DataFrame, NumberColumn};
use quarry_util::error::{Error, Result};

/**
A `Dataset` pairs the predictor columns of a dataframe with a designated numeric target column. A `Dataset` is immutable once it is created. Subsets are created with [`take_rows`](#method.take_rows), which copies the selected rows into a new `Dataset`.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
	predictors: DataFrame,
	target: NumberColumn,
}

impl Dataset {
	/// Create a dataset from a dataframe, removing the column named `target_column_name` from the predictors and using it as the target. The target column must be a number column.
	pub fn new(mut dataframe: DataFrame, target_column_name: &str) -> Result<Dataset> {
		let target = dataframe
			.remove_column(target_column_name)
			.ok_or_else(|| Error::UnknownColumn(target_column_name.to_owned()))?;
		let target = match target {
			Column::Number(target) => target,
			Column::Enum(_) => {
				return Err(Error::InvalidTarget {
					column: target_column_name.to_owned(),
					reason: "the target must be a number column".to_owned(),
				})
			}
		};
		Self::from_parts(dataframe, target)
	}

	/// Create a dataset from predictor columns and a target column, checking that every column has the same number of rows.
	pub fn from_parts(predictors: DataFrame, target: NumberColumn) -> Result<Dataset> {
		let predictors = DataFrame::from_columns(predictors.columns)?;
		if predictors.ncols() > 0 && predictors.nrows() != target.data.len() {
			return Err(Error::ColumnLength {
				column: target.name,
				n_rows: target.data.len(),
				expected: predictors.nrows(),
			});
		}
		Ok(Dataset { predictors, target })
	}

	pub fn predictors(&self) -> &DataFrame {
		&self.predictors
	}

	pub fn target(&self) -> &NumberColumn {
		&self.target
	}

	pub fn target_column_name(&self) -> &str {
		&self.target.name
	}

	pub fn nrows(&self) -> usize {
		self.target.data.len()
	}

	/// Look up a column by name, including the target column.
	pub fn column(&self, name: &str) -> Option<ColumnView> {
		if name == self.target.name {
			Some(ColumnView::Number(self.target.view()))
		} else {
			self.predictors.column(name).map(|column| column.view())
		}
	}

	/// Check that the target has no missing values.
	pub fn validate_target(&self) -> Result<()> {
		let n_missing = self
			.target
			.data
			.iter()
			.filter(|value| !value.is_finite())
			.count();
		if n_missing > 0 {
			return Err(Error::InvalidTarget {
				column: self.target.name.clone(),
				reason: format!("{} values are missing or not finite", n_missing),
			});
		}
		Ok(())
	}

	/// Create a new dataset containing the rows at `indices`, in the order given.
	pub fn take_rows(&self, indices: &[usize]) -> Dataset {
		Dataset {
			predictors: self.predictors.take_rows(indices),
			target: NumberColumn {
				name: self.target.name.clone(),
				data: indices.iter().map(|index| self.target.data[*index]).collect(),
			},
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::EnumColumn;

	fn dataframe() -> DataFrame {
		DataFrame::from_columns(vec![
			Column::Number(NumberColumn::new("sqft".to_owned(), vec![900.0, 1200.0, 1500.0])),
			Column::Enum(EnumColumn::from_strings(
				"zip".to_owned(),
				&[Some("a"), Some("b"), Some("a")],
			)),
			Column::Number(NumberColumn::new(
				"price".to_owned(),
				vec![100.0, 150.0, 210.0],
			)),
		])
		.unwrap()
	}

	#[test]
	fn test_new_separates_the_target() {
		let dataset = Dataset::new(dataframe(), "price").unwrap();
		assert_eq!(dataset.predictors().column_names(), vec!["sqft", "zip"]);
		assert_eq!(dataset.target().data, vec![100.0, 150.0, 210.0]);
		assert!(dataset.column("price").is_some());
		assert!(dataset.column("zip").is_some());
	}

	#[test]
	fn test_new_rejects_enum_and_unknown_targets() {
		assert!(matches!(
			Dataset::new(dataframe(), "zip"),
			Err(Error::InvalidTarget { .. })
		));
		assert!(matches!(
			Dataset::new(dataframe(), "nope"),
			Err(Error::UnknownColumn(_))
		));
	}

	#[test]
	fn test_validate_target() {
		let mut dataframe = dataframe();
		if let Column::Number(column) = &mut dataframe.columns[2] {
			column.data[1] = std::f32::NAN;
		}
		let dataset = Dataset::new(dataframe, "price").unwrap();
		assert!(matches!(
			dataset.validate_target(),
			Err(Error::InvalidTarget { .. })
		));
	}

	#[test]
	fn test_take_rows() {
		let dataset = Dataset::new(dataframe(), "price").unwrap();
		let subset = dataset.take_rows(&[1]);
		assert_eq!(subset.nrows(), 1);
		assert_eq!(subset.target().data, vec![150.0]);
		assert_eq!(
			subset.predictors().column("zip").unwrap().as_enum().unwrap().value(0),
			Some("b")
		);
	}
}
