/*!
This crate provides a basic implementation of dataframes, which are two dimensional arrays of data where each column can have a different data type, like a spreadsheet. It only implements what quarry needs: number and enum columns, loading from csv, taking subsets of rows, and the [`Dataset`](struct.Dataset.html) type that pairs predictor columns with a numeric target.
*/

#![allow(clippy::tabs_in_doc_comments)]

use num_traits::ToPrimitive;
use quarry_util::error::{Error, Result};
use std::num::NonZeroUsize;

mod dataset;
mod load;

pub use self::dataset::Dataset;
pub use self::load::*;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
	pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
	Number(NumberColumn),
	Enum(EnumColumn),
}

/// A `NumberColumn` holds `f32` values. Missing values are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumn {
	pub name: String,
	pub data: Vec<f32>,
}

/**
An `EnumColumn` holds categorical values. Each value is stored as the one-based index of its option, and missing values are stored as `None`.

| value       | stored as |
|-------------|-----------|
| "INVALID!"  | None      |
| "red"       | Some(1)   |
| "green"     | Some(2)   |
| "blue"      | Some(3)   |
*/
#[derive(Debug, Clone, PartialEq)]
pub struct EnumColumn {
	pub name: String,
	pub options: Vec<String>,
	pub data: Vec<Option<NonZeroUsize>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnView<'a> {
	Number(NumberColumnView<'a>),
	Enum(EnumColumnView<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberColumnView<'a> {
	pub name: &'a str,
	pub data: &'a [f32],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumColumnView<'a> {
	pub name: &'a str,
	pub options: &'a [String],
	pub data: &'a [Option<NonZeroUsize>],
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
	Number,
	Enum { options: Vec<String> },
}

impl DataFrame {
	pub fn new(column_names: Vec<String>, column_types: Vec<ColumnType>) -> Self {
		let columns = column_names
			.into_iter()
			.zip(column_types.into_iter())
			.map(|(column_name, column_type)| match column_type {
				ColumnType::Number => Column::Number(NumberColumn::new(column_name, Vec::new())),
				ColumnType::Enum { options } => {
					Column::Enum(EnumColumn::new(column_name, options, Vec::new()))
				}
			})
			.collect();
		Self { columns }
	}

	/// Create a dataframe from columns, checking that every column has the same number of rows.
	pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
		let expected = columns.first().map(|column| column.len()).unwrap_or(0);
		for column in columns.iter() {
			if column.len() != expected {
				return Err(Error::ColumnLength {
					column: column.name().to_owned(),
					n_rows: column.len(),
					expected,
				});
			}
		}
		Ok(Self { columns })
	}

	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	pub fn column_names(&self) -> Vec<&str> {
		self.columns.iter().map(|column| column.name()).collect()
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.columns.iter().position(|column| column.name() == name)
	}

	pub fn column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|column| column.name() == name)
	}

	/// Remove the column with the name `name`, returning it if it existed.
	pub fn remove_column(&mut self, name: &str) -> Option<Column> {
		let index = self.column_index(name)?;
		Some(self.columns.remove(index))
	}

	/// Create a new dataframe containing the rows at `indices`, in the order given.
	pub fn take_rows(&self, indices: &[usize]) -> DataFrame {
		let columns = self
			.columns
			.iter()
			.map(|column| column.take_rows(indices))
			.collect();
		DataFrame { columns }
	}
}

impl Column {
	pub fn len(&self) -> usize {
		match self {
			Self::Number(s) => s.data.len(),
			Self::Enum(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Number(s) => s.name.as_str(),
			Self::Enum(s) => s.name.as_str(),
		}
	}

	pub fn as_number(&self) -> Option<&NumberColumn> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<&EnumColumn> {
		match self {
			Self::Enum(s) => Some(s),
			_ => None,
		}
	}

	pub fn view(&self) -> ColumnView {
		match self {
			Self::Number(column) => ColumnView::Number(column.view()),
			Self::Enum(column) => ColumnView::Enum(column.view()),
		}
	}

	pub fn take_rows(&self, indices: &[usize]) -> Column {
		match self {
			Self::Number(column) => Column::Number(NumberColumn {
				name: column.name.clone(),
				data: indices.iter().map(|index| column.data[*index]).collect(),
			}),
			Self::Enum(column) => Column::Enum(EnumColumn {
				name: column.name.clone(),
				options: column.options.clone(),
				data: indices.iter().map(|index| column.data[*index]).collect(),
			}),
		}
	}
}

impl NumberColumn {
	pub fn new(name: String, data: Vec<f32>) -> Self {
		Self { name, data }
	}

	pub fn view(&self) -> NumberColumnView {
		NumberColumnView {
			name: &self.name,
			data: &self.data,
		}
	}
}

impl EnumColumn {
	pub fn new(name: String, options: Vec<String>, data: Vec<Option<NonZeroUsize>>) -> Self {
		Self {
			name,
			options,
			data,
		}
	}

	/// Create an enum column from string values. The options are the distinct values in sorted order and `None` values are missing.
	pub fn from_strings(name: String, values: &[Option<&str>]) -> Self {
		let mut options: Vec<String> = values
			.iter()
			.filter_map(|value| value.map(|value| value.to_owned()))
			.collect();
		options.sort();
		options.dedup();
		let data = values
			.iter()
			.map(|value| {
				value.and_then(|value| {
					options
						.binary_search_by(|option| option.as_str().cmp(value))
						.ok()
						.and_then(|index| NonZeroUsize::new(index + 1))
				})
			})
			.collect();
		Self {
			name,
			options,
			data,
		}
	}

	pub fn view(&self) -> EnumColumnView {
		EnumColumnView {
			name: &self.name,
			options: &self.options,
			data: &self.data,
		}
	}

	/// Return the option for the value at `index`, or `None` if it is missing.
	pub fn value(&self, index: usize) -> Option<&str> {
		self.view().value(index)
	}
}

impl<'a> ColumnView<'a> {
	pub fn len(&self) -> usize {
		match self {
			Self::Number(s) => s.data.len(),
			Self::Enum(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn name(&self) -> &'a str {
		match self {
			Self::Number(s) => s.name,
			Self::Enum(s) => s.name,
		}
	}

	pub fn as_number(&self) -> Option<NumberColumnView<'a>> {
		match self {
			Self::Number(s) => Some(*s),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<EnumColumnView<'a>> {
		match self {
			Self::Enum(s) => Some(*s),
			_ => None,
		}
	}

	/// Return the values of this column as `f32`s. Enum values are converted to their one-based option index, with missing values as `0.0`.
	pub fn to_f32_vec(&self) -> Vec<f32> {
		match self {
			Self::Number(column) => column.data.to_owned(),
			Self::Enum(column) => column
				.data
				.iter()
				.map(|value| {
					value
						.and_then(|value| value.get().to_f32())
						.unwrap_or(0.0)
				})
				.collect(),
		}
	}
}

impl<'a> EnumColumnView<'a> {
	pub fn value(&self, index: usize) -> Option<&'a str> {
		let options = self.options;
		self.data[index].map(|value| options[value.get() - 1].as_str())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_take_rows() {
		let dataframe = DataFrame::from_columns(vec![
			Column::Number(NumberColumn::new("a".to_owned(), vec![1.0, 2.0, 3.0])),
			Column::Enum(EnumColumn::from_strings(
				"b".to_owned(),
				&[Some("x"), None, Some("y")],
			)),
		])
		.unwrap();
		let taken = dataframe.take_rows(&[2, 0]);
		assert_eq!(taken.nrows(), 2);
		assert_eq!(taken.column("a").unwrap().as_number().unwrap().data, vec![3.0, 1.0]);
		let b = taken.column("b").unwrap().as_enum().unwrap();
		assert_eq!(b.value(0), Some("y"));
		assert_eq!(b.value(1), Some("x"));
	}

	#[test]
	fn test_from_columns_rejects_ragged_columns() {
		let result = DataFrame::from_columns(vec![
			Column::Number(NumberColumn::new("a".to_owned(), vec![1.0, 2.0])),
			Column::Number(NumberColumn::new("b".to_owned(), vec![1.0])),
		]);
		assert!(matches!(result, Err(Error::ColumnLength { n_rows: 1, .. })));
	}

	#[test]
	fn test_enum_from_strings() {
		let column = EnumColumn::from_strings(
			"color".to_owned(),
			&[Some("red"), Some("blue"), None, Some("red")],
		);
		insta::assert_debug_snapshot!(column, @r###"
  EnumColumn {
      name: "color",
      options: [
          "blue",
          "red",
      ],
      data: [
          Some(
              2,
          ),
          Some(
              1,
          ),
          None,
          Some(
              2,
          ),
      ],
  }
  "###);
	}
}
