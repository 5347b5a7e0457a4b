use super::*;
use anyhow::{format_err, Result};
use fnv::FnvHashMap;
use std::{
	collections::{BTreeMap, BTreeSet},
	path::Path,
};

#[derive(Clone)]
pub struct FromCsvOptions<'a> {
	/// Column types given here are used as is. Columns not listed here have their types inferred.
	pub column_types: Option<BTreeMap<String, ColumnType>>,
	pub invalid_values: &'a [&'a str],
}

impl<'a> Default for FromCsvOptions<'a> {
	fn default() -> Self {
		Self {
			column_types: None,
			invalid_values: DEFAULT_INVALID_VALUES,
		}
	}
}

/// These values are the default values that are considered invalid.
const DEFAULT_INVALID_VALUES: &[&str] = &[
	"", "null", "NULL", "n/a", "N/A", "nan", "-nan", "NaN", "-NaN", "?", "NA",
];

impl DataFrame {
	pub fn from_path(path: &Path, options: FromCsvOptions, progress: impl Fn(u64)) -> Result<Self> {
		Self::from_csv(&mut csv::Reader::from_path(path)?, options, progress)
	}

	pub fn from_csv<R>(
		reader: &mut csv::Reader<R>,
		options: FromCsvOptions,
		progress: impl Fn(u64),
	) -> Result<Self>
	where
		R: std::io::Read + std::io::Seek,
	{
		let column_names: Vec<String> = reader
			.headers()?
			.into_iter()
			.map(|column_name| column_name.to_owned())
			.collect();
		let start_position = reader.position().clone();
		let invalid_values = options.invalid_values;

		// Retrieve any column types present in the options. The remaining columns get infer stats.
		let mut column_types: Vec<ColumnTypeOrInferStats> = column_names
			.iter()
			.map(|column_name| {
				options
					.column_types
					.as_ref()
					.and_then(|column_types| column_types.get(column_name))
					.map(|column_type| ColumnTypeOrInferStats::ColumnType(column_type.clone()))
					.unwrap_or_else(|| {
						ColumnTypeOrInferStats::InferStats(InferStats::new(invalid_values))
					})
			})
			.collect();

		// Passing over the csv to infer column types is only necessary if one or more columns did not have its type specified.
		let needs_infer = column_types.iter().any(|column_type| match column_type {
			ColumnTypeOrInferStats::ColumnType(_) => false,
			ColumnTypeOrInferStats::InferStats(_) => true,
		});
		let mut n_rows = None;
		if needs_infer {
			let mut record = csv::StringRecord::new();
			let mut n_rows_computed = 0;
			while reader.read_record(&mut record)? {
				n_rows_computed += 1;
				for (column_type, value) in column_types.iter_mut().zip(record.iter()) {
					if let ColumnTypeOrInferStats::InferStats(infer_stats) = column_type {
						infer_stats.update(value);
					}
				}
			}
			n_rows = Some(n_rows_computed);
			// After inference, return back to the beginning of the csv to load the values.
			reader.seek(start_position)?;
		}
		let column_types: Vec<ColumnType> = column_types
			.into_iter()
			.map(|column_type| match column_type {
				ColumnTypeOrInferStats::ColumnType(column_type) => column_type,
				ColumnTypeOrInferStats::InferStats(infer_stats) => infer_stats.finalize(),
			})
			.collect();

		// Create the dataframe and a lookup from option to index for each enum column.
		let mut dataframe = Self::new(column_names, column_types);
		let option_indexes: Vec<Option<FnvHashMap<String, NonZeroUsize>>> = dataframe
			.columns
			.iter()
			.map(|column| match column {
				Column::Number(_) => None,
				Column::Enum(column) => Some(
					column
						.options
						.iter()
						.enumerate()
						.filter_map(|(index, option)| {
							NonZeroUsize::new(index + 1).map(|value| (option.clone(), value))
						})
						.collect(),
				),
			})
			.collect();
		// If an inference pass was done, reserve storage for the values because we know how many rows are in the csv.
		if let Some(n_rows) = n_rows {
			for column in dataframe.columns.iter_mut() {
				match column {
					Column::Number(column) => column.data.reserve_exact(n_rows),
					Column::Enum(column) => column.data.reserve_exact(n_rows),
				}
			}
		}

		// Read each csv record and insert the values into the columns of the dataframe.
		let mut record = csv::ByteRecord::new();
		while reader.read_byte_record(&mut record)? {
			if let Some(position) = record.position() {
				progress(position.byte());
			}
			if record.len() != dataframe.ncols() {
				return Err(format_err!(
					"expected {} values in the record on line {} but found {}",
					dataframe.ncols(),
					record.position().map(|position| position.line()).unwrap_or(0),
					record.len(),
				));
			}
			for ((column, option_index), value) in dataframe
				.columns
				.iter_mut()
				.zip(option_indexes.iter())
				.zip(record.iter())
			{
				match (column, option_index) {
					(Column::Number(column), _) => {
						let value = match lexical::parse::<f32, &[u8]>(value) {
							Ok(value) if value.is_finite() => value,
							_ => std::f32::NAN,
						};
						column.data.push(value);
					}
					(Column::Enum(column), Some(option_index)) => {
						let value = std::str::from_utf8(value)
							.ok()
							.and_then(|value| option_index.get(value).cloned());
						column.data.push(value);
					}
					(Column::Enum(column), None) => column.data.push(None),
				}
			}
		}
		Ok(dataframe)
	}
}

#[derive(Clone, Debug)]
enum ColumnTypeOrInferStats<'a> {
	ColumnType(ColumnType),
	InferStats(InferStats<'a>),
}

/// `InferStats` accumulates what is needed to infer a column's type from its values. A column is a number column if every valid value parses as a finite number, otherwise it is an enum column whose options are its distinct valid values.
#[derive(Clone, Debug)]
pub struct InferStats<'a> {
	invalid_values: &'a [&'a str],
	all_numbers: bool,
	unique_values: BTreeSet<String>,
}

impl<'a> InferStats<'a> {
	pub fn new(invalid_values: &'a [&'a str]) -> Self {
		Self {
			invalid_values,
			all_numbers: true,
			unique_values: BTreeSet::new(),
		}
	}

	pub fn update(&mut self, value: &str) {
		if self.invalid_values.contains(&value) {
			return;
		}
		if !self.unique_values.contains(value) {
			self.unique_values.insert(value.to_owned());
		}
		if self.all_numbers
			&& !lexical::parse::<f32, &str>(value)
				.map(|value| value.is_finite())
				.unwrap_or(false)
		{
			self.all_numbers = false;
		}
	}

	pub fn finalize(self) -> ColumnType {
		if self.all_numbers {
			ColumnType::Number
		} else {
			ColumnType::Enum {
				options: self.unique_values.into_iter().collect(),
			}
		}
	}
}

#[test]
fn test_infer() {
	let csv = r#"number,enum
1,test
2,
NA,other
"#;
	let df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions::default(),
		|_| {},
	)
	.unwrap();
	insta::assert_debug_snapshot!(df, @r###"
 DataFrame {
     columns: [
         Number(
             NumberColumn {
                 name: "number",
                 data: [
                     1.0,
                     2.0,
                     NaN,
                 ],
             },
         ),
         Enum(
             EnumColumn {
                 name: "enum",
                 options: [
                     "other",
                     "test",
                 ],
                 data: [
                     Some(
                         2,
                     ),
                     None,
                     Some(
                         1,
                     ),
                 ],
             },
         ),
     ],
 }
 "###);
}

#[test]
fn test_column_types() {
	let csv = r#"number,enum
1,hello
2,world
"#;
	let mut column_types = BTreeMap::new();
	column_types.insert(
		"enum".to_owned(),
		ColumnType::Enum {
			options: vec!["world".to_owned()],
		},
	);
	let df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions {
			column_types: Some(column_types),
			..Default::default()
		},
		|_| {},
	)
	.unwrap();
	let column = df.column("enum").unwrap().as_enum().unwrap();
	assert_eq!(column.value(0), None);
	assert_eq!(column.value(1), Some("world"));
	assert_eq!(
		df.column("number").unwrap().as_number().unwrap().data,
		vec![1.0, 2.0]
	);
}
