use ndarray::prelude::*;

/// A `Table` displays a header and rows of string values as a markdown table, padding each column to the width of its widest value.
pub struct Table {
	padding: usize,
	header: Vec<String>,
	values: Array2<String>,
}

impl Table {
	/// Create a table. Every row must have as many values as the header, missing values are displayed as empty cells.
	pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Table {
		let n_columns = header.len();
		let mut values = Array2::from_elem((rows.len(), n_columns), String::new());
		for (mut table_row, row) in values.genrows_mut().into_iter().zip(rows.into_iter()) {
			for (cell, value) in table_row.iter_mut().zip(row.into_iter()) {
				*cell = value;
			}
		}
		Table {
			padding: 1,
			header,
			values,
		}
	}
}

impl std::fmt::Display for Table {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		// Start with the header widths, then widen each column to fit its values.
		let mut column_widths: Vec<usize> = self.header.iter().map(|header| header.len()).collect();
		for (column_width, column) in column_widths
			.iter_mut()
			.zip(self.values.axis_iter(Axis(1)))
		{
			for value in column.iter() {
				*column_width = usize::max(*column_width, value.len());
			}
		}
		let row = Row {
			column_widths: &column_widths,
			padding: self.padding,
			values: self.header.iter().map(|value| value.as_str()),
		};
		writeln!(f, "{}", row)?;
		let line = Line {
			column_widths: &column_widths,
			padding: self.padding,
		};
		writeln!(f, "{}", line)?;
		for values in self.values.genrows() {
			let row = Row {
				column_widths: &column_widths,
				padding: self.padding,
				values: values.iter().map(|value| value.as_str()),
			};
			writeln!(f, "{}", row)?;
		}
		Ok(())
	}
}

struct Line<'a> {
	column_widths: &'a [usize],
	padding: usize,
}

impl<'a> std::fmt::Display for Line<'a> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "|")?;
		for column_width in self.column_widths.iter() {
			for _ in 0..column_width + 2 * self.padding {
				write!(f, "-")?;
			}
			write!(f, "|")?;
		}
		Ok(())
	}
}

struct Row<'a, I>
where
	I: Iterator<Item = &'a str> + Clone,
{
	column_widths: &'a [usize],
	padding: usize,
	values: I,
}

impl<'a, I> std::fmt::Display for Row<'a, I>
where
	I: Iterator<Item = &'a str> + Clone,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "|")?;
		for (column_width, value) in self.column_widths.iter().zip(self.values.clone()) {
			write!(
				f,
				"{:pad$}{:width$}{:pad$}|",
				"",
				value,
				"",
				pad = self.padding,
				width = column_width
			)?;
		}
		Ok(())
	}
}

#[test]
fn test_table() {
	let table = Table::new(
		vec!["name".to_owned(), "value".to_owned()],
		vec![
			vec!["rmse".to_owned(), "1.5".to_owned()],
			vec!["r2".to_owned(), "0.25".to_owned()],
		],
	);
	let expected = "| name | value |\n|------|-------|\n| rmse | 1.5   |\n| r2   | 0.25  |\n";
	assert_eq!(table.to_string(), expected);
}
