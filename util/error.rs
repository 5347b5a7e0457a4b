/*!
This module defines the `Error` type returned by fallible operations across the quarry crates.
*/

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
	/// The requested test fraction was not strictly between zero and one.
	#[error("the test fraction must be strictly between 0 and 1, but it was {0}")]
	InvalidFraction(f32),
	/// A stratum has too few rows to be partitioned as requested.
	#[error("stratum {stratum} has {n_rows} rows, but at least {required} are required")]
	InsufficientRows {
		stratum: usize,
		n_rows: usize,
		required: usize,
	},
	/// A column selected for normalization has a standard deviation of zero in the training data.
	#[error("column \"{0}\" has zero variance in the training data")]
	ZeroVariance(String),
	#[error("there are {predictions} predictions but {labels} labels")]
	ShapeMismatch { predictions: usize, labels: usize },
	#[error("column \"{column}\" has {n_rows} rows, but the dataframe has {expected}")]
	ColumnLength {
		column: String,
		n_rows: usize,
		expected: usize,
	},
	#[error("did not find a column named \"{0}\"")]
	UnknownColumn(String),
	/// A hyperparameter or option value fell outside of its declared bounds.
	#[error("{name} = {value} is outside of the valid range [{min}, {max}]")]
	ConfigOutOfRange {
		name: String,
		value: f64,
		min: f64,
		max: f64,
	},
	#[error("model {model} does not have a hyperparameter named {name}")]
	UnknownHyperparameter { model: String, name: String },
	#[error("invalid target column \"{column}\": {reason}")]
	InvalidTarget { column: String, reason: String },
	#[error("tuning was cancelled before all grid points were evaluated")]
	Cancelled,
	/// A model implementation failed to train.
	#[error("failed to train the model: {0}")]
	Model(String),
}
