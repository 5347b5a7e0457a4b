use super::{mean_variance::merge_mean_m2, StreamingMetric};
use num_traits::ToPrimitive;
use quarry_util::error::{Error, Result};
use std::collections::BTreeMap;

/// `RegressionMetrics` computes metrics used to evaluate regressors.
#[derive(Debug, Clone, Default)]
pub struct RegressionMetrics {
	labels: Option<LabelsMeanM2>,
	absolute_error: f64,
	squared_error: f64,
}

#[derive(Debug, Clone, Copy)]
struct LabelsMeanM2 {
	n: u64,
	mean: f64,
	m2: f64,
}

/// The input to [`RegressionMetrics`](struct.RegressionMetrics.html). `predictions` and `labels` are paired by position.
pub struct RegressionMetricsInput<'a> {
	pub predictions: &'a [f32],
	pub labels: &'a [f32],
}

/// The output from [`RegressionMetrics`](struct.RegressionMetrics.html).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RegressionMetricsOutput {
	/// The mean squared error is equal to the mean of the squared differences between the predicted value and the label.
	pub mse: f32,
	/// The root mean squared error is equal to the square root of the mean squared error.
	pub rmse: f32,
	/// The mean of the absolute value of the differences between the predicted value and the label.
	pub mae: f32,
	/// The coefficient of determination, `1 - SSres / SStot`. It is `NaN` when every label has the same value.
	pub r2: f32,
	/// The mean squared error of always predicting the mean of the labels.
	pub baseline_mse: f32,
	/// The root mean squared error of always predicting the mean of the labels.
	pub baseline_rmse: f32,
}

impl<'a> StreamingMetric<'a> for RegressionMetrics {
	type Input = RegressionMetricsInput<'a>;
	type Output = RegressionMetricsOutput;

	fn update(&mut self, input: RegressionMetricsInput) {
		let RegressionMetricsInput {
			predictions,
			labels,
		} = input;
		for (prediction, label) in predictions.iter().zip(labels.iter()) {
			let label = *label as f64;
			self.labels = Some(match self.labels {
				Some(labels) => {
					let (mean, m2) = merge_mean_m2(labels.n, labels.mean, labels.m2, 1, label, 0.0);
					LabelsMeanM2 {
						n: labels.n + 1,
						mean,
						m2,
					}
				}
				None => LabelsMeanM2 {
					n: 1,
					mean: label,
					m2: 0.0,
				},
			});
			let error = *prediction as f64 - label;
			self.absolute_error += error.abs();
			self.squared_error += error * error;
		}
	}

	fn merge(&mut self, other: Self) {
		self.labels = match (self.labels, other.labels) {
			(Some(a), Some(b)) => {
				let (mean, m2) = merge_mean_m2(a.n, a.mean, a.m2, b.n, b.mean, b.m2);
				Some(LabelsMeanM2 {
					n: a.n + b.n,
					mean,
					m2,
				})
			}
			(a, None) => a,
			(None, b) => b,
		};
		self.absolute_error += other.absolute_error;
		self.squared_error += other.squared_error;
	}

	fn finalize(self) -> Self::Output {
		let (n, m2) = match self.labels {
			Some(labels) => (labels.n.to_f64().unwrap_or(0.0), labels.m2),
			None => (0.0, f64::NAN),
		};
		let mae = self.absolute_error / n;
		let mse = self.squared_error / n;
		let rmse = mse.sqrt();
		let r2 = if m2 > 0.0 {
			1.0 - self.squared_error / m2
		} else {
			f64::NAN
		};
		let baseline_mse = m2 / n;
		let baseline_rmse = baseline_mse.sqrt();
		RegressionMetricsOutput {
			mse: mse as f32,
			rmse: rmse as f32,
			mae: mae as f32,
			r2: r2 as f32,
			baseline_mse: baseline_mse as f32,
			baseline_rmse: baseline_rmse as f32,
		}
	}
}

/// Compute the regression metrics for `predictions` against `labels`. Returns `Error::ShapeMismatch` if they have different lengths.
pub fn score(predictions: &[f32], labels: &[f32]) -> Result<RegressionMetricsOutput> {
	if predictions.len() != labels.len() {
		return Err(Error::ShapeMismatch {
			predictions: predictions.len(),
			labels: labels.len(),
		});
	}
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions,
		labels,
	});
	Ok(metrics.finalize())
}

impl RegressionMetricsOutput {
	pub fn get(&self, metric: RegressionMetric) -> f32 {
		match metric {
			RegressionMetric::Mse => self.mse,
			RegressionMetric::Rmse => self.rmse,
			RegressionMetric::Mae => self.mae,
			RegressionMetric::R2 => self.r2,
		}
	}

	/// Return the metrics as a map from metric name to value.
	pub fn to_map(&self) -> BTreeMap<&'static str, f32> {
		RegressionMetric::ALL
			.iter()
			.map(|metric| (metric.name(), self.get(*metric)))
			.collect()
	}
}

/// The metrics a model can be compared by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum RegressionMetric {
	#[serde(rename = "mse")]
	Mse,
	#[serde(rename = "rmse")]
	Rmse,
	#[serde(rename = "mae")]
	Mae,
	#[serde(rename = "r2")]
	R2,
}

impl RegressionMetric {
	pub const ALL: [RegressionMetric; 4] = [
		RegressionMetric::Mse,
		RegressionMetric::Rmse,
		RegressionMetric::Mae,
		RegressionMetric::R2,
	];

	pub fn name(self) -> &'static str {
		match self {
			RegressionMetric::Mse => "mse",
			RegressionMetric::Rmse => "rmse",
			RegressionMetric::Mae => "mae",
			RegressionMetric::R2 => "r2",
		}
	}

	/// Error metrics are better when lower. R² is better when higher.
	pub fn is_error(self) -> bool {
		!matches!(self, RegressionMetric::R2)
	}

	/// Return true if `a` is a strictly better value of this metric than `b`.
	pub fn is_better(self, a: f32, b: f32) -> bool {
		if self.is_error() {
			a < b
		} else {
			a > b
		}
	}
}

impl Default for RegressionMetric {
	fn default() -> Self {
		RegressionMetric::Rmse
	}
}

impl std::fmt::Display for RegressionMetric {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			RegressionMetric::Mse => "Mean Squared Error",
			RegressionMetric::Rmse => "Root Mean Squared Error",
			RegressionMetric::Mae => "Mean Absolute Error",
			RegressionMetric::R2 => "R2",
		};
		write!(f, "{}", s)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn close(a: f32, b: f32) -> bool {
		(a - b).abs() < 1e-5
	}

	#[test]
	fn test_score_matches_closed_form_values() {
		let labels = [1.0, 2.0, 3.0, 4.0, 5.0];
		let predictions = [1.5, 2.0, 2.5, 4.0, 6.0];
		let metrics = score(&predictions, &labels).unwrap();
		// The squared residuals are 0.25, 0, 0.25, 0, 1 and the labels have a total sum of squares of 10.
		assert!(close(metrics.mse, 0.3));
		assert!(close(metrics.rmse, 0.3f32.sqrt()));
		assert!(close(metrics.mae, 0.4));
		assert!(close(metrics.r2, 0.85));
		assert!(close(metrics.baseline_mse, 2.0));
	}

	#[test]
	fn test_score_rejects_mismatched_lengths() {
		let result = score(&[1.0, 2.0], &[1.0]);
		assert!(matches!(
			result,
			Err(Error::ShapeMismatch {
				predictions: 2,
				labels: 1
			})
		));
	}

	#[test]
	fn test_merge_matches_single_pass() {
		let labels = [1.0, 2.0, 3.0, 4.0, 5.0];
		let predictions = [1.5, 2.0, 2.5, 4.0, 6.0];
		let mut a = RegressionMetrics::default();
		a.update(RegressionMetricsInput {
			predictions: &predictions[..2],
			labels: &labels[..2],
		});
		let mut b = RegressionMetrics::default();
		b.update(RegressionMetricsInput {
			predictions: &predictions[2..],
			labels: &labels[2..],
		});
		a.merge(b);
		let merged = a.finalize();
		let single = score(&predictions, &labels).unwrap();
		assert!(close(merged.mse, single.mse));
		assert!(close(merged.mae, single.mae));
		assert!(close(merged.r2, single.r2));
	}

	#[test]
	fn test_r2_is_nan_for_constant_labels() {
		let metrics = score(&[1.0, 2.0], &[3.0, 3.0]).unwrap();
		assert!(metrics.r2.is_nan());
		assert!(close(metrics.mae, 1.5));
	}

	#[test]
	fn test_metric_direction() {
		assert!(RegressionMetric::Rmse.is_better(1.0, 2.0));
		assert!(RegressionMetric::R2.is_better(0.9, 0.5));
		assert!(!RegressionMetric::Mae.is_better(1.0, 1.0));
	}

	#[test]
	fn test_to_map() {
		let metrics = score(&[1.0, 3.0], &[1.0, 2.0]).unwrap();
		insta::assert_debug_snapshot!(metrics.to_map(), @r###"
  {
      "mae": 0.5,
      "mse": 0.5,
      "r2": -1.0,
      "rmse": 0.70710677,
  }
  "###);
	}
}
