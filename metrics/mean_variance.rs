//! https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance#Parallel_algorithm

use num_traits::ToPrimitive;

/// The mean and population variance of a sequence of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanVariance {
	pub n: u64,
	pub mean: f32,
	pub variance: f32,
}

impl MeanVariance {
	/// Compute the mean and variance of the finite values in `values`. Values that are `NaN` or infinite are skipped.
	pub fn compute(values: &[f32]) -> MeanVariance {
		let mut n = 0u64;
		let mut mean = 0.0f64;
		let mut m2 = 0.0f64;
		for value in values.iter().filter(|value| value.is_finite()) {
			let (new_mean, new_m2) = merge_mean_m2(n, mean, m2, 1, *value as f64, 0.0);
			n += 1;
			mean = new_mean;
			m2 = new_m2;
		}
		MeanVariance {
			n,
			mean: mean as f32,
			variance: if n == 0 { 0.0 } else { m2_to_variance(m2, n) },
		}
	}

	pub fn std(&self) -> f32 {
		self.variance.sqrt()
	}
}

/// Combine two separate means and m2s into a single mean and m2. This is useful in parallel algorithms.
pub fn merge_mean_m2(
	n_a: u64,
	mean_a: f64,
	m2_a: f64,
	n_b: u64,
	mean_b: f64,
	m2_b: f64,
) -> (f64, f64) {
	let n_a = n_a.to_f64().unwrap_or(0.0);
	let n_b = n_b.to_f64().unwrap_or(0.0);
	if n_a + n_b == 0.0 {
		return (0.0, 0.0);
	}
	(
		(((n_a * mean_a) + (n_b * mean_b)) / (n_a + n_b)),
		m2_a + m2_b + (mean_b - mean_a) * (mean_b - mean_a) * (n_a * n_b / (n_a + n_b)),
	)
}

pub fn m2_to_variance(m2: f64, n: u64) -> f32 {
	(m2 / n.to_f64().unwrap_or(0.0)) as f32
}

#[test]
fn test_mean_variance() {
	let mean_variance = MeanVariance::compute(&[0.0, 5.2, 1.3, 10.0, std::f32::NAN]);
	assert_eq!(mean_variance.n, 4);
	assert!((mean_variance.mean - 4.125).abs() < 1e-6);
	// ((-4.125)^2 + 1.075^2 + (-2.825)^2 + 5.875^2) / 4
	assert!((mean_variance.variance - 15.166_875).abs() < 1e-4);
}
