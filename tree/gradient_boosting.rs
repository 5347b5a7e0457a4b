use crate::{train_tree, Node, Tree, TreeOptions};
use itertools::izip;
use ndarray::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

/// These are the options passed to `GradientBoosting::train`.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientBoostingOptions {
	/// The number of rounds of training. One tree is trained in each round.
	pub n_rounds: usize,
	/// The learning rate scales the leaf values to control the effect each tree has on the output.
	pub learning_rate: f32,
	pub tree_options: TreeOptions,
	/// The seed for the feature subsets chosen when `tree_options.feature_subset_size` is set.
	pub seed: u64,
}

impl Default for GradientBoostingOptions {
	fn default() -> Self {
		Self {
			n_rounds: 100,
			learning_rate: 0.1,
			tree_options: TreeOptions {
				max_depth: 3,
				..Default::default()
			},
			seed: 0,
		}
	}
}

/// `GradientBoosting` minimizes the mean squared error by starting from the mean label and adding trees, each fit to the residuals of the trees before it.
#[derive(Clone, Debug)]
pub struct GradientBoosting {
	/// The initial prediction of the model given no trained trees. The bias is the mean value of the labels in the training data.
	pub bias: f32,
	/// The trees for this model. Their leaf values are already scaled by the learning rate.
	pub trees: Vec<Tree>,
}

impl GradientBoosting {
	/// Train a gradient boosting model.
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		options: &GradientBoostingOptions,
	) -> GradientBoosting {
		let bias = labels.mean().unwrap_or(0.0);
		let examples: Vec<usize> = (0..features.nrows()).collect();
		let rows: Vec<Vec<f32>> = features.genrows().into_iter().map(|row| row.to_vec()).collect();
		let mut rng = Xoshiro256Plus::seed_from_u64(options.seed);
		let mut predictions = Array1::from_elem(labels.len(), bias);
		let mut residuals = Array1::<f32>::zeros(labels.len());
		let mut trees = Vec::with_capacity(options.n_rounds);
		for _ in 0..options.n_rounds {
			// For the squared error loss, the negative gradient is the residual.
			for (residual, label, prediction) in
				izip!(residuals.iter_mut(), labels.iter(), predictions.iter())
			{
				*residual = label - prediction;
			}
			let mut tree = train_tree(
				features,
				residuals.view(),
				&examples,
				&options.tree_options,
				&mut rng,
			);
			for node in tree.nodes.iter_mut() {
				if let Node::Leaf(leaf) = node {
					leaf.value *= options.learning_rate;
				}
			}
			for (prediction, row) in predictions.iter_mut().zip(rows.iter()) {
				*prediction += tree.predict(row);
			}
			trees.push(tree);
		}
		GradientBoosting { bias, trees }
	}

	/// Make predictions.
	pub fn predict(&self, features: ArrayView2<f32>) -> Array1<f32> {
		features
			.genrows()
			.into_iter()
			.map(|row| {
				let row = row.to_vec();
				self.bias + self.trees.iter().map(|tree| tree.predict(&row)).sum::<f32>()
			})
			.collect()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn mean_squared_error(predictions: ArrayView1<f32>, labels: ArrayView1<f32>) -> f32 {
		let n = labels.len() as f32;
		predictions
			.iter()
			.zip(labels.iter())
			.map(|(p, l)| (p - l).powi(2))
			.sum::<f32>()
			/ n
	}

	#[test]
	fn test_gradient_boosting_reduces_training_error() {
		let features = Array2::from_shape_fn((50, 1), |(i, _)| i as f32);
		let labels = Array1::from_shape_fn(50, |i| 3.0 * i as f32 + 1.0);
		let options = |n_rounds| GradientBoostingOptions {
			n_rounds,
			learning_rate: 0.3,
			tree_options: TreeOptions {
				max_depth: 2,
				min_examples_per_leaf: 2,
				feature_subset_size: None,
			},
			seed: 0,
		};
		let baseline = GradientBoosting::train(features.view(), labels.view(), &options(0));
		assert!((baseline.bias - 74.5).abs() < 1e-4);
		let few = GradientBoosting::train(features.view(), labels.view(), &options(5));
		let many = GradientBoosting::train(features.view(), labels.view(), &options(50));
		let baseline_error =
			mean_squared_error(baseline.predict(features.view()).view(), labels.view());
		let few_error = mean_squared_error(few.predict(features.view()).view(), labels.view());
		let many_error = mean_squared_error(many.predict(features.view()).view(), labels.view());
		assert!(few_error < baseline_error);
		assert!(many_error < few_error);
		assert!(many_error < 10.0);
	}
}
