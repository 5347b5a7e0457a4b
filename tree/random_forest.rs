use crate::{train_tree, Tree, TreeOptions};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use quarry_util::pzip;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

/// These are the options passed to `RandomForest::train`.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomForestOptions {
	/// The number of trees to train.
	pub n_trees: usize,
	pub tree_options: TreeOptions,
	/// Tree `i` draws its bootstrap sample and feature subsets from a generator seeded with `seed + i`, so training is deterministic regardless of how the trees are scheduled across threads.
	pub seed: u64,
}

impl Default for RandomForestOptions {
	fn default() -> Self {
		Self {
			n_trees: 100,
			tree_options: TreeOptions::default(),
			seed: 0,
		}
	}
}

/// A `RandomForest` averages the predictions of trees that were each trained on a bootstrap sample of the training examples.
#[derive(Clone, Debug)]
pub struct RandomForest {
	pub trees: Vec<Tree>,
}

impl RandomForest {
	/// Train a random forest.
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		options: &RandomForestOptions,
	) -> RandomForest {
		let n_examples = features.nrows();
		let trees = (0..options.n_trees.max(1))
			.into_par_iter()
			.map(|tree_index| {
				let mut rng = Xoshiro256Plus::seed_from_u64(
					options
						.seed
						.wrapping_add(tree_index.to_u64().unwrap_or(0)),
				);
				let examples: Vec<usize> = (0..n_examples)
					.map(|_| rng.gen_range(0, n_examples))
					.collect();
				train_tree(features, labels, &examples, &options.tree_options, &mut rng)
			})
			.collect();
		RandomForest { trees }
	}

	/// Make predictions. Each prediction is the mean of the trees' predictions.
	pub fn predict(&self, features: ArrayView2<f32>) -> Array1<f32> {
		let n_trees = self.trees.len().to_f32().unwrap_or(1.0);
		let mut predictions = Array1::zeros(features.nrows());
		pzip!(
			features.axis_iter(Axis(0)),
			predictions.axis_iter_mut(Axis(0))
		)
		.for_each(|(row, mut prediction)| {
			let row = row.to_vec();
			let sum: f32 = self.trees.iter().map(|tree| tree.predict(&row)).sum();
			prediction.fill(sum / n_trees);
		});
		predictions
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn dataset() -> (Array2<f32>, Array1<f32>) {
		let features = Array2::from_shape_fn((100, 2), |(i, j)| match j {
			0 => i as f32,
			_ => ((i * 13) % 7) as f32,
		});
		let labels = Array1::from_shape_fn(100, |i| if i < 50 { 10.0 } else { 20.0 });
		(features, labels)
	}

	#[test]
	fn test_random_forest() {
		let (features, labels) = dataset();
		let options = RandomForestOptions {
			n_trees: 20,
			tree_options: TreeOptions {
				max_depth: 4,
				min_examples_per_leaf: 2,
				feature_subset_size: None,
			},
			seed: 7,
		};
		let model = RandomForest::train(features.view(), labels.view(), &options);
		assert_eq!(model.trees.len(), 20);
		let predictions = model.predict(arr2(&[[5.0, 0.0], [95.0, 3.0]]).view());
		assert!((predictions[0] - 10.0).abs() < 1.0);
		assert!((predictions[1] - 20.0).abs() < 1.0);
	}

	#[test]
	fn test_random_forest_is_deterministic() {
		let (features, labels) = dataset();
		let options = RandomForestOptions {
			n_trees: 8,
			tree_options: TreeOptions {
				max_depth: 3,
				min_examples_per_leaf: 1,
				feature_subset_size: Some(1),
			},
			seed: 42,
		};
		let a = RandomForest::train(features.view(), labels.view(), &options);
		let b = RandomForest::train(features.view(), labels.view(), &options);
		assert_eq!(a.predict(features.view()), b.predict(features.view()));
	}
}
