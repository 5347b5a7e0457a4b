use crate::{BranchNode, LeafNode, Node, Tree, TreeOptions};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand_xoshiro::Xoshiro256Plus;
use std::cmp::Ordering;

/// A split is only made if it reduces the sum of squared errors by more than this fraction of the node's sum of squared labels.
const MIN_RELATIVE_GAIN: f64 = 1e-10;

/**
Grow a single regression tree on the rows of `features` listed in `examples`. Rows may appear in `examples` more than once, which is how bootstrap samples are passed in.

Each node is split on the feature and threshold that most reduce the sum of squared errors of its examples, considering only splits that send at least `min_examples_per_leaf` examples to each child. A node becomes a leaf holding the mean label of its examples when it reaches `max_depth` or no valid split reduces the error. Missing feature values are ordered before every other value, so they are always sent left.
*/
pub fn train_tree(
	features: ArrayView2<f32>,
	labels: ArrayView1<f32>,
	examples: &[usize],
	options: &TreeOptions,
	rng: &mut Xoshiro256Plus,
) -> Tree {
	let mut builder = TreeBuilder {
		features: features.view(),
		labels: labels.view(),
		options,
		rng,
		nodes: Vec::new(),
	};
	let mut examples = examples.to_owned();
	builder.grow(&mut examples, 0);
	Tree {
		nodes: builder.nodes,
	}
}

struct TreeBuilder<'a> {
	features: ArrayView2<'a, f32>,
	labels: ArrayView1<'a, f32>,
	options: &'a TreeOptions,
	rng: &'a mut Xoshiro256Plus,
	nodes: Vec<Node>,
}

#[derive(Clone, Copy, Debug)]
struct Split {
	feature_index: usize,
	split_value: f32,
	gain: f64,
}

impl<'a> TreeBuilder<'a> {
	/// Grow the subtree for `examples` and return the index of its root node.
	fn grow(&mut self, examples: &mut [usize], depth: usize) -> usize {
		let node_index = self.nodes.len();
		let label_sum: f64 = examples
			.iter()
			.map(|example| self.labels[*example] as f64)
			.sum();
		let n_examples = examples.len().to_f64().unwrap_or(1.0).max(1.0);
		let value = (label_sum / n_examples) as f32;
		self.nodes.push(Node::Leaf(LeafNode { value }));

		let min_examples_per_leaf = self.options.min_examples_per_leaf.max(1);
		if depth >= self.options.max_depth || examples.len() < 2 * min_examples_per_leaf {
			return node_index;
		}
		let split = match self.choose_best_split(examples, min_examples_per_leaf) {
			Some(split) => split,
			None => return node_index,
		};

		// Reorder the examples so the ones sent left come first.
		let feature_column = self.features.column(split.feature_index);
		let (mut left, right): (Vec<usize>, Vec<usize>) = examples
			.iter()
			.partition(|example| goes_left(feature_column[**example], split.split_value));
		let n_left = left.len();
		left.extend(right);
		examples.copy_from_slice(&left);

		let (left_examples, right_examples) = examples.split_at_mut(n_left);
		let left_child_index = self.grow(left_examples, depth + 1);
		let right_child_index = self.grow(right_examples, depth + 1);
		self.nodes[node_index] = Node::Branch(BranchNode {
			left_child_index,
			right_child_index,
			feature_index: split.feature_index,
			split_value: split.split_value,
		});
		node_index
	}

	fn choose_best_split(&mut self, examples: &[usize], min_examples_per_leaf: usize) -> Option<Split> {
		let n_features = self.features.ncols();
		let mut feature_indexes: Vec<usize> = match self.options.feature_subset_size {
			Some(size) if size < n_features => {
				rand::seq::index::sample(&mut *self.rng, n_features, size.max(1)).into_vec()
			}
			_ => (0..n_features).collect(),
		};
		// Sorting makes ties between features resolve to the lowest feature index.
		feature_indexes.sort_unstable();

		let n = examples.len();
		let total_sum: f64 = examples
			.iter()
			.map(|example| self.labels[*example] as f64)
			.sum();
		let total_sum_of_squares: f64 = examples
			.iter()
			.map(|example| (self.labels[*example] as f64).powi(2))
			.sum();
		let n_f64 = n.to_f64()?;
		let parent_score = total_sum * total_sum / n_f64;
		let min_gain = MIN_RELATIVE_GAIN * total_sum_of_squares.max(1.0);

		let mut best: Option<Split> = None;
		let mut sorted: Vec<(f32, f64)> = Vec::with_capacity(n);
		for feature_index in feature_indexes {
			let feature_column = self.features.column(feature_index);
			sorted.clear();
			sorted.extend(examples.iter().map(|example| {
				(
					sort_key(feature_column[*example]),
					self.labels[*example] as f64,
				)
			}));
			sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
			let mut left_sum = 0.0;
			for i in 0..n - 1 {
				left_sum += sorted[i].1;
				let n_left = i + 1;
				let n_right = n - n_left;
				// A threshold can only be placed between two different values.
				if sorted[i].0 == sorted[i + 1].0 {
					continue;
				}
				if n_left < min_examples_per_leaf || n_right < min_examples_per_leaf {
					continue;
				}
				let right_sum = total_sum - left_sum;
				let score = left_sum * left_sum / n_left.to_f64()?
					+ right_sum * right_sum / n_right.to_f64()?;
				let gain = score - parent_score;
				if gain <= min_gain {
					continue;
				}
				if best.map(|best| gain > best.gain).unwrap_or(true) {
					best = Some(Split {
						feature_index,
						split_value: threshold(sorted[i].0, sorted[i + 1].0),
						gain,
					});
				}
			}
		}
		best
	}
}

fn sort_key(value: f32) -> f32 {
	if value.is_nan() {
		std::f32::NEG_INFINITY
	} else {
		value
	}
}

fn goes_left(value: f32, split_value: f32) -> bool {
	value.is_nan() || value <= split_value
}

/// Choose a split value `t` with `low <= t < high`, preferring the midpoint.
fn threshold(low: f32, high: f32) -> f32 {
	let mid = low / 2.0 + high / 2.0;
	if mid.is_finite() && mid >= low && mid < high {
		mid
	} else {
		low
	}
}
