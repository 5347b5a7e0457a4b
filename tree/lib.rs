/*!
This crate implements regression models built from decision trees: a [`RandomForest`](struct.RandomForest.html) of bagged trees and a [`GradientBoosting`](struct.GradientBoosting.html) ensemble of shallow trees fit to residuals. Both take a dense matrix of `f32` features, which is what a fitted quarry recipe produces.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod gradient_boosting;
mod random_forest;
mod train_tree;

pub use self::gradient_boosting::{GradientBoosting, GradientBoostingOptions};
pub use self::random_forest::{RandomForest, RandomForestOptions};
pub use self::train_tree::train_tree;

/// These are the options that control how a single tree is grown. They are shared by `RandomForest::train` and `GradientBoosting::train`.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeOptions {
	/// The depth of a single tree will never exceed this value. A depth of zero produces a tree with a single leaf.
	pub max_depth: usize,
	/// A split will only be considered valid if the number of training examples sent to each of the resulting children is at least this value.
	pub min_examples_per_leaf: usize,
	/// If this is `Some`, each split considers only this many features, chosen at random. Values larger than the number of features are clamped.
	pub feature_subset_size: Option<usize>,
}

impl Default for TreeOptions {
	fn default() -> Self {
		Self {
			max_depth: 8,
			min_examples_per_leaf: 5,
			feature_subset_size: None,
		}
	}
}

/// Trees are stored as a `Vec` of `Node`s. Each branch in the tree has two indexes into the `Vec`, one for each of its children. The root is at index 0.
#[derive(Clone, Debug)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

impl Tree {
	/// Make a prediction for a given example.
	pub fn predict(&self, features: &[f32]) -> f32 {
		// Start at the root node.
		let mut node_index = 0;
		// Traverse the tree until we get to a leaf.
		loop {
			match &self.nodes[node_index] {
				Node::Branch(BranchNode {
					left_child_index,
					right_child_index,
					feature_index,
					split_value,
				}) => {
					let value = features[*feature_index];
					node_index = if value.is_nan() || value <= *split_value {
						*left_child_index
					} else {
						*right_child_index
					};
				}
				Node::Leaf(LeafNode { value }) => return *value,
			}
		}
	}

	pub fn n_leaves(&self) -> usize {
		self.nodes
			.iter()
			.filter(|node| matches!(node, Node::Leaf(_)))
			.count()
	}

	/// Return the depth of the deepest leaf. A tree with a single leaf has depth zero.
	pub fn depth(&self) -> usize {
		fn depth(nodes: &[Node], node_index: usize) -> usize {
			match &nodes[node_index] {
				Node::Branch(BranchNode {
					left_child_index,
					right_child_index,
					..
				}) => 1 + depth(nodes, *left_child_index).max(depth(nodes, *right_child_index)),
				Node::Leaf(_) => 0,
			}
		}
		depth(&self.nodes, 0)
	}
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

/// A `BranchNode` compares the value of a single feature with `split_value`. If the value is <= `split_value` or missing, the example is sent left, otherwise it is sent right.
#[derive(Clone, Debug)]
pub struct BranchNode {
	/// This is the index in the tree's node vector for this node's left child.
	pub left_child_index: usize,
	/// This is the index in the tree's node vector for this node's right child.
	pub right_child_index: usize,
	/// This is the index of the feature to get the value for.
	pub feature_index: usize,
	/// This is the threshold value of the split.
	pub split_value: f32,
}

/// The leaves in a tree hold the values to output for examples that get sent to them.
#[derive(Clone, Debug)]
pub struct LeafNode {
	/// This is the value to output.
	pub value: f32,
}
