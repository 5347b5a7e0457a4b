/*!
This crate implements the Quarry workflow: splitting a dataset into train, test and cross validation folds, binding a recipe and a model into a workflow, searching a hyperparameter grid, and running everything end to end with [`train`](train/fn.train.html).
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod config;
pub mod grid;
pub mod model;
pub mod split;
pub mod train;
pub mod tune;
pub mod workflow;

pub use self::{
	config::{load_config, Config},
	train::{train, train_dataset, Progress, TrainOutput},
	workflow::{FittedWorkflow, Workflow},
};
