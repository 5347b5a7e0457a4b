use crate::model::{Hyperparameter, HyperparameterRange, Model, ModelKind};
use itertools::Itertools;
use num_traits::ToPrimitive;
use quarry_util::error::{Error, Result};
use std::collections::BTreeMap;

/// A `GridPoint` is a single candidate configuration, mapping each hyperparameter in the grid to a value.
pub type GridPoint = BTreeMap<Hyperparameter, f64>;

/// A `HyperparameterGrid` describes the values of one hyperparameter to search: `levels` values between `min` and `max` inclusive.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HyperparameterGrid {
	#[serde(rename = "name")]
	pub hyperparameter: Hyperparameter,
	pub min: f64,
	pub max: f64,
	pub levels: usize,
	#[serde(default)]
	pub scale: Scale,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
	/// The levels are evenly spaced.
	Linear,
	/// The logarithms of the levels are evenly spaced.
	Log,
}

impl Default for Scale {
	fn default() -> Self {
		Scale::Linear
	}
}

/**
Compute the grid of configurations to search. The grid is the cartesian product of the levels of each hyperparameter, enumerated in lexicographic order of the declarations: the first declared hyperparameter varies slowest.

For example, declaring `ensemble_size` from 50 to 100 with 2 levels and then `min_leaf_size` from 2 to 10 with 2 levels produces this grid:

| grid index | ensemble_size | min_leaf_size |
|------------|---------------|---------------|
| 0          | 50            | 2             |
| 1          | 50            | 10            |
| 2          | 100           | 2             |
| 3          | 100           | 10            |

Levels of integer hyperparameters are rounded and duplicates are removed. An empty list of declarations produces a grid with a single empty point, which trains the model with its defaults.
*/
pub fn compute_grid(model: &dyn Model, declarations: &[HyperparameterGrid]) -> Result<Vec<GridPoint>> {
	let ranges = model.hyperparameters();
	let mut seen = Vec::new();
	let mut axes: Vec<(Hyperparameter, Vec<f64>)> = Vec::new();
	for declaration in declarations.iter() {
		if seen.contains(&declaration.hyperparameter) {
			log::warn!(
				"{} is declared more than once in the grid, only the first declaration is used",
				declaration.hyperparameter
			);
			continue;
		}
		seen.push(declaration.hyperparameter);
		let range = ranges
			.iter()
			.find(|range| range.hyperparameter == declaration.hyperparameter)
			.ok_or_else(|| Error::UnknownHyperparameter {
				model: model.name().to_owned(),
				name: declaration.hyperparameter.name().to_owned(),
			})?;
		axes.push((declaration.hyperparameter, compute_levels(declaration, range)?));
	}
	if axes.is_empty() {
		return Ok(vec![GridPoint::new()]);
	}
	let grid: Vec<GridPoint> = axes
		.iter()
		.map(|(_, levels)| levels.iter().copied())
		.multi_cartesian_product()
		.map(|values| {
			axes.iter()
				.map(|(hyperparameter, _)| *hyperparameter)
				.zip(values.into_iter())
				.collect()
		})
		.collect();
	log::debug!("computed a grid with {} points", grid.len());
	Ok(grid)
}

/// Compute the levels of a single hyperparameter, in ascending order.
pub fn compute_levels(declaration: &HyperparameterGrid, range: &HyperparameterRange) -> Result<Vec<f64>> {
	let out_of_range = |value: f64| Error::ConfigOutOfRange {
		name: declaration.hyperparameter.name().to_owned(),
		value,
		min: range.min,
		max: range.max,
	};
	let HyperparameterGrid {
		min, max, levels, ..
	} = *declaration;
	if !(min >= range.min && min <= range.max) {
		return Err(out_of_range(min));
	}
	if !(max >= min && max <= range.max) {
		return Err(out_of_range(max));
	}
	if levels == 0 {
		return Err(Error::ConfigOutOfRange {
			name: format!("{}.levels", declaration.hyperparameter),
			value: 0.0,
			min: 1.0,
			max: std::f64::INFINITY,
		});
	}
	let (low, high) = match declaration.scale {
		Scale::Linear => (min, max),
		Scale::Log => {
			if min <= 0.0 {
				return Err(Error::ConfigOutOfRange {
					name: declaration.hyperparameter.name().to_owned(),
					value: min,
					min: std::f64::MIN_POSITIVE,
					max: range.max,
				});
			}
			(min.ln(), max.ln())
		}
	};
	let n_steps = (levels - 1).to_f64().unwrap_or(1.0).max(1.0);
	let mut values: Vec<f64> = (0..levels)
		.map(|level| {
			let t = level.to_f64().unwrap_or(0.0) / n_steps;
			let value = low + (high - low) * t;
			let value = match declaration.scale {
				Scale::Linear => value,
				Scale::Log => value.exp(),
			};
			// Pin the endpoints so rounding error never takes them outside the declared bounds.
			let value = if level == 0 {
				min
			} else if level == levels - 1 {
				max
			} else {
				value
			};
			if range.integer {
				value.round()
			} else {
				value
			}
		})
		.collect();
	values.dedup();
	Ok(values)
}

/// The grid searched when a configuration does not declare one.
pub fn default_grid(model: ModelKind) -> Vec<HyperparameterGrid> {
	match model {
		ModelKind::RandomForest => vec![
			HyperparameterGrid {
				hyperparameter: Hyperparameter::EnsembleSize,
				min: 50.0,
				max: 200.0,
				levels: 2,
				scale: Scale::Linear,
			},
			HyperparameterGrid {
				hyperparameter: Hyperparameter::MinLeafSize,
				min: 2.0,
				max: 10.0,
				levels: 2,
				scale: Scale::Linear,
			},
		],
		ModelKind::GradientBoosting => vec![
			HyperparameterGrid {
				hyperparameter: Hyperparameter::EnsembleSize,
				min: 50.0,
				max: 200.0,
				levels: 2,
				scale: Scale::Linear,
			},
			HyperparameterGrid {
				hyperparameter: Hyperparameter::LearningRate,
				min: 0.05,
				max: 0.2,
				levels: 2,
				scale: Scale::Log,
			},
		],
	}
}
