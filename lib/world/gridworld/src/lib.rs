/*
 * Copyright (C) 2023 Asim Ihsan
 * SPDX-License-Identifier: AGPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU Affero General Public License as published by the Free
 * Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A
 * PARTICULAR PURPOSE. See the GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License along
 * with this program. If not, see <https://www.gnu.org/licenses/>
 */

#![warn(missing_docs)]

//! Gridworld environments for localization and decision-making experiments.
//!
//! A [`GridMap`] is a rectangular grid of cells (free, wall, goal, pit). An [`Environment`]
//! wraps a map together with the hidden agent position, a [`MotionModel`] that decides where
//! an action actually takes the agent, and an [`ObservationLikelihood`] that turns the agent's
//! position into a (possibly noisy) [`Observation`].
//!
//! Maps come from hard-coded presets, procedural generators (which take an explicit seed) or
//! imported matrices.

pub mod config;
pub mod digits;
pub mod environment;
pub mod error;
pub mod grid_map;
pub mod motion;
pub mod observation;
pub mod position;
pub mod presets;
pub mod random;

pub use config::{initialize_environment, EnvironmentConfig, MapSource};
pub use environment::{EpisodicEnvironment, Environment, GridEnvironment, Resettable};
pub use error::GridError;
pub use grid_map::{Cell, CellKind, GridMap};
pub use motion::{MotionModel, MotionOutcome};
pub use observation::{Observation, ObservationLikelihood, ObservationModel};
pub use position::{Action, Dimensions, Position};
pub use presets::Preset;

/// Grid coordinate type. Signed so that a displacement can step off the grid.
pub type Int = i32;

/// Probability and reward type.
pub type Float = f64;

/// Seeded random number generator used everywhere randomness is needed.
pub type Rng = rand_pcg::Pcg64;
