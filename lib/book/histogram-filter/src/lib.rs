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

//! Discrete Bayesian (histogram) filter for grid localization, after AIMA chapter 14.
//!
//! The filter keeps a [`Belief`], one probability per grid cell, about where an agent is. It
//! never sees the agent's true position; it only hears which [`Action`](gridworld::Action) was
//! issued and what [`Observation`](gridworld::Observation) came back:
//!
//! - [`HistogramFilter::predict`] pushes belief mass through the motion model. Mass whose motion
//!   would leave the grid or enter a wall stays where it was, so no mass is ever lost.
//! - [`HistogramFilter::update`] weighs each cell by the observation likelihood and normalizes.
//!   If nothing is left to normalize the update fails with [`FilterError::DegenerateBelief`] and
//!   the belief is left untouched.
//!
//! [`MapSetFilter`] extends this to an agent that does not know which of several maps it is on,
//! and reports how likely each map is.

pub mod active;
pub mod belief;
pub mod error;
pub mod filter;
pub mod map_set;

pub use active::ActionSelection;
pub use belief::Belief;
pub use error::FilterError;
pub use filter::{BeliefInit, HistogramFilter, DEGENERATE_MASS_EPSILON, RENORMALIZATION_EPSILON};
pub use map_set::MapSetFilter;
