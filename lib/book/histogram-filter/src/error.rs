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

use gridworld::{Dimensions, Float, GridError, Position};

/// Histogram filter error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    /// The observation ruled out every cell; the belief was left as it was.
    #[error("degenerate belief: total mass {total_mass} after update")]
    DegenerateBelief {
        /// Mass left after multiplying by the likelihood.
        total_mass: Float,
    },

    /// `predict`, `update` or a query was called before `initialize_belief`.
    #[error("belief has not been initialized")]
    Uninitialized,

    /// A known start was placed on a wall.
    #[error("known start is not traversable: {0}")]
    NonTraversableStart(Position),

    /// A new map does not have the dimensions the belief was allocated for.
    #[error("dimension mismatch: belief is {expected:?}, map is {actual:?}")]
    DimensionMismatch {
        /// Dimensions of the belief.
        expected: Dimensions,

        /// Dimensions of the new map.
        actual: Dimensions,
    },

    /// A map-set filter needs at least one candidate map.
    #[error("no candidate maps")]
    EmptyMapSet,

    /// A candidate map index past the end of the set.
    #[error("map index {index} out of range for {count} candidate maps")]
    MapIndexOutOfRange {
        /// Requested index.
        index: usize,

        /// Number of candidate maps.
        count: usize,
    },

    /// The underlying grid rejected an operation.
    #[error(transparent)]
    Grid(#[from] GridError),
}
