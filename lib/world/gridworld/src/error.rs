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

use crate::{Action, Position};

/// Gridworld error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// The map specification is malformed or inconsistent.
    #[error("invalid map: {0}")]
    InvalidMap(String),

    /// A position lies outside the grid.
    #[error("position out of bounds: {0}")]
    OutOfBounds(Position),

    /// A procedural maze never produced a start-to-goal path.
    #[error("maze generation failed: no start-to-goal path after {attempts} attempts")]
    MazeGeneration {
        /// Number of layouts that were generated and rejected.
        attempts: usize,
    },

    /// A configuration value is out of range or unrecognized.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The position is in bounds but holds a wall.
    #[error("position is not traversable: {0}")]
    NotTraversable(Position),

    /// The action's nominal displacement leaves the grid or hits a wall.
    #[error("action {action} is not allowed from {position}")]
    IllegalAction {
        /// Where the agent stands.
        position: Position,

        /// The rejected action.
        action: Action,
    },

    /// The agent is on a terminal cell or the step limit has been used up.
    #[error("episode finished after {steps} steps")]
    EpisodeFinished {
        /// Steps taken in the episode.
        steps: usize,
    },
}
