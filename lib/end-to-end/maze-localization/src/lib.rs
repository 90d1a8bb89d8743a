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

//! Grid localization end to end: an [`Agent`] picks actions, the environment moves the hidden
//! agent and senses, and a histogram filter tracks where the agent probably is.
//!
//! The agent only ever sees the filter, never the environment's ground truth.

use gridworld::GridError;
use histogram_filter::FilterError;

pub mod agents;
pub mod runner;

pub use agents::{ActiveAgent, RandomAgent, ScriptedAgent};
pub use runner::{EpisodeOptions, EpisodeReport, Localization, StepReport};

/// An Agent acts in a Performance, Environment, Action, Sensing (PEAS) cycle. For a given
/// Percept, the Agent returns an Action.
///
/// Localization agents perceive the filter's belief and nothing else.
pub trait Agent {
    /// What the agent does.
    type Action;

    /// What the agent perceives.
    type Percept;

    /// Choose the next action.
    fn act(&mut self, percept: &Self::Percept) -> Self::Action;
}

impl<T: Agent + ?Sized> Agent for Box<T> {
    type Action = T::Action;
    type Percept = T::Percept;

    fn act(&mut self, percept: &Self::Percept) -> Self::Action {
        (**self).act(percept)
    }
}

/// Localization error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocalizationError {
    /// The environment rejected an operation.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// The filter rejected an operation.
    #[error(transparent)]
    Filter(#[from] FilterError),
}
