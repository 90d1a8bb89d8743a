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

//! Active localization: pick the move whose outcome is most likely to tell the agent where it is.
//!
//! A position/action pair is worth `belief(position) * (1 - frequency)`, where `frequency` is the
//! fraction of traversable cells that read the same symbol as the cell the action leads to. Rare
//! readings cut the belief down the most.

use gridworld::{Action, Float, MotionModel, MotionOutcome};
use serde::{Deserialize, Serialize};

use crate::HistogramFilter;

/// How position/action utilities are combined into a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSelection {
    /// The action of the single best position/action pair.
    MostUniquePatch,

    /// The action with the largest utility summed over all positions.
    SumOfUniquePatches,
}

impl HistogramFilter {
    /// Choose a move, or None if the belief is not initialized or no move is worth anything.
    /// Moves that hit a wall from a hypothesis contribute nothing for it.
    pub fn select_action(&self, strategy: ActionSelection) -> Option<Action> {
        if !self.is_ready() {
            return None;
        }
        let mut totals = [0.0; 4];
        let mut best_pair: Option<(usize, Float)> = None;
        for (index, mass) in self.belief().as_slice().iter().enumerate() {
            if *mass == 0.0 {
                continue;
            }
            let source = self.map().position_of(index);
            for (slot, action) in Action::MOVES.iter().enumerate() {
                if !source
                    .step(*action)
                    .is_some_and(|next| self.map().is_open(next))
                {
                    continue;
                }
                let destination =
                    MotionModel::resolve(self.map(), source, *action, MotionOutcome::Intended);
                let Some(reading) = self.expected_observation(destination) else {
                    continue;
                };
                let utility = mass * (1.0 - self.symbol_frequency(reading));
                totals[slot] += utility;
                if best_pair.map_or(true, |(_, best)| utility > best) {
                    best_pair = Some((slot, utility));
                }
            }
        }

        let slot = match strategy {
            ActionSelection::MostUniquePatch => best_pair
                .filter(|(_, utility)| *utility > 0.0)
                .map(|(slot, _)| slot),
            ActionSelection::SumOfUniquePatches => {
                let mut best: Option<(usize, Float)> = None;
                for (slot, total) in totals.iter().enumerate() {
                    if *total > 0.0 && best.map_or(true, |(_, b)| *total > b) {
                        best = Some((slot, *total));
                    }
                }
                best.map(|(slot, _)| slot)
            }
        }?;
        let action = Action::MOVES[slot];
        tracing::debug!(?strategy, %action, "selected action");
        Some(action)
    }
}
