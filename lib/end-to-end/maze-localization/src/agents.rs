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

use gridworld::{Action, Float, Rng};
use histogram_filter::{ActionSelection, HistogramFilter};
use rand::seq::SliceRandom;
use rand::{Rng as _, SeedableRng};

use crate::Agent;

/// Replays a fixed list of actions, then stays put.
#[derive(Debug, Clone)]
pub struct ScriptedAgent {
    actions: Vec<Action>,
    next: usize,
}

impl ScriptedAgent {
    /// Replay `actions` in order.
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions, next: 0 }
    }
}

impl Agent for ScriptedAgent {
    type Action = Action;
    type Percept = HistogramFilter;

    fn act(&mut self, _percept: &Self::Percept) -> Self::Action {
        let action = self.actions.get(self.next).copied().unwrap_or(Action::Stay);
        self.next += 1;
        action
    }
}

/// Picks one of the four moves uniformly at random.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    rng: Rng,
}

impl RandomAgent {
    /// Seeded random agent.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    type Action = Action;
    type Percept = HistogramFilter;

    fn act(&mut self, _percept: &Self::Percept) -> Self::Action {
        random_move(&mut self.rng)
    }
}

/// Active localization: moves towards rare observations, with epsilon-greedy exploration. Falls
/// back to a random move when the belief offers nothing to learn.
#[derive(Debug, Clone)]
pub struct ActiveAgent {
    strategy: ActionSelection,
    epsilon: Float,
    rng: Rng,
}

impl ActiveAgent {
    /// `epsilon` is the probability of a random move, clamped to `[0, 1]`.
    pub fn new(strategy: ActionSelection, epsilon: Float, seed: u64) -> Self {
        Self {
            strategy,
            epsilon: epsilon.clamp(0.0, 1.0),
            rng: Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for ActiveAgent {
    type Action = Action;
    type Percept = HistogramFilter;

    fn act(&mut self, percept: &Self::Percept) -> Self::Action {
        if self.epsilon > 0.0 && self.rng.gen_bool(self.epsilon) {
            return random_move(&mut self.rng);
        }
        percept
            .select_action(self.strategy)
            .unwrap_or_else(|| random_move(&mut self.rng))
    }
}

fn random_move(rng: &mut Rng) -> Action {
    *Action::MOVES.choose(rng).unwrap_or(&Action::Stay)
}
