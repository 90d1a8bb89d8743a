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

use std::sync::Arc;

use gridworld::{
    Action, Environment, Float, GridMap, MotionModel, Observation, ObservationLikelihood,
    Position,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{Belief, FilterError};

/// `predict` renormalizes only when the total mass drifts further than this from one.
pub const RENORMALIZATION_EPSILON: Float = 1e-9;

/// `update` fails when the mass left after weighing by the likelihood is at most this.
pub const DEGENERATE_MASS_EPSILON: Float = 1e-12;

/// How to seed the belief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeliefInit {
    /// Equal mass on every traversable cell.
    Uniform,

    /// All mass on one cell.
    KnownStart(Position),
}

/// Histogram filter over the cells of one map.
#[derive(Debug, Clone)]
pub struct HistogramFilter {
    map: Arc<GridMap>,
    motion: MotionModel,
    sensor: ObservationLikelihood,

    // Noiseless reading of every cell, None for walls.
    expected: Vec<Option<Observation>>,

    // Fraction of traversable cells with each noiseless reading.
    symbol_frequency: FxHashMap<Observation, Float>,

    belief: Belief,
    scratch: Vec<Float>,
    ready: bool,
}

impl HistogramFilter {
    /// Create an uninitialized filter. Call [`HistogramFilter::initialize_belief`] before use.
    pub fn new(
        map: Arc<GridMap>,
        motion: MotionModel,
        sensor: ObservationLikelihood,
    ) -> Result<Self, FilterError> {
        let belief = Belief::zeros(map.dimensions());
        let scratch = vec![0.0; map.len()];
        let mut filter = Self {
            map,
            motion,
            sensor,
            expected: Vec::new(),
            symbol_frequency: FxHashMap::default(),
            belief,
            scratch,
            ready: false,
        };
        filter.precompute_observations()?;
        Ok(filter)
    }

    /// Share the map and the motion and observation models of an environment. Nothing about the
    /// agent position is read.
    pub fn for_environment<E: Environment + ?Sized>(environment: &E) -> Result<Self, FilterError> {
        Self::new(
            environment.shared_map(),
            environment.motion_model().clone(),
            *environment.observation_likelihood(),
        )
    }

    fn precompute_observations(&mut self) -> Result<(), FilterError> {
        let model = self.sensor.model();
        self.expected = self
            .map
            .positions()
            .map(|position| {
                if self.map.is_open(position) {
                    model.observe(&self.map, position).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<_, _>>()?;

        self.symbol_frequency.clear();
        let traversable = self.map.traversable_count() as Float;
        for observation in self.expected.iter().flatten() {
            *self.symbol_frequency.entry(*observation).or_insert(0.0) += 1.0 / traversable;
        }
        Ok(())
    }

    /// Swap in a new map of the same dimensions, e.g. after an episodic environment regenerated
    /// its maze. The filter goes back to uninitialized.
    pub fn reset_map(&mut self, map: Arc<GridMap>) -> Result<(), FilterError> {
        if map.dimensions() != self.belief.dimensions() {
            return Err(FilterError::DimensionMismatch {
                expected: self.belief.dimensions(),
                actual: map.dimensions(),
            });
        }
        self.map = map;
        self.precompute_observations()?;
        self.ready = false;
        Ok(())
    }

    /// Seed the belief. Afterwards it sums to one and walls hold no mass.
    pub fn initialize_belief(&mut self, init: BeliefInit) -> Result<(), FilterError> {
        match init {
            BeliefInit::Uniform => {
                let mass = 1.0 / self.map.traversable_count() as Float;
                for (p, expected) in self.belief.as_mut_slice().iter_mut().zip(&self.expected) {
                    *p = if expected.is_some() { mass } else { 0.0 };
                }
            }
            BeliefInit::KnownStart(start) => {
                let index = self.map.index_of(start)?;
                if !self.map.is_open(start) {
                    return Err(FilterError::NonTraversableStart(start));
                }
                let probabilities = self.belief.as_mut_slice();
                probabilities.fill(0.0);
                probabilities[index] = 1.0;
            }
        }
        self.ready = true;
        tracing::debug!(?init, entropy = self.belief.entropy(), "initialized belief");
        Ok(())
    }

    /// Motion step: move the mass of every cell through each outcome of the motion model.
    pub fn predict(&mut self, action: Action) -> Result<(), FilterError> {
        self.ensure_ready()?;
        self.scratch.fill(0.0);
        for (index, mass) in self.belief.as_slice().iter().enumerate() {
            if *mass == 0.0 {
                continue;
            }
            let source = self.map.position_of(index);
            for (outcome, probability) in self.motion.outcomes() {
                let destination = MotionModel::resolve(&self.map, source, action, *outcome);
                self.scratch[self.map.index_of(destination)?] += mass * probability;
            }
        }
        self.belief.swap(&mut self.scratch);

        let total = self.belief.total_mass();
        if (total - 1.0).abs() > RENORMALIZATION_EPSILON {
            tracing::debug!(total, "renormalizing after predict");
            self.belief.as_mut_slice().iter_mut().for_each(|p| *p /= total);
        }
        tracing::debug!(
            %action,
            entropy = self.belief.entropy(),
            most_likely = %self.belief.most_likely(),
            "predict"
        );
        Ok(())
    }

    /// Observation step: weigh every cell by P(observation | cell) and normalize. On a degenerate
    /// result the belief is left as it was.
    pub fn update(&mut self, observation: Observation) -> Result<(), FilterError> {
        let total = self.weigh(observation)?;
        if total <= DEGENERATE_MASS_EPSILON {
            tracing::warn!(%observation, total, "observation ruled out every cell");
            return Err(FilterError::DegenerateBelief { total_mass: total });
        }
        self.commit_weighted(total);
        tracing::debug!(
            %observation,
            entropy = self.belief.entropy(),
            most_likely = %self.belief.most_likely(),
            "update"
        );
        Ok(())
    }

    // Likelihood-weighted masses go to the scratch buffer; the belief is untouched. Returns
    // P(observation) under the current belief.
    pub(crate) fn weigh(&mut self, observation: Observation) -> Result<Float, FilterError> {
        self.ensure_ready()?;
        let mut total = 0.0;
        for ((weighted, mass), expected) in self
            .scratch
            .iter_mut()
            .zip(self.belief.as_slice())
            .zip(&self.expected)
        {
            *weighted = match expected {
                Some(expected) => mass * self.sensor.probability(*expected, observation),
                None => 0.0,
            };
            total += *weighted;
        }
        Ok(total)
    }

    // Normalize the scratch buffer by `total` and make it the belief.
    pub(crate) fn commit_weighted(&mut self, total: Float) {
        self.scratch.iter_mut().for_each(|p| *p /= total);
        self.belief.swap(&mut self.scratch);
    }

    /// The cell with the most mass, ties to the lowest row-major index.
    pub fn most_likely_position(&self) -> Result<Position, FilterError> {
        self.ensure_ready()?;
        Ok(self.belief.most_likely())
    }

    /// Mass at a position.
    pub fn belief_at(&self, position: Position) -> Result<Float, FilterError> {
        self.ensure_ready()?;
        self.belief.at(position)
    }

    /// Entropy of the belief in nats.
    pub fn entropy(&self) -> Result<Float, FilterError> {
        self.ensure_ready()?;
        Ok(self.belief.entropy())
    }

    /// Mass per column.
    pub fn marginal_x(&self) -> Result<Vec<Float>, FilterError> {
        self.ensure_ready()?;
        Ok(self.belief.marginal_x())
    }

    /// Mass per row.
    pub fn marginal_y(&self) -> Result<Vec<Float>, FilterError> {
        self.ensure_ready()?;
        Ok(self.belief.marginal_y())
    }

    /// The whole belief.
    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    /// Whether the belief has been initialized.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The map the filter localizes on.
    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub(crate) fn expected_observation(&self, position: Position) -> Option<Observation> {
        let index = self.map.index_of(position).ok()?;
        self.expected[index]
    }

    pub(crate) fn symbol_frequency(&self, observation: Observation) -> Float {
        self.symbol_frequency
            .get(&observation)
            .copied()
            .unwrap_or(0.0)
    }

    #[cfg(test)]
    pub(crate) fn belief_mut(&mut self) -> &mut Belief {
        &mut self.belief
    }

    fn ensure_ready(&self) -> Result<(), FilterError> {
        if self.ready {
            Ok(())
        } else {
            Err(FilterError::Uninitialized)
        }
    }
}
