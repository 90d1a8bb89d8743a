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

//! Localization when the agent does not know which of several maps it is on.
//!
//! The joint belief over (map, cell) is kept as one [`HistogramFilter`] per candidate map,
//! holding P(cell | map), and the map marginal P(map). Motion never moves mass between maps, so
//! `predict` runs each filter on its own and leaves the marginal alone. `update` reweighs every
//! map by how well it explains the observation.

use std::sync::Arc;

use gridworld::{
    Action, Environment, Float, GridMap, MotionModel, Observation, ObservationLikelihood,
    Position,
};

use crate::filter::DEGENERATE_MASS_EPSILON;
use crate::{BeliefInit, FilterError, HistogramFilter};

/// Histogram filter over a set of candidate maps.
#[derive(Debug, Clone)]
pub struct MapSetFilter {
    filters: Vec<HistogramFilter>,

    // P(map), sums to one once ready.
    weights: Vec<Float>,
    ready: bool,
}

impl MapSetFilter {
    /// Create an uninitialized filter. Every map shares the same motion model and sensor.
    pub fn new(
        maps: Vec<Arc<GridMap>>,
        motion: MotionModel,
        sensor: ObservationLikelihood,
    ) -> Result<Self, FilterError> {
        if maps.is_empty() {
            return Err(FilterError::EmptyMapSet);
        }
        let filters = maps
            .into_iter()
            .map(|map| HistogramFilter::new(map, motion.clone(), sensor))
            .collect::<Result<Vec<_>, _>>()?;
        let weights = vec![0.0; filters.len()];
        Ok(Self {
            filters,
            weights,
            ready: false,
        })
    }

    /// Candidate maps with the motion model and sensor of `environment`.
    pub fn for_environment<E: Environment + ?Sized>(
        environment: &E,
        maps: Vec<Arc<GridMap>>,
    ) -> Result<Self, FilterError> {
        Self::new(
            maps,
            environment.motion_model().clone(),
            *environment.observation_likelihood(),
        )
    }

    /// Equal mass on every traversable cell of every map, so a map starts out as likely as its
    /// share of the traversable cells.
    pub fn initialize_uniform(&mut self) -> Result<(), FilterError> {
        let total: usize = self
            .filters
            .iter()
            .map(|filter| filter.map().traversable_count())
            .sum();
        for (filter, weight) in self.filters.iter_mut().zip(&mut self.weights) {
            filter.initialize_belief(BeliefInit::Uniform)?;
            *weight = filter.map().traversable_count() as Float / total as Float;
        }
        self.ready = true;
        Ok(())
    }

    /// All mass on map `index`, seeded with `init` there.
    pub fn initialize_on_map(&mut self, index: usize, init: BeliefInit) -> Result<(), FilterError> {
        self.check_index(index)?;
        for (i, (filter, weight)) in self.filters.iter_mut().zip(&mut self.weights).enumerate() {
            if i == index {
                filter.initialize_belief(init)?;
                *weight = 1.0;
            } else {
                filter.initialize_belief(BeliefInit::Uniform)?;
                *weight = 0.0;
            }
        }
        self.ready = true;
        Ok(())
    }

    /// Motion step on every map.
    pub fn predict(&mut self, action: Action) -> Result<(), FilterError> {
        self.ensure_ready()?;
        for filter in &mut self.filters {
            filter.predict(action)?;
        }
        Ok(())
    }

    /// Observation step over the joint belief. A map that cannot explain the observation drops to
    /// zero. If no map can, every belief is left as it was.
    pub fn update(&mut self, observation: Observation) -> Result<(), FilterError> {
        self.ensure_ready()?;
        // P(observation | map), zero for maps that are already ruled out or that rule it out.
        let mut evidence = Vec::with_capacity(self.filters.len());
        for (filter, weight) in self.filters.iter_mut().zip(&self.weights) {
            let within = if *weight > 0.0 {
                filter.weigh(observation)?
            } else {
                0.0
            };
            evidence.push(if within > DEGENERATE_MASS_EPSILON {
                within
            } else {
                0.0
            });
        }
        let total: Float = evidence
            .iter()
            .zip(&self.weights)
            .map(|(within, weight)| within * weight)
            .sum();
        if total <= DEGENERATE_MASS_EPSILON {
            tracing::warn!(%observation, total, "observation ruled out every map");
            return Err(FilterError::DegenerateBelief { total_mass: total });
        }

        for ((filter, weight), within) in self
            .filters
            .iter_mut()
            .zip(&mut self.weights)
            .zip(evidence)
        {
            *weight = *weight * within / total;
            if within > 0.0 {
                filter.commit_weighted(within);
            }
        }
        tracing::debug!(
            %observation,
            most_likely_map = self.most_likely_index(),
            "map set update"
        );
        Ok(())
    }

    /// P(map) for every candidate, in the order the maps were given.
    pub fn marginal_map(&self) -> Result<Vec<Float>, FilterError> {
        self.ensure_ready()?;
        Ok(self.weights.clone())
    }

    /// The most probable map, ties to the lowest index.
    pub fn most_likely_map(&self) -> Result<usize, FilterError> {
        self.ensure_ready()?;
        Ok(self.most_likely_index())
    }

    /// The (map, cell) pair with the most joint mass, ties to the lowest map index and then the
    /// lowest row-major index.
    pub fn most_likely(&self) -> Result<(usize, Position), FilterError> {
        self.ensure_ready()?;
        let mut best: Option<(usize, Position, Float)> = None;
        for (index, (filter, weight)) in self.filters.iter().zip(&self.weights).enumerate() {
            let position = filter.most_likely_position()?;
            let mass = weight * filter.belief_at(position)?;
            if best.map_or(true, |(_, _, best_mass)| mass > best_mass) {
                best = Some((index, position, mass));
            }
        }
        best.map(|(index, position, _)| (index, position))
            .ok_or(FilterError::EmptyMapSet)
    }

    /// Joint mass of `position` on map `index`.
    pub fn belief_at(&self, index: usize, position: Position) -> Result<Float, FilterError> {
        self.ensure_ready()?;
        self.check_index(index)?;
        Ok(self.weights[index] * self.filters[index].belief_at(position)?)
    }

    /// Entropy of the joint belief in nats: H(map) plus the expected entropy within a map.
    pub fn entropy(&self) -> Result<Float, FilterError> {
        self.ensure_ready()?;
        let mut entropy = 0.0;
        for (filter, weight) in self.filters.iter().zip(&self.weights) {
            if *weight > 0.0 {
                entropy += weight * (filter.entropy()? - weight.ln());
            }
        }
        Ok(entropy)
    }

    /// The per-map filter holding P(cell | map).
    pub fn filter(&self, index: usize) -> Option<&HistogramFilter> {
        self.filters.get(index)
    }

    /// Number of candidate maps.
    pub fn map_count(&self) -> usize {
        self.filters.len()
    }

    /// Whether the belief has been initialized.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn most_likely_index(&self) -> usize {
        let mut best = 0;
        for (index, weight) in self.weights.iter().enumerate() {
            if *weight > self.weights[best] {
                best = index;
            }
        }
        best
    }

    fn check_index(&self, index: usize) -> Result<(), FilterError> {
        if index < self.filters.len() {
            Ok(())
        } else {
            Err(FilterError::MapIndexOutOfRange {
                index,
                count: self.filters.len(),
            })
        }
    }

    fn ensure_ready(&self) -> Result<(), FilterError> {
        if self.ready {
            Ok(())
        } else {
            Err(FilterError::Uninitialized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use gridworld::{GridError, ObservationModel};

    fn digit_maps(layouts: &[&str]) -> Vec<Arc<GridMap>> {
        layouts
            .iter()
            .map(|layout| Arc::new(GridMap::parse(layout).expect("parse failed")))
            .collect()
    }

    fn exact_digit_filter(layouts: &[&str]) -> MapSetFilter {
        MapSetFilter::new(
            digit_maps(layouts),
            MotionModel::deterministic(),
            ObservationLikelihood::exact(ObservationModel::Digit),
        )
        .expect("MapSetFilter::new failed")
    }

    fn assert_joint_normalized(filter: &MapSetFilter) {
        let marginal = filter.marginal_map().expect("marginal_map failed");
        assert_abs_diff_eq!(marginal.iter().sum::<Float>(), 1.0, epsilon = 1e-9);
        for index in 0..filter.map_count() {
            let within = filter.filter(index).expect("missing filter").belief();
            assert_abs_diff_eq!(within.total_mass(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_empty_map_set_rejected() {
        assert_eq!(
            MapSetFilter::new(
                Vec::new(),
                MotionModel::deterministic(),
                ObservationLikelihood::default()
            )
            .map(|_| ()),
            Err(FilterError::EmptyMapSet)
        );
    }

    #[test]
    fn test_uninitialized_map_set_rejects_calls() {
        let mut filter = exact_digit_filter(&["12\n34"]);
        assert!(!filter.is_ready());
        assert_eq!(filter.predict(Action::Up), Err(FilterError::Uninitialized));
        assert_eq!(filter.update(Observation(1)), Err(FilterError::Uninitialized));
        assert_eq!(filter.marginal_map(), Err(FilterError::Uninitialized));
    }

    #[test]
    fn test_uniform_weights_follow_traversable_cells() {
        let mut filter = exact_digit_filter(&["12\n34", "5#\n#6"]);
        filter.initialize_uniform().expect("initialize_uniform failed");
        let marginal = filter.marginal_map().expect("marginal_map failed");
        assert_abs_diff_eq!(marginal[0], 4.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(marginal[1], 2.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            filter
                .belief_at(1, Position::new(1, 1))
                .expect("belief_at failed"),
            1.0 / 6.0,
            epsilon = 1e-12
        );
        assert_eq!(filter.belief_at(1, Position::new(1, 0)), Ok(0.0));
        assert_joint_normalized(&filter);
    }

    #[test]
    fn test_unique_reading_identifies_map() {
        let mut filter = exact_digit_filter(&["12\n34", "56\n78"]);
        filter.initialize_uniform().expect("initialize_uniform failed");
        filter.update(Observation(6)).expect("update failed");
        assert_eq!(filter.marginal_map(), Ok(vec![0.0, 1.0]));
        assert_eq!(filter.most_likely_map(), Ok(1));
        assert_eq!(filter.most_likely(), Ok((1, Position::new(1, 0))));
        assert_eq!(filter.entropy(), Ok(0.0));
    }

    #[test]
    fn test_motion_disambiguates_mirrored_maps() {
        let mut filter = exact_digit_filter(&["12\n34", "21\n43"]);
        filter.initialize_uniform().expect("initialize_uniform failed");
        filter.update(Observation(1)).expect("update failed");
        let marginal = filter.marginal_map().expect("marginal_map failed");
        assert_abs_diff_eq!(marginal[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(marginal[1], 0.5, epsilon = 1e-12);

        // On the first map the agent reaches the 2; on the mirrored map it is against the edge
        // and keeps reading 1.
        filter.predict(Action::Right).expect("predict failed");
        filter.update(Observation(2)).expect("update failed");
        assert_eq!(filter.marginal_map(), Ok(vec![1.0, 0.0]));
        assert_eq!(filter.most_likely(), Ok((0, Position::new(1, 0))));
        assert_joint_normalized(&filter);
    }

    #[test]
    fn test_degenerate_update_leaves_map_set_unchanged() {
        let mut filter = exact_digit_filter(&["12\n34", "56\n78"]);
        filter.initialize_uniform().expect("initialize_uniform failed");
        let before = filter.marginal_map().expect("marginal_map failed");
        assert_eq!(
            filter.update(Observation(9)),
            Err(FilterError::DegenerateBelief { total_mass: 0.0 })
        );
        assert_eq!(filter.marginal_map(), Ok(before));
        assert_joint_normalized(&filter);
    }

    #[test]
    fn test_noisy_update_keeps_every_map_alive() {
        let mut filter = MapSetFilter::new(
            digit_maps(&["12\n34", "56\n78", "11\n11"]),
            MotionModel::lateral_drift(0.1).expect("lateral_drift failed"),
            ObservationLikelihood::new(ObservationModel::Digit, 0.2).expect("new failed"),
        )
        .expect("MapSetFilter::new failed");
        filter.initialize_uniform().expect("initialize_uniform failed");
        for (action, observation) in [(Action::Down, 1), (Action::Right, 1), (Action::Up, 1)] {
            filter.predict(action).expect("predict failed");
            filter.update(Observation(observation)).expect("update failed");
            assert_joint_normalized(&filter);
        }
        let marginal = filter.marginal_map().expect("marginal_map failed");
        assert!(marginal.iter().all(|p| *p > 0.0));
        assert_eq!(filter.most_likely_map(), Ok(2));
    }

    #[test]
    fn test_joint_entropy_of_uniform_belief() {
        let mut filter = MapSetFilter::new(
            vec![
                Arc::new(GridMap::new(2, 2).expect("GridMap::new failed")),
                Arc::new(GridMap::new(2, 2).expect("GridMap::new failed")),
            ],
            MotionModel::deterministic(),
            ObservationLikelihood::default(),
        )
        .expect("MapSetFilter::new failed");
        filter.initialize_uniform().expect("initialize_uniform failed");
        assert_abs_diff_eq!(
            filter.entropy().expect("entropy failed"),
            (8.0 as Float).ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_initialize_on_map() {
        let mut filter = exact_digit_filter(&["12\n34", "56\n78"]);
        assert_eq!(
            filter.initialize_on_map(2, BeliefInit::Uniform),
            Err(FilterError::MapIndexOutOfRange { index: 2, count: 2 })
        );
        filter
            .initialize_on_map(1, BeliefInit::KnownStart(Position::new(0, 1)))
            .expect("initialize_on_map failed");
        assert_eq!(filter.marginal_map(), Ok(vec![0.0, 1.0]));
        assert_eq!(filter.belief_at(1, Position::new(0, 1)), Ok(1.0));
        assert_eq!(
            filter.belief_at(1, Position::new(5, 5)),
            Err(FilterError::Grid(GridError::OutOfBounds(Position::new(5, 5))))
        );
    }
}
