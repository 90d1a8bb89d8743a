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

//! Stochastic motion: an action resolves to one of a few outcomes, each with a fixed probability.

use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

use crate::{Action, Float, GridError, GridMap, Position, Rng};

const PROBABILITY_TOLERANCE: Float = 1e-9;

/// What actually happens when an action is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionOutcome {
    /// One step in the intended direction.
    Intended,

    /// One step a quarter turn clockwise of the intended direction.
    DriftClockwise,

    /// One step a quarter turn counter-clockwise of the intended direction.
    DriftCounterClockwise,

    /// Two steps in the intended direction.
    Overshoot,

    /// No movement.
    Undershoot,
}

impl MotionOutcome {
    // Direction and number of unit steps.
    fn steps(self, action: Action) -> (Action, usize) {
        match self {
            MotionOutcome::Intended => (action, 1),
            MotionOutcome::DriftClockwise => (action.clockwise(), 1),
            MotionOutcome::DriftCounterClockwise => (action.counter_clockwise(), 1),
            MotionOutcome::Overshoot => (action, 2),
            MotionOutcome::Undershoot => (action, 0),
        }
    }
}

/// A probability distribution over [`MotionOutcome`]s, shared by the environment (to move the
/// agent) and the filter (to predict).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MotionSettings")]
pub struct MotionModel {
    outcomes: Vec<(MotionOutcome, Float)>,
}

#[derive(Deserialize)]
struct MotionSettings {
    outcomes: Vec<(MotionOutcome, Float)>,
}

impl TryFrom<MotionSettings> for MotionModel {
    type Error = GridError;

    fn try_from(settings: MotionSettings) -> Result<Self, Self::Error> {
        Self::new(settings.outcomes)
    }
}

impl MotionModel {
    /// Create a model from outcome probabilities. Probabilities must be non-negative and sum to
    /// one; zero-probability outcomes are dropped.
    pub fn new(outcomes: Vec<(MotionOutcome, Float)>) -> Result<Self, GridError> {
        if let Some((outcome, p)) = outcomes.iter().find(|(_, p)| !(*p >= 0.0)) {
            return Err(GridError::InvalidConfig(format!(
                "probability of {:?} must be non-negative, got {}",
                outcome, p
            )));
        }
        let total: Float = outcomes.iter().map(|(_, p)| p).sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(GridError::InvalidConfig(format!(
                "motion probabilities must sum to 1, got {}",
                total
            )));
        }
        Ok(Self {
            outcomes: outcomes.into_iter().filter(|(_, p)| *p > 0.0).collect(),
        })
    }

    /// Every action does exactly what it says.
    pub fn deterministic() -> Self {
        Self {
            outcomes: vec![(MotionOutcome::Intended, 1.0)],
        }
    }

    /// `1 - noise` intended, `noise / 2` for each lateral drift.
    pub fn lateral_drift(noise: Float) -> Result<Self, GridError> {
        if !(0.0..=1.0).contains(&noise) {
            return Err(GridError::InvalidConfig(format!(
                "motion noise must be in [0, 1], got {}",
                noise
            )));
        }
        Self::new(vec![
            (MotionOutcome::Intended, 1.0 - noise),
            (MotionOutcome::DriftClockwise, noise / 2.0),
            (MotionOutcome::DriftCounterClockwise, noise / 2.0),
        ])
    }

    /// Alias of [`MotionModel::lateral_drift`], named after the configuration field it reads.
    pub fn from_noise(noise_std: Float) -> Result<Self, GridError> {
        Self::lateral_drift(noise_std)
    }

    /// Exact/overshoot/undershoot model: the agent moves one cell, two cells or not at all.
    pub fn with_overshoot(
        exact: Float,
        overshoot: Float,
        undershoot: Float,
    ) -> Result<Self, GridError> {
        Self::new(vec![
            (MotionOutcome::Intended, exact),
            (MotionOutcome::Overshoot, overshoot),
            (MotionOutcome::Undershoot, undershoot),
        ])
    }

    /// Outcomes with nonzero probability.
    pub fn outcomes(&self) -> &[(MotionOutcome, Float)] {
        &self.outcomes
    }

    /// Where `outcome` of `action` leaves an agent at `source`. If any unit step of the outcome
    /// leaves the grid or enters a wall, the agent stays at `source`.
    pub fn resolve(
        map: &GridMap,
        source: Position,
        action: Action,
        outcome: MotionOutcome,
    ) -> Position {
        let (direction, steps) = outcome.steps(action);
        let mut current = source;
        for _ in 0..steps {
            match current.step(direction) {
                Some(next) if map.is_open(next) => current = next,
                _ => return source,
            }
        }
        current
    }

    /// Draw an outcome.
    pub fn sample(&self, rng: &mut Rng) -> MotionOutcome {
        // Construction guarantees positive weights, so this only fails on an empty model.
        WeightedIndex::new(self.outcomes.iter().map(|(_, p)| *p))
            .map(|weights| self.outcomes[weights.sample(rng)].0)
            .unwrap_or(MotionOutcome::Undershoot)
    }
}

impl Default for MotionModel {
    fn default() -> Self {
        Self::deterministic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    fn open(width: usize, height: usize) -> GridMap {
        GridMap::new(width, height).expect("GridMap::new failed")
    }

    #[test]
    fn test_probabilities_must_sum_to_one() {
        assert!(matches!(
            MotionModel::new(vec![(MotionOutcome::Intended, 0.5)]),
            Err(GridError::InvalidConfig(_))
        ));
        assert!(matches!(
            MotionModel::new(vec![
                (MotionOutcome::Intended, 1.5),
                (MotionOutcome::Undershoot, -0.5)
            ]),
            Err(GridError::InvalidConfig(_))
        ));
        assert!(MotionModel::lateral_drift(1.5).is_err());
    }

    #[test]
    fn test_deserialize_validates_probabilities() {
        let model: MotionModel = serde_json::from_str(
            r#"{"outcomes": [["intended", 0.8], ["drift_clockwise", 0.2]]}"#,
        )
        .expect("from_str failed");
        assert_eq!(model.outcomes().len(), 2);

        let unnormalized: Result<MotionModel, _> =
            serde_json::from_str(r#"{"outcomes": [["intended", 0.5]]}"#);
        assert!(unnormalized.is_err());
    }

    #[test]
    fn test_lateral_drift_split() {
        let model = MotionModel::lateral_drift(0.2).expect("lateral_drift failed");
        let outcomes = model.outcomes();
        assert_eq!(outcomes.len(), 3);
        assert_abs_diff_eq!(outcomes[0].1, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(outcomes[1].1, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(outcomes[2].1, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_noise_drops_drift() {
        let model = MotionModel::from_noise(0.0).expect("from_noise failed");
        assert_eq!(model, MotionModel::deterministic());
    }

    #[test]
    fn test_resolve_intended_and_drift() {
        let map = open(3, 3);
        let center = Position::new(1, 1);
        assert_eq!(
            MotionModel::resolve(&map, center, Action::Up, MotionOutcome::Intended),
            Position::new(1, 0)
        );
        assert_eq!(
            MotionModel::resolve(&map, center, Action::Up, MotionOutcome::DriftClockwise),
            Position::new(2, 1)
        );
        assert_eq!(
            MotionModel::resolve(&map, center, Action::Up, MotionOutcome::DriftCounterClockwise),
            Position::new(0, 1)
        );
        assert_eq!(
            MotionModel::resolve(&map, center, Action::Down, MotionOutcome::Undershoot),
            center
        );
    }

    #[test]
    fn test_resolve_reflects_off_walls_and_edges() {
        let map = GridMap::parse(
            "
            .#.
            ...
            ",
        )
        .expect("parse failed");
        let origin = Position::new(0, 0);
        assert_eq!(
            MotionModel::resolve(&map, origin, Action::Right, MotionOutcome::Intended),
            origin
        );
        assert_eq!(MotionModel::resolve(&map, origin, Action::Up, MotionOutcome::Intended), origin);
        assert_eq!(
            MotionModel::resolve(&map, origin, Action::Left, MotionOutcome::Intended),
            origin
        );
        assert_eq!(
            MotionModel::resolve(&map, origin, Action::Down, MotionOutcome::Intended),
            Position::new(0, 1)
        );
    }

    #[test]
    fn test_overshoot_needs_both_cells_open() {
        let map = GridMap::parse("..#.").expect("parse failed");
        let origin = Position::new(0, 0);
        assert_eq!(
            MotionModel::resolve(&map, origin, Action::Right, MotionOutcome::Overshoot),
            origin
        );

        let map = open(4, 1);
        assert_eq!(
            MotionModel::resolve(&map, origin, Action::Right, MotionOutcome::Overshoot),
            Position::new(2, 0)
        );
        assert_eq!(
            MotionModel::resolve(
                &map,
                Position::new(3, 0),
                Action::Right,
                MotionOutcome::Overshoot
            ),
            Position::new(3, 0)
        );
    }

    #[test]
    fn test_sample_frequencies() {
        let model = MotionModel::with_overshoot(0.6, 0.3, 0.1).expect("with_overshoot failed");
        let mut rng = Rng::seed_from_u64(7);
        let trials = 20_000;
        let overshoots = (0..trials)
            .filter(|_| model.sample(&mut rng) == MotionOutcome::Overshoot)
            .count();
        assert_abs_diff_eq!(overshoots as Float / trials as Float, 0.3, epsilon = 0.02);
    }

    #[test]
    fn test_deterministic_sample() {
        let model = MotionModel::deterministic();
        let mut rng = Rng::seed_from_u64(0);
        for _ in 0..100 {
            assert_eq!(model.sample(&mut rng), MotionOutcome::Intended);
        }
    }
}
