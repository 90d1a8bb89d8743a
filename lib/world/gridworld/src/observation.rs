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

//! What the agent senses at a position, and how likely each reading is.

use rand::Rng as _;
use serde::{Deserialize, Serialize};

use crate::{Action, Float, GridError, GridMap, Position, Rng};

/// A sensor reading. The alphabet depends on the [`ObservationModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Observation(pub u8);

impl std::fmt::Display for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic map from a position to the symbol a noiseless sensor reads there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationModel {
    /// Which of the four neighbours are blocked, as a bit mask: up 1, right 2, down 4, left 8.
    /// A neighbour off the grid counts as blocked.
    #[default]
    WallPattern,

    /// The digit label of the cell; unlabelled cells read 0.
    Digit,
}

impl ObservationModel {
    /// Alphabet size.
    pub fn symbol_count(self) -> usize {
        match self {
            ObservationModel::WallPattern => 16,
            ObservationModel::Digit => 10,
        }
    }

    /// Noiseless reading at `position`.
    pub fn observe(self, map: &GridMap, position: Position) -> Result<Observation, GridError> {
        let cell = map.cell_at(position)?;
        let symbol = match self {
            ObservationModel::WallPattern => Action::MOVES
                .iter()
                .enumerate()
                .filter(|(_, action)| {
                    !position
                        .step(**action)
                        .is_some_and(|next| map.is_open(next))
                })
                .fold(0u8, |mask, (bit, _)| mask | (1 << bit)),
            ObservationModel::Digit => cell.digit.unwrap_or(0),
        };
        Ok(Observation(symbol))
    }
}

/// P(observation | position): the noiseless reading with probability `1 - noise`, every other
/// symbol with probability `noise / (K - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SensorSettings")]
pub struct ObservationLikelihood {
    model: ObservationModel,
    noise: Float,
    #[serde(skip_serializing)]
    hit: Float,
    #[serde(skip_serializing)]
    miss: Float,
}

/// Serialized form of an [`ObservationLikelihood`]; `hit` and `miss` are always derived from
/// `noise` on the way in.
#[derive(Deserialize)]
struct SensorSettings {
    model: ObservationModel,
    noise: Float,
}

impl TryFrom<SensorSettings> for ObservationLikelihood {
    type Error = GridError;

    fn try_from(settings: SensorSettings) -> Result<Self, Self::Error> {
        Self::new(settings.model, settings.noise)
    }
}

impl ObservationLikelihood {
    /// Noise must lie in `[0, 1)`.
    pub fn new(model: ObservationModel, noise: Float) -> Result<Self, GridError> {
        if !(0.0..1.0).contains(&noise) {
            return Err(GridError::InvalidConfig(format!(
                "observation noise must be in [0, 1), got {}",
                noise
            )));
        }
        let others = (model.symbol_count() - 1) as Float;
        Ok(Self {
            model,
            noise,
            hit: 1.0 - noise,
            miss: noise / others,
        })
    }

    /// A sensor that never errs.
    pub fn exact(model: ObservationModel) -> Self {
        Self {
            model,
            noise: 0.0,
            hit: 1.0,
            miss: 0.0,
        }
    }

    /// The underlying deterministic model.
    pub fn model(&self) -> ObservationModel {
        self.model
    }

    /// Probability that a wrong symbol is read.
    pub fn noise(&self) -> Float {
        self.noise
    }

    /// P(observed | the noiseless reading is `expected`). Symbols outside the model's alphabet
    /// are never read.
    pub fn probability(&self, expected: Observation, observed: Observation) -> Float {
        if observed.0 as usize >= self.model.symbol_count() {
            0.0
        } else if expected == observed {
            self.hit
        } else {
            self.miss
        }
    }

    /// P(observed | agent at `position`).
    pub fn likelihood(
        &self,
        map: &GridMap,
        observed: Observation,
        position: Position,
    ) -> Result<Float, GridError> {
        let expected = self.model.observe(map, position)?;
        Ok(self.probability(expected, observed))
    }

    /// Draw a reading for an agent at `position`.
    pub fn sample(
        &self,
        map: &GridMap,
        position: Position,
        rng: &mut Rng,
    ) -> Result<Observation, GridError> {
        let expected = self.model.observe(map, position)?;
        if self.noise == 0.0 || !rng.gen_bool(self.noise) {
            return Ok(expected);
        }
        // Uniform over the other K - 1 symbols.
        let offset = rng.gen_range(1..self.model.symbol_count()) as u8;
        let symbol = (expected.0 + offset) % self.model.symbol_count() as u8;
        Ok(Observation(symbol))
    }
}

impl Default for ObservationLikelihood {
    fn default() -> Self {
        Self::exact(ObservationModel::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    #[test]
    fn test_wall_pattern_corners_and_walls() {
        let map = GridMap::parse(
            "
            ...
            .#.
            ...
            ",
        )
        .expect("parse failed");
        let model = ObservationModel::WallPattern;
        // Top-left corner: up and left are off the grid.
        assert_eq!(model.observe(&map, Position::new(0, 0)), Ok(Observation(1 | 8)));
        // Top middle: up off the grid, down is the wall.
        assert_eq!(model.observe(&map, Position::new(1, 0)), Ok(Observation(1 | 4)));
        // Bottom-right corner: right and down off the grid.
        assert_eq!(model.observe(&map, Position::new(2, 2)), Ok(Observation(2 | 4)));
        // Right middle: right off the grid, left is the wall.
        assert_eq!(model.observe(&map, Position::new(2, 1)), Ok(Observation(2 | 8)));
    }

    #[test]
    fn test_open_center_reads_zero() {
        let map = GridMap::new(3, 3).expect("GridMap::new failed");
        assert_eq!(
            ObservationModel::WallPattern.observe(&map, Position::new(1, 1)),
            Ok(Observation(0))
        );
        assert!(ObservationModel::WallPattern
            .observe(&map, Position::new(3, 0))
            .is_err());
    }

    #[test]
    fn test_digit_reading() {
        let map = GridMap::parse(
            "
            12
            .9
            ",
        )
        .expect("parse failed");
        let model = ObservationModel::Digit;
        assert_eq!(model.observe(&map, Position::new(0, 0)), Ok(Observation(1)));
        assert_eq!(model.observe(&map, Position::new(1, 1)), Ok(Observation(9)));
        assert_eq!(model.observe(&map, Position::new(0, 1)), Ok(Observation(0)));
    }

    #[test]
    fn test_likelihood_sums_to_one_over_alphabet() {
        for model in [ObservationModel::WallPattern, ObservationModel::Digit] {
            let likelihood = ObservationLikelihood::new(model, 0.3).expect("new failed");
            let total: Float = (0..model.symbol_count() as u8)
                .map(|symbol| likelihood.probability(Observation(2), Observation(symbol)))
                .sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_symbol_outside_alphabet_has_zero_likelihood() {
        for model in [ObservationModel::WallPattern, ObservationModel::Digit] {
            let likelihood = ObservationLikelihood::new(model, 0.1).expect("new failed");
            let outside = Observation(model.symbol_count() as u8);
            assert_eq!(likelihood.probability(Observation(0), outside), 0.0);
            assert_eq!(likelihood.probability(Observation(0), Observation(200)), 0.0);
        }
    }

    #[test]
    fn test_deserialize_derives_hit_and_miss_from_noise() {
        let likelihood: ObservationLikelihood =
            serde_json::from_str(r#"{"model": "digit", "noise": 0.9, "hit": 1.0, "miss": 0.0}"#)
                .expect("from_str failed");
        assert_eq!(
            likelihood,
            ObservationLikelihood::new(ObservationModel::Digit, 0.9).expect("new failed")
        );
        assert_abs_diff_eq!(
            likelihood.probability(Observation(3), Observation(3)),
            0.1,
            epsilon = 1e-12
        );

        let serialized = serde_json::to_string(&likelihood).expect("to_string failed");
        assert_eq!(serialized, r#"{"model":"digit","noise":0.9}"#);

        let out_of_range: Result<ObservationLikelihood, _> =
            serde_json::from_str(r#"{"model": "digit", "noise": 1.5}"#);
        assert!(out_of_range.is_err());
    }

    #[test]
    fn test_noise_out_of_range() {
        assert!(ObservationLikelihood::new(ObservationModel::Digit, 1.0).is_err());
        assert!(ObservationLikelihood::new(ObservationModel::Digit, -0.1).is_err());
    }

    #[test]
    fn test_exact_sampling_is_noiseless() {
        let map = GridMap::new(4, 4).expect("GridMap::new failed");
        let likelihood = ObservationLikelihood::exact(ObservationModel::WallPattern);
        let mut rng = Rng::seed_from_u64(3);
        for position in map.positions() {
            assert_eq!(
                likelihood.sample(&map, position, &mut rng),
                ObservationModel::WallPattern.observe(&map, position)
            );
        }
    }

    #[test]
    fn test_noisy_sampling_error_rate() {
        let map = GridMap::new(3, 3).expect("GridMap::new failed");
        let likelihood =
            ObservationLikelihood::new(ObservationModel::WallPattern, 0.25).expect("new failed");
        let mut rng = Rng::seed_from_u64(11);
        let position = Position::new(1, 1);
        let trials = 10_000;
        let mut wrong = 0;
        for _ in 0..trials {
            let observation = likelihood
                .sample(&map, position, &mut rng)
                .expect("sample failed");
            assert!((observation.0 as usize) < 16);
            if observation != Observation(0) {
                wrong += 1;
            }
        }
        assert_abs_diff_eq!(wrong as Float / trials as Float, 0.25, epsilon = 0.02);
    }
}
