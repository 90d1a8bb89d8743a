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

//! Environment configuration. Everything derived from a configuration (the map, the motion
//! model, the sensor) is built once by [`initialize_environment`] or
//! [`EpisodicEnvironment::new`](crate::EpisodicEnvironment::new).

use serde::{Deserialize, Serialize};

use crate::digits::{self, DigitLayout};
use crate::random::{self, RandomLayout};
use crate::{
    Float, GridEnvironment, GridError, GridMap, MotionModel, ObservationLikelihood,
    ObservationModel, Position, Preset,
};

/// Structured environment configuration, usually read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// A preset name, `open`, `matrix`, `digits_csv`, `random`, `random_hard`, `digits_random`
    /// or `digits_structured`.
    pub map_name: String,

    /// Inline map text: the [`GridMap::parse`] format for `matrix`, the
    /// [`digits::import_csv`] format for `digits_csv`.
    pub map_matrix: Option<String>,

    /// Columns, for `open` and the generated maps.
    pub width: usize,

    /// Rows, for `open` and the generated maps.
    pub height: usize,

    /// Motion drift probability and observation error rate.
    pub noise_std: Float,

    /// Seed for map generation, motion sampling and observation noise.
    pub seed: u64,

    /// Episode length, 0 for unlimited.
    pub max_steps: usize,

    /// Which sensor the agent carries.
    pub sensor: ObservationModel,

    /// Overrides the map's start cell.
    pub start: Option<Position>,

    /// Episodic environments build a new procedural map on every reset.
    pub regenerate_on_reset: bool,

    /// Episodic environments drop the agent on a random non-terminal cell on every reset.
    pub random_start_on_reset: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            map_name: Preset::Exemplary.name().to_string(),
            map_matrix: None,
            width: 5,
            height: 5,
            noise_std: 0.0,
            seed: 0,
            max_steps: 100,
            sensor: ObservationModel::WallPattern,
            start: None,
            regenerate_on_reset: false,
            random_start_on_reset: false,
        }
    }
}

impl EnvironmentConfig {
    /// Parse and validate a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, GridError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GridError::InvalidConfig(format!("malformed configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), GridError> {
        if !(0.0..1.0).contains(&self.noise_std) {
            return Err(GridError::InvalidConfig(format!(
                "noise_std must be in [0, 1), got {}",
                self.noise_std
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(GridError::InvalidConfig(format!(
                "width and height must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        MapSource::from_config(self).map(|_| ())
    }

    /// Drift motion with `noise_std` spread over the two lateral directions.
    pub fn motion_model(&self) -> Result<MotionModel, GridError> {
        MotionModel::from_noise(self.noise_std)
    }

    /// The configured sensor with `noise_std` error rate.
    pub fn observation_likelihood(&self) -> Result<ObservationLikelihood, GridError> {
        ObservationLikelihood::new(self.sensor, self.noise_std)
    }

    /// Build the map for the first episode, applying the start override.
    pub fn build_map(&self) -> Result<GridMap, GridError> {
        let map = MapSource::from_config(self)?.build(self.seed)?;
        match self.start {
            Some(start) => map.with_start(start),
            None => Ok(map),
        }
    }

    /// Every map the agent could be on: all imported mazes for `digits_csv`, otherwise just the
    /// map of the first episode.
    pub fn candidate_maps(&self) -> Result<Vec<GridMap>, GridError> {
        match MapSource::from_config(self)? {
            MapSource::DigitCsv(mazes) => Ok(mazes),
            _ => Ok(vec![self.build_map()?]),
        }
    }
}

/// Where a map comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum MapSource {
    /// A hard-coded layout.
    Preset(Preset),

    /// An all-free grid.
    Open {
        /// Columns.
        width: usize,
        /// Rows.
        height: usize,
    },

    /// An imported text matrix.
    Matrix(String),

    /// Digit mazes imported from CSV text. Each seed picks maze `seed % count`.
    DigitCsv(Vec<GridMap>),

    /// A seeded random gridworld.
    Random {
        /// Simple or hard.
        layout: RandomLayout,
        /// Columns.
        width: usize,
        /// Rows.
        height: usize,
    },

    /// A seeded digit maze.
    Digits {
        /// Random or structured digits.
        layout: DigitLayout,
        /// Columns.
        width: usize,
        /// Rows.
        height: usize,
    },
}

impl MapSource {
    /// Resolve `map_name` and the size fields of a configuration.
    pub fn from_config(config: &EnvironmentConfig) -> Result<Self, GridError> {
        let (width, height) = (config.width, config.height);
        let source = match config.map_name.as_str() {
            "open" => MapSource::Open { width, height },
            "matrix" => MapSource::Matrix(matrix_text(config)?.to_string()),
            "digits_csv" => MapSource::DigitCsv(digits::import_csv(matrix_text(config)?)?),
            "random" => MapSource::Random {
                layout: RandomLayout::Simple,
                width,
                height,
            },
            "random_hard" => MapSource::Random {
                layout: RandomLayout::Hard,
                width,
                height,
            },
            "digits_random" => MapSource::Digits {
                layout: DigitLayout::Random,
                width,
                height,
            },
            "digits_structured" => MapSource::Digits {
                layout: DigitLayout::Structured,
                width,
                height,
            },
            name => MapSource::Preset(name.parse()?),
        };
        Ok(source)
    }

    /// Build a map. `seed` only matters for procedural sources.
    pub fn build(&self, seed: u64) -> Result<GridMap, GridError> {
        let map = match self {
            MapSource::Preset(preset) => preset.build()?,
            MapSource::Open { width, height } => GridMap::new(*width, *height)?,
            MapSource::Matrix(text) => GridMap::parse(text)?,
            MapSource::DigitCsv(mazes) => {
                let index = (seed % mazes.len() as u64) as usize;
                mazes[index].clone()
            }
            MapSource::Random {
                layout,
                width,
                height,
            } => random::generate(*width, *height, *layout, seed)?,
            MapSource::Digits {
                layout,
                width,
                height,
            } => digits::generate(*width, *height, *layout, seed)?,
        };
        tracing::debug!(source = ?self, width = map.width(), height = map.height(), "built map");
        Ok(map)
    }

    /// Whether different seeds give different maps.
    pub fn is_procedural(&self) -> bool {
        matches!(
            self,
            MapSource::Random { .. } | MapSource::Digits { .. } | MapSource::DigitCsv(_)
        )
    }
}

fn matrix_text(config: &EnvironmentConfig) -> Result<&str, GridError> {
    config.map_matrix.as_deref().ok_or_else(|| {
        GridError::InvalidConfig(format!(
            "map_name is {} but map_matrix is missing",
            config.map_name
        ))
    })
}

/// Build the continuous environment described by `config`, with the agent on the start cell.
pub fn initialize_environment(config: &EnvironmentConfig) -> Result<GridEnvironment, GridError> {
    config.validate()?;
    let map = config.build_map()?;
    tracing::info!(
        map = %config.map_name,
        width = map.width(),
        height = map.height(),
        start = %map.start(),
        "initialized environment"
    );
    GridEnvironment::new(
        map,
        config.motion_model()?,
        config.observation_likelihood()?,
        config.seed,
        config.max_steps,
    )
}
