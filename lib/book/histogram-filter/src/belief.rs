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

use gridworld::{Dimensions, Float, GridError, Int, Position};
use serde::{Deserialize, Serialize};

use crate::FilterError;

/// Probability mass per grid cell, row-major. Allocated once and never resized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    width: usize,
    height: usize,
    probabilities: Vec<Float>,
}

// Fixed-precision grid, one row per line.
impl std::fmt::Display for Belief {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (y, row) in self.probabilities.chunks(self.width).enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            let row: Vec<String> = row.iter().map(|p| format!("{:.3}", p)).collect();
            write!(f, "{}", row.join(" "))?;
        }
        Ok(())
    }
}

impl Belief {
    /// All-zero belief.
    pub fn zeros(dimensions: Dimensions) -> Self {
        Self {
            width: dimensions.width,
            height: dimensions.height,
            probabilities: vec![0.0; dimensions.cells()],
        }
    }

    /// Width and height.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Mass at a position.
    pub fn at(&self, position: Position) -> Result<Float, FilterError> {
        if position.x < 0
            || position.y < 0
            || position.x as usize >= self.width
            || position.y as usize >= self.height
        {
            return Err(GridError::OutOfBounds(position).into());
        }
        Ok(self.probabilities[position.y as usize * self.width + position.x as usize])
    }

    /// Masses in row-major order.
    pub fn as_slice(&self) -> &[Float] {
        &self.probabilities
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Float] {
        &mut self.probabilities
    }

    pub(crate) fn swap(&mut self, other: &mut Vec<Float>) {
        std::mem::swap(&mut self.probabilities, other);
    }

    /// Sum of all masses.
    pub fn total_mass(&self) -> Float {
        self.probabilities.iter().sum()
    }

    /// Shannon entropy in nats, `-sum(p ln p)` over nonzero entries.
    pub fn entropy(&self) -> Float {
        -self
            .probabilities
            .iter()
            .filter(|p| **p > 0.0)
            .map(|p| p * p.ln())
            .sum::<Float>()
    }

    /// The position with the most mass. Ties go to the lowest row-major index.
    pub fn most_likely(&self) -> Position {
        let mut best = 0;
        for (index, p) in self.probabilities.iter().enumerate() {
            if *p > self.probabilities[best] {
                best = index;
            }
        }
        self.position_of(best)
    }

    /// Mass per column.
    pub fn marginal_x(&self) -> Vec<Float> {
        let mut marginal = vec![0.0; self.width];
        for row in self.probabilities.chunks(self.width) {
            for (x, p) in row.iter().enumerate() {
                marginal[x] += p;
            }
        }
        marginal
    }

    /// Mass per row.
    pub fn marginal_y(&self) -> Vec<Float> {
        self.probabilities
            .chunks(self.width)
            .map(|row| row.iter().sum())
            .collect()
    }

    pub(crate) fn position_of(&self, index: usize) -> Position {
        Position::new((index % self.width) as Int, (index / self.width) as Int)
    }
}
