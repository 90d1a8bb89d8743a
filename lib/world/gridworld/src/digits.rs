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

//! Mazes of digits. Every cell is free and labelled with a digit 0-9; the agent observes the
//! digit under it. The goal is labelled 9.

use rand::{Rng as _, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{Cell, GridError, GridMap, Position, Rng};

/// Reward of the goal cell in generated digit mazes.
pub const GOAL_REWARD: f64 = 10.0;

/// Procedural digit maze layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitLayout {
    /// Uniform digits 0-8 everywhere except the goal.
    Random,

    /// Digits grow towards the goal, so the maze can be climbed like a gradient.
    Structured,
}

/// The exemplary 4x4 digit maze.
pub fn exemplary() -> Result<GridMap, GridError> {
    const DIGITS: [[u8; 4]; 4] = [[2, 4, 7, 7], [1, 5, 7, 9], [2, 3, 6, 8], [1, 2, 5, 6]];
    let goal = Position::new(3, 0);
    let mut cells = Vec::with_capacity(16);
    for (y, row) in DIGITS.iter().enumerate() {
        for (x, digit) in row.iter().enumerate() {
            if goal == Position::new(x as i32, y as i32) {
                cells.push(Cell::goal(GOAL_REWARD).with_digit(*digit));
            } else {
                cells.push(Cell::digit(*digit));
            }
        }
    }
    GridMap::from_cells(4, 4, cells, Some(Position::new(0, 1)))
}

/// Generate a digit maze with a random start and a distinct random goal.
pub fn generate(
    width: usize,
    height: usize,
    layout: DigitLayout,
    seed: u64,
) -> Result<GridMap, GridError> {
    let cell_count = width * height;
    if cell_count < 2 {
        return Err(GridError::InvalidMap(format!(
            "a digit maze needs at least two cells, got {}x{}",
            width, height
        )));
    }
    let mut rng = Rng::seed_from_u64(seed);

    let start = rng.gen_range(0..cell_count);
    let mut goal = rng.gen_range(0..cell_count - 1);
    if goal >= start {
        goal += 1;
    }
    let goal_x = (goal % width) as f64;
    let goal_y = (goal / width) as f64;
    let scale = (cell_count as f64).sqrt();

    let mut cells = Vec::with_capacity(cell_count);
    for index in 0..cell_count {
        if index == goal {
            cells.push(Cell::goal(GOAL_REWARD).with_digit(9));
            continue;
        }
        let digit = match layout {
            DigitLayout::Random => rng.gen_range(0..=8),
            DigitLayout::Structured => {
                let dx = (index % width) as f64 - goal_x;
                let dy = (index / width) as f64 - goal_y;
                let scaled_distance = 10.0 * (dx * dx + dy * dy).sqrt() / scale;
                if scaled_distance < 1.1 {
                    8
                } else {
                    let low = (9.0 - scaled_distance.min(9.0)) as u8;
                    rng.gen_range(low..=(low + 1).min(9))
                }
            }
        };
        cells.push(Cell::digit(digit));
    }

    let start = Position::new((start % width) as i32, (start / width) as i32);
    let map = GridMap::from_cells(width, height, cells, Some(start))?;
    tracing::info!(width, height, ?layout, seed, "generated digit maze");
    Ok(map)
}

/// Import digit mazes from CSV text: a header line, a `width,height` line, a second header line,
/// then one maze per line as `width * height` comma-separated digits in row-major order.
/// Imported mazes have no goal and start in the top-left corner.
pub fn import_csv(text: &str) -> Result<Vec<GridMap>, GridError> {
    let mut lines = text.lines().map(str::trim);
    let _header = lines
        .next()
        .ok_or_else(|| GridError::InvalidMap("missing header line".to_string()))?;
    let size_line = lines
        .next()
        .ok_or_else(|| GridError::InvalidMap("missing maze size line".to_string()))?;
    let (width, height) = parse_size(size_line)?;
    let _second_header = lines
        .next()
        .ok_or_else(|| GridError::InvalidMap("missing second header line".to_string()))?;

    let mut mazes = Vec::new();
    for (line_number, line) in lines.enumerate().filter(|(_, line)| !line.is_empty()) {
        let cells = line
            .split(',')
            .map(|value| match value.trim().parse::<u8>() {
                Ok(digit) if digit <= 9 => Ok(Cell::digit(digit)),
                _ => Err(GridError::InvalidMap(format!(
                    "maze {}: invalid digit {:?}",
                    line_number, value
                ))),
            })
            .collect::<Result<Vec<Cell>, GridError>>()?;
        if cells.len() != width * height {
            return Err(GridError::InvalidMap(format!(
                "maze {}: expected {} values, got {}",
                line_number,
                width * height,
                cells.len()
            )));
        }
        mazes.push(GridMap::from_cells(width, height, cells, None)?);
    }

    if mazes.is_empty() {
        return Err(GridError::InvalidMap(
            "the file must contain at least one maze".to_string(),
        ));
    }
    tracing::info!(count = mazes.len(), width, height, "imported digit mazes");
    Ok(mazes)
}

fn parse_size(line: &str) -> Result<(usize, usize), GridError> {
    let invalid = || GridError::InvalidMap(format!("invalid maze size line: {:?}", line));
    let mut parts = line.split(',').map(|part| part.trim().parse::<usize>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(width)), Some(Ok(height)), None) if width > 0 && height > 0 => {
            Ok((width, height))
        }
        _ => Err(invalid()),
    }
}
