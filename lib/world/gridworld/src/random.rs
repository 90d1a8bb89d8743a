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

//! Seeded random gridworlds. A layout is accepted only if its goal can be reached from its start
//! without crossing a wall or a pit; rejected layouts are regenerated up to
//! [`MAX_GENERATION_ATTEMPTS`] times.

use rand::seq::SliceRandom;
use rand::{Rng as _, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::grid_map::{DEFAULT_GOAL_REWARD, DEFAULT_PIT_REWARD};
use crate::{Cell, CellKind, GridError, GridMap, Position, Rng};

/// Number of layouts generated before giving up.
pub const MAX_GENERATION_ATTEMPTS: usize = 100;

/// Random gridworld layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomLayout {
    /// One wall, one pit and one goal.
    Simple,

    /// Up to `sqrt(width * height) - 2` walls and as many pits.
    Hard,
}

/// Generate a random gridworld. The same seed always gives the same map.
pub fn generate(
    width: usize,
    height: usize,
    layout: RandomLayout,
    seed: u64,
) -> Result<GridMap, GridError> {
    generate_with_attempts(width, height, layout, seed, MAX_GENERATION_ATTEMPTS)
}

/// [`generate`] with an explicit retry bound. Fails with [`GridError::MazeGeneration`] once
/// `max_attempts` layouts have been rejected.
pub fn generate_with_attempts(
    width: usize,
    height: usize,
    layout: RandomLayout,
    seed: u64,
    max_attempts: usize,
) -> Result<GridMap, GridError> {
    let minimum_cells = match layout {
        RandomLayout::Simple => 4,
        RandomLayout::Hard => 2,
    };
    if width * height < minimum_cells {
        return Err(GridError::InvalidMap(format!(
            "a {:?} random grid needs at least {} cells, got {}x{}",
            layout, minimum_cells, width, height
        )));
    }

    let mut rng = Rng::seed_from_u64(seed);
    for attempt in 1..=max_attempts {
        let (map, goal) = generate_layout(width, height, layout, &mut rng)?;
        if map.is_reachable(map.start(), goal)? {
            tracing::info!(width, height, ?layout, seed, attempt, "generated random grid");
            return Ok(map);
        }
        tracing::warn!(attempt, "random grid has no start-to-goal path, regenerating");
    }
    Err(GridError::MazeGeneration {
        attempts: max_attempts,
    })
}

fn generate_layout(
    width: usize,
    height: usize,
    layout: RandomLayout,
    rng: &mut Rng,
) -> Result<(GridMap, Position), GridError> {
    let mut map = GridMap::new(width, height)?;
    let start = map.position_of(rng.gen_range(0..map.len()));
    map = map.with_start(start)?;

    let goal = pick_free_cell(&map, rng)
        .ok_or_else(|| GridError::InvalidMap("no room for a goal".to_string()))?;
    map.set_cell(goal, Cell::goal(DEFAULT_GOAL_REWARD))?;

    let (walls, pits) = match layout {
        RandomLayout::Simple => (1, 1),
        RandomLayout::Hard => {
            let max_obstacles = ((map.len() as f64).sqrt() as usize).saturating_sub(2);
            (
                rng.gen_range(0..=max_obstacles),
                rng.gen_range(0..=max_obstacles),
            )
        }
    };
    for _ in 0..walls {
        if let Some(position) = pick_free_cell(&map, rng) {
            map.set_cell(position, Cell::wall())?;
        }
    }
    for _ in 0..pits {
        if let Some(position) = pick_free_cell(&map, rng) {
            map.set_cell(position, Cell::pit(DEFAULT_PIT_REWARD))?;
        }
    }
    Ok((map, goal))
}

// A free cell other than the start, or None when the grid is full.
fn pick_free_cell(map: &GridMap, rng: &mut Rng) -> Option<Position> {
    let candidates: Vec<Position> = map
        .positions()
        .filter(|position| *position != map.start())
        .filter(|position| {
            matches!(map.cell_at(*position), Ok(cell) if cell.kind == CellKind::Free)
        })
        .collect();
    candidates.choose(rng).copied()
}
