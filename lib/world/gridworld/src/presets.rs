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

//! Hard-coded gridworld layouts. Each preset is a constant specification, so building it twice
//! gives identical maps.

use serde::{Deserialize, Serialize};

use crate::{digits, Cell, GridError, GridMap, Int, Position};

/// Named preset layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// 4x4 grid with one wall, one pit and one goal.
    Exemplary,

    /// 5x3 grid whose bottom row is a cliff of pits.
    Cliff,

    /// 5x5 grid with a close small reward and a distant large one behind walls.
    Discount,

    /// 7x3 bridge between pits, small reward on the left, large one on the right.
    Bridge,

    /// The 4x3 grid from the AIMA book, +1 goal and -1 pit.
    Book,

    /// 4x5 corridor maze.
    Maze,

    /// 4x4 grid from the deep Q-learning example.
    ExemplaryDql,

    /// The deep Q-learning grid with the wall moved next to the goal.
    ModifiedDql,

    /// 2x2 debugging grid.
    Debug2x2,

    /// 3x3 debugging grid, start surrounded by pits and one goal.
    Debug3x3,

    /// 4x4 maze of digits.
    DigitsExemplary,
}

impl Preset {
    /// Every preset.
    pub const ALL: [Preset; 11] = [
        Preset::Exemplary,
        Preset::Cliff,
        Preset::Discount,
        Preset::Bridge,
        Preset::Book,
        Preset::Maze,
        Preset::ExemplaryDql,
        Preset::ModifiedDql,
        Preset::Debug2x2,
        Preset::Debug3x3,
        Preset::DigitsExemplary,
    ];

    /// Name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Preset::Exemplary => "exemplary",
            Preset::Cliff => "cliff",
            Preset::Discount => "discount",
            Preset::Bridge => "bridge",
            Preset::Book => "book",
            Preset::Maze => "maze",
            Preset::ExemplaryDql => "exemplary_dql",
            Preset::ModifiedDql => "modified_dql",
            Preset::Debug2x2 => "debug_2x2",
            Preset::Debug3x3 => "debug_3x3",
            Preset::DigitsExemplary => "digits_exemplary",
        }
    }

    /// Build the map.
    pub fn build(self) -> Result<GridMap, GridError> {
        tracing::debug!(preset = self.name(), "building preset map");
        match self {
            Preset::Exemplary => layout(
                4,
                4,
                (0, 1),
                &[
                    ((2, 2), Cell::wall()),
                    ((1, 1), Cell::pit(-10.0)),
                    ((3, 3), Cell::goal(10.0)),
                ],
            ),
            Preset::Cliff => {
                let mut cells: Vec<((Int, Int), Cell)> =
                    (0..5).map(|x| ((x, 2), Cell::pit(-100.0))).collect();
                cells.push(((4, 1), Cell::goal(10.0)));
                layout(5, 3, (0, 1), &cells)
            }
            Preset::Discount => {
                let mut cells: Vec<((Int, Int), Cell)> =
                    (0..5).map(|x| ((x, 4), Cell::pit(-10.0))).collect();
                cells.extend([
                    ((1, 1), Cell::wall()),
                    ((1, 2), Cell::wall()),
                    ((3, 2), Cell::wall()),
                    ((2, 2), Cell::goal(1.0)),
                    ((4, 2), Cell::goal(10.0)),
                ]);
                layout(5, 5, (0, 3), &cells)
            }
            Preset::Bridge => {
                let mut cells: Vec<((Int, Int), Cell)> = (1..6)
                    .flat_map(|x| [((x, 0), Cell::pit(-100.0)), ((x, 2), Cell::pit(-100.0))])
                    .collect();
                cells.extend([
                    ((0, 0), Cell::wall()),
                    ((0, 2), Cell::wall()),
                    ((6, 0), Cell::wall()),
                    ((6, 2), Cell::wall()),
                    ((0, 1), Cell::goal(1.0)),
                    ((6, 1), Cell::goal(10.0)),
                ]);
                layout(7, 3, (1, 1), &cells)
            }
            Preset::Book => layout(
                4,
                3,
                (0, 2),
                &[
                    ((1, 1), Cell::wall()),
                    ((3, 1), Cell::pit(-1.0)),
                    ((3, 0), Cell::goal(1.0)),
                ],
            ),
            Preset::Maze => layout(
                4,
                5,
                (0, 4),
                &[
                    ((0, 1), Cell::wall()),
                    ((1, 1), Cell::wall()),
                    ((1, 2), Cell::wall()),
                    ((1, 3), Cell::wall()),
                    ((2, 3), Cell::wall()),
                    ((3, 1), Cell::wall()),
                    ((3, 0), Cell::goal(1.0)),
                ],
            ),
            Preset::ExemplaryDql => layout(
                4,
                4,
                (0, 3),
                &[
                    ((1, 2), Cell::wall()),
                    ((2, 2), Cell::pit(-10.0)),
                    ((2, 1), Cell::goal(10.0)),
                ],
            ),
            Preset::ModifiedDql => layout(
                4,
                4,
                (0, 3),
                &[
                    ((1, 1), Cell::wall()),
                    ((2, 2), Cell::pit(-10.0)),
                    ((2, 1), Cell::goal(10.0)),
                ],
            ),
            Preset::Debug2x2 => layout(
                2,
                2,
                (0, 0),
                &[((1, 0), Cell::pit(-10.0)), ((0, 1), Cell::goal(10.0))],
            ),
            Preset::Debug3x3 => layout(
                3,
                3,
                (1, 1),
                &[
                    ((1, 0), Cell::pit(-10.0)),
                    ((0, 1), Cell::pit(-10.0)),
                    ((2, 1), Cell::pit(-10.0)),
                    ((1, 2), Cell::goal(10.0)),
                ],
            ),
            Preset::DigitsExemplary => digits::exemplary(),
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Preset {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .ok_or_else(|| GridError::InvalidMap(format!("unknown preset: {}", s)))
    }
}

fn layout(
    width: usize,
    height: usize,
    start: (Int, Int),
    cells: &[((Int, Int), Cell)],
) -> Result<GridMap, GridError> {
    let mut map = GridMap::new(width, height)?;
    for ((x, y), cell) in cells {
        map.set_cell(Position::new(*x, *y), *cell)?;
    }
    map.with_start(Position::new(start.0, start.1))
}
