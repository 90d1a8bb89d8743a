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

use serde::{Deserialize, Serialize};

use crate::{GridError, Int};

/// A cell coordinate. `x` grows to the right, `y` grows downwards, so row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: Int,

    /// Row.
    pub y: Int,
}

impl Position {
    /// Create a new position.
    pub const fn new(x: Int, y: Int) -> Self {
        Self { x, y }
    }

    /// The position one nominal step away in the direction of `action`. The result may lie off
    /// the grid; callers check it against a map. `None` when the coordinate would overflow, which
    /// is off every grid.
    pub fn step(self, action: Action) -> Option<Self> {
        let (dx, dy) = action.displacement();
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    /// Manhattan distance between two positions.
    pub fn manhattan_distance(self, other: Position) -> Int {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A discrete move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Move one row up (towards row 0).
    Up,

    /// Move one column right.
    Right,

    /// Move one row down.
    Down,

    /// Move one column left.
    Left,

    /// Stay in place.
    Stay,
}

impl Action {
    /// The four moves, in clockwise order starting at `Up`.
    pub const MOVES: [Action; 4] = [Action::Up, Action::Right, Action::Down, Action::Left];

    /// Every action, including `Stay`.
    pub const ALL: [Action; 5] = [
        Action::Up,
        Action::Right,
        Action::Down,
        Action::Left,
        Action::Stay,
    ];

    /// Nominal `(dx, dy)` displacement.
    pub fn displacement(self) -> (Int, Int) {
        match self {
            Action::Up => (0, -1),
            Action::Right => (1, 0),
            Action::Down => (0, 1),
            Action::Left => (-1, 0),
            Action::Stay => (0, 0),
        }
    }

    /// The move a quarter turn clockwise from this one. `Stay` maps to itself.
    pub fn clockwise(self) -> Action {
        match self {
            Action::Up => Action::Right,
            Action::Right => Action::Down,
            Action::Down => Action::Left,
            Action::Left => Action::Up,
            Action::Stay => Action::Stay,
        }
    }

    /// The move a quarter turn counter-clockwise from this one. `Stay` maps to itself.
    pub fn counter_clockwise(self) -> Action {
        match self {
            Action::Up => Action::Left,
            Action::Right => Action::Up,
            Action::Down => Action::Right,
            Action::Left => Action::Down,
            Action::Stay => Action::Stay,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Up => write!(f, "Up"),
            Action::Right => write!(f, "Right"),
            Action::Down => write!(f, "Down"),
            Action::Left => write!(f, "Left"),
            Action::Stay => write!(f, "Stay"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "u" | "north" | "n" => Ok(Action::Up),
            "right" | "r" | "east" | "e" => Ok(Action::Right),
            "down" | "d" | "south" | "s" => Ok(Action::Down),
            "left" | "l" | "west" | "w" => Ok(Action::Left),
            "stay" | "none" => Ok(Action::Stay),
            other => Err(GridError::InvalidConfig(format!("unknown action: {other}"))),
        }
    }
}

/// Width and height of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Number of columns.
    pub width: usize,

    /// Number of rows.
    pub height: usize,
}

impl Dimensions {
    /// Number of cells.
    pub fn cells(&self) -> usize {
        self.width * self.height
    }
}
