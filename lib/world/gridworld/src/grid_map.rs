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

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{Action, Dimensions, Float, GridError, Int, Position};

/// Reward of a goal cell created from the `G` symbol.
pub const DEFAULT_GOAL_REWARD: Float = 10.0;

/// Reward of a pit cell created from the `P` symbol.
pub const DEFAULT_PIT_REWARD: Float = -10.0;

/// Kind of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Empty, traversable cell.
    Free,

    /// Blocked cell. Never traversable.
    Wall,

    /// Goal cell. Terminal by default.
    Goal,

    /// Pit cell. Terminal by default.
    Pit,
}

/// A grid cell: its kind, the reward for standing on it and an optional digit label (used by
/// digit mazes, where the digit is what the agent sees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Kind of the cell.
    pub kind: CellKind,

    /// Reward for being in this cell.
    pub reward: Float,

    /// Digit label, if any.
    pub digit: Option<u8>,
}

impl Cell {
    /// Free cell with zero reward.
    pub const fn free() -> Self {
        Self {
            kind: CellKind::Free,
            reward: 0.0,
            digit: None,
        }
    }

    /// Wall cell.
    pub const fn wall() -> Self {
        Self {
            kind: CellKind::Wall,
            reward: 0.0,
            digit: None,
        }
    }

    /// Goal cell with the given reward.
    pub const fn goal(reward: Float) -> Self {
        Self {
            kind: CellKind::Goal,
            reward,
            digit: None,
        }
    }

    /// Pit cell with the given reward.
    pub const fn pit(reward: Float) -> Self {
        Self {
            kind: CellKind::Pit,
            reward,
            digit: None,
        }
    }

    /// Free cell labelled with a digit.
    pub const fn digit(digit: u8) -> Self {
        Self {
            kind: CellKind::Free,
            reward: 0.0,
            digit: Some(digit),
        }
    }

    /// The same cell with a digit label.
    pub fn with_digit(self, digit: u8) -> Self {
        Self {
            digit: Some(digit),
            ..self
        }
    }

    /// Walls are the only cells an agent can never occupy.
    pub fn is_traversable(&self) -> bool {
        self.kind != CellKind::Wall
    }

    fn symbol(&self) -> char {
        match (self.kind, self.digit) {
            (CellKind::Wall, _) => '#',
            (CellKind::Goal, _) => 'G',
            (CellKind::Pit, _) => 'P',
            (CellKind::Free, Some(digit)) => char::from(b'0' + digit.min(9)),
            (CellKind::Free, None) => '.',
        }
    }
}

/// A rectangular grid of cells, stored row-major. The map is immutable once built; the agent
/// position lives in the environment that owns the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMap {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    start: Position,
    terminal_kinds: Vec<CellKind>,
}

// Print the grid with one symbol per cell: '#' wall, 'G' goal, 'P' pit, 'S' start, a digit for
// labelled cells and '.' for everything else. The output parses back with `GridMap::parse`.
impl std::fmt::Display for GridMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = String::with_capacity((self.width + 1) * self.height);
        for (index, cell) in self.cells.iter().enumerate() {
            let position = self.position_of(index);
            if position == self.start && cell.kind == CellKind::Free && cell.digit.is_none() {
                s.push('S');
            } else {
                s.push(cell.symbol());
            }
            if position.x as usize == self.width - 1 && (position.y as usize) < self.height - 1 {
                s.push('\n');
            }
        }
        write!(f, "{}", s)
    }
}

impl GridMap {
    /// Create an all-free map with the start in the top-left corner.
    pub fn new(width: usize, height: usize) -> Result<Self, GridError> {
        Self::from_cells(width, height, vec![Cell::free(); width * height], None)
    }

    /// Create a map from row-major cells. Without an explicit start, the first traversable cell
    /// is used.
    pub fn from_cells(
        width: usize,
        height: usize,
        cells: Vec<Cell>,
        start: Option<Position>,
    ) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidMap(format!(
                "dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if cells.len() != width * height {
            return Err(GridError::InvalidMap(format!(
                "expected {} cells for a {}x{} map, got {}",
                width * height,
                width,
                height,
                cells.len()
            )));
        }
        let first_traversable = cells
            .iter()
            .position(Cell::is_traversable)
            .ok_or_else(|| GridError::InvalidMap("map has no traversable cell".to_string()))?;

        let mut map = Self {
            width,
            height,
            cells,
            start: Position::new(0, 0),
            terminal_kinds: vec![CellKind::Goal, CellKind::Pit],
        };
        map.start = map.position_of(first_traversable);
        match start {
            Some(start) => map.with_start(start),
            None => Ok(map),
        }
    }

    /// Parse a text matrix, one row per line. Symbols: `.` free, `#` wall, `G` goal, `P` pit,
    /// `S` start (a free cell), `0`-`9` free cell labelled with that digit. Blank lines and
    /// surrounding whitespace are ignored.
    pub fn parse(text: &str) -> Result<Self, GridError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let width = match rows.first() {
            Some(row) => row.chars().count(),
            None => return Err(GridError::InvalidMap("empty matrix".to_string())),
        };

        let mut cells = Vec::with_capacity(width * rows.len());
        let mut start = None;
        for (y, row) in rows.iter().enumerate() {
            let row_width = row.chars().count();
            if row_width != width {
                return Err(GridError::InvalidMap(format!(
                    "row {} has width {}, expected {}",
                    y, row_width, width
                )));
            }
            for (x, symbol) in row.chars().enumerate() {
                let cell = match symbol {
                    '.' => Cell::free(),
                    '#' => Cell::wall(),
                    'G' => Cell::goal(DEFAULT_GOAL_REWARD),
                    'P' => Cell::pit(DEFAULT_PIT_REWARD),
                    'S' => {
                        if start.is_some() {
                            return Err(GridError::InvalidMap(
                                "more than one start symbol".to_string(),
                            ));
                        }
                        start = Some(Position::new(x as Int, y as Int));
                        Cell::free()
                    }
                    '0'..='9' => Cell::digit(symbol as u8 - b'0'),
                    other => {
                        return Err(GridError::InvalidMap(format!(
                            "unrecognized symbol {:?} at ({}, {})",
                            other, x, y
                        )))
                    }
                };
                cells.push(cell);
            }
        }

        Self::from_cells(width, rows.len(), cells, start)
    }

    /// The same map with a different start position.
    pub fn with_start(mut self, start: Position) -> Result<Self, GridError> {
        if !self.cell_at(start)?.is_traversable() {
            return Err(GridError::NotTraversable(start));
        }
        self.start = start;
        Ok(self)
    }

    /// The same map with a different set of terminal cell kinds.
    pub fn with_terminal_kinds(mut self, kinds: &[CellKind]) -> Self {
        self.terminal_kinds = kinds.to_vec();
        self
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Width and height.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Designated start position.
    pub fn start(&self) -> Position {
        self.start
    }

    /// Number of cells, traversable or not.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; a map has at least one cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether the position lies within `[0, width) x [0, height)`.
    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as usize) < self.width
            && (position.y as usize) < self.height
    }

    /// Row-major index of a position.
    pub fn index_of(&self, position: Position) -> Result<usize, GridError> {
        if !self.contains(position) {
            return Err(GridError::OutOfBounds(position));
        }
        Ok(position.y as usize * self.width + position.x as usize)
    }

    /// Position of a row-major index. The index must be below `len()`.
    pub fn position_of(&self, index: usize) -> Position {
        Position::new((index % self.width) as Int, (index / self.width) as Int)
    }

    /// Cell at a position.
    pub fn cell_at(&self, position: Position) -> Result<&Cell, GridError> {
        let index = self.index_of(position)?;
        Ok(&self.cells[index])
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Whether the cell at the position can be occupied.
    pub fn is_traversable(&self, position: Position) -> Result<bool, GridError> {
        Ok(self.cell_at(position)?.is_traversable())
    }

    /// Whether the cell at the position ends an episode.
    pub fn is_terminal(&self, position: Position) -> Result<bool, GridError> {
        let kind = self.cell_at(position)?.kind;
        Ok(self.terminal_kinds.contains(&kind))
    }

    /// Reward for being in the cell at the position.
    pub fn reward_at(&self, position: Position) -> Result<Float, GridError> {
        Ok(self.cell_at(position)?.reward)
    }

    /// In bounds and traversable. Never fails, so it doubles as a legality check for positions
    /// produced by stepping off the grid.
    pub fn is_open(&self, position: Position) -> bool {
        matches!(self.cell_at(position), Ok(cell) if cell.is_traversable())
    }

    pub(crate) fn set_cell(&mut self, position: Position, cell: Cell) -> Result<(), GridError> {
        let index = self.index_of(position)?;
        self.cells[index] = cell;
        Ok(())
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |index| self.position_of(index))
    }

    /// Traversable positions in row-major order.
    pub fn traversable_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions().filter(move |position| self.is_open(*position))
    }

    /// Number of traversable cells.
    pub fn traversable_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_traversable()).count()
    }

    /// Positions of goal cells in row-major order.
    pub fn goals(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.kind == CellKind::Goal)
            .map(move |(index, _)| self.position_of(index))
    }

    /// Breadth-first search over nominal moves from `from` to `to`. The path may not cross walls
    /// or any terminal cell other than `to` itself, since entering one ends the episode.
    pub fn is_reachable(&self, from: Position, to: Position) -> Result<bool, GridError> {
        self.index_of(from)?;
        let target = self.index_of(to)?;
        if !self.is_open(from) || !self.is_open(to) {
            return Ok(false);
        }
        if from == to {
            return Ok(true);
        }

        let mut visited = vec![false; self.cells.len()];
        visited[self.index_of(from)?] = true;
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            for action in Action::MOVES {
                let Some(next) = current.step(action).filter(|next| self.is_open(*next)) else {
                    continue;
                };
                let index = self.index_of(next)?;
                if index == target {
                    return Ok(true);
                }
                if visited[index] || self.is_terminal(next)? {
                    continue;
                }
                visited[index] = true;
                queue.push_back(next);
            }
        }
        Ok(false)
    }
}
