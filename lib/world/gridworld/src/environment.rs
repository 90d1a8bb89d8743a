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

//! The world the agent lives in. The environment owns the ground truth (the hidden agent
//! position); everything the localization side may learn about it goes through
//! [`Environment::observation`].

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::{EnvironmentConfig, MapSource};
use crate::{
    Action, Dimensions, Float, GridError, GridMap, MotionModel, Observation,
    ObservationLikelihood, Position, Rng,
};

/// Capability interface shared by the continuous and episodic environments.
pub trait Environment {
    /// The map. Immutable for the lifetime of an episode.
    fn map(&self) -> &GridMap;

    /// A shared handle to the map, for components that need to outlive a borrow of the
    /// environment (e.g. a filter).
    fn shared_map(&self) -> Arc<GridMap>;

    /// How actions move the agent.
    fn motion_model(&self) -> &MotionModel;

    /// How positions turn into observations.
    fn observation_likelihood(&self) -> &ObservationLikelihood;

    /// Ground truth. Only for evaluation; a filter must not read it.
    fn agent_position(&self) -> Position;

    /// A (possibly noisy) reading at the agent's current position.
    fn observation(&mut self) -> Result<Observation, GridError>;

    /// Move the agent. Returns the new ground-truth position.
    fn execute_action(&mut self, action: Action) -> Result<Position, GridError>;

    /// Actions executed in the current episode.
    fn steps(&self) -> usize;

    /// Step limit of an episode, 0 for unlimited.
    fn max_steps(&self) -> usize;

    /// Width and height, for sizing beliefs.
    fn environment_size(&self) -> Dimensions {
        self.map().dimensions()
    }

    /// Number of distinct observation symbols.
    fn observation_size(&self) -> usize {
        self.observation_likelihood().model().symbol_count()
    }

    /// Whether the agent may occupy `position`.
    fn is_state_allowed(&self, position: Position) -> bool {
        self.map().is_open(position)
    }

    /// Whether `position` ends an episode.
    fn is_state_terminal(&self, position: Position) -> bool {
        matches!(self.map().is_terminal(position), Ok(true))
    }

    /// Whether the nominal displacement of `action` from `position` stays on the grid and lands on
    /// a traversable cell.
    fn is_action_allowed(&self, position: Position, action: Action) -> bool {
        position
            .step(action)
            .is_some_and(|next| self.map().is_open(next))
    }

    /// Reward for being at `position`.
    fn state_reward(&self, position: Position) -> Result<Float, GridError> {
        self.map().reward_at(position)
    }

    /// The agent stands on a terminal cell or the step limit is used up.
    fn is_finished(&self) -> bool {
        self.is_state_terminal(self.agent_position())
            || (self.max_steps() > 0 && self.steps() >= self.max_steps())
    }
}

/// An environment that can start a fresh episode in place.
pub trait Resettable: Environment {
    /// Start a new episode and return the new agent position. Dimensions never change.
    fn reset(&mut self) -> Result<Position, GridError>;

    /// Number of resets so far.
    fn episode(&self) -> usize;
}

/// A single long-running world: one map, one agent, no resets.
#[derive(Debug, Clone)]
pub struct GridEnvironment {
    map: Arc<GridMap>,
    agent: Position,
    motion: MotionModel,
    sensor: ObservationLikelihood,
    rng: Rng,
    steps: usize,
    max_steps: usize,
}

impl GridEnvironment {
    /// Place the agent on the map's start cell.
    pub fn new(
        map: GridMap,
        motion: MotionModel,
        sensor: ObservationLikelihood,
        seed: u64,
        max_steps: usize,
    ) -> Result<Self, GridError> {
        let agent = map.start();
        if !map.is_open(agent) {
            return Err(GridError::NotTraversable(agent));
        }
        Ok(Self {
            map: Arc::new(map),
            agent,
            motion,
            sensor,
            rng: Rng::seed_from_u64(seed),
            steps: 0,
            max_steps,
        })
    }

    /// Teleport the agent. Does not count as a step.
    pub fn move_agent_to(&mut self, position: Position) -> Result<(), GridError> {
        if !self.map.cell_at(position)?.is_traversable() {
            return Err(GridError::NotTraversable(position));
        }
        self.agent = position;
        Ok(())
    }

    fn restart(&mut self, map: Option<GridMap>, start: Position) {
        if let Some(map) = map {
            self.map = Arc::new(map);
        }
        self.agent = start;
        self.steps = 0;
    }
}

impl Environment for GridEnvironment {
    fn map(&self) -> &GridMap {
        &self.map
    }

    fn shared_map(&self) -> Arc<GridMap> {
        Arc::clone(&self.map)
    }

    fn motion_model(&self) -> &MotionModel {
        &self.motion
    }

    fn observation_likelihood(&self) -> &ObservationLikelihood {
        &self.sensor
    }

    fn agent_position(&self) -> Position {
        self.agent
    }

    fn observation(&mut self) -> Result<Observation, GridError> {
        self.sensor.sample(&self.map, self.agent, &mut self.rng)
    }

    fn execute_action(&mut self, action: Action) -> Result<Position, GridError> {
        if self.is_finished() {
            return Err(GridError::EpisodeFinished { steps: self.steps });
        }
        if !self.is_action_allowed(self.agent, action) {
            return Err(GridError::IllegalAction {
                position: self.agent,
                action,
            });
        }
        let outcome = self.motion.sample(&mut self.rng);
        let next = MotionModel::resolve(&self.map, self.agent, action, outcome);
        tracing::trace!(from = %self.agent, to = %next, %action, ?outcome, "agent moved");
        self.agent = next;
        self.steps += 1;
        Ok(next)
    }

    fn steps(&self) -> usize {
        self.steps
    }

    fn max_steps(&self) -> usize {
        self.max_steps
    }
}

/// A [`GridEnvironment`] that can be reset for repeated independent trials. Procedural maps can
/// be regenerated on reset (seeded with `seed + episode`), and the agent can be dropped on a
/// random non-terminal cell.
#[derive(Debug, Clone)]
pub struct EpisodicEnvironment {
    inner: GridEnvironment,
    source: MapSource,
    seed: u64,
    start: Option<Position>,
    regenerate_on_reset: bool,
    random_start_on_reset: bool,
    episode: usize,
}

impl EpisodicEnvironment {
    /// Build the first episode from a configuration.
    pub fn new(config: &EnvironmentConfig) -> Result<Self, GridError> {
        config.validate()?;
        let source = MapSource::from_config(config)?;
        let inner = GridEnvironment::new(
            config.build_map()?,
            config.motion_model()?,
            config.observation_likelihood()?,
            config.seed,
            config.max_steps,
        )?;
        Ok(Self {
            inner,
            source,
            seed: config.seed,
            start: config.start,
            regenerate_on_reset: config.regenerate_on_reset,
            random_start_on_reset: config.random_start_on_reset,
            episode: 0,
        })
    }
}

impl Environment for EpisodicEnvironment {
    fn map(&self) -> &GridMap {
        self.inner.map()
    }

    fn shared_map(&self) -> Arc<GridMap> {
        self.inner.shared_map()
    }

    fn motion_model(&self) -> &MotionModel {
        self.inner.motion_model()
    }

    fn observation_likelihood(&self) -> &ObservationLikelihood {
        self.inner.observation_likelihood()
    }

    fn agent_position(&self) -> Position {
        self.inner.agent_position()
    }

    fn observation(&mut self) -> Result<Observation, GridError> {
        self.inner.observation()
    }

    fn execute_action(&mut self, action: Action) -> Result<Position, GridError> {
        self.inner.execute_action(action)
    }

    fn steps(&self) -> usize {
        self.inner.steps()
    }

    fn max_steps(&self) -> usize {
        self.inner.max_steps()
    }
}

impl Resettable for EpisodicEnvironment {
    fn reset(&mut self) -> Result<Position, GridError> {
        self.episode += 1;
        let regenerated = if self.regenerate_on_reset && self.source.is_procedural() {
            let map = self.source.build(self.seed.wrapping_add(self.episode as u64))?;
            Some(match self.start {
                Some(start) if map.is_open(start) => map.with_start(start)?,
                _ => map,
            })
        } else {
            None
        };

        let start = {
            let map = regenerated.as_ref().unwrap_or(&*self.inner.map);
            if self.random_start_on_reset {
                random_start(map, &mut self.inner.rng)?
            } else {
                map.start()
            }
        };
        self.inner.restart(regenerated, start);
        tracing::info!(episode = self.episode, start = %start, "environment reset");
        Ok(start)
    }

    fn episode(&self) -> usize {
        self.episode
    }
}

fn random_start(map: &GridMap, rng: &mut Rng) -> Result<Position, GridError> {
    let candidates: Vec<Position> = map
        .traversable_positions()
        .filter(|position| matches!(map.is_terminal(*position), Ok(false)))
        .collect();
    candidates
        .choose(rng)
        .copied()
        .ok_or_else(|| GridError::InvalidMap("no non-terminal traversable cell".to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::random::{self, RandomLayout};
    use crate::{ObservationModel, Preset};

    fn open_environment(width: usize, height: usize) -> GridEnvironment {
        GridEnvironment::new(
            GridMap::new(width, height).expect("GridMap::new failed"),
            MotionModel::deterministic(),
            ObservationLikelihood::exact(ObservationModel::WallPattern),
            0,
            0,
        )
        .expect("GridEnvironment::new failed")
    }

    #[test]
    fn test_execute_action_moves_agent() {
        let mut environment = open_environment(5, 5);
        assert_eq!(environment.agent_position(), Position::new(0, 0));
        for action in [Action::Right, Action::Right, Action::Down] {
            environment.execute_action(action).expect("execute_action failed");
        }
        assert_eq!(environment.agent_position(), Position::new(2, 1));
        assert_eq!(environment.steps(), 3);
    }

    #[test]
    fn test_illegal_action_rejected() {
        let mut environment = open_environment(3, 3);
        assert!(!environment.is_action_allowed(Position::new(0, 0), Action::Up));
        assert_eq!(
            environment.execute_action(Action::Left),
            Err(GridError::IllegalAction {
                position: Position::new(0, 0),
                action: Action::Left
            })
        );
        assert_eq!(environment.agent_position(), Position::new(0, 0));
        assert_eq!(environment.steps(), 0);
    }

    #[test]
    fn test_predicates_delegate_to_map() {
        let map = Preset::Book.build().expect("build failed");
        let environment = GridEnvironment::new(
            map,
            MotionModel::deterministic(),
            ObservationLikelihood::default(),
            0,
            0,
        )
        .expect("GridEnvironment::new failed");
        assert!(!environment.is_state_allowed(Position::new(1, 1)));
        assert!(!environment.is_state_allowed(Position::new(4, 0)));
        assert!(environment.is_state_terminal(Position::new(3, 0)));
        assert!(environment.is_state_terminal(Position::new(3, 1)));
        assert!(!environment.is_state_terminal(Position::new(0, 0)));
        assert_eq!(environment.state_reward(Position::new(3, 0)), Ok(1.0));
        assert_eq!(
            environment.environment_size(),
            Dimensions {
                width: 4,
                height: 3
            }
        );
        assert_eq!(environment.observation_size(), 16);
    }

    #[test]
    fn test_action_allowed_at_coordinate_extremes() {
        let environment = GridEnvironment::new(
            GridMap::new(3, 3).expect("GridMap::new failed"),
            MotionModel::deterministic(),
            ObservationLikelihood::default(),
            0,
            0,
        )
        .expect("GridEnvironment::new failed");
        let max = crate::Int::MAX;
        let min = crate::Int::MIN;
        assert!(!environment.is_action_allowed(Position::new(max, 0), Action::Right));
        assert!(!environment.is_action_allowed(Position::new(min, 0), Action::Left));
        assert!(!environment.is_action_allowed(Position::new(0, min), Action::Up));
        assert!(!environment.is_action_allowed(Position::new(0, max), Action::Down));
        assert!(environment.is_action_allowed(Position::new(0, 0), Action::Right));
    }

    #[test]
    fn test_episode_finishes_on_terminal_cell() {
        let map = GridMap::parse("S.G").expect("parse failed");
        let mut environment = GridEnvironment::new(
            map,
            MotionModel::deterministic(),
            ObservationLikelihood::default(),
            0,
            0,
        )
        .expect("GridEnvironment::new failed");
        environment.execute_action(Action::Right).expect("execute_action failed");
        environment.execute_action(Action::Right).expect("execute_action failed");
        assert!(environment.is_finished());
        assert_eq!(
            environment.execute_action(Action::Left),
            Err(GridError::EpisodeFinished { steps: 2 })
        );
    }

    #[test]
    fn test_step_limit() {
        let mut environment = GridEnvironment::new(
            GridMap::new(3, 1).expect("GridMap::new failed"),
            MotionModel::deterministic(),
            ObservationLikelihood::default(),
            0,
            1,
        )
        .expect("GridEnvironment::new failed");
        environment.execute_action(Action::Stay).expect("execute_action failed");
        assert!(matches!(
            environment.execute_action(Action::Right),
            Err(GridError::EpisodeFinished { steps: 1 })
        ));
    }

    #[test]
    fn test_noiseless_observation_matches_model() {
        let mut environment = open_environment(4, 3);
        environment
            .move_agent_to(Position::new(3, 2))
            .expect("move_agent_to failed");
        assert_eq!(environment.observation(), Ok(Observation(2 | 4)));
        assert!(environment.move_agent_to(Position::new(4, 2)).is_err());
    }

    #[test]
    fn test_random_maze_seed_42_has_allowed_path() {
        let map = random::generate(8, 8, RandomLayout::Hard, 42).expect("generate failed");
        let goal = map.goals().next().expect("missing goal");
        let start = map.start();
        let environment = GridEnvironment::new(
            map,
            MotionModel::deterministic(),
            ObservationLikelihood::default(),
            42,
            0,
        )
        .expect("GridEnvironment::new failed");

        let mut visited = vec![start];
        let mut queue = VecDeque::from([start]);
        let mut found = false;
        while let Some(current) = queue.pop_front() {
            if current == goal {
                found = true;
                break;
            }
            if current != start && environment.is_state_terminal(current) {
                continue;
            }
            for action in Action::MOVES {
                if !environment.is_action_allowed(current, action) {
                    continue;
                }
                let Some(next) = current.step(action) else {
                    continue;
                };
                if !visited.contains(&next) {
                    visited.push(next);
                    queue.push_back(next);
                }
            }
        }
        assert!(found, "no allowed path from {} to {}", start, goal);
    }

    #[test]
    fn test_episodic_reset_keeps_dimensions() {
        let config = EnvironmentConfig {
            map_name: "random_hard".to_string(),
            width: 6,
            height: 5,
            seed: 42,
            regenerate_on_reset: true,
            random_start_on_reset: true,
            ..EnvironmentConfig::default()
        };
        let mut environment = EpisodicEnvironment::new(&config).expect("new failed");
        let first_map = environment.map().clone();
        let mut changed = false;
        for episode in 1..=5 {
            let start = environment.reset().expect("reset failed");
            assert_eq!(environment.episode(), episode);
            assert_eq!(environment.steps(), 0);
            assert_eq!(environment.agent_position(), start);
            assert!(environment.is_state_allowed(start));
            assert!(!environment.is_state_terminal(start));
            assert_eq!(environment.environment_size(), first_map.dimensions());
            changed |= *environment.map() != first_map;
        }
        assert!(changed, "regenerating five times never changed the map");
    }

    #[test]
    fn test_episodic_reset_without_regeneration() {
        let config = EnvironmentConfig {
            map_name: "cliff".to_string(),
            ..EnvironmentConfig::default()
        };
        let mut environment = EpisodicEnvironment::new(&config).expect("new failed");
        let map = environment.map().clone();
        environment.execute_action(Action::Up).expect("execute_action failed");
        assert_eq!(environment.reset(), Ok(map.start()));
        assert_eq!(*environment.map(), map);
    }
}
