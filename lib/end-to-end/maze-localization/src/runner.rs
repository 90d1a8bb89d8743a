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

//! The predict/update cycle: act, move the hidden agent, sense, predict, update.

use std::sync::Arc;

use gridworld::{Action, Environment, Float, GridMap, Observation, Position, Resettable};
use histogram_filter::{BeliefInit, HistogramFilter, MapSetFilter};
use serde::{Deserialize, Serialize};

use crate::{Agent, LocalizationError};

/// When an episode stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeOptions {
    /// Actions before giving up. The environment's own step limit also applies.
    pub max_steps: usize,

    /// Stop as soon as the most likely cell holds at least this much mass.
    pub min_confidence: Float,
}

impl Default for EpisodeOptions {
    fn default() -> Self {
        Self {
            max_steps: 100,
            min_confidence: 0.95,
        }
    }
}

/// One predict/update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// What the agent asked for.
    pub requested: Action,

    /// What was executed; `Stay` if the request was illegal from the true position.
    pub executed: Action,

    /// What the sensor read afterwards.
    pub observation: Observation,

    /// Most likely cell after the update.
    pub estimate: Position,

    /// Where the agent really is.
    pub truth: Position,

    /// Mass on the most likely cell.
    pub confidence: Float,

    /// Entropy of the belief in nats.
    pub entropy: Float,
}

/// Summary of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeReport {
    /// Actions executed.
    pub steps: usize,

    /// The confidence threshold was reached.
    pub converged: bool,

    /// Mass on the most likely cell at the end.
    pub confidence: Float,

    /// Entropy at the end.
    pub entropy: Float,

    /// Most likely cell at the end.
    pub estimate: Position,

    /// Ground truth at the end.
    pub truth: Position,

    /// The estimate equals the ground truth.
    pub correct: bool,

    /// The environment ended the episode (terminal cell or step limit).
    pub terminated: bool,

    /// Sum of the state rewards collected after each step.
    pub cumulative_reward: Float,

    /// Most probable candidate map, when localizing over a set of maps.
    pub most_likely_map: Option<usize>,

    /// Probability of that map.
    pub map_confidence: Option<Float>,
}

/// Drives an environment and a filter together. The filter is built from the environment's
/// map, motion model and sensor, and only ever receives actions and observations.
#[derive(Debug)]
pub struct Localization<E: Environment> {
    environment: E,
    filter: HistogramFilter,
    candidates: Option<MapSetFilter>,
    init: BeliefInit,
    cumulative_reward: Float,
}

impl<E: Environment> Localization<E> {
    /// Build a filter for `environment` and seed its belief.
    pub fn new(environment: E, init: BeliefInit) -> Result<Self, LocalizationError> {
        let mut filter = HistogramFilter::for_environment(&environment)?;
        filter.initialize_belief(init)?;
        Ok(Self {
            environment,
            filter,
            candidates: None,
            init,
            cumulative_reward: 0.0,
        })
    }

    /// Also track which of `maps` the agent is on, starting from a uniform belief over all their
    /// cells. The environment's own map should be among them.
    pub fn with_candidate_maps(
        mut self,
        maps: Vec<Arc<GridMap>>,
    ) -> Result<Self, LocalizationError> {
        let mut candidates = MapSetFilter::for_environment(&self.environment, maps)?;
        candidates.initialize_uniform()?;
        self.candidates = Some(candidates);
        Ok(self)
    }

    /// Read the sensor without moving and fold the reading into the belief.
    pub fn observe(&mut self) -> Result<Observation, LocalizationError> {
        let observation = self.environment.observation()?;
        self.filter.update(observation)?;
        if let Some(candidates) = &mut self.candidates {
            candidates.update(observation)?;
        }
        Ok(observation)
    }

    /// One full cycle. An action that is illegal from the true position is replaced by `Stay`
    /// for both the environment and the filter.
    pub fn step(&mut self, action: Action) -> Result<StepReport, LocalizationError> {
        let truth = self.environment.agent_position();
        let executed = if self.environment.is_action_allowed(truth, action) {
            action
        } else {
            tracing::debug!(%action, position = %truth, "illegal action replaced by stay");
            Action::Stay
        };

        let truth = self.environment.execute_action(executed)?;
        self.filter.predict(executed)?;
        if let Some(candidates) = &mut self.candidates {
            candidates.predict(executed)?;
        }
        let observation = self.observe()?;
        self.cumulative_reward += self.environment.state_reward(truth)?;

        let estimate = self.filter.most_likely_position()?;
        Ok(StepReport {
            requested: action,
            executed,
            observation,
            estimate,
            truth,
            confidence: self.filter.belief_at(estimate)?,
            entropy: self.filter.entropy()?,
        })
    }

    /// Run an episode: sense once, then let `agent` act until the filter is confident enough,
    /// the step budget is spent or the environment finishes.
    pub fn run<A>(
        &mut self,
        agent: &mut A,
        options: EpisodeOptions,
    ) -> Result<EpisodeReport, LocalizationError>
    where
        A: Agent<Action = Action, Percept = HistogramFilter>,
    {
        tracing::info!(
            width = self.environment.map().width(),
            height = self.environment.map().height(),
            max_steps = options.max_steps,
            min_confidence = options.min_confidence,
            "episode started"
        );
        self.observe()?;

        let mut steps = 0;
        while steps < options.max_steps
            && !self.environment.is_finished()
            && self.confidence()? < options.min_confidence
        {
            let action = agent.act(&self.filter);
            let report = self.step(action)?;
            steps += 1;
            tracing::debug!(
                step = steps,
                action = %report.executed,
                observation = %report.observation,
                estimate = %report.estimate,
                confidence = report.confidence,
                "step"
            );
        }

        let report = self.report(steps, options)?;
        tracing::info!(
            steps = report.steps,
            converged = report.converged,
            correct = report.correct,
            confidence = report.confidence,
            "episode finished"
        );
        Ok(report)
    }

    fn confidence(&self) -> Result<Float, LocalizationError> {
        let estimate = self.filter.most_likely_position()?;
        Ok(self.filter.belief_at(estimate)?)
    }

    fn report(
        &self,
        steps: usize,
        options: EpisodeOptions,
    ) -> Result<EpisodeReport, LocalizationError> {
        let estimate = self.filter.most_likely_position()?;
        let confidence = self.filter.belief_at(estimate)?;
        let truth = self.environment.agent_position();
        let (most_likely_map, map_confidence) = match &self.candidates {
            Some(candidates) => {
                let index = candidates.most_likely_map()?;
                (Some(index), Some(candidates.marginal_map()?[index]))
            }
            None => (None, None),
        };
        Ok(EpisodeReport {
            steps,
            converged: confidence >= options.min_confidence,
            confidence,
            entropy: self.filter.entropy()?,
            estimate,
            truth,
            correct: estimate == truth,
            terminated: self.environment.is_finished(),
            cumulative_reward: self.cumulative_reward,
            most_likely_map,
            map_confidence,
        })
    }

    /// The environment, for evaluation.
    pub fn environment(&self) -> &E {
        &self.environment
    }

    /// The filter.
    pub fn filter(&self) -> &HistogramFilter {
        &self.filter
    }

    /// The map-set filter, if candidate maps were given.
    pub fn candidates(&self) -> Option<&MapSetFilter> {
        self.candidates.as_ref()
    }
}

impl<E: Resettable> Localization<E> {
    /// Start a new episode on the same environment. A known start follows the agent to its new
    /// start cell; a uniform belief stays uniform.
    pub fn reset(&mut self) -> Result<(), LocalizationError> {
        let start = self.environment.reset()?;
        self.filter.reset_map(self.environment.shared_map())?;
        if let BeliefInit::KnownStart(_) = self.init {
            self.init = BeliefInit::KnownStart(start);
        }
        self.filter.initialize_belief(self.init)?;
        if let Some(candidates) = &mut self.candidates {
            candidates.initialize_uniform()?;
        }
        self.cumulative_reward = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActiveAgent, RandomAgent, ScriptedAgent};
    use approx::assert_abs_diff_eq;
    use gridworld::{
        initialize_environment, EnvironmentConfig, EpisodicEnvironment, GridEnvironment,
    };
    use histogram_filter::ActionSelection;
    use proptest::prelude::*;

    fn open_environment(width: usize, height: usize) -> GridEnvironment {
        let config = EnvironmentConfig {
            map_name: "open".to_string(),
            width,
            height,
            start: Some(Position::new(0, 0)),
            max_steps: 0,
            ..EnvironmentConfig::default()
        };
        initialize_environment(&config).expect("initialize failed")
    }

    #[test]
    fn test_scripted_episode_converges() {
        let mut localization =
            Localization::new(open_environment(5, 5), BeliefInit::KnownStart(Position::new(0, 0)))
                .expect("Localization::new failed");
        let mut agent = ScriptedAgent::new(vec![Action::Right, Action::Right, Action::Down]);
        let options = EpisodeOptions {
            max_steps: 3,
            min_confidence: 1.1,
        };
        let report = localization.run(&mut agent, options).expect("run failed");
        assert_eq!(report.steps, 3);
        assert_eq!(report.truth, Position::new(2, 1));
        assert_eq!(report.estimate, Position::new(2, 1));
        assert!(report.correct);
        assert!(!report.converged);
        assert!(report.confidence > 0.9);
    }

    #[test]
    fn test_confident_start_takes_no_steps() {
        let mut localization =
            Localization::new(open_environment(3, 3), BeliefInit::KnownStart(Position::new(0, 0)))
                .expect("Localization::new failed");
        let mut agent = RandomAgent::new(0);
        let report = localization
            .run(&mut agent, EpisodeOptions::default())
            .expect("run failed");
        assert_eq!(report.steps, 0);
        assert!(report.converged);
    }

    #[test]
    fn test_illegal_action_becomes_stay() {
        let mut localization =
            Localization::new(open_environment(3, 3), BeliefInit::KnownStart(Position::new(0, 0)))
                .expect("Localization::new failed");
        let report = localization.step(Action::Up).expect("step failed");
        assert_eq!(report.requested, Action::Up);
        assert_eq!(report.executed, Action::Stay);
        assert_eq!(report.truth, Position::new(0, 0));
        assert_eq!(report.estimate, Position::new(0, 0));
        assert_eq!(localization.environment().steps(), 1);
    }

    #[test]
    fn test_uniform_start_localizes_on_digit_maze() {
        let config = EnvironmentConfig {
            map_name: "digits_exemplary".to_string(),
            sensor: gridworld::ObservationModel::Digit,
            max_steps: 0,
            ..EnvironmentConfig::default()
        };
        let environment = initialize_environment(&config).expect("initialize failed");
        let mut localization =
            Localization::new(environment, BeliefInit::Uniform).expect("Localization::new failed");
        let mut agent = ActiveAgent::new(ActionSelection::SumOfUniquePatches, 0.0, 3);
        let options = EpisodeOptions {
            max_steps: 30,
            min_confidence: 0.99,
        };
        let report = localization.run(&mut agent, options).expect("run failed");
        if report.converged {
            assert!(report.correct);
        }
        assert!(report.steps <= 30);
        assert_abs_diff_eq!(localization.filter().belief().total_mass(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reward_accumulates_until_goal() {
        let config = EnvironmentConfig {
            map_name: "matrix".to_string(),
            map_matrix: Some("S.G".to_string()),
            max_steps: 0,
            ..EnvironmentConfig::default()
        };
        let environment = initialize_environment(&config).expect("initialize failed");
        let mut localization = Localization::new(environment, BeliefInit::Uniform)
            .expect("Localization::new failed");
        let mut agent = ScriptedAgent::new(vec![Action::Right; 10]);
        let options = EpisodeOptions {
            max_steps: 10,
            min_confidence: 1.1,
        };
        let report = localization.run(&mut agent, options).expect("run failed");
        assert_eq!(report.steps, 2);
        assert!(report.terminated);
        assert_eq!(report.truth, Position::new(2, 0));
        assert_abs_diff_eq!(report.cumulative_reward, 10.0);
    }

    #[test]
    fn test_reset_follows_new_start() {
        let config = EnvironmentConfig {
            map_name: "random".to_string(),
            width: 5,
            height: 4,
            seed: 17,
            regenerate_on_reset: true,
            random_start_on_reset: true,
            ..EnvironmentConfig::default()
        };
        let environment =
            EpisodicEnvironment::new(&config).expect("EpisodicEnvironment::new failed");
        let start = environment.agent_position();
        let mut localization = Localization::new(environment, BeliefInit::KnownStart(start))
            .expect("Localization::new failed");
        for _ in 0..5 {
            localization.reset().expect("reset failed");
            let start = localization.environment().agent_position();
            assert_eq!(localization.filter().belief_at(start), Ok(1.0));
            assert_eq!(localization.environment().steps(), 0);
        }
    }

    #[test]
    fn test_candidate_maps_identify_the_true_maze() {
        let config = EnvironmentConfig {
            map_name: "digits_csv".to_string(),
            map_matrix: Some("mazes\n3,1\ndigits\n1,2,3\n3,2,1\n1,1,1\n".to_string()),
            sensor: gridworld::ObservationModel::Digit,
            seed: 0,
            max_steps: 0,
            ..EnvironmentConfig::default()
        };
        let environment = initialize_environment(&config).expect("initialize failed");
        let maps = config
            .candidate_maps()
            .expect("candidate_maps failed")
            .into_iter()
            .map(Arc::new)
            .collect();
        let mut localization = Localization::new(environment, BeliefInit::Uniform)
            .expect("Localization::new failed")
            .with_candidate_maps(maps)
            .expect("with_candidate_maps failed");
        let mut agent = ScriptedAgent::new(vec![Action::Right, Action::Right]);
        let options = EpisodeOptions {
            max_steps: 2,
            min_confidence: 1.1,
        };
        let report = localization.run(&mut agent, options).expect("run failed");

        // Reading 1, 2, 3 left to right only fits the first maze.
        assert_eq!(report.most_likely_map, Some(0));
        assert_eq!(report.map_confidence, Some(1.0));
        let candidates = localization.candidates().expect("missing candidates");
        assert_eq!(candidates.most_likely(), Ok((0, Position::new(2, 0))));
    }

    proptest! {
        #[test]
        fn test_random_episodes_stay_consistent(
            seed in 0..500u64,
            noise in 0.0..0.3f64,
            max_steps in 0..40usize,
        ) {
            let config = EnvironmentConfig {
                map_name: "random_hard".to_string(),
                width: 6,
                height: 5,
                noise_std: noise,
                seed,
                max_steps: 0,
                ..EnvironmentConfig::default()
            };
            let environment = initialize_environment(&config).expect("initialize failed");
            let start = environment.agent_position();
            let mut localization = Localization::new(environment, BeliefInit::KnownStart(start))
                .expect("Localization::new failed");
            let mut agent = RandomAgent::new(seed);
            let options = EpisodeOptions { max_steps, min_confidence: 1.1 };
            let report = localization.run(&mut agent, options).expect("run failed");
            assert!(report.steps <= max_steps);
            assert!(localization.filter().belief_at(report.truth).expect("belief_at failed") > 0.0);
            assert_abs_diff_eq!(localization.filter().belief().total_mass(), 1.0, epsilon = 1e-9);
        }
    }
}
