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

#![warn(missing_docs)]

//! Chapter 14, Probabilistic Reasoning over Time: grid localization, one episode.
//!
//! The agent wanders a gridworld it cannot see, and a histogram filter works out where it is
//! from its actions and sensor readings alone.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gridworld::{initialize_environment, Action, Environment, EnvironmentConfig};
use histogram_filter::{ActionSelection, BeliefInit, HistogramFilter};
use maze_localization::{
    ActiveAgent, Agent, EpisodeOptions, Localization, RandomAgent, ScriptedAgent,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Run one grid localization episode", long_about = None)]
struct Cli {
    /// JSON environment configuration. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How the agent picks actions.
    #[arg(long, value_enum, default_value_t = AgentKind::SumOfUniquePatches)]
    agent: AgentKind,

    /// Actions for the scripted agent, e.g. "right,right,down".
    #[arg(long, value_delimiter = ',')]
    actions: Vec<Action>,

    /// Steps before giving up.
    #[arg(long, default_value_t = 100)]
    max_steps: usize,

    /// Stop once the most likely cell holds this much mass.
    #[arg(long, default_value_t = 0.95)]
    min_confidence: f64,

    /// Start with all mass on the true start cell instead of a uniform belief.
    #[arg(long)]
    known_start: bool,

    /// Probability of a random move for the active agents.
    #[arg(long, default_value_t = 0.0)]
    epsilon: f64,

    /// Seed for the random and active agents.
    #[arg(long, default_value_t = 0)]
    agent_seed: u64,

    /// Print the episode report as JSON.
    #[arg(long)]
    json: bool,

    /// Log every predict/update cycle.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AgentKind {
    Scripted,
    Random,
    MostUniquePatch,
    SumOfUniquePatches,
}

type BoxedAgent = Box<dyn Agent<Action = Action, Percept = HistogramFilter>>;

fn build_agent(cli: &Cli) -> BoxedAgent {
    match cli.agent {
        AgentKind::Scripted => Box::new(ScriptedAgent::new(cli.actions.clone())),
        AgentKind::Random => Box::new(RandomAgent::new(cli.agent_seed)),
        AgentKind::MostUniquePatch => Box::new(ActiveAgent::new(
            ActionSelection::MostUniquePatch,
            cli.epsilon,
            cli.agent_seed,
        )),
        AgentKind::SumOfUniquePatches => Box::new(ActiveAgent::new(
            ActionSelection::SumOfUniquePatches,
            cli.epsilon,
            cli.agent_seed,
        )),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EnvironmentConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(EnvironmentConfig::from_json_str(&json)?)
        }
        None => Ok(EnvironmentConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_ref())?;
    let environment = initialize_environment(&config)?;
    let init = if cli.known_start {
        BeliefInit::KnownStart(environment.agent_position())
    } else {
        BeliefInit::Uniform
    };
    println!("map:\n{}\n", environment.map());

    let candidates = config.candidate_maps()?;
    let mut localization = Localization::new(environment, init)?;
    if candidates.len() > 1 {
        localization =
            localization.with_candidate_maps(candidates.into_iter().map(Arc::new).collect())?;
    }
    let mut agent = build_agent(&cli);
    let options = EpisodeOptions {
        max_steps: cli.max_steps,
        min_confidence: cli.min_confidence,
    };
    let report = localization.run(&mut agent, options)?;

    println!("belief:\n{}\n", localization.filter().belief());
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("steps: {}", report.steps);
        println!("estimate: {} (confidence {:.3})", report.estimate, report.confidence);
        println!("truth: {}", report.truth);
        println!("correct: {}", report.correct);
        println!("entropy: {:.3}", report.entropy);
        if let (Some(map), Some(confidence)) = (report.most_likely_map, report.map_confidence) {
            println!("map: {} (confidence {:.3})", map, confidence);
        }
    }
    Ok(())
}
