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

//! Chapter 14, Probabilistic Reasoning over Time: grid localization, batch evaluation.
//!
//! Trial `i` uses seed `config.seed + i` for the map (if procedural), the motion and sensor
//! noise, and the agent. Each trial owns its environment and filter, so trials run in parallel.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gridworld::{initialize_environment, Action, EnvironmentConfig};
use histogram_filter::{ActionSelection, BeliefInit, HistogramFilter};
use maze_localization::{
    ActiveAgent, Agent, EpisodeOptions, EpisodeReport, Localization, RandomAgent,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(author, version, long_about = None)]
#[command(about = "Evaluate grid localization over many seeded episodes")]
struct Cli {
    /// JSON environment configuration. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of episodes.
    #[arg(short, long, default_value_t = 100)]
    trials: u64,

    /// How the agent picks actions.
    #[arg(long, value_enum, default_value_t = AgentKind::SumOfUniquePatches)]
    agent: AgentKind,

    /// Steps before giving up.
    #[arg(long, default_value_t = 100)]
    max_steps: usize,

    /// Stop once the most likely cell holds this much mass.
    #[arg(long, default_value_t = 0.95)]
    min_confidence: f64,

    /// Probability of a random move for the active agents.
    #[arg(long, default_value_t = 0.1)]
    epsilon: f64,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AgentKind {
    Random,
    MostUniquePatch,
    SumOfUniquePatches,
}

#[derive(Debug, Serialize)]
struct Summary {
    trials: usize,
    converged: usize,
    correct: usize,
    terminated: usize,
    mean_steps: f64,
    mean_confidence: f64,
    mean_entropy: f64,
}

impl Summary {
    fn new(reports: &[EpisodeReport]) -> Self {
        let n = reports.len().max(1) as f64;
        let mean = |f: fn(&EpisodeReport) -> f64| reports.iter().map(f).sum::<f64>() / n;
        Self {
            trials: reports.len(),
            converged: reports.iter().filter(|r| r.converged).count(),
            correct: reports.iter().filter(|r| r.correct).count(),
            terminated: reports.iter().filter(|r| r.terminated).count(),
            mean_steps: mean(|r| r.steps as f64),
            mean_confidence: mean(|r| r.confidence),
            mean_entropy: mean(|r| r.entropy),
        }
    }
}

fn build_agent(
    kind: AgentKind,
    epsilon: f64,
    seed: u64,
) -> Box<dyn Agent<Action = Action, Percept = HistogramFilter>> {
    match kind {
        AgentKind::Random => Box::new(RandomAgent::new(seed)),
        AgentKind::MostUniquePatch => Box::new(ActiveAgent::new(
            ActionSelection::MostUniquePatch,
            epsilon,
            seed,
        )),
        AgentKind::SumOfUniquePatches => Box::new(ActiveAgent::new(
            ActionSelection::SumOfUniquePatches,
            epsilon,
            seed,
        )),
    }
}

fn run_trial(cli: &Cli, base: &EnvironmentConfig, trial: u64) -> Result<EpisodeReport> {
    let seed = base.seed.wrapping_add(trial);
    let config = EnvironmentConfig {
        seed,
        ..base.clone()
    };
    let environment = initialize_environment(&config)?;
    let mut localization = Localization::new(environment, BeliefInit::Uniform)?;
    let mut agent = build_agent(cli.agent, cli.epsilon, seed);
    let options = EpisodeOptions {
        max_steps: cli.max_steps,
        min_confidence: cli.min_confidence,
    };
    let report = localization
        .run(&mut agent, options)
        .with_context(|| format!("trial {} (seed {})", trial, seed))?;
    Ok(report)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            EnvironmentConfig::from_json_str(&json)?
        }
        None => EnvironmentConfig::default(),
    };

    tracing::info!(trials = cli.trials, agent = ?cli.agent, map = %config.map_name, "evaluating");
    let reports = (0..cli.trials)
        .into_par_iter()
        .map(|trial| run_trial(&cli, &config, trial))
        .collect::<Result<Vec<_>>>()?;

    let summary = Summary::new(&reports);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("trials: {}", summary.trials);
        println!("converged: {}", summary.converged);
        println!("correct: {}", summary.correct);
        println!("terminated: {}", summary.terminated);
        println!("mean steps: {:.2}", summary.mean_steps);
        println!("mean confidence: {:.3}", summary.mean_confidence);
        println!("mean entropy: {:.3}", summary.mean_entropy);
    }
    Ok(())
}
