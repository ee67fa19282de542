//! Experiment driver, grounded on `main.py`'s outer loop: for each scenario,
//! run the fleet once at full broadcast length, then once per forecast
//! length 1..=10 cells, recording every run's travel time into the results
//! sink keyed the way `main.py` keys `rc['Full']` / `rc[f'{F}_step']`.

mod agent;
mod config;
mod error;
mod geometry;
mod message;
mod orchestrator;
mod planner;
mod render;
mod results;
mod scenario;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use config::{Cli, Config};
use geometry::{Grid, SPEED};
use orchestrator::{SimOutcome, Simulation, SimulationConfig};
use scenario::Route;

const MIN_FORECAST_CELLS: u32 = 1;
const MAX_FORECAST_CELLS: u32 = 10;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::new(&cli);
    config.validate().context("invalid configuration")?;

    let default_level = match config.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let grid = Grid::new(config.grid_width, config.grid_height);
    let sim_config = SimulationConfig {
        coordination_period: config.coordination_period,
        max_replan_attempts: config.max_replan_attempts,
    };
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut sink = results::ResultsSink::new();
    sink.add_key("Full");

    // A fixed `--forecast-length` runs just that one forecast per scenario;
    // omitting it sweeps every forecast length 1..=10 alongside the
    // full-path run, matching `main.py`'s unconditional outer sweep.
    let forecasts: Vec<u32> = match config.forecast_length {
        Some(f) => vec![f],
        None => (MIN_FORECAST_CELLS..=MAX_FORECAST_CELLS).collect(),
    };
    for &forecast in &forecasts {
        sink.add_key(&format!("{forecast}_step"));
    }

    for scenario_id in 0..config.num_scenarios {
        let routes = match &config.scenario_path {
            Some(path) => scenario::load_routes_from_yaml(path)
                .with_context(|| format!("loading scenario from {path}"))?,
            None => scenario::generate_conflicting_fleet(config.num_agents, &grid, &mut rng),
        };
        info!(scenario_id, num_agents = routes.len(), "starting scenario");

        run_once(&routes, &grid, sim_config, None, "Full", &mut sink)
            .with_context(|| format!("scenario {scenario_id}, full-path run"))?;
        for &forecast in &forecasts {
            run_once(
                &routes,
                &grid,
                sim_config,
                Some(forecast),
                &format!("{forecast}_step"),
                &mut sink,
            )
            .with_context(|| format!("scenario {scenario_id}, {forecast}-cell forecast run"))?;
        }
    }

    sink.summarize(&config.output_path)
        .context("writing results summary")?;
    info!(output_path = %config.output_path, "wrote results summary");
    Ok(())
}

/// Build a fresh fleet from `routes`, run it to completion (or consensus
/// failure), and record its travel time under `key`. Successful runs are
/// scaled by [`SPEED`] to match `main.py`'s `tick * Aircraft.speed`; a
/// failed (consensus-failure) run instead records the raw sentinel tick,
/// unscaled, exactly as `main.py` appends `tick` (not `tick * speed`) on the
/// failure path. An invariant violation is not a recordable outcome — it is
/// unrecoverable (§7) and propagates to the caller instead.
fn run_once(
    routes: &[Route],
    grid: &Grid,
    sim_config: SimulationConfig,
    forecast_length: Option<u32>,
    key: &str,
    sink: &mut results::ResultsSink,
) -> anyhow::Result<()> {
    let mut agents = scenario::from_fixed_routes(routes, routes.len());
    for agent in &mut agents {
        agent.forecast_length = forecast_length;
    }
    let mut sim = Simulation::new(agents, *grid, sim_config);
    match sim.run() {
        Ok(SimOutcome::Succeeded { ticks }) => {
            sink.record(key, ticks as f64 * SPEED);
            Ok(())
        }
        Ok(SimOutcome::Failed { sentinel_tick }) => {
            sink.record(key, sentinel_tick as f64);
            Ok(())
        }
        Err(err) => Err(anyhow::anyhow!(err)).context("invariant violated during simulation"),
    }
}
