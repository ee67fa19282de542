use anyhow::anyhow;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "Decentralized Aircraft Collision Avoidance Simulator",
    about = "Simulates decentralized collision avoidance among a small fleet of aircraft on a grid.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Number of aircraft in the fleet", default_value_t = 3)]
    pub num_agents: usize,

    #[arg(long, help = "Grid width in cells", default_value_t = 10)]
    pub grid_width: i64,

    #[arg(long, help = "Grid height in cells", default_value_t = 10)]
    pub grid_height: i64,

    #[arg(
        long,
        help = "Ticks between coordination phases",
        default_value_t = 5
    )]
    pub coordination_period: u64,

    #[arg(long, help = "Maximum replan attempts per coordination phase", default_value_t = 3)]
    pub max_replan_attempts: u32,

    #[arg(
        long,
        help = "Forecast length in cells to publish per broadcast; omit for full path"
    )]
    pub forecast_length: Option<u32>,

    #[arg(
        long,
        help = "Number of scenarios to run in the experiment driver",
        default_value_t = 1
    )]
    pub num_scenarios: usize,

    #[arg(long, help = "Seed for the random number generator", default_value_t = 0)]
    pub seed: u64,

    #[arg(
        long,
        help = "Path to a fixed scenario YAML file; omit for random generation"
    )]
    pub scenario_path: Option<String>,

    #[arg(
        long,
        help = "Path to write the results summary",
        default_value = "results.txt"
    )]
    pub output_path: String,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity (-v for debug, -vv for trace); default is info"
    )]
    pub verbose: u8,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub num_agents: usize,
    pub grid_width: i64,
    pub grid_height: i64,
    pub coordination_period: u64,
    pub max_replan_attempts: u32,
    pub forecast_length: Option<u32>,
    pub num_scenarios: usize,
    pub seed: u64,
    pub scenario_path: Option<String>,
    pub output_path: String,
    pub verbose: u8,
}

impl Config {
    pub fn new(cli: &Cli) -> Self {
        Self {
            num_agents: cli.num_agents,
            grid_width: cli.grid_width,
            grid_height: cli.grid_height,
            coordination_period: cli.coordination_period,
            max_replan_attempts: cli.max_replan_attempts,
            forecast_length: cli.forecast_length,
            num_scenarios: cli.num_scenarios,
            seed: cli.seed,
            scenario_path: cli.scenario_path.clone(),
            output_path: cli.output_path.clone(),
            verbose: cli.verbose,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_agents == 0 {
            return Err(anyhow!("num_agents must be at least 1"));
        }
        if self.grid_width <= 0 || self.grid_height <= 0 {
            return Err(anyhow!(
                "grid dimensions must be positive, got {}x{}",
                self.grid_width,
                self.grid_height
            ));
        }
        if self.coordination_period == 0 {
            return Err(anyhow!("coordination_period must be at least 1"));
        }
        if self.max_replan_attempts == 0 {
            return Err(anyhow!("max_replan_attempts must be at least 1"));
        }
        if let Some(forecast) = self.forecast_length {
            if !(1..=10).contains(&forecast) {
                return Err(anyhow!(
                    "forecast_length must be between 1 and 10 cells, got {}",
                    forecast
                ));
            }
        }
        Ok(())
    }
}
