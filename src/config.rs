use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, default_value_t = 20)]
    pub grid_size: i32,

    /// Permanent walls placed before the first build.
    #[arg(long, default_value_t = 50)]
    pub num_walls: usize,

    /// Obstacles dropped per obstacle cycle.
    #[arg(long, default_value_t = 10)]
    pub num_obstacles: usize,

    #[arg(long, default_value_t = 4)]
    pub num_agents: usize,

    /// Upper bound on simulation ticks.
    #[arg(long, default_value_t = 400)]
    pub ticks: usize,

    /// Ticks between obstacle drops.
    #[arg(long, default_value_t = 5)]
    pub obstacle_interval: usize,

    /// Ticks an obstacle group stays before it is cleared.
    #[arg(long, default_value_t = 5)]
    pub obstacle_lifetime: usize,

    #[arg(long, default_value_t = 50)]
    pub delay_ms: u64,

    #[arg(long, default_value_t = false)]
    pub no_visualization: bool,

    /// Use 8-connected movement instead of 4-connected.
    #[arg(long, default_value_t = false)]
    pub diagonal: bool,

    /// Seed for the environment; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Compare the repaired tree with a full rebuild after every change.
    #[arg(long, default_value_t = false)]
    pub verify: bool,

    /// Load the grid from a text map (`.` open, `#` wall, `O` obstacle)
    /// instead of placing walls randomly.
    #[arg(long)]
    pub map: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub quiet: bool,

    #[arg(long, default_value_t = false)]
    pub batch_mode: bool,

    #[arg(long, default_value_t = 0)]
    pub min_obstacles: usize,

    #[arg(long, default_value_t = 20)]
    pub max_obstacles: usize,

    #[arg(long, default_value_t = 5)]
    pub obstacle_step: usize,

    #[arg(long, default_value_t = 10)]
    pub num_simulations: usize,

    #[arg(long, default_value_t = 300)]
    pub timeout_seconds: u64,

    #[arg(long, default_value = "batch_results.csv")]
    pub output_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["converging_paths"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let config = Config::default();
        assert_eq!(config.grid_size, 20);
        assert!(!config.diagonal);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::parse_from([
            "converging_paths",
            "--grid-size",
            "8",
            "--diagonal",
            "--seed",
            "7",
            "--batch-mode",
        ]);
        assert_eq!(config.grid_size, 8);
        assert!(config.diagonal);
        assert_eq!(config.seed, Some(7));
        assert!(config.batch_mode);
    }
}
