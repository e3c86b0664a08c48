use crate::config::Config;
use crate::error::Result;
use crate::simulation::Simulation;
use std::fs::OpenOptions;
use std::io::Write;
use std::time::{Duration, Instant};

const CSV_HEADER: &str = "simulation_id,seed,grid_size,num_walls,num_obstacles,diagonal,success,ticks,agents_arrived,total_moves,stalled_moves,repair_calls,average_repair_time_ns,average_rebuild_time_ns,average_find_path_time_ns,settled_nodes,invalidated_nodes,execution_time_ms";

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub simulation_id: usize,
    pub seed: u64,
    pub grid_size: i32,
    pub num_walls: usize,
    pub num_obstacles: usize,
    pub diagonal: bool,
    pub success: bool,
    pub ticks: usize,
    pub agents_arrived: usize,
    pub total_moves: usize,
    pub stalled_moves: usize,
    pub repair_calls: usize,
    pub average_repair_time_ns: u64,
    pub average_rebuild_time_ns: u64,
    pub average_find_path_time_ns: u64,
    pub settled_nodes: usize,
    pub invalidated_nodes: usize,
    pub execution_time_ms: u64,
}

impl BatchResult {
    fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.simulation_id,
            self.seed,
            self.grid_size,
            self.num_walls,
            self.num_obstacles,
            self.diagonal,
            self.success,
            self.ticks,
            self.agents_arrived,
            self.total_moves,
            self.stalled_moves,
            self.repair_calls,
            self.average_repair_time_ns,
            self.average_rebuild_time_ns,
            self.average_find_path_time_ns,
            self.settled_nodes,
            self.invalidated_nodes,
            self.execution_time_ms
        )
    }
}

/// Sweeps obstacle density over many seeds, timing incremental repair
/// against full rebuilds and checking that the two always agree.
pub struct BatchSimulation {
    config: Config,
    results: Vec<BatchResult>,
    start_time: Instant,
    batch_size: usize,
    total_results_written: usize,
    summary: Vec<BatchResult>,
}

impl BatchSimulation {
    pub fn new(config: Config) -> Self {
        BatchSimulation {
            config,
            results: Vec::new(),
            start_time: Instant::now(),
            batch_size: 100,
            total_results_written: 0,
            summary: Vec::new(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn results(&self) -> &[BatchResult] {
        &self.summary
    }

    pub fn run(&mut self) -> Result<()> {
        self.initialize_csv_file()?;
        if !self.config.quiet {
            println!("=== BATCH SIMULATION STARTED ===");
            println!("Grid size: {}", self.config.grid_size);
            println!(
                "Obstacles range: {} to {} (step {})",
                self.config.min_obstacles, self.config.max_obstacles, self.config.obstacle_step
            );
            println!("Simulations per configuration: {}", self.config.num_simulations);
            println!("Timeout: {} seconds", self.config.timeout_seconds);
            println!("Output file: {}", self.config.output_file.display());
            println!();
        }

        let obstacle_counts = self.obstacle_counts();
        let total_simulations = obstacle_counts.len() * self.config.num_simulations;
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let mut completed = 0;
        let mut last_progress_report = Instant::now();
        let progress_interval = Duration::from_secs(10);

        for (index, &num_obstacles) in obstacle_counts.iter().enumerate() {
            if self.start_time.elapsed() > timeout {
                log::warn!("timeout reached after {} configurations", index);
                break;
            }
            if !self.config.quiet {
                println!(
                    "Configuration {}/{}: {} obstacles per drop",
                    index + 1,
                    obstacle_counts.len(),
                    num_obstacles
                );
            }

            completed += self.run_configuration(num_obstacles, timeout)?;
            if self.results.len() >= self.batch_size {
                self.flush_results_to_csv()?;
            }

            if last_progress_report.elapsed() > progress_interval {
                let progress = completed as f64 / total_simulations.max(1) as f64 * 100.0;
                println!(
                    "Progress: {:.1}% ({}/{}) - Elapsed: {:.1}s",
                    progress,
                    completed,
                    total_simulations,
                    self.start_time.elapsed().as_secs_f64()
                );
                last_progress_report = Instant::now();
            }
        }

        self.flush_results_to_csv()?;

        println!(
            "Batch simulation completed: {} results in {:.1}s -> {}",
            self.total_results_written,
            self.start_time.elapsed().as_secs_f64(),
            self.config.output_file.display()
        );
        Ok(())
    }

    fn obstacle_counts(&self) -> Vec<usize> {
        (self.config.min_obstacles..=self.config.max_obstacles)
            .step_by(self.config.obstacle_step.max(1))
            .collect()
    }

    fn run_configuration(&mut self, num_obstacles: usize, timeout: Duration) -> Result<usize> {
        let mut run_config = self.config.clone();
        run_config.num_obstacles = num_obstacles;
        run_config.no_visualization = true;
        run_config.quiet = true;
        run_config.verify = true;

        let base_seed = self.config.seed.unwrap_or(0);
        let mut completed = 0;

        for sim_id in 0..self.config.num_simulations {
            if self.start_time.elapsed() > timeout {
                break;
            }
            let seed = base_seed.wrapping_add(sim_id as u64);
            run_config.seed = Some(seed);

            let simulation_start = Instant::now();
            let mut simulation = Simulation::new(run_config.clone())?;
            let (stats, timing) = simulation.run()?;

            let result = BatchResult {
                simulation_id: sim_id,
                seed,
                grid_size: run_config.grid_size,
                num_walls: run_config.num_walls,
                num_obstacles,
                diagonal: run_config.diagonal,
                success: stats.agents_arrived == stats.agents_total,
                ticks: stats.ticks,
                agents_arrived: stats.agents_arrived,
                total_moves: stats.total_moves,
                stalled_moves: stats.stalled_moves,
                repair_calls: timing.repair_calls(),
                average_repair_time_ns: timing.average_repair_time().as_nanos() as u64,
                average_rebuild_time_ns: timing.average_rebuild_time().as_nanos() as u64,
                average_find_path_time_ns: timing.average_find_path_time().as_nanos() as u64,
                settled_nodes: timing.settled_nodes,
                invalidated_nodes: timing.invalidated_nodes,
                execution_time_ms: simulation_start.elapsed().as_millis() as u64,
            };
            self.summary.push(result.clone());
            self.results.push(result);
            completed += 1;
        }
        Ok(completed)
    }

    fn flush_results_to_csv(&mut self) -> Result<()> {
        if self.results.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.output_file)?;
        for result in &self.results {
            writeln!(file, "{}", result.csv_row())?;
        }

        self.total_results_written += self.results.len();
        log::debug!(
            "flushed {} results to CSV (total: {})",
            self.results.len(),
            self.total_results_written
        );
        self.results.clear();
        Ok(())
    }

    fn initialize_csv_file(&self) -> Result<()> {
        let mut file = std::fs::File::create(&self.config.output_file)?;
        writeln!(file, "{}", CSV_HEADER)?;
        Ok(())
    }

    pub fn print_summary(&self) {
        if self.summary.is_empty() {
            println!("No results to summarize.");
            return;
        }

        println!("\n=== BATCH SIMULATION SUMMARY ===");
        let mut counts: Vec<usize> = self.summary.iter().map(|r| r.num_obstacles).collect();
        counts.dedup();

        for num_obstacles in counts {
            let results: Vec<&BatchResult> = self
                .summary
                .iter()
                .filter(|r| r.num_obstacles == num_obstacles)
                .collect();
            let successful = results.iter().filter(|r| r.success).count();
            let repair: f64 = mean(results.iter().map(|r| r.average_repair_time_ns as f64));
            let rebuild: f64 = mean(results.iter().map(|r| r.average_rebuild_time_ns as f64));

            println!("\n{} obstacles per drop:", num_obstacles);
            println!(
                "  All agents arrived: {}/{} ({:.1}%)",
                successful,
                results.len(),
                successful as f64 / results.len() as f64 * 100.0
            );
            println!("  Average repair: {:.0}ns", repair);
            println!("  Average rebuild: {:.0}ns", rebuild);
            if repair > 0.0 {
                println!("  Speedup: {:.1}x", rebuild / repair);
            }
        }
    }
}

fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn writes_one_row_per_simulation() {
        let output = std::env::temp_dir().join(format!(
            "converging_paths_batch_{}.csv",
            std::process::id()
        ));
        let config = Config::parse_from([
            "converging_paths",
            "--batch-mode",
            "--quiet",
            "--grid-size",
            "10",
            "--num-walls",
            "10",
            "--ticks",
            "60",
            "--min-obstacles",
            "2",
            "--max-obstacles",
            "6",
            "--obstacle-step",
            "4",
            "--num-simulations",
            "2",
            "--output-file",
            output.to_str().unwrap(),
        ]);

        let mut batch = BatchSimulation::new(config).with_batch_size(1);
        batch.run().unwrap();

        let csv = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.len(), 1 + 4);
        assert_eq!(batch.results().len(), 4);
        assert!(lines[1..]
            .iter()
            .all(|line| line.split(',').count() == CSV_HEADER.split(',').count()));

        std::fs::remove_file(&output).ok();
    }

    #[test]
    fn mean_of_nothing_is_zero() {
        assert_eq!(mean(std::iter::empty()), 0.0);
        assert_eq!(mean([1.0, 3.0].into_iter()), 2.0);
    }
}
