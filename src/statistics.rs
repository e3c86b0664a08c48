use crate::observer::{Operation, OperationReport, PathfindObserver};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub ticks: usize,
    pub obstacles_added: usize,
    pub obstacles_removed: usize,
    pub agents_arrived: usize,
    pub agents_total: usize,
    pub total_moves: usize,
    pub stalled_moves: usize,
    pub verification_checks: usize,
    pub verification_failures: usize,
}

impl Statistics {
    pub fn new(agents_total: usize) -> Self {
        Statistics {
            agents_total,
            ..Default::default()
        }
    }

    pub fn arrival_rate(&self) -> f64 {
        if self.agents_total == 0 {
            0.0
        } else {
            self.agents_arrived as f64 / self.agents_total as f64
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(f, "Obstacles added: {}", self.obstacles_added)?;
        writeln!(f, "Obstacles cleared: {}", self.obstacles_removed)?;
        writeln!(
            f,
            "Agents arrived: {}/{} ({:.1}%)",
            self.agents_arrived,
            self.agents_total,
            self.arrival_rate() * 100.0
        )?;
        writeln!(f, "Total moves: {}", self.total_moves)?;
        writeln!(f, "Stalled moves: {}", self.stalled_moves)?;

        if self.verification_checks > 0 {
            writeln!(
                f,
                "Verification: {} checks, {} failures",
                self.verification_checks, self.verification_failures
            )?;
        }

        Ok(())
    }
}

/// Durations of every engine call, grouped by operation.
#[derive(Debug, Clone, Default)]
pub struct TimingData {
    pub generate_times: Vec<Duration>,
    pub add_obstacle_times: Vec<Duration>,
    pub remove_obstacle_times: Vec<Duration>,
    pub find_path_times: Vec<Duration>,
    pub rebuild_times: Vec<Duration>,
    pub settled_nodes: usize,
    pub invalidated_nodes: usize,
}

impl TimingData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn average_generate_time(&self) -> Duration {
        average(&self.generate_times)
    }

    pub fn average_add_obstacle_time(&self) -> Duration {
        average(&self.add_obstacle_times)
    }

    pub fn average_remove_obstacle_time(&self) -> Duration {
        average(&self.remove_obstacle_times)
    }

    pub fn average_find_path_time(&self) -> Duration {
        average(&self.find_path_times)
    }

    pub fn average_rebuild_time(&self) -> Duration {
        average(&self.rebuild_times)
    }

    /// Mean time of an incremental repair, insertions and removals together.
    pub fn average_repair_time(&self) -> Duration {
        let total: Duration = self
            .add_obstacle_times
            .iter()
            .chain(&self.remove_obstacle_times)
            .sum();
        let count = self.repair_calls();
        if count == 0 {
            Duration::ZERO
        } else {
            total / count as u32
        }
    }

    pub fn repair_calls(&self) -> usize {
        self.add_obstacle_times.len() + self.remove_obstacle_times.len()
    }

    pub fn total_calls(&self) -> usize {
        self.generate_times.len() + self.repair_calls() + self.find_path_times.len()
    }

    /// How many times faster a repair is than a full rebuild, if both were
    /// measured.
    pub fn speedup(&self) -> Option<f64> {
        let repair = self.average_repair_time().as_nanos();
        let rebuild = self.average_rebuild_time().as_nanos();
        if repair == 0 || rebuild == 0 {
            None
        } else {
            Some(rebuild as f64 / repair as f64)
        }
    }
}

fn average(times: &[Duration]) -> Duration {
    if times.is_empty() {
        Duration::ZERO
    } else {
        let total: Duration = times.iter().sum();
        total / times.len() as u32
    }
}

impl PathfindObserver for TimingData {
    fn on_operation(&mut self, report: &OperationReport) {
        if !report.repaired {
            return;
        }
        match report.operation {
            Operation::GeneratePaths => self.generate_times.push(report.elapsed),
            Operation::AddObstacle => self.add_obstacle_times.push(report.elapsed),
            Operation::RemoveObstacle => self.remove_obstacle_times.push(report.elapsed),
        }
        self.settled_nodes += report.settled;
        self.invalidated_nodes += report.invalidated;
    }
}

impl fmt::Display for TimingData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "generate_paths: {} calls, avg {:.2?}",
            self.generate_times.len(),
            self.average_generate_time()
        )?;
        writeln!(
            f,
            "add_obstacle: {} calls, avg {:.2?}",
            self.add_obstacle_times.len(),
            self.average_add_obstacle_time()
        )?;
        writeln!(
            f,
            "remove_obstacle: {} calls, avg {:.2?}",
            self.remove_obstacle_times.len(),
            self.average_remove_obstacle_time()
        )?;
        writeln!(
            f,
            "find_path: {} calls, avg {:.2?}",
            self.find_path_times.len(),
            self.average_find_path_time()
        )?;
        writeln!(
            f,
            "Nodes settled: {}, invalidated: {}",
            self.settled_nodes, self.invalidated_nodes
        )?;
        if let Some(speedup) = self.speedup() {
            writeln!(
                f,
                "Repair vs rebuild: {:.2?} vs {:.2?} ({:.1}x)",
                self.average_repair_time(),
                self.average_rebuild_time(),
                speedup
            )?;
        }
        Ok(())
    }
}
