//! Hooks for watching engine operations without coupling the engine to any
//! particular output.

use crate::grid::Position;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GeneratePaths,
    AddObstacle,
    RemoveObstacle,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::GeneratePaths => "generate_paths",
            Operation::AddObstacle => "add_obstacle",
            Operation::RemoveObstacle => "remove_obstacle",
        };
        f.write_str(name)
    }
}

/// What one mutating engine call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationReport {
    pub operation: Operation,
    pub position: Position,
    pub elapsed: Duration,
    /// Nodes settled by the relaxation pass.
    pub settled: usize,
    /// Nodes whose path was invalidated before relaxation. Zero for full
    /// builds and insertions.
    pub invalidated: usize,
    /// Whether the path tree was touched. False when the tree is unbuilt and
    /// only the grid changed.
    pub repaired: bool,
}

pub trait PathfindObserver {
    fn on_operation(&mut self, report: &OperationReport);
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PathfindObserver for NoopObserver {
    fn on_operation(&mut self, _report: &OperationReport) {}
}

/// Forwards reports to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl PathfindObserver for LogObserver {
    fn on_operation(&mut self, report: &OperationReport) {
        log::debug!(
            "{} at ({}, {}) took {:.2?}: settled {}, invalidated {}, repaired {}",
            report.operation,
            report.position.x,
            report.position.y,
            report.elapsed,
            report.settled,
            report.invalidated,
            report.repaired
        );
    }
}

impl<A, B> PathfindObserver for (A, B)
where
    A: PathfindObserver,
    B: PathfindObserver,
{
    fn on_operation(&mut self, report: &OperationReport) {
        self.0.on_operation(report);
        self.1.on_operation(report);
    }
}
