//! Shortest paths from every cell of a dynamic grid to one shared target,
//! repaired incrementally as obstacles appear and disappear.
//!
//! [`IncrementalPathfinder`] owns a [`GridGraph`], builds the full path tree
//! once with [`generate_paths`](IncrementalPathfinder::generate_paths), and
//! afterwards keeps it exact through
//! [`add_obstacle`](IncrementalPathfinder::add_obstacle) and
//! [`remove_obstacle`](IncrementalPathfinder::remove_obstacle).
//!
//! ```
//! use converging_paths::{Connectivity, Grid, IncrementalPathfinder, Position};
//!
//! let mut engine = IncrementalPathfinder::new(Grid::new(5, 5, Connectivity::Four));
//! engine.generate_paths(Position::new(4, 4)).unwrap();
//! assert_eq!(engine.find_path(Position::new(0, 0)).len(), 9);
//!
//! engine.add_obstacle(Position::new(2, 2));
//! assert!(engine.has_valid_path(Position::new(0, 0)));
//! ```

pub mod agent;
pub mod algorithms;
pub mod batch_simulation;
pub mod config;
pub mod error;
pub mod grid;
pub mod observer;
pub mod simulation;
pub mod statistics;

pub use algorithms::common::{Cost, UNREACHABLE};
pub use algorithms::incremental::{IncrementalPathfinder, RepairSummary, TreeState};
pub use algorithms::path_tree::{PathNode, PathTree};
pub use error::{GridError, PathfindError, SimulationError};
pub use grid::{Cell, Connectivity, Grid, GridGraph, Position};
pub use observer::{LogObserver, NoopObserver, Operation, OperationReport, PathfindObserver};
