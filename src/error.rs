//! Error types for the converging path engine and its simulation driver.

use crate::grid::Position;
use thiserror::Error;

/// Errors raised by [`IncrementalPathfinder`](crate::algorithms::incremental::IncrementalPathfinder).
///
/// A missing path is not an error: queries report it as an empty path or `false`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathfindError {
    #[error("target {0:?} is not a node of the grid")]
    InvalidTarget(Position),

    #[error("paths have not been generated yet")]
    NotGenerated,
}

/// Errors raised while building a [`Grid`](crate::grid::Grid).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("map is empty")]
    Empty,

    #[error("line {line}: expected {expected} cells, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}, column {column}: unknown cell '{ch}'")]
    UnknownCell { line: usize, column: usize, ch: char },

    #[error("grid is {found_width}x{found_height}, expected {width}x{height}")]
    DimensionMismatch {
        width: i32,
        height: i32,
        found_width: i32,
        found_height: i32,
    },
}

/// Errors raised by the simulation and batch drivers.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    #[error("pathfinding error: {0}")]
    Pathfind(#[from] PathfindError),

    #[error("no open cell left to place the target")]
    NoOpenCell,

    #[error("incremental tree diverged from a full rebuild at tick {tick}")]
    VerificationFailed { tick: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
