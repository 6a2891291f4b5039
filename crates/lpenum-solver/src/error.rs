use thiserror::Error;

use crate::point::Point;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("Unknown solve method: {0}")]
    InvalidMethod(String),
    #[error("Index out of bounds: column {column}, row {row} in a tableau of {columns} columns and {rows} rows")]
    IndexOutOfBounds {
        column: usize,
        row: usize,
        columns: usize,
        rows: usize,
    },
    #[error("Zero pivot element at {0}")]
    DegenerateRatio(Point),
    #[error("Tableau has no rows")]
    EmptyTableau,
    #[error("Row {row} has {found} elements, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Tableau already has an auxiliary column")]
    AuxiliaryPresent,
    #[error("Tableau has no auxiliary column")]
    NoAuxiliary,
    #[error("Search depth limit of {0} pivots reached")]
    DepthLimit(usize),
}
