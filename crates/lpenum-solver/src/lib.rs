mod epsilon;
mod error;
mod point;
mod report;
mod row;
mod simplex;
mod solution;
mod tableau;

pub use epsilon::{round_to_zero, EPSILON};
pub use error::SolveError;
pub use point::Point;
pub use report::{ErrorHandler, LogErrors, LogPrinter, NullPrinter, Printer, StdoutPrinter};
pub use row::Row;
pub use simplex::{entering_columns, pivot_points, Method, Solver};
pub use solution::{Outcomes, Solution, SolutionStatus, SolveRun};
pub use tableau::Tableau;
