use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::epsilon::round_to_zero;
use crate::error::SolveError;
use crate::point::Point;
use crate::report::{ErrorHandler, LogErrors, LogPrinter, Printer};
use crate::solution::SolveRun;
use crate::tableau::Tableau;

/// How the initial tableau is solved
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// The initial basis is feasible
    Simplex,
    /// An auxiliary problem finds a feasible basis first
    TwoPhaseSimplex,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Simplex => f.write_str("simplex"),
            Method::TwoPhaseSimplex => f.write_str("two-phase simplex"),
        }
    }
}

impl FromStr for Method {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simplex" => Ok(Method::Simplex),
            "two-phase" | "two-phase simplex" | "two-phase-simplex" => Ok(Method::TwoPhaseSimplex),
            other => Err(SolveError::InvalidMethod(other.to_string())),
        }
    }
}

/// Unit of work of the search. Pivot tasks share their source tableau
/// read-only; each pivot produces a tableau owned by the next explore task.
enum Task {
    Explore { tableau: Tableau, depth: usize },
    Pivot { source: Rc<Tableau>, point: Point, depth: usize },
}

/// The trace and failure sinks of a single solve
struct Sinks<'a> {
    printer: &'a mut dyn Printer,
    handler: &'a mut dyn ErrorHandler,
}

/// Tableau simplex solver that follows every tied pivot choice, so every
/// optimal basic feasible solution reachable through ties is reported.
pub struct Solver {
    /// Pivots allowed along one branch before it is abandoned
    max_depth: usize,
}

impl Default for Solver {
    fn default() -> Self {
        Self { max_depth: 10_000 }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Plain simplex when the initial basis is feasible, two-phase otherwise
    pub fn determine_method(&self, initial: &Tableau) -> Method {
        if initial.is_bfs() {
            Method::Simplex
        } else {
            Method::TwoPhaseSimplex
        }
    }

    /// Solve with the trace and failures sent to the `log` facade
    pub fn solve(&self, initial: &Tableau) -> SolveRun {
        self.solve_with(initial, &mut LogPrinter, &mut LogErrors)
    }

    /// Solve, writing the trace to `printer` and every abandoned branch to
    /// `handler`. The initial tableau is never modified.
    pub fn solve_with(
        &self,
        initial: &Tableau,
        printer: &mut dyn Printer,
        handler: &mut dyn ErrorHandler,
    ) -> SolveRun {
        let mut sinks = Sinks { printer, handler };
        sinks.printer.emit("Initial Tableau\n");
        sinks.printer.emit(&initial.to_string());

        let method = self.determine_method(initial);
        sinks.printer.emit(&format!("Using method {}...\n", method));
        log::info!(
            "solving {}x{} tableau with {}",
            initial.row_count(),
            initial.column_count(),
            method
        );

        let mut run = SolveRun::new(method);
        run.record_visit(initial);

        let result = match method {
            Method::Simplex => {
                self.simplex(initial.clone(), &mut run, &mut sinks);
                Ok(())
            }
            Method::TwoPhaseSimplex => self.two_phase_simplex(initial.clone(), &mut run, &mut sinks),
        };
        if let Err(e) = result {
            Self::abandon(&e, &mut run, &mut sinks);
        }

        let outcomes = run.outcomes();
        log::info!(
            "search finished: {} optimal, {} infeasible, {} unbounded, {} abandoned, {} tableaux visited",
            outcomes.optimal,
            outcomes.infeasible,
            outcomes.unbounded,
            outcomes.abandoned,
            run.visited().len()
        );
        run
    }

    fn simplex(&self, current: Tableau, run: &mut SolveRun, sinks: &mut Sinks<'_>) {
        self.move_to_adjacent_bfs(current, run, sinks);
    }

    fn two_phase_simplex(
        &self,
        mut current: Tableau,
        run: &mut SolveRun,
        sinks: &mut Sinks<'_>,
    ) -> Result<(), SolveError> {
        current.create_auxiliary_column()?;
        sinks.printer.emit("Auxiliary Created\n");
        sinks.printer.emit(&current.to_string());

        // Phase 1: bring x0 into the basis, then drive -x0 up to zero
        let start = self.select_x0_pivot(&current, sinks)?;
        self.move_to_adjacent_bfs(start, run, sinks);
        run.begin_phase_two();
        log::debug!("phase one produced {} auxiliary optima", run.auxiliary_optima().len());

        // Phase 2 from every feasible basis phase 1 found
        let solved: Vec<Tableau> = run.auxiliary_optima().to_vec();
        for mut aux in solved {
            if aux.is_infeasible() || aux.is_unbounded() {
                continue;
            }
            match aux.remove_auxiliary_column() {
                Ok(()) => self.simplex(aux, run, sinks),
                Err(e) => Self::abandon(&e, run, sinks),
            }
        }
        Ok(())
    }

    /// Pivot `x0` into the constraint row with the most negative `b`,
    /// defaulting to row 2 when no `b` is negative
    fn select_x0_pivot(&self, tableau: &Tableau, sinks: &mut Sinks<'_>) -> Result<Tableau, SolveError> {
        let mut row = 2;
        let mut most_negative = 0.0;
        for j in tableau.first_constraint_row()..tableau.row_count() {
            let b = tableau.row_at(j)?.b();
            if b < most_negative {
                most_negative = b;
                row = j;
            }
        }
        self.pivot(tableau, Point::new(0, row), sinks)
    }

    /// Depth-first search over every tied pivot, starting at `start`
    fn move_to_adjacent_bfs(&self, start: Tableau, run: &mut SolveRun, sinks: &mut Sinks<'_>) {
        let mut stack = vec![Task::Explore { tableau: start, depth: 0 }];

        while let Some(task) = stack.pop() {
            let step = match task {
                Task::Explore { tableau, depth } => self.explore(tableau, run, sinks).map(|branches| {
                    if let Some((source, points)) = branches {
                        // reversed so the first point is explored first
                        for point in points.into_iter().rev() {
                            stack.push(Task::Pivot {
                                source: Rc::clone(&source),
                                point,
                                depth: depth + 1,
                            });
                        }
                    }
                }),
                Task::Pivot { source, point, depth } => {
                    if depth > self.max_depth {
                        Err(SolveError::DepthLimit(self.max_depth))
                    } else {
                        self.pivot(&source, point, sinks)
                            .map(|tableau| stack.push(Task::Explore { tableau, depth }))
                    }
                }
            };
            if let Err(e) = step {
                Self::abandon(&e, run, sinks);
            }
        }
    }

    /// Classify `tableau`. Leaves are recorded and yield `None`; otherwise
    /// the tableau is returned with the points to branch on.
    fn explore(
        &self,
        mut tableau: Tableau,
        run: &mut SolveRun,
        sinks: &mut Sinks<'_>,
    ) -> Result<Option<(Rc<Tableau>, Vec<Point>)>, SolveError> {
        run.record_visit(&tableau);

        if tableau.is_optimal() {
            if tableau.has_auxiliary_column() && tableau.objective_value() != 0.0 {
                sinks.printer.emit("Tableau is infeasible.\n");
                sinks.printer.emit(&tableau.to_string());
                tableau.flag_infeasible();
                run.record_infeasible();
                return Ok(None);
            }
            sinks.printer.emit("Tableau is optimal. Adding to list of optimal solutions.\n");
            sinks.printer.emit(&tableau.to_string());
            run.record_optimal(tableau);
            return Ok(None);
        }

        let columns = entering_columns(&tableau);
        let mut points = pivot_points(&tableau, &columns)?;

        if points.is_empty() {
            tableau.flag_unbounded();
            sinks.printer.emit("Tableau is unbounded.\n");
            run.record_unbounded();
            return Ok(None);
        }

        // Leave x0 out of the basis as soon as a tie allows it
        if tableau.has_auxiliary_column() {
            let x0_points: Vec<Point> = points
                .iter()
                .copied()
                .filter(|p| matches!(tableau.value_at(0, p.row()), Ok(v) if v == 1.0))
                .collect();
            if !x0_points.is_empty() {
                points = x0_points;
            }
        }

        let listed: Vec<String> = points.iter().map(Point::to_string).collect();
        sinks.printer.emit(&format!("Found the following points to pivot on: {} \n", listed.join(" ")));
        log::debug!("branching on {} pivot points from columns {:?}", points.len(), columns);

        Ok(Some((Rc::new(tableau), points)))
    }

    fn pivot(&self, tableau: &Tableau, point: Point, sinks: &mut Sinks<'_>) -> Result<Tableau, SolveError> {
        sinks.printer.emit(&format!("Before pivot on {}\n", point));
        sinks.printer.emit(&tableau.render_highlighting(point));

        let pivoted = tableau.pivoted(point)?;

        sinks.printer.emit("After pivot\n");
        sinks.printer.emit(&pivoted.to_string());
        Ok(pivoted)
    }

    fn abandon(error: &SolveError, run: &mut SolveRun, sinks: &mut Sinks<'_>) {
        log::warn!("abandoning branch: {}", error);
        run.record_abandoned();
        sinks.handler.handle(error);
    }
}

/// Every column whose row-0 coefficient equals the largest one
pub fn entering_columns(tableau: &Tableau) -> Vec<usize> {
    let coefficients: Vec<f64> = tableau.rows()[0]
        .coefficients()
        .iter()
        .map(|&v| round_to_zero(v))
        .collect();
    let largest = coefficients.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    coefficients
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v == largest)
        .map(|(i, _)| i)
        .collect()
}

/// Ratio test over `columns`: every positive constraint element whose
/// `b / a` equals the smallest such ratio, ordered by column then row
pub fn pivot_points(tableau: &Tableau, columns: &[usize]) -> Result<Vec<Point>, SolveError> {
    let b = tableau.b_column();

    let mut valid = Vec::new();
    for &i in columns {
        for j in tableau.first_constraint_row()..tableau.row_count() {
            if round_to_zero(tableau.value_at(i, j)?) > 0.0 {
                valid.push(Point::new(i, j));
            }
        }
    }

    let mut ratios = Vec::with_capacity(valid.len());
    for point in valid {
        let aij = tableau.value_at(point.column(), point.row())?;
        if aij == 0.0 {
            return Err(SolveError::DegenerateRatio(point));
        }
        ratios.push((point, tableau.value_at(b, point.row())? / aij));
    }

    let min = ratios.iter().map(|&(_, r)| r).fold(f64::INFINITY, f64::min);
    Ok(ratios
        .into_iter()
        .filter(|&(_, r)| r == min)
        .map(|(p, _)| p)
        .collect())
}
