use crate::epsilon::EPSILON;
use crate::report::Printer;
use crate::row::{format_value, Row};
use crate::simplex::Method;
use crate::tableau::Tableau;

/// One optimal basic feasible solution
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Objective value at this basis
    pub objective_value: f64,
    /// Value of every variable (structural then slack), followed by the
    /// objective value
    pub values: Row,
}

impl Solution {
    pub fn from_tableau(tableau: &Tableau) -> Self {
        Self {
            objective_value: tableau.problem_objective_value(),
            values: tableau.solution_vector(),
        }
    }

    /// Variable values without the trailing objective value
    pub fn variables(&self) -> &[f64] {
        self.values.coefficients()
    }

    fn same_point(&self, other: &Solution) -> bool {
        let (a, b) = (self.values.values(), other.values.values());
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < EPSILON)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// At least one optimal solution was found
    Optimal,
    /// Every leaf was infeasible
    Infeasible,
    /// No optimal leaf and at least one unbounded leaf
    Unbounded,
    /// No leaf was reached because every branch failed
    Error,
}

/// Leaf counters of a run
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcomes {
    pub infeasible: usize,
    pub unbounded: usize,
    pub optimal: usize,
    /// Branches dropped after a failure
    pub abandoned: usize,
}

/// Everything a solve produced: the audit trail of visited tableaux, the
/// optimal leaves, the phase-one optima and the leaf counters.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct SolveRun {
    method: Method,
    visited: Vec<Tableau>,
    optimal: Vec<Tableau>,
    auxiliary_optima: Vec<Tableau>,
    outcomes: Outcomes,
}

impl SolveRun {
    pub(crate) fn new(method: Method) -> Self {
        Self {
            method,
            visited: Vec::new(),
            optimal: Vec::new(),
            auxiliary_optima: Vec::new(),
            outcomes: Outcomes::default(),
        }
    }

    pub(crate) fn record_visit(&mut self, tableau: &Tableau) {
        self.visited.push(tableau.clone());
    }

    pub(crate) fn record_optimal(&mut self, tableau: Tableau) {
        self.outcomes.optimal += 1;
        self.optimal.push(tableau);
    }

    pub(crate) fn record_infeasible(&mut self) {
        self.outcomes.infeasible += 1;
    }

    pub(crate) fn record_unbounded(&mut self) {
        self.outcomes.unbounded += 1;
    }

    pub(crate) fn record_abandoned(&mut self) {
        self.outcomes.abandoned += 1;
    }

    /// Move the phase-one optima out of the optimal bucket
    pub(crate) fn begin_phase_two(&mut self) {
        self.auxiliary_optima.append(&mut self.optimal);
        self.outcomes.optimal = 0;
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Every tableau the search visited, in visiting order
    pub fn visited(&self) -> &[Tableau] {
        &self.visited
    }

    pub fn optimal_tableaux(&self) -> &[Tableau] {
        &self.optimal
    }

    /// Optimal tableaux of the phase-one problem, auxiliary column included
    pub fn auxiliary_optima(&self) -> &[Tableau] {
        &self.auxiliary_optima
    }

    pub fn outcomes(&self) -> Outcomes {
        self.outcomes
    }

    pub fn infeasible_count(&self) -> usize {
        self.outcomes.infeasible
    }

    pub fn unbounded_count(&self) -> usize {
        self.outcomes.unbounded
    }

    pub fn optimal_count(&self) -> usize {
        self.outcomes.optimal
    }

    /// One solution per optimal leaf, in discovery order
    pub fn solutions(&self) -> Vec<Solution> {
        self.optimal.iter().map(Solution::from_tableau).collect()
    }

    /// Optimal solutions with leaves that reached the same point merged
    pub fn distinct_solutions(&self) -> Vec<Solution> {
        let mut distinct: Vec<Solution> = Vec::new();
        for solution in self.solutions() {
            if !distinct.iter().any(|s| s.same_point(&solution)) {
                distinct.push(solution);
            }
        }
        distinct
    }

    pub fn status(&self) -> SolutionStatus {
        if !self.optimal.is_empty() {
            SolutionStatus::Optimal
        } else if self.outcomes.unbounded > 0 {
            SolutionStatus::Unbounded
        } else if self.outcomes.infeasible > 0 {
            SolutionStatus::Infeasible
        } else {
            SolutionStatus::Error
        }
    }

    /// Write the summary of the run, objective values as maximized
    pub fn print_results(&self, printer: &mut dyn Printer) {
        self.print_results_with(printer, |value| value);
    }

    /// Write the summary with every objective value passed through
    /// `objective`, e.g. to report a minimization in its own sense
    pub fn print_results_with(&self, printer: &mut dyn Printer, objective: impl Fn(f64) -> f64) {
        if self.optimal.is_empty() {
            printer.emit("-----------------\n");
            printer.emit("NO SOLUTIONS FOUND\n");
            printer.emit("-----------------\n");
            printer.emit(&format!("Infeasible Tableaux: {}\n", self.outcomes.infeasible));
            printer.emit(&format!("Unbounded Tableaux: {}\n", self.outcomes.unbounded));
            return;
        }

        printer.emit("\n");
        printer.emit("-----------------\n");
        printer.emit("OPTIMAL SOLUTIONS\n");
        printer.emit("-----------------\n");
        printer.emit(&format!("Optimal Tableaux: {}\n", self.outcomes.optimal));
        for solution in self.solutions() {
            let value = objective(solution.objective_value);
            let mut values = solution.values;
            let last = values.len().saturating_sub(1);
            if let Some(b) = values.get_mut(last) {
                *b = value;
            }
            printer.emit(&format!("Optimal Value: {}\n", format_value(value)));
            printer.emit(&values.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn optimal_leaf(values: &[f64]) -> Tableau {
        Tableau::from_rows(vec![
            Row::from_values(values.iter().copied()),
            Row::from_values([1.0, 0.0, 0.0, 3.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_status_precedence() {
        let mut run = SolveRun::new(Method::Simplex);
        assert_eq!(run.status(), SolutionStatus::Error);
        run.record_infeasible();
        assert_eq!(run.status(), SolutionStatus::Infeasible);
        run.record_unbounded();
        assert_eq!(run.status(), SolutionStatus::Unbounded);
        run.record_optimal(optimal_leaf(&[0.0, -1.0, -1.0, -3.0]));
        assert_eq!(run.status(), SolutionStatus::Optimal);
    }

    #[test]
    fn test_begin_phase_two_moves_optima() {
        let mut run = SolveRun::new(Method::TwoPhaseSimplex);
        run.record_optimal(optimal_leaf(&[0.0, -1.0, -1.0, -3.0]));
        run.begin_phase_two();
        assert_eq!(run.optimal_count(), 0);
        assert!(run.optimal_tableaux().is_empty());
        assert_eq!(run.auxiliary_optima().len(), 1);
    }

    #[test]
    fn test_distinct_solutions_merge_equal_points() {
        let mut run = SolveRun::new(Method::Simplex);
        run.record_optimal(optimal_leaf(&[0.0, -1.0, -1.0, -3.0]));
        run.record_optimal(optimal_leaf(&[0.0, -2.0, -1.0, -3.0 - 1e-12]));
        assert_eq!(run.solutions().len(), 2);
        assert_eq!(run.distinct_solutions().len(), 1);
        assert_eq!(run.solutions()[0].variables(), &[3.0, 0.0, 0.0]);
        assert_eq!(run.solutions()[0].objective_value, 3.0);
    }

    #[test]
    fn test_print_results() {
        let mut run = SolveRun::new(Method::Simplex);
        run.record_optimal(optimal_leaf(&[0.0, -1.0, -1.0, -3.0]));
        let mut out = String::new();
        run.print_results(&mut out);
        assert_eq!(
            out,
            "\n-----------------\nOPTIMAL SOLUTIONS\n-----------------\nOptimal Tableaux: 1\n\
             Optimal Value:  3.00\n\t 3.00\t 0.00\t 0.00\t | 3.00\n"
        );
    }

    #[test]
    fn test_print_results_in_minimization_sense() {
        let mut run = SolveRun::new(Method::Simplex);
        run.record_optimal(optimal_leaf(&[0.0, -1.0, -1.0, -3.0]));
        let mut out = String::new();
        run.print_results_with(&mut out, |value| -value);
        assert_eq!(
            out,
            "\n-----------------\nOPTIMAL SOLUTIONS\n-----------------\nOptimal Tableaux: 1\n\
             Optimal Value: -3.00\n\t 3.00\t 0.00\t 0.00\t |-3.00\n"
        );
    }

    #[test]
    fn test_print_results_without_solutions() {
        let mut run = SolveRun::new(Method::Simplex);
        run.record_unbounded();
        let mut out = String::new();
        run.print_results(&mut out);
        assert_eq!(
            out,
            "-----------------\nNO SOLUTIONS FOUND\n-----------------\nInfeasible Tableaux: 0\nUnbounded Tableaux: 1\n"
        );
    }
}
