use std::fmt;

use crate::epsilon::round_to_zero;
use crate::error::SolveError;
use crate::point::Point;
use crate::row::{format_value, Row};

/// Terminal marker set by the solver on a leaf tableau
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Flag {
    #[default]
    Open,
    Infeasible,
    Unbounded,
}

/// Simplex tableau for `max cx` subject to `Ax <= b, x >= 0`.
///
/// Row 0 is the objective driving the search. Its coefficients are the
/// reduced costs and its `b` holds the negated objective value of the current
/// basis. While an auxiliary column is present, column 0 is the artificial
/// variable `x0`, row 0 is the phase-one objective `max -x0` and row 1 carries
/// the problem objective through every pivot.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    rows: Vec<Row>,
    auxiliary: bool,
    flag: Flag,
}

impl Tableau {
    /// Build a tableau from an objective row followed by constraint rows
    pub fn from_rows(rows: Vec<Row>) -> Result<Self, SolveError> {
        let expected = rows.first().map(Row::len).ok_or(SolveError::EmptyTableau)?;
        if expected == 0 {
            return Err(SolveError::RaggedRow { row: 0, expected: 1, found: 0 });
        }
        if let Some((row, found)) = rows
            .iter()
            .map(Row::len)
            .enumerate()
            .find(|&(_, len)| len != expected)
        {
            return Err(SolveError::RaggedRow { row, expected, found });
        }

        Ok(Self {
            rows,
            auxiliary: false,
            flag: Flag::Open,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns, `b` included
    pub fn column_count(&self) -> usize {
        self.rows.first().map(Row::len).unwrap_or_default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_at(&self, row: usize) -> Result<&Row, SolveError> {
        self.rows.get(row).ok_or_else(|| self.out_of_bounds(0, row))
    }

    pub fn value_at(&self, column: usize, row: usize) -> Result<f64, SolveError> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .ok_or_else(|| self.out_of_bounds(column, row))
    }

    pub fn set_value_at(&mut self, column: usize, row: usize, value: f64) -> Result<(), SolveError> {
        let err = self.out_of_bounds(column, row);
        let slot = self
            .rows
            .get_mut(row)
            .and_then(|r| r.get_mut(column))
            .ok_or(err)?;
        *slot = value;
        Ok(())
    }

    fn out_of_bounds(&self, column: usize, row: usize) -> SolveError {
        SolveError::IndexOutOfBounds {
            column,
            row,
            columns: self.column_count(),
            rows: self.row_count(),
        }
    }

    /// Index of the `b` column
    pub fn b_column(&self) -> usize {
        self.column_count().saturating_sub(1)
    }

    pub fn has_auxiliary_column(&self) -> bool {
        self.auxiliary
    }

    /// First row that holds a constraint rather than an objective
    pub fn first_constraint_row(&self) -> usize {
        if self.auxiliary { 2 } else { 1 }
    }

    /// Insert the artificial variable `x0` as column 0 together with the
    /// phase-one objective `max -x0` as row 0.
    ///
    /// Every constraint `ax <= b` becomes `ax - x0 <= b`, so pivoting `x0`
    /// into the row with the most negative `b` yields a feasible basis.
    pub fn create_auxiliary_column(&mut self) -> Result<(), SolveError> {
        if self.auxiliary {
            return Err(SolveError::AuxiliaryPresent);
        }

        for (index, row) in self.rows.iter_mut().enumerate() {
            row.insert_front(if index == 0 { 0.0 } else { -1.0 });
        }
        let width = self.column_count();
        let objective = Row::from_values(std::iter::once(-1.0).chain(std::iter::repeat_n(0.0, width - 1)));
        self.rows.insert(0, objective);
        self.auxiliary = true;
        log::debug!("auxiliary column created, tableau is now {}x{}", self.row_count(), width);
        Ok(())
    }

    /// Undo [`Tableau::create_auxiliary_column`], restoring the problem
    /// objective to row 0.
    ///
    /// A basic `x0` can only be left over at value zero; it is pivoted out of
    /// its row first so the remaining basis stays intact.
    pub fn remove_auxiliary_column(&mut self) -> Result<(), SolveError> {
        if !self.auxiliary {
            return Err(SolveError::NoAuxiliary);
        }

        if let Some(row) = self.basic_row_of(0) {
            let replacement = (1..self.b_column()).find(|&k| round_to_zero(self.rows[row].values()[k]) != 0.0);
            if let Some(column) = replacement {
                log::debug!("x0 still basic in row {}, pivoting it out on column {}", row, column);
                self.pivot_in_place(Point::new(column, row))?;
            }
        }

        self.rows.remove(0);
        for row in &mut self.rows {
            row.remove_front();
        }
        self.auxiliary = false;
        Ok(())
    }

    /// Every reduced cost in row 0 is non-positive
    pub fn is_optimal(&self) -> bool {
        self.rows[0].coefficients().iter().all(|&v| round_to_zero(v) <= 0.0)
    }

    pub fn flag_infeasible(&mut self) {
        self.flag = Flag::Infeasible;
    }

    pub fn flag_unbounded(&mut self) {
        self.flag = Flag::Unbounded;
    }

    pub fn is_infeasible(&self) -> bool {
        self.flag == Flag::Infeasible
    }

    pub fn is_unbounded(&self) -> bool {
        self.flag == Flag::Unbounded
    }

    /// Value of the objective in row 0 at the current basis. While the
    /// auxiliary column is present this is the phase-one value `-x0`.
    pub fn objective_value(&self) -> f64 {
        round_to_zero(-self.rows[0].b()) + 0.0
    }

    /// Value of the problem objective at the current basis
    pub fn problem_objective_value(&self) -> f64 {
        let row = if self.auxiliary { 1 } else { 0 };
        round_to_zero(-self.rows[row].b()) + 0.0
    }

    /// Row in which `column` is basic: a 1 in exactly one constraint row and
    /// zero everywhere else, objective rows included
    pub fn basic_row_of(&self, column: usize) -> Option<usize> {
        let first = self.first_constraint_row();
        let mut basic = None;
        for (index, row) in self.rows.iter().enumerate() {
            let value = row.get(column)?;
            if round_to_zero(value) == 0.0 {
                continue;
            }
            if index < first || basic.is_some() || round_to_zero(value - 1.0) != 0.0 {
                return None;
            }
            basic = Some(index);
        }
        basic
    }

    /// Variable columns (structural then slack), excluding `x0` and `b`
    fn variable_columns(&self) -> std::ops::Range<usize> {
        let start = if self.auxiliary { 1 } else { 0 };
        start..self.b_column().max(start)
    }

    /// Basic row per variable column. When two identical unit columns claim the
    /// same row only the first one is basic.
    fn basis(&self) -> Vec<Option<usize>> {
        let mut claimed = vec![false; self.row_count()];
        self.variable_columns()
            .map(|column| match self.basic_row_of(column) {
                Some(row) if !claimed[row] => {
                    claimed[row] = true;
                    Some(row)
                }
                _ => None,
            })
            .collect()
    }

    /// Assignment of every variable at the current basis. Basic variables take
    /// the `b` of their row, non-basic ones are zero. The trailing element is
    /// the problem objective value.
    pub fn solution_vector(&self) -> Row {
        let mut solution: Row = Row::from_values(
            self.basis()
                .into_iter()
                .map(|row| row.map(|r| round_to_zero(self.rows[r].b()) + 0.0).unwrap_or(0.0)),
        );
        solution.push(self.problem_objective_value());
        solution
    }

    /// The current basis covers every constraint row with a non-negative value
    pub fn is_bfs(&self) -> bool {
        let basis = self.basis();
        let covered = (self.first_constraint_row()..self.row_count())
            .all(|row| basis.contains(&Some(row)));
        covered && self.solution_vector().coefficients().iter().all(|&v| v >= 0.0)
    }

    /// Gauss-Jordan elimination around `point`, turning its column into the
    /// unit vector of its row
    pub fn pivot_in_place(&mut self, point: Point) -> Result<(), SolveError> {
        let (i, j) = (point.column(), point.row());
        let aij = self.value_at(i, j)?;
        if aij == 0.0 {
            return Err(SolveError::DegenerateRatio(point));
        }

        let pivot_row = self.rows[j].values_mut();
        for (k, value) in pivot_row.iter_mut().enumerate() {
            if k != i {
                *value /= aij;
            }
        }
        pivot_row[i] = 1.0;
        let pivot_values = pivot_row.to_vec();

        for (l, row) in self.rows.iter_mut().enumerate() {
            if l == j {
                continue;
            }
            let values = row.values_mut();
            let y = values[i];
            values[i] = 0.0;
            for (k, value) in values.iter_mut().enumerate() {
                if k != i {
                    *value -= pivot_values[k] * y;
                }
            }
        }
        Ok(())
    }

    /// Pivoted copy; `self` is left untouched
    pub fn pivoted(&self, point: Point) -> Result<Tableau, SolveError> {
        let mut copy = self.clone();
        copy.pivot_in_place(point)?;
        Ok(copy)
    }

    /// Render with the element at `point` bracketed
    pub fn render_highlighting(&self, point: Point) -> String {
        self.render(Some(point))
    }

    fn render(&self, highlight: Option<Point>) -> String {
        let b = self.b_column();
        let mut out = String::new();
        for (j, row) in self.rows.iter().enumerate() {
            for (i, &value) in row.values().iter().enumerate() {
                out.push('\t');
                if i == b {
                    out.push_str(" |");
                }
                if highlight == Some(Point::new(i, j)) {
                    out.push('[');
                    out.push_str(&format_value(value));
                    out.push(']');
                } else {
                    out.push_str(&format_value(value));
                }
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn tableau(rows: &[&[f64]]) -> Tableau {
        Tableau::from_rows(rows.iter().map(|r| Row::from_values(r.iter().copied())).collect()).unwrap()
    }

    /// max x1 + x2 s.t. x1 + 2x2 <= 4, 3x1 + 2x2 <= 6
    fn two_constraints() -> Tableau {
        tableau(&[
            &[1.0, 1.0, 0.0, 0.0, 0.0],
            &[1.0, 2.0, 1.0, 0.0, 4.0],
            &[3.0, 2.0, 0.0, 1.0, 6.0],
        ])
    }

    #[test]
    fn test_rejects_malformed_rows() {
        assert_eq!(Tableau::from_rows(Vec::new()), Err(SolveError::EmptyTableau));
        let rows = vec![Row::from_values([1.0, 0.0]), Row::from_values([1.0, 2.0, 3.0])];
        assert_eq!(
            Tableau::from_rows(rows),
            Err(SolveError::RaggedRow { row: 1, expected: 2, found: 3 })
        );
    }

    #[test]
    fn test_value_access() {
        let mut t = two_constraints();
        assert_eq!(t.value_at(1, 2), Ok(2.0));
        t.set_value_at(1, 2, 5.0).unwrap();
        assert_eq!(t.value_at(1, 2), Ok(5.0));
        assert_eq!(
            t.value_at(5, 0),
            Err(SolveError::IndexOutOfBounds { column: 5, row: 0, columns: 5, rows: 3 })
        );
        assert!(t.set_value_at(0, 3, 1.0).is_err());
        assert!(t.row_at(3).is_err());
    }

    #[test]
    fn test_initial_solution_is_bfs() {
        let t = two_constraints();
        assert_eq!(t.solution_vector().values(), &[0.0, 0.0, 4.0, 6.0, 0.0]);
        assert!(t.is_bfs());
        assert!(!t.is_optimal());
    }

    #[test]
    fn test_negative_b_is_not_bfs() {
        let t = tableau(&[&[1.0, 0.0, 0.0, 0.0], &[-1.0, 1.0, 0.0, -5.0], &[1.0, 0.0, 1.0, 3.0]]);
        assert!(!t.is_bfs());
    }

    #[test]
    fn test_uncovered_row_is_not_bfs() {
        let t = tableau(&[&[0.0, 0.0, 0.0], &[1.0, 1.0, 2.0]]);
        // both columns are unit in row 1, only the first one is basic
        assert_eq!(t.solution_vector().values(), &[2.0, 0.0, 0.0]);
        assert!(t.is_bfs());

        let t = tableau(&[&[0.0, 0.0, 0.0], &[2.0, 3.0, 2.0]]);
        assert_eq!(t.basic_row_of(0), None);
        assert_eq!(t.basic_row_of(1), None);
        assert!(!t.is_bfs());
    }

    #[test]
    fn test_pivot() {
        let t = two_constraints();
        let p = t.pivoted(Point::new(0, 2)).unwrap();
        assert_eq!(p.row_at(2).unwrap().values(), &[1.0, 2.0 / 3.0, 0.0, 1.0 / 3.0, 2.0]);
        assert_eq!(p.value_at(0, 0), Ok(0.0));
        assert_eq!(p.value_at(0, 1), Ok(0.0));
        assert_eq!(p.objective_value(), 2.0);
        // the source tableau is untouched
        assert_eq!(t, two_constraints());
    }

    #[test]
    fn test_pivot_on_zero_is_degenerate() {
        let mut t = two_constraints();
        t.set_value_at(1, 1, 0.0).unwrap();
        assert_eq!(t.pivoted(Point::new(1, 1)), Err(SolveError::DegenerateRatio(Point::new(1, 1))));
    }

    #[test]
    fn test_optimal_objective_value() {
        let t = tableau(&[&[0.0, -1.0, -0.5, -2.5], &[1.0, 1.0, 1.0, 3.0]]);
        assert!(t.is_optimal());
        assert_eq!(t.objective_value(), 2.5);
        assert_eq!(t.solution_vector().values(), &[3.0, 0.0, 0.0, 2.5]);
    }

    #[test]
    fn test_noise_in_row_zero_is_optimal() {
        let t = tableau(&[&[1e-12, -1.0, 0.0], &[1.0, 1.0, 3.0]]);
        assert!(t.is_optimal());
    }

    #[test]
    fn test_flags() {
        let mut t = two_constraints();
        assert!(!t.is_infeasible() && !t.is_unbounded());
        t.flag_unbounded();
        assert!(t.is_unbounded());
        t.flag_infeasible();
        assert!(t.is_infeasible() && !t.is_unbounded());
    }

    #[test]
    fn test_auxiliary_round_trip() {
        let source = tableau(&[&[1.0, 0.0, 0.0, 0.0], &[-1.0, 1.0, 0.0, -5.0], &[1.0, 0.0, 1.0, 3.0]]);
        let mut t = source.clone();
        t.create_auxiliary_column().unwrap();

        assert!(t.has_auxiliary_column());
        assert_eq!(t.first_constraint_row(), 2);
        assert_eq!(t.row_at(0).unwrap().values(), &[-1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(t.row_at(1).unwrap().values(), &[0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(t.row_at(2).unwrap().values(), &[-1.0, -1.0, 1.0, 0.0, -5.0]);
        assert_eq!(t.row_at(3).unwrap().values(), &[-1.0, 1.0, 0.0, 1.0, 3.0]);
        assert_eq!(t.create_auxiliary_column(), Err(SolveError::AuxiliaryPresent));

        t.remove_auxiliary_column().unwrap();
        assert!(!t.has_auxiliary_column());
        assert_eq!(t, source);
        assert_eq!(t.remove_auxiliary_column(), Err(SolveError::NoAuxiliary));
    }

    #[test]
    fn test_remove_auxiliary_drives_out_basic_x0() {
        // x0 basic at value zero in row 2
        let mut t = tableau(&[&[1.0, 1.0, 0.0], &[1.0, 1.0, 0.0]]);
        t.create_auxiliary_column().unwrap();
        let mut t = t.pivoted(Point::new(0, 2)).unwrap();
        assert_eq!(t.basic_row_of(0), Some(2));

        t.remove_auxiliary_column().unwrap();
        assert_eq!(t.column_count(), 3);
        assert_eq!(t.basic_row_of(0), Some(1));
        assert_eq!(t.row_at(1).unwrap().values(), &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_problem_objective_tracks_pivots_under_auxiliary() {
        let mut t = tableau(&[&[2.0, 0.0, 0.0], &[1.0, 1.0, 3.0]]);
        t.create_auxiliary_column().unwrap();
        let t = t.pivoted(Point::new(1, 2)).unwrap();
        assert_eq!(t.problem_objective_value(), 6.0);
        assert_eq!(t.objective_value(), 0.0);
        assert_eq!(t.solution_vector().values(), &[3.0, 0.0, 6.0]);
    }

    #[test]
    fn test_render_highlighting() {
        let t = tableau(&[&[1.0, 0.0, 0.0], &[2.0, 1.0, 4.0]]);
        assert_eq!(t.to_string(), "\t 1.00\t 0.00\t | 0.00\n\t 2.00\t 1.00\t | 4.00\n");
        assert_eq!(
            t.render_highlighting(Point::new(0, 1)),
            "\t 1.00\t 0.00\t | 0.00\n\t[ 2.00]\t 1.00\t | 4.00\n"
        );
    }

    fn matrix() -> impl Strategy<Value = Vec<Vec<f64>>> {
        (2usize..5, 2usize..6).prop_flat_map(|(rows, columns)| {
            prop::collection::vec(prop::collection::vec(-10.0f64..10.0, columns), rows)
        })
    }

    proptest! {
        #[test]
        fn test_pivot_column_becomes_unit(values in matrix(), i in 0usize..5, j in 0usize..4) {
            let t = Tableau::from_rows(values.into_iter().map(Row::from_values).collect()).unwrap();
            let (i, j) = (i % t.column_count(), j % t.row_count());
            prop_assume!(t.value_at(i, j).unwrap().abs() > 1e-3);

            let p = t.pivoted(Point::new(i, j)).unwrap();
            for row in 0..p.row_count() {
                let expected = if row == j { 1.0 } else { 0.0 };
                prop_assert_eq!(p.value_at(i, row).unwrap(), expected);
            }
        }

        #[test]
        fn test_copy_is_independent(values in matrix(), v in -5.0f64..5.0) {
            let rows: Vec<Row> = values
                .into_iter()
                .enumerate()
                .map(|(k, r)| Row::from_values(r).with_constraint(k > 0).with_slack(k > 0))
                .collect();
            let source = Tableau::from_rows(rows).unwrap();
            let snapshot: Vec<Vec<f64>> = source.rows().iter().map(|r| r.values().to_vec()).collect();

            let mut copy = source.clone();
            copy.set_value_at(0, 0, v + 100.0).unwrap();
            copy.flag_unbounded();
            copy.create_auxiliary_column().unwrap();

            let after: Vec<Vec<f64>> = source.rows().iter().map(|r| r.values().to_vec()).collect();
            prop_assert_eq!(snapshot, after);
            prop_assert!(!source.is_unbounded());
            prop_assert!(!source.has_auxiliary_column());
            prop_assert!(source.rows().iter().skip(1).all(|r| r.is_constraint() && r.needs_slack()));
        }
    }
}
