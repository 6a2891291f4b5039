use std::collections::HashMap;

use lpenum_solver::{Row, SolveError, Tableau};
use thiserror::Error;

use crate::ast::*;
use crate::parser::{ParseError, Parser};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Problem has no variables")]
    NoVariables,
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Tableau(#[from] SolveError),
}

/// A problem in standard form, ready for [`lpenum_solver::Solver`]
#[derive(Debug, Clone)]
pub struct CompiledProblem {
    /// Structural variables in order of first appearance
    pub variables: Vec<String>,
    pub sense: Sense,
    /// One name per tableau constraint row; equalities contribute two
    pub constraint_names: Vec<String>,
    pub tableau: Tableau,
}

impl CompiledProblem {
    /// Objective value in the stated sense, given the value the solver
    /// maximized
    pub fn objective_for(&self, maximized: f64) -> f64 {
        match self.sense {
            Sense::Maximize => maximized,
            Sense::Minimize => -maximized + 0.0,
        }
    }

    /// Names of every tableau column except `b`: the structural variables,
    /// then one slack per constraint row
    pub fn column_names(&self) -> Vec<String> {
        self.variables
            .iter()
            .cloned()
            .chain(self.constraint_names.iter().map(|name| format!("s_{}", name)))
            .collect()
    }
}

/// Raw equation before standard form is applied
struct Equation {
    name: String,
    row: Row,
}

pub struct Compiler {
    variables: Vec<String>,
    index: HashMap<String, usize>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Parse and compile in one step
    pub fn compile_source(source: &str) -> Result<CompiledProblem, CompileError> {
        let program = Parser::parse(source)?;
        Compiler::new().compile(&program)
    }

    pub fn compile(mut self, program: &Program) -> Result<CompiledProblem, CompileError> {
        self.collect_variables(program);
        if self.variables.is_empty() {
            return Err(CompileError::NoVariables);
        }

        let objective = self
            .coefficients(&program.objective.terms, 0.0)
            .with_constraint(false)
            .with_negation(program.objective.sense == Sense::Minimize)
            .with_slack(false);

        let mut equations = Vec::new();
        for (i, constraint) in program.constraints.iter().enumerate() {
            let name = constraint
                .name
                .clone()
                .unwrap_or_else(|| format!("c{}", i + 1));
            let row = self
                .coefficients(&constraint.terms, constraint.rhs)
                .with_constraint(true)
                .with_slack(true);

            match constraint.op {
                ConstraintOp::Le => equations.push(Equation {
                    name,
                    row: row.with_negation(false),
                }),
                ConstraintOp::Ge => equations.push(Equation {
                    name,
                    row: row.with_negation(true),
                }),
                ConstraintOp::Eq => {
                    equations.push(Equation {
                        name: format!("{}_le", name),
                        row: row.clone().with_negation(false),
                    });
                    equations.push(Equation {
                        name: format!("{}_ge", name),
                        row: row.with_negation(true),
                    });
                }
            }
        }

        let constraint_names = equations.iter().map(|e| e.name.clone()).collect();
        let mut rows = Vec::with_capacity(equations.len() + 1);
        rows.push(objective);
        rows.extend(equations.into_iter().map(|e| e.row));
        let rows = standard_form(rows);

        log::debug!(
            "compiled {} variables and {} constraint rows",
            self.variables.len(),
            rows.len() - 1
        );

        Ok(CompiledProblem {
            variables: self.variables,
            sense: program.objective.sense,
            constraint_names,
            tableau: Tableau::from_rows(rows)?,
        })
    }

    fn collect_variables(&mut self, program: &Program) {
        let terms = program
            .objective
            .terms
            .iter()
            .chain(program.constraints.iter().flat_map(|c| c.terms.iter()));
        for term in terms {
            if !self.index.contains_key(&term.variable) {
                self.index.insert(term.variable.clone(), self.variables.len());
                self.variables.push(term.variable.clone());
            }
        }
    }

    /// Dense coefficient row with repeated variables summed, then `b`
    fn coefficients(&self, terms: &[Term], b: f64) -> Row {
        let mut values = vec![0.0; self.variables.len()];
        for term in terms {
            if let Some(&i) = self.index.get(&term.variable) {
                values[i] += term.coefficient;
            }
        }
        let mut row = Row::from_values(values);
        row.push(b);
        row
    }
}

/// Negate flagged rows, then add one slack column per slack row: 1 in its own
/// row, 0 in every other
fn standard_form(mut rows: Vec<Row>) -> Vec<Row> {
    for row in rows.iter_mut().filter(|r| r.needs_negation()) {
        row.negate();
    }

    let slack_rows: Vec<usize> = (0..rows.len()).filter(|&i| rows[i].needs_slack()).collect();
    for (i, row) in rows.iter_mut().enumerate() {
        for &owner in &slack_rows {
            row.insert_a(if owner == i { 1.0 } else { 0.0 });
        }
    }
    rows
}
