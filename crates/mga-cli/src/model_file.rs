use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use mga_solver::{ConstraintOp, LinearExpr, LpProblem, ProblemError, Sense, Variable, VariableKind};
use serde::{Deserialize, Serialize};

/// JSON description of an already-formulated investment model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default)]
    pub name: Option<String>,
    pub variables: Vec<Variable>,
    /// Total system cost, minimised for the global optimum
    pub cost: LinearExpr,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub name: String,
    pub terms: IndexMap<String, f64>,
    pub op: ConstraintOp,
    pub rhs: f64,
}

impl ModelFile {
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading model file '{}'", path.display()))?;
        Self::from_json(&source).with_context(|| format!("parsing model file '{}'", path.display()))
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn investment_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VariableKind::Investment)
            .count()
    }

    /// Build the LP with the cost as a minimisation objective
    pub fn to_problem(&self) -> Result<LpProblem, ProblemError> {
        let mut problem = LpProblem::new();
        for var in &self.variables {
            problem.add_variable(var.name.clone(), var.component.clone(), var.kind)?;
        }
        for c in &self.constraints {
            let expr = LinearExpr {
                terms: c.terms.clone(),
                constant: 0.0,
            };
            problem.add_constraint_expr(c.name.clone(), &expr, c.op, c.rhs)?;
        }
        problem.set_objective_expr(&self.cost, Sense::Minimize)?;
        Ok(problem)
    }
}
