use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Duplicate variable: {0}")]
    DuplicateVariable(String),
    #[error("Duplicate constraint: {0}")]
    DuplicateConstraint(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Expected {expected} coefficients but got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Invalid sense '{0}', expected 'min' or 'max'")]
    InvalidSense(String),
    #[error("Invalid constraint operator '{0}', expected '<=', '>=' or '='")]
    InvalidOperator(String),
    #[error("Non-finite value in {0}")]
    NonFinite(String),
}

/// Whether a variable represents installed capacity or operation
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Investment,
    Operation,
}

/// A continuous, non-negative decision variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Unique identifier
    pub name: String,
    /// Label of the system component owning this variable
    pub component: String,
    pub kind: VariableKind,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    Minimize,
    Maximize,
}

impl FromStr for Sense {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" | "minimize" => Ok(Sense::Minimize),
            "max" | "maximize" => Ok(Sense::Maximize),
            _ => Err(ProblemError::InvalidSense(s.to_string())),
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Minimize => write!(f, "min"),
            Sense::Maximize => write!(f, "max"),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    #[cfg_attr(feature = "serde", serde(rename = "<="))]
    Le,
    /// Greater than or equal (>=)
    #[cfg_attr(feature = "serde", serde(rename = ">="))]
    Ge,
    /// Equal (=)
    #[cfg_attr(feature = "serde", serde(rename = "="))]
    Eq,
}

impl ConstraintOp {
    /// The operator obtained by multiplying both sides by -1
    pub fn flipped(self) -> Self {
        match self {
            ConstraintOp::Le => ConstraintOp::Ge,
            ConstraintOp::Ge => ConstraintOp::Le,
            ConstraintOp::Eq => ConstraintOp::Eq,
        }
    }
}

impl FromStr for ConstraintOp {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<=" => Ok(ConstraintOp::Le),
            ">=" => Ok(ConstraintOp::Ge),
            "=" | "==" => Ok(ConstraintOp::Eq),
            other => Err(ProblemError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintOp::Le => write!(f, "<="),
            ConstraintOp::Ge => write!(f, ">="),
            ConstraintOp::Eq => write!(f, "="),
        }
    }
}

/// A linear expression over named variables plus a constant
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: IndexMap<String, f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: IndexMap::new(),
            constant: value,
        }
    }

    /// Sum of the given variables, each with coefficient 1
    pub fn sum<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut expr = Self::new();
        for name in names {
            expr.add_term(name, 1.0);
        }
        expr
    }

    pub fn with_term(mut self, name: impl Into<String>, coefficient: f64) -> Self {
        self.add_term(name, coefficient);
        self
    }

    /// Add `coefficient * name`, merging with an existing term
    pub fn add_term(&mut self, name: impl Into<String>, coefficient: f64) {
        *self.terms.entry(name.into()).or_insert(0.0) += coefficient;
    }

    pub fn is_constant(&self) -> bool {
        self.terms.values().all(|c| *c == 0.0)
    }

    /// Evaluate against a value lookup; variables without a value count as zero
    pub fn evaluate<F>(&self, value: F) -> f64
    where
        F: Fn(&str) -> Option<f64>,
    {
        self.terms
            .iter()
            .map(|(name, coef)| coef * value(name).unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, coef) in &self.terms {
            if first {
                write!(f, "{} {}", coef, name)?;
                first = false;
            } else if *coef < 0.0 {
                write!(f, " - {} {}", -coef, name)?;
            } else {
                write!(f, " + {} {}", coef, name)?;
            }
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant != 0.0 {
            write!(f, " + {}", self.constant)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Constant offset added to the objective value
    pub constant: f64,
    pub sense: Sense,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Name/label for the constraint, unique within a problem
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

/// Represents a linear programming problem over non-negative variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LpProblem {
    variables: Vec<Variable>,
    objective: Objective,
    constraints: Vec<Constraint>,
    variable_index: HashMap<String, usize>,
}

impl Default for Objective {
    fn default() -> Self {
        Self {
            coefficients: Vec::new(),
            constant: 0.0,
            sense: Sense::Minimize,
        }
    }
}

impl LpProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable and return its column index
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        component: impl Into<String>,
        kind: VariableKind,
    ) -> Result<usize, ProblemError> {
        let name = name.into();
        if self.variable_index.contains_key(&name) {
            return Err(ProblemError::DuplicateVariable(name));
        }

        let index = self.variables.len();
        self.variable_index.insert(name.clone(), index);
        self.variables.push(Variable {
            name,
            component: component.into(),
            kind,
        });

        // Existing rows get a zero coefficient for the new column
        self.objective.coefficients.push(0.0);
        for c in &mut self.constraints {
            c.coefficients.push(0.0);
        }

        Ok(index)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variable_index.get(name).copied()
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn has_constraint(&self, name: &str) -> bool {
        self.constraint(name).is_some()
    }

    pub fn set_objective(
        &mut self,
        coefficients: Vec<f64>,
        constant: f64,
        sense: Sense,
    ) -> Result<(), ProblemError> {
        self.check_dimension(coefficients.len())?;
        self.check_finite("objective", &coefficients, constant)?;
        self.objective = Objective {
            coefficients,
            constant,
            sense,
        };
        Ok(())
    }

    /// Replace the objective with a named-variable expression
    pub fn set_objective_expr(&mut self, expr: &LinearExpr, sense: Sense) -> Result<(), ProblemError> {
        let coefficients = self.dense(expr)?;
        self.set_objective(coefficients, expr.constant, sense)
    }

    /// The current objective as a named-variable expression (zero terms omitted)
    pub fn objective_expr(&self) -> LinearExpr {
        self.sparse(&self.objective.coefficients, self.objective.constant)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        coefficients: Vec<f64>,
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<(), ProblemError> {
        let name = name.into();
        if self.has_constraint(&name) {
            return Err(ProblemError::DuplicateConstraint(name));
        }
        self.check_dimension(coefficients.len())?;
        self.check_finite(&name, &coefficients, rhs)?;

        self.constraints.push(Constraint {
            name,
            coefficients,
            op,
            rhs,
        });
        Ok(())
    }

    /// Add `expr op rhs`; the expression constant is moved to the right-hand side
    pub fn add_constraint_expr(
        &mut self,
        name: impl Into<String>,
        expr: &LinearExpr,
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<(), ProblemError> {
        let coefficients = self.dense(expr)?;
        self.add_constraint(name, coefficients, op, rhs - expr.constant)
    }

    /// Evaluate an expression at a dense vector of variable values
    pub fn evaluate(&self, expr: &LinearExpr, values: &[f64]) -> Result<f64, ProblemError> {
        let coefficients = self.dense(expr)?;
        Ok(coefficients
            .iter()
            .zip(values)
            .map(|(c, v)| c * v)
            .sum::<f64>()
            + expr.constant)
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    fn dense(&self, expr: &LinearExpr) -> Result<Vec<f64>, ProblemError> {
        let mut coefficients = vec![0.0; self.variables.len()];
        for (name, coef) in &expr.terms {
            let index = self
                .variable_index(name)
                .ok_or_else(|| ProblemError::UnknownVariable(name.clone()))?;
            coefficients[index] += coef;
        }
        Ok(coefficients)
    }

    fn sparse(&self, coefficients: &[f64], constant: f64) -> LinearExpr {
        let mut expr = LinearExpr::constant(constant);
        for (var, &coef) in self.variables.iter().zip(coefficients) {
            if coef != 0.0 {
                expr.add_term(var.name.clone(), coef);
            }
        }
        expr
    }

    fn check_dimension(&self, actual: usize) -> Result<(), ProblemError> {
        if actual != self.variables.len() {
            return Err(ProblemError::DimensionMismatch {
                expected: self.variables.len(),
                actual,
            });
        }
        Ok(())
    }

    fn check_finite(&self, what: &str, coefficients: &[f64], scalar: f64) -> Result<(), ProblemError> {
        if !scalar.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ProblemError::NonFinite(what.to_string()));
        }
        Ok(())
    }
}
