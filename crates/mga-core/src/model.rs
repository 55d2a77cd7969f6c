//! The contract between the MGA core and the optimisation model it drives.
//!
//! The core never looks at the physical meaning of a model. It only needs
//! to solve it, copy it, read its investment variables, bound its original
//! cost expression and swap its objective.

use std::time::Duration;

use mga_solver::{ConstraintOp, LinearExpr, Sense, SolutionStatus};

use crate::error::MgaError;

/// A decision variable representing build-out of a system component
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentVariable {
    pub id: String,
    /// Label of the owning component
    pub component: String,
    /// Solved value, `None` until the model has a solution
    pub value: Option<f64>,
}

/// Outcome of a single solve
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub status: SolutionStatus,
    pub objective_value: f64,
    /// Human-readable explanation, mostly useful for non-optimal outcomes
    pub detail: String,
}

impl SolveReport {
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}

/// A mutable optimisation model that can be solved and deep-copied.
///
/// `Clone` must produce an independent copy sharing no mutable state with the
/// original; the orchestrator relies on it to leave the caller's model untouched.
pub trait OptimizationModel: Clone + Send + Sync {
    /// Solve the model under its current objective. Expiry of `time_limit`
    /// is reported through [`SolutionStatus::TimeLimit`], never a panic.
    fn solve(&mut self, time_limit: Option<Duration>) -> SolveReport;

    /// Whether the model has been solved to optimality at least once.
    /// Values from that solve stay readable after later mutations.
    fn has_solution(&self) -> bool;

    /// The current objective expression
    fn objective(&self) -> LinearExpr;

    fn objective_sense(&self) -> Sense;

    /// The total-cost expression the model was built with, unaffected by
    /// [`OptimizationModel::set_objective`].
    fn cost_expression(&self) -> &LinearExpr;

    /// Replace the objective entirely
    fn set_objective(&mut self, expr: LinearExpr, sense: Sense) -> Result<(), MgaError>;

    fn has_constraint(&self, name: &str) -> bool;

    /// Add `expr op rhs` under a unique name. Name collisions fail with
    /// [`MgaError::DuplicateConstraint`].
    fn add_constraint(
        &mut self,
        name: &str,
        expr: &LinearExpr,
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<(), MgaError>;

    /// All investment variables, in model order
    fn investment_variables(&self) -> Vec<InvestmentVariable>;

    /// Value of `expr` at the latest solution
    fn evaluate(&self, expr: &LinearExpr) -> Option<f64>;
}
