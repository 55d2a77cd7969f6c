use mga_solver::ConstraintOp;
use tracing::debug;

use crate::error::MgaError;
use crate::model::OptimizationModel;

/// Reserved name of the cost-ceiling constraint
pub const MAX_COST_CONSTRAINT: &str = "max_cost";

/// Check that a slack is usable as a cost premium
pub fn validate_slack(slack: f64) -> Result<(), MgaError> {
    if !slack.is_finite() || slack < 0.0 {
        return Err(MgaError::InvalidSlack(slack));
    }
    Ok(())
}

/// How the slack turns the baseline optimum into a cost ceiling
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CeilingRule {
    /// `(1 + slack) * optimum`
    #[default]
    Proportional,
    /// `optimum + slack * |optimum|`, which stays at or above a negative optimum
    Magnitude,
}

impl CeilingRule {
    pub fn max_cost(self, optimum: f64, slack: f64) -> Result<f64, MgaError> {
        validate_slack(slack)?;
        if !optimum.is_finite() {
            return Err(MgaError::Configuration(format!(
                "baseline objective {} is not finite",
                optimum
            )));
        }
        Ok(match self {
            CeilingRule::Proportional => (1.0 + slack) * optimum,
            CeilingRule::Magnitude => optimum + slack * optimum.abs(),
        })
    }
}

/// Highest total cost an alternative may reach: `(1 + slack) * optimum`.
///
/// With a negative optimum and a positive slack the ceiling lies below the
/// optimum and every alternative is infeasible.
pub fn max_cost(optimum: f64, slack: f64) -> Result<f64, MgaError> {
    CeilingRule::Proportional.max_cost(optimum, slack)
}

/// Bound the model's original cost expression by `max_cost`.
///
/// Fails on a model that was never solved, and on a model that already carries
/// a ceiling: every target needs its own fresh copy.
pub fn inject_cost_ceiling<M: OptimizationModel>(model: &mut M, max_cost: f64) -> Result<(), MgaError> {
    if !max_cost.is_finite() {
        return Err(MgaError::Configuration(format!(
            "cost ceiling {} is not finite",
            max_cost
        )));
    }
    if !model.has_solution() {
        return Err(MgaError::ModelState(
            "cannot add a cost ceiling before the baseline has been solved".to_string(),
        ));
    }
    if model.has_constraint(MAX_COST_CONSTRAINT) {
        return Err(MgaError::DuplicateConstraint(MAX_COST_CONSTRAINT.to_string()));
    }

    let cost = model.cost_expression().clone();
    debug!(max_cost, cost = %cost, "injecting cost ceiling");
    model.add_constraint(MAX_COST_CONSTRAINT, &cost, ConstraintOp::Le, max_cost)
}
