use mga_solver::{LinearExpr, Sense};

use crate::error::MgaError;
use crate::model::{InvestmentVariable, OptimizationModel};
use crate::predicate::Predicate;

/// Parse a user-supplied sense, rejecting anything but min/max
pub fn parse_sense(sense: &str) -> Result<Sense, MgaError> {
    Ok(sense.parse::<Sense>()?)
}

/// Replace the model's objective with the expression built by `selector`.
///
/// Constraints, including an injected cost ceiling, are left alone. Calling
/// this again on the same model simply replaces the objective again.
pub fn set_objective_with<M, F>(model: &mut M, sense: Sense, selector: F) -> Result<LinearExpr, MgaError>
where
    M: OptimizationModel,
    F: FnOnce(&[InvestmentVariable]) -> LinearExpr,
{
    if !model.has_solution() {
        return Err(MgaError::ModelState(
            "cannot rewrite the objective before the baseline has been solved".to_string(),
        ));
    }

    let expr = selector(&model.investment_variables());
    model.set_objective(expr.clone(), sense)?;
    Ok(expr)
}

/// Install "optimise the sum of investment variables matching `predicate`"
pub fn set_objective<M: OptimizationModel>(
    model: &mut M,
    sense: Sense,
    predicate: &Predicate,
) -> Result<LinearExpr, MgaError> {
    set_objective_with(model, sense, |vars| predicate.select(vars))
}
