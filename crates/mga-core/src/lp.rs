use std::time::Duration;

use mga_solver::{
    ConstraintOp, LinearExpr, LpProblem, Sense, Solution, SolutionStatus, Solver, VariableKind,
};

use crate::error::MgaError;
use crate::model::{InvestmentVariable, OptimizationModel, SolveReport};

/// An [`LpProblem`] paired with the simplex solver and its latest solution.
///
/// The objective present at construction is captured as the cost expression.
#[derive(Debug, Clone)]
pub struct LpModel {
    problem: LpProblem,
    cost: LinearExpr,
    solver: Solver,
    /// Values of the latest optimal solve
    solution: Option<Solution>,
    last_status: Option<SolutionStatus>,
}

impl LpModel {
    pub fn new(problem: LpProblem) -> Self {
        let cost = problem.objective_expr();
        Self {
            problem,
            cost,
            solver: Solver::new(),
            solution: None,
            last_status: None,
        }
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn problem(&self) -> &LpProblem {
        &self.problem
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    /// Status of the most recent solve, optimal or not
    pub fn last_status(&self) -> Option<SolutionStatus> {
        self.last_status
    }

    /// Solved value of a variable by name
    pub fn value(&self, name: &str) -> Option<f64> {
        let index = self.problem.variable_index(name)?;
        self.solution.as_ref()?.values.get(index).copied()
    }
}

impl From<LpProblem> for LpModel {
    fn from(problem: LpProblem) -> Self {
        Self::new(problem)
    }
}

impl OptimizationModel for LpModel {
    fn solve(&mut self, time_limit: Option<Duration>) -> SolveReport {
        let solver = self.solver.clone().with_time_limit(time_limit);
        let solution = solver.solve(&self.problem);

        let report = SolveReport {
            status: solution.status,
            objective_value: solution.objective_value,
            detail: solution.diagnostic(),
        };
        self.last_status = Some(solution.status);
        if solution.status.is_optimal() {
            self.solution = Some(solution);
        }
        report
    }

    fn has_solution(&self) -> bool {
        self.solution.is_some()
    }

    fn objective(&self) -> LinearExpr {
        self.problem.objective_expr()
    }

    fn objective_sense(&self) -> Sense {
        self.problem.objective().sense
    }

    fn cost_expression(&self) -> &LinearExpr {
        &self.cost
    }

    fn set_objective(&mut self, expr: LinearExpr, sense: Sense) -> Result<(), MgaError> {
        self.problem.set_objective_expr(&expr, sense)?;
        Ok(())
    }

    fn has_constraint(&self, name: &str) -> bool {
        self.problem.has_constraint(name)
    }

    fn add_constraint(
        &mut self,
        name: &str,
        expr: &LinearExpr,
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<(), MgaError> {
        self.problem.add_constraint_expr(name, expr, op, rhs)?;
        Ok(())
    }

    fn investment_variables(&self) -> Vec<InvestmentVariable> {
        self.problem
            .variables()
            .iter()
            .enumerate()
            .filter(|(_, var)| var.kind == VariableKind::Investment)
            .map(|(index, var)| InvestmentVariable {
                id: var.name.clone(),
                component: var.component.clone(),
                value: self
                    .solution
                    .as_ref()
                    .and_then(|s| s.values.get(index).copied()),
            })
            .collect()
    }

    fn evaluate(&self, expr: &LinearExpr) -> Option<f64> {
        let solution = self.solution.as_ref()?;
        self.problem.evaluate(expr, &solution.values).ok()
    }
}
