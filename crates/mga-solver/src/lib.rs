mod problem;
mod simplex;
mod solution;

pub use problem::{
    Constraint, ConstraintOp, LinearExpr, LpProblem, Objective, ProblemError, Sense, Variable,
    VariableKind,
};
pub use simplex::Solver;
pub use solution::{Solution, SolutionStatus};
