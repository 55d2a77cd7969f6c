mod ceiling;
mod config;
mod error;
mod lp;
mod model;
mod objective;
mod orchestrator;
mod predicate;
mod sample;

pub use ceiling::{CeilingRule, MAX_COST_CONSTRAINT, inject_cost_ceiling, max_cost, validate_slack};
pub use config::{CancelHandle, MgaConfig, Target};
pub use error::{MgaError, SolveFailure};
pub use lp::LpModel;
pub use model::{InvestmentVariable, OptimizationModel, SolveReport};
pub use objective::{parse_sense, set_objective, set_objective_with};
pub use orchestrator::{Diagnostic, Mga, MgaRun, run_mga};
pub use predicate::Predicate;
pub use sample::{GLOBAL_OPTIMUM, Sample, SampleId, SampleRow, SampleSet, SampleTable, Spread};

pub use mga_solver::{ConstraintOp, LinearExpr, Sense, SolutionStatus};
