use std::fmt;

/// The result of solving an LP problem
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Values for each variable (empty unless optimal)
    pub values: Vec<f64>,
    /// Objective value including the constant offset
    pub objective_value: f64,
    /// Constraints that still carry infeasibility after phase 1
    pub infeasible_constraints: Vec<String>,
    /// Number of pivots performed across both phases
    pub iterations: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The time limit expired before optimality was proven
    TimeLimit,
    /// The pivot limit was reached before optimality was proven
    IterationLimit,
}

impl SolutionStatus {
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolutionStatus::Optimal => "optimal",
            SolutionStatus::Infeasible => "infeasible",
            SolutionStatus::Unbounded => "unbounded",
            SolutionStatus::TimeLimit => "time_limit",
            SolutionStatus::IterationLimit => "iteration_limit",
        }
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Solution {
    pub fn optimal(values: Vec<f64>, objective_value: f64, iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            infeasible_constraints: Vec::new(),
            iterations,
        }
    }

    pub fn infeasible(infeasible_constraints: Vec<String>, iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            values: Vec::new(),
            objective_value: f64::INFINITY,
            infeasible_constraints,
            iterations,
        }
    }

    pub fn unbounded(iterations: usize) -> Self {
        Self::without_values(SolutionStatus::Unbounded, f64::NEG_INFINITY, iterations)
    }

    pub fn time_limit(iterations: usize) -> Self {
        Self::without_values(SolutionStatus::TimeLimit, f64::NAN, iterations)
    }

    pub fn iteration_limit(iterations: usize) -> Self {
        Self::without_values(SolutionStatus::IterationLimit, f64::NAN, iterations)
    }

    fn without_values(status: SolutionStatus, objective_value: f64, iterations: usize) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value,
            infeasible_constraints: Vec::new(),
            iterations,
        }
    }

    /// Short human-readable explanation of a non-optimal outcome
    pub fn diagnostic(&self) -> String {
        match self.status {
            SolutionStatus::Optimal => format!("optimal after {} pivots", self.iterations),
            SolutionStatus::Infeasible if self.infeasible_constraints.is_empty() => {
                "no point satisfies all constraints".to_string()
            }
            SolutionStatus::Infeasible => format!(
                "no point satisfies all constraints; unsatisfied: {}",
                self.infeasible_constraints.join(", ")
            ),
            SolutionStatus::Unbounded => "objective can be improved without limit".to_string(),
            SolutionStatus::TimeLimit => {
                format!("time limit reached after {} pivots", self.iterations)
            }
            SolutionStatus::IterationLimit => {
                format!("pivot limit of {} reached", self.iterations)
            }
        }
    }
}
