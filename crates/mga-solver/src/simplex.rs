use std::time::{Duration, Instant};

use crate::problem::{ConstraintOp, LpProblem, Sense};
use crate::solution::Solution;

/// Consecutive degenerate pivots tolerated before switching to Bland's rule
const DEGENERATE_PIVOT_LIMIT: usize = 50;

/// Simplex solver for linear programming problems
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Wall-clock budget for one solve
    time_limit: Option<Duration>,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            time_limit: None,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        let mut run = Run {
            deadline: self.time_limit.map(|limit| Instant::now() + limit),
            iterations: 0,
        };
        let mut tableau = self.build_tableau(problem);

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau, &mut run) {
                Phase1Result::Feasible => {}
                Phase1Result::Infeasible(rows) => return Solution::infeasible(rows, run.iterations),
                Phase1Result::Stopped(SimplexResult::TimeLimit) => {
                    return Solution::time_limit(run.iterations);
                }
                Phase1Result::Stopped(_) => return Solution::iteration_limit(run.iterations),
            }
        }

        // Phase 2: Optimize, never letting artificial columns re-enter
        let exclude_from = tableau.n_vars + tableau.n_slack;
        match self.iterate(&mut tableau, exclude_from, &mut run) {
            SimplexResult::Optimal => self.extract_solution(&tableau, problem, run.iterations),
            SimplexResult::Unbounded => Solution::unbounded(run.iterations),
            SimplexResult::TimeLimit => Solution::time_limit(run.iterations),
            SimplexResult::IterationLimit => Solution::iteration_limit(run.iterations),
        }
    }

    fn build_tableau(&self, problem: &LpProblem) -> Tableau {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Normalise so every RHS is non-negative, flipping the operator where needed
        let rows: Vec<(Vec<f64>, ConstraintOp, f64)> = problem
            .constraints()
            .iter()
            .map(|c| {
                if c.rhs < 0.0 {
                    let coefficients = c.coefficients.iter().map(|x| -x).collect();
                    (coefficients, c.op.flipped(), -c.rhs)
                } else {
                    (c.coefficients.clone(), c.op, c.rhs)
                }
            })
            .collect();

        // Count slack and artificial variables needed
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (_, op, _) in &rows {
            match op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
            constraint_names: problem.constraints().iter().map(|c| c.name.clone()).collect(),
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, (coefficients, op, rhs)) in rows.into_iter().enumerate() {
            tableau.data[i][..n_vars].copy_from_slice(&coefficients);
            tableau.data[i][total_cols - 1] = rhs;

            match op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        // Objective row (last row) holds reduced costs in maximisation form:
        // a positive entry means the column can improve the objective.
        let objective = problem.objective();
        for (j, &coef) in objective.coefficients.iter().enumerate() {
            tableau.data[n_constraints][j] = match objective.sense {
                Sense::Maximize => coef,
                Sense::Minimize => -coef,
            };
        }

        tableau
    }

    fn phase1(&self, tableau: &mut Tableau, run: &mut Run) -> Phase1Result {
        let n_constraints = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();
        let rhs_col = n_cols - 1;
        let art_start = tableau.n_vars + tableau.n_slack;

        let orig_obj = tableau.data[n_constraints].clone();

        // Phase 1 objective: maximize -sum(artificials)
        tableau.data[n_constraints].iter_mut().for_each(|x| *x = 0.0);
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }

        // Price out the basic artificials
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        match self.iterate(tableau, rhs_col, run) {
            SimplexResult::Optimal => {}
            // Phase 1 is bounded below by zero, so an unbounded ray cannot occur
            SimplexResult::Unbounded => {}
            stopped => return Phase1Result::Stopped(stopped),
        }

        let unsatisfied: Vec<String> = (0..n_constraints)
            .filter(|&i| {
                tableau.basic_vars[i] >= art_start && tableau.data[i][rhs_col] > self.tolerance
            })
            .map(|i| tableau.constraint_names[i].clone())
            .collect();
        if !unsatisfied.is_empty() {
            return Phase1Result::Infeasible(unsatisfied);
        }

        self.drive_out_artificials(tableau);

        // Restore original objective and adjust for basic variables
        tableau.data[n_constraints] = orig_obj;
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[n_constraints][basic];
            if ratio.abs() > self.tolerance {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        Phase1Result::Feasible
    }

    /// Pivot zero-level artificials out of the basis so phase 2 cannot raise them.
    /// Rows with no eligible column are redundant and left alone.
    fn drive_out_artificials(&self, tableau: &mut Tableau) {
        let n_constraints = tableau.data.len() - 1;
        let art_start = tableau.n_vars + tableau.n_slack;

        for i in 0..n_constraints {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            if let Some(col) = (0..art_start).find(|&j| tableau.data[i][j].abs() > self.tolerance) {
                self.pivot(tableau, i, col);
            }
        }
    }

    /// Run simplex pivots until optimal. Columns at or beyond `exclude_from` never enter.
    fn iterate(&self, tableau: &mut Tableau, exclude_from: usize, run: &mut Run) -> SimplexResult {
        let rhs_col = tableau.data[0].len() - 1;
        let mut degenerate_run = 0;

        loop {
            let bland = degenerate_run >= DEGENERATE_PIVOT_LIMIT;
            let Some(pivot_col) = self.find_pivot_column(tableau, exclude_from, bland) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col, bland) else {
                return SimplexResult::Unbounded;
            };

            if run.iterations >= self.max_iterations {
                return SimplexResult::IterationLimit;
            }
            if run.deadline.is_some_and(|d| Instant::now() >= d) {
                return SimplexResult::TimeLimit;
            }

            if tableau.data[pivot_row][rhs_col] <= self.tolerance {
                degenerate_run += 1;
            } else {
                degenerate_run = 0;
            }

            self.pivot(tableau, pivot_row, pivot_col);
            run.iterations += 1;
        }
    }

    /// Dantzig's rule (most positive reduced cost), or Bland's rule (lowest index)
    fn find_pivot_column(&self, tableau: &Tableau, exclude_from: usize, bland: bool) -> Option<usize> {
        let obj_row = &tableau.data[tableau.data.len() - 1];

        if bland {
            return (0..exclude_from).find(|&j| obj_row[j] > self.tolerance);
        }

        let mut max_val = self.tolerance;
        let mut max_col = None;
        for (j, &val) in obj_row.iter().enumerate().take(exclude_from) {
            if val > max_val {
                max_val = val;
                max_col = Some(j);
            }
        }
        max_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize, bland: bool) -> Option<usize> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..n_constraints {
            let val = tableau.data[i][col];
            if val > self.tolerance {
                // Round-off can leave a tiny negative RHS
                let ratio = tableau.data[i][rhs_col].max(0.0) / val;
                let better = match min_row {
                    None => true,
                    Some(_) if ratio < min_ratio - self.tolerance => true,
                    Some(current) if bland && (ratio - min_ratio).abs() <= self.tolerance => {
                        tableau.basic_vars[i] < tableau.basic_vars[current]
                    }
                    Some(_) => false,
                };
                if better {
                    min_ratio = ratio.min(min_ratio);
                    min_row = Some(i);
                }
            }
        }

        min_row
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();

        tableau.basic_vars[row] = col;

        let pivot_val = tableau.data[row][col];
        tableau.data[row].iter_mut().for_each(|x| *x /= pivot_val);

        let pivot_row = tableau.data[row].clone();
        for i in 0..n_rows {
            if i != row {
                let factor = tableau.data[i][col];
                if factor != 0.0 {
                    for (x, p) in tableau.data[i].iter_mut().zip(&pivot_row) {
                        *x -= factor * p;
                    }
                }
            }
        }
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem, iterations: usize) -> Solution {
        let n_vars = problem.num_variables();
        let rhs_col = tableau.data[0].len() - 1;

        let mut values = vec![0.0; n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < n_vars {
                // Clamp round-off below zero back onto the variable bound
                values[basic] = tableau.data[i][rhs_col].max(0.0);
            }
        }

        let objective = problem.objective();
        let objective_value = objective
            .coefficients
            .iter()
            .zip(&values)
            .map(|(c, v)| c * v)
            .sum::<f64>()
            + objective.constant;

        Solution::optimal(values, objective_value, iterations)
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
    constraint_names: Vec<String>,
}

struct Run {
    deadline: Option<Instant>,
    iterations: usize,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    TimeLimit,
    IterationLimit,
}

enum Phase1Result {
    Feasible,
    Infeasible(Vec<String>),
    Stopped(SimplexResult),
}
