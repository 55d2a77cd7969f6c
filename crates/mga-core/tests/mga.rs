use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mga_core::{
    CancelHandle, CeilingRule, ConstraintOp, Diagnostic, GLOBAL_OPTIMUM, InvestmentVariable, LinearExpr,
    LpModel, MAX_COST_CONSTRAINT, Mga, MgaConfig, MgaError, OptimizationModel, Predicate, SampleId,
    Sense, SolutionStatus, SolveReport, Target, inject_cost_ceiling, run_mga,
};
use mga_solver::{LpProblem, VariableKind};

const TOL: f64 = 1e-6;

/// Two technologies A and B cover a demand of 10; A costs 10 per unit, B 12.
/// The optimum builds 10 units of A for a cost of 100.
fn two_technology_problem() -> LpProblem {
    let mut problem = LpProblem::new();
    problem.add_variable("a_cap", "A", VariableKind::Investment).unwrap();
    problem.add_variable("b_cap", "B", VariableKind::Investment).unwrap();
    problem
        .add_constraint("demand", vec![1.0, 1.0], ConstraintOp::Ge, 10.0)
        .unwrap();
    problem.set_objective(vec![10.0, 12.0], 0.0, Sense::Minimize).unwrap();
    problem
}

fn two_technology_model() -> LpModel {
    LpModel::new(two_technology_problem())
}

fn cost(a: f64, b: f64) -> f64 {
    10.0 * a + 12.0 * b
}

/// Delegates to an [`LpModel`] while counting solves. It can pretend that
/// solves maximising a given variable run out of time, or drop the cost
/// ceiling like a solver that ignores it.
#[derive(Clone)]
struct CountingModel {
    inner: LpModel,
    solves: Arc<AtomicUsize>,
    time_out_on: Option<String>,
    ignore_ceiling: bool,
}

impl CountingModel {
    fn new(inner: LpModel) -> Self {
        Self {
            inner,
            solves: Arc::new(AtomicUsize::new(0)),
            time_out_on: None,
            ignore_ceiling: false,
        }
    }

    fn solves(&self) -> usize {
        self.solves.load(Ordering::SeqCst)
    }
}

impl OptimizationModel for CountingModel {
    fn solve(&mut self, time_limit: Option<Duration>) -> SolveReport {
        self.solves.fetch_add(1, Ordering::SeqCst);
        if let Some(var) = &self.time_out_on {
            let maximising = self.inner.objective_sense() == Sense::Maximize;
            if maximising && self.inner.objective().terms.contains_key(var) {
                return SolveReport {
                    status: SolutionStatus::TimeLimit,
                    objective_value: f64::NAN,
                    detail: "time limit reached".to_string(),
                };
            }
        }
        self.inner.solve(time_limit)
    }

    fn has_solution(&self) -> bool {
        self.inner.has_solution()
    }

    fn objective(&self) -> LinearExpr {
        self.inner.objective()
    }

    fn objective_sense(&self) -> Sense {
        self.inner.objective_sense()
    }

    fn cost_expression(&self) -> &LinearExpr {
        self.inner.cost_expression()
    }

    fn set_objective(&mut self, expr: LinearExpr, sense: Sense) -> Result<(), MgaError> {
        self.inner.set_objective(expr, sense)
    }

    fn has_constraint(&self, name: &str) -> bool {
        self.inner.has_constraint(name)
    }

    fn add_constraint(
        &mut self,
        name: &str,
        expr: &LinearExpr,
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<(), MgaError> {
        if self.ignore_ceiling && name == MAX_COST_CONSTRAINT {
            return Ok(());
        }
        self.inner.add_constraint(name, expr, op, rhs)
    }

    fn investment_variables(&self) -> Vec<InvestmentVariable> {
        self.inner.investment_variables()
    }

    fn evaluate(&self, expr: &LinearExpr) -> Option<f64> {
        self.inner.evaluate(expr)
    }
}

#[test]
fn test_alternative_maximises_matching_label() {
    let model = two_technology_model();
    let run = run_mga(&model, 0.2, &["A"]).unwrap();

    assert!((run.ceiling - 120.0).abs() < TOL);
    assert_eq!(run.samples.len(), 2);
    assert!(run.diagnostics.is_empty());

    let baseline = run.samples.baseline();
    assert_eq!(baseline.id.to_string(), GLOBAL_OPTIMUM);
    assert!((baseline.objective_value - 100.0).abs() < TOL);
    assert!((baseline.value("a_cap").unwrap() - 10.0).abs() < TOL);

    let alt = &run.samples.alternatives()[0];
    assert_eq!(alt.id, SampleId::Target("A".to_string()));
    assert!((alt.value("a_cap").unwrap() - 12.0).abs() < TOL, "a = {:?}", alt.value("a_cap"));
    // Every investment variable is recorded, not just the matched ones
    assert!(alt.value("b_cap").unwrap().abs() < TOL);
    assert!((alt.objective_value - 12.0).abs() < TOL);
    assert!((alt.total_cost - 120.0).abs() < TOL);
}

#[test]
fn test_spread_across_alternatives() {
    let model = two_technology_model();
    let run = run_mga(&model, 0.2, &["A", "B"]).unwrap();

    assert_eq!(run.samples.len(), 3);
    let b = &run.samples.alternatives()[1];
    assert!((b.value("b_cap").unwrap() - 10.0).abs() < TOL);
    assert!(b.value("a_cap").unwrap().abs() < TOL);

    let spread = run.samples.spread();
    let a = spread["a_cap"];
    assert!(a.min.abs() < TOL && (a.max - 12.0).abs() < TOL);
    assert!((a.baseline.unwrap() - 10.0).abs() < TOL);
    let b = spread["b_cap"];
    assert!(b.min.abs() < TOL && (b.max - 10.0).abs() < TOL);
}

#[test]
fn test_alternatives_respect_cost_ceiling() {
    let model = two_technology_model();
    for slack in [0.0, 0.05, 0.2, 1.0] {
        let run = run_mga(&model, slack, &["A", "B"]).unwrap();
        let limit = (1.0 + slack) * run.samples.baseline().objective_value;
        assert!((run.ceiling - limit).abs() < TOL);

        for sample in run.samples.alternatives() {
            let recomputed = cost(
                sample.value("a_cap").unwrap(),
                sample.value("b_cap").unwrap(),
            );
            assert!(recomputed <= limit + TOL, "slack {}: cost {} > {}", slack, recomputed, limit);
            assert!((recomputed - sample.total_cost).abs() < TOL);
        }
    }
}

/// Each unit of A earns 10, up to 10 units; B costs 1 per unit.
/// The optimum builds 10 units of A for a cost of -100.
fn revenue_model() -> LpModel {
    let mut problem = LpProblem::new();
    problem.add_variable("a_cap", "A", VariableKind::Investment).unwrap();
    problem.add_variable("b_cap", "B", VariableKind::Investment).unwrap();
    problem
        .add_constraint("a_limit", vec![1.0, 0.0], ConstraintOp::Le, 10.0)
        .unwrap();
    problem
        .add_constraint("b_limit", vec![0.0, 1.0], ConstraintOp::Le, 100.0)
        .unwrap();
    problem.set_objective(vec![-10.0, 1.0], 0.0, Sense::Minimize).unwrap();
    LpModel::new(problem)
}

#[test]
fn test_negative_optimum_ceiling() {
    let model = revenue_model();

    for slack in [0.0, 0.2] {
        let run = run_mga(&model, slack, &["B"]).unwrap();
        let optimum = run.samples.baseline().objective_value;
        assert!((optimum - -100.0).abs() < TOL);
        let limit = (1.0 + slack) * optimum;
        assert!((run.ceiling - limit).abs() < TOL);
        for sample in run.samples.alternatives() {
            assert!(sample.total_cost <= limit + TOL, "cost {} > {}", sample.total_cost, limit);
        }
    }

    // Zero slack keeps the baseline point
    let run = run_mga(&model, 0.0, &["B"]).unwrap();
    assert_eq!(run.samples.len(), 2);
    assert!(run.samples.alternatives()[0].value("b_cap").unwrap().abs() < TOL);

    // A positive slack pushes the ceiling below a negative optimum
    let run = run_mga(&model, 0.2, &["B"]).unwrap();
    assert!((run.ceiling - -120.0).abs() < TOL);
    assert_eq!(run.samples.len(), 1);
    match &run.diagnostics[..] {
        [Diagnostic::SolveFailed(failure)] => {
            assert_eq!(failure.target, "B");
            assert_eq!(failure.status, SolutionStatus::Infeasible);
        }
        other => panic!("unexpected diagnostics {:?}", other),
    }
}

#[test]
fn test_magnitude_ceiling_rule() {
    let model = revenue_model();
    let run = Mga::new(MgaConfig::new(0.2).with_ceiling_rule(CeilingRule::Magnitude))
        .run(&model, &["B".into()])
        .unwrap();

    assert!((run.ceiling - -80.0).abs() < TOL);
    assert!(run.diagnostics.is_empty());
    let b = &run.samples.alternatives()[0];
    assert!((b.value("b_cap").unwrap() - 20.0).abs() < TOL);
    assert!((b.total_cost - -80.0).abs() < TOL);
}

#[test]
fn test_zero_optimum_ceiling() {
    let mut problem = LpProblem::new();
    problem.add_variable("a_cap", "A", VariableKind::Investment).unwrap();
    problem.add_variable("b_cap", "B", VariableKind::Investment).unwrap();
    problem
        .add_constraint("site_limit", vec![1.0, 1.0], ConstraintOp::Le, 10.0)
        .unwrap();
    problem.set_objective(vec![10.0, 12.0], 0.0, Sense::Minimize).unwrap();
    let model = LpModel::new(problem);

    let run = run_mga(&model, 0.5, &["A", "B"]).unwrap();

    assert!(run.samples.baseline().objective_value.abs() < TOL);
    assert!(run.ceiling.abs() < TOL);
    assert_eq!(run.samples.len(), 3);
    for sample in run.samples.alternatives() {
        assert!(sample.total_cost <= TOL, "cost {} above zero ceiling", sample.total_cost);
        assert!(sample.values.values().all(|v| v.abs() < TOL));
    }
}

#[test]
fn test_zero_slack_keeps_baseline_cost() {
    let model = two_technology_model();
    let run = run_mga(&model, 0.0, &["A", "B"]).unwrap();

    assert_eq!(run.ceiling, run.samples.baseline().objective_value);
    for sample in run.samples.alternatives() {
        assert!((sample.total_cost - 100.0).abs() < TOL);
    }
    let a = &run.samples.alternatives()[0];
    assert!((a.value("a_cap").unwrap() - 10.0).abs() < TOL);
}

#[test]
fn test_label_without_variables_warns_and_keeps_sample() {
    let model = two_technology_model();
    let run = run_mga(&model, 0.2, &["nuclear"]).unwrap();

    assert_eq!(run.samples.len(), 2);
    assert_eq!(
        run.diagnostics,
        vec![Diagnostic::NoMatchingVariables {
            target: "nuclear".to_string(),
            position: 0,
        }]
    );
    assert!(run.diagnostics[0].is_warning());
    assert_eq!(run.failures().count(), 0);

    let sample = &run.samples.alternatives()[0];
    assert_eq!(sample.objective_value, 0.0);
    assert!(sample.total_cost <= 120.0 + TOL);
    let a = sample.value("a_cap").unwrap();
    let b = sample.value("b_cap").unwrap();
    assert!(a + b >= 10.0 - TOL);
}

#[test]
fn test_negative_slack_rejected_before_solving() {
    let mut inner = two_technology_model();
    inner.solve(None);
    let model = CountingModel::new(inner);
    let before = model.inner.problem().clone();

    let err = run_mga(&model, -0.1, &["A"]).unwrap_err();

    assert_eq!(err, MgaError::InvalidSlack(-0.1));
    assert_eq!(model.solves(), 0);
    assert!(model.has_solution());
    assert_eq!(model.inner.problem(), &before);
}

#[test]
fn test_infeasible_baseline_is_systemic() {
    let mut problem = two_technology_problem();
    problem
        .add_constraint("build_limit", vec![1.0, 1.0], ConstraintOp::Le, 5.0)
        .unwrap();
    let model = CountingModel::new(LpModel::new(problem));

    let err = run_mga(&model, 0.2, &["A", "B"]).unwrap_err();

    match err {
        MgaError::Systemic { status, .. } => assert_eq!(status, SolutionStatus::Infeasible),
        other => panic!("expected systemic failure, got {:?}", other),
    }
    assert_eq!(model.solves(), 1, "no target iteration may run");
}

#[test]
fn test_input_validation_order() {
    let model = two_technology_model();
    let empty: [&str; 0] = [];
    assert!(matches!(run_mga(&model, 0.1, &empty), Err(MgaError::Configuration(_))));
    assert_eq!(run_mga(&model, -1.0, &empty), Err(MgaError::InvalidSlack(-1.0)));

    let mut problem = LpProblem::new();
    problem.add_variable("gas_flow", "pp_gas", VariableKind::Operation).unwrap();
    let model = CountingModel::new(LpModel::new(problem));
    assert_eq!(run_mga(&model, 0.1, &["pp_gas"]), Err(MgaError::NoInvestmentVariables));
    assert_eq!(model.solves(), 0);
}

#[test]
fn test_baseline_name_is_reserved() {
    let model = CountingModel::new(two_technology_model());

    let err = run_mga(&model, 0.2, &["A", GLOBAL_OPTIMUM]).unwrap_err();
    assert!(matches!(err, MgaError::Configuration(_)), "{:?}", err);

    let renamed = Target::new(GLOBAL_OPTIMUM, Predicate::label("B"));
    let err = Mga::new(MgaConfig::new(0.2)).run(&model, &[renamed]).unwrap_err();
    assert!(matches!(err, MgaError::Configuration(_)), "{:?}", err);
    assert_eq!(model.solves(), 0);
}

#[test]
fn test_caller_model_untouched() {
    let model = two_technology_model();
    let problem = model.problem().clone();
    let cost = model.cost_expression().clone();

    run_mga(&model, 0.2, &["A", "B", "nuclear"]).unwrap();

    assert_eq!(model.problem(), &problem);
    assert_eq!(model.cost_expression(), &cost);
    assert!(!model.has_constraint(MAX_COST_CONSTRAINT));
    assert!(!model.has_solution());
}

#[test]
fn test_unbounded_target_is_reported() {
    let mut problem = two_technology_problem();
    // Free capacity that nothing bounds
    problem.add_variable("c_cap", "C", VariableKind::Investment).unwrap();
    let model = LpModel::new(problem);

    let run = run_mga(&model, 0.2, &["C", "A"]).unwrap();

    assert_eq!(run.samples.len(), 2);
    assert_eq!(run.samples.alternatives()[0].id, SampleId::Target("A".to_string()));
    match &run.diagnostics[..] {
        [Diagnostic::SolveFailed(failure)] => {
            assert_eq!(failure.target, "C");
            assert_eq!(failure.position, 0);
            assert_eq!(failure.status, SolutionStatus::Unbounded);
        }
        other => panic!("unexpected diagnostics {:?}", other),
    }
}

#[test]
fn test_timed_out_target_does_not_stop_siblings() {
    let mut model = CountingModel::new(two_technology_model());
    model.time_out_on = Some("a_cap".to_string());

    let run = run_mga(&model, 0.2, &["A", "B"]).unwrap();

    assert_eq!(model.solves(), 3);
    assert_eq!(run.samples.len(), 2);
    assert_eq!(run.samples.alternatives()[0].id, SampleId::Target("B".to_string()));
    assert_eq!(run.failures().count(), 1);
    match &run.diagnostics[0] {
        Diagnostic::SolveFailed(failure) => assert_eq!(failure.status, SolutionStatus::TimeLimit),
        other => panic!("unexpected diagnostic {:?}", other),
    }
}

#[test]
fn test_cost_above_ceiling_is_excluded() {
    let mut problem = two_technology_problem();
    problem
        .add_constraint("a_limit", vec![1.0, 0.0], ConstraintOp::Le, 15.0)
        .unwrap();
    let mut model = CountingModel::new(LpModel::new(problem));
    model.ignore_ceiling = true;

    let run = run_mga(&model, 0.2, &["A"]).unwrap();

    assert_eq!(run.samples.len(), 1);
    assert_eq!(run.failures().count(), 1);
    match &run.diagnostics[..] {
        [Diagnostic::CostCeilingExceeded {
            target,
            position,
            total_cost,
            ceiling,
        }] => {
            assert_eq!(target, "A");
            assert_eq!(*position, 0);
            assert!((total_cost - 150.0).abs() < TOL);
            assert!((ceiling - 120.0).abs() < TOL);
        }
        other => panic!("unexpected diagnostics {:?}", other),
    }
}

#[test]
fn test_duplicate_labels_produce_independent_samples() {
    let model = two_technology_model();
    let run = run_mga(&model, 0.2, &["A", "B", "A"]).unwrap();

    let ids: Vec<String> = run.samples.iter().map(|s| s.id.to_string()).collect();
    assert_eq!(ids, vec![GLOBAL_OPTIMUM, "A", "B", "A"]);
    assert_eq!(run.samples.alternatives()[0], run.samples.alternatives()[2]);
}

#[test]
fn test_parallel_run_matches_sequential() {
    let model = two_technology_model();
    let targets: Vec<Target> = ["A", "B", "nuclear", "A"].into_iter().map(Target::from).collect();

    let sequential = Mga::new(MgaConfig::new(0.2)).run(&model, &targets).unwrap();
    let parallel = Mga::new(MgaConfig::new(0.2).with_threads(4))
        .run(&model, &targets)
        .unwrap();
    let again = Mga::new(MgaConfig::new(0.2)).run(&model, &targets).unwrap();

    assert_eq!(sequential, parallel);
    assert_eq!(sequential, again);
}

#[test]
fn test_composite_predicate_and_minimise() {
    let model = two_technology_model();
    let targets = vec![
        Target::new("A_or_B", Predicate::label("A").or(Predicate::label("B"))),
        Target::new("not_B", Predicate::label("B").negate()),
    ];

    let run = Mga::new(MgaConfig::new(0.2)).run(&model, &targets).unwrap();
    let both = &run.samples.alternatives()[0];
    // 10a + 12b <= 120 with a + b maximal puts everything on A
    assert!((both.objective_value - 12.0).abs() < TOL);

    let run = Mga::new(MgaConfig::new(0.2).with_sense(Sense::Minimize))
        .run(&model, &[Target::label("A")])
        .unwrap();
    let min_a = &run.samples.alternatives()[0];
    assert!(min_a.value("a_cap").unwrap().abs() < TOL);
    assert!((min_a.value("b_cap").unwrap() - 10.0).abs() < TOL);
}

#[test]
fn test_cancelled_targets_are_skipped() {
    let model = CountingModel::new(two_technology_model());
    let cancel = CancelHandle::new();
    cancel.cancel();

    let run = Mga::new(MgaConfig::new(0.2).with_cancel(cancel))
        .run(&model, &["A".into(), "B".into()])
        .unwrap();

    assert_eq!(model.solves(), 1);
    assert_eq!(run.samples.len(), 1);
    assert!(
        run.diagnostics
            .iter()
            .all(|d| matches!(d, Diagnostic::Cancelled { .. }))
    );
    assert_eq!(run.diagnostics[1].target(), "B");
}

#[test]
fn test_reused_model_with_ceiling_is_a_caller_bug() {
    let mut model = two_technology_model();
    model.solve(None);
    inject_cost_ceiling(&mut model, 500.0).unwrap();

    let err = run_mga(&model, 0.2, &["A"]).unwrap_err();
    assert_eq!(err, MgaError::DuplicateConstraint(MAX_COST_CONSTRAINT.to_string()));
}

#[test]
fn test_baseline_time_limit_is_systemic() {
    let model = two_technology_model();
    let err = Mga::new(MgaConfig::new(0.2).with_time_limit(Duration::ZERO))
        .run(&model, &["A".into()])
        .unwrap_err();

    assert!(matches!(
        err,
        MgaError::Systemic {
            status: SolutionStatus::TimeLimit,
            ..
        }
    ));
}

#[test]
fn test_table_export() {
    let model = two_technology_model();
    let run = run_mga(&model, 0.2, &["A", "B"]).unwrap();
    let table = run.samples.table();

    assert_eq!(table.columns, vec!["a_cap", "b_cap"]);
    let names: Vec<&str> = table.rows.iter().map(|r| r.sample.as_str()).collect();
    assert_eq!(names, vec![GLOBAL_OPTIMUM, "A", "B"]);
    assert!(table.rows.iter().all(|r| r.values.iter().all(Option::is_some)));
}
