//! Modeling-to-generate-alternatives sampling.
//!
//! The baseline is solved once on a private copy of the caller's model. Every
//! target then gets its own copy of the solved baseline, bounded by the cost
//! ceiling and re-optimised towards the target's variables. Target solves are
//! independent and run on a bounded rayon pool once the baseline is known.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::ceiling::inject_cost_ceiling;
use crate::config::{MgaConfig, Target};
use crate::error::{MgaError, SolveFailure};
use crate::model::OptimizationModel;
use crate::objective::set_objective;
use crate::sample::{GLOBAL_OPTIMUM, Sample, SampleId, SampleSet};

/// A per-target finding reported alongside the samples
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The target selected no variables, so its objective was constant and
    /// the sample is just some feasible point under the ceiling. The sample is kept.
    NoMatchingVariables { target: String, position: usize },
    /// The alternative solve did not reach optimality. No sample.
    SolveFailed(SolveFailure),
    /// The solver returned a point above the ceiling. No sample.
    CostCeilingExceeded {
        target: String,
        position: usize,
        total_cost: f64,
        ceiling: f64,
    },
    /// The run was cancelled before this target started. No sample.
    Cancelled { target: String, position: usize },
}

impl Diagnostic {
    pub fn target(&self) -> &str {
        match self {
            Diagnostic::NoMatchingVariables { target, .. }
            | Diagnostic::CostCeilingExceeded { target, .. }
            | Diagnostic::Cancelled { target, .. } => target,
            Diagnostic::SolveFailed(failure) => &failure.target,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            Diagnostic::NoMatchingVariables { position, .. }
            | Diagnostic::CostCeilingExceeded { position, .. }
            | Diagnostic::Cancelled { position, .. } => *position,
            Diagnostic::SolveFailed(failure) => failure.position,
        }
    }

    /// Warnings accompany a recorded sample; everything else replaces one
    pub fn is_warning(&self) -> bool {
        matches!(self, Diagnostic::NoMatchingVariables { .. })
    }
}

/// Result of one MGA run
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MgaRun {
    pub samples: SampleSet,
    pub diagnostics: Vec<Diagnostic>,
    /// Cost ceiling every alternative was held to
    pub ceiling: f64,
}

impl MgaRun {
    /// Diagnostics for targets that produced no sample
    pub fn failures(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_warning())
    }
}

struct TargetOutcome {
    sample: Option<Sample>,
    diagnostics: Vec<Diagnostic>,
}

/// Sample alternatives to a cost-minimising model, one per target label.
///
/// The caller's model is never modified.
pub fn run_mga<M, S>(model: &M, slack: f64, labels: &[S]) -> Result<MgaRun, MgaError>
where
    M: OptimizationModel,
    S: AsRef<str>,
{
    let targets: Vec<Target> = labels.iter().map(|l| Target::label(l.as_ref())).collect();
    Mga::new(MgaConfig::new(slack)).run(model, &targets)
}

/// Configured MGA sampler
#[derive(Debug, Clone, Default)]
pub struct Mga {
    config: MgaConfig,
}

impl Mga {
    pub fn new(config: MgaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MgaConfig {
        &self.config
    }

    pub fn run<M: OptimizationModel>(&self, model: &M, targets: &[Target]) -> Result<MgaRun, MgaError> {
        self.config.validate()?;
        if targets.is_empty() {
            return Err(MgaError::Configuration("no targets requested".to_string()));
        }
        if targets.iter().any(|t| t.name == GLOBAL_OPTIMUM) {
            return Err(MgaError::Configuration(format!(
                "target name '{}' is reserved for the baseline sample",
                GLOBAL_OPTIMUM
            )));
        }
        if model.investment_variables().is_empty() {
            return Err(MgaError::NoInvestmentVariables);
        }

        info!("Solving for global optimum");
        let mut baseline = model.clone();
        let report = baseline.solve(self.config.time_limit);
        if !report.is_optimal() {
            return Err(MgaError::Systemic {
                status: report.status,
                detail: report.detail,
            });
        }

        let ceiling = self
            .config
            .ceiling_rule
            .max_cost(report.objective_value, self.config.slack)?;
        info!(
            objective = report.objective_value,
            slack = self.config.slack,
            ceiling,
            "global optimum found"
        );
        let mut samples = SampleSet::new(Sample::collect(
            SampleId::GlobalOptimum,
            &baseline,
            report.objective_value,
        )?);

        let workers = self.config.worker_count(targets.len());
        let outcomes: Vec<TargetOutcome> = if workers == 1 {
            targets
                .iter()
                .enumerate()
                .map(|(position, target)| self.run_target(&baseline, position, target, ceiling))
                .collect::<Result<Vec<_>, MgaError>>()?
        } else {
            debug!(workers, "dispatching targets to worker pool");
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| MgaError::WorkerPool(e.to_string()))?;
            pool.install(|| {
                targets
                    .par_iter()
                    .enumerate()
                    .map(|(position, target)| self.run_target(&baseline, position, target, ceiling))
                    .collect::<Result<Vec<_>, MgaError>>()
            })?
        };

        let mut diagnostics = Vec::new();
        for outcome in outcomes {
            if let Some(sample) = outcome.sample {
                samples.push(sample);
            }
            diagnostics.extend(outcome.diagnostics);
        }

        info!(
            samples = samples.len(),
            failed = diagnostics.iter().filter(|d| !d.is_warning()).count(),
            "MGA sampling finished"
        );
        Ok(MgaRun {
            samples,
            diagnostics,
            ceiling,
        })
    }

    fn run_target<M: OptimizationModel>(
        &self,
        baseline: &M,
        position: usize,
        target: &Target,
        ceiling: f64,
    ) -> Result<TargetOutcome, MgaError> {
        let _span = info_span!("target", name = %target.name, position).entered();
        let mut diagnostics = Vec::new();

        if self.config.is_cancelled() {
            debug!("skipping cancelled target");
            diagnostics.push(Diagnostic::Cancelled {
                target: target.name.clone(),
                position,
            });
            return Ok(TargetOutcome {
                sample: None,
                diagnostics,
            });
        }

        let mut model = baseline.clone();
        inject_cost_ceiling(&mut model, ceiling)?;
        let objective = set_objective(&mut model, self.config.sense, &target.predicate)?;
        if objective.is_constant() {
            warn!(predicate = %target.predicate, "target matches no investment variables");
            diagnostics.push(Diagnostic::NoMatchingVariables {
                target: target.name.clone(),
                position,
            });
        }

        info!(sense = %self.config.sense, "optimising investment for target");
        let report = model.solve(self.config.time_limit);
        if !report.is_optimal() {
            warn!(status = %report.status, detail = %report.detail, "alternative solve failed");
            diagnostics.push(Diagnostic::SolveFailed(SolveFailure {
                target: target.name.clone(),
                position,
                status: report.status,
                detail: report.detail,
            }));
            return Ok(TargetOutcome {
                sample: None,
                diagnostics,
            });
        }

        let sample = Sample::collect(
            SampleId::Target(target.name.clone()),
            &model,
            report.objective_value,
        )?;
        let allowance = self.config.tolerance * ceiling.abs().max(1.0);
        if sample.total_cost > ceiling + allowance {
            warn!(total_cost = sample.total_cost, ceiling, "alternative exceeds cost ceiling");
            diagnostics.push(Diagnostic::CostCeilingExceeded {
                target: target.name.clone(),
                position,
                total_cost: sample.total_cost,
                ceiling,
            });
            return Ok(TargetOutcome {
                sample: None,
                diagnostics,
            });
        }

        info!(
            objective = report.objective_value,
            total_cost = sample.total_cost,
            "alternative found"
        );
        Ok(TargetOutcome {
            sample: Some(sample),
            diagnostics,
        })
    }
}
