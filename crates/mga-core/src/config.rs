use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mga_solver::Sense;

use crate::ceiling::{CeilingRule, validate_slack};
use crate::error::MgaError;
use crate::predicate::Predicate;

/// One requested alternative: a name for the resulting sample and the
/// variables whose sum is optimised.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub name: String,
    pub predicate: Predicate,
}

impl Target {
    pub fn new(name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }

    /// Target named after a component label, matching that label exactly
    pub fn label(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            predicate: Predicate::Label(label.clone()),
            name: label,
        }
    }
}

impl From<&str> for Target {
    fn from(label: &str) -> Self {
        Target::label(label)
    }
}

impl From<String> for Target {
    fn from(label: String) -> Self {
        Target::label(label)
    }
}

/// Stops targets that have not started yet. Solves already running finish.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone)]
pub struct MgaConfig {
    /// Fractional cost premium allowed above the optimum
    pub slack: f64,
    /// How the slack is applied to the optimum
    pub ceiling_rule: CeilingRule,
    /// Direction in which the matched variables are pushed
    pub sense: Sense,
    /// Maximum number of alternative solves in flight; 0 uses every CPU
    pub threads: usize,
    /// Budget for each individual solve
    pub time_limit: Option<Duration>,
    /// Relative tolerance when checking an alternative against the ceiling
    pub tolerance: f64,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancel: Option<CancelHandle>,
}

impl Default for MgaConfig {
    fn default() -> Self {
        Self {
            slack: 0.0,
            ceiling_rule: CeilingRule::Proportional,
            sense: Sense::Maximize,
            threads: 1,
            time_limit: None,
            tolerance: 1e-6,
            cancel: None,
        }
    }
}

impl MgaConfig {
    pub fn new(slack: f64) -> Self {
        Self {
            slack,
            ..Self::default()
        }
    }

    pub fn with_ceiling_rule(mut self, rule: CeilingRule) -> Self {
        self.ceiling_rule = rule;
        self
    }

    pub fn with_sense(mut self, sense: Sense) -> Self {
        self.sense = sense;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn validate(&self) -> Result<(), MgaError> {
        validate_slack(self.slack)?;
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(MgaError::Configuration(format!(
                "tolerance {} must be a finite value >= 0",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// Number of worker threads for `targets` alternatives
    pub(crate) fn worker_count(&self, targets: usize) -> usize {
        let threads = if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        };
        threads.min(targets).max(1)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled)
    }
}
