use std::fmt;

use indexmap::IndexMap;

use crate::error::MgaError;
use crate::model::OptimizationModel;

/// Identifier of the baseline sample
pub const GLOBAL_OPTIMUM: &str = "global_optimum";

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SampleId {
    GlobalOptimum,
    Target(String),
}

impl SampleId {
    pub fn as_str(&self) -> &str {
        match self {
            SampleId::GlobalOptimum => GLOBAL_OPTIMUM,
            SampleId::Target(name) => name,
        }
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Investment values of one solve
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: SampleId,
    /// Objective value of the solve that produced this sample
    pub objective_value: f64,
    /// The original cost expression evaluated at this sample
    pub total_cost: f64,
    /// Investment variable id -> solved value, in model order
    pub values: IndexMap<String, f64>,
}

impl Sample {
    /// Read every investment variable of a solved model
    pub fn collect<M: OptimizationModel>(
        id: SampleId,
        model: &M,
        objective_value: f64,
    ) -> Result<Self, MgaError> {
        if !model.has_solution() {
            return Err(MgaError::ModelState(format!(
                "sample '{}' requested from a model without a solution",
                id
            )));
        }

        let total_cost = model.evaluate(model.cost_expression()).ok_or_else(|| {
            MgaError::ModelState(format!("cost of sample '{}' cannot be evaluated", id))
        })?;
        let values = model
            .investment_variables()
            .into_iter()
            .filter_map(|var| var.value.map(|value| (var.id, value)))
            .collect();

        Ok(Self {
            id,
            objective_value,
            total_cost,
            values,
        })
    }

    pub fn value(&self, variable: &str) -> Option<f64> {
        self.values.get(variable).copied()
    }
}

/// Lowest and highest value one variable takes across the alternatives
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub min: f64,
    pub max: f64,
    /// Value at the global optimum, for reference
    pub baseline: Option<f64>,
    /// Number of alternatives the variable appears in
    pub samples: usize,
}

impl Spread {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Ordered samples of one MGA run, the global optimum always first
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    pub(crate) fn new(baseline: Sample) -> Self {
        debug_assert_eq!(baseline.id, SampleId::GlobalOptimum);
        Self {
            samples: vec![baseline],
        }
    }

    pub(crate) fn push(&mut self, sample: Sample) {
        debug_assert_ne!(sample.id, SampleId::GlobalOptimum);
        self.samples.push(sample);
    }

    pub fn baseline(&self) -> &Sample {
        &self.samples[0]
    }

    /// All non-baseline samples, in request order
    pub fn alternatives(&self) -> &[Sample] {
        &self.samples[1..]
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Never true: the baseline is always present
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value of `variable` in the sample at `index`; `None` when the sample did not record it
    pub fn get(&self, index: usize, variable: &str) -> Option<f64> {
        self.samples.get(index)?.value(variable)
    }

    /// Union of recorded variable ids, in first-seen order
    pub fn variables(&self) -> Vec<String> {
        let mut seen: IndexMap<&str, ()> = IndexMap::new();
        for sample in &self.samples {
            for id in sample.values.keys() {
                seen.entry(id.as_str()).or_insert(());
            }
        }
        seen.into_keys().map(str::to_string).collect()
    }

    /// Per-variable min/max over the alternatives. The baseline does not take part.
    pub fn spread(&self) -> IndexMap<String, Spread> {
        let mut spread: IndexMap<String, Spread> = IndexMap::new();
        for sample in self.alternatives() {
            for (id, &value) in &sample.values {
                spread
                    .entry(id.clone())
                    .and_modify(|s| {
                        s.min = s.min.min(value);
                        s.max = s.max.max(value);
                        s.samples += 1;
                    })
                    .or_insert(Spread {
                        min: value,
                        max: value,
                        baseline: self.baseline().value(id),
                        samples: 1,
                    });
            }
        }
        spread
    }

    /// Row-per-sample, column-per-variable export
    pub fn table(&self) -> SampleTable {
        let columns = self.variables();
        let rows = self
            .samples
            .iter()
            .map(|sample| SampleRow {
                sample: sample.id.to_string(),
                objective_value: sample.objective_value,
                total_cost: sample.total_cost,
                values: columns.iter().map(|c| sample.value(c)).collect(),
            })
            .collect();
        SampleTable { columns, rows }
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    /// Variable ids, one per value column
    pub columns: Vec<String>,
    pub rows: Vec<SampleRow>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub sample: String,
    pub objective_value: f64,
    pub total_cost: f64,
    /// One entry per column; `None` where the sample has no value
    pub values: Vec<Option<f64>>,
}
