use std::fmt;

use mga_solver::LinearExpr;

use crate::model::InvestmentVariable;

/// Selects the investment variables taking part in an alternative objective.
///
/// Predicates are plain data so that a target can be logged, compared and
/// serialised on its own.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Matches every variable
    Any,
    /// Owning component label equals the value
    Label(String),
    /// Variable identifier equals the value
    Id(String),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn label(label: impl Into<String>) -> Self {
        Predicate::Label(label.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Predicate::Id(id.into())
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    pub fn matches(&self, component: &str, id: &str) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::Label(label) => component == label,
            Predicate::Id(wanted) => id == wanted,
            Predicate::And(a, b) => a.matches(component, id) && b.matches(component, id),
            Predicate::Or(a, b) => a.matches(component, id) || b.matches(component, id),
            Predicate::Not(p) => !p.matches(component, id),
        }
    }

    pub fn matches_variable(&self, var: &InvestmentVariable) -> bool {
        self.matches(&var.component, &var.id)
    }

    /// Sum of the matching variables; the constant zero when nothing matches
    pub fn select(&self, variables: &[InvestmentVariable]) -> LinearExpr {
        LinearExpr::sum(
            variables
                .iter()
                .filter(|var| self.matches_variable(var))
                .map(|var| var.id.clone()),
        )
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Any => write!(f, "*"),
            Predicate::Label(label) => write!(f, "label == {:?}", label),
            Predicate::Id(id) => write!(f, "id == {:?}", id),
            Predicate::And(a, b) => write!(f, "({} && {})", a, b),
            Predicate::Or(a, b) => write!(f, "({} || {})", a, b),
            Predicate::Not(p) => write!(f, "!{}", p),
        }
    }
}
