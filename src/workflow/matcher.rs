// Matcher predicates gating conditional subtemplates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::TemplateNode;
use crate::core::Outcome;

/// Predicate over a check's structured outcome.
pub trait MatchCondition: Send + Sync + fmt::Debug {
    fn satisfied_by(&self, outcome: &Outcome) -> bool;
}

/// A matcher on a template node and the children it expands when satisfied.
#[derive(Debug, Clone)]
pub struct Matcher {
    condition: Arc<dyn MatchCondition>,
    subtemplates: Vec<Arc<TemplateNode>>,
}

impl Matcher {
    pub fn new(condition: impl MatchCondition + 'static) -> Self {
        Self {
            condition: Arc::new(condition),
            subtemplates: Vec::new(),
        }
    }

    /// Shorthand for a [`NameMatcher`] satisfied by any of `names`.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(NameMatcher::any(names))
    }

    pub fn subtemplate(mut self, node: impl Into<Arc<TemplateNode>>) -> Self {
        self.subtemplates.push(node.into());
        self
    }

    pub fn matches(&self, outcome: &Outcome) -> bool {
        self.condition.satisfied_by(outcome)
    }

    pub fn subtemplates(&self) -> &[Arc<TemplateNode>] {
        &self.subtemplates
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherCondition {
    And,
    #[default]
    Or,
}

/// Matches on the names of the check-level matchers that fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMatcher {
    pub names: Vec<String>,
    #[serde(default)]
    pub condition: MatcherCondition,
}

impl NameMatcher {
    pub fn any<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            condition: MatcherCondition::Or,
        }
    }

    pub fn all<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            condition: MatcherCondition::And,
        }
    }
}

impl MatchCondition for NameMatcher {
    fn satisfied_by(&self, outcome: &Outcome) -> bool {
        let fired = |name: &String| outcome.matches.iter().any(|m| m == name);
        match self.condition {
            MatcherCondition::Or => self.names.iter().any(fired),
            MatcherCondition::And => !self.names.is_empty() && self.names.iter().all(fired),
        }
    }
}
