//! Error types for workflow execution.

use thiserror::Error;

use crate::types::TemplateName;

/// Errors produced while building or running a workflow tree.
///
/// Check failures carry the executer error as `source`, so the network or
/// protocol cause stays reachable through `Error::source`.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The only check of a template node failed.
    #[error("{source}")]
    Check {
        template: TemplateName,
        #[source]
        source: anyhow::Error,
    },

    /// A node was authored with both matchers and unconditional subtemplates.
    #[error("template `{template}` sets both matchers and subtemplates")]
    ConflictingExpansion { template: TemplateName },

    /// The worker budget no longer admits tasks.
    #[error("worker budget is closed")]
    BudgetClosed,

    /// Engine configuration could not be resolved or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl WorkflowError {
    pub fn check(template: &TemplateName, source: anyhow::Error) -> Self {
        Self::Check {
            template: template.clone(),
            source,
        }
    }

    /// Template the error belongs to, when there is one.
    pub fn template(&self) -> Option<&TemplateName> {
        match self {
            Self::Check { template, .. } | Self::ConflictingExpansion { template } => {
                Some(template)
            }
            Self::BudgetClosed | Self::Config(_) => None,
        }
    }
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for WorkflowError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}
