//! Recursive workflow-step scheduler for template-based scanning.
//!
//! A [`Workflow`] is a tree of [`TemplateNode`]s. [`Engine::execute_workflow`]
//! runs every top-level node against a target, feeds extracted values into a
//! shared [`ScanContext`], expands children as results match, and reports
//! whether anything in the tree matched. All nodes of one run share a single
//! bounded [`WorkerBudget`].

// Core modules
pub mod config;
pub mod core;
pub mod error;
pub mod hosterrors;
pub mod logging;
pub mod progress;
pub mod scan;
pub mod types;
pub mod workflow;

mod orchestrator;

pub use config::EngineConfig;
pub use crate::core::{Check, Outcome, ResultEvent, ResultSender, WorkerBudget};
pub use error::{WorkflowError, WorkflowResult};
pub use hosterrors::{FailureCache, HostErrorsCache};
pub use orchestrator::{Engine, MatchAggregator, StepExecutor};
pub use progress::{NoopProgress, Progress, ProgressCounter};
pub use scan::{ScanContext, SessionStore, VariableStore, normalize_extracts};
pub use types::{TargetId, TemplateName};
pub use workflow::{
    MatchCondition, Matcher, MatcherCondition, NameMatcher, NodeKind, TemplateNode, Workflow,
    WorkflowOptions,
};
