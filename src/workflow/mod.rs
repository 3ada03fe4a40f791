//! Immutable workflow tree: template nodes, their checks and expansion rules.
//!
//! A node expands its children in exactly one way, captured by [`NodeKind`]:
//! unconditionally once the node matched ([`NodeKind::Plain`]), or per
//! satisfied matcher ([`NodeKind::MatcherGated`]). [`TemplateNodeBuilder`]
//! rejects nodes that try to declare both.

mod matcher;

pub use matcher::{MatchCondition, Matcher, MatcherCondition, NameMatcher};

use std::fmt;
use std::sync::Arc;

use crate::config::DEFAULT_TEMPLATE_THREADS;
use crate::core::Check;
use crate::error::{WorkflowError, WorkflowResult};
use crate::hosterrors::FailureCache;
use crate::progress::{NoopProgress, Progress};
use crate::types::TemplateName;

/// How a node expands its children.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Children run only if the node as a whole matched.
    Plain { subtemplates: Vec<Arc<TemplateNode>> },
    /// Each matcher expands its own children when satisfied by a result.
    MatcherGated { matchers: Vec<Matcher> },
}

/// One entry of the workflow tree.
pub struct TemplateNode {
    name: TemplateName,
    checks: Vec<Arc<dyn Check>>,
    kind: NodeKind,
}

impl TemplateNode {
    pub fn builder(name: impl Into<TemplateName>) -> TemplateNodeBuilder {
        TemplateNodeBuilder::new(name)
    }

    pub fn name(&self) -> &TemplateName {
        &self.name
    }

    pub fn checks(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Unconditional children; empty for matcher-gated nodes.
    pub fn subtemplates(&self) -> &[Arc<TemplateNode>] {
        match &self.kind {
            NodeKind::Plain { subtemplates } => subtemplates,
            NodeKind::MatcherGated { .. } => &[],
        }
    }
}

impl fmt::Debug for TemplateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateNode")
            .field("name", &self.name)
            .field("checks", &self.checks.len())
            .field("kind", &self.kind)
            .finish()
    }
}

/// Authoring-time builder for [`TemplateNode`].
pub struct TemplateNodeBuilder {
    name: TemplateName,
    checks: Vec<Arc<dyn Check>>,
    subtemplates: Vec<Arc<TemplateNode>>,
    matchers: Vec<Matcher>,
}

impl TemplateNodeBuilder {
    fn new(name: impl Into<TemplateName>) -> Self {
        Self {
            name: name.into(),
            checks: Vec::new(),
            subtemplates: Vec::new(),
            matchers: Vec::new(),
        }
    }

    pub fn check(self, check: impl Check + 'static) -> Self {
        self.shared_check(Arc::new(check))
    }

    pub fn shared_check(mut self, check: Arc<dyn Check>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn subtemplate(mut self, node: impl Into<Arc<TemplateNode>>) -> Self {
        self.subtemplates.push(node.into());
        self
    }

    pub fn matcher(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn build(self) -> WorkflowResult<TemplateNode> {
        let kind = match (self.matchers.is_empty(), self.subtemplates.is_empty()) {
            (true, _) => NodeKind::Plain {
                subtemplates: self.subtemplates,
            },
            (false, true) => NodeKind::MatcherGated {
                matchers: self.matchers,
            },
            (false, false) => {
                return Err(WorkflowError::ConflictingExpansion {
                    template: self.name,
                });
            }
        };

        Ok(TemplateNode {
            name: self.name,
            checks: self.checks,
            kind,
        })
    }
}

/// Run-wide options shared by every node of a workflow.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub template_threads: usize,
    pub failure_cache: Option<Arc<dyn FailureCache>>,
    pub progress: Arc<dyn Progress>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            template_threads: DEFAULT_TEMPLATE_THREADS,
            failure_cache: None,
            progress: Arc::new(NoopProgress),
        }
    }
}

impl WorkflowOptions {
    pub fn with_template_threads(mut self, template_threads: usize) -> Self {
        self.template_threads = template_threads;
        self
    }

    pub fn with_failure_cache(mut self, cache: Arc<dyn FailureCache>) -> Self {
        self.failure_cache = Some(cache);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }
}

/// Top-level template nodes plus run-wide options.
#[derive(Debug, Clone)]
pub struct Workflow {
    nodes: Vec<Arc<TemplateNode>>,
    options: WorkflowOptions,
}

impl Workflow {
    pub fn new(nodes: Vec<Arc<TemplateNode>>, options: WorkflowOptions) -> Self {
        Self { nodes, options }
    }

    pub fn nodes(&self) -> &[Arc<TemplateNode>] {
        &self.nodes
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }
}
