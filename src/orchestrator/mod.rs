//! Root of a workflow run: builds the run-scoped state, runs every
//! top-level node and waits for the whole tree to settle.

mod aggregator;
mod step;


pub use aggregator::MatchAggregator;
pub use step::StepExecutor;

use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::WorkerBudget;
use crate::core::scheduler::report_step_error;
use crate::scan::ScanContext;
use crate::workflow::{TemplateNode, Workflow, WorkflowOptions};

/// Runs workflows against scan targets.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    options: WorkflowOptions,
}

impl Engine {
    /// Create an engine whose workflows share `options` (and thus one
    /// failure cache and one progress sink).
    pub fn new(options: WorkflowOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.workflow_options())
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }

    /// Wrap top-level nodes into a workflow using this engine's options.
    pub fn workflow(&self, nodes: Vec<Arc<TemplateNode>>) -> Arc<Workflow> {
        Arc::new(Workflow::new(nodes, self.options.clone()))
    }

    /// Run every top-level node of `workflow` against the target of `ctx`
    /// and report whether anything in the resulting trees matched.
    ///
    /// Node failures are logged and never abort sibling nodes.
    pub async fn execute_workflow(&self, ctx: &ScanContext, workflow: Arc<Workflow>) -> bool {
        let run_id = Uuid::new_v4();
        let span = info_span!("workflow", %run_id, target = %ctx.target());

        async move {
            let results = MatchAggregator::new();
            let run_ctx = ctx.for_workflow_run();
            let budget = WorkerBudget::for_template_threads(workflow.options().template_threads);

            info!(
                "Running workflow with {} templates (budget {})",
                workflow.nodes().len(),
                budget.capacity()
            );

            // top-level nodes run one after another, each holding a slot
            let step =
                StepExecutor::new(run_ctx, results.clone(), budget.clone(), workflow.clone());
            for node in workflow.nodes() {
                if let Err(err) = budget.run_inline(node.name(), step.execute(node)).await {
                    report_step_error(node.name(), &err);
                }
            }

            budget.drain().await;

            let matched = results.final_value();
            info!("Workflow finished, matched={}", matched);
            matched
        }
        .instrument(span)
        .await
    }
}
