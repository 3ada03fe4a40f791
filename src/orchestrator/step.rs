//! Execution of a single workflow node.
//!
//! A node runs its checks strictly in order. Plain nodes fold their results
//! into one "matched" flag and, if they have children, expand all of them
//! once the flag is set. Matcher-gated nodes stream every result through
//! their matchers and expand the children of each satisfied matcher as soon
//! as that result arrives. Children always run as new tasks in the shared
//! worker budget; this call never waits for them.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;

use crate::core::scheduler::report_step_error;
use crate::core::{Check, WorkerBudget, result_channel};
use crate::error::{WorkflowError, WorkflowResult};
use crate::orchestrator::MatchAggregator;
use crate::scan::{ScanContext, normalize_extracts};
use crate::workflow::{Matcher, NodeKind, TemplateNode, Workflow};

/// Shared handles every node of a run executes with.
#[derive(Debug, Clone)]
pub struct StepExecutor {
    ctx: ScanContext,
    results: MatchAggregator,
    budget: WorkerBudget,
    workflow: Arc<Workflow>,
}

impl StepExecutor {
    pub fn new(
        ctx: ScanContext,
        results: MatchAggregator,
        budget: WorkerBudget,
        workflow: Arc<Workflow>,
    ) -> Self {
        Self {
            ctx,
            results,
            budget,
            workflow,
        }
    }

    /// Owned, boxed execution of `node`, ready to be submitted as a task.
    pub fn run(self, node: Arc<TemplateNode>) -> BoxFuture<'static, WorkflowResult<()>> {
        async move { self.execute(&node).await }.boxed()
    }

    /// Execute `node` and schedule whichever children it expands.
    ///
    /// Returns the check error of a single-check node. Errors of other
    /// nodes, and of any scheduled child, are only logged.
    pub async fn execute(&self, node: &TemplateNode) -> WorkflowResult<()> {
        match node.kind() {
            NodeKind::Plain { subtemplates } => self.execute_plain(node, subtemplates).await,
            NodeKind::MatcherGated { matchers } => {
                self.execute_matcher_gated(node, matchers).await
            }
        }
    }

    async fn execute_plain(
        &self,
        node: &TemplateNode,
        subtemplates: &[Arc<TemplateNode>],
    ) -> WorkflowResult<()> {
        let mut matched = false;
        let mut main_err = None;

        for check in node.checks() {
            self.announce_requests(check.as_ref());

            let outcome = if subtemplates.is_empty() {
                check.execute(&self.ctx).await.map(|hit| matched |= hit)
            } else {
                let (tx, mut rx) = result_channel();
                let consume = async {
                    while let Some(event) = rx.recv().await {
                        let Some(outcome) = event.non_empty_outcome() else {
                            continue;
                        };
                        if outcome.has_matches() {
                            matched = true;
                        }
                        normalize_extracts(self.ctx.variables(), &outcome.extracts);
                    }
                };
                let (result, ()) = tokio::join!(check.execute_with_results(&self.ctx, tx), consume);
                result
            };

            if let Err(err) = outcome {
                self.record_check_error(node, err, &mut main_err);
            }
        }

        if subtemplates.is_empty() {
            if self.results.publish(matched) {
                tracing::debug!("[{}] First match of the workflow run", node.name());
            }
        } else if matched {
            tracing::debug!(
                "[{}] Matched, expanding {} subtemplates",
                node.name(),
                subtemplates.len()
            );
            for child in subtemplates {
                self.schedule(child);
            }
        }

        main_err.map_or(Ok(()), Err)
    }

    async fn execute_matcher_gated(
        &self,
        node: &TemplateNode,
        matchers: &[Matcher],
    ) -> WorkflowResult<()> {
        let mut main_err = None;

        for check in node.checks() {
            self.announce_requests(check.as_ref());

            let (tx, mut rx) = result_channel();
            let consume = async {
                while let Some(event) = rx.recv().await {
                    let Some(outcome) = event.non_empty_outcome() else {
                        continue;
                    };
                    // children must see what this result extracted
                    normalize_extracts(self.ctx.variables(), &outcome.extracts);

                    for matcher in matchers.iter().filter(|m| m.matches(outcome)) {
                        for child in matcher.subtemplates() {
                            self.schedule(child);
                        }
                    }
                }
            };
            let (result, ()) = tokio::join!(check.execute_with_results(&self.ctx, tx), consume);

            if let Err(err) = result {
                self.record_check_error(node, err, &mut main_err);
            }
        }

        main_err.map_or(Ok(()), Err)
    }

    /// Queue `child` as a new task sharing this run's handles.
    fn schedule(&self, child: &Arc<TemplateNode>) {
        let task = self.clone().run(child.clone());
        if let Err(err) = self.budget.submit(child.name().clone(), task) {
            report_step_error(child.name(), &err);
        }
    }

    fn announce_requests(&self, check: &dyn Check) {
        self.workflow
            .options()
            .progress
            .add_to_total(check.requests() as u64);
    }

    fn record_check_error(
        &self,
        node: &TemplateNode,
        err: anyhow::Error,
        main_err: &mut Option<WorkflowError>,
    ) {
        if let Some(cache) = &self.workflow.options().failure_cache {
            cache.mark_failed(self.ctx.target(), &err);
        }

        if node.checks().len() == 1 {
            *main_err = Some(WorkflowError::check(node.name(), err));
        } else {
            report_step_error(node.name(), &err);
        }
    }
}
