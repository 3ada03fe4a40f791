// Bounded task admission shared by a whole workflow-tree run

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::error::{WorkflowError, WorkflowResult};
use crate::types::TemplateName;

/// Smallest capacity a budget is ever created with.
///
/// A top-level node keeps its slot for as long as its own checks run, so a
/// single slot would leave nothing for the children it schedules.
pub const MIN_TEMPLATE_THREADS: usize = 2;

/// Log a step failure that is recovered rather than propagated.
pub(crate) fn report_step_error(template: &TemplateName, err: &dyn std::fmt::Display) {
    tracing::warn!("[{}] Could not execute workflow step: {}", template, err);
}

/// Counting admission pool plus a re-entrant wait group.
///
/// Clones share the same pool. Tasks may submit further tasks into the pool
/// they run in; [`WorkerBudget::drain`] waits for all of them.
///
/// A submitted task takes its slot when it starts, not when it is submitted.
/// Nothing ever waits for a slot while holding one, so deep and wide trees
/// finish with any capacity.
#[derive(Debug, Clone)]
pub struct WorkerBudget {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    capacity: usize,
}

impl WorkerBudget {
    /// Create a budget sized from the configured template thread count.
    ///
    /// The count is raised to [`MIN_TEMPLATE_THREADS`] and capped at the
    /// largest pool tokio can represent.
    pub fn for_template_threads(template_threads: usize) -> Self {
        let capacity = template_threads.clamp(MIN_TEMPLATE_THREADS, Semaphore::MAX_PERMITS);
        if capacity != template_threads {
            tracing::debug!(
                "Adjusting worker budget from {} to {}",
                template_threads,
                capacity
            );
        }

        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            tracker: TaskTracker::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of submitted tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Queue `task` on the pool without waiting.
    ///
    /// The task starts once a slot frees up and holds it until it finishes.
    /// A task error is logged under `template` and never reaches the
    /// submitter. Fails with [`WorkflowError::BudgetClosed`] after
    /// [`WorkerBudget::close`].
    pub fn submit<F>(&self, template: TemplateName, task: F) -> WorkflowResult<()>
    where
        F: Future<Output = WorkflowResult<()>> + Send + 'static,
    {
        if self.permits.is_closed() {
            return Err(WorkflowError::BudgetClosed);
        }

        tracing::debug!("Scheduling workflow step [{}]", template);
        let permits = self.permits.clone();
        self.tracker.spawn(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    report_step_error(&template, &WorkflowError::BudgetClosed);
                    return;
                };
                if let Err(err) = task.await {
                    report_step_error(&template, &err);
                }
            }
            .in_current_span(),
        );

        Ok(())
    }

    /// Run `task` on the caller while it holds one slot.
    ///
    /// Waits for a free slot first. A task error is logged under `template`
    /// like a submitted one; only a closed budget is returned.
    pub async fn run_inline<F>(&self, template: &TemplateName, task: F) -> WorkflowResult<()>
    where
        F: Future<Output = WorkflowResult<()>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| WorkflowError::BudgetClosed)?;

        if let Err(err) = task.await {
            report_step_error(template, &err);
        }
        Ok(())
    }

    /// Stop admitting work.
    ///
    /// Later submissions fail, and queued tasks that have not started are
    /// dropped with a logged [`WorkflowError::BudgetClosed`]. Tasks already
    /// running finish normally.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Wait until every submitted task has completed, including tasks
    /// submitted by other tasks while the drain is in progress.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn name(s: &str) -> TemplateName {
        TemplateName::new(s)
    }

    #[test]
    fn capacity_one_is_raised_to_two() {
        assert_eq!(WorkerBudget::for_template_threads(1).capacity(), 2);
        assert_eq!(WorkerBudget::for_template_threads(0).capacity(), 2);
        assert_eq!(WorkerBudget::for_template_threads(25).capacity(), 25);
    }

    #[test]
    fn oversized_thread_count_is_capped() {
        let budget = WorkerBudget::for_template_threads(usize::MAX);
        assert_eq!(budget.capacity(), Semaphore::MAX_PERMITS);
        assert_eq!(budget.available(), Semaphore::MAX_PERMITS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_capacity() {
        let budget = WorkerBudget::for_template_threads(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for i in 0..12 {
            let running = running.clone();
            let peak = peak.clone();
            budget
                .submit(name(&format!("task-{i}")), async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }
        budget.drain().await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(budget.in_flight(), 0);
        assert_eq!(budget.available(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn drain_waits_for_nested_submissions() {
        let budget = WorkerBudget::for_template_threads(1);
        let completed = Arc::new(AtomicUsize::new(0));

        let inner_budget = budget.clone();
        let inner_completed = completed.clone();
        budget
            .submit(name("parent"), async move {
                let deeper_budget = inner_budget.clone();
                let deeper_completed = inner_completed.clone();
                inner_budget.submit(name("child"), async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    let leaf_completed = deeper_completed.clone();
                    deeper_budget.submit(name("grandchild"), async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        leaf_completed.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })?;
                    deeper_completed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })?;
                inner_completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        budget.drain().await;
        assert_eq!(completed.load(Ordering::SeqCst), 3);
    }

    fn fan_out(budget: WorkerBudget, depth: usize, done: Arc<AtomicUsize>) -> WorkflowResult<()> {
        if depth == 0 {
            done.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
        for i in 0..3 {
            let child_budget = budget.clone();
            let child_done = done.clone();
            budget.submit(name(&format!("level-{depth}-{i}")), async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                fan_out(child_budget, depth - 1, child_done)
            })?;
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn wide_and_deep_tree_finishes_on_smallest_budget() {
        let budget = WorkerBudget::for_template_threads(1);
        let done = Arc::new(AtomicUsize::new(0));

        for root in 0..3 {
            let root_budget = budget.clone();
            let root_done = done.clone();
            budget
                .run_inline(&name(&format!("root-{root}")), async move {
                    fan_out(root_budget, 4, root_done)
                })
                .await
                .unwrap();
        }
        tokio::time::timeout(Duration::from_secs(5), budget.drain())
            .await
            .expect("tree did not drain");

        assert_eq!(done.load(Ordering::SeqCst), 3 * 81);
        assert_eq!(budget.available(), 2);
    }

    #[tokio::test]
    async fn inline_task_errors_are_logged_not_returned() {
        let budget = WorkerBudget::for_template_threads(2);
        let ran = budget
            .run_inline(&name("failing"), async {
                Err(WorkflowError::check(&name("failing"), anyhow::anyhow!("refused")))
            })
            .await;

        assert!(ran.is_ok());
        assert_eq!(budget.available(), 2);
    }

    #[tokio::test]
    async fn task_errors_do_not_reach_submitter() {
        let budget = WorkerBudget::for_template_threads(2);
        let submitted = budget.submit(name("failing"), async {
            Err(WorkflowError::check(
                &TemplateName::new("failing"),
                anyhow::anyhow!("timeout"),
            ))
        });

        assert!(submitted.is_ok());
        budget.drain().await;
        assert_eq!(budget.available(), 2);
    }

    #[tokio::test]
    async fn closed_budget_rejects_work() {
        let budget = WorkerBudget::for_template_threads(2);
        budget.close();
        assert!(budget.is_closed());

        let submitted = budget.submit(name("late"), async { Ok(()) });
        assert!(matches!(submitted, Err(WorkflowError::BudgetClosed)));

        let inline = budget.run_inline(&name("late-root"), async { Ok(()) }).await;
        assert!(matches!(inline, Err(WorkflowError::BudgetClosed)));

        budget.drain().await;
        assert_eq!(budget.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn closing_drops_queued_tasks() {
        let budget = WorkerBudget::for_template_threads(2);
        let started = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = tokio::sync::watch::channel(false);

        for i in 0..4 {
            let started = started.clone();
            let mut release = release_rx.clone();
            budget
                .submit(name(&format!("queued-{i}")), async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    let _ = release.wait_for(|go| *go).await;
                    Ok(())
                })
                .unwrap();
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while started.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first tasks never started");

        budget.close();
        release_tx.send(true).unwrap();
        budget.drain().await;

        assert_eq!(started.load(Ordering::SeqCst), 2);
    }
}
