// Check execution contract consumed by the workflow scheduler

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::scan::ScanContext;

/// Sending half handed to a check running in streaming mode.
///
/// The stream ends when the check drops every clone of the sender, which
/// normally happens when `execute_with_results` returns.
pub type ResultSender = UnboundedSender<ResultEvent>;

/// Receiving half consumed by the step executor.
pub type ResultReceiver = UnboundedReceiver<ResultEvent>;

/// Create a fresh result stream for one streaming check invocation.
pub fn result_channel() -> (ResultSender, ResultReceiver) {
    unbounded_channel()
}

/// A protocol-level check (HTTP, DNS, network...) as seen by the scheduler.
#[async_trait]
pub trait Check: Send + Sync {
    /// Number of requests this check will issue, for progress accounting.
    fn requests(&self) -> usize;

    /// Run the check once and report whether it matched.
    async fn execute(&self, ctx: &ScanContext) -> Result<bool>;

    /// Run the check, emitting every result event on `results` in order.
    async fn execute_with_results(&self, ctx: &ScanContext, results: ResultSender) -> Result<()>;
}

/// One event streamed by a check.
#[derive(Debug, Clone, Default)]
pub struct ResultEvent {
    /// Structured operator output. `None` means the event carries no match signal.
    pub outcome: Option<Outcome>,
}

impl ResultEvent {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome: Some(outcome),
        }
    }

    /// An event without structured output.
    pub fn empty() -> Self {
        Self { outcome: None }
    }

    /// The structured outcome, if present and not empty.
    pub fn non_empty_outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref().filter(|outcome| !outcome.is_empty())
    }
}

/// Structured result of a check's matchers and extractors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Names of the check-level matchers that fired, in firing order.
    pub matches: Vec<String>,
    /// Extractor name to extracted values, in extraction order.
    pub extracts: HashMap<String, Vec<String>>,
}

impl Outcome {
    pub fn with_match(mut self, name: impl Into<String>) -> Self {
        self.matches.push(name.into());
        self
    }

    pub fn with_extract<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extracts
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.extracts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_event_has_no_outcome() {
        assert!(ResultEvent::empty().non_empty_outcome().is_none());
        assert!(ResultEvent::new(Outcome::default()).non_empty_outcome().is_none());
    }

    #[test]
    fn extract_only_outcome_is_not_empty() {
        let outcome = Outcome::default().with_extract("ip", ["10.0.0.1"]);
        assert!(!outcome.is_empty());
        assert!(!outcome.has_matches());

        let event = ResultEvent::new(outcome);
        assert!(event.non_empty_outcome().is_some());
    }

    #[tokio::test]
    async fn result_channel_ends_when_sender_dropped() {
        let (tx, mut rx) = result_channel();
        tx.send(ResultEvent::new(Outcome::default().with_match("a")))
            .unwrap();
        drop(tx);

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
