//! Derived search state and the single writer that publishes it.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::model::types::RecordSet;

/// Whole-value snapshot of the derived search state.
///
/// Every publish replaces the snapshot atomically, so observers never see a
/// half-updated pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSnapshot {
    /// True from the moment a query settles until its results are published.
    pub busy: bool,
    /// Results of the last completed search.
    pub results: RecordSet,
    /// Settled query text that produced `results`; `None` until the first
    /// cycle completes.
    pub resolved_query: Option<String>,
}

impl SearchSnapshot {
    /// Snapshot of a freshly started pipeline: idle, showing every record.
    pub fn initial(records: RecordSet) -> Self {
        Self {
            busy: false,
            results: records,
            resolved_query: None,
        }
    }

    /// True when `query` has been resolved and no newer search is running.
    pub fn is_resolved(&self, query: &str) -> bool {
        !self.busy && self.resolved_query.as_deref() == Some(query)
    }
}

/// One observable transition of the derived state, in publish order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    Busy(bool),
    Results(RecordSet),
}

/// Writes snapshots and mirrors each effective change onto the event streams.
///
/// Only the pipeline driver writes, so reading the current snapshot before
/// replacing it is race-free. Events are sent before the snapshot changes:
/// whoever observes a snapshot can rely on every event leading up to it
/// already being buffered.
///
/// Each event subscriber owns an unbounded queue, so a slow reader never
/// loses transitions.
#[derive(Debug, Clone)]
pub(crate) struct Publisher {
    state: watch::Sender<SearchSnapshot>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<SearchEvent>>>>,
}

impl Publisher {
    pub fn new(initial: SearchSnapshot) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            subscribers: Arc::default(),
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SearchSnapshot> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> mpsc::UnboundedReceiver<SearchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Queues `event` for every live subscriber, dropping closed ones.
    fn emit(&self, event: SearchEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> SearchSnapshot {
        self.state.borrow().clone()
    }

    /// Sets the busy flag; publishes nothing if it already has that value.
    pub fn set_busy(&self, busy: bool) {
        if self.state.borrow().busy == busy {
            return;
        }
        self.emit(SearchEvent::Busy(busy));
        self.state.send_modify(|s| s.busy = busy);
    }

    /// Publishes the results of a completed search for `query`.
    ///
    /// Observers are only woken when the results or the resolved query
    /// actually change; a `Results` event is only emitted for new results.
    pub fn set_results(&self, query: &str, results: RecordSet) {
        let (results_changed, query_changed) = {
            let current = self.state.borrow();
            (
                current.results != results,
                current.resolved_query.as_deref() != Some(query),
            )
        };
        if results_changed {
            self.emit(SearchEvent::Results(Arc::clone(&results)));
        }
        if results_changed || query_changed {
            self.state.send_modify(|s| {
                s.results = results;
                s.resolved_query = Some(query.to_string());
            });
        }
    }
}
