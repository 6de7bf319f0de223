//! Query-to-results state machine.
//!
//! One [`Pipeline`] runs per live [`SearchStore`](super::SearchStore). It moves
//! through three phases:
//!
//! ```text
//!   Idle ──change──▶ Debouncing ──quiet for `debounce`──▶ Filtering
//!    ▲                 ▲    │                                 │
//!    │                 └────┘ change: restart window          │
//!    │                 ▲                                      │
//!    │                 └─── change: cancel work, busy stays on┤
//!    │                                                        │
//!    └──────────── results published, busy = false ◀─────────┘
//! ```
//!
//! Blank queries skip `Filtering`: the full record set is published as soon
//! as they settle.
//!
//! Filtering work runs in its own task stamped with a generation. Entering a
//! new phase for a new input cancels the current [`WorkToken`]; a completion
//! whose generation is not the current one is dropped, so a superseded search
//! can never publish.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::Timing;
use super::matcher;
use super::state::Publisher;
use super::token::{GenerationClock, WorkToken};
use crate::model::types::RecordSet;

/// Current phase of the pipeline.
#[derive(Debug)]
pub(crate) enum Phase {
    /// Last settled query is resolved; waiting for input.
    Idle,
    /// Waiting for `text` to stay unchanged until `deadline`.
    Debouncing { text: String, deadline: Instant },
    /// `text` has settled and a filter job is in flight.
    Filtering { text: String, work: WorkToken },
}

#[derive(Debug)]
struct Completion {
    generation: u64,
    results: RecordSet,
}

pub(crate) struct Pipeline {
    records: RecordSet,
    timing: Timing,
    query: watch::Receiver<String>,
    publisher: Publisher,
    shutdown: CancellationToken,
    clock: GenerationClock,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
}

impl Pipeline {
    pub fn new(
        records: RecordSet,
        timing: Timing,
        query: watch::Receiver<String>,
        publisher: Publisher,
        shutdown: CancellationToken,
    ) -> Self {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        Self {
            records,
            timing,
            query,
            publisher,
            shutdown,
            clock: GenerationClock::default(),
            completions_tx,
            completions,
        }
    }

    /// Drives the state machine until shutdown or until the query source is gone.
    ///
    /// The current query value is treated as fresh input, so a (re)started
    /// pipeline always runs one debounce cycle for it.
    pub async fn run(mut self) {
        let initial = self.query.borrow_and_update().clone();
        debug!(query = %initial, "pipeline_started");
        let mut phase = self.debounce(initial);

        loop {
            phase = match phase {
                Phase::Idle => tokio::select! {
                    () = self.shutdown.cancelled() => break,
                    changed = self.query.changed() => match changed {
                        Ok(()) => self.next_input(),
                        Err(_) => break,
                    },
                },
                Phase::Debouncing { text, deadline } => tokio::select! {
                    () = self.shutdown.cancelled() => break,
                    changed = self.query.changed() => match changed {
                        Ok(()) => {
                            trace!(query = %text, "debounce_superseded");
                            self.next_input()
                        }
                        Err(_) => break,
                    },
                    () = sleep_until(deadline) => self.settle(text),
                },
                Phase::Filtering { text, work } => tokio::select! {
                    () = self.shutdown.cancelled() => {
                        work.cancel();
                        break;
                    }
                    changed = self.query.changed() => {
                        work.cancel();
                        info!(query = %text, generation = work.generation(), "search_superseded");
                        match changed {
                            Ok(()) => self.next_input(),
                            Err(_) => break,
                        }
                    }
                    Some(done) = self.completions.recv() => self.complete(text, work, done),
                },
            };
        }

        debug!("pipeline_stopped");
    }

    fn next_input(&mut self) -> Phase {
        let text = self.query.borrow_and_update().clone();
        self.debounce(text)
    }

    fn debounce(&self, text: String) -> Phase {
        trace!(query = %text, "debounce_started");
        Phase::Debouncing {
            text,
            deadline: Instant::now() + self.timing.debounce,
        }
    }

    /// Turns the busy flag on and starts resolving `text`.
    fn settle(&mut self, text: String) -> Phase {
        debug!(query = %text, "search_settled");
        self.publisher.set_busy(true);

        if text.trim().is_empty() {
            self.publisher.set_results(&text, Arc::clone(&self.records));
            self.publisher.set_busy(false);
            info!(query = %text, matched = self.records.len(), "search_complete");
            return Phase::Idle;
        }

        let work = WorkToken::new(self.clock.next(), self.shutdown.child_token());
        self.spawn_filter(text.clone(), work.clone());
        Phase::Filtering { text, work }
    }

    fn spawn_filter(&self, text: String, work: WorkToken) {
        let records = Arc::clone(&self.records);
        let latency = self.timing.filter_latency;
        let tx = self.completions_tx.clone();
        debug!(query = %text, generation = work.generation(), "filter_started");

        tokio::spawn(async move {
            tokio::select! {
                () = work.cancelled() => return,
                () = sleep(latency) => {}
            }
            let results: RecordSet = matcher::filter(records.iter(), &text).into();
            if work.is_cancelled() {
                return;
            }
            let _ = tx.send(Completion {
                generation: work.generation(),
                results,
            });
        });
    }

    fn complete(&mut self, text: String, work: WorkToken, done: Completion) -> Phase {
        if done.generation != work.generation() {
            debug!(
                generation = done.generation,
                current = work.generation(),
                "stale_result_dropped"
            );
            return Phase::Filtering { text, work };
        }

        let matched = done.results.len();
        self.publisher.set_results(&text, done.results);
        self.publisher.set_busy(false);
        info!(query = %text, matched, "search_complete");
        Phase::Idle
    }
}
