//! Observable search state with subscriber-scoped lifetime.
//!
//! [`SearchStore`] owns the query text and, while anyone is watching, a live
//! pipeline task deriving `(busy, results)` from it. Each [`Observer`] or
//! [`EventStream`] holds an attachment; the derived state is shared by all of
//! them and computed once.
//!
//! When the last attachment is dropped the pipeline keeps running for
//! [`Timing::linger`]. Attaching again inside that window invalidates the
//! pending teardown by bumping the linger generation. Once the window passes
//! the pipeline is cancelled and its state discarded, so the next attach starts
//! over from the current query with every record visible and `busy == false`.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, trace};

use super::Timing;
use super::pipeline::Pipeline;
use super::state::{Publisher, SearchEvent, SearchSnapshot};
use crate::model::types::RecordSet;

/// Reactive search state holder. Clones share the same state.
#[derive(Clone)]
pub struct SearchStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    records: RecordSet,
    timing: Timing,
    query: watch::Sender<String>,
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    observers: usize,
    /// Bumped on every attach and on every last-detach; a teardown timer
    /// only fires if the generation it captured is still current.
    linger_gen: u64,
    live: Option<LivePipeline>,
}

struct LivePipeline {
    publisher: Publisher,
    shutdown: CancellationToken,
}

impl Drop for LivePipeline {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl SearchStore {
    /// Creates a store over an immutable record collection.
    ///
    /// Nothing runs until the first observer attaches.
    pub fn new(records: impl Into<RecordSet>, timing: Timing) -> Self {
        let (query, _) = watch::channel(String::new());
        Self {
            inner: Arc::new(StoreInner {
                records: records.into(),
                timing,
                query,
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    pub fn records(&self) -> &RecordSet {
        &self.inner.records
    }

    pub fn timing(&self) -> Timing {
        self.inner.timing
    }

    /// Replaces the query text immediately. Debouncing happens downstream.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        let changed = self.inner.query.send_if_modified(|current| {
            if *current == text {
                return false;
            }
            *current = text;
            true
        });
        trace!(changed, "query_set");
    }

    /// Current query text.
    pub fn query(&self) -> String {
        self.inner.query.borrow().clone()
    }

    /// Watches the raw query text. Does not keep the pipeline alive.
    pub fn observe_query(&self) -> watch::Receiver<String> {
        self.inner.query.subscribe()
    }

    /// Watches the busy flag.
    pub fn observe_busy(&self) -> Observer<bool> {
        self.observe(|s| s.busy)
    }

    /// Watches the latest completed result list.
    pub fn observe_results(&self) -> Observer<RecordSet> {
        self.observe(|s| Arc::clone(&s.results))
    }

    /// Watches the whole derived snapshot.
    pub fn observe_state(&self) -> Observer<SearchSnapshot> {
        self.observe(SearchSnapshot::clone)
    }

    /// Lossless, ordered stream of busy/result transitions from now on.
    pub fn observe_events(&self) -> EventStream {
        let (attachment, publisher) = self.attach();
        EventStream {
            rx: publisher.subscribe_events(),
            _attachment: attachment,
        }
    }

    /// Sets the query and waits until its results are published.
    ///
    /// Returns `None` only if the pipeline stopped underneath the call.
    pub async fn search(&self, text: impl Into<String>) -> Option<RecordSet> {
        let text = text.into();
        let mut state = self.observe_state();
        self.set_query(text.clone());
        let snapshot = state.wait_for(|s| s.is_resolved(&text)).await?;
        Some(snapshot.results)
    }

    /// True while a pipeline is running (attached or lingering).
    pub fn is_live(&self) -> bool {
        self.inner.lifecycle.lock().live.is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lifecycle.lock().observers
    }

    fn observe<T: Clone + PartialEq>(&self, project: fn(&SearchSnapshot) -> T) -> Observer<T> {
        let (attachment, publisher) = self.attach();
        let rx = publisher.subscribe_state();
        let last = project(&rx.borrow());
        Observer {
            rx,
            project,
            last,
            _attachment: attachment,
        }
    }

    fn attach(&self) -> (Attachment, Publisher) {
        let mut lifecycle = self.inner.lifecycle.lock();
        let publisher = match &lifecycle.live {
            Some(live) => live.publisher.clone(),
            None => {
                let live = self.inner.start_pipeline();
                let publisher = live.publisher.clone();
                lifecycle.live = Some(live);
                publisher
            }
        };
        lifecycle.observers += 1;
        lifecycle.linger_gen = lifecycle.linger_gen.wrapping_add(1);
        debug!(observers = lifecycle.observers, "observer_attached");

        let attachment = Attachment {
            inner: Arc::clone(&self.inner),
        };
        (attachment, publisher)
    }
}

impl fmt::Debug for SearchStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = self.inner.lifecycle.lock();
        f.debug_struct("SearchStore")
            .field("records", &self.inner.records.len())
            .field("timing", &self.inner.timing)
            .field("query", &*self.inner.query.borrow())
            .field("observers", &lifecycle.observers)
            .field("live", &lifecycle.live.is_some())
            .finish()
    }
}

impl StoreInner {
    fn start_pipeline(&self) -> LivePipeline {
        let publisher = Publisher::new(SearchSnapshot::initial(Arc::clone(&self.records)));
        let shutdown = CancellationToken::new();
        let pipeline = Pipeline::new(
            Arc::clone(&self.records),
            self.timing,
            self.query.subscribe(),
            publisher.clone(),
            shutdown.clone(),
        );
        match runtime_handle() {
            Some(handle) => {
                handle.spawn(pipeline.run().instrument(info_span!("search_pipeline")));
            }
            None => error!("pipeline_not_started"),
        }
        LivePipeline {
            publisher,
            shutdown,
        }
    }

    fn detach(self: &Arc<Self>) {
        let generation = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.observers = lifecycle.observers.saturating_sub(1);
            debug!(observers = lifecycle.observers, "observer_detached");
            if lifecycle.observers > 0 {
                return;
            }
            lifecycle.linger_gen = lifecycle.linger_gen.wrapping_add(1);
            lifecycle.linger_gen
        };

        match runtime_handle() {
            Some(handle) if !self.timing.linger.is_zero() => {
                let deadline = Instant::now() + self.timing.linger;
                debug!(linger = ?self.timing.linger, "teardown_scheduled");
                let inner = Arc::clone(self);
                handle.spawn(async move {
                    sleep_until(deadline).await;
                    inner.check_linger_expiry(generation);
                });
            }
            _ => self.check_linger_expiry(generation),
        }
    }

    /// Tears the pipeline down if nobody attached since `generation` was issued.
    fn check_linger_expiry(&self, generation: u64) {
        let live = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.linger_gen != generation || lifecycle.observers > 0 {
                return;
            }
            lifecycle.live.take()
        };
        if live.is_some() {
            info!("pipeline_torn_down");
        }
    }
}

/// The ambient runtime, or a shared background one when called from plain
/// threads. `None` only if that background runtime could not be built.
fn runtime_handle() -> Option<Handle> {
    if let Ok(handle) = Handle::try_current() {
        return Some(handle);
    }

    static FALLBACK_RT: OnceLock<Option<Runtime>> = OnceLock::new();
    FALLBACK_RT
        .get_or_init(|| {
            Builder::new_multi_thread()
                .enable_all()
                .worker_threads(1)
                .thread_name("roster-search")
                .build()
                .inspect_err(|err| error!(%err, "fallback_runtime_failed"))
                .ok()
        })
        .as_ref()
        .map(|rt| rt.handle().clone())
}

/// Keeps the pipeline alive; detaches on drop.
struct Attachment {
    inner: Arc<StoreInner>,
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.inner.detach();
    }
}

/// Attached view of one projection of the derived search state.
///
/// Only changes of the projected value wake [`Observer::changed`].
pub struct Observer<T> {
    rx: watch::Receiver<SearchSnapshot>,
    project: fn(&SearchSnapshot) -> T,
    last: T,
    _attachment: Attachment,
}

impl<T: Clone + PartialEq> Observer<T> {
    /// Current value.
    pub fn get(&self) -> T {
        (self.project)(&self.rx.borrow())
    }

    /// Waits for the projected value to differ from the last one seen.
    pub async fn changed(&mut self) -> Option<T> {
        loop {
            self.rx.changed().await.ok()?;
            let next = (self.project)(&self.rx.borrow_and_update());
            if next != self.last {
                self.last = next.clone();
                return Some(next);
            }
        }
    }

    /// Waits until the projected value satisfies `pred`, checking the current
    /// value first.
    pub async fn wait_for(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<T> {
        let project = self.project;
        let value = {
            let snapshot = self.rx.wait_for(|s| pred(&project(s))).await.ok()?;
            project(&snapshot)
        };
        self.last = value.clone();
        Some(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").field("last", &self.last).finish()
    }
}

/// Attached, lossless stream of [`SearchEvent`]s in publish order.
///
/// Events queue up until read; a reader that falls behind still sees every
/// transition.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<SearchEvent>,
    _attachment: Attachment,
}

impl EventStream {
    /// Next transition, or `None` once the pipeline is gone.
    pub async fn next(&mut self) -> Option<SearchEvent> {
        self.rx.recv().await
    }

    /// Next already-buffered transition, without waiting.
    pub fn try_next(&mut self) -> Option<SearchEvent> {
        self.rx.try_recv().ok()
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}
