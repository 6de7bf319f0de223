//! Search layer facade.
//!
//! - **[`matcher`]**: the name predicate applied to each record.
//! - **[`store`]**: [`SearchStore`], the observable state holder and its
//!   attach/detach lifecycle.
//! - **`pipeline`**: the debounce → settle → filter state machine driven by
//!   query changes.
//! - **[`state`]**: snapshots and events published to observers.

pub mod matcher;
mod pipeline;
pub mod state;
pub mod store;
mod token;

use std::time::Duration;

pub use state::{SearchEvent, SearchSnapshot};
pub use store::{EventStream, Observer, SearchStore};

/// Time windows driving the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// How long a query must stay unchanged before it is searched.
    pub debounce: Duration,
    /// Simulated lookup latency applied to non-blank queries.
    pub filter_latency: Duration,
    /// How long the pipeline outlives its last observer.
    pub linger: Duration,
}

impl Timing {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);
    pub const DEFAULT_FILTER_LATENCY: Duration = Duration::from_millis(2000);
    pub const DEFAULT_LINGER: Duration = Duration::from_millis(5000);

    /// All windows zero; searches resolve on the next scheduler turn.
    pub const fn immediate() -> Self {
        Self {
            debounce: Duration::ZERO,
            filter_latency: Duration::ZERO,
            linger: Duration::ZERO,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce: Self::DEFAULT_DEBOUNCE,
            filter_latency: Self::DEFAULT_FILTER_LATENCY,
            linger: Self::DEFAULT_LINGER,
        }
    }
}
