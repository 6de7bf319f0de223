//! Record collection supplied to the store at startup.

use std::sync::Arc;

use crate::config::RosterConfig;
use crate::model::types::{Record, RecordSet};

const SAMPLE_NAMES: [(&str, &str); 7] = [
    ("Noordeep", "Sidhu"),
    ("Ryan", "Winthrop"),
    ("Garvit", "Madaan"),
    ("John", "Smith"),
    ("Rick", "Novak"),
    ("Jeff", "Johnson"),
    ("Susan", "Roy"),
];

/// Built-in sample roster.
pub fn sample_records() -> RecordSet {
    SAMPLE_NAMES
        .iter()
        .map(|(first, last)| Record::new(*first, *last))
        .collect::<Vec<_>>()
        .into()
}

/// Records configured in `config`, falling back to [`sample_records`].
pub fn from_config(config: &RosterConfig) -> RecordSet {
    match &config.records {
        Some(records) => Arc::from(records.as_slice()),
        None => sample_records(),
    }
}
