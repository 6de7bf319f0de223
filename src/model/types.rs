use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::search::matcher;

/// A person in the roster.
///
/// Names are reference-counted so the dataset and every published result
/// sequence share the same text without copying it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub first_name: Arc<str>,
    pub last_name: Arc<str>,
}

impl Record {
    pub fn new(first_name: impl Into<Arc<str>>, last_name: impl Into<Arc<str>>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Check whether this record matches a raw, non-blank query string.
    ///
    /// See [`matcher::matches`] for the comparison rules.
    pub fn matches(&self, query: &str) -> bool {
        matcher::matches(self, query)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

/// Immutable, shared record collection. Cloning is a pointer copy.
pub type RecordSet = Arc<[Record]>;
