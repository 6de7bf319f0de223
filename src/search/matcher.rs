//! Name matching used by the search pipeline.
//!
//! A record matches when the query is a case-insensitive substring of one of
//! three renderings of its name:
//!
//! - `first_name + last_name` (`"RyanWinthrop"`)
//! - `first_name + " " + last_name` (`"Ryan Winthrop"`)
//! - first letter of the first name, a space, last letter of the last name (`"R p"`)
//!
//! Blank queries are handled by the caller and never reach [`matches`].

use crate::model::types::Record;

/// Returns true if `query` occurs, ignoring case, in any comparison string of `record`.
pub fn matches(record: &Record, query: &str) -> bool {
    let needle = query.to_lowercase();
    comparison_strings(record)
        .iter()
        .any(|candidate| candidate.to_lowercase().contains(&needle))
}

/// The three strings a query is tested against, in a fixed order.
pub fn comparison_strings(record: &Record) -> [String; 3] {
    let first = &*record.first_name;
    let last = &*record.last_name;

    let mut letters = String::with_capacity(3);
    letters.extend(first.chars().next());
    letters.push(' ');
    letters.extend(last.chars().next_back());

    [format!("{first}{last}"), format!("{first} {last}"), letters]
}

/// Filter `records` by `query`, preserving input order.
pub fn filter<'a, I>(records: I, query: &str) -> Vec<Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter(|r| matches(r, query))
        .cloned()
        .collect()
}
