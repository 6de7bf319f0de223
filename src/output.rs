//! Rendering of result lists for the CLI.
//!
//! - Plain - one `First Last` per line
//! - JSON - `{"query", "count", "results"}` for programmatic use
//!
//! Pipeline transitions printed by `roster watch` use the same two formats,
//! one event per line in JSON mode.

use serde::Serialize;

use crate::model::types::Record;
use crate::search::SearchEvent;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Plain }
    }
}

#[derive(Debug, Serialize)]
struct ResultsDoc<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
    count: usize,
    results: &'a [Record],
}

/// Render a result list. `query` is included in JSON output when given.
pub fn render_results(
    records: &[Record],
    query: Option<&str>,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Plain => Ok(records
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json => serde_json::to_string(&ResultsDoc {
            query,
            count: records.len(),
            results: records,
        }),
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum EventDoc<'a> {
    Busy { busy: bool },
    Results { count: usize, results: &'a [Record] },
}

/// Render one pipeline transition.
pub fn render_event(event: &SearchEvent, format: OutputFormat) -> serde_json::Result<String> {
    match (format, event) {
        (OutputFormat::Plain, SearchEvent::Busy(true)) => Ok("searching...".to_string()),
        (OutputFormat::Plain, SearchEvent::Busy(false)) => Ok("done".to_string()),
        (OutputFormat::Plain, SearchEvent::Results(records)) => {
            let mut out = format!("-- {} result(s) --", records.len());
            for record in records.iter() {
                out.push('\n');
                out.push_str(&record.to_string());
            }
            Ok(out)
        }
        (OutputFormat::Json, SearchEvent::Busy(busy)) => {
            serde_json::to_string(&EventDoc::Busy { busy: *busy })
        }
        (OutputFormat::Json, SearchEvent::Results(records)) => {
            serde_json::to_string(&EventDoc::Results {
                count: records.len(),
                results: records,
            })
        }
    }
}
