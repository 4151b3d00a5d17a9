//! Provenance history.
//!
//! Each transform appends an entry to the `history` attribute of the output, and optionally to a JSON
//! `history_json` attribute.
//!
//! The entries are placed in the first top-level `*_GLOBAL` attribute table that already has a `history`
//! attribute, otherwise at the top level of the dataset attributes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    attributes::is_global_container,
    source::{AttributeValue, Attributes},
};

/// The name of the text history attribute.
pub const HISTORY_ATTRIBUTE: &str = "history";

/// The name of the JSON history attribute.
pub const HISTORY_JSON_ATTRIBUTE: &str = "history_json";

/// The schema of JSON history entries.
pub const HISTORY_JSON_SCHEMA: &str =
    "https://harmony.earthdata.nasa.gov/schemas/history/0.1.0/history-0.1.0.json";

/// Describes the request recorded in the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryOptions {
    request_url: String,
    program: String,
    version: String,
    time: Option<DateTime<Utc>>,
}

impl HistoryOptions {
    /// Create history options for a request to `request_url`, recorded as made by this crate.
    #[must_use]
    pub fn new(request_url: &str) -> Self {
        Self {
            request_url: request_url.to_string(),
            program: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            time: None,
        }
    }

    /// Set the program name and version recorded in the history.
    #[must_use]
    pub fn with_program(mut self, program: &str, version: &str) -> Self {
        self.program = program.to_string();
        self.version = version.to_string();
        self
    }

    /// Record `time` instead of the current time.
    #[must_use]
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// The request URL.
    #[must_use]
    pub fn request_url(&self) -> &str {
        &self.request_url
    }

    /// The program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The program version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    fn time(&self) -> DateTime<Utc> {
        self.time.unwrap_or_else(Utc::now)
    }
}

#[derive(Serialize)]
struct HistoryJsonEntry<'a> {
    #[serde(rename = "$schema")]
    schema: &'static str,
    date_time: String,
    program: &'a str,
    version: &'a str,
    parameters: [HistoryJsonParameters<'a>; 1],
}

#[derive(Serialize)]
struct HistoryJsonParameters<'a> {
    request_url: &'a str,
}

/// Create a text history entry: `<timestamp> <program> <request url>`, ending with a newline.
#[must_use]
pub fn history_entry(options: &HistoryOptions) -> String {
    format!(
        "{} {} {}\n",
        options.time().format("%Y-%m-%d %H:%M:%S"),
        options.program,
        options.request_url
    )
}

/// Create a JSON history entry.
#[must_use]
pub fn history_json_entry(options: &HistoryOptions) -> serde_json::Value {
    let entry = HistoryJsonEntry {
        schema: HISTORY_JSON_SCHEMA,
        date_time: options.time().to_rfc3339(),
        program: &options.program,
        version: &options.version,
        parameters: [HistoryJsonParameters {
            request_url: &options.request_url,
        }],
    };
    serde_json::to_value(entry).unwrap_or_default()
}

/// Append history entries to the dataset `attributes`.
///
/// The text entry is appended to any existing `history` on a new line.
/// With `history_json`, the JSON entry is appended to the array held by any existing `history_json`;
/// an existing value that is not a JSON array is replaced.
pub fn update_history(attributes: &mut Attributes, options: &HistoryOptions, history_json: bool) {
    let global = attributes.iter().position(|attribute| {
        is_global_container(&attribute.name)
            && matches!(&attribute.value, AttributeValue::Container(inner) if inner.get(HISTORY_ATTRIBUTE).is_some())
    });
    match global {
        Some(position) => {
            if let Some(AttributeValue::Container(inner)) =
                attributes.iter_mut().nth(position).map(|a| &mut a.value)
            {
                append_history(inner, options, history_json);
            }
        }
        None => append_history(attributes, options, history_json),
    }
}

fn append_history(table: &mut Attributes, options: &HistoryOptions, history_json: bool) {
    let entry = history_entry(options);
    let history = match table.get(HISTORY_ATTRIBUTE).and_then(AttributeValue::joined_text) {
        Some(existing) if existing.is_empty() || existing.ends_with('\n') => existing + &entry,
        Some(existing) => existing + "\n" + &entry,
        None => entry,
    };
    table.push(HISTORY_ATTRIBUTE, AttributeValue::text(&history));

    if history_json {
        let mut entries = match table
            .get(HISTORY_JSON_ATTRIBUTE)
            .and_then(AttributeValue::joined_text)
            .map(|json| serde_json::from_str::<serde_json::Value>(&json))
        {
            Some(Ok(serde_json::Value::Array(entries))) => entries,
            Some(_) => {
                log::warn!("replacing {HISTORY_JSON_ATTRIBUTE}, which is not a JSON array");
                Vec::new()
            }
            None => Vec::new(),
        };
        entries.push(history_json_entry(options));
        let json = serde_json::Value::Array(entries).to_string();
        table.push(HISTORY_JSON_ATTRIBUTE, AttributeValue::text(&json));
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn options() -> HistoryOptions {
        HistoryOptions::new("https://example.org/data/sst.nc?sst")
            .with_program("ncflat", "0.1.0")
            .with_time(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap())
    }

    #[test]
    fn history_text() {
        assert_eq!(
            history_entry(&options()),
            "2024-03-01 12:30:05 ncflat https://example.org/data/sst.nc?sst\n"
        );

        let mut attributes =
            Attributes::new().with(HISTORY_ATTRIBUTE, AttributeValue::text("created"));
        update_history(&mut attributes, &options(), false);
        assert_eq!(
            attributes.get(HISTORY_ATTRIBUTE),
            Some(&AttributeValue::text(
                "created\n2024-03-01 12:30:05 ncflat https://example.org/data/sst.nc?sst\n"
            ))
        );
        assert!(attributes.get(HISTORY_JSON_ATTRIBUTE).is_none());
    }

    #[test]
    fn history_in_global_container() {
        let mut attributes = Attributes::new()
            .with("NC_GLOBAL", AttributeValue::Container(Attributes::new()))
            .with(
                "HDF5_GLOBAL",
                AttributeValue::Container(
                    Attributes::new().with(HISTORY_ATTRIBUTE, AttributeValue::text("created\n")),
                ),
            );
        update_history(&mut attributes, &options(), false);
        let Some(AttributeValue::Container(inner)) = attributes.get("HDF5_GLOBAL") else {
            panic!("HDF5_GLOBAL is not a container")
        };
        assert!(inner
            .get(HISTORY_ATTRIBUTE)
            .and_then(AttributeValue::joined_text)
            .unwrap()
            .starts_with("created\n2024-03-01"));
        assert!(attributes.get(HISTORY_ATTRIBUTE).is_none());
    }

    #[test]
    fn history_json() {
        let mut attributes = Attributes::new();
        update_history(&mut attributes, &options(), true);
        update_history(&mut attributes, &options(), true);
        let json = attributes
            .get(HISTORY_JSON_ATTRIBUTE)
            .and_then(AttributeValue::joined_text)
            .unwrap();
        let entries: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entries = entries.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["$schema"], HISTORY_JSON_SCHEMA);
        assert_eq!(entries[0]["program"], "ncflat");
        assert_eq!(
            entries[0]["parameters"][0]["request_url"],
            "https://example.org/data/sst.nc?sst"
        );
        assert_eq!(entries[1]["date_time"], "2024-03-01T12:30:05+00:00");
    }
}
