//! Pull JSON out of free-text model responses
//!
//! Models wrap their JSON in prose or code fences. The payload is taken from
//! the first opening bracket to the last matching closing bracket. A response
//! that does not contain parseable JSON of the expected shape yields `None`;
//! callers treat that as a failed call, not as a clean file.

use crate::models::RawIssue;
use serde_json::Value;
use std::collections::HashMap;

fn extract(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Locate an embedded JSON array
pub fn extract_array(text: &str) -> Option<Vec<Value>> {
    match extract(text, '[', ']')? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Locate an embedded JSON object
pub fn extract_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    match extract(text, '{', '}')? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Parse a single-file response: an array of issue objects
pub fn parse_single(text: &str) -> Option<Vec<RawIssue>> {
    let items = extract_array(text)?;
    Some(items.iter().filter_map(RawIssue::from_value).collect())
}

/// Parse a batch response: an object keyed by path.
///
/// Every requested path is present in the result; paths the model left out
/// map to an empty list. Keys are matched after stripping a leading `./`.
pub fn parse_batch(text: &str, paths: &[&str]) -> Option<HashMap<String, Vec<RawIssue>>> {
    let map = extract_object(text)?;
    let normalized: HashMap<&str, &Value> = map
        .iter()
        .map(|(k, v)| (k.trim().trim_start_matches("./"), v))
        .collect();

    Some(
        paths
            .iter()
            .map(|path| {
                let key = path.trim_start_matches("./");
                let issues = normalized
                    .get(key)
                    .map(|v| RawIssue::list_from_value(v))
                    .unwrap_or_default();
                (path.to_string(), issues)
            })
            .collect(),
    )
}
