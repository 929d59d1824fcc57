//! Extraction of the embedded JSON state blob from category page markup.

use crate::item::Item;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use tracing::{debug, warn};

/// CSS selector for the script element carrying the embedded page state.
///
/// The element id is stable across upstream builds; the JSON *inside* it is
/// not, which is why key discovery below stays heuristic.
const STATE_SCRIPT_SELECTOR: &str = "script#hermes-state";

/// Errors surfaced while extracting the item collection from page markup.
#[derive(Debug)]
pub enum ExtractError {
    /// The markup carried no embedded-state script element.
    MissingStateBlock,
    /// The state element's content was not valid JSON.
    MalformedJson(serde_json::Error),
    /// No top-level entry of the parsed state qualified as the item wrapper.
    NoItemsKey,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStateBlock => write!(f, "no embedded state block in markup"),
            Self::MalformedJson(err) => write!(f, "state block is not valid JSON: {err}"),
            Self::NoItemsKey => write!(f, "no state entry carries an item collection"),
        }
    }
}

impl Error for ExtractError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedJson(err) => Some(err),
            Self::MissingStateBlock | Self::NoItemsKey => None,
        }
    }
}

/// Locates and parses the embedded state payload of a category page.
#[derive(Clone)]
pub struct StateExtractor {
    script: Selector,
}

impl Default for StateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl StateExtractor {
    /// Builds an extractor bound to the well-known state element selector.
    pub fn new() -> Self {
        Self {
            script: Selector::parse(STATE_SCRIPT_SELECTOR).expect("state script selector"),
        }
    }

    /// Extracts the item-bearing sub-mapping from raw page markup.
    ///
    /// The upstream page generates a different opaque wrapper key per build,
    /// so the scan takes the first top-level entry whose value contains a
    /// `b` sub-mapping with a truthy `total` field. That first-candidate
    /// rule is load-bearing: given the same document order, the result is
    /// stable and reproducible.
    pub fn extract(&self, markup: &str) -> Result<CategoryState, ExtractError> {
        let document = Html::parse_document(markup);
        let script = document
            .select(&self.script)
            .next()
            .ok_or(ExtractError::MissingStateBlock)?;

        let raw = script.text().collect::<String>();
        let state: Value =
            serde_json::from_str(raw.trim()).map_err(ExtractError::MalformedJson)?;

        let Some(entries) = state.as_object() else {
            debug!(state = %state, "parsed state is not an object");
            return Err(ExtractError::NoItemsKey);
        };

        for (key, value) in entries {
            let Some(bucket) = value.get("b").and_then(Value::as_object) else {
                continue;
            };
            if bucket.get("total").map(is_truthy).unwrap_or(false) {
                debug!(%key, "selected item wrapper entry");
                return Ok(CategoryState {
                    bucket: bucket.clone(),
                });
            }
        }

        // Full payload dump helps operators diagnose upstream format drift.
        debug!(state = %state, "no qualifying items key in parsed state");
        Err(ExtractError::NoItemsKey)
    }
}

/// The `b` sub-mapping of the selected state entry, holding one poll's
/// item collection. Transient; discarded after `items()`.
#[derive(Debug, Clone)]
pub struct CategoryState {
    bucket: Map<String, Value>,
}

impl CategoryState {
    /// Item count claimed by the payload.
    pub fn total(&self) -> u64 {
        self.bucket
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Deserializes the `products.items` sequence.
    ///
    /// Missing paths and malformed records are skipped with a warning
    /// rather than failing the iteration; one broken listing must not
    /// blind the monitor to the rest of the page.
    pub fn items(&self) -> Vec<Item> {
        let Some(records) = self
            .bucket
            .get("products")
            .and_then(|products| products.get("items"))
            .and_then(Value::as_array)
        else {
            warn!("state bucket carries no products.items sequence");
            return Vec::new();
        };

        records
            .iter()
            .filter_map(|record| match serde_json::from_value(record.clone()) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(%err, "skipping malformed item record");
                    None
                }
            })
            .collect()
    }
}

/// Python-style truthiness, matching how the upstream payload is probed.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(entries) => !entries.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}
