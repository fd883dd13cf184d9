//! Run settings chosen at initiate time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Setting key: update destination products that share a SKU.
pub const SETTING_UPDATE_BY_SKU: &str = "update-by-sku";

/// Setting key: delete the destination's demo products first.
pub const SETTING_DELETE_DEMO: &str = "delete-demo";

/// Settings of one migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Update an existing destination product with the same SKU instead of
    /// creating a duplicate.
    #[serde(rename = "update-by-sku", default)]
    pub update_existing_by_sku: bool,
    /// Delete demo products from the destination before importing.
    #[serde(rename = "delete-demo", default)]
    pub delete_demo_catalog: bool,
}

impl Settings {
    /// Builds settings from caller input, keeping only recognized keys.
    ///
    /// Values are read with JSON truthiness: `true`, non-zero numbers and
    /// non-empty strings other than `"0"` and `"false"` enable a setting.
    pub fn normalize(raw: &BTreeMap<String, Value>) -> Self {
        Self {
            update_existing_by_sku: raw.get(SETTING_UPDATE_BY_SKU).is_some_and(truthy),
            delete_demo_catalog: raw.get(SETTING_DELETE_DEMO).is_some_and(truthy),
        }
    }

    /// Enables SKU matching.
    pub fn with_update_by_sku(mut self, enabled: bool) -> Self {
        self.update_existing_by_sku = enabled;
        self
    }

    /// Enables demo deletion.
    pub fn with_delete_demo(mut self, enabled: bool) -> Self {
        self.delete_demo_catalog = enabled;
        self
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}
