use serde::{Deserialize, Serialize};

/// UI filter selections. Every key is optional; values come from the
/// front-end's enumerated option lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_camera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
}

impl SelectorMap {
    /// Populated selectors as `(key, value)` pairs in a fixed key order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("ram", &self.ram),
            ("rom", &self.rom),
            ("battery", &self.battery),
            ("main_camera", &self.main_camera),
            ("camera", &self.camera),
            ("benchmark", &self.benchmark),
            ("price_range", &self.price_range),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|value| (key, value)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
