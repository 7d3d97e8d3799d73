use std::fmt;

use serde::{Deserialize, Serialize};

/// Criterion types the generative AI is allowed to emit.
pub const ALLOWED_CRITERION_TYPES: &[&str] = &[
    "ram",
    "rom",
    "battery",
    "benchmark",
    "screen_size",
    "main_camera",
    "secondary_camera",
    "tertiary_camera",
    "front_camera",
    "refresh_rate",
    "processor",
    "price_interval",
];

pub const FREE_TEXT_TYPE: &str = "free_text";
pub const PRICE_INTERVAL_TYPE: &str = "price_interval";

/// Types that only ever count toward "the user gave a budget".
pub const PRICE_TYPES: &[&str] = &["price_interval", "price_range", "price", "cost"];

pub fn is_allowed_type(kind: &str) -> bool {
    ALLOWED_CRITERION_TYPES.contains(&kind)
}

/// A single typed search constraint, e.g. `{ "type": "ram", "description": "8" }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl Criterion {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self { kind: kind.into(), description: description.into() }
    }

    pub fn free_text(description: impl Into<String>) -> Self {
        Self::new(FREE_TEXT_TYPE, description)
    }

    /// Trimmed copy, or `None` when either side is blank.
    pub fn normalized(&self) -> Option<Self> {
        let kind = self.kind.trim();
        let description = self.description.trim();
        if kind.is_empty() || description.is_empty() {
            return None;
        }
        Some(Self::new(kind, description))
    }

    pub fn is_free_text(&self) -> bool {
        self.kind == FREE_TEXT_TYPE
    }

    /// Case-insensitive `type::description` identity used for deduplication.
    pub fn dedup_key(&self) -> String {
        format!("{}::{}", self.kind.to_lowercase(), self.description.to_lowercase())
    }
}

/// Coarse preference bucket derived from criterion types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    Camera,
    Battery,
    Price,
    Performance,
}

impl Aspect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Battery => "battery",
            Self::Price => "price",
            Self::Performance => "performance",
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality tier inferred from free text, ordered from strongest to weakest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceLevel {
    Top,
    Good,
    Ok,
    Basic,
}

impl PreferenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Good => "good",
            Self::Ok => "ok",
            Self::Basic => "basic",
        }
    }
}

impl fmt::Display for PreferenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive budget band, rendered as `min-max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceRange {
    pub min: u32,
    pub max: u32,
}

impl PriceRange {
    pub const OPEN_CEILING: u32 = 99_999;

    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}
