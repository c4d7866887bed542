//! Attribute values that remember whether they are known

use serde::{Deserialize, Serialize};

/// A single attribute value crossing the state boundary.
///
/// `Unknown` means the orchestrator has not determined the value yet (it is
/// computed from something not yet applied). `Null` means the value is absent.
/// The two are never interchangeable: credential resolution defers on
/// `Unknown` and falls back to the environment on `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum AttrValue<T> {
    Known(T),
    Unknown,
    Null,
}

impl<T> Default for AttrValue<T> {
    fn default() -> Self {
        AttrValue::Null
    }
}

impl<T> AttrValue<T> {
    pub fn known(value: impl Into<T>) -> Self {
        AttrValue::Known(value.into())
    }

    pub fn is_known(&self) -> bool {
        matches!(self, AttrValue::Known(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, AttrValue::Unknown)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn as_known(&self) -> Option<&T> {
        match self {
            AttrValue::Known(v) => Some(v),
            _ => None,
        }
    }
}

impl AttrValue<String> {
    /// The known string, or `""` when unknown or null
    pub fn as_str(&self) -> &str {
        self.as_known().map(String::as_str).unwrap_or_default()
    }
}

impl<T> From<Option<T>> for AttrValue<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => AttrValue::Known(v),
            None => AttrValue::Null,
        }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for AttrValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Known(v) => write!(f, "{}", v),
            AttrValue::Unknown => write!(f, "(known after apply)"),
            AttrValue::Null => write!(f, "null"),
        }
    }
}
