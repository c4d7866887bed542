//! Diagnostics reported by provider operations
//!
//! Every operation returns one [`Diagnostics`] aggregate. Any error entry
//! makes the operation a failure; callers check [`Diagnostics::has_error`]
//! right after each fallible step and stop there.

use serde::{Deserialize, Serialize};

pub const CLIENT_ERROR: &str = "Client Error";
pub const UNABLE_TO_CREATE_CLIENT: &str = "Unable to create client";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Short category label, e.g. "Client Error"
    pub summary: String,

    /// Human readable detail including the underlying cause
    pub detail: String,

    /// Attribute the diagnostic points at, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.summary)?;
        if let Some(attribute) = &self.attribute {
            write!(f, " (attribute \"{}\")", attribute)?;
        }
        if !self.detail.is_empty() {
            write!(f, "\n\n{}", self.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Error, summary.into(), detail.into(), None);
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Warning, summary.into(), detail.into(), None);
    }

    pub fn add_attribute_error(
        &mut self,
        attribute: impl Into<String>,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(
            Severity::Error,
            summary.into(),
            detail.into(),
            Some(attribute.into()),
        );
    }

    /// `Client Error` for a failed remote call.
    ///
    /// The cause text is carried verbatim.
    pub fn add_client_error(&mut self, action: &str, noun: &str, cause: &dyn std::fmt::Display) {
        self.add_error(
            CLIENT_ERROR,
            format!("Unable to {} {}, got error: {}", action, noun, cause),
        );
    }

    fn push(
        &mut self,
        severity: Severity,
        summary: String,
        detail: String,
        attribute: Option<String>,
    ) {
        match severity {
            Severity::Error => tracing::debug!(%summary, %detail, "diagnostic error"),
            Severity::Warning => tracing::warn!(%summary, %detail, "diagnostic warning"),
        }
        self.entries.push(Diagnostic {
            severity,
            summary,
            detail,
            attribute,
        });
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn has_error(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, d) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_is_not_error() {
        let mut diags = Diagnostics::new();
        diags.add_warning(UNABLE_TO_CREATE_CLIENT, "Cannot use unknown value as api_key");
        assert!(!diags.has_error());
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_error_after_append() {
        let mut diags = Diagnostics::new();
        diags.add_warning("w", "");
        let mut other = Diagnostics::new();
        other.add_error("e", "boom");
        diags.append(other);
        assert!(diags.has_error());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_client_error_carries_cause_verbatim() {
        let mut diags = Diagnostics::new();
        diags.add_client_error("create", "upload mapping", &"Folder already exists");
        let err = diags.errors().next().unwrap();
        assert_eq!(err.summary, CLIENT_ERROR);
        assert_eq!(
            err.detail,
            "Unable to create upload mapping, got error: Folder already exists"
        );
    }

    #[test]
    fn test_display() {
        let mut diags = Diagnostics::new();
        diags.add_attribute_error("cloud_name", "Invalid Configuration", "empty");
        assert_eq!(
            diags.to_string(),
            "error: Invalid Configuration (attribute \"cloud_name\")\n\nempty"
        );
    }
}
