//! Attribute schemas for the provider, its resources and data sources

use crate::diag::Diagnostics;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Int64,
    Float64,
    Object(BTreeMap<&'static str, AttributeType>),
}

impl AttributeType {
    /// Object type from `(name, type)` pairs
    pub fn object(fields: impl IntoIterator<Item = (&'static str, AttributeType)>) -> Self {
        AttributeType::Object(fields.into_iter().collect())
    }

    fn name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Int64 => "int64",
            AttributeType::Float64 => "float64",
            AttributeType::Object(_) => "object",
        }
    }

    /// Whether a known JSON value fits this type
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => true,
            (AttributeType::Int64, Value::Number(n)) => n.is_i64(),
            (AttributeType::Float64, Value::Number(_)) => true,
            (AttributeType::Object(_), Value::Object(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing the value replaces the object instead of updating it in place
    pub requires_replace: bool,
    pub description: &'static str,
}

impl Attribute {
    fn new(attr_type: AttributeType) -> Self {
        Self {
            attr_type,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            requires_replace: false,
            description: "",
        }
    }

    pub fn required(attr_type: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(attr_type)
        }
    }

    pub fn computed(attr_type: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(attr_type)
        }
    }

    /// Optional in configuration, filled in by the provider when absent
    pub fn optional_computed(attr_type: AttributeType) -> Self {
        Self {
            optional: true,
            computed: true,
            ..Self::new(attr_type)
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Whether users may set this attribute in configuration
    pub fn is_configurable(&self) -> bool {
        self.required || self.optional
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub description: &'static str,
    pub attributes: BTreeMap<&'static str, Attribute>,
}

impl Schema {
    pub fn new(description: &'static str) -> Self {
        Self {
            description,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Names of attributes whose change forces replacement
    pub fn replace_attributes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes
            .iter()
            .filter(|(_, a)| a.requires_replace)
            .map(|(name, _)| *name)
    }

    /// Check an encoded record against the schema.
    ///
    /// `attributes` holds values in their persisted form
    /// (`{"state": "known", "value": ...}`). When `as_config` is set, required
    /// attributes must be present and computed-only attributes must not be set.
    pub fn validate(&self, attributes: &BTreeMap<String, Value>, as_config: bool) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for name in attributes.keys() {
            if !self.attributes.contains_key(name.as_str()) {
                diags.add_attribute_error(
                    name.clone(),
                    "Unsupported Attribute",
                    format!("An attribute named \"{}\" is not expected here.", name),
                );
            }
        }

        for (name, attribute) in &self.attributes {
            let encoded = attributes.get(*name);
            let state = encoded
                .and_then(|v| v.get("state"))
                .and_then(Value::as_str)
                .unwrap_or("null");

            if as_config && attribute.required && state == "null" {
                diags.add_attribute_error(
                    *name,
                    "Missing Required Attribute",
                    format!("The argument \"{}\" is required, but no definition was found.", name),
                );
            }

            if as_config && !attribute.is_configurable() && state == "known" {
                diags.add_attribute_error(
                    *name,
                    "Invalid Configuration",
                    format!("\"{}\" is computed by the provider and cannot be set.", name),
                );
            }

            if state == "known" {
                let value = encoded.and_then(|v| v.get("value")).unwrap_or(&Value::Null);
                if !attribute.attr_type.accepts(value) {
                    diags.add_attribute_error(
                        *name,
                        "Value Conversion Error",
                        format!(
                            "Expected a {} value for \"{}\", got {}.",
                            attribute.attr_type.name(),
                            name,
                            value
                        ),
                    );
                }
            }
        }

        diags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping_schema() -> Schema {
        Schema::new("test")
            .with_attribute(
                "folder",
                Attribute::required(AttributeType::String).requires_replace(),
            )
            .with_attribute("id", Attribute::computed(AttributeType::String))
            .with_attribute("template", Attribute::required(AttributeType::String))
    }

    fn attrs(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_valid_config() {
        let a = attrs(&[
            ("folder", json!({"state": "known", "value": "example"})),
            ("id", json!({"state": "null"})),
            ("template", json!({"state": "unknown"})),
        ]);
        assert!(mapping_schema().validate(&a, true).is_empty());
    }

    #[test]
    fn test_missing_required() {
        let a = attrs(&[("template", json!({"state": "known", "value": "t"}))]);
        let diags = mapping_schema().validate(&a, true);
        assert!(diags.has_error());
        assert_eq!(
            diags.errors().next().unwrap().attribute.as_deref(),
            Some("folder")
        );
    }

    #[test]
    fn test_computed_cannot_be_configured() {
        let a = attrs(&[
            ("folder", json!({"state": "known", "value": "f"})),
            ("id", json!({"state": "known", "value": "f"})),
            ("template", json!({"state": "known", "value": "t"})),
        ]);
        assert!(mapping_schema().validate(&a, true).has_error());
        assert!(!mapping_schema().validate(&a, false).has_error());
    }

    #[test]
    fn test_type_mismatch_and_unknown_key() {
        let a = attrs(&[
            ("folder", json!({"state": "known", "value": 3})),
            ("extra", json!({"state": "null"})),
        ]);
        let diags = mapping_schema().validate(&a, false);
        let summaries: Vec<_> = diags.errors().map(|d| d.summary.as_str()).collect();
        assert!(summaries.contains(&"Value Conversion Error"));
        assert!(summaries.contains(&"Unsupported Attribute"));
    }

    #[test]
    fn test_replace_attributes() {
        let names: Vec<_> = mapping_schema().replace_attributes().collect();
        assert_eq!(names, vec!["folder"]);
    }
}
