use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Audit settings for one entity type.
///
/// Settings name the properties to leave out of the audit shadow and the
/// properties to force to a fixed value. They can be declared at three
/// levels (attribute, instance, global) and merged with
/// [`merge_entity_settings`](crate::merge_entity_settings).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySettings {
    /// Property names excluded when copying the source into the shadow.
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub ignored_properties: HashSet<String>,
    /// Property values written into the shadow regardless of the source.
    /// A `Value::Null` entry is a real override, not the absence of one.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub override_properties: HashMap<String, Value>,
}

impl EntitySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes a property from the shadow.
    pub fn ignore(mut self, property: impl Into<String>) -> Self {
        self.ignored_properties.insert(property.into());
        self
    }

    /// Forces a property to a fixed value.
    pub fn override_property(
        mut self,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.override_properties.insert(property.into(), value.into());
        self
    }

    pub fn is_ignored(&self, property: &str) -> bool {
        self.ignored_properties.contains(property)
    }

    pub fn override_for(&self, property: &str) -> Option<&Value> {
        self.override_properties.get(property)
    }

    pub fn is_empty(&self) -> bool {
        self.ignored_properties.is_empty() && self.override_properties.is_empty()
    }
}
