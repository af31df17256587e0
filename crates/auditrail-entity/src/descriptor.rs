use crate::settings::EntitySettings;
use serde_json::{Map, Value};

type PropertyGetter<T> = dyn Fn(&T) -> Value + Send + Sync;

/// One named property of an audited type and how to read it.
pub struct PropertyDescriptor<T> {
    name: String,
    getter: Box<PropertyGetter<T>>,
}

impl<T> PropertyDescriptor<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read(&self, source: &T) -> Value {
        (self.getter)(source)
    }
}

/// Describes how one type maps into its audit shadow.
///
/// Built once per type and cached in a
/// [`DescriptorRegistry`](crate::DescriptorRegistry); property getters
/// replace runtime introspection of the source object.
pub struct EntityDescriptor<T> {
    type_name: &'static str,
    properties: Vec<PropertyDescriptor<T>>,
}

impl<T> EntityDescriptor<T> {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            properties: Vec::new(),
        }
    }

    /// Declares a property. Declaration order is the shadow's field order.
    pub fn property(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&T) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.properties.push(PropertyDescriptor {
            name: name.into(),
            getter: Box::new(getter),
        });
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn properties(&self) -> &[PropertyDescriptor<T>] {
        &self.properties
    }

    /// Builds the audit shadow for one source value.
    ///
    /// Copies every declared property except the ignored ones, then writes
    /// the overrides. An override lands even for a property that was
    /// ignored or never declared.
    pub fn shadow(&self, source: &T, settings: Option<&EntitySettings>) -> Value {
        let mut shadow = Map::new();
        for property in &self.properties {
            if settings.is_some_and(|s| s.is_ignored(&property.name)) {
                continue;
            }
            shadow.insert(property.name.clone(), property.read(source));
        }
        if let Some(settings) = settings {
            for (name, value) in &settings.override_properties {
                shadow.insert(name.clone(), value.clone());
            }
        }
        Value::Object(shadow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Order {
        id: u32,
        status: String,
        card_number: String,
    }

    fn descriptor() -> EntityDescriptor<Order> {
        EntityDescriptor::new("Order")
            .property("id", |o: &Order| o.id.into())
            .property("status", |o: &Order| o.status.clone().into())
            .property("card_number", |o: &Order| o.card_number.clone().into())
    }

    fn order() -> Order {
        Order {
            id: 7,
            status: "open".to_string(),
            card_number: "4111-1111".to_string(),
        }
    }

    #[test]
    fn test_shadow_copies_declared_properties() {
        let shadow = descriptor().shadow(&order(), None);

        assert_eq!(
            shadow,
            json!({"id": 7, "status": "open", "card_number": "4111-1111"})
        );
    }

    #[test]
    fn test_shadow_skips_ignored_properties() {
        let settings = EntitySettings::new().ignore("card_number");

        let shadow = descriptor().shadow(&order(), Some(&settings));

        assert_eq!(shadow, json!({"id": 7, "status": "open"}));
    }

    #[test]
    fn test_overrides_apply_after_the_copy() {
        let settings = EntitySettings::new().override_property("status", "masked");

        let shadow = descriptor().shadow(&order(), Some(&settings));

        assert_eq!(shadow["status"], json!("masked"));
        assert_eq!(shadow["id"], json!(7));
    }

    #[test]
    fn test_override_forces_an_ignored_property() {
        let settings = EntitySettings::new()
            .ignore("card_number")
            .override_property("card_number", "****");

        let shadow = descriptor().shadow(&order(), Some(&settings));

        assert_eq!(shadow["card_number"], json!("****"));
    }

    #[test]
    fn test_override_introduces_an_undeclared_property() {
        let settings = EntitySettings::new().override_property("source", "web");

        let shadow = descriptor().shadow(&order(), Some(&settings));

        assert_eq!(shadow["source"], json!("web"));
    }

    #[test]
    fn test_null_override_is_written_as_null() {
        let settings = EntitySettings::new().override_property("status", Value::Null);

        let shadow = descriptor().shadow(&order(), Some(&settings));

        let object = shadow.as_object().unwrap();
        assert!(object.contains_key("status"));
        assert_eq!(object["status"], Value::Null);
    }

    #[test]
    fn test_declaration_order_is_shadow_order() {
        let shadow = descriptor().shadow(&order(), None);

        let keys: Vec<&String> = shadow.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["id", "status", "card_number"]);
    }

    #[test]
    fn test_computed_getter() {
        let descriptor = EntityDescriptor::new("Order")
            .property("display", |o: &Order| format!("#{} ({})", o.id, o.status).into());

        let shadow = descriptor.shadow(&order(), None);

        assert_eq!(shadow["display"], json!("#7 (open)"));
    }
}
