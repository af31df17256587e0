use crate::settings::EntitySettings;
use std::any::TypeId;
use std::collections::HashMap;

/// Per-type settings, one level's worth.
pub type SettingsMap = HashMap<TypeId, EntitySettings>;

/// Merges the three settings levels into one effective map per type.
///
/// Ignored properties accumulate: a property ignored at any level stays
/// ignored. Conflicting overrides resolve by precedence, global over
/// instance over attribute, while keys unique to a lower level survive
/// untouched. A `Value::Null` override is carried through as written.
/// Returns `None` when no level contributes any type.
pub fn merge_entity_settings(
    attribute: Option<&SettingsMap>,
    instance: Option<&SettingsMap>,
    global: Option<&SettingsMap>,
) -> Option<SettingsMap> {
    let mut merged = SettingsMap::new();

    // Later levels overwrite override entries, so apply lowest first.
    for level in [attribute, instance, global].into_iter().flatten() {
        for (type_id, settings) in level {
            let entry = merged.entry(*type_id).or_default();
            entry
                .ignored_properties
                .extend(settings.ignored_properties.iter().cloned());
            for (property, value) in &settings.override_properties {
                entry
                    .override_properties
                    .insert(property.clone(), value.clone());
            }
        }
    }

    if merged.is_empty() {
        None
    } else {
        Some(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::HashSet;

    struct Order;
    struct Invoice;

    fn level_for<T: 'static>(settings: EntitySettings) -> SettingsMap {
        let mut map = SettingsMap::new();
        map.insert(TypeId::of::<T>(), settings);
        map
    }

    #[test]
    fn test_three_way_merge_precedence() {
        let now = json!("2026-08-22T10:00:00Z");

        let attribute = level_for::<Order>(
            EntitySettings::new()
                .ignore("I1")
                .override_property("C1", 1)
                .override_property("C2", "A"),
        );
        let instance = level_for::<Order>(
            EntitySettings::new()
                .ignore("I1")
                .ignore("I2")
                .override_property("C2", "L")
                .override_property("C3", now.clone()),
        );
        let global = level_for::<Order>(
            EntitySettings::new()
                .ignore("I3")
                .override_property("C2", "G")
                .override_property("C4", Value::Null),
        );

        let merged = merge_entity_settings(Some(&attribute), Some(&instance), Some(&global))
            .expect("union of keys is non-empty");
        let settings = &merged[&TypeId::of::<Order>()];

        let expected_ignored: HashSet<String> =
            ["I1", "I2", "I3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(settings.ignored_properties, expected_ignored);

        assert_eq!(settings.override_for("C1"), Some(&json!(1)));
        assert_eq!(settings.override_for("C2"), Some(&json!("G")));
        assert_eq!(settings.override_for("C3"), Some(&now));
        assert_eq!(settings.override_for("C4"), Some(&Value::Null));
        assert_eq!(settings.override_properties.len(), 4);
    }

    #[test]
    fn test_all_absent_inputs_merge_to_none() {
        assert_eq!(merge_entity_settings(None, None, None), None);
    }

    #[test]
    fn test_empty_maps_merge_to_none() {
        let empty = SettingsMap::new();

        let merged = merge_entity_settings(Some(&empty), Some(&empty), Some(&empty));
        assert_eq!(merged, None);
    }

    #[test]
    fn test_single_level_is_an_identity_merge() {
        let instance =
            level_for::<Order>(EntitySettings::new().ignore("I1").override_property("C1", 1));

        let merged = merge_entity_settings(None, Some(&instance), None).expect("one key present");

        assert_eq!(merged, instance);
    }

    #[test]
    fn test_types_merge_independently() {
        let attribute = level_for::<Order>(EntitySettings::new().ignore("order_secret"));
        let global = level_for::<Invoice>(EntitySettings::new().override_property("source", "web"));

        let merged =
            merge_entity_settings(Some(&attribute), None, Some(&global)).expect("two keys");

        assert_eq!(merged.len(), 2);
        assert!(merged[&TypeId::of::<Order>()].is_ignored("order_secret"));
        assert_eq!(
            merged[&TypeId::of::<Invoice>()].override_for("source"),
            Some(&json!("web"))
        );
    }

    #[test]
    fn test_null_override_beats_concrete_lower_level_value() {
        let instance = level_for::<Order>(EntitySettings::new().override_property("user", "dba"));
        let global = level_for::<Order>(EntitySettings::new().override_property("user", Value::Null));

        let merged = merge_entity_settings(None, Some(&instance), Some(&global)).expect("merged");

        assert_eq!(
            merged[&TypeId::of::<Order>()].override_for("user"),
            Some(&Value::Null)
        );
    }
}
