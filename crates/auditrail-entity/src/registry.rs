use crate::descriptor::EntityDescriptor;
use crate::error::{EntityError, Result};
use crate::merge::{merge_entity_settings, SettingsMap};
use crate::settings::EntitySettings;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Cache of entity descriptors, one per audited type.
///
/// Descriptors are built once at configuration time; scopes on any thread
/// may then build shadows through a shared registry handle.
#[derive(Default)]
pub struct DescriptorRegistry {
    descriptors: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the descriptor for `T`.
    pub fn register<T: 'static>(&self, descriptor: EntityDescriptor<T>) {
        tracing::debug!(
            "Registered entity descriptor: {}",
            descriptor.type_name()
        );
        let mut descriptors = self
            .descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        descriptors.insert(TypeId::of::<T>(), Arc::new(descriptor));
    }

    pub fn descriptor<T: 'static>(&self) -> Option<Arc<EntityDescriptor<T>>> {
        let descriptors = self
            .descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        descriptors
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.clone().downcast::<EntityDescriptor<T>>().ok())
    }

    pub fn contains<T: 'static>(&self) -> bool {
        let descriptors = self
            .descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        descriptors.contains_key(&TypeId::of::<T>())
    }

    /// Builds the audit shadow for `source` through the cached descriptor.
    pub fn shadow<T: 'static>(
        &self,
        source: &T,
        settings: Option<&EntitySettings>,
    ) -> Result<Value> {
        let descriptor = self
            .descriptor::<T>()
            .ok_or(EntityError::MissingDescriptor(std::any::type_name::<T>()))?;
        Ok(descriptor.shadow(source, settings))
    }

    pub fn clear(&self) {
        let mut descriptors = self
            .descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        descriptors.clear();
    }
}

/// The three entity-settings levels, ready to merge.
///
/// Attribute-level settings come with the type declaration, instance-level
/// from one configured context, global-level from process-wide defaults.
#[derive(Default)]
pub struct EntityAuditConfig {
    attribute: RwLock<SettingsMap>,
    instance: RwLock<SettingsMap>,
    global: RwLock<SettingsMap>,
}

impl EntityAuditConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attribute<T: 'static>(&self, settings: EntitySettings) {
        let mut level = self
            .attribute
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        level.insert(TypeId::of::<T>(), settings);
    }

    pub fn set_instance<T: 'static>(&self, settings: EntitySettings) {
        let mut level = self
            .instance
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        level.insert(TypeId::of::<T>(), settings);
    }

    pub fn set_global<T: 'static>(&self, settings: EntitySettings) {
        let mut level = self.global.write().unwrap_or_else(PoisonError::into_inner);
        level.insert(TypeId::of::<T>(), settings);
    }

    /// Effective settings per type after the three-way merge.
    pub fn effective(&self) -> Option<SettingsMap> {
        let attribute = self
            .attribute
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let instance = self.instance.read().unwrap_or_else(PoisonError::into_inner);
        let global = self.global.read().unwrap_or_else(PoisonError::into_inner);
        merge_entity_settings(Some(&attribute), Some(&instance), Some(&global))
    }

    /// Effective settings for one type.
    pub fn effective_for<T: 'static>(&self) -> Option<EntitySettings> {
        let mut merged = self.effective()?;
        merged.remove(&TypeId::of::<T>())
    }
}
