//! Lifecycle hook registration and ordered dispatch.
//!
//! Hooks attach to one of three lifecycle moments and run in registration
//! order on the thread driving the scope transition. The registry is shared
//! by every scope an [`Auditor`](crate::Auditor) creates; scopes iterate a
//! snapshot, so registrations racing an in-flight save never corrupt
//! iteration (the new hook simply applies to later transitions).

use crate::error::Result;
use crate::scope::AuditScope;
use std::sync::{Arc, PoisonError, RwLock};

/// Callback signature shared by every lifecycle moment.
///
/// Hooks receive the scope driving the transition and may mutate its event,
/// append comments, read the save mode or identifier, or discard the scope.
/// A returned error propagates to the caller of the triggering operation.
pub type ScopeHook = dyn Fn(&mut AuditScope) -> Result<()> + Send + Sync;

/// The lifecycle moments a hook can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookMoment {
    /// After the event is built, before any creation-time insert.
    ScopeCreated,
    /// At each save point, before the sink is called. Hooks here may discard.
    EventSaving,
    /// After the sink call succeeded; the event identifier is available.
    EventSaved,
}

/// Ordered, moment-keyed hook registry.
///
/// Appends take a short write lock; dispatch clones the list under a read
/// lock and iterates the snapshot outside it.
#[derive(Default)]
pub(crate) struct HookRegistry {
    created: RwLock<Vec<Arc<ScopeHook>>>,
    saving: RwLock<Vec<Arc<ScopeHook>>>,
    saved: RwLock<Vec<Arc<ScopeHook>>>,
}

impl HookRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn slot(&self, moment: HookMoment) -> &RwLock<Vec<Arc<ScopeHook>>> {
        match moment {
            HookMoment::ScopeCreated => &self.created,
            HookMoment::EventSaving => &self.saving,
            HookMoment::EventSaved => &self.saved,
        }
    }

    /// Append a hook; it applies to transitions that snapshot after this call.
    pub(crate) fn append(&self, moment: HookMoment, hook: Arc<ScopeHook>) {
        // Hook lists are append-only between resets, so a poisoned lock still
        // guards a structurally valid list.
        self.slot(moment)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    /// Clone the current hook list for one moment.
    pub(crate) fn snapshot(&self, moment: HookMoment) -> Vec<Arc<ScopeHook>> {
        self.slot(moment)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of hooks registered for one moment.
    pub(crate) fn count(&self, moment: HookMoment) -> usize {
        self.slot(moment)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop every registration, across all moments.
    pub(crate) fn clear(&self) {
        for moment in [
            HookMoment::ScopeCreated,
            HookMoment::EventSaving,
            HookMoment::EventSaved,
        ] {
            self.slot(moment)
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }
}

/// Run the snapshot in registration order, stopping at the first error.
pub(crate) fn run_hooks(hooks: &[Arc<ScopeHook>], scope: &mut AuditScope) -> Result<()> {
    for hook in hooks {
        (**hook)(scope)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<ScopeHook> {
        Arc::new(|_| Ok(()))
    }

    #[test]
    fn test_append_and_count_per_moment() {
        let registry = HookRegistry::new();
        registry.append(HookMoment::ScopeCreated, noop());
        registry.append(HookMoment::EventSaving, noop());
        registry.append(HookMoment::EventSaving, noop());

        assert_eq!(registry.count(HookMoment::ScopeCreated), 1);
        assert_eq!(registry.count(HookMoment::EventSaving), 2);
        assert_eq!(registry.count(HookMoment::EventSaved), 0);
    }

    #[test]
    fn test_snapshot_preserves_registration_order() {
        let registry = HookRegistry::new();
        let hooks: Vec<Arc<ScopeHook>> = (0..4).map(|_| noop()).collect();
        for hook in &hooks {
            registry.append(HookMoment::EventSaving, hook.clone());
        }

        let snapshot = registry.snapshot(HookMoment::EventSaving);
        assert_eq!(snapshot.len(), hooks.len());
        for (registered, snapshotted) in hooks.iter().zip(&snapshot) {
            assert!(Arc::ptr_eq(registered, snapshotted));
        }
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_appends() {
        let registry = HookRegistry::new();
        registry.append(HookMoment::EventSaving, noop());

        let snapshot = registry.snapshot(HookMoment::EventSaving);
        registry.append(HookMoment::EventSaving, noop());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.count(HookMoment::EventSaving), 2);
    }

    #[test]
    fn test_clear_empties_every_moment() {
        let registry = HookRegistry::new();
        registry.append(HookMoment::ScopeCreated, noop());
        registry.append(HookMoment::EventSaving, noop());
        registry.append(HookMoment::EventSaved, noop());

        registry.clear();

        assert_eq!(registry.count(HookMoment::ScopeCreated), 0);
        assert_eq!(registry.count(HookMoment::EventSaving), 0);
        assert_eq!(registry.count(HookMoment::EventSaved), 0);
    }

    #[test]
    fn test_concurrent_append_and_snapshot() {
        let registry = Arc::new(HookRegistry::new());
        let appender = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    registry.append(HookMoment::EventSaving, Arc::new(|_| Ok(())));
                }
            })
        };

        let mut last_len = 0;
        while last_len < 200 {
            let snapshot = registry.snapshot(HookMoment::EventSaving);
            assert!(snapshot.len() >= last_len);
            last_len = snapshot.len();
        }
        appender.join().unwrap();

        assert_eq!(registry.count(HookMoment::EventSaving), 200);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Snapshots always reproduce the full registration order.
        #[test]
        fn prop_snapshot_order_matches_registration(num_hooks in 1usize..16usize) {
            let registry = HookRegistry::new();
            let hooks: Vec<Arc<ScopeHook>> = (0..num_hooks).map(|_| -> Arc<ScopeHook> { Arc::new(|_| Ok(())) }).collect();
            for hook in &hooks {
                registry.append(HookMoment::EventSaved, hook.clone());
            }

            let snapshot = registry.snapshot(HookMoment::EventSaved);
            prop_assert_eq!(snapshot.len(), num_hooks);
            for (registered, snapshotted) in hooks.iter().zip(&snapshot) {
                prop_assert!(Arc::ptr_eq(registered, snapshotted));
            }
        }
    }
}
