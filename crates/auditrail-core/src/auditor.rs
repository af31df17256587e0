//! Shared audit configuration and scope creation.

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::hooks::{HookMoment, HookRegistry, ScopeHook};
use crate::policy::CreationPolicy;
use crate::scope::{AuditScope, ScopeBuilder};
use crate::sink::AuditSink;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

struct Inner {
    sink: RwLock<Option<Arc<dyn AuditSink>>>,
    policy: RwLock<CreationPolicy>,
    disabled: AtomicBool,
    clock: RwLock<Arc<dyn Clock>>,
    hooks: HookRegistry,
}

/// Entry point of the crate: holds the sink, creation policy, lifecycle
/// hooks and clock shared by the scopes it creates.
///
/// `Auditor` is a cheap clonable handle; clones see the same underlying
/// configuration, and settings may be changed at any time. A scope reads
/// the configuration once when it begins, so changes apply to scopes
/// created afterwards and never to scopes already in flight.
///
/// # Examples
///
/// ```
/// use auditrail_core::{Auditor, MemorySink};
///
/// let auditor = Auditor::builder().sink(MemorySink::new()).build();
///
/// let mut scope = auditor.scope("order:update").begin()?;
/// scope.set_custom_field("order_id", 1234);
/// scope.complete()?;
/// # Ok::<(), auditrail_core::AuditError>(())
/// ```
#[derive(Clone)]
pub struct Auditor {
    inner: Arc<Inner>,
}

impl Auditor {
    /// Create an auditor with no sink, the default creation policy, the
    /// system clock and no hooks.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                sink: RwLock::new(None),
                policy: RwLock::new(CreationPolicy::default()),
                disabled: AtomicBool::new(false),
                clock: RwLock::new(Arc::new(SystemClock)),
                hooks: HookRegistry::new(),
            }),
        }
    }

    pub fn builder() -> AuditorBuilder {
        AuditorBuilder::new()
    }

    /// Replace the sink used by scopes created from now on.
    pub fn set_sink(&self, sink: Arc<dyn AuditSink>) {
        *self
            .inner
            .sink
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    /// The currently configured sink, if any.
    pub fn sink(&self) -> Option<Arc<dyn AuditSink>> {
        self.inner
            .sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the default creation policy for scopes created from now on.
    pub fn set_creation_policy(&self, policy: CreationPolicy) {
        *self
            .inner
            .policy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = policy;
    }

    pub fn creation_policy(&self) -> CreationPolicy {
        *self
            .inner
            .policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop persisting events. Scopes still run their lifecycle and hooks
    /// observing creation still fire, but nothing reaches the sink.
    pub fn disable(&self) {
        self.inner.disabled.store(true, Ordering::Relaxed);
    }

    /// Resume persisting events.
    pub fn enable(&self) {
        self.inner.disabled.store(false, Ordering::Relaxed);
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.inner.disabled.store(disabled, Ordering::Relaxed);
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.disabled.load(Ordering::Relaxed)
    }

    /// Replace the clock used to timestamp scopes created from now on.
    /// Scopes already in flight keep the clock they started with.
    pub fn set_clock(&self, clock: Arc<dyn Clock>) {
        *self
            .inner
            .clock
            .write()
            .unwrap_or_else(PoisonError::into_inner) = clock;
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.inner
            .clock
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Attach a hook to `moment`. Hooks run in registration order; a scope
    /// transition already in flight keeps the hook list it snapshotted.
    pub fn add_hook(
        &self,
        moment: HookMoment,
        hook: impl Fn(&mut AuditScope) -> Result<()> + Send + Sync + 'static,
    ) {
        self.inner.hooks.append(moment, Arc::new(hook));
    }

    /// Run `f` right after each scope builds its event, before any
    /// creation-time insert.
    pub fn on_scope_created(
        &self,
        f: impl Fn(&mut AuditScope) -> Result<()> + Send + Sync + 'static,
    ) {
        self.add_hook(HookMoment::ScopeCreated, f);
    }

    /// Run `f` at each save point before the sink is called. The hook may
    /// mutate the event or discard the scope to veto the write.
    pub fn on_event_saving(
        &self,
        f: impl Fn(&mut AuditScope) -> Result<()> + Send + Sync + 'static,
    ) {
        self.add_hook(HookMoment::EventSaving, f);
    }

    /// Run `f` after each successful sink call.
    pub fn on_event_saved(
        &self,
        f: impl Fn(&mut AuditScope) -> Result<()> + Send + Sync + 'static,
    ) {
        self.add_hook(HookMoment::EventSaved, f);
    }

    /// Drop every registered hook.
    pub fn clear_hooks(&self) {
        self.inner.hooks.clear();
    }

    pub(crate) fn hooks(&self) -> &HookRegistry {
        &self.inner.hooks
    }

    /// Start building a scope for an operation of the given type.
    pub fn scope(&self, event_type: impl Into<String>) -> ScopeBuilder {
        ScopeBuilder::new(self.clone(), event_type.into())
    }

    /// Record a one-shot event: the scope is created, inserted and
    /// completed in a single call.
    pub fn log<K, V>(
        &self,
        event_type: impl Into<String>,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Result<()>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut builder = self
            .scope(event_type)
            .creation_policy(CreationPolicy::InsertOnStart);
        for (key, value) in fields {
            builder = builder.extra(key, value);
        }
        builder.begin()?;
        Ok(())
    }

    /// Async variant of [`log`](Self::log).
    pub async fn log_async<K, V>(
        &self,
        event_type: impl Into<String>,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Result<()>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut builder = self
            .scope(event_type)
            .creation_policy(CreationPolicy::InsertOnStart);
        for (key, value) in fields {
            builder = builder.extra(key, value);
        }
        builder.begin_async().await?;
        Ok(())
    }
}

impl Default for Auditor {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Auditor`].
pub struct AuditorBuilder {
    sink: Option<Arc<dyn AuditSink>>,
    policy: CreationPolicy,
    disabled: bool,
    clock: Arc<dyn Clock>,
    hooks: Vec<(HookMoment, Arc<ScopeHook>)>,
}

impl AuditorBuilder {
    fn new() -> Self {
        Self {
            sink: None,
            policy: CreationPolicy::default(),
            disabled: false,
            clock: Arc::new(SystemClock),
            hooks: Vec::new(),
        }
    }

    pub fn sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Like [`sink`](Self::sink), for a sink the caller keeps a handle to.
    pub fn sink_arc(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn creation_policy(mut self, policy: CreationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Like [`clock`](Self::clock), for a clock the caller keeps a handle to.
    pub fn clock_arc(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn on_scope_created(
        mut self,
        f: impl Fn(&mut AuditScope) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.push((HookMoment::ScopeCreated, Arc::new(f)));
        self
    }

    pub fn on_event_saving(
        mut self,
        f: impl Fn(&mut AuditScope) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.push((HookMoment::EventSaving, Arc::new(f)));
        self
    }

    pub fn on_event_saved(
        mut self,
        f: impl Fn(&mut AuditScope) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.push((HookMoment::EventSaved, Arc::new(f)));
        self
    }

    pub fn build(self) -> Auditor {
        let auditor = Auditor::new();
        if let Some(sink) = self.sink {
            auditor.set_sink(sink);
        }
        auditor.set_creation_policy(self.policy);
        auditor.set_disabled(self.disabled);
        auditor.set_clock(self.clock);
        for (moment, hook) in self.hooks {
            auditor.inner.hooks.append(moment, hook);
        }
        auditor
    }
}

impl Default for AuditorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
