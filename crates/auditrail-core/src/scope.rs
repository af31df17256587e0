//! Audit scope lifecycle: creation, saves, completion and discard.

use crate::auditor::Auditor;
use crate::clock::Clock;
use crate::error::{AuditError, Result};
use crate::event::{AuditEvent, EventTarget};
use crate::hooks::{run_hooks, HookMoment};
use crate::policy::{CreationPolicy, SaveMode, SavePhase, SinkAction};
use crate::sink::{AuditSink, EventId};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type TargetGetter = dyn Fn() -> serde_json::Result<Value> + Send + Sync;

/// Where a scope is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeStatus {
    /// Accepting mutations and save points.
    Active,
    /// Abandoned; the event will never be persisted again.
    Discarded,
    /// Finished; completion is terminal and idempotent.
    Completed,
}

/// Builder returned by [`Auditor::scope`].
///
/// Collects the event type, optional tracked target, extra fields and
/// per-scope overrides, then starts the scope with [`begin`](Self::begin)
/// or [`begin_async`](Self::begin_async).
pub struct ScopeBuilder {
    auditor: Auditor,
    event_type: String,
    target: Option<(String, Box<TargetGetter>)>,
    extra: Vec<(String, Value)>,
    environment: Option<Value>,
    policy: Option<CreationPolicy>,
    sink: Option<Arc<dyn AuditSink>>,
}

impl ScopeBuilder {
    pub(crate) fn new(auditor: Auditor, event_type: String) -> Self {
        Self {
            auditor,
            event_type,
            target: None,
            extra: Vec::new(),
            environment: None,
            policy: None,
            sink: None,
        }
    }

    /// Track an object through the scope. `getter` is evaluated once now
    /// for the `old` snapshot and again at every save point for `new`, so
    /// it should read the current state of the object being audited.
    pub fn target<T, F>(mut self, type_name: impl Into<String>, getter: F) -> Self
    where
        T: Serialize,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let getter: Box<TargetGetter> = Box::new(move || serde_json::to_value(getter()));
        self.target = Some((type_name.into(), getter));
        self
    }

    /// Attach a custom field to the event before the scope starts.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Attach opaque environment metadata to the event.
    pub fn environment(mut self, env: impl Into<Value>) -> Self {
        self.environment = Some(env.into());
        self
    }

    /// Override the auditor's creation policy for this scope only.
    pub fn creation_policy(mut self, policy: CreationPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Override the auditor's sink for this scope only.
    pub fn sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Like [`sink`](Self::sink), for a sink the caller keeps a handle to.
    pub fn sink_arc(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn build_scope(self) -> Result<AuditScope> {
        let auditor = self.auditor;
        let clock = auditor.clock();
        let policy = self.policy.unwrap_or_else(|| auditor.creation_policy());
        let sink = self.sink.or_else(|| auditor.sink());

        let mut event = AuditEvent::new(self.event_type);
        event.start_time = clock.now();
        if let Some(env) = self.environment {
            event.environment = Some(env);
        }
        for (key, value) in self.extra {
            event.custom_fields.insert(key, value);
        }

        let mut target_getter = None;
        if let Some((type_name, getter)) = self.target {
            let old = getter()?;
            event.target = Some(EventTarget::new(type_name, old));
            target_getter = Some(getter);
        }

        Ok(AuditScope {
            auditor,
            event,
            policy,
            sink,
            clock,
            target_getter,
            event_id: None,
            save_mode: SaveMode::InsertOnStart,
            status: ScopeStatus::Active,
        })
    }

    /// Start the scope: capture the initial snapshot, run creation hooks
    /// and apply the policy's creation action.
    pub fn begin(self) -> Result<AuditScope> {
        let mut scope = self.build_scope()?;

        let created = scope.auditor.hooks().snapshot(HookMoment::ScopeCreated);
        if let Err(e) = run_hooks(&created, &mut scope) {
            scope.status = ScopeStatus::Discarded;
            return Err(e);
        }
        if let Err(e) = scope.save_event(SavePhase::Creation) {
            scope.status = ScopeStatus::Discarded;
            return Err(e);
        }

        if scope.status == ScopeStatus::Active && scope.policy.completes_at_creation() {
            scope.status = ScopeStatus::Completed;
        }
        tracing::debug!("Audit scope started: {}", scope.event.event_type);
        Ok(scope)
    }

    /// Async variant of [`begin`](Self::begin).
    pub async fn begin_async(self) -> Result<AuditScope> {
        let mut scope = self.build_scope()?;

        let created = scope.auditor.hooks().snapshot(HookMoment::ScopeCreated);
        if let Err(e) = run_hooks(&created, &mut scope) {
            scope.status = ScopeStatus::Discarded;
            return Err(e);
        }
        if let Err(e) = scope.save_event_async(SavePhase::Creation).await {
            scope.status = ScopeStatus::Discarded;
            return Err(e);
        }

        if scope.status == ScopeStatus::Active && scope.policy.completes_at_creation() {
            scope.status = ScopeStatus::Completed;
        }
        tracing::debug!("Audit scope started: {}", scope.event.event_type);
        Ok(scope)
    }
}

/// A live audit trail for one operation.
///
/// The scope owns its [`AuditEvent`] and drives it through the save points
/// its [`CreationPolicy`] prescribes. Dropping an active scope completes it
/// as a safety net, logging instead of panicking if persistence fails; call
/// [`complete`](Self::complete) (or the async variant) to handle that error
/// yourself.
pub struct AuditScope {
    auditor: Auditor,
    event: AuditEvent,
    policy: CreationPolicy,
    sink: Option<Arc<dyn AuditSink>>,
    clock: Arc<dyn Clock>,
    target_getter: Option<Box<TargetGetter>>,
    event_id: Option<EventId>,
    save_mode: SaveMode,
    status: ScopeStatus,
}

impl AuditScope {
    /// The event being built.
    pub fn event(&self) -> &AuditEvent {
        &self.event
    }

    /// Mutable access to the event being built.
    pub fn event_mut(&mut self) -> &mut AuditEvent {
        &mut self.event
    }

    pub fn event_type(&self) -> &str {
        &self.event.event_type
    }

    /// Identifier returned by the first insert, if one happened yet.
    pub fn event_id(&self) -> Option<&EventId> {
        self.event_id.as_ref()
    }

    /// The save mode in effect at the latest save point. Reads as
    /// `InsertOnStart` until the first save point runs.
    pub fn save_mode(&self) -> SaveMode {
        self.save_mode
    }

    pub fn status(&self) -> ScopeStatus {
        self.status
    }

    pub fn is_discarded(&self) -> bool {
        self.status == ScopeStatus::Discarded
    }

    pub fn is_completed(&self) -> bool {
        self.status == ScopeStatus::Completed
    }

    /// The auditor this scope was created from.
    pub fn auditor(&self) -> &Auditor {
        &self.auditor
    }

    /// Append a comment to the event.
    pub fn comment(&mut self, text: impl Into<String>) {
        self.event.comment(text);
    }

    /// Upsert a custom field on the event.
    pub fn set_custom_field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.event.set_custom_field(key, value);
    }

    /// Replace the tracked target. The `old` snapshot is captured now;
    /// `new` snapshots come from `getter` at later save points.
    pub fn set_target<T, F>(&mut self, type_name: impl Into<String>, getter: F) -> Result<()>
    where
        T: Serialize,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let getter: Box<TargetGetter> = Box::new(move || serde_json::to_value(getter()));
        let old = getter()?;
        self.event.target = Some(EventTarget::new(type_name, old));
        self.target_getter = Some(getter);
        Ok(())
    }

    /// Stop tracking the target and drop its snapshots from the event.
    pub fn clear_target(&mut self) {
        self.target_getter = None;
        self.event.target = None;
    }

    /// Persist the event now, at an intermediate save point.
    ///
    /// Does nothing on a completed or discarded scope. The action taken
    /// depends on the creation policy; the first persisting save inserts
    /// and records the identifier later replaces address.
    pub fn save(&mut self) -> Result<()> {
        self.save_event(SavePhase::IntermediateSave)
    }

    /// Async variant of [`save`](Self::save).
    pub async fn save_async(&mut self) -> Result<()> {
        self.save_event_async(SavePhase::IntermediateSave).await
    }

    /// Finish the scope, applying the policy's completion action.
    ///
    /// Completion is terminal: the scope ends even if the sink fails, and
    /// calling this again (or dropping the scope) does nothing further.
    pub fn complete(&mut self) -> Result<()> {
        if self.status != ScopeStatus::Active {
            return Ok(());
        }
        let result = self.save_event(SavePhase::Completion);
        if self.status == ScopeStatus::Active {
            self.status = ScopeStatus::Completed;
        }
        result
    }

    /// Async variant of [`complete`](Self::complete).
    pub async fn complete_async(&mut self) -> Result<()> {
        if self.status != ScopeStatus::Active {
            return Ok(());
        }
        let result = self.save_event_async(SavePhase::Completion).await;
        if self.status == ScopeStatus::Active {
            self.status = ScopeStatus::Completed;
        }
        result
    }

    /// Abandon the scope: no further save point will reach the sink and
    /// the tracked target's `new` snapshot is never captured.
    pub fn discard(&mut self) {
        if self.status == ScopeStatus::Active {
            self.status = ScopeStatus::Discarded;
        }
    }

    /// Refresh the end instant, duration and `new` snapshot.
    fn refresh_capture(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.event.set_end_time(now);
        if let Some(getter) = &self.target_getter {
            let new = getter()?;
            if let Some(target) = &mut self.event.target {
                target.new = Some(new);
            }
        }
        Ok(())
    }

    /// Drive one save point. Saving hooks run before the disabled check so
    /// a hook can observe (or veto) every save, even while persistence is
    /// switched off.
    fn save_event(&mut self, phase: SavePhase) -> Result<()> {
        if self.status != ScopeStatus::Active {
            return Ok(());
        }
        if phase != SavePhase::Creation {
            self.refresh_capture()?;
        }

        let action = self.policy.action(phase, self.event_id.is_some());
        if action == SinkAction::None {
            return Ok(());
        }
        self.save_mode = self.policy.save_mode(phase);

        let saving = self.auditor.hooks().snapshot(HookMoment::EventSaving);
        run_hooks(&saving, self)?;
        if self.status == ScopeStatus::Discarded {
            return Ok(());
        }
        if self.auditor.is_disabled() {
            return Ok(());
        }

        let sink = self.sink.clone().ok_or(AuditError::MissingSink)?;
        match action {
            SinkAction::Insert => {
                self.event_id = Some(sink.insert(&self.event)?);
            }
            SinkAction::Replace => {
                if let Some(id) = &self.event_id {
                    sink.replace(id, &self.event)?;
                }
            }
            SinkAction::None => {}
        }

        let saved = self.auditor.hooks().snapshot(HookMoment::EventSaved);
        run_hooks(&saved, self)?;
        Ok(())
    }

    async fn save_event_async(&mut self, phase: SavePhase) -> Result<()> {
        if self.status != ScopeStatus::Active {
            return Ok(());
        }
        if phase != SavePhase::Creation {
            self.refresh_capture()?;
        }

        let action = self.policy.action(phase, self.event_id.is_some());
        if action == SinkAction::None {
            return Ok(());
        }
        self.save_mode = self.policy.save_mode(phase);

        let saving = self.auditor.hooks().snapshot(HookMoment::EventSaving);
        run_hooks(&saving, self)?;
        if self.status == ScopeStatus::Discarded {
            return Ok(());
        }
        if self.auditor.is_disabled() {
            return Ok(());
        }

        let sink = self.sink.clone().ok_or(AuditError::MissingSink)?;
        match action {
            SinkAction::Insert => {
                let id = sink.insert_async(&self.event).await?;
                self.event_id = Some(id);
            }
            SinkAction::Replace => {
                if let Some(id) = &self.event_id {
                    sink.replace_async(id, &self.event).await?;
                }
            }
            SinkAction::None => {}
        }

        let saved = self.auditor.hooks().snapshot(HookMoment::EventSaved);
        run_hooks(&saved, self)?;
        Ok(())
    }
}

impl fmt::Debug for AuditScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditScope")
            .field("event", &self.event)
            .field("policy", &self.policy)
            .field("event_id", &self.event_id)
            .field("save_mode", &self.save_mode)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Drop for AuditScope {
    fn drop(&mut self) {
        if let Err(e) = self.complete() {
            tracing::error!("Failed to persist audit event on drop: {}", e);
        }
    }
}
