//! Creation policies and the pure mapping from lifecycle phase to sink action.

use serde::{Deserialize, Serialize};

/// When a scope persists its event, relative to the scope lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CreationPolicy {
    /// Insert once at creation and complete the scope immediately
    /// (the create-and-save shortcut).
    InsertOnStart,
    /// Insert a new record at each save point; nothing happens at creation.
    InsertOnEnd,
    /// Insert at creation, replace that record at every later save point.
    #[default]
    InsertOnStartReplaceOnEnd,
    /// Insert at creation and insert a fresh record at every later save point.
    InsertOnStartInsertOnEnd,
    /// Persist only on explicit save calls: first save inserts, later saves replace.
    Manual,
}

/// Lifecycle phase a save point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SavePhase {
    /// Scope creation.
    Creation,
    /// An explicit save while the scope is active.
    IntermediateSave,
    /// Scope completion.
    Completion,
}

/// The persistence action a policy prescribes for one save point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkAction {
    /// No sink interaction for this phase.
    None,
    /// Insert a new record.
    Insert,
    /// Replace the record from the first insert.
    Replace,
}

/// The kind of save in effect at a save point, exposed to lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    InsertOnStart,
    InsertOnEnd,
    ReplaceOnEnd,
    Manual,
}

impl CreationPolicy {
    /// Action due at the given phase.
    ///
    /// `has_inserted` reports whether this scope already performed its first
    /// insert; a replace is only ever addressed by the identifier that insert
    /// returned, so policies that replace fall back to insert until then.
    pub fn action(self, phase: SavePhase, has_inserted: bool) -> SinkAction {
        match (self, phase) {
            (CreationPolicy::InsertOnStart, SavePhase::Creation) => SinkAction::Insert,
            (CreationPolicy::InsertOnStart, _) => SinkAction::None,

            (CreationPolicy::InsertOnEnd, SavePhase::Creation) => SinkAction::None,
            (CreationPolicy::InsertOnEnd, _) => SinkAction::Insert,

            (CreationPolicy::InsertOnStartReplaceOnEnd, SavePhase::Creation) => SinkAction::Insert,
            (CreationPolicy::InsertOnStartReplaceOnEnd, _) if has_inserted => SinkAction::Replace,
            (CreationPolicy::InsertOnStartReplaceOnEnd, _) => SinkAction::Insert,

            (CreationPolicy::InsertOnStartInsertOnEnd, _) => SinkAction::Insert,

            (CreationPolicy::Manual, SavePhase::IntermediateSave) if has_inserted => {
                SinkAction::Replace
            }
            (CreationPolicy::Manual, SavePhase::IntermediateSave) => SinkAction::Insert,
            (CreationPolicy::Manual, _) => SinkAction::None,
        }
    }

    /// Save mode hooks observe for a save point in the given phase.
    pub fn save_mode(self, phase: SavePhase) -> SaveMode {
        match phase {
            SavePhase::Creation => SaveMode::InsertOnStart,
            SavePhase::IntermediateSave | SavePhase::Completion => match self {
                CreationPolicy::InsertOnStart => SaveMode::InsertOnStart,
                CreationPolicy::InsertOnEnd | CreationPolicy::InsertOnStartInsertOnEnd => {
                    SaveMode::InsertOnEnd
                }
                CreationPolicy::InsertOnStartReplaceOnEnd => SaveMode::ReplaceOnEnd,
                CreationPolicy::Manual => SaveMode::Manual,
            },
        }
    }

    /// Whether the scope is already complete once the creation insert ran.
    pub fn completes_at_creation(self) -> bool {
        self == CreationPolicy::InsertOnStart
    }
}

impl std::fmt::Display for CreationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreationPolicy::InsertOnStart => write!(f, "insert_on_start"),
            CreationPolicy::InsertOnEnd => write!(f, "insert_on_end"),
            CreationPolicy::InsertOnStartReplaceOnEnd => {
                write!(f, "insert_on_start_replace_on_end")
            }
            CreationPolicy::InsertOnStartInsertOnEnd => write!(f, "insert_on_start_insert_on_end"),
            CreationPolicy::Manual => write!(f, "manual"),
        }
    }
}

impl std::fmt::Display for SaveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveMode::InsertOnStart => write!(f, "insert_on_start"),
            SaveMode::InsertOnEnd => write!(f, "insert_on_end"),
            SaveMode::ReplaceOnEnd => write!(f, "replace_on_end"),
            SaveMode::Manual => write!(f, "manual"),
        }
    }
}
