//! File-per-event sink implementation.

use super::{AuditSink, EventId};
use crate::error::{AuditError, Result};
use crate::event::AuditEvent;
use serde_json::Value;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use uuid::Uuid;

type FilenameFn = dyn Fn(&AuditEvent) -> String + Send + Sync;

/// Sink that writes each event to its own JSON file.
///
/// Inserting writes a new file and returns its full path as the event
/// identifier; replacing rewrites the file at that path. Filenames default
/// to `{prefix}{start_time}_{uuid}.json` so a directory listing sorts
/// chronologically, and can be derived from the event instead with
/// [`filename_builder`](Self::filename_builder).
pub struct FileSink {
    directory: PathBuf,
    filename_prefix: String,
    filename_builder: Option<Box<FilenameFn>>,
}

impl FileSink {
    /// Create a sink writing into `directory`. The directory is created on
    /// first insert if it does not exist.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            filename_prefix: String::new(),
            filename_builder: None,
        }
    }

    /// Prepend `prefix` to generated filenames.
    pub fn filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.filename_prefix = prefix.into();
        self
    }

    /// Build filenames from the event instead of the default
    /// timestamp/uuid scheme.
    pub fn filename_builder(
        mut self,
        f: impl Fn(&AuditEvent) -> String + Send + Sync + 'static,
    ) -> Self {
        self.filename_builder = Some(Box::new(f));
        self
    }

    /// Directory events are written into.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Read a single stored event back from `path`.
    pub fn read_event(&self, path: impl AsRef<Path>) -> Result<AuditEvent> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Read every event in the sink directory, ordered by filename.
    ///
    /// Files that cannot be read or parsed are skipped with a warning.
    pub fn events(&self) -> Result<Vec<AuditEvent>> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.directory)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut events = Vec::with_capacity(paths.len());
        for path in paths {
            match self.read_event(&path) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("Failed to read audit file {}: {}", path.display(), e);
                }
            }
        }
        Ok(events)
    }

    fn file_path(&self, event: &AuditEvent) -> PathBuf {
        let name = match &self.filename_builder {
            Some(builder) => builder(event),
            None => format!(
                "{}{}_{}.json",
                self.filename_prefix,
                event.start_time.format("%Y%m%d%H%M%S%3f"),
                Uuid::new_v4().simple()
            ),
        };
        self.directory.join(name)
    }

    fn path_from_id(id: &EventId) -> Result<PathBuf> {
        id.as_str()
            .map(PathBuf::from)
            .ok_or_else(|| AuditError::UnknownEventId(id.to_string()))
    }
}

impl AuditSink for FileSink {
    fn insert(&self, event: &AuditEvent) -> Result<EventId> {
        fs::create_dir_all(&self.directory)?;
        let path = self.file_path(event);
        fs::write(&path, event.to_json_pretty()?)?;
        Ok(Value::String(path.to_string_lossy().into_owned()))
    }

    fn replace(&self, id: &EventId, event: &AuditEvent) -> Result<()> {
        let path = Self::path_from_id(id)?;
        fs::write(path, event.to_json_pretty()?)?;
        Ok(())
    }

    fn insert_async<'a>(
        &'a self,
        event: &'a AuditEvent,
    ) -> Pin<Box<dyn Future<Output = Result<EventId>> + Send + 'a>> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.directory).await?;
            let path = self.file_path(event);
            tokio::fs::write(&path, event.to_json_pretty()?).await?;
            Ok(Value::String(path.to_string_lossy().into_owned()))
        })
    }

    fn replace_async<'a>(
        &'a self,
        id: &'a EventId,
        event: &'a AuditEvent,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let path = Self::path_from_id(id)?;
            tokio::fs::write(path, event.to_json_pretty()?).await?;
            Ok(())
        })
    }
}
