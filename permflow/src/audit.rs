//! Audit trail of permission flow events
//!
//! The controller reports every user-visible step to an [`AuditSink`]. Sinks
//! are best-effort: a failing sink is logged and never aborts a flow.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::permission::PermissionSet;
use crate::platform::FlowKind;

/// Seconds since the Unix epoch
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// One recorded step of a permission flow
#[derive(Debug, Clone, Serialize)]
pub struct FlowEvent {
    /// Unix timestamp (seconds)
    pub timestamp: u64,
    pub event_type: FlowEventType,
    /// Entry point that started the flow
    pub flow: FlowKind,
    /// Permissions the step concerned
    pub permissions: PermissionSet,
}

impl FlowEvent {
    pub fn new(event_type: FlowEventType, flow: FlowKind, permissions: PermissionSet) -> Self {
        Self {
            timestamp: unix_now(),
            event_type,
            flow,
            permissions,
        }
    }
}

/// Kind of flow event
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowEventType {
    /// Nothing was missing when the flow started
    AlreadyGranted,
    /// A rationale dialog was presented
    RationaleShown,
    /// The OS request was dispatched
    PermissionsRequested,
    /// The OS reported every requested permission granted
    PermissionsGranted,
    /// The OS reported at least one denial
    PermissionsDenied,
    /// The settings guidance dialog was presented
    SettingsShown,
    /// The user chose to open the app settings page
    SettingsOpened,
    /// The user dismissed a dialog
    FlowCancelled,
}

/// Error type for audit operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to write audit log: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Failed to serialize audit event: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Destination for flow events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: FlowEvent) -> Result<(), AuditError>;

    fn flush(&self) -> Result<(), AuditError>;

    fn is_healthy(&self) -> bool {
        true
    }
}

// ============================================================================
// File Sink
// ============================================================================

/// Appends events to a JSON Lines file
pub struct FileAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileAuditSink {
    /// Open (or create) `path` for appending, creating parent directories
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: FlowEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(&event)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", json)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.flush()?;
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.path.parent().map(|p| p.exists()).unwrap_or(true)
    }
}

impl fmt::Debug for FileAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAuditSink")
            .field("path", &self.path)
            .finish()
    }
}

// ============================================================================
// Memory Sink
// ============================================================================

/// Bounded in-memory sink, oldest events evicted first
pub struct MemoryAuditSink {
    events: RwLock<VecDeque<FlowEvent>>,
    max_events: usize,
}

impl MemoryAuditSink {
    /// Sink holding up to 1000 events
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(max_events.min(1000))),
            max_events,
        }
    }

    pub fn events(&self) -> Vec<FlowEvent> {
        self.read().iter().cloned().collect()
    }

    /// Event types in recording order
    pub fn event_types(&self) -> Vec<FlowEventType> {
        self.read().iter().map(|e| e.event_type).collect()
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn find_by_type(&self, event_type: FlowEventType) -> Vec<FlowEvent> {
        self.read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, VecDeque<FlowEvent>> {
        self.events.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: FlowEvent) -> Result<(), AuditError> {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        if self.max_events == 0 {
            return Ok(());
        }
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

impl fmt::Debug for MemoryAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAuditSink")
            .field("count", &self.count())
            .field("max_events", &self.max_events)
            .finish()
    }
}

/// Discards all events
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl NullAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for NullAuditSink {
    fn record(&self, _event: FlowEvent) -> Result<(), AuditError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::android;

    fn camera_event(event_type: FlowEventType) -> FlowEvent {
        FlowEvent::new(
            event_type,
            FlowKind::Single,
            PermissionSet::single(android::CAMERA),
        )
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemoryAuditSink::new();
        sink.record(camera_event(FlowEventType::PermissionsRequested))
            .unwrap();
        sink.record(camera_event(FlowEventType::PermissionsDenied))
            .unwrap();

        assert_eq!(sink.count(), 2);
        assert_eq!(
            sink.event_types(),
            vec![
                FlowEventType::PermissionsRequested,
                FlowEventType::PermissionsDenied
            ]
        );
        assert_eq!(sink.find_by_type(FlowEventType::PermissionsDenied).len(), 1);

        sink.clear();
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_memory_sink_eviction() {
        let sink = MemoryAuditSink::with_capacity(2);
        sink.record(camera_event(FlowEventType::RationaleShown)).unwrap();
        sink.record(camera_event(FlowEventType::PermissionsRequested))
            .unwrap();
        sink.record(camera_event(FlowEventType::PermissionsGranted))
            .unwrap();

        assert_eq!(
            sink.event_types(),
            vec![
                FlowEventType::PermissionsRequested,
                FlowEventType::PermissionsGranted
            ]
        );
    }

    #[test]
    fn test_null_sink() {
        let sink = NullAuditSink::new();
        assert!(sink.record(camera_event(FlowEventType::FlowCancelled)).is_ok());
        assert!(sink.flush().is_ok());
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&camera_event(FlowEventType::SettingsOpened)).unwrap();
        assert!(json.contains(r#""event_type":"settings_opened""#));
        assert!(json.contains(r#""flow":"single""#));
        assert!(json.contains(android::CAMERA));
    }

    #[test]
    fn test_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("flow.jsonl");

        let sink = FileAuditSink::new(&path).unwrap();
        assert!(sink.is_healthy());
        sink.record(camera_event(FlowEventType::PermissionsRequested))
            .unwrap();
        sink.record(camera_event(FlowEventType::PermissionsGranted))
            .unwrap();
        sink.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("permissions_requested"));
        assert!(lines[1].contains("permissions_granted"));
    }
}
