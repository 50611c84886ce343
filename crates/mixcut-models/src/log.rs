//! Operation log entries.
//!
//! One entry is appended per executed filter stage; the log is append-only
//! and entries are never mutated or deleted.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Audit record for one executed filter stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OperationLogEntry {
    /// Task the stage belongs to
    pub task_id: TaskId,
    /// Zero-based stage index within the compiled plan
    pub stage_index: u32,
    /// Stage kind label (e.g. "draw_text")
    pub stage_kind: String,
    /// Stage wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Whether the stage succeeded
    pub success: bool,
    /// Error detail when the stage failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
}

impl OperationLogEntry {
    /// Record a successful stage.
    pub fn success(
        task_id: TaskId,
        stage_index: u32,
        stage_kind: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            task_id,
            stage_index,
            stage_kind: stage_kind.into(),
            duration_ms,
            success: true,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Record a failed stage.
    pub fn failure(
        task_id: TaskId,
        stage_index: u32,
        stage_kind: impl Into<String>,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            stage_index,
            stage_kind: stage_kind.into(),
            duration_ms,
            success: false,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_constructors() {
        let id = TaskId::new();
        let ok = OperationLogEntry::success(id.clone(), 0, "draw_text", 1200);
        assert!(ok.success);
        assert!(ok.error.is_none());

        let bad = OperationLogEntry::failure(id, 1, "overlay", 300, "engine exited with 1");
        assert!(!bad.success);
        assert_eq!(bad.error.as_deref(), Some("engine exited with 1"));
    }
}
