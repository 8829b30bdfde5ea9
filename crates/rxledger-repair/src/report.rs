//! Run accounting and resumable checkpoints.

use std::path::Path;

use serde::{Deserialize, Serialize};

use rxledger_types::GroupId;

use crate::error::{RepairError, RepairResult};

/// Counts for one repair batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub examined: u64,
    pub fixed: u64,
    pub skipped: u64,
    /// Highest group id processed; feed back as `resume_after` to continue.
    pub last_processed: Option<GroupId>,
}

impl RepairReport {
    /// Fold a later batch into this one.
    pub fn merge(&mut self, other: &RepairReport) {
        self.examined += other.examined;
        self.fixed += other.fixed;
        self.skipped += other.skipped;
        if other.last_processed.is_some() {
            self.last_processed = other.last_processed;
        }
    }
}

/// Persisted resume point for an interrupted repair run.
///
/// Groups are processed in ascending id order, so resuming after the last
/// processed id never re-examines finished work and never skips a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairCheckpoint {
    /// Name of the pass this checkpoint belongs to.
    pub pass: String,
    pub last_processed: Option<GroupId>,
}

impl RepairCheckpoint {
    pub fn new(pass: impl Into<String>) -> Self {
        Self {
            pass: pass.into(),
            last_processed: None,
        }
    }

    /// Load a checkpoint file. `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> RepairResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        let checkpoint =
            serde_json::from_str(&data).map_err(|e| RepairError::Serialization(e.to_string()))?;
        Ok(Some(checkpoint))
    }

    /// Persist the checkpoint. Written after every batch so an interrupted
    /// run loses at most one batch of progress.
    pub fn save(&self, path: &Path) -> RepairResult<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| RepairError::Serialization(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }
}
