//! Read-modify-write of a case's tag list.
//!
//! Every mutating service reads the current tags, computes a full replacement set and
//! writes it back. With [`WriteMode::LastWriteWins`] two concurrent writers on the same
//! case race and the later write silently discards the earlier delta. With
//! [`WriteMode::CompareAndSwap`] the write carries the version that was read; on a
//! conflict the plan is recomputed from a fresh read.

use super::{CaseStore, StoreError, TagUpdate};
use crate::error::{CaseTrackError, Result};
use crate::models::{Case, CaseId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum WriteMode {
    /// Unconditional wholesale writes; concurrent writers lose updates
    LastWriteWins,
    /// Versioned writes retried from a fresh read on conflict
    CompareAndSwap { max_retries: u32 },
}

impl Default for WriteMode {
    fn default() -> Self {
        Self::LastWriteWins
    }
}

/// What a plan decided for the tags it was shown
#[derive(Debug)]
pub enum Planned<T> {
    Write(Vec<String>, T),
    Unchanged(T),
}

#[derive(Debug, Clone)]
pub struct WriteOutcome<T> {
    /// Stored record after the write (or the record as read if nothing was written)
    pub case: Case,
    pub previous_tags: Vec<String>,
    pub detail: T,
    pub written: bool,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct TagWriter {
    store: Arc<dyn CaseStore>,
    mode: WriteMode,
}

impl std::fmt::Debug for TagWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagWriter").field("mode", &self.mode).finish()
    }
}

impl TagWriter {
    pub fn new(store: Arc<dyn CaseStore>, mode: WriteMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    pub fn store(&self) -> &Arc<dyn CaseStore> {
        &self.store
    }

    /// Read the case, plan new tags and write them back
    pub async fn mutate<T, F>(&self, case_id: &CaseId, plan: F) -> Result<WriteOutcome<T>>
    where
        F: FnMut(&Case) -> Result<Planned<T>> + Send,
        T: Send,
    {
        let snapshot = self.load(case_id).await?;
        self.mutate_from(snapshot, plan).await
    }

    /// Like [`mutate`](Self::mutate), starting from an already-read snapshot
    pub async fn mutate_from<T, F>(&self, snapshot: Case, mut plan: F) -> Result<WriteOutcome<T>>
    where
        F: FnMut(&Case) -> Result<Planned<T>> + Send,
        T: Send,
    {
        let case_id = snapshot.id.clone();
        let mut current = snapshot;
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let (tags, detail) = match plan(&current)? {
                Planned::Write(tags, detail) => (tags, detail),
                Planned::Unchanged(detail) => {
                    return Ok(WriteOutcome {
                        previous_tags: current.tags.clone(),
                        case: current,
                        detail,
                        written: false,
                        attempts,
                    })
                }
            };

            let update = match self.mode {
                WriteMode::LastWriteWins => TagUpdate::unconditional(tags),
                WriteMode::CompareAndSwap { .. } => TagUpdate::if_version(tags, current.version),
            };

            match self.store.update(&case_id, update).await {
                Ok(stored) => {
                    debug!(case_id = %case_id, version = stored.version, attempts, "Tags written");
                    return Ok(WriteOutcome {
                        previous_tags: current.tags,
                        case: stored,
                        detail,
                        written: true,
                        attempts,
                    });
                }
                Err(StoreError::VersionConflict { actual, .. }) => {
                    let max_retries = match self.mode {
                        WriteMode::CompareAndSwap { max_retries } => max_retries,
                        WriteMode::LastWriteWins => 0,
                    };
                    if attempts > max_retries {
                        error!(case_id = %case_id, attempts, "Conflict retries exhausted");
                        return Err(CaseTrackError::ConflictRetriesExhausted {
                            case_id,
                            attempts,
                        });
                    }
                    warn!(
                        case_id = %case_id,
                        stale_version = current.version,
                        stored_version = actual,
                        attempt = attempts,
                        "Concurrent tag write detected, replanning from fresh read"
                    );
                    current = self.load(&case_id).await?;
                }
                Err(e) => {
                    error!(case_id = %case_id, error = %e, "Tag write failed");
                    return Err(e.into());
                }
            }
        }
    }

    async fn load(&self, case_id: &CaseId) -> Result<Case> {
        self.store
            .get(case_id)
            .await?
            .ok_or_else(|| CaseTrackError::CaseNotFound(case_id.clone()))
    }
}
