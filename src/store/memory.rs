//! In-memory case store and audit log.
//!
//! Mirrors the document store contract: every write bumps `version`, every write and
//! delete is pushed to the change feed, and failures can be injected per case to
//! exercise partial-failure paths.

use super::{AuditLog, CaseFilter, CaseStore, ChangeEvent, StoreError, StoreResult, TagUpdate};
use crate::constants::system::DEFAULT_CHANGE_FEED_CAPACITY;
use crate::models::{AuditEntry, Case, CaseId};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tokio::sync::broadcast;

#[derive(Debug)]
pub struct InMemoryCaseStore {
    cases: RwLock<HashMap<CaseId, Case>>,
    failing: RwLock<HashSet<CaseId>>,
    feed: broadcast::Sender<ChangeEvent>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(DEFAULT_CHANGE_FEED_CAPACITY);
        Self {
            cases: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            feed,
        }
    }

    /// Intake: add or replace a case record and announce it on the feed
    pub fn insert(&self, case: Case) {
        self.cases.write().insert(case.id.clone(), case.clone());
        self.announce(ChangeEvent::Upserted(case));
    }

    /// Mark a case archived, removing it from live queries
    pub fn archive(&self, id: &CaseId) -> StoreResult<Case> {
        let archived = {
            let mut cases = self.cases.write();
            let case = cases
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            case.archived = true;
            case.version += 1;
            case.clone()
        };
        self.announce(ChangeEvent::Upserted(archived.clone()));
        Ok(archived)
    }

    /// Make every subsequent update of `id` fail with a backend error
    pub fn fail_updates_for(&self, id: &CaseId) {
        self.failing.write().insert(id.clone());
    }

    pub fn len(&self) -> usize {
        self.cases.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.read().is_empty()
    }

    fn announce(&self, event: ChangeEvent) {
        // No subscribers is fine
        let _ = self.feed.send(event);
    }
}

impl Default for InMemoryCaseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn query(&self, filter: &CaseFilter) -> StoreResult<Vec<Case>> {
        let mut cases: Vec<Case> = self
            .cases
            .read()
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        cases.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cases)
    }

    async fn get(&self, id: &CaseId) -> StoreResult<Option<Case>> {
        Ok(self.cases.read().get(id).cloned())
    }

    async fn update(&self, id: &CaseId, update: TagUpdate) -> StoreResult<Case> {
        if self.failing.read().contains(id) {
            return Err(StoreError::Backend(format!("write rejected for case {id}")));
        }

        let updated = {
            let mut cases = self.cases.write();
            let case = cases
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;

            if let Some(expected) = update.expected_version {
                if case.version != expected {
                    return Err(StoreError::VersionConflict {
                        case_id: id.clone(),
                        expected,
                        actual: case.version,
                    });
                }
            }

            case.tags = update.tags;
            case.version += 1;
            case.clone()
        };

        self.announce(ChangeEvent::Upserted(updated.clone()));
        Ok(updated)
    }

    async fn delete(&self, id: &CaseId) -> StoreResult<()> {
        let removed = self.cases.write().remove(id);
        match removed {
            Some(_) => {
                self.announce(ChangeEvent::Deleted(id.clone()));
                Ok(())
            }
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

/// Audit log keeping entries per case in insertion order
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: DashMap<CaseId, Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texts recorded for a case, oldest first
    pub fn texts_for(&self, case_id: &CaseId) -> Vec<String> {
        self.entries
            .get(case_id)
            .map(|e| e.iter().map(|entry| entry.text.clone()).collect())
            .unwrap_or_default()
    }

    pub fn total_entries(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, case_id: &CaseId, text: &str) -> StoreResult<AuditEntry> {
        let entry = AuditEntry::new(case_id.clone(), text);
        self.entries
            .entry(case_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn entries_for(&self, case_id: &CaseId) -> StoreResult<Vec<AuditEntry>> {
        Ok(self
            .entries
            .get(case_id)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }
}
