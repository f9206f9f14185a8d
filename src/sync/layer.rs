//! # Sync Layer
//!
//! Keeps a local cache of live (non-archived) cases ordered by due date, in step with
//! the store's change feed.
//!
//! Records whose `caseNumber` normalizes to `update` are application-update notices,
//! not work: on load and on every feed event they are parsed into an [`UpdateNotice`]
//! and deleted from the store. After exclusion changes and batch resets the cache is
//! rebuilt by a full re-query rather than patched, so derived fields computed elsewhere
//! are never guessed locally.

use crate::config::SyncConfig;
use crate::constants::events;
use crate::error::Result;
use crate::events::{EventPublisher, PublishedEvent};
use crate::models::{Case, CaseId, UpdateNotice};
use crate::store::{CaseFilter, CaseStore, ChangeEvent, StoreError};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct SyncLayer {
    store: Arc<dyn CaseStore>,
    event_publisher: EventPublisher,
    cache: RwLock<Vec<Case>>,
    notices: RwLock<VecDeque<UpdateNotice>>,
    notice_history: usize,
}

impl SyncLayer {
    pub fn new(store: Arc<dyn CaseStore>, event_publisher: EventPublisher, config: &SyncConfig) -> Self {
        Self {
            store,
            event_publisher,
            cache: RwLock::new(Vec::new()),
            notices: RwLock::new(VecDeque::new()),
            notice_history: config.notice_history.max(1),
        }
    }

    /// Full re-query of live cases; returns the number of cached cases
    pub async fn load(&self) -> Result<usize> {
        let fetched = self.store.query(&CaseFilter::live()).await?;

        let mut live = Vec::with_capacity(fetched.len());
        for case in fetched {
            if case.is_update_sentinel() {
                self.divert_sentinel(case).await?;
            } else {
                live.push(case);
            }
        }
        sort_by_due(&mut live);

        let count = live.len();
        *self.cache.write() = live;
        debug!(cases = count, "Case cache reloaded");
        Ok(count)
    }

    /// Forced refresh after a mutation
    pub async fn refresh(&self) -> Result<usize> {
        self.load().await
    }

    /// Apply one change-feed event to the cache
    pub async fn apply_change(&self, event: ChangeEvent) -> Result<()> {
        match event {
            ChangeEvent::Upserted(case) if case.is_update_sentinel() => {
                self.divert_sentinel(case).await?;
            }
            ChangeEvent::Upserted(case) if case.archived => {
                self.remove_cached(&case.id);
            }
            ChangeEvent::Upserted(case) => {
                let mut cache = self.cache.write();
                cache.retain(|c| c.id != case.id);
                cache.push(case);
                sort_by_due(&mut cache);
            }
            ChangeEvent::Deleted(id) => self.remove_cached(&id),
        }
        Ok(())
    }

    /// Snapshot of cached live cases, ordered by due date
    pub fn cases(&self) -> Vec<Case> {
        self.cache.read().clone()
    }

    pub fn case(&self, id: &CaseId) -> Option<Case> {
        self.cache.read().iter().find(|c| &c.id == id).cloned()
    }

    pub fn latest_notice(&self) -> Option<UpdateNotice> {
        self.notices.read().back().cloned()
    }

    /// Retained notices, oldest first
    pub fn notices(&self) -> Vec<UpdateNotice> {
        self.notices.read().iter().cloned().collect()
    }

    /// Follow the store feed and workflow events until the handle is dropped
    pub fn spawn(self: Arc<Self>) -> SyncHandle {
        let mut changes = self.store.subscribe();
        let mut workflow_events = self.event_publisher.subscribe();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    change = changes.recv() => match change {
                        Ok(event) => {
                            if let Err(e) = self.apply_change(event).await {
                                warn!(error = %e, "Failed to apply change event");
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Change feed lagged, reloading cache");
                            self.refresh_logged().await;
                        }
                        Err(RecvError::Closed) => {
                            info!("Change feed closed, stopping sync");
                            break;
                        }
                    },
                    event = workflow_events.recv() => match event {
                        Ok(event) if requires_refresh(&event) => self.refresh_logged().await,
                        Ok(_) => {}
                        Err(RecvError::Lagged(_)) => self.refresh_logged().await,
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });

        SyncHandle { task }
    }

    async fn refresh_logged(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Cache refresh failed");
        }
    }

    async fn divert_sentinel(&self, case: Case) -> Result<()> {
        let Some(notice) = UpdateNotice::from_sentinel(&case) else {
            return Ok(());
        };

        info!(
            case_id = %case.id,
            priority = ?notice.priority,
            "Update notice received, removing sentinel record"
        );
        {
            let mut notices = self.notices.write();
            notices.push_back(notice.clone());
            while notices.len() > self.notice_history {
                notices.pop_front();
            }
        }
        self.remove_cached(&case.id);

        match self.store.delete(&case.id).await {
            Ok(()) | Err(StoreError::NotFound(_)) => {}
            Err(e) => warn!(case_id = %case.id, error = %e, "Failed to delete sentinel record"),
        }

        self.event_publisher
            .publish_with(events::UPDATE_NOTICE_RECEIVED, None, &notice)
            .await?;
        Ok(())
    }

    fn remove_cached(&self, id: &CaseId) {
        self.cache.write().retain(|c| &c.id != id);
    }
}

/// Stops the background sync task when dropped
pub struct SyncHandle {
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn requires_refresh(event: &PublishedEvent) -> bool {
    matches!(
        event.name.as_str(),
        events::EXCLUSION_CHANGED | events::EXCLUSIONS_RESET
    )
}

fn sort_by_due(cases: &mut [Case]) {
    cases.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.id.cmp(&b.id)));
}
