//! # Test Utilities
//!
//! Fixtures shared by unit tests, integration tests and benches: a `Case` builder and a
//! fully wired in-memory context.

use crate::config::CaseTrackConfig;
use crate::events::EventPublisher;
use crate::exclusion::{BatchResetService, ExclusionPolicy};
use crate::models::{Case, CaseId, Department};
use crate::state_machine::{Stage, TransitionEngine};
use crate::store::{InMemoryAuditLog, InMemoryCaseStore, TagWriter};
use crate::sync::SyncLayer;
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;

/// Builder for test cases
#[derive(Debug, Clone)]
pub struct CaseBuilder {
    case: Case,
}

impl CaseBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            case: Case::new(id, id, Department::Digital, Utc::now().date_naive()),
        }
    }

    pub fn department(mut self, department: Department) -> Self {
        self.case.department = department;
        self
    }

    pub fn case_number(mut self, number: &str) -> Self {
        self.case.case_number = number.to_string();
        self
    }

    pub fn due(mut self, due: NaiveDate) -> Self {
        self.case.due = due;
        self
    }

    pub fn due_in_days(mut self, days: i64) -> Self {
        let today = Utc::now().date_naive();
        self.case.due = today.checked_add_signed(Duration::days(days)).unwrap_or(today);
        self
    }

    pub fn stage_hint(mut self, stage: Stage) -> Self {
        self.case.stage = Some(stage);
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.case.tags.push(tag.to_string());
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.case.tags.extend(tags.iter().map(|t| t.to_string()));
        self
    }

    pub fn archived(mut self) -> Self {
        self.case.archived = true;
        self
    }

    pub fn completed(mut self) -> Self {
        self.case.completed = true;
        self
    }

    pub fn build(self) -> Case {
        self.case
    }
}

/// In-memory store, audit log and every service wired together
pub struct TestContext {
    pub store: Arc<InMemoryCaseStore>,
    pub audit: Arc<InMemoryAuditLog>,
    pub publisher: EventPublisher,
    pub transitions: TransitionEngine,
    pub exclusions: ExclusionPolicy,
    pub resets: BatchResetService,
    pub sync: Arc<SyncLayer>,
}

impl TestContext {
    pub fn seed(&self, case: Case) -> CaseId {
        let id = case.id.clone();
        self.store.insert(case);
        id
    }
}

pub fn test_context() -> TestContext {
    test_context_with(&CaseTrackConfig::default())
}

pub fn test_context_with(config: &CaseTrackConfig) -> TestContext {
    let store = Arc::new(InMemoryCaseStore::new());
    let audit = Arc::new(InMemoryAuditLog::new());
    let publisher = EventPublisher::new(config.events.channel_capacity);
    let writer = TagWriter::new(store.clone(), config.write.mode());

    TestContext {
        transitions: TransitionEngine::new(writer.clone(), audit.clone(), publisher.clone()),
        exclusions: ExclusionPolicy::new(writer.clone(), audit.clone(), publisher.clone()),
        resets: BatchResetService::new(
            writer,
            audit.clone(),
            publisher.clone(),
            config.audit.record_batch_resets,
        ),
        sync: Arc::new(SyncLayer::new(store.clone(), publisher.clone(), &config.sync)),
        store,
        audit,
        publisher,
    }
}
