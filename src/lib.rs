#![allow(clippy::doc_markdown)] // Allow technical terms like QC, C&B in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Casetrack Core
//!
//! Workflow state and statistics-exclusion engine for multi-stage fabrication cases.
//!
//! ## Overview
//!
//! Every case moves through department-specific stages and carries a free-form tag
//! list. That list is the only persisted state: the current stage, modifiers such as
//! `rush` and `hold`, and manual exclusions from stage-duration statistics are all
//! encoded as tags. This crate derives typed state from the tags, performs audited
//! tag mutations, and reconciles the exclusion views produced by an external
//! statistics engine with what the store currently says.
//!
//! ## Module Organization
//!
//! - [`models`] - Cases, the typed tag record, audit entries, statistics shapes
//! - [`state_machine`] - Stage resolution and audited stage transitions
//! - [`exclusion`] - Exclusion policy, reconciler and batch resets
//! - [`store`] - Persistence seam, in-memory store and the read-modify-write helper
//! - [`sync`] - Local case cache fed by the store's change feed
//! - [`services`] - Statistics engine seam and stage analytics
//! - [`events`] - Workflow event bus
//! - [`config`] - Configuration loading
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use casetrack_core::exclusion::{is_excluded, ExclusionChange, ExclusionScope};
//! use casetrack_core::state_machine::Stage;
//! use casetrack_core::test_utils::{test_context, CaseBuilder};
//!
//! # async fn example() -> casetrack_core::Result<()> {
//! let ctx = test_context();
//! let id = ctx.seed(CaseBuilder::new("A-100").build());
//!
//! ctx.transitions.change_stage(&id, Some(Stage::Production), false).await?;
//! let toggle = ctx
//!     .exclusions
//!     .toggle_exclusion(&id, ExclusionChange::exclude(ExclusionScope::Stage(Stage::Production), None))
//!     .await?;
//!
//! assert!(is_excluded(&toggle.case.tags, Some(Stage::Production)));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod exclusion;
pub mod logging;
pub mod models;
pub mod services;
pub mod state_machine;
pub mod store;
pub mod sync;
pub mod test_utils;

pub use config::CaseTrackConfig;
pub use error::{CaseTrackError, Result};
pub use exclusion::{get_exclusion_reason, is_excluded, reconcile};
pub use models::{Case, CaseId, CaseTags, Department};
pub use state_machine::{get_stage, Stage};
