//! # wabun-memory
//!
//! The Wabun structured memory archive.
//!
//! - [`Archive`]: registration of interactions, decrees, entities and cycle
//!   minutes; filtered semantic retrieval; statistics and JSON export
//! - [`Analytics`]: pending decisions, actor history, importance and date
//!   scans, phase-grouped cycle summaries
//! - [`ContextSynthesizer`]: the ranked, size-bounded context bundle handed
//!   to an engine at session start
//!
//! ## Crate Position
//!
//! Top of the stack. Depends on `wabun-core` (schema, filters, cycle
//! state), `wabun-index` (the [`wabun_index::VectorIndex`] collaborator) and
//! `wabun-settings`.

#![deny(unsafe_code)]

pub mod analytics;
pub mod archive;
pub mod errors;
pub mod synthesizer;
pub mod types;

pub use analytics::Analytics;
pub use archive::Archive;
pub use errors::{ArchiveError, Result};
pub use synthesizer::{ContextSynthesizer, estimate_tokens};
pub use types::{
    ActorHistory, ArchiveExport, ArchiveStats, CycleSummary, DecreeInput, InteractionHit,
    InteractionInput, KnowledgeResults, PendingDecision, PhaseGroup, ScoredFragment,
    SummaryEntry,
};
