//! # wabun-core
//!
//! Foundation types for the Wabun memory archive.
//!
//! This crate provides the shared vocabulary that the index and archive
//! crates depend on:
//!
//! - **Branded IDs**: [`ids::CorrelationId`], [`ids::DecreeId`], [`ids::EntityId`], [`ids::MinutesId`]
//! - **Fragmentation**: [`chunker::fragment`] paragraph-bounded text splitting
//! - **Schema**: [`schema::FragmentMetadata`] typed per-collection metadata with
//!   validation, encoded to a flat [`schema::MetadataMap`] only at the index boundary
//! - **Filters**: [`filter::FilterComposer`] building [`filter::FilterPredicate`] trees
//! - **Cycle state**: [`cycle::CycleState`] stamped onto every new record
//! - **Errors**: [`errors::SchemaError`] via `thiserror`
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other wabun crates.

#![deny(unsafe_code)]

pub mod chunker;
pub mod constants;
pub mod cycle;
pub mod errors;
pub mod filter;
pub mod ids;
pub mod logging;
pub mod schema;
pub mod text;

pub use chunker::fragment;
pub use cycle::{CycleSnapshot, CycleState};
pub use errors::{Result, SchemaError};
pub use filter::{Constraint, FilterComposer, FilterPredicate};
pub use ids::{CorrelationId, DecreeId, EntityId, MinutesId};
pub use schema::{
    CollectionKind, CyclePhase, DecisionStatus, DecreeMetadata, EntityKind, EntityMetadata,
    FieldKind, Fragment, FragmentMetadata, Importance, InteractionMetadata, MetadataMap,
    MetadataValue, MinutesMetadata, Role, Sequence,
};
