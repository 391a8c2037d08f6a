//! Typed fragment schemas.
//!
//! Each collection has a closed, typed metadata schema. Records are
//! validated when their metadata is constructed; the flat
//! [`MetadataMap`] form exists only at the index boundary
//! ([`FragmentMetadata::to_metadata`] / [`FragmentMetadata::decode`]).
//! Multi-valued fields (keywords, implicated actors) are `Vec<String>` here
//! and JSON-encoded strings in the map.

mod auxiliary;
mod decree;
mod enums;
mod interaction;
mod value;

pub use auxiliary::{EntityMetadata, MinutesMetadata};
pub use decree::DecreeMetadata;
pub use enums::{CyclePhase, DecisionStatus, EntityKind, Role};
pub use interaction::InteractionMetadata;
pub use value::{MetadataMap, MetadataValue};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SchemaError};

/// Metadata field names shared by the schemas and the filter composer.
pub mod fields {
    /// Interaction correlation id.
    pub const CORRELATION_ID: &str = "correlation_id";
    /// Creation time, integer seconds since the epoch.
    pub const TIMESTAMP: &str = "timestamp";
    /// Cycle id stamped at creation.
    pub const CYCLE_ID: &str = "cycle_id";
    /// Cycle phase stamped at creation.
    pub const PHASE: &str = "phase";
    /// Actor the interaction was addressed to.
    pub const INVOKED_ACTOR: &str = "invoked_actor";
    /// Engine that produced the response.
    pub const ENGINE: &str = "engine";
    /// Stated intent of the requester.
    pub const INTENT: &str = "intent";
    /// JSON-encoded keyword list.
    pub const KEYWORDS: &str = "keywords";
    /// Associated project.
    pub const PROJECT: &str = "project";
    /// Importance level, 1–5.
    pub const IMPORTANCE: &str = "importance";
    /// Decision status.
    pub const DECISION_STATUS: &str = "decision_status";
    /// Requester or responder.
    pub const ROLE: &str = "role";
    /// 0-based position within the parent record.
    pub const SEQUENCE_INDEX: &str = "sequence_index";
    /// Fragment count of the parent record (per role for interactions).
    pub const SEQUENCE_TOTAL: &str = "sequence_total";
    /// Decree id.
    pub const DECREE_ID: &str = "decree_id";
    /// Decree title.
    pub const TITLE: &str = "title";
    /// Decree activation date, `YYYY-MM-DD`.
    pub const ACTIVATION_DATE: &str = "activation_date";
    /// JSON-encoded implicated actor list.
    pub const IMPLICATED_ACTORS: &str = "implicated_actors";
    /// Decree document type.
    pub const DOCUMENT_TYPE: &str = "document_type";
    /// Decree version number.
    pub const VERSION: &str = "version";
    /// Decree source reference.
    pub const SOURCE: &str = "source";
    /// Minutes id.
    pub const MINUTES_ID: &str = "minutes_id";
    /// Interactions covered by a minutes record.
    pub const INTERACTION_COUNT: &str = "interaction_count";
    /// Entity id.
    pub const ENTITY_ID: &str = "entity_id";
    /// Entity name.
    pub const NAME: &str = "name";
    /// Entity kind.
    pub const KIND: &str = "kind";
}

/// Value shape of a schema field, used to validate filter constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Integer.
    Integer,
    /// Integer or float.
    Float,
    /// JSON-encoded list of strings (equality on the encoded form only).
    TextList,
    /// A [`CyclePhase`] name.
    Phase,
    /// A [`Role`] name.
    Role,
    /// A [`DecisionStatus`] name.
    Status,
}

impl FieldKind {
    /// Whether range constraints apply to this field.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

const SEQUENCE_FIELDS: [(&str, FieldKind); 2] = [
    (fields::SEQUENCE_INDEX, FieldKind::Integer),
    (fields::SEQUENCE_TOTAL, FieldKind::Integer),
];

const INTERACTION_FIELDS: &[(&str, FieldKind)] = &[
    (fields::CORRELATION_ID, FieldKind::Text),
    (fields::TIMESTAMP, FieldKind::Integer),
    (fields::CYCLE_ID, FieldKind::Text),
    (fields::PHASE, FieldKind::Phase),
    (fields::INVOKED_ACTOR, FieldKind::Text),
    (fields::ENGINE, FieldKind::Text),
    (fields::INTENT, FieldKind::Text),
    (fields::KEYWORDS, FieldKind::TextList),
    (fields::PROJECT, FieldKind::Text),
    (fields::IMPORTANCE, FieldKind::Integer),
    (fields::DECISION_STATUS, FieldKind::Status),
    (fields::ROLE, FieldKind::Role),
    SEQUENCE_FIELDS[0],
    SEQUENCE_FIELDS[1],
];

const DECREE_FIELDS: &[(&str, FieldKind)] = &[
    (fields::DECREE_ID, FieldKind::Text),
    (fields::TITLE, FieldKind::Text),
    (fields::ACTIVATION_DATE, FieldKind::Text),
    (fields::IMPLICATED_ACTORS, FieldKind::TextList),
    (fields::DOCUMENT_TYPE, FieldKind::Text),
    (fields::VERSION, FieldKind::Float),
    (fields::SOURCE, FieldKind::Text),
    SEQUENCE_FIELDS[0],
    SEQUENCE_FIELDS[1],
];

const MINUTES_FIELDS: &[(&str, FieldKind)] = &[
    (fields::MINUTES_ID, FieldKind::Text),
    (fields::CYCLE_ID, FieldKind::Text),
    (fields::TIMESTAMP, FieldKind::Integer),
    (fields::INTERACTION_COUNT, FieldKind::Integer),
    SEQUENCE_FIELDS[0],
    SEQUENCE_FIELDS[1],
];

const ENTITY_FIELDS: &[(&str, FieldKind)] = &[
    (fields::ENTITY_ID, FieldKind::Text),
    (fields::NAME, FieldKind::Text),
    (fields::KIND, FieldKind::Text),
    (fields::TIMESTAMP, FieldKind::Integer),
    SEQUENCE_FIELDS[0],
    SEQUENCE_FIELDS[1],
];

/// The four independently queryable partitions of the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Prompt/response exchanges.
    Interactions,
    /// Protocols, laws and principles.
    Decrees,
    /// Cycle summaries.
    Minutes,
    /// People, projects and key concepts.
    Entities,
}

impl CollectionKind {
    /// All collections.
    pub const ALL: [Self; 4] = [
        Self::Interactions,
        Self::Decrees,
        Self::Minutes,
        Self::Entities,
    ];

    /// Collection name used by the index.
    pub fn name(self) -> &'static str {
        match self {
            Self::Interactions => "interactions",
            Self::Decrees => "decrees",
            Self::Minutes => "minutes",
            Self::Entities => "entities",
        }
    }

    /// Field schema of the collection.
    pub fn schema(self) -> &'static [(&'static str, FieldKind)] {
        match self {
            Self::Interactions => INTERACTION_FIELDS,
            Self::Decrees => DECREE_FIELDS,
            Self::Minutes => MINUTES_FIELDS,
            Self::Entities => ENTITY_FIELDS,
        }
    }

    /// Kind of `field`, or `None` when the schema does not define it.
    pub fn field_kind(self, field: &str) -> Option<FieldKind> {
        self.schema()
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, kind)| *kind)
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of a fragment within its parent record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    index: u32,
    total: u32,
}

impl Sequence {
    /// Validated position; requires `index < total`.
    pub fn new(index: u32, total: u32) -> Result<Self> {
        if index >= total {
            return Err(SchemaError::validation(format!(
                "sequence index {index} not below total {total}"
            )));
        }
        Ok(Self { index, total })
    }

    /// 0-based position.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Fragment count of the parent.
    pub fn total(self) -> u32 {
        self.total
    }

    fn encode(self, map: &mut MetadataMap) {
        let _ = map.insert(fields::SEQUENCE_INDEX.into(), self.index.into());
        let _ = map.insert(fields::SEQUENCE_TOTAL.into(), self.total.into());
    }

    fn decode(map: &MetadataMap) -> Result<Self> {
        let index = u32::try_from(get_i64(map, fields::SEQUENCE_INDEX)?)
            .map_err(|_| SchemaError::validation("negative sequence index"))?;
        let total = u32::try_from(get_i64(map, fields::SEQUENCE_TOTAL)?)
            .map_err(|_| SchemaError::validation("negative sequence total"))?;
        Self::new(index, total)
    }
}

/// Importance level of an interaction, 1 (lowest) to 5 (highest).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Importance(u8);

impl Importance {
    /// Lowest accepted level.
    pub const MIN: u8 = 1;
    /// Highest accepted level.
    pub const MAX: u8 = 5;
    /// Level used when the caller supplies none.
    pub const DEFAULT: Self = Self(3);

    /// Validated importance; anything outside `[1, 5]` is rejected.
    pub fn new(level: i64) -> Result<Self> {
        u8::try_from(level)
            .ok()
            .filter(|l| (Self::MIN..=Self::MAX).contains(l))
            .map(Self)
            .ok_or_else(|| {
                SchemaError::validation(format!(
                    "importance {level} outside [{}, {}]",
                    Self::MIN,
                    Self::MAX
                ))
            })
    }

    /// The level as a number.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Importance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed metadata of one fragment, tagged by collection.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "collection", rename_all = "lowercase")]
pub enum FragmentMetadata {
    /// Interaction fragment.
    Interaction(InteractionMetadata),
    /// Decree fragment.
    Decree(DecreeMetadata),
    /// Minutes fragment.
    Minutes(MinutesMetadata),
    /// Entity fragment.
    Entity(EntityMetadata),
}

impl FragmentMetadata {
    /// Collection this metadata belongs to.
    pub fn collection(&self) -> CollectionKind {
        match self {
            Self::Interaction(_) => CollectionKind::Interactions,
            Self::Decree(_) => CollectionKind::Decrees,
            Self::Minutes(_) => CollectionKind::Minutes,
            Self::Entity(_) => CollectionKind::Entities,
        }
    }

    /// Position within the parent record.
    pub fn sequence(&self) -> Sequence {
        match self {
            Self::Interaction(m) => m.sequence,
            Self::Decree(m) => m.sequence,
            Self::Minutes(m) => m.sequence,
            Self::Entity(m) => m.sequence,
        }
    }

    /// Interaction metadata, if this is an interaction fragment.
    pub fn as_interaction(&self) -> Option<&InteractionMetadata> {
        match self {
            Self::Interaction(m) => Some(m),
            _ => None,
        }
    }

    /// Decree metadata, if this is a decree fragment.
    pub fn as_decree(&self) -> Option<&DecreeMetadata> {
        match self {
            Self::Decree(m) => Some(m),
            _ => None,
        }
    }

    /// Encode to the index-native flat form.
    pub fn to_metadata(&self) -> MetadataMap {
        match self {
            Self::Interaction(m) => m.to_metadata(),
            Self::Decree(m) => m.to_metadata(),
            Self::Minutes(m) => m.to_metadata(),
            Self::Entity(m) => m.to_metadata(),
        }
    }

    /// Decode a flat map read from `collection`.
    pub fn decode(collection: CollectionKind, map: &MetadataMap) -> Result<Self> {
        Ok(match collection {
            CollectionKind::Interactions => Self::Interaction(InteractionMetadata::decode(map)?),
            CollectionKind::Decrees => Self::Decree(DecreeMetadata::decode(map)?),
            CollectionKind::Minutes => Self::Minutes(MinutesMetadata::decode(map)?),
            CollectionKind::Entities => Self::Entity(EntityMetadata::decode(map)?),
        })
    }
}

/// Smallest stored unit: a bounded piece of record text plus its metadata.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    /// Globally unique, immutable fragment id.
    pub id: String,
    /// Fragment text.
    pub text: String,
    /// Typed metadata.
    pub metadata: FragmentMetadata,
}

impl Fragment {
    /// Decode a stored row of `collection`.
    pub fn decode(
        collection: CollectionKind,
        id: String,
        text: String,
        map: &MetadataMap,
    ) -> Result<Self> {
        Ok(Self {
            id,
            text,
            metadata: FragmentMetadata::decode(collection, map)?,
        })
    }

    /// 0-based position within the parent record.
    pub fn sequence_index(&self) -> u32 {
        self.metadata.sequence().index()
    }

    /// Fragment count of the parent record.
    pub fn sequence_total(&self) -> u32 {
        self.metadata.sequence().total()
    }
}

// ── Boundary helpers ────────────────────────────────────────────────────────

fn missing(field: &str) -> SchemaError {
    SchemaError::validation(format!("metadata field `{field}` missing or mistyped"))
}

pub(crate) fn get_str<'a>(map: &'a MetadataMap, field: &str) -> Result<&'a str> {
    map.get(field)
        .and_then(MetadataValue::as_str)
        .ok_or_else(|| missing(field))
}

pub(crate) fn get_i64(map: &MetadataMap, field: &str) -> Result<i64> {
    map.get(field)
        .and_then(MetadataValue::as_i64)
        .ok_or_else(|| missing(field))
}

pub(crate) fn get_f64(map: &MetadataMap, field: &str) -> Result<f64> {
    map.get(field)
        .and_then(MetadataValue::as_f64)
        .ok_or_else(|| missing(field))
}

pub(crate) fn get_list(map: &MetadataMap, field: &str) -> Result<Vec<String>> {
    serde_json::from_str(get_str(map, field)?).map_err(|e| {
        SchemaError::validation(format!("metadata field `{field}` is not a string list: {e}"))
    })
}

pub(crate) fn encode_list(items: &[String]) -> MetadataValue {
    // A Vec<String> always serializes.
    MetadataValue::Text(serde_json::to_string(items).unwrap_or_else(|_| "[]".to_owned()))
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SchemaError::validation(format!("`{field}` must not be empty")));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn importance_bounds() {
        assert_eq!(Importance::new(1).unwrap().get(), 1);
        assert_eq!(Importance::new(5).unwrap().get(), 5);
        for bad in [0, 6, -1, 300] {
            assert_matches!(Importance::new(bad), Err(SchemaError::Validation(_)));
        }
    }

    #[test]
    fn importance_default_is_three() {
        assert_eq!(Importance::default().get(), 3);
    }

    #[test]
    fn sequence_requires_index_below_total() {
        assert!(Sequence::new(0, 1).is_ok());
        assert_matches!(Sequence::new(1, 1), Err(SchemaError::Validation(_)));
        assert_matches!(Sequence::new(0, 0), Err(SchemaError::Validation(_)));
    }

    #[test]
    fn collection_names() {
        let names: Vec<_> = CollectionKind::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["interactions", "decrees", "minutes", "entities"]);
    }

    #[test]
    fn field_kind_lookup() {
        assert_eq!(
            CollectionKind::Interactions.field_kind(fields::IMPORTANCE),
            Some(FieldKind::Integer)
        );
        assert_eq!(
            CollectionKind::Decrees.field_kind(fields::VERSION),
            Some(FieldKind::Float)
        );
        assert_eq!(CollectionKind::Decrees.field_kind(fields::IMPORTANCE), None);
        assert_eq!(CollectionKind::Entities.field_kind("mood"), None);
    }

    #[test]
    fn every_collection_has_sequence_fields() {
        for collection in CollectionKind::ALL {
            assert!(collection.field_kind(fields::SEQUENCE_INDEX).is_some());
            assert!(collection.field_kind(fields::SEQUENCE_TOTAL).is_some());
        }
    }

    #[test]
    fn list_encoding_roundtrip() {
        let mut map = MetadataMap::new();
        let items = vec!["chromadb".to_owned(), "memoria".to_owned()];
        let _ = map.insert(fields::KEYWORDS.into(), encode_list(&items));
        assert_eq!(get_list(&map, fields::KEYWORDS).unwrap(), items);
    }

    #[test]
    fn missing_field_is_validation_error() {
        let map = MetadataMap::new();
        assert_matches!(get_str(&map, fields::TITLE), Err(SchemaError::Validation(_)));
    }
}
