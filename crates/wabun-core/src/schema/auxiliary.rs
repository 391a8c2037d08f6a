//! Minutes and entity metadata.

use serde::Serialize;

use super::{fields, get_i64, get_str, require_text, EntityKind, MetadataMap, Sequence};
use crate::errors::{Result, SchemaError};
use crate::ids::{EntityId, MinutesId};

/// Metadata of a stored cycle summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinutesMetadata {
    /// Minutes record id.
    pub minutes_id: MinutesId,
    /// Cycle the minutes summarize.
    pub cycle_id: String,
    /// Creation time, seconds since the epoch.
    pub timestamp: i64,
    /// Distinct interactions the summary covers.
    pub interaction_count: u32,
    /// Position within the minutes text.
    pub sequence: Sequence,
}

impl MinutesMetadata {
    /// Copy of this metadata placed at `sequence`.
    #[must_use]
    pub fn with_sequence(&self, sequence: Sequence) -> Self {
        Self {
            sequence,
            ..self.clone()
        }
    }

    pub(super) fn to_metadata(&self) -> MetadataMap {
        let mut map = MetadataMap::new();
        let _ = map.insert(fields::MINUTES_ID.into(), self.minutes_id.as_str().into());
        let _ = map.insert(fields::CYCLE_ID.into(), (&self.cycle_id).into());
        let _ = map.insert(fields::TIMESTAMP.into(), self.timestamp.into());
        let _ = map.insert(fields::INTERACTION_COUNT.into(), self.interaction_count.into());
        self.sequence.encode(&mut map);
        map
    }

    pub(super) fn decode(map: &MetadataMap) -> Result<Self> {
        let interaction_count = u32::try_from(get_i64(map, fields::INTERACTION_COUNT)?)
            .map_err(|_| SchemaError::validation("negative interaction count"))?;
        Ok(Self {
            minutes_id: MinutesId::from(get_str(map, fields::MINUTES_ID)?),
            cycle_id: get_str(map, fields::CYCLE_ID)?.to_owned(),
            timestamp: get_i64(map, fields::TIMESTAMP)?,
            interaction_count,
            sequence: Sequence::decode(map)?,
        })
    }
}

/// Metadata of a person, project or concept record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    /// Entity record id.
    pub entity_id: EntityId,
    /// Unique display name.
    pub name: String,
    /// Entity kind.
    pub kind: EntityKind,
    /// Creation time, seconds since the epoch.
    pub timestamp: i64,
    /// Position within the description.
    pub sequence: Sequence,
}

impl EntityMetadata {
    /// Validate the name.
    pub fn validate(&self) -> Result<()> {
        require_text(fields::NAME, &self.name)
    }

    /// Copy of this metadata placed at `sequence`.
    #[must_use]
    pub fn with_sequence(&self, sequence: Sequence) -> Self {
        Self {
            sequence,
            ..self.clone()
        }
    }

    pub(super) fn to_metadata(&self) -> MetadataMap {
        let mut map = MetadataMap::new();
        let _ = map.insert(fields::ENTITY_ID.into(), self.entity_id.as_str().into());
        let _ = map.insert(fields::NAME.into(), (&self.name).into());
        let _ = map.insert(fields::KIND.into(), self.kind.as_str().into());
        let _ = map.insert(fields::TIMESTAMP.into(), self.timestamp.into());
        self.sequence.encode(&mut map);
        map
    }

    pub(super) fn decode(map: &MetadataMap) -> Result<Self> {
        Ok(Self {
            entity_id: EntityId::from(get_str(map, fields::ENTITY_ID)?),
            name: get_str(map, fields::NAME)?.to_owned(),
            kind: get_str(map, fields::KIND)?.parse()?,
            timestamp: get_i64(map, fields::TIMESTAMP)?,
            sequence: Sequence::decode(map)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MetadataValue;
    use assert_matches::assert_matches;

    #[test]
    fn minutes_roundtrip() {
        let meta = MinutesMetadata {
            minutes_id: MinutesId::from("min_1"),
            cycle_id: "cycle_2026-10-16".into(),
            timestamp: 42,
            interaction_count: 3,
            sequence: Sequence::new(0, 1).unwrap(),
        };
        assert_eq!(MinutesMetadata::decode(&meta.to_metadata()).unwrap(), meta);
    }

    #[test]
    fn entity_roundtrip_and_bad_kind() {
        let meta = EntityMetadata {
            entity_id: EntityId::from("ent_1"),
            name: "ARESK".into(),
            kind: EntityKind::Person,
            timestamp: 7,
            sequence: Sequence::new(0, 1).unwrap(),
        };
        let mut map = meta.to_metadata();
        assert_eq!(EntityMetadata::decode(&map).unwrap(), meta);

        let _ = map.insert(fields::KIND.into(), MetadataValue::from("Place"));
        assert_matches!(EntityMetadata::decode(&map), Err(SchemaError::Validation(_)));
    }
}
