//! Interaction fragment metadata.

use serde::Serialize;

use super::{
    encode_list, fields, get_i64, get_list, get_str, require_text, CyclePhase, DecisionStatus,
    Importance, MetadataMap, Role, Sequence,
};
use crate::errors::{Result, SchemaError};
use crate::ids::CorrelationId;

/// Metadata stamped onto every fragment of one interaction.
///
/// Everything except [`role`](Self::role) and [`sequence`](Self::sequence)
/// is shared by all fragments of the interaction.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionMetadata {
    /// Shared id of the prompt/response pair.
    pub correlation_id: CorrelationId,
    /// Creation time, seconds since the epoch.
    pub timestamp: i64,
    /// Cycle id at creation.
    pub cycle_id: String,
    /// Cycle phase at creation.
    pub phase: CyclePhase,
    /// Actor the prompt was addressed to.
    pub invoked_actor: String,
    /// Engine that answered.
    pub engine: String,
    /// Stated intent.
    pub intent: String,
    /// Keywords.
    pub keywords: Vec<String>,
    /// Associated project.
    pub project: String,
    /// Importance level.
    pub importance: Importance,
    /// Decision status.
    pub decision_status: DecisionStatus,
    /// Which side of the exchange this fragment holds.
    pub role: Role,
    /// Position among the fragments of the same role.
    pub sequence: Sequence,
}

impl InteractionMetadata {
    /// Validate the shared text fields.
    pub fn validate(&self) -> Result<()> {
        require_text(fields::INVOKED_ACTOR, &self.invoked_actor)?;
        require_text(fields::ENGINE, &self.engine)?;
        require_text(fields::CYCLE_ID, &self.cycle_id)
    }

    /// Copy of this metadata placed at `role`/`sequence`.
    #[must_use]
    pub fn with_position(&self, role: Role, sequence: Sequence) -> Self {
        Self {
            role,
            sequence,
            ..self.clone()
        }
    }

    pub(super) fn to_metadata(&self) -> MetadataMap {
        let mut map = MetadataMap::new();
        let _ = map.insert(fields::CORRELATION_ID.into(), self.correlation_id.as_str().into());
        let _ = map.insert(fields::TIMESTAMP.into(), self.timestamp.into());
        let _ = map.insert(fields::CYCLE_ID.into(), (&self.cycle_id).into());
        let _ = map.insert(fields::PHASE.into(), self.phase.as_str().into());
        let _ = map.insert(fields::INVOKED_ACTOR.into(), (&self.invoked_actor).into());
        let _ = map.insert(fields::ENGINE.into(), (&self.engine).into());
        let _ = map.insert(fields::INTENT.into(), (&self.intent).into());
        let _ = map.insert(fields::KEYWORDS.into(), encode_list(&self.keywords));
        let _ = map.insert(fields::PROJECT.into(), (&self.project).into());
        let _ = map.insert(fields::IMPORTANCE.into(), self.importance.get().into());
        let _ = map.insert(fields::DECISION_STATUS.into(), self.decision_status.as_str().into());
        let _ = map.insert(fields::ROLE.into(), self.role.as_str().into());
        self.sequence.encode(&mut map);
        map
    }

    pub(super) fn decode(map: &MetadataMap) -> Result<Self> {
        let phase = get_str(map, fields::PHASE)?.parse()?;
        let role = get_str(map, fields::ROLE)?.parse()?;
        let importance = Importance::new(get_i64(map, fields::IMPORTANCE)?)?;
        let correlation_id = get_str(map, fields::CORRELATION_ID)?;
        if correlation_id.is_empty() {
            return Err(SchemaError::validation("empty correlation id"));
        }
        Ok(Self {
            correlation_id: CorrelationId::from(correlation_id),
            timestamp: get_i64(map, fields::TIMESTAMP)?,
            cycle_id: get_str(map, fields::CYCLE_ID)?.to_owned(),
            phase,
            invoked_actor: get_str(map, fields::INVOKED_ACTOR)?.to_owned(),
            engine: get_str(map, fields::ENGINE)?.to_owned(),
            intent: get_str(map, fields::INTENT)?.to_owned(),
            keywords: get_list(map, fields::KEYWORDS)?,
            project: get_str(map, fields::PROJECT)?.to_owned(),
            importance,
            decision_status: DecisionStatus::from_stored(get_str(map, fields::DECISION_STATUS)?),
            role,
            sequence: Sequence::decode(map)?,
        })
    }
}
