//! Decree fragment metadata.

use chrono::NaiveDate;
use serde::Serialize;

use super::{
    encode_list, fields, get_f64, get_list, get_str, require_text, MetadataMap, Sequence,
};
use crate::errors::{Result, SchemaError};
use crate::ids::DecreeId;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Metadata stamped onto every fragment of one decree.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecreeMetadata {
    /// Caller-supplied decree id.
    pub decree_id: DecreeId,
    /// Title.
    pub title: String,
    /// Date the decree was registered (UTC).
    pub activation_date: NaiveDate,
    /// Actors the decree concerns.
    pub implicated_actors: Vec<String>,
    /// Document type, e.g. "Protocolo".
    pub document_type: String,
    /// Version number.
    pub version: f64,
    /// Optional source reference.
    pub source: Option<String>,
    /// Position within the decree.
    pub sequence: Sequence,
}

impl DecreeMetadata {
    /// Validate id, title and version.
    pub fn validate(&self) -> Result<()> {
        require_text(fields::DECREE_ID, &self.decree_id)?;
        require_text(fields::TITLE, &self.title)?;
        require_text(fields::DOCUMENT_TYPE, &self.document_type)?;
        if !self.version.is_finite() || self.version < 0.0 {
            return Err(SchemaError::validation(format!(
                "decree version {} must be a non-negative number",
                self.version
            )));
        }
        Ok(())
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
        let _ = map.insert(fields::DECREE_ID.into(), self.decree_id.as_str().into());
        let _ = map.insert(fields::TITLE.into(), (&self.title).into());
        let _ = map.insert(
            fields::ACTIVATION_DATE.into(),
            self.activation_date.format(DATE_FORMAT).to_string().into(),
        );
        let _ = map.insert(
            fields::IMPLICATED_ACTORS.into(),
            encode_list(&self.implicated_actors),
        );
        let _ = map.insert(fields::DOCUMENT_TYPE.into(), (&self.document_type).into());
        let _ = map.insert(fields::VERSION.into(), self.version.into());
        if let Some(source) = &self.source {
            let _ = map.insert(fields::SOURCE.into(), source.into());
        }
        self.sequence.encode(&mut map);
        map
    }

    pub(super) fn decode(map: &MetadataMap) -> Result<Self> {
        let raw_date = get_str(map, fields::ACTIVATION_DATE)?;
        let activation_date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|e| {
            SchemaError::validation(format!("bad activation date `{raw_date}`: {e}"))
        })?;
        let source = if map.contains_key(fields::SOURCE) {
            Some(get_str(map, fields::SOURCE)?.to_owned())
        } else {
            None
        };
        Ok(Self {
            decree_id: DecreeId::from(get_str(map, fields::DECREE_ID)?),
            title: get_str(map, fields::TITLE)?.to_owned(),
            activation_date,
            implicated_actors: get_list(map, fields::IMPLICATED_ACTORS)?,
            document_type: get_str(map, fields::DOCUMENT_TYPE)?.to_owned(),
            version: get_f64(map, fields::VERSION)?,
            source,
            sequence: Sequence::decode(map)?,
        })
    }
}
