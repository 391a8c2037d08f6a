//! Closed vocabularies stamped onto fragments.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SchemaError};

/// Phase of the operating cycle.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CyclePhase {
    /// Ignition.
    Encendido,
    /// Execution (the default phase).
    #[default]
    Ejecucion,
    /// Observation.
    Observacion,
    /// Equilibrium.
    Equilibrio,
}

impl CyclePhase {
    /// All phases in report order.
    pub const ALL: [Self; 4] = [
        Self::Encendido,
        Self::Ejecucion,
        Self::Observacion,
        Self::Equilibrio,
    ];

    /// Stored name of the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Encendido => "Encendido",
            Self::Ejecucion => "Ejecucion",
            Self::Observacion => "Observacion",
            Self::Equilibrio => "Equilibrio",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CyclePhase {
    type Err = SchemaError;

    /// Case-insensitive; accented spellings are accepted.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "encendido" => Ok(Self::Encendido),
            "ejecucion" | "ejecución" => Ok(Self::Ejecucion),
            "observacion" | "observación" => Ok(Self::Observacion),
            "equilibrio" => Ok(Self::Equilibrio),
            _ => Err(SchemaError::validation(format!("unknown cycle phase `{s}`"))),
        }
    }
}

/// Which side of an interaction a fragment came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The prompt author.
    Requester,
    /// The engine that answered.
    Responder,
}

impl Role {
    /// Stored name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requester => "Requester",
            Self::Responder => "Responder",
        }
    }

    /// Segment used when deriving fragment ids.
    pub fn id_segment(self) -> &'static str {
        match self {
            Self::Requester => "prompt",
            Self::Responder => "response",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Requester" | "Fundador" => Ok(Self::Requester),
            "Responder" | "Motor_IA" => Ok(Self::Responder),
            _ => Err(SchemaError::validation(format!("unknown role `{s}`"))),
        }
    }
}

/// Lifecycle status of the decision an interaction carries.
///
/// The three built-in statuses are always recognized. Additional statuses
/// are accepted at write time only when listed in the recognized set handed
/// to [`DecisionStatus::parse`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DecisionStatus {
    /// Awaiting validation.
    #[default]
    Proposed,
    /// Carried out.
    Executed,
    /// Confirmed.
    Validated,
    /// A deployment-specific status.
    Custom(String),
}

impl DecisionStatus {
    fn builtin(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "proposed" | "propuesta" => Some(Self::Proposed),
            "executed" | "ejecutada" => Some(Self::Executed),
            "validated" | "validada" => Some(Self::Validated),
            _ => None,
        }
    }

    /// Strict write-time parse. Built-in statuses (English or Spanish, any
    /// case) always pass; anything else must appear verbatim in `recognized`.
    pub fn parse(s: &str, recognized: &[String]) -> Result<Self> {
        if let Some(status) = Self::builtin(s) {
            return Ok(status);
        }
        if recognized.iter().any(|r| r == s) {
            return Ok(Self::Custom(s.to_owned()));
        }
        Err(SchemaError::validation(format!(
            "unrecognized decision status `{s}`"
        )))
    }

    /// Lenient read-side decode: whatever was stored is kept.
    pub fn from_stored(s: &str) -> Self {
        Self::builtin(s).unwrap_or_else(|| Self::Custom(s.to_owned()))
    }

    /// Stored name of the status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Proposed => "Proposed",
            Self::Executed => "Executed",
            Self::Validated => "Validated",
            Self::Custom(s) => s,
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DecisionStatus {
    fn from(s: String) -> Self {
        Self::from_stored(&s)
    }
}

impl From<DecisionStatus> for String {
    fn from(status: DecisionStatus) -> Self {
        status.as_str().to_owned()
    }
}

/// Kind of an entity record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A person or actor.
    Person,
    /// A project.
    Project,
    /// A key concept.
    Concept,
}

impl EntityKind {
    /// Stored name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Project => "Project",
            Self::Concept => "Concept",
        }
    }
}

impl FromStr for EntityKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Person" => Ok(Self::Person),
            "Project" => Ok(Self::Project),
            "Concept" => Ok(Self::Concept),
            _ => Err(SchemaError::validation(format!("unknown entity kind `{s}`"))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn phase_order_is_fixed() {
        let names: Vec<_> = CyclePhase::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, ["Encendido", "Ejecucion", "Observacion", "Equilibrio"]);
    }

    #[test]
    fn phase_parses_accents_and_case() {
        assert_eq!("Ejecución".parse::<CyclePhase>().unwrap(), CyclePhase::Ejecucion);
        assert_eq!("OBSERVACION".parse::<CyclePhase>().unwrap(), CyclePhase::Observacion);
        assert_matches!("Reposo".parse::<CyclePhase>(), Err(SchemaError::Validation(_)));
    }

    #[test]
    fn phase_default_is_execution() {
        assert_eq!(CyclePhase::default(), CyclePhase::Ejecucion);
    }

    #[test]
    fn role_aliases() {
        assert_eq!("Fundador".parse::<Role>().unwrap(), Role::Requester);
        assert_eq!("Motor_IA".parse::<Role>().unwrap(), Role::Responder);
        assert_matches!("Observer".parse::<Role>(), Err(SchemaError::Validation(_)));
    }

    #[test]
    fn status_builtin_in_both_languages() {
        assert_eq!(DecisionStatus::parse("Propuesta", &[]).unwrap(), DecisionStatus::Proposed);
        assert_eq!(DecisionStatus::parse("executed", &[]).unwrap(), DecisionStatus::Executed);
        assert_eq!(DecisionStatus::parse("Validada", &[]).unwrap(), DecisionStatus::Validated);
    }

    #[test]
    fn status_rejects_unrecognized() {
        assert_matches!(
            DecisionStatus::parse("Quizás", &[]),
            Err(SchemaError::Validation(_))
        );
    }

    #[test]
    fn status_accepts_recognized_custom() {
        let recognized = vec!["Archivada".to_owned()];
        assert_eq!(
            DecisionStatus::parse("Archivada", &recognized).unwrap(),
            DecisionStatus::Custom("Archivada".into())
        );
    }

    #[test]
    fn status_serde_as_plain_string() {
        let json = serde_json::to_string(&DecisionStatus::Validated).unwrap();
        assert_eq!(json, "\"Validated\"");
        let back: DecisionStatus = serde_json::from_str("\"Pausada\"").unwrap();
        assert_eq!(back, DecisionStatus::Custom("Pausada".into()));
    }
}
