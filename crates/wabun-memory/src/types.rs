//! Input and result types of the archive.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use wabun_core::{CorrelationId, CyclePhase, Fragment, Importance, InteractionMetadata};
use wabun_index::FragmentBatch;

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

/// One prompt/response exchange to register.
///
/// Optional fields fall back to the archive defaults: importance 3, status
/// `Proposed`, intent `"unspecified"`, project `"General"`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionInput {
    /// Requester text.
    pub prompt: String,
    /// Responder text.
    pub response: String,
    /// Actor the prompt was addressed to.
    pub actor: String,
    /// Engine that answered.
    pub engine: String,
    /// Stated intent.
    pub intent: Option<String>,
    /// Keywords.
    pub keywords: Vec<String>,
    /// Associated project.
    pub project: Option<String>,
    /// Importance, 1–5.
    pub importance: Option<i64>,
    /// Decision status name (built-in, Spanish alias, or recognized custom).
    pub decision_status: Option<String>,
}

impl InteractionInput {
    /// Exchange with every optional field left at its default.
    pub fn new(
        prompt: impl Into<String>,
        response: impl Into<String>,
        actor: impl Into<String>,
        engine: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            actor: actor.into(),
            engine: engine.into(),
            ..Self::default()
        }
    }

    /// Set the intent.
    #[must_use]
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// Set the keywords.
    #[must_use]
    pub fn with_keywords<S: Into<String>>(mut self, keywords: impl IntoIterator<Item = S>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set the project.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the importance.
    #[must_use]
    pub fn with_importance(mut self, importance: i64) -> Self {
        self.importance = Some(importance);
        self
    }

    /// Set the decision status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.decision_status = Some(status.into());
        self
    }
}

/// A foundational document to register.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecreeInput {
    /// Caller-chosen decree id.
    pub decree_id: String,
    /// Title.
    pub title: String,
    /// Full text.
    pub content: String,
    /// Actors the decree concerns.
    pub implicated_actors: Vec<String>,
    /// Document type; `"Protocolo"` when absent.
    pub document_type: Option<String>,
    /// Version number; 1.0 when absent.
    pub version: Option<f64>,
    /// Source reference.
    pub source: Option<String>,
}

impl DecreeInput {
    /// Decree with default type, version and no source.
    pub fn new(
        decree_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            decree_id: decree_id.into(),
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Set the implicated actors.
    #[must_use]
    pub fn with_actors<S: Into<String>>(mut self, actors: impl IntoIterator<Item = S>) -> Self {
        self.implicated_actors = actors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the document type.
    #[must_use]
    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: f64) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the source reference.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query results
// ─────────────────────────────────────────────────────────────────────────────

/// A decoded fragment with its distance to the query.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredFragment {
    /// The fragment.
    pub fragment: Fragment,
    /// Distance to the query; lower is more similar.
    pub distance: f32,
    /// `1 - distance`.
    pub relevance: f32,
}

impl ScoredFragment {
    pub(crate) fn new(fragment: Fragment, distance: f32) -> Self {
        Self {
            fragment,
            distance,
            relevance: 1.0 - distance,
        }
    }
}

/// Combined interaction and decree search on one topic.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeResults {
    /// The searched topic.
    pub topic: String,
    /// Matching interaction fragments.
    pub interactions: Vec<ScoredFragment>,
    /// Matching decree fragments (empty when decrees were excluded).
    pub decrees: Vec<ScoredFragment>,
}

/// One interaction fragment surfaced by an analytics query.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionHit {
    /// Fragment id.
    pub fragment_id: String,
    /// Fragment text.
    pub text: String,
    /// Typed metadata.
    pub metadata: InteractionMetadata,
    /// `1 - distance`.
    pub relevance: f32,
}

/// An interaction whose decision is still `Proposed`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDecision {
    /// Interaction id.
    pub correlation_id: CorrelationId,
    /// Invoked actor.
    pub actor: String,
    /// Project.
    pub project: String,
    /// Intent.
    pub intent: String,
    /// Importance.
    pub importance: Importance,
    /// Start of the prompt text.
    pub excerpt: String,
}

/// Aggregate view of one actor's interactions.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorHistory {
    /// The actor.
    pub actor: String,
    /// Distinct interactions addressed to the actor.
    pub total_interactions: usize,
    /// Interactions per decision status.
    pub status_counts: BTreeMap<String, usize>,
    /// Projects the interactions belong to.
    pub projects: BTreeSet<String>,
    /// Prompt excerpts of the most recent interactions, newest first.
    pub recent_excerpts: Vec<String>,
}

/// One line of a cycle summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    /// Invoked actor.
    pub actor: String,
    /// Intent.
    pub intent: String,
    /// Project.
    pub project: String,
}

/// Interactions of one phase within a cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseGroup {
    /// The phase.
    pub phase: CyclePhase,
    /// All interactions recorded in the phase.
    pub total: usize,
    /// The first entries, oldest first.
    pub entries: Vec<SummaryEntry>,
}

/// Phase-grouped report of one cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    /// The summarized cycle.
    pub cycle_id: String,
    /// Non-empty phase groups in fixed phase order.
    pub phases: Vec<PhaseGroup>,
}

impl CycleSummary {
    /// Distinct interactions across all phases.
    pub fn total_interactions(&self) -> usize {
        self.phases.iter().map(|g| g.total).sum()
    }

    /// Markdown report.
    pub fn render(&self) -> String {
        let mut lines = vec![format!("# RESUMEN DEL CICLO: {}\n", self.cycle_id)];
        for group in &self.phases {
            lines.push(format!("\n## Fase: {}", group.phase));
            lines.push(format!("Total de interacciones: {}", group.total));
            for entry in &group.entries {
                lines.push(format!(
                    "- [{}] {} (Proyecto: {})",
                    entry.actor, entry.intent, entry.project
                ));
            }
        }
        lines.join("\n")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statistics and export
// ─────────────────────────────────────────────────────────────────────────────

/// Fragment counts per collection plus the current cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStats {
    /// Interaction fragments.
    pub interaction_count: usize,
    /// Decree fragments.
    pub decree_count: usize,
    /// Minutes fragments.
    pub minutes_count: usize,
    /// Entity fragments.
    pub entity_count: usize,
    /// Current cycle id.
    pub cycle_id: String,
    /// Current phase.
    pub phase: CyclePhase,
}

/// Read-only snapshot of the archive.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveExport {
    /// RFC 3339 UTC time of the export.
    pub export_timestamp: String,
    /// Statistics at export time.
    pub statistics: ArchiveStats,
    /// Every interaction fragment.
    pub interactions: FragmentBatch,
    /// Every decree fragment.
    pub decrees: FragmentBatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_input_builders() {
        let input = InteractionInput::new("p", "r", "LIANG", "engine-a")
            .with_intent("review")
            .with_keywords(["a", "b"])
            .with_project("CAELION")
            .with_importance(5)
            .with_status("Validada");
        assert_eq!(input.intent.as_deref(), Some("review"));
        assert_eq!(input.keywords, ["a", "b"]);
        assert_eq!(input.importance, Some(5));
        assert_eq!(input.decision_status.as_deref(), Some("Validada"));
    }

    #[test]
    fn interaction_input_from_partial_json() {
        let input: InteractionInput = serde_json::from_str(
            r#"{"prompt": "p", "response": "r", "actor": "ARESK", "engine": "e"}"#,
        )
        .unwrap();
        assert!(input.project.is_none());
        assert!(input.keywords.is_empty());
    }

    #[test]
    fn cycle_summary_render_format() {
        let summary = CycleSummary {
            cycle_id: "cycle_2026-10-16".into(),
            phases: vec![PhaseGroup {
                phase: CyclePhase::Encendido,
                total: 1,
                entries: vec![SummaryEntry {
                    actor: "LIANG".into(),
                    intent: "arranque".into(),
                    project: "General".into(),
                }],
            }],
        };
        assert_eq!(
            summary.render(),
            "# RESUMEN DEL CICLO: cycle_2026-10-16\n\n\n## Fase: Encendido\n\
             Total de interacciones: 1\n- [LIANG] arranque (Proyecto: General)"
        );
        assert_eq!(summary.total_interactions(), 1);
    }

    #[test]
    fn empty_summary_renders_header_only() {
        let summary = CycleSummary {
            cycle_id: "c".into(),
            phases: vec![],
        };
        assert_eq!(summary.render(), "# RESUMEN DEL CICLO: c\n");
    }
}
