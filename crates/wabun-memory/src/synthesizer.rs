//! Context bundle assembly for a downstream engine session.
//!
//! Sections, in order:
//! 1. identity header (always)
//! 2. cycle, phase and invoked actor (always)
//! 3. the actor's protocol decrees
//! 4. recent interactions with the actor, optionally within a project
//! 5. validated decisions of the project, when a project is given
//!
//! Sections 3–5 are left out when their query finds nothing. The token
//! budget is estimated from character counts and only logged when exceeded.

use chrono::{DateTime, SecondsFormat};
use tracing::{debug, warn};
use wabun_core::schema::fields;
use wabun_core::text::{char_len, excerpt};
use wabun_core::{CollectionKind, DecisionStatus, FilterComposer};

use crate::archive::Archive;
use crate::errors::{ArchiveError, Result};
use crate::types::ScoredFragment;

const UNKNOWN_TIME: &str = "N/A";

/// Builds context bundles from an [`Archive`]. Holds no state of its own.
pub struct ContextSynthesizer<'a> {
    archive: &'a Archive,
}

impl<'a> ContextSynthesizer<'a> {
    pub(crate) fn new(archive: &'a Archive) -> Self {
        Self { archive }
    }

    /// Assemble the context bundle for a session with `actor`.
    pub async fn synthesize(
        &self,
        actor: &str,
        project: Option<&str>,
        token_budget: usize,
    ) -> Result<String> {
        if actor.trim().is_empty() {
            return Err(ArchiveError::validation("actor must not be empty"));
        }
        let settings = &self.archive.settings().synthesis;
        let mut lines = vec!["## IDENTIDAD DEL FUNDADOR".to_owned()];
        lines.extend(settings.identity_lines.iter().cloned());
        lines.push(String::new());

        let snapshot = self.archive.cycle().snapshot();
        lines.push("## ESTADO ACTUAL DEL SISTEMA".to_owned());
        lines.push(format!("Ciclo: {}", snapshot.cycle_id));
        lines.push(format!("Fase: {}", snapshot.phase));
        lines.push(format!("Custodio Invocado: {actor}"));
        lines.push(String::new());

        let decrees = self
            .archive
            .search_decrees(
                &format!("Protocolo {actor} propósito principio"),
                settings.decree_k,
            )
            .await?;
        if !decrees.is_empty() {
            lines.push(format!("## PROTOCOLO DE {actor}"));
            lines.extend(decrees.into_iter().map(|hit| hit.fragment.text));
            lines.push(String::new());
        }

        let mut recent_filter = FilterComposer::new(CollectionKind::Interactions)
            .eq(fields::INVOKED_ACTOR, actor);
        if let Some(project) = project {
            recent_filter = recent_filter.eq(fields::PROJECT, project);
        }
        let recent = self
            .archive
            .search_interactions(
                &format!("resumen de interacciones con {actor}"),
                settings.recent_k,
                Some(&recent_filter.build()?),
            )
            .await?;
        if !recent.is_empty() {
            lines.push("## CONTEXTO RECIENTE".to_owned());
            for hit in recent.iter().take(settings.recent_shown) {
                lines.push(format!(
                    "[{}] {}",
                    created_at(hit),
                    excerpt(&hit.fragment.text, settings.recent_excerpt_chars)
                ));
            }
            lines.push(String::new());
        }

        if let Some(project) = project {
            let validated = FilterComposer::new(CollectionKind::Interactions)
                .eq(fields::PROJECT, project)
                .eq(fields::DECISION_STATUS, DecisionStatus::Validated.as_str())
                .build()?;
            let decisions = self
                .archive
                .search_interactions(
                    &format!("decisiones del proyecto {project}"),
                    settings.decision_k,
                    Some(&validated),
                )
                .await?;
            if !decisions.is_empty() {
                lines.push(format!("## DECISIONES VALIDADAS - {project}"));
                for hit in decisions.iter().take(settings.decision_shown) {
                    lines.push(format!(
                        "- {}",
                        excerpt(&hit.fragment.text, settings.decision_excerpt_chars)
                    ));
                }
            }
        }

        let output = lines.join("\n");
        let estimated_tokens = estimate_tokens(&output, settings.chars_per_token);
        if estimated_tokens > token_budget {
            warn!(
                actor,
                estimated_tokens, token_budget, "synthesized context exceeds token budget"
            );
        }
        debug!(actor, estimated_tokens, chars = char_len(&output), "context synthesized");
        Ok(output)
    }
}

/// Rough token count: one token per `chars_per_token` characters.
pub fn estimate_tokens(text: &str, chars_per_token: usize) -> usize {
    char_len(text).div_ceil(chars_per_token.max(1))
}

fn created_at(hit: &ScoredFragment) -> String {
    hit.fragment
        .metadata
        .as_interaction()
        .and_then(|meta| DateTime::from_timestamp(meta.timestamp, 0))
        .map_or_else(
            || UNKNOWN_TIME.to_owned(),
            |time| time.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tracing::Level;
    use wabun_core::logging::capture_logs;
    use wabun_core::{CyclePhase, CycleState};
    use wabun_index::{HashEmbeddingService, SqliteVectorIndex};
    use wabun_settings::WabunSettings;

    use crate::types::{DecreeInput, InteractionInput};

    fn archive() -> Archive {
        let index = SqliteVectorIndex::in_memory(Arc::new(HashEmbeddingService::new(64))).unwrap();
        Archive::new(
            Arc::new(index),
            Arc::new(CycleState::new("cycle_2026-10-16", CyclePhase::Observacion)),
            WabunSettings::default(),
        )
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens("", 4), 0);
        assert_eq!(estimate_tokens("abcd", 4), 1);
        assert_eq!(estimate_tokens("abcde", 4), 2);
        assert_eq!(estimate_tokens("ñññ", 0), 3);
    }

    #[tokio::test]
    async fn empty_archive_has_only_fixed_sections() {
        let output = archive().synthesizer().synthesize("ARESK", None, 2000).await.unwrap();
        assert_eq!(
            output,
            "## IDENTIDAD DEL FUNDADOR\n\
             Juan Everardo Islas Urquidy\n\
             Fundador de CAELION - Arquitectura Simbiótica Cognitiva\n\
             \n\
             ## ESTADO ACTUAL DEL SISTEMA\n\
             Ciclo: cycle_2026-10-16\n\
             Fase: Observacion\n\
             Custodio Invocado: ARESK\n"
        );
    }

    #[tokio::test]
    async fn all_sections_in_order() {
        let archive = archive();
        let _ = archive
            .register_decree(DecreeInput::new(
                "DEC-ARESK",
                "Protocolo ARESK",
                "Protocolo ARESK: su propósito es custodiar el principio de equilibrio.",
            ))
            .await
            .unwrap();
        let _ = archive
            .register_interaction(
                InteractionInput::new("Plan de arquitectura", "Aprobado", "ARESK", "engine-a")
                    .with_project("X")
                    .with_status("Validada"),
            )
            .await
            .unwrap();

        let output = archive
            .synthesizer()
            .synthesize("ARESK", Some("X"), 2000)
            .await
            .unwrap();
        let order: Vec<_> = [
            "## IDENTIDAD DEL FUNDADOR",
            "## ESTADO ACTUAL DEL SISTEMA",
            "## PROTOCOLO DE ARESK",
            "## CONTEXTO RECIENTE",
            "## DECISIONES VALIDADAS - X",
        ]
        .iter()
        .map(|header| output.find(header).unwrap())
        .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{output}");
        assert!(output.contains("propósito es custodiar"));
        assert!(output.contains("- Plan de arquitectura"));
        assert!(output.contains("Z] Plan de arquitectura"));
    }

    #[tokio::test]
    async fn recent_context_respects_project_filter() {
        let archive = archive();
        let _ = archive
            .register_interaction(
                InteractionInput::new("Tema interno", "ok", "LIANG", "engine-a").with_project("Y"),
            )
            .await
            .unwrap();
        let output = archive
            .synthesizer()
            .synthesize("LIANG", Some("X"), 2000)
            .await
            .unwrap();
        assert!(!output.contains("## CONTEXTO RECIENTE"));
        assert!(!output.contains("DECISIONES VALIDADAS"));
    }

    #[tokio::test]
    async fn over_budget_is_logged_not_enforced() {
        let (logs, _guard) = capture_logs();
        let output = archive().synthesizer().synthesize("ARESK", None, 1).await.unwrap();
        assert!(output.contains("## ESTADO ACTUAL DEL SISTEMA"));
        let event = logs.find("exceeds token budget").unwrap();
        assert_eq!(event.level, Level::WARN);
        assert_eq!(event.field("token_budget"), Some("1"));
    }

    #[tokio::test]
    async fn within_budget_logs_no_warning() {
        let (logs, _guard) = capture_logs();
        let _ = archive().synthesizer().synthesize("ARESK", None, 10_000).await.unwrap();
        assert!(!logs.has_event(Level::WARN, "exceeds token budget"));
    }

    #[tokio::test]
    async fn blank_actor_rejected() {
        assert!(matches!(
            archive().synthesizer().synthesize("", None, 100).await,
            Err(ArchiveError::Validation(_))
        ));
    }
}
