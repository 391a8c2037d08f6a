//! Read-only aggregations over interaction metadata.
//!
//! Every aggregation is a filtered similarity query with a neutral phrase,
//! followed by a dedupe to one hit per interaction. Hits are ranked by
//! relevance descending, then correlation id, then fragment id.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Utc;
use tracing::debug;
use wabun_core::schema::fields;
use wabun_core::text::excerpt;
use wabun_core::{
    CollectionKind, CyclePhase, DecisionStatus, FilterComposer, FilterPredicate,
    FragmentMetadata, Importance, Role,
};

use crate::archive::Archive;
use crate::errors::{ArchiveError, Result};
use crate::types::{
    ActorHistory, CycleSummary, InteractionHit, PendingDecision, PhaseGroup, ScoredFragment,
    SummaryEntry,
};

const PENDING_PHRASE: &str = "decisiones pendientes de validación";
const HIGH_IMPORTANCE_PHRASE: &str = "interacciones de alta importancia";
const DATE_RANGE_PHRASE: &str = "resumen de interacciones en el período";
const CYCLE_SUMMARY_PHRASE: &str = "resumen completo del ciclo";

/// Aggregation queries bound to an [`Archive`]. Holds no state of its own.
pub struct Analytics<'a> {
    archive: &'a Archive,
}

impl<'a> Analytics<'a> {
    pub(crate) fn new(archive: &'a Archive) -> Self {
        Self { archive }
    }

    /// Interactions whose decision is still `Proposed`.
    pub async fn pending_decisions(&self) -> Result<Vec<PendingDecision>> {
        let queries = &self.archive.settings().queries;
        let predicate = FilterComposer::new(CollectionKind::Interactions)
            .eq(fields::DECISION_STATUS, DecisionStatus::Proposed.as_str())
            .eq(fields::ROLE, Role::Requester.as_str())
            .build()?;
        let hits = self
            .ranked_hits(PENDING_PHRASE, &predicate, queries.pending_decisions_k)
            .await?;
        Ok(requester_interactions(hits)
            .into_iter()
            .map(|hit| PendingDecision {
                excerpt: excerpt(&hit.text, queries.excerpt_chars),
                correlation_id: hit.metadata.correlation_id,
                actor: hit.metadata.invoked_actor,
                project: hit.metadata.project,
                intent: hit.metadata.intent,
                importance: hit.metadata.importance,
            })
            .collect())
    }

    /// Interaction count, status histogram, projects and latest excerpts
    /// for one actor.
    pub async fn actor_history(&self, actor: &str) -> Result<ActorHistory> {
        require_actor(actor)?;
        let queries = &self.archive.settings().queries;
        let predicate = FilterComposer::new(CollectionKind::Interactions)
            .eq(fields::INVOKED_ACTOR, actor)
            .eq(fields::ROLE, Role::Requester.as_str())
            .build()?;
        let hits = self
            .ranked_hits(
                &format!("análisis completo de {actor}"),
                &predicate,
                queries.actor_history_k,
            )
            .await?;
        let mut interactions = requester_interactions(hits);

        let mut status_counts = BTreeMap::new();
        let mut projects = BTreeSet::new();
        for hit in &interactions {
            *status_counts
                .entry(hit.metadata.decision_status.as_str().to_owned())
                .or_insert(0) += 1;
            let _ = projects.insert(hit.metadata.project.clone());
        }

        interactions.sort_by(|a, b| {
            b.metadata
                .timestamp
                .cmp(&a.metadata.timestamp)
                .then_with(|| a.metadata.correlation_id.cmp(&b.metadata.correlation_id))
        });
        let recent_excerpts = interactions
            .iter()
            .take(queries.history_excerpts)
            .map(|hit| excerpt(&hit.text, queries.excerpt_chars))
            .collect();

        Ok(ActorHistory {
            actor: actor.to_owned(),
            total_interactions: interactions.len(),
            status_counts,
            projects,
            recent_excerpts,
        })
    }

    /// Interactions with importance at least `min_level`, optionally for one
    /// actor.
    pub async fn high_importance(
        &self,
        min_level: i64,
        actor: Option<&str>,
    ) -> Result<Vec<InteractionHit>> {
        let level = Importance::new(min_level)?;
        let mut composer = FilterComposer::new(CollectionKind::Interactions)
            .at_least(fields::IMPORTANCE, level.get());
        if let Some(actor) = actor {
            composer = composer.eq(fields::INVOKED_ACTOR, actor);
        }
        let k = self.archive.settings().queries.high_importance_k;
        let hits = self
            .ranked_hits(HIGH_IMPORTANCE_PHRASE, &composer.build()?, k)
            .await?;
        Ok(distinct_interactions(hits))
    }

    /// Interactions created in `[start, end]` (seconds since the epoch);
    /// `end` defaults to now.
    pub async fn date_range(
        &self,
        start: i64,
        end: Option<i64>,
        actor: Option<&str>,
    ) -> Result<Vec<InteractionHit>> {
        let end = end.unwrap_or_else(|| Utc::now().timestamp());
        if start > end {
            return Err(ArchiveError::validation(format!(
                "date range start {start} is after end {end}"
            )));
        }
        let mut composer = FilterComposer::new(CollectionKind::Interactions)
            .between(fields::TIMESTAMP, start, end);
        if let Some(actor) = actor {
            composer = composer.eq(fields::INVOKED_ACTOR, actor);
        }
        let k = self.archive.settings().queries.date_range_k;
        let hits = self
            .ranked_hits(DATE_RANGE_PHRASE, &composer.build()?, k)
            .await?;
        Ok(distinct_interactions(hits))
    }

    /// Interactions of a cycle (default: the current one) grouped by phase.
    pub async fn cycle_summary(&self, cycle_id: Option<&str>) -> Result<CycleSummary> {
        let queries = &self.archive.settings().queries;
        let cycle_id = cycle_id.map_or_else(|| self.archive.cycle().cycle_id(), ToOwned::to_owned);
        let predicate = FilterComposer::new(CollectionKind::Interactions)
            .eq(fields::CYCLE_ID, cycle_id.as_str())
            .eq(fields::ROLE, Role::Requester.as_str())
            .build()?;
        let hits = self
            .ranked_hits(CYCLE_SUMMARY_PHRASE, &predicate, queries.cycle_summary_k)
            .await?;
        let mut interactions = requester_interactions(hits);
        interactions.sort_by(|a, b| {
            a.metadata
                .timestamp
                .cmp(&b.metadata.timestamp)
                .then_with(|| a.metadata.correlation_id.cmp(&b.metadata.correlation_id))
        });

        let phases = CyclePhase::ALL
            .into_iter()
            .filter_map(|phase| {
                let members: Vec<_> = interactions
                    .iter()
                    .filter(|hit| hit.metadata.phase == phase)
                    .collect();
                if members.is_empty() {
                    return None;
                }
                Some(PhaseGroup {
                    phase,
                    total: members.len(),
                    entries: members
                        .iter()
                        .take(queries.summary_items_per_phase)
                        .map(|hit| SummaryEntry {
                            actor: hit.metadata.invoked_actor.clone(),
                            intent: hit.metadata.intent.clone(),
                            project: hit.metadata.project.clone(),
                        })
                        .collect(),
                })
            })
            .collect();

        Ok(CycleSummary { cycle_id, phases })
    }

    async fn ranked_hits(
        &self,
        phrase: &str,
        predicate: &FilterPredicate,
        k: usize,
    ) -> Result<Vec<InteractionHit>> {
        let scored = self
            .archive
            .search_interactions(phrase, k, Some(predicate))
            .await?;
        let mut hits: Vec<InteractionHit> = scored.into_iter().filter_map(into_hit).collect();
        hits.sort_by(rank_order);
        debug!(phrase, hits = hits.len(), "analytics query");
        Ok(hits)
    }
}

fn require_actor(actor: &str) -> Result<()> {
    if actor.trim().is_empty() {
        return Err(ArchiveError::validation("actor must not be empty"));
    }
    Ok(())
}

fn into_hit(scored: ScoredFragment) -> Option<InteractionHit> {
    match scored.fragment.metadata {
        FragmentMetadata::Interaction(metadata) => Some(InteractionHit {
            fragment_id: scored.fragment.id,
            text: scored.fragment.text,
            metadata,
            relevance: scored.relevance,
        }),
        _ => None,
    }
}

fn rank_order(a: &InteractionHit, b: &InteractionHit) -> Ordering {
    b.relevance
        .total_cmp(&a.relevance)
        .then_with(|| a.metadata.correlation_id.cmp(&b.metadata.correlation_id))
        .then_with(|| a.fragment_id.cmp(&b.fragment_id))
}

/// One hit per interaction, keeping the best-ranked fragment.
fn distinct_interactions(hits: Vec<InteractionHit>) -> Vec<InteractionHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.metadata.correlation_id.clone()))
        .collect()
}

/// Interactions counted through their requester fragments only. Every
/// interaction has at least one, and responder fragments carry the same
/// shared metadata, so this is where interaction totals come from.
fn requester_interactions(hits: Vec<InteractionHit>) -> Vec<InteractionHit> {
    distinct_interactions(
        hits.into_iter()
            .filter(|hit| hit.metadata.role == Role::Requester)
            .collect(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use wabun_core::{CorrelationId, CycleState, InteractionMetadata, Sequence};
    use wabun_index::{HashEmbeddingService, SqliteVectorIndex};
    use wabun_settings::WabunSettings;

    use crate::types::InteractionInput;

    fn archive() -> Archive {
        let index = SqliteVectorIndex::in_memory(Arc::new(HashEmbeddingService::new(64))).unwrap();
        Archive::new(
            Arc::new(index),
            Arc::new(CycleState::new("cycle_2026-10-16", CyclePhase::Ejecucion)),
            WabunSettings::default(),
        )
    }

    fn exchange(actor: &str, project: &str) -> InteractionInput {
        InteractionInput::new("Revisión del protocolo", "Protocolo revisado", actor, "engine-a")
            .with_project(project)
    }

    fn hit(cid: &str, fragment: &str, role: Role, relevance: f32) -> InteractionHit {
        InteractionHit {
            fragment_id: fragment.into(),
            text: String::new(),
            metadata: InteractionMetadata {
                correlation_id: CorrelationId::from(cid),
                timestamp: 0,
                cycle_id: "c".into(),
                phase: CyclePhase::Ejecucion,
                invoked_actor: "A".into(),
                engine: "e".into(),
                intent: "i".into(),
                keywords: vec![],
                project: "General".into(),
                importance: Importance::DEFAULT,
                decision_status: DecisionStatus::Proposed,
                role,
                sequence: Sequence::new(0, 1).unwrap(),
            },
            relevance,
        }
    }

    // ── helpers ─────────────────────────────────────────────────────────────

    #[test]
    fn rank_order_breaks_ties_by_ids() {
        let mut hits = vec![
            hit("int_b", "int_b-prompt-0", Role::Requester, 0.5),
            hit("int_a", "int_a-prompt-1", Role::Requester, 0.5),
            hit("int_a", "int_a-prompt-0", Role::Requester, 0.5),
            hit("int_c", "int_c-prompt-0", Role::Requester, 0.9),
        ];
        hits.sort_by(rank_order);
        let ids: Vec<_> = hits.iter().map(|h| h.fragment_id.as_str()).collect();
        assert_eq!(
            ids,
            ["int_c-prompt-0", "int_a-prompt-0", "int_a-prompt-1", "int_b-prompt-0"]
        );
    }

    #[test]
    fn requester_dedupe_skips_responder_only_hits() {
        let hits = vec![
            hit("int_a", "int_a-response-0", Role::Responder, 0.9),
            hit("int_a", "int_a-prompt-0", Role::Requester, 0.8),
            hit("int_b", "int_b-response-0", Role::Responder, 0.7),
        ];
        let kept = requester_interactions(hits.clone());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].fragment_id, "int_a-prompt-0");

        let any_role = distinct_interactions(hits);
        assert_eq!(any_role.len(), 2);
        assert_eq!(any_role[0].fragment_id, "int_a-response-0");
    }

    // ── queries ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn pending_decisions_lists_proposed_only() {
        let archive = archive();
        let pending = archive
            .register_interaction(exchange("LIANG", "X").with_intent("diseño"))
            .await
            .unwrap();
        let _ = archive
            .register_interaction(exchange("LIANG", "X").with_status("Validated"))
            .await
            .unwrap();
        let found = archive.analytics().pending_decisions().await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].correlation_id, pending);
        assert_eq!(found[0].intent, "diseño");
        assert_eq!(found[0].excerpt, "Revisión del protocolo");
    }

    #[tokio::test]
    async fn actor_history_counts_statuses_per_interaction() {
        let archive = archive();
        let _ = archive.register_interaction(exchange("LIANG", "X")).await.unwrap();
        let _ = archive
            .register_interaction(exchange("LIANG", "Y").with_status("Ejecutada"))
            .await
            .unwrap();
        let history = archive.analytics().actor_history("LIANG").await.unwrap();
        assert_eq!(history.total_interactions, 2);
        assert_eq!(history.status_counts["Proposed"], 1);
        assert_eq!(history.status_counts["Executed"], 1);
        assert_eq!(history.projects.len(), 2);
        assert_eq!(history.recent_excerpts.len(), 2);
    }

    #[tokio::test]
    async fn actor_history_counts_beyond_half_the_query_limit() {
        let mut settings = WabunSettings::default();
        settings.queries.actor_history_k = 10;
        let index = SqliteVectorIndex::in_memory(Arc::new(HashEmbeddingService::new(64))).unwrap();
        let archive = Archive::new(
            Arc::new(index),
            Arc::new(CycleState::new("cycle_2026-10-16", CyclePhase::Ejecucion)),
            settings,
        );
        for i in 0..8 {
            let _ = archive
                .register_interaction(exchange("LIANG", &format!("P{i}")))
                .await
                .unwrap();
        }
        let history = archive.analytics().actor_history("LIANG").await.unwrap();
        assert_eq!(history.total_interactions, 8);
        assert_eq!(history.status_counts["Proposed"], 8);
        assert_eq!(history.projects.len(), 8);
    }

    #[tokio::test]
    async fn actor_history_rejects_blank_actor() {
        assert_matches!(
            archive().analytics().actor_history(" ").await,
            Err(ArchiveError::Validation(_))
        );
    }

    #[tokio::test]
    async fn high_importance_threshold() {
        let archive = archive();
        let _ = archive
            .register_interaction(exchange("A", "X").with_importance(5))
            .await
            .unwrap();
        let _ = archive
            .register_interaction(exchange("A", "X").with_importance(2))
            .await
            .unwrap();
        let _ = archive
            .register_interaction(exchange("B", "X").with_importance(4))
            .await
            .unwrap();

        let analytics = archive.analytics();
        assert_eq!(analytics.high_importance(4, None).await.unwrap().len(), 2);
        let only_a = analytics.high_importance(4, Some("A")).await.unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].metadata.importance.get(), 5);
        for bad in [0, 6] {
            assert_matches!(
                analytics.high_importance(bad, None).await,
                Err(ArchiveError::Validation(_))
            );
        }
    }

    #[tokio::test]
    async fn date_range_bounds() {
        let archive = archive();
        let _ = archive.register_interaction(exchange("A", "X")).await.unwrap();
        let now = Utc::now().timestamp();
        let analytics = archive.analytics();
        assert_eq!(analytics.date_range(now - 60, None, None).await.unwrap().len(), 1);
        assert!(analytics.date_range(0, Some(60), None).await.unwrap().is_empty());
        assert!(
            analytics
                .date_range(now - 60, None, Some("B"))
                .await
                .unwrap()
                .is_empty()
        );
        assert_matches!(
            analytics.date_range(100, Some(50), None).await,
            Err(ArchiveError::Validation(_))
        );
    }

    #[tokio::test]
    async fn cycle_summary_groups_in_phase_order() {
        let archive = archive();
        let _ = archive.cycle().transition(CyclePhase::Equilibrio);
        let _ = archive
            .register_interaction(exchange("ARESK", "X").with_intent("cierre"))
            .await
            .unwrap();
        let _ = archive.cycle().transition(CyclePhase::Encendido);
        let _ = archive
            .register_interaction(exchange("LIANG", "Y").with_intent("arranque"))
            .await
            .unwrap();

        let summary = archive.analytics().cycle_summary(None).await.unwrap();
        let phases: Vec<_> = summary.phases.iter().map(|g| g.phase).collect();
        assert_eq!(phases, [CyclePhase::Encendido, CyclePhase::Equilibrio]);
        assert_eq!(summary.total_interactions(), 2);
        let report = summary.render();
        assert!(report.starts_with("# RESUMEN DEL CICLO: cycle_2026-10-16"));
        assert!(report.contains("- [LIANG] arranque (Proyecto: Y)"));

        let other = archive
            .analytics()
            .cycle_summary(Some("cycle_1999-01-01"))
            .await
            .unwrap();
        assert!(other.phases.is_empty());
    }
}
