//! The archive: registration, retrieval, statistics and export.
//!
//! [`Archive`] owns the four collections through a shared [`VectorIndex`].
//! Every write to a collection runs under that collection's async mutex, so
//! a duplicate check and the batch `add` that follows it cannot interleave
//! with another writer. Reads take no lock.

use std::path::Path;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wabun_core::constants::{DEFAULT_DOC_TYPE, DEFAULT_INTENT, DEFAULT_PROJECT};
use wabun_core::schema::fields;
use wabun_core::{
    fragment, CollectionKind, CorrelationId, CycleState, DecisionStatus, DecreeId, DecreeMetadata,
    EntityId, EntityKind, EntityMetadata, FilterComposer, FilterPredicate, Fragment,
    FragmentMetadata, Importance, InteractionMetadata, MetadataMap, MinutesId, MinutesMetadata,
    Role, Sequence,
};
use wabun_index::{
    ConnectionConfig, EmbeddingService, FragmentBatch, HashEmbeddingService, QueryHit,
    SqliteVectorIndex, VectorIndex,
};
use wabun_settings::WabunSettings;

use crate::analytics::Analytics;
use crate::errors::{ArchiveError, Result};
use crate::synthesizer::ContextSynthesizer;
use crate::types::{
    ArchiveExport, ArchiveStats, DecreeInput, InteractionInput, KnowledgeResults, ScoredFragment,
};

/// One write lock per collection.
#[derive(Default)]
struct WriteLocks {
    interactions: Mutex<()>,
    decrees: Mutex<()>,
    minutes: Mutex<()>,
    entities: Mutex<()>,
}

impl WriteLocks {
    fn get(&self, collection: CollectionKind) -> &Mutex<()> {
        match collection {
            CollectionKind::Interactions => &self.interactions,
            CollectionKind::Decrees => &self.decrees,
            CollectionKind::Minutes => &self.minutes,
            CollectionKind::Entities => &self.entities,
        }
    }
}

/// Structured memory archive over a [`VectorIndex`].
pub struct Archive {
    index: Arc<dyn VectorIndex>,
    cycle: Arc<CycleState>,
    settings: WabunSettings,
    locks: WriteLocks,
}

impl Archive {
    /// Archive over an existing index and cycle state.
    pub fn new(
        index: Arc<dyn VectorIndex>,
        cycle: Arc<CycleState>,
        settings: WabunSettings,
    ) -> Self {
        Self {
            index,
            cycle,
            settings,
            locks: WriteLocks::default(),
        }
    }

    /// Open the file-backed reference index under `home`, starting a cycle
    /// for today's UTC date.
    pub fn open(settings: WabunSettings, home: &Path) -> Result<Self> {
        let path = settings.storage.resolve_db_path(home);
        let config = ConnectionConfig {
            pool_size: settings.storage.pool_size,
            busy_timeout_ms: settings.storage.busy_timeout_ms,
            ..ConnectionConfig::default()
        };
        let index = SqliteVectorIndex::open(&path, &config, Self::embedder(&settings))?;
        info!(path = %path.display(), "archive opened");
        Ok(Self::new(
            Arc::new(index),
            Arc::new(CycleState::start_now()),
            settings,
        ))
    }

    /// Ephemeral archive over an in-memory reference index.
    pub fn in_memory(settings: WabunSettings) -> Result<Self> {
        let index = SqliteVectorIndex::in_memory(Self::embedder(&settings))?;
        Ok(Self::new(
            Arc::new(index),
            Arc::new(CycleState::start_now()),
            settings,
        ))
    }

    /// Install the global `tracing` subscriber at the configured
    /// `logging.level`. `RUST_LOG` still wins when set.
    pub fn init_logging(&self) {
        wabun_core::logging::init_subscriber(&self.settings.logging.level);
    }

    fn embedder(settings: &WabunSettings) -> Arc<dyn EmbeddingService> {
        Arc::new(HashEmbeddingService::new(settings.embedding.dimensions))
    }

    /// Shared cycle state stamped onto new records.
    pub fn cycle(&self) -> &Arc<CycleState> {
        &self.cycle
    }

    /// Settings the archive was built with.
    pub fn settings(&self) -> &WabunSettings {
        &self.settings
    }

    /// Aggregation queries over stored metadata.
    pub fn analytics(&self) -> Analytics<'_> {
        Analytics::new(self)
    }

    /// Context bundle assembly.
    pub fn synthesizer(&self) -> ContextSynthesizer<'_> {
        ContextSynthesizer::new(self)
    }

    // ── Registration ────────────────────────────────────────────────────────

    /// Register a prompt/response exchange.
    ///
    /// Prompt and response are fragmented independently; all fragments are
    /// written in one batch.
    pub async fn register_interaction(&self, input: InteractionInput) -> Result<CorrelationId> {
        require_text("prompt", &input.prompt)?;
        require_text("response", &input.response)?;
        let importance = input.importance.map_or(Ok(Importance::DEFAULT), Importance::new)?;
        let decision_status = match input.decision_status.as_deref() {
            Some(status) => DecisionStatus::parse(status, &self.settings.statuses.recognized)?,
            None => DecisionStatus::default(),
        };

        let snapshot = self.cycle.snapshot();
        let correlation_id = CorrelationId::new();
        let base = InteractionMetadata {
            correlation_id: correlation_id.clone(),
            timestamp: Utc::now().timestamp(),
            cycle_id: snapshot.cycle_id,
            phase: snapshot.phase,
            invoked_actor: input.actor,
            engine: input.engine,
            intent: input.intent.unwrap_or_else(|| DEFAULT_INTENT.to_owned()),
            keywords: input.keywords,
            project: input.project.unwrap_or_else(|| DEFAULT_PROJECT.to_owned()),
            importance,
            decision_status,
            role: Role::Requester,
            sequence: Sequence::new(0, 1)?,
        };
        base.validate()?;

        let size = self.settings.chunking.interaction_fragment_size;
        let mut batch = FragmentBatch::new();
        for (role, text) in [
            (Role::Requester, &input.prompt),
            (Role::Responder, &input.response),
        ] {
            for (sequence, piece) in sequenced(text, size)? {
                let id = format!("{correlation_id}-{}-{}", role.id_segment(), sequence.index());
                let metadata = FragmentMetadata::Interaction(base.with_position(role, sequence));
                batch.push(id, piece, metadata.to_metadata());
            }
        }

        let fragments = batch.len();
        {
            let _guard = self.locks.get(CollectionKind::Interactions).lock().await;
            self.add_batch(CollectionKind::Interactions, batch).await?;
        }
        info!(
            correlation_id = %correlation_id,
            actor = %base.invoked_actor,
            phase = %base.phase,
            fragments,
            "interaction registered"
        );
        Ok(correlation_id)
    }

    /// Register a decree under its caller-chosen id.
    ///
    /// An id already present is rejected and the stored fragments are left
    /// untouched.
    pub async fn register_decree(&self, input: DecreeInput) -> Result<DecreeId> {
        require_text("content", &input.content)?;
        let metadata = DecreeMetadata {
            decree_id: DecreeId::from(input.decree_id),
            title: input.title,
            activation_date: Utc::now().date_naive(),
            implicated_actors: input.implicated_actors,
            document_type: input
                .document_type
                .unwrap_or_else(|| DEFAULT_DOC_TYPE.to_owned()),
            version: input.version.unwrap_or(1.0),
            source: input.source,
            sequence: Sequence::new(0, 1)?,
        };
        metadata.validate()?;

        let mut batch = FragmentBatch::new();
        let size = self.settings.chunking.decree_fragment_size;
        for (sequence, piece) in sequenced(&input.content, size)? {
            let id = format!("{}-{}", metadata.decree_id, sequence.index());
            let fragment_metadata = FragmentMetadata::Decree(metadata.with_sequence(sequence));
            batch.push(id, piece, fragment_metadata.to_metadata());
        }
        let existing = FilterComposer::new(CollectionKind::Decrees)
            .eq(fields::DECREE_ID, metadata.decree_id.as_str())
            .build()?;

        let fragments = batch.len();
        let _guard = self.locks.get(CollectionKind::Decrees).lock().await;
        if !self
            .index
            .get(CollectionKind::Decrees, Some(&existing))
            .await?
            .is_empty()
        {
            warn!(decree_id = %metadata.decree_id, "duplicate decree rejected");
            return Err(ArchiveError::DuplicateId {
                collection: CollectionKind::Decrees.name().to_owned(),
                id: metadata.decree_id.into_inner(),
            });
        }
        self.add_batch(CollectionKind::Decrees, batch).await?;
        info!(decree_id = %metadata.decree_id, fragments, "decree registered");
        Ok(metadata.decree_id)
    }

    /// Register a person, project or concept. Names are unique.
    pub async fn register_entity(
        &self,
        name: &str,
        kind: EntityKind,
        description: &str,
    ) -> Result<EntityId> {
        require_text("description", description)?;
        let metadata = EntityMetadata {
            entity_id: EntityId::new(),
            name: name.trim().to_owned(),
            kind,
            timestamp: Utc::now().timestamp(),
            sequence: Sequence::new(0, 1)?,
        };
        metadata.validate()?;

        let mut batch = FragmentBatch::new();
        let size = self.settings.chunking.interaction_fragment_size;
        for (sequence, piece) in sequenced(description, size)? {
            let id = format!("{}-{}", metadata.entity_id, sequence.index());
            let fragment_metadata = FragmentMetadata::Entity(metadata.with_sequence(sequence));
            batch.push(id, piece, fragment_metadata.to_metadata());
        }
        let existing = FilterComposer::new(CollectionKind::Entities)
            .eq(fields::NAME, metadata.name.as_str())
            .build()?;

        let _guard = self.locks.get(CollectionKind::Entities).lock().await;
        if !self
            .index
            .get(CollectionKind::Entities, Some(&existing))
            .await?
            .is_empty()
        {
            return Err(ArchiveError::DuplicateId {
                collection: CollectionKind::Entities.name().to_owned(),
                id: metadata.name,
            });
        }
        self.add_batch(CollectionKind::Entities, batch).await?;
        info!(
            entity_id = %metadata.entity_id,
            name = %metadata.name,
            kind = kind.as_str(),
            "entity registered"
        );
        Ok(metadata.entity_id)
    }

    /// Set the decision status on every fragment of an interaction.
    ///
    /// Returns the number of fragments updated.
    pub async fn update_decision_status(
        &self,
        correlation_id: &str,
        status: &str,
    ) -> Result<usize> {
        let status = DecisionStatus::parse(status, &self.settings.statuses.recognized)?;
        let predicate = FilterComposer::new(CollectionKind::Interactions)
            .eq(fields::CORRELATION_ID, correlation_id)
            .build()?;

        let _guard = self.locks.get(CollectionKind::Interactions).lock().await;
        let stored = self
            .index
            .get(CollectionKind::Interactions, Some(&predicate))
            .await?;
        if stored.is_empty() {
            return Err(ArchiveError::NotFound {
                collection: CollectionKind::Interactions.name().to_owned(),
                id: correlation_id.to_owned(),
            });
        }
        let metadatas: Vec<MetadataMap> = stored
            .metadatas
            .into_iter()
            .map(|mut map| {
                let _ = map.insert(fields::DECISION_STATUS.into(), status.as_str().into());
                map
            })
            .collect();
        let updated = stored.ids.len();
        self.index
            .update_metadata(CollectionKind::Interactions, &stored.ids, metadatas)
            .await?;
        info!(correlation_id, status = %status, fragments = updated, "decision status updated");
        Ok(updated)
    }

    /// Summarize a cycle (default: the current one) and store the report in
    /// the minutes collection.
    pub async fn record_cycle_minutes(&self, cycle_id: Option<&str>) -> Result<MinutesId> {
        let summary = self.analytics().cycle_summary(cycle_id).await?;
        let report = summary.render();
        let metadata = MinutesMetadata {
            minutes_id: MinutesId::new(),
            cycle_id: summary.cycle_id.clone(),
            timestamp: Utc::now().timestamp(),
            interaction_count: u32::try_from(summary.total_interactions()).unwrap_or(u32::MAX),
            sequence: Sequence::new(0, 1)?,
        };

        let mut batch = FragmentBatch::new();
        let size = self.settings.chunking.decree_fragment_size;
        for (sequence, piece) in sequenced(&report, size)? {
            let id = format!("{}-{}", metadata.minutes_id, sequence.index());
            let fragment_metadata = FragmentMetadata::Minutes(metadata.with_sequence(sequence));
            batch.push(id, piece, fragment_metadata.to_metadata());
        }
        {
            let _guard = self.locks.get(CollectionKind::Minutes).lock().await;
            self.add_batch(CollectionKind::Minutes, batch).await?;
        }
        info!(
            minutes_id = %metadata.minutes_id,
            cycle_id = %metadata.cycle_id,
            interactions = metadata.interaction_count,
            "cycle minutes recorded"
        );
        Ok(metadata.minutes_id)
    }

    async fn add_batch(&self, collection: CollectionKind, batch: FragmentBatch) -> Result<()> {
        let fragments = batch.len();
        self.index.add(collection, batch).await.map_err(|e| {
            warn!(collection = %collection, fragments, error = %e, "batch write failed");
            ArchiveError::from(e)
        })
    }

    // ── Retrieval ───────────────────────────────────────────────────────────

    /// Semantic search over interactions, optionally filtered.
    pub async fn search_interactions(
        &self,
        query: &str,
        k: usize,
        predicate: Option<&FilterPredicate>,
    ) -> Result<Vec<ScoredFragment>> {
        let hits = self
            .index
            .query(CollectionKind::Interactions, query, predicate, k)
            .await?;
        debug!(k, filtered = predicate.is_some(), hits = hits.len(), "interaction search");
        decode_hits(CollectionKind::Interactions, hits)
    }

    /// Semantic search over decrees.
    pub async fn search_decrees(&self, query: &str, k: usize) -> Result<Vec<ScoredFragment>> {
        let hits = self
            .index
            .query(CollectionKind::Decrees, query, None, k)
            .await?;
        debug!(k, hits = hits.len(), "decree search");
        decode_hits(CollectionKind::Decrees, hits)
    }

    /// Every interaction fragment stamped with the current cycle, in
    /// insertion order.
    pub async fn current_cycle_fragments(&self) -> Result<Vec<Fragment>> {
        let predicate = FilterComposer::new(CollectionKind::Interactions)
            .eq(fields::CYCLE_ID, self.cycle.cycle_id())
            .build()?;
        let batch = self
            .index
            .get(CollectionKind::Interactions, Some(&predicate))
            .await?;
        decode_batch(CollectionKind::Interactions, batch)
    }

    /// Interaction search combined with a decree search of half the size.
    pub async fn search_knowledge(
        &self,
        topic: &str,
        include_decrees: bool,
        k: usize,
    ) -> Result<KnowledgeResults> {
        let interactions = self.search_interactions(topic, k, None).await?;
        let decrees = if include_decrees {
            self.search_decrees(topic, k / 2).await?
        } else {
            Vec::new()
        };
        Ok(KnowledgeResults {
            topic: topic.to_owned(),
            interactions,
            decrees,
        })
    }

    // ── Statistics and export ───────────────────────────────────────────────

    /// Fragment counts per collection and the current cycle.
    pub async fn stats(&self) -> Result<ArchiveStats> {
        let snapshot = self.cycle.snapshot();
        Ok(ArchiveStats {
            interaction_count: self.index.count(CollectionKind::Interactions).await?,
            decree_count: self.index.count(CollectionKind::Decrees).await?,
            minutes_count: self.index.count(CollectionKind::Minutes).await?,
            entity_count: self.index.count(CollectionKind::Entities).await?,
            cycle_id: snapshot.cycle_id,
            phase: snapshot.phase,
        })
    }

    /// Snapshot of statistics, interactions and decrees.
    pub async fn export_all(&self) -> Result<ArchiveExport> {
        Ok(ArchiveExport {
            export_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            statistics: self.stats().await?,
            interactions: self.index.get_all(CollectionKind::Interactions).await?,
            decrees: self.index.get_all(CollectionKind::Decrees).await?,
        })
    }

    /// Write [`Self::export_all`] as pretty JSON to `path`.
    pub async fn export_to_path(&self, path: &Path) -> Result<ArchiveExport> {
        let export = self.export_all().await?;
        let json = serde_json::to_string_pretty(&export)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        info!(
            path = %path.display(),
            interactions = export.interactions.len(),
            decrees = export.decrees.len(),
            "archive exported"
        );
        Ok(export)
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ArchiveError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Fragment `text` and pair each piece with its position.
fn sequenced(text: &str, target_size: usize) -> Result<Vec<(Sequence, String)>> {
    let pieces = fragment(text, target_size);
    let total = u32::try_from(pieces.len())
        .map_err(|_| ArchiveError::validation("text splits into too many fragments"))?;
    pieces
        .into_iter()
        .zip(0..total)
        .map(|(piece, index)| -> Result<(Sequence, String)> {
            Ok((Sequence::new(index, total)?, piece))
        })
        .collect()
}

fn decode_hits(collection: CollectionKind, hits: Vec<QueryHit>) -> Result<Vec<ScoredFragment>> {
    hits.into_iter()
        .map(|hit| -> Result<ScoredFragment> {
            let fragment = Fragment::decode(collection, hit.id, hit.text, &hit.metadata)?;
            Ok(ScoredFragment::new(fragment, hit.distance))
        })
        .collect()
}

fn decode_batch(collection: CollectionKind, batch: FragmentBatch) -> Result<Vec<Fragment>> {
    batch
        .ids
        .into_iter()
        .zip(batch.texts)
        .zip(&batch.metadatas)
        .map(|((id, text), map)| -> Result<Fragment> {
            Ok(Fragment::decode(collection, id, text, map)?)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
