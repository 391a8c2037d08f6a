//! Fragmentation, retrieval and synthesis settings.

use serde::{Deserialize, Serialize};

/// Fragment size bounds, in characters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkingSettings {
    /// Target size for prompt and response fragments.
    pub interaction_fragment_size: usize,
    /// Target size for decree, minutes and entity fragments.
    pub decree_fragment_size: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            interaction_fragment_size: 500,
            decree_fragment_size: 800,
        }
    }
}

/// Reference embedder settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Vector dimensions produced by the hash embedder.
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { dimensions: 384 }
    }
}

/// Result limits and excerpt lengths of the analytics queries.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuerySettings {
    /// Fragments scanned by `pending_decisions`.
    pub pending_decisions_k: usize,
    /// Fragments scanned by `actor_history`.
    pub actor_history_k: usize,
    /// Fragments returned by `high_importance`.
    pub high_importance_k: usize,
    /// Fragments returned by `date_range`.
    pub date_range_k: usize,
    /// Fragments scanned by `cycle_summary`.
    pub cycle_summary_k: usize,
    /// Default result count of `search_knowledge`.
    pub knowledge_k: usize,
    /// Excerpt length of analytics rows.
    pub excerpt_chars: usize,
    /// Recent excerpts kept in an actor history.
    pub history_excerpts: usize,
    /// Entries listed per phase in a cycle summary.
    pub summary_items_per_phase: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            pending_decisions_k: 50,
            actor_history_k: 100,
            high_importance_k: 30,
            date_range_k: 50,
            cycle_summary_k: 100,
            knowledge_k: 10,
            excerpt_chars: 200,
            history_excerpts: 3,
            summary_items_per_phase: 5,
        }
    }
}

/// Layout of the synthesized context bundle.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynthesisSettings {
    /// Lines printed under the identity header.
    pub identity_lines: Vec<String>,
    /// Decree fragments retrieved for the protocol section.
    pub decree_k: usize,
    /// Interaction fragments retrieved for the recent-context section.
    pub recent_k: usize,
    /// Recent fragments shown.
    pub recent_shown: usize,
    /// Excerpt length of recent fragments.
    pub recent_excerpt_chars: usize,
    /// Fragments retrieved for the validated-decisions section.
    pub decision_k: usize,
    /// Validated decisions shown.
    pub decision_shown: usize,
    /// Excerpt length of validated decisions.
    pub decision_excerpt_chars: usize,
    /// Characters per estimated token.
    pub chars_per_token: usize,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            identity_lines: vec![
                "Juan Everardo Islas Urquidy".to_string(),
                "Fundador de CAELION - Arquitectura Simbiótica Cognitiva".to_string(),
            ],
            decree_k: 2,
            recent_k: 5,
            recent_shown: 3,
            recent_excerpt_chars: 200,
            decision_k: 5,
            decision_shown: 3,
            decision_excerpt_chars: 150,
            chars_per_token: 4,
        }
    }
}

/// Decision statuses accepted beyond Proposed, Executed and Validated.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusSettings {
    /// Exact status names accepted at write time.
    pub recognized: Vec<String>,
}
