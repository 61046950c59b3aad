//! Core data models shared across mining, selection, generation, and
//! persistence.
//!
//! These types represent the fragments mined from git history and the
//! artifacts assembled from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single deleted code line with repository lineage metadata.
///
/// Created once during history mining and immutable afterwards. The store
/// deduplicates over `(commit_hash, file_path, line_no, content)` so
/// re-mining the same history is idempotent.
#[derive(Debug, Clone, Serialize)]
pub struct Fragment {
    pub repo_path: String,
    pub repo_name: String,
    pub commit_hash: String,
    pub commit_author: String,
    pub commit_timestamp: DateTime<Utc>,
    pub file_path: String,
    pub language: String,
    /// 1-based line number in the pre-edit file numbering context.
    pub line_no: i64,
    /// Raw line content with trailing whitespace stripped.
    pub content: String,
}

/// A fragment as seen by the selection algorithm: lineage metadata plus a
/// numeric identifier that is unique within one invocation (database row id
/// or in-memory index).
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub id: i64,
    pub repo_name: String,
    pub commit_hash: String,
    pub file_path: String,
    pub language: String,
    pub line_no: i64,
    pub content: String,
}

impl Candidate {
    /// Build a candidate from an in-memory fragment, used by `--no-db` runs
    /// where no database row id exists.
    pub fn from_fragment(fragment: &Fragment, id: i64) -> Self {
        Self {
            id,
            repo_name: fragment.repo_name.clone(),
            commit_hash: fragment.commit_hash.clone(),
            file_path: fragment.file_path.clone(),
            language: fragment.language.clone(),
            line_no: fragment.line_no,
            content: fragment.content.clone(),
        }
    }
}

/// Normalized generation result.
///
/// Every field that the backend may omit carries an explicit placeholder
/// default so a partially-specified response never breaks rendering.
/// `artifact_code` is the only required field; a response without it fails
/// schema validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactOutput {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub artifact_code: String,
    #[serde(default)]
    pub artist_statement: String,
    #[serde(default)]
    pub transform_notes: String,
}

pub(crate) fn default_title() -> String {
    "Untitled Landscrap".to_string()
}

pub(crate) fn default_language() -> String {
    "text".to_string()
}

/// Which backend produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// External generative model (Gemini API).
    Gemini,
    /// Local deterministic fallback, no network.
    Local,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Gemini => "gemini",
            GenerationMode::Local => "local",
        }
    }
}

impl std::str::FromStr for GenerationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gemini" => Ok(GenerationMode::Gemini),
            "local" => Ok(GenerationMode::Local),
            other => anyhow::bail!("Unknown generation mode: '{}'", other),
        }
    }
}

/// A fully materialized artifact as persisted in SQLite.
///
/// Created once at generation time; immutable; linked to its source
/// fragments through the `artifact_fragments` join table.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRecord {
    pub artifact_id: String,
    pub created_at: DateTime<Utc>,
    pub seed: u64,
    pub entropy: f64,
    pub source_repo: String,
    pub model_name: String,
    pub generation_mode: GenerationMode,
    pub prompt_text: String,
    pub raw_response: String,
    pub output_title: String,
    pub output_language: String,
    pub output_code: String,
    pub output_statement: String,
    pub output_notes: String,
}
