//! Artifact generation orchestration.
//!
//! Ties selection, prompt construction, backend generation (or the local
//! fallback), and record assembly into one flow. The caller supplies the
//! candidate pool and receives the finished record plus the selected
//! fragments for lineage persistence.

use anyhow::{bail, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::generator::{local_generate, parse_output, GeminiClient};
use crate::models::{ArtifactRecord, Candidate, GenerationMode};
use crate::prompting::{build_system_prompt, build_user_prompt};
use crate::selector::select_fragments;

/// Parameters for one generation run. Ephemeral; owned by the caller.
pub struct GenerationParams {
    pub fragment_count: usize,
    pub entropy: f64,
    /// Explicit seed for reproducibility; drawn from OS entropy when unset.
    pub seed: Option<u64>,
    pub model_name: String,
    /// Skip the model backend and force the local deterministic path.
    pub local_only: bool,
    /// Repo name recorded on the artifact; defaults to the first selected
    /// fragment's repo.
    pub source_repo: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Generate one artifact record from a candidate pool.
///
/// Returns the assembled record and the selected fragments in draw order.
/// An empty pool is an error here (the sampler itself tolerates it, but a
/// generation run with nothing to select from cannot proceed).
pub async fn build_artifact(
    candidates: &[Candidate],
    params: &GenerationParams,
    progress: &dyn Fn(&str),
) -> Result<(ArtifactRecord, Vec<Candidate>)> {
    if candidates.is_empty() {
        bail!("No fragments found. Run ingest first.");
    }

    let seed = params
        .seed
        .unwrap_or_else(|| rand::thread_rng().gen_range(1..=u64::from(u32::MAX)));
    let entropy = params.entropy.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);

    progress("selecting candidate fragments");
    let chosen = select_fragments(candidates, params.fragment_count, entropy, &mut rng);
    if chosen.is_empty() {
        bail!("Unable to select fragments from current dataset.");
    }

    progress("building prompts");
    let system_prompt = build_system_prompt();
    let user_prompt = build_user_prompt(&chosen, entropy, seed);

    let (raw_response, output, generation_mode) = if params.local_only {
        progress("running local generator");
        let (raw, output) = local_generate(&chosen, entropy, seed)?;
        (raw, output, GenerationMode::Local)
    } else {
        progress(&format!("calling model {}", params.model_name));
        let client = GeminiClient::new(
            params.model_name.clone(),
            params.timeout_secs,
            params.max_retries,
        );
        let raw = client.generate(&system_prompt, &user_prompt).await?;
        let output = parse_output(&raw)?;
        (raw, output, GenerationMode::Gemini)
    };

    let record = ArtifactRecord {
        artifact_id: new_artifact_id(),
        created_at: Utc::now(),
        seed,
        entropy,
        source_repo: params
            .source_repo
            .clone()
            .unwrap_or_else(|| chosen[0].repo_name.clone()),
        model_name: params.model_name.clone(),
        generation_mode,
        prompt_text: user_prompt,
        raw_response,
        output_title: output.title,
        output_language: output.language,
        output_code: output.artifact_code,
        output_statement: output.artist_statement,
        output_notes: output.transform_notes,
    };

    Ok((record, chosen))
}

/// Opaque 12-hex-char artifact identifier.
fn new_artifact_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, content: &str) -> Candidate {
        Candidate {
            id,
            repo_name: "demo".to_string(),
            commit_hash: "abcdef0123456789".to_string(),
            file_path: "src/old.py".to_string(),
            language: "python".to_string(),
            line_no: id,
            content: content.to_string(),
        }
    }

    fn params(seed: Option<u64>) -> GenerationParams {
        GenerationParams {
            fragment_count: 3,
            entropy: 0.5,
            seed,
            model_name: "gemini-test".to_string(),
            local_only: true,
            source_repo: None,
            timeout_secs: 5,
            max_retries: 0,
        }
    }

    fn pool() -> Vec<Candidate> {
        vec![
            candidate(1, "def a(x): return x"),
            candidate(2, "const a = (x) => x + 1"),
            candidate(3, "SELECT id FROM artifacts;"),
            candidate(4, "// comment block with context"),
        ]
    }

    #[tokio::test]
    async fn test_build_artifact_local_path_is_reproducible() {
        let pool = pool();
        let quiet = |_: &str| {};

        let (record_a, chosen_a) = build_artifact(&pool, &params(Some(42)), &quiet)
            .await
            .unwrap();
        let (record_b, chosen_b) = build_artifact(&pool, &params(Some(42)), &quiet)
            .await
            .unwrap();

        let ids_a: Vec<i64> = chosen_a.iter().map(|c| c.id).collect();
        let ids_b: Vec<i64> = chosen_b.iter().map(|c| c.id).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(record_a.output_code, record_b.output_code);
        assert_eq!(record_a.raw_response, record_b.raw_response);
        assert_eq!(record_a.generation_mode, GenerationMode::Local);
        assert_eq!(record_a.seed, 42);
        assert_eq!(record_a.source_repo, "demo");
    }

    #[tokio::test]
    async fn test_build_artifact_empty_pool_is_an_error() {
        let err = build_artifact(&[], &params(Some(1)), &|_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No fragments found"));
    }

    #[tokio::test]
    async fn test_build_artifact_draws_seed_when_unset() {
        let pool = pool();
        let (record, _) = build_artifact(&pool, &params(None), &|_| {}).await.unwrap();
        assert!(record.seed >= 1);
    }

    #[tokio::test]
    async fn test_build_artifact_records_prompt_and_parameters() {
        let pool = pool();
        let mut p = params(Some(7));
        p.entropy = 2.0; // clamped before use and before persisting
        p.source_repo = Some("other-repo".to_string());

        let (record, chosen) = build_artifact(&pool, &p, &|_| {}).await.unwrap();
        assert_eq!(record.entropy, 1.0);
        assert_eq!(record.source_repo, "other-repo");
        assert!(record.prompt_text.contains("Seed: 7"));
        assert_eq!(chosen.len(), 3);
        assert_eq!(record.artifact_id.len(), 12);
    }
}
