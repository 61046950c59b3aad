//! The `generate` command: sample fragments from storage, produce one
//! artifact, persist it with lineage, and render the output bundle.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::pipeline::{build_artifact, GenerationParams};
use crate::renderer;
use crate::store;

fn echo_step(step: usize, total: usize, message: &str) {
    println!("[{}/{}] {}", step, total, message);
}

/// How many candidates to pull from storage for one sampling run. Scales
/// with the requested fragment count so the pool stays comfortably larger
/// than the selection.
pub(crate) fn candidate_pool_limit(fragment_count: usize) -> i64 {
    (500usize.max(fragment_count * 60)) as i64
}

/// Generate and persist one artifact from previously ingested fragments.
pub async fn run_generate(
    config: &Config,
    repo_name: Option<&str>,
    seed: Option<u64>,
    local_only: bool,
) -> Result<()> {
    echo_step(1, 4, "Loading fragments from storage");
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;

    let candidates = store::fetch_candidates(
        &pool,
        repo_name,
        candidate_pool_limit(config.generation.fragment_count),
    )
    .await?;

    echo_step(2, 4, "Generating artifact content");
    let params = GenerationParams {
        fragment_count: config.generation.fragment_count,
        entropy: config.generation.entropy,
        seed,
        model_name: config.generation.model.clone(),
        local_only,
        source_repo: repo_name.map(str::to_string),
        timeout_secs: config.generation.timeout_secs,
        max_retries: config.generation.max_retries,
    };
    let (record, chosen) =
        build_artifact(&candidates, &params, &|msg| println!("    {}", msg)).await?;

    echo_step(3, 4, "Saving artifact lineage");
    let fragment_ids: Vec<i64> = chosen.iter().map(|c| c.id).collect();
    store::save_artifact(&pool, &record, &fragment_ids).await?;

    let Some(saved) = store::get_artifact(&pool, &record.artifact_id).await? else {
        bail!("Artifact insert failed unexpectedly");
    };
    let linked = store::get_artifact_fragments(&pool, &record.artifact_id).await?;

    echo_step(4, 4, "Rendering artifact package");
    let out_dir = renderer::render_artifact(&saved, &linked, &config.output.root)?;
    println!(
        "Artifact generated. id={} mode={} seed={} path={}",
        record.artifact_id,
        record.generation_mode.as_str(),
        record.seed,
        out_dir.display()
    );

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_pool_limit_has_a_floor() {
        assert_eq!(candidate_pool_limit(1), 500);
        assert_eq!(candidate_pool_limit(8), 500);
        assert_eq!(candidate_pool_limit(10), 600);
        assert_eq!(candidate_pool_limit(200), 12_000);
    }
}
