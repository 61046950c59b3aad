//! The `run` command: ingest and generate in one flow, with an optional
//! no-database mode that keeps everything in memory for the single run.

use anyhow::{bail, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::generate::candidate_pool_limit;
use crate::ingest::echo_mining_progress;
use crate::migrate;
use crate::miner;
use crate::models::Candidate;
use crate::pipeline::{build_artifact, GenerationParams};
use crate::renderer;
use crate::repo;
use crate::store;

fn echo_step(step: usize, total: usize, message: &str) {
    println!("[{}/{}] {}", step, total, message);
}

/// Options specific to a combined run.
pub struct RunOptions {
    pub repo_name: Option<String>,
    pub seed: Option<u64>,
    pub local_only: bool,
    /// Keep fragments in memory only; skip all persistence.
    pub no_db: bool,
}

/// Mine `source` and generate one artifact from the fresh fragments.
pub async fn run_full(config: &Config, source: &str, options: &RunOptions) -> Result<()> {
    let total_steps = 6;

    echo_step(1, total_steps, "Resolving source repository");
    let (repo_path, source_mode) = repo::resolve_repo_source(
        source,
        &config.repos.cache_dir,
        config.repos.update_remote,
    )?;
    println!("Using repo: {} ({})", repo_path.display(), source_mode.as_str());

    echo_step(2, total_steps, "Mining deleted fragments from git history");
    let mut progress = echo_mining_progress;
    let fragments = miner::extract_deleted_fragments(
        &repo_path,
        Some(config.mining.max_commits),
        config.mining.max_fragments_per_commit,
        Some(&mut progress),
    )?;
    if fragments.is_empty() {
        bail!("No usable deleted fragments found in the selected history range.");
    }

    let effective_repo_name = options.repo_name.clone().unwrap_or_else(|| {
        repo_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repo".to_string())
    });

    echo_step(3, total_steps, "Preparing candidate pool");
    let mut pool: Option<SqlitePool> = None;
    let candidates: Vec<Candidate> = if options.no_db {
        println!("    --no-db enabled: using in-memory fragments for this run only");
        fragments
            .iter()
            .enumerate()
            .map(|(index, fragment)| Candidate::from_fragment(fragment, index as i64 + 1))
            .collect()
    } else {
        let connected = db::connect(&config.db.path).await?;
        migrate::run_migrations(&connected).await?;
        let inserted = store::insert_fragments(&connected, &fragments).await?;
        println!(
            "    persisted fragments: extracted={} inserted={}",
            fragments.len(),
            inserted
        );
        let candidates = store::fetch_candidates(
            &connected,
            Some(&effective_repo_name),
            candidate_pool_limit(config.generation.fragment_count),
        )
        .await?;
        pool = Some(connected);
        candidates
    };

    echo_step(4, total_steps, "Generating artifact content");
    let params = GenerationParams {
        fragment_count: config.generation.fragment_count,
        entropy: config.generation.entropy,
        seed: options.seed,
        model_name: config.generation.model.clone(),
        local_only: options.local_only,
        source_repo: Some(effective_repo_name),
        timeout_secs: config.generation.timeout_secs,
        max_retries: config.generation.max_retries,
    };
    let (record, chosen) =
        build_artifact(&candidates, &params, &|msg| println!("    {}", msg)).await?;

    echo_step(5, total_steps, "Persisting artifact metadata");
    let (render_record, linked) = match &pool {
        Some(pool) => {
            let fragment_ids: Vec<i64> = chosen.iter().map(|c| c.id).collect();
            store::save_artifact(pool, &record, &fragment_ids).await?;
            let Some(saved) = store::get_artifact(pool, &record.artifact_id).await? else {
                bail!("Artifact insert failed unexpectedly");
            };
            let linked = store::get_artifact_fragments(pool, &record.artifact_id).await?;
            (saved, linked)
        }
        None => {
            println!("    --no-db enabled: skipping artifact persistence");
            (record.clone(), chosen)
        }
    };

    echo_step(6, total_steps, "Rendering artifact package");
    let out_dir = renderer::render_artifact(&render_record, &linked, &config.output.root)?;
    println!(
        "Run complete. id={} mode={} seed={} path={}",
        record.artifact_id,
        record.generation_mode.as_str(),
        record.seed,
        out_dir.display()
    );

    if let Some(pool) = pool {
        pool.close().await;
    }
    Ok(())
}
