//! The `ingest` command: mine deleted fragments from a repository and
//! persist them.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::miner;
use crate::repo;
use crate::store;

fn echo_step(step: usize, total: usize, message: &str) {
    println!("[{}/{}] {}", step, total, message);
}

pub(crate) fn echo_mining_progress(done: usize, total: usize, fragments: usize) {
    let percent = if total > 0 { done * 100 / total } else { 100 };
    println!(
        "    mining commits... {}/{} ({}%) fragments={}",
        done, total, percent, fragments
    );
}

/// Mine deleted fragments from `source` and store them in SQLite.
pub async fn run_ingest(config: &Config, source: &str) -> Result<()> {
    echo_step(1, 4, "Initializing storage");
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;

    echo_step(2, 4, "Resolving source repository");
    let (repo_path, source_mode) = repo::resolve_repo_source(
        source,
        &config.repos.cache_dir,
        config.repos.update_remote,
    )?;
    println!("Using repo: {} ({})", repo_path.display(), source_mode.as_str());

    echo_step(3, 4, "Mining deleted fragments from git history");
    let mut progress = echo_mining_progress;
    let fragments = miner::extract_deleted_fragments(
        &repo_path,
        Some(config.mining.max_commits),
        config.mining.max_fragments_per_commit,
        Some(&mut progress),
    )?;

    echo_step(4, 4, "Persisting fragments");
    let inserted = store::insert_fragments(&pool, &fragments).await?;
    println!(
        "Ingest complete. repo={} extracted={} inserted={} db={}",
        repo_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        fragments.len(),
        inserted,
        config.db.path.display()
    );

    pool.close().await;
    Ok(())
}
