//! # Landscrap CLI
//!
//! The `landscrap` binary mines deleted lines from git history and
//! recomposes them into generated artifacts.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `landscrap init` | Create the SQLite database and schema |
//! | `landscrap ingest <source>` | Mine deleted fragments from a repo |
//! | `landscrap generate` | Generate one artifact from stored fragments |
//! | `landscrap run <source>` | Ingest and generate in one flow |
//! | `landscrap render <id>` | Re-render a persisted artifact |
//! | `landscrap doctor` | Environment diagnostics |
//!
//! All commands accept `--config` pointing to an optional TOML file; flags
//! override config values. The entropy dial is clamped to `[0, 1]` rather
//! than rejected.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use landscrap::config::{self, Config};
use landscrap::run::RunOptions;
use landscrap::{db, doctor, generate, ingest, migrate, renderer, run};

/// Landscrap — reconstruct discarded code into generated artifacts.
#[derive(Parser)]
#[command(
    name = "landscrap",
    about = "Mine deleted lines from git history and recompose them into generated artifacts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./landscrap.toml")]
    config: PathBuf,

    /// SQLite database path (overrides config).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Mine deleted fragments from a repository and store them.
    Ingest {
        /// Local git repo path or git URL.
        source: String,

        /// Max commits to inspect.
        #[arg(long)]
        max_commits: Option<usize>,

        /// Cap extracted fragments per commit.
        #[arg(long)]
        max_fragments_per_commit: Option<usize>,

        /// Cache directory for cloned remote repos.
        #[arg(long)]
        repo_cache_dir: Option<PathBuf>,

        /// Do not fetch/pull when reusing cached remote repos.
        #[arg(long)]
        no_remote_update: bool,
    },

    /// Generate and persist one artifact from ingested fragments.
    Generate {
        /// Only sample fragments from this repo.
        #[arg(long)]
        repo_name: Option<String>,

        /// Fragments per piece.
        #[arg(long)]
        fragment_count: Option<usize>,

        /// Entropy dial: 0 archival, 1 surreal. Out-of-range values are clamped.
        #[arg(long)]
        entropy: Option<f64>,

        /// Random seed for reproducible selection and local generation.
        #[arg(long)]
        seed: Option<u64>,

        /// Gemini model name.
        #[arg(long)]
        model: Option<String>,

        /// Artifact output directory.
        #[arg(long)]
        output_root: Option<PathBuf>,

        /// Skip the model backend and force the local deterministic path.
        #[arg(long)]
        local_only: bool,
    },

    /// Ingest and generate in one flow.
    Run {
        /// Local git repo path or git URL.
        source: String,

        /// Max commits to inspect.
        #[arg(long)]
        max_commits: Option<usize>,

        /// Cap extracted fragments per commit.
        #[arg(long)]
        max_fragments_per_commit: Option<usize>,

        /// Cache directory for cloned remote repos.
        #[arg(long)]
        repo_cache_dir: Option<PathBuf>,

        /// Do not fetch/pull when reusing cached remote repos.
        #[arg(long)]
        no_remote_update: bool,

        /// Repo name filter at generation time.
        #[arg(long)]
        repo_name: Option<String>,

        /// Fragments per piece.
        #[arg(long)]
        fragment_count: Option<usize>,

        /// Entropy dial: 0 archival, 1 surreal. Out-of-range values are clamped.
        #[arg(long)]
        entropy: Option<f64>,

        /// Random seed for reproducible selection and local generation.
        #[arg(long)]
        seed: Option<u64>,

        /// Gemini model name.
        #[arg(long)]
        model: Option<String>,

        /// Artifact output directory.
        #[arg(long)]
        output_root: Option<PathBuf>,

        /// Skip the model backend and force the local deterministic path.
        #[arg(long)]
        local_only: bool,

        /// Do not persist fragments or artifacts to SQLite.
        #[arg(long)]
        no_db: bool,
    },

    /// Render a persisted artifact to Markdown, JSON, and HTML.
    Render {
        /// Artifact ID from the database.
        artifact_id: String,

        /// Artifact output directory.
        #[arg(long)]
        output_root: Option<PathBuf>,
    },

    /// Print local environment diagnostics.
    Doctor,
}

/// Fold generation-related CLI overrides into the loaded config.
fn apply_generation_overrides(
    cfg: &mut Config,
    fragment_count: Option<usize>,
    entropy: Option<f64>,
    model: Option<String>,
    output_root: Option<PathBuf>,
) {
    if let Some(count) = fragment_count {
        cfg.generation.fragment_count = count;
    }
    if let Some(entropy) = entropy {
        cfg.generation.entropy = entropy.clamp(0.0, 1.0);
    }
    if let Some(model) = model {
        cfg.generation.model = model;
    }
    if let Some(root) = output_root {
        cfg.output.root = root;
    }
}

fn apply_mining_overrides(
    cfg: &mut Config,
    max_commits: Option<usize>,
    max_fragments_per_commit: Option<usize>,
    repo_cache_dir: Option<PathBuf>,
    no_remote_update: bool,
) {
    if let Some(max) = max_commits {
        cfg.mining.max_commits = max;
    }
    if let Some(cap) = max_fragments_per_commit {
        cfg.mining.max_fragments_per_commit = cap;
    }
    if let Some(dir) = repo_cache_dir {
        cfg.repos.cache_dir = dir;
    }
    if no_remote_update {
        cfg.repos.update_remote = false;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config(&cli.config)?;
    if let Some(db_path) = cli.db {
        cfg.db.path = db_path;
    }

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("DB initialized: {}", cfg.db.path.display());
        }
        Commands::Ingest {
            source,
            max_commits,
            max_fragments_per_commit,
            repo_cache_dir,
            no_remote_update,
        } => {
            apply_mining_overrides(
                &mut cfg,
                max_commits,
                max_fragments_per_commit,
                repo_cache_dir,
                no_remote_update,
            );
            ingest::run_ingest(&cfg, &source).await?;
        }
        Commands::Generate {
            repo_name,
            fragment_count,
            entropy,
            seed,
            model,
            output_root,
            local_only,
        } => {
            apply_generation_overrides(&mut cfg, fragment_count, entropy, model, output_root);
            generate::run_generate(&cfg, repo_name.as_deref(), seed, local_only).await?;
        }
        Commands::Run {
            source,
            max_commits,
            max_fragments_per_commit,
            repo_cache_dir,
            no_remote_update,
            repo_name,
            fragment_count,
            entropy,
            seed,
            model,
            output_root,
            local_only,
            no_db,
        } => {
            apply_mining_overrides(
                &mut cfg,
                max_commits,
                max_fragments_per_commit,
                repo_cache_dir,
                no_remote_update,
            );
            apply_generation_overrides(&mut cfg, fragment_count, entropy, model, output_root);
            let options = RunOptions {
                repo_name,
                seed,
                local_only,
                no_db,
            };
            run::run_full(&cfg, &source, &options).await?;
        }
        Commands::Render {
            artifact_id,
            output_root,
        } => {
            if let Some(root) = output_root {
                cfg.output.root = root;
            }
            renderer::run_render(&cfg, &artifact_id).await?;
        }
        Commands::Doctor => {
            doctor::run_doctor(&cfg)?;
        }
    }

    Ok(())
}
