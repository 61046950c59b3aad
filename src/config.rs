use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration. Every section has built-in defaults, so a
/// missing config file is valid and CLI flags can override any value.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub repos: ReposConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".landscrap/landscrap.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReposConfig {
    /// Cache directory for cloned remote repositories.
    #[serde(default = "default_repo_cache_dir")]
    pub cache_dir: PathBuf,
    /// Fetch/pull cached remotes before mining.
    #[serde(default = "default_true")]
    pub update_remote: bool,
}

impl Default for ReposConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_repo_cache_dir(),
            update_remote: true,
        }
    }
}

fn default_repo_cache_dir() -> PathBuf {
    PathBuf::from(".landscrap/repos")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Root directory where artifact bundles are written.
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
        }
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from("artifacts")
}

#[derive(Debug, Deserialize, Clone)]
pub struct MiningConfig {
    /// Maximum commits to inspect per ingest.
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
    /// Cap on extracted fragments per commit.
    #[serde(default = "default_max_fragments_per_commit")]
    pub max_fragments_per_commit: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            max_commits: default_max_commits(),
            max_fragments_per_commit: default_max_fragments_per_commit(),
        }
    }
}

fn default_max_commits() -> usize {
    200
}

fn default_max_fragments_per_commit() -> usize {
    80
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Gemini model name used unless `--model` overrides it.
    #[serde(default = "default_model")]
    pub model: String,
    /// Default entropy dial, 0 archival to 1 surreal.
    #[serde(default = "default_entropy")]
    pub entropy: f64,
    /// Fragments sampled per artifact.
    #[serde(default = "default_fragment_count")]
    pub fragment_count: usize,
    /// HTTP timeout for backend calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for rate-limited or failing backend calls.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            entropy: default_entropy(),
            fragment_count: default_fragment_count(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_entropy() -> f64 {
    0.55
}

fn default_fragment_count() -> usize {
    200
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

/// Load configuration from a TOML file, falling back to defaults when the
/// file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Entropy is clamped, never rejected, to match the sampler's tolerance.
    config.generation.entropy = config.generation.entropy.clamp(0.0, 1.0);

    if config.generation.fragment_count == 0 {
        anyhow::bail!("generation.fragment_count must be > 0");
    }
    if config.mining.max_fragments_per_commit == 0 {
        anyhow::bail!("mining.max_fragments_per_commit must be > 0");
    }

    Ok(config)
}
