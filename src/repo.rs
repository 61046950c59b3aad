//! Source repository resolution for local paths and remote git URLs.
//!
//! Local directories must already be git repositories. Remote URLs are
//! cloned into a cache directory keyed by a slug plus a digest of the URL,
//! and optionally fetched/pulled on reuse.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Command;

/// How a source string was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Existing local repository used directly.
    Local,
    /// Remote URL cloned fresh into the cache.
    Cloned,
    /// Cached clone fetched and fast-forwarded.
    Updated,
    /// Cached clone reused without contacting the remote.
    Cached,
}

impl SourceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Local => "local",
            SourceMode::Cloned => "cloned",
            SourceMode::Updated => "updated",
            SourceMode::Cached => "cached",
        }
    }
}

/// Return true when `source` matches common git URL prefixes.
pub fn looks_like_git_url(source: &str) -> bool {
    source.starts_with("https://")
        || source.starts_with("http://")
        || source.starts_with("git@")
        || source.starts_with("ssh://")
}

/// Resolve a source string to a local git repository path.
///
/// Existing local repos are used directly; remote URLs are cloned into
/// `cache_dir` when absent, and fetched/pulled on reuse unless
/// `update_remote` is false.
pub fn resolve_repo_source(
    source: &str,
    cache_dir: &Path,
    update_remote: bool,
) -> Result<(PathBuf, SourceMode)> {
    let candidate = PathBuf::from(source);
    if candidate.exists() {
        if !candidate.is_dir() {
            bail!("Source exists but is not a directory: {}", candidate.display());
        }
        if !candidate.join(".git").exists() {
            bail!("Directory is not a git repo: {}", candidate.display());
        }
        let resolved = candidate.canonicalize()?;
        return Ok((resolved, SourceMode::Local));
    }

    if !looks_like_git_url(source) {
        bail!(
            "Source is neither an existing local repo path nor a recognized git URL: {}",
            source
        );
    }

    std::fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
    let target = cache_dir.join(cache_repo_name(source));

    if !target.exists() {
        run_cmd(&["git", "clone", "--quiet", source, &target.to_string_lossy()])?;
        return Ok((target.canonicalize()?, SourceMode::Cloned));
    }

    if update_remote {
        let target_str = target.to_string_lossy().to_string();
        run_cmd(&["git", "-C", &target_str, "fetch", "--all", "--prune"])?;

        let default_ref = run_cmd(&[
            "git",
            "-C",
            &target_str,
            "rev-parse",
            "--abbrev-ref",
            "origin/HEAD",
        ])?;
        let default_ref = default_ref.trim();
        let branch = default_ref
            .strip_prefix("origin/")
            .unwrap_or("main")
            .to_string();

        run_cmd(&["git", "-C", &target_str, "checkout", &branch])?;
        run_cmd(&[
            "git", "-C", &target_str, "pull", "--ff-only", "origin", &branch,
        ])?;
        return Ok((target.canonicalize()?, SourceMode::Updated));
    }

    Ok((target.canonicalize()?, SourceMode::Cached))
}

/// Build a stable cache directory name from the URL slug and a digest of
/// the full source string, so distinct remotes with the same repo name do
/// not collide.
pub fn cache_repo_name(source: &str) -> String {
    let tail = source
        .rsplit(|ch| ch == '/' || ch == ':')
        .next()
        .unwrap_or("repo");
    let stem = tail.strip_suffix(".git").unwrap_or(tail);
    let slug = if stem.is_empty() { "repo" } else { stem };

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{}-{}", slug, &digest[..10])
}

fn run_cmd(cmd: &[&str]) -> Result<String> {
    let output = Command::new(cmd[0])
        .args(&cmd[1..])
        .output()
        .with_context(|| format!("Failed to execute '{}'", cmd[0]))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Command failed ({}): {}", cmd.join(" "), stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_git_url() {
        assert!(looks_like_git_url("https://github.com/org/repo.git"));
        assert!(looks_like_git_url("git@github.com:org/repo.git"));
        assert!(looks_like_git_url("ssh://host/repo"));
        assert!(!looks_like_git_url("./local/path"));
        assert!(!looks_like_git_url("/abs/path"));
    }

    #[test]
    fn test_cache_repo_name_is_stable_and_slugged() {
        let a = cache_repo_name("https://github.com/org/widgets.git");
        let b = cache_repo_name("https://github.com/org/widgets.git");
        assert_eq!(a, b);
        assert!(a.starts_with("widgets-"));
        assert_eq!(a.len(), "widgets-".len() + 10);
    }

    #[test]
    fn test_cache_repo_name_distinguishes_hosts() {
        let github = cache_repo_name("https://github.com/org/widgets.git");
        let gitlab = cache_repo_name("https://gitlab.com/org/widgets.git");
        assert_ne!(github, gitlab);
    }

    #[test]
    fn test_cache_repo_name_scp_style_url() {
        let name = cache_repo_name("git@github.com:org/widgets.git");
        assert!(name.starts_with("widgets-"));
    }

    #[test]
    fn test_resolve_rejects_non_repo_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_repo_source(
            &tmp.path().to_string_lossy(),
            &tmp.path().join("cache"),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a git repo"));
    }

    #[test]
    fn test_resolve_rejects_unrecognized_source() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_repo_source("no-such-thing", &tmp.path().join("cache"), false)
            .unwrap_err();
        assert!(err.to_string().contains("neither an existing local repo"));
    }
}
