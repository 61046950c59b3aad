//! Deleted-line mining from git commit history.
//!
//! Walks the commit log (newest first, merges skipped), diffs each commit
//! with zero context lines, and collects the removed lines that pass the
//! interestingness filter. Line numbers are tracked from the hunk headers
//! so each fragment keeps its position in the pre-edit file.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Command;

use crate::models::Fragment;

static HUNK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@@ -(\d+)(?:,(\d+))? \+\d+(?:,\d+)? @@").expect("hunk regex is valid")
});

/// One commit as listed by `git log`.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// Mining progress: commits done, commits total, fragments so far.
pub type MiningProgress<'a> = &'a mut dyn FnMut(usize, usize, usize);

fn run_git(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_path)
        .args(args)
        .output()
        .with_context(|| "Failed to execute git. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// List commit hash/author/timestamp triples, newest first, merges excluded.
pub fn list_commits(repo_path: &Path, max_commits: Option<usize>) -> Result<Vec<CommitInfo>> {
    let mut args = vec![
        "log".to_string(),
        "--pretty=format:%H%x1f%an%x1f%aI".to_string(),
        "--no-merges".to_string(),
    ];
    if let Some(max) = max_commits {
        args.push("-n".to_string());
        args.push(max.to_string());
    }
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_git(repo_path, &arg_refs)?;

    let mut commits = Vec::new();
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, '\u{1f}');
        let (hash, author, ts) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(a), Some(t)) => (h, a, t),
            _ => bail!("Unexpected git log line: {}", line),
        };
        let timestamp = DateTime::parse_from_rfc3339(ts)
            .with_context(|| format!("Bad commit timestamp: {}", ts))?
            .with_timezone(&Utc);
        commits.push(CommitInfo {
            hash: hash.to_string(),
            author: author.to_string(),
            timestamp,
        });
    }
    Ok(commits)
}

/// Mine deleted fragments from a repository's history.
///
/// Inspects up to `max_commits` commits and caps extraction at
/// `max_fragments_per_commit` per commit so one giant deletion cannot
/// flood the pool. Reports progress after each commit when a callback is
/// supplied.
pub fn extract_deleted_fragments(
    repo_path: &Path,
    max_commits: Option<usize>,
    max_fragments_per_commit: usize,
    mut progress: Option<MiningProgress<'_>>,
) -> Result<Vec<Fragment>> {
    let repo_path = repo_path
        .canonicalize()
        .with_context(|| format!("Cannot resolve repo path: {}", repo_path.display()))?;
    let repo_name = repo_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "repo".to_string());

    let commits = list_commits(&repo_path, max_commits)?;
    let total = commits.len();

    let mut all_fragments = Vec::new();
    for (done, commit) in commits.iter().enumerate() {
        let diff_text = run_git(
            &repo_path,
            &[
                "show",
                "--format=",
                "--unified=0",
                "--no-color",
                &commit.hash,
            ],
        )?;

        let mut fragments = parse_deleted_lines(
            &diff_text,
            &repo_path.to_string_lossy(),
            &repo_name,
            commit,
            max_fragments_per_commit,
        );
        all_fragments.append(&mut fragments);

        if let Some(report) = progress.as_mut() {
            report(done + 1, total, all_fragments.len());
        }
    }

    Ok(all_fragments)
}

/// Parse one commit's `--unified=0` diff output into fragments.
///
/// State machine over raw diff lines: file headers reset tracking, hunk
/// headers set the pre-image line counter, `-` lines become fragments when
/// interesting, context lines advance the counter.
fn parse_deleted_lines(
    diff_text: &str,
    repo_path: &str,
    repo_name: &str,
    commit: &CommitInfo,
    max_fragments: usize,
) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut current_file = String::new();
    let mut current_line_no: i64 = 0;
    let mut from_file = false;

    for raw in diff_text.lines() {
        if raw.starts_with("diff --git ") {
            current_file.clear();
            from_file = false;
            continue;
        }

        if let Some(rest) = raw.strip_prefix("--- ") {
            // New files have no pre-image to delete from.
            from_file = rest != "/dev/null";
            continue;
        }

        if let Some(rest) = raw.strip_prefix("+++ b/") {
            current_file = rest.to_string();
            continue;
        }

        if raw.starts_with("@@ ") {
            if let Some(captures) = HUNK_RE.captures(raw) {
                if let Ok(line_no) = captures[1].parse::<i64>() {
                    current_line_no = line_no;
                }
            }
            continue;
        }

        if current_file.is_empty() || !from_file {
            continue;
        }

        if raw.starts_with('-') && !raw.starts_with("---") {
            let content = &raw[1..];
            if is_interesting(content) {
                fragments.push(Fragment {
                    repo_path: repo_path.to_string(),
                    repo_name: repo_name.to_string(),
                    commit_hash: commit.hash.clone(),
                    commit_author: commit.author.clone(),
                    commit_timestamp: commit.timestamp,
                    file_path: current_file.clone(),
                    language: infer_language(&current_file).to_string(),
                    line_no: current_line_no,
                    content: content.trim_end().to_string(),
                });
            }
            current_line_no += 1;
            if fragments.len() >= max_fragments {
                break;
            }
        } else if raw.starts_with(' ') {
            current_line_no += 1;
        }
    }

    fragments
}

/// Drop lines too small or too punctuation-heavy to ever be selected.
fn is_interesting(content: &str) -> bool {
    let text = content.trim();
    if text.is_empty() || text.chars().count() < 4 {
        return false;
    }
    if matches!(text, "{" | "}" | "(" | ")" | "[" | "]" | ";" | ",") {
        return false;
    }
    // Skip low-signal lines that are entirely punctuation.
    text.chars().any(|ch| ch.is_alphanumeric())
}

/// Infer a language tag from the file extension.
fn infer_language(file_path: &str) -> &'static str {
    let extension = Path::new(file_path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "tsx" => "tsx",
        "jsx" => "jsx",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "php" => "php",
        "cs" => "csharp",
        "cpp" | "cc" | "hpp" => "cpp",
        "c" | "h" => "c",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "sh" => "bash",
        "sql" => "sql",
        "html" => "html",
        "css" => "css",
        "md" => "markdown",
        "json" => "json",
        "yml" | "yaml" => "yaml",
        _ => "text",
    }
}
