//! Render persisted artifacts into Markdown, JSON, and HTML bundles.
//!
//! Each artifact gets its own directory under the output root containing
//! `artifact.md`, `artifact.json`, and a self-contained `artifact.html`.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::{ArtifactRecord, Candidate};
use crate::store;

/// The `render` command: re-render a persisted artifact by id.
pub async fn run_render(config: &Config, artifact_id: &str) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;

    let Some(artifact) = store::get_artifact(&pool, artifact_id).await? else {
        anyhow::bail!("Artifact not found: {}", artifact_id);
    };
    let fragments = store::get_artifact_fragments(&pool, artifact_id).await?;

    let out_dir = render_artifact(&artifact, &fragments, &config.output.root)?;
    println!("Rendered artifact to: {}", out_dir.display());

    pool.close().await;
    Ok(())
}

/// Write the artifact bundle to disk and return its directory.
pub fn render_artifact(
    artifact: &ArtifactRecord,
    fragments: &[Candidate],
    output_root: &Path,
) -> Result<PathBuf> {
    let target_dir = output_root.join(&artifact.artifact_id);
    std::fs::create_dir_all(&target_dir)?;

    let markdown = render_markdown(artifact, fragments);
    std::fs::write(target_dir.join("artifact.md"), markdown)?;

    let payload = serde_json::json!({
        "artifact": artifact,
        "fragments": fragments,
    });
    std::fs::write(
        target_dir.join("artifact.json"),
        serde_json::to_string_pretty(&payload)?,
    )?;

    let html = render_html(artifact, fragments);
    std::fs::write(target_dir.join("artifact.html"), html)?;

    Ok(target_dir)
}

/// Human-readable Markdown representation of an artifact.
fn render_markdown(artifact: &ArtifactRecord, fragments: &[Candidate]) -> String {
    let mut lines = vec![
        format!("# {}", artifact.output_title),
        String::new(),
        format!("- Artifact ID: `{}`", artifact.artifact_id),
        format!("- Created: `{}`", artifact.created_at.to_rfc3339()),
        format!(
            "- Model: `{}` ({})",
            artifact.model_name,
            artifact.generation_mode.as_str()
        ),
        format!("- Entropy: `{}`", artifact.entropy),
        format!("- Seed: `{}`", artifact.seed),
        String::new(),
        "## Artifact".to_string(),
        String::new(),
        format!("```{}", artifact.output_language),
        artifact.output_code.clone(),
        "```".to_string(),
        String::new(),
        "## Artist Statement".to_string(),
        String::new(),
        artifact.output_statement.clone(),
        String::new(),
        "## Transform Notes".to_string(),
        String::new(),
        artifact.output_notes.clone(),
        String::new(),
        "## Source Fragments".to_string(),
        String::new(),
    ];

    for (idx, fragment) in fragments.iter().enumerate() {
        lines.push(format!("### Fragment {}", idx + 1));
        lines.push(format!(
            "- `{}` `{}` `{}:{}`",
            fragment.repo_name,
            short_hash(&fragment.commit_hash),
            fragment.file_path,
            fragment.line_no
        ));
        lines.push(String::new());
        lines.push(format!("```{}", fragment.language));
        lines.push(fragment.content.clone());
        lines.push("```".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Self-contained HTML page with inline styling.
fn render_html(artifact: &ArtifactRecord, fragments: &[Candidate]) -> String {
    let meta = format!(
        "artifact {} | model {} ({}) | created {}",
        escape_html(&artifact.artifact_id),
        escape_html(&artifact.model_name),
        artifact.generation_mode.as_str(),
        escape_html(&artifact.created_at.to_rfc3339()),
    );

    let fragment_blocks = render_fragment_blocks(fragments);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ background: #111; color: #d8d8d0; font-family: Georgia, serif; margin: 0 auto; max-width: 52rem; padding: 2rem; }}
h1 {{ font-weight: normal; letter-spacing: 0.05em; }}
.meta {{ color: #777; font-size: 0.85rem; }}
pre {{ background: #1a1a1a; border-left: 2px solid #444; overflow-x: auto; padding: 1rem; }}
code {{ font-family: "SF Mono", Menlo, monospace; font-size: 0.85rem; }}
.statement, .notes {{ line-height: 1.6; }}
.fragment {{ border-top: 1px solid #2a2a2a; margin-top: 2rem; padding-top: 1rem; }}
.fragment-meta {{ color: #666; font-size: 0.8rem; }}
</style>
</head>
<body data-artifact-id="{artifact_id}" data-fragment-total="{fragment_total}">
<h1>{title}</h1>
<p class="meta">{meta}</p>
<section class="artifact">
<pre><code>{code}</code></pre>
</section>
<section class="statement">
<h2>Artist Statement</h2>
<p>{statement}</p>
</section>
<section class="notes">
<h2>Transform Notes</h2>
<p>{notes}</p>
</section>
<section class="fragments">
<h2>Source Fragments</h2>
{fragment_blocks}
</section>
</body>
</html>
"#,
        title = escape_html(&artifact.output_title),
        artifact_id = escape_html(&artifact.artifact_id),
        fragment_total = fragments.len(),
        meta = meta,
        code = escape_html(&artifact.output_code),
        statement = escape_html_with_breaks(&artifact.output_statement),
        notes = escape_html_with_breaks(&artifact.output_notes),
        fragment_blocks = fragment_blocks,
    )
}

/// HTML cards for the lineage fragments.
fn render_fragment_blocks(fragments: &[Candidate]) -> String {
    fragments
        .iter()
        .enumerate()
        .map(|(idx, fragment)| {
            format!(
                "<article class=\"fragment\" data-fragment-index=\"{idx}\">\n\
                 <header>\n\
                 <h3>{file}:{line}</h3>\n\
                 <p class=\"fragment-meta\"><code>{hash}</code> <span>{marker}</span></p>\n\
                 </header>\n\
                 <pre><code>{content}</code></pre>\n\
                 </article>",
                idx = idx,
                file = escape_html(&fragment.file_path),
                line = fragment.line_no,
                hash = escape_html(short_hash(&fragment.commit_hash)),
                marker = relative_marker(idx),
                content = escape_html(&fragment.content),
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn short_hash(hash: &str) -> &str {
    if hash.len() > 12 {
        &hash[..12]
    } else {
        hash
    }
}

/// Rotating temporal label used in fragment metadata.
fn relative_marker(index: usize) -> &'static str {
    const OPTIONS: [&str; 3] = ["earlier", "later", "not yet"];
    OPTIONS[index % OPTIONS.len()]
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_html_with_breaks(value: &str) -> String {
    escape_html(value).replace('\n', "<br />")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationMode;
    use chrono::TimeZone;

    fn record() -> ArtifactRecord {
        ArtifactRecord {
            artifact_id: "abc123def456".to_string(),
            created_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            seed: 42,
            entropy: 0.55,
            source_repo: "demo".to_string(),
            model_name: "gemini-test".to_string(),
            generation_mode: GenerationMode::Local,
            prompt_text: "prompt".to_string(),
            raw_response: "{}".to_string(),
            output_title: "Ghost <Loop>".to_string(),
            output_language: "python".to_string(),
            output_code: "print('x & y')".to_string(),
            output_statement: "line one\nline two".to_string(),
            output_notes: "Seed=42".to_string(),
        }
    }

    fn fragment() -> Candidate {
        Candidate {
            id: 1,
            repo_name: "demo".to_string(),
            commit_hash: "0123456789abcdef0123".to_string(),
            file_path: "src/old.py".to_string(),
            language: "python".to_string(),
            line_no: 12,
            content: "del cache[key]".to_string(),
        }
    }

    #[test]
    fn test_render_markdown_sections() {
        let md = render_markdown(&record(), &[fragment()]);
        assert!(md.starts_with("# Ghost <Loop>"));
        assert!(md.contains("## Artist Statement"));
        assert!(md.contains("```python"));
        assert!(md.contains("### Fragment 1"));
        assert!(md.contains("`0123456789ab` `src/old.py:12`"));
        assert!(md.contains("- Seed: `42`"));
    }

    #[test]
    fn test_render_html_escapes_content() {
        let html = render_html(&record(), &[fragment()]);
        assert!(html.contains("Ghost &lt;Loop&gt;"));
        assert!(html.contains("print('x &amp; y')"));
        assert!(html.contains("line one<br />line two"));
        assert!(html.contains("data-fragment-total=\"1\""));
        assert!(html.contains("del cache[key]"));
    }

    #[test]
    fn test_render_artifact_writes_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = render_artifact(&record(), &[fragment()], tmp.path()).unwrap();

        assert_eq!(dir, tmp.path().join("abc123def456"));
        assert!(dir.join("artifact.md").exists());
        assert!(dir.join("artifact.json").exists());
        assert!(dir.join("artifact.html").exists());

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("artifact.json")).unwrap())
                .unwrap();
        assert_eq!(json["artifact"]["artifact_id"], "abc123def456");
        assert_eq!(json["fragments"][0]["line_no"], 12);
    }

    #[test]
    fn test_relative_marker_rotates() {
        assert_eq!(relative_marker(0), "earlier");
        assert_eq!(relative_marker(1), "later");
        assert_eq!(relative_marker(2), "not yet");
        assert_eq!(relative_marker(3), "earlier");
    }
}
