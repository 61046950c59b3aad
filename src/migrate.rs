use anyhow::Result;
use sqlx::SqlitePool;

/// Create the schema. Idempotent; safe to run on every start.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Fragments mined from git history. The uniqueness constraint makes
    // re-mining the same history a no-op.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fragments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            repo_path TEXT NOT NULL,
            repo_name TEXT NOT NULL,
            commit_hash TEXT NOT NULL,
            commit_author TEXT NOT NULL,
            commit_timestamp TEXT NOT NULL,
            file_path TEXT NOT NULL,
            language TEXT NOT NULL,
            line_no INTEGER NOT NULL,
            content TEXT NOT NULL,
            UNIQUE(commit_hash, file_path, line_no, content)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Generated artifacts, one row per generation run.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            artifact_id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            seed INTEGER NOT NULL,
            entropy REAL NOT NULL,
            source_repo TEXT NOT NULL,
            model_name TEXT NOT NULL,
            generation_mode TEXT NOT NULL,
            prompt_text TEXT NOT NULL,
            raw_response TEXT NOT NULL,
            output_title TEXT NOT NULL,
            output_language TEXT NOT NULL,
            output_code TEXT NOT NULL,
            output_statement TEXT NOT NULL,
            output_notes TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Lineage: which fragments each artifact was derived from.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifact_fragments (
            artifact_id TEXT NOT NULL,
            fragment_id INTEGER NOT NULL,
            PRIMARY KEY (artifact_id, fragment_id),
            FOREIGN KEY (artifact_id) REFERENCES artifacts(artifact_id),
            FOREIGN KEY (fragment_id) REFERENCES fragments(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fragments_repo_name ON fragments(repo_name)")
        .execute(pool)
        .await?;

    Ok(())
}
