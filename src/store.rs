//! SQLite persistence for fragments and artifacts.
//!
//! The selection and generation code never touches the database directly;
//! it works on [`Candidate`] values fetched here and hands back records to
//! persist. Timestamps are stored as RFC 3339 text.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::models::{ArtifactRecord, Candidate, Fragment, GenerationMode};

/// Insert mined fragments, ignoring duplicates. Returns how many rows were
/// actually inserted.
pub async fn insert_fragments(pool: &SqlitePool, fragments: &[Fragment]) -> Result<u64> {
    if fragments.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0u64;
    let mut tx = pool.begin().await?;

    for fragment in fragments {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO fragments(
                repo_path, repo_name, commit_hash, commit_author, commit_timestamp,
                file_path, language, line_no, content
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fragment.repo_path)
        .bind(&fragment.repo_name)
        .bind(&fragment.commit_hash)
        .bind(&fragment.commit_author)
        .bind(fragment.commit_timestamp.to_rfc3339())
        .bind(&fragment.file_path)
        .bind(&fragment.language)
        .bind(fragment.line_no)
        .bind(&fragment.content)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Fetch a randomized candidate pool, optionally filtered by repo name.
pub async fn fetch_candidates(
    pool: &SqlitePool,
    repo_name: Option<&str>,
    limit: i64,
) -> Result<Vec<Candidate>> {
    let rows = match repo_name {
        Some(name) => {
            sqlx::query(
                r#"
                SELECT id, repo_name, commit_hash, file_path, language, line_no, content
                FROM fragments
                WHERE repo_name = ?
                ORDER BY RANDOM()
                LIMIT ?
                "#,
            )
            .bind(name)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, repo_name, commit_hash, file_path, language, line_no, content
                FROM fragments
                ORDER BY RANDOM()
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows
        .iter()
        .map(|row| Candidate {
            id: row.get("id"),
            repo_name: row.get("repo_name"),
            commit_hash: row.get("commit_hash"),
            file_path: row.get("file_path"),
            language: row.get("language"),
            line_no: row.get("line_no"),
            content: row.get("content"),
        })
        .collect())
}

/// Count stored fragments, optionally for one repo.
pub async fn count_fragments(pool: &SqlitePool, repo_name: Option<&str>) -> Result<i64> {
    let count: i64 = match repo_name {
        Some(name) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM fragments WHERE repo_name = ?")
                .bind(name)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM fragments")
                .fetch_one(pool)
                .await?
        }
    };
    Ok(count)
}

/// Persist an artifact and its fragment lineage links in one transaction.
pub async fn save_artifact(
    pool: &SqlitePool,
    record: &ArtifactRecord,
    fragment_ids: &[i64],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO artifacts(
            artifact_id, created_at, seed, entropy, source_repo, model_name,
            generation_mode, prompt_text, raw_response, output_title,
            output_language, output_code, output_statement, output_notes
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.artifact_id)
    .bind(record.created_at.to_rfc3339())
    .bind(record.seed as i64)
    .bind(record.entropy)
    .bind(&record.source_repo)
    .bind(&record.model_name)
    .bind(record.generation_mode.as_str())
    .bind(&record.prompt_text)
    .bind(&record.raw_response)
    .bind(&record.output_title)
    .bind(&record.output_language)
    .bind(&record.output_code)
    .bind(&record.output_statement)
    .bind(&record.output_notes)
    .execute(&mut *tx)
    .await?;

    for fragment_id in fragment_ids {
        sqlx::query("INSERT INTO artifact_fragments(artifact_id, fragment_id) VALUES (?, ?)")
            .bind(&record.artifact_id)
            .bind(fragment_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load a persisted artifact by id.
pub async fn get_artifact(pool: &SqlitePool, artifact_id: &str) -> Result<Option<ArtifactRecord>> {
    let row = sqlx::query("SELECT * FROM artifacts WHERE artifact_id = ?")
        .bind(artifact_id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let created_at: String = row.get("created_at");
    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_at)
        .with_context(|| format!("Bad artifact timestamp: {}", created_at))?
        .with_timezone(&Utc);

    let mode: String = row.get("generation_mode");
    let generation_mode: GenerationMode = mode.parse()?;

    Ok(Some(ArtifactRecord {
        artifact_id: row.get("artifact_id"),
        created_at,
        seed: row.get::<i64, _>("seed") as u64,
        entropy: row.get("entropy"),
        source_repo: row.get("source_repo"),
        model_name: row.get("model_name"),
        generation_mode,
        prompt_text: row.get("prompt_text"),
        raw_response: row.get("raw_response"),
        output_title: row.get("output_title"),
        output_language: row.get("output_language"),
        output_code: row.get("output_code"),
        output_statement: row.get("output_statement"),
        output_notes: row.get("output_notes"),
    }))
}

/// Load the fragments an artifact was derived from, ordered by fragment id.
pub async fn get_artifact_fragments(
    pool: &SqlitePool,
    artifact_id: &str,
) -> Result<Vec<Candidate>> {
    let rows = sqlx::query(
        r#"
        SELECT f.id, f.repo_name, f.commit_hash, f.file_path, f.language, f.line_no, f.content
        FROM artifact_fragments af
        JOIN fragments f ON af.fragment_id = f.id
        WHERE af.artifact_id = ?
        ORDER BY f.id
        "#,
    )
    .bind(artifact_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Candidate {
            id: row.get("id"),
            repo_name: row.get("repo_name"),
            commit_hash: row.get("commit_hash"),
            file_path: row.get("file_path"),
            language: row.get("language"),
            line_no: row.get("line_no"),
            content: row.get("content"),
        })
        .collect())
}
