use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use landscrap::models::{ArtifactRecord, Fragment, GenerationMode};
use landscrap::{db, migrate, store};

fn fragment(commit: &str, line_no: i64, content: &str) -> Fragment {
    Fragment {
        repo_path: "/tmp/demo".to_string(),
        repo_name: "demo".to_string(),
        commit_hash: commit.to_string(),
        commit_author: "Ada".to_string(),
        commit_timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        file_path: "src/app.py".to_string(),
        language: "python".to_string(),
        line_no,
        content: content.to_string(),
    }
}

fn record(artifact_id: &str) -> ArtifactRecord {
    ArtifactRecord {
        artifact_id: artifact_id.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap(),
        seed: 42,
        entropy: 0.55,
        source_repo: "demo".to_string(),
        model_name: "gemini-test".to_string(),
        generation_mode: GenerationMode::Local,
        prompt_text: "prompt".to_string(),
        raw_response: "{\"artifact_code\":\"x\"}".to_string(),
        output_title: "Study".to_string(),
        output_language: "python".to_string(),
        output_code: "x = 1".to_string(),
        output_statement: "statement".to_string(),
        output_notes: "notes".to_string(),
    }
}

async fn setup() -> (TempDir, sqlx::SqlitePool) {
    let tmp = TempDir::new().unwrap();
    let pool = db::connect(&tmp.path().join("test.db")).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    (tmp, pool)
}

#[tokio::test]
async fn insert_fragments_is_idempotent() {
    let (_tmp, pool) = setup().await;

    let fragments = vec![
        fragment("aaa", 1, "def removed(): pass"),
        fragment("aaa", 2, "    return None"),
    ];

    let first = store::insert_fragments(&pool, &fragments).await.unwrap();
    assert_eq!(first, 2);

    // Re-mining the same history inserts nothing new.
    let second = store::insert_fragments(&pool, &fragments).await.unwrap();
    assert_eq!(second, 0);

    assert_eq!(store::count_fragments(&pool, None).await.unwrap(), 2);
}

#[tokio::test]
async fn fetch_candidates_filters_by_repo_name() {
    let (_tmp, pool) = setup().await;

    let mut other = fragment("bbb", 5, "legacy_total += 1");
    other.repo_name = "other".to_string();
    let fragments = vec![fragment("aaa", 1, "def removed(): pass"), other];
    store::insert_fragments(&pool, &fragments).await.unwrap();

    let demo_only = store::fetch_candidates(&pool, Some("demo"), 100).await.unwrap();
    assert_eq!(demo_only.len(), 1);
    assert_eq!(demo_only[0].repo_name, "demo");
    assert!(demo_only[0].id > 0);

    let all = store::fetch_candidates(&pool, None, 100).await.unwrap();
    assert_eq!(all.len(), 2);

    let none = store::fetch_candidates(&pool, Some("missing"), 100).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn save_artifact_round_trips_with_lineage() {
    let (_tmp, pool) = setup().await;

    let fragments = vec![
        fragment("aaa", 1, "def removed(): pass"),
        fragment("aaa", 2, "    return None"),
        fragment("ccc", 9, "SELECT * FROM users;"),
    ];
    store::insert_fragments(&pool, &fragments).await.unwrap();
    let candidates = store::fetch_candidates(&pool, None, 100).await.unwrap();
    let ids: Vec<i64> = candidates.iter().take(2).map(|c| c.id).collect();

    store::save_artifact(&pool, &record("abc123"), &ids).await.unwrap();

    let loaded = store::get_artifact(&pool, "abc123").await.unwrap().unwrap();
    assert_eq!(loaded.artifact_id, "abc123");
    assert_eq!(loaded.seed, 42);
    assert_eq!(loaded.generation_mode, GenerationMode::Local);
    assert_eq!(loaded.entropy, 0.55);
    assert_eq!(loaded.created_at, record("abc123").created_at);

    let linked = store::get_artifact_fragments(&pool, "abc123").await.unwrap();
    assert_eq!(linked.len(), 2);
    let mut linked_ids: Vec<i64> = linked.iter().map(|c| c.id).collect();
    linked_ids.sort_unstable();
    let mut expected = ids.clone();
    expected.sort_unstable();
    assert_eq!(linked_ids, expected);
}

#[tokio::test]
async fn get_artifact_missing_id_is_none() {
    let (_tmp, pool) = setup().await;
    assert!(store::get_artifact(&pool, "nope").await.unwrap().is_none());
}
