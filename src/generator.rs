//! Generation backends and output normalization.
//!
//! Two paths produce an artifact from a selected fragment set:
//! - **[`GeminiClient`]** — calls the Gemini `generateContent` API with
//!   retry/backoff and expects a JSON payload matching [`ArtifactOutput`].
//! - **[`local_generate`]** — deterministic offline fallback that shuffles
//!   and truncates the fragment pool under a seeded RNG. No network, no
//!   wall-clock dependence; identical inputs give byte-identical output.
//!
//! [`parse_output`] normalizes backend responses: fenced JSON is unwrapped,
//! plain text is wrapped into a minimal placeholder payload, and valid JSON
//! that misses the schema is reported as a schema validation error.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex::Regex;
use std::path::Path;
use std::time::Duration;

use crate::models::{ArtifactOutput, Candidate};

/// Fallback plaintext key file checked when `GEMINI_API_KEY` is unset.
pub const DEFAULT_GEMINI_KEY_FILE: &str = ".api_keys/Gemini.md";

static JSON_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").expect("fence regex is valid")
});

/// Resolve the Gemini API key from the environment or a fallback file.
///
/// Resolution order: `GEMINI_API_KEY` environment variable, then the
/// plaintext contents of `key_file`. Returns `None` when neither yields a
/// non-empty value.
pub fn resolve_gemini_api_key(key_file: &Path) -> Option<String> {
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Some(key);
        }
    }
    read_key_file(key_file)
}

/// Read a trimmed, non-empty API key from a plaintext file.
fn read_key_file(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let key = contents.trim().to_string();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Thin client for Gemini content generation.
///
/// Sends the system instruction and user prompt to the
/// `models/<name>:generateContent` endpoint with JSON response formatting
/// and returns the raw response text.
///
/// # Retry Strategy
///
/// - HTTP 429 and 5xx → retry with exponential backoff (1s, 2s, 4s, ...)
/// - Other 4xx → fail immediately
/// - Network errors → retry
pub struct GeminiClient {
    model: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>, timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            model: model.into(),
            timeout_secs,
            max_retries,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Generate JSON-formatted artifact content from prompts.
    ///
    /// # Errors
    ///
    /// Fails when either prompt is blank, no API key can be resolved, the
    /// API returns a non-retryable error or exhausts retries, or the
    /// response carries no text.
    pub async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        if system_prompt.trim().is_empty() {
            bail!("System prompt must be a non-empty string");
        }
        if user_prompt.trim().is_empty() {
            bail!("User prompt must be a non-empty string");
        }

        let api_key = resolve_gemini_api_key(Path::new(DEFAULT_GEMINI_KEY_FILE))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Missing GEMINI_API_KEY (set the env var or {})",
                    DEFAULT_GEMINI_KEY_FILE
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let body = serde_json::json!({
            "system_instruction": {
                "parts": [{ "text": system_prompt }]
            },
            "contents": [{
                "parts": [{ "text": user_prompt }]
            }],
            "generationConfig": {
                "temperature": 1.0,
                "topP": 0.95,
                "responseMimeType": "application/json"
            }
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(&url)
                .header("x-goog-api-key", &api_key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return extract_response_text(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Gemini API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Gemini API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
    }
}

/// Pull the concatenated text parts out of a `generateContent` response.
fn extract_response_text(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing candidates/parts"))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    let text = text.trim().to_string();
    if text.is_empty() {
        bail!("Gemini returned an empty response");
    }
    Ok(text)
}

/// Remove a surrounding Markdown JSON code fence when present.
pub fn strip_json_fence(text: &str) -> &str {
    if let Some(captures) = JSON_FENCE_RE.captures(text.trim()) {
        if let Some(inner) = captures.get(1) {
            return inner.as_str();
        }
    }
    text.trim()
}

/// Parse backend output into an [`ArtifactOutput`].
///
/// Tolerates fenced JSON. Text that is not JSON at all is recovered into a
/// minimal placeholder payload so the raw response is never thrown away.
/// Valid JSON that does not satisfy the schema is a hard error.
pub fn parse_output(raw: &str) -> Result<ArtifactOutput> {
    let candidate = strip_json_fence(raw);

    let value: serde_json::Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(_) => {
            // Minimal fallback if the model returns plain text.
            return Ok(ArtifactOutput {
                title: crate::models::default_title(),
                language: crate::models::default_language(),
                artifact_code: raw.to_string(),
                artist_statement: "Generated without strict JSON contract.".to_string(),
                transform_notes: "Fallback parser path used.".to_string(),
            });
        }
    };

    serde_json::from_value(value).context("Model output failed schema validation")
}

/// Produce an artifact deterministically without external model calls.
///
/// Shuffles the trimmed fragment contents under a seed-derived RNG and
/// keeps `max(6, floor(len * (0.35 + entropy * 0.35)))` lines: at least 6,
/// scaling from 35% of the pool at zero entropy to 70% at full entropy.
///
/// Returns the serialized JSON text matching the output contract together
/// with the structured value. Identical inputs give byte-identical text.
pub fn local_generate(
    fragments: &[Candidate],
    entropy: f64,
    seed: u64,
) -> Result<(String, ArtifactOutput)> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut pool: Vec<&str> = fragments
        .iter()
        .map(|fragment| fragment.content.trim())
        .filter(|content| !content.is_empty())
        .collect();
    pool.shuffle(&mut rng);

    let keep = ((pool.len() as f64) * (0.35 + entropy * 0.35)).floor() as usize;
    let keep = keep.max(6);

    let stitched = pool
        .iter()
        .take(keep)
        .copied()
        .collect::<Vec<&str>>()
        .join("\n");

    let output = ArtifactOutput {
        title: "Local Landscrap Study".to_string(),
        language: fragments
            .first()
            .map(|fragment| fragment.language.clone())
            .unwrap_or_else(crate::models::default_language),
        artifact_code: stitched,
        artist_statement: "This piece was generated in local fallback mode by permuting \
                           deleted code strata without external inference."
            .to_string(),
        transform_notes: format!(
            "Seed={}, entropy={:.2}, fragments={}",
            seed,
            entropy,
            fragments.len()
        ),
    };

    let raw = serde_json::to_string(&output)?;
    Ok((raw, output))
}
