//! The `doctor` command: local environment diagnostics.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::generator::{resolve_gemini_api_key, DEFAULT_GEMINI_KEY_FILE};

/// Print whether the database and API credentials are in place.
pub fn run_doctor(config: &Config) -> Result<()> {
    let has_db = config.db.path.exists();
    let api_key = resolve_gemini_api_key(Path::new(DEFAULT_GEMINI_KEY_FILE));

    println!("DB exists: {} ({})", has_db, config.db.path.display());
    println!("GEMINI_API_KEY set: {}", api_key.is_some());
    Ok(())
}
