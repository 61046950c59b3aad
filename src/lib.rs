//! # Landscrap
//!
//! Mine lines deleted from a git repository's history and recompose them
//! into generated "artifact" pieces (code + commentary), via an external
//! generative model or a deterministic local fallback.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌───────────────┐
//! │   Git     │──▶│  Miner   │──▶│  SQLite  │──▶│   Selector    │
//! │  history  │   │ deleted  │   │fragments │   │ weighted +    │
//! └──────────┘   │  lines   │   └──────────┘   │ seeded chaos  │
//!                └──────────┘                  └──────┬────────┘
//!                                                     │
//!                                    ┌────────────────┴───────┐
//!                                    ▼                        ▼
//!                              ┌──────────┐            ┌──────────┐
//!                              │  Gemini  │            │  Local   │
//!                              │ backend  │            │ fallback │
//!                              └────┬─────┘            └────┬─────┘
//!                                   └───────────┬──────────┘
//!                                               ▼
//!                                   Markdown / JSON / HTML bundle
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! landscrap init                          # create database
//! landscrap ingest ./some-repo            # mine deleted fragments
//! landscrap generate --local-only         # produce an artifact offline
//! landscrap run https://github.com/o/r --local-only   # one-shot flow
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with built-in defaults |
//! | [`models`] | Core data types |
//! | [`repo`] | Source repo resolution (local path or remote clone cache) |
//! | [`miner`] | Deleted-line extraction from git history |
//! | [`selector`] | Fragment scoring and seeded weighted sampling |
//! | [`prompting`] | Backend prompt construction |
//! | [`generator`] | Gemini client, local fallback, output parsing |
//! | [`pipeline`] | Generation orchestration |
//! | [`store`] | SQLite persistence and lineage |
//! | [`renderer`] | Markdown/JSON/HTML artifact bundles |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod config;
pub mod db;
pub mod doctor;
pub mod generate;
pub mod generator;
pub mod ingest;
pub mod migrate;
pub mod miner;
pub mod models;
pub mod pipeline;
pub mod prompting;
pub mod renderer;
pub mod repo;
pub mod run;
pub mod selector;
pub mod store;
