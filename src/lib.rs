//! # OfficeIndex Adapter
//!
//! **An in-process, incremental search index over office documents living in
//! a workspace file tree.**
//!
//! This crate scans a workspace for Word/PowerPoint/Excel files (and,
//! optionally, PDFs), extracts their text, and serves ranked keyword search
//! over the result via a small HTTP API. It holds no database and persists
//! nothing across restarts — the index is rebuilt by scanning the
//! filesystem, and content-hash-keyed caching makes repeated incremental
//! refreshes cheap.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌───────────────┐   ┌───────────┐
//! │ scanner  │──▶│ extract    │──▶│ refresh        │──▶│  search   │
//! │ (BFS)    │   │ (chain)    │   │ (single-flight)│   │ (ranked)  │
//! └──────────┘   └────────────┘   └───────┬───────┘   └─────┬─────┘
//!                                         │                  │
//!                                         ▼                  ▼
//!                                   ┌──────────────────────────┐
//!                                   │      server (Axum)       │
//!                                   │ /health /search /reindex  │
//!                                   └──────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The **scanner** ([`scanner`]) walks the workspace breadth-first,
//!    collecting office-document candidates under a directory/file budget.
//! 2. The **refresh orchestrator** ([`refresh`]) decides, per file, whether
//!    the previous extraction can be reused (unchanged mtime/size, or an
//!    unchanged content hash) or whether the **extractor chain**
//!    ([`extract`]) needs to run again.
//! 3. The orchestrator atomically swaps the new snapshot into the shared
//!    [`refresh::IndexHandle`].
//! 4. The **search evaluator** ([`search`]) scores a query against the
//!    current snapshot using a layered ranked-match model.
//! 5. Results are exposed via the **HTTP server** ([`server`]) and kept warm
//!    by an optional **background worker** ([`background`]).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Environment-variable configuration, no config file |
//! | [`models`] | Core data types: `IndexedDocument`, `RefreshSummary`, `SearchResultItem` |
//! | [`query`] | Query parsing, limits, text-match scoring, snippet extraction |
//! | [`scanner`] | Breadth-first workspace scan under directory/file budgets |
//! | [`extract`] | Extractor chain: external OpenSearch pipeline, local OOXML, path-only fallback |
//! | [`refresh`] | Single-flight refresh orchestrator and the shared index handle |
//! | [`search`] | In-memory ranked-match search evaluator |
//! | [`server`] | HTTP surface (Axum) with CORS |
//! | [`background`] | Interval-driven background refresh worker |
//!
//! ## Configuration
//!
//! Configured entirely via environment variables (see [`config::Config::from_env`]) —
//! there is no config file for this adapter.

pub mod background;
pub mod config;
pub mod extract;
pub mod models;
pub mod query;
pub mod refresh;
pub mod scanner;
pub mod search;
pub mod server;
