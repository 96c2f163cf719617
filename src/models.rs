//! Core data types shared between the scanner, extractor chain, refresh
//! orchestrator, and search evaluator.

use serde::{Deserialize, Serialize};

/// Where a document's `content` field came from, and why extraction may have
/// come back empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeta {
    /// Which extraction strategy produced `content`: `"opensearch"`,
    /// `"opensearch-disabled"`, `"opensearch-error"`, `"opensearch-empty"`,
    /// `"local-ooxml"`, or `"path-only"`.
    pub extractor: String,
    /// Present when `extractor` is `"path-only"` or an `opensearch-*` failure
    /// variant: `"file-too-large"`, `"legacy-binary"`,
    /// `"pdf-disabled-by-default"`, `"read-failed"`, `"request-failed"`,
    /// `"invalid-json"`, `"missing-docs"`, `"invalid-doc"`,
    /// `"missing-attachment"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Present only when `extractor == "opensearch"`: the ingest pipeline
    /// that produced the attachment text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
    /// Populated on search results only, never on the stored document: which
    /// ranked-match band the hit fell into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_kind: Option<String>,
}

impl SourceMeta {
    pub fn simple(extractor: impl Into<String>) -> Self {
        SourceMeta {
            extractor: extractor.into(),
            reason: None,
            pipeline: None,
            match_kind: None,
        }
    }

    pub fn with_reason(extractor: impl Into<String>, reason: impl Into<String>) -> Self {
        SourceMeta {
            extractor: extractor.into(),
            reason: Some(reason.into()),
            pipeline: None,
            match_kind: None,
        }
    }

    pub fn opensearch(pipeline: impl Into<String>) -> Self {
        SourceMeta {
            extractor: "opensearch".to_string(),
            reason: None,
            pipeline: Some(pipeline.into()),
            match_kind: None,
        }
    }
}

/// One indexed document: a workspace-relative file with extracted text and
/// the bookkeeping needed for incremental reuse decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    /// Workspace-relative, POSIX-separated path. Doubles as the document id.
    pub file_path: String,
    /// File name, used for filename-match scoring.
    pub title: String,
    /// Same as `file_path`; kept as a distinct field because search results
    /// expose both `title` and `subtitle`.
    pub subtitle: String,
    /// Extracted plain text, possibly empty.
    pub content: String,
    pub source_meta: SourceMeta,
    pub mtime_ns: i128,
    pub size_bytes: u64,
    pub content_hash: String,
}

/// Outcome of one call to the refresh orchestrator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub status: RefreshStatus,
    pub mode: RefreshMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub indexed_files: usize,
    pub scanned_files: usize,
    pub reused_files: usize,
    pub updated_files: usize,
    pub removed_files: usize,
    pub failed_files: usize,
    pub diagnostics: Vec<String>,
    pub took_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    Ok,
    Skipped,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// No refresh has run yet for this index. Only ever reported by
    /// `/health`; never a valid `/reindex` request mode.
    None,
    Full,
    Incremental,
}

impl RefreshMode {
    pub fn parse(raw: Option<&str>, default: RefreshMode) -> Result<RefreshMode, String> {
        let value = raw.unwrap_or("").trim().to_lowercase();
        if value.is_empty() {
            return Ok(default);
        }
        match value.as_str() {
            "full" => Ok(RefreshMode::Full),
            "incremental" => Ok(RefreshMode::Incremental),
            _ => Err("mode must be one of: full, incremental".to_string()),
        }
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    pub file_path: String,
    pub title: String,
    pub subtitle: String,
    pub snippet: Option<String>,
    pub score: i64,
    pub source_meta: SourceMeta,
}
