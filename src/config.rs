//! Environment-driven configuration.
//!
//! No config file: every setting is an environment variable, read once at
//! startup into a typed, validated [`Config`]. A malformed value falls back
//! to its default rather than aborting startup.

use std::path::PathBuf;

pub const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 25;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 8;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8092";

/// Resolved, validated configuration for one running adapter instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute root of the workspace file tree to scan and index.
    pub workspace_root: PathBuf,
    /// Minimum spacing between implicit (search-triggered) incremental
    /// refreshes. A value of `0` disables debouncing entirely.
    pub refresh_interval_seconds: u64,
    /// Interval for the background refresh loop; `0` disables it.
    pub background_sync_seconds: u64,
    /// Timeout for the external (OpenSearch) extractor HTTP call.
    pub extract_timeout_seconds: u64,
    /// Whether `.pdf` files are treated as office candidates during scanning.
    pub include_pdf_files: bool,
    /// Base URL of an OpenSearch-compatible ingest-attachment endpoint, or
    /// `None` to disable the external extractor entirely.
    pub opensearch_base_url: Option<String>,
    pub opensearch_pipeline: String,
    pub opensearch_username: Option<String>,
    pub opensearch_password: Option<String>,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
}

impl Config {
    /// Builds configuration from the process environment, applying the same
    /// defaults and fallback rules documented on each field.
    pub fn from_env() -> Self {
        Config {
            workspace_root: resolve_workspace_root(),
            refresh_interval_seconds: env_u64(
                "OFFICEINDEX_REFRESH_INTERVAL_SECONDS",
                DEFAULT_REFRESH_INTERVAL_SECONDS,
            ),
            background_sync_seconds: env_u64("OFFICEINDEX_BACKGROUND_SYNC_SECONDS", 0),
            extract_timeout_seconds: env_u64(
                "OFFICEINDEX_EXTRACT_TIMEOUT_SECONDS",
                DEFAULT_HTTP_TIMEOUT_SECONDS,
            )
            .max(1),
            include_pdf_files: env_bool("OFFICEINDEX_INCLUDE_PDF"),
            opensearch_base_url: env_trimmed("OFFICEINDEX_OPENSEARCH_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            opensearch_pipeline: env_trimmed("OFFICEINDEX_OPENSEARCH_PIPELINE")
                .unwrap_or_else(|| "attachment".to_string()),
            opensearch_username: env_trimmed("OFFICEINDEX_OPENSEARCH_USERNAME"),
            opensearch_password: std::env::var("OFFICEINDEX_OPENSEARCH_PASSWORD").ok(),
            bind_addr: env_trimmed("OFFICEINDEX_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}

fn env_trimmed(name: &str) -> Option<String> {
    let raw = std::env::var(name).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match env_trimmed(name) {
        None => default,
        Some(raw) => raw.parse::<i64>().map(|v| v.max(0) as u64).unwrap_or(default),
    }
}

fn env_bool(name: &str) -> bool {
    match env_trimmed(name) {
        None => false,
        Some(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
    }
}

/// Resolves `WORKSPACE_FILES_ROOT`, falling back to `./company_files` under
/// the current working directory when unset or blank.
fn resolve_workspace_root() -> PathBuf {
    let configured = env_trimmed("WORKSPACE_FILES_ROOT");
    let root = match configured {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from("company_files"),
    };

    if root.is_absolute() {
        root
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&root))
            .unwrap_or(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_u64_falls_back_on_garbage() {
        std::env::set_var("OFFICEINDEX_TEST_U64", "not-a-number");
        assert_eq!(env_u64("OFFICEINDEX_TEST_U64", 7), 7);
        std::env::remove_var("OFFICEINDEX_TEST_U64");
    }

    #[test]
    fn env_u64_clamps_negative_to_zero() {
        std::env::set_var("OFFICEINDEX_TEST_U64_NEG", "-5");
        assert_eq!(env_u64("OFFICEINDEX_TEST_U64_NEG", 7), 0);
        std::env::remove_var("OFFICEINDEX_TEST_U64_NEG");
    }

    #[test]
    fn env_bool_accepts_common_truthy_spellings() {
        for value in ["1", "true", "YES", "On"] {
            std::env::set_var("OFFICEINDEX_TEST_BOOL", value);
            assert!(env_bool("OFFICEINDEX_TEST_BOOL"), "{value} should be truthy");
        }
        std::env::remove_var("OFFICEINDEX_TEST_BOOL");
    }
}
