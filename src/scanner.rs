//! BFS workspace scanner: walks the file tree under a workspace root looking
//! for office-document candidates, under hard directory/file budgets.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Hard cap on how many directories a single scan will visit.
pub const MAX_SCAN_DIRECTORIES: usize = 400;
/// Hard cap on how many candidate files a single scan will collect.
pub const MAX_INDEXED_FILES: usize = 2_000;

const OFFICE_EXTENSIONS: &[&str] = &["doc", "docx", "ppt", "pptx", "xls", "xlsx"];

const EXCLUDED_DIRECTORY_NAMES: &[&str] = &[
    ".git",
    ".next",
    "node_modules",
    "dist",
    "build",
    "coverage",
    ".turbo",
    ".cache",
];

/// Result of one workspace scan.
pub struct ScanResult {
    /// Absolute paths of office-document candidates, in deterministic
    /// (case-folded, breadth-first) order.
    pub candidates: Vec<PathBuf>,
    /// Non-fatal diagnostics collected along the way (e.g. unreadable
    /// directories), capped independently by the caller.
    pub diagnostics: Vec<String>,
}

fn is_included_directory(name: &str) -> bool {
    let normalized = name.to_lowercase();
    if normalized.starts_with('.') {
        return false;
    }
    !EXCLUDED_DIRECTORY_NAMES.contains(&normalized.as_str())
}

fn is_office_candidate(path: &Path, include_pdf: bool) -> bool {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let extension = extension.to_lowercase();
    if OFFICE_EXTENSIONS.contains(&extension.as_str()) {
        return true;
    }
    extension == "pdf" && include_pdf
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| ".".to_string())
}

/// Breadth-first scan of `root`, collecting office-document candidates in
/// case-folded-name order within each directory, subject to
/// [`MAX_SCAN_DIRECTORIES`] and [`MAX_INDEXED_FILES`].
pub fn scan_workspace(root: &Path, include_pdf: bool) -> ScanResult {
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root.to_path_buf());
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut candidates = Vec::new();
    let mut diagnostics = Vec::new();

    while let Some(directory) = queue.pop_front() {
        if visited.len() >= MAX_SCAN_DIRECTORIES || candidates.len() >= MAX_INDEXED_FILES {
            break;
        }
        if visited.contains(&directory) {
            continue;
        }
        visited.insert(directory.clone());

        let read_dir = match std::fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(err) => {
                let relative = relative_display(root, &directory);
                tracing::warn!(directory = %relative, error = %err, "skipping unreadable directory during office indexing");
                diagnostics.push(format!("directory-unreadable:{relative}"));
                continue;
            }
        };

        let mut entries: Vec<std::fs::DirEntry> = read_dir.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|entry| entry.file_name().to_string_lossy().to_lowercase());

        for entry in entries {
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(_) => continue,
            };

            if file_type.is_dir() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if is_included_directory(&name) {
                    queue.push_back(path);
                }
                continue;
            }

            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || name.starts_with("~$") {
                continue;
            }
            if !is_office_candidate(&path, include_pdf) {
                continue;
            }

            candidates.push(path);
            if candidates.len() >= MAX_INDEXED_FILES {
                break;
            }
        }
    }

    ScanResult {
        candidates,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_collects_office_candidates_and_skips_excluded_dirs() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path();

        fs::write(root.join("report.docx"), b"doc").unwrap();
        fs::write(root.join("notes.txt"), b"not office").unwrap();
        fs::write(root.join(".hidden.docx"), b"doc").unwrap();
        fs::write(root.join("~$lock.docx"), b"doc").unwrap();

        fs::create_dir(root.join("node_modules")).unwrap();
        fs::write(root.join("node_modules/ignored.xlsx"), b"doc").unwrap();

        fs::create_dir(root.join("subdir")).unwrap();
        fs::write(root.join("subdir/deck.pptx"), b"doc").unwrap();

        let result = scan_workspace(root, false);
        let names: Vec<String> = result
            .candidates
            .iter()
            .map(|p| relative_display(root, p))
            .collect();

        assert!(names.contains(&"report.docx".to_string()));
        assert!(names.contains(&"subdir/deck.pptx".to_string()));
        assert!(!names.iter().any(|n| n.contains("node_modules")));
        assert!(!names.iter().any(|n| n.starts_with('.')));
        assert!(!names.iter().any(|n| n.starts_with("~$")));
        assert_eq!(result.candidates.len(), 2);
    }

    #[test]
    fn scan_excludes_pdf_unless_enabled() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path();
        fs::write(root.join("doc.pdf"), b"pdf").unwrap();

        assert_eq!(scan_workspace(root, false).candidates.len(), 0);
        assert_eq!(scan_workspace(root, true).candidates.len(), 1);
    }

    #[test]
    fn scan_caps_candidates_at_max_indexed_files() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path();
        for i in 0..(MAX_INDEXED_FILES + 50) {
            fs::write(root.join(format!("doc-{i:05}.docx")), b"doc").unwrap();
        }

        let result = scan_workspace(root, false);
        assert_eq!(result.candidates.len(), MAX_INDEXED_FILES);
    }

    #[test]
    #[cfg(unix)]
    fn scan_reports_unreadable_directory_as_diagnostic() {
        use std::os::unix::fs::PermissionsExt;

        let workspace = TempDir::new().unwrap();
        let root = workspace.path();
        let locked = root.join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("secret.docx"), b"doc").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = scan_workspace(root, false);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.diagnostics.iter().any(|d| d.starts_with("directory-unreadable:locked")));
    }
}
