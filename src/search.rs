//! In-memory ranked-match search evaluator.
//!
//! Evaluates a query against a snapshot of [`IndexedDocument`]s taken from
//! the index store. There is no inverted index: every document is scored
//! directly against the query on each call, which is affordable at the
//! workspace sizes this adapter targets (a few thousand files, capped by the
//! scanner's budget).

use crate::models::{IndexedDocument, SearchResultItem};
use crate::query::{extract_snippet, normalize_whitespace, score_text_match};
use std::path::Path;

/// One document's computed rank, before it's turned into a [`SearchResultItem`].
struct RankedMatch {
    score: i64,
    match_kind: &'static str,
    snippet: Option<String>,
}

/// Scores a single document against a (lowercased) query, returning `None`
/// when it's not a match at all.
///
/// The ladder, highest to lowest: an exact filename-stem match; an exact
/// phrase (or whole-document) match in the content; a partial content match;
/// a partial filename/title/path match. Each band's score is offset so that
/// bands never overlap, which keeps the ordering stable regardless of the
/// underlying `score_text_match` magnitude.
fn compute_ranked_match(file_path: &str, title: &str, content: &str, needle_lower: &str) -> Option<RankedMatch> {
    let normalized_content = normalize_whitespace(content).to_lowercase();
    let normalized_needle = normalize_whitespace(needle_lower).to_lowercase();
    let stem_lower = Path::new(if title.is_empty() { file_path } else { title })
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let path_score = score_text_match(file_path, &normalized_needle)
        .max(score_text_match(title, &normalized_needle))
        .max(score_text_match(&stem_lower, &normalized_needle));

    let filename_exact = stem_lower == normalized_needle;
    let mut content_exact_phrase = false;
    let mut content_partial = false;

    if !normalized_content.is_empty() {
        if normalized_content == normalized_needle {
            content_exact_phrase = true;
        } else if format!(" {normalized_content} ").contains(&format!(" {normalized_needle} ")) {
            content_exact_phrase = true;
        } else if score_text_match(&normalized_content, &normalized_needle) > 0 {
            content_partial = true;
        }
    }

    if filename_exact {
        let snippet = if content_exact_phrase || content_partial {
            extract_snippet(content, &normalized_needle)
        } else {
            None
        };
        return Some(RankedMatch {
            score: 3_000 + path_score.max(1),
            match_kind: "filename-exact",
            snippet,
        });
    }

    if content_exact_phrase {
        let base = score_text_match(&normalized_content, &normalized_needle);
        return Some(RankedMatch {
            score: 2_000 + base.max(1),
            match_kind: "content-exact-phrase",
            snippet: extract_snippet(content, &normalized_needle),
        });
    }

    if content_partial {
        let base = score_text_match(&normalized_content, &normalized_needle);
        return Some(RankedMatch {
            score: 1_000 + base.max(1),
            match_kind: "content-partial",
            snippet: extract_snippet(content, &normalized_needle),
        });
    }

    if path_score > 0 {
        return Some(RankedMatch {
            score: 800 + path_score,
            match_kind: "filename-partial",
            snippet: None,
        });
    }

    None
}

/// Evaluates `query` against every document in `docs`, returning the
/// top-`limit` matches sorted by `(score desc, filePath desc)`.
pub fn search_documents(docs: &[IndexedDocument], query: &str, limit: i64) -> Vec<SearchResultItem> {
    let needle_lower = query.to_lowercase();

    let mut results: Vec<SearchResultItem> = docs
        .iter()
        .filter_map(|doc| {
            let ranked = compute_ranked_match(&doc.file_path, &doc.title, &doc.content, &needle_lower)?;
            let mut source_meta = doc.source_meta.clone();
            source_meta.match_kind = Some(ranked.match_kind.to_string());
            Some(SearchResultItem {
                id: doc.file_path.clone(),
                file_path: doc.file_path.clone(),
                title: doc.title.clone(),
                subtitle: if doc.subtitle.is_empty() {
                    doc.file_path.clone()
                } else {
                    doc.subtitle.clone()
                },
                snippet: ranked.snippet,
                score: ranked.score,
                source_meta,
            })
        })
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| b.file_path.cmp(&a.file_path)));
    let limit = limit.max(0) as usize;
    results.truncate(limit);
    results
}
