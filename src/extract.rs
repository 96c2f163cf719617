//! Extractor chain: turns an on-disk office document into plain text.
//!
//! Strategies are tried in order and the first one to produce non-empty text
//! wins: an optional external OpenSearch ingest-attachment pipeline, then a
//! local OOXML (docx/pptx/xlsx) walker, then a path-only fallback that
//! records *why* no text was extracted. A per-file fault here is always
//! recovered by the caller — this module never panics and never aborts a
//! refresh.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use base64::Engine;
use serde::Deserialize;

use crate::config::Config;
use crate::models::SourceMeta;

/// Files larger than this are never read for extraction at all.
pub const MAX_BINARY_FILE_BYTES: u64 = 16_000_000;
/// XML members larger than this inside an OOXML zip are skipped.
pub const MAX_XML_MEMBER_BYTES: u64 = 3_000_000;
/// Extracted text is truncated to this many characters.
pub const MAX_EXTRACTED_TEXT_CHARS: usize = 160_000;

const OOXML_EXTENSIONS: &[&str] = &["docx", "pptx", "xlsx"];
const LEGACY_BINARY_EXTENSIONS: &[&str] = &["doc", "ppt", "xls"];

/// Text extracted for one file, plus where it came from.
pub struct Extraction {
    pub content: String,
    pub source_meta: SourceMeta,
}

/// Runs the extractor chain for `path`, dispatching on its extension and the
/// adapter's configured external extractor.
pub async fn extract_text_for_file(
    client: &reqwest::Client,
    config: &Config,
    path: &Path,
    size_bytes: u64,
) -> std::io::Result<Extraction> {
    if size_bytes > MAX_BINARY_FILE_BYTES {
        return Ok(Extraction {
            content: String::new(),
            source_meta: SourceMeta::with_reason("path-only", "file-too-large"),
        });
    }

    let (opensearch_text, opensearch_meta) = extract_with_opensearch(client, config, path).await;
    if !opensearch_text.is_empty() {
        return Ok(Extraction {
            content: opensearch_text,
            source_meta: opensearch_meta,
        });
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if OOXML_EXTENSIONS.contains(&extension.as_str()) {
        let bytes = std::fs::read(path)?;
        if let Some(local_text) = extract_ooxml_text(&bytes, &extension) {
            if !local_text.is_empty() {
                return Ok(Extraction {
                    content: local_text,
                    source_meta: SourceMeta::simple("local-ooxml"),
                });
            }
        }
    }

    if LEGACY_BINARY_EXTENSIONS.contains(&extension.as_str()) {
        return Ok(Extraction {
            content: String::new(),
            source_meta: SourceMeta::with_reason("path-only", "legacy-binary"),
        });
    }

    if extension == "pdf" {
        return Ok(Extraction {
            content: String::new(),
            source_meta: SourceMeta::with_reason("path-only", "pdf-disabled-by-default"),
        });
    }

    Ok(Extraction {
        content: String::new(),
        source_meta: opensearch_meta,
    })
}

/// Extracts text from every `.xml` member under the format's own namespace
/// prefix (`word/` for docx, `ppt/` for pptx, `xl/` for xlsx), keeping an
/// element's stripped text whenever its local name is one of a small
/// well-known set or the text itself is longer than two characters. One
/// pass over every member, rather than a dedicated per-tag walker per
/// format.
fn extract_ooxml_text(bytes: &[u8], extension: &str) -> Option<String> {
    let prefix = match extension {
        "docx" => "word/",
        "pptx" => "ppt/",
        "xlsx" => "xl/",
        _ => return None,
    };

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).ok()?;
    let mut parts: Vec<String> = Vec::new();
    let mut char_budget = 0usize;

    let member_names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    for member in member_names {
        let lower = member.to_lowercase();
        if !lower.ends_with(".xml") || !lower.starts_with(prefix) {
            continue;
        }

        let size = match archive.by_name(&member) {
            Ok(entry) => entry.size(),
            Err(_) => continue,
        };
        if size > MAX_XML_MEMBER_BYTES {
            continue;
        }

        let mut xml_bytes = Vec::new();
        if let Ok(mut entry) = archive.by_name(&member) {
            if entry.read_to_end(&mut xml_bytes).is_err() {
                continue;
            }
        } else {
            continue;
        }

        let text = extract_text_from_xml(&xml_bytes);
        if !text.is_empty() {
            char_budget += text.chars().count();
            parts.push(text);
        }

        if char_budget > MAX_EXTRACTED_TEXT_CHARS {
            break;
        }
    }

    let extracted = parts.join(" ");
    if extracted.chars().count() > MAX_EXTRACTED_TEXT_CHARS {
        Some(extracted.chars().take(MAX_EXTRACTED_TEXT_CHARS).collect())
    } else {
        Some(extracted)
    }
}

/// Walks one XML document and collects every element's stripped text whose
/// local name is in `{t, v, p, a:t, is, si}`, or whose text is longer than
/// two characters regardless of tag. Malformed XML yields an empty string
/// rather than an error — a single bad member should not fail the whole
/// extraction.
fn extract_text_from_xml(xml_bytes: &[u8]) -> String {
    let mut reader = quick_xml::Reader::from_reader(xml_bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut chunks: Vec<String> = Vec::new();
    let mut current_local_name: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                current_local_name = Some(local_name_lower(&e));
            }
            Ok(quick_xml::events::Event::Text(te)) => {
                if let Some(name) = current_local_name.take() {
                    let text = te.unescape().unwrap_or_default();
                    let trimmed = text.trim();
                    if !trimmed.is_empty()
                        && (matches!(name.as_str(), "t" | "v" | "p" | "a:t" | "is" | "si")
                            || trimmed.chars().count() > 2)
                    {
                        chunks.push(trimmed.to_string());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(_)) => {
                current_local_name = None;
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(_) => return String::new(),
            _ => {}
        }
        buf.clear();
    }

    chunks.join(" ")
}

fn local_name_lower(e: &quick_xml::events::BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase()
}

#[derive(Deserialize)]
struct SimulateResponse {
    docs: Vec<SimulateDoc>,
}

#[derive(Deserialize)]
struct SimulateDoc {
    doc: Option<SimulateInnerDoc>,
}

#[derive(Deserialize)]
struct SimulateInnerDoc {
    #[serde(rename = "_source")]
    source: Option<SimulateSource>,
}

#[derive(Deserialize)]
struct SimulateSource {
    attachment: Option<SimulateAttachment>,
}

#[derive(Deserialize)]
struct SimulateAttachment {
    content: Option<String>,
}

/// Calls an OpenSearch-compatible ingest-attachment pipeline's `_simulate`
/// endpoint with the file's base64-encoded bytes. Returns `("", meta)` for
/// every failure mode (disabled, oversized, network error, malformed
/// response) rather than propagating an error — the caller always falls
/// through to the next strategy.
async fn extract_with_opensearch(
    client: &reqwest::Client,
    config: &Config,
    path: &Path,
) -> (String, SourceMeta) {
    let Some(base_url) = config.opensearch_base_url.as_deref() else {
        return (String::new(), SourceMeta::simple("opensearch-disabled"));
    };

    let raw_bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return (String::new(), SourceMeta::with_reason("opensearch-error", "read-failed")),
    };

    if raw_bytes.len() as u64 > MAX_BINARY_FILE_BYTES {
        return (String::new(), SourceMeta::with_reason("opensearch-skipped", "file-too-large"));
    }

    let endpoint = format!(
        "{base_url}/_ingest/pipeline/{}/_simulate",
        config.opensearch_pipeline
    );

    let resource_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let payload = serde_json::json!({
        "docs": [{
            "_source": {
                "data": base64::engine::general_purpose::STANDARD.encode(&raw_bytes),
                "resource_name": resource_name,
            }
        }]
    });

    let mut request = client
        .post(&endpoint)
        .timeout(Duration::from_secs(config.extract_timeout_seconds))
        .json(&payload);

    if let (Some(username), Some(password)) = (&config.opensearch_username, &config.opensearch_password) {
        request = request.basic_auth(username, Some(password));
    }

    let response = match request.send().await {
        Ok(resp) => resp,
        Err(_) => return (String::new(), SourceMeta::with_reason("opensearch-error", "request-failed")),
    };

    let body: SimulateResponse = match response.json().await {
        Ok(decoded) => decoded,
        Err(_) => return (String::new(), SourceMeta::with_reason("opensearch-error", "invalid-json")),
    };

    let Some(first) = body.docs.into_iter().next() else {
        return (String::new(), SourceMeta::with_reason("opensearch-error", "missing-docs"));
    };
    let Some(content) = first
        .doc
        .and_then(|d| d.source)
        .and_then(|s| s.attachment)
        .and_then(|a| a.content)
    else {
        return (String::new(), SourceMeta::with_reason("opensearch-error", "missing-attachment"));
    };

    let truncated: String = if content.chars().count() > MAX_EXTRACTED_TEXT_CHARS {
        content.chars().take(MAX_EXTRACTED_TEXT_CHARS).collect()
    } else {
        content
    };

    if truncated.is_empty() {
        (String::new(), SourceMeta::simple("opensearch-empty"))
    } else {
        (truncated, SourceMeta::opensearch(config.opensearch_pipeline.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_docx(text: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            write!(
                writer,
                r#"<?xml version="1.0"?><w:document xmlns:w="ns"><w:body><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:body></w:document>"#
            )
            .unwrap();
            writer.finish().unwrap();
        }
        buf
    }

    fn build_xlsx(shared: &[&str], cell_refs_to_shared_index: &[(usize, usize)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();

            writer.start_file("xl/sharedStrings.xml", options).unwrap();
            let mut sst = String::from(r#"<?xml version="1.0"?><sst>"#);
            for s in shared {
                sst.push_str(&format!("<si><t>{s}</t></si>"));
            }
            sst.push_str("</sst>");
            writer.write_all(sst.as_bytes()).unwrap();

            writer.start_file("xl/worksheets/sheet1.xml", options).unwrap();
            let mut sheet = String::from(r#"<?xml version="1.0"?><worksheet><sheetData><row>"#);
            for (cell_idx, shared_idx) in cell_refs_to_shared_index {
                sheet.push_str(&format!(
                    r#"<c r="A{cell_idx}" t="s"><v>{shared_idx}</v></c>"#
                ));
            }
            sheet.push_str("</row></sheetData></worksheet>");
            writer.write_all(sheet.as_bytes()).unwrap();

            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn extracts_docx_paragraph_text() {
        let bytes = build_docx("quarterly report");
        let text = extract_ooxml_text(&bytes, "docx").unwrap();
        assert!(text.contains("quarterly report"));
    }

    #[test]
    fn extracts_xlsx_shared_string_cells() {
        let bytes = build_xlsx(&["alpha", "beta"], &[(1, 0), (2, 1)]);
        let text = extract_ooxml_text(&bytes, "xlsx").unwrap();
        assert!(text.contains("alpha"));
        assert!(text.contains("beta"));
    }

    #[test]
    fn invalid_zip_yields_none() {
        assert!(extract_ooxml_text(b"not a zip", "docx").is_none());
    }

    #[test]
    fn text_selection_rule_keeps_known_tags_and_long_text() {
        let xml = br#"<root><t>hi</t><other>ab</other><other>abcd</other></root>"#;
        let text = extract_text_from_xml(xml);
        assert!(text.contains("hi"));
        assert!(!text.contains("ab</other>"));
        assert!(text.contains("abcd"));
        assert!(!text.split_whitespace().any(|w| w == "ab"));
    }
}
