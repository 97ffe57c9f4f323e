//! PDF text extraction with a two-backend fallback, plus methods-section detection.
//!
//! `pdf-extract` gives better reading order; `lopdf` copes with more
//! malformed files. The second runs when the first errors or yields nothing.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SourceError;

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub text: String,
    /// `pdf-extract` or `lopdf`
    pub backend: &'static str,
    pub page_count: Option<usize>,
}

pub fn extract_text(bytes: &[u8]) -> Result<ExtractedText, SourceError> {
    let page_count = lopdf::Document::load_mem(bytes).ok().map(|d| d.get_pages().len());

    match with_pdf_extract(bytes) {
        Ok(text) if !text.trim().is_empty() => {
            return Ok(ExtractedText {
                text: normalize_whitespace(&text),
                backend: "pdf-extract",
                page_count,
            });
        }
        Ok(_) => debug!("pdf-extract produced no text; trying lopdf"),
        Err(e) => warn!(error = %e, "pdf-extract failed; trying lopdf"),
    }

    match with_lopdf(bytes) {
        Ok((text, pages)) if !text.trim().is_empty() => Ok(ExtractedText {
            text: normalize_whitespace(&text),
            backend: "lopdf",
            page_count: Some(pages),
        }),
        Ok(_) => Err(SourceError::Pdf("no extractable text".to_string())),
        Err(e) => Err(SourceError::Pdf(e)),
    }
}

fn with_pdf_extract(bytes: &[u8]) -> Result<String, String> {
    // pdf-extract panics on some malformed inputs.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("pdf-extract panicked".to_string()),
    }
}

fn with_lopdf(bytes: &[u8]) -> Result<(String, usize), String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let text = doc.extract_text(&pages).map_err(|e| e.to_string())?;
    Ok((text, pages.len()))
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {}: {}", pattern, e)))
}

/// Collapse runs of spaces within lines, trim lines and keep at most one blank line.
pub fn normalize_whitespace(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static BLANKS: OnceLock<Regex> = OnceLock::new();

    let spaces = regex(&SPACES, r"[ \t\u{a0}\u{2009}]+");
    let lines: Vec<String> = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(|l| spaces.replace_all(l, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    regex(&BLANKS, r"\n{3,}")
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Text between a methods heading and the next major section heading.
/// `None` if the text has no methods heading.
pub fn methods_section(text: &str) -> Option<String> {
    static START: OnceLock<Regex> = OnceLock::new();
    static END: OnceLock<Regex> = OnceLock::new();

    let start = regex(
        &START,
        r"(?i)^(?:\d+(?:\.\d+)*\.?|[ivx]+\.)?\s*(?:materials\s+(?:and|&)\s+methods|methods|experimental\s+procedures|methodology)\s*:?$",
    );
    let end = regex(
        &END,
        r"(?i)^(?:\d+(?:\.\d+)*\.?|[ivx]+\.)?\s*(?:results(?:\s+and\s+discussion)?|discussion|conclusions?|references|acknowledge?ments?)\s*:?$",
    );

    let lines: Vec<&str> = text.lines().collect();
    let begin = lines.iter().position(|l| start.is_match(l.trim()))?;
    let finish = lines[begin + 1..]
        .iter()
        .position(|l| end.is_match(l.trim()))
        .map(|offset| begin + 1 + offset)
        .unwrap_or(lines.len());

    let section = lines[begin + 1..finish].join("\n").trim().to_string();
    if section.is_empty() {
        None
    } else {
        Some(section)
    }
}
