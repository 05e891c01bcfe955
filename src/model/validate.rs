//! Structural content validation
//!
//! Cheap line-by-line checks that run before content is handed to a rendered
//! surface: script-like constructs are rejected outright, suspicious markdown
//! links are flagged as warnings. This is not a markdown parser; rendering is
//! a host concern.

use serde::Serialize;

/// A single validation finding. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Result of validating one document's content
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

/// Patterns treated as embedded script constructs. Matched case-insensitively.
const SCRIPT_PATTERNS: &[&str] = &["<script", "javascript:", "vbscript:"];

/// Validate document content.
///
/// Errors: embedded script-like constructs (`<script`, `javascript:` URLs).
/// Warnings: markdown links with an empty target (`[text]()`).
pub fn validate(content: &str) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let lowered = line.to_lowercase();

        for pattern in SCRIPT_PATTERNS {
            for column in find_all(&lowered, pattern) {
                errors.push(Diagnostic {
                    line: line_idx + 1,
                    column: column + 1,
                    message: format!("embedded script construct '{}' is not allowed", pattern),
                });
            }
        }

        for column in find_empty_links(line) {
            warnings.push(Diagnostic {
                line: line_idx + 1,
                column: column + 1,
                message: "link has an empty target".to_string(),
            });
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Char-indexed start positions of every occurrence of `needle` in `haystack`
fn find_all(haystack: &str, needle: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut search_from = 0;
    while let Some(rel) = haystack[search_from..].find(needle) {
        let byte_pos = search_from + rel;
        positions.push(haystack[..byte_pos].chars().count());
        search_from = byte_pos + needle.len();
    }
    positions
}

/// Char-indexed start positions of `[text]()` links with nothing between the
/// parentheses (whitespace-only targets count as empty)
fn find_empty_links(line: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            if let Some(close) = line[i..].find("](").map(|p| i + p) {
                let target_start = close + 2;
                if let Some(end) = line[target_start..].find(')').map(|p| target_start + p) {
                    if line[target_start..end].trim().is_empty() {
                        positions.push(line[..i].chars().count());
                    }
                    i = end + 1;
                    continue;
                }
            }
        }
        i += 1;
    }
    positions
}
