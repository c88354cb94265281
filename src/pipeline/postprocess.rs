//! Post-processing: deterministic cleanup of model output.
//!
//! Two consumers:
//!
//! - [`clean_transcription`] normalises a vision-model page transcription
//!   before it is parsed into recognised lines. Models sometimes wrap the
//!   text in code fences or emit CRLF and zero-width characters even when the
//!   prompt forbids it.
//! - [`validate_json_object`] backs the `validate` response mode: it strips an
//!   outer ```` ```json ```` fence and requires the rest to parse as a JSON
//!   object.
//!
//! Each rule is a pure `&str → String` function so it can be tested alone.

use crate::error::StructuringError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply the transcription cleanup rules, in order:
///
/// 1. Strip outer code fences (any language tag)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
pub fn clean_transcription(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    trim_trailing_whitespace(&s)
}

/// Strip an outer fence and check the remainder is a JSON object.
///
/// Returns the unfenced text (not re-serialised) so key order and number
/// formatting from the model are preserved.
pub fn validate_json_object(input: &str) -> Result<String, StructuringError> {
    let text = strip_outer_fences(input).trim().to_string();
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| StructuringError::InvalidJson {
            detail: e.to_string(),
        })?;
    if !value.is_object() {
        return Err(StructuringError::InvalidJson {
            detail: format!("expected a JSON object, got {}", json_kind(&value)),
        });
    }
    Ok(text)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ── Rule 1: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip invisible characters ───────────────────────────────────────

const INVISIBLE: [char; 6] = [
    '\u{200B}', // zero-width space
    '\u{200C}', // zero-width non-joiner
    '\u{200D}', // zero-width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // BOM
    '\u{00AD}', // soft hyphen
];

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}
