//! Locating the JSON payload inside an assistant reply.

use serde::{Deserialize, Serialize};

/// How the steps array is located in the reply text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// A single fenced code block whose body is a JSON array. Without one,
    /// a reply that is nothing but the array, or prose around exactly one
    /// well-formed array, is accepted
    #[default]
    Fenced,
    /// Everything from the first `[` to the last `]`
    Brackets,
}

impl ExtractionMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "fenced" => Some(ExtractionMode::Fenced),
            "brackets" => Some(ExtractionMode::Brackets),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON array found in response")]
    NotFound,
    #[error("response contains {0} candidate JSON blocks, expected exactly one")]
    Ambiguous(usize),
}

/// Return the slice of `text` holding the steps array
pub fn extract_payload(text: &str, mode: ExtractionMode) -> Result<&str, ExtractError> {
    match mode {
        ExtractionMode::Fenced => extract_fenced(text),
        ExtractionMode::Brackets => extract_brackets(text),
    }
}

fn extract_brackets(text: &str) -> Result<&str, ExtractError> {
    let start = text.find('[').ok_or(ExtractError::NotFound)?;
    let end = text.rfind(']').ok_or(ExtractError::NotFound)?;
    if end < start {
        return Err(ExtractError::NotFound);
    }
    Ok(&text[start..=end])
}

fn extract_fenced(text: &str) -> Result<&str, ExtractError> {
    let candidates: Vec<&str> = fenced_blocks(text)
        .into_iter()
        .map(str::trim)
        .filter(|body| body.starts_with('['))
        .collect();

    match candidates.as_slice() {
        [single] => Ok(*single),
        [] => {
            let trimmed = text.trim();
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                return Ok(trimmed);
            }
            extract_embedded(text)
        }
        many => Err(ExtractError::Ambiguous(many.len())),
    }
}

/// The one top-level `[...]` span in unfenced prose that is well-formed JSON
fn extract_embedded(text: &str) -> Result<&str, ExtractError> {
    let arrays: Vec<&str> = bracket_spans(text)
        .into_iter()
        .filter(|span| serde_json::from_str::<serde::de::IgnoredAny>(span).is_ok())
        .collect();

    match arrays.as_slice() {
        [single] => Ok(*single),
        [] => Err(ExtractError::NotFound),
        many => Err(ExtractError::Ambiguous(many.len())),
    }
}

/// Balanced top-level `[...]` spans. Brackets inside JSON strings don't count,
/// and quotes are only tracked once a span is open so prose can't unbalance it.
fn bracket_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '[' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    spans
}

/// Bodies of every closed fenced block. A fence is a line starting with ```
/// after at most three spaces; backticks inside a line are prose. The info
/// string after the opening fence is skipped and an unclosed trailing fence
/// is ignored.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut open_body: Option<usize> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if !is_fence(line) {
            continue;
        }
        match open_body.take() {
            Some(body_start) => blocks.push(&text[body_start..line_start]),
            None if line.ends_with('\n') => open_body = Some(offset),
            None => break,
        }
    }

    blocks
}

fn is_fence(line: &str) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    indent <= 3 && line[indent..].starts_with("```")
}
