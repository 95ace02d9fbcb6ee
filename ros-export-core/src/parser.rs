use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::tree::{Classification, ConfigDocument, ConfigLine, ConfigSection};

/// Errors that can occur while reading an export from bytes or disk.
///
/// Parsing text itself never fails; only decoding and I/O can.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input bytes were not valid UTF-8.
    #[error("invalid UTF-8 in export: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Failed to read input file.
    #[error("failed to read export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse export text into a [`ConfigDocument`].
///
/// Sections start at any line beginning with `/`. Lines before the first
/// section form the preamble. Input with no section header but with real
/// content is kept as a single neutral section with an empty header, so callers
/// always get a document back.
pub fn parse(raw: &str) -> ConfigDocument {
    let trailing_newline = raw.ends_with('\n');
    if raw.is_empty() {
        return ConfigDocument::default();
    }
    let body = if trailing_newline {
        &raw[..raw.len() - 1]
    } else {
        raw
    };

    let logical = group_continuations(body);
    let has_header = logical.iter().any(|line| is_header(line));
    let has_content = logical
        .iter()
        .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'));

    if !has_header && has_content {
        let mut section = ConfigSection::new("");
        section.lines = logical.into_iter().map(ConfigLine::new).collect();
        section.classification = Classification::Neutral;
        return ConfigDocument {
            preamble: Vec::new(),
            sections: vec![section],
            trailing_newline,
        };
    }

    let mut preamble = Vec::new();
    let mut sections: Vec<ConfigSection> = Vec::new();
    for line in logical {
        if is_header(&line) {
            sections.push(ConfigSection::new(line));
            continue;
        }
        match sections.last_mut() {
            Some(current) => current.lines.push(ConfigLine::new(line)),
            None => preamble.push(line),
        }
    }

    ConfigDocument {
        preamble,
        sections,
        trailing_newline,
    }
}

/// Parse export bytes, rejecting invalid UTF-8.
pub fn parse_bytes(bytes: &[u8]) -> Result<ConfigDocument, ParseError> {
    Ok(parse(std::str::from_utf8(bytes)?))
}

/// Parse an export file into a [`ConfigDocument`].
pub fn parse_file(path: &Path) -> Result<ConfigDocument, ParseError> {
    let bytes = fs::read(path)?;
    parse_bytes(&bytes)
}

fn is_header(line: &str) -> bool {
    line.trim_start().starts_with('/')
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Join physical lines that end in `\` with the lines that follow them.
fn group_continuations(body: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;

    for physical in body.split('\n') {
        let current = match pending.take() {
            Some(mut open) => {
                open.push('\n');
                open.push_str(physical);
                open
            }
            None => physical.to_string(),
        };
        if continues(physical) && !is_comment(&current) {
            pending = Some(current);
        } else {
            out.push(current);
        }
    }
    if let Some(open) = pending {
        out.push(open);
    }
    out
}

fn continues(physical: &str) -> bool {
    physical
        .strip_suffix('\r')
        .unwrap_or(physical)
        .ends_with('\\')
}
