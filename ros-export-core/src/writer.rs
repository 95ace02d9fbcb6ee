use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::tree::ConfigDocument;

/// Errors that can occur while writing a [`ConfigDocument`] to disk.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to write output file.
    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a [`ConfigDocument`] back into export text.
///
/// For a document that was parsed and not modified the output is identical to
/// the input, byte for byte.
pub fn write(doc: &ConfigDocument) -> String {
    let mut lines: Vec<&str> = Vec::new();
    lines.extend(doc.preamble.iter().map(String::as_str));
    for section in &doc.sections {
        if !section.header.is_empty() {
            lines.push(section.header.as_str());
        }
        lines.extend(section.lines.iter().map(|line| line.text.as_str()));
    }

    let mut out = lines.join("\n");
    if doc.trailing_newline {
        out.push('\n');
    }
    out
}

/// Serialize a [`ConfigDocument`] and write it to `path`.
pub fn write_file(doc: &ConfigDocument, path: &Path) -> Result<(), WriteError> {
    fs::write(path, write(doc))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write;
    use crate::parser::parse;

    #[test]
    fn round_trips_crlf_and_continuations() {
        let raw = "# header\r\n/ip address\r\nadd address=10.0.0.1/30 \\\r\n    interface=ether2\r\n";
        assert_eq!(write(&parse(raw)), raw);
    }

    #[test]
    fn round_trips_missing_trailing_newline() {
        let raw = "/system identity\nset name=r1";
        assert_eq!(write(&parse(raw)), raw);
    }

    #[test]
    fn round_trips_lone_newline() {
        assert_eq!(write(&parse("\n")), "\n");
        assert_eq!(write(&parse("")), "");
    }
}
