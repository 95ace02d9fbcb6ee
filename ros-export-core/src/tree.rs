use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Ownership tag attached to sections and lines by a classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Centrally owned content that may be stripped and replaced.
    Managed,
    /// Customer content that must survive unchanged.
    SiteSpecific,
    /// Blank lines, comments and anything no rule has looked at yet.
    #[default]
    Neutral,
}

impl Display for Classification {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Managed => "managed",
            Classification::SiteSpecific => "site_specific",
            Classification::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

/// One logical entry inside a section.
///
/// Physical continuation lines (a trailing `\`) stay inside `text` exactly as
/// they appeared, joined by `\n`, so writing the line back is loss-free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigLine {
    pub text: String,
    pub classification: Classification,
}

impl ConfigLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            classification: Classification::Neutral,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_comment(&self) -> bool {
        self.text.trim_start().starts_with('#')
    }

    /// True for lines that carry a command rather than layout.
    pub fn is_entry(&self) -> bool {
        !self.is_blank() && !self.is_comment()
    }

    /// The entry with continuations folded into a single line.
    pub fn logical(&self) -> String {
        fold_continuations(&self.text)
    }

    /// First word of the entry (`add`, `set`, `remove`, ...).
    pub fn command(&self) -> Option<&str> {
        if !self.is_entry() {
            return None;
        }
        self.text.split_whitespace().next()
    }
}

/// A `/menu path` header and the entries below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSection {
    /// Raw header line. Empty only for the fallback section that holds
    /// unparseable input.
    pub header: String,
    pub lines: Vec<ConfigLine>,
    pub classification: Classification,
}

impl ConfigSection {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            lines: Vec::new(),
            classification: Classification::Neutral,
        }
    }

    /// Normalized menu path of the header, e.g. `/ip firewall filter`.
    ///
    /// Inline commands written on the header line (`/system identity set
    /// name=r1`) are not part of the path.
    pub fn path(&self) -> String {
        menu_path(&self.header)
    }

    /// Command written on the header line itself, e.g. `set name=r1` for
    /// `/system identity set name=r1`.
    pub fn inline_command(&self) -> Option<String> {
        split_header(&self.header).1
    }

    /// Reduce the header to its bare menu path, dropping any inline command.
    pub fn strip_inline_command(&mut self) {
        if self.inline_command().is_some() {
            self.header = self.path();
        }
    }

    /// Lines that carry commands, skipping blanks and comments.
    pub fn entries(&self) -> impl Iterator<Item = &ConfigLine> {
        self.lines.iter().filter(|line| line.is_entry())
    }

    pub fn has_entries(&self) -> bool {
        self.entries().next().is_some()
    }
}

/// A parsed export: leading comment block plus ordered sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigDocument {
    /// Lines before the first section, kept verbatim.
    pub preamble: Vec<String>,
    pub sections: Vec<ConfigSection>,
    /// Whether the source text ended with a newline.
    pub trailing_newline: bool,
}

impl ConfigDocument {
    /// Return the first section with the given menu path.
    pub fn section(&self, path: &str) -> Option<&ConfigSection> {
        self.sections.iter().find(|s| s.path() == path)
    }

    /// Return every section with the given menu path, in document order.
    pub fn sections_at(&self, path: &str) -> Vec<&ConfigSection> {
        self.sections.iter().filter(|s| s.path() == path).collect()
    }

    /// Look up a `# key = value` metadata comment in the preamble.
    pub fn preamble_value(&self, key: &str) -> Option<&str> {
        self.preamble.iter().find_map(|line| {
            let body = line.trim().strip_prefix('#')?.trim();
            let (k, v) = body.split_once('=')?;
            if k.trim().eq_ignore_ascii_case(key) {
                Some(v.trim())
            } else {
                None
            }
        })
    }

    /// Iterate all lines of all sections.
    pub fn lines(&self) -> impl Iterator<Item = (&ConfigSection, &ConfigLine)> {
        self.sections
            .iter()
            .flat_map(|section| section.lines.iter().map(move |line| (section, line)))
    }
}

impl Display for ConfigDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::writer::write(self))
    }
}

const COMMAND_WORDS: &[&str] = &[
    "add", "set", "remove", "print", "export", "enable", "disable", "edit", "find", "get",
    "unset", "move", "comment", "reset",
];

fn menu_path(header: &str) -> String {
    split_header(header).0
}

/// Split a header into its menu path and any command written after it.
fn split_header(header: &str) -> (String, Option<String>) {
    let logical = fold_continuations(header);
    let mut parts = Vec::new();
    let mut rest = logical.as_str();
    loop {
        let trimmed = rest.trim_start();
        let Some(word) = trimmed.split_whitespace().next() else {
            return (parts.join(" "), None);
        };
        if word.contains('=') || word.starts_with('[') || COMMAND_WORDS.contains(&word) {
            return (parts.join(" "), Some(trimmed.trim_end().to_string()));
        }
        parts.push(word);
        rest = &trimmed[word.len()..];
    }
}

/// Fold RouterOS `\`-continued physical lines into one logical line.
///
/// Exports wrap at a fixed width, often mid-token (`speed=\` then
/// `    10Gbps`), so the `\`, the line break and the next line's indentation
/// are removed with no separator put in their place. A break between words
/// keeps the space written before the `\`.
pub fn fold_continuations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pieces = text.split('\n').peekable();
    let mut first = true;
    while let Some(piece) = pieces.next() {
        let piece = piece.strip_suffix('\r').unwrap_or(piece);
        let piece = if first { piece } else { piece.trim_start() };
        let piece = if pieces.peek().is_some() {
            piece.strip_suffix('\\').unwrap_or(piece)
        } else {
            piece
        };
        out.push_str(piece);
        first = false;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{fold_continuations, ConfigLine, ConfigSection};

    #[test]
    fn path_ignores_inline_command() {
        let section = ConfigSection::new("/system identity set name=core-r1");
        assert_eq!(section.path(), "/system identity");
    }

    #[test]
    fn inline_command_is_split_from_header() {
        let mut section = ConfigSection::new("/snmp set enabled=yes trap-community=ro");
        assert_eq!(
            section.inline_command().as_deref(),
            Some("set enabled=yes trap-community=ro")
        );
        section.strip_inline_command();
        assert_eq!(section.header, "/snmp");
        assert_eq!(section.inline_command(), None);
        assert_eq!(ConfigSection::new("/ip dns").inline_command(), None);
    }

    #[test]
    fn path_normalizes_extra_spacing() {
        let section = ConfigSection::new("/ip   firewall  filter ");
        assert_eq!(section.path(), "/ip firewall filter");
    }

    #[test]
    fn logical_folds_continuation() {
        let line = ConfigLine::new("add address=10.0.0.1/30 \\\n    interface=ether2");
        assert_eq!(line.logical(), "add address=10.0.0.1/30 interface=ether2");
    }

    #[test]
    fn logical_joins_token_split_mid_value() {
        let line = ConfigLine::new("set [ find default-name=sfp-sfpplus1 ] speed=\\\n    10Gbps");
        assert_eq!(
            line.logical(),
            "set [ find default-name=sfp-sfpplus1 ] speed=10Gbps"
        );
        let line = ConfigLine::new("add list=manager\\\r\n    IP");
        assert_eq!(line.logical(), "add list=managerIP");
    }

    #[test]
    fn folding_without_continuation_is_identity() {
        assert_eq!(fold_continuations("set enabled=yes"), "set enabled=yes");
    }

    #[test]
    fn command_is_first_word_of_entry() {
        assert_eq!(ConfigLine::new("  add list=unauth").command(), Some("add"));
        assert_eq!(ConfigLine::new("# add list=unauth").command(), None);
    }
}
