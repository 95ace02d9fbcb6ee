//! `key=value` tokenization of RouterOS entry lines.
//!
//! Tokens are located in the raw line text (continuations included), so a
//! value can be replaced in place without disturbing the rest of the line.

use std::borrow::Cow;
use std::ops::Range;

use crate::tree::fold_continuations;

/// One whitespace-delimited word of an entry line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Key for `key=value` words, `None` for bare words like `add` or `[`.
    pub key: Option<Cow<'a, str>>,
    /// Value text with continuations joined (still quoted if the source
    /// quoted it).
    pub value: Cow<'a, str>,
    /// Byte range of the raw value inside the line, continuations included.
    pub value_span: Range<usize>,
}

impl Token<'_> {
    pub fn is_key(&self, key: &str) -> bool {
        self.key.as_deref() == Some(key)
    }

    /// Value with surrounding quotes removed and `\"` unescaped.
    pub fn unquoted(&self) -> String {
        unquote(&self.value)
    }
}

/// Split an entry line into tokens.
///
/// Whitespace and `[`/`]` brackets separate words; double-quoted runs keep
/// embedded whitespace. A `\` continuation joins the text on either side of
/// it, so a word wrapped mid-token comes back whole.
pub fn tokenize(line: &str) -> Vec<Token<'_>> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut idx = 0;

    while idx < bytes.len() {
        if bytes[idx].is_ascii_whitespace() {
            idx += 1;
            continue;
        }
        if let Some(len) = continuation_len(bytes, idx) {
            idx += len;
            continue;
        }
        if bytes[idx] == b'[' || bytes[idx] == b']' {
            out.push(Token {
                key: None,
                value: Cow::Borrowed(&line[idx..idx + 1]),
                value_span: idx..idx + 1,
            });
            idx += 1;
            continue;
        }

        let start = idx;
        let mut in_quotes = false;
        while idx < bytes.len() {
            if let Some(len) = continuation_len(bytes, idx) {
                idx += len;
                continue;
            }
            let b = bytes[idx];
            if in_quotes {
                if b == b'\\' && idx + 1 < bytes.len() && bytes[idx + 1] == b'"' {
                    idx += 2;
                    continue;
                }
                if b == b'"' {
                    in_quotes = false;
                }
                idx += 1;
                continue;
            }
            if b == b'"' {
                in_quotes = true;
                idx += 1;
                continue;
            }
            if b.is_ascii_whitespace() || b == b']' {
                break;
            }
            idx += 1;
        }

        out.push(split_word(&line[start..idx], start));
    }
    out
}

/// Return the unquoted value of the first `key=` token.
pub fn value_of(line: &str, key: &str) -> Option<String> {
    tokenize(line)
        .into_iter()
        .find(|t| t.is_key(key))
        .map(|t| t.unquoted())
}

/// Replace the value of the first `key=` token, returning the new line.
///
/// A value wrapped across a continuation is written back on one line.
pub fn replace_value(line: &str, key: &str, new_value: &str) -> Option<String> {
    let token = tokenize(line).into_iter().find(|t| t.is_key(key))?;
    let mut out = String::with_capacity(line.len() + new_value.len());
    out.push_str(&line[..token.value_span.start]);
    out.push_str(new_value);
    out.push_str(&line[token.value_span.end..]);
    Some(out)
}

/// Remove one level of double quotes and unescape `\"`.
pub fn unquote(value: &str) -> String {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    inner.replace("\\\"", "\"")
}

fn split_word(word: &str, offset: usize) -> Token<'_> {
    match word.find('=') {
        Some(eq) if eq > 0 && !word[..eq].contains('"') => Token {
            key: Some(joined(&word[..eq])),
            value: joined(&word[eq + 1..]),
            value_span: offset + eq + 1..offset + word.len(),
        },
        _ => Token {
            key: None,
            value: joined(word),
            value_span: offset..offset + word.len(),
        },
    }
}

fn joined(raw: &str) -> Cow<'_, str> {
    if raw.contains('\n') {
        Cow::Owned(fold_continuations(raw))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Length of a `\` continuation at `idx`: the backslash, the line break and
/// the indentation of the next physical line.
fn continuation_len(bytes: &[u8], idx: usize) -> Option<usize> {
    if bytes[idx] != b'\\' {
        return None;
    }
    let mut end = match (bytes.get(idx + 1), bytes.get(idx + 2)) {
        (Some(b'\n'), _) => idx + 2,
        (Some(b'\r'), Some(b'\n')) => idx + 3,
        _ => return None,
    };
    while matches!(bytes.get(end), Some(b' ' | b'\t')) {
        end += 1;
    }
    Some(end - idx)
}
