//! @acp:module "Source Units"
//! @acp:summary "Line lists that keep each line's own end-of-line sequence"
//! @acp:domain cli
//! @acp:layer model
//!
//! A [`SourceUnit`] is the unit every rewrite operates on. Lines are split
//! after `\n`, so `\r\n` stays attached to its line and joining the lines back
//! together reproduces the input byte for byte. A lone `\r` is not a line
//! terminator; tree-sitter does not count it as one either.
//!
//! Files that are not valid UTF-8 are decoded as ISO-8859-1, one char per
//! byte, and encoded back the same way on write, so their bytes survive.

use std::path::Path;

use crate::error::{MagicError, Result};

/// Byte encoding a unit was read with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte maps to the char with the same code point
    Latin1,
}

/// @acp:summary "Ordered lines of one file, each retaining its end-of-line"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceUnit {
    lines: Vec<String>,
    encoding: Encoding,
}

impl SourceUnit {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
            encoding: Encoding::Utf8,
        }
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            encoding: Encoding::Utf8,
        }
    }

    /// Decode raw file bytes, falling back to ISO-8859-1 when not UTF-8
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Self::from_text(&text),
            Err(e) => {
                let text: String = e.into_bytes().into_iter().map(char::from).collect();
                Self::from_text(&text).with_encoding(Encoding::Latin1)
            }
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// @acp:summary "Read a file into a source unit"
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(bytes))
    }

    /// Encode back to bytes in the unit's original encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self.encoding {
            Encoding::Utf8 => Ok(self.to_text().into_bytes()),
            Encoding::Latin1 => self
                .to_text()
                .chars()
                .map(|c| {
                    u8::try_from(c).map_err(|_| {
                        MagicError::Io(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("{:?} cannot be written as ISO-8859-1", c),
                        ))
                    })
                })
                .collect(),
        }
    }

    /// @acp:summary "Overwrite a file with this unit's exact bytes"
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line by 1-based number, end-of-line included
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
    }

    pub fn to_text(&self) -> String {
        self.lines.concat()
    }

    /// The first end-of-line sequence found in the unit
    pub fn detect_eol(&self) -> Option<&str> {
        self.lines
            .iter()
            .map(|l| split_eol(l).1)
            .find(|eol| !eol.is_empty())
    }
}

/// Split a line into its content and its end-of-line sequence (possibly empty)
pub fn split_eol(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, &line[content.len()..])
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, &line[content.len()..])
    } else {
        (line, "")
    }
}

/// Leading spaces and tabs of a line
pub fn leading_whitespace(line: &str) -> &str {
    let content = split_eol(line).0;
    let end = content
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(content.len());
    &content[..end]
}

/// @acp:summary "Decompose comment text into end-of-line-terminated lines"
///
/// At least two lines are required. An unterminated last line receives the
/// text's first end-of-line sequence. `line` is only used for error context.
pub fn split_into_lines(text: &str, line: usize) -> Result<Vec<String>> {
    if text.is_empty() {
        return Err(MagicError::format(
            line,
            "expected at least two lines, none found",
        ));
    }

    let mut lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
    if lines.len() < 2 {
        return Err(MagicError::format(
            line,
            "expected at least two lines, only one found",
        ));
    }

    let eol = split_eol(&lines[0]).1.to_string();
    if let Some(last) = lines.last_mut() {
        if split_eol(last).1.is_empty() {
            last.push_str(&eol);
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_mixed_eols() {
        let text = "<?php\r\nclass A {\n}\r\n";
        let unit = SourceUnit::from_text(text);
        assert_eq!(unit.len(), 3);
        assert_eq!(unit.line(2), Some("class A {\n"));
        assert_eq!(unit.to_text(), text);
    }

    #[test]
    fn test_latin1_bytes_survive_round_trip() {
        let bytes = b"<?php\n// M\xfcller\r\nclass A {}\n".to_vec();
        let unit = SourceUnit::from_bytes(bytes.clone());
        assert_eq!(unit.encoding(), Encoding::Latin1);
        assert_eq!(unit.line(2), Some("// M\u{fc}ller\r\n"));
        assert_eq!(unit.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_latin1_rejects_wider_chars_on_write() {
        let unit = SourceUnit::from_text("\u{2603}\n").with_encoding(Encoding::Latin1);
        assert!(matches!(unit.to_bytes(), Err(MagicError::Io(_))));
    }

    #[test]
    fn test_utf8_bytes_stay_utf8() {
        let unit = SourceUnit::from_bytes("// M\u{fc}ller\n".as_bytes().to_vec());
        assert_eq!(unit.encoding(), Encoding::Utf8);
        assert_eq!(unit.to_bytes().unwrap(), "// M\u{fc}ller\n".as_bytes());
    }

    #[test]
    fn test_last_line_without_eol() {
        let unit = SourceUnit::from_text("a\nb");
        assert_eq!(unit.lines(), &["a\n".to_string(), "b".to_string()]);
        assert_eq!(unit.line(0), None);
        assert_eq!(unit.line(3), None);
    }

    #[test]
    fn test_detect_eol() {
        assert_eq!(SourceUnit::from_text("x\r\ny\n").detect_eol(), Some("\r\n"));
        assert_eq!(SourceUnit::from_text("x").detect_eol(), None);
    }

    #[test]
    fn test_split_eol_and_indent() {
        assert_eq!(split_eol("  foo\r\n"), ("  foo", "\r\n"));
        assert_eq!(split_eol("foo"), ("foo", ""));
        assert_eq!(leading_whitespace("\t  class A\n"), "\t  ");
        assert_eq!(leading_whitespace("   \n"), "   ");
    }

    #[test]
    fn test_split_into_lines_empty() {
        let err = split_into_lines("", 1).unwrap_err();
        assert!(err.to_string().contains("none found"));
    }

    #[test]
    fn test_split_into_lines_single_line() {
        assert!(split_into_lines("line1", 1)
            .unwrap_err()
            .to_string()
            .contains("only one found"));
        assert!(split_into_lines("line1\n", 1)
            .unwrap_err()
            .to_string()
            .contains("only one found"));
    }

    #[test]
    fn test_split_into_lines_terminates_last_line() {
        assert_eq!(
            split_into_lines("line1\nline2", 1).unwrap(),
            vec!["line1\n", "line2\n"]
        );
        assert_eq!(
            split_into_lines("line1\r\nline2", 1).unwrap(),
            vec!["line1\r\n", "line2\r\n"]
        );
    }

    #[test]
    fn test_split_into_lines_keeps_blank_lines() {
        assert_eq!(
            split_into_lines("line1\n\nline2\n", 1).unwrap(),
            vec!["line1\n", "\n", "line2\n"]
        );
    }
}
