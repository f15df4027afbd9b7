//! @acp:module "Annotation Merge Engine"
//! @acp:summary "Computes each class's merged @property doc block and the patch that installs it"
//! @acp:domain cli
//! @acp:layer service
//!
//! # Merge Algorithm
//!
//! 1. **Locate** the class's doc comment, or synthesize an empty `/** */`
//!    block indented like the class declaration
//! 2. **Normalize** a single-line comment into an opening and a closing line
//! 3. **Strip** existing `@property` lines when `remove_unknown` is set
//! 4. **Insert** every missing `@property <Type> $<symbol>` line before the
//!    closing line (lookup is case-insensitive)
//! 5. **Emit** a [`Patch`] only if something was inserted and the block text
//!    differs from the original
//!
//! Only the annotation lines are generated; every other byte of the block,
//! including its end-of-line convention, passes through unchanged.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{ClassNode, DocComment};
use crate::config::AttributeRules;
use crate::error::{MagicError, Result};
use crate::extract::{AttributeExtractor, ExtractionResult};
use crate::source::{leading_whitespace, split_eol, split_into_lines, SourceUnit};

/// Marker that starts every synthesized annotation
pub const ANNOTATION_TAG: &str = "@property";

/// Matches `* @property <Type> $<symbol>` anywhere in a line
static ANNOTATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\*\s*@property\s+(\S+)\s+\$(\w+)").unwrap());

/// @acp:summary "Location-tagged replacement of one class's doc block"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// 0-based index of the first replaced line in the original file
    pub start: usize,
    /// Number of original lines replaced (0 for a newly inserted block)
    pub original_len: usize,
    pub replacement: Vec<String>,
}

impl Patch {
    /// Signed change in file length this patch causes
    pub fn delta(&self) -> isize {
        self.replacement.len() as isize - self.original_len as isize
    }
}

/// A rendered `(type, symbol)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub type_name: String,
    pub symbol: String,
}

impl Annotation {
    pub fn new(type_name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            symbol: symbol.into(),
        }
    }
}

/// @acp:summary "A doc block being edited, with its original placement"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationBlock {
    lines: Vec<String>,
    original: Vec<String>,
    start: usize,
    indent: String,
    eol: String,
}

impl AnnotationBlock {
    /// @acp:summary "Find or synthesize the doc block of a class"
    pub fn locate(source: &SourceUnit, class: &ClassNode) -> Result<Self> {
        match class.doc_comment {
            Some(comment) => Self::from_comment(source, comment),
            None => Self::synthesize(source, class.start_line),
        }
    }

    fn synthesize(source: &SourceUnit, class_line: usize) -> Result<Self> {
        let line = source.line(class_line).ok_or_else(|| {
            MagicError::format(class_line, "class declaration line is outside the file")
        })?;
        let indent = leading_whitespace(line).to_string();
        let eol = eol_of(line, source);

        Ok(Self {
            lines: vec![
                format!("{}/**{}", indent, eol),
                format!("{} */{}", indent, eol),
            ],
            original: Vec::new(),
            start: class_line - 1,
            indent,
            eol,
        })
    }

    fn from_comment(source: &SourceUnit, comment: DocComment) -> Result<Self> {
        let DocComment {
            start_line,
            end_line,
        } = comment;
        let outside = || MagicError::format(start_line, "doc comment span is outside the file");
        if end_line < start_line {
            return Err(outside());
        }
        let first = source.line(start_line).ok_or_else(outside)?;
        let last = source.line(end_line).ok_or_else(outside)?;

        let first_content = split_eol(first).0;
        let indent = leading_whitespace(first).to_string();
        if !first_content[indent.len()..].starts_with("/**") {
            return Err(MagicError::format(
                start_line,
                "doc comment does not start its line",
            ));
        }

        let last_content = split_eol(last).0;
        let close = last_content
            .rfind("*/")
            .ok_or_else(|| MagicError::format(end_line, "doc comment is not closed"))?;
        if !last_content[close + 2..].trim().is_empty() {
            return Err(MagicError::format(
                end_line,
                "code follows the doc comment on the same line",
            ));
        }

        let original: Vec<String> = source.lines()[start_line - 1..end_line].to_vec();

        let lines = if comment.is_single_line() {
            if close < indent.len() + 3 {
                return Err(MagicError::format(start_line, "empty doc comment"));
            }
            let eol = eol_of(first, source);
            let head = &first_content[..close];
            let mut tail = first[close + 2..].to_string();
            if split_eol(&tail).1.is_empty() {
                tail.push_str(&eol);
            }
            vec![format!("{}{}", head, eol), format!("{} */{}", indent, tail)]
        } else {
            split_into_lines(&original.concat(), start_line)?
        };

        let eol = split_eol(&lines[0]).1.to_string();
        Ok(Self {
            lines,
            original,
            start: start_line - 1,
            indent,
            eol,
        })
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.concat()
    }

    /// 0-based index of the block's first line in the original file
    pub fn start(&self) -> usize {
        self.start
    }

    /// Lines the block occupied before editing
    pub fn original_len(&self) -> usize {
        self.original.len()
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Drop every line mentioning the annotation tag
    ///
    /// On the opening and closing lines only the annotation text goes, leaving
    /// a bare `/**` or ` */` so the block stays well formed. Returns the
    /// number of lines touched.
    pub fn remove_annotations(&mut self) -> usize {
        let close = self.lines.len().saturating_sub(1);
        let mut touched = 0;
        let mut kept = Vec::with_capacity(self.lines.len());

        for (idx, line) in self.lines.drain(..).enumerate() {
            let (content, eol) = split_eol(&line);
            let Some(tag) = content.find(ANNOTATION_TAG) else {
                kept.push(line);
                continue;
            };
            touched += 1;
            if idx == 0 {
                kept.push(format!("{}{}", content[..tag].trim_end(), eol));
            } else if idx == close {
                let eol = if eol.is_empty() { self.eol.as_str() } else { eol };
                kept.push(format!("{} */{}", self.indent, eol));
            }
        }

        self.lines = kept;
        touched
    }

    /// Whether some line already documents `annotation` (case-insensitive)
    pub fn contains(&self, annotation: &Annotation) -> bool {
        self.lines.iter().any(|line| {
            ANNOTATION_PATTERN
                .captures_iter(split_eol(line).0)
                .any(|caps| {
                    caps[1].eq_ignore_ascii_case(&annotation.type_name)
                        && caps[2].eq_ignore_ascii_case(&annotation.symbol)
                })
        })
    }

    /// Insert `annotation` before the closing line unless already present
    pub fn insert(&mut self, annotation: &Annotation) -> bool {
        if self.contains(annotation) {
            return false;
        }
        let line = format!(
            "{} * {} {} ${}{}",
            self.indent, ANNOTATION_TAG, annotation.type_name, annotation.symbol, self.eol
        );
        let close = self.lines.len() - 1;
        self.lines.insert(close, line);
        true
    }

    /// The patch installing this block, or `None` if the text is unchanged
    pub fn into_patch(self) -> Option<Patch> {
        if self.lines == self.original {
            return None;
        }
        Some(Patch {
            start: self.start,
            original_len: self.original.len(),
            replacement: self.lines,
        })
    }
}

fn eol_of(line: &str, source: &SourceUnit) -> String {
    let eol = split_eol(line).1;
    if eol.is_empty() {
        source.detect_eol().unwrap_or("\n").to_string()
    } else {
        eol.to_string()
    }
}

/// Merge behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Remove every existing @property line before re-adding the current set.
    /// This also removes manually written entries.
    pub remove_unknown: bool,
}

/// @acp:summary "Produces per-class patches from extraction results"
#[derive(Debug, Clone)]
pub struct MergeEngine<'a> {
    extractor: &'a AttributeExtractor,
    options: MergeOptions,
}

impl<'a> MergeEngine<'a> {
    pub fn new(extractor: &'a AttributeExtractor, options: MergeOptions) -> Self {
        Self { extractor, options }
    }

    /// @acp:summary "Render the annotations a class should carry"
    ///
    /// Attributes come in the class's declaration order, symbols ascending.
    /// Fails if `rules` name an attribute the extractor never collects.
    pub fn render(
        &self,
        extraction: &ExtractionResult,
        rules: &AttributeRules,
    ) -> Result<Vec<Annotation>> {
        if let Some(unknown) = rules.keys().find(|name| !self.extractor.knows(name)) {
            return Err(MagicError::configuration(format!(
                "attribute {:?} is not collected by the extractor",
                unknown
            )));
        }

        let mut annotations = Vec::new();
        for (attribute, symbols) in extraction.iter() {
            let Some(kind) = rules.get(attribute) else {
                continue;
            };
            for (symbol, class_name) in symbols {
                annotations.push(Annotation::new(
                    kind.apply(class_name),
                    symbol.as_str(),
                ));
            }
        }
        Ok(annotations)
    }

    /// @acp:summary "Compute the doc block patch for one class"
    pub fn merge(
        &self,
        source: &SourceUnit,
        class: &ClassNode,
        extraction: &ExtractionResult,
        rules: &AttributeRules,
    ) -> Result<Option<Patch>> {
        let annotations = self.render(extraction, rules)?;
        if annotations.is_empty() {
            return Ok(None);
        }

        let mut block = AnnotationBlock::locate(source, class)?;
        if self.options.remove_unknown {
            block.remove_annotations();
        }

        let mut inserted = 0;
        for annotation in &annotations {
            if block.insert(annotation) {
                inserted += 1;
            }
        }
        if inserted == 0 {
            return Ok(None);
        }

        Ok(block.into_patch())
    }
}
