//! @acp:module "Class Model"
//! @acp:summary "Parser-independent view of classes, their doc comments and list attributes"
//! @acp:domain cli
//! @acp:layer model
//!
//! The merge pipeline never looks at a syntax tree. Providers such as
//! [`PhpClassProvider`] reduce a file to [`ClassNode`]s and the rest of the
//! crate works on those.

pub mod php;

use std::path::Path;

use crate::error::Result;
use crate::source::SourceUnit;

pub use php::PhpClassProvider;

/// @acp:summary "Span of the doc comment directly preceding a class"
/// Lines are 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocComment {
    pub start_line: usize,
    pub end_line: usize,
}

impl DocComment {
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// Opens and closes on the same physical line
    pub fn is_single_line(&self) -> bool {
        self.start_line == self.end_line
    }
}

/// Literal value of an attribute or list item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    String(String),
    List(Vec<ListItem>),
    /// Anything that is not a plain string or list literal
    Other,
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ListItem]> {
        match self {
            Literal::List(items) => Some(items),
            _ => None,
        }
    }
}

/// One `key => value` or bare `value` entry of a list literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub key: Option<Literal>,
    pub value: Literal,
}

impl ListItem {
    pub fn bare(value: Literal) -> Self {
        Self { key: None, value }
    }

    pub fn keyed(key: Literal, value: Literal) -> Self {
        Self {
            key: Some(key),
            value,
        }
    }
}

/// A class-level property declaration with its default value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDeclaration {
    pub name: String,
    /// `None` when the declaration has no default value
    pub value: Option<Literal>,
}

impl AttributeDeclaration {
    pub fn new(name: impl Into<String>, value: Option<Literal>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// The literal list value, if the default is one
    pub fn list(&self) -> Option<&[ListItem]> {
        self.value.as_ref().and_then(Literal::as_list)
    }
}

/// @acp:summary "A class declaration as seen by the merge pipeline"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNode {
    pub name: String,
    /// Parent class name, without namespace qualification
    pub parent: Option<String>,
    /// 1-based line the declaration starts on
    pub start_line: usize,
    pub doc_comment: Option<DocComment>,
    pub attributes: Vec<AttributeDeclaration>,
}

impl ClassNode {
    pub fn new(name: impl Into<String>, start_line: usize) -> Self {
        Self {
            name: name.into(),
            parent: None,
            start_line,
            doc_comment: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_doc_comment(mut self, comment: DocComment) -> Self {
        self.doc_comment = Some(comment);
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeDeclaration) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// @acp:summary "Turns file text into class nodes"
pub trait ClassProvider: Send + Sync {
    /// Extract every class declared in `source`; `path` is used for error context
    fn classes(&self, path: &Path, source: &SourceUnit) -> Result<Vec<ClassNode>>;
}

/// Build a list literal of bare strings
pub fn string_list<I, S>(values: I) -> Literal
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Literal::List(
        values
            .into_iter()
            .map(|v| ListItem::bare(Literal::String(v.into())))
            .collect(),
    )
}
