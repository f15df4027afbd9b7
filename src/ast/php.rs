//! @acp:module "PHP Class Provider"
//! @acp:summary "tree-sitter based extraction of PHP classes, doc comments and property defaults"
//! @acp:domain cli
//! @acp:layer parser
//!
//! Reduces a PHP file to [`ClassNode`]s. Only what the merge pipeline needs is
//! kept: class name, parent, start line, the nearest preceding `/**` comment
//! and the literal default of every property.

use std::path::Path;

use tree_sitter::{Language, Node, Parser};

use super::{AttributeDeclaration, ClassNode, ClassProvider, DocComment, ListItem, Literal};
use crate::error::{MagicError, Result};
use crate::source::SourceUnit;

/// String node children that keep a double-quoted string a plain literal
const PLAIN_STRING_PARTS: &[&str] = &["string_content", "string_value", "escape_sequence"];

fn php_language() -> Language {
    tree_sitter_php::LANGUAGE_PHP.into()
}

/// @acp:summary "ClassProvider backed by tree-sitter-php"
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpClassProvider;

impl PhpClassProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ClassProvider for PhpClassProvider {
    fn classes(&self, path: &Path, source: &SourceUnit) -> Result<Vec<ClassNode>> {
        let text = source.to_text();
        let parse_error = |message: String| MagicError::Parse {
            path: path.to_path_buf(),
            message,
        };

        // tree_sitter::Parser is not Sync; one per file keeps the provider shareable
        let mut parser = Parser::new();
        parser
            .set_language(&php_language())
            .map_err(|e| parse_error(format!("failed to load PHP grammar: {}", e)))?;

        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| parse_error("parser produced no tree".to_string()))?;
        let root = tree.root_node();

        if root.has_error() {
            let line = first_error_line(root).unwrap_or(1);
            return Err(parse_error(format!("syntax error near line {}", line)));
        }

        let src = text.as_bytes();
        let mut classes = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.kind() == "class_declaration" {
                if let Some(class) = class_node(node, src) {
                    classes.push(class);
                }
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        Ok(classes)
    }
}

fn node_text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn first_error_line(root: Node) -> Option<usize> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row + 1);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn class_node(node: Node, src: &[u8]) -> Option<ClassNode> {
    let name = node_text(node.child_by_field_name("name")?, src).to_string();
    let mut class = ClassNode::new(name, node.start_position().row + 1);
    class.parent = parent_name(node, src);
    class.doc_comment = leading_doc_comment(node, src);

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() != "property_declaration" {
                continue;
            }
            let mut inner = member.walk();
            for element in member.named_children(&mut inner) {
                if element.kind() == "property_element" {
                    if let Some(attribute) = attribute(element, src) {
                        class.attributes.push(attribute);
                    }
                }
            }
        }
    }

    Some(class)
}

/// `extends \Foo\Bar` resolves to `Bar`
fn parent_name(node: Node, src: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let base = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "base_clause")?;

    let mut inner = base.walk();
    let parent = base
        .named_children(&mut inner)
        .find(|c| matches!(c.kind(), "name" | "qualified_name"))?;

    node_text(parent, src)
        .rsplit('\\')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Nearest `/**` comment among the comments directly preceding the class
fn leading_doc_comment(node: Node, src: &[u8]) -> Option<DocComment> {
    let mut current = node.prev_sibling();
    while let Some(sibling) = current {
        if sibling.kind() != "comment" {
            break;
        }
        let text = node_text(sibling, src);
        if text.starts_with("/**") && !text.starts_with("/**/") {
            return Some(DocComment::new(
                sibling.start_position().row + 1,
                sibling.end_position().row + 1,
            ));
        }
        current = sibling.prev_sibling();
    }
    None
}

fn attribute(element: Node, src: &[u8]) -> Option<AttributeDeclaration> {
    let mut cursor = element.walk();
    let children: Vec<Node> = element.named_children(&mut cursor).collect();

    let name_node = children.iter().find(|c| c.kind() == "variable_name")?;
    let name = node_text(*name_node, src).trim_start_matches('$').to_string();

    // Older grammars wrap the default in property_initializer
    let value = children
        .iter()
        .filter(|c| c.id() != name_node.id())
        .find_map(|c| {
            if c.kind() == "property_initializer" {
                let mut inner = c.walk();
                let first = c.named_children(&mut inner).next();
                first
            } else {
                Some(*c)
            }
        })
        .map(|v| literal(v, src));

    Some(AttributeDeclaration::new(name, value))
}

fn literal(node: Node, src: &[u8]) -> Literal {
    match node.kind() {
        "string" | "encapsed_string" => string_literal(node, src)
            .map(Literal::String)
            .unwrap_or(Literal::Other),
        "array_creation_expression" => {
            let mut cursor = node.walk();
            let items = node
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "array_element_initializer")
                .map(|c| list_item(c, src))
                .collect();
            Literal::List(items)
        }
        _ => Literal::Other,
    }
}

fn list_item(node: Node, src: &[u8]) -> ListItem {
    let mut cursor = node.walk();
    let has_arrow = node.children(&mut cursor).any(|c| c.kind() == "=>");

    let mut cursor = node.walk();
    let named: Vec<Node> = node.named_children(&mut cursor).collect();

    match (has_arrow, named.as_slice()) {
        (true, [key, .., value]) => ListItem::keyed(literal(*key, src), literal(*value, src)),
        (false, [value]) => ListItem::bare(literal(*value, src)),
        _ => ListItem::bare(Literal::Other),
    }
}

fn string_literal(node: Node, src: &[u8]) -> Option<String> {
    if node.kind() == "encapsed_string" {
        let mut cursor = node.walk();
        let interpolated = node
            .named_children(&mut cursor)
            .any(|c| !PLAIN_STRING_PARTS.contains(&c.kind()));
        if interpolated {
            return None;
        }
    }

    let raw = node_text(node, src);
    let raw = raw
        .strip_prefix('b')
        .or_else(|| raw.strip_prefix('B'))
        .unwrap_or(raw);
    let quote = raw.chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let inner = raw.strip_prefix(quote)?.strip_suffix(quote)?;

    Some(unescape(inner, quote))
}

fn unescape(inner: &str, quote: char) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match (quote, chars.next()) {
            (_, Some('\\')) => out.push('\\'),
            ('\'', Some('\'')) => out.push('\''),
            ('"', Some('"')) => out.push('"'),
            ('"', Some('$')) => out.push('$'),
            ('"', Some('n')) => out.push('\n'),
            ('"', Some('t')) => out.push('\t'),
            ('"', Some('r')) => out.push('\r'),
            (_, Some(other)) => {
                out.push('\\');
                out.push(other);
            }
            (_, None) => out.push('\\'),
        }
    }
    out
}
