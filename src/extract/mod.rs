//! @acp:module "Attribute Extractor"
//! @acp:summary "Pulls symbol -> type wiring out of list-valued class attributes"
//! @acp:domain cli
//! @acp:layer analysis
//!
//! Two entry shapes carry wiring:
//!
//! - a bare string: `'Session'` means symbol `Session` of type `Session`
//! - a string key with a list value: `'Auth' => ['className' => 'MyAuth']`
//!   means symbol `Auth` of type `MyAuth` (or `Auth` without `className`)
//!
//! Everything else is skipped silently.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::ast::{ClassNode, ListItem, Literal};
use crate::error::{MagicError, Result};

/// Nested list key naming the class that backs a configured entry
pub const CLASS_NAME_KEY: &str = "className";

/// Symbol -> type, ascending by symbol (ordinal comparison)
pub type SymbolMap = BTreeMap<String, String>;

/// @acp:summary "Stable identity of a class across one run"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassKey {
    pub path: PathBuf,
    pub line: usize,
}

impl ClassKey {
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

/// One recognised list entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListEntry<'a> {
    Bare(&'a str),
    Configured {
        key: &'a str,
        class_name: Option<&'a str>,
    },
}

impl<'a> ListEntry<'a> {
    fn classify(item: &'a ListItem) -> Option<Self> {
        match (&item.key, &item.value) {
            (None, Literal::String(value)) => Some(ListEntry::Bare(value)),
            (Some(Literal::String(key)), Literal::List(nested)) => Some(ListEntry::Configured {
                key,
                class_name: class_name_of(nested),
            }),
            _ => None,
        }
    }

    fn symbol_and_type(&self) -> (&'a str, &'a str) {
        match *self {
            ListEntry::Bare(value) => (value, value),
            ListEntry::Configured { key, class_name } => (key, class_name.unwrap_or(key)),
        }
    }
}

/// `Plugin.Name` documents as `Name`
pub fn strip_plugin(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((_, short)) if !short.is_empty() => short,
        _ => name,
    }
}

fn class_name_of(items: &[ListItem]) -> Option<&str> {
    items.iter().find_map(|item| match (&item.key, &item.value) {
        (Some(Literal::String(key)), Literal::String(value)) if key == CLASS_NAME_KEY => {
            Some(value.as_str())
        }
        _ => None,
    })
}

/// @acp:summary "Per-class wiring: attribute -> symbols, in declaration order"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub class: ClassKey,
    attributes: IndexMap<String, SymbolMap>,
}

impl ExtractionResult {
    pub fn new(class: ClassKey) -> Self {
        Self {
            class,
            attributes: IndexMap::new(),
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&SymbolMap> {
        self.attributes.get(attribute)
    }

    /// Attributes in the order the class declares them
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolMap)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }
}

/// @acp:summary "Extracts configured wiring attributes from class nodes"
#[derive(Debug, Clone)]
pub struct AttributeExtractor {
    vocabulary: BTreeSet<String>,
}

impl AttributeExtractor {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vocabulary: attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `attribute` is one this extractor collects
    pub fn knows(&self, attribute: &str) -> bool {
        self.vocabulary.contains(attribute)
    }

    pub fn vocabulary(&self) -> &BTreeSet<String> {
        &self.vocabulary
    }

    /// Start a traversal with an empty visited set
    pub fn traversal(&self) -> Traversal<'_> {
        Traversal {
            extractor: self,
            visited: HashSet::new(),
        }
    }

    /// @acp:summary "Extract wiring from one class"
    ///
    /// Fails when the class declares the same configured attribute twice.
    pub fn extract(&self, path: &Path, class: &ClassNode) -> Result<ExtractionResult> {
        let mut result = ExtractionResult::new(ClassKey::new(path, class.start_line));
        let mut seen = HashSet::new();

        for attribute in &class.attributes {
            if !self.knows(&attribute.name) {
                continue;
            }
            if !seen.insert(attribute.name.as_str()) {
                return Err(MagicError::structural(format!(
                    "attribute ${} declared twice in class {} ({}:{})",
                    attribute.name,
                    class.name,
                    path.display(),
                    class.start_line
                )));
            }
            let Some(items) = attribute.list() else {
                continue;
            };

            let symbols: SymbolMap = items
                .iter()
                .filter_map(ListEntry::classify)
                .map(|entry| {
                    let (symbol, ty) = entry.symbol_and_type();
                    (strip_plugin(symbol).to_string(), strip_plugin(ty).to_string())
                })
                .collect();

            if !symbols.is_empty() {
                result.attributes.insert(attribute.name.clone(), symbols);
            }
        }

        Ok(result)
    }
}

/// @acp:summary "One pass over a set of classes; each class may be visited once"
#[derive(Debug)]
pub struct Traversal<'a> {
    extractor: &'a AttributeExtractor,
    visited: HashSet<ClassKey>,
}

impl Traversal<'_> {
    pub fn visit(&mut self, path: &Path, class: &ClassNode) -> Result<ExtractionResult> {
        let key = ClassKey::new(path, class.start_line);
        if !self.visited.insert(key) {
            return Err(MagicError::structural(format!(
                "class {} already encountered ({}:{})",
                class.name,
                path.display(),
                class.start_line
            )));
        }
        self.extractor.extract(path, class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{string_list, AttributeDeclaration};

    fn extractor() -> AttributeExtractor {
        AttributeExtractor::new(["uses", "components", "helpers"])
    }

    fn class_with(attributes: Vec<AttributeDeclaration>) -> ClassNode {
        let mut class = ClassNode::new("Foo", 2);
        class.attributes = attributes;
        class
    }

    #[test]
    fn test_bare_entries_sorted_ascending() {
        let class = class_with(vec![AttributeDeclaration::new(
            "uses",
            Some(string_list(["Foo", "Bar", "Baz"])),
        )]);
        let result = extractor().extract(Path::new("a.php"), &class).unwrap();
        let symbols: Vec<_> = result.get("uses").unwrap().keys().cloned().collect();
        assert_eq!(symbols, vec!["Bar", "Baz", "Foo"]);
    }

    #[test]
    fn test_ordinal_ordering() {
        let class = class_with(vec![AttributeDeclaration::new(
            "uses",
            Some(string_list(["b", "B", "a", "A"])),
        )]);
        let result = extractor().extract(Path::new("a.php"), &class).unwrap();
        let symbols: Vec<_> = result.get("uses").unwrap().keys().cloned().collect();
        assert_eq!(symbols, vec!["A", "B", "a", "b"]);
    }

    #[test]
    fn test_configured_entries() {
        let list = Literal::List(vec![
            ListItem::bare(Literal::String("Foo".into())),
            ListItem::keyed(
                Literal::String("Bar".into()),
                Literal::List(vec![ListItem::keyed(
                    Literal::String(CLASS_NAME_KEY.into()),
                    Literal::String("Baz".into()),
                )]),
            ),
            ListItem::keyed(
                Literal::String("Qux".into()),
                Literal::List(vec![ListItem::bare(Literal::String("ignored".into()))]),
            ),
        ]);
        let class = class_with(vec![AttributeDeclaration::new("components", Some(list))]);
        let result = extractor().extract(Path::new("a.php"), &class).unwrap();
        let symbols = result.get("components").unwrap();
        assert_eq!(symbols["Foo"], "Foo");
        assert_eq!(symbols["Bar"], "Baz");
        assert_eq!(symbols["Qux"], "Qux");
    }

    #[test]
    fn test_plugin_prefix_stripped_before_sorting() {
        let list = Literal::List(vec![
            ListItem::bare(Literal::String("Alpha".into())),
            ListItem::bare(Literal::String("ZPlugin.Aardvark".into())),
            ListItem::keyed(
                Literal::String("Auth".into()),
                Literal::List(vec![ListItem::keyed(
                    Literal::String(CLASS_NAME_KEY.into()),
                    Literal::String("Users.MyAuth".into()),
                )]),
            ),
        ]);
        let class = class_with(vec![AttributeDeclaration::new("components", Some(list))]);
        let result = extractor().extract(Path::new("a.php"), &class).unwrap();
        let symbols = result.get("components").unwrap();
        let order: Vec<_> = symbols.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["Aardvark", "Alpha", "Auth"]);
        assert_eq!(symbols["Aardvark"], "Aardvark");
        assert_eq!(symbols["Auth"], "MyAuth");
    }

    #[test]
    fn test_strip_plugin() {
        assert_eq!(strip_plugin("DebugKit.Toolbar"), "Toolbar");
        assert_eq!(strip_plugin("Toolbar"), "Toolbar");
        assert_eq!(strip_plugin("Odd."), "Odd.");
    }

    #[test]
    fn test_other_shapes_skipped() {
        let list = Literal::List(vec![
            ListItem::bare(Literal::Other),
            ListItem::keyed(Literal::String("Key".into()), Literal::String("value".into())),
            ListItem::keyed(Literal::Other, Literal::List(vec![])),
        ]);
        let class = class_with(vec![
            AttributeDeclaration::new("uses", Some(list)),
            AttributeDeclaration::new("helpers", Some(Literal::Other)),
            AttributeDeclaration::new("components", None),
        ]);
        let result = extractor().extract(Path::new("a.php"), &class).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_unconfigured_attribute_ignored() {
        let class = class_with(vec![AttributeDeclaration::new(
            "actsAs",
            Some(string_list(["Containable"])),
        )]);
        let result = extractor().extract(Path::new("a.php"), &class).unwrap();
        assert!(result.get("actsAs").is_none());
    }

    #[test]
    fn test_declaration_order_kept() {
        let class = class_with(vec![
            AttributeDeclaration::new("uses", Some(string_list(["Post"]))),
            AttributeDeclaration::new("components", Some(string_list(["Auth"]))),
        ]);
        let result = extractor().extract(Path::new("a.php"), &class).unwrap();
        let order: Vec<_> = result.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["uses", "components"]);
    }

    #[test]
    fn test_duplicate_attribute_is_structural() {
        let class = class_with(vec![
            AttributeDeclaration::new("uses", Some(string_list(["A"]))),
            AttributeDeclaration::new("uses", Some(string_list(["B"]))),
        ]);
        let err = extractor().extract(Path::new("a.php"), &class).unwrap_err();
        assert!(matches!(err, MagicError::Structural(_)));
    }

    #[test]
    fn test_duplicate_visit_is_structural() {
        let extractor = extractor();
        let mut traversal = extractor.traversal();
        let class = class_with(vec![]);
        traversal.visit(Path::new("a.php"), &class).unwrap();
        traversal.visit(Path::new("b.php"), &class).unwrap();
        let err = traversal.visit(Path::new("a.php"), &class).unwrap_err();
        assert!(matches!(err, MagicError::Structural(_)));
    }
}
