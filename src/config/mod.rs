//! @acp:module "Configuration"
//! @acp:summary "Project configuration loading, defaults and the ancestor transform table"
//! @acp:domain cli
//! @acp:layer config
//!
//! A configuration file is optional. Missing fields fall back to defaults and
//! the transform table defaults to the CakePHP 2 conventions:
//!
//! | Top ancestor | Attribute             | Transform        |
//! |--------------|-----------------------|------------------|
//! | Controller   | components            | `+Component`     |
//! | Controller   | uses                  | identity         |
//! | Component    | components            | `+Component`     |
//! | Helper       | components / helpers  | `+Component` / `+Helper` |
//! | Helper       | uses                  | identity         |
//! | Model        | belongsTo, hasAndBelongsToMany, hasOne, hasMany | identity |
//! | Shell        | uses                  | identity         |

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MagicError, Result};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".magic.config.json";

/// @acp:summary "How a raw symbol becomes its documented type label"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Type equals the symbol's class name
    Identity,
    /// Type is the class name followed by a fixed suffix
    AppendSuffix(String),
}

impl TransformKind {
    pub fn suffix(suffix: impl Into<String>) -> Self {
        TransformKind::AppendSuffix(suffix.into())
    }

    pub fn apply(&self, class_name: &str) -> String {
        match self {
            TransformKind::Identity => class_name.to_string(),
            TransformKind::AppendSuffix(suffix) => format!("{}{}", class_name, suffix),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformKind::Identity => write!(f, "identity"),
            TransformKind::AppendSuffix(suffix) => write!(f, "+{}", suffix),
        }
    }
}

/// Attribute name -> transform, in declaration order
pub type AttributeRules = IndexMap<String, TransformKind>;

/// @acp:summary "Top ancestor name -> attribute rules"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformTable(IndexMap<String, AttributeRules>);

impl TransformTable {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// The CakePHP 2 conventions
    pub fn builtin() -> Self {
        let component = || TransformKind::suffix("Component");
        let mut table = Self::new();
        table.insert(
            "Controller",
            [("components", component()), ("uses", TransformKind::Identity)],
        );
        table.insert("Component", [("components", component())]);
        table.insert(
            "Helper",
            [
                ("components", component()),
                ("helpers", TransformKind::suffix("Helper")),
                ("uses", TransformKind::Identity),
            ],
        );
        table.insert(
            "Model",
            [
                ("belongsTo", TransformKind::Identity),
                ("hasAndBelongsToMany", TransformKind::Identity),
                ("hasOne", TransformKind::Identity),
                ("hasMany", TransformKind::Identity),
            ],
        );
        table.insert("Shell", [("uses", TransformKind::Identity)]);
        table
    }

    pub fn insert<I, S>(&mut self, ancestor: impl Into<String>, rules: I)
    where
        I: IntoIterator<Item = (S, TransformKind)>,
        S: Into<String>,
    {
        let rules = rules.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.0.insert(ancestor.into(), rules);
    }

    /// Rules for a resolved top ancestor, if it is a recognized class
    pub fn rules_for(&self, ancestor: &str) -> Option<&AttributeRules> {
        self.0.get(ancestor)
    }

    pub fn ancestors(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every attribute name any ancestor asks for
    pub fn attribute_names(&self) -> BTreeSet<String> {
        self.0
            .values()
            .flat_map(|rules| rules.keys().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// @acp:summary "Reject empty names and empty suffixes"
    pub fn validate(&self) -> Result<()> {
        for (ancestor, rules) in &self.0 {
            if ancestor.trim().is_empty() {
                return Err(MagicError::configuration("empty top ancestor name"));
            }
            for (attribute, kind) in rules {
                if attribute.trim().is_empty() {
                    return Err(MagicError::configuration(format!(
                        "empty attribute name under {}",
                        ancestor
                    )));
                }
                if matches!(kind, TransformKind::AppendSuffix(s) if s.is_empty()) {
                    return Err(MagicError::configuration(format!(
                        "empty suffix for {}.{}",
                        ancestor, attribute
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for TransformTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// @acp:summary "Main configuration structure"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// File patterns to include (glob syntax)
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// File patterns to exclude (glob syntax)
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Drop every existing @property line before re-adding the current set
    #[serde(default)]
    pub remove_unknown: bool,

    /// Number of parallel workers (default: number of CPUs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Top ancestor -> attribute -> transform
    #[serde(default)]
    pub transforms: TransformTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: default_exclude(),
            remove_unknown: false,
            workers: None,
            transforms: TransformTable::builtin(),
        }
    }
}

impl Config {
    /// @acp:summary "Load config from a JSON or YAML file"
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MagicError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;

        let is_yaml = path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false);
        let config: Config = if is_yaml {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load `path` when it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// @acp:summary "Save config to a file"
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for pattern in self.include.iter().chain(&self.exclude) {
            glob::Pattern::new(pattern).map_err(|e| {
                MagicError::configuration(format!("invalid glob {:?}: {}", pattern, e))
            })?;
        }
        if self.workers == Some(0) {
            return Err(MagicError::configuration("workers must be at least 1"));
        }
        self.transforms.validate()
    }
}

fn default_include() -> Vec<String> {
    vec!["**/*.php".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec![
        // Package managers
        "**/vendor/**".to_string(),
        "**/node_modules/**".to_string(),
        // CakePHP runtime cache
        "**/tmp/**".to_string(),
        // VCS
        "**/.git/**".to_string(),
    ]
}
