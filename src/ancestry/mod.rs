//! @acp:module "Ancestor Resolver"
//! @acp:summary "Global class index and top-ancestor resolution across all analyzed files"
//! @acp:domain cli
//! @acp:layer analysis
//!
//! The index is built once, before any merging, and only read afterwards.
//! Resolution follows parent links while the current name is a known class;
//! the first unknown name is the top ancestor (typically a framework base
//! class such as `Controller`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{MagicError, Result};

/// Upper bound on inheritance hops before giving up
pub const MAX_ANCESTOR_DEPTH: usize = 64;

/// @acp:summary "Where a class was first declared and what it extends"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub parent: String,
    pub path: PathBuf,
    pub line: usize,
}

/// @acp:summary "Read-only className -> parent table"
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    entries: HashMap<String, ClassEntry>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. The first declaration of a name wins; on a clash the
    /// existing entry is returned and the index is left untouched.
    pub fn register(
        &mut self,
        name: &str,
        parent: &str,
        path: &Path,
        line: usize,
    ) -> std::result::Result<(), &ClassEntry> {
        if self.entries.contains_key(name) {
            return Err(&self.entries[name]);
        }
        self.entries.insert(
            name.to_string(),
            ClassEntry {
                parent: parent.to_string(),
                path: path.to_path_buf(),
                line,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ClassEntry> {
        self.entries.get(name)
    }

    /// Whether the class at `path:line` is the registered owner of `name`
    pub fn is_owner(&self, name: &str, path: &Path, line: usize) -> bool {
        self.entries
            .get(name)
            .map(|e| e.path == path && e.line == line)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// @acp:summary "Follow parent links to the first class outside the index"
    ///
    /// A name that is not in the index resolves to itself. A chain that
    /// revisits a class, or exceeds [`MAX_ANCESTOR_DEPTH`] hops, is an
    /// [`MagicError::AncestorCycle`].
    pub fn top_ancestor(&self, name: &str) -> Result<String> {
        let mut chain = vec![name.to_string()];
        let mut current = name;

        while let Some(entry) = self.entries.get(current) {
            let next = entry.parent.as_str();
            let revisits = chain.iter().any(|seen| seen == next);
            chain.push(next.to_string());

            if revisits || chain.len() > MAX_ANCESTOR_DEPTH {
                return Err(MagicError::AncestorCycle {
                    class: name.to_string(),
                    chain,
                });
            }
            current = next;
        }

        Ok(current.to_string())
    }
}
