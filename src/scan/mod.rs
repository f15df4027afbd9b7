//! @acp:module "Source Discovery"
//! @acp:summary "Resolves command-line sources into the ordered list of PHP files to process"
//! @acp:domain cli
//! @acp:layer service

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{MagicError, Result};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// @acp:summary "Compiled include/exclude globs"
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl FileFilter {
    pub fn new(config: &Config) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Pattern>> {
            patterns
                .iter()
                .map(|p| {
                    Pattern::new(p).map_err(|e| {
                        MagicError::configuration(format!("invalid glob {:?}: {}", p, e))
                    })
                })
                .collect()
        };
        Ok(Self {
            include: compile(&config.include)?,
            exclude: compile(&config.exclude)?,
        })
    }

    /// Match a path relative to the walked root
    pub fn accepts(&self, relative: &str) -> bool {
        let included = self.include.is_empty()
            || self
                .include
                .iter()
                .any(|p| p.matches_with(relative, MATCH_OPTIONS));
        let excluded = self
            .exclude
            .iter()
            .any(|p| p.matches_with(relative, MATCH_OPTIONS));
        included && !excluded
    }
}

/// @acp:summary "Expand files and directories into a de-duplicated file list"
///
/// Files named explicitly are always taken. Directories are walked in sorted
/// order and filtered by the configured globs. A path reached twice is kept
/// once, at its first position. A source that does not exist is an IO error.
pub fn discover_files<P: AsRef<Path>>(sources: &[P], config: &Config) -> Result<Vec<PathBuf>> {
    let filter = FileFilter::new(config)?;
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    let mut push = |path: PathBuf, files: &mut Vec<PathBuf>| {
        let key = path.canonicalize().unwrap_or_else(|_| path.clone());
        if seen.insert(key) {
            files.push(path);
        }
    };

    for source in sources {
        let root = source.as_ref();
        let metadata = std::fs::metadata(root).map_err(|e| {
            MagicError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", root.display(), e),
            ))
        })?;

        if !metadata.is_dir() {
            push(root.to_path_buf(), &mut files);
            continue;
        }

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let relative = entry
                .path()
                .strip_prefix(root)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| entry.path().to_string_lossy().to_string());
            if filter.accepts(&relative) {
                push(entry.into_path(), &mut files);
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<?php\n").unwrap();
        path
    }

    #[test]
    fn test_directory_walk_applies_globs() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "Controller/PostsController.php");
        touch(dir.path(), "Controller/README.md");
        touch(dir.path(), "vendor/lib/Thing.php");
        let b = touch(dir.path(), "Model/Post.php");

        let files = discover_files(&[dir.path()], &Config::default()).unwrap();
        assert_eq!(files, vec![a, b]);
    }

    #[test]
    fn test_explicit_files_bypass_globs_and_dedupe() {
        let dir = tempfile::tempdir().unwrap();
        let template = touch(dir.path(), "View/index.ctp");
        let model = touch(dir.path(), "Model/Post.php");

        let files = discover_files(
            &[template.clone(), model.clone(), dir.path().to_path_buf()],
            &Config::default(),
        )
        .unwrap();
        assert_eq!(files, vec![template, model]);
    }

    #[test]
    fn test_missing_source_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_files(&[dir.path().join("nope")], &Config::default()).unwrap_err();
        assert!(matches!(err, MagicError::Io(_)));
    }

    #[test]
    fn test_filter_matches_relative_paths() {
        let filter = FileFilter::new(&Config::default()).unwrap();
        assert!(filter.accepts("app/Controller/AppController.php"));
        assert!(!filter.accepts("app/tmp/cache/x.php"));
        assert!(!filter.accepts("notes.txt"));
    }
}
