//! @acp:module "Annotation Pipeline"
//! @acp:summary "Two-phase run: parse every file and index classes, then merge and splice per file"
//! @acp:domain cli
//! @acp:layer service
//!
//! # Phases
//!
//! 1. **Index**: files are read and parsed in parallel; the class index is
//!    then filled sequentially in input order so the first declaration of a
//!    name wins deterministically
//! 2. **Rewrite**: files are processed in parallel against the frozen index.
//!    Each file gets its own traversal and writes only its own path
//!
//! Failures are isolated by [`ErrorScope`]: a file that cannot be read or
//! parsed is dropped, a class that cannot be merged loses only its patch.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::ancestry::ClassIndex;
use crate::ast::{ClassNode, ClassProvider};
use crate::config::Config;
use crate::error::{ErrorScope, MagicError, Result};
use crate::extract::{AttributeExtractor, Traversal};
use crate::merge::{MergeEngine, MergeOptions, Patch};
use crate::source::SourceUnit;
use crate::splice::apply_patches;

/// @acp:summary "Run-level switches coming from the command line"
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Compute changes without writing files
    pub dry_run: bool,
    /// Force remove mode regardless of configuration
    pub remove_unknown: bool,
}

/// A file whose content the run changed (or would change)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub before: String,
    pub after: String,
    /// Classes that received a patch, in document order
    pub classes: Vec<String>,
}

/// A failure isolated to one file or one class
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub class: Option<String>,
    pub error: MagicError,
}

/// Overall result, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to change, nothing failed
    Clean,
    /// At least one file changed
    Changed,
    /// At least one file or class failed
    Failed,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Clean => 0,
            Outcome::Changed => 1,
            Outcome::Failed => 2,
        }
    }
}

/// @acp:summary "What a run did"
#[derive(Debug, Default)]
pub struct RunReport {
    pub files_scanned: usize,
    pub classes_indexed: usize,
    pub changes: Vec<FileChange>,
    pub failures: Vec<Failure>,
}

impl RunReport {
    pub fn outcome(&self) -> Outcome {
        if !self.failures.is_empty() {
            Outcome::Failed
        } else if !self.changes.is_empty() {
            Outcome::Changed
        } else {
            Outcome::Clean
        }
    }

    pub fn classes_patched(&self) -> usize {
        self.changes.iter().map(|c| c.classes.len()).sum()
    }
}

struct ParsedFile {
    path: PathBuf,
    source: SourceUnit,
    classes: Vec<ClassNode>,
}

#[derive(Default)]
struct FileResult {
    change: Option<FileChange>,
    failures: Vec<Failure>,
}

/// @acp:summary "Drives one annotation run over a set of files"
pub struct Pipeline<'a, P: ClassProvider> {
    provider: &'a P,
    config: &'a Config,
    options: PipelineOptions,
}

impl<'a, P: ClassProvider> Pipeline<'a, P> {
    pub fn new(provider: &'a P, config: &'a Config, options: PipelineOptions) -> Self {
        Self {
            provider,
            config,
            options,
        }
    }

    /// @acp:summary "Run both phases over `files`"
    ///
    /// Returns `Err` only for run-scoped failures. Everything else is
    /// recorded in the report.
    pub fn run(&self, files: &[PathBuf]) -> Result<RunReport> {
        let mut report = RunReport {
            files_scanned: files.len(),
            ..RunReport::default()
        };

        let parsed: Vec<Result<ParsedFile>> = files
            .par_iter()
            .map(|path| self.parse_file(path))
            .collect();

        let mut ready = Vec::with_capacity(parsed.len());
        for (path, result) in files.iter().zip(parsed) {
            match result {
                Ok(file) => ready.push(file),
                Err(error) => {
                    tracing::error!(path = %path.display(), "{}", error);
                    report.failures.push(Failure {
                        path: path.clone(),
                        class: None,
                        error,
                    });
                }
            }
        }

        if !ready.is_empty() && ready.iter().all(|f| f.classes.is_empty()) {
            tracing::warn!(files = ready.len(), "no classes found");
        }

        let index = build_index(&ready);
        report.classes_indexed = index.len();
        tracing::debug!(classes = index.len(), files = ready.len(), "class index built");

        let extractor = AttributeExtractor::new(self.config.transforms.attribute_names());
        let engine = MergeEngine::new(
            &extractor,
            MergeOptions {
                remove_unknown: self.options.remove_unknown || self.config.remove_unknown,
            },
        );

        let results: Vec<Result<FileResult>> = ready
            .par_iter()
            .map(|file| self.rewrite_file(file, &index, &extractor, &engine))
            .collect();

        for result in results {
            let result = result?;
            report.changes.extend(result.change);
            report.failures.extend(result.failures);
        }

        Ok(report)
    }

    fn parse_file(&self, path: &Path) -> Result<ParsedFile> {
        let source = SourceUnit::read(path)?;
        let classes = if source.is_empty() {
            Vec::new()
        } else {
            let classes = self.provider.classes(path, &source)?;
            if classes.is_empty() {
                tracing::debug!(path = %path.display(), "no classes in file");
            }
            classes
        };
        Ok(ParsedFile {
            path: path.to_path_buf(),
            source,
            classes,
        })
    }

    fn rewrite_file(
        &self,
        file: &ParsedFile,
        index: &ClassIndex,
        extractor: &AttributeExtractor,
        engine: &MergeEngine<'_>,
    ) -> Result<FileResult> {
        let mut result = FileResult::default();
        let mut traversal = extractor.traversal();
        let mut patches = Vec::new();
        let mut patched = Vec::new();

        for class in &file.classes {
            if class.parent.is_none() {
                continue;
            }
            if !index.is_owner(&class.name, &file.path, class.start_line) {
                continue;
            }

            match self.patch_class(file, class, index, &mut traversal, engine) {
                Ok(Some(patch)) => {
                    patches.push(patch);
                    patched.push(class.name.clone());
                }
                Ok(None) => {}
                Err(error) if error.scope() == ErrorScope::Run => return Err(error),
                Err(error) => {
                    tracing::error!(
                        path = %file.path.display(),
                        class = %class.name,
                        line = class.start_line,
                        "{}",
                        error
                    );
                    result.failures.push(Failure {
                        path: file.path.clone(),
                        class: Some(class.name.clone()),
                        error,
                    });
                }
            }
        }

        if patches.is_empty() {
            return Ok(result);
        }

        let written = apply_patches(&file.source, patches).and_then(|updated| {
            if updated != file.source && !self.options.dry_run {
                updated.write(&file.path)?;
            }
            Ok(updated)
        });
        let updated = match written {
            Ok(updated) => updated,
            Err(error) => {
                tracing::error!(path = %file.path.display(), "{}", error);
                result.failures.push(Failure {
                    path: file.path.clone(),
                    class: None,
                    error,
                });
                return Ok(result);
            }
        };
        if updated == file.source {
            return Ok(result);
        }

        tracing::info!(
            path = %file.path.display(),
            classes = patched.len(),
            dry_run = self.options.dry_run,
            "doc blocks updated"
        );
        result.change = Some(FileChange {
            path: file.path.clone(),
            before: file.source.to_text(),
            after: updated.to_text(),
            classes: patched,
        });
        Ok(result)
    }

    fn patch_class(
        &self,
        file: &ParsedFile,
        class: &ClassNode,
        index: &ClassIndex,
        traversal: &mut Traversal<'_>,
        engine: &MergeEngine<'_>,
    ) -> Result<Option<Patch>> {
        let ancestor = index.top_ancestor(&class.name)?;
        let Some(rules) = self.config.transforms.rules_for(&ancestor) else {
            tracing::info!(
                path = %file.path.display(),
                class = %class.name,
                ancestor = %ancestor,
                "not a recognized class"
            );
            return Ok(None);
        };

        let extraction = traversal.visit(&file.path, class)?;
        engine.merge(&file.source, class, &extraction, rules)
    }
}

/// Register every class that has a parent; the first declaration wins
fn build_index(files: &[ParsedFile]) -> ClassIndex {
    let mut index = ClassIndex::new();
    for file in files {
        for class in &file.classes {
            let Some(parent) = &class.parent else {
                continue;
            };
            if let Err(first) = index.register(&class.name, parent, &file.path, class.start_line) {
                tracing::warn!(
                    class = %class.name,
                    path = %file.path.display(),
                    line = class.start_line,
                    first_path = %first.path.display(),
                    first_line = first.line,
                    "duplicate class declaration ignored"
                );
            }
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PhpClassProvider;
    use std::fs;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn run(files: &[PathBuf], options: PipelineOptions) -> RunReport {
        let config = Config::default();
        let provider = PhpClassProvider::new();
        Pipeline::new(&provider, &config, options).run(files).unwrap()
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(Outcome::Clean.exit_code(), 0);
        assert_eq!(Outcome::Changed.exit_code(), 1);
        assert_eq!(Outcome::Failed.exit_code(), 2);
        assert_eq!(RunReport::default().outcome(), Outcome::Clean);
    }

    #[test]
    fn test_ancestor_in_other_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = write(
            dir.path(),
            "AppController.php",
            "<?php\nclass AppController extends Controller {\n}\n",
        );
        let posts = write(
            dir.path(),
            "PostsController.php",
            "<?php\nclass PostsController extends AppController {\n  public $uses = array('Post');\n}\n",
        );

        let report = run(&[app, posts.clone()], PipelineOptions::default());
        assert_eq!(report.outcome(), Outcome::Changed);
        assert_eq!(report.classes_indexed, 2);
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].classes, vec!["PostsController"]);
        assert_eq!(
            fs::read_to_string(&posts).unwrap(),
            "<?php\n/**\n * @property Post $Post\n */\nclass PostsController extends AppController {\n  public $uses = array('Post');\n}\n"
        );
    }

    #[test]
    fn test_dry_run_leaves_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let text = "<?php\nclass Post extends AppModel {\n  public $belongsTo = array('User');\n}\nclass AppModel extends Model {}\n";
        let path = write(dir.path(), "Post.php", text);

        let report = run(
            &[path.clone()],
            PipelineOptions {
                dry_run: true,
                ..PipelineOptions::default()
            },
        );
        assert_eq!(report.outcome(), Outcome::Changed);
        assert!(report.changes[0].after.contains(" * @property User $User\n"));
        assert_eq!(fs::read_to_string(&path).unwrap(), text);
    }

    #[test]
    fn test_parse_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let broken = write(dir.path(), "Broken.php", "<?php\nclass {\n");
        let good = write(
            dir.path(),
            "Good.php",
            "<?php\nclass Good extends Shell {\n  var $uses = ['Post'];\n}\n",
        );

        let report = run(&[broken.clone(), good], PipelineOptions::default());
        assert_eq!(report.outcome(), Outcome::Failed);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, broken);
        assert_eq!(report.failures[0].error.scope(), ErrorScope::File);
        assert_eq!(report.changes.len(), 1);
    }

    #[test]
    fn test_class_failure_keeps_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "Cycle.php",
            "<?php\nclass A extends B {\n  var $uses = ['X'];\n}\nclass B extends A {}\nclass C extends Controller {\n  var $uses = ['Y'];\n}\n",
        );

        let report = run(&[path], PipelineOptions::default());
        assert_eq!(report.outcome(), Outcome::Failed);
        assert!(report
            .failures
            .iter()
            .all(|f| matches!(f.error, MagicError::AncestorCycle { .. })));
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].classes, vec!["C"]);
    }

    #[test]
    fn test_latin1_file_is_annotated_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Users.php");
        fs::write(
            &path,
            b"<?php\n/**\n * Author: J\xfcrgen\n */\nclass UsersController extends Controller {\n  var $uses = ['User'];\n}\n",
        )
        .unwrap();

        let report = run(&[path.clone()], PipelineOptions::default());
        assert_eq!(report.outcome(), Outcome::Changed);
        assert_eq!(
            fs::read(&path).unwrap(),
            b"<?php\n/**\n * Author: J\xfcrgen\n * @property User $User\n */\nclass UsersController extends Controller {\n  var $uses = ['User'];\n}\n".to_vec()
        );
    }

    #[test]
    fn test_second_run_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "Helper.php",
            "<?php\nclass FormatHelper extends Helper {\n  public $helpers = array('Html', 'Form');\n}\n",
        );

        let first = run(&[path.clone()], PipelineOptions::default());
        assert_eq!(first.outcome(), Outcome::Changed);
        let second = run(&[path], PipelineOptions::default());
        assert_eq!(second.outcome(), Outcome::Clean);
    }
}
