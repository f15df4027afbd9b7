//! @acp:module "Apply Command"
//! @acp:summary "Add missing @property annotations to CakePHP class doc blocks"
//! @acp:domain cli
//! @acp:layer handler
//!
//! Implements `cake-magic apply` over files and directories.

use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;
use similar::{Algorithm, TextDiff};

use crate::ast::PhpClassProvider;
use crate::config::Config;
use crate::pipeline::{FileChange, Outcome, Pipeline, PipelineOptions, RunReport};
use crate::scan::discover_files;

/// Options for the apply command
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Files or directories to process
    pub sources: Vec<PathBuf>,
    /// Report changes without writing
    pub dry_run: bool,
    /// Replace existing @property lines instead of merging
    pub remove: bool,
    /// Print a unified diff for every changed file
    pub diff: bool,
    /// Number of parallel workers
    pub workers: Option<usize>,
}

/// Execute the apply command
pub fn execute_apply(options: ApplyOptions, config: Config) -> Result<Outcome> {
    if let Some(num_workers) = options.workers.or(config.workers) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let files =
        discover_files(&options.sources, &config).context("failed to collect source files")?;
    println!(
        "{} Scanning {} PHP file(s)...",
        style("→").cyan(),
        files.len()
    );

    let provider = PhpClassProvider::new();
    let pipeline = Pipeline::new(
        &provider,
        &config,
        PipelineOptions {
            dry_run: options.dry_run,
            remove_unknown: options.remove,
        },
    );
    let report = pipeline.run(&files)?;

    if options.diff {
        for change in &report.changes {
            print!("{}", unified_diff(change));
        }
    }

    print_summary(&report, options.dry_run);
    Ok(report.outcome())
}

fn unified_diff(change: &FileChange) -> String {
    let name = change.path.display().to_string();
    TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_lines(&change.before, &change.after)
        .unified_diff()
        .header(&name, &name)
        .to_string()
}

fn print_summary(report: &RunReport, dry_run: bool) {
    for change in &report.changes {
        let verb = if dry_run { "Would update" } else { "Updated" };
        println!(
            "  {} {} {} ({})",
            style("✓").green(),
            verb,
            change.path.display(),
            change.classes.join(", ")
        );
    }
    for failure in &report.failures {
        let location = match &failure.class {
            Some(class) => format!("{} [{}]", failure.path.display(), class),
            None => failure.path.display().to_string(),
        };
        println!("  {} {}: {}", style("✗").red(), location, failure.error);
    }

    println!();
    println!("{}", style("Summary").bold());
    println!("  Files scanned:    {}", report.files_scanned);
    println!("  Classes indexed:  {}", report.classes_indexed);
    if dry_run {
        println!("  Files to change:  {}", report.changes.len());
    } else {
        println!("  Files changed:    {}", report.changes.len());
    }
    println!("  Classes patched:  {}", report.classes_patched());
    if !report.failures.is_empty() {
        println!(
            "  {}",
            style(format!("Failures:         {}", report.failures.len())).red()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_diff_shows_added_lines() {
        let change = FileChange {
            path: PathBuf::from("Post.php"),
            before: "<?php\nclass Post extends AppModel {}\n".into(),
            after: "<?php\n/**\n * @property User $User\n */\nclass Post extends AppModel {}\n"
                .into(),
            classes: vec!["Post".into()],
        };
        let diff = unified_diff(&change);
        assert!(diff.starts_with("--- Post.php\n+++ Post.php\n"));
        assert!(diff.contains("+ * @property User $User\n"));
    }

    #[test]
    fn test_apply_over_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PostsController.php");
        std::fs::write(
            &path,
            "<?php\nclass PostsController extends Controller {\n  public $components = ['Session'];\n}\n",
        )
        .unwrap();

        let outcome = execute_apply(
            ApplyOptions {
                sources: vec![dir.path().to_path_buf()],
                ..ApplyOptions::default()
            },
            Config::default(),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Changed);
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains(" * @property SessionComponent $Session\n"));
    }
}
