#![forbid(unsafe_code)]

//! @acp:module "Magic Property Library"
//! @acp:summary "Keeps @property doc annotations of CakePHP classes in sync with their wiring"
//! @acp:domain cli
//! @acp:layer api
//! @acp:stability stable
//!
//! # cake-magic
//!
//! CakePHP 2 wires collaborators into controllers, components, helpers,
//! models and shells through list-valued properties (`$uses`, `$components`,
//! `$helpers`, `$belongsTo`, ...). The wired objects appear as magic
//! properties that IDEs cannot see. This crate reads those lists and adds a
//! matching `@property <Type> $<name>` line to each class's doc block.
//!
//! ## Features
//!
//! - **Fast Parsing**: Uses tree-sitter for PHP class extraction
//! - **Cross-file ancestry**: A class's role is decided by its top ancestor,
//!   wherever that ancestor is declared
//! - **Byte-exact rewrites**: Only doc block lines change; end-of-line style
//!   and indentation are preserved
//! - **Parallel**: Files are parsed and rewritten on a rayon pool
//!
//! ## Example
//!
//! ```rust,no_run
//! use magic::{discover_files, Config, PhpClassProvider, Pipeline, PipelineOptions};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let files = discover_files(&["app"], &config)?;
//!
//!     let provider = PhpClassProvider::new();
//!     let report = Pipeline::new(&provider, &config, PipelineOptions::default()).run(&files)?;
//!     println!("{} file(s) changed", report.changes.len());
//!
//!     Ok(())
//! }
//! ```

pub mod ancestry;
pub mod ast;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod pipeline;
pub mod scan;
pub mod source;
pub mod splice;

pub use ancestry::ClassIndex;
pub use ast::{ClassNode, ClassProvider, PhpClassProvider};
pub use config::{Config, TransformKind, TransformTable};
pub use error::{ErrorScope, MagicError, Result};
pub use extract::{AttributeExtractor, ExtractionResult};
pub use merge::{AnnotationBlock, MergeEngine, MergeOptions, Patch};
pub use pipeline::{Outcome, Pipeline, PipelineOptions, RunReport};
pub use scan::discover_files;
pub use source::{Encoding, SourceUnit};
pub use splice::apply_patches;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
