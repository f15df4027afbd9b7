//! @acp:module "Errors"
//! @acp:summary "Error taxonomy for configuration, parsing, structure, format and IO failures"
//! @acp:domain cli
//! @acp:layer core
//!
//! Every failure is classified by [`ErrorScope`] so the pipeline can isolate it:
//! run-scoped errors abort setup, file-scoped errors drop one file, class-scoped
//! errors drop one class's patch.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, MagicError>;

/// How far a failure reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Fatal to the run's setup
    Run,
    /// Excludes one file from further processing
    File,
    /// Excludes one class's patch; sibling classes still proceed
    Class,
}

/// @acp:summary "All library errors"
#[derive(Debug, Error)]
pub enum MagicError {
    /// Unknown attribute requested or malformed configuration source
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The file could not be parsed into classes
    #[error("cannot parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Duplicate class visit or duplicate attribute within one traversal
    #[error("structural error: {0}")]
    Structural(String),

    /// A class transitively extends itself
    #[error("class {class} has a cyclic ancestor chain: {}", chain.join(" -> "))]
    AncestorCycle { class: String, chain: Vec<String> },

    /// Comment text cannot be decomposed into end-of-line-terminated lines
    #[error("format error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MagicError {
    pub fn configuration(message: impl Into<String>) -> Self {
        MagicError::Configuration(message.into())
    }

    pub fn structural(message: impl Into<String>) -> Self {
        MagicError::Structural(message.into())
    }

    pub fn format(line: usize, message: impl Into<String>) -> Self {
        MagicError::Format {
            line,
            message: message.into(),
        }
    }

    /// Classify the error for failure isolation
    pub fn scope(&self) -> ErrorScope {
        match self {
            MagicError::Configuration(_) | MagicError::Json(_) | MagicError::Yaml(_) => {
                ErrorScope::Run
            }
            MagicError::Parse { .. } | MagicError::Io(_) => ErrorScope::File,
            MagicError::Structural(_)
            | MagicError::AncestorCycle { .. }
            | MagicError::Format { .. } => ErrorScope::Class,
        }
    }
}
