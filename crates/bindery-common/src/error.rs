//! Error taxonomy for a generation run.
//!
//! Every variant is fatal: it stops generation and turns into a non-zero
//! exit status. Recoverable conditions (unknown types, ambiguous property
//! pairs, literal extraction failures) never reach this type; passes log
//! them with `tracing` and degrade instead.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the generator.
pub type Result<T> = std::result::Result<T, GenError>;

#[derive(Debug, Error, Diagnostic)]
pub enum GenError {
    /// The external parser could not produce a tree for a header.
    #[error("failed to parse {}: {message}", file.display())]
    #[diagnostic(code(bindery::parse), help("check the include paths and defines passed to the parser"))]
    Parse { file: PathBuf, message: String },

    /// The external parser could not be started at all.
    #[error("failed to run parser `{program}`: {message}")]
    #[diagnostic(code(bindery::parser_unavailable))]
    ParserUnavailable { program: String, message: String },

    /// A parser dump was readable but not well formed.
    #[error("malformed AST dump for {}: {message}", file.display())]
    #[diagnostic(code(bindery::dump))]
    Dump { file: PathBuf, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    #[diagnostic(code(bindery::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A declaration that must have a fully-qualified name has none.
    #[error("expected a fully-qualified name for {kind} `{name}`")]
    #[diagnostic(code(bindery::missing_fqn), help("this is a tree builder bug, not an input problem"))]
    MissingQualifiedName { kind: String, name: String },

    /// Two type definitions claim the same fully-qualified name.
    #[error("`{fqn}` is defined twice ({first} and {second})")]
    #[diagnostic(code(bindery::duplicate_definition))]
    DuplicateDefinition {
        fqn: String,
        first: String,
        second: String,
    },

    /// A directive was written after the output sink was finished.
    #[error("output channel `{channel}` written after the run finished")]
    #[diagnostic(code(bindery::sink_closed))]
    SinkClosed { channel: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(bindery::config))]
    Config(String),
}

impl GenError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GenError::Parse {
            file: file.into(),
            message: message.into(),
        }
    }
}
