//! Configuration for the bindery binding generator.
//!
//! This crate provides:
//! - The `bindery.toml` format
//! - Wildcard include/exclude filters over symbols and header paths
//! - Parser argument assembly (configuration, command line, argument files)
//!
//! # Example
//!
//! ```toml
//! # bindery.toml
//! [symbols]
//! include = ["Urho3D::**"]
//! exclude = ["Urho3D::Detail::**"]
//!
//! [compiler]
//! std = "c++17"
//! includes = ["Source"]
//!
//! [generator]
//! refcounted_root = "Urho3D::RefCounted"
//! ```

mod args;
mod config;
mod error;
mod filter;

pub use args::{parse_args, read_args_file, ParserArgs};
pub use config::{
    BinderyConfig, CompilerConfig, GeneratorConfig, PropertyAccess, RulesConfig, CONFIG_FILE_NAME,
};
pub use error::{ConfigError, Result};
pub use filter::{wildcard_to_regex, Separator, SymbolFilter, WildcardSet};
