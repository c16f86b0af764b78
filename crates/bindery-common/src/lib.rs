//! Shared building blocks for the bindery binding generator.
//!
//! - [`naming`]: identifier splitting and idiomatic casing
//! - [`source`]: header files kept in memory for literal extraction
//! - [`error`]: the fatal error taxonomy of a generation run

pub mod error;
pub mod naming;
mod source;

pub use error::{GenError, Result};
pub use naming::{join_idiomatic, split_identifier, strip_owner_prefix, to_idiomatic_case};
pub use source::{is_header_path, SourceFile, SourceId, SourceMap, HEADER_EXTENSIONS};
