//! Header parsing and the declaration tree for the bindery generator.
//!
//! This crate provides:
//! - Parser adapters producing a raw tree shaped like clang's JSON AST dump
//! - The typed declaration tree ([`Ast`]) with its fully-qualified-name registry
//! - C++ type descriptors parsed from type spellings
//!
//! # Architecture
//!
//! ```text
//! Header → clang (JSON dump | libclang) → RawNode → TreeBuilder → Ast
//! ```

pub mod ast;
mod builder;
#[cfg(feature = "libclang")]
mod libclang;
mod parse;
pub mod raw;
pub mod types;

pub use ast::{
    AccessSpecifier, AliasDecl, Ast, AstNode, BaseSpecifier, DeclData, EnumDecl, FunctionDecl,
    NodeId, NodeKind, Param, RecordDecl, SourceLocation, TagKind, ValueDecl,
};
pub use builder::TreeBuilder;
#[cfg(feature = "libclang")]
pub use libclang::LibclangSource;
pub use parse::{parse_dump, AstSource, ClangJsonSource, DumpFileSource, CLANG_ENV, DEFAULT_CLANG, DUMP_SUFFIX};
pub use raw::RawNode;
pub use types::{CppType, TypeDesc};

use bindery_common::{Result, SourceMap};
use std::path::Path;

/// Parse one header with `source` and add its declaration tree to `ast`.
///
/// The header text is kept in `sources` for literal extraction.
pub fn load_header(
    ast: &mut Ast,
    sources: &mut SourceMap,
    source: &dyn AstSource,
    header: &Path,
) -> Result<NodeId> {
    let raw = source.parse(header)?;
    let id = sources.load(header)?;
    let mut builder = TreeBuilder::new(ast);
    if let Some(file) = sources.get(id) {
        builder = builder.with_source(file);
    }
    builder.build(header, raw)
}
