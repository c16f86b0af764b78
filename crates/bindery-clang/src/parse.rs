//! Parser adapters producing raw declaration trees.

use crate::raw::RawNode;
use bindery_common::{GenError, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Environment variable overriding the clang executable.
pub const CLANG_ENV: &str = "BINDERY_CLANG";

/// Default clang executable.
pub const DEFAULT_CLANG: &str = "clang++";

/// Suffix of pre-generated dump files next to their headers.
pub const DUMP_SUFFIX: &str = ".ast.json";

/// Anything that can turn a header into a raw declaration tree.
pub trait AstSource {
    /// Parse one header. Failure is fatal for the whole run.
    fn parse(&self, header: &Path) -> Result<RawNode>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Runs clang and reads its JSON AST dump from stdout.
#[derive(Debug, Clone)]
pub struct ClangJsonSource {
    program: String,
    args: Vec<String>,
}

impl ClangJsonSource {
    /// Create a source passing `args` (include paths, defines, flags) to clang
    /// unmodified.
    pub fn new(args: Vec<String>) -> Self {
        let program = std::env::var(CLANG_ENV).unwrap_or_else(|_| DEFAULT_CLANG.to_string());
        Self { program, args }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list for one header.
    pub fn command_args(&self, header: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-x",
            "c++-header",
            "-fsyntax-only",
            "-Xclang",
            "-ast-dump=json",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.extend(self.args.iter().map(OsString::from));
        args.push(header.as_os_str().to_owned());
        args
    }
}

impl AstSource for ClangJsonSource {
    fn parse(&self, header: &Path) -> Result<RawNode> {
        debug!(program = %self.program, header = %header.display(), "running parser");
        let output = Command::new(&self.program)
            .args(self.command_args(header))
            .output()
            .map_err(|e| GenError::ParserUnavailable {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() || has_error_diagnostic(&stderr) {
            return Err(GenError::parse(header, first_errors(&stderr)));
        }
        if !stderr.trim().is_empty() {
            warn!(header = %header.display(), "parser reported warnings");
            debug!("{}", stderr.trim_end());
        }

        parse_dump(header, &output.stdout)
    }

    fn name(&self) -> &'static str {
        "clang"
    }
}

/// Reads `<header>.ast.json` files produced ahead of time by
/// `clang++ -Xclang -ast-dump=json`.
#[derive(Debug, Clone, Default)]
pub struct DumpFileSource;

impl DumpFileSource {
    pub fn new() -> Self {
        Self
    }

    pub fn dump_path(header: &Path) -> PathBuf {
        let mut path = header.as_os_str().to_owned();
        path.push(DUMP_SUFFIX);
        PathBuf::from(path)
    }
}

impl AstSource for DumpFileSource {
    fn parse(&self, header: &Path) -> Result<RawNode> {
        let path = Self::dump_path(header);
        let bytes = std::fs::read(&path).map_err(|e| GenError::io(&path, e))?;
        parse_dump(header, &bytes)
    }

    fn name(&self) -> &'static str {
        "dump"
    }
}

/// Decode a clang JSON AST dump. Dumps nest deeply, so serde_json's recursion
/// limit is lifted.
pub fn parse_dump(header: &Path, bytes: &[u8]) -> Result<RawNode> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    de.disable_recursion_limit();
    let node = RawNode::deserialize(&mut de).map_err(|e| GenError::Dump {
        file: header.to_path_buf(),
        message: e.to_string(),
    })?;
    de.end().map_err(|e| GenError::Dump {
        file: header.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(node)
}

fn has_error_diagnostic(stderr: &str) -> bool {
    stderr
        .lines()
        .any(|line| line.contains(" error: ") || line.starts_with("error: "))
}

fn first_errors(stderr: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .filter(|line| line.contains("error:"))
        .take(5)
        .collect();
    if errors.is_empty() {
        stderr.trim().to_string()
    } else {
        errors.join("\n")
    }
}
