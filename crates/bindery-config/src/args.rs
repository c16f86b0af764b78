//! Parser arguments assembled from configuration and the command line.

use crate::config::BinderyConfig;
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};

/// Parser arguments given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ParserArgs {
    /// Include directories (`-I`).
    pub includes: Vec<PathBuf>,

    /// Preprocessor definitions (`-D`).
    pub defines: Vec<String>,

    /// Raw flags passed through unmodified.
    pub flags: Vec<String>,

    /// Files with additional arguments.
    pub args_files: Vec<PathBuf>,
}

impl ParserArgs {
    /// Final argument list: configuration first, then `-I`, `-D`, raw flags
    /// and finally the contents of argument files.
    pub fn resolve(&self, config: &BinderyConfig, root: &Path) -> Result<Vec<String>> {
        let mut args = config.compiler_args(root);
        args.extend(self.includes.iter().map(|i| format!("-I{}", i.display())));
        args.extend(self.defines.iter().map(|d| format!("-D{d}")));
        args.extend(self.flags.iter().cloned());
        for file in &self.args_files {
            args.extend(read_args_file(file)?);
        }
        Ok(args)
    }
}

/// Read an argument file: whitespace-separated arguments, `#` starts a
/// comment that runs to the end of the line.
pub fn read_args_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_args(&content))
}

pub fn parse_args(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        })
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect()
}
