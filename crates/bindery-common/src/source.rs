use crate::error::{GenError, Result};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Unique identifier for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u32);

impl SourceId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// File extensions treated as C++ headers.
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hh", "hxx", "h++"];

/// Whether `path` looks like a C++ header.
pub fn is_header_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| HEADER_EXTENSIONS.contains(&ext))
}

/// A source file with its contents.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub path: PathBuf,
    pub content: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    pub fn new(id: SourceId, path: PathBuf, content: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i as u32 + 1))
            .collect();

        Self {
            id,
            path,
            content,
            line_starts,
        }
    }

    /// Get line and column (0-indexed) from byte offset.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let col = offset - self.line_starts[line];
        (line as u32, col)
    }

    /// Get the content of a specific line (0-indexed).
    pub fn line(&self, line: u32) -> Option<&str> {
        let start = *self.line_starts.get(line as usize)? as usize;
        let end = self
            .line_starts
            .get(line as usize + 1)
            .map(|&e| e as usize)
            .unwrap_or(self.content.len());
        Some(self.content[start..end].trim_end_matches('\n'))
    }

    /// Byte range `[start, end)` of the file, if it lies on char boundaries.
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        if start > end {
            return None;
        }
        self.content.get(start..end)
    }
}

/// Registry of all source files read during a run.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
    path_to_id: FxHashMap<PathBuf, SourceId>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file with already-known contents.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: String) -> SourceId {
        let path = path.as_ref().to_path_buf();
        if let Some(&id) = self.path_to_id.get(&path) {
            return id;
        }

        let id = SourceId(self.files.len() as u32);
        self.files.push(SourceFile::new(id, path.clone(), content));
        self.path_to_id.insert(path, id);
        id
    }

    /// Read a file from disk (once) and return its id.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<SourceId> {
        let path = path.as_ref();
        if let Some(&id) = self.path_to_id.get(path) {
            return Ok(id);
        }
        let content = std::fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
        Ok(self.add_file(path, content))
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn get_by_path(&self, path: impl AsRef<Path>) -> Option<&SourceFile> {
        let id = self.path_to_id.get(path.as_ref())?;
        self.get(*id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup() {
        let file = SourceFile::new(
            SourceId(0),
            PathBuf::from("a.h"),
            "const int A = 1;\nconst int B = 2;\n".to_string(),
        );
        assert_eq!(file.line(1), Some("const int B = 2;"));
        assert_eq!(file.line_col(17), (1, 0));
        assert_eq!(file.slice(6, 9), Some("int"));
        assert_eq!(file.slice(9, 6), None);
    }

    #[test]
    fn test_add_file_is_idempotent() {
        let mut map = SourceMap::new();
        let a = map.add_file("a.h", "x".to_string());
        let b = map.add_file("a.h", "y".to_string());
        assert_eq!(a, b);
        assert_eq!(map.get(a).map(|f| f.content.as_str()), Some("x"));
    }

    #[test]
    fn test_header_detection() {
        assert!(is_header_path(Path::new("Scene/Node.h")));
        assert!(is_header_path(Path::new("Math/Vector3.hpp")));
        assert!(!is_header_path(Path::new("Scene/Node.cpp")));
    }
}
