//! Output channels, one per subsystem and directive category.
//!
//! Channels are opened lazily on the first write and closed together by
//! [`OutputSink::finish`]. A sink that is dropped without being finished
//! finishes itself, so output is flushed on error paths too.

use bindery_common::{GenError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension of generated directive files.
pub const OUTPUT_EXTENSION: &str = "i";

/// Kind of directives a channel holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Constants,
    Renames,
    Ignores,
    Enums,
    Properties,
    RefCounted,
    Interfaces,
    Events,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Constants,
        Category::Renames,
        Category::Ignores,
        Category::Enums,
        Category::Properties,
        Category::RefCounted,
        Category::Interfaces,
        Category::Events,
    ];

    /// File stem of the category's channel.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Constants => "_constants",
            Category::Renames => "_renames",
            Category::Ignores => "_ignores",
            Category::Enums => "_enums",
            Category::Properties => "_properties",
            Category::RefCounted => "_refcounted",
            Category::Interfaces => "_interfaces",
            Category::Events => "_events",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<subsystem>/<category>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelKey {
    pub subsystem: String,
    pub category: Category,
}

impl ChannelKey {
    pub fn new(subsystem: impl Into<String>, category: Category) -> Self {
        Self {
            subsystem: subsystem.into(),
            category,
        }
    }

    /// Path of the channel's file below the output directory.
    pub fn relative_path(&self) -> PathBuf {
        let file = format!("{}.{OUTPUT_EXTENSION}", self.category);
        if self.subsystem.is_empty() {
            PathBuf::from(file)
        } else {
            Path::new(&self.subsystem).join(file)
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subsystem, self.category)
    }
}

enum Channel {
    File { path: PathBuf, writer: BufWriter<File> },
    Memory(String),
}

impl Channel {
    fn write_line(&mut self, line: &str) -> Result<()> {
        match self {
            Channel::File { path, writer } => {
                writeln!(writer, "{line}").map_err(|e| GenError::io(path.as_path(), e))
            }
            Channel::Memory(buffer) => {
                buffer.push_str(line);
                buffer.push('\n');
                Ok(())
            }
        }
    }
}

enum Target {
    Directory(PathBuf),
    Memory,
}

impl Target {
    fn open(&self, key: &ChannelKey) -> Result<Channel> {
        match self {
            Target::Directory(root) => {
                let path = root.join(key.relative_path());
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| GenError::io(parent, e))?;
                }
                let file = File::create(&path).map_err(|e| GenError::io(&path, e))?;
                debug!(channel = %key, path = %path.display(), "opened output channel");
                Ok(Channel::File {
                    path,
                    writer: BufWriter::new(file),
                })
            }
            Target::Memory => Ok(Channel::Memory(String::new())),
        }
    }
}

/// Destination of every directive written during a run.
pub struct OutputSink {
    target: Target,
    channels: BTreeMap<ChannelKey, Channel>,
    written: Vec<PathBuf>,
    finished: bool,
}

impl OutputSink {
    /// Write channels as files below `root`.
    pub fn to_directory(root: impl Into<PathBuf>) -> Self {
        Self::with_target(Target::Directory(root.into()))
    }

    /// Keep channels in memory; read them back with [`OutputSink::contents`].
    pub fn in_memory() -> Self {
        Self::with_target(Target::Memory)
    }

    fn with_target(target: Target) -> Self {
        Self {
            target,
            channels: BTreeMap::new(),
            written: Vec::new(),
            finished: false,
        }
    }

    /// Append one line to a channel, opening it on first use.
    pub fn write_line(&mut self, subsystem: &str, category: Category, line: &str) -> Result<()> {
        let key = ChannelKey::new(subsystem, category);
        if self.finished {
            return Err(GenError::SinkClosed {
                channel: key.to_string(),
            });
        }
        if !self.channels.contains_key(&key) {
            let channel = self.target.open(&key)?;
            self.channels.insert(key.clone(), channel);
        }
        match self.channels.get_mut(&key) {
            Some(channel) => channel.write_line(line),
            None => Ok(()),
        }
    }

    /// Flush and close every channel.
    ///
    /// Only the first call does anything. All channels are closed even if
    /// flushing one of them fails; the first failure is returned.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let mut first_error = None;
        for (key, channel) in std::mem::take(&mut self.channels) {
            match channel {
                Channel::File { path, mut writer } => {
                    if let Err(e) = writer.flush() {
                        first_error.get_or_insert(GenError::io(&path, e));
                    }
                    self.written.push(path);
                }
                memory @ Channel::Memory(_) => {
                    self.channels.insert(key, memory);
                }
            }
        }
        debug!(files = self.written.len(), "output channels closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Files written so far, in channel order. Filled in by [`OutputSink::finish`].
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    /// Text of an in-memory channel.
    pub fn contents(&self, subsystem: &str, category: Category) -> Option<&str> {
        match self.channels.get(&ChannelKey::new(subsystem, category))? {
            Channel::Memory(buffer) => Some(buffer),
            Channel::File { .. } => None,
        }
    }

    /// Every in-memory channel keyed by `<subsystem>/<category>`.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.channels
            .iter()
            .filter_map(|(key, channel)| match channel {
                Channel::Memory(buffer) => Some((key.to_string(), buffer.clone())),
                Channel::File { .. } => None,
            })
            .collect()
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(error = %e, "failed to close output channels");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_paths() {
        let key = ChannelKey::new("Scene", Category::Constants);
        assert_eq!(key.to_string(), "Scene/_constants");
        assert_eq!(key.relative_path(), PathBuf::from("Scene/_constants.i"));
        let key = ChannelKey::new("", Category::Events);
        assert_eq!(key.relative_path(), PathBuf::from("_events.i"));
    }

    #[test]
    fn test_memory_channels() {
        let mut sink = OutputSink::in_memory();
        sink.write_line("Scene", Category::Renames, "%rename(A) X::a;").unwrap();
        sink.write_line("Scene", Category::Renames, "%rename(B) X::b;").unwrap();
        sink.write_line("", Category::Ignores, "%ignore Y;").unwrap();
        sink.finish().unwrap();

        assert_eq!(
            sink.contents("Scene", Category::Renames),
            Some("%rename(A) X::a;\n%rename(B) X::b;\n")
        );
        assert_eq!(sink.contents("", Category::Ignores), Some("%ignore Y;\n"));
        assert!(sink.contents("Scene", Category::Ignores).is_none());
        assert_eq!(sink.snapshot().len(), 2);
    }

    #[test]
    fn test_files_are_opened_lazily_and_closed_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = OutputSink::to_directory(dir.path());
        sink.write_line("Scene", Category::Constants, "%ignore Urho3D::kMax;").unwrap();
        sink.write_line("", Category::RefCounted, "%refobject Urho3D::Node \"AddRef\";").unwrap();
        sink.finish().unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.written_files().len(), 2);
        let constants = fs::read_to_string(dir.path().join("Scene/_constants.i")).unwrap();
        assert_eq!(constants, "%ignore Urho3D::kMax;\n");
        assert!(dir.path().join("_refcounted.i").is_file());
        assert!(!dir.path().join("Scene/_renames.i").exists());
    }

    #[test]
    fn test_write_after_finish_fails() {
        let mut sink = OutputSink::in_memory();
        sink.finish().unwrap();
        let err = sink.write_line("Scene", Category::Enums, "x").unwrap_err();
        assert!(matches!(err, GenError::SinkClosed { .. }));
    }

    #[test]
    fn test_drop_flushes_files() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut sink = OutputSink::to_directory(dir.path());
            sink.write_line("IO", Category::Events, "%}").unwrap();
        }
        let events = fs::read_to_string(dir.path().join("IO/_events.i")).unwrap();
        assert_eq!(events, "%}\n");
    }
}
