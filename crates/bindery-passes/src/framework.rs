//! Pass framework: lifecycle callbacks and the tree walk.
//!
//! A [`Pass`] is instantiated once per run. The [`Pipeline`] runs passes in
//! order; each pass sees every file (sorted by path) before the next pass
//! starts:
//!
//! ```text
//! for pass in passes:
//!     on_begin
//!     for file in files:
//!         on_file_begin, walk(root), on_file_end
//!     on_end
//! ```
//!
//! State a pass accumulates (a base-class graph, the subsystems it has seen)
//! therefore covers all files by the time `on_end` runs. Findings later
//! passes depend on go into [`Facts`].

use crate::settings::Settings;
use crate::sink::{Category, OutputSink};
use bindery_clang::{Ast, NodeId};
use bindery_common::Result;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Direction of a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitEvent {
    Enter,
    /// Sent after the children of container kinds have been walked.
    Leave,
}

/// What the walker does after an `Enter` visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitResult {
    Continue,
    /// Don't descend, and don't send `Leave`.
    SkipChildren,
    /// Remove the node (and its subtree) from the tree.
    Remove,
}

/// Findings shared between passes, owned by the run.
#[derive(Debug, Default, Clone)]
pub struct Facts {
    /// Enums marked as bitmasks
    pub flag_enums: BTreeSet<String>,
    /// Records used as secondary bases (mixins)
    pub interfaces: BTreeSet<String>,
    /// Accessors renamed away by property synthesis
    pub hidden_accessors: BTreeSet<String>,
}

/// One parsed header.
#[derive(Debug, Clone)]
pub struct FileUnit {
    pub root: NodeId,
    pub path: PathBuf,
    /// Path relative to the input root
    pub relative: PathBuf,
    pub subsystem: String,
}

impl FileUnit {
    pub fn new(root: NodeId, path: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        let relative = relative.into();
        Self {
            root,
            path: path.into(),
            subsystem: subsystem_of(&relative),
            relative,
        }
    }
}

/// First directory component of a relative path, empty for files at the root.
pub fn subsystem_of(relative: &Path) -> String {
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(dir)), Some(_)) => dir.to_string_lossy().into_owned(),
        _ => String::new(),
    }
}

/// Everything a pass callback may read or change.
pub struct PassContext<'a> {
    pub ast: &'a mut Ast,
    pub sink: &'a mut OutputSink,
    pub facts: &'a mut Facts,
    pub settings: &'a Settings,
    files: &'a [FileUnit],
    current: Option<usize>,
}

impl<'a> PassContext<'a> {
    pub fn new(
        ast: &'a mut Ast,
        sink: &'a mut OutputSink,
        facts: &'a mut Facts,
        settings: &'a Settings,
        files: &'a [FileUnit],
    ) -> Self {
        Self {
            ast,
            sink,
            facts,
            settings,
            files,
            current: None,
        }
    }

    /// File being walked; `None` in `on_begin` and `on_end`.
    pub fn file(&self) -> Option<&'a FileUnit> {
        let files: &'a [FileUnit] = self.files;
        self.current.map(move |i| &files[i])
    }

    /// Subsystem of the file being walked.
    pub fn subsystem(&self) -> &'a str {
        self.file().map(|f| f.subsystem.as_str()).unwrap_or("")
    }

    /// Subsystem of the file a node was parsed from.
    pub fn subsystem_of_node(&self, id: NodeId) -> &'a str {
        let root = self.ast.root_of(id);
        let files: &'a [FileUnit] = self.files;
        files
            .iter()
            .find(|f| f.root == root)
            .map(|f| f.subsystem.as_str())
            .unwrap_or("")
    }

    /// Write a directive to the current file's subsystem.
    pub fn emit(&mut self, category: Category, line: &str) -> Result<()> {
        let subsystem = self.subsystem();
        self.sink.write_line(subsystem, category, line)
    }

    /// Write a directive to an explicit subsystem.
    pub fn emit_to(&mut self, subsystem: &str, category: Category, line: &str) -> Result<()> {
        self.sink.write_line(subsystem, category, line)
    }
}

/// A stateful visitor over the declaration tree.
pub trait Pass {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn on_begin(&mut self, _cx: &mut PassContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_file_begin(&mut self, _cx: &mut PassContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called for every live node. `Leave` is only sent for kinds where
    /// [`bindery_clang::NodeKind::needs_leave`] holds; its result is ignored.
    fn visit(&mut self, cx: &mut PassContext<'_>, node: NodeId, event: VisitEvent)
        -> Result<VisitResult>;

    fn on_file_end(&mut self, _cx: &mut PassContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_end(&mut self, _cx: &mut PassContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Walk `node` and its subtree with `pass`.
///
/// Children are walked from a snapshot taken after the `Enter` visit, so a
/// pass may remove nodes anywhere during the walk; removed nodes are skipped
/// when their turn comes.
pub fn walk(pass: &mut dyn Pass, cx: &mut PassContext<'_>, node: NodeId) -> Result<()> {
    if cx.ast.is_removed(node) {
        return Ok(());
    }

    match pass.visit(cx, node, VisitEvent::Enter)? {
        VisitResult::Continue => {}
        VisitResult::SkipChildren => return Ok(()),
        VisitResult::Remove => {
            cx.ast.remove(node);
            return Ok(());
        }
    }

    let children = cx.ast.children(node).to_vec();
    for child in children {
        if !cx.ast.is_removed(child) {
            walk(pass, cx, child)?;
        }
    }

    if cx.ast.node(node).kind.needs_leave() && !cx.ast.is_removed(node) {
        pass.visit(cx, node, VisitEvent::Leave)?;
    }
    Ok(())
}

/// Ordered list of passes for one run.
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Self {
        Self { passes }
    }

    /// The full generator pipeline.
    pub fn standard() -> Self {
        Self::new(crate::passes::default_passes())
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass over every file. Consumes the pipeline: pass state
    /// belongs to exactly one run.
    pub fn run(
        mut self,
        ast: &mut Ast,
        files: &[FileUnit],
        facts: &mut Facts,
        sink: &mut OutputSink,
        settings: &Settings,
    ) -> Result<()> {
        let mut cx = PassContext::new(ast, sink, facts, settings, files);
        for pass in &mut self.passes {
            run_pass(pass.as_mut(), &mut cx)?;
        }
        Ok(())
    }
}

/// Run one pass's whole lifecycle over every file of the context.
pub fn run_pass(pass: &mut dyn Pass, cx: &mut PassContext<'_>) -> Result<()> {
    let files = cx.files;
    info!(pass = pass.name(), files = files.len(), "running pass");

    cx.current = None;
    pass.on_begin(cx)?;
    for (index, unit) in files.iter().enumerate() {
        debug!(pass = pass.name(), file = %unit.relative.display(), "walking");
        cx.current = Some(index);
        pass.on_file_begin(cx)?;
        walk(pass, cx, unit.root)?;
        pass.on_file_end(cx)?;
    }
    cx.current = None;
    pass.on_end(cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use bindery_clang::NodeKind;

    /// Records every visit; removes nodes named in `remove`.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        remove: Vec<&'static str>,
        remove_sibling_of: Option<&'static str>,
        skip: Vec<&'static str>,
    }

    impl Pass for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn on_begin(&mut self, _cx: &mut PassContext<'_>) -> Result<()> {
            self.events.push("begin".to_string());
            Ok(())
        }

        fn on_file_begin(&mut self, cx: &mut PassContext<'_>) -> Result<()> {
            let file = cx.file().map(|f| f.relative.display().to_string()).unwrap_or_default();
            self.events.push(format!("file {file}"));
            Ok(())
        }

        fn visit(
            &mut self,
            cx: &mut PassContext<'_>,
            node: NodeId,
            event: VisitEvent,
        ) -> Result<VisitResult> {
            let name = cx.ast.node(node).name.to_string();
            self.events.push(format!("{event:?} {name}"));
            if event == VisitEvent::Leave {
                return Ok(VisitResult::Continue);
            }
            if Some(name.as_str()) == self.remove_sibling_of {
                if let Some(next) = cx.ast.next_sibling(node) {
                    cx.ast.remove(next);
                }
            }
            if self.remove.contains(&name.as_str()) {
                return Ok(VisitResult::Remove);
            }
            if self.skip.contains(&name.as_str()) {
                return Ok(VisitResult::SkipChildren);
            }
            Ok(VisitResult::Continue)
        }

        fn on_end(&mut self, _cx: &mut PassContext<'_>) -> Result<()> {
            self.events.push("end".to_string());
            Ok(())
        }
    }

    fn tree() -> Fixture {
        let mut fx = Fixture::new();
        let file = fx.file("Scene/Node.h");
        let ns = fx.namespace(file, "Urho3D");
        let node = fx.class(ns, "Node", &[]);
        fx.int_method(node, "GetId");
        fx.field(node, "id_", "int");
        fx.add(ns, NodeKind::Variable, "kMaxNodes");
        fx
    }

    #[test]
    fn test_enter_and_leave_order() {
        let mut fx = tree();
        let mut recorder = Recorder::default();
        fx.run_pass(&mut recorder).unwrap();
        assert_eq!(
            recorder.events,
            vec![
                "begin",
                "file Scene/Node.h",
                "Enter ",
                "Enter Urho3D",
                "Enter Node",
                "Enter GetId",
                "Leave GetId",
                "Enter id_",
                "Leave Node",
                "Enter kMaxNodes",
                "Leave Urho3D",
                "end",
            ]
        );
    }

    #[test]
    fn test_skip_children_suppresses_leave() {
        let mut fx = tree();
        let mut recorder = Recorder {
            skip: vec!["Node"],
            ..Default::default()
        };
        fx.run_pass(&mut recorder).unwrap();
        assert!(recorder.events.contains(&"Enter Node".to_string()));
        assert!(!recorder.events.contains(&"Enter GetId".to_string()));
        assert!(!recorder.events.contains(&"Leave Node".to_string()));
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut fx = tree();
        let mut recorder = Recorder {
            remove: vec!["Node"],
            ..Default::default()
        };
        fx.run_pass(&mut recorder).unwrap();
        assert!(!recorder.events.contains(&"Enter GetId".to_string()));
        assert!(recorder.events.contains(&"Enter kMaxNodes".to_string()));
        assert!(fx.ast.lookup("Urho3D::Node").is_none());
    }

    #[test]
    fn test_removing_a_sibling_mid_walk_keeps_the_rest() {
        let mut fx = tree();
        // Removing `id_` while visiting `GetId` must not skip anything else.
        let mut recorder = Recorder {
            remove_sibling_of: Some("GetId"),
            ..Default::default()
        };
        fx.run_pass(&mut recorder).unwrap();
        assert!(!recorder.events.contains(&"Enter id_".to_string()));
        assert!(recorder.events.contains(&"Leave Node".to_string()));
        assert!(recorder.events.contains(&"Enter kMaxNodes".to_string()));
    }

    #[test]
    fn test_subsystem_of() {
        assert_eq!(subsystem_of(Path::new("Scene/Node.h")), "Scene");
        assert_eq!(subsystem_of(Path::new("Scene/Detail/Helper.h")), "Scene");
        assert_eq!(subsystem_of(Path::new("Urho3D.h")), "");
    }

    #[test]
    fn test_pipeline_runs_pass_major() {
        let mut fx = Fixture::new();
        fx.file("A/One.h");
        fx.file("B/Two.h");

        struct Tracer(std::rc::Rc<std::cell::RefCell<Vec<String>>>, &'static str);
        impl Pass for Tracer {
            fn name(&self) -> &'static str {
                self.1
            }
            fn on_file_begin(&mut self, cx: &mut PassContext<'_>) -> Result<()> {
                self.0.borrow_mut().push(format!("{} {}", self.1, cx.subsystem()));
                Ok(())
            }
            fn visit(&mut self, _: &mut PassContext<'_>, _: NodeId, _: VisitEvent) -> Result<VisitResult> {
                Ok(VisitResult::Continue)
            }
        }

        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            Box::new(Tracer(log.clone(), "first")),
            Box::new(Tracer(log.clone(), "second")),
        ]);
        fx.run(pipeline).unwrap();
        assert_eq!(*log.borrow(), vec!["first A", "first B", "second A", "second B"]);
    }
}
