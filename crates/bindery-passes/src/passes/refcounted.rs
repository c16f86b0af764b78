//! Marks every class deriving from the reference-counted root.

use crate::framework::{Pass, PassContext, VisitEvent, VisitResult};
use crate::sink::Category;
use bindery_clang::{NodeId, NodeKind};
use bindery_common::Result;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use tracing::debug;

/// Collects the base-class graph of every file, then annotates each record
/// that reaches the configured root.
#[derive(Debug, Default)]
pub struct RefCountedPass {
    /// Record FQN → FQNs of its direct bases
    bases: BTreeMap<String, Vec<String>>,
    /// Record FQN → subsystem it was declared in
    subsystems: BTreeMap<String, String>,
}

impl RefCountedPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, cx: &PassContext<'_>, id: NodeId) -> Result<()> {
        let Some(record) = cx.ast.node(id).as_record() else {
            return Ok(());
        };
        let fqn = cx.ast.require_qualified_name(id)?;
        let mut edges = Vec::with_capacity(record.bases.len());
        for base in &record.bases {
            let target = match cx.ast.resolve_type(&base.ty, id) {
                Some(target) => cx.ast.require_qualified_name(target)?,
                None => match base.class_name() {
                    Some(name) => name.to_string(),
                    None => continue,
                },
            };
            edges.push(target);
        }
        self.bases.entry(fqn.clone()).or_default().extend(edges);
        self.subsystems
            .entry(fqn)
            .or_insert_with(|| cx.subsystem_of_node(id).to_string());
        Ok(())
    }

    /// Whether `fqn` is `root` or derives from it. Cycles end the search.
    pub fn derives_from(&self, fqn: &str, root: &str) -> bool {
        let mut visited = FxHashSet::default();
        let mut stack = vec![fqn];
        while let Some(current) = stack.pop() {
            if current == root {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(bases) = self.bases.get(current) {
                stack.extend(bases.iter().map(String::as_str));
            }
        }
        false
    }
}

impl Pass for RefCountedPass {
    fn name(&self) -> &'static str {
        "refcounted"
    }

    fn visit(&mut self, cx: &mut PassContext<'_>, node: NodeId, event: VisitEvent) -> Result<VisitResult> {
        if event == VisitEvent::Leave {
            return Ok(VisitResult::Continue);
        }
        let kind = cx.ast.node(node).kind;
        match kind {
            NodeKind::TranslationUnit | NodeKind::Namespace => Ok(VisitResult::Continue),
            NodeKind::Record => {
                self.record(cx, node)?;
                Ok(VisitResult::SkipChildren)
            }
            _ => Ok(VisitResult::SkipChildren),
        }
    }

    fn on_end(&mut self, cx: &mut PassContext<'_>) -> Result<()> {
        let settings = cx.settings;
        let generator = &settings.generator;
        let root = generator.refcounted_root.trim_start_matches("::");
        let mut count = 0;
        for (fqn, subsystem) in &self.subsystems {
            if !self.derives_from(fqn, root) {
                continue;
            }
            cx.emit_to(
                subsystem,
                Category::RefCounted,
                &format!("%refobject {fqn} \"{}\";", generator.add_ref),
            )?;
            cx.emit_to(
                subsystem,
                Category::RefCounted,
                &format!("%unrefobject {fqn} \"{}\";", generator.release_ref),
            )?;
            count += 1;
        }
        debug!(records = self.subsystems.len(), refcounted = count, "refcounted finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    fn edges(pairs: &[(&str, &str)]) -> RefCountedPass {
        let mut pass = RefCountedPass::new();
        for (from, to) in pairs {
            pass.bases.entry(from.to_string()).or_default().push(to.to_string());
        }
        pass
    }

    #[test]
    fn test_derives_from_survives_cycles() {
        let pass = edges(&[("A", "B"), ("B", "A"), ("C", "C"), ("D", "B"), ("D", "Root")]);
        assert!(!pass.derives_from("A", "Root"));
        assert!(!pass.derives_from("C", "Root"));
        assert!(pass.derives_from("D", "Root"));
        assert!(pass.derives_from("Root", "Root"));
    }

    #[test]
    fn test_closure_is_independent_of_declaration_order() {
        let mut fx = Fixture::new();
        // Sound is seen before its bases are.
        let audio = fx.file("Audio/Sound.h");
        let ns = fx.namespace(audio, "Urho3D");
        fx.class(ns, "Sound", &["Urho3D::Resource"]);
        fx.class(ns, "Sample", &[]);
        let core = fx.file("Core/Object.h");
        let ns2 = fx.namespace(core, "Urho3D");
        fx.class(ns2, "RefCounted", &[]);
        fx.class(ns2, "Object", &["RefCounted"]);
        let resource = fx.file("Resource/Resource.h");
        let ns3 = fx.namespace(resource, "Urho3D");
        fx.class(ns3, "Resource", &["Object"]);

        fx.run_pass(&mut RefCountedPass::new()).unwrap();

        assert_eq!(
            fx.lines("Audio", Category::RefCounted),
            vec![
                "%refobject Urho3D::Sound \"AddRef\";",
                "%unrefobject Urho3D::Sound \"ReleaseRef\";",
            ]
        );
        assert_eq!(
            fx.lines("Core", Category::RefCounted),
            vec![
                "%refobject Urho3D::Object \"AddRef\";",
                "%unrefobject Urho3D::Object \"ReleaseRef\";",
                "%refobject Urho3D::RefCounted \"AddRef\";",
                "%unrefobject Urho3D::RefCounted \"ReleaseRef\";",
            ]
        );
        assert_eq!(fx.lines("Resource", Category::RefCounted).len(), 2);
    }

    #[test]
    fn test_members_are_not_visited() {
        let mut fx = Fixture::new();
        let file = fx.file("Core/Object.h");
        let ns = fx.namespace(file, "Urho3D");
        fx.class(ns, "RefCounted", &[]);
        let outer = fx.class(ns, "Context", &[]);
        fx.class(outer, "Nested", &["Urho3D::RefCounted"]);
        let mut pass = RefCountedPass::new();
        fx.run_pass(&mut pass).unwrap();
        assert!(!pass.subsystems.contains_key("Urho3D::Context::Nested"));
        assert_eq!(fx.lines("Core", Category::RefCounted).len(), 2);
    }
}
