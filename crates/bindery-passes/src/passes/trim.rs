//! Removes everything the bindings never expose.

use crate::framework::{Pass, PassContext, VisitEvent, VisitResult};
use bindery_clang::{AccessSpecifier, NodeId, NodeKind};
use bindery_common::Result;
use tracing::{debug, trace};

/// Drops anonymous and implementation namespaces, anonymous records,
/// filtered symbols, private members, deleted functions and templates.
///
/// Include rules select namespace-scope declarations; exclude rules apply
/// at every level. Private constructors and destructors stay so the wrapper
/// generator knows a type can't be built or destroyed from outside.
#[derive(Debug, Default)]
pub struct TrimPass {
    removed: usize,
}

impl TrimPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn should_remove(&self, cx: &PassContext<'_>, id: NodeId) -> Option<&'static str> {
        let node = cx.ast.node(id);
        match node.kind {
            NodeKind::TranslationUnit => return None,
            NodeKind::Namespace if node.is_anonymous() => return Some("anonymous namespace"),
            NodeKind::Namespace
                if cx
                    .settings
                    .generator
                    .trim_namespaces
                    .iter()
                    .any(|n| n == node.name.as_str()) =>
            {
                return Some("implementation namespace")
            }
            NodeKind::Record if node.is_anonymous() => return Some("anonymous record"),
            NodeKind::FunctionTemplate | NodeKind::ClassTemplate => return Some("template"),
            _ => {}
        }

        if node.access == AccessSpecifier::Private
            && !matches!(node.kind, NodeKind::Constructor | NodeKind::Destructor)
        {
            return Some("private");
        }
        if node.as_function().is_some_and(|f| f.is_deleted) {
            return Some("deleted");
        }

        let fqn = cx.ast.qualified_name(id)?;
        let symbols = &cx.settings.symbols;
        if symbols.is_excluded(&fqn) {
            return Some("excluded");
        }
        if node.kind != NodeKind::Namespace
            && cx.ast.is_namespace_scope(id)
            && !symbols.is_included(&fqn)
        {
            return Some("not included");
        }
        None
    }
}

impl Pass for TrimPass {
    fn name(&self) -> &'static str {
        "trim"
    }

    fn visit(&mut self, cx: &mut PassContext<'_>, node: NodeId, event: VisitEvent) -> Result<VisitResult> {
        if event == VisitEvent::Leave {
            return Ok(VisitResult::Continue);
        }
        match self.should_remove(cx, node) {
            Some(reason) => {
                trace!(node = %cx.ast.node(node).name, reason, "trimmed");
                self.removed += 1;
                Ok(VisitResult::Remove)
            }
            None => Ok(VisitResult::Continue),
        }
    }

    fn on_end(&mut self, _cx: &mut PassContext<'_>) -> Result<()> {
        debug!(removed = self.removed, "trim finished");
        Ok(())
    }
}
