//! Recognizes bitmask enums from their marker specializations.

use crate::framework::{Pass, PassContext, VisitEvent, VisitResult};
use bindery_clang::{NodeId, NodeKind};
use bindery_common::Result;
use tracing::debug;

/// `template<> struct IsFlagSet<TextureUsage> { ... };` marks `TextureUsage`
/// as a flag enum. The marker itself is removed from the tree.
#[derive(Debug, Default)]
pub struct FlagEnumsPass;

impl FlagEnumsPass {
    pub fn new() -> Self {
        Self
    }

    /// FQN of the enum a marker specialization refers to.
    fn marked_enum(cx: &PassContext<'_>, id: NodeId) -> Option<String> {
        let node = cx.ast.node(id);
        let record = node.as_record()?;
        let fqn = cx.ast.qualified_name(id)?;
        if fqn != cx.settings.generator.flag_marker.trim_start_matches("::") {
            return None;
        }
        let name = record.template_args.first()?.strip().name()?;
        let resolved = cx
            .ast
            .resolve_name(name, id)
            .filter(|&e| cx.ast.node(e).kind == NodeKind::Enum)
            .and_then(|e| cx.ast.qualified_name(e));
        Some(resolved.unwrap_or_else(|| name.trim_start_matches("::").to_string()))
    }
}

impl Pass for FlagEnumsPass {
    fn name(&self) -> &'static str {
        "flag-enums"
    }

    fn visit(&mut self, cx: &mut PassContext<'_>, node: NodeId, event: VisitEvent) -> Result<VisitResult> {
        if event == VisitEvent::Leave || cx.ast.node(node).kind != NodeKind::Record {
            return Ok(VisitResult::Continue);
        }
        match Self::marked_enum(cx, node) {
            Some(enum_fqn) => {
                debug!(target_enum = %enum_fqn, "flag enum");
                cx.facts.flag_enums.insert(enum_fqn);
                Ok(VisitResult::Remove)
            }
            None => Ok(VisitResult::Continue),
        }
    }
}
