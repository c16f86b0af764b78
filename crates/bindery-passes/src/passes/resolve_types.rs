//! Drops declarations that use types the bindings can't represent.

use crate::framework::{Pass, PassContext, VisitEvent, VisitResult};
use bindery_clang::{CppType, NodeId, NodeKind, TypeDesc};
use bindery_common::Result;
use std::collections::BTreeSet;
use tracing::{trace, warn};

/// A field, variable or function survives only if every type it uses by
/// value is a builtin, a string, a registered symbol or a configured opaque
/// type. Pointers and references to unknown types and template instances
/// are passed through as opaque handles.
///
/// Each unresolved type name is warned about once, at the end of the run.
#[derive(Debug, Default)]
pub struct ResolveTypesPass {
    unresolved: BTreeSet<String>,
}

impl ResolveTypesPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the first unknown by-value type among `types`.
    fn first_unresolved<'t>(
        cx: &PassContext<'_>,
        scope: NodeId,
        types: impl IntoIterator<Item = &'t TypeDesc>,
    ) -> Option<String> {
        types.into_iter().find_map(|ty| unresolved_name(cx, ty, scope))
    }
}

fn unresolved_name(cx: &PassContext<'_>, ty: &TypeDesc, scope: NodeId) -> Option<String> {
    if cx.settings.is_string_type(cx.ast, ty, scope) {
        return None;
    }
    let mut value = &ty.canonical;
    while let CppType::Array { element, .. } = value {
        value = element;
    }
    match value {
        CppType::Pointer { .. } | CppType::Reference { .. } | CppType::Template { .. } => None,
        CppType::Named(name) => {
            let known = cx.ast.resolve_type(ty, scope).is_some()
                || cx.settings.is_opaque_type(name)
                || ty
                    .written
                    .name()
                    .is_some_and(|written| cx.settings.is_opaque_type(written));
            (!known).then(|| name.trim_start_matches("::").to_string())
        }
        CppType::Opaque(spelling) => Some(spelling.clone()),
        _ => None,
    }
}

impl Pass for ResolveTypesPass {
    fn name(&self) -> &'static str {
        "resolve-types"
    }

    fn visit(&mut self, cx: &mut PassContext<'_>, node: NodeId, event: VisitEvent) -> Result<VisitResult> {
        if event == VisitEvent::Leave {
            return Ok(VisitResult::Continue);
        }

        let n = cx.ast.node(node);
        let scope = n.parent().unwrap_or(node);
        let missing = match n.kind {
            NodeKind::Field | NodeKind::Variable => match n.as_value() {
                Some(value) => Self::first_unresolved(cx, scope, [&value.ty]),
                None => None,
            },
            NodeKind::Function
            | NodeKind::Method
            | NodeKind::Constructor
            | NodeKind::ConversionOperator => match n.as_function() {
                Some(func) => Self::first_unresolved(
                    cx,
                    scope,
                    std::iter::once(&func.return_type).chain(func.params.iter().map(|p| &p.ty)),
                ),
                None => None,
            },
            _ => None,
        };

        match missing {
            Some(name) => {
                trace!(node = %n.name, ty = %name, "dropped: unresolved type");
                self.unresolved.insert(name);
                Ok(VisitResult::Remove)
            }
            None => Ok(VisitResult::Continue),
        }
    }

    fn on_end(&mut self, _cx: &mut PassContext<'_>) -> Result<()> {
        for name in &self.unresolved {
            warn!(ty = %name, "unresolved type; declarations using it were dropped");
        }
        Ok(())
    }
}
