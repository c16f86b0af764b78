//! Secondary bases of multiply-inheriting classes become interfaces.

use crate::framework::{Pass, PassContext, VisitEvent, VisitResult};
use crate::settings::simple_name;
use crate::sink::Category;
use bindery_clang::{NodeId, NodeKind};
use bindery_common::Result;
use std::collections::BTreeMap;

/// C# has single inheritance: the first base stays a base class, every
/// further base is exposed as an interface.
#[derive(Debug, Default)]
pub struct InterfacesPass {
    /// Interface FQN → subsystem it is emitted to
    found: BTreeMap<String, String>,
}

impl InterfacesPass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pass for InterfacesPass {
    fn name(&self) -> &'static str {
        "interfaces"
    }

    fn visit(&mut self, cx: &mut PassContext<'_>, node: NodeId, event: VisitEvent) -> Result<VisitResult> {
        if event == VisitEvent::Leave || cx.ast.node(node).kind != NodeKind::Record {
            return Ok(VisitResult::Continue);
        }
        let Some(record) = cx.ast.node(node).as_record() else {
            return Ok(VisitResult::Continue);
        };

        for base in record.bases.iter().skip(1) {
            let (fqn, subsystem) = match cx.ast.resolve_type(&base.ty, node) {
                Some(id) => (cx.ast.require_qualified_name(id)?, cx.subsystem_of_node(id)),
                None => match base.class_name() {
                    Some(name) => (name.to_string(), cx.subsystem()),
                    None => continue,
                },
            };
            self.found.entry(fqn).or_insert_with(|| subsystem.to_string());
        }
        Ok(VisitResult::Continue)
    }

    fn on_end(&mut self, cx: &mut PassContext<'_>) -> Result<()> {
        for (fqn, subsystem) in &self.found {
            let name = simple_name(fqn);
            cx.emit_to(
                subsystem,
                Category::Interfaces,
                &format!("%interface_custom(\"{name}\", \"I{name}\", {fqn});"),
            )?;
            cx.facts.interfaces.insert(fqn.clone());
        }
        Ok(())
    }
}
