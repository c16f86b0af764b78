//! Typed wrappers for event descriptors.
//!
//! An event is declared as a string hash followed by a namespace holding
//! its parameter hashes:
//!
//! ```cpp
//! static const StringHash E_NODEADDED("NodeAdded");
//! namespace NodeAdded
//! {
//!     static const StringHash P_SCENE("Scene");
//!     static const StringHash P_NODE("Node");
//! }
//! ```
//!
//! Each one becomes a nested class of a per-subsystem `E` class, so scripts
//! write `E.NodeAdded.Scene` instead of looking hashes up by string.

use crate::framework::{Pass, PassContext, VisitEvent, VisitResult};
use crate::settings::names_type;
use crate::sink::Category;
use bindery_clang::{NodeId, NodeKind};
use bindery_common::{join_idiomatic, split_identifier, Result};
use std::collections::BTreeSet;
use tracing::debug;

/// C# name of the hash type inside the generated classes.
const HASH_CLASS: &str = "StringHash";

#[derive(Debug, Default)]
pub struct EventsPass {
    /// Subsystems whose `E` class has been opened
    opened: BTreeSet<String>,
}

/// One event parameter: C# field name and hash source string.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EventParam {
    fqn: String,
    name: String,
    value: String,
}

impl EventsPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// The namespace following `id` when `id` declares an event hash.
    fn event_namespace(cx: &PassContext<'_>, id: NodeId) -> Option<NodeId> {
        let node = cx.ast.node(id);
        let value = node.as_value()?;
        let scope = node.parent()?;
        if !names_type(cx.ast, &value.ty, scope, &cx.settings.generator.string_hash_type) {
            return None;
        }
        let next = cx.ast.next_sibling(id)?;
        let namespace = cx.ast.node(next);
        if namespace.kind != NodeKind::Namespace {
            return None;
        }
        let stripped = node
            .name
            .strip_prefix(cx.settings.generator.event_prefix.as_str())
            .unwrap_or(&node.name);
        (normalize(stripped) == normalize(&namespace.name)).then_some(next)
    }

    fn params(cx: &PassContext<'_>, namespace: NodeId) -> Result<Vec<EventParam>> {
        let prefix = cx.settings.generator.param_prefix.as_str();
        let hash_type = cx.settings.generator.string_hash_type.as_str();
        let mut params = Vec::new();
        for var in cx.ast.children_of_kind(namespace, NodeKind::Variable) {
            let node = cx.ast.node(var);
            let Some(value) = node.as_value() else {
                continue;
            };
            if !names_type(cx.ast, &value.ty, namespace, hash_type) {
                continue;
            }
            let stripped = node.name.strip_prefix(prefix).unwrap_or(&node.name);
            let literal = value.literal.as_deref().and_then(unquote);
            let name = match literal {
                Some(text) if is_identifier(text) => text.to_string(),
                _ => screaming_to_idiomatic(stripped),
            };
            params.push(EventParam {
                fqn: cx.ast.require_qualified_name(var)?,
                value: literal.map(str::to_string).unwrap_or_else(|| name.clone()),
                name,
            });
        }
        Ok(params)
    }

    fn event(&mut self, cx: &mut PassContext<'_>, var: NodeId, namespace: NodeId) -> Result<()> {
        let var_fqn = cx.ast.require_qualified_name(var)?;
        let class = cx.ast.node(namespace).name.to_string();
        let hash = cx
            .ast
            .node(var)
            .as_value()
            .and_then(|v| v.literal.as_deref())
            .and_then(unquote)
            .unwrap_or(&class)
            .to_string();
        let params = Self::params(cx, namespace)?;

        let subsystem = cx.subsystem().to_string();
        if self.opened.insert(subsystem) {
            cx.emit(Category::Events, "%pragma(csharp) moduleimports=%{")?;
            cx.emit(Category::Events, "public static partial class E")?;
            cx.emit(Category::Events, "{")?;
        }
        for line in render_event(&class, &hash, &params) {
            cx.emit(Category::Events, &line)?;
        }

        cx.emit(Category::Ignores, &format!("%ignore {var_fqn};"))?;
        for param in &params {
            cx.emit(Category::Ignores, &format!("%ignore {};", param.fqn))?;
        }
        debug!(event = %class, params = params.len(), "event");
        Ok(())
    }
}

fn render_event(class: &str, hash: &str, params: &[EventParam]) -> Vec<String> {
    let mut lines = vec![
        format!("    public class {class}Event"),
        "    {".to_string(),
        format!("        private {HASH_CLASS} _event = new {HASH_CLASS}(\"{hash}\");"),
    ];
    for param in params {
        lines.push(format!(
            "        public {HASH_CLASS} {} = new {HASH_CLASS}(\"{}\");",
            param.name, param.value
        ));
    }
    lines.push(format!(
        "        public static implicit operator {HASH_CLASS}({class}Event e) {{ return e._event; }}"
    ));
    lines.push("    }".to_string());
    lines.push(format!(
        "    public static {class}Event {class} = new {class}Event();"
    ));
    lines
}

/// Lowercased with underscores removed: `NODE_ADDED` and `NodeAdded` agree.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|&c| c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn unquote(literal: &str) -> Option<&str> {
    literal.strip_prefix('"')?.strip_suffix('"')
}

fn is_identifier(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `SCENE` → `Scene`, `ELAPSED_TIME` → `ElapsedTime`, `timeStep` → `TimeStep`.
fn screaming_to_idiomatic(name: &str) -> String {
    let mut tokens = split_identifier(name);
    if !name.chars().any(char::is_lowercase) {
        for token in &mut tokens {
            *token = token.to_lowercase();
        }
    }
    join_idiomatic(&tokens)
}

impl Pass for EventsPass {
    fn name(&self) -> &'static str {
        "events"
    }

    fn visit(&mut self, cx: &mut PassContext<'_>, node: NodeId, event: VisitEvent) -> Result<VisitResult> {
        if event == VisitEvent::Leave
            || cx.ast.node(node).kind != NodeKind::Variable
            || !cx.ast.is_namespace_scope(node)
        {
            return Ok(VisitResult::Continue);
        }
        if let Some(namespace) = Self::event_namespace(cx, node) {
            self.event(cx, node, namespace)?;
        }
        Ok(VisitResult::Continue)
    }

    fn on_end(&mut self, cx: &mut PassContext<'_>) -> Result<()> {
        for subsystem in &self.opened {
            cx.emit_to(subsystem, Category::Events, "}")?;
            cx.emit_to(subsystem, Category::Events, "%}")?;
        }
        Ok(())
    }
}
