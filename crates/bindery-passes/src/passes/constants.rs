//! Namespace-scope constants and idiomatic member names.

use crate::framework::{Pass, PassContext, VisitEvent, VisitResult};
use crate::sink::Category;
use bindery_clang::{CppType, NodeId, NodeKind};
use bindery_common::{join_idiomatic, split_identifier, strip_owner_prefix, Result};
use tracing::{debug, trace};

/// Leading token of `kMaxPlayers`-style constant names.
const CONSTANT_MARKER: &str = "k";

/// Idiomatic name of a constant: `kMaxPlayers` and `MAX_PLAYERS` both
/// become `MaxPlayers`.
pub fn constant_name(name: &str) -> String {
    let mut tokens = split_identifier(name);
    if tokens.len() > 1 && tokens[0] == CONSTANT_MARKER {
        tokens.remove(0);
    }
    join_idiomatic(&tokens)
}

/// Idiomatic name of a member, with a prefix abbreviating `owner` removed.
pub fn member_name(name: &str, owner: Option<&str>) -> String {
    let tokens = split_identifier(name);
    let tokens = owner
        .and_then(|o| strip_owner_prefix(&tokens, o))
        .unwrap_or(tokens);
    join_idiomatic(&tokens)
}

/// Add an unsigned suffix to an integer literal that lacks one.
pub fn normalize_literal(literal: &str, ty: &CppType) -> String {
    let is_integer = literal
        .trim_start_matches(['-', '+'])
        .starts_with(|c: char| c.is_ascii_digit())
        && !literal.contains(['.', 'e', 'E'])
        || literal.starts_with("0x")
        || literal.starts_with("0X");
    if ty.is_unsigned_integer() && is_integer && !literal.contains(['u', 'U']) {
        format!("{literal}u")
    } else {
        literal.to_string()
    }
}

/// Emits `%constant` declarations for namespace-scope constants and
/// `%rename` directives for functions, methods and fields whose names
/// aren't idiomatic.
#[derive(Debug, Default)]
pub struct ConstantsPass {
    constants: usize,
    renames: usize,
}

impl ConstantsPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn constant(&mut self, cx: &mut PassContext<'_>, id: NodeId) -> Result<()> {
        let node = cx.ast.node(id);
        let Some(value) = node.as_value() else {
            return Ok(());
        };
        if !(value.ty.is_const || value.is_constexpr) {
            return Ok(());
        }

        let scope = node.parent().unwrap_or(id);
        let canonical = value.ty.value_type();
        let is_string = cx.settings.is_string_type(cx.ast, &value.ty, scope);
        if !canonical.is_numeric_or_bool() && !is_string {
            return Ok(());
        }

        let fqn = cx.ast.require_qualified_name(id)?;
        if cx.settings.excluded_constants.matches(&fqn) {
            trace!(constant = %fqn, "excluded");
            return Ok(());
        }

        let name = constant_name(&node.name);
        let (c_type, initializer) = match &value.literal {
            Some(literal) if is_string => ("const char *".to_string(), literal.clone()),
            Some(literal) => (canonical.to_string(), normalize_literal(literal, canonical)),
            None if canonical.is_c_string() => ("const char *".to_string(), fqn.clone()),
            None => (canonical.to_string(), fqn.clone()),
        };

        cx.emit(Category::Constants, &format!("%ignore {fqn};"))?;
        cx.emit(
            Category::Constants,
            &format!("%constant {c_type} {name} = {initializer};"),
        )?;
        self.constants += 1;
        Ok(())
    }

    fn rename(&mut self, cx: &mut PassContext<'_>, id: NodeId) -> Result<()> {
        let node = cx.ast.node(id);
        if node.is_operator() {
            return Ok(());
        }
        let fqn = cx.ast.require_qualified_name(id)?;
        if cx.facts.hidden_accessors.contains(&fqn) {
            return Ok(());
        }

        let owner = cx.ast.enclosing_record(id).map(|r| cx.ast.node(r).name.as_str());
        let idiomatic = member_name(&node.name, owner);
        if idiomatic.is_empty()
            || idiomatic == node.name.as_str()
            || idiomatic.starts_with(|c: char| c.is_ascii_digit())
        {
            return Ok(());
        }

        cx.emit(Category::Renames, &format!("%rename({idiomatic}) {fqn};"))?;
        self.renames += 1;
        Ok(())
    }
}

impl Pass for ConstantsPass {
    fn name(&self) -> &'static str {
        "constants"
    }

    fn visit(&mut self, cx: &mut PassContext<'_>, node: NodeId, event: VisitEvent) -> Result<VisitResult> {
        if event == VisitEvent::Leave {
            return Ok(VisitResult::Continue);
        }
        let kind = cx.ast.node(node).kind;
        match kind {
            NodeKind::Variable if cx.ast.is_namespace_scope(node) => self.constant(cx, node)?,
            NodeKind::Variable | NodeKind::Field | NodeKind::Function | NodeKind::Method => {
                self.rename(cx, node)?
            }
            _ => {}
        }
        Ok(VisitResult::Continue)
    }

    fn on_end(&mut self, _cx: &mut PassContext<'_>) -> Result<()> {
        debug!(constants = self.constants, renames = self.renames, "constants finished");
        Ok(())
    }
}
