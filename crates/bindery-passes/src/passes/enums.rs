//! Enum values, flag attributes and flag-set aliases.

use crate::framework::{Pass, PassContext, VisitEvent, VisitResult};
use crate::settings::cs_integer;
use crate::sink::Category;
use bindery_clang::{AliasDecl, CppType, DeclData, NodeId, NodeKind, TypeDesc};
use bindery_common::{join_idiomatic, split_identifier, strip_owner_prefix, GenError, Result};
use tracing::debug;

/// Attribute marking a C# enum as a bitmask.
const FLAGS_ATTRIBUTE: &str = "[global::System.Flags]";

/// Pins enum constant values, renames prefixed constants, marks flag enums
/// and maps flag-set aliases onto their enum.
#[derive(Debug, Default)]
pub struct EnumsPass;

impl EnumsPass {
    pub fn new() -> Self {
        Self
    }

    fn enumeration(&mut self, cx: &mut PassContext<'_>, id: NodeId) -> Result<()> {
        let fqn = cx.ast.require_qualified_name(id)?;
        if cx.facts.flag_enums.contains(&fqn) {
            cx.emit(
                Category::Enums,
                &format!("%typemap(csattributes) {fqn} \"{FLAGS_ATTRIBUTE}\""),
            )?;
        }
        Ok(())
    }

    fn constant(&mut self, cx: &mut PassContext<'_>, id: NodeId) -> Result<()> {
        let node = cx.ast.node(id);
        let Some(owner) = node.parent().filter(|&p| cx.ast.node(p).kind == NodeKind::Enum) else {
            return Ok(());
        };
        let shortest = cx
            .ast
            .shortest_qualified_name(id)
            .ok_or_else(|| GenError::MissingQualifiedName {
                kind: node.kind.as_str().to_string(),
                name: node.name.to_string(),
            })?;

        let mut lines = Vec::new();
        if let Some(literal) = node.as_value().and_then(|v| v.literal.as_deref()) {
            let literal = literal.replace('"', "\\\"");
            lines.push(format!("%csconstvalue(\"{literal}\") {shortest};"));
        }
        let tokens = split_identifier(&node.name);
        if let Some(rest) = strip_owner_prefix(&tokens, &cx.ast.node(owner).name) {
            let renamed = join_idiomatic(&rest);
            if !renamed.is_empty() && !renamed.starts_with(|c: char| c.is_ascii_digit()) {
                lines.push(format!("%rename({renamed}) {shortest};"));
            }
        }

        for line in lines {
            cx.emit(Category::Enums, &line)?;
        }
        Ok(())
    }

    /// `using DragAndDropModeFlags = FlagSet<DragAndDropMode>;` becomes an
    /// alias of the enum, with type maps converting through its storage type.
    fn flag_set_alias(&mut self, cx: &mut PassContext<'_>, id: NodeId) -> Result<()> {
        let node = cx.ast.node(id);
        let Some(alias) = node.as_alias() else {
            return Ok(());
        };
        let template = cx.settings.generator.flagset_template.trim_start_matches("::");
        let arg = match &alias.underlying.canonical {
            CppType::Template { name, args } if name.trim_start_matches("::") == template => {
                match args.first().and_then(CppType::name) {
                    Some(arg) => arg.to_string(),
                    None => return Ok(()),
                }
            }
            _ => return Ok(()),
        };
        let Some(target) = cx
            .ast
            .resolve_name(&arg, id)
            .filter(|&e| cx.ast.node(e).kind == NodeKind::Enum)
        else {
            debug!(alias = %node.name, target_enum = %arg, "flag set over unknown enum");
            return Ok(());
        };

        let alias_fqn = cx.ast.require_qualified_name(id)?;
        let enum_fqn = cx.ast.require_qualified_name(target)?;
        let storage = cx
            .ast
            .node(target)
            .as_enum()
            .and_then(|e| e.underlying.as_ref())
            .map(|u| u.canonical.clone())
            .unwrap_or_else(CppType::int);

        cx.ast.node_mut(id).decl = DeclData::Alias(AliasDecl {
            underlying: TypeDesc::new(CppType::named(enum_fqn.clone())),
        });

        for line in flag_set_typemaps(&alias_fqn, &enum_fqn, &storage) {
            cx.emit(Category::Enums, &line)?;
        }
        Ok(())
    }
}

/// Type maps passing a flag set across the boundary as its integer storage.
fn flag_set_typemaps(alias: &str, enum_fqn: &str, storage: &CppType) -> Vec<String> {
    let c_type = storage.to_string();
    let im_type = cs_integer(storage);
    let cs_type = enum_fqn.replace("::", ".");
    vec![
        format!("%typemap(ctype) {alias} \"{c_type}\""),
        format!("%typemap(imtype) {alias} \"{im_type}\""),
        format!("%typemap(cstype) {alias} \"{cs_type}\""),
        format!("%typemap(csin) {alias} \"({im_type})$csinput\""),
        format!("%typemap(csout) {alias} {{ return ({cs_type})$imcall; }}"),
        format!("%typemap(in) {alias} \"$1 = ($1_ltype)$input;\""),
        format!("%typemap(out) {alias} \"$result = ({c_type})$1;\""),
    ]
}

impl Pass for EnumsPass {
    fn name(&self) -> &'static str {
        "enums"
    }

    fn visit(&mut self, cx: &mut PassContext<'_>, node: NodeId, event: VisitEvent) -> Result<VisitResult> {
        if event == VisitEvent::Leave {
            return Ok(VisitResult::Continue);
        }
        let kind = cx.ast.node(node).kind;
        match kind {
            NodeKind::Enum => self.enumeration(cx, node)?,
            NodeKind::EnumConstant => self.constant(cx, node)?,
            NodeKind::TypeAlias => self.flag_set_alias(cx, node)?,
            _ => {}
        }
        Ok(VisitResult::Continue)
    }
}
