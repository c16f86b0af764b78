//! Run settings compiled from the configuration file.

use bindery_clang::{Ast, CppType, NodeId, TypeDesc};
use bindery_common::Result;
use bindery_config::{BinderyConfig, GeneratorConfig, Separator, SymbolFilter, WildcardSet};

/// Configuration with its wildcard rules compiled once per run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub generator: GeneratorConfig,
    pub symbols: SymbolFilter,
    pub excluded_constants: WildcardSet,
}

impl Settings {
    pub fn from_config(config: &BinderyConfig) -> Result<Self> {
        Ok(Self {
            generator: config.generator.clone(),
            symbols: SymbolFilter::new(&config.symbols, Separator::Scope)?,
            excluded_constants: WildcardSet::new(
                &config.generator.excluded_constants,
                Separator::Scope,
            )?,
        })
    }

    /// `const char*`, or one of the configured string classes.
    pub fn is_string_type(&self, ast: &Ast, ty: &TypeDesc, scope: NodeId) -> bool {
        ty.value_type().is_c_string()
            || self
                .generator
                .string_types
                .iter()
                .any(|s| names_type(ast, ty, scope, s))
    }

    pub fn is_opaque_type(&self, name: &str) -> bool {
        let name = name.trim_start_matches("::");
        self.generator.opaque_types.iter().any(|t| t == name)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            symbols: SymbolFilter::allow_all(),
            excluded_constants: WildcardSet::default(),
        }
    }
}

/// Whether `ty`, references aside, names the type `target`.
///
/// Both the canonical and the written spelling are tried; the written one is
/// resolved from `scope`, so `String` inside `namespace Urho3D` names
/// `Urho3D::String` even when the canonical type is a template instance.
pub fn names_type(ast: &Ast, ty: &TypeDesc, scope: NodeId, target: &str) -> bool {
    let target = target.trim_start_matches("::");
    let candidates = [ty.value_type(), ty.written.without_reference()];
    candidates.iter().any(|t| match t.name() {
        Some(name) => {
            name.trim_start_matches("::") == target
                || ast
                    .resolve_name(name, scope)
                    .and_then(|id| ast.qualified_name(id))
                    .is_some_and(|fqn| fqn == target)
        }
        None => false,
    })
}

/// Last `::` segment of a qualified name.
pub fn simple_name(fqn: &str) -> &str {
    fqn.rsplit("::").next().unwrap_or(fqn)
}

/// C# spelling of a builtin integer type, for low-level type maps.
pub fn cs_integer(ty: &CppType) -> &'static str {
    match ty {
        CppType::Bool => "bool",
        CppType::Char { signed: true } => "sbyte",
        CppType::Char { signed: false } => "byte",
        CppType::Short { signed: true } => "short",
        CppType::Short { signed: false } => "ushort",
        CppType::Int { signed: false } => "uint",
        CppType::Long { signed: true } | CppType::LongLong { signed: true } => "long",
        CppType::Long { signed: false } | CppType::LongLong { signed: false } => "ulong",
        _ => "int",
    }
}
