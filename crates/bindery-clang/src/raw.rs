//! Raw parser tree in the shape of clang's JSON AST dump.
//!
//! Both parser adapters produce this tree; [`crate::builder::TreeBuilder`]
//! turns it into the typed [`crate::ast::Ast`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

/// A bare source location as printed by clang.
///
/// Clang omits `file` and `line` when they are unchanged from the previously
/// printed location; [`RawNode::resolve_locations`] fills them back in.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLoc {
    pub offset: Option<usize>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub col: Option<u32>,
    pub tok_len: Option<usize>,
    pub included_from: Option<RawIncludedFrom>,
    pub spelling_loc: Option<Box<RawLoc>>,
    pub expansion_loc: Option<Box<RawLoc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawIncludedFrom {
    pub file: String,
}

impl RawLoc {
    /// Location that counts for filtering: the expansion site for macros.
    pub fn effective(&self) -> &RawLoc {
        match &self.expansion_loc {
            Some(expansion) => expansion,
            None => self,
        }
    }

    pub fn is_macro(&self) -> bool {
        self.expansion_loc.is_some() || self.spelling_loc.is_some()
    }

    fn is_valid(&self) -> bool {
        self.offset.is_some() || self.file.is_some() || self.line.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRange {
    pub begin: RawLoc,
    pub end: RawLoc,
}

impl RawRange {
    /// Byte range of the range in its file, end token included.
    ///
    /// `None` for macro ranges and ranges spanning files.
    pub fn byte_range(&self) -> Option<(usize, usize)> {
        if self.begin.is_macro() || self.end.is_macro() {
            return None;
        }
        if self.begin.file != self.end.file {
            return None;
        }
        let start = self.begin.offset?;
        let end = self.end.offset? + self.end.tok_len.unwrap_or(0);
        (start <= end).then_some((start, end))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawType {
    pub qual_type: String,
    pub desugared_qual_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawBase {
    pub access: Option<String>,
    #[serde(rename = "type")]
    pub ty: RawType,
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDefinitionData {
    pub is_abstract: bool,
    pub is_polymorphic: bool,
}

/// One node of the dump. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNode {
    pub id: String,
    pub kind: String,
    pub name: Option<String>,
    pub loc: RawLoc,
    pub range: RawRange,
    #[serde(rename = "type")]
    pub ty: Option<RawType>,
    pub access: Option<String>,
    pub tag_used: Option<String>,
    pub bases: Vec<RawBase>,
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    pub pure: bool,
    pub storage_class: Option<String>,
    pub constexpr: bool,
    pub is_implicit: bool,
    pub mangled_name: Option<String>,
    pub scoped_enum_tag: Option<String>,
    pub fixed_underlying_type: Option<RawType>,
    pub definition_data: Option<RawDefinitionData>,
    pub explicitly_deleted: bool,
    pub complete_definition: bool,
    pub has_in_class_initializer: bool,
    pub init: Option<String>,
    pub value: Option<serde_json::Value>,
    pub opcode: Option<String>,
    pub inner: Vec<RawNode>,
}

#[derive(Debug, Default)]
struct LocState {
    file: Option<String>,
    line: Option<u32>,
    main_file: Option<String>,
}

impl RawNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Fill in elided `file`/`line` fields in document order and return the
    /// main file of the translation unit (the first real file printed
    /// without an `includedFrom`).
    ///
    /// Must run on the complete tree, before anything is filtered out.
    pub fn resolve_locations(&mut self) -> Option<String> {
        let mut state = LocState::default();
        self.resolve_with(&mut state);
        state.main_file
    }

    fn resolve_with(&mut self, state: &mut LocState) {
        resolve_loc(&mut self.loc, state);
        resolve_loc(&mut self.range.begin, state);
        resolve_loc(&mut self.range.end, state);
        for child in &mut self.inner {
            child.resolve_with(state);
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Resolved file of the node's effective location.
    pub fn file(&self) -> Option<&str> {
        self.loc
            .effective()
            .file
            .as_deref()
            .or(self.range.begin.effective().file.as_deref())
    }

    pub fn is_static(&self) -> bool {
        self.storage_class.as_deref() == Some("static")
    }

    /// Initializer expression of a variable, field or enum constant.
    pub fn initializer(&self) -> Option<&RawNode> {
        let has_init = self.init.is_some()
            || self.has_in_class_initializer
            || self.kind == "EnumConstantDecl";
        if !has_init {
            return None;
        }
        self.inner.iter().rev().find(|c| is_expression(&c.kind))
    }

    /// Statically evaluate a literal expression through value-preserving
    /// wrappers. Returns the literal's source spelling.
    pub fn evaluate_literal(&self) -> Option<String> {
        match self.kind.as_str() {
            "IntegerLiteral" | "FloatingLiteral" => self.value_string(),
            "StringLiteral" => self.value_string(),
            "CXXBoolLiteralExpr" => match &self.value {
                Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
                _ => None,
            },
            "CharacterLiteral" => {
                let code = self.value.as_ref()?.as_u64()?;
                let ch = char::from_u32(u32::try_from(code).ok()?)?;
                if ch.is_ascii_graphic() && ch != '\'' && ch != '\\' {
                    Some(format!("'{ch}'"))
                } else {
                    Some(code.to_string())
                }
            }
            "ConstantExpr" => self
                .value_string()
                .or_else(|| self.single_operand()?.evaluate_literal()),
            "UnaryOperator" => {
                let op = self.opcode.as_deref()?;
                if op != "-" && op != "+" {
                    return None;
                }
                let operand = self.single_operand()?;
                if !matches!(
                    operand.stripped().kind.as_str(),
                    "IntegerLiteral" | "FloatingLiteral"
                ) {
                    return None;
                }
                let value = operand.evaluate_literal()?;
                Some(if op == "-" { format!("-{value}") } else { value })
            }
            "ImplicitCastExpr" | "ParenExpr" | "ExprWithCleanups" | "MaterializeTemporaryExpr"
            | "CXXBindTemporaryExpr" | "CXXFunctionalCastExpr" | "CXXConstructExpr"
            | "InitListExpr" => self.single_operand()?.evaluate_literal(),
            _ => None,
        }
    }

    fn stripped(&self) -> &RawNode {
        match self.kind.as_str() {
            "ImplicitCastExpr" | "ParenExpr" | "ConstantExpr" => match self.single_operand() {
                Some(inner) => inner.stripped(),
                None => self,
            },
            _ => self,
        }
    }

    fn single_operand(&self) -> Option<&RawNode> {
        let mut exprs = self.inner.iter().filter(|c| is_expression(&c.kind));
        let first = exprs.next()?;
        exprs.next().is_none().then_some(first)
    }

    fn value_string(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn resolve_loc(loc: &mut RawLoc, state: &mut LocState) {
    if let Some(spelling) = loc.spelling_loc.as_deref_mut() {
        resolve_bare(spelling, state);
    }
    if let Some(expansion) = loc.expansion_loc.as_deref_mut() {
        resolve_bare(expansion, state);
    }
    resolve_bare(loc, state);
}

fn resolve_bare(loc: &mut RawLoc, state: &mut LocState) {
    if !loc.is_valid() {
        return;
    }
    match &loc.file {
        Some(file) => {
            state.file = Some(file.clone());
            if state.main_file.is_none() && loc.included_from.is_none() && !file.starts_with('<') {
                state.main_file = Some(file.clone());
            }
        }
        None => loc.file = state.file.clone(),
    }
    match loc.line {
        Some(line) => state.line = Some(line),
        None => loc.line = state.line,
    }
}

fn is_expression(kind: &str) -> bool {
    kind.ends_with("Expr") || kind.ends_with("Literal") || kind.ends_with("Operator")
}

lazy_static! {
    static ref INITIALIZER_PATTERN: Regex = Regex::new(
        r#"(?x)
        ^[^=(){}]*
        (?:=\s*\{?|[({])\s*
        (?P<value>
            [-+]?\s*(?:0[xX][0-9A-Fa-f]+|0[bB][01]+|\d+(?:\.\d*)?(?:[eE][-+]?\d+)?|\.\d+(?:[eE][-+]?\d+)?)[uUlLfF]*
          | true | false
          | "(?:[^"\\]|\\.)*"
          | '(?:[^'\\]|\\.)'
        )
        \s*[)}]?\s*;?\s*$"#
    )
    .unwrap();
}

/// Extract a literal initializer from the source text of one declaration.
///
/// The literal must be the whole initializer, directly after the
/// declarator's `=`, `(` or `{`. Multi-line slices and computed initializers
/// yield `None`.
pub fn literal_from_source(slice: &str) -> Option<String> {
    let slice = slice.trim();
    if slice.contains('\n') {
        return None;
    }
    let caps = INITIALIZER_PATTERN.captures(slice)?;
    let value = caps.name("value")?.as_str();
    if value.starts_with(['"', '\'']) {
        return Some(value.to_string());
    }
    Some(value.split_whitespace().collect::<String>())
}
