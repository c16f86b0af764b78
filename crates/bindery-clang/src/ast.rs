//! Declaration tree shared by all passes.
//!
//! Nodes live in one arena for the whole run (every header contributes one
//! translation unit root). Removal tombstones a subtree instead of freeing
//! it, so child-list snapshots taken by an in-progress traversal stay valid;
//! callers check [`Ast::is_removed`] before using a node they got from a
//! snapshot.

use crate::types::{CppType, TypeDesc};
use bindery_common::{GenError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Scope separator used in fully-qualified names.
pub const SCOPE_SEPARATOR: &str = "::";

/// Index of a node in the [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source location of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Option<PathBuf>,
    pub line: u32,
    pub column: u32,
    /// Byte range of the whole declaration in `file`, when known
    pub range: Option<(usize, usize)>,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file.display(), self.line),
            None => write!(f, "<unknown>:{}", self.line),
        }
    }
}

/// C++ access specifier for class members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum AccessSpecifier {
    /// Public access - accessible from anywhere
    #[default]
    Public,
    /// Protected access - accessible from class and derived classes
    Protected,
    /// Private access - accessible only from within the class
    Private,
}

impl AccessSpecifier {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(AccessSpecifier::Public),
            "protected" => Some(AccessSpecifier::Protected),
            "private" => Some(AccessSpecifier::Private),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessSpecifier::Public => "public",
            AccessSpecifier::Protected => "protected",
            AccessSpecifier::Private => "private",
        }
    }

    fn rank(self) -> u8 {
        match self {
            AccessSpecifier::Public => 2,
            AccessSpecifier::Protected => 1,
            AccessSpecifier::Private => 0,
        }
    }

    /// The more permissive of two access levels.
    pub fn most_permissive(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Whether `self` grants at least the access of `required`.
    pub fn allows(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }
}

/// Declaration kinds kept in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// One header file (root)
    TranslationUnit,
    Namespace,
    /// class/struct/union, including explicit template specializations
    Record,
    Constructor,
    Destructor,
    Method,
    ConversionOperator,
    /// Free function
    Function,
    Field,
    /// Namespace-scope or static member variable
    Variable,
    Enum,
    EnumConstant,
    /// `typedef` or `using X = Y`
    TypeAlias,
    FunctionTemplate,
    ClassTemplate,
}

impl NodeKind {
    /// Container-like kinds that get a closing (leave) visit.
    pub fn needs_leave(self) -> bool {
        matches!(
            self,
            NodeKind::Namespace
                | NodeKind::Record
                | NodeKind::Enum
                | NodeKind::Function
                | NodeKind::Method
                | NodeKind::Constructor
                | NodeKind::Destructor
                | NodeKind::ConversionOperator
                | NodeKind::FunctionTemplate
                | NodeKind::ClassTemplate
        )
    }

    /// Kinds whose name takes part in the qualified names of their children.
    pub fn qualifies_names(self) -> bool {
        matches!(self, NodeKind::Namespace | NodeKind::Record | NodeKind::Enum)
    }

    pub fn is_function_like(self) -> bool {
        matches!(
            self,
            NodeKind::Function
                | NodeKind::Method
                | NodeKind::Constructor
                | NodeKind::Destructor
                | NodeKind::ConversionOperator
        )
    }

    /// Kinds that define a type and go into the symbol registry.
    pub fn defines_type(self) -> bool {
        matches!(
            self,
            NodeKind::Record | NodeKind::Enum | NodeKind::TypeAlias | NodeKind::ClassTemplate
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::TranslationUnit => "translation-unit",
            NodeKind::Namespace => "namespace",
            NodeKind::Record => "record",
            NodeKind::Constructor => "constructor",
            NodeKind::Destructor => "destructor",
            NodeKind::Method => "method",
            NodeKind::ConversionOperator => "conversion-operator",
            NodeKind::Function => "function",
            NodeKind::Field => "field",
            NodeKind::Variable => "variable",
            NodeKind::Enum => "enum",
            NodeKind::EnumConstant => "enum-constant",
            NodeKind::TypeAlias => "type-alias",
            NodeKind::FunctionTemplate => "function-template",
            NodeKind::ClassTemplate => "class-template",
        }
    }
}

/// Tag keyword a record was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagKind {
    #[default]
    Struct,
    Class,
    Union,
}

impl TagKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "class" => TagKind::Class,
            "union" => TagKind::Union,
            _ => TagKind::Struct,
        }
    }

    /// Access members get when no access specifier precedes them.
    pub fn default_access(self) -> AccessSpecifier {
        match self {
            TagKind::Class => AccessSpecifier::Private,
            TagKind::Struct | TagKind::Union => AccessSpecifier::Public,
        }
    }
}

/// A direct base class of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseSpecifier {
    /// Inheritance access specifier (public/protected/private)
    pub access: AccessSpecifier,
    /// Base class type; resolve with [`Ast::resolve_type`]
    pub ty: TypeDesc,
    pub is_virtual: bool,
}

impl BaseSpecifier {
    /// Best available name of the base class, template arguments dropped.
    pub fn class_name(&self) -> Option<&str> {
        self.ty.canonical.name().map(|n| n.trim_start_matches("::"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDecl {
    pub tag: TagKind,
    pub bases: Vec<BaseSpecifier>,
    pub is_definition: bool,
    pub is_abstract: bool,
    /// Arguments of an explicit template specialization (`IsFlagSet<Mode>`)
    pub template_args: Vec<CppType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub return_type: TypeDesc,
    pub params: Vec<Param>,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_override: bool,
    /// `const`-qualified member function
    pub is_const: bool,
    pub is_deleted: bool,
    pub is_definition: bool,
    pub mangled_name: Option<String>,
}

impl FunctionDecl {
    pub fn new(return_type: TypeDesc) -> Self {
        Self {
            return_type,
            params: Vec::new(),
            is_static: false,
            is_virtual: false,
            is_pure: false,
            is_override: false,
            is_const: false,
            is_deleted: false,
            is_definition: false,
            mangled_name: None,
        }
    }
}

/// Fields, variables and enum constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueDecl {
    pub ty: TypeDesc,
    pub is_static: bool,
    pub is_constexpr: bool,
    pub has_init: bool,
    /// Literal value, if one could be extracted statically
    pub literal: Option<String>,
}

impl ValueDecl {
    pub fn new(ty: TypeDesc) -> Self {
        Self {
            ty,
            is_static: false,
            is_constexpr: false,
            has_init: false,
            literal: None,
        }
    }

    /// Whether the literal value was successfully extracted.
    pub fn literal_extracted(&self) -> bool {
        self.literal.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumDecl {
    /// `enum class` / `enum struct`
    pub is_scoped: bool,
    pub underlying: Option<TypeDesc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDecl {
    pub underlying: TypeDesc,
}

/// Declaration-specific attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeclData {
    #[default]
    None,
    Record(RecordDecl),
    Function(FunctionDecl),
    Value(ValueDecl),
    Enum(EnumDecl),
    Alias(AliasDecl),
}

/// A node in the declaration tree.
#[derive(Debug, Clone)]
pub struct AstNode {
    pub kind: NodeKind,
    /// Simple name; empty for anonymous declarations
    pub name: SmolStr,
    pub access: AccessSpecifier,
    pub location: SourceLocation,
    /// Parser-assigned identity (clang node id or cursor hash)
    pub identity: String,
    pub decl: DeclData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    removed: bool,
}

impl AstNode {
    pub fn new(kind: NodeKind, name: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            name: name.into(),
            access: AccessSpecifier::Public,
            location: SourceLocation::default(),
            identity: String::new(),
            decl: DeclData::None,
            parent: None,
            children: Vec::new(),
            removed: false,
        }
    }

    pub fn with_access(mut self, access: AccessSpecifier) -> Self {
        self.access = access;
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_decl(mut self, decl: DeclData) -> Self {
        self.decl = decl;
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_record(&self) -> Option<&RecordDecl> {
        match &self.decl {
            DeclData::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match &self.decl {
            DeclData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&ValueDecl> {
        match &self.decl {
            DeclData::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDecl> {
        match &self.decl {
            DeclData::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&AliasDecl> {
        match &self.decl {
            DeclData::Alias(a) => Some(a),
            _ => None,
        }
    }

    /// `operator+`, `operator==`, ... (not conversion operators, which have their own kind)
    pub fn is_operator(&self) -> bool {
        self.name
            .strip_prefix("operator")
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
    }
}

/// Arena holding every translation unit of a run plus the FQN registry.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<AstNode>,
    roots: Vec<NodeId>,
    registry: FxHashMap<String, NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a translation unit root for one header.
    pub fn add_root(&mut self, file: PathBuf) -> NodeId {
        let node = AstNode::new(NodeKind::TranslationUnit, "").with_location(SourceLocation {
            file: Some(file),
            ..Default::default()
        });
        let id = self.push(node);
        self.roots.push(id);
        id
    }

    /// Append `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, mut node: AstNode) -> NodeId {
        node.parent = Some(parent);
        let id = self.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    fn push(&mut self, node: AstNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut AstNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn is_removed(&self, id: NodeId) -> bool {
        self.nodes[id.index()].removed
    }

    /// Remove a node and its whole subtree.
    ///
    /// The node is detached from its parent's child list and every registry
    /// entry pointing into the subtree is purged, so later lookups of those
    /// names treat them as unknown.
    pub fn remove(&mut self, id: NodeId) {
        if self.is_removed(id) {
            return;
        }
        if let Some(parent) = self.parent(id) {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }

        let mut stack = vec![id];
        let mut purged = FxHashSet::default();
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.index()];
            node.removed = true;
            stack.extend(node.children.iter().copied());
            purged.insert(current);
        }
        self.registry.retain(|_, node| !purged.contains(node));
    }

    /// Live sibling immediately after `id` in its parent's child list.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Live sibling immediately before `id` in its parent's child list.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&c| c == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// Live children of `id` with the given kind.
    pub fn children_of_kind(&self, id: NodeId, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.node(c).kind == kind)
    }

    /// Methods declared directly in a record.
    pub fn methods(&self, record: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children_of_kind(record, NodeKind::Method)
    }

    /// Closest record enclosing `id`.
    pub fn enclosing_record(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if self.node(p).kind == NodeKind::Record {
                return Some(p);
            }
            current = self.parent(p);
        }
        None
    }

    /// Whether `id` sits directly at namespace (or file) scope.
    pub fn is_namespace_scope(&self, id: NodeId) -> bool {
        self.parent(id).is_some_and(|p| {
            matches!(
                self.node(p).kind,
                NodeKind::Namespace | NodeKind::TranslationUnit
            )
        })
    }

    /// Translation unit containing `id`.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(p) = self.parent(current) {
            current = p;
        }
        current
    }

    /// Fully-qualified name, walking the parent chain through namespaces,
    /// records and enums. `None` for anonymous and non-declaration nodes.
    pub fn qualified_name(&self, id: NodeId) -> Option<String> {
        self.qualify(id, true)
    }

    /// Shortest qualified form accepted for enum constants: the enclosing
    /// enum is skipped unless it is scoped.
    pub fn shortest_qualified_name(&self, id: NodeId) -> Option<String> {
        self.qualify(id, false)
    }

    fn qualify(&self, id: NodeId, keep_unscoped_enums: bool) -> Option<String> {
        let node = self.node(id);
        if node.is_anonymous() || node.kind == NodeKind::TranslationUnit {
            return None;
        }

        let mut parts = vec![node.name.as_str()];
        let mut current = node.parent;
        while let Some(p) = current {
            let parent = self.node(p);
            let skip_enum = parent.kind == NodeKind::Enum
                && !keep_unscoped_enums
                && !parent.as_enum().is_some_and(|e| e.is_scoped);
            if parent.kind.qualifies_names() && !parent.is_anonymous() && !skip_enum {
                parts.push(parent.name.as_str());
            }
            current = parent.parent;
        }
        parts.reverse();
        Some(parts.join(SCOPE_SEPARATOR))
    }

    /// Like [`Ast::qualified_name`], but a missing name is a contract violation.
    pub fn require_qualified_name(&self, id: NodeId) -> Result<String> {
        self.qualified_name(id).ok_or_else(|| {
            let node = self.node(id);
            GenError::MissingQualifiedName {
                kind: node.kind.as_str().to_string(),
                name: node.name.to_string(),
            }
        })
    }

    /// Register a namespace or type definition under its FQN.
    ///
    /// Namespaces may be reopened; the first node wins. Two type definitions
    /// under one name are a contract violation.
    pub fn register(&mut self, id: NodeId) -> Result<()> {
        let Some(fqn) = self.qualified_name(id) else {
            return Ok(());
        };
        let kind = self.node(id).kind;
        match self.registry.get(&fqn) {
            None => {
                self.registry.insert(fqn, id);
                Ok(())
            }
            Some(&existing) if existing == id => Ok(()),
            Some(&existing) => {
                let existing_kind = self.node(existing).kind;
                if kind == NodeKind::Namespace || existing_kind == NodeKind::Namespace {
                    return Ok(());
                }
                if kind == NodeKind::TypeAlias && existing_kind == NodeKind::TypeAlias {
                    return Ok(());
                }
                Err(GenError::DuplicateDefinition {
                    fqn,
                    first: self.node(existing).location.to_string(),
                    second: self.node(id).location.to_string(),
                })
            }
        }
    }

    /// Look up a registered symbol by its fully-qualified name.
    pub fn lookup(&self, fqn: &str) -> Option<NodeId> {
        self.registry.get(fqn.trim_start_matches("::")).copied()
    }

    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    /// Resolve a possibly unqualified name as seen from `scope`: the name is
    /// tried in the nearest qualifying scope, then in each enclosing scope
    /// outward, then as written.
    pub fn resolve_name(&self, name: &str, scope: NodeId) -> Option<NodeId> {
        if let Some(absolute) = name.strip_prefix("::") {
            return self.lookup(absolute);
        }

        let mut prefix = self.scope_prefix(scope);
        while let Some(current) = prefix {
            if let Some(id) = self.lookup(&format!("{current}{SCOPE_SEPARATOR}{name}")) {
                return Some(id);
            }
            prefix = current
                .rsplit_once(SCOPE_SEPARATOR)
                .map(|(outer, _)| outer.to_string());
        }
        self.lookup(name)
    }

    /// FQN of `scope` if it qualifies names, otherwise of its nearest such ancestor.
    fn scope_prefix(&self, scope: NodeId) -> Option<String> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let node = self.node(id);
            if node.kind.qualifies_names() {
                if let Some(fqn) = self.qualified_name(id) {
                    return Some(fqn);
                }
            }
            current = node.parent;
        }
        None
    }

    /// Resolve the class/enum/alias a type ultimately names, if registered.
    pub fn resolve_type(&self, ty: &TypeDesc, scope: NodeId) -> Option<NodeId> {
        if let Some(name) = ty.canonical.strip().name() {
            if let Some(id) = self.lookup(name) {
                return Some(id);
            }
        }
        let name = ty.written.strip().name()?;
        self.resolve_name(name, scope)
    }

    /// Follow pointers, references and registered aliases down to the
    /// underlying type.
    pub fn desugar(&self, ty: &CppType, scope: NodeId) -> CppType {
        let mut current = ty.strip().clone();
        let mut scope = scope;
        for _ in 0..32 {
            let Some(name) = current.name() else { break };
            let Some(target) = self.resolve_name(name, scope) else { break };
            let Some(alias) = self.node(target).as_alias() else { break };
            current = alias.underlying.canonical.strip().clone();
            scope = target;
        }
        current
    }

    /// Render a subtree as indented text.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let _ = write!(
            out,
            "{:indent$}{} {}",
            "",
            node.kind.as_str(),
            if node.is_anonymous() { "<anonymous>" } else { node.name.as_str() },
            indent = depth * 2
        );
        match &node.decl {
            DeclData::Function(f) => {
                let params: Vec<String> = f.params.iter().map(|p| p.ty.to_string()).collect();
                let _ = write!(out, " ({}) -> {}", params.join(", "), f.return_type);
            }
            DeclData::Value(v) => {
                let _ = write!(out, " : {}", v.ty);
                if let Some(literal) = &v.literal {
                    let _ = write!(out, " = {literal}");
                }
            }
            DeclData::Alias(a) => {
                let _ = write!(out, " = {}", a.underlying);
            }
            DeclData::Record(r) if !r.bases.is_empty() => {
                let bases: Vec<String> = r.bases.iter().map(|b| b.ty.written.to_string()).collect();
                let _ = write!(out, " : {}", bases.join(", "));
            }
            _ => {}
        }
        if node.kind != NodeKind::TranslationUnit {
            let _ = write!(out, " [{}]", node.access.as_str());
        }
        out.push('\n');
        for &child in &node.children {
            self.dump_into(child, depth + 1, out);
        }
    }
}
