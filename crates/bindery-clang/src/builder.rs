//! Conversion of a raw parser tree into typed [`Ast`] nodes.

use crate::ast::{
    AccessSpecifier, AliasDecl, Ast, AstNode, BaseSpecifier, DeclData, EnumDecl, FunctionDecl,
    NodeId, NodeKind, Param, RecordDecl, SourceLocation, TagKind, ValueDecl,
};
use crate::raw::{literal_from_source, RawNode, RawType};
use crate::types::{split_function_spelling, CppType, TypeDesc};
use bindery_common::{GenError, Result, SourceFile};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Builds the declaration tree of one header into a shared [`Ast`].
///
/// Only declarations located in the header itself are kept; includes are
/// parsed by the external parser but never become nodes. Function bodies
/// are skipped entirely.
pub struct TreeBuilder<'a> {
    ast: &'a mut Ast,
    source: Option<&'a SourceFile>,
    main_file: Option<String>,
    /// Nesting depth below class template specializations
    specialization_depth: usize,
}

/// Access context for a run of sibling declarations.
#[derive(Clone, Copy)]
struct Scope {
    default_access: AccessSpecifier,
}

impl Scope {
    fn namespace() -> Self {
        Self {
            default_access: AccessSpecifier::Public,
        }
    }

    fn record(tag: TagKind) -> Self {
        Self {
            default_access: tag.default_access(),
        }
    }
}

impl<'a> TreeBuilder<'a> {
    pub fn new(ast: &'a mut Ast) -> Self {
        Self {
            ast,
            source: None,
            main_file: None,
            specialization_depth: 0,
        }
    }

    /// Header text used to extract literal initializers the dump cannot evaluate.
    pub fn with_source(mut self, source: &'a SourceFile) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the tree for `header` from its raw dump and return the new root.
    pub fn build(mut self, header: &Path, mut raw: RawNode) -> Result<NodeId> {
        if raw.kind != "TranslationUnitDecl" {
            return Err(GenError::Dump {
                file: header.to_path_buf(),
                message: format!("expected a TranslationUnitDecl root, found `{}`", raw.kind),
            });
        }

        self.main_file = raw.resolve_locations();
        debug!(
            header = %header.display(),
            main_file = self.main_file.as_deref().unwrap_or("<none>"),
            "building declaration tree"
        );

        let root = self.ast.add_root(header.to_path_buf());
        self.build_children(root, &raw.inner, Scope::namespace())?;
        Ok(root)
    }

    fn build_children(&mut self, parent: NodeId, inner: &[RawNode], scope: Scope) -> Result<()> {
        let mut access = scope.default_access;
        for raw in inner {
            if raw.kind == "AccessSpecDecl" {
                access = raw
                    .access
                    .as_deref()
                    .and_then(AccessSpecifier::parse)
                    .unwrap_or(access);
                continue;
            }
            if raw.is_implicit || !self.in_main_file(raw) {
                continue;
            }
            let node_access = raw
                .access
                .as_deref()
                .and_then(AccessSpecifier::parse)
                .unwrap_or(access);
            self.build_decl(parent, raw, node_access)?;
        }
        Ok(())
    }

    /// Register `id` by its qualified name. Declarations nested in a class
    /// template specialization are named after the bare template, so every
    /// specialization would collide; they stay out of the registry.
    fn register(&mut self, id: NodeId) -> Result<()> {
        if self.specialization_depth > 0 {
            trace!(name = %self.ast.node(id).name, "not registering specialization member");
            return Ok(());
        }
        self.ast.register(id)
    }

    fn in_main_file(&self, raw: &RawNode) -> bool {
        match (raw.file(), &self.main_file) {
            (Some(file), Some(main)) => file == main,
            _ => true,
        }
    }

    fn build_decl(&mut self, parent: NodeId, raw: &RawNode, access: AccessSpecifier) -> Result<()> {
        match raw.kind.as_str() {
            "LinkageSpecDecl" => {
                self.build_children(parent, &raw.inner, Scope::namespace())?;
            }
            "NamespaceDecl" => {
                let id = self.add(parent, raw, NodeKind::Namespace, access, DeclData::None);
                self.register(id)?;
                self.build_children(id, &raw.inner, Scope::namespace())?;
            }
            "CXXRecordDecl" | "RecordDecl" => {
                if let Some(id) = self.build_record(parent, raw, access)? {
                    self.register(id)?;
                }
            }
            "ClassTemplateSpecializationDecl" => {
                self.specialization_depth += 1;
                let built = self.build_record(parent, raw, access);
                self.specialization_depth -= 1;
                built?;
            }
            "ClassTemplateDecl" => {
                let id = self.add(parent, raw, NodeKind::ClassTemplate, access, DeclData::None);
                self.register(id)?;
                if let Some(pattern) = raw.inner.iter().find(|c| c.kind == "CXXRecordDecl") {
                    self.build_record(id, pattern, access)?;
                }
            }
            "FunctionTemplateDecl" => {
                let id = self.add(parent, raw, NodeKind::FunctionTemplate, access, DeclData::None);
                if let Some(pattern) = raw.inner.iter().find(|c| function_kind(&c.kind).is_some()) {
                    self.build_function(id, pattern, access)?;
                }
            }
            "CXXMethodDecl" | "CXXConstructorDecl" | "CXXDestructorDecl" | "CXXConversionDecl"
            | "FunctionDecl" => {
                self.build_function(parent, raw, access)?;
            }
            "FieldDecl" | "VarDecl" => {
                let kind = if raw.kind == "FieldDecl" {
                    NodeKind::Field
                } else {
                    NodeKind::Variable
                };
                let value = self.value_decl(raw);
                self.add(parent, raw, kind, access, DeclData::Value(value));
            }
            "EnumDecl" => self.build_enum(parent, raw, access)?,
            "TypedefDecl" | "TypeAliasDecl" => {
                let underlying = raw.ty.as_ref().map(type_desc).unwrap_or_else(|| {
                    TypeDesc::new(CppType::Opaque(String::new()))
                });
                let id = self.add(
                    parent,
                    raw,
                    NodeKind::TypeAlias,
                    access,
                    DeclData::Alias(AliasDecl { underlying }),
                );
                self.register(id)?;
            }
            other => trace!(kind = other, name = raw.name(), "skipping declaration"),
        }
        Ok(())
    }

    fn build_record(
        &mut self,
        parent: NodeId,
        raw: &RawNode,
        access: AccessSpecifier,
    ) -> Result<Option<NodeId>> {
        if !raw.complete_definition {
            return Ok(None);
        }

        let tag = TagKind::parse(raw.tag_used.as_deref().unwrap_or("struct"));
        let bases = raw
            .bases
            .iter()
            .map(|base| BaseSpecifier {
                access: base
                    .access
                    .as_deref()
                    .and_then(AccessSpecifier::parse)
                    .unwrap_or(tag.default_access()),
                ty: type_desc(&base.ty),
                is_virtual: base.is_virtual,
            })
            .collect();
        let template_args = raw
            .inner
            .iter()
            .filter(|c| c.kind == "TemplateArgument")
            .filter_map(|c| c.ty.as_ref())
            .map(|ty| type_desc(ty).canonical)
            .collect();

        let record = RecordDecl {
            tag,
            bases,
            is_definition: true,
            is_abstract: raw.definition_data.as_ref().is_some_and(|d| d.is_abstract),
            template_args,
        };
        let id = self.add(parent, raw, NodeKind::Record, access, DeclData::Record(record));
        self.build_children(id, &raw.inner, Scope::record(tag))?;

        // The pattern of a class template shares the template's name.
        let registrable = raw.kind != "ClassTemplateSpecializationDecl"
            && self.ast.node(parent).kind != NodeKind::ClassTemplate;
        Ok(registrable.then_some(id))
    }

    fn build_function(&mut self, parent: NodeId, raw: &RawNode, access: AccessSpecifier) -> Result<()> {
        let Some(kind) = function_kind(&raw.kind) else {
            return Ok(());
        };
        if raw.is_implicit {
            return Ok(());
        }

        let (return_type, is_const) = raw
            .ty
            .as_ref()
            .and_then(|ty| {
                let (written, is_const) = split_function_spelling(&ty.qual_type)?;
                let desugared = ty
                    .desugared_qual_type
                    .as_deref()
                    .and_then(split_function_spelling)
                    .map(|(spelling, _)| spelling);
                Some((
                    TypeDesc::from_spellings(&written, desugared.as_deref()),
                    is_const,
                ))
            })
            .unwrap_or_else(|| (TypeDesc::new(CppType::Void), false));

        let mut function = FunctionDecl::new(return_type);
        function.params = raw
            .inner
            .iter()
            .filter(|c| c.kind == "ParmVarDecl")
            .map(|p| Param {
                name: p.name().to_string(),
                ty: p.ty.as_ref().map(type_desc).unwrap_or_else(|| {
                    TypeDesc::new(CppType::Opaque(String::new()))
                }),
            })
            .collect();
        function.is_static = raw.is_static();
        function.is_override = raw.inner.iter().any(|c| c.kind == "OverrideAttr");
        function.is_virtual = raw.is_virtual || raw.pure || function.is_override;
        function.is_pure = raw.pure;
        function.is_const = is_const;
        function.is_deleted = raw.explicitly_deleted;
        function.is_definition = raw.inner.iter().any(|c| c.kind == "CompoundStmt");
        function.mangled_name = raw.mangled_name.clone();

        self.add(parent, raw, kind, access, DeclData::Function(function));
        Ok(())
    }

    fn build_enum(&mut self, parent: NodeId, raw: &RawNode, access: AccessSpecifier) -> Result<()> {
        let data = EnumDecl {
            is_scoped: raw.scoped_enum_tag.is_some(),
            underlying: raw.fixed_underlying_type.as_ref().map(type_desc),
        };
        let id = self.add(parent, raw, NodeKind::Enum, access, DeclData::Enum(data));

        let mut constants = 0usize;
        for constant in raw.inner.iter().filter(|c| c.kind == "EnumConstantDecl") {
            let value = self.value_decl(constant);
            self.add(id, constant, NodeKind::EnumConstant, access, DeclData::Value(value));
            constants += 1;
        }

        // Opaque declarations (`enum class E : int;`) carry no constants.
        if constants > 0 {
            self.register(id)?;
        }
        Ok(())
    }

    fn value_decl(&self, raw: &RawNode) -> ValueDecl {
        let ty = raw
            .ty
            .as_ref()
            .map(type_desc)
            .unwrap_or_else(|| TypeDesc::new(CppType::Opaque(String::new())));
        let mut value = ValueDecl::new(ty);
        value.is_static = raw.is_static();
        value.is_constexpr = raw.constexpr;

        let initializer = raw.initializer();
        value.has_init = initializer.is_some();
        value.literal = initializer
            .and_then(RawNode::evaluate_literal)
            .or_else(|| self.literal_from_text(raw, initializer.is_some()));
        value
    }

    fn literal_from_text(&self, raw: &RawNode, has_init: bool) -> Option<String> {
        if !has_init || raw.kind == "EnumConstantDecl" {
            return None;
        }
        let (start, end) = raw.range.byte_range()?;
        let slice = self.source?.slice(start, end)?;
        let literal = literal_from_source(slice);
        if literal.is_none() {
            trace!(name = raw.name(), "initializer is not a literal");
        }
        literal
    }

    fn add(
        &mut self,
        parent: NodeId,
        raw: &RawNode,
        kind: NodeKind,
        access: AccessSpecifier,
        decl: DeclData,
    ) -> NodeId {
        let node = AstNode::new(kind, raw.name())
            .with_access(access)
            .with_location(location(raw))
            .with_identity(raw.id.clone())
            .with_decl(decl);
        self.ast.add_child(parent, node)
    }
}

fn function_kind(kind: &str) -> Option<NodeKind> {
    match kind {
        "CXXMethodDecl" => Some(NodeKind::Method),
        "CXXConstructorDecl" => Some(NodeKind::Constructor),
        "CXXDestructorDecl" => Some(NodeKind::Destructor),
        "CXXConversionDecl" => Some(NodeKind::ConversionOperator),
        "FunctionDecl" => Some(NodeKind::Function),
        _ => None,
    }
}

fn type_desc(ty: &RawType) -> TypeDesc {
    TypeDesc::from_spellings(&ty.qual_type, ty.desugared_qual_type.as_deref())
}

fn location(raw: &RawNode) -> SourceLocation {
    let loc = raw.loc.effective();
    SourceLocation {
        file: raw.file().map(PathBuf::from),
        line: loc.line.unwrap_or(0),
        column: loc.col.unwrap_or(0),
        range: raw.range.byte_range(),
    }
}
