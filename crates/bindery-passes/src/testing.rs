//! Hand-built trees for pass tests.

use crate::framework::{run_pass, Facts, FileUnit, Pass, PassContext, Pipeline};
use crate::settings::Settings;
use crate::sink::{Category, OutputSink};
use bindery_clang::{
    AccessSpecifier, AliasDecl, Ast, AstNode, BaseSpecifier, DeclData, EnumDecl, FunctionDecl,
    NodeId, NodeKind, Param, RecordDecl, TagKind, TypeDesc, ValueDecl,
};
use bindery_common::Result;

pub(crate) struct Fixture {
    pub ast: Ast,
    pub files: Vec<FileUnit>,
    pub facts: Facts,
    pub settings: Settings,
    pub sink: OutputSink,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            ast: Ast::new(),
            files: Vec::new(),
            facts: Facts::default(),
            settings: Settings::default(),
            sink: OutputSink::in_memory(),
        }
    }

    pub fn file(&mut self, relative: &str) -> NodeId {
        let root = self.ast.add_root(relative.into());
        self.files.push(FileUnit::new(root, relative, relative));
        root
    }

    pub fn add(&mut self, parent: NodeId, kind: NodeKind, name: &str) -> NodeId {
        self.ast.add_child(parent, AstNode::new(kind, name))
    }

    pub fn namespace(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.add(parent, NodeKind::Namespace, name);
        self.ast.register(id).unwrap();
        id
    }

    pub fn class(&mut self, parent: NodeId, name: &str, bases: &[&str]) -> NodeId {
        let record = RecordDecl {
            tag: TagKind::Class,
            bases: bases
                .iter()
                .map(|b| BaseSpecifier {
                    access: AccessSpecifier::Public,
                    ty: TypeDesc::from_spellings(b, None),
                    is_virtual: false,
                })
                .collect(),
            is_definition: true,
            ..Default::default()
        };
        let id = self.ast.add_child(
            parent,
            AstNode::new(NodeKind::Record, name).with_decl(DeclData::Record(record)),
        );
        self.ast.register(id).unwrap();
        id
    }

    pub fn method(&mut self, record: NodeId, name: &str, ret: &str, params: &[&str]) -> NodeId {
        let mut func = FunctionDecl::new(TypeDesc::from_spellings(ret, None));
        func.params = params
            .iter()
            .enumerate()
            .map(|(i, p)| Param {
                name: format!("p{i}"),
                ty: TypeDesc::from_spellings(p, None),
            })
            .collect();
        self.function(record, NodeKind::Method, name, func)
    }

    pub fn function(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: &str,
        func: FunctionDecl,
    ) -> NodeId {
        self.ast
            .add_child(parent, AstNode::new(kind, name).with_decl(DeclData::Function(func)))
    }

    pub fn int_method(&mut self, record: NodeId, name: &str) -> NodeId {
        self.method(record, name, "int", &[])
    }

    pub fn field(&mut self, record: NodeId, name: &str, ty: &str) -> NodeId {
        let value = ValueDecl::new(TypeDesc::from_spellings(ty, None));
        self.ast.add_child(
            record,
            AstNode::new(NodeKind::Field, name).with_decl(DeclData::Value(value)),
        )
    }

    pub fn variable(&mut self, parent: NodeId, name: &str, ty: &str, literal: Option<&str>) -> NodeId {
        let mut value = ValueDecl::new(TypeDesc::from_spellings(ty, None));
        value.has_init = true;
        value.literal = literal.map(str::to_string);
        self.ast.add_child(
            parent,
            AstNode::new(NodeKind::Variable, name).with_decl(DeclData::Value(value)),
        )
    }

    pub fn enumeration(
        &mut self,
        parent: NodeId,
        name: &str,
        scoped: bool,
        constants: &[(&str, Option<&str>)],
    ) -> NodeId {
        let decl = EnumDecl {
            is_scoped: scoped,
            underlying: None,
        };
        let id = self
            .ast
            .add_child(parent, AstNode::new(NodeKind::Enum, name).with_decl(DeclData::Enum(decl)));
        for (constant, literal) in constants {
            let mut value = ValueDecl::new(TypeDesc::from_spellings(name, None));
            value.literal = literal.map(str::to_string);
            self.ast.add_child(
                id,
                AstNode::new(NodeKind::EnumConstant, *constant).with_decl(DeclData::Value(value)),
            );
        }
        self.ast.register(id).unwrap();
        id
    }

    pub fn alias(&mut self, parent: NodeId, name: &str, written: &str, canonical: &str) -> NodeId {
        let alias = AliasDecl {
            underlying: TypeDesc::from_spellings(written, Some(canonical)),
        };
        let id = self.ast.add_child(
            parent,
            AstNode::new(NodeKind::TypeAlias, name).with_decl(DeclData::Alias(alias)),
        );
        self.ast.register(id).unwrap();
        id
    }

    pub fn run_pass(&mut self, pass: &mut dyn Pass) -> Result<()> {
        let mut cx = PassContext::new(
            &mut self.ast,
            &mut self.sink,
            &mut self.facts,
            &self.settings,
            &self.files,
        );
        run_pass(pass, &mut cx)
    }

    pub fn run(&mut self, pipeline: Pipeline) -> Result<()> {
        pipeline.run(
            &mut self.ast,
            &self.files,
            &mut self.facts,
            &mut self.sink,
            &self.settings,
        )
    }

    pub fn output(&self, subsystem: &str, category: Category) -> &str {
        self.sink.contents(subsystem, category).unwrap_or("")
    }

    pub fn lines(&self, subsystem: &str, category: Category) -> Vec<&str> {
        self.output(subsystem, category).lines().collect()
    }
}
