//! Tree building from hand-written clang JSON dumps.

use bindery_clang::{
    load_header, parse_dump, AccessSpecifier, Ast, CppType, DumpFileSource, NodeId, NodeKind,
    TagKind, TreeBuilder,
};
use bindery_common::{GenError, SourceMap};
use std::path::Path;

const NODE_DUMP: &str = r#"{
  "id": "0x1", "kind": "TranslationUnitDecl", "loc": {}, "range": {"begin": {}, "end": {}},
  "inner": [
    {"id": "0x2", "kind": "TypedefDecl", "isImplicit": true, "name": "__int128_t", "loc": {},
     "type": {"qualType": "__int128"}},
    {"id": "0x3", "kind": "NamespaceDecl", "name": "Urho3D",
     "loc": {"offset": 10, "file": "Container/Str.h", "line": 2, "col": 11, "tokLen": 6,
             "includedFrom": {"file": "Scene/Node.h"}},
     "inner": [
       {"id": "0x4", "kind": "CXXRecordDecl", "name": "String", "tagUsed": "class",
        "completeDefinition": true, "loc": {"offset": 30, "line": 4, "col": 7, "tokLen": 6}}
     ]},
    {"id": "0x10", "kind": "NamespaceDecl", "name": "Urho3D",
     "loc": {"offset": 60, "file": "Scene/Node.h", "line": 5, "col": 11, "tokLen": 6},
     "inner": [
       {"id": "0x11", "kind": "CXXRecordDecl", "name": "Node", "tagUsed": "class",
        "completeDefinition": true,
        "loc": {"offset": 100, "line": 8, "col": 7, "tokLen": 4},
        "definitionData": {"isAbstract": false, "isPolymorphic": true},
        "bases": [{"access": "public", "type": {"qualType": "Animatable", "desugaredQualType": "Urho3D::Animatable"}, "writtenAccess": "public"}],
        "inner": [
          {"id": "0x12", "kind": "CXXRecordDecl", "name": "Node", "tagUsed": "class", "isImplicit": true,
           "loc": {"offset": 100, "col": 7, "tokLen": 4}},
          {"id": "0x13", "kind": "FieldDecl", "name": "hiddenByDefault",
           "loc": {"offset": 130, "line": 9, "col": 9, "tokLen": 15},
           "type": {"qualType": "int"}},
          {"id": "0x14", "kind": "AccessSpecDecl", "access": "public",
           "loc": {"offset": 150, "line": 10, "col": 1, "tokLen": 6}},
          {"id": "0x15", "kind": "CXXConstructorDecl", "name": "Node",
           "loc": {"offset": 170, "line": 11, "col": 5, "tokLen": 4},
           "type": {"qualType": "void (Urho3D::Context *)"},
           "inner": [
             {"id": "0x16", "kind": "ParmVarDecl", "name": "context",
              "loc": {"offset": 184, "col": 19, "tokLen": 7},
              "type": {"qualType": "Urho3D::Context *"}}
           ]},
          {"id": "0x17", "kind": "CXXMethodDecl", "name": "GetPosition",
           "loc": {"offset": 200, "line": 12, "col": 20, "tokLen": 11},
           "type": {"qualType": "const Urho3D::Vector3 &() const"},
           "inner": [{"kind": "CompoundStmt"}]},
          {"id": "0x18", "kind": "CXXMethodDecl", "name": "SetPosition",
           "loc": {"offset": 240, "line": 13, "col": 10, "tokLen": 11},
           "type": {"qualType": "void (const Urho3D::Vector3 &)"},
           "inner": [
             {"id": "0x19", "kind": "ParmVarDecl", "name": "position",
              "loc": {"offset": 270, "col": 40, "tokLen": 8},
              "type": {"qualType": "const Urho3D::Vector3 &"}}
           ]},
          {"id": "0x1a", "kind": "CXXMethodDecl", "name": "OnMarkedDirty", "virtual": true,
           "loc": {"offset": 300, "line": 14, "col": 18, "tokLen": 13},
           "type": {"qualType": "void (Urho3D::Node *)"},
           "inner": [
             {"id": "0x1b", "kind": "ParmVarDecl", "name": "node",
              "loc": {"offset": 320, "col": 38, "tokLen": 4},
              "type": {"qualType": "Urho3D::Node *"}},
             {"id": "0x1c", "kind": "OverrideAttr", "range": {"begin": {"offset": 330, "col": 48, "tokLen": 8}, "end": {"offset": 330, "col": 48, "tokLen": 8}}}
           ]},
          {"id": "0x1d", "kind": "CXXMethodDecl", "name": "operator==",
           "loc": {"offset": 350, "line": 15, "col": 10, "tokLen": 8},
           "type": {"qualType": "bool (const Urho3D::Node &) const"},
           "inner": [
             {"id": "0x1e", "kind": "ParmVarDecl", "name": "rhs",
              "loc": {"offset": 380, "col": 40, "tokLen": 3},
              "type": {"qualType": "const Urho3D::Node &"}}
           ]},
          {"id": "0x1f", "kind": "AccessSpecDecl", "access": "private",
           "loc": {"offset": 400, "line": 17, "col": 1, "tokLen": 7}},
          {"id": "0x20", "kind": "FieldDecl", "name": "position_",
           "loc": {"offset": 420, "line": 18, "col": 13, "tokLen": 9},
           "type": {"qualType": "Urho3D::Vector3"}}
        ]},
       {"id": "0x30", "kind": "VarDecl", "name": "kMaxPlayers", "init": "c",
        "loc": {"offset": 500, "line": 21, "col": 11, "tokLen": 11},
        "type": {"qualType": "const int"},
        "inner": [{"id": "0x31", "kind": "IntegerLiteral", "type": {"qualType": "int"}, "value": "8"}]},
       {"id": "0x32", "kind": "VarDecl", "name": "kTotal", "init": "c",
        "loc": {"offset": 530, "line": 22, "col": 11, "tokLen": 6},
        "type": {"qualType": "const int"},
        "inner": [{"id": "0x33", "kind": "BinaryOperator", "opcode": "*",
                   "inner": [{"kind": "ImplicitCastExpr", "inner": [{"kind": "DeclRefExpr"}]},
                             {"kind": "IntegerLiteral", "value": "2"}]}]},
       {"id": "0x40", "kind": "EnumDecl", "name": "TextureUnit",
        "loc": {"offset": 560, "line": 24, "col": 6, "tokLen": 11},
        "inner": [
          {"id": "0x41", "kind": "EnumConstantDecl", "name": "TU_DIFFUSE",
           "loc": {"offset": 580, "line": 26, "col": 5, "tokLen": 10},
           "type": {"qualType": "Urho3D::TextureUnit"},
           "inner": [{"kind": "ConstantExpr", "value": "0",
                      "inner": [{"kind": "IntegerLiteral", "value": "0"}]}]},
          {"id": "0x42", "kind": "EnumConstantDecl", "name": "TU_NORMAL",
           "loc": {"offset": 600, "line": 27, "col": 5, "tokLen": 9},
           "type": {"qualType": "Urho3D::TextureUnit"}}
        ]},
       {"id": "0x50", "kind": "EnumDecl", "name": "DragAndDropMode", "scopedEnumTag": "class",
        "fixedUnderlyingType": {"qualType": "unsigned int"},
        "loc": {"offset": 620, "line": 30, "col": 12, "tokLen": 15},
        "inner": [
          {"id": "0x51", "kind": "EnumConstantDecl", "name": "DD_SOURCE",
           "loc": {"offset": 640, "line": 32, "col": 5, "tokLen": 9},
           "type": {"qualType": "Urho3D::DragAndDropMode"},
           "inner": [{"kind": "ConstantExpr", "value": "1", "inner": [{"kind": "IntegerLiteral", "value": "1"}]}]}
        ]},
       {"id": "0x60", "kind": "TypedefDecl", "name": "NodeVector",
        "loc": {"offset": 700, "line": 35, "col": 33, "tokLen": 10},
        "type": {"qualType": "ea::vector<Node *>", "desugaredQualType": "ea::vector<Urho3D::Node *>"}},
       {"id": "0x70", "kind": "LinkageSpecDecl",
        "loc": {"offset": 720, "line": 37, "col": 8, "tokLen": 3},
        "inner": [
          {"id": "0x71", "kind": "FunctionDecl", "name": "GetNodeCount",
           "loc": {"offset": 740, "line": 38, "col": 5, "tokLen": 12},
           "type": {"qualType": "int ()"}}
        ]},
       {"id": "0x80", "kind": "ClassTemplateDecl", "name": "Handle",
        "loc": {"offset": 800, "line": 41, "col": 29, "tokLen": 6},
        "inner": [
          {"id": "0x81", "kind": "TemplateTypeParmDecl", "name": "T",
           "loc": {"offset": 790, "col": 19, "tokLen": 1}},
          {"id": "0x82", "kind": "CXXRecordDecl", "name": "Handle", "tagUsed": "struct",
           "completeDefinition": true, "loc": {"offset": 800, "col": 29, "tokLen": 6}}
        ]},
       {"id": "0x90", "kind": "ClassTemplateSpecializationDecl", "name": "IsFlagSet", "tagUsed": "struct",
        "completeDefinition": true,
        "loc": {"offset": 850, "line": 44, "col": 29, "tokLen": 9},
        "inner": [
          {"kind": "TemplateArgument", "type": {"qualType": "Urho3D::DragAndDropMode"}},
          {"id": "0x91", "kind": "VarDecl", "name": "value_", "storageClass": "static", "constexpr": true,
           "init": "c", "loc": {"offset": 880, "col": 50, "tokLen": 6},
           "type": {"qualType": "const bool"},
           "inner": [{"kind": "CXXBoolLiteralExpr", "value": true}]}
        ]}
     ]}
  ]
}"#;

fn build(json: &str, header: &str) -> (Ast, NodeId) {
    let mut ast = Ast::new();
    let raw = parse_dump(Path::new(header), json.as_bytes()).unwrap();
    let root = TreeBuilder::new(&mut ast).build(Path::new(header), raw).unwrap();
    (ast, root)
}

fn find(ast: &Ast, fqn: &str) -> NodeId {
    fn walk(ast: &Ast, id: NodeId, fqn: &str) -> Option<NodeId> {
        if ast.qualified_name(id).as_deref() == Some(fqn) {
            return Some(id);
        }
        ast.children(id).iter().find_map(|&c| walk(ast, c, fqn))
    }
    ast.roots()
        .iter()
        .find_map(|&r| walk(ast, r, fqn))
        .unwrap_or_else(|| panic!("{fqn} not found"))
}

#[test]
fn test_only_main_file_declarations_are_kept() {
    let (ast, root) = build(NODE_DUMP, "Scene/Node.h");
    let namespaces: Vec<NodeId> = ast.children_of_kind(root, NodeKind::Namespace).collect();
    assert_eq!(namespaces.len(), 1);
    assert!(ast.lookup("Urho3D::String").is_none());
    assert!(ast.lookup("Urho3D::Node").is_some());
}

#[test]
fn test_record_members_and_access() {
    let (ast, _) = build(NODE_DUMP, "Scene/Node.h");
    let node = find(&ast, "Urho3D::Node");
    let record = ast.node(node).as_record().unwrap();
    assert_eq!(record.tag, TagKind::Class);
    assert_eq!(record.bases.len(), 1);
    assert_eq!(record.bases[0].class_name(), Some("Urho3D::Animatable"));
    assert_eq!(record.bases[0].access, AccessSpecifier::Public);

    // Injected class name is skipped; members before any specifier are private.
    let hidden = find(&ast, "Urho3D::Node::hiddenByDefault");
    assert_eq!(ast.node(hidden).access, AccessSpecifier::Private);
    let ctor = find(&ast, "Urho3D::Node::Node");
    assert_eq!(ast.node(ctor).kind, NodeKind::Constructor);
    assert_eq!(ast.node(ctor).access, AccessSpecifier::Public);
    let field = find(&ast, "Urho3D::Node::position_");
    assert_eq!(ast.node(field).access, AccessSpecifier::Private);
    assert_eq!(ast.methods(node).count(), 4);
}

#[test]
fn test_method_signatures() {
    let (ast, _) = build(NODE_DUMP, "Scene/Node.h");

    let getter = find(&ast, "Urho3D::Node::GetPosition");
    let f = ast.node(getter).as_function().unwrap();
    assert!(f.is_const);
    assert!(f.is_definition);
    assert!(f.params.is_empty());
    assert_eq!(f.return_type.value_type(), &CppType::named("Urho3D::Vector3"));

    let setter = find(&ast, "Urho3D::Node::SetPosition");
    let f = ast.node(setter).as_function().unwrap();
    assert!(f.return_type.canonical.is_void());
    assert_eq!(f.params.len(), 1);
    assert_eq!(f.params[0].name, "position");
    assert_eq!(f.params[0].ty.value_type(), &CppType::named("Urho3D::Vector3"));

    let dirty = find(&ast, "Urho3D::Node::OnMarkedDirty");
    let f = ast.node(dirty).as_function().unwrap();
    assert!(f.is_virtual && f.is_override && !f.is_pure);

    let op = find(&ast, "Urho3D::Node::operator==");
    assert!(ast.node(op).is_operator());
}

#[test]
fn test_variable_literals() {
    let (ast, _) = build(NODE_DUMP, "Scene/Node.h");

    let max = find(&ast, "Urho3D::kMaxPlayers");
    let v = ast.node(max).as_value().unwrap();
    assert!(v.ty.is_const);
    assert_eq!(v.ty.canonical, CppType::int());
    assert_eq!(v.literal.as_deref(), Some("8"));

    let total = find(&ast, "Urho3D::kTotal");
    let v = ast.node(total).as_value().unwrap();
    assert!(v.has_init);
    assert!(!v.literal_extracted());
}

#[test]
fn test_enums() {
    let (ast, _) = build(NODE_DUMP, "Scene/Node.h");

    let unit = find(&ast, "Urho3D::TextureUnit");
    assert!(!ast.node(unit).as_enum().unwrap().is_scoped);
    let diffuse = find(&ast, "Urho3D::TextureUnit::TU_DIFFUSE");
    assert_eq!(ast.node(diffuse).as_value().unwrap().literal.as_deref(), Some("0"));
    assert_eq!(ast.shortest_qualified_name(diffuse).as_deref(), Some("Urho3D::TU_DIFFUSE"));
    let normal = find(&ast, "Urho3D::TextureUnit::TU_NORMAL");
    assert_eq!(ast.node(normal).as_value().unwrap().literal, None);

    let mode = find(&ast, "Urho3D::DragAndDropMode");
    let data = ast.node(mode).as_enum().unwrap();
    assert!(data.is_scoped);
    assert_eq!(data.underlying.as_ref().map(|u| u.canonical.clone()), Some(CppType::uint()));
}

#[test]
fn test_aliases_linkage_and_templates() {
    let (ast, root) = build(NODE_DUMP, "Scene/Node.h");

    let alias = find(&ast, "Urho3D::NodeVector");
    assert_eq!(ast.lookup("Urho3D::NodeVector"), Some(alias));
    let underlying = &ast.node(alias).as_alias().unwrap().underlying;
    assert!(matches!(&underlying.canonical, CppType::Template { name, .. } if name == "ea::vector"));

    // extern "C" blocks are flattened into the enclosing scope.
    let count = find(&ast, "Urho3D::GetNodeCount");
    assert_eq!(ast.node(count).kind, NodeKind::Function);
    assert_eq!(ast.node(ast.parent(count).unwrap()).kind, NodeKind::Namespace);

    let handle = ast.lookup("Urho3D::Handle").unwrap();
    assert_eq!(ast.node(handle).kind, NodeKind::ClassTemplate);
    assert_eq!(ast.children(handle).len(), 1);

    let marker = find(&ast, "Urho3D::IsFlagSet");
    let record = ast.node(marker).as_record().unwrap();
    assert_eq!(record.template_args, vec![CppType::named("Urho3D::DragAndDropMode")]);
    let value = find(&ast, "Urho3D::IsFlagSet::value_");
    assert_eq!(ast.node(value).as_value().unwrap().literal.as_deref(), Some("true"));

    assert!(ast.dump(root).contains("record Node : Animatable [public]"));
}

const SCALE_HEADER: &str = "namespace Urho3D {\nconst float kScale = 1.5f;\n}\n";

// The initializer is an expression the dump does not evaluate.
const SCALE_DUMP: &str = r#"{
  "kind": "TranslationUnitDecl",
  "inner": [
    {"kind": "NamespaceDecl", "name": "Urho3D",
     "loc": {"offset": 10, "file": "Math/Scale.h", "line": 1, "col": 11, "tokLen": 6},
     "inner": [
       {"kind": "VarDecl", "name": "kScale", "init": "c",
        "loc": {"offset": 31, "line": 2, "col": 13, "tokLen": 6},
        "range": {"begin": {"offset": 19, "col": 1, "tokLen": 5},
                  "end": {"offset": 40, "col": 22, "tokLen": 4}},
        "type": {"qualType": "const float"},
        "inner": [{"kind": "UnexposedExpr"}]}
     ]}
  ]
}"#;

#[test]
fn test_literal_falls_back_to_source_text() {
    let mut sources = SourceMap::new();
    let id = sources.add_file("Math/Scale.h", SCALE_HEADER.to_string());
    let mut ast = Ast::new();
    let raw = parse_dump(Path::new("Math/Scale.h"), SCALE_DUMP.as_bytes()).unwrap();
    TreeBuilder::new(&mut ast)
        .with_source(sources.get(id).unwrap())
        .build(Path::new("Math/Scale.h"), raw)
        .unwrap();

    let scale = find(&ast, "Urho3D::kScale");
    assert_eq!(ast.node(scale).as_value().unwrap().literal.as_deref(), Some("1.5f"));
}

#[test]
fn test_load_header_from_dump_file() {
    let dir = tempfile::tempdir().unwrap();
    let header = dir.path().join("Scale.h");
    std::fs::write(&header, SCALE_HEADER).unwrap();
    std::fs::write(DumpFileSource::dump_path(&header), SCALE_DUMP).unwrap();

    let mut ast = Ast::new();
    let mut sources = SourceMap::new();
    let root = load_header(&mut ast, &mut sources, &DumpFileSource::new(), &header).unwrap();

    assert_eq!(ast.node(root).kind, NodeKind::TranslationUnit);
    assert!(sources.get_by_path(&header).is_some());
    let scale = find(&ast, "Urho3D::kScale");
    assert_eq!(ast.node(scale).as_value().unwrap().literal.as_deref(), Some("1.5f"));
    assert!(ast.dump(root).contains("kScale : const float = 1.5f"));
}

#[test]
fn test_load_header_without_dump_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let header = dir.path().join("Missing.h");
    std::fs::write(&header, "").unwrap();

    let mut ast = Ast::new();
    let err = load_header(&mut ast, &mut SourceMap::new(), &DumpFileSource::new(), &header).unwrap_err();
    assert!(matches!(err, GenError::Io { .. }));
}

#[test]
fn test_duplicate_definitions_across_headers_are_fatal() {
    let json = r#"{
      "kind": "TranslationUnitDecl",
      "inner": [
        {"kind": "CXXRecordDecl", "name": "Widget", "tagUsed": "struct", "completeDefinition": true,
         "loc": {"offset": 7, "file": "FILE", "line": 1, "col": 8, "tokLen": 6}}
      ]
    }"#;

    let mut ast = Ast::new();
    let first = parse_dump(Path::new("UI/A.h"), json.replace("FILE", "UI/A.h").as_bytes()).unwrap();
    TreeBuilder::new(&mut ast).build(Path::new("UI/A.h"), first).unwrap();

    let second = parse_dump(Path::new("UI/B.h"), json.replace("FILE", "UI/B.h").as_bytes()).unwrap();
    let err = TreeBuilder::new(&mut ast)
        .build(Path::new("UI/B.h"), second)
        .unwrap_err();
    assert!(matches!(err, GenError::DuplicateDefinition { ref fqn, .. } if fqn == "Widget"));
}

#[test]
fn test_specialization_members_share_a_name_without_colliding() {
    let json = r#"{
      "kind": "TranslationUnitDecl",
      "inner": [
        {"kind": "ClassTemplateSpecializationDecl", "name": "Traits", "tagUsed": "struct",
         "completeDefinition": true,
         "loc": {"offset": 30, "file": "Core/Traits.h", "line": 2, "col": 8, "tokLen": 6},
         "inner": [
           {"kind": "TemplateArgument", "type": {"qualType": "int"}},
           {"kind": "CXXRecordDecl", "name": "Tag", "tagUsed": "struct", "completeDefinition": true,
            "loc": {"offset": 50, "line": 2, "col": 28, "tokLen": 3}},
           {"kind": "EnumDecl", "name": "Kind",
            "loc": {"offset": 60, "line": 2, "col": 38, "tokLen": 4},
            "inner": [{"kind": "EnumConstantDecl", "name": "KIND_A",
                       "loc": {"offset": 67, "line": 2, "col": 45, "tokLen": 6}}]}
         ]},
        {"kind": "ClassTemplateSpecializationDecl", "name": "Traits", "tagUsed": "struct",
         "completeDefinition": true,
         "loc": {"offset": 90, "line": 5, "col": 8, "tokLen": 6},
         "inner": [
           {"kind": "TemplateArgument", "type": {"qualType": "float"}},
           {"kind": "CXXRecordDecl", "name": "Tag", "tagUsed": "struct", "completeDefinition": true,
            "loc": {"offset": 110, "line": 5, "col": 30, "tokLen": 3}},
           {"kind": "EnumDecl", "name": "Kind",
            "loc": {"offset": 120, "line": 5, "col": 40, "tokLen": 4},
            "inner": [{"kind": "EnumConstantDecl", "name": "KIND_A",
                       "loc": {"offset": 127, "line": 5, "col": 47, "tokLen": 6}}]}
         ]},
        {"kind": "CXXRecordDecl", "name": "Tag", "tagUsed": "struct", "completeDefinition": true,
         "loc": {"offset": 150, "line": 7, "col": 8, "tokLen": 3}}
      ]
    }"#;

    let (ast, root) = build(json, "Core/Traits.h");

    let specializations: Vec<NodeId> = ast
        .children(root)
        .iter()
        .copied()
        .filter(|&c| ast.node(c).name.as_str() == "Traits")
        .collect();
    assert_eq!(specializations.len(), 2);
    for &spec in &specializations {
        assert_eq!(ast.children(spec).len(), 2);
    }
    assert!(ast.lookup("Traits").is_none());
    assert!(ast.lookup("Traits::Tag").is_none());
    assert!(ast.lookup("Traits::Kind").is_none());
    // Declarations outside the specializations are still registered.
    assert!(ast.lookup("Tag").is_some());
}

#[test]
fn test_non_translation_unit_root_is_rejected() {
    let mut ast = Ast::new();
    let raw = parse_dump(Path::new("a.h"), br#"{"kind": "NamespaceDecl"}"#).unwrap();
    let err = TreeBuilder::new(&mut ast).build(Path::new("a.h"), raw).unwrap_err();
    assert!(matches!(err, GenError::Dump { .. }));
}
