//! In-process parser adapter over libclang, loaded at runtime.
//!
//! Walks live cursors into the same [`RawNode`] shape the JSON dump has, so
//! the tree builder does not care which adapter produced a tree.

use crate::parse::AstSource;
use crate::raw::{RawBase, RawDefinitionData, RawIncludedFrom, RawLoc, RawNode, RawRange, RawType};
use bindery_common::{GenError, Result};
use clang_sys::*;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

/// Parser that uses libclang to parse headers in-process.
#[derive(Debug, Clone)]
pub struct LibclangSource {
    args: Vec<String>,
}

impl LibclangSource {
    /// Load libclang and create a source passing `args` to the parser.
    pub fn new(args: Vec<String>) -> Result<Self> {
        if !clang_sys::is_loaded() {
            clang_sys::load().map_err(|message| GenError::ParserUnavailable {
                program: "libclang".to_string(),
                message,
            })?;
        }
        Ok(Self { args })
    }
}

impl AstSource for LibclangSource {
    fn parse(&self, header: &Path) -> Result<RawNode> {
        let path = header.to_string_lossy();
        let c_path = CString::new(path.as_ref())
            .map_err(|_| GenError::parse(header, "path contains a NUL byte"))?;

        let mut args = vec!["-x".to_string(), "c++-header".to_string()];
        args.extend(self.args.iter().cloned());
        let c_args = args
            .iter()
            .map(|a| CString::new(a.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| GenError::parse(header, "parser argument contains a NUL byte"))?;
        let c_arg_ptrs: Vec<*const c_char> = c_args.iter().map(|s| s.as_ptr()).collect();

        unsafe {
            let index = clang_createIndex(0, 0);
            if index.is_null() {
                return Err(GenError::ParserUnavailable {
                    program: "libclang".to_string(),
                    message: "failed to create clang index".to_string(),
                });
            }

            let tu = clang_parseTranslationUnit(
                index,
                c_path.as_ptr(),
                c_arg_ptrs.as_ptr(),
                c_arg_ptrs.len() as i32,
                ptr::null_mut(),
                0,
                CXTranslationUnit_SkipFunctionBodies,
            );
            if tu.is_null() {
                clang_disposeIndex(index);
                return Err(GenError::parse(header, "libclang could not create a translation unit"));
            }

            let mut errors = Vec::new();
            for i in 0..clang_getNumDiagnostics(tu) {
                let diag = clang_getDiagnostic(tu, i);
                if clang_getDiagnosticSeverity(diag) >= CXDiagnostic_Error {
                    errors.push(cx_string_to_string(clang_formatDiagnostic(
                        diag,
                        clang_defaultDiagnosticDisplayOptions(),
                    )));
                }
                clang_disposeDiagnostic(diag);
            }
            if !errors.is_empty() {
                clang_disposeTranslationUnit(tu);
                clang_disposeIndex(index);
                return Err(GenError::parse(header, errors.join("\n")));
            }

            let cursor = clang_getTranslationUnitCursor(tu);
            let mut root = RawNode::new("TranslationUnitDecl");
            root.inner = convert_children(cursor, true);

            clang_disposeTranslationUnit(tu);
            clang_disposeIndex(index);
            Ok(root)
        }
    }

    fn name(&self) -> &'static str {
        "libclang"
    }
}

struct VisitState {
    nodes: Vec<RawNode>,
    main_file_only: bool,
}

unsafe fn convert_children(cursor: CXCursor, main_file_only: bool) -> Vec<RawNode> {
    extern "C" fn visitor(child: CXCursor, _parent: CXCursor, data: CXClientData) -> CXChildVisitResult {
        unsafe {
            let state = &mut *(data as *mut VisitState);
            if clang_Cursor_isNull(child) != 0 {
                return CXChildVisit_Continue;
            }
            if state.main_file_only
                && clang_Location_isFromMainFile(clang_getCursorLocation(child)) == 0
            {
                return CXChildVisit_Continue;
            }
            if let Some(node) = convert_cursor(child) {
                state.nodes.push(node);
            }
            CXChildVisit_Continue
        }
    }

    let mut state = VisitState {
        nodes: Vec::new(),
        main_file_only,
    };
    clang_visitChildren(cursor, visitor, &mut state as *mut VisitState as CXClientData);
    state.nodes
}

unsafe fn convert_cursor(cursor: CXCursor) -> Option<RawNode> {
    let kind = clang_getCursorKind(cursor);
    let mut node = match kind {
        CXCursor_Namespace => container(cursor, "NamespaceDecl"),
        CXCursor_LinkageSpec => container(cursor, "LinkageSpecDecl"),
        CXCursor_ClassDecl | CXCursor_StructDecl | CXCursor_UnionDecl => record(cursor, kind),
        CXCursor_ClassTemplate => {
            let mut pattern = record(cursor, CXCursor_ClassDecl);
            pattern.tag_used = Some(template_tag(cursor).to_string());
            let mut node = leaf(cursor, "ClassTemplateDecl");
            node.inner.push(pattern);
            node
        }
        CXCursor_FunctionTemplate => {
            let pattern_kind = match clang_getTemplateCursorKind(cursor) {
                CXCursor_CXXMethod => "CXXMethodDecl",
                CXCursor_Constructor => "CXXConstructorDecl",
                CXCursor_ConversionFunction => "CXXConversionDecl",
                _ => "FunctionDecl",
            };
            let mut node = leaf(cursor, "FunctionTemplateDecl");
            node.inner.push(function(cursor, pattern_kind));
            node
        }
        CXCursor_CXXMethod => function(cursor, "CXXMethodDecl"),
        CXCursor_Constructor => function(cursor, "CXXConstructorDecl"),
        CXCursor_Destructor => function(cursor, "CXXDestructorDecl"),
        CXCursor_ConversionFunction => function(cursor, "CXXConversionDecl"),
        CXCursor_FunctionDecl => function(cursor, "FunctionDecl"),
        CXCursor_FieldDecl | CXCursor_VarDecl => value(cursor, kind),
        CXCursor_EnumDecl => {
            let mut node = leaf(cursor, "EnumDecl");
            if clang_EnumDecl_isScoped(cursor) != 0 {
                node.scoped_enum_tag = Some("class".to_string());
            }
            node.fixed_underlying_type = Some(raw_type(clang_getEnumDeclIntegerType(cursor)));
            node.inner = convert_children(cursor, false);
            node
        }
        CXCursor_EnumConstantDecl => {
            let mut node = leaf(cursor, "EnumConstantDecl");
            if !has_expression_child(cursor) {
                return Some(node);
            }
            let mut constant = RawNode::new("ConstantExpr");
            constant.value = Some(serde_json::Value::String(
                clang_getEnumConstantDeclValue(cursor).to_string(),
            ));
            node.inner.push(constant);
            node
        }
        CXCursor_TypedefDecl | CXCursor_TypeAliasDecl => {
            let name = if kind == CXCursor_TypedefDecl {
                "TypedefDecl"
            } else {
                "TypeAliasDecl"
            };
            let mut node = leaf(cursor, name);
            node.ty = Some(raw_type(clang_getTypedefDeclUnderlyingType(cursor)));
            node
        }
        CXCursor_CXXAccessSpecifier => leaf(cursor, "AccessSpecDecl"),
        _ => return None,
    };
    node.access = access(cursor);
    Some(node)
}

unsafe fn leaf(cursor: CXCursor, kind: &str) -> RawNode {
    let mut node = RawNode::new(kind);
    node.id = format!("{:x}", clang_hashCursor(cursor));
    let name = cursor_spelling(cursor);
    node.name = (!name.is_empty()).then_some(name);
    node.loc = location(clang_getCursorLocation(cursor));
    let extent = clang_getCursorExtent(cursor);
    node.range = RawRange {
        begin: location(clang_getRangeStart(extent)),
        end: location(clang_getRangeEnd(extent)),
    };
    node
}

unsafe fn container(cursor: CXCursor, kind: &str) -> RawNode {
    let mut node = leaf(cursor, kind);
    node.inner = convert_children(cursor, false);
    node
}

fn template_tag(cursor: CXCursor) -> &'static str {
    match unsafe { clang_getTemplateCursorKind(cursor) } {
        CXCursor_StructDecl => "struct",
        CXCursor_UnionDecl => "union",
        _ => "class",
    }
}

unsafe fn record(cursor: CXCursor, kind: CXCursorKind) -> RawNode {
    let specialized = clang_getSpecializedCursorTemplate(cursor);
    let is_specialization =
        clang_Cursor_isNull(specialized) == 0 && clang_getCursorKind(cursor) != CXCursor_ClassTemplate;
    let mut node = leaf(
        cursor,
        if is_specialization {
            "ClassTemplateSpecializationDecl"
        } else {
            "CXXRecordDecl"
        },
    );
    node.tag_used = Some(
        match kind {
            CXCursor_StructDecl => "struct",
            CXCursor_UnionDecl => "union",
            _ => "class",
        }
        .to_string(),
    );
    node.complete_definition = clang_isCursorDefinition(cursor) != 0;
    node.definition_data = Some(RawDefinitionData {
        is_abstract: clang_CXXRecord_isAbstract(cursor) != 0,
        is_polymorphic: false,
    });

    if is_specialization {
        let count = clang_Cursor_getNumTemplateArguments(cursor);
        for i in 0..count.max(0) as u32 {
            let mut arg = RawNode::new("TemplateArgument");
            arg.ty = Some(raw_type(clang_Cursor_getTemplateArgumentType(cursor, i)));
            node.inner.push(arg);
        }
    }

    node.inner.extend(convert_children(cursor, false));
    node.bases = bases(cursor);
    node
}

unsafe fn bases(cursor: CXCursor) -> Vec<RawBase> {
    extern "C" fn visitor(child: CXCursor, _parent: CXCursor, data: CXClientData) -> CXChildVisitResult {
        unsafe {
            let bases = &mut *(data as *mut Vec<RawBase>);
            if clang_getCursorKind(child) == CXCursor_CXXBaseSpecifier {
                bases.push(RawBase {
                    access: access(child),
                    ty: raw_type(clang_getCursorType(child)),
                    is_virtual: clang_isVirtualBase(child) != 0,
                });
            }
            CXChildVisit_Continue
        }
    }

    let mut bases: Vec<RawBase> = Vec::new();
    clang_visitChildren(cursor, visitor, &mut bases as *mut Vec<RawBase> as CXClientData);
    bases
}

unsafe fn function(cursor: CXCursor, kind: &str) -> RawNode {
    let mut node = leaf(cursor, kind);
    node.ty = Some(raw_type(clang_getCursorType(cursor)));
    node.is_virtual = clang_CXXMethod_isVirtual(cursor) != 0;
    node.pure = clang_CXXMethod_isPureVirtual(cursor) != 0;
    if clang_CXXMethod_isStatic(cursor) != 0 || clang_Cursor_getStorageClass(cursor) == CX_SC_Static {
        node.storage_class = Some("static".to_string());
    }
    let mangled = cx_string_to_string(clang_Cursor_getMangling(cursor));
    node.mangled_name = (!mangled.is_empty()).then_some(mangled);

    for i in 0..clang_Cursor_getNumArguments(cursor).max(0) as u32 {
        let arg = clang_Cursor_getArgument(cursor, i);
        let mut param = leaf(arg, "ParmVarDecl");
        param.ty = Some(raw_type(clang_getCursorType(arg)));
        node.inner.push(param);
    }
    if has_child_kind(cursor, CXCursor_CXXOverrideAttr) {
        node.inner.push(RawNode::new("OverrideAttr"));
    }
    if clang_isCursorDefinition(cursor) != 0 {
        node.inner.push(RawNode::new("CompoundStmt"));
    }
    node
}

unsafe fn value(cursor: CXCursor, kind: CXCursorKind) -> RawNode {
    let mut node = leaf(
        cursor,
        if kind == CXCursor_FieldDecl {
            "FieldDecl"
        } else {
            "VarDecl"
        },
    );
    node.ty = Some(raw_type(clang_getCursorType(cursor)));
    if clang_Cursor_getStorageClass(cursor) == CX_SC_Static {
        node.storage_class = Some("static".to_string());
    }
    if has_expression_child(cursor) {
        if kind == CXCursor_FieldDecl {
            node.has_in_class_initializer = true;
        } else {
            node.init = Some("c".to_string());
        }
        node.inner.push(evaluate(cursor).unwrap_or_else(|| RawNode::new("UnexposedExpr")));
    }
    node
}

/// Constant-fold an initializer into a literal node.
unsafe fn evaluate(cursor: CXCursor) -> Option<RawNode> {
    let result = clang_Cursor_Evaluate(cursor);
    if result.is_null() {
        return None;
    }
    let literal = match clang_EvalResult_getKind(result) {
        CXEval_Int => {
            let value = if clang_EvalResult_isUnsignedInt(result) != 0 {
                clang_EvalResult_getAsUnsigned(result).to_string()
            } else {
                clang_EvalResult_getAsLongLong(result).to_string()
            };
            literal_node("IntegerLiteral", value)
        }
        CXEval_Float => literal_node("FloatingLiteral", clang_EvalResult_getAsDouble(result).to_string()),
        CXEval_StrLiteral => {
            let text = CStr::from_ptr(clang_EvalResult_getAsStr(result)).to_string_lossy();
            literal_node("StringLiteral", format!("{text:?}"))
        }
        _ => None,
    };
    clang_EvalResult_dispose(result);
    literal
}

fn literal_node(kind: &str, value: String) -> Option<RawNode> {
    let mut node = RawNode::new(kind);
    node.value = Some(serde_json::Value::String(value));
    Some(node)
}

unsafe fn has_expression_child(cursor: CXCursor) -> bool {
    extern "C" fn visitor(child: CXCursor, _parent: CXCursor, data: CXClientData) -> CXChildVisitResult {
        unsafe {
            if clang_isExpression(clang_getCursorKind(child)) != 0 {
                *(data as *mut bool) = true;
                return CXChildVisit_Break;
            }
            CXChildVisit_Continue
        }
    }
    let mut found = false;
    clang_visitChildren(cursor, visitor, &mut found as *mut bool as CXClientData);
    found
}

unsafe fn has_child_kind(cursor: CXCursor, kind: CXCursorKind) -> bool {
    struct Search {
        kind: CXCursorKind,
        found: bool,
    }
    extern "C" fn visitor(child: CXCursor, _parent: CXCursor, data: CXClientData) -> CXChildVisitResult {
        unsafe {
            let search = &mut *(data as *mut Search);
            if clang_getCursorKind(child) == search.kind {
                search.found = true;
                return CXChildVisit_Break;
            }
            CXChildVisit_Continue
        }
    }
    let mut search = Search { kind, found: false };
    clang_visitChildren(cursor, visitor, &mut search as *mut Search as CXClientData);
    search.found
}

unsafe fn access(cursor: CXCursor) -> Option<String> {
    match clang_getCXXAccessSpecifier(cursor) {
        CX_CXXPublic => Some("public".to_string()),
        CX_CXXProtected => Some("protected".to_string()),
        CX_CXXPrivate => Some("private".to_string()),
        _ => None,
    }
}

unsafe fn raw_type(ty: CXType) -> RawType {
    let written = cx_string_to_string(clang_getTypeSpelling(ty));
    let canonical = cx_string_to_string(clang_getTypeSpelling(clang_getCanonicalType(ty)));
    RawType {
        desugared_qual_type: (canonical != written).then_some(canonical),
        qual_type: written,
    }
}

unsafe fn location(loc: CXSourceLocation) -> RawLoc {
    let mut file: CXFile = ptr::null_mut();
    let mut line = 0u32;
    let mut column = 0u32;
    let mut offset = 0u32;
    clang_getExpansionLocation(loc, &mut file, &mut line, &mut column, &mut offset);
    if file.is_null() {
        return RawLoc::default();
    }
    let file_name = cx_string_to_string(clang_getFileName(file));
    let included_from = (clang_Location_isFromMainFile(loc) == 0).then(|| RawIncludedFrom {
        file: String::new(),
    });
    RawLoc {
        offset: Some(offset as usize),
        file: Some(file_name),
        line: Some(line),
        col: Some(column),
        tok_len: Some(0),
        included_from,
        spelling_loc: None,
        expansion_loc: None,
    }
}

/// Convert a CXString to a Rust String and dispose of it.
unsafe fn cx_string_to_string(cx_string: CXString) -> String {
    let c_str = clang_getCString(cx_string);
    let result = if c_str.is_null() {
        String::new()
    } else {
        CStr::from_ptr(c_str).to_string_lossy().into_owned()
    };
    clang_disposeString(cx_string);
    result
}

unsafe fn cursor_spelling(cursor: CXCursor) -> String {
    cx_string_to_string(clang_getCursorSpelling(cursor))
}
