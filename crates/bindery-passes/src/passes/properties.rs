//! Property synthesis from `Get`/`Is`/`Set` accessor pairs.
//!
//! For every record, readers (`GetX()`/`IsX()`, no parameters, non-void)
//! and writers (`SetX(value)`) are grouped by base name `X`. A property is
//! emitted when a reader exists; a writer joins it only if its parameter has
//! the reader's value type (reference, const and pointee const
//! qualification ignored).
//! When writers exist but none matches, nothing is emitted for `X`.
//!
//! The accessors are renamed to hidden `__GetX`/`__SetX` names and one
//! `cscode` block per record declares the properties on top of them.

use crate::framework::{Pass, PassContext, VisitEvent, VisitResult};
use crate::sink::Category;
use bindery_clang::{AccessSpecifier, CppType, NodeId, NodeKind};
use bindery_common::{to_idiomatic_case, Result};
use bindery_config::PropertyAccess;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::fmt::Write as _;
use tracing::{debug, trace};

const READER_PREFIXES: [&str; 2] = ["Get", "Is"];
const WRITER_PREFIX: &str = "Set";
const HIDDEN_PREFIX: &str = "__";

#[derive(Debug, Clone)]
struct Accessor {
    name: String,
    fqn: String,
    access: AccessSpecifier,
    value_type: CppType,
}

#[derive(Debug, Clone)]
struct Property {
    name: String,
    access: AccessSpecifier,
    /// Spelling passed to `$typemap(cstype, ...)`
    type_spelling: String,
    reader: Accessor,
    writer: Option<Accessor>,
}

#[derive(Debug, Default)]
struct Candidates {
    readers: IndexMap<String, Accessor>,
    writers: IndexMap<String, Vec<Accessor>>,
    return_types: IndexMap<String, String>,
}

/// Strip an accessor prefix, requiring an upper-case letter after it
/// (`GetSpeed` → `Speed`, but not `Getaway`).
fn base_name<'n>(name: &'n str, prefix: &str) -> Option<&'n str> {
    let rest = name.strip_prefix(prefix)?;
    rest.starts_with(|c: char| c.is_ascii_uppercase()).then_some(rest)
}

#[derive(Debug, Default)]
pub struct PropertiesPass {
    emitted: usize,
}

impl PropertiesPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn allows(cx: &PassContext<'_>, access: AccessSpecifier) -> bool {
        let lowest = match cx.settings.generator.property_access {
            PropertyAccess::Public => AccessSpecifier::Public,
            PropertyAccess::Protected => AccessSpecifier::Protected,
        };
        access.allows(lowest)
    }

    fn collect(cx: &PassContext<'_>, record: NodeId) -> Result<Candidates> {
        let mut candidates = Candidates::default();
        for method in cx.ast.methods(record) {
            let node = cx.ast.node(method);
            let Some(func) = node.as_function() else { continue };
            if func.is_virtual || func.is_pure || func.is_static || node.is_operator() {
                continue;
            }
            if !Self::allows(cx, node.access) {
                continue;
            }

            let name = node.name.as_str();
            let accessor = |value_type: &CppType| -> Result<Accessor> {
                Ok(Accessor {
                    name: name.to_string(),
                    fqn: cx.ast.require_qualified_name(method)?,
                    access: node.access,
                    value_type: value_type.without_pointee_const(),
                })
            };

            if func.params.is_empty() && !func.return_type.canonical.is_void() {
                if let Some(base) = READER_PREFIXES.iter().find_map(|p| base_name(name, p)) {
                    if !candidates.readers.contains_key(base) {
                        candidates
                            .readers
                            .insert(base.to_string(), accessor(func.return_type.value_type())?);
                        candidates
                            .return_types
                            .insert(base.to_string(), func.return_type.canonical.to_string());
                    }
                }
            } else if func.params.len() == 1 {
                if let Some(base) = base_name(name, WRITER_PREFIX) {
                    let writer = accessor(func.params[0].ty.value_type())?;
                    candidates.writers.entry(base.to_string()).or_default().push(writer);
                }
            }
        }
        Ok(candidates)
    }

    /// Idiomatic names of the record's other public members.
    fn public_members(cx: &PassContext<'_>, record: NodeId) -> FxHashSet<String> {
        cx.ast
            .children(record)
            .iter()
            .map(|&c| cx.ast.node(c))
            .filter(|n| n.access == AccessSpecifier::Public && !n.is_anonymous())
            .filter(|n| !matches!(n.kind, NodeKind::Constructor | NodeKind::Destructor))
            .map(|n| to_idiomatic_case(&n.name))
            .collect()
    }

    fn synthesize(cx: &PassContext<'_>, record: NodeId) -> Result<Vec<Property>> {
        let candidates = Self::collect(cx, record)?;
        let members = Self::public_members(cx, record);

        let mut properties = Vec::new();
        for (base, reader) in &candidates.readers {
            // A member already called `Speed` wins.
            if members.contains(base.as_str()) {
                trace!(property = %base, "skipped: name taken by a member");
                continue;
            }
            let writer = match candidates.writers.get(base) {
                None => None,
                Some(writers) => match writers.iter().find(|w| w.value_type == reader.value_type) {
                    Some(w) => Some(w.clone()),
                    None => {
                        debug!(
                            property = %base,
                            reader = %reader.value_type,
                            "skipped: reader and writer types differ"
                        );
                        continue;
                    }
                },
            };

            let access = match &writer {
                Some(w) => reader.access.most_permissive(w.access),
                None => reader.access,
            };
            properties.push(Property {
                name: base.clone(),
                access,
                type_spelling: candidates.return_types.get(base).cloned().unwrap_or_default(),
                reader: reader.clone(),
                writer,
            });
        }
        Ok(properties)
    }
}

fn hidden_name(accessor: &Accessor) -> String {
    format!("{HIDDEN_PREFIX}{}", accessor.name)
}

/// Accessor access modifier, only when it differs from the property's.
fn modifier(property: &Property, accessor: &Accessor) -> String {
    if accessor.access == property.access {
        String::new()
    } else {
        format!("{} ", accessor.access.as_str())
    }
}

/// One `cscode` block declaring every property of a record.
fn render_block(record_fqn: &str, properties: &[Property]) -> String {
    let mut out = format!("%typemap(cscode) {record_fqn} %{{\n");
    for p in properties {
        let _ = writeln!(
            out,
            "  {} $typemap(cstype, {}) {} {{",
            p.access.as_str(),
            p.type_spelling,
            p.name
        );
        let _ = writeln!(
            out,
            "    {}get {{ return {}(); }}",
            modifier(p, &p.reader),
            hidden_name(&p.reader)
        );
        if let Some(writer) = &p.writer {
            let _ = writeln!(
                out,
                "    {}set {{ {}(value); }}",
                modifier(p, writer),
                hidden_name(writer)
            );
        }
        out.push_str("  }\n");
    }
    out.push_str("%}");
    out
}

impl Pass for PropertiesPass {
    fn name(&self) -> &'static str {
        "properties"
    }

    fn visit(&mut self, cx: &mut PassContext<'_>, node: NodeId, event: VisitEvent) -> Result<VisitResult> {
        if event == VisitEvent::Leave || cx.ast.node(node).kind != NodeKind::Record {
            return Ok(VisitResult::Continue);
        }
        let record_fqn = cx.ast.require_qualified_name(node)?;
        if cx.facts.interfaces.contains(&record_fqn) {
            return Ok(VisitResult::Continue);
        }

        let properties = Self::synthesize(cx, node)?;
        if properties.is_empty() {
            return Ok(VisitResult::Continue);
        }

        for p in &properties {
            for accessor in std::iter::once(&p.reader).chain(p.writer.as_ref()) {
                trace!(accessor = %accessor.fqn, "hidden");
                let line = format!("%rename({}) {};", hidden_name(accessor), accessor.fqn);
                cx.emit(Category::Properties, &line)?;
                cx.facts.hidden_accessors.insert(accessor.fqn.clone());
            }
        }
        cx.emit(Category::Properties, &render_block(&record_fqn, &properties))?;
        self.emitted += properties.len();
        Ok(VisitResult::Continue)
    }

    fn on_end(&mut self, _cx: &mut PassContext<'_>) -> Result<()> {
        debug!(properties = self.emitted, "properties synthesized");
        Ok(())
    }
}
