//! Import graph of an inferred schema set.
//!
//! Each namespace boundary crossed while building becomes an [`Import`] of
//! the enclosing document. Imports are registered once per distinct
//! namespace, in depth-first discovery order, and named by a job-wide
//! counter (`1.xsd`, `2.xsd`, ...; the primary document is `0.xsd`).
//!
//! Reference nodes point at their import through a `q<position>` prefix.
//! The schema text cannot carry the binding itself, so after reading a set
//! back [`repair_references`] rebinds every reference node from the
//! position its prefix names.

use log::debug;

use crate::error::{Error, Result};
use crate::schema::{ElementNode, Import, Reference, SchemaDocument, PRIMARY_LOCATION};

/// Job-wide allocator for synthetic import locations.
///
/// Threaded through the recursive build instead of living in a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportGraph {
    next_index: usize,
}

impl Default for ImportGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportGraph {
    pub fn new() -> Self {
        // 0 ist das Primaerdokument
        Self { next_index: 1 }
    }

    /// Next unused location name. Strictly increasing within one job.
    pub fn allocate_location(&mut self) -> String {
        let location = format!("{}.xsd", self.next_index);
        self.next_index += 1;
        location
    }

    /// Number of locations handed out so far.
    pub fn allocated(&self) -> usize {
        self.next_index - 1
    }
}

/// Slot a namespace crossing will occupy in the enclosing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportSlot {
    /// 0-based position in the import list.
    pub position: usize,
    /// Fresh location, `None` when the namespace is already imported.
    pub location: Option<String>,
}

impl ImportSlot {
    pub fn prefix(&self) -> String {
        Reference::prefix_for(self.position)
    }
}

/// Reserves the import slot for `namespace` before its subtree is built, so
/// the enclosing import gets a lower location than anything nested in it.
pub(crate) fn reserve_slot(
    imports: &[Import],
    namespace: Option<&str>,
    graph: &mut ImportGraph,
) -> ImportSlot {
    match imports.iter().position(|i| i.namespace.as_deref() == namespace) {
        Some(position) => ImportSlot {
            position,
            location: None,
        },
        None => ImportSlot {
            position: imports.len(),
            location: Some(graph.allocate_location()),
        },
    }
}

/// Registers a sub-document built for `slot`. A second subtree in an
/// already imported namespace is merged into the existing sub-document.
pub(crate) fn register(imports: &mut Vec<Import>, slot: ImportSlot, schema: SchemaDocument) {
    match slot.location {
        Some(location) => {
            debug!("import {location} -> {schema}");
            imports.push(Import {
                location,
                namespace: schema.target_namespace.clone(),
                schema: Some(schema),
            });
        }
        None => {
            let import = &mut imports[slot.position];
            absorb(import, schema);
        }
    }
}

/// Another subtree of an imported namespace. Each distinct element name
/// stays a global element of the sub-document, so every reference node
/// keeps a declaration to point at.
fn absorb(import: &mut Import, schema: SchemaDocument) {
    match import.schema.as_mut() {
        Some(existing) => existing.merge_globals(schema),
        None => import.schema = Some(schema),
    }
}

/// Merges `src` into `dst` by namespace; unknown namespaces are appended.
pub(crate) fn merge_import_lists(dst: &mut Vec<Import>, src: Vec<Import>) {
    for import in src {
        match dst.iter_mut().find(|i| i.namespace == import.namespace) {
            Some(existing) => {
                if let Some(schema) = import.schema {
                    absorb(existing, schema);
                }
            }
            None => dst.push(import),
        }
    }
}

/// Rebinds every reference node of `doc` to the namespace of the import its
/// prefix names. Walks the element tree depth-first.
///
/// Fails with [`Error::NamespaceResolutionFailure`] when a prefix names a
/// position past the end of the import list.
pub fn repair_references(doc: &mut SchemaDocument) -> Result<()> {
    let SchemaDocument {
        imports,
        root,
        globals,
        ..
    } = doc;
    for global in root.iter_mut().chain(globals.iter_mut()) {
        repair_node(global, imports)?;
    }
    Ok(())
}

fn repair_node(node: &mut ElementNode, imports: &[Import]) -> Result<()> {
    if let Some(reference) = node.reference.as_mut() {
        let position = if reference.prefix.is_empty() {
            imports.iter().position(|i| i.namespace.is_none())
        } else {
            Reference::prefix_position(&reference.prefix)
        };
        let import = position.and_then(|p| imports.get(p)).ok_or_else(|| {
            Error::NamespaceResolutionFailure(format!(
                "reference '{}:{}' names no import",
                reference.prefix, reference.local
            ))
        })?;
        reference.namespace = import.namespace.clone();
    }

    if let Some(group) = node.complex_type.as_mut().and_then(|ct| ct.sequence.as_mut()) {
        for child in &mut group.elements {
            repair_node(child, imports)?;
        }
    }
    Ok(())
}

/// Recomputes every reference prefix of `doc` from its binding, after a
/// merge may have moved imports to new positions.
pub(crate) fn sync_prefixes(doc: &mut SchemaDocument) {
    let SchemaDocument {
        imports,
        root,
        globals,
        ..
    } = doc;
    for global in root.iter_mut().chain(globals.iter_mut()) {
        sync_node(global, imports);
    }
}

fn sync_node(node: &mut ElementNode, imports: &[Import]) {
    if let Some(reference) = node.reference.as_mut()
        && let Some(ns) = reference.namespace.as_deref()
        && let Some(position) = imports.iter().position(|i| i.namespace.as_deref() == Some(ns))
    {
        reference.prefix = Reference::prefix_for(position);
    }
    if let Some(group) = node.complex_type.as_mut().and_then(|ct| ct.sequence.as_mut()) {
        for child in &mut group.elements {
            sync_node(child, imports);
        }
    }
}

/// All documents of a graph in pre-order, paired with their location.
pub fn documents(doc: &SchemaDocument) -> Vec<(&str, &SchemaDocument)> {
    let mut out = vec![(PRIMARY_LOCATION, doc)];
    collect_documents(doc, &mut out);
    out
}

fn collect_documents<'a>(doc: &'a SchemaDocument, out: &mut Vec<(&'a str, &'a SchemaDocument)>) {
    for import in &doc.imports {
        if let Some(schema) = import.schema.as_ref() {
            out.push((import.location.as_str(), schema));
            collect_documents(schema, out);
        }
    }
}
