//! Structural merge of inferred element trees.
//!
//! Two entry points share one set of rules:
//!
//! - [`merge_attach`]: a freshly closed element joins its parent's choice
//!   group while building. A repeated name proves repetition, so the
//!   surviving entry becomes `maxOccurs="unbounded"`.
//! - [`SchemaDocument::merge`]: two independently inferred documents are
//!   unified. Occurrences only widen to what either side already allowed.
//!
//! Merges move unmatched subtrees out of the incoming operand; nothing is
//! cloned or shared.

use log::{debug, warn};

use crate::schema::{
    Attribute, ChoiceGroup, ComplexType, ElementNode, MaxOccurs, MinOccurs, SchemaDocument,
    SimpleContent, BASE_TYPE_SEPARATOR,
};
use crate::FastHashSet;

/// Attaches a finalized `child` to `parent`'s choice group.
///
/// The child always starts optional: one observation never proves that the
/// element occurs in every instance.
pub fn merge_attach(parent: &mut ElementNode, mut child: ElementNode) {
    child.min_occurs = MinOccurs::Optional;
    let group = parent
        .complex_type
        .get_or_insert_with(ComplexType::default)
        .sequence
        .get_or_insert_with(ChoiceGroup::default);

    match group.find_mut(child.particle_key()) {
        Some(existing) => {
            // Gleicher Name = Wiederholung, unabhaengig von der Struktur.
            existing.max_occurs = MaxOccurs::Unbounded;
            merge_shape(existing, child);
        }
        None => group.elements.push(child),
    }
}

impl SchemaDocument {
    /// Merges another inferred document (e.g. a second sample) into this one.
    ///
    /// Both roots must describe the same element in the same namespace;
    /// otherwise nothing changes and `false` is returned. Imports are merged
    /// by namespace.
    pub fn merge(&mut self, other: SchemaDocument) -> bool {
        if self.target_namespace != other.target_namespace {
            warn!(
                "merge skipped: target namespace {:?} vs {:?}",
                self.target_namespace, other.target_namespace
            );
            return false;
        }

        let SchemaDocument {
            imports,
            root,
            globals,
            ..
        } = other;
        match (self.root.as_mut(), root) {
            (Some(a), Some(b)) => {
                if a.particle_key() != b.particle_key() {
                    warn!("merge skipped: root '{}' vs '{}'", a.name, b.name);
                    return false;
                }
                merge_particle(a, b);
            }
            (None, Some(b)) => self.root = Some(b),
            (_, None) => {}
        }
        for global in globals {
            self.absorb_global(global);
        }

        crate::imports::merge_import_lists(&mut self.imports, imports);
        crate::imports::sync_prefixes(self);
        debug!("merged document {self}");
        true
    }

    /// Merges another sub-document of the same namespace into this one.
    /// Unlike [`merge`](Self::merge) every global element of `other` is kept:
    /// a same-named one is merged, any other is added.
    pub(crate) fn merge_globals(&mut self, other: SchemaDocument) {
        let SchemaDocument {
            imports,
            root,
            globals,
            ..
        } = other;
        for global in root.into_iter().chain(globals) {
            self.absorb_global(global);
        }

        crate::imports::merge_import_lists(&mut self.imports, imports);
        crate::imports::sync_prefixes(self);
        debug!("merged globals into {self}");
    }

    fn absorb_global(&mut self, incoming: ElementNode) {
        let key = incoming.particle_key();
        let existing = self
            .root
            .iter_mut()
            .chain(self.globals.iter_mut())
            .find(|e| e.particle_key() == key);
        if let Some(existing) = existing {
            merge_particle(existing, incoming);
        } else if self.root.is_none() {
            self.root = Some(incoming);
        } else {
            self.globals.push(incoming);
        }
    }
}

/// Merge zweier gleichnamiger Partikel aus unabhaengigen Dokumenten.
fn merge_particle(existing: &mut ElementNode, incoming: ElementNode) {
    existing.max_occurs = existing.max_occurs.widen(incoming.max_occurs);
    if incoming.min_occurs == MinOccurs::Optional {
        existing.min_occurs = MinOccurs::Optional;
    }
    merge_shape(existing, incoming);
}

/// Merges content (complex type and text hint) and re-applies the collapse
/// rules so the node invariant holds afterwards.
fn merge_shape(existing: &mut ElementNode, incoming: ElementNode) {
    let ElementNode {
        type_hint,
        complex_type,
        ..
    } = incoming;

    match (existing.complex_type.as_mut(), complex_type) {
        (Some(a), Some(b)) => merge_complex_type(a, b),
        (None, Some(b)) => existing.complex_type = Some(b),
        (_, None) => {}
    }
    if existing.type_hint.is_none() {
        existing.type_hint = type_hint;
    }
    existing.normalize();
}

fn merge_complex_type(a: &mut ComplexType, b: ComplexType) {
    let ComplexType {
        simple_content,
        sequence,
        attributes,
        mixed,
    } = b;

    let has_children = a.has_children();
    match (a.simple_content.as_mut(), simple_content) {
        (Some(sa), Some(sb)) => merge_simple_content(sa, sb),
        (None, Some(sb)) if has_children => {
            // Text-Anteil bleibt erhalten, Attribute wandern auf den Typ.
            a.mixed = true;
            merge_attributes(&mut a.attributes, sb.attributes);
        }
        (None, Some(mut sb)) => {
            let mut attrs = std::mem::take(&mut a.attributes);
            merge_attributes(&mut attrs, std::mem::take(&mut sb.attributes));
            sb.attributes = attrs;
            a.simple_content = Some(sb);
        }
        (_, None) => {}
    }

    match (a.sequence.as_mut(), sequence) {
        (Some(ga), Some(gb)) => merge_group(ga, gb),
        (None, Some(gb)) => a.sequence = Some(gb),
        (_, None) => {}
    }

    merge_attributes(&mut a.attributes, attributes);
    a.mixed |= mixed;
}

/// Transitive child-group merge; unmatched incoming children are appended
/// in their original order.
fn merge_group(a: &mut ChoiceGroup, b: ChoiceGroup) {
    for child in b.elements {
        match a.find_mut(child.particle_key()) {
            Some(existing) => merge_particle(existing, child),
            None => a.elements.push(child),
        }
    }
}

fn merge_simple_content(a: &mut SimpleContent, b: SimpleContent) {
    if a.base != b.base {
        merge_base_type(&mut a.base, &b.base);
    }
    merge_attributes(&mut a.attributes, b.attributes);
}

/// Widens `base` by every `|`-separated part of `incoming` it lacks.
///
/// The result is a placeholder listing the observed types, not an
/// `xs:union`; it does not resolve as a type reference.
pub(crate) fn merge_base_type(base: &mut String, incoming: &str) {
    for part in incoming.split(BASE_TYPE_SEPARATOR) {
        if part.is_empty() || base.split(BASE_TYPE_SEPARATOR).any(|p| p == part) {
            continue;
        }
        if !base.is_empty() {
            base.push(BASE_TYPE_SEPARATOR);
        }
        base.push_str(part);
    }
}

/// Name-union of attribute lists; on a name collision the first-seen
/// declaration wins unchanged.
pub(crate) fn merge_attributes(dst: &mut Vec<Attribute>, src: Vec<Attribute>) {
    if src.is_empty() {
        return;
    }
    let mut seen: FastHashSet<String> = dst.iter().map(|a| a.name.clone()).collect();
    for attr in src {
        if seen.insert(attr.name.clone()) {
            dst.push(attr);
        }
    }
}
