//! Schema text codec.
//!
//! [`serialize_all`] renders a document graph as an ordered list of texts:
//! the primary document first, then every import's own list, in import-list
//! order (depth-first pre-order). [`deserialize_all`] consumes a list in the
//! same order, so the position of a text is what ties it to its import.
//!
//! The writer is a compact hand-rolled emitter (no indentation) that writes
//! the fields in data-model order, so output is deterministic. Reading back
//! uses roxmltree.

use std::io::Write;
use std::path::Path;

use log::debug;
use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{Error, Result};
use crate::imports::repair_references;
use crate::options::InferOptions;
use crate::FastIndexMap;
use crate::schema::{
    Attribute, ChoiceGroup, ComplexType, ElementNode, Import, MaxOccurs, MinOccurs, Reference,
    SchemaDocument, SimpleContent, HEADER_COMMENT, XS_NS,
};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

fn io_err(e: std::io::Error) -> Error {
    Error::SerializationFailure(e.to_string())
}

/// Schreibt einen String als Bytes in den Writer.
#[inline]
fn w(writer: &mut impl Write, s: &str) -> Result<()> {
    writer.write_all(s.as_bytes()).map_err(io_err)
}

/// Escaping fuer Attribut-Werte: & < " → &amp; &lt; &quot;, dazu Tab, LF und
/// CR als Zeichenreferenz (sonst normalisiert der Parser sie zu Leerzeichen).
fn write_escaped_attr(w: &mut impl Write, s: &str) -> Result<()> {
    const NEEDLE: [u8; 3] = [b'&', b'<', b'"'];
    const REPLACEMENT: [&[u8]; 3] = [b"&amp;", b"&lt;", b"&quot;"];

    let bytes = s.as_bytes();
    let mut start = 0;
    for (pos, &b) in bytes.iter().enumerate() {
        let replacement: &[u8] = match b {
            b'\t' => b"&#9;",
            b'\n' => b"&#10;",
            b'\r' => b"&#13;",
            _ => continue,
        };
        write_escaped_memchr3(w, &bytes[start..pos], NEEDLE, REPLACEMENT)?;
        w.write_all(replacement).map_err(io_err)?;
        start = pos + 1;
    }
    write_escaped_memchr3(w, &bytes[start..], NEEDLE, REPLACEMENT)
}

fn write_escaped_memchr3(
    w: &mut impl Write,
    bytes: &[u8],
    needle: [u8; 3],
    replacement: [&[u8]; 3],
) -> Result<()> {
    let mut start = 0;
    while let Some(offset) = memchr::memchr3(needle[0], needle[1], needle[2], &bytes[start..]) {
        let pos = start + offset;
        w.write_all(&bytes[start..pos]).map_err(io_err)?;
        let idx = needle.iter().position(|&n| n == bytes[pos]).unwrap_or(0);
        w.write_all(replacement[idx]).map_err(io_err)?;
        start = pos + 1;
    }
    w.write_all(&bytes[start..]).map_err(io_err)
}

/// ` name="value"` mit Escaping.
fn write_attr(out: &mut impl Write, name: &str, value: &str) -> Result<()> {
    w(out, " ")?;
    w(out, name)?;
    w(out, "=\"")?;
    write_escaped_attr(out, value)?;
    w(out, "\"")
}

// ============================================================================
// Serialize
// ============================================================================

/// Renders one document (without its imports' contents) to schema text.
pub fn serialize(doc: &SchemaDocument) -> Result<String> {
    let mut buf = Vec::new();
    write_document(&mut buf, doc)?;
    String::from_utf8(buf).map_err(|e| Error::SerializationFailure(e.to_string()))
}

/// Renders the whole graph: `[primary, import 1 subtree..., import 2 subtree...]`.
pub fn serialize_all(doc: &SchemaDocument) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(doc.document_count());
    serialize_into(doc, &mut out)?;
    Ok(out)
}

fn serialize_into(doc: &SchemaDocument, out: &mut Vec<String>) -> Result<()> {
    out.push(serialize(doc)?);
    for import in &doc.imports {
        let schema = import.schema.as_ref().ok_or_else(|| {
            Error::SerializationFailure(format!("import {} has no schema", import.location))
        })?;
        serialize_into(schema, out)?;
    }
    Ok(())
}

/// Writes `doc` as schema text into `out`.
pub fn write_document(out: &mut impl Write, doc: &SchemaDocument) -> Result<()> {
    w(out, XML_DECLARATION)?;
    w(out, "\n")?;
    w(out, HEADER_COMMENT)?;
    w(out, "\n<xs:schema")?;
    write_attr(out, "xmlns:xs", XS_NS)?;
    if let Some(ns) = &doc.target_namespace {
        write_attr(out, "targetNamespace", ns)?;
    }
    write_attr(out, "attributeFormDefault", doc.attribute_form_default())?;
    write_attr(out, "elementFormDefault", doc.element_form_default())?;
    w(out, ">")?;

    for import in &doc.imports {
        w(out, "<xs:import")?;
        write_attr(out, "schemaLocation", &import.location)?;
        if let Some(ns) = &import.namespace {
            write_attr(out, "namespace", ns)?;
        }
        w(out, "/>")?;
    }
    for global in doc.global_elements() {
        write_element(out, doc, global)?;
    }
    w(out, "</xs:schema>\n")
}

fn write_element(out: &mut impl Write, doc: &SchemaDocument, e: &ElementNode) -> Result<()> {
    w(out, "<xs:element")?;
    match &e.reference {
        Some(reference) => write_reference(out, doc, reference)?,
        None => write_attr(out, "name", &e.name)?,
    }
    if let Some(hint) = &e.type_hint {
        write_attr(out, "type", hint)?;
    }
    if let Some(min) = e.min_occurs.as_attr() {
        write_attr(out, "minOccurs", min)?;
    }
    if let Some(max) = e.max_occurs.as_attr() {
        write_attr(out, "maxOccurs", max)?;
    }

    match &e.complex_type {
        Some(ct) => {
            w(out, ">")?;
            write_complex_type(out, doc, ct)?;
            w(out, "</xs:element>")
        }
        None => w(out, "/>"),
    }
}

/// `xmlns:qN="ns" ref="qN:local"`; the prefix follows the import position of
/// the bound namespace.
fn write_reference(out: &mut impl Write, doc: &SchemaDocument, reference: &Reference) -> Result<()> {
    let ns = reference.namespace.as_deref();
    let position = doc.import_position(ns).ok_or_else(|| {
        Error::SerializationFailure(format!(
            "reference '{}' names namespace {:?} without import",
            reference.local, ns
        ))
    })?;
    match ns {
        Some(ns) => {
            let prefix = Reference::prefix_for(position);
            write_attr(out, &format!("xmlns:{prefix}"), ns)?;
            write_attr(out, "ref", &format!("{prefix}:{}", reference.local))
        }
        None => write_attr(out, "ref", &reference.local),
    }
}

fn write_complex_type(out: &mut impl Write, doc: &SchemaDocument, ct: &ComplexType) -> Result<()> {
    w(out, "<xs:complexType")?;
    if ct.mixed {
        write_attr(out, "mixed", "true")?;
    }
    w(out, ">")?;

    if let Some(sc) = &ct.simple_content {
        w(out, "<xs:simpleContent><xs:extension")?;
        write_attr(out, "base", &sc.base)?;
        w(out, ">")?;
        write_attributes(out, &sc.attributes)?;
        w(out, "</xs:extension></xs:simpleContent>")?;
    }
    if let Some(group) = ct.populated_sequence() {
        w(out, "<xs:sequence><xs:choice maxOccurs=\"unbounded\">")?;
        for child in &group.elements {
            write_element(out, doc, child)?;
        }
        w(out, "</xs:choice></xs:sequence>")?;
    }
    write_attributes(out, &ct.attributes)?;
    w(out, "</xs:complexType>")
}

fn write_attributes(out: &mut impl Write, attributes: &[Attribute]) -> Result<()> {
    for attr in attributes {
        w(out, "<xs:attribute")?;
        write_attr(out, "name", &attr.name)?;
        if let Some(hint) = &attr.type_hint {
            write_attr(out, "type", hint)?;
        }
        w(out, " use=\"optional\"/>")?;
    }
    Ok(())
}

// ============================================================================
// Deserialize
// ============================================================================

/// Parses one schema text into a skeleton: imports carry location and
/// namespace but no sub-document, reference nodes carry their prefix but no
/// namespace binding.
pub fn deserialize(text: &str, options: &InferOptions) -> Result<SchemaDocument> {
    options.check_input_len(text.len())?;

    let xml_opts = ParsingOptions {
        allow_dtd: false,
        ..Default::default()
    };
    let xml = Document::parse_with_options(text, xml_opts)
        .map_err(|e| Error::XsdParseError(format!("XML: {e}")))?;
    let root = xml.root_element();
    if !is_xs(root, "schema") {
        return Err(Error::XsdParseError(
            "Root element must be xs:schema".to_string(),
        ));
    }

    let mut doc = SchemaDocument {
        target_namespace: root.attribute("targetNamespace").map(str::to_owned),
        ..SchemaDocument::default()
    };
    for child in root.children().filter(Node::is_element) {
        if is_xs(child, "import") {
            let location = child.attribute("schemaLocation").ok_or_else(|| {
                Error::XsdParseError("xs:import without schemaLocation".to_string())
            })?;
            doc.imports.push(Import {
                location: location.to_string(),
                namespace: child.attribute("namespace").map(str::to_owned),
                schema: None,
            });
        } else if is_xs(child, "element") {
            let element = read_element(child, options, 1)?;
            if doc.global(&element.name).is_some() {
                return Err(Error::XsdParseError(format!(
                    "global xs:element '{}' declared twice",
                    element.name
                )));
            }
            if doc.root.is_none() {
                doc.root = Some(element);
            } else {
                doc.globals.push(element);
            }
        }
    }
    Ok(doc)
}

/// Rebuilds a document graph from a list produced by [`serialize_all`],
/// starting at `start`. Each import consumes the next unread entries
/// depth-first; reference bindings are repaired per document.
pub fn deserialize_all<S: AsRef<str>>(
    texts: &[S],
    start: usize,
    options: &InferOptions,
) -> Result<SchemaDocument> {
    let mut cursor = start;
    let doc = resolve(texts, &mut cursor, options, 1)?;
    if cursor < texts.len() {
        debug!("{} schema texts after index {} left unread", texts.len() - cursor, cursor - 1);
    }
    Ok(doc)
}

fn resolve<S: AsRef<str>>(
    texts: &[S],
    cursor: &mut usize,
    options: &InferOptions,
    depth: usize,
) -> Result<SchemaDocument> {
    if depth > options.max_depth() {
        return Err(Error::DepthLimitExceeded {
            depth,
            max: options.max_depth(),
        });
    }
    let text = texts
        .get(*cursor)
        .ok_or(Error::DeserializationIndexOutOfRange {
            index: *cursor,
            len: texts.len(),
        })?;
    *cursor += 1;

    let mut doc = deserialize(text.as_ref(), options)?;
    for import in &mut doc.imports {
        let schema = resolve(texts, cursor, options, depth + 1)?;
        if schema.target_namespace != import.namespace {
            return Err(Error::NamespaceResolutionFailure(format!(
                "import {} declares {:?} but its schema targets {:?}",
                import.location, import.namespace, schema.target_namespace
            )));
        }
        import.schema = Some(schema);
    }
    repair_references(&mut doc)?;
    Ok(doc)
}

/// Reads a schema set written by [`crate::write_schema_set`] from `dir`,
/// starting at `primary` and following `schemaLocation`s depth-first.
pub fn read_schema_set(dir: &Path, primary: &str, options: &InferOptions) -> Result<SchemaDocument> {
    let mut texts: FastIndexMap<String, String> = FastIndexMap::default();
    collect_texts(dir, primary, options, &mut texts)?;
    let texts: Vec<String> = texts.into_values().collect();
    deserialize_all(&texts, 0, options)
}

fn collect_texts(
    dir: &Path,
    location: &str,
    options: &InferOptions,
    texts: &mut FastIndexMap<String, String>,
) -> Result<()> {
    if texts.contains_key(location) {
        return Err(Error::XsdParseError(format!(
            "schema location '{location}' imported twice"
        )));
    }
    if texts.len() >= options.max_depth() {
        return Err(Error::DepthLimitExceeded {
            depth: texts.len() + 1,
            max: options.max_depth(),
        });
    }
    let text = std::fs::read_to_string(dir.join(location)).map_err(|e| {
        Error::XsdParseError(format!("Cannot read schema '{location}': {e}"))
    })?;
    let skeleton = deserialize(&text, options)?;
    texts.insert(location.to_string(), text);
    for import in &skeleton.imports {
        collect_texts(dir, &import.location, options, texts)?;
    }
    Ok(())
}

fn is_xs(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local && node.tag_name().namespace() == Some(XS_NS)
}

fn xs_child<'a, 'input>(node: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_xs(*c, local))
}

fn read_element(node: Node<'_, '_>, options: &InferOptions, depth: usize) -> Result<ElementNode> {
    if depth > options.max_depth() {
        return Err(Error::DepthLimitExceeded {
            depth,
            max: options.max_depth(),
        });
    }

    let mut e = match node.attribute("ref") {
        Some(qname) => {
            let (prefix, local) = qname.split_once(':').unwrap_or(("", qname));
            ElementNode::reference(local, prefix, None)
        }
        None => ElementNode::new(node.attribute("name").ok_or_else(|| {
            Error::XsdParseError("xs:element without name or ref".to_string())
        })?),
    };
    e.type_hint = node.attribute("type").map(str::to_owned);
    e.min_occurs = match node.attribute("minOccurs") {
        None | Some("1") => MinOccurs::Required,
        Some("0") => MinOccurs::Optional,
        Some(other) => {
            return Err(Error::XsdParseError(format!("unsupported minOccurs '{other}'")));
        }
    };
    e.max_occurs = match node.attribute("maxOccurs") {
        None | Some("1") => MaxOccurs::One,
        Some("unbounded") => MaxOccurs::Unbounded,
        Some(other) => {
            return Err(Error::XsdParseError(format!("unsupported maxOccurs '{other}'")));
        }
    };

    if let Some(ct) = xs_child(node, "complexType") {
        if e.is_reference() {
            return Err(Error::XsdParseError(format!(
                "reference '{}' with inline complexType",
                node.attribute("ref").unwrap_or_default()
            )));
        }
        e.complex_type = Some(read_complex_type(ct, options, depth)?);
    }
    Ok(e)
}

fn read_complex_type(node: Node<'_, '_>, options: &InferOptions, depth: usize) -> Result<ComplexType> {
    let mut ct = ComplexType {
        mixed: node.attribute("mixed") == Some("true"),
        attributes: read_attributes(node),
        ..ComplexType::default()
    };

    if let Some(ext) = xs_child(node, "simpleContent").and_then(|sc| xs_child(sc, "extension")) {
        ct.simple_content = Some(SimpleContent {
            base: ext.attribute("base").unwrap_or_default().to_string(),
            attributes: read_attributes(ext),
        });
    }

    if let Some(choice) = xs_child(node, "sequence").and_then(|seq| xs_child(seq, "choice")) {
        let mut group = ChoiceGroup::default();
        for child in choice.children().filter(|c| is_xs(*c, "element")) {
            group.elements.push(read_element(child, options, depth + 1)?);
        }
        if !group.is_empty() {
            ct.sequence = Some(group);
        }
    }
    Ok(ct)
}

fn read_attributes(node: Node<'_, '_>) -> Vec<Attribute> {
    node.children()
        .filter(|c| is_xs(*c, "attribute"))
        .filter_map(|a| {
            let name = a.attribute("name")?;
            Some(Attribute::new(name, a.attribute("type").map(str::to_owned)))
        })
        .collect()
}
