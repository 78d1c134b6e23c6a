//! Schema model for inferred XSD documents.
//!
//! A [`SchemaDocument`] owns its global [`ElementNode`]s and its [`Import`]s;
//! an import owns its sub-document. There is no sharing anywhere in the tree,
//! merges move subtrees between owners.
//!
//! Every element node is exactly one of:
//!
//! - **reference node**: empty name, [`Reference`] set, no complex type
//! - **leaf**: name set, at most a scalar type hint
//! - **structured node**: name set, [`ComplexType`] set

use std::fmt;

/// XML Schema Namespace.
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Namespace der `xmlns`-Deklarationen (XML Namespaces 1.0, Sec. 3).
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

/// The single scalar type every text value collapses to.
pub const GENERIC_TYPE: &str = "xs:string";

/// Provenance comment written at the top of every schema text.
pub const HEADER_COMMENT: &str = "<!-- Created with xsdinfer API Discovery -->";

/// `attributeFormDefault` of every inferred document.
pub const ATTRIBUTE_FORM_DEFAULT: &str = "unqualified";

/// `elementFormDefault` of every inferred document.
pub const ELEMENT_FORM_DEFAULT: &str = "qualified";

/// Stem of the prefixes bound on reference nodes (`q1`, `q2`, ...).
pub const REF_PREFIX_STEM: &str = "q";

/// Joins conflicting SimpleContent base types after a merge.
pub const BASE_TYPE_SEPARATOR: char = '|';

/// Location name of the primary document of a schema set.
pub const PRIMARY_LOCATION: &str = "0.xsd";

/// `minOccurs` of an element particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinOccurs {
    /// Attribute absent, the element is required.
    #[default]
    Required,
    /// `minOccurs="0"`.
    Optional,
}

impl MinOccurs {
    /// Attribute value, `None` when the attribute is omitted.
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            Self::Required => None,
            Self::Optional => Some("0"),
        }
    }
}

/// `maxOccurs` of an element particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxOccurs {
    /// Attribute absent, at most one occurrence.
    #[default]
    One,
    /// `maxOccurs="unbounded"`.
    Unbounded,
}

impl MaxOccurs {
    /// Attribute value, `None` when the attribute is omitted.
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            Self::One => None,
            Self::Unbounded => Some("unbounded"),
        }
    }

    /// Breiteste der beiden Angaben.
    pub fn widen(self, other: Self) -> Self {
        if self == Self::Unbounded || other == Self::Unbounded {
            Self::Unbounded
        } else {
            Self::One
        }
    }
}

/// An attribute declaration. Inference never proves requiredness, so every
/// attribute is written with `use="optional"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub type_hint: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, type_hint: Option<String>) -> Self {
        Self {
            name: name.into(),
            type_hint,
        }
    }
}

/// `xs:simpleContent/xs:extension`: text content plus attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleContent {
    /// Base type. After conflicting merges this is a `|`-joined list of names.
    pub base: String,
    pub attributes: Vec<Attribute>,
}

/// `xs:sequence` wrapping one unbounded `xs:choice`.
///
/// Children are distinct by [`ElementNode::particle_key`] and kept in
/// first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChoiceGroup {
    pub elements: Vec<ElementNode>,
}

impl ChoiceGroup {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Sucht ein Kind mit gleichem Particle-Key.
    pub fn find(&self, key: ParticleKey<'_>) -> Option<&ElementNode> {
        self.elements.iter().find(|e| e.particle_key() == key)
    }

    pub(crate) fn find_mut(&mut self, key: ParticleKey<'_>) -> Option<&mut ElementNode> {
        self.elements.iter_mut().find(|e| e.particle_key() == key)
    }

    /// Kind nach Element-Namen (Referenz-Knoten werden uebersprungen).
    pub fn child(&self, name: &str) -> Option<&ElementNode> {
        self.find(ParticleKey::Name(name))
    }
}

/// `xs:complexType`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComplexType {
    pub simple_content: Option<SimpleContent>,
    pub sequence: Option<ChoiceGroup>,
    pub attributes: Vec<Attribute>,
    pub mixed: bool,
}

impl ComplexType {
    /// Sequence that actually holds children.
    pub fn populated_sequence(&self) -> Option<&ChoiceGroup> {
        self.sequence.as_ref().filter(|s| !s.is_empty())
    }

    pub(crate) fn has_children(&self) -> bool {
        self.populated_sequence().is_some()
    }

    /// Nothing left worth declaring.
    pub(crate) fn is_empty(&self) -> bool {
        self.simple_content.is_none()
            && !self.has_children()
            && self.attributes.is_empty()
            && !self.mixed
    }
}

/// Reference into an imported namespace (`ref="q1:local"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Local name of the referenced global element.
    pub local: String,
    /// Prefix as built or as read back (`q<position>`), empty for no-namespace.
    pub prefix: String,
    /// Namespace binding. Unset on a freshly deserialized skeleton until the
    /// import repair pass runs.
    pub namespace: Option<String>,
}

impl Reference {
    /// `q<position>` for a 0-based import position.
    pub fn prefix_for(position: usize) -> String {
        format!("{REF_PREFIX_STEM}{}", position + 1)
    }

    /// 0-based import position encoded in the prefix.
    pub fn prefix_position(prefix: &str) -> Option<usize> {
        let n: usize = prefix.strip_prefix(REF_PREFIX_STEM)?.parse().ok()?;
        n.checked_sub(1)
    }
}

/// Identity of a particle inside a choice group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKey<'a> {
    Name(&'a str),
    Ref(&'a str, Option<&'a str>),
}

/// `xs:element`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementNode {
    /// Empty only on a reference node.
    pub name: String,
    pub reference: Option<Reference>,
    pub type_hint: Option<String>,
    pub min_occurs: MinOccurs,
    pub max_occurs: MaxOccurs,
    pub complex_type: Option<ComplexType>,
}

impl ElementNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Reference node pointing at `local` in an imported namespace.
    pub fn reference(local: impl Into<String>, prefix: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            reference: Some(Reference {
                local: local.into(),
                prefix: prefix.into(),
                namespace,
            }),
            ..Self::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Key used to match siblings in a choice group. Reference nodes match on
    /// their target, so two different foreign elements under one parent stay
    /// separate.
    pub fn particle_key(&self) -> ParticleKey<'_> {
        match &self.reference {
            Some(r) => ParticleKey::Ref(&r.local, r.namespace.as_deref()),
            None => ParticleKey::Name(&self.name),
        }
    }

    /// Children in first-seen order (empty for leaves and reference nodes).
    pub fn children(&self) -> &[ElementNode] {
        self.complex_type
            .as_ref()
            .and_then(|ct| ct.sequence.as_ref())
            .map_or(&[][..], |s| s.elements.as_slice())
    }

    /// Direct child by element name.
    pub fn child(&self, name: &str) -> Option<&ElementNode> {
        self.children().iter().find(|c| !c.is_reference() && c.name == name)
    }

    /// Attributes as declared, either on the complex type or on its
    /// simple content.
    pub fn attributes(&self) -> &[Attribute] {
        match &self.complex_type {
            Some(ct) => match &ct.simple_content {
                Some(sc) => &sc.attributes,
                None => &ct.attributes,
            },
            None => &[],
        }
    }

    pub fn is_mixed(&self) -> bool {
        self.complex_type.as_ref().is_some_and(|ct| ct.mixed)
    }

    pub fn simple_content(&self) -> Option<&SimpleContent> {
        self.complex_type.as_ref()?.simple_content.as_ref()
    }

    /// Haengt ein Attribut an die (ggf. neu angelegte) ComplexType.
    pub(crate) fn push_attribute(&mut self, attr: Attribute) {
        self.complex_type
            .get_or_insert_with(ComplexType::default)
            .attributes
            .push(attr);
    }

    /// Applies the collapse rules that turn the raw shape collected while
    /// building into a valid particle:
    ///
    /// 1. hint + attributes, no children: simple content with the hint as base
    /// 2. hint + children: mixed, hint dropped
    /// 3. simple content + children (only after merges): attributes are
    ///    lifted back onto the complex type and the content becomes mixed
    pub(crate) fn normalize(&mut self) {
        let Some(ct) = self.complex_type.as_mut() else {
            return;
        };

        if ct.simple_content.is_some() && ct.has_children() {
            if let Some(sc) = ct.simple_content.take() {
                crate::merge::merge_attributes(&mut ct.attributes, sc.attributes);
            }
            ct.mixed = true;
        } else if let Some(sc) = ct.simple_content.as_mut()
            && !ct.attributes.is_empty()
        {
            crate::merge::merge_attributes(&mut sc.attributes, std::mem::take(&mut ct.attributes));
        }

        if let Some(hint) = self.type_hint.take() {
            if ct.has_children() {
                ct.mixed = true;
            } else if let Some(sc) = ct.simple_content.as_mut() {
                // Text ist schon ueber die Extension abgedeckt.
                crate::merge::merge_base_type(&mut sc.base, &hint);
            } else if !ct.attributes.is_empty() {
                ct.simple_content = Some(SimpleContent {
                    base: hint,
                    attributes: std::mem::take(&mut ct.attributes),
                });
            } else {
                self.type_hint = Some(hint);
            }
        }

        if ct.is_empty() {
            self.complex_type = None;
        }
    }
}

/// One imported namespace of a [`SchemaDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Synthetic file name, unique per inference job (`<n>.xsd`).
    pub location: String,
    pub namespace: Option<String>,
    /// Sub-document. `None` only on a deserialized skeleton.
    pub schema: Option<SchemaDocument>,
}

/// One `xs:schema` document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaDocument {
    pub target_namespace: Option<String>,
    pub imports: Vec<Import>,
    /// First global element. The document element of a primary document.
    pub root: Option<ElementNode>,
    /// Further global elements, distinct by name. Only imported documents
    /// collect them, when one namespace is entered at differently named
    /// elements.
    pub globals: Vec<ElementNode>,
}

impl SchemaDocument {
    pub fn new(target_namespace: Option<String>, root: ElementNode) -> Self {
        Self {
            target_namespace,
            imports: Vec::new(),
            root: Some(root),
            globals: Vec::new(),
        }
    }

    /// Root followed by the further global elements.
    pub fn global_elements(&self) -> impl Iterator<Item = &ElementNode> {
        self.root.iter().chain(&self.globals)
    }

    /// Global element declared under `name`.
    pub fn global(&self, name: &str) -> Option<&ElementNode> {
        self.global_elements().find(|e| e.name == name)
    }

    /// `attributeFormDefault`, fixed for every inferred document.
    pub fn attribute_form_default(&self) -> &'static str {
        ATTRIBUTE_FORM_DEFAULT
    }

    /// `elementFormDefault`, fixed for every inferred document.
    pub fn element_form_default(&self) -> &'static str {
        ELEMENT_FORM_DEFAULT
    }

    /// Position of the import for `namespace` in [`imports`](Self::imports).
    pub fn import_position(&self, namespace: Option<&str>) -> Option<usize> {
        self.imports
            .iter()
            .position(|i| i.namespace.as_deref() == namespace)
    }

    pub fn import(&self, namespace: Option<&str>) -> Option<&Import> {
        self.imports.iter().find(|i| i.namespace.as_deref() == namespace)
    }

    /// Number of documents in this graph, this one included.
    pub fn document_count(&self) -> usize {
        1 + self
            .imports
            .iter()
            .filter_map(|i| i.schema.as_ref())
            .map(SchemaDocument::document_count)
            .sum::<usize>()
    }
}

impl fmt::Display for SchemaDocument {
    /// Kurzform fuer Logs: `{ns}root (+n imports)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.target_namespace.as_deref().unwrap_or("");
        let root = self.root.as_ref().map_or("", |r| r.name.as_str());
        write!(f, "{{{ns}}}{root}")?;
        if !self.globals.is_empty() {
            write!(f, " (+{} globals)", self.globals.len())?;
        }
        write!(f, " (+{} imports)", self.imports.len())
    }
}
