//! Tree builder: token stream → [`SchemaDocument`].
//!
//! Keeps an explicit stack of open-tag frames. Each element is finalized at
//! its close tag and merged into its parent's choice group before the parent
//! itself can close.
//!
//! A tag whose namespace differs from the one fixed by the first tag of the
//! current scope is not described inline. The builder recurses on that very
//! token to build an independent document for the foreign subtree, records
//! it as an import and leaves a reference node in its place. The recursive
//! call hands back the close tag of the foreign subtree root, which the
//! caller then processes to close the reference node.

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::imports::{self, ImportGraph};
use crate::merge::merge_attach;
use crate::options::InferOptions;
use crate::schema::{Attribute, ElementNode, Import, SchemaDocument, GENERIC_TYPE};
use crate::token::{Token, TokenAttribute, TokenSource};

/// Scalar type hint for a text or attribute value.
///
/// Blank values carry no type information. Everything else collapses to the
/// one generic type.
pub fn value_type_hint(value: &str) -> Option<&'static str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(GENERIC_TYPE)
    }
}

/// Builds schema documents for one inference job.
///
/// Owns the job-wide import location counter and the nesting depth, so
/// several samples built with the same builder never reuse a location name.
#[derive(Debug)]
pub struct TreeBuilder<'o> {
    options: &'o InferOptions,
    graph: ImportGraph,
    depth: usize,
}

impl<'o> TreeBuilder<'o> {
    pub fn new(options: &'o InferOptions) -> Self {
        Self {
            options,
            graph: ImportGraph::new(),
            depth: 0,
        }
    }

    /// Import locations allocated so far in this job.
    pub fn imports_allocated(&self) -> usize {
        self.graph.allocated()
    }

    /// Builds the primary document of a whole token stream.
    ///
    /// Tokens before the root element are skipped; after the root element
    /// only ignorable tokens may follow.
    pub fn build_primary<S: TokenSource + ?Sized>(&mut self, tokens: &mut S) -> Result<SchemaDocument> {
        self.depth = 0;
        let first = loop {
            match tokens.next_token()? {
                Some(token @ Token::Open { .. }) => break token,
                Some(Token::Close) => return Err(Error::malformed("close tag before the root element")),
                Some(_) => {}
                None => return Err(Error::malformed("no root element")),
            }
        };

        let (doc, _) = self.build(tokens, first)?;

        while let Some(token) = tokens.next_token()? {
            match token {
                Token::Open { local, .. } => {
                    return Err(Error::malformed(format!(
                        "second root element '{local}'"
                    )));
                }
                Token::Close => return Err(Error::malformed("close tag after the root element")),
                Token::Text(text) if value_type_hint(&text).is_some() => {
                    return Err(Error::malformed("text after the root element"));
                }
                _ => {}
            }
        }
        debug!("inferred {doc}");
        Ok(doc)
    }

    /// Builds the document of one namespace scope, starting at the open tag
    /// `first`. Every call is a fresh scope: its namespace is fixed by
    /// `first`.
    ///
    /// Returns the document plus the token that ended the scope (the close
    /// tag of its root), which belongs to the caller when the scope is a
    /// foreign subtree.
    pub fn build<S: TokenSource + ?Sized>(
        &mut self,
        tokens: &mut S,
        first: Token,
    ) -> Result<(SchemaDocument, Token)> {
        let mut frames: Vec<ElementNode> = Vec::new();
        let mut target: Option<Option<String>> = None;
        let mut scope_imports: Vec<Import> = Vec::new();

        let mut next = Some(first);
        while let Some(token) = next.take() {
            match token {
                Token::Open {
                    local,
                    namespace,
                    attributes,
                } => {
                    if target.as_ref().is_some_and(|ns| *ns != namespace) {
                        let (node, resume) =
                            self.cross_namespace(tokens, &mut scope_imports, local, namespace, attributes)?;
                        self.enter()?;
                        frames.push(node);
                        next = Some(resume);
                        continue;
                    }
                    if target.is_none() {
                        target = Some(namespace);
                    }
                    self.enter()?;
                    frames.push(open_node(local, attributes));
                }
                Token::Text(text) => {
                    if let (Some(top), Some(hint)) = (frames.last_mut(), value_type_hint(&text)) {
                        top.type_hint = Some(hint.to_string());
                    }
                }
                Token::Close => {
                    let mut node = frames
                        .pop()
                        .ok_or_else(|| Error::malformed("close tag without open element"))?;
                    self.leave();
                    node.normalize();

                    match frames.last_mut() {
                        Some(parent) => merge_attach(parent, node),
                        None => {
                            let doc = SchemaDocument {
                                target_namespace: target.flatten(),
                                imports: scope_imports,
                                root: Some(node),
                                globals: Vec::new(),
                            };
                            return Ok((doc, Token::Close));
                        }
                    }
                }
                Token::Other => {}
            }
            next = tokens.next_token()?;
        }

        Err(if frames.is_empty() {
            Error::malformed("no root element")
        } else {
            Error::malformed(format!("input ended with {} open elements", frames.len()))
        })
    }

    /// Builds the foreign subtree starting at an open tag in `namespace` and
    /// registers it as an import. Returns the reference node standing in for
    /// it and the resume token.
    fn cross_namespace<S: TokenSource + ?Sized>(
        &mut self,
        tokens: &mut S,
        scope_imports: &mut Vec<Import>,
        local: String,
        namespace: Option<String>,
        attributes: Vec<TokenAttribute>,
    ) -> Result<(ElementNode, Token)> {
        let slot = imports::reserve_slot(scope_imports, namespace.as_deref(), &mut self.graph);
        // Kein Namespace: unpraefixierte Referenz
        let prefix = if namespace.is_some() { slot.prefix() } else { String::new() };
        debug!(
            "namespace crossing at '{local}' into {:?} ({prefix})",
            namespace.as_deref().unwrap_or("")
        );

        let open = Token::Open {
            local: local.clone(),
            namespace: namespace.clone(),
            attributes,
        };
        let (sub, resume) = self.build(tokens, open)?;
        if sub.root.is_none() {
            return Err(Error::NamespaceResolutionFailure(
                namespace.unwrap_or_default(),
            ));
        }
        imports::register(scope_imports, slot, sub);

        Ok((ElementNode::reference(local, prefix, namespace), resume))
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        let max = self.options.max_depth();
        if self.depth > max {
            return Err(Error::DepthLimitExceeded {
                depth: self.depth,
                max,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Node for an open tag. Namespace declarations and namespace-qualified
/// attributes are not described.
fn open_node(local: String, attributes: Vec<TokenAttribute>) -> ElementNode {
    let mut node = ElementNode::new(local);
    for attr in attributes {
        if attr.is_namespace_declaration() {
            continue;
        }
        if let Some(ns) = &attr.namespace {
            warn!("<{}>: attribute {{{ns}}}{} not described", node.name, attr.local);
            continue;
        }
        if node.attributes().iter().any(|a| a.name == attr.local) {
            continue;
        }
        let hint = value_type_hint(&attr.value).map(str::to_owned);
        node.push_attribute(Attribute::new(attr.local, hint));
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MaxOccurs, MinOccurs, XMLNS_NS};
    use crate::token::VecTokens;

    fn build(tokens: Vec<Token>) -> Result<SchemaDocument> {
        let options = InferOptions::default();
        TreeBuilder::new(&options).build_primary(&mut VecTokens::new(tokens))
    }

    fn open(name: &str) -> Token {
        Token::open(name, None)
    }

    fn open_ns(name: &str, ns: &str) -> Token {
        Token::open(name, Some(ns))
    }

    fn root(doc: &SchemaDocument) -> &ElementNode {
        doc.root.as_ref().expect("root")
    }

    #[test]
    fn leaf_gets_generic_type() {
        let doc = build(vec![open("letter"), Token::text("Hi"), Token::Close]).unwrap();
        let letter = root(&doc);
        assert_eq!(letter.name, "letter");
        assert_eq!(letter.type_hint.as_deref(), Some(GENERIC_TYPE));
        assert!(letter.complex_type.is_none());
        assert_eq!(letter.min_occurs, MinOccurs::Required);
    }

    #[test]
    fn blank_text_is_ignored() {
        let doc = build(vec![open("a"), Token::text("x"), open("b"), Token::Close, Token::text("\n  "), Token::Close])
            .unwrap();
        // "x" bleibt, Whitespace ueberschreibt nicht
        assert!(root(&doc).is_mixed());
    }

    #[test]
    fn repetition_is_unbounded_and_optional() {
        let doc = build(vec![open("a"), open("b"), Token::Close, open("b"), Token::Close, Token::Close]).unwrap();
        let b = root(&doc).child("b").unwrap();
        assert_eq!(b.max_occurs, MaxOccurs::Unbounded);
        assert_eq!(b.min_occurs, MinOccurs::Optional);
        assert_eq!(root(&doc).children().len(), 1);
    }

    #[test]
    fn mixed_content() {
        let doc = build(vec![
            open("a"),
            Token::text("x"),
            open("b"),
            Token::Close,
            Token::text("y"),
            Token::Close,
        ])
        .unwrap();
        let a = root(&doc);
        assert!(a.is_mixed());
        assert_eq!(a.type_hint, None);
        assert!(a.child("b").is_some());
    }

    #[test]
    fn simple_content_collapse() {
        let doc = build(vec![
            Token::open_with("a", None, vec![TokenAttribute::new("k", "v")]),
            Token::text("text"),
            Token::Close,
        ])
        .unwrap();
        let a = root(&doc);
        assert_eq!(a.type_hint, None);
        let ct = a.complex_type.as_ref().unwrap();
        assert!(ct.attributes.is_empty());
        let sc = ct.simple_content.as_ref().unwrap();
        assert_eq!(sc.base, GENERIC_TYPE);
        assert_eq!(sc.attributes, vec![Attribute::new("k", Some(GENERIC_TYPE.into()))]);
    }

    #[test]
    fn attributes_without_text_stay_on_complex_type() {
        let doc = build(vec![
            Token::open_with(
                "allow-access-from",
                None,
                vec![TokenAttribute::new("domain", "*.example.com"), TokenAttribute::new("secure", "")],
            ),
            Token::Close,
        ])
        .unwrap();
        let ct = root(&doc).complex_type.as_ref().unwrap();
        assert!(ct.simple_content.is_none());
        assert_eq!(ct.attributes[0].type_hint.as_deref(), Some(GENERIC_TYPE));
        assert_eq!(ct.attributes[1].type_hint, None);
    }

    #[test]
    fn namespace_declarations_and_qualified_attributes_dropped() {
        let doc = build(vec![
            Token::open_with(
                "a",
                None,
                vec![
                    TokenAttribute::new("xsi", "urn:xsi").with_namespace(XMLNS_NS),
                    TokenAttribute::new("type", "t").with_namespace("urn:xsi"),
                    TokenAttribute::new("id", "1"),
                ],
            ),
            Token::Close,
        ])
        .unwrap();
        let names: Vec<_> = root(&doc).attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["id"]);
    }

    #[test]
    fn unbalanced_close_rejected() {
        let err = build(vec![open("a"), Token::Close, Token::Close]).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));

        let err = build(vec![Token::Close]).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn truncated_stream_rejected() {
        let err = build(vec![open("a"), open("b"), Token::Close]).unwrap_err();
        assert_eq!(err, Error::malformed("input ended with 1 open elements"));
    }

    #[test]
    fn empty_stream_rejected() {
        assert_eq!(build(vec![Token::Other]).unwrap_err(), Error::malformed("no root element"));
    }

    #[test]
    fn namespace_crossing_creates_import() {
        let doc = build(vec![
            open_ns("Envelope", "urn:soap"),
            open_ns("Body", "urn:soap"),
            open_ns("Response", "urn:svc"),
            open_ns("Result", "urn:svc"),
            Token::text("true"),
            Token::Close,
            Token::Close,
            Token::Close,
            Token::Close,
        ])
        .unwrap();

        assert_eq!(doc.target_namespace.as_deref(), Some("urn:soap"));
        assert_eq!(doc.imports.len(), 1);
        let import = &doc.imports[0];
        assert_eq!(import.location, "1.xsd");
        assert_eq!(import.namespace.as_deref(), Some("urn:svc"));

        let sub = import.schema.as_ref().unwrap();
        assert_eq!(root(sub).name, "Response");
        assert!(root(sub).child("Result").is_some());

        let body = root(&doc).child("Body").unwrap();
        let r = &body.children()[0];
        assert!(r.name.is_empty());
        let reference = r.reference.as_ref().unwrap();
        assert_eq!(reference.local, "Response");
        assert_eq!(reference.prefix, "q1");
        assert_eq!(reference.namespace.as_deref(), Some("urn:svc"));
        assert!(r.complex_type.is_none());
    }

    #[test]
    fn one_import_per_foreign_namespace() {
        let doc = build(vec![
            open("r"),
            open_ns("x", "urn:a"),
            Token::Close,
            open_ns("y", "urn:b"),
            Token::Close,
            open_ns("x", "urn:a"),
            open_ns("z", "urn:a"),
            Token::Close,
            Token::Close,
            Token::Close,
        ])
        .unwrap();

        let namespaces: Vec<_> = doc.imports.iter().map(|i| i.namespace.as_deref()).collect();
        assert_eq!(namespaces, [Some("urn:a"), Some("urn:b")]);

        // zweites Vorkommen fliesst in das vorhandene Import-Dokument
        let sub = doc.imports[0].schema.as_ref().unwrap();
        assert!(root(sub).child("z").is_some());

        let refs = root(&doc).children();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].max_occurs, MaxOccurs::Unbounded);
        assert_eq!(refs[1].reference.as_ref().unwrap().prefix, "q2");
    }

    #[test]
    fn nested_alternation_back_to_outer_namespace() {
        let doc = build(vec![
            open_ns("a", "urn:outer"),
            open_ns("b", "urn:inner"),
            open_ns("c", "urn:outer"),
            Token::Close,
            Token::Close,
            Token::Close,
        ])
        .unwrap();

        let inner = doc.imports[0].schema.as_ref().unwrap();
        assert_eq!(inner.imports.len(), 1);
        assert_eq!(inner.imports[0].location, "2.xsd");
        assert_eq!(inner.imports[0].namespace.as_deref(), Some("urn:outer"));
        assert_eq!(doc.document_count(), 3);
    }

    #[test]
    fn crossing_into_no_namespace_is_unprefixed() {
        let doc = build(vec![open_ns("a", "urn:x"), open("b"), Token::Close, Token::Close]).unwrap();
        assert_eq!(doc.imports[0].namespace, None);
        let reference = root(&doc).children()[0].reference.as_ref().unwrap();
        assert_eq!(reference.prefix, "");
        assert_eq!(reference.namespace, None);
    }

    #[test]
    fn depth_limit() {
        let options = InferOptions::default().with_max_depth(2);
        let mut tokens = VecTokens::new(vec![open("a"), open("b"), open("c"), Token::Close, Token::Close, Token::Close]);
        let err = TreeBuilder::new(&options).build_primary(&mut tokens).unwrap_err();
        assert_eq!(err, Error::DepthLimitExceeded { depth: 3, max: 2 });
    }

    #[test]
    fn depth_counts_across_scopes() {
        let options = InferOptions::default().with_max_depth(2);
        let mut tokens = VecTokens::new(vec![
            open_ns("a", "urn:1"),
            open_ns("b", "urn:2"),
            open_ns("c", "urn:1"),
            Token::Close,
            Token::Close,
            Token::Close,
        ]);
        assert!(matches!(
            TreeBuilder::new(&options).build_primary(&mut tokens),
            Err(Error::DepthLimitExceeded { .. })
        ));
    }

    #[test]
    fn second_root_rejected() {
        let err = build(vec![open("a"), Token::Close, open("b"), Token::Close]).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn builder_shares_locations_across_samples() {
        let options = InferOptions::default();
        let mut builder = TreeBuilder::new(&options);
        let sample = || VecTokens::new(vec![open("r"), open_ns("x", "urn:a"), Token::Close, Token::Close]);

        let first = builder.build_primary(&mut sample()).unwrap();
        let second = builder.build_primary(&mut sample()).unwrap();
        assert_eq!(first.imports[0].location, "1.xsd");
        assert_eq!(second.imports[0].location, "2.xsd");
        assert_eq!(builder.imports_allocated(), 2);
    }

    #[test]
    fn value_hints() {
        assert_eq!(value_type_hint(" \t\r\n"), None);
        assert_eq!(value_type_hint("403"), Some(GENERIC_TYPE));
    }
}
