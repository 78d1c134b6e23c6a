//! xsdinfer – XML Schema inference from sample documents
//!
//! Observes the structure of sample XML documents and generalizes it into a
//! schema set that validates those samples and structurally similar ones.
//! Foreign-namespace subtrees are factored out into imported documents.
//!
//! # Beispiel
//!
//! ```
//! use xsdinfer::{codec, infer_from_str, InferOptions};
//!
//! let opts = InferOptions::default();
//! let doc = infer_from_str("<a><b/><b/></a>", &opts).unwrap();
//!
//! let texts = codec::serialize_all(&doc).unwrap();
//! assert!(texts[0].contains(r#"maxOccurs="unbounded""#));
//!
//! let back = codec::deserialize_all(&texts, 0, &opts).unwrap();
//! assert_eq!(back, doc);
//! ```

pub mod builder;
pub mod codec;
pub mod error;
pub mod imports;
pub mod merge;
pub mod options;
pub mod schema;
pub mod token;
pub mod validate;
pub mod xml;

use std::io::{BufRead, Read};

use log::warn;

pub use error::{Error, Result};

/// HashSet mit ahash.
pub(crate) type FastHashSet<K> = hashbrown::HashSet<K, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API
pub use builder::TreeBuilder;
pub use merge::merge_attach;
pub use options::InferOptions;
pub use schema::{
    Attribute, ChoiceGroup, ComplexType, ElementNode, Import, MaxOccurs, MinOccurs, Reference,
    SchemaDocument, SimpleContent,
};
pub use token::{Token, TokenAttribute, TokenSource, VecTokens};
pub use validate::{validate_sample, write_schema_set, SchemaValidator, ValidationReport};
pub use xml::XmlTokenReader;

/// Infers the schema graph of one token stream.
pub fn infer_from_tokens<S: TokenSource>(mut tokens: S, options: &InferOptions) -> Result<SchemaDocument> {
    TreeBuilder::new(options).build_primary(&mut tokens)
}

/// Infers the schema graph of one XML document.
pub fn infer_from_str(xml: &str, options: &InferOptions) -> Result<SchemaDocument> {
    options.check_input_len(xml.len())?;
    infer_from_tokens(XmlTokenReader::from_str(xml), options)
}

/// Infers the schema graph of an XML byte stream. Reads at most
/// `max_input_bytes + 1` bytes before giving up.
pub fn infer_from_reader<R: BufRead>(reader: R, options: &InferOptions) -> Result<SchemaDocument> {
    let limit = u64::try_from(options.max_input_bytes()).unwrap_or(u64::MAX).saturating_add(1);
    let mut buf = Vec::new();
    reader.take(limit).read_to_end(&mut buf)?;
    options.check_input_len(buf.len())?;
    infer_from_tokens(XmlTokenReader::new(buf.as_slice()), options)
}

/// Infers every sample and folds the results with document merge.
///
/// All samples share one import location counter, so location names stay
/// unique in the merged graph. Samples whose root differs from the first
/// one are skipped with a warning.
pub fn infer_all<I, S>(samples: I, options: &InferOptions) -> Result<Option<SchemaDocument>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = TreeBuilder::new(options);
    let mut merged: Option<SchemaDocument> = None;

    for (i, sample) in samples.into_iter().enumerate() {
        let sample = sample.as_ref();
        options.check_input_len(sample.len())?;
        let doc = builder.build_primary(&mut XmlTokenReader::from_str(sample))?;
        match merged.as_mut() {
            Some(acc) => {
                if !acc.merge(doc) {
                    warn!("sample {i}: root does not match, skipped");
                }
            }
            None => merged = Some(doc),
        }
    }
    Ok(merged)
}
