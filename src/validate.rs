//! Boundary to an external schema validator.
//!
//! The validation engine itself is not part of this crate. [`validate_sample`]
//! materializes a document graph as one file per location in a temporary
//! directory, hands the primary file to a [`SchemaValidator`] and removes the
//! directory again on every exit path.

use std::path::{Path, PathBuf};

use log::debug;

use crate::codec::serialize;
use crate::error::{Error, Result};
use crate::imports::documents;
use crate::schema::SchemaDocument;
use crate::FastHashSet;

/// Outcome of validating one document. A failed validation is data, not an
/// error of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub passed: bool,
    /// Violations in the order the validator reported them.
    pub messages: Vec<String>,
}

impl ValidationReport {
    pub fn pass() -> Self {
        Self {
            passed: true,
            messages: Vec::new(),
        }
    }

    pub fn fail(messages: Vec<String>) -> Self {
        Self {
            passed: false,
            messages,
        }
    }
}

/// A schema validation engine.
///
/// `schema` is the primary file of a schema set written by
/// [`write_schema_set`]; imports resolve relative to its directory.
pub trait SchemaValidator {
    fn validate(&self, schema: &Path, document: &[u8]) -> Result<ValidationReport>;
}

/// Writes every document of the graph to `dir`, one file per location.
/// Returns the path of the primary document.
pub fn write_schema_set(doc: &SchemaDocument, dir: &Path) -> Result<PathBuf> {
    let mut seen = FastHashSet::default();
    let mut primary = None;

    for (location, d) in documents(doc) {
        if location.is_empty() || location.contains(['/', '\\']) || location == ".." {
            return Err(Error::IoError(format!("invalid schema location '{location}'")));
        }
        if !seen.insert(location) {
            return Err(Error::IoError(format!("duplicate schema location '{location}'")));
        }
        let path = dir.join(location);
        std::fs::write(&path, serialize(d)?)?;
        debug!("wrote {}", path.display());
        primary.get_or_insert(path);
    }

    primary.ok_or_else(|| Error::IoError("empty schema set".to_string()))
}

/// Validates `document` against the inferred schema set.
pub fn validate_sample(
    doc: &SchemaDocument,
    document: &[u8],
    validator: &dyn SchemaValidator,
) -> Result<ValidationReport> {
    let dir = tempfile::Builder::new().prefix("xsdinfer").tempdir()?;
    let primary = write_schema_set(doc, dir.path())?;
    let report = validator.validate(&primary, document)?;
    if !report.passed {
        debug!("validation failed with {} messages", report.messages.len());
    }
    dir.close()?;
    Ok(report)
}
