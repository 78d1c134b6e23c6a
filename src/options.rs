//! Inference options.
//!
//! Controls the resource guards of one inference job. The schema policy
//! itself (form defaults, the generic scalar type) is fixed and lives in
//! [`crate::schema`].
//!
//! # Beispiel
//!
//! ```
//! use xsdinfer::options::InferOptions;
//!
//! let opts = InferOptions::default()
//!     .with_max_depth(64)
//!     .with_max_input_bytes(1024 * 1024);
//!
//! assert_eq!(opts.max_depth(), 64);
//! assert_eq!(opts.max_input_bytes(), 1024 * 1024);
//! ```

/// Default-Grenze fuer Verschachtelungstiefe (Elemente + Namespace-Wechsel).
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Maximale Eingabegroesse (16 MiB), DoS-Schutz.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 16 * 1024 * 1024;

/// Options for one inference job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferOptions {
    pub(crate) max_depth: usize,
    pub(crate) max_input_bytes: usize,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl InferOptions {
    // --- Getter ---

    /// Maximum number of simultaneously open frames across all namespace scopes.
    pub fn max_depth(&self) -> usize { self.max_depth }
    /// Maximum accepted size of a single XML sample or schema text.
    pub fn max_input_bytes(&self) -> usize { self.max_input_bytes }

    // --- Builder-Setter (Fluent API) ---

    /// Setzt die maximale Tiefe.
    pub fn with_max_depth(mut self, depth: usize) -> Self { self.max_depth = depth; self }
    /// Setzt die maximale Eingabegroesse.
    pub fn with_max_input_bytes(mut self, bytes: usize) -> Self { self.max_input_bytes = bytes; self }

    /// Rejects input larger than [`max_input_bytes`](Self::max_input_bytes).
    pub(crate) fn check_input_len(&self, len: usize) -> crate::Result<()> {
        if len > self.max_input_bytes {
            return Err(crate::Error::InputTooLarge {
                len,
                max: self.max_input_bytes,
            });
        }
        Ok(())
    }
}
