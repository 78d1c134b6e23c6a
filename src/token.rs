//! Token stream consumed by the tree builder.
//!
//! Character decoding and well-formedness checks happen upstream; the
//! builder only needs open/close/text events with resolved namespaces.

use crate::Result;

/// An attribute as reported by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAttribute {
    pub local: String,
    /// Resolved namespace; namespace declarations carry [`crate::schema::XMLNS_NS`].
    pub namespace: Option<String>,
    pub value: String,
}

impl TokenAttribute {
    pub fn new(local: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            namespace: None,
            value: value.into(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// `xmlns` / `xmlns:p` declaration.
    pub fn is_namespace_declaration(&self) -> bool {
        self.namespace.as_deref() == Some(crate::schema::XMLNS_NS)
    }
}

/// One event of the XML token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open {
        local: String,
        /// Resolved namespace URI, `None` for no namespace.
        namespace: Option<String>,
        attributes: Vec<TokenAttribute>,
    },
    Close,
    Text(String),
    /// Comments, processing instructions, declarations.
    Other,
}

impl Token {
    /// Open tag without attributes.
    pub fn open(local: impl Into<String>, namespace: Option<&str>) -> Self {
        Self::Open {
            local: local.into(),
            namespace: namespace.map(str::to_owned),
            attributes: Vec::new(),
        }
    }

    /// Open tag with attributes.
    pub fn open_with(
        local: impl Into<String>,
        namespace: Option<&str>,
        attributes: Vec<TokenAttribute>,
    ) -> Self {
        Self::Open {
            local: local.into(),
            namespace: namespace.map(str::to_owned),
            attributes,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

/// Pull-based token source. `Ok(None)` marks the end of the stream.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Option<Token>>;
}

impl<T: TokenSource + ?Sized> TokenSource for &mut T {
    fn next_token(&mut self) -> Result<Option<Token>> {
        (**self).next_token()
    }
}

/// Token source over an in-memory sequence.
#[derive(Debug, Clone)]
pub struct VecTokens {
    tokens: std::vec::IntoIter<Token>,
}

impl VecTokens {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }
}

impl TokenSource for VecTokens {
    fn next_token(&mut self) -> Result<Option<Token>> {
        Ok(self.tokens.next())
    }
}

impl From<Vec<Token>> for VecTokens {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}
