//! XML tokenizer.
//!
//! Uses quick-xml's namespace-aware reader to produce the [`Token`] stream
//! the tree builder consumes. Pull-based, so a sample is never held as a
//! DOM in memory.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{QName as XmlQName, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::Error;
use crate::schema::XMLNS_NS;
use crate::token::{Token, TokenAttribute, TokenSource};
use crate::Result;

/// [`TokenSource`] over an XML byte stream.
pub struct XmlTokenReader<R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    depth: usize,
}

impl<'a> XmlTokenReader<&'a [u8]> {
    /// Tokenizer over an in-memory document.
    pub fn from_str(xml: &'a str) -> Self {
        Self::new(xml.as_bytes())
    }
}

impl<R: BufRead> XmlTokenReader<R> {
    pub fn new(input: R) -> Self {
        let mut reader = NsReader::from_reader(input);
        let config = reader.config_mut();
        config.trim_text(false);
        // <a/> kommt als Open + Close
        config.expand_empty_elements = true;
        Self {
            reader,
            buf: Vec::new(),
            depth: 0,
        }
    }
}

fn parse_error(position: impl std::fmt::Debug, e: impl std::fmt::Display) -> Error {
    Error::XmlParseError(format!("parse XML error at {position:?}: {e}"))
}

impl<R: BufRead> TokenSource for XmlTokenReader<R> {
    fn next_token(&mut self) -> Result<Option<Token>> {
        self.buf.clear();
        let event = match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => event,
            Err(e) => return Err(parse_error(self.reader.buffer_position(), e)),
        };
        let token = match event {
            Event::Start(e) => {
                self.depth += 1;
                open_token(&self.reader, &e)?
            }
            Event::End(_) => {
                self.depth = self.depth.checked_sub(1).ok_or_else(|| {
                    Error::XmlParseError("unerwartetes End-Element bei depth=0".to_string())
                })?;
                Token::Close
            }
            Event::Empty(e) => {
                // Nur ohne expand_empty_elements erreichbar.
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                return Err(parse_error(
                    self.reader.buffer_position(),
                    format!("unexpanded empty element {name}"),
                ));
            }
            Event::Text(e) => {
                let raw = std::str::from_utf8(&*e).map_err(|er| Error::XmlParseError(er.to_string()))?;
                let text = quick_xml::escape::unescape(raw)
                    .map_err(|er| Error::XmlParseError(er.to_string()))?;
                text_token(self.depth, text.into_owned())?
            }
            Event::CData(e) => {
                let text = String::from_utf8(e.into_inner().into_owned())
                    .map_err(|er| Error::XmlParseError(er.to_string()))?;
                text_token(self.depth, text)?
            }
            Event::GeneralRef(e) => {
                let name = std::str::from_utf8(e.as_ref()).map_err(|er| Error::XmlParseError(er.to_string()))?;
                match resolve_reference(name) {
                    Some(ch) => text_token(self.depth, ch.to_string())?,
                    // Unbekannte Entity: Inhalt unbekannt, zaehlt als Text.
                    None if self.depth > 0 => Token::Text(format!("&{name};")),
                    None => Token::Other,
                }
            }
            Event::Eof => return Ok(None),
            _ => Token::Other,
        };
        Ok(Some(token))
    }
}

fn text_token(depth: usize, text: String) -> Result<Token> {
    if depth == 0 {
        if !text.trim().is_empty() {
            return Err(Error::XmlParseError(
                "character data outside root element".to_string(),
            ));
        }
        return Ok(Token::Other);
    }
    Ok(Token::Text(text))
}

fn open_token<R: BufRead>(reader: &NsReader<R>, e: &BytesStart<'_>) -> Result<Token> {
    let (ns, local) = reader.resolver().resolve_element(e.name());
    let namespace = resolve_to_uri(ns)?;
    let local = decode_name(local.as_ref())?;

    let mut attributes = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|er| Error::XmlParseError(er.to_string()))?;
        let raw = std::str::from_utf8(attr.value.as_ref())
            .map_err(|er| Error::XmlParseError(er.to_string()))?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(|er| Error::XmlParseError(er.to_string()))?
            .into_owned();

        if let Some(prefix) = namespace_decl_prefix(attr.key) {
            attributes.push(TokenAttribute {
                local: prefix,
                namespace: Some(XMLNS_NS.to_string()),
                value,
            });
            continue;
        }

        let (ns, attr_local) = reader.resolver().resolve_attribute(attr.key);
        attributes.push(TokenAttribute {
            local: decode_name(attr_local.as_ref())?,
            namespace: resolve_to_uri(ns)?,
            value,
        });
    }

    Ok(Token::Open {
        local,
        namespace,
        attributes,
    })
}

/// `xmlns` → `Some("xmlns")`, `xmlns:p` → `Some("p")`, sonst `None`.
fn namespace_decl_prefix(key: XmlQName<'_>) -> Option<String> {
    let key = key.as_ref();
    if key == b"xmlns" {
        return Some("xmlns".to_string());
    }
    key.strip_prefix(b"xmlns:")
        .map(|p| String::from_utf8_lossy(p).into_owned())
}

/// Gebundene URI, Entities und Zeichenreferenzen wie in Attributwerten
/// aufgeloest (der Resolver liefert den Rohwert der Deklaration).
fn resolve_to_uri(ns: ResolveResult<'_>) -> Result<Option<String>> {
    match ns {
        ResolveResult::Bound(ns) => {
            let raw = std::str::from_utf8(ns.as_ref())
                .map_err(|er| Error::XmlParseError(er.to_string()))?;
            let uri = quick_xml::escape::unescape(raw)
                .map_err(|er| Error::XmlParseError(er.to_string()))?;
            Ok(Some(uri.into_owned()))
        }
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::XmlParseError(format!(
            "unknown namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn decode_name(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|er| Error::XmlParseError(er.to_string()))
}

/// Vordefinierte Entities und Zeichenreferenzen (`#10`, `#x41`).
fn resolve_reference(name: &str) -> Option<char> {
    if let Some(digits) = name.strip_prefix('#') {
        let code_point = if let Some(hex) = digits.strip_prefix('x') {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            digits.parse::<u32>().ok()?
        };
        return char::from_u32(code_point);
    }
    quick_xml::escape::resolve_predefined_entity(name).and_then(|s| s.chars().next())
}
