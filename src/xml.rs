//! A namespace-aware XML reader wrapping `quick-xml`, with line/column
//! tracking for [`crate::Location`] and an explicit presence-vs-absence
//! distinction on attribute lookups (spec.md §9 "Raw-XML attribute
//! distinction": a missing `dir` attribute and `dir=""` are different
//! findings).

use std::borrow::Cow;
use std::fmt;

use quick_xml::Decoder;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::report::Location;

/// A well-formedness or encoding failure while scanning a document.
#[derive(Debug)]
pub(crate) struct XmlError {
    pub(crate) message: String,
    pub(crate) position: Option<(u32, u32)>,
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for XmlError {}

pub(crate) type XmlResult<T> = Result<T, XmlError>;

/// [`Location`] for `error`, at `path`: carries the line/column the reader
/// had reached when it failed, falling back to a bare path if unknown.
pub(crate) fn located(path: &str, error: &XmlError) -> Location {
    match error.position {
        Some((line, column)) => Location::at(path.to_string(), line, column),
        None => Location::path(path),
    }
}

/// One parsed XML event, with comments/PIs/doctypes folded into `Skipped`.
pub(crate) enum XmlEvent<'a> {
    Start(XmlStartElement<'a>),
    End(Cow<'a, str>),
    Text(String),
    Skipped,
}

pub(crate) struct XmlReader<'a> {
    reader: quick_xml::Reader<&'a [u8]>,
    source: &'a [u8],
}

impl<'a> XmlReader<'a> {
    pub(crate) fn from_bytes(source: &'a [u8]) -> Self {
        let mut reader = quick_xml::Reader::from_reader(source);
        reader.config_mut().trim_text(false);
        Self { reader, source }
    }

    /// The 1-based `(line, column)` of the reader's current position.
    pub(crate) fn position(&self) -> (u32, u32) {
        offset_to_line_col(self.source, self.reader.buffer_position() as usize)
    }

    fn err(&self, message: impl Into<String>) -> XmlError {
        XmlError {
            message: message.into(),
            position: Some(self.position()),
        }
    }

    /// Reads the next event, or `None` at end of document.
    pub(crate) fn next(&mut self) -> Option<XmlResult<XmlEvent<'a>>> {
        let decoder = self.reader.decoder();
        match self.reader.read_event() {
            Ok(Event::Eof) => None,
            Ok(Event::Start(e)) => Some(Ok(XmlEvent::Start(XmlStartElement::new(e, false, decoder)))),
            Ok(Event::Empty(e)) => Some(Ok(XmlEvent::Start(XmlStartElement::new(e, true, decoder)))),
            Ok(Event::End(e)) => Some(Ok(XmlEvent::End(decode_name(&e)))),
            Ok(Event::Text(e)) => Some(Ok(decode_text(&e).map(XmlEvent::Text))),
            Ok(_) => Some(Ok(XmlEvent::Skipped)),
            Err(error) => Some(Err(self.err(error.to_string()))),
        }
    }

    /// Consumes and concatenates text up to (and including) the matching
    /// end tag for `start`.
    pub(crate) fn read_element_text(&mut self, start: &XmlStartElement<'_>) -> XmlResult<String> {
        if start.is_self_closing {
            return Ok(String::new());
        }
        let target = start.name_owned();
        let mut text = String::new();
        let mut depth = 0u32;

        while let Some(event) = self.next() {
            match event? {
                XmlEvent::Text(chunk) => text.push_str(chunk.trim()),
                XmlEvent::Start(nested) if nested.name() == target => depth += 1,
                XmlEvent::End(name) if name == target => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        Ok(text)
    }
}

fn decode_name(end: &BytesEnd<'_>) -> Cow<'static, str> {
    String::from_utf8_lossy(end.name().as_ref()).into_owned().into()
}

fn decode_text(text: &BytesText<'_>) -> XmlResult<String> {
    Ok(text.unescape().map(Cow::into_owned).unwrap_or_else(|_| {
        String::from_utf8_lossy(text.as_ref()).into_owned()
    }))
}

/// A `<start ...>` or `<start .../>` tag.
pub(crate) struct XmlStartElement<'a> {
    element: BytesStart<'a>,
    is_self_closing: bool,
    decoder: Decoder,
}

impl<'a> XmlStartElement<'a> {
    fn new(element: BytesStart<'a>, is_self_closing: bool, decoder: Decoder) -> Self {
        Self {
            element,
            is_self_closing,
            decoder,
        }
    }

    /// The element's fully-qualified name (including any namespace prefix), as written.
    pub(crate) fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.element.name().as_ref())
    }

    fn name_owned(&self) -> String {
        self.name().into_owned()
    }

    /// The element's local name, with any namespace prefix stripped.
    pub(crate) fn local_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.element.local_name().into_inner())
    }

    /// `true` if this is an empty-element tag (`<x/>`).
    pub(crate) fn is_self_closing(&self) -> bool {
        self.is_self_closing
    }

    /// The value of attribute `key`, or `None` if the attribute is absent.
    ///
    /// Distinguishes absence (`None`) from an explicit empty value (`Some("")`).
    pub(crate) fn attribute(&self, key: &str) -> Option<String> {
        self.element
            .try_get_attribute(key)
            .ok()
            .flatten()
            .map(|attribute| {
                attribute
                    .decode_and_unescape_value(self.decoder)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attribute.value).into_owned())
            })
    }

    /// `true` if attribute `key` is present, regardless of its value.
    pub(crate) fn has_attribute(&self, key: &str) -> bool {
        self.element.try_get_attribute(key).ok().flatten().is_some()
    }

    /// All attributes as `(name, value)` pairs, skipping any that fail to parse.
    pub(crate) fn attributes(&self) -> Vec<(String, String)> {
        self.element
            .attributes()
            .filter_map(Result::ok)
            .map(|attribute| {
                let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
                let value = attribute
                    .decode_and_unescape_value(self.decoder)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attribute.value).into_owned());
                (name, value)
            })
            .collect()
    }
}

/// Converts a byte offset into `source` to a 1-based `(line, column)` pair.
pub(crate) fn offset_to_line_col(source: &[u8], offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let mut line = 1u32;
    let mut col = 1u32;
    for &byte in &source[..offset] {
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_start_and_end_events() {
        let mut reader = XmlReader::from_bytes(br#"<root><child id="a" empty=""/></root>"#);
        let mut names = Vec::new();
        while let Some(event) = reader.next() {
            match event.unwrap() {
                XmlEvent::Start(el) => names.push(el.name().into_owned()),
                XmlEvent::End(name) => names.push(format!("/{name}")),
                _ => {}
            }
        }
        assert_eq!(names, vec!["root", "child", "/root"]);
    }

    #[test]
    fn distinguishes_missing_from_empty_attribute() {
        let mut reader = XmlReader::from_bytes(br#"<x a="" />"#);
        let event = reader.next().unwrap().unwrap();
        let XmlEvent::Start(el) = event else {
            panic!("expected start element")
        };
        assert_eq!(el.attribute("a"), Some(String::new()));
        assert!(el.has_attribute("a"));
        assert_eq!(el.attribute("b"), None);
        assert!(!el.has_attribute("b"));
    }

    #[test]
    fn reads_element_text() {
        let mut reader = XmlReader::from_bytes(b"<title>Moby Dick</title>");
        let start = match reader.next().unwrap().unwrap() {
            XmlEvent::Start(el) => el,
            _ => panic!("expected start element"),
        };
        assert_eq!(reader.read_element_text(&start).unwrap(), "Moby Dick");
    }

    #[test]
    fn tracks_line_and_column() {
        let source = b"line1\nline2\nline3";
        assert_eq!(offset_to_line_col(source, 0), (1, 1));
        assert_eq!(offset_to_line_col(source, 6), (2, 1));
        assert_eq!(offset_to_line_col(source, 12), (3, 1));
    }
}
