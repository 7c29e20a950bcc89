//! Minimal XML element tree
//!
//! FOMOD files are small, so the whole document is read into an owned
//! [`Element`] tree with `quick-xml` and queried by tag name afterwards.
//! Comments, processing instructions and the DOCTYPE are dropped.

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use crate::config::ConfigError;

/// One XML element with its attributes, child elements and text content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child element with the given tag
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All child elements with the given tag, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// All child elements, in document order
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Concatenated text content, untrimmed
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Trimmed text of the first child with the given tag, empty if absent
    pub fn child_text(&self, name: &str) -> String {
        self.child(name)
            .map(|child| child.text.trim().to_string())
            .unwrap_or_default()
    }
}

fn decode(bytes: &[u8]) -> Result<String, ConfigError> {
    let raw = std::str::from_utf8(bytes).map_err(|e| ConfigError::xml(e.to_string()))?;
    unescape(raw)
        .map(|cow| cow.into_owned())
        .map_err(|e| ConfigError::xml(e.to_string()))
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, ConfigError> {
    let name = decode(start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ConfigError::xml(e.to_string()))?;
        attributes.push((decode(attr.key.as_ref())?, decode(&attr.value)?));
    }
    Ok(Element {
        name,
        attributes,
        ..Element::default()
    })
}

/// Parse a document and return its root element
pub fn parse_document(source: &str) -> Result<Element, ConfigError> {
    // FOMOD files are commonly saved with a byte order mark
    let source = source.trim_start_matches('\u{feff}');
    let mut reader = Reader::from_str(source);

    // Open elements; the last entry is the innermost
    let mut stack: Vec<Element> = Vec::new();
    // Raw (still escaped) text per open element
    let mut raw_text: Vec<String> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ConfigError::xml(format!("at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(start) => {
                stack.push(open_element(&start)?);
                raw_text.push(String::new());
            }
            Event::Empty(start) => {
                let element = open_element(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| ConfigError::xml("unbalanced closing tag"))?;
                let text = raw_text.pop().unwrap_or_default();
                element.text = unescape(&text)
                    .map(|cow| cow.into_owned())
                    .map_err(|e| ConfigError::xml(e.to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(buffer) = raw_text.last_mut() {
                    let chunk = std::str::from_utf8(&text)
                        .map_err(|e| ConfigError::xml(e.to_string()))?;
                    buffer.push_str(chunk);
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(buffer) = raw_text.last_mut() {
                    let name = std::str::from_utf8(&reference)
                        .map_err(|e| ConfigError::xml(e.to_string()))?;
                    buffer.push('&');
                    buffer.push_str(name);
                    buffer.push(';');
                }
            }
            Event::CData(data) => {
                if let Some(buffer) = raw_text.last_mut() {
                    let chunk = std::str::from_utf8(&data)
                        .map_err(|e| ConfigError::xml(e.to_string()))?;
                    // CDATA is literal; escape it so the final unescape is a no-op on it
                    buffer.push_str(&quick_xml::escape::escape(chunk));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ConfigError::xml("unexpected end of document"));
    }
    root.ok_or_else(|| ConfigError::xml("document has no root element"))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ConfigError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(ConfigError::xml("multiple root elements")),
    }
}
