use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use thiserror::Error;

use crate::tree::{NodeId, Tree};

/// Errors that can occur while parsing XML into a [`Tree`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input XML could not be decoded or tokenized.
    #[error("failed to parse XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Input bytes were not valid UTF-8 for tag/attribute/text extraction.
    #[error("invalid UTF-8 while parsing XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Failed to decode text entity or bytes.
    #[error("failed to decode XML text: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    /// Failed to read input file.
    #[error("failed to read XML file: {0}")]
    Io(#[from] std::io::Error),
    /// Structural issue in XML document.
    #[error("malformed XML: {0}")]
    Malformed(String),
}

/// Parse XML bytes into a [`Tree`].
///
/// Comments, processing instructions, and doctypes are skipped; they do not
/// become tree nodes (see SPEC_FULL.md §9 on root-level comment handling).
/// Text is routed to each node's `text` (before its first child) or the
/// preceding child's `tail` (after that child, within this parent) following
/// the usual ElementTree split.
pub fn parse(xml: &[u8]) -> Result<Tree, ParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut tree: Option<Tree> = None;
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let (tag, attrs) = build_node_start(&e, &reader)?;
                let id = match (&mut tree, stack.last()) {
                    (Some(t), Some(&parent)) => {
                        let id = t.new_node(tag);
                        for (k, v) in attrs {
                            t.node_mut(id).attributes.insert(k, v);
                        }
                        t.append_child(parent, id);
                        id
                    }
                    (None, _) => {
                        let mut t = Tree::with_root(tag);
                        let root = t.root();
                        for (k, v) in attrs {
                            t.node_mut(root).attributes.insert(k, v);
                        }
                        tree = Some(t);
                        root
                    }
                    (Some(_), None) => {
                        return Err(ParseError::Malformed(
                            "multiple top-level elements found".to_string(),
                        ));
                    }
                };
                stack.push(id);
            }
            Event::Empty(e) => {
                let (tag, attrs) = build_node_start(&e, &reader)?;
                match (&mut tree, stack.last()) {
                    (Some(t), Some(&parent)) => {
                        let id = t.new_node(tag);
                        for (k, v) in attrs {
                            t.node_mut(id).attributes.insert(k, v);
                        }
                        t.append_child(parent, id);
                    }
                    (None, _) => {
                        let mut t = Tree::with_root(tag);
                        let root = t.root();
                        for (k, v) in attrs {
                            t.node_mut(root).attributes.insert(k, v);
                        }
                        tree = Some(t);
                    }
                    (Some(_), None) => {
                        return Err(ParseError::Malformed(
                            "multiple top-level elements found".to_string(),
                        ));
                    }
                }
            }
            Event::Text(e) => {
                let text = e.unescape()?.into_owned();
                append_text(&mut tree, &stack, text);
            }
            Event::CData(e) => {
                let text = std::str::from_utf8(e.as_ref())?.to_string();
                append_text(&mut tree, &stack, text);
            }
            Event::End(_) => {
                stack.pop().ok_or_else(|| {
                    ParseError::Malformed("encountered closing tag without open tag".to_string())
                })?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::Malformed(
            "unclosed element(s) at end of document".to_string(),
        ));
    }

    tree.ok_or_else(|| ParseError::Malformed("no root element found".to_string()))
}

/// Parse an XML file into a [`Tree`].
pub fn parse_file(path: &Path) -> Result<Tree, ParseError> {
    let bytes = fs::read(path)?;
    parse(&bytes)
}

/// Route a run of text to the currently-open element's `text` (if it has no
/// children yet) or its last child's `tail` (if it does).
fn append_text(tree: &mut Option<Tree>, stack: &[NodeId], text: String) {
    if text.is_empty() {
        return;
    }
    let Some(t) = tree else { return };
    let Some(&current) = stack.last() else { return };

    if let Some(&last_child) = t.children(current).last() {
        let node = t.node_mut(last_child);
        match &mut node.tail {
            Some(existing) => existing.push_str(&text),
            None => node.tail = Some(text),
        }
    } else {
        let node = t.node_mut(current);
        match &mut node.text {
            Some(existing) => existing.push_str(&text),
            None => node.text = Some(text),
        }
    }
}

fn build_node_start(
    e: &quick_xml::events::BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<(String, Vec<(String, String)>), ParseError> {
    let tag = qname_to_string(e.name())?;
    let mut attrs = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = qname_to_string(attr.key)?;
        let value = attr
            .decode_and_unescape_value(reader.decoder())?
            .into_owned();
        attrs.push((key, value));
    }

    Ok((tag, attrs))
}

fn qname_to_string(name: QName<'_>) -> Result<String, ParseError> {
    Ok(std::str::from_utf8(name.as_ref())?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_and_tail() {
        let tree = parse(b"<root><node>inner</node>tail text</root>").unwrap();
        let root = tree.root();
        let node = tree.children(root)[0];
        assert_eq!(tree.node(node).text.as_deref(), Some("inner"));
        assert_eq!(tree.node(node).tail.as_deref(), Some("tail text"));
    }

    #[test]
    fn parses_attributes_in_order() {
        let tree = parse(br#"<root b="2" a="1"/>"#).unwrap();
        let root = tree.root();
        let keys: Vec<&str> = tree.node(root).attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn rejects_multiple_top_level_elements() {
        let err = parse(b"<a/><b/>").unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }
}
