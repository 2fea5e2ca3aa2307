use std::fs;
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use crate::tree::{NodeId, Tree};

/// Errors that can occur while writing XML from a [`Tree`].
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to serialize XML bytes.
    #[error("failed to write XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Failed to write output file.
    #[error("failed to write XML file: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a [`Tree`] into XML bytes.
pub fn write(tree: &Tree) -> Result<Vec<u8>, WriteError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_node(&mut writer, tree, tree.root())?;
    Ok(writer.into_inner())
}

/// Serialize a [`Tree`] and write it to `path`.
pub fn write_file(tree: &Tree, path: &Path) -> Result<(), WriteError> {
    let bytes = write(tree)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    tree: &Tree,
    id: NodeId,
) -> Result<(), quick_xml::Error> {
    let node = tree.node(id);
    let mut start = BytesStart::new(node.tag.as_str());

    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if tree.children(id).is_empty() && node.text.is_none() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;

        if let Some(text) = &node.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }

        for &child in tree.children(id) {
            write_node(writer, tree, child)?;
        }

        writer.write_event(Event::End(BytesEnd::new(node.tag.as_str())))?;
    }

    if let Some(tail) = &tree.node(id).tail {
        writer.write_event(Event::Text(BytesText::new(tail)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn round_trips_text_and_tail() {
        let tree = parse(b"<root><node>inner</node>tail text</root>").unwrap();
        let bytes = write(&tree).unwrap();
        let reparsed = parse(&bytes).unwrap();
        assert!(tree.structurally_equal(tree.root(), reparsed.root(), &reparsed));
    }
}
