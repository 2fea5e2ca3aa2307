//! Placeholder codec (C5): collapses inline formatting subtrees to single
//! Unicode Private-Use-Area codepoints so that rich-text comparison reduces
//! to a word-level text diff, and expands them back afterwards.
//!
//! Grounded on `placeholder.py`'s `PlaceholderMaker`/`HTMLPlaceholderMaker`.

use std::collections::HashMap;

use crate::tree::{Attributes, NodeId, Tree};

const PLACEHOLDER_START: u32 = 0xE000;

/// What a placeholder codepoint stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Open,
    Close,
    Single,
}

/// What a single allocated codepoint decodes back into.
#[derive(Debug, Clone)]
pub struct PlaceholderEntry {
    pub tag: String,
    pub attributes: Attributes,
    pub kind: Kind,
    /// For `Open` entries, the paired `Close` codepoint.
    pub close_ref: Option<char>,
    /// The formatting class this placeholder was allocated for; `None` for
    /// the built-in `diff:insert`/`diff:delete` markers, which never nest
    /// against a formatting class and so never need a class-rank comparison.
    pub class: Option<FormattingClass>,
}

/// Which tag classes get which kind of placeholder, and which tags' text
/// content is treated as rich text at all.
#[derive(Debug, Clone, Default)]
pub struct CodecConfig {
    pub text_tags: Vec<String>,
    pub single_formatting_tags: Vec<String>,
    pub dual_formatting_tags: Vec<String>,
    pub complex_formatting_tags: Vec<String>,
}

impl CodecConfig {
    fn class_of(&self, tag: &str) -> Option<FormattingClass> {
        if self.single_formatting_tags.iter().any(|t| t == tag) {
            Some(FormattingClass::Single)
        } else if self.dual_formatting_tags.iter().any(|t| t == tag) {
            Some(FormattingClass::Dual)
        } else if self.complex_formatting_tags.iter().any(|t| t == tag) {
            Some(FormattingClass::Complex)
        } else {
            None
        }
    }

    fn is_text_tag(&self, tag: &str) -> bool {
        self.text_tags.iter().any(|t| t == tag)
    }
}

/// A placeholder's formatting class. Ranked `Complex < Dual < Single` so the
/// rich-text renderer's linearization step can order simultaneous new opens
/// by class rather than by codepoint — see `richtext.rs` for why this is the
/// resolution used instead of a raw-codepoint-order rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormattingClass {
    Complex,
    Dual,
    Single,
}

/// Allocates and deduplicates placeholder codepoints for one diff run. Must
/// not be shared across concurrent runs — the allocation counter and the
/// dedup caches are mutable, per-run state (SPEC_FULL.md §5).
pub struct PlaceholderCodec {
    next_codepoint: u32,
    forward: HashMap<char, PlaceholderEntry>,
    pairs: HashMap<String, (char, char)>,
    singles: HashMap<String, char>,
    pub insert_open: char,
    pub insert_close: char,
    pub delete_open: char,
    pub delete_close: char,
}

impl Default for PlaceholderCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderCodec {
    pub fn new() -> Self {
        let mut codec = PlaceholderCodec {
            next_codepoint: PLACEHOLDER_START,
            forward: HashMap::new(),
            pairs: HashMap::new(),
            singles: HashMap::new(),
            insert_open: '\u{0}',
            insert_close: '\u{0}',
            delete_open: '\u{0}',
            delete_close: '\u{0}',
        };
        let (ic, io) = codec.alloc_pair("diff:insert".to_string(), "diff:insert".to_string(), Attributes::new(), None);
        codec.insert_close = ic;
        codec.insert_open = io;
        let (dc, dopen) = codec.alloc_pair("diff:delete".to_string(), "diff:delete".to_string(), Attributes::new(), None);
        codec.delete_close = dc;
        codec.delete_open = dopen;
        codec
    }

    fn allocate(&mut self) -> char {
        self.next_codepoint += 1;
        char::from_u32(self.next_codepoint).expect("private-use codepoint range exhausted")
    }

    fn alloc_pair(&mut self, key: String, tag: String, attributes: Attributes, class: Option<FormattingClass>) -> (char, char) {
        if let Some(&existing) = self.pairs.get(&key) {
            return existing;
        }
        let close = self.allocate();
        self.forward.insert(
            close,
            PlaceholderEntry { tag: tag.clone(), attributes: attributes.clone(), kind: Kind::Close, close_ref: None, class },
        );
        let open = self.allocate();
        self.forward.insert(open, PlaceholderEntry { tag, attributes, kind: Kind::Open, close_ref: Some(close), class });
        self.pairs.insert(key, (close, open));
        (close, open)
    }

    /// Get or allocate an Open/Close pair for `tag`. When `discriminate` is
    /// true (complex tags), `attributes` participate in the dedup key; when
    /// false (dual tags), identical tags always share a pair regardless of
    /// attributes.
    pub fn pair_placeholder(&mut self, tag: &str, attributes: &Attributes, discriminate: bool) -> (char, char) {
        let key = dedup_key(tag, attributes, discriminate);
        let stored_attrs = if discriminate { attributes.clone() } else { Attributes::new() };
        let class = if discriminate { FormattingClass::Complex } else { FormattingClass::Dual };
        self.alloc_pair(key, tag.to_string(), stored_attrs, Some(class))
    }

    /// Get or allocate a Single placeholder for `tag` (attributes always
    /// discriminate, since a single tag carries no inner content to
    /// distinguish it structurally).
    pub fn single_placeholder(&mut self, tag: &str, attributes: &Attributes) -> char {
        let key = dedup_key(tag, attributes, true);
        if let Some(&c) = self.singles.get(&key) {
            return c;
        }
        let c = self.allocate();
        self.forward.insert(
            c,
            PlaceholderEntry {
                tag: tag.to_string(),
                attributes: attributes.clone(),
                kind: Kind::Single,
                close_ref: None,
                class: Some(FormattingClass::Single),
            },
        );
        self.singles.insert(key, c);
        c
    }

    pub fn entry(&self, c: char) -> Option<&PlaceholderEntry> {
        self.forward.get(&c)
    }

    pub fn is_placeholder(&self, c: char) -> bool {
        self.forward.contains_key(&c)
    }

    /// All codepoints currently allocated (used by the rich-text renderer to
    /// treat every live placeholder as its own tokenizer break character).
    pub fn known_placeholders(&self) -> Vec<char> {
        self.forward.keys().copied().collect()
    }

    /// Public entry point for decoding a placeholder-bearing fragment in
    /// isolation (outside the context of an existing tree node's `text`),
    /// used by the rich-text renderer to turn its merged output string back
    /// into real child elements.
    pub fn decode_fragment(&self, s: &str, tree: &mut Tree) -> (Option<String>, Vec<NodeId>) {
        decode_string(s, self, tree)
    }

    /// Derive a new Open/Close pair standing for the same element as `open`
    /// but annotated with one extra marker attribute (e.g.
    /// `diff:insert-formatting` or `diff:change-target`), used by the
    /// rich-text renderer (C9) to surface formatting-only or link-target
    /// changes without disturbing the original placeholder identity.
    pub fn get_modified_open(&mut self, open: char, marker_attr: &str, marker_value: &str) -> (char, char) {
        let entry = self.forward.get(&open).cloned().expect("unknown open placeholder");
        let mut attrs = entry.attributes.clone();
        attrs.insert(marker_attr.to_string(), marker_value.to_string());
        let base_key = dedup_key(&entry.tag, &entry.attributes, true);
        let key = format!("mod|{base_key}|{marker_attr}={marker_value}");
        self.alloc_pair(key, entry.tag.clone(), attrs, entry.class)
    }
}

fn dedup_key(tag: &str, attributes: &Attributes, discriminate: bool) -> String {
    if !discriminate {
        return tag.to_string();
    }
    let mut pairs: Vec<(&String, &String)> = attributes.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    let mut key = tag.to_string();
    for (k, v) in pairs {
        key.push('|');
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key
}

/// Collapse every formatting subtree inside every text-tag element of the
/// subtree rooted at `id` into placeholder-bearing text. Non-formatting
/// children inside a text tag are left as ordinary structural children
/// (recursed into for nested text tags) rather than folded into the
/// placeholder stream — this crate's rich-text model is scoped to the
/// "inline formatting only" content the specification's worked examples
/// exercise (see DESIGN.md).
pub fn encode(tree: &mut Tree, id: NodeId, codec: &mut PlaceholderCodec, config: &CodecConfig) {
    if config.is_text_tag(tree.tag(id)) {
        encode_text_node(tree, id, codec, config);
    } else {
        let children: Vec<NodeId> = tree.children(id).to_vec();
        for child in children {
            encode(tree, child, codec, config);
        }
    }
}

fn encode_text_node(tree: &mut Tree, id: NodeId, codec: &mut PlaceholderCodec, config: &CodecConfig) {
    let old_children: Vec<NodeId> = tree.children(id).to_vec();
    let mut new_children: Vec<NodeId> = Vec::new();
    let mut buffer = tree.node(id).text.clone().unwrap_or_default();
    let mut last_structural: Option<NodeId> = None;

    for child in old_children {
        tree.detach(child);
        let child_tag = tree.tag(child).to_string();
        if let Some(class) = config.class_of(&child_tag) {
            let encoded = encode_formatting_element(tree, child, codec, config, class);
            buffer.push_str(&encoded);
            if let Some(tail) = tree.node(child).tail.clone() {
                buffer.push_str(&tail);
            }
        } else {
            assign_buffer(tree, id, last_structural, &mut buffer);
            encode(tree, child, codec, config);
            new_children.push(child);
            last_structural = Some(child);
        }
    }
    assign_buffer(tree, id, last_structural, &mut buffer);

    for c in new_children {
        tree.append_child(id, c);
    }
}

fn assign_buffer(tree: &mut Tree, id: NodeId, last_structural: Option<NodeId>, buffer: &mut String) {
    let text = std::mem::take(buffer);
    let slot = last_structural.unwrap_or(id);
    let node = tree.node_mut(slot);
    let field = if last_structural.is_some() { &mut node.tail } else { &mut node.text };
    *field = if text.is_empty() { None } else { Some(text) };
}

fn encode_formatting_element(
    tree: &mut Tree,
    id: NodeId,
    codec: &mut PlaceholderCodec,
    config: &CodecConfig,
    class: FormattingClass,
) -> String {
    let tag = tree.tag(id).to_string();
    let attrs = tree.node(id).attributes.clone();

    if class == FormattingClass::Single {
        let ph = codec.single_placeholder(&tag, &attrs);
        return ph.to_string();
    }

    let discriminate = class == FormattingClass::Complex;
    let (close, open) = codec.pair_placeholder(&tag, &attrs, discriminate);

    encode_text_node(tree, id, codec, config);
    let inner = tree.node(id).text.clone().unwrap_or_default();

    format!("{open}{inner}{close}")
}

/// Reverse the placeholder encoding throughout the subtree rooted at `id`,
/// expanding any placeholder-bearing `text`/`tail` into real child elements.
pub fn decode(tree: &mut Tree, id: NodeId, codec: &PlaceholderCodec) {
    if let Some(text) = tree.node(id).text.clone() {
        if text.chars().any(|c| codec.is_placeholder(c)) {
            let (leading, new_children) = decode_string(&text, codec, tree);
            tree.node_mut(id).text = leading;
            for (i, child) in new_children.into_iter().enumerate() {
                tree.insert_child(id, i, child);
            }
        }
    }

    let children: Vec<NodeId> = tree.children(id).to_vec();
    for child in children {
        decode(tree, child, codec);
    }

    if let Some(parent) = tree.parent(id) {
        if let Some(tail) = tree.node(id).tail.clone() {
            if tail.chars().any(|c| codec.is_placeholder(c)) {
                let (leading, new_children) = decode_string(&tail, codec, tree);
                tree.node_mut(id).tail = leading;
                let mut insert_at = tree.child_index(parent, id).unwrap() + 1;
                for child in new_children {
                    tree.insert_child(parent, insert_at, child);
                    insert_at += 1;
                }
            }
        }
    }
}

fn flush(buffer: &mut String, leading: &mut Option<String>, children: &[NodeId], tree: &mut Tree) {
    if buffer.is_empty() {
        return;
    }
    let text = std::mem::take(buffer);
    if let Some(&last) = children.last() {
        let node = tree.node_mut(last);
        match &mut node.tail {
            Some(existing) => existing.push_str(&text),
            None => node.tail = Some(text),
        }
    } else {
        match leading {
            Some(existing) => existing.push_str(&text),
            None => *leading = Some(text),
        }
    }
}

fn decode_string(s: &str, codec: &PlaceholderCodec, tree: &mut Tree) -> (Option<String>, Vec<NodeId>) {
    let mut chars = s.chars().peekable();
    let mut leading: Option<String> = None;
    let mut children: Vec<NodeId> = Vec::new();
    let mut buffer = String::new();

    while let Some(c) = chars.next() {
        match codec.entry(c).cloned() {
            Some(entry) if matches!(entry.kind, Kind::Single) => {
                flush(&mut buffer, &mut leading, &children, tree);
                children.push(build_element(tree, &entry));
            }
            Some(entry) if matches!(entry.kind, Kind::Open) => {
                flush(&mut buffer, &mut leading, &children, tree);
                let close_char = entry.close_ref.expect("open placeholder missing close_ref");
                let inner = take_until_matching_close(&mut chars, c, close_char);
                let child = build_element(tree, &entry);
                let (inner_text, inner_children) = decode_string(&inner, codec, tree);
                tree.node_mut(child).text = inner_text;
                for (i, gc) in inner_children.into_iter().enumerate() {
                    tree.insert_child(child, i, gc);
                }
                children.push(child);
            }
            Some(_) => {
                // an unmatched Close placeholder: malformed/truncated input, drop silently
            }
            None => buffer.push(c),
        }
    }
    flush(&mut buffer, &mut leading, &children, tree);
    (leading, children)
}

fn take_until_matching_close(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    open: char,
    close: char,
) -> String {
    let mut depth = 1;
    let mut out = String::new();
    for c in chars.by_ref() {
        if c == open {
            depth += 1;
            out.push(c);
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                break;
            }
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

fn build_element(tree: &mut Tree, entry: &PlaceholderEntry) -> NodeId {
    let id = tree.new_node(entry.tag.clone());
    tree.node_mut(id).attributes = entry.attributes.clone();
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::writer::write;

    fn html_config() -> CodecConfig {
        CodecConfig {
            text_tags: vec!["p".to_string()],
            single_formatting_tags: vec!["br".to_string()],
            dual_formatting_tags: vec!["b".to_string(), "i".to_string()],
            complex_formatting_tags: vec!["a".to_string()],
        }
    }

    #[test]
    fn builtin_diff_placeholders_allocate_close_before_open() {
        let codec = PlaceholderCodec::new();
        assert_eq!(codec.insert_close as u32, 0xE001);
        assert_eq!(codec.insert_open as u32, 0xE002);
        assert_eq!(codec.delete_close as u32, 0xE003);
        assert_eq!(codec.delete_open as u32, 0xE004);
    }

    #[test]
    fn encode_allocates_e5_e6_for_first_user_pair() {
        let mut tree = parse(b"<p>This is a tag with <b>formatted</b> text.</p>").unwrap();
        let mut codec = PlaceholderCodec::new();
        let config = html_config();
        let root = tree.root();
        encode(&mut tree, root, &mut codec, &config);

        let text = tree.node(root).text.clone().unwrap();
        let chars: Vec<char> = text.chars().collect();
        let open = chars.iter().find(|&&c| codec.entry(c).map(|e| matches!(e.kind, Kind::Open)).unwrap_or(false)).copied().unwrap();
        let close = codec.entry(open).unwrap().close_ref.unwrap();
        assert_eq!(close as u32, 0xE005);
        assert_eq!(open as u32, 0xE006);
        assert!(text.contains("formatted"));
    }

    #[test]
    fn decode_inverts_encode() {
        let original = parse(b"<p>This is a tag with <b>formatted</b> text.</p>").unwrap();
        let mut tree = original.clone();
        let mut codec = PlaceholderCodec::new();
        let config = html_config();
        let root = tree.root();
        encode(&mut tree, root, &mut codec, &config);
        decode(&mut tree, root, &codec);

        assert_eq!(write(&tree).unwrap(), write(&original).unwrap());
    }
}
