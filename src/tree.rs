//! Arena-backed tree model.
//!
//! Nodes live in a flat `Vec<Node>` and are addressed by [`NodeId`], a small
//! `Copy` handle, instead of owned recursive values or `Rc<RefCell<_>>`
//! pointers. This gives O(1) parent lookup and makes node moves a pointer-free
//! splice of a `Vec<NodeId>`, which the matcher and edit-script generator both
//! lean on heavily. `Tree` derives `Clone`; cloning duplicates the backing
//! `Vec<Node>` index-for-index, so `NodeId`s remain valid against the clone —
//! this is how "copy the left tree" is realized.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// A handle to a node inside a [`Tree`]'s arena. Only meaningful relative to
/// the `Tree` that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

/// Ordered attribute map; insertion order is preserved for serialization.
pub type Attributes = IndexMap<String, String>;

/// A single tree node: tag, attributes, leading text, trailing tail text, and
/// an ordered list of children.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: String,
    pub attributes: Attributes,
    pub text: Option<String>,
    pub tail: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Attributes::new(),
            text: None,
            tail: None,
            children: Vec::new(),
            parent: None,
        }
    }
}

/// An arena of [`Node`]s rooted at a single element.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// Build a tree containing a single root node with the given tag.
    pub fn with_root(tag: impl Into<String>) -> Self {
        let root = Node::new(tag);
        Tree {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tag
    }

    /// Allocate a new, detached (parentless, childless) node.
    pub fn new_node(&mut self, tag: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(tag));
        id
    }

    /// Position of `child` within `parent`'s child list, if it is there.
    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent.0].children.iter().position(|&c| c == child)
    }

    /// Insert `child` into `parent`'s children at `index`, reparenting it.
    /// `index` is clamped to the current length.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let len = self.nodes[parent.0].children.len();
        let index = index.min(len);
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Append `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.nodes[parent.0].children.len();
        self.insert_child(parent, index, child);
    }

    /// Remove `child` from its current parent, if any, leaving it detached.
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.0].parent {
            self.nodes[parent.0].children.retain(|&c| c != child);
        }
        self.nodes[child.0].parent = None;
    }

    /// Recursively clone the subtree rooted at `id` into fresh arena slots of
    /// this same tree, returning the new (detached) root of the copy.
    pub fn deep_copy_into(&mut self, id: NodeId) -> NodeId {
        let tag = self.nodes[id.0].tag.clone();
        let attributes = self.nodes[id.0].attributes.clone();
        let text = self.nodes[id.0].text.clone();
        let tail = self.nodes[id.0].tail.clone();
        let child_ids: Vec<NodeId> = self.nodes[id.0].children.clone();

        let copy = self.new_node(tag);
        {
            let n = &mut self.nodes[copy.0];
            n.attributes = attributes;
            n.text = text;
            n.tail = tail;
        }
        for child in child_ids {
            let child_copy = self.deep_copy_into(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Pre-order traversal starting at `id` (inclusive).
    pub fn pre_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.pre_order_into(id, &mut out);
        out
    }

    fn pre_order_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &child in self.children(id) {
            self.pre_order_into(child, out);
        }
    }

    /// Post-order traversal starting at `id` (inclusive, `id` last).
    pub fn post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.post_order_into(id, &mut out);
        out
    }

    fn post_order_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            self.post_order_into(child, out);
        }
        out.push(id);
    }

    /// Reverse post-order traversal: each node's children in reverse order,
    /// then the node itself is appended before recursing into later siblings
    /// — equivalently, post-order with every sibling group reversed, overall
    /// list then reversed. Used by the delete pass so deletions never
    /// invalidate not-yet-visited siblings' positions.
    pub fn reverse_post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = self.post_order(id);
        out.reverse();
        out
    }

    /// Breadth-first traversal starting at `id` (inclusive).
    pub fn breadth_first(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(id);
        while let Some(n) = queue.pop_front() {
            out.push(n);
            for &child in self.children(n) {
                queue.push_back(child);
            }
        }
        out
    }

    /// 1-based position of `id` among its parent's same-tag siblings.
    fn tag_position(&self, id: NodeId) -> usize {
        let parent = match self.parent(id) {
            Some(p) => p,
            None => return 1,
        };
        let tag = &self.nodes[id.0].tag;
        let mut count = 0;
        for &sib in self.children(parent) {
            if self.nodes[sib.0].tag == *tag {
                count += 1;
            }
            if sib == id {
                return count;
            }
        }
        count
    }

    /// Canonical XPath to `id`, following `lxml.getpath` bracket-omission
    /// semantics: a step carries an explicit `[k]` predicate only when the
    /// node is not the unique same-tag child of its parent, except the path's
    /// own final (addressed) step, which always carries one (defaulting to
    /// `[1]`). See SPEC_FULL.md §3 for why this departs from a naive "always
    /// bracket every step" reading.
    pub fn xpath(&self, id: NodeId) -> String {
        let mut segments: Vec<(String, Option<usize>)> = Vec::new();
        let mut cur = id;
        loop {
            let tag = self.nodes[cur.0].tag.clone();
            match self.parent(cur) {
                None => {
                    segments.push((tag, None));
                    break;
                }
                Some(p) => {
                    let same_tag_siblings = self.children(p).iter().filter(|&&s| self.nodes[s.0].tag == tag).count();
                    let pos = if same_tag_siblings > 1 {
                        Some(self.tag_position(cur))
                    } else {
                        None
                    };
                    segments.push((tag, pos));
                    cur = p;
                }
            }
        }
        segments.reverse();
        if let Some(last) = segments.last_mut() {
            if last.1.is_none() {
                last.1 = Some(1);
            }
        }

        let mut out = String::new();
        for (tag, pos) in segments {
            out.push('/');
            out.push_str(&tag);
            if let Some(p) = pos {
                out.push('[');
                out.push_str(&p.to_string());
                out.push(']');
            }
        }
        out
    }

    /// Canonical serialization of the subtree rooted at `id`, used as the
    /// placeholder-dedup key (attribute order normalized, since placeholder
    /// identity must not depend on source attribute-writing order... actually
    /// attribute *insertion* order is preserved deliberately, matching how
    /// the source document wrote them, since two elements written the same
    /// way should intern to the same placeholder).
    pub fn canonical_form(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.canonical_form_into(id, &mut out);
        out
    }

    fn canonical_form_into(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        out.push('<');
        out.push_str(&node.tag);
        for (k, v) in &node.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(v);
            out.push('"');
        }
        if node.children.is_empty() && node.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(t) = &node.text {
            out.push_str(t);
        }
        for &child in &node.children {
            self.canonical_form_into(child, out);
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }

    /// Structural equality ignoring [`NodeId`] identity: same tag, attributes,
    /// text, tail, and recursively equal children in order.
    pub fn structurally_equal(&self, a: NodeId, b: NodeId, other: &Tree) -> bool {
        let na = &self.nodes[a.0];
        let nb = &other.nodes[b.0];
        if na.tag != nb.tag || na.attributes != nb.attributes || na.text != nb.text || na.tail != nb.tail {
            return false;
        }
        if na.children.len() != nb.children.len() {
            return false;
        }
        na.children
            .iter()
            .zip(nb.children.iter())
            .all(|(&ca, &cb)| self.structurally_equal(ca, cb, other))
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_form(self.root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tree: &mut Tree, parent: NodeId, tag: &str, text: Option<&str>) -> NodeId {
        let id = tree.new_node(tag);
        if let Some(t) = text {
            tree.node_mut(id).text = Some(t.to_string());
        }
        tree.append_child(parent, id);
        id
    }

    #[test]
    fn xpath_omits_bracket_for_unique_middle_steps() {
        let mut tree = Tree::with_root("document");
        let root = tree.root();
        let story = tree.new_node("story");
        tree.append_child(root, story);
        let section1 = tree.new_node("section");
        tree.append_child(story, section1);
        let section2 = tree.new_node("section");
        tree.append_child(story, section2);
        let para = leaf(&mut tree, section1, "para", Some("First"));

        assert_eq!(tree.xpath(story), "/document/story");
        assert_eq!(tree.xpath(section1), "/document/story/section[1]");
        assert_eq!(tree.xpath(para), "/document/story/section[1]/para[1]");
    }

    #[test]
    fn xpath_forces_bracket_on_final_unique_step() {
        let mut tree = Tree::with_root("document");
        let root = tree.root();
        let story = tree.new_node("story");
        tree.append_child(root, story);
        let ul = tree.new_node("ul");
        tree.append_child(story, ul);

        assert_eq!(tree.xpath(ul), "/document/story/ul[1]");
    }

    #[test]
    fn deep_copy_duplicates_subtree() {
        let mut tree = Tree::with_root("root");
        let root = tree.root();
        let child = leaf(&mut tree, root, "child", Some("hi"));
        let copy = tree.deep_copy_into(child);
        assert_ne!(copy, child);
        assert_eq!(tree.node(copy).tag, "child");
        assert_eq!(tree.node(copy).text.as_deref(), Some("hi"));
        assert!(tree.parent(copy).is_none());
    }

    #[test]
    fn detach_and_insert_moves_node() {
        let mut tree = Tree::with_root("root");
        let root = tree.root();
        let a = tree.new_node("a");
        let b = tree.new_node("b");
        tree.append_child(root, a);
        tree.append_child(root, b);
        let leaf_node = leaf(&mut tree, a, "leaf", None);

        tree.insert_child(b, 0, leaf_node);
        assert_eq!(tree.children(a), &[] as &[NodeId]);
        assert_eq!(tree.children(b), &[leaf_node]);
        assert_eq!(tree.parent(leaf_node), Some(b));
    }
}
