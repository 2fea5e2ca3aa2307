//! XML markup formatter (C8): replays an [`Action`] edit script against a
//! copy of the left tree, annotating every change in place under the `diff:*`
//! marker namespace instead of producing a bare merged tree.
//!
//! Grounded on `examples/original_source/src/markdowndiff/formatting.py`
//! (`XMLFormatter`, `_xpath`, `handle_action`).

use crate::actions::Action;
use crate::error::DiffError;
use crate::placeholder::PlaceholderCodec;
use crate::richtext::diff_rich_text;
use crate::tree::{NodeId, Tree};

const DELETE: &str = "diff:delete";
const INSERT: &str = "diff:insert";
const MOVE: &str = "diff:move";
const RENAME: &str = "diff:rename";
const ADD_ATTR: &str = "diff:add-attr";
const DELETE_ATTR: &str = "diff:delete-attr";
const UPDATE_ATTR: &str = "diff:update-attr";

/// Apply `actions` to a copy of `left`, returning the annotated tree. Inline
/// text changes are run through the rich-text renderer, which may allocate
/// further placeholders on `codec`; callers decode the full result afterward
/// (e.g. `placeholder::decode(&mut annotated, annotated.root(), &codec)`) to
/// expand every placeholder, pre-existing and newly derived, in one pass.
pub fn format(left: &Tree, actions: &[Action], codec: &mut PlaceholderCodec) -> Result<Tree, DiffError> {
    let mut tree = left.clone();
    for action in actions {
        apply(&mut tree, action, codec)?;
    }
    Ok(tree)
}

fn apply(tree: &mut Tree, action: &Action, codec: &mut PlaceholderCodec) -> Result<(), DiffError> {
    match action {
        Action::InsertNode { target, tag, position } => {
            let parent = resolve_xpath(tree, target)?;
            let child = tree.new_node(tag.clone());
            tree.node_mut(child).attributes.insert(INSERT.to_string(), "true".to_string());
            let phys = physical_position(tree, parent, *position);
            tree.insert_child(parent, phys, child);
        }
        Action::DeleteNode { target } => {
            let node = resolve_xpath(tree, target)?;
            tree.node_mut(node).attributes.insert(DELETE.to_string(), "true".to_string());
        }
        Action::MoveNode { node, target, position } => {
            let source = resolve_xpath(tree, node)?;
            tree.node_mut(source).attributes.insert(DELETE.to_string(), "true".to_string());
            tree.node_mut(source).attributes.insert(MOVE.to_string(), "true".to_string());

            let parent = resolve_xpath(tree, target)?;
            let copy = tree.deep_copy_into(source);
            tree.node_mut(copy).attributes.insert(INSERT.to_string(), "true".to_string());
            tree.node_mut(copy).attributes.insert(MOVE.to_string(), "true".to_string());
            let phys = physical_position(tree, parent, *position);
            tree.insert_child(parent, phys, copy);
        }
        Action::RenameNode { node, tag } => {
            let id = resolve_xpath(tree, node)?;
            let old_tag = tree.tag(id).to_string();
            tree.node_mut(id).attributes.insert(RENAME.to_string(), old_tag);
            tree.node_mut(id).tag = tag.clone();
        }
        Action::UpdateTextIn { target, text } => {
            let id = resolve_xpath(tree, target)?;
            update_text(tree, id, text.as_deref(), codec, false);
        }
        Action::UpdateTextAfter { target, text } => {
            let id = resolve_xpath(tree, target)?;
            update_text(tree, id, text.as_deref(), codec, true);
        }
        Action::InsertAttrib { node, name, value } => {
            let id = resolve_xpath(tree, node)?;
            tree.node_mut(id).attributes.insert(name.clone(), value.clone());
            append_marker(tree, id, ADD_ATTR, name);
        }
        Action::DeleteAttrib { node, name } => {
            let id = resolve_xpath(tree, node)?;
            tree.node_mut(id).attributes.shift_remove(name);
            append_marker(tree, id, DELETE_ATTR, name);
        }
        Action::UpdateAttrib { node, name, value } => {
            let id = resolve_xpath(tree, node)?;
            let old = tree.node(id).attributes.get(name).cloned().unwrap_or_default();
            tree.node_mut(id).attributes.insert(name.clone(), value.clone());
            append_marker(tree, id, UPDATE_ATTR, &format!("{name}:{old}"));
        }
    }
    Ok(())
}

/// A node `UpdateTextIn`/`UpdateTextAfter` targets skips the rich-text diff
/// when the node itself was purely inserted (not moved) this run — its old
/// content never existed, so there's nothing to diff against.
fn is_pure_insert(tree: &Tree, id: NodeId) -> bool {
    let attrs = &tree.node(id).attributes;
    attrs.contains_key(INSERT) && !attrs.contains_key(MOVE)
}

fn update_text(tree: &mut Tree, id: NodeId, new_text: Option<&str>, codec: &mut PlaceholderCodec, is_tail: bool) {
    let old_text = if is_tail { tree.node(id).tail.clone() } else { tree.node(id).text.clone() };

    let merged = if is_pure_insert(tree, id) {
        new_text.map(|s| s.to_string())
    } else {
        Some(diff_rich_text(old_text.as_deref().unwrap_or(""), new_text.unwrap_or(""), codec))
    };

    if is_tail {
        tree.node_mut(id).tail = merged;
    } else {
        tree.node_mut(id).text = merged;
    }
}

fn append_marker(tree: &mut Tree, id: NodeId, marker: &str, entry: &str) {
    let node = tree.node_mut(id);
    match node.attributes.get(marker) {
        Some(existing) => {
            let updated = format!("{existing};{entry}");
            node.attributes.insert(marker.to_string(), updated);
        }
        None => {
            node.attributes.insert(marker.to_string(), entry.to_string());
        }
    }
}

/// Convert a "logical" child index (`find_pos`'s position, counted among
/// non-deleted-marked children only) into the physical array index `Tree`
/// needs for `insert_child`, by skipping past deleted-marked children already
/// present from a prior pass over this tree.
fn physical_position(tree: &Tree, parent: NodeId, logical_pos: usize) -> usize {
    let mut seen = 0;
    for (i, &child) in tree.children(parent).iter().enumerate() {
        if seen == logical_pos {
            return i;
        }
        if !is_deleted(tree, child) {
            seen += 1;
        }
    }
    tree.children(parent).len()
}

fn is_deleted(tree: &Tree, id: NodeId) -> bool {
    tree.node(id).attributes.contains_key(DELETE)
}

/// Resolve a canonical XPath (as produced by [`crate::tree::Tree::xpath`])
/// against `tree`, interpreting each `name[k]` step as the `k`-th (1-based)
/// non-deleted-marked child named `name`, and a bare `name` step as that
/// child if and only if exactly one non-deleted-marked match exists.
pub fn resolve_xpath(tree: &Tree, path: &str) -> Result<NodeId, DiffError> {
    let mut steps = path.split('/').filter(|s| !s.is_empty());

    let Some(first) = steps.next() else {
        return Err(DiffError::PathNotFound(path.to_string()));
    };
    let (root_tag, _) = parse_step(first);
    if root_tag != "*" && root_tag != tree.tag(tree.root()) {
        return Err(DiffError::PathNotFound(path.to_string()));
    }
    let mut current = tree.root();

    for step in steps {
        let (name, index) = parse_step(step);
        let candidates: Vec<NodeId> = tree
            .children(current)
            .iter()
            .copied()
            .filter(|&c| !is_deleted(tree, c) && (name == "*" || tree.tag(c) == name))
            .collect();

        current = match index {
            Some(k) => {
                if k == 0 || k > candidates.len() {
                    return Err(DiffError::PathNotFound(path.to_string()));
                }
                candidates[k - 1]
            }
            None => match candidates.len() {
                0 => return Err(DiffError::PathNotFound(path.to_string())),
                1 => candidates[0],
                _ => return Err(DiffError::AmbiguousPath(path.to_string())),
            },
        };
    }

    Ok(current)
}

fn parse_step(step: &str) -> (&str, Option<usize>) {
    match step.find('[') {
        Some(open) if step.ends_with(']') => {
            let name = &step[..open];
            let idx = &step[open + 1..step.len() - 1];
            (name, idx.parse().ok())
        }
        _ => (step, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editscript::diff;
    use crate::parser::parse;
    use crate::writer::write;

    #[test]
    fn resolves_bracketed_and_bare_steps() {
        let tree = parse(b"<root><item/><item/><other/></root>").unwrap();
        let root = tree.root();
        let item2 = tree.children(root)[1];
        let other = tree.children(root)[2];

        assert_eq!(resolve_xpath(&tree, "/root/item[2]").unwrap(), item2);
        assert_eq!(resolve_xpath(&tree, "/root/other").unwrap(), other);
    }

    #[test]
    fn bare_step_with_multiple_matches_is_ambiguous() {
        let tree = parse(b"<root><item/><item/></root>").unwrap();
        assert!(matches!(resolve_xpath(&tree, "/root/item"), Err(DiffError::AmbiguousPath(_))));
    }

    #[test]
    fn unknown_step_is_path_not_found() {
        let tree = parse(b"<root><item/></root>").unwrap();
        assert!(matches!(resolve_xpath(&tree, "/root/missing"), Err(DiffError::PathNotFound(_))));
    }

    #[test]
    fn delete_marks_rather_than_removes() {
        let left = parse(b"<root><a/><b/></root>").unwrap();
        let right = parse(b"<root><a/></root>").unwrap();
        let actions = diff(&left, &right);
        let mut codec = PlaceholderCodec::new();
        let annotated = format(&left, &actions, &mut codec).unwrap();
        let root = annotated.root();
        assert_eq!(annotated.children(root).len(), 2);
        let b = annotated.children(root)[1];
        assert_eq!(annotated.node(b).attributes.get(DELETE), Some(&"true".to_string()));
    }

    #[test]
    fn insert_marks_new_node() {
        let left = parse(b"<root><a/></root>").unwrap();
        let right = parse(b"<root><a/><b/></root>").unwrap();
        let actions = diff(&left, &right);
        let mut codec = PlaceholderCodec::new();
        let annotated = format(&left, &actions, &mut codec).unwrap();
        let root = annotated.root();
        let inserted = annotated.children(root)[1];
        assert_eq!(annotated.tag(inserted), "b");
        assert_eq!(annotated.node(inserted).attributes.get(INSERT), Some(&"true".to_string()));
    }

    #[test]
    fn attribute_update_appends_marker() {
        let left = parse(br#"<root class="a"/>"#).unwrap();
        let right = parse(br#"<root class="b"/>"#).unwrap();
        let actions = diff(&left, &right);
        let mut codec = PlaceholderCodec::new();
        let annotated = format(&left, &actions, &mut codec).unwrap();
        let root = annotated.root();
        assert_eq!(annotated.node(root).attributes.get("class"), Some(&"b".to_string()));
        assert_eq!(annotated.node(root).attributes.get(UPDATE_ATTR), Some(&"class:a".to_string()));
        let _ = write(&annotated);
    }
}
