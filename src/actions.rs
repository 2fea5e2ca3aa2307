//! Edit-script actions (C7 output type).
//!
//! Grounded on `examples/original_source/src/markdowndiff/actions.py` (one
//! struct per action kind, each carrying the xpath(s) it targets) and the
//! teacher's `diff/result.rs` `DiffEntry` for the serde-tagging idiom.

use serde::Serialize;

/// One edit to apply to the left tree to produce the right tree. Every
/// variant addresses nodes by xpath string rather than [`crate::tree::NodeId`]
/// so an edit script is self-contained and serializable independent of any
/// particular in-memory tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action")]
pub enum Action {
    /// Insert a new element named `tag` as a child of `target`, at `position`.
    InsertNode { target: String, tag: String, position: usize },
    /// Delete the subtree at `target`.
    DeleteNode { target: String },
    /// Move the subtree at `node` to be a child of `target`, at `position`.
    MoveNode { node: String, target: String, position: usize },
    /// Rename the element at `node` to `tag`.
    RenameNode { node: String, tag: String },
    /// Replace `target`'s own leading text.
    UpdateTextIn { target: String, text: Option<String> },
    /// Replace `target`'s own trailing tail text.
    UpdateTextAfter { target: String, text: Option<String> },
    /// Add a new attribute `name` = `value` on `node`.
    InsertAttrib { node: String, name: String, value: String },
    /// Remove attribute `name` from `node`.
    DeleteAttrib { node: String, name: String },
    /// Change attribute `name`'s value on `node`.
    UpdateAttrib { node: String, name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_action_tag() {
        let action = Action::DeleteNode { target: "/root/item[1]".to_string() };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"action":"DeleteNode","target":"/root/item[1]"}"#);
    }
}
