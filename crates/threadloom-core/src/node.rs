//! Output nodes of a comment forest.

use serde::Serialize;

use crate::record::{CommentRecord, Timestamp};

/// One comment with its ordered replies.
///
/// Owned exclusively by the forest it was built into; rebuilt on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadNode {
    pub id: String,
    /// The ingested record, with its parent reference in canonical form.
    pub record: CommentRecord,
    pub children: Vec<ThreadNode>,
    /// Nodes beneath this one at any depth, not counting itself.
    pub descendant_count: usize,
}

impl ThreadNode {
    pub fn leaf(record: CommentRecord) -> Self {
        Self {
            id: record.id.clone(),
            record,
            children: Vec::new(),
            descendant_count: 0,
        }
    }

    pub fn created_at(&self) -> Timestamp {
        self.record.created_at
    }

    /// The "N replies" label value, independent of collapse state.
    pub fn reply_count(&self) -> usize {
        self.descendant_count
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Depth-first pre-order walk over a forest, yielding `(node, depth)`.
pub struct Preorder<'a> {
    stack: Vec<(&'a ThreadNode, usize)>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = (&'a ThreadNode, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        Some((node, depth))
    }
}

pub fn preorder(forest: &[ThreadNode]) -> Preorder<'_> {
    Preorder {
        stack: forest.iter().rev().map(|root| (root, 0)).collect(),
    }
}

/// Total number of nodes in the forest.
pub fn forest_size(forest: &[ThreadNode]) -> usize {
    preorder(forest).count()
}
