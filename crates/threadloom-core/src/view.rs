//! Depth-first flattening of a comment forest for display.
//!
//! ## Design
//!
//! - **Source of truth**: the forest returned by [`crate::thread`]
//! - **Expansion is external**: collapse state is an id -> bool map kept next
//!   to the forest, never inside it, so it survives rebuilds
//! - **Default policy**: roots expanded, nested replies collapsed

use std::collections::{HashMap, HashSet};

use crate::node::{ThreadNode, preorder};

/// Expand/collapse state keyed by comment id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    overrides: HashMap<String, bool>,
    expand_all: bool,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything expanded unless overridden.
    pub fn expand_all() -> Self {
        Self {
            overrides: HashMap::new(),
            expand_all: true,
        }
    }

    pub fn is_expanded(&self, id: &str, depth: usize) -> bool {
        self.overrides
            .get(id)
            .copied()
            .unwrap_or(self.expand_all || depth == 0)
    }

    pub fn set(&mut self, id: impl Into<String>, expanded: bool) {
        self.overrides.insert(id.into(), expanded);
    }

    /// Flips the node's state and returns the new value.
    pub fn toggle(&mut self, id: &str, depth: usize) -> bool {
        let expanded = !self.is_expanded(id, depth);
        self.set(id, expanded);
        expanded
    }

    /// Forgets overrides for ids that are no longer in `forest`.
    pub fn retain_known(&mut self, forest: &[ThreadNode]) {
        let known: HashSet<&str> = preorder(forest).map(|(n, _)| n.id.as_str()).collect();
        self.overrides.retain(|id, _| known.contains(id.as_str()));
    }
}

/// A node prepared for display.
#[derive(Debug, Clone)]
pub struct ThreadRow<'a> {
    pub node: &'a ThreadNode,
    /// Nesting depth (0 = root, 1 = reply to root, etc.).
    pub depth: usize,
    /// Whether this node's replies are shown. Always false for leaves.
    pub expanded: bool,
}

/// Transforms a forest into the rows currently visible.
///
/// Children appear immediately after their parent, indented by depth, and
/// only when the parent is expanded. Forest order is preserved.
///
/// # Example
///
/// Given the forest:
/// - A (root)
///   - B
///     - D
///   - E
/// - C (root)
///
/// With the default policy the output is A (0), B (1), E (1), C (0): B is
/// collapsed so D is hidden.
pub fn flatten_visible<'a>(forest: &'a [ThreadNode], state: &ExpansionState) -> Vec<ThreadRow<'a>> {
    let mut rows = Vec::with_capacity(forest.len());
    let mut stack: Vec<(&ThreadNode, usize)> = forest.iter().rev().map(|n| (n, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        let expanded = !node.is_leaf() && state.is_expanded(&node.id, depth);
        rows.push(ThreadRow {
            node,
            depth,
            expanded,
        });
        if expanded {
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
    }

    rows
}
