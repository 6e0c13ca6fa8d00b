//! Display ordering and descendant counts.
//!
//! Roots are newest first so fresh discussions surface at the top; replies at
//! every depth are oldest first so conversations read chronologically. Equal
//! timestamps fall back to id ascending in both directions.

use std::cmp::Ordering;

use crate::arena::Arena;
use crate::node::ThreadNode;
use crate::record::CommentRecord;

fn oldest_first(a: &CommentRecord, b: &CommentRecord) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

fn newest_first(a: &CommentRecord, b: &CommentRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Orders the forest for display and recomputes every `descendant_count`.
///
/// Consumes `roots`; the result shares nothing with the caller. Runs in
/// O(n log n) for the sorts and a single post-order pass for the counts.
pub fn order_and_count(roots: Vec<ThreadNode>) -> Vec<ThreadNode> {
    let (mut arena, mut root_slots) = Arena::disassemble(roots);
    root_slots.sort_by(|&a, &b| newest_first(arena.record(a), arena.record(b)));
    arena.sort_children_by(oldest_first);
    arena.assemble(&root_slots)
}
