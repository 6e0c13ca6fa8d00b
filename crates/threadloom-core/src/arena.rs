//! Index-based staging area for forest construction.
//!
//! Nodes live in a flat `Vec` and refer to their children by index, so
//! building, reordering, and counting never recurse on tree depth.

use crate::node::ThreadNode;
use crate::record::CommentRecord;

struct Slot {
    record: CommentRecord,
    children: Vec<usize>,
}

pub(crate) struct Arena {
    slots: Vec<Slot>,
}

impl Arena {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn push(&mut self, record: CommentRecord) -> usize {
        self.slots.push(Slot {
            record,
            children: Vec::new(),
        });
        self.slots.len() - 1
    }

    pub(crate) fn record(&self, idx: usize) -> &CommentRecord {
        &self.slots[idx].record
    }

    pub(crate) fn record_mut(&mut self, idx: usize) -> &mut CommentRecord {
        &mut self.slots[idx].record
    }

    pub(crate) fn attach(&mut self, parent: usize, child: usize) {
        self.slots[parent].children.push(child);
    }

    /// Applies `order` to every child list.
    pub(crate) fn sort_children_by<F>(&mut self, mut order: F)
    where
        F: FnMut(&CommentRecord, &CommentRecord) -> std::cmp::Ordering,
    {
        for idx in 0..self.slots.len() {
            let mut children = std::mem::take(&mut self.slots[idx].children);
            children.sort_by(|&a, &b| order(&self.slots[a].record, &self.slots[b].record));
            self.slots[idx].children = children;
        }
    }

    /// Takes an owned forest apart, preserving child order.
    pub(crate) fn disassemble(forest: Vec<ThreadNode>) -> (Self, Vec<usize>) {
        let mut arena = Self::with_capacity(forest.len());
        let mut roots = Vec::with_capacity(forest.len());
        let mut stack: Vec<(ThreadNode, Option<usize>)> =
            forest.into_iter().rev().map(|node| (node, None)).collect();

        while let Some((mut node, parent)) = stack.pop() {
            let children = std::mem::take(&mut node.children);
            let idx = arena.push(node.record);
            match parent {
                Some(parent) => arena.attach(parent, idx),
                None => roots.push(idx),
            }
            stack.extend(children.into_iter().rev().map(|child| (child, Some(idx))));
        }

        (arena, roots)
    }

    /// Materializes the subtrees under `roots`, in the given order, filling in
    /// descendant counts bottom-up.
    ///
    /// Slots unreachable from `roots` are discarded.
    pub(crate) fn assemble(self, roots: &[usize]) -> Vec<ThreadNode> {
        let mut seen = vec![false; self.slots.len()];
        let mut order = Vec::with_capacity(self.slots.len());
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            if std::mem::replace(&mut seen[idx], true) {
                continue;
            }
            order.push(idx);
            stack.extend(self.slots[idx].children.iter().rev().copied());
        }

        // Pre-order reversed puts every child before its parent.
        let mut built: Vec<Option<ThreadNode>> = Vec::new();
        built.resize_with(self.slots.len(), || None);
        let mut slots: Vec<Option<Slot>> = self.slots.into_iter().map(Some).collect();

        for &idx in order.iter().rev() {
            let Some(slot) = slots[idx].take() else {
                continue;
            };
            let children: Vec<ThreadNode> = slot
                .children
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            let descendant_count = children.len()
                + children
                    .iter()
                    .map(|child| child.descendant_count)
                    .sum::<usize>();
            built[idx] = Some(ThreadNode {
                id: slot.record.id.clone(),
                record: slot.record,
                children,
                descendant_count,
            });
        }

        roots.iter().filter_map(|&idx| built[idx].take()).collect()
    }
}
