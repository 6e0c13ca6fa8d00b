//! Forest construction from a flat comment list.
//!
//! - **Single placement**: every distinct id is attached exactly once, either
//!   under its parent or as a root
//! - **Root fallback**: missing parents, unrecoverable references, and would-be
//!   cycles all demote the comment to a root instead of dropping it
//! - **Opaque ids**: a parent reference naming an input id verbatim attaches
//!   there, even when the text would not pass as a clean identifier
//! - **Bounded**: the ancestor walk never takes more steps than there are
//!   records, whatever the input looks like

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::arena::Arena;
use crate::node::ThreadNode;
use crate::normalize::Normalizer;
use crate::record::{CommentRecord, ParentRef};
use crate::report::{BuildReport, Demotion, DemotionReason};

/// Where a comment goes in the forest.
enum Placement {
    Root,
    Child(usize),
    Demoted(DemotionReason),
}

/// Builds the forest with the default normalizer. Returns roots in input
/// order; see [`crate::order_and_count`] for display order.
pub fn build(records: Vec<CommentRecord>) -> Vec<ThreadNode> {
    build_with_report(records, Normalizer::shared()).0
}

/// Builds the forest and reports every repair made along the way.
pub fn build_with_report(
    records: Vec<CommentRecord>,
    normalizer: &Normalizer,
) -> (Vec<ThreadNode>, BuildReport) {
    let mut report = BuildReport::default();
    let mut arena = Arena::with_capacity(records.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());

    for record in records {
        if index.contains_key(&record.id) {
            debug!(id = %record.id, "dropping comment with duplicate id");
            report.duplicates.push(record.id);
            continue;
        }

        let id = record.id.clone();
        let idx = arena.push(record);
        index.insert(id, idx);
    }

    // Per slot: canonical parent id, and the declared text (if any).
    let mut parents: Vec<Option<String>> = Vec::with_capacity(arena.len());
    let mut declared: Vec<Option<String>> = Vec::with_capacity(arena.len());

    for idx in 0..arena.len() {
        let record = arena.record_mut(idx);
        let parent = resolve_parent(normalizer, &index, &record.parent_ref);
        declared.push(record.parent_ref.declared().map(ToString::to_string));
        record.parent_ref = ParentRef::from(parent.clone());
        parents.push(parent);
    }

    // links[i] is the slot i was attached under.
    let mut links: Vec<Option<usize>> = vec![None; arena.len()];
    let mut roots = Vec::new();

    for child in 0..arena.len() {
        let placement = match parents[child].as_deref() {
            None if declared[child].is_some() => {
                Placement::Demoted(DemotionReason::UnrecoverableReference)
            }
            None => Placement::Root,
            Some(parent_id) => match index.get(parent_id) {
                None => Placement::Demoted(DemotionReason::MissingParent),
                Some(&parent) if is_ancestor_or_self(&links, child, parent) => {
                    Placement::Demoted(DemotionReason::Cycle)
                }
                Some(&parent) => Placement::Child(parent),
            },
        };

        match placement {
            Placement::Child(parent) => {
                arena.attach(parent, child);
                links[child] = Some(parent);
            }
            Placement::Root => roots.push(child),
            Placement::Demoted(reason) => {
                let id = &arena.record(child).id;
                let declared_parent = declared[child].clone().unwrap_or_default();
                debug!(%id, parent = %declared_parent, %reason, "threading comment as root");
                report.demotions.push(Demotion {
                    id: id.clone(),
                    reason,
                    declared_parent,
                });
                roots.push(child);
            }
        }
    }

    let cycles = report.count(DemotionReason::Cycle);
    if cycles > 0 {
        warn!(cycles, "comment parent references form cycles");
    }
    if report.is_clean() {
        debug!(slots = arena.len(), roots = roots.len(), "built comment forest");
    } else {
        info!(
            slots = arena.len(),
            roots = roots.len(),
            demoted = report.demotions.len(),
            duplicates = report.duplicates.len(),
            "built comment forest with repairs"
        );
    }

    (arena.assemble(&roots), report)
}

/// Exact id match first, then pattern recovery.
fn resolve_parent(
    normalizer: &Normalizer,
    index: &HashMap<String, usize>,
    parent: &ParentRef,
) -> Option<String> {
    match parent {
        ParentRef::Malformed(text) if index.contains_key(text) => Some(text.clone()),
        other => normalizer.resolve(other),
    }
}

/// Walks up from `start` through attached parents looking for `candidate`.
///
/// Gives up after `links.len()` steps and answers `true`: a chain that long
/// can only come from corrupted links, and refusing the attachment is the
/// safe side.
fn is_ancestor_or_self(links: &[Option<usize>], candidate: usize, start: usize) -> bool {
    let mut cursor = Some(start);
    for _ in 0..=links.len() {
        match cursor {
            None => return false,
            Some(node) if node == candidate => return true,
            Some(node) => cursor = links[node],
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::node::preorder;
    use crate::record::{RawComment, Timestamp};

    fn comment(id: &str, parent: Option<&str>, t: i64) -> CommentRecord {
        let parent_ref = match parent {
            Some(p) => Normalizer::shared().classify(&json!(p)),
            None => ParentRef::None,
        };
        CommentRecord::new(id, parent_ref, Timestamp::from_millis(t))
    }

    fn ids(nodes: &[ThreadNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` under a thread-local subscriber and returns what it logged at
    /// info and above.
    fn capture_info_logs(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_empty_input() {
        let (forest, report) = build_with_report(Vec::new(), Normalizer::shared());
        assert!(forest.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_parent_child_relationship() {
        let forest = build(vec![comment("A", None, 1), comment("B", Some("A"), 2)]);

        assert_eq!(ids(&forest), vec!["A"]);
        assert_eq!(ids(&forest[0].children), vec!["B"]);
        assert_eq!(forest[0].descendant_count, 1);
        assert_eq!(
            forest[0].children[0].record.parent_ref,
            ParentRef::Id("A".into())
        );
    }

    #[test]
    fn test_child_before_parent_in_input() {
        let forest = build(vec![comment("B", Some("A"), 2), comment("A", None, 1)]);

        assert_eq!(ids(&forest), vec!["A"]);
        assert_eq!(ids(&forest[0].children), vec!["B"]);
    }

    #[test]
    fn test_missing_parent_becomes_root() {
        let (forest, report) = build_with_report(
            vec![comment("A", None, 1), comment("B", Some("X"), 2)],
            Normalizer::shared(),
        );

        assert_eq!(ids(&forest), vec!["A", "B"]);
        // The canonical parent is kept even though it did not resolve.
        assert_eq!(forest[1].record.parent_ref, ParentRef::Id("X".into()));
        assert_eq!(
            report.demotions,
            vec![Demotion {
                id: "B".into(),
                reason: DemotionReason::MissingParent,
                declared_parent: "X".into(),
            }]
        );
    }

    #[test]
    fn test_constructor_wrapped_parent_is_recovered() {
        let forest = build(vec![
            comment("c1", None, 1),
            comment("c2", Some("ObjectId(\"c1\")"), 2),
        ]);

        assert_eq!(ids(&forest), vec!["c1"]);
        assert_eq!(ids(&forest[0].children), vec!["c2"]);
        assert_eq!(
            forest[0].children[0].record.parent_ref,
            ParentRef::Id("c1".into())
        );
    }

    #[test]
    fn test_garbage_parent_becomes_root_without_side_effects() {
        let (forest, report) = build_with_report(
            vec![
                comment("c1", None, 1),
                comment("c4", Some("c1"), 2),
                comment("c5", Some("<<%% garbage %%>>"), 3),
            ],
            Normalizer::shared(),
        );

        assert_eq!(ids(&forest), vec!["c1", "c5"]);
        assert_eq!(ids(&forest[0].children), vec!["c4"]);
        assert_eq!(forest[1].record.parent_ref, ParentRef::None);
        assert_eq!(report.demotions.len(), 1);
        assert_eq!(
            report.demotions[0].reason,
            DemotionReason::UnrecoverableReference
        );
        assert_eq!(report.demotions[0].declared_parent, "<<%% garbage %%>>");
    }

    #[test]
    fn test_parent_id_with_space_attaches_when_present() {
        let normalizer = Normalizer::shared();
        let records = [
            json!({"id": "comment 1", "t": 1}),
            json!({"id": "reply", "parent": "comment 1", "t": 2}),
            json!({"id": "stray", "parent": "comment 2", "t": 3}),
        ]
        .into_iter()
        .map(|value| normalizer.ingest(serde_json::from_value::<RawComment>(value).unwrap()))
        .collect();

        let (forest, report) = build_with_report(records, normalizer);

        assert_eq!(ids(&forest), vec!["comment 1", "stray"]);
        assert_eq!(ids(&forest[0].children), vec!["reply"]);
        assert_eq!(
            forest[0].children[0].record.parent_ref,
            ParentRef::Id("comment 1".into())
        );
        assert_eq!(
            report.demotions,
            vec![Demotion {
                id: "stray".into(),
                reason: DemotionReason::UnrecoverableReference,
                declared_parent: "comment 2".into(),
            }]
        );
    }

    #[test]
    fn test_repairs_emit_info_summary() {
        let clean = capture_info_logs(|| {
            build(vec![comment("A", None, 1), comment("B", Some("A"), 2)]);
        });
        assert!(!clean.contains("repairs"), "unexpected summary: {clean}");

        let repaired = capture_info_logs(|| {
            build(vec![comment("A", None, 1), comment("A", None, 2), comment("B", Some("X"), 3)]);
        });
        assert!(repaired.contains("built comment forest with repairs"), "logs: {repaired}");
        assert!(repaired.contains("demoted=1"), "logs: {repaired}");
        assert!(repaired.contains("duplicates=1"), "logs: {repaired}");
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let (forest, report) = build_with_report(
            vec![
                comment("c9", None, 1),
                comment("c9", Some("c1"), 2),
                comment("c1", None, 3),
            ],
            Normalizer::shared(),
        );

        assert_eq!(ids(&forest), vec!["c9", "c1"]);
        assert_eq!(forest[0].created_at(), Timestamp::from_millis(1));
        assert!(forest[1].children.is_empty());
        assert_eq!(report.duplicates, vec!["c9".to_string()]);
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let (forest, report) = build_with_report(
            vec![comment("A", Some("B"), 1), comment("B", Some("A"), 2)],
            Normalizer::shared(),
        );

        // A attaches under B first; B's link back to A is refused.
        assert_eq!(ids(&forest), vec!["B"]);
        assert_eq!(ids(&forest[0].children), vec!["A"]);
        assert_eq!(report.count(DemotionReason::Cycle), 1);
        assert_eq!(report.demotions[0].id, "B");
    }

    #[test]
    fn test_self_reference_becomes_root() {
        let (forest, report) =
            build_with_report(vec![comment("A", Some("A"), 1)], Normalizer::shared());

        assert_eq!(ids(&forest), vec!["A"]);
        assert!(forest[0].children.is_empty());
        assert_eq!(report.count(DemotionReason::Cycle), 1);
    }

    #[test]
    fn test_long_cycle_terminates() {
        // n0 -> n1 -> ... -> n99 -> n0
        let n = 100;
        let records: Vec<CommentRecord> = (0..n)
            .map(|i| comment(&format!("n{i}"), Some(&format!("n{}", (i + 1) % n)), i))
            .collect();

        let forest = build(records);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].descendant_count, n as usize - 1);
    }

    #[test]
    fn test_is_ancestor_or_self_is_bounded_on_corrupt_links() {
        // 0 -> 1 -> 0, which the builder never produces.
        let links = vec![Some(1), Some(0), None];
        assert!(is_ancestor_or_self(&links, 2, 0));
        assert!(!is_ancestor_or_self(&links, 0, 2));
    }

    /// Small deterministic generator so failures reproduce.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (self.0 >> 33) % bound
        }
    }

    fn random_records(rng: &mut Lcg, n: u64) -> Vec<CommentRecord> {
        (0..n)
            .map(|i| {
                let id = format!("c{}", rng.next(n + 2));
                let parent = match rng.next(6) {
                    0 => None,
                    1 => Some("garbage text".to_string()),
                    2 => Some(format!("ObjectId(\"c{}\")", rng.next(n + 2))),
                    _ => Some(format!("c{}", rng.next(n + 2))),
                };
                comment(&id, parent.as_deref(), rng.next(20) as i64 + i as i64)
            })
            .collect()
    }

    #[test]
    fn test_random_inputs_hold_forest_invariants() {
        let mut rng = Lcg(7);
        for round in 0..300 {
            let n = rng.next(40) + 1;
            let records = random_records(&mut rng, n);
            let distinct: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();

            let forest = build(records);

            let mut seen = HashSet::new();
            for (node, _) in preorder(&forest) {
                assert!(seen.insert(node.id.clone()), "round {round}: duplicate {}", node.id);
                assert_eq!(
                    node.descendant_count,
                    node.children.len()
                        + node.children.iter().map(|c| c.descendant_count).sum::<usize>(),
                    "round {round}: bad count on {}",
                    node.id
                );
                for child in &node.children {
                    assert_eq!(
                        child.record.parent_ref.as_id(),
                        Some(node.id.as_str()),
                        "round {round}: {} misplaced under {}",
                        child.id,
                        node.id
                    );
                }
            }
            assert_eq!(seen, distinct, "round {round}: lost or invented nodes");
        }
    }

    #[test]
    fn test_resolvable_parents_are_honored_when_acyclic() {
        let mut rng = Lcg(99);
        for _ in 0..200 {
            let n = rng.next(30) + 1;
            // Parents always point at earlier ids, so no cycles are possible.
            let records: Vec<CommentRecord> = (0..n)
                .map(|i| {
                    let parent = (i > 0 && rng.next(3) > 0).then(|| format!("c{}", rng.next(i)));
                    comment(&format!("c{i}"), parent.as_deref(), i as i64)
                })
                .collect();
            let expected: HashMap<String, Option<String>> = records
                .iter()
                .map(|r| (r.id.clone(), r.parent_ref.as_id().map(ToString::to_string)))
                .collect();

            let forest = build(records);

            for root in &forest {
                assert_eq!(expected[&root.id], None);
            }
            for (node, _) in preorder(&forest) {
                for child in &node.children {
                    assert_eq!(expected[&child.id].as_deref(), Some(node.id.as_str()));
                }
            }
        }
    }
}
