//! Threadloom core: rebuilds threaded comment forests from flat comment lists.
//!
//! One synchronous pass per fetch: normalize parent references, build the
//! forest, then order it for display and count descendants.
//!
//! ```text
//! RawComment ─ingest→ CommentRecord ─build→ roots ─order_and_count→ forest
//! ```

mod arena;
pub mod build;
pub mod config;
pub mod logging;
pub mod node;
pub mod normalize;
pub mod order;
pub mod record;
pub mod report;
pub mod view;

pub use build::{build, build_with_report};
pub use node::{ThreadNode, forest_size, preorder};
pub use normalize::{Normalizer, normalize};
pub use order::order_and_count;
pub use record::{CommentRecord, ParentRef, Payload, RawComment, Timestamp};
pub use report::{BuildReport, Demotion, DemotionReason, demoted_ids};
pub use view::{ExpansionState, ThreadRow, flatten_visible};

/// Builds and orders a forest with the default normalizer.
pub fn thread(records: Vec<CommentRecord>) -> Vec<ThreadNode> {
    order_and_count(build(records))
}

/// Builds and orders a forest, returning the repairs the builder made.
pub fn thread_with_report(
    records: Vec<CommentRecord>,
    normalizer: &Normalizer,
) -> (Vec<ThreadNode>, BuildReport) {
    let (roots, report) = build_with_report(records, normalizer);
    (order_and_count(roots), report)
}
