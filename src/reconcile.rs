// src/reconcile.rs
//
// Collapse every candidate label emitted for one key into a single value.
//
// FirstSeen is deterministic within a run but depends on the order in which
// map outputs were delivered; in practice all candidates for a key agree.
// SmallestLabel gives the same answer regardless of delivery order.

use crate::job_conf::ReconcilePolicy;

#[path = "reconcile_test.rs"]
mod reconcile_test;

/// Pick one candidate; `None` for an empty group
pub fn reconcile<I>(policy: ReconcilePolicy, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut candidates = candidates.into_iter();
    match policy {
        ReconcilePolicy::FirstSeen => candidates.next(),
        ReconcilePolicy::SmallestLabel => candidates.min(),
    }
}
