use crate::domain::snapshot::{SnapshotRecord, TargetDay};

/// Records created on `target`, oldest first. Ties keep source order.
pub fn matching_snapshots(records: &[SnapshotRecord], target: TargetDay) -> Vec<&SnapshotRecord> {
    let mut matching: Vec<&SnapshotRecord> = records
        .iter()
        .filter(|r| target.contains(r.created_at))
        .collect();
    matching.sort_by_key(|r| r.created_at);
    matching
}

/// The latest snapshot taken on `target`, if any.
pub fn select_snapshot(records: &[SnapshotRecord], target: TargetDay) -> Option<&SnapshotRecord> {
    matching_snapshots(records, target).last().copied()
}
