use crate::domain::snapshot::{ClusterRef, SnapshotRecord};
use crate::retention::error::RetentionError;
use crate::source::SnapshotSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    Flagged,
    AlreadyFlagged,
}

/// Marks `record` as exempt from automatic expiry. No request is sent if it already is.
pub async fn flag_do_not_delete(
    source: &dyn SnapshotSource,
    cluster: &ClusterRef,
    record: &SnapshotRecord,
) -> Result<UpdateResult, RetentionError> {
    if record.do_not_delete {
        tracing::info!(snapshot_id = %record.id, "snapshot already marked doNotDelete; skipping update");
        return Ok(UpdateResult::AlreadyFlagged);
    }

    source
        .set_retention_flag(cluster, &record.id, true)
        .await
        .map_err(|err| RetentionError::UpdateRetention {
            snapshot_id: record.id.clone(),
            detail: format!("{err:#}"),
        })?;

    tracing::info!(
        source = source.source_name(),
        snapshot_id = %record.id,
        created_at = %record.created_at,
        "snapshot marked doNotDelete"
    );
    Ok(UpdateResult::Flagged)
}
