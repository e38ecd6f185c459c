use crate::domain::snapshot::SnapshotRecord;
use crate::retention::error::RetentionError;
use crate::time::calendar::parse_snapshot_timestamp;
use serde::{Deserialize, Serialize};

/// One page of `GET groups/{group}/clusters/{cluster}/snapshots`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPage {
    #[serde(default)]
    pub results: Vec<ContinuousSnapshot>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuousSnapshot {
    pub id: String,
    #[serde(default)]
    pub created: SnapshotCreated,
    #[serde(default)]
    pub do_not_delete: Option<bool>,
    #[serde(default)]
    pub expires: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotCreated {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub increment: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionUpdateRequest {
    pub do_not_delete: bool,
}

impl ContinuousSnapshot {
    pub fn to_record(&self) -> Result<SnapshotRecord, RetentionError> {
        let created_at = parse_snapshot_timestamp(&self.created.date)
            .map_err(|err| err.with_snapshot_id(&self.id))?;
        Ok(SnapshotRecord {
            id: self.id.clone(),
            created_at,
            do_not_delete: self.do_not_delete.unwrap_or(false),
        })
    }
}
