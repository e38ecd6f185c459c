pub mod opsmanager;
pub mod types;

use crate::domain::snapshot::ClusterRef;
use types::ContinuousSnapshot;

/// Remote backup service holding the cluster's snapshot history.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Every snapshot of the cluster, in the order the service returns them.
    async fn list_snapshots(&self, cluster: &ClusterRef) -> anyhow::Result<Vec<ContinuousSnapshot>>;

    async fn set_retention_flag(
        &self,
        cluster: &ClusterRef,
        snapshot_id: &str,
        exempt: bool,
    ) -> anyhow::Result<()>;
}
