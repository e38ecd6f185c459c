pub mod error;
pub mod selector;
pub mod updater;

use crate::domain::snapshot::{ClusterRef, SnapshotRecord, TargetDay};
use crate::source::types::ContinuousSnapshot;
use crate::source::SnapshotSource;
use crate::time::calendar::format_display_time;
use chrono::TimeZone;
use error::RetentionError;
use updater::UpdateResult;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub cluster: ClusterRef,

    /// Select the snapshot but do not send the update.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoMatch {
        target: TargetDay,
        listed: usize,
    },
    Flagged {
        target: TargetDay,
        snapshot: SnapshotRecord,
    },
    AlreadyFlagged {
        target: TargetDay,
        snapshot: SnapshotRecord,
    },
    DryRun {
        target: TargetDay,
        snapshot: SnapshotRecord,
    },
}

impl RunOutcome {
    pub fn target(&self) -> TargetDay {
        match self {
            RunOutcome::NoMatch { target, .. }
            | RunOutcome::Flagged { target, .. }
            | RunOutcome::AlreadyFlagged { target, .. }
            | RunOutcome::DryRun { target, .. } => *target,
        }
    }

    pub fn snapshot(&self) -> Option<&SnapshotRecord> {
        match self {
            RunOutcome::NoMatch { .. } => None,
            RunOutcome::Flagged { snapshot, .. }
            | RunOutcome::AlreadyFlagged { snapshot, .. }
            | RunOutcome::DryRun { snapshot, .. } => Some(snapshot),
        }
    }

    /// Operator-facing summary line, with snapshot times rendered in `tz`.
    pub fn describe<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        match self {
            RunOutcome::NoMatch { target, listed } => {
                format!("no snapshot found for {target} ({listed} snapshots listed)")
            }
            RunOutcome::Flagged { snapshot, .. } => format!(
                "Snapshot {} ({}) is set to DoNotDelete",
                snapshot.id,
                format_display_time(snapshot.created_at, tz)
            ),
            RunOutcome::AlreadyFlagged { snapshot, .. } => format!(
                "Snapshot {} ({}) was already set to DoNotDelete",
                snapshot.id,
                format_display_time(snapshot.created_at, tz)
            ),
            RunOutcome::DryRun { snapshot, .. } => format!(
                "dry run: snapshot {} ({}) would be set to DoNotDelete",
                snapshot.id,
                format_display_time(snapshot.created_at, tz)
            ),
        }
    }
}

/// Lists the cluster's snapshots, picks the latest one taken on `target` and flags it.
///
/// An empty selection is a successful [`RunOutcome::NoMatch`]. Failures carry a
/// [`RetentionError`] so callers can tell listing, parsing and update failures apart.
pub async fn run_monthly_retention(
    source: &dyn SnapshotSource,
    opts: &RunOptions,
    target: TargetDay,
) -> anyhow::Result<RunOutcome> {
    tracing::info!(
        %target,
        source = source.source_name(),
        project_id = %opts.cluster.project_id,
        cluster_id = %opts.cluster.cluster_id,
        dry_run = opts.dry_run,
        "starting monthly snapshot retention"
    );

    let listed = source
        .list_snapshots(&opts.cluster)
        .await
        .map_err(|err| RetentionError::ListSnapshots {
            project_id: opts.cluster.project_id.clone(),
            cluster_id: opts.cluster.cluster_id.clone(),
            detail: format!("{err:#}"),
        })?;

    let records = listed
        .iter()
        .map(ContinuousSnapshot::to_record)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        %target,
        listed = records.len(),
        matching = selector::matching_snapshots(&records, target).len(),
        "filtered snapshots by target day"
    );

    let Some(selected) = selector::select_snapshot(&records, target).cloned() else {
        tracing::warn!(%target, listed = records.len(), "no snapshot found for target day");
        return Ok(RunOutcome::NoMatch {
            target,
            listed: records.len(),
        });
    };

    if opts.dry_run {
        tracing::info!(%target, snapshot_id = %selected.id, "dry run; not updating retention");
        return Ok(RunOutcome::DryRun {
            target,
            snapshot: selected,
        });
    }

    let outcome = match updater::flag_do_not_delete(source, &opts.cluster, &selected).await? {
        UpdateResult::Flagged => RunOutcome::Flagged {
            target,
            snapshot: selected,
        },
        UpdateResult::AlreadyFlagged => RunOutcome::AlreadyFlagged {
            target,
            snapshot: selected,
        },
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn snapshot() -> SnapshotRecord {
        SnapshotRecord {
            id: "65b9a1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 31, 22, 0, 0).unwrap(),
            do_not_delete: false,
        }
    }

    fn target() -> TargetDay {
        TargetDay::for_date(NaiveDate::from_ymd_opt(2024, 2, 15).unwrap())
    }

    #[test]
    fn describes_each_outcome() {
        let flagged = RunOutcome::Flagged {
            target: target(),
            snapshot: snapshot(),
        };
        assert_eq!(
            flagged.describe(&Utc),
            "Snapshot 65b9a1 (01/31/24 - 10:00 PM) is set to DoNotDelete"
        );
        assert_eq!(
            flagged.describe(&chrono_tz::Africa::Cairo),
            "Snapshot 65b9a1 (02/01/24 - 12:00 AM) is set to DoNotDelete"
        );

        let none = RunOutcome::NoMatch {
            target: target(),
            listed: 7,
        };
        assert_eq!(
            none.describe(&Utc),
            "no snapshot found for 2024-01-31 (7 snapshots listed)"
        );
        assert!(none.snapshot().is_none());

        let dry = RunOutcome::DryRun {
            target: target(),
            snapshot: snapshot(),
        };
        assert!(dry.describe(&Utc).starts_with("dry run: snapshot 65b9a1"));
        assert_eq!(dry.target(), target());
        assert_eq!(dry.snapshot().map(|s| s.id.as_str()), Some("65b9a1"));
    }
}
