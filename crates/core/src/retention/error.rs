use std::fmt;

/// Exit status for errors that are not a [`RetentionError`] (config, arguments).
pub const EXIT_GENERIC_FAILURE: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionError {
    /// Listing snapshots failed: transport, auth, HTTP status or body decoding.
    ListSnapshots {
        project_id: String,
        cluster_id: String,
        detail: String,
    },

    /// A listed snapshot carried a creation timestamp that does not parse.
    MalformedTimestamp {
        snapshot_id: Option<String>,
        text: String,
        detail: String,
    },

    /// Setting the retention flag on the selected snapshot failed.
    UpdateRetention { snapshot_id: String, detail: String },
}

impl RetentionError {
    pub fn stage(&self) -> &'static str {
        match self {
            RetentionError::ListSnapshots { .. } => "list_snapshots",
            RetentionError::MalformedTimestamp { .. } => "parse_timestamp",
            RetentionError::UpdateRetention { .. } => "update_retention",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            RetentionError::ListSnapshots { .. } => 2,
            RetentionError::UpdateRetention { .. } => 3,
            RetentionError::MalformedTimestamp { .. } => 4,
        }
    }

    pub(crate) fn with_snapshot_id(self, id: &str) -> Self {
        match self {
            RetentionError::MalformedTimestamp { text, detail, .. } => {
                RetentionError::MalformedTimestamp {
                    snapshot_id: Some(id.to_string()),
                    text,
                    detail,
                }
            }
            other => other,
        }
    }
}

impl fmt::Display for RetentionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionError::ListSnapshots {
                project_id,
                cluster_id,
                detail,
            } => write!(
                f,
                "failed to list snapshots (project={project_id}, cluster={cluster_id}): {detail}"
            ),
            RetentionError::MalformedTimestamp {
                snapshot_id: Some(id),
                text,
                detail,
            } => write!(f, "snapshot {id} has malformed timestamp {text:?}: {detail}"),
            RetentionError::MalformedTimestamp {
                snapshot_id: None,
                text,
                detail,
            } => write!(f, "malformed snapshot timestamp {text:?}: {detail}"),
            RetentionError::UpdateRetention {
                snapshot_id,
                detail,
            } => write!(
                f,
                "failed to set doNotDelete on snapshot {snapshot_id}: {detail}"
            ),
        }
    }
}

impl std::error::Error for RetentionError {}

/// Maps a run failure to the process exit status, looking through `anyhow` context layers.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<RetentionError>()
        .map(RetentionError::exit_code)
        .unwrap_or(EXIT_GENERIC_FAILURE)
}

/// Stage label for logs; failures outside a retention step are reported as `setup`.
pub fn stage_for(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<RetentionError>()
        .map(RetentionError::stage)
        .unwrap_or("setup")
}
