pub mod domain;
pub mod retention;
pub mod source;
pub mod time;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_BASE_URL: &str = "https://opsmanager.fintech.halan.io/api/public/v1.0/";
    pub const DEFAULT_DISPLAY_TZ: &str = "Africa/Cairo";

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub public_key: Option<String>,
        pub private_key: Option<String>,
        pub base_url: Option<String>,
        pub project_id: Option<String>,
        pub cluster_id: Option<String>,
        pub display_tz: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                public_key: env_non_empty("OpsManager_Public_Key"),
                private_key: env_non_empty("OpsManager_Private_Key"),
                base_url: env_non_empty("OPSMANAGER_BASE_URL"),
                project_id: env_non_empty("OPSMANAGER_PROJECT_ID"),
                cluster_id: env_non_empty("OPSMANAGER_CLUSTER_ID"),
                display_tz: env_non_empty("SNAPKEEP_DISPLAY_TZ"),
                sentry_dsn: env_non_empty("SENTRY_DSN"),
            })
        }

        pub fn require_public_key(&self) -> anyhow::Result<&str> {
            self.public_key
                .as_deref()
                .context("OpsManager_Public_Key is required")
        }

        pub fn require_private_key(&self) -> anyhow::Result<&str> {
            self.private_key
                .as_deref()
                .context("OpsManager_Private_Key is required")
        }

        pub fn require_project_id(&self) -> anyhow::Result<&str> {
            self.project_id
                .as_deref()
                .context("OPSMANAGER_PROJECT_ID (or --project-id) is required")
        }

        pub fn require_cluster_id(&self) -> anyhow::Result<&str> {
            self.cluster_id
                .as_deref()
                .context("OPSMANAGER_CLUSTER_ID (or --cluster-id) is required")
        }

        pub fn base_url(&self) -> &str {
            self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
        }

        /// Timezone used for operator-facing output only; day matching is always UTC.
        pub fn display_tz(&self) -> anyhow::Result<chrono_tz::Tz> {
            let name = self.display_tz.as_deref().unwrap_or(DEFAULT_DISPLAY_TZ);
            name.parse::<chrono_tz::Tz>()
                .map_err(|err| anyhow::anyhow!("invalid display timezone {name:?}: {err}"))
        }
    }

    fn env_non_empty(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

}
