use anyhow::Context;
use clap::Parser;
use snapkeep_core::config::Settings;
use snapkeep_core::domain::snapshot::{ClusterRef, TargetDay};
use snapkeep_core::retention::error::{exit_code_for, stage_for, EXIT_GENERIC_FAILURE};
use snapkeep_core::retention::{run_monthly_retention, RunOptions};
use snapkeep_core::source::opsmanager::OpsManagerClient;
use std::ffi::OsString;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "snapkeep_worker")]
struct Args {
    /// Compute the target day from this date (YYYY-MM-DD) instead of today's UTC date.
    #[arg(long)]
    as_of_date: Option<String>,

    /// Ops Manager project (group) id. Overrides OPSMANAGER_PROJECT_ID.
    #[arg(long)]
    project_id: Option<String>,

    /// Overrides OPSMANAGER_CLUSTER_ID.
    #[arg(long)]
    cluster_id: Option<String>,

    /// Ops Manager public API root. Overrides OPSMANAGER_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// IANA timezone for printed snapshot times. Overrides SNAPKEEP_DISPLAY_TZ.
    #[arg(long)]
    display_tz: Option<String>,

    /// Select the snapshot but do not mark it.
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.project_id {
            settings.project_id = Some(v.clone());
        }
        if let Some(v) = &self.cluster_id {
            settings.cluster_id = Some(v.clone());
        }
        if let Some(v) = &self.base_url {
            settings.base_url = Some(v.clone());
        }
        if let Some(v) = &self.display_tz {
            settings.display_tz = Some(v.clone());
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(code) => return ExitCode::from(code),
    };

    let mut settings = match Settings::from_env() {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(EXIT_GENERIC_FAILURE);
        }
    };
    args.apply(&mut settings);

    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    match run(&args, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            let code = exit_code_for(&err);
            tracing::error!(
                error = %format!("{err:#}"),
                stage = stage_for(&err),
                exit_code = code,
                "snapshot retention run failed"
            );
            eprintln!("error: {err:#}");
            ExitCode::from(code)
        }
    }
}

/// Parses the command line. `Err` carries the exit status: 0 after `--help`/`--version`,
/// [`EXIT_GENERIC_FAILURE`] for usage errors.
fn parse_args<I, T>(argv: I) -> Result<Args, u8>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(argv).map_err(|err| {
        let _ = err.print();
        if err.use_stderr() {
            EXIT_GENERIC_FAILURE
        } else {
            0
        }
    })
}

async fn run(args: &Args, settings: &Settings) -> anyhow::Result<()> {
    let display_tz = settings.display_tz()?;
    let target = resolve_target_day(args.as_of_date.as_deref(), chrono::Utc::now())?;
    println!("last day of the previous month: {target}");

    let opts = RunOptions {
        cluster: ClusterRef::new(settings.require_project_id()?, settings.require_cluster_id()?),
        dry_run: args.dry_run,
    };
    let client = OpsManagerClient::from_settings(settings)?;

    let outcome = run_monthly_retention(&client, &opts, target).await?;
    println!("{}", outcome.describe(&display_tz));
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

fn resolve_target_day(
    as_of_date_arg: Option<&str>,
    now_utc: chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<TargetDay> {
    if let Some(s) = as_of_date_arg {
        let date = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --as-of-date {s:?}, expected YYYY-MM-DD"))?;
        return Ok(TargetDay::for_date(date));
    }
    Ok(TargetDay::for_clock(now_utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn target_day_from_clock() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 3, 0, 0).unwrap();
        let target = resolve_target_day(None, now).unwrap();
        assert_eq!(target.date(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn as_of_date_overrides_clock() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 3, 0, 0).unwrap();
        let target = resolve_target_day(Some("2024-03-10"), now).unwrap();
        assert_eq!(target.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn bad_as_of_date_is_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 3, 0, 0).unwrap();
        let err = resolve_target_day(Some("10/03/2024"), now).unwrap_err();
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn unknown_flag_exits_with_generic_failure() {
        let code = parse_args(["snapkeep_worker", "--bogus"]).unwrap_err();
        assert_eq!(code, EXIT_GENERIC_FAILURE);
        assert_eq!(code, 1);
    }

    #[test]
    fn help_exits_successfully() {
        assert_eq!(parse_args(["snapkeep_worker", "--help"]).unwrap_err(), 0);
    }

    #[test]
    fn parses_known_flags() {
        let args = parse_args(["snapkeep_worker", "--as-of-date", "2024-02-15"]).unwrap();
        assert_eq!(args.as_of_date.as_deref(), Some("2024-02-15"));
        assert!(!args.dry_run);
    }

    #[test]
    fn flags_override_environment() {
        let args = Args::parse_from([
            "snapkeep_worker",
            "--project-id",
            "p-flag",
            "--display-tz",
            "UTC",
            "--dry-run",
        ]);
        let mut settings = Settings {
            project_id: Some("p-env".to_string()),
            cluster_id: Some("c-env".to_string()),
            ..Default::default()
        };
        args.apply(&mut settings);

        assert!(args.dry_run);
        assert_eq!(settings.require_project_id().unwrap(), "p-flag");
        assert_eq!(settings.require_cluster_id().unwrap(), "c-env");
        assert_eq!(settings.display_tz.as_deref(), Some("UTC"));
        assert!(settings.display_tz().is_ok());
    }
}
