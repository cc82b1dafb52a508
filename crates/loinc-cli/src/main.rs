use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use loinc_acquire::{fetch_release, BrowserOptions, FetchConfig, PortalLayout, WaitPolicy};
use loinc_model::{Credentials, FetchOutcome, ReleaseFilePattern, ReleaseTarget};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "loinc-fetch")]
#[command(about = "Download LOINC terminology release archives from loinc.org")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long, global = true)]
    utc: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    fetch: FetchArgs,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Sign in, accept the license, and download a release (the default action).
#[derive(Args)]
struct FetchArgs {
    /// Release to download (e.g., "2.78"); omit or pass "latest" for the newest release
    #[arg(value_name = "VERSION")]
    release: Option<String>,

    /// Directory the browser saves the archive into (created if missing)
    #[arg(short = 'O', long, default_value = ".")]
    download_dir: PathBuf,

    /// Seconds to wait for the archive to appear
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Milliseconds between checks of the download directory
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    /// Accept any .zip archive instead of only Loinc*.zip
    #[arg(long)]
    any_archive: bool,

    /// Chrome/Chromium executable (auto-detected by default)
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// JSON file overriding portal URLs and CSS selectors
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Print the fetch report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// loinc.org account name
    #[arg(long, env = "LOINC_USERNAME", hide_env_values = true, default_value = "", hide_default_value = true)]
    username: String,

    /// loinc.org account password
    #[arg(long, env = "LOINC_PASSWORD", hide_env_values = true, default_value = "", hide_default_value = true)]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the newest release number advertised on the public downloads page
    LatestVersion {
        /// Downloads page to read instead of the loinc.org default
        #[arg(long)]
        url: Option<String>,
    },

    /// Find a release archive already present in the download directory
    Local {
        /// Directory to look in
        #[arg(short = 'O', long, default_value = ".")]
        download_dir: PathBuf,

        /// Accept any .zip archive instead of only Loinc*.zip
        #[arg(long)]
        any_archive: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.utc);

    match cli.command {
        Some(Commands::LatestVersion { url }) => {
            let url = url.unwrap_or_else(|| PortalLayout::default().downloads_url);
            let version = loinc_acquire::latest::latest_release_version(&url).await?;
            tracing::info!(version = %version, "Latest LOINC release");
            println!("{version}");
        }
        Some(Commands::Local {
            download_dir,
            any_archive,
        }) => {
            let pattern = file_pattern(any_archive);
            let found = loinc_acquire::download::find_local_release(&download_dir, &pattern)
                .with_context(|| format!("Failed to read {}", download_dir.display()))?;
            let Some(file) = found else {
                anyhow::bail!("No {pattern} archive in {}", download_dir.display());
            };

            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match loinc_model::release_version_from_filename(&name) {
                Ok(version) => {
                    tracing::info!(file = %file.display(), version = %version, "Found local release");
                    println!("{}\t{version}", file.display());
                }
                Err(err) => {
                    tracing::warn!("{err}");
                    println!("{}", file.display());
                }
            }
        }
        None => run_fetch(cli.fetch).await?,
    }

    Ok(())
}

fn init_logging(level: &LogLevel, utc: bool) {
    // Keep HTML-parsing and CDP transport crates quiet at debug/trace
    let level = match level {
        LogLevel::Error => "error",
        LogLevel::Warn  => "warn",
        LogLevel::Info  => "info",
        LogLevel::Debug => "debug,selectors=warn,html5ever=warn,chromiumoxide=warn,tungstenite=warn",
        LogLevel::Trace => "trace,selectors=warn,html5ever=warn,chromiumoxide=warn,tungstenite=warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    if utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }
}

fn file_pattern(any_archive: bool) -> ReleaseFilePattern {
    if any_archive {
        ReleaseFilePattern::any_archive()
    } else {
        ReleaseFilePattern::prefixed()
    }
}

fn fetch_config(args: &FetchArgs) -> Result<FetchConfig> {
    let layout = match &args.layout {
        Some(path) => {
            let layout = PortalLayout::from_json_file(path)?;
            let invalid = layout.invalid_selectors();
            anyhow::ensure!(
                invalid.is_empty(),
                "Invalid CSS selectors in {}: {}",
                path.display(),
                invalid.join(", ")
            );
            tracing::info!(path = %path.display(), "Loaded portal layout");
            layout
        }
        None => PortalLayout::default(),
    };

    Ok(FetchConfig {
        download_dir: args.download_dir.clone(),
        target: ReleaseTarget::from_arg(args.release.as_deref()),
        pattern: file_pattern(args.any_archive),
        wait: WaitPolicy {
            interval: Duration::from_millis(args.poll_interval),
            timeout: Duration::from_secs(args.timeout),
        },
        browser: BrowserOptions {
            executable: args.chrome.clone(),
            headed: args.headed,
        },
        layout,
    })
}

async fn run_fetch(args: FetchArgs) -> Result<()> {
    let config = fetch_config(&args)?;
    let credentials = Credentials::new(args.username, args.password);

    let report = fetch_release(&config, &credentials).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match &report.outcome {
        FetchOutcome::Downloaded { file } => {
            tracing::info!(
                file = %file.display(),
                seconds = report.elapsed_seconds(),
                "LOINC {} downloaded",
                report.target
            );
        }
        FetchOutcome::VersionNotFound { version } => {
            tracing::warn!("LOINC version {version} not found, nothing downloaded");
        }
        FetchOutcome::TimedOut => {
            tracing::warn!(
                timeout_secs = config.wait.timeout.as_secs(),
                "Timeout reached, LOINC {} download not observed",
                report.target
            );
        }
        FetchOutcome::Failed { reason } => {
            anyhow::bail!("LOINC {} fetch failed: {reason}", report.target);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positional_version_selects_fetch() {
        let cli = Cli::try_parse_from(["loinc-fetch", "2.78", "-O", "/tmp/loinc"]).unwrap();
        assert!(cli.command.is_none());

        let config = fetch_config(&cli.fetch).unwrap();
        assert_eq!(config.target, ReleaseTarget::Version("2.78".into()));
        assert_eq!(config.download_dir, PathBuf::from("/tmp/loinc"));
        assert_eq!(config.wait, WaitPolicy::default());
        assert_eq!(config.pattern, ReleaseFilePattern::prefixed());
    }

    #[test]
    fn test_no_version_means_latest() {
        let cli = Cli::try_parse_from(["loinc-fetch"]).unwrap();
        let config = fetch_config(&cli.fetch).unwrap();
        assert_eq!(config.target, ReleaseTarget::Latest);
        assert_eq!(config.download_dir, PathBuf::from("."));
    }

    #[test]
    fn test_wait_and_pattern_flags() {
        let cli = Cli::try_parse_from([
            "loinc-fetch",
            "--timeout",
            "5",
            "--poll-interval",
            "250",
            "--any-archive",
        ])
        .unwrap();
        let config = fetch_config(&cli.fetch).unwrap();
        assert_eq!(config.wait.timeout, Duration::from_secs(5));
        assert_eq!(config.wait.interval, Duration::from_millis(250));
        assert_eq!(config.pattern, ReleaseFilePattern::any_archive());
    }

    #[test]
    fn test_version_flag_and_subcommands_still_parse() {
        let err = Cli::try_parse_from(["loinc-fetch", "--version"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);

        let cli = Cli::try_parse_from(["loinc-fetch", "local", "-O", "/tmp/x"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Local { .. })));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        assert!(Cli::try_parse_from(["loinc-fetch", "--poll-interval", "0"]).is_err());
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["loinc-fetch", "latest-version"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::LatestVersion { url: None })));

        let cli = Cli::try_parse_from(["loinc-fetch", "local", "-O", "/data", "--any-archive"]).unwrap();
        match cli.command {
            Some(Commands::Local {
                download_dir,
                any_archive,
            }) => {
                assert_eq!(download_dir, PathBuf::from("/data"));
                assert!(any_archive);
            }
            _ => panic!("expected local subcommand"),
        }
    }

    #[test]
    fn test_layout_with_bad_selector_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, r#"{ "login_submit": "input[" }"#).unwrap();

        let cli = Cli::try_parse_from(["loinc-fetch", "--layout", path.to_str().unwrap()]).unwrap();
        let err = fetch_config(&cli.fetch).unwrap_err();
        assert!(err.to_string().contains("login_submit"));
    }
}
