use crate::agreement::accept_agreement;
use crate::auth::authenticate;
use crate::chromium::{BrowserOptions, ChromiumSession};
use crate::download::{list_releases, prepare_download_dir, wait_for_download, WaitPolicy};
use crate::layout::PortalLayout;
use crate::locate::{locate_release, Located};
use crate::page::{PortalError, PortalPage, PortalSession};
use chrono::Utc;
use loinc_model::{Credentials, FetchOutcome, FetchReport, ReleaseFilePattern, ReleaseTarget};
use std::path::{Path, PathBuf};

/// Everything one fetch run needs besides the credentials.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub download_dir: PathBuf,
    pub target: ReleaseTarget,
    pub pattern: ReleaseFilePattern,
    pub wait: WaitPolicy,
    pub browser: BrowserOptions,
    pub layout: PortalLayout,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("."),
            target: ReleaseTarget::Latest,
            pattern: ReleaseFilePattern::default(),
            wait: WaitPolicy::default(),
            browser: BrowserOptions::default(),
            layout: PortalLayout::default(),
        }
    }
}

/// Fetch one release with a headless Chromium.
///
/// Never returns an error: hard failures are folded into
/// [`FetchOutcome::Failed`] after the browser has been shut down.
pub async fn fetch_release(config: &FetchConfig, credentials: &Credentials) -> FetchReport {
    let started_at = Utc::now();
    tracing::info!(release = %config.target, dir = %config.download_dir.display(), "Fetching LOINC release");

    let outcome = match launch_and_drive(config, credentials).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, "Fetch failed");
            FetchOutcome::Failed {
                reason: err.to_string(),
            }
        }
    };

    FetchReport {
        target: config.target.clone(),
        download_dir: config.download_dir.clone(),
        outcome,
        started_at,
        finished_at: Utc::now(),
    }
}

async fn launch_and_drive(
    config: &FetchConfig,
    credentials: &Credentials,
) -> Result<FetchOutcome, PortalError> {
    let download_dir = prepare_download_dir(&config.download_dir)?;
    tracing::debug!(dir = %download_dir.display(), "Download directory ready");

    let session = ChromiumSession::launch(&config.browser, &download_dir).await?;
    drive_session(session, config, &download_dir, credentials).await
}

/// Run the portal steps on `session`, then close it whatever the result.
pub async fn drive_session<S: PortalSession>(
    mut session: S,
    config: &FetchConfig,
    download_dir: &Path,
    credentials: &Credentials,
) -> Result<FetchOutcome, PortalError> {
    let result = run_steps(&mut session, config, download_dir, credentials).await;
    session.close().await;
    result
}

/// Login, locate, accept, wait. Stops early on a soft "version not found".
pub async fn run_steps<P: PortalPage>(
    page: &mut P,
    config: &FetchConfig,
    download_dir: &Path,
    credentials: &Credentials,
) -> Result<FetchOutcome, PortalError> {
    authenticate(page, &config.layout, credentials).await?;

    match locate_release(page, &config.layout, &config.target).await? {
        Located::ReleasePage { url } => {
            tracing::info!(url = %url, "On release page");
        }
        Located::VersionNotFound { version } => {
            tracing::warn!(version = %version, "Version not found in the archive listing");
            return Ok(FetchOutcome::VersionNotFound { version });
        }
    }

    let already_present = list_releases(download_dir, &config.pattern)?;
    accept_agreement(page, &config.layout).await?;

    tracing::info!(
        pattern = %config.pattern,
        timeout = ?config.wait.timeout,
        "Waiting for download to complete"
    );
    match wait_for_download(download_dir, &config.pattern, config.wait).await? {
        Some(file) => {
            if already_present.contains(&file) {
                tracing::warn!(
                    file = %file.display(),
                    release = %config.target,
                    "Matched an archive that was in the directory before the download started"
                );
            }
            tracing::info!(file = %file.display(), release = %config.target, "LOINC download complete");
            Ok(FetchOutcome::Downloaded { file })
        }
        None => {
            tracing::warn!(release = %config.target, timeout = ?config.wait.timeout, "Download timeout reached");
            Ok(FetchOutcome::TimedOut)
        }
    }
}
