use crate::page::{PortalError, PortalPage, PortalSession};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::page::{EventFrameStartedLoading, FrameId};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long teardown waits for the CDP handler task to drain.
const HANDLER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a click may take to start a main-frame navigation.
const NAVIGATION_START_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs for the browser process itself.
#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    /// Chrome/Chromium binary; auto-detected when unset.
    pub executable: Option<PathBuf>,
    /// Show the browser window instead of running headless.
    pub headed: bool,
}

/// A Chromium process with one page whose downloads land in a fixed
/// directory.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
}

impl ChromiumSession {
    /// Launch the browser (sandbox disabled), open a blank page, and route
    /// downloads to `download_dir`, which must be absolute and exist.
    ///
    /// If anything after the process start fails, the process is shut down
    /// before the error is returned.
    pub async fn launch(options: &BrowserOptions, download_dir: &Path) -> Result<Self, PortalError> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if options.headed {
            builder = builder.with_head();
        }
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(PortalError::Launch)?;

        tracing::info!(headed = options.headed, "Launching browser");
        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| PortalError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(err) = event {
                    tracing::debug!(error = %err, "CDP handler error");
                }
            }
        });

        match open_download_page(&browser, download_dir).await {
            Ok(page) => {
                tracing::info!(dir = %download_dir.display(), "Browser ready");
                Ok(Self {
                    browser,
                    handler,
                    page,
                })
            }
            Err(err) => {
                shutdown(browser, handler).await;
                Err(err)
            }
        }
    }

    async fn find(&self, selector: &str) -> Result<Element, PortalError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| PortalError::ElementNotFound {
                selector: selector.to_string(),
                reason: e.to_string(),
            })
    }
}

async fn open_download_page(browser: &Browser, download_dir: &Path) -> Result<Page, PortalError> {
    let page = browser.new_page("about:blank").await?;

    let params = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(download_dir.to_string_lossy().into_owned())
        .build()
        .map_err(PortalError::Launch)?;
    browser.execute(params).await?;

    Ok(page)
}

/// Resolve once `events` reports the main frame starting to load.
///
/// Subframe loads are skipped. With no known main frame any load counts.
async fn main_frame_started<S>(
    mut events: S,
    main_frame: Option<&FrameId>,
    limit: Duration,
) -> Result<(), String>
where
    S: Stream<Item = Arc<EventFrameStartedLoading>> + Unpin,
{
    let started = async {
        while let Some(event) = events.next().await {
            if main_frame.map_or(true, |id| *id == event.frame_id) {
                return Ok(());
            }
            tracing::trace!(frame = ?event.frame_id, "Ignoring subframe load");
        }
        Err("page event stream closed before navigation started".to_string())
    };

    tokio::time::timeout(limit, started)
        .await
        .unwrap_or_else(|_| Err(format!("no navigation started within {limit:?}")))
}

async fn shutdown(mut browser: Browser, mut handler: JoinHandle<()>) {
    if let Err(err) = browser.close().await {
        tracing::warn!(error = %err, "Failed to close browser cleanly");
    }
    if let Err(err) = browser.wait().await {
        tracing::warn!(error = %err, "Failed to wait for browser process");
    }
    if tokio::time::timeout(HANDLER_SHUTDOWN_TIMEOUT, &mut handler)
        .await
        .is_err()
    {
        tracing::debug!("CDP handler still running after close, aborting it");
        handler.abort();
    }
}

impl PortalPage for ChromiumSession {
    async fn goto(&mut self, url: &str) -> Result<(), PortalError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| PortalError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), PortalError> {
        let element = self.find(selector).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), PortalError> {
        self.find(selector).await?.click().await?;
        Ok(())
    }

    async fn click_and_wait(&mut self, selector: &str) -> Result<(), PortalError> {
        let navigation_error = |reason: String| PortalError::Navigation {
            url: format!("(after clicking {selector})"),
            reason,
        };

        // Listen before clicking: the old page still reports itself loaded
        // until the main frame starts the new navigation.
        let main_frame = self.page.mainframe().await?;
        let started = self.page.event_listener::<EventFrameStartedLoading>().await?;

        self.find(selector).await?.click().await?;

        main_frame_started(started, main_frame.as_ref(), NAVIGATION_START_TIMEOUT)
            .await
            .map_err(navigation_error)?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, PortalError> {
        Ok(self.page.content().await?)
    }

    async fn url(&mut self) -> Result<String, PortalError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }
}

impl PortalSession for ChromiumSession {
    async fn close(self) {
        tracing::info!("Closing browser");
        shutdown(self.browser, self.handler).await;
        tracing::info!("Browser closed");
    }
}
