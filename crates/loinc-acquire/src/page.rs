use chromiumoxide::error::CdpError;
use thiserror::Error;

/// Hard failures while driving the portal. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("no element matches selector '{selector}': {reason}")]
    ElementNotFound { selector: String, reason: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("cannot resolve link '{href}' against {base}: {reason}")]
    InvalidLink {
        href: String,
        base: String,
        reason: String,
    },

    #[error("browser command failed: {0}")]
    Cdp(#[from] CdpError),

    #[error("download directory: {0}")]
    Io(#[from] std::io::Error),
}

/// What the portal steps need from a browser page.
///
/// Steps address elements only through CSS selector strings taken from a
/// [`PortalLayout`](crate::PortalLayout), so the same steps run against a
/// real browser or a scripted page in tests.
#[allow(async_fn_in_trait)]
pub trait PortalPage {
    /// Navigate to `url` and wait for the load to finish.
    async fn goto(&mut self, url: &str) -> Result<(), PortalError>;

    /// Focus the element matching `selector` and type `text` into it.
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), PortalError>;

    async fn click(&mut self, selector: &str) -> Result<(), PortalError>;

    /// Click the element matching `selector` and wait for the navigation
    /// it triggers.
    async fn click_and_wait(&mut self, selector: &str) -> Result<(), PortalError>;

    /// Serialized HTML of the current document.
    async fn content(&mut self) -> Result<String, PortalError>;

    /// Address of the current document.
    async fn url(&mut self) -> Result<String, PortalError>;
}

/// A page that owns its browser and must be shut down when the run ends.
#[allow(async_fn_in_trait)]
pub trait PortalSession: PortalPage {
    /// Close the browser. Errors are logged, never returned, so teardown
    /// cannot mask the outcome of the run.
    async fn close(self);
}
