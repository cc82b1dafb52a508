pub mod agreement;
pub mod auth;
pub mod chromium;
pub mod download;
pub mod latest;
pub mod layout;
pub mod locate;
pub mod page;
pub mod pipeline;

#[cfg(test)]
mod fake;

pub use chromium::{BrowserOptions, ChromiumSession};
pub use download::WaitPolicy;
pub use layout::PortalLayout;
pub use locate::Located;
pub use page::{PortalError, PortalPage, PortalSession};
pub use pipeline::{fetch_release, FetchConfig};
