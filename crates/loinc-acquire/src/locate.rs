use crate::layout::PortalLayout;
use crate::page::{PortalError, PortalPage};
use loinc_model::{release_link_token, ReleaseTarget};
use reqwest::Url;
use scraper::{Html, Selector};

/// Where the locator left the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// On a release page, with the agreement gate in front of the file.
    ReleasePage { url: String },
    /// The archive listing has no link for the requested version.
    VersionNotFound { version: String },
}

/// Bring the page to the release page for `target`.
///
/// For [`ReleaseTarget::Latest`] this clicks the download control on the
/// current (post-login) page. For a specific version it opens the archive
/// listing, picks the first link containing the version token, and follows
/// it. A version with no link is reported as [`Located::VersionNotFound`],
/// not as an error.
pub async fn locate_release<P: PortalPage>(
    page: &mut P,
    layout: &PortalLayout,
    target: &ReleaseTarget,
) -> Result<Located, PortalError> {
    let version = match target {
        ReleaseTarget::Latest => {
            tracing::info!("Starting download of the latest release");
            page.click_and_wait(&layout.download_trigger).await?;
            let url = page.url().await?;
            return Ok(Located::ReleasePage { url });
        }
        ReleaseTarget::Version(version) => version,
    };

    tracing::info!(url = %layout.archive_url, "Navigating to archive page");
    page.goto(&layout.archive_url).await?;

    tracing::info!(version = %version, "Searching for release link");
    let html = page.content().await?;
    let mut base = page.url().await?;
    if base.is_empty() {
        base = layout.archive_url.clone();
    }

    match find_release_link(&html, &base, version)? {
        Some(url) => {
            tracing::info!(url = %url, "Found download link");
            page.goto(&url).await?;
            Ok(Located::ReleasePage { url })
        }
        None => Ok(Located::VersionNotFound {
            version: version.clone(),
        }),
    }
}

/// Find the first `<a href>` whose raw address contains the link token for
/// `version`, resolved against `base_url`.
///
/// Matching is plain substring containment on `loinc-<version with dots
/// replaced by dashes>`, so `2.7` also matches a `loinc-2-78` link; the
/// first match in document order wins.
pub fn find_release_link(
    html: &str,
    base_url: &str,
    version: &str,
) -> Result<Option<String>, PortalError> {
    let token = release_link_token(version);
    let document = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("valid selector");

    let Some(href) = document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains(&token))
    else {
        tracing::debug!(token = %token, "No link contains the version token");
        return Ok(None);
    };

    let invalid = |reason: String| PortalError::InvalidLink {
        href: href.to_string(),
        base: base_url.to_string(),
        reason,
    };
    let resolved = Url::parse(base_url)
        .map_err(|e| invalid(e.to_string()))?
        .join(href)
        .map_err(|e| invalid(e.to_string()))?;

    Ok(Some(resolved.to_string()))
}
