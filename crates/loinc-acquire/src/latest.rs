use anyhow::{Context, Result};
use loinc_model::first_release_version_in;

/// Ask the public downloads page which release is current.
///
/// Reads the page over plain HTTP (no sign-in) and returns the first
/// `Loinc_X.Y` / `Loinc-X.Y` number it mentions, e.g. `2.80`.
pub async fn latest_release_version(downloads_url: &str) -> Result<String> {
    tracing::info!(url = %downloads_url, "Fetching downloads page");
    let html = fetch_page(downloads_url).await?;
    tracing::debug!(bytes = html.len(), "Received HTML");

    first_release_version_in(&html)
        .with_context(|| format!("No Loinc release number found on {downloads_url}"))
}

async fn fetch_page(url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent("loinc-fetch/0.1 (terminology release downloader)")
        .build()?;

    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to fetch page")?;

    let status = response.status();
    anyhow::ensure!(status.is_success(), "HTTP {status} for {url}");

    response.text().await.context("Failed to read response body")
}
