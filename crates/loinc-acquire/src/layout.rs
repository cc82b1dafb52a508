use anyhow::{Context, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Addresses and CSS selectors of the portal pages the fetcher touches.
///
/// The defaults describe loinc.org as currently published. Everything here
/// is tied to third-party markup, so it lives in one value that can be
/// replaced from a JSON file without touching the steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalLayout {
    /// Login form; redirects to the downloads page after sign-in.
    pub login_url: String,
    /// Listing of previously published releases.
    pub archive_url: String,
    /// Public downloads page, readable without signing in.
    pub downloads_url: String,

    pub username_field: String,
    pub password_field: String,
    pub login_submit: String,
    /// "Download latest" control on the downloads page.
    pub download_trigger: String,
    /// Terms-of-use checkbox on a release page.
    pub terms_checkbox: String,
    pub terms_submit: String,
}

impl Default for PortalLayout {
    fn default() -> Self {
        Self {
            login_url: "https://loinc.org/wp-login.php?redirect_to=https%3A%2F%2Floinc.org%2Fdownloads%2F"
                .to_string(),
            archive_url: "https://loinc.org/downloads/archive/".to_string(),
            downloads_url: "https://loinc.org/downloads/".to_string(),
            username_field: "#user_login".to_string(),
            password_field: "#user_pass".to_string(),
            login_submit: "#wp-submit".to_string(),
            download_trigger: ".fa-download".to_string(),
            terms_checkbox: "#tc_accepted_".to_string(),
            terms_submit: ".dlm-tc-submit".to_string(),
        }
    }
}

impl PortalLayout {
    /// Load a layout from JSON. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout file {}", path.display()))?;
        let layout: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse layout file {}", path.display()))?;
        Ok(layout)
    }

    /// Named selectors, in the order the steps use them.
    pub fn selectors(&self) -> [(&'static str, &str); 6] {
        [
            ("username_field", self.username_field.as_str()),
            ("password_field", self.password_field.as_str()),
            ("login_submit", self.login_submit.as_str()),
            ("download_trigger", self.download_trigger.as_str()),
            ("terms_checkbox", self.terms_checkbox.as_str()),
            ("terms_submit", self.terms_submit.as_str()),
        ]
    }

    /// Report every selector that is not valid CSS.
    pub fn invalid_selectors(&self) -> Vec<String> {
        self.selectors()
            .into_iter()
            .filter(|(_, css)| Selector::parse(css).is_err())
            .map(|(name, css)| format!("{name}: '{css}'"))
            .collect()
    }
}
