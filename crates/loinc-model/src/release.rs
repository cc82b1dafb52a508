use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Path fragment every release download link on the portal starts with
/// (e.g., `https://loinc.org/download/loinc-2-78-complete/`).
pub const RELEASE_LINK_PREFIX: &str = "loinc-";

/// Separator the portal uses in place of `.` inside release slugs.
pub const VERSION_SEPARATOR: &str = "-";

/// Literal file name prefix of release archives (e.g., `Loinc_2.78.zip`).
pub const RELEASE_FILE_PREFIX: &str = "Loinc";

pub const RELEASE_FILE_EXTENSION: &str = ".zip";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("'{0}' is not a release archive name (expected Loinc_<major>.<minor>[-suffix].zip)")]
    UnrecognizedFileName(String),
}

/// Which release to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "version", rename_all = "snake_case")]
pub enum ReleaseTarget {
    /// Whatever the portal currently offers as its newest release.
    Latest,
    /// A specific archived release, e.g. "2.78". Free-form; only used to
    /// build the link token.
    Version(String),
}

impl ReleaseTarget {
    /// Build a target from an optional command-line argument.
    ///
    /// No argument, a blank argument, or the word `latest` select the
    /// newest release; anything else is taken as a version string.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg.map(str::trim) {
            None | Some("") => Self::Latest,
            Some(v) if v.eq_ignore_ascii_case("latest") => Self::Latest,
            Some(v) => Self::Version(v.to_string()),
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Latest => None,
            Self::Version(v) => Some(v),
        }
    }
}

impl fmt::Display for ReleaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Version(v) => f.write_str(v),
        }
    }
}

/// Replace every `.` in a version with the portal's slug separator.
///
/// `2.78` becomes `2-78`.
pub fn version_token(version: &str) -> String {
    version.replace('.', VERSION_SEPARATOR)
}

/// The substring a release page link must contain for `version`.
///
/// `2.78` becomes `loinc-2-78`, which matches
/// `https://loinc.org/download/loinc-2-78-complete/?tmstv=1743515220`.
pub fn release_link_token(version: &str) -> String {
    format!("{RELEASE_LINK_PREFIX}{}", version_token(version))
}

/// Predicate over file names in the download directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFilePattern {
    /// Required literal prefix, if any. Case-sensitive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Required suffix including the dot (e.g., ".zip"). Case-sensitive.
    pub extension: String,
}

impl ReleaseFilePattern {
    /// `Loinc*.zip`
    pub fn prefixed() -> Self {
        Self {
            prefix: Some(RELEASE_FILE_PREFIX.to_string()),
            extension: RELEASE_FILE_EXTENSION.to_string(),
        }
    }

    /// `*.zip`
    pub fn any_archive() -> Self {
        Self {
            prefix: None,
            extension: RELEASE_FILE_EXTENSION.to_string(),
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        let prefix_ok = self
            .prefix
            .as_deref()
            .map_or(true, |p| file_name.starts_with(p));
        prefix_ok && file_name.ends_with(&self.extension)
    }
}

impl Default for ReleaseFilePattern {
    fn default() -> Self {
        Self::prefixed()
    }
}

impl fmt::Display for ReleaseFilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.prefix.as_deref().unwrap_or(""), self.extension)
    }
}

/// Extract the release number from an archive name.
///
/// `Loinc_2.78.zip` and `Loinc_2.78-complete.zip` both yield `2.78`.
pub fn release_version_from_filename(file_name: &str) -> Result<String, ReleaseError> {
    let re = Regex::new(r"^Loinc_(\d+\.\d+)(?:-[^.]+)?\.zip$").expect("valid regex");
    re.captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ReleaseError::UnrecognizedFileName(file_name.to_string()))
}

/// Find the first release number (`Loinc_X.Y` or `Loinc-X.Y`) mentioned in
/// a block of text, such as the public downloads page.
pub fn first_release_version_in(text: &str) -> Option<String> {
    let re = Regex::new(r"Loinc[_-]([0-9]+\.[0-9]+)").expect("valid regex");
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
