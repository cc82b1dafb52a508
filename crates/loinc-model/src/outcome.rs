use crate::release::ReleaseTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a fetch run ended.
///
/// `VersionNotFound` and `TimedOut` are soft outcomes: recognized terminal
/// states that are not errors. `Failed` carries the reason for anything
/// unexpected (missing page element, browser launch, navigation, I/O).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Downloaded { file: PathBuf },
    VersionNotFound { version: String },
    TimedOut,
    Failed { reason: String },
}

impl FetchOutcome {
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::VersionNotFound { .. } | Self::TimedOut)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Record of one fetch run, suitable for printing as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReport {
    pub target: ReleaseTarget,
    pub download_dir: PathBuf,
    #[serde(flatten)]
    pub outcome: FetchOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl FetchReport {
    pub fn elapsed_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
