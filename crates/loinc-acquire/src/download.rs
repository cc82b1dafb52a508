use loinc_model::ReleaseFilePattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

/// How often and how long to look for the downloaded archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Create the download directory (and parents) if needed and return its
/// absolute path. Existing directories and their contents are left alone.
pub fn prepare_download_dir(path: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(path)?;
    fs::canonicalize(path)
}

/// Every entry in `dir` whose name satisfies `pattern`, in name order.
pub fn list_releases(dir: &Path, pattern: &ReleaseFilePattern) -> io::Result<Vec<PathBuf>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| pattern.matches(name))
        .collect();
    names.sort();
    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}

/// The first entry in `dir` whose name satisfies `pattern`, in name order.
pub fn scan_for_release(dir: &Path, pattern: &ReleaseFilePattern) -> io::Result<Option<PathBuf>> {
    Ok(list_releases(dir, pattern)?.into_iter().next())
}

/// Look for a release archive that is already on disk.
///
/// A missing directory counts as "nothing downloaded yet".
pub fn find_local_release(dir: &Path, pattern: &ReleaseFilePattern) -> io::Result<Option<PathBuf>> {
    match scan_for_release(dir, pattern) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        other => other,
    }
}

/// Poll `dir` every `policy.interval` until an entry matches `pattern` or
/// `policy.timeout` has elapsed.
///
/// Returns the matching path, or `None` on timeout. A zero timeout returns
/// `None` without looking. The last sleep is cut short at the deadline.
/// Only names are checked: a file the browser is
/// still flushing under its final name counts as downloaded.
pub async fn wait_for_download(
    dir: &Path,
    pattern: &ReleaseFilePattern,
    policy: WaitPolicy,
) -> io::Result<Option<PathBuf>> {
    let start = Instant::now();
    let mut polls = 0u32;

    while start.elapsed() < policy.timeout {
        polls += 1;
        if let Some(path) = scan_for_release(dir, pattern)? {
            tracing::debug!(polls, elapsed = ?start.elapsed(), "Matched {pattern}");
            return Ok(Some(path));
        }
        let remaining = policy.timeout.saturating_sub(start.elapsed());
        tokio::time::sleep(policy.interval.min(remaining)).await;
    }

    tracing::debug!(polls, timeout = ?policy.timeout, "No file matched {pattern}");
    Ok(None)
}
