use chrono::Local;
use std::process::Command;

/// Run git with `args`, returning trimmed stdout on success.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Tracked files modified since HEAD; untracked files do not count.
fn tree_is_modified() -> bool {
    Command::new("git")
        .args(["diff", "--quiet", "HEAD"])
        .status()
        .map(|status| !status.success())
        .unwrap_or(false)
}

fn main() {
    let build_hash = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(commit) if tree_is_modified() => {
            format!("{commit}-dirty-{}", Local::now().format("%Y%m%d-%H%M%S"))
        }
        Some(commit) => commit,
        None => "unknown".to_string(),
    };
    println!("cargo:rustc-env=BUILD_HASH={build_hash}");

    // Workspace root (and .git) is two levels up
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");
}
