//! Browser session teardown
//!
//! Closes the browser, waits for the process to exit and removes its
//! user-data directory. Failures are collected, never raised: a seed whose
//! cleanup stumbles is still a finished seed.

use chromiumoxide::Browser;
use log::{debug, warn};
use std::path::Path;
use tokio::task::JoinHandle;

/// Result of cleanup operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    /// All cleanup operations succeeded
    Success,
    /// Some cleanup operations failed, with error details
    PartialFailure(Vec<String>),
}

/// Close `browser`, stop its handler task and delete `user_data_dir`
pub async fn cleanup_browser_session(
    mut browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: &Path,
) -> CleanupResult {
    let mut errors = Vec::new();

    if let Err(e) = browser.close().await {
        warn!(target: "campusscrape::cleanup", "Failed to close browser: {e}");
        errors.push(format!("Browser close failed: {e}"));
    }

    // Wait for the process to exit so the profile directory is unlocked
    if let Err(e) = browser.wait().await {
        warn!(target: "campusscrape::cleanup", "Failed to wait for browser exit: {e}");
        errors.push(format!("Browser wait failed: {e}"));
    }

    handler.abort();

    if let Err(e) = tokio::fs::remove_dir_all(user_data_dir).await {
        warn!(
            target: "campusscrape::cleanup",
            "Failed to remove profile {}: {e}",
            user_data_dir.display()
        );
        errors.push(format!("Directory cleanup failed: {e}"));
    } else {
        debug!(target: "campusscrape::cleanup", "Removed profile {}", user_data_dir.display());
    }

    if errors.is_empty() {
        CleanupResult::Success
    } else {
        CleanupResult::PartialFailure(errors)
    }
}
