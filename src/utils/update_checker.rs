//! Update checker for `ParsecVDisplay`
//!
//! Fetches the latest GitHub release and reports its version when it is newer than
//! the running build. The fetch is blocking, so the window runs it on a worker thread
//! through [`spawn_check`] and handles the result back on the UI thread.

use crate::error::{Result, StringError, VdisplayError};
use semver::Version;
use serde::Deserialize;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// GitHub repository owner
pub const REPO_OWNER: &str = "nomi-san";

/// GitHub repository name
pub const REPO_NAME: &str = "parsec-vdd";

/// Page opened when the user accepts an update
pub const DOWNLOAD_URL: &str = "https://github.com/nomi-san/parsec-vdd/releases/latest";

/// GitHub API response for a release
#[derive(Debug, Deserialize)]
struct GitHubRelease {
    /// Release tag name (e.g., "v0.45.1" or "0.45.1")
    tag_name: String,
    /// Whether this is a prerelease
    #[serde(default)]
    prerelease: bool,
}

/// Source of "is there a newer version" answers
pub trait UpdateSource {
    /// `Ok(Some(version))` when a newer release exists, `Ok(None)` when up to date
    fn check_update(&self) -> Result<Option<String>>;
}

/// [`UpdateSource`] backed by the GitHub releases API
#[derive(Debug, Clone)]
pub struct UpdateChecker {
    /// GitHub repository owner
    repo_owner: String,
    /// GitHub repository name
    repo_name: String,
    /// Current application version
    current_version: Version,
}

impl UpdateChecker {
    /// Create a checker for `repo_owner/repo_name` against `current_version`
    pub fn new(
        repo_owner: impl Into<String>,
        repo_name: impl Into<String>,
        current_version: Version,
    ) -> Self {
        Self {
            repo_owner: repo_owner.into(),
            repo_name: repo_name.into(),
            current_version,
        }
    }

    /// Checker for this application's own repository and package version
    pub fn for_current_build() -> Result<Self> {
        let version = Version::parse(env!("CARGO_PKG_VERSION"))
            .map_err(|e| VdisplayError::UpdateCheckFailed(Box::new(e)))?;
        Ok(Self::new(REPO_OWNER, REPO_NAME, version))
    }

    /// Compare a release tag against the current version
    ///
    /// Returns the tag's version when it is newer. Prereleases never count as updates.
    pub fn newer_version(&self, tag_name: &str, prerelease: bool) -> Result<Option<Version>> {
        if prerelease {
            info!("Latest release {} is a prerelease, skipping", tag_name);
            return Ok(None);
        }

        let tag = tag_name.trim_start_matches('v');
        let latest = Version::parse(tag).map_err(|e| {
            warn!("Failed to parse version from tag '{}': {}", tag, e);
            VdisplayError::UpdateCheckFailed(Box::new(e))
        })?;

        info!(
            "Current version: {}, Latest version: {}",
            self.current_version, latest
        );

        if latest > self.current_version {
            info!("Update available: {} -> {}", self.current_version, latest);
            Ok(Some(latest))
        } else {
            info!("Application is up to date");
            Ok(None)
        }
    }
}

impl UpdateSource for UpdateChecker {
    fn check_update(&self) -> Result<Option<String>> {
        info!("Checking for updates from GitHub");

        let api_url = format!(
            "https://api.github.com/repos/{}/{}/releases/latest",
            self.repo_owner, self.repo_name
        );
        debug!("Fetching latest release from: {}", api_url);

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent(format!("ParsecVDisplay/{}", self.current_version))
            .build()
            .map_err(|e| {
                warn!("Failed to create HTTP client: {}", e);
                VdisplayError::UpdateCheckFailed(Box::new(e))
            })?;

        let response = client.get(&api_url).send().map_err(|e| {
            warn!("Failed to fetch latest release: {}", e);
            VdisplayError::UpdateCheckFailed(Box::new(e))
        })?;

        if !response.status().is_success() {
            warn!("GitHub API returned error status: {}", response.status());
            return Err(VdisplayError::UpdateCheckFailed(StringError::new(format!(
                "GitHub API returned error status: {}",
                response.status()
            ))));
        }

        let release: GitHubRelease = response.json().map_err(|e| {
            warn!("Failed to parse GitHub API response: {}", e);
            VdisplayError::UpdateCheckFailed(Box::new(e))
        })?;
        debug!("Fetched release: {:?}", release);

        Ok(self
            .newer_version(&release.tag_name, release.prerelease)?
            .map(|v| v.to_string()))
    }
}

/// Run `source.check_update()` on a worker thread and pass the result to `on_done`
///
/// `on_done` runs on the worker thread; GUI callers forward it to the event loop.
pub fn spawn_check<S, F>(source: S, on_done: F) -> std::io::Result<JoinHandle<()>>
where
    S: UpdateSource + Send + 'static,
    F: FnOnce(Result<Option<String>>) + Send + 'static,
{
    std::thread::Builder::new()
        .name("update-check".to_string())
        .spawn(move || on_done(source.check_update()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn checker(version: &str) -> UpdateChecker {
        UpdateChecker::new(REPO_OWNER, REPO_NAME, Version::parse(version).unwrap())
    }

    #[test]
    fn test_newer_tag_is_reported() {
        let result = checker("0.45.1").newer_version("v0.46.0", false).unwrap();
        assert_eq!(result, Some(Version::parse("0.46.0").unwrap()));
    }

    #[test]
    fn test_same_or_older_tag_is_up_to_date() {
        let checker = checker("0.45.1");
        assert_eq!(checker.newer_version("0.45.1", false).unwrap(), None);
        assert_eq!(checker.newer_version("v0.41.0", false).unwrap(), None);
    }

    #[test]
    fn test_prerelease_is_ignored() {
        assert_eq!(
            checker("0.45.1").newer_version("v1.0.0", true).unwrap(),
            None
        );
    }

    #[test]
    fn test_malformed_tag_is_an_error() {
        let result = checker("0.45.1").newer_version("nightly", false);
        assert!(matches!(result, Err(VdisplayError::UpdateCheckFailed(_))));
    }

    #[test]
    fn test_for_current_build_parses_package_version() {
        assert!(UpdateChecker::for_current_build().is_ok());
    }

    struct FixedSource(Option<String>);

    impl UpdateSource for FixedSource {
        fn check_update(&self) -> Result<Option<String>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_spawn_check_delivers_result() {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_check(FixedSource(Some("9.9.9".to_string())), move |result| {
            tx.send(result.unwrap()).unwrap();
        })
        .unwrap();
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap(), Some("9.9.9".to_string()));
    }
}
