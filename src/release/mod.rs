//! Release management.
//!
//! Releases live in an append-only ledger at `.bindery/releases.json`:
//! immutable, versioned bundles of artifacts plus a changelog entry. Version
//! assignment is serialized behind a mutex so concurrent attempts can't race
//! past the strict-monotonicity check. A release has exactly two states —
//! `draft` and `published` — and the only legal transition is the one-way
//! promotion from the former to the latter. Corrections require a new
//! version, never an edit in place.

pub mod changelog;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("version {proposed} is not greater than the latest release {latest}")]
    VersionRegression { proposed: Version, latest: Version },
    #[error("no release with version {0}")]
    UnknownVersion(Version),
    #[error("release {0} is already published")]
    AlreadyPublished(Version),
    #[error("release {0} has no artifacts")]
    NoArtifacts(Version),
    #[error("failed to access the release ledger: {0}")]
    Io(#[from] std::io::Error),
    #[error("release ledger is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    Draft,
    Published,
}

/// One artifact as recorded in a release: the payload stays on disk, the
/// ledger keeps its identity and content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub target: String,
    pub format: String,
    pub path: PathBuf,
    pub sha256: String,
    pub size: u64,
}

/// An immutable, versioned bundle of artifacts plus changelog text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub version: Version,
    pub state: ReleaseState,
    pub created_at: DateTime<Utc>,
    pub notes: String,
    pub artifacts: Vec<ArtifactRecord>,
}

/// The release ledger: load, query, append. Single writer at a time.
pub struct ReleaseStore {
    ledger_path: PathBuf,
    changelog_path: PathBuf,
    releases: Mutex<Vec<Release>>,
}

impl ReleaseStore {
    /// Open (or start) the ledger under `<root>/.bindery/releases.json`.
    pub fn open(root: &Path) -> Result<ReleaseStore, ReleaseError> {
        let ledger_path = root.join(".bindery").join("releases.json");
        let changelog_path = root.join("CHANGELOG.md");

        let releases = match std::fs::read_to_string(&ledger_path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(ReleaseStore {
            ledger_path,
            changelog_path,
            releases: Mutex::new(releases),
        })
    }

    /// Create a draft release, enforcing strict version monotonicity.
    ///
    /// On a `VersionRegression` nothing is committed: no ledger entry, no
    /// changelog line.
    pub fn create_draft(
        &self,
        version: Version,
        artifacts: Vec<ArtifactRecord>,
        notes: String,
    ) -> Result<Release, ReleaseError> {
        if artifacts.is_empty() {
            return Err(ReleaseError::NoArtifacts(version));
        }

        let mut releases = self.releases.lock().expect("release ledger lock");

        if let Some(latest) = releases.iter().map(|r| &r.version).max() {
            if version <= *latest {
                return Err(ReleaseError::VersionRegression {
                    proposed: version,
                    latest: latest.clone(),
                });
            }
        }

        let release = Release {
            version,
            state: ReleaseState::Draft,
            created_at: Utc::now(),
            notes,
            artifacts,
        };

        releases.push(release.clone());
        self.persist(&releases)?;
        changelog::append(&self.changelog_path, &release)?;

        log::debug!("recorded draft release {}", release.version);
        Ok(release)
    }

    /// Promote a draft to published. One-way; publishing twice is an error.
    pub fn publish(&self, version: &Version) -> Result<Release, ReleaseError> {
        let mut releases = self.releases.lock().expect("release ledger lock");

        let release = releases
            .iter_mut()
            .find(|r| r.version == *version)
            .ok_or_else(|| ReleaseError::UnknownVersion(version.clone()))?;

        if release.state == ReleaseState::Published {
            return Err(ReleaseError::AlreadyPublished(version.clone()));
        }

        release.state = ReleaseState::Published;
        let release = release.clone();
        self.persist(&releases)?;
        Ok(release)
    }

    /// The most recent release of any state, for inspection.
    pub fn latest(&self) -> Option<Release> {
        let releases = self.releases.lock().expect("release ledger lock");
        releases.iter().max_by(|a, b| a.version.cmp(&b.version)).cloned()
    }

    /// The most recent published release, the only kind channels accept.
    pub fn latest_published(&self) -> Option<Release> {
        let releases = self.releases.lock().expect("release ledger lock");
        releases
            .iter()
            .filter(|r| r.state == ReleaseState::Published)
            .max_by(|a, b| a.version.cmp(&b.version))
            .cloned()
    }

    pub fn get(&self, version: &Version) -> Option<Release> {
        let releases = self.releases.lock().expect("release ledger lock");
        releases.iter().find(|r| r.version == *version).cloned()
    }

    fn persist(&self, releases: &[Release]) -> Result<(), ReleaseError> {
        if let Some(parent) = self.ledger_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(releases)?;
        std::fs::write(&self.ledger_path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record() -> ArtifactRecord {
        ArtifactRecord {
            target: "full".to_string(),
            format: "html".to_string(),
            path: PathBuf::from("build/full/full.html"),
            sha256: "ab".repeat(32),
            size: 1024,
        }
    }

    fn version(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn versions_are_strictly_increasing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();

        store
            .create_draft(version("1.0.0"), vec![record()], "first".into())
            .unwrap();

        // same version rejected
        let err = store
            .create_draft(version("1.0.0"), vec![record()], "again".into())
            .unwrap_err();
        assert!(matches!(err, ReleaseError::VersionRegression { .. }));

        // lower version rejected
        let err = store
            .create_draft(version("0.9.0"), vec![record()], "lower".into())
            .unwrap_err();
        assert!(matches!(err, ReleaseError::VersionRegression { .. }));

        // next patch accepted
        store
            .create_draft(version("1.0.1"), vec![record()], "patch".into())
            .unwrap();
        assert_eq!(store.latest().unwrap().version, version("1.0.1"));
    }

    #[test]
    fn a_rejected_release_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();

        store
            .create_draft(version("1.0.0"), vec![record()], "first".into())
            .unwrap();
        let changelog_before =
            std::fs::read_to_string(dir.path().join("CHANGELOG.md")).unwrap();

        let _ = store
            .create_draft(version("0.9.0"), vec![record()], "regression".into())
            .unwrap_err();

        // reopen: ledger on disk has exactly one release and the changelog
        // didn't grow
        let reopened = ReleaseStore::open(dir.path()).unwrap();
        assert_eq!(reopened.latest().unwrap().version, version("1.0.0"));
        assert!(reopened.get(&version("0.9.0")).is_none());
        let changelog_after =
            std::fs::read_to_string(dir.path().join("CHANGELOG.md")).unwrap();
        assert_eq!(changelog_before, changelog_after);
    }

    #[test]
    fn publish_is_one_way() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();

        store
            .create_draft(version("1.0.0"), vec![record()], "first".into())
            .unwrap();

        assert!(store.latest_published().is_none());

        let published = store.publish(&version("1.0.0")).unwrap();
        assert_eq!(published.state, ReleaseState::Published);
        assert_eq!(store.latest_published().unwrap().version, version("1.0.0"));

        let err = store.publish(&version("1.0.0")).unwrap_err();
        assert!(matches!(err, ReleaseError::AlreadyPublished(_)));
    }

    #[test]
    fn publishing_an_unknown_version_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();
        let err = store.publish(&version("3.0.0")).unwrap_err();
        assert!(matches!(err, ReleaseError::UnknownVersion(_)));
    }

    #[test]
    fn ledger_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = ReleaseStore::open(dir.path()).unwrap();
            store
                .create_draft(version("1.0.0"), vec![record()], "first".into())
                .unwrap();
            store.publish(&version("1.0.0")).unwrap();
        }

        let store = ReleaseStore::open(dir.path()).unwrap();
        let release = store.latest_published().unwrap();
        assert_eq!(release.version, version("1.0.0"));
        assert_eq!(release.artifacts.len(), 1);
        assert_eq!(release.artifacts[0].sha256, "ab".repeat(32));
    }

    #[test]
    fn a_release_needs_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReleaseStore::open(dir.path()).unwrap();
        let err = store
            .create_draft(version("1.0.0"), Vec::default(), "empty".into())
            .unwrap_err();
        assert!(matches!(err, ReleaseError::NoArtifacts(_)));
    }
}
