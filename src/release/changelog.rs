//! Changelog entry formatting and appending.
//!
//! Each release appends one section to `CHANGELOG.md`: version, date, the
//! operator's notes, and the artifact manifest with content hashes so a
//! reader can verify what shipped.

use super::Release;
use std::path::Path;

const HEADER: &str = "# Changelog\n";

/// Format one release as a changelog section.
pub fn entry(release: &Release) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n## [{}] - {}\n",
        release.version,
        release.created_at.format("%Y-%m-%d")
    ));

    if !release.notes.trim().is_empty() {
        out.push('\n');
        out.push_str(release.notes.trim());
        out.push('\n');
    }

    out.push_str("\n### Artifacts\n\n");
    for artifact in &release.artifacts {
        out.push_str(&format!(
            "- `{}` ({} bytes, sha256 `{}`)\n",
            artifact.path.display(),
            artifact.size,
            &artifact.sha256[..12.min(artifact.sha256.len())]
        ));
    }

    out
}

/// Append a release's section to the changelog, creating the file with its
/// header on first use.
pub fn append(path: &Path, release: &Release) -> std::io::Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HEADER.to_string(),
        Err(e) => return Err(e),
    };

    std::fs::write(path, existing + &entry(release))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::release::{ArtifactRecord, ReleaseState};
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn release() -> Release {
        Release {
            version: semver::Version::parse("1.2.0").unwrap(),
            state: ReleaseState::Draft,
            created_at: Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap(),
            notes: "Second chapter rewritten.".to_string(),
            artifacts: vec![ArtifactRecord {
                target: "full".to_string(),
                format: "epub".to_string(),
                path: PathBuf::from("build/full/full.epub"),
                sha256: "deadbeef".repeat(8),
                size: 2048,
            }],
        }
    }

    #[test]
    fn entry_contains_version_date_notes_and_artifacts() {
        let text = entry(&release());
        assert!(text.contains("## [1.2.0] - 2026-08-06"));
        assert!(text.contains("Second chapter rewritten."));
        assert!(text.contains("build/full/full.epub"));
        assert!(text.contains("2048 bytes"));
    }

    #[test]
    fn append_creates_the_file_with_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CHANGELOG.md");

        append(&path, &release()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# Changelog"));
        assert!(contents.contains("## [1.2.0]"));

        // appending again keeps previous entries
        let mut second = release();
        second.version = semver::Version::parse("1.3.0").unwrap();
        append(&path, &second).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("## [1.2.0]"));
        assert!(contents.contains("## [1.3.0]"));
    }
}
