//! Manifest loading and resolution.
//!
//! A manifest is a plain ordered list of fragment paths, one per line, named
//! after its distribution target (`manifests/full.txt`, `manifests/sample.txt`).
//! Resolution preserves the declared order exactly — this is not a sorting
//! step — and fails loudly on anything a build shouldn't paper over: missing
//! fragments, duplicate entries, fragments outside the section directories,
//! or a sample that isn't a subsequence of the full work.

use super::fragment::Fragment;
use super::store::{FragmentStore, StoreError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The target whose manifest every other target must be a subsequence of.
pub const FULL_TARGET: &str = "full";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no manifest for target '{target}' (expected {path})")]
    ManifestNotFound { target: String, path: PathBuf },
    #[error("failed to read manifest for target '{target}': {source}")]
    ManifestIo {
        target: String,
        source: std::io::Error,
    },
    #[error("manifest '{target}' lists {path} more than once")]
    DuplicateEntry { target: String, path: PathBuf },
    #[error("manifest '{target}' names a missing fragment: {path}")]
    MissingFragment { target: String, path: PathBuf },
    #[error(transparent)]
    Store(StoreError),
    #[error(
        "manifest '{target}' is not a subsequence of 'full': {path} is out of order or absent from the full work"
    )]
    NotSubsequence { target: String, path: PathBuf },
}

/// An ordered list naming which fragments belong to a distribution target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub target: String,
    pub entries: Vec<PathBuf>,
}

impl Manifest {
    /// Load `<manifest_dir>/<target>.txt`.
    pub fn load(manifest_dir: &Path, target: &str) -> Result<Manifest, ResolveError> {
        let path = manifest_dir.join(format!("{target}.txt"));
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ResolveError::ManifestNotFound {
                    target: target.to_string(),
                    path,
                });
            }
            Err(e) => {
                return Err(ResolveError::ManifestIo {
                    target: target.to_string(),
                    source: e,
                });
            }
        };
        Manifest::parse(target, &contents)
    }

    /// Parse manifest text: one fragment path per line, `#` comments and
    /// blank lines skipped. Duplicates are rejected here, before any
    /// fragment is touched.
    pub fn parse(target: &str, contents: &str) -> Result<Manifest, ResolveError> {
        let mut entries: Vec<PathBuf> = Vec::default();
        let mut seen: HashSet<PathBuf> = HashSet::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let path = PathBuf::from(line);
            if !seen.insert(path.clone()) {
                return Err(ResolveError::DuplicateEntry {
                    target: target.to_string(),
                    path,
                });
            }
            entries.push(path);
        }

        Ok(Manifest {
            target: target.to_string(),
            entries,
        })
    }

    /// Check that this manifest's entries appear in `other` in the same
    /// relative order. Returns the first offending entry.
    pub fn subsequence_of(&self, other: &Manifest) -> Result<(), PathBuf> {
        let mut remaining = other.entries.iter();
        'entries: for entry in &self.entries {
            for candidate in remaining.by_ref() {
                if candidate == entry {
                    continue 'entries;
                }
            }
            return Err(entry.clone());
        }
        Ok(())
    }
}

/// Resolve a target's manifest to fragments, in manifest order.
///
/// Targets other than `full` are additionally validated to be subsequences
/// of the full manifest: a sample is a preview of the full work, never
/// content absent from it. Pure read; no side effects.
pub fn resolve(
    manifest_dir: &Path,
    target: &str,
    store: &FragmentStore,
) -> Result<Vec<Fragment>, ResolveError> {
    let manifest = Manifest::load(manifest_dir, target)?;

    if target != FULL_TARGET {
        let full = Manifest::load(manifest_dir, FULL_TARGET)?;
        if let Err(path) = manifest.subsequence_of(&full) {
            return Err(ResolveError::NotSubsequence {
                target: manifest.target.clone(),
                path,
            });
        }
    }

    let mut fragments = Vec::with_capacity(manifest.entries.len());
    for path in &manifest.entries {
        let fragment = store.read(path).map_err(|e| match e {
            StoreError::NotFound { path } => ResolveError::MissingFragment {
                target: target.to_string(),
                path,
            },
            e => ResolveError::Store(e),
        })?;
        fragments.push(fragment);
    }

    log::debug!(
        "resolved target '{}': {} fragment(s)",
        target,
        fragments.len()
    );

    Ok(fragments)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    fn scaffold() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("can create temp dir");
        for sub in ["front", "chapters", "manifests"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
        }
        std::fs::write(dir.path().join("front/00-title.md"), "# Title\n").unwrap();
        std::fs::write(dir.path().join("front/01-preface.md"), "# Preface\n").unwrap();
        std::fs::write(dir.path().join("chapters/01-one.md"), "# One\n").unwrap();
        std::fs::write(dir.path().join("chapters/02-two.md"), "# Two\n").unwrap();
        dir
    }

    fn write_manifest(dir: &tempfile::TempDir, target: &str, lines: &[&str]) {
        std::fs::write(
            dir.path().join("manifests").join(format!("{target}.txt")),
            lines.join("\n"),
        )
        .unwrap();
    }

    fn store(dir: &tempfile::TempDir) -> FragmentStore {
        FragmentStore::open(dir.path(), Vec::default()).unwrap()
    }

    #[test]
    fn resolution_preserves_manifest_order_exactly() {
        let dir = scaffold();
        // deliberately not in order-key order
        write_manifest(
            &dir,
            "full",
            &[
                "chapters/02-two.md",
                "front/00-title.md",
                "chapters/01-one.md",
            ],
        );

        let fragments = resolve(&dir.path().join("manifests"), "full", &store(&dir)).unwrap();
        let paths: Vec<_> = fragments.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("chapters/02-two.md"),
                PathBuf::from("front/00-title.md"),
                PathBuf::from("chapters/01-one.md"),
            ]
        );
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let manifest = Manifest::parse(
            "full",
            "# the full book\n\nfront/00-title.md\n\n# chapters\nchapters/01-one.md\n",
        )
        .unwrap();
        assert_eq!(manifest.entries.len(), 2);
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let err = Manifest::parse("full", "chapters/01-one.md\nchapters/01-one.md\n").unwrap_err();
        assert!(matches!(err, ResolveError::DuplicateEntry { .. }));
    }

    #[test]
    fn missing_fragment_names_the_offender() {
        let dir = scaffold();
        write_manifest(&dir, "full", &["chapters/01-one.md", "chapters/09-none.md"]);

        let err = resolve(&dir.path().join("manifests"), "full", &store(&dir)).unwrap_err();
        match err {
            ResolveError::MissingFragment { path, .. } => {
                assert_eq!(path, PathBuf::from("chapters/09-none.md"));
            }
            other => panic!("expected MissingFragment, got {other:?}"),
        }
    }

    #[test]
    fn sample_must_be_a_subsequence_of_full() {
        let dir = scaffold();
        write_manifest(
            &dir,
            "full",
            &[
                "front/00-title.md",
                "front/01-preface.md",
                "chapters/01-one.md",
                "chapters/02-two.md",
            ],
        );
        // subsequence, same relative order: valid
        write_manifest(&dir, "sample", &["front/01-preface.md", "chapters/01-one.md"]);
        assert!(resolve(&dir.path().join("manifests"), "sample", &store(&dir)).is_ok());

        // order violated: invalid
        write_manifest(&dir, "sample", &["chapters/01-one.md", "front/01-preface.md"]);
        let err = resolve(&dir.path().join("manifests"), "sample", &store(&dir)).unwrap_err();
        assert!(matches!(err, ResolveError::NotSubsequence { .. }));
    }

    #[test]
    fn sample_cannot_contain_content_absent_from_full() {
        let dir = scaffold();
        write_manifest(&dir, "full", &["chapters/01-one.md"]);
        write_manifest(&dir, "sample", &["chapters/02-two.md"]);

        let err = resolve(&dir.path().join("manifests"), "sample", &store(&dir)).unwrap_err();
        match err {
            ResolveError::NotSubsequence { path, .. } => {
                assert_eq!(path, PathBuf::from("chapters/02-two.md"));
            }
            other => panic!("expected NotSubsequence, got {other:?}"),
        }
    }

    #[test]
    fn absent_manifest_is_reported_by_target() {
        let dir = scaffold();
        let err = resolve(&dir.path().join("manifests"), "full", &store(&dir)).unwrap_err();
        assert!(matches!(err, ResolveError::ManifestNotFound { .. }));
    }

    #[test]
    fn subsequence_check_is_order_sensitive() {
        let full = Manifest {
            target: "full".into(),
            entries: vec!["title".into(), "preface".into(), "ch1".into(), "ch2".into()],
        };
        let good = Manifest {
            target: "sample".into(),
            entries: vec!["preface".into(), "ch1".into()],
        };
        let bad = Manifest {
            target: "sample".into(),
            entries: vec!["ch1".into(), "preface".into()],
        };

        assert!(good.subsequence_of(&full).is_ok());
        assert_eq!(bad.subsequence_of(&full), Err(PathBuf::from("preface")));
    }

    #[test]
    fn unknown_section_in_manifest_is_rejected() {
        let dir = scaffold();
        std::fs::write(dir.path().join("notes.md"), "scratch\n").unwrap();
        write_manifest(&dir, "full", &["notes.md"]);

        let err = resolve(&dir.path().join("manifests"), "full", &store(&dir)).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Store(StoreError::UnknownSection { .. })
        ));
    }

    #[test]
    fn resolve_is_a_pure_read() {
        let dir = scaffold();
        write_manifest(&dir, "full", &["chapters/01-one.md"]);

        let before = std::fs::read_to_string(dir.path().join("chapters/01-one.md")).unwrap();
        resolve(&dir.path().join("manifests"), "full", &store(&dir)).unwrap();
        let after = std::fs::read_to_string(dir.path().join("chapters/01-one.md")).unwrap();
        assert_eq!(before, after);
    }
}
