//! Read-only access to the manuscript tree.
//!
//! The store hands out [`Fragment`]s by manuscript-relative path and can scan
//! the tree for fragment candidates. It never writes: fragments are authored
//! externally and the pipeline only consumes them.

use super::fragment::{Fragment, SectionKind};
use anyhow::{anyhow, Context, Result};
use globset::GlobMatcher;
use ignore::Walk;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("fragment not found: {path}")]
    NotFound { path: PathBuf },
    #[error("fragment {path} is outside the section directories (front/, chapters/, appendices/, back/)")]
    UnknownSection { path: PathBuf },
    #[error("failed to read fragment {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Read-only fragment store rooted at the manuscript directory.
#[derive(Debug)]
pub struct FragmentStore {
    root: PathBuf,
    block: Vec<GlobMatcher>,
}

impl FragmentStore {
    /// Open a store rooted at the manuscript directory.
    pub fn open<P: Into<PathBuf>>(root: P, block: Vec<GlobMatcher>) -> Result<FragmentStore> {
        let root: PathBuf = root.into();

        if !root.is_dir() {
            return Err(anyhow!(
                "Manuscript path {} isn't a directory!",
                root.display()
            ));
        }

        let root = std::fs::canonicalize(&root)
            .with_context(|| format!("Failed to canonicalize {}", root.display()))?;

        Ok(FragmentStore { root, block })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read one fragment by manuscript-relative path.
    pub fn read(&self, path: &Path) -> std::result::Result<Fragment, StoreError> {
        // relative paths only, and no escaping the manuscript root
        if path.is_absolute()
            || path
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(StoreError::UnknownSection {
                path: path.to_path_buf(),
            });
        }

        if SectionKind::from_path(path).is_none() {
            return Err(StoreError::UnknownSection {
                path: path.to_path_buf(),
            });
        }

        let full_path = self.root.join(path);
        let content = match std::fs::read_to_string(&full_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        log::debug!("read fragment {} ({} bytes)", path.display(), content.len());

        Fragment::new(path, content).ok_or_else(|| StoreError::UnknownSection {
            path: path.to_path_buf(),
        })
    }

    /// Scan the manuscript tree for fragment candidates, in section order.
    ///
    /// Walks the tree honouring ignore files, skips blocked globs, and keeps
    /// only Markdown files under the section directories. Used by the wizard
    /// and `status`; resolution itself always goes through a manifest.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        let mut candidates: Vec<(SectionKind, Fragment)> = Vec::default();

        for entry in Walk::new(&self.root) {
            let entry = entry.with_context(|| "Failed to walk manuscript directory")?;

            if self.block.iter().any(|glob| glob.is_match(entry.path())) {
                continue;
            }

            let path = entry.into_path();
            if !path.is_file() || path.extension().map(|e| e != "md").unwrap_or(true) {
                continue;
            }

            let rel = match path.strip_prefix(&self.root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };

            if let Some(fragment) = Fragment::new(rel, String::new()) {
                candidates.push((fragment.kind, fragment));
            }
        }

        candidates.sort_by(|(ka, fa), (kb, fb)| {
            ka.cmp(kb).then_with(|| fa.order_key.cmp(&fb.order_key))
        });

        Ok(candidates.into_iter().map(|(_, f)| f.path).collect())
    }
}
