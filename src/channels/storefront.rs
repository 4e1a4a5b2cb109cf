//! Commercial distribution channel.
//!
//! The platform is an opaque sink that accepts a manuscript directory plus
//! the two manifest files and regenerates its own storefront output from
//! them; this channel's whole interaction is mirroring the source tree into
//! the platform's drop directory and triggering regeneration from the
//! latest synced source.

use super::{classify_io, Channel, SyncContext, SyncError};
use crate::release::Release;
use ignore::Walk;
use std::path::{Path, PathBuf};

pub struct StorefrontChannel {
    name: String,
    manuscript_root: PathBuf,
    manifest_dir: PathBuf,
    /// The platform's drop directory
    dest: PathBuf,
}

impl StorefrontChannel {
    pub fn new(
        name: String,
        manuscript_root: PathBuf,
        manifest_dir: PathBuf,
        dest: PathBuf,
    ) -> StorefrontChannel {
        StorefrontChannel {
            name,
            manuscript_root,
            manifest_dir,
            dest,
        }
    }

    /// Mirror the manuscript tree into `<dest>/source/`, skipping pipeline
    /// output and bookkeeping.
    fn mirror_source(&self, ctx: &SyncContext) -> Result<usize, SyncError> {
        let source_dest = self.dest.join("source");
        let mut copied = 0usize;

        for entry in Walk::new(&self.manuscript_root) {
            ctx.check_deadline()?;

            let entry =
                entry.map_err(|e| SyncError::Permanent(format!("failed to walk manuscript: {e}")))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let rel = match path.strip_prefix(&self.manuscript_root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            if is_pipeline_output(rel) {
                continue;
            }

            let target = source_dest.join(rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| classify_io("create destination directory", e))?;
            }
            std::fs::copy(path, &target)
                .map_err(|e| classify_io(&format!("copy {}", rel.display()), e))?;
            copied += 1;
        }

        Ok(copied)
    }

    fn copy_manifests(&self) -> Result<(), SyncError> {
        let manifest_dest = self.dest.join("manifests");
        std::fs::create_dir_all(&manifest_dest)
            .map_err(|e| classify_io("create manifest directory", e))?;

        for target in ["full", "sample"] {
            let file = format!("{target}.txt");
            let source = self.manifest_dir.join(&file);
            std::fs::copy(&source, manifest_dest.join(&file))
                .map_err(|e| classify_io(&format!("copy manifest {file}"), e))?;
        }

        Ok(())
    }

    /// Ask the platform to regenerate from what was just synced.
    fn write_trigger(&self, release: &Release) -> Result<(), SyncError> {
        let trigger = format!(
            "version = {}\nrequested_at = {}\n",
            release.version,
            chrono::Utc::now().to_rfc3339()
        );
        std::fs::write(self.dest.join("regenerate.trigger"), trigger)
            .map_err(|e| classify_io("write regeneration trigger", e))
    }
}

impl Channel for StorefrontChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn sync(&self, release: &Release, ctx: &SyncContext) -> Result<(), SyncError> {
        ctx.check_deadline()?;

        // a missing drop directory means the channel is misconfigured, not
        // that the platform is momentarily away
        match self.dest.parent() {
            Some(parent) if parent.as_os_str().is_empty() || parent.is_dir() => {}
            _ => {
                return Err(SyncError::Permanent(format!(
                    "drop directory {} has no existing parent",
                    self.dest.display()
                )));
            }
        }
        std::fs::create_dir_all(&self.dest)
            .map_err(|e| classify_io("create drop directory", e))?;

        let copied = self.mirror_source(ctx)?;
        log::debug!("mirrored {} file(s) to channel '{}'", copied, self.name);

        self.copy_manifests()?;
        ctx.check_deadline()?;
        self.write_trigger(release)?;

        Ok(())
    }
}

fn is_pipeline_output(rel: &Path) -> bool {
    rel.starts_with("build") || rel.starts_with(".bindery") || rel.starts_with(".git")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channels::test::published_release;

    fn scaffold_manuscript() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["chapters", "manifests", "build/full", ".bindery"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        std::fs::write(dir.path().join("chapters/01-intro.md"), "# Intro\n").unwrap();
        std::fs::write(dir.path().join("manifests/full.txt"), "chapters/01-intro.md\n").unwrap();
        std::fs::write(dir.path().join("manifests/sample.txt"), "chapters/01-intro.md\n").unwrap();
        std::fs::write(dir.path().join("build/full/full.html"), "<html/>").unwrap();
        std::fs::write(dir.path().join(".bindery/releases.json"), "[]").unwrap();
        dir
    }

    #[test]
    fn sync_mirrors_source_and_manifests_and_triggers_regeneration() {
        let manuscript = scaffold_manuscript();
        let platform = tempfile::tempdir().unwrap();
        let dest = platform.path().join("drop");

        let channel = StorefrontChannel::new(
            "storefront".to_string(),
            manuscript.path().to_path_buf(),
            manuscript.path().join("manifests"),
            dest.clone(),
        );

        channel
            .sync(&published_release("1.0.0"), &SyncContext::new(None))
            .unwrap();

        assert!(dest.join("source/chapters/01-intro.md").is_file());
        assert!(dest.join("manifests/full.txt").is_file());
        assert!(dest.join("manifests/sample.txt").is_file());

        let trigger = std::fs::read_to_string(dest.join("regenerate.trigger")).unwrap();
        assert!(trigger.contains("version = 1.0.0"));
    }

    #[test]
    fn pipeline_output_is_not_mirrored() {
        let manuscript = scaffold_manuscript();
        let platform = tempfile::tempdir().unwrap();
        let dest = platform.path().join("drop");

        let channel = StorefrontChannel::new(
            "storefront".to_string(),
            manuscript.path().to_path_buf(),
            manuscript.path().join("manifests"),
            dest.clone(),
        );
        channel
            .sync(&published_release("1.0.0"), &SyncContext::new(None))
            .unwrap();

        assert!(!dest.join("source/build").exists());
        assert!(!dest.join("source/.bindery").exists());
    }

    #[test]
    fn a_missing_drop_parent_is_a_permanent_failure() {
        let manuscript = scaffold_manuscript();

        let channel = StorefrontChannel::new(
            "storefront".to_string(),
            manuscript.path().to_path_buf(),
            manuscript.path().join("manifests"),
            PathBuf::from("/nonexistent/platform/drop"),
        );
        let err = channel
            .sync(&published_release("1.0.0"), &SyncContext::new(None))
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn an_expired_deadline_aborts_before_any_transfer() {
        let manuscript = scaffold_manuscript();
        let platform = tempfile::tempdir().unwrap();
        let dest = platform.path().join("drop");

        let channel = StorefrontChannel::new(
            "storefront".to_string(),
            manuscript.path().to_path_buf(),
            manuscript.path().join("manifests"),
            dest.clone(),
        );

        let ctx = SyncContext::new(Some(std::time::Duration::ZERO));
        std::thread::sleep(std::time::Duration::from_millis(5));
        let err = channel
            .sync(&published_release("1.0.0"), &ctx)
            .unwrap_err();
        assert!(err.is_transient());
        assert!(!dest.exists());
    }
}
