//! Source-control hosting channel.
//!
//! The host is an opaque remote that accepts a tagged commit plus named
//! assets attached to that tag; this channel's whole interaction is
//! "create tag" and "attach artifact to tag". The tag is created in the
//! manuscript repository; artifacts are staged as the tag's named assets
//! under `.bindery/attachments/`, where the hosting upload picks them up.
//! Tag creation is idempotent so a retried attempt after a transient push
//! failure doesn't trip over its own earlier tag.

use super::{classify_io, Channel, SyncContext, SyncError};
use crate::release::Release;
use std::path::PathBuf;

pub struct GitChannel {
    name: String,
    repo_root: PathBuf,
    /// Remote to push the tag to; `None` leaves the tag local
    remote: Option<String>,
}

impl GitChannel {
    pub fn new(name: String, repo_root: PathBuf, remote: Option<String>) -> GitChannel {
        GitChannel {
            name,
            repo_root,
            remote,
        }
    }

    fn tag_name(release: &Release) -> String {
        format!("v{}", release.version)
    }

    fn create_tag(&self, repo: &git2::Repository, release: &Release) -> Result<(), SyncError> {
        let tag = Self::tag_name(release);

        // retried attempt after a failed push: the tag is already there
        if repo.find_reference(&format!("refs/tags/{tag}")).is_ok() {
            log::debug!("tag {} already exists in {}", tag, self.repo_root.display());
            return Ok(());
        }

        let head = repo.head().map_err(map_git)?;
        let head_oid = head
            .resolve()
            .map_err(map_git)?
            .target()
            .ok_or_else(|| SyncError::Permanent("HEAD doesn't have an OID reference".to_string()))?;
        let head_object = repo.find_object(head_oid, None).map_err(map_git)?;

        let tagger = repo
            .signature()
            .or_else(|_| git2::Signature::now("bindery", "bindery@localhost"))
            .map_err(map_git)?;

        let message = if release.notes.trim().is_empty() {
            format!("Release {}", release.version)
        } else {
            format!("Release {}\n\n{}", release.version, release.notes.trim())
        };

        repo.tag(&tag, &head_object, &tagger, &message, false)
            .map_err(map_git)?;
        Ok(())
    }

    /// Stage the release's artifacts as the tag's named assets.
    fn attach_artifacts(&self, release: &Release) -> Result<(), SyncError> {
        let attach_dir = self
            .repo_root
            .join(".bindery")
            .join("attachments")
            .join(Self::tag_name(release));
        std::fs::create_dir_all(&attach_dir)
            .map_err(|e| classify_io("create attachment directory", e))?;

        for artifact in &release.artifacts {
            let source = self.repo_root.join(&artifact.path);
            let file_name = artifact
                .path
                .file_name()
                .ok_or_else(|| {
                    SyncError::Permanent(format!(
                        "artifact path {} has no file name",
                        artifact.path.display()
                    ))
                })?;
            std::fs::copy(&source, attach_dir.join(file_name)).map_err(|e| {
                classify_io(&format!("attach artifact {}", artifact.path.display()), e)
            })?;
        }

        Ok(())
    }

    fn push_tag(&self, repo: &git2::Repository, release: &Release) -> Result<(), SyncError> {
        let remote_name = match &self.remote {
            Some(remote) => remote,
            None => return Ok(()),
        };

        let mut remote = repo.find_remote(remote_name).map_err(map_git)?;
        let tag = Self::tag_name(release);
        let refspec = format!("refs/tags/{tag}:refs/tags/{tag}");
        remote.push(&[refspec.as_str()], None).map_err(map_git)?;
        Ok(())
    }
}

impl Channel for GitChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn sync(&self, release: &Release, ctx: &SyncContext) -> Result<(), SyncError> {
        ctx.check_deadline()?;

        let repo = git2::Repository::open(&self.repo_root).map_err(|e| {
            SyncError::Permanent(format!(
                "failed to open {} as a git repository: {}",
                self.repo_root.display(),
                e.message()
            ))
        })?;

        self.create_tag(&repo, release)?;
        self.attach_artifacts(release)?;

        ctx.check_deadline()?;
        self.push_tag(&repo, release)?;

        Ok(())
    }
}

/// Network-ish failures are worth retrying; everything else needs an
/// operator.
fn map_git(e: git2::Error) -> SyncError {
    use git2::ErrorClass;
    match e.class() {
        ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Os => {
            SyncError::Transient(e.message().to_string())
        }
        _ => SyncError::Permanent(e.message().to_string()),
    }
}
