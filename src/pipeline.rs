//! Build orchestration: resolve, assemble, render, write.
//!
//! One `build` invocation takes a target through the whole front half of
//! the pipeline and leaves artifacts (plus a small artifact manifest for
//! the release step) under `build/<target>/`. Formats render in parallel
//! and fail independently; the report carries every format's outcome.

use crate::config::Configuration;
use crate::manuscript::{assemble, manifest, FragmentStore};
use crate::release::ArtifactRecord;
use crate::sinks::{self, Format, RenderContext, RenderFailure};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};

/// Name of the per-target artifact manifest the release step consumes.
const ARTIFACTS_FILE: &str = "artifacts.json";

/// A successfully rendered and written artifact.
#[derive(Debug, Clone)]
pub struct WrittenArtifact {
    pub format: Format,
    /// Path relative to the manuscript root
    pub path: PathBuf,
    pub sha256: String,
    pub size: u64,
}

/// Per-format outcomes for one build invocation, in request order.
pub struct BuildReport {
    pub target: String,
    pub results: Vec<Result<WrittenArtifact, RenderFailure>>,
}

impl BuildReport {
    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }
}

/// Run resolve → assemble → render for one target and write the artifacts.
pub fn build(
    root: &Path,
    config: &Configuration,
    target: &str,
    formats: &[Format],
    ctx: &RenderContext,
    progress: &ProgressBar,
) -> Result<BuildReport> {
    let store = FragmentStore::open(root, config.block_globs()?)
        .with_context(|| "Failed to open the fragment store")?;

    let fragments = manifest::resolve(&config.manifest_dir(root), target, &store)
        .with_context(|| format!("Failed to resolve target '{target}'"))?;

    let doc = assemble(target, fragments, config.preamble())
        .with_context(|| format!("Failed to assemble target '{target}'"))?;

    let sinks: Vec<_> = formats.iter().map(|f| config.sink(*f)).collect();
    let rendered = sinks::render_all(&sinks, &doc, ctx);

    let out_dir = config.build_dir(root).join(target);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let mut results = Vec::with_capacity(rendered.len());
    for outcome in rendered {
        progress.inc(1);
        match outcome {
            Ok(artifact) => {
                let out_path = out_dir.join(&artifact.file_name);
                std::fs::write(&out_path, &artifact.payload)
                    .with_context(|| format!("Failed to write artifact {}", out_path.display()))?;

                let rel_path = config
                    .manuscript
                    .build_dir
                    .join(&artifact.target)
                    .join(&artifact.file_name);
                results.push(Ok(WrittenArtifact {
                    format: artifact.format,
                    path: rel_path,
                    size: artifact.size(),
                    sha256: artifact.sha256,
                }));
            }
            Err(failure) => results.push(Err(failure)),
        }
    }

    let report = BuildReport {
        target: target.to_string(),
        results,
    };
    write_artifact_manifest(&out_dir, &report)?;

    Ok(report)
}

/// Record the successful artifacts so `release` can pick them up without
/// re-rendering.
fn write_artifact_manifest(out_dir: &Path, report: &BuildReport) -> Result<()> {
    let records: Vec<ArtifactRecord> = report
        .results
        .iter()
        .flatten()
        .map(|written| ArtifactRecord {
            target: report.target.clone(),
            format: written.format.to_string(),
            path: written.path.clone(),
            sha256: written.sha256.clone(),
            size: written.size,
        })
        .collect();

    let path = out_dir.join(ARTIFACTS_FILE);
    let json = serde_json::to_string_pretty(&records)
        .with_context(|| "Failed to serialise the artifact manifest")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// The artifacts recorded by the most recent `build` of a target.
///
/// Releases operate on already-produced artifacts only; nothing is
/// re-resolved or re-rendered here.
pub fn recorded_artifacts(
    root: &Path,
    config: &Configuration,
    target: &str,
) -> Result<Vec<ArtifactRecord>> {
    let path = config.build_dir(root).join(target).join(ARTIFACTS_FILE);
    let contents = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "No build found for target '{target}' - run 'bindery build {target}' first"
        )
    })?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Artifact manifest {} is corrupt", path.display()))
}
