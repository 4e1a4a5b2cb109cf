//! `bindery.toml` configuration.
//!
//! One file at the manuscript root holds the book metadata, per-format
//! sink settings, and the distribution channels. Sink sections are
//! optional; a format requested without a section renders with defaults.

use crate::channels::{Channel, GitChannel, StorefrontChannel};
use crate::manuscript::assemble::{default_preamble_template, Preamble};
use crate::manuscript::Author;
use crate::sinks::{
    EpubConfig, EpubSink, Format, HtmlConfig, HtmlSink, LatexConfig, LatexSink, Sink,
};
use anyhow::{anyhow, Context, Result};
use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "bindery.toml";

/// Complete configuration for a bindery manuscript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub manuscript: ManuscriptConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex: Option<LatexConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epub: Option<EpubConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<HtmlConfig>,
    #[serde(default, rename = "channel", skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<ChannelConfig>,
}

/// Book metadata and manuscript layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManuscriptConfig {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    pub copyright_year: i32,
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: PathBuf,
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    /// Globs of files to skip when scanning the manuscript tree
    #[serde(default)]
    pub block_globs: Vec<String>,
    /// Preamble template; placeholders {title}, {authors}, {year}, {date}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble_template: Option<String>,
}

fn default_manifest_dir() -> PathBuf {
    PathBuf::from("manifests")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Git,
    Storefront,
}

/// One distribution channel. New channels are configuration, not code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    pub kind: ChannelKind,
    /// Git channels: remote to push the release tag to (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    /// Storefront channels: the platform's drop directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,
}

impl ChannelConfig {
    /// Build the concrete channel this descriptor names.
    pub fn instantiate(&self, root: &Path, manifest_dir: &Path) -> Result<Box<dyn Channel>> {
        match self.kind {
            ChannelKind::Git => Ok(Box::new(GitChannel::new(
                self.name.clone(),
                root.to_path_buf(),
                self.remote.clone(),
            ))),
            ChannelKind::Storefront => {
                let dest = self.dest.clone().ok_or_else(|| {
                    anyhow!("storefront channel '{}' needs a dest directory", self.name)
                })?;
                Ok(Box::new(StorefrontChannel::new(
                    self.name.clone(),
                    root.to_path_buf(),
                    manifest_dir.to_path_buf(),
                    dest,
                )))
            }
        }
    }
}

impl Configuration {
    /// Load `bindery.toml` from the manuscript root.
    pub fn load(root: &Path) -> Result<Configuration> {
        let path = root.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to load {} - run 'bindery init' first", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialise configuration to TOML")?;
        std::fs::write(root.join(CONFIG_FILE), contents)
            .with_context(|| format!("Failed to write {}", CONFIG_FILE))
    }

    /// The formats this manuscript configures, in render order. Falls back
    /// to every format when no sink section is present.
    pub fn configured_formats(&self) -> Vec<Format> {
        let mut formats = Vec::new();
        if self.latex.is_some() {
            formats.push(Format::Latex);
        }
        if self.epub.is_some() {
            formats.push(Format::Epub);
        }
        if self.html.is_some() {
            formats.push(Format::Html);
        }
        if formats.is_empty() {
            formats = Format::all().to_vec();
        }
        formats
    }

    /// Build the sink for a format, using its config section or defaults.
    pub fn sink(&self, format: Format) -> Sink {
        match format {
            Format::Latex => Sink::Latex(LatexSink::new(
                self.latex.clone().unwrap_or_default(),
            )),
            Format::Epub => Sink::Epub(EpubSink::new(self.epub.clone().unwrap_or_default())),
            Format::Html => Sink::Html(HtmlSink::new(self.html.clone().unwrap_or_default())),
        }
    }

    /// The preamble block for one target.
    pub fn preamble(&self) -> Preamble {
        Preamble {
            title: self.manuscript.title.clone(),
            authors: self.manuscript.authors.clone(),
            copyright_year: self.manuscript.copyright_year,
            template: self
                .manuscript
                .preamble_template
                .clone()
                .unwrap_or_else(default_preamble_template),
        }
    }

    pub fn manifest_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.manuscript.manifest_dir)
    }

    pub fn build_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.manuscript.build_dir)
    }

    /// Compile the configured block globs.
    pub fn block_globs(&self) -> Result<Vec<GlobMatcher>> {
        self.manuscript
            .block_globs
            .iter()
            .map(|pattern| {
                Glob::new(pattern)
                    .with_context(|| format!("Invalid glob pattern: {}", pattern))
                    .map(|g| g.compile_matcher())
            })
            .collect()
    }
}
