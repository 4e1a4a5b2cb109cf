//! Output format sinks.
//!
//! Each sink turns one [`AssembledDocument`] into one [`Artifact`],
//! independently of the others: a failure in one format never aborts its
//! siblings, and the caller always gets a per-format result set. Rendering
//! takes an explicit [`RenderContext`] carrying the generation date — the
//! one declared volatile input — so the same document, config, and date
//! produce byte-identical output with comparable content hashes.

use crate::manuscript::AssembledDocument;
use anyhow::Result;
use chrono::NaiveDate;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fmt;

mod epub;
pub use epub::{EpubConfig, EpubSink};

mod html;
pub use html::{HtmlConfig, HtmlSink};

mod latex;
pub use latex::{LatexConfig, LatexSink, PageSize};

/// A requested output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Print-ready XeLaTeX document
    Latex,
    /// Reflowable e-book package
    Epub,
    /// Single-file web document
    Html,
}

impl Format {
    pub fn all() -> &'static [Format] {
        &[Format::Latex, Format::Epub, Format::Html]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Latex => "tex",
            Format::Epub => "epub",
            Format::Html => "html",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Latex => "latex",
            Format::Epub => "epub",
            Format::Html => "html",
        };
        write!(f, "{}", name)
    }
}

/// Inputs shared by every render pass.
///
/// `generated_on` is the single volatile field excluded from the
/// determinism guarantee; everything else a sink consumes comes from the
/// document or its own config.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub generated_on: NaiveDate,
    pub tool_version: &'static str,
}

impl RenderContext {
    pub fn new(generated_on: NaiveDate) -> RenderContext {
        RenderContext {
            generated_on,
            tool_version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn date(&self) -> String {
        self.generated_on.format("%Y-%m-%d").to_string()
    }
}

/// One rendered output for one (target, format) pair.
///
/// Immutable once produced; a new build always yields a new value.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub target: String,
    pub format: Format,
    pub file_name: String,
    pub payload: Vec<u8>,
    pub sha256: String,
}

impl Artifact {
    pub fn new(target: &str, format: Format, payload: Vec<u8>) -> Artifact {
        let sha256 = hex_digest(&payload);
        Artifact {
            target: target.to_string(),
            format,
            file_name: format!("{}.{}", target, format.extension()),
            payload,
            sha256,
        }
    }

    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

pub fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A per-format render failure carrying the format and the underlying cause.
#[derive(Debug)]
pub struct RenderFailure {
    pub format: Format,
    pub source: anyhow::Error,
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rendering {} failed: {:#}", self.format, self.source)
    }
}

pub trait Render {
    fn format(&self) -> Format;
    fn render(&self, doc: &AssembledDocument, ctx: &RenderContext) -> Result<Artifact>;
}

pub enum Sink {
    Latex(LatexSink),
    Epub(EpubSink),
    Html(HtmlSink),
}

impl Render for Sink {
    fn format(&self) -> Format {
        match self {
            Sink::Latex(s) => s.format(),
            Sink::Epub(s) => s.format(),
            Sink::Html(s) => s.format(),
        }
    }

    fn render(&self, doc: &AssembledDocument, ctx: &RenderContext) -> Result<Artifact> {
        match self {
            Sink::Latex(s) => s.render(doc, ctx),
            Sink::Epub(s) => s.render(doc, ctx),
            Sink::Html(s) => s.render(doc, ctx),
        }
    }
}

/// Render every requested sink against the same document, in parallel.
///
/// The document is shared read-only; each sink produces a disjoint
/// artifact. Results come back in sink order, failures in place.
pub fn render_all(
    sinks: &[Sink],
    doc: &AssembledDocument,
    ctx: &RenderContext,
) -> Vec<std::result::Result<Artifact, RenderFailure>> {
    sinks
        .par_iter()
        .map(|sink| {
            sink.render(doc, ctx).map_err(|source| {
                log::warn!("{} sink failed for '{}'", sink.format(), doc.target);
                RenderFailure {
                    format: sink.format(),
                    source,
                }
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::manuscript::assemble::{assemble, default_preamble_template, Preamble};
    use crate::manuscript::{Author, Fragment};

    pub(crate) fn test_document(target: &str) -> AssembledDocument {
        let fragments = vec![
            Fragment::new("front/01-preface.md", "# Preface\n\nWelcome.\n").unwrap(),
            Fragment::new(
                "chapters/01-intro.md",
                "# Introduction\n\nFirst chapter.\n\n```rust\nfn main() {}\n```\n",
            )
            .unwrap(),
            Fragment::new("back/colophon.md", "# Colophon\n\nSet in Rust.\n").unwrap(),
        ];
        let preamble = Preamble {
            title: "Practical Bookmaking".to_string(),
            authors: vec![Author::from("Jo Binder")],
            copyright_year: 2026,
            template: default_preamble_template(),
        };
        assemble(target, fragments, preamble).unwrap()
    }

    pub(crate) fn test_context() -> RenderContext {
        RenderContext::new(NaiveDate::from_ymd_opt(2026, 8, 6).unwrap())
    }

    #[test]
    fn artifact_hash_is_stable() {
        let a = Artifact::new("full", Format::Html, b"content".to_vec());
        let b = Artifact::new("full", Format::Html, b"content".to_vec());
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.sha256.len(), 64);
    }

    #[test]
    fn artifact_hash_tracks_payload() {
        let a = Artifact::new("full", Format::Html, b"content".to_vec());
        let b = Artifact::new("full", Format::Html, b"different".to_vec());
        assert_ne!(a.sha256, b.sha256);
    }

    #[test]
    fn a_failing_sink_does_not_abort_its_siblings() {
        let doc = test_document("full");
        let ctx = test_context();

        // toc_depth 0 is rejected by the latex sink; html should still land
        let sinks = vec![
            Sink::Latex(LatexSink::new(LatexConfig {
                toc_depth: 0,
                ..LatexConfig::default()
            })),
            Sink::Html(HtmlSink::new(HtmlConfig::default())),
        ];

        let results = render_all(&sinks, &doc, &ctx);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err(), "latex sink should reject toc_depth 0");
        assert!(results[1].is_ok(), "html sink should still succeed");

        let failure = results[0].as_ref().unwrap_err();
        assert_eq!(failure.format, Format::Latex);
    }

    #[test]
    fn render_results_come_back_in_sink_order() {
        let doc = test_document("full");
        let ctx = test_context();
        let sinks = vec![
            Sink::Html(HtmlSink::new(HtmlConfig::default())),
            Sink::Latex(LatexSink::new(LatexConfig::default())),
        ];

        let results = render_all(&sinks, &doc, &ctx);
        assert_eq!(results[0].as_ref().unwrap().format, Format::Html);
        assert_eq!(results[1].as_ref().unwrap().format, Format::Latex);
    }
}
