//! E-reader package generation.
//!
//! This sink converts an assembled document into an EPUB with:
//! - Cover page from a configurable template
//! - Table of contents page grouped by section
//! - One XHTML document per fragment for efficient e-reader navigation
//!
//! Uses the `epub-builder` crate, which handles the packaging requirements
//! (OPF manifest, NCX navigation, ZIP structure with proper MIME type).

mod config;
mod rendering;

pub use config::EpubConfig;

use super::{Artifact, Format, Render, RenderContext};
use crate::manuscript::AssembledDocument;
use anyhow::Result;

pub struct EpubSink {
    config: EpubConfig,
}

impl EpubSink {
    pub fn new(config: EpubConfig) -> EpubSink {
        EpubSink { config }
    }
}

impl Render for EpubSink {
    fn format(&self) -> Format {
        Format::Epub
    }

    fn render(&self, doc: &AssembledDocument, ctx: &RenderContext) -> Result<Artifact> {
        rendering::render(&self.config, doc, ctx)
    }
}
