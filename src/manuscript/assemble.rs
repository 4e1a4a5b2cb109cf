//! Document assembly.
//!
//! Joins resolved fragments into one logical document for a render pass:
//! a preamble block (title/copyright) ahead of the first fragment, a
//! table-of-contents marker each sink expands in its own way, then the
//! fragments in exactly the order the manifest declared them. Assembly never
//! reorders and never deduplicates.

use super::author::{credit_line, Author};
use super::fragment::{Fragment, SectionKind};
use thiserror::Error;

/// Placeholder the sinks replace with their own table of contents.
pub const TOC_MARKER: &str = "{{table-of-contents}}";

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("manifest for target '{target}' resolved to zero fragments")]
    EmptyManifest { target: String },
}

/// Title/copyright block injected ahead of the first content fragment.
///
/// Template placeholders: `{title}`, `{authors}`, `{year}`, `{date}`.
#[derive(Debug, Clone)]
pub struct Preamble {
    pub title: String,
    pub authors: Vec<Author>,
    pub copyright_year: i32,
    pub template: String,
}

pub fn default_preamble_template() -> String {
    r#"{title}

- by -

{authors}

Copyright © {year} {authors}

Built on {date}"#
        .to_string()
}

impl Preamble {
    /// Expand the preamble template. `date` is the build's generation date,
    /// the one volatile input — callers pin it for reproducible output.
    pub fn expand(&self, date: &str) -> String {
        let authors = credit_line(&self.authors);
        self.template
            .replace("{title}", &self.title)
            .replace("{authors}", &authors)
            .replace("{year}", &self.copyright_year.to_string())
            .replace("{date}", date)
    }
}

/// One target's fragments assembled into a single logical document.
///
/// Transient: owned by exactly one render pass and never persisted.
#[derive(Debug)]
pub struct AssembledDocument {
    pub target: String,
    pub preamble: Preamble,
    pub fragments: Vec<Fragment>,
}

/// Assemble resolved fragments for one target.
pub fn assemble(
    target: &str,
    fragments: Vec<Fragment>,
    preamble: Preamble,
) -> Result<AssembledDocument, AssembleError> {
    if fragments.is_empty() {
        return Err(AssembleError::EmptyManifest {
            target: target.to_string(),
        });
    }

    Ok(AssembledDocument {
        target: target.to_string(),
        preamble,
        fragments,
    })
}

impl AssembledDocument {
    /// Table-of-contents entries in document order.
    pub fn toc_entries(&self) -> Vec<(SectionKind, String, String)> {
        self.fragments
            .iter()
            .map(|f| (f.kind, f.title(), f.anchor()))
            .collect()
    }

    /// The whole document as one Markdown text: expanded preamble, the
    /// TOC marker, then every fragment in assembly order.
    #[allow(dead_code)] // exercised by the assembly tests
    pub fn to_markdown(&self, date: &str) -> String {
        let mut out = String::new();
        out.push_str(&self.preamble.expand(date));
        out.push_str("\n\n");
        out.push_str(TOC_MARKER);
        out.push_str("\n\n");
        for fragment in &self.fragments {
            out.push_str(&fragment.content);
            if !fragment.content.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}
