//! Print-ready output as a XeLaTeX document.
//!
//! The sink emits complete `.tex` source: the external typesetting engine
//! that turns it into pages is a capability the operator invokes, not part
//! of the pipeline. Fragment Markdown is mapped structurally — headings to
//! sectioning commands, fenced code to verbatim blocks — and everything
//! else is escaped as body text.

use super::{Artifact, Format, Render, RenderContext};
use crate::manuscript::{AssembledDocument, SectionKind};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Debug)]
pub enum PageSize {
    #[serde(rename = "a4")]
    A4,
    #[serde(rename = "us-letter")]
    UsLetter,
    /// 5.5" x 8.5" trade size
    #[serde(rename = "digest")]
    Digest,
}

impl PageSize {
    /// Page dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::UsLetter => (215.9, 279.4),
            PageSize::Digest => (139.7, 215.9),
        }
    }

    pub fn all() -> &'static [PageSize] {
        &[PageSize::A4, PageSize::UsLetter, PageSize::Digest]
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageSize::A4 => "a4",
            PageSize::UsLetter => "us-letter",
            PageSize::Digest => "digest",
        };
        write!(f, "{}", name)
    }
}

/// Print output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatexConfig {
    #[serde(default = "default_page_size")]
    pub page_size: PageSize,
    /// Table of contents depth: 1 = chapters, 2 = +sections, 3 = +subsections
    #[serde(default = "default_toc_depth")]
    pub toc_depth: u8,
    /// Whether chapters and sections are numbered
    #[serde(default = "default_numbered")]
    pub numbered_sections: bool,
    #[serde(default = "default_font_size")]
    pub font_size_pt: u8,
}

fn default_page_size() -> PageSize {
    PageSize::Digest
}
fn default_toc_depth() -> u8 {
    2
}
fn default_numbered() -> bool {
    true
}
fn default_font_size() -> u8 {
    10
}

impl Default for LatexConfig {
    fn default() -> Self {
        LatexConfig {
            page_size: default_page_size(),
            toc_depth: default_toc_depth(),
            numbered_sections: default_numbered(),
            font_size_pt: default_font_size(),
        }
    }
}

pub struct LatexSink {
    config: LatexConfig,
}

impl LatexSink {
    pub fn new(config: LatexConfig) -> LatexSink {
        LatexSink { config }
    }
}

impl Render for LatexSink {
    fn format(&self) -> Format {
        Format::Latex
    }

    fn render(&self, doc: &AssembledDocument, ctx: &RenderContext) -> Result<Artifact> {
        if !(1..=3).contains(&self.config.toc_depth) {
            return Err(anyhow!(
                "toc_depth must be between 1 and 3, got {}",
                self.config.toc_depth
            ));
        }

        let (width, height) = self.config.page_size.dimensions_mm();

        let mut out = String::with_capacity(16 * 1024);
        out.push_str(&format!(
            "\\documentclass[{}pt]{{book}}\n",
            self.config.font_size_pt
        ));
        out.push_str("\\usepackage{fontspec}\n");
        out.push_str(&format!(
            "\\usepackage[paperwidth={width}mm,paperheight={height}mm,margin=18mm]{{geometry}}\n"
        ));
        out.push_str(&format!(
            "\\setcounter{{tocdepth}}{{{}}}\n",
            // latex tocdepth: 0 = chapters, 1 = sections, 2 = subsections
            self.config.toc_depth - 1
        ));
        if !self.config.numbered_sections {
            out.push_str("\\setcounter{secnumdepth}{-2}\n");
        }
        out.push_str("\\begin{document}\n\n");

        // title page from the expanded preamble block, first line largest
        out.push_str("\\begin{titlepage}\n\\centering\n");
        let mut first = true;
        for line in doc.preamble.expand(&ctx.date()).lines() {
            if line.trim().is_empty() {
                out.push_str("\\vspace{1em}\n");
            } else if first {
                out.push_str(&format!("{{\\Huge {}}}\\par\n", escape(line)));
                first = false;
            } else {
                out.push_str(&format!("{}\\par\n", escape(line)));
            }
        }
        out.push_str("\\end{titlepage}\n\n");

        // the engine expands this into the actual table of contents
        out.push_str("\\tableofcontents\n\n");

        let mut current: Option<SectionKind> = None;
        for fragment in &doc.fragments {
            if current != Some(fragment.kind) {
                out.push_str(matter_command(fragment.kind));
                out.push('\n');
                current = Some(fragment.kind);
            }

            let starred = matches!(
                fragment.kind,
                SectionKind::FrontMatter | SectionKind::BackMatter
            );
            out.push_str(&chapter_command(&fragment.title(), starred));
            out.push('\n');
            out.push_str(&body_to_latex(&fragment.content));
            out.push('\n');
        }

        out.push_str("\\end{document}\n");

        Ok(Artifact::new(&doc.target, Format::Latex, out.into_bytes()))
    }
}

fn matter_command(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::FrontMatter => "\\frontmatter",
        SectionKind::Chapter => "\\mainmatter",
        SectionKind::Appendix => "\\appendix",
        SectionKind::BackMatter => "\\backmatter",
    }
}

fn chapter_command(title: &str, starred: bool) -> String {
    if starred {
        format!("\\chapter*{{{}}}", escape(title))
    } else {
        format!("\\chapter{{{}}}", escape(title))
    }
}

/// Map fragment Markdown to LaTeX body text.
///
/// The first level-one heading is consumed by the chapter command; deeper
/// headings map to sectioning commands, fenced code becomes verbatim, and
/// everything else is escaped prose.
fn body_to_latex(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() * 2);
    let mut in_code = false;
    let mut skipped_title = false;

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            out.push_str(if in_code {
                "\\end{verbatim}\n"
            } else {
                "\\begin{verbatim}\n"
            });
            in_code = !in_code;
            continue;
        }

        if in_code {
            out.push_str(line);
            out.push('\n');
            continue;
        }

        if let Some(heading) = line.strip_prefix("#### ") {
            out.push_str(&format!("\\subsubsection{{{}}}\n", escape(heading.trim())));
        } else if let Some(heading) = line.strip_prefix("### ") {
            out.push_str(&format!("\\subsection{{{}}}\n", escape(heading.trim())));
        } else if let Some(heading) = line.strip_prefix("## ") {
            out.push_str(&format!("\\section{{{}}}\n", escape(heading.trim())));
        } else if let Some(heading) = line.strip_prefix("# ") {
            if skipped_title {
                out.push_str(&format!("\\section{{{}}}\n", escape(heading.trim())));
            } else {
                skipped_title = true;
            }
        } else {
            out.push_str(&escape(line));
            out.push('\n');
        }
    }

    if in_code {
        // unterminated fence; close it so the document still compiles
        out.push_str("\\end{verbatim}\n");
    }

    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sinks::test::{test_context, test_document};

    #[test]
    fn can_serialize_latex_config() {
        let config = LatexConfig::default();
        toml::to_string(&config).expect("can serialize LatexConfig to TOML");
    }

    #[test]
    fn can_roundtrip_latex_config() {
        let config = LatexConfig::default();
        let toml_str = toml::to_string(&config).expect("can serialize");
        let deserialized: LatexConfig = toml::from_str(&toml_str).expect("can deserialize");
        assert_eq!(config.page_size, deserialized.page_size);
        assert_eq!(config.toc_depth, deserialized.toc_depth);
    }

    #[test]
    fn rendering_twice_is_byte_identical() {
        let doc = test_document("full");
        let ctx = test_context();
        let sink = LatexSink::new(LatexConfig::default());

        let a = sink.render(&doc, &ctx).unwrap();
        let b = sink.render(&doc, &ctx).unwrap();
        assert_eq!(a.payload, b.payload);
        assert_eq!(a.sha256, b.sha256);
    }

    #[test]
    fn document_structure_follows_section_kinds() {
        let doc = test_document("full");
        let sink = LatexSink::new(LatexConfig::default());
        let artifact = sink.render(&doc, &test_context()).unwrap();
        let tex = String::from_utf8(artifact.payload).unwrap();

        let front = tex.find("\\frontmatter").unwrap();
        let main = tex.find("\\mainmatter").unwrap();
        let back = tex.find("\\backmatter").unwrap();
        assert!(front < main && main < back);
        assert!(tex.contains("\\chapter{Introduction}"));
        assert!(tex.contains("\\chapter*{Preface}"));
        assert!(tex.contains("\\tableofcontents"));
        assert!(tex.contains("\\begin{verbatim}"));
    }

    #[test]
    fn invalid_toc_depth_is_rejected() {
        let doc = test_document("full");
        let sink = LatexSink::new(LatexConfig {
            toc_depth: 0,
            ..LatexConfig::default()
        });
        assert!(sink.render(&doc, &test_context()).is_err());
    }

    #[test]
    fn special_characters_are_escaped() {
        assert_eq!(escape("100% & more_things"), "100\\% \\& more\\_things");
        assert_eq!(escape("a\\b"), "a\\textbackslash{}b");
    }

    #[test]
    fn body_headings_map_to_sectioning_commands() {
        let latex = body_to_latex("# Title\n\n## Part\n\ntext\n");
        assert!(!latex.contains("Title"));
        assert!(latex.contains("\\section{Part}"));
        assert!(latex.contains("text"));
    }
}
