//! EPUB rendering orchestration.
//!
//! Coordinates the generation of all EPUB components: cover, TOC page, and
//! one XHTML document per fragment. Fragment Markdown is converted to HTML;
//! the generation date on the cover is the build's declared volatile input.

use super::config::EpubConfig;
use crate::manuscript::author::credit_line;
use crate::manuscript::{AssembledDocument, SectionKind};
use crate::markdown;
use crate::sinks::{Artifact, Format, RenderContext};
use anyhow::{Context, Result};
use epub_builder::{EpubBuilder, EpubContent, ReferenceType, ZipLibrary};

const STYLESHEET: &str = r#"body { font-family: serif; line-height: 1.5; margin: 1em; }
h1, h2, h3 { font-family: sans-serif; }
pre { background: #f4f4f4; padding: 0.75em; overflow-x: auto; }
code { font-family: monospace; }
.cover { text-align: center; margin-top: 4em; }
.toc ol { list-style: none; }
"#;

/// Render the assembled document to an EPUB package.
pub fn render(config: &EpubConfig, doc: &AssembledDocument, ctx: &RenderContext) -> Result<Artifact> {
    let zip = ZipLibrary::new()
        .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to create ZIP library for EPUB")?;
    let mut builder = EpubBuilder::new(zip)
        .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to create EPUB builder")?;

    builder
        .metadata("title", &doc.preamble.title)
        .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to set title metadata")?;
    builder
        .metadata("generator", "bindery")
        .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to set generator metadata")?;
    builder
        .metadata("lang", &config.metadata.language)
        .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to set language metadata")?;

    for author in &doc.preamble.authors {
        builder
            .metadata("author", author.to_string())
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to add author metadata for author: {}", author))?;
    }

    if let Some(subject) = config.subject_opt() {
        builder
            .metadata("description", subject)
            .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to set description metadata")?;
    }
    if let Some(keywords) = config.keywords_opt() {
        builder
            .metadata("subject", keywords)
            .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to set subject (keywords) metadata")?;
    }

    builder
        .stylesheet(STYLESHEET.as_bytes())
        .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to add stylesheet")?;

    // cover page
    let cover_html = render_cover(config, doc, &ctx.date());
    builder
        .add_content(
            EpubContent::new("cover.xhtml", cover_html.as_bytes())
                .title("Cover")
                .reftype(ReferenceType::Cover),
        )
        .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to add cover page")?;

    // table of contents page
    let toc_html = render_toc(config, doc);
    builder
        .add_content(
            EpubContent::new("toc.xhtml", toc_html.as_bytes())
                .title("Table of Contents")
                .reftype(ReferenceType::Toc),
        )
        .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to add table of contents page")?;

    // fragments, one document each, in assembly order
    for (i, fragment) in doc.fragments.iter().enumerate() {
        let filename = fragment_href(i);
        let title = fragment.title();
        let html = xhtml_document(
            &config.metadata.language,
            &title,
            &markdown::to_html(&fragment.content),
        );
        builder
            .add_content(EpubContent::new(&filename, html.as_bytes()).title(&title))
            .map_err(anyhow::Error::msg)
            .with_context(|| {
                format!("Failed to add fragment to EPUB: {}", fragment.path.display())
            })?;
    }

    let mut payload: Vec<u8> = Vec::new();
    builder
        .generate(&mut payload)
        .map_err(anyhow::Error::msg)
        .with_context(|| "Failed to generate EPUB")?;

    Ok(Artifact::new(&doc.target, Format::Epub, payload))
}

pub(super) fn fragment_href(index: usize) -> String {
    format!("fragment-{:04}.xhtml", index)
}

/// Render the cover page as XHTML, expanding the cover template.
pub(super) fn render_cover(config: &EpubConfig, doc: &AssembledDocument, date: &str) -> String {
    let authors = credit_line(&doc.preamble.authors);
    let content = config
        .cover
        .template
        .replace("{title}", &doc.preamble.title)
        .replace("{authors}", &authors)
        .replace("{year}", &doc.preamble.copyright_year.to_string())
        .replace("{date}", date);

    let body_html = content
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                "<br/>".to_string()
            } else {
                format!("<p>{}</p>", html_escape::encode_text(line))
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    xhtml_document(
        &config.metadata.language,
        &doc.preamble.title,
        &format!("<div class=\"cover\">\n{}\n</div>", body_html),
    )
}

/// Render the TOC page as XHTML, one section heading per kind.
pub(super) fn render_toc(config: &EpubConfig, doc: &AssembledDocument) -> String {
    let mut items = Vec::new();
    let mut current: Option<SectionKind> = None;

    for (i, fragment) in doc.fragments.iter().enumerate() {
        if current != Some(fragment.kind) {
            if current.is_some() {
                items.push("</ol>".to_string());
            }
            items.push(format!(
                "<h3>{}</h3>",
                html_escape::encode_text(&section_heading(fragment.kind))
            ));
            items.push("<ol>".to_string());
            current = Some(fragment.kind);
        }
        items.push(format!(
            r#"<li><a href="{}">{}</a>"#,
            fragment_href(i),
            html_escape::encode_text(&fragment.title())
        ));

        // deeper headings within the fragment, unlinked
        if config.toc_depth > 1 {
            let nested = crate::markdown::headings(&fragment.content, config.toc_depth)
                .into_iter()
                .filter(|(level, _)| *level > 1)
                .map(|(_, text)| format!("<li>{}</li>", html_escape::encode_text(&text)))
                .collect::<Vec<_>>();
            if !nested.is_empty() {
                items.push(format!("<ol>{}</ol>", nested.join("")));
            }
        }

        items.push("</li>".to_string());
    }
    if current.is_some() {
        items.push("</ol>".to_string());
    }

    xhtml_document(
        &config.metadata.language,
        &format!("Table of Contents - {}", doc.preamble.title),
        &format!(
            "<div class=\"toc\">\n<h2>Table of Contents</h2>\n{}\n</div>",
            items.join("\n")
        ),
    )
}

fn section_heading(kind: SectionKind) -> String {
    match kind {
        SectionKind::FrontMatter => "Front Matter".to_string(),
        SectionKind::Chapter => "Chapters".to_string(),
        SectionKind::Appendix => "Appendices".to_string(),
        SectionKind::BackMatter => "Back Matter".to_string(),
    }
}

fn xhtml_document(lang: &str, title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{lang}">
<head>
    <meta http-equiv="Content-Type" content="text/html; charset=UTF-8"/>
    <title>{title}</title>
    <link rel="stylesheet" type="text/css" href="stylesheet.css"/>
</head>
<body>
{body}
</body>
</html>"#,
        lang = lang,
        title = html_escape::encode_text(title),
        body = body,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sinks::test::{test_context, test_document};

    #[test]
    fn can_render_an_epub_package() {
        let doc = test_document("full");
        let artifact = render(&EpubConfig::default(), &doc, &test_context()).unwrap();

        assert_eq!(artifact.format, Format::Epub);
        assert_eq!(artifact.file_name, "full.epub");
        // EPUBs are ZIP containers
        assert_eq!(&artifact.payload[0..2], b"PK");
    }

    #[test]
    fn cover_expands_template_placeholders() {
        let doc = test_document("full");
        let cover = render_cover(&EpubConfig::default(), &doc, "2026-08-06");
        assert!(cover.contains("Practical Bookmaking"));
        assert!(cover.contains("Jo Binder"));
        assert!(cover.contains("2026"));
    }

    #[test]
    fn toc_groups_fragments_by_section() {
        let doc = test_document("full");
        let toc = render_toc(&EpubConfig::default(), &doc);

        let front = toc.find("Front Matter").unwrap();
        let chapters = toc.find("Chapters").unwrap();
        let back = toc.find("Back Matter").unwrap();
        assert!(front < chapters && chapters < back);
        assert!(toc.contains(r#"<a href="fragment-0000.xhtml">Preface</a>"#));
        assert!(toc.contains(r#"<a href="fragment-0001.xhtml">Introduction</a>"#));
    }

    #[test]
    fn fragment_titles_are_escaped_in_toc() {
        let mut doc = test_document("full");
        doc.fragments[1].content = "# Fish & Chips\n".to_string();
        let toc = render_toc(&EpubConfig::default(), &doc);
        assert!(toc.contains("Fish &amp; Chips"));
    }
}
