//! Single-file web document generation.
//!
//! Everything — stylesheet, table of contents, every fragment — lands in
//! one self-contained HTML page with anchor navigation. No external assets,
//! so the artifact can be dropped on any static host as-is.

use super::{Artifact, Format, Render, RenderContext};
use crate::manuscript::author::credit_line;
use crate::manuscript::AssembledDocument;
use crate::markdown;
use anyhow::Result;
use serde::{Deserialize, Serialize};

const STYLESHEET: &str = r#"body { max-width: 46em; margin: 0 auto; padding: 0 1em; font-family: Georgia, serif; line-height: 1.6; }
header { text-align: center; margin: 4em 0; }
nav.toc { border: 1px solid #ddd; padding: 1em 2em; margin-bottom: 3em; }
nav.toc ol { list-style: none; padding-left: 1em; }
section { margin-bottom: 3em; }
pre { background: #f4f4f4; padding: 0.75em; overflow-x: auto; }
code { font-family: "Source Code Pro", monospace; }
footer { color: #777; font-size: 0.85em; text-align: center; margin: 4em 0 2em; }
"#;

/// Web output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlConfig {
    /// Table of contents depth: 1 lists fragments, 2+ also lists headings
    /// within each fragment down to that depth
    #[serde(default = "default_toc_depth")]
    pub toc_depth: u8,
    /// Number chapters in the table of contents
    #[serde(default = "default_numbered")]
    pub numbered_sections: bool,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_toc_depth() -> u8 {
    2
}
fn default_numbered() -> bool {
    true
}
fn default_language() -> String {
    "en".to_string()
}

impl Default for HtmlConfig {
    fn default() -> Self {
        HtmlConfig {
            toc_depth: default_toc_depth(),
            numbered_sections: default_numbered(),
            language: default_language(),
        }
    }
}

pub struct HtmlSink {
    config: HtmlConfig,
}

impl HtmlSink {
    pub fn new(config: HtmlConfig) -> HtmlSink {
        HtmlSink { config }
    }

    fn render_toc(&self, doc: &AssembledDocument) -> String {
        let mut items = Vec::new();
        let mut chapter_no = 0usize;

        items.push("<nav class=\"toc\">".to_string());
        items.push("<h2>Table of Contents</h2>".to_string());
        items.push("<ol>".to_string());
        for (i, fragment) in doc.fragments.iter().enumerate() {
            let label = if self.config.numbered_sections
                && fragment.kind == crate::manuscript::SectionKind::Chapter
            {
                chapter_no += 1;
                format!("{}. {}", chapter_no, fragment.title())
            } else {
                fragment.title()
            };

            items.push(format!(
                r##"<li><a href="#{}">{}</a>"##,
                anchor_for(doc, i),
                html_escape::encode_text(&label)
            ));

            // nested headings within the fragment
            if self.config.toc_depth > 1 {
                let nested = markdown::headings(&fragment.content, self.config.toc_depth)
                    .into_iter()
                    .filter(|(level, _)| *level > 1)
                    .map(|(_, text)| {
                        format!("<li>{}</li>", html_escape::encode_text(&text))
                    })
                    .collect::<Vec<_>>();
                if !nested.is_empty() {
                    items.push(format!("<ol>{}</ol>", nested.join("")));
                }
            }

            items.push("</li>".to_string());
        }
        items.push("</ol>".to_string());
        items.push("</nav>".to_string());
        items.join("\n")
    }
}

fn anchor_for(doc: &AssembledDocument, index: usize) -> String {
    let anchor = doc.fragments[index].anchor();
    if anchor.is_empty() {
        format!("section-{index}")
    } else {
        format!("{index:02}-{anchor}")
    }
}

impl Render for HtmlSink {
    fn format(&self) -> Format {
        Format::Html
    }

    fn render(&self, doc: &AssembledDocument, ctx: &RenderContext) -> Result<Artifact> {
        let title = html_escape::encode_text(&doc.preamble.title).to_string();
        let authors = credit_line(&doc.preamble.authors);

        let mut out = String::with_capacity(64 * 1024);
        out.push_str("<!DOCTYPE html>\n");
        out.push_str(&format!("<html lang=\"{}\">\n", self.config.language));
        out.push_str("<head>\n<meta charset=\"utf-8\"/>\n");
        out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>\n");
        out.push_str(&format!("<title>{}</title>\n", title));
        out.push_str(&format!("<style>\n{}</style>\n", STYLESHEET));
        out.push_str("</head>\n<body>\n");

        // the preamble block, ahead of all content
        out.push_str("<header>\n");
        out.push_str(&format!("<h1>{}</h1>\n", title));
        out.push_str(&format!(
            "<p>{}</p>\n",
            html_escape::encode_text(&authors)
        ));
        out.push_str(&format!(
            "<p>Copyright &copy; {} {}</p>\n",
            doc.preamble.copyright_year,
            html_escape::encode_text(&authors)
        ));
        out.push_str("</header>\n");

        out.push_str(&self.render_toc(doc));
        out.push('\n');

        for (i, fragment) in doc.fragments.iter().enumerate() {
            out.push_str(&format!(
                "<section id=\"{}\">\n{}</section>\n",
                anchor_for(doc, i),
                markdown::to_html(&fragment.content)
            ));
        }

        out.push_str(&format!(
            "<footer>Built on {} by bindery v{}</footer>\n",
            ctx.date(),
            ctx.tool_version
        ));
        out.push_str("</body>\n</html>\n");

        Ok(Artifact::new(&doc.target, Format::Html, out.into_bytes()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sinks::test::{test_context, test_document};
    use chrono::NaiveDate;

    #[test]
    fn can_serialize_html_config() {
        let config = HtmlConfig::default();
        toml::to_string(&config).expect("can serialize HtmlConfig to TOML");
    }

    #[test]
    fn rendering_twice_is_byte_identical() {
        let doc = test_document("full");
        let ctx = test_context();
        let sink = HtmlSink::new(HtmlConfig::default());

        let a = sink.render(&doc, &ctx).unwrap();
        let b = sink.render(&doc, &ctx).unwrap();
        assert_eq!(a.payload, b.payload);
        assert_eq!(a.sha256, b.sha256);
    }

    #[test]
    fn generation_date_is_the_only_volatile_field() {
        let doc = test_document("full");
        let sink = HtmlSink::new(HtmlConfig::default());

        let a = sink.render(&doc, &test_context()).unwrap();
        let b = sink
            .render(
                &doc,
                &RenderContext::new(NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()),
            )
            .unwrap();
        assert_ne!(a.sha256, b.sha256);

        let a = String::from_utf8(a.payload).unwrap();
        let b = String::from_utf8(b.payload).unwrap();
        let strip = |s: &str| s.replace("2026-08-06", "").replace("2026-08-07", "");
        assert_eq!(strip(&a), strip(&b));
    }

    #[test]
    fn everything_lands_in_one_page() {
        let doc = test_document("full");
        let sink = HtmlSink::new(HtmlConfig::default());
        let artifact = sink.render(&doc, &test_context()).unwrap();
        let html = String::from_utf8(artifact.payload).unwrap();

        assert!(html.contains("<style>"));
        assert!(html.contains("nav class=\"toc\""));
        assert!(html.contains("Preface"));
        assert!(html.contains("First chapter."));
        assert!(html.contains("Set in Rust."));
    }

    #[test]
    fn chapters_are_numbered_in_the_toc() {
        let doc = test_document("full");
        let sink = HtmlSink::new(HtmlConfig::default());
        let artifact = sink.render(&doc, &test_context()).unwrap();
        let html = String::from_utf8(artifact.payload).unwrap();

        assert!(html.contains("1. Introduction"));
        // front and back matter stay unnumbered
        assert!(!html.contains("1. Preface"));
    }
}
