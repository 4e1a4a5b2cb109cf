//! EPUB output configuration.
//!
//! Mirrors the shape of the other sink configs so target settings read
//! uniformly in `bindery.toml`.

use serde::{Deserialize, Serialize};

/// Cover page configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverConfig {
    /// Template with placeholders: {title}, {authors}, {year}, {date}.
    pub template: String,
}

impl Default for CoverConfig {
    fn default() -> Self {
        CoverConfig {
            template: default_cover_template(),
        }
    }
}

pub fn default_cover_template() -> String {
    r#"{title}

- by -

{authors}

Copyright © {year} {authors}"#
        .to_string()
}

/// EPUB document metadata configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Subject/description for EPUB metadata. Empty string for none.
    pub subject: String,
    /// Keywords for EPUB metadata (comma-separated recommended).
    /// Empty string for none.
    pub keywords: String,
    /// Language code (BCP 47 format, e.g., "en", "en-GB", "fr").
    /// Required for valid EPUB.
    pub language: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig {
            subject: String::new(),
            keywords: String::new(),
            language: "en".to_string(),
        }
    }
}

/// EPUB output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpubConfig {
    /// Cover page configuration
    #[serde(default)]
    pub cover: CoverConfig,
    /// EPUB document metadata
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Table of contents depth for the nav page
    #[serde(default = "default_toc_depth")]
    pub toc_depth: u8,
}

fn default_toc_depth() -> u8 {
    1
}

impl Default for EpubConfig {
    fn default() -> Self {
        EpubConfig {
            cover: CoverConfig::default(),
            metadata: MetadataConfig::default(),
            toc_depth: default_toc_depth(),
        }
    }
}

impl EpubConfig {
    /// Returns the subject, if configured.
    pub fn subject_opt(&self) -> Option<&str> {
        if self.metadata.subject.is_empty() {
            None
        } else {
            Some(&self.metadata.subject)
        }
    }

    /// Returns the keywords, if configured.
    pub fn keywords_opt(&self) -> Option<&str> {
        if self.metadata.keywords.is_empty() {
            None
        } else {
            Some(&self.metadata.keywords)
        }
    }
}
