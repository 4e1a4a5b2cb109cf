use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which part of the book a fragment belongs to.
///
/// The kind is inferred from the fragment's top-level directory within the
/// manuscript tree; anything outside the four known directories is not a
/// valid fragment location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    FrontMatter,
    Chapter,
    Appendix,
    BackMatter,
}

impl SectionKind {
    /// Infer the section kind from a manuscript-relative path.
    pub fn from_path(path: &Path) -> Option<SectionKind> {
        let first = path.iter().next()?.to_str()?;
        match first {
            "front" => Some(SectionKind::FrontMatter),
            "chapters" => Some(SectionKind::Chapter),
            "appendices" => Some(SectionKind::Appendix),
            "back" => Some(SectionKind::BackMatter),
            _ => None,
        }
    }

    /// The directory name this kind lives under.
    pub fn dir_name(&self) -> &'static str {
        match self {
            SectionKind::FrontMatter => "front",
            SectionKind::Chapter => "chapters",
            SectionKind::Appendix => "appendices",
            SectionKind::BackMatter => "back",
        }
    }

    pub fn all() -> &'static [SectionKind] {
        &[
            SectionKind::FrontMatter,
            SectionKind::Chapter,
            SectionKind::Appendix,
            SectionKind::BackMatter,
        ]
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionKind::FrontMatter => "front matter",
            SectionKind::Chapter => "chapter",
            SectionKind::Appendix => "appendix",
            SectionKind::BackMatter => "back matter",
        };
        write!(f, "{}", name)
    }
}

/// Ordering hint for a fragment, parsed from its file name.
///
/// A `03-style.md` file sorts numerically; files without a numeric prefix
/// fall back to lexical ordering after all numbered files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderKey {
    Numeric(u32, String),
    Lexical(String),
}

impl OrderKey {
    /// Parse an order key from a file stem like `03-style` or `preface`.
    pub fn from_stem(stem: &str) -> OrderKey {
        let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return OrderKey::Lexical(stem.to_string());
        }
        let rest = stem[digits.len()..]
            .trim_start_matches(['-', '_'])
            .to_string();
        match digits.parse::<u32>() {
            Ok(n) => OrderKey::Numeric(n, rest),
            Err(_) => OrderKey::Lexical(stem.to_string()),
        }
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (OrderKey::Numeric(a, an), OrderKey::Numeric(b, bn)) => {
                a.cmp(b).then_with(|| an.cmp(bn))
            }
            (OrderKey::Numeric(..), OrderKey::Lexical(..)) => Ordering::Less,
            (OrderKey::Lexical(..), OrderKey::Numeric(..)) => Ordering::Greater,
            (OrderKey::Lexical(a), OrderKey::Lexical(b)) => a.cmp(b),
        }
    }
}

/// One content file treated as an atomic, ordered unit of the assembled book.
///
/// Fragments are immutable once read; the pipeline never writes back into
/// the manuscript tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Manuscript-relative path, which doubles as the fragment's identity
    pub path: PathBuf,
    /// Raw Markdown content
    pub content: String,
    pub kind: SectionKind,
    pub order_key: OrderKey,
}

impl Fragment {
    /// Construct a fragment from its manuscript-relative path and content.
    ///
    /// Returns `None` if the path doesn't live under a known section
    /// directory.
    pub fn new<P: Into<PathBuf>, S: ToString>(path: P, content: S) -> Option<Fragment> {
        let path: PathBuf = path.into();
        let kind = SectionKind::from_path(&path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Some(Fragment {
            kind,
            order_key: OrderKey::from_stem(&stem),
            content: content.to_string(),
            path,
        })
    }

    /// Human-readable title: the first Markdown heading if present,
    /// otherwise a prettified file stem.
    pub fn title(&self) -> String {
        if let Some(heading) = crate::markdown::first_heading(&self.content) {
            return heading;
        }

        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = stem.trim_start_matches(|c: char| c.is_ascii_digit());
        let stem = stem.trim_start_matches(['-', '_']);
        stem.replace(['-', '_'], " ")
            .split_whitespace()
            .map(title_case_word)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Stable anchor identifier for in-document links.
    pub fn anchor(&self) -> String {
        self.title()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn can_infer_section_kind_from_path() {
        assert_eq!(
            SectionKind::from_path(Path::new("chapters/01-intro.md")),
            Some(SectionKind::Chapter)
        );
        assert_eq!(
            SectionKind::from_path(Path::new("front/00-title.md")),
            Some(SectionKind::FrontMatter)
        );
        assert_eq!(
            SectionKind::from_path(Path::new("appendices/a-installing.md")),
            Some(SectionKind::Appendix)
        );
        assert_eq!(
            SectionKind::from_path(Path::new("back/colophon.md")),
            Some(SectionKind::BackMatter)
        );
        assert_eq!(SectionKind::from_path(Path::new("notes/scratch.md")), None);
    }

    #[test]
    fn can_parse_order_keys() {
        assert_eq!(
            OrderKey::from_stem("03-style"),
            OrderKey::Numeric(3, "style".to_string())
        );
        assert_eq!(
            OrderKey::from_stem("preface"),
            OrderKey::Lexical("preface".to_string())
        );
    }

    #[test]
    fn numbered_fragments_sort_before_lexical_ones() {
        let mut keys = vec![
            OrderKey::from_stem("zebra"),
            OrderKey::from_stem("10-closing"),
            OrderKey::from_stem("02-opening"),
        ];
        keys.sort();
        assert_eq!(keys[0], OrderKey::Numeric(2, "opening".to_string()));
        assert_eq!(keys[1], OrderKey::Numeric(10, "closing".to_string()));
        assert_eq!(keys[2], OrderKey::Lexical("zebra".to_string()));
    }

    #[test]
    fn title_prefers_first_heading() {
        let fragment =
            Fragment::new("chapters/01-intro.md", "# Getting Started\n\nBody.").unwrap();
        assert_eq!(fragment.title(), "Getting Started");
    }

    #[test]
    fn title_falls_back_to_prettified_stem() {
        let fragment = Fragment::new("chapters/02-error-handling.md", "no heading here").unwrap();
        assert_eq!(fragment.title(), "Error Handling");
    }

    #[test]
    fn anchor_is_url_safe() {
        let fragment = Fragment::new("chapters/01-intro.md", "# Getting Started!").unwrap();
        assert_eq!(fragment.anchor(), "getting-started");
    }

    #[test]
    fn fragment_outside_section_dirs_is_rejected() {
        assert!(Fragment::new("scratch/notes.md", "").is_none());
    }
}
