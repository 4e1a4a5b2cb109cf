//! Interactive configuration wizard for creating `bindery.toml`.
//!
//! Collects book metadata and distribution channels through a series of
//! prompts, scaffolds the section directories with starter fragments, and
//! writes both manifests from a scan of the manuscript tree.

use crate::config::{ChannelConfig, ChannelKind, Configuration, ManuscriptConfig, CONFIG_FILE};
use crate::manuscript::author::AuthorBuilder;
use crate::manuscript::fragment::SectionKind;
use crate::manuscript::manifest::FULL_TARGET;
use crate::manuscript::{Author, FragmentStore};
use crate::sinks::{EpubConfig, HtmlConfig, LatexConfig, PageSize};
use anyhow::{anyhow, Context, Result};
use chrono::Datelike;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, FuzzySelect, Input};
use std::path::{Path, PathBuf};

/// Run the interactive configuration wizard.
pub fn run() -> Result<()> {
    let theme = ColorfulTheme::default();

    let root: String = Input::with_theme(&theme)
        .with_prompt("Manuscript directory")
        .default(".".to_string())
        .interact()
        .with_context(|| "Failed to obtain manuscript path")?;
    let root = PathBuf::from(root);
    if !root.exists() || !root.is_dir() {
        return Err(anyhow!("Path '{}' isn't a directory!", root.display()));
    }

    if root.join(CONFIG_FILE).exists()
        && !Confirm::with_theme(&theme)
            .with_prompt(format!("{CONFIG_FILE} already exists. Overwrite it?"))
            .default(false)
            .interact()?
    {
        println!("Leaving the existing configuration alone.");
        return Ok(());
    }

    let title: String = Input::with_theme(&theme)
        .with_prompt("Book title")
        .with_initial_text(suggest_title(&root).unwrap_or_default())
        .allow_empty(false)
        .interact()
        .with_context(|| "Failed to obtain title")?;

    let mut names: Vec<String> = Vec::default();
    'authors: loop {
        let prompt = if names.is_empty() {
            "Author"
        } else {
            "Additional author (leave blank to move on)"
        };
        let name: String = Input::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(!names.is_empty())
            .interact()?;
        if name.trim().is_empty() {
            break 'authors;
        }
        names.push(name.trim().to_string());
    }

    // entry order sets billing: the first author is the most prominent
    let total = names.len();
    let authors = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            AuthorBuilder::default()
                .name(name)
                .prominence(total - i)
                .build()
                .with_context(|| "Failed to build author")
        })
        .collect::<Result<Vec<Author>>>()?;

    let copyright_year: i32 = Input::with_theme(&theme)
        .with_prompt("Copyright year")
        .default(chrono::Local::now().year())
        .interact()?;

    let page_size = {
        let sizes: Vec<String> = PageSize::all().iter().map(ToString::to_string).collect();
        let selection = FuzzySelect::with_theme(&theme)
            .with_prompt("Print page size")
            .items(&sizes)
            .default(0)
            .interact()?;
        PageSize::all()[selection]
    };

    let mut channels: Vec<ChannelConfig> = Vec::default();
    if Confirm::with_theme(&theme)
        .with_prompt("Add a git hosting channel (tags + release assets)?")
        .default(true)
        .interact()?
    {
        let remote: String = Input::with_theme(&theme)
            .with_prompt("Remote to push release tags to (leave blank for local tags only)")
            .allow_empty(true)
            .interact()?;
        channels.push(ChannelConfig {
            name: "hosting".to_string(),
            kind: ChannelKind::Git,
            remote: if remote.trim().is_empty() {
                None
            } else {
                Some(remote.trim().to_string())
            },
            dest: None,
        });
    }
    if Confirm::with_theme(&theme)
        .with_prompt("Add a storefront channel (manuscript drop directory)?")
        .default(false)
        .interact()?
    {
        let dest: String = Input::with_theme(&theme)
            .with_prompt("Storefront drop directory")
            .interact()?;
        channels.push(ChannelConfig {
            name: "storefront".to_string(),
            kind: ChannelKind::Storefront,
            remote: None,
            dest: Some(PathBuf::from(dest)),
        });
    }

    let config = Configuration {
        manuscript: ManuscriptConfig {
            title,
            authors,
            copyright_year,
            manifest_dir: PathBuf::from("manifests"),
            build_dir: PathBuf::from("build"),
            block_globs: Vec::default(),
            preamble_template: None,
        },
        latex: Some(LatexConfig {
            page_size,
            ..LatexConfig::default()
        }),
        epub: Some(EpubConfig::default()),
        html: Some(HtmlConfig::default()),
        channels,
    };

    let (fragments, sample_len) = scaffold(&root, &config)?;
    config.save(&root)?;

    println!("\nCreated {}:", CONFIG_FILE);
    println!("  Fragments:  {} file(s) in manifests/full.txt", fragments);
    println!("  Sample:     {} file(s) in manifests/sample.txt", sample_len);
    println!("  Channels:   {} channel(s)", config.channels.len());
    println!("\nNext: bindery build full");

    Ok(())
}

/// Create the section directories, starter fragments, and both manifests.
fn scaffold(root: &Path, config: &Configuration) -> Result<(usize, usize)> {
    for kind in SectionKind::all() {
        std::fs::create_dir_all(root.join(kind.dir_name()))
            .with_context(|| format!("Failed to create {}/", kind.dir_name()))?;
    }

    // starter fragments, only where nothing exists yet
    let starters: &[(&str, &str)] = &[
        ("front/01-preface.md", "# Preface\n\nWhy this book exists.\n"),
        (
            "chapters/01-introduction.md",
            "# Introduction\n\nStart writing here.\n",
        ),
    ];
    for (path, content) in starters {
        let path = root.join(path);
        if !path.exists() {
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write starter fragment {}", path.display()))?;
        }
    }

    let store = FragmentStore::open(root, config.block_globs()?)?;
    let scanned = store.scan()?;

    // the sample previews the front matter plus the first chapter, which is
    // a subsequence of the full manifest by construction
    let sample: Vec<&PathBuf> = {
        let mut sample: Vec<&PathBuf> = scanned
            .iter()
            .filter(|p| p.starts_with(SectionKind::FrontMatter.dir_name()))
            .collect();
        if let Some(first_chapter) = scanned
            .iter()
            .find(|p| p.starts_with(SectionKind::Chapter.dir_name()))
        {
            sample.push(first_chapter);
        }
        sample
    };

    let manifest_dir = config.manifest_dir(root);
    std::fs::create_dir_all(&manifest_dir)
        .with_context(|| "Failed to create the manifest directory")?;

    let sample_len = sample.len();
    write_manifest(&manifest_dir, FULL_TARGET, scanned.iter())?;
    write_manifest(&manifest_dir, "sample", sample.into_iter())?;

    Ok((scanned.len(), sample_len))
}

fn write_manifest<'a, I: Iterator<Item = &'a PathBuf>>(
    manifest_dir: &Path,
    target: &str,
    entries: I,
) -> Result<()> {
    let mut contents = format!("# fragments for the '{target}' target, in reading order\n");
    for entry in entries {
        contents.push_str(&entry.to_string_lossy());
        contents.push('\n');
    }
    std::fs::write(manifest_dir.join(format!("{target}.txt")), contents)
        .with_context(|| format!("Failed to write the {target} manifest"))
}

/// Suggest a title from the directory name.
fn suggest_title(root: &Path) -> Option<String> {
    let canonical = root.canonicalize().ok()?;
    let dir_name = canonical.file_name()?.to_str()?;

    let title = dir_name
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ");

    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}
