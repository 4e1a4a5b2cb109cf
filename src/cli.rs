use crate::sinks::Format;
use clap::{Parser, Subcommand};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generates a bindery.toml config file and scaffolds the manuscript
    Init,
    /// Resolves a target's manifest and lists its fragments in order
    Resolve {
        /// Distribution target, e.g. "full" or "sample"
        target: String,
    },
    /// Builds a target's artifacts in the requested formats
    Build {
        /// Distribution target, e.g. "full" or "sample"
        target: String,
        /// Formats to render; defaults to every configured format
        #[clap(long, value_delimiter = ',')]
        formats: Vec<Format>,
    },
    /// Records a draft release from the latest build of the full target
    Release {
        /// Semantic version for the release, e.g. 1.2.0
        version: semver::Version,
        /// Changelog notes for this release
        #[clap(long, default_value = "")]
        notes: String,
    },
    /// Promotes a draft release to published
    Publish {
        version: semver::Version,
    },
    /// Syncs the latest published release to distribution channels
    Sync {
        /// Channel names to sync; use --all for every configured channel
        channels: Vec<String>,
        #[clap(long)]
        all: bool,
        /// Per-attempt deadline; exceeding it is a retryable failure
        #[clap(long)]
        timeout_secs: Option<u64>,
    },
    /// Shows the latest release and per-channel sync state
    Status,
}

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}
