use anyhow::{anyhow, Context, Result};
use channels::{sync_all, ChannelStateStore};
use cli::Cli;
use config::Configuration;
use indicatif::{ProgressBar, ProgressStyle};
use manuscript::manifest::FULL_TARGET;
use release::ReleaseStore;
use sinks::{Format, RenderContext};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

mod channels;
mod cli;
mod config;
mod manuscript;
mod markdown;
mod pipeline;
mod release;
mod sinks;
mod wizard;

fn main() -> ExitCode {
    if let Err(e) = try_main() {
        eprintln!("{}: {e:#}", console::style("Error").red());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    use clap::Parser;
    let cli = Cli::parse();
    let root = Path::new(".");

    match &cli.command {
        cli::Commands::Init => wizard::run(),
        cli::Commands::Resolve { target } => cmd_resolve(root, target),
        cli::Commands::Build { target, formats } => cmd_build(root, target, formats),
        cli::Commands::Release { version, notes } => cmd_release(root, version, notes),
        cli::Commands::Publish { version } => cmd_publish(root, version),
        cli::Commands::Sync {
            channels,
            all,
            timeout_secs,
        } => cmd_sync(root, channels, *all, *timeout_secs),
        cli::Commands::Status => cmd_status(root),
    }
}

fn cmd_resolve(root: &Path, target: &str) -> Result<()> {
    let config = Configuration::load(root)?;
    let store = manuscript::FragmentStore::open(root, config.block_globs()?)?;
    let fragments = manuscript::resolve(&config.manifest_dir(root), target, &store)
        .with_context(|| format!("Failed to resolve target '{target}'"))?;

    println!("Target '{}' resolves to {} fragment(s):", target, fragments.len());
    for fragment in &fragments {
        println!(
            "  {:<13} {:<32} {}",
            fragment.kind.to_string(),
            fragment.path.display(),
            fragment.title()
        );
    }

    Ok(())
}

fn cmd_build(root: &Path, target: &str, formats: &[Format]) -> Result<()> {
    println!("Loading configuration...");
    let config = Configuration::load(root)?;
    let formats = if formats.is_empty() {
        config.configured_formats()
    } else {
        formats.to_vec()
    };

    let progress = ProgressBar::new(formats.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("can parse progress style")
            .progress_chars("#>-"),
    );
    progress.set_message(format!("Rendering '{target}'..."));

    let ctx = RenderContext::new(chrono::Local::now().date_naive());
    let report = pipeline::build(root, &config, target, &formats, &ctx, &progress)?;
    progress.finish_and_clear();

    for result in &report.results {
        match result {
            Ok(written) => {
                let size = byte_unit::Byte::from_u64(written.size)
                    .get_appropriate_unit(byte_unit::UnitType::Binary);
                println!(
                    "  {:<6} {}  {} ({:.2})",
                    written.format.to_string(),
                    console::style("ok").green(),
                    written.path.display(),
                    size
                );
            }
            Err(failure) => {
                println!(
                    "  {:<6} {}  {:#}",
                    failure.format.to_string(),
                    console::style("failed").red(),
                    failure.source
                );
            }
        }
    }

    let failed = report.failure_count();
    if failed > 0 {
        Err(anyhow!(
            "{failed} of {} format(s) failed for target '{target}'",
            report.results.len()
        ))
    } else {
        println!("\nBuilt {} artifact(s) for target '{target}'", report.results.len());
        Ok(())
    }
}

fn cmd_release(root: &Path, version: &semver::Version, notes: &str) -> Result<()> {
    let config = Configuration::load(root)?;

    // releases only bundle artifacts an earlier build produced
    let artifacts = pipeline::recorded_artifacts(root, &config, FULL_TARGET)?;

    let store = ReleaseStore::open(root)?;
    let release = store.create_draft(version.clone(), artifacts, notes.to_string())?;

    println!("Recorded draft release {}:", release.version);
    println!("  Artifacts:  {} file(s)", release.artifacts.len());
    println!("  Changelog:  CHANGELOG.md updated");
    println!("\nNext: bindery publish {}", release.version);
    Ok(())
}

fn cmd_publish(root: &Path, version: &semver::Version) -> Result<()> {
    let store = ReleaseStore::open(root)?;
    let release = store.publish(version)?;
    println!("Published release {}", release.version);
    println!("\nNext: bindery sync --all");
    Ok(())
}

fn cmd_sync(
    root: &Path,
    names: &[String],
    all: bool,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let config = Configuration::load(root)?;

    let selected: Vec<_> = if all {
        config.channels.iter().collect()
    } else {
        names
            .iter()
            .map(|name| {
                config
                    .channels
                    .iter()
                    .find(|c| &c.name == name)
                    .ok_or_else(|| anyhow!("No channel named '{name}' in {}", config::CONFIG_FILE))
            })
            .collect::<Result<_>>()?
    };
    if selected.is_empty() {
        return Err(anyhow!(
            "No channels selected - name one or pass --all (configured: {})",
            config
                .channels
                .iter()
                .map(|c| c.name.clone())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    let store = ReleaseStore::open(root)?;
    let release = store.latest_published().ok_or_else(|| {
        anyhow!("No published release to sync - run 'bindery publish <version>' first")
    })?;

    let manifest_dir = config.manifest_dir(root);
    let channels = selected
        .iter()
        .map(|c| c.instantiate(root, &manifest_dir))
        .collect::<Result<Vec<_>>>()?;
    let states = ChannelStateStore::open(root)?;

    println!(
        "Syncing release {} to {} channel(s)...",
        release.version,
        channels.len()
    );
    let reports = sync_all(
        &channels,
        &release,
        &states,
        timeout_secs.map(Duration::from_secs),
    );

    for report in &reports {
        match &report.result {
            Ok(()) => {
                println!("  {:<12} {}", report.channel, console::style("synced").green());
            }
            Err(e) => {
                let label = if e.is_transient() {
                    "failed (retryable)"
                } else {
                    "failed"
                };
                println!(
                    "  {:<12} {}  {}",
                    report.channel,
                    console::style(label).red(),
                    e
                );
            }
        }
    }

    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    if failed > 0 {
        Err(anyhow!("{failed} of {} channel(s) failed to sync", reports.len()))
    } else {
        Ok(())
    }
}

fn cmd_status(root: &Path) -> Result<()> {
    let config = Configuration::load(root)?;
    let store = ReleaseStore::open(root)?;

    match store.latest() {
        Some(release) => {
            let state = match release.state {
                release::ReleaseState::Draft => "draft",
                release::ReleaseState::Published => "published",
            };
            println!(
                "Latest release: {} ({}, created {})",
                release.version,
                state,
                release.created_at.format("%Y-%m-%d")
            );
            for artifact in &release.artifacts {
                let size = byte_unit::Byte::from_u64(artifact.size)
                    .get_appropriate_unit(byte_unit::UnitType::Binary);
                println!("  {:<6} {} ({:.2})", artifact.format, artifact.path.display(), size);
            }
        }
        None => println!("No releases yet."),
    }

    if config.channels.is_empty() {
        println!("\nNo channels configured.");
        return Ok(());
    }

    let states = ChannelStateStore::open(root)?;
    println!("\nChannels:");
    for channel in &config.channels {
        match states.get(&channel.name) {
            Some(state) => {
                let synced = match (&state.last_synced_version, &state.last_synced_at) {
                    (Some(version), Some(at)) => {
                        format!("v{} ({})", version, at.format("%Y-%m-%d"))
                    }
                    _ => "never synced".to_string(),
                };
                print!("  {:<12} {}", channel.name, synced);
                if let Some(error) = &state.last_error {
                    print!("  {} {}", console::style("last error:").red(), error);
                }
                println!();
            }
            None => println!("  {:<12} never synced", channel.name),
        }
    }

    Ok(())
}
