//! Distribution channel sync.
//!
//! A channel is an external endpoint a published release is pushed to: a
//! source-control host that takes a tag plus named assets, or a storefront
//! that ingests the manuscript tree and regenerates its own output. Channels
//! are uniform behind the [`Channel`] trait, sync independently (one
//! channel's failure never blocks another), and each keeps its own
//! [`ChannelState`] record. A failed attempt records the error and nothing
//! else — staleness is never reported as success.

mod git;
mod storefront;

pub use git::GitChannel;
pub use storefront::StorefrontChannel;

use crate::release::{Release, ReleaseState};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Retryable; the attempt left no partial state behind.
    #[error("transient sync failure: {0}")]
    Transient(String),
    /// Needs operator action before a retry can succeed.
    #[error("permanent sync failure: {0}")]
    Permanent(String),
}

impl SyncError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transient(_))
    }
}

/// Classify an io error from a transfer step.
pub(crate) fn classify_io(op: &str, e: std::io::Error) -> SyncError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock => {
            SyncError::Transient(format!("{op}: {e}"))
        }
        _ => SyncError::Permanent(format!("{op}: {e}")),
    }
}

/// Wall-clock budget for one sync attempt. Exceeding it is a transient
/// failure: the operator retries, nothing is corrupted.
#[derive(Debug, Clone)]
pub struct SyncContext {
    started: Instant,
    timeout: Option<Duration>,
}

impl SyncContext {
    pub fn new(timeout: Option<Duration>) -> SyncContext {
        SyncContext {
            started: Instant::now(),
            timeout,
        }
    }

    /// Check the deadline between transfer steps.
    pub fn check_deadline(&self) -> Result<(), SyncError> {
        if let Some(timeout) = self.timeout {
            if self.started.elapsed() > timeout {
                return Err(SyncError::Transient(format!(
                    "sync deadline of {}s exceeded",
                    timeout.as_secs()
                )));
            }
        }
        Ok(())
    }
}

pub trait Channel: Send + Sync {
    fn name(&self) -> &str;
    fn sync(&self, release: &Release, ctx: &SyncContext) -> Result<(), SyncError>;
}

/// Per-channel sync state: one record per channel, updated at most once per
/// attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelState {
    pub last_synced_version: Option<Version>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// The channel state file at `.bindery/channels.json`.
pub struct ChannelStateStore {
    path: PathBuf,
    states: Mutex<BTreeMap<String, ChannelState>>,
}

impl ChannelStateStore {
    pub fn open(root: &Path) -> std::io::Result<ChannelStateStore> {
        let path = root.join(".bindery").join("channels.json");
        let states = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::default(),
            Err(e) => return Err(e),
        };

        Ok(ChannelStateStore {
            path,
            states: Mutex::new(states),
        })
    }

    pub fn get(&self, channel: &str) -> Option<ChannelState> {
        let states = self.states.lock().expect("channel state lock");
        states.get(channel).cloned()
    }

    /// Record a successful sync: version and timestamp advance, the error
    /// clears. Touches only the named channel's record.
    pub fn record_success(&self, channel: &str, version: &Version) -> std::io::Result<()> {
        let mut states = self.states.lock().expect("channel state lock");
        let state = states.entry(channel.to_string()).or_default();
        state.last_synced_version = Some(version.clone());
        state.last_synced_at = Some(Utc::now());
        state.last_error = None;
        self.persist(&states)
    }

    /// Record a failed sync: only `last_error` changes — the synced version
    /// and timestamp stay where they were, so a stale channel never looks
    /// current.
    pub fn record_failure(&self, channel: &str, error: &SyncError) -> std::io::Result<()> {
        let mut states = self.states.lock().expect("channel state lock");
        let state = states.entry(channel.to_string()).or_default();
        state.last_error = Some(error.to_string());
        self.persist(&states)
    }

    fn persist(&self, states: &BTreeMap<String, ChannelState>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(states)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, json)
    }
}

/// The result of one channel's sync attempt.
pub struct ChannelReport {
    pub channel: String,
    pub result: Result<(), SyncError>,
}

/// Sync a published release to every given channel, independently and in
/// parallel. Each channel's state is updated exactly once, after its own
/// attempt; reports come back in channel order.
pub fn sync_all(
    channels: &[Box<dyn Channel>],
    release: &Release,
    states: &ChannelStateStore,
    timeout: Option<Duration>,
) -> Vec<ChannelReport> {
    debug_assert_eq!(release.state, ReleaseState::Published);

    channels
        .par_iter()
        .map(|channel| {
            let ctx = SyncContext::new(timeout);
            let result = channel.sync(release, &ctx);

            let recorded = match &result {
                Ok(()) => states.record_success(channel.name(), &release.version),
                Err(e) => states.record_failure(channel.name(), e),
            };
            if let Err(e) = recorded {
                log::warn!("failed to persist state for channel '{}': {}", channel.name(), e);
            }

            ChannelReport {
                channel: channel.name().to_string(),
                result,
            }
        })
        .collect()
}
