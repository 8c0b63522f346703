//! JSON-file backed store of [`StreamSessionState`] records.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::Result;
use crate::domain::{StreamSessionState, channel_key};
use crate::utils::fs::{io_error, write_atomic};

/// Owns every session record for the lifetime of the process.
///
/// Records are keyed by [`channel_key`], so lookups are case-insensitive while
/// each record keeps the display name it was created with.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    states: HashMap<String, StreamSessionState>,
}

impl StateStore {
    /// Create an empty store backed by `path` without reading it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            states: HashMap::new(),
        }
    }

    /// Create a store and load whatever state `path` holds.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(path);
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory records with the contents of the state file.
    ///
    /// Never fails: a missing, unreadable or corrupt file leaves the store
    /// empty. Returns the number of records loaded.
    pub fn load(&mut self) -> usize {
        self.states.clear();

        if !self.path.exists() {
            info!(path = %self.path.display(), "No existing state file found, starting fresh");
            return 0;
        }

        match read_state_file(&self.path) {
            Ok(states) => {
                self.states = states;
                info!(
                    path = %self.path.display(),
                    count = self.states.len(),
                    "Loaded stream state"
                );
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to load state file, starting fresh"
                );
            }
        }

        self.states.len()
    }

    /// Write every record to the state file atomically.
    pub fn save(&self) -> Result<()> {
        let ordered: BTreeMap<&str, &StreamSessionState> = self
            .states
            .iter()
            .map(|(key, state)| (key.as_str(), state))
            .collect();

        write_atomic(&self.path, |w| {
            serde_json::to_writer_pretty(&mut *w, &ordered)?;
            w.write_all(b"\n")
        })?;

        debug!(path = %self.path.display(), count = ordered.len(), "State saved");
        Ok(())
    }

    /// Return the record for `channel_name`, inserting a never-seen record if needed.
    pub fn get_or_create(
        &mut self,
        channel_name: &str,
        now: DateTime<Utc>,
    ) -> &mut StreamSessionState {
        self.states
            .entry(channel_key(channel_name))
            .or_insert_with(|| StreamSessionState::new(channel_name.trim(), now))
    }

    pub fn get(&self, channel_name: &str) -> Option<&StreamSessionState> {
        self.states.get(&channel_key(channel_name))
    }

    /// Remove records of channels that are no longer configured and were last
    /// checked more than `max_age` ago.
    ///
    /// `active_channels` holds configured names; they are compared
    /// case-insensitively. Returns the display names of removed records.
    /// Nothing is removed when `now - max_age` is not representable.
    pub fn sweep_stale(
        &mut self,
        active_channels: &HashSet<String>,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let Some(cutoff) = now.checked_sub_signed(max_age) else {
            warn!(
                max_age_days = max_age.num_days(),
                "Retention period out of range, skipping sweep"
            );
            return Vec::new();
        };
        let active: HashSet<String> = active_channels.iter().map(|n| channel_key(n)).collect();
        let mut removed = Vec::new();

        self.states.retain(|key, state| {
            let keep = active.contains(key) || state.last_checked_at >= cutoff;
            if !keep {
                removed.push(state.channel_name.clone());
            }
            keep
        });

        for name in &removed {
            info!(channel = %name, "Removed stale state");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

fn read_state_file(path: &Path) -> Result<HashMap<String, StreamSessionState>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| io_error("reading state file", path, e))?;
    let raw: HashMap<String, StreamSessionState> = serde_json::from_str(&content)?;

    let mut states: HashMap<String, StreamSessionState> = HashMap::with_capacity(raw.len());
    for (name, mut state) in raw {
        if state.channel_name.trim().is_empty() {
            state.channel_name = name.trim().to_string();
        }
        if state.normalize() {
            warn!(channel = %state.channel_name, "Repaired inconsistent state record");
        }

        match states.entry(channel_key(&name)) {
            Entry::Vacant(slot) => {
                slot.insert(state);
            }
            Entry::Occupied(mut slot) => {
                // Same channel under different casing: keep the freshest record.
                if state.last_checked_at > slot.get().last_checked_at {
                    slot.insert(state);
                }
            }
        }
    }

    Ok(states)
}
