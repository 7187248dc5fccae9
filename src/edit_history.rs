//! Local persistence of previously performed corrections.
//!
//! Lets users re-select a prior edit instead of re-typing it. Entries
//! live per-user in the XDG data directory as a plain JSON array:
//! `~/.local/share/scrobble-mend/users/{username}/edit_history.json`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::EditHistoryEntry;
use crate::{Result, ScrobbleMendError};

/// File-backed store of [`EditHistoryEntry`] values.
///
/// Entries are keyed by the (originalArtist, originalAlbum,
/// originalTrack) triple; upserting an entry with an existing key
/// overwrites it in place. Entries never expire on their own.
#[derive(Debug)]
pub struct EditHistoryStore {
    path: PathBuf,
    entries: Vec<EditHistoryEntry>,
}

impl EditHistoryStore {
    /// Open (or create empty) the store for a username under the XDG
    /// data directory.
    pub fn open_for_user(username: &str) -> Result<Self> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            ScrobbleMendError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "cannot determine XDG data directory",
            ))
        })?;
        Self::open_under(&data_dir, username)
    }

    /// Open the store for a username under an explicit root directory.
    pub fn open_under(root: &Path, username: &str) -> Result<Self> {
        let path = root
            .join("scrobble-mend")
            .join("users")
            .join(username)
            .join("edit_history.json");
        Self::open(path)
    }

    /// Open the store at an explicit file path.
    pub fn open(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let json = fs::read_to_string(&path)?;
            serde_json::from_str(&json).map_err(|e| ScrobbleMendError::Parse(e.to_string()))?
        } else {
            Vec::new()
        };
        Ok(Self { path, entries })
    }

    /// All stored entries, most recently edited last.
    pub fn entries(&self) -> &[EditHistoryEntry] {
        &self.entries
    }

    /// Insert an entry, replacing any existing entry with the same
    /// original triple, and persist.
    pub fn upsert(&mut self, entry: EditHistoryEntry) -> Result<()> {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.key() == entry.key()) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
        self.save()
    }

    /// Remove the entry with the given original triple, if present.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, artist: &str, album: &str, track: &str) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.key() != (artist, album, track));
        let removed = self.entries.len() != before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| ScrobbleMendError::Parse(e.to_string()))?;
        fs::write(&self.path, json)?;
        log::debug!("edit history saved to {}", self.path.display());
        Ok(())
    }
}
