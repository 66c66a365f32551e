use crate::model::song::Song;
use crate::util::now_ms;
use anyhow::Context;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the library record; kept in step with the storage key the
/// record layout was born under.
const LIBRARY_FILE: &str = "zedSongs.json";

/// Durable store for the song library: one JSON file, read fully on every
/// query and rewritten fully on every change. Last writer wins.
pub struct SongStore {
    path: PathBuf,
}

impl SongStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

        Ok(Self {
            path: dir.join(LIBRARY_FILE),
        })
    }

    /// Every persisted song, in save order. A missing or unreadable
    /// library reads as empty rather than failing the caller.
    pub fn list(&self) -> Vec<Song> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str(&raw) {
            Ok(songs) => songs,
            Err(why) => {
                warn!(
                    "Unreadable song library at {}, treating as empty..! why: {:?}",
                    self.path.display(),
                    why
                );
                Vec::new()
            }
        }
    }

    pub fn find(&self, id: u64) -> Option<Song> {
        self.list().into_iter().find(|s| s.id == id)
    }

    /// Persist `song` under a fresh id and return it. The id derives from
    /// the save-time clock, bumped past any existing id so it stays
    /// unique across the library.
    pub fn save(&self, mut song: Song) -> anyhow::Result<u64> {
        let mut songs = self.list();

        let mut id = now_ms();
        if let Some(max) = songs.iter().map(|s| s.id).max()
            && id <= max
        {
            id = max + 1;
        }

        song.id = id;
        songs.push(song);
        self.write(&songs)?;

        debug!("Saved song {} ({} in the library)..!", id, songs.len());
        Ok(id)
    }

    /// Remove the song with `id`. Deleting an absent id is a success.
    pub fn delete(&self, id: u64) -> anyhow::Result<()> {
        let mut songs = self.list();
        songs.retain(|s| s.id != id);
        self.write(&songs)
    }

    fn write(&self, songs: &[Song]) -> anyhow::Result<()> {
        let raw =
            serde_json::to_string_pretty(songs).context("Failed to serialize the song library")?;

        fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write the song library to {}", self.path.display()))
    }
}
