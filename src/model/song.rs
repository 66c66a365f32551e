use crate::model::note::Note;
use serde::{Deserialize, Serialize};

/// A single played note and the wall-clock instant it was captured, in
/// Unix milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub note: Note,
    pub time: u64,
}

/// A named, tempo-tagged sequence of note events, as persisted in the
/// song library. Field names match the stored record layout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Song {
    pub id: u64,
    pub name: String,
    pub notes: Vec<NoteEvent>,
    pub tempo: u32,
    #[serde(rename = "dateCreated")]
    pub date_created: String,
}

impl Song {
    /// Build a song from the working sequence. A blank name falls back to
    /// "Untitled Song". The id is assigned by the store at save time.
    pub fn new(name: &str, notes: Vec<NoteEvent>, tempo: u32, date_created: String) -> Self {
        let name = name.trim();
        let name = if name.is_empty() {
            String::from("Untitled Song")
        } else {
            name.to_owned()
        };

        Self {
            id: 0,
            name,
            notes,
            tempo,
            date_created,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blank_names_become_untitled() {
        let song = Song::new("  ", Vec::new(), 120, String::from("2026-08-07"));
        assert_eq!(song.name, "Untitled Song");

        let song = Song::new(" Lullaby ", Vec::new(), 120, String::from("2026-08-07"));
        assert_eq!(song.name, "Lullaby");
    }

    #[test]
    fn persisted_shape_matches_the_record_layout() {
        let song = Song {
            id: 17,
            name: String::from("Test"),
            notes: vec![NoteEvent {
                note: Note::E4,
                time: 1200,
            }],
            tempo: 90,
            date_created: String::from("2026-08-07"),
        };

        let raw = serde_json::to_string(&song).unwrap();
        assert!(raw.contains("\"dateCreated\":\"2026-08-07\""));
        assert!(raw.contains("\"notes\":[{\"note\":\"E4\",\"time\":1200}]"));

        let back: Song = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, song);
    }
}
