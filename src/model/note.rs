use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the eight fixed pitches the pad can sound, C4 through C5.
/// Serializes to its name string ("C4".."C5"), the shape the song
/// library stores.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Note {
    C4,
    D4,
    E4,
    F4,
    G4,
    A4,
    B4,
    C5,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(pad_for_note(*self).map(|p| p.label).unwrap_or("??"))
    }
}

/// A playable pad: the note it sounds, its fixed frequency in Hz, and the
/// keyboard key that triggers it.
#[derive(Debug, Clone, Copy)]
pub struct Pad {
    pub note: Note,
    pub frequency: f64,
    pub key: char,
    pub label: &'static str,
}

// Pad order is display order, left to right.
pub const PADS: &[Pad] = &[
    Pad {
        note: Note::C4,
        frequency: 261.63,
        key: 'c',
        label: "C4",
    },
    Pad {
        note: Note::D4,
        frequency: 293.66,
        key: 'd',
        label: "D4",
    },
    Pad {
        note: Note::E4,
        frequency: 329.63,
        key: 'e',
        label: "E4",
    },
    Pad {
        note: Note::F4,
        frequency: 349.23,
        key: 'f',
        label: "F4",
    },
    Pad {
        note: Note::G4,
        frequency: 392.00,
        key: 'g',
        label: "G4",
    },
    Pad {
        note: Note::A4,
        frequency: 440.00,
        key: 'a',
        label: "A4",
    },
    Pad {
        note: Note::B4,
        frequency: 493.88,
        key: 'b',
        label: "B4",
    },
    Pad {
        note: Note::C5,
        frequency: 523.25,
        key: ' ',
        label: "C5",
    },
];

/// Return a reference to the pad for the given note, if present.
pub fn pad_for_note(note: Note) -> Option<&'static Pad> {
    PADS.iter().find(|p| p.note == note)
}

/// Return the pad bound to a keyboard key, if any. Unbound keys yield
/// `None` and the caller ignores them.
pub fn pad_for_key(key: char) -> Option<&'static Pad> {
    let key = key.to_ascii_lowercase();
    PADS.iter().find(|p| p.key == key)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_note_has_a_pad() {
        for pad in PADS {
            let found = pad_for_note(pad.note).expect("pad should resolve");
            assert_eq!(found.key, pad.key);
            assert!(found.frequency > 0.0);
        }
    }

    #[test]
    fn keys_map_to_notes() {
        assert_eq!(pad_for_key('g').map(|p| p.note), Some(Note::G4));
        assert_eq!(pad_for_key('G').map(|p| p.note), Some(Note::G4));
        assert_eq!(pad_for_key(' ').map(|p| p.note), Some(Note::C5));
        assert!(pad_for_key('z').is_none());
        assert!(pad_for_key('9').is_none());
    }

    #[test]
    fn concert_pitch_is_440() {
        let a4 = pad_for_note(Note::A4).unwrap();
        assert_eq!(a4.frequency, 440.00);
    }

    #[test]
    fn notes_serialize_as_name_strings() {
        assert_eq!(serde_json::to_string(&Note::C4).unwrap(), "\"C4\"");
        let parsed: Note = serde_json::from_str("\"C5\"").unwrap();
        assert_eq!(parsed, Note::C5);
        assert!(serde_json::from_str::<Note>("\"H9\"").is_err());
    }
}
