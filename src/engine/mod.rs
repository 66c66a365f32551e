use crate::model::note::Note;

pub mod synth;

pub use synth::SynthEngine;

/// Sound-output seam between the pads/player and the audio stack.
pub trait ToneEngine: Send + Sync {
    /// Sound the note's fixed-frequency envelope. Must return quickly;
    /// the tone decays on the audio thread.
    fn play(&self, note: Note) -> anyhow::Result<()>;
}

/// Engine that never makes a sound. Used with `--muted`, and by tests
/// that only care about sequencing.
#[derive(Debug, Default)]
pub struct SilentEngine;

impl ToneEngine for SilentEngine {
    fn play(&self, _note: Note) -> anyhow::Result<()> {
        Ok(())
    }
}
