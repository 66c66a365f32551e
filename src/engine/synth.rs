use crate::engine::ToneEngine;
use crate::model::note::{Note, pad_for_note};
use anyhow::{Context, anyhow, bail};
use cpal::SampleFormat;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, warn};
use std::f32::consts::PI;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

/// Length of every tone, in seconds.
const TONE_SECS: f64 = 0.5;
/// Envelope start gain and the floor it decays toward.
const GAIN_START: f32 = 0.3;
const GAIN_END: f32 = 0.01;

/// One sounding tone. The output callback mixes it until its samples run
/// out, then drops it.
struct Voice {
    phase: f32,
    phase_step: f32,
    gain: f32,
    decay: f32,
    samples_left: u64,
}

impl Voice {
    fn new(frequency: f64, sample_rate: f32) -> Self {
        let samples = (TONE_SECS * sample_rate as f64) as u64;

        // Per-sample multiplier so the gain lands on GAIN_END after the
        // full duration, without ever reaching zero.
        let decay = (GAIN_END / GAIN_START).powf(1.0 / samples as f32);

        Self {
            phase: 0.0,
            phase_step: (frequency / sample_rate as f64) as f32,
            gain: GAIN_START,
            decay,
            samples_left: samples,
        }
    }

    fn sample(&mut self) -> f32 {
        let out = (self.phase * 2.0 * PI).sin() * self.gain;

        self.phase = (self.phase + self.phase_step).fract();
        self.gain *= self.decay;
        self.samples_left = self.samples_left.saturating_sub(1);

        out
    }

    fn finished(&self) -> bool {
        self.samples_left == 0
    }
}

/// Shared face of the audio stack: the pending voices and the stream's
/// sample rate.
struct Mixer {
    voices: Arc<Mutex<Vec<Voice>>>,
    sample_rate: f32,
}

/// Tone engine backed by the default output device.
///
/// The audio stack is built once, on the first `play` call. The cpal
/// stream is not `Send`, so it lives on a dedicated thread that parks
/// after starting it; the engine only keeps the shared voice list.
pub struct SynthEngine {
    mixer: OnceLock<Option<Mixer>>,
}

impl SynthEngine {
    pub fn new() -> Self {
        Self {
            mixer: OnceLock::new(),
        }
    }

    fn mixer(&self) -> Option<&Mixer> {
        self.mixer
            .get_or_init(|| {
                let voices = Arc::new(Mutex::new(Vec::new()));

                match spawn_output_thread(Arc::clone(&voices)) {
                    Ok(sample_rate) => {
                        debug!("Audio output ready at {} Hz..!", sample_rate);
                        Some(Mixer {
                            voices,
                            sample_rate,
                        })
                    }
                    Err(why) => {
                        warn!("Audio output unavailable, running silent..! why: {:?}", why);
                        None
                    }
                }
            })
            .as_ref()
    }
}

impl Default for SynthEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ToneEngine for SynthEngine {
    fn play(&self, note: Note) -> anyhow::Result<()> {
        let Some(pad) = pad_for_note(note) else {
            return Ok(());
        };

        // Init failed earlier: stay silent rather than erroring every tap.
        let Some(mixer) = self.mixer() else {
            return Ok(());
        };

        let Ok(mut voices) = mixer.voices.lock() else {
            bail!("Failed to lock the voice list..!");
        };
        voices.push(Voice::new(pad.frequency, mixer.sample_rate));

        Ok(())
    }
}

/// Start the thread that owns the output stream. Returns the stream's
/// sample rate once the stream is live.
fn spawn_output_thread(voices: Arc<Mutex<Vec<Voice>>>) -> anyhow::Result<f32> {
    let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<f32>>();

    thread::Builder::new()
        .name(String::from("zedsong-audio"))
        .spawn(move || run_output(voices, ready_tx))
        .context("Failed to spawn the audio thread")?;

    match ready_rx.recv() {
        Ok(ready) => ready,
        Err(_) => Err(anyhow!("Audio thread exited before reporting readiness")),
    }
}

fn run_output(voices: Arc<Mutex<Vec<Voice>>>, ready_tx: mpsc::Sender<anyhow::Result<f32>>) {
    let stream = match build_stream(voices) {
        Ok((stream, sample_rate)) => {
            let _ = ready_tx.send(Ok(sample_rate));
            stream
        }
        Err(why) => {
            let _ = ready_tx.send(Err(why));
            return;
        }
    };

    // The stream must outlive every tone; park here for the life of the
    // process instead of handing the !Send stream to another thread.
    let _stream = stream;
    loop {
        thread::park();
    }
}

fn build_stream(voices: Arc<Mutex<Vec<Voice>>>) -> anyhow::Result<(cpal::Stream, f32)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No audio output device found"))?;

    let config = device
        .supported_output_configs()
        .context("Failed to query output configs")?
        .find(|c| c.sample_format() == SampleFormat::F32)
        .ok_or_else(|| anyhow!("No f32 output config available"))?
        .with_max_sample_rate();

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| mix_into(&voices, channels, data),
            |why| warn!("Audio stream error..! why: {:?}", why),
            None,
        )
        .context("Failed to build the output stream")?;

    stream.play().context("Failed to start the output stream")?;

    Ok((stream, sample_rate))
}

fn mix_into(voices: &Mutex<Vec<Voice>>, channels: usize, data: &mut [f32]) {
    data.fill(0.0);

    let Ok(mut voices) = voices.lock() else {
        return;
    };

    if voices.is_empty() {
        return;
    }

    for frame in data.chunks_exact_mut(channels) {
        let mut mixed = 0.0;
        for voice in voices.iter_mut() {
            mixed += voice.sample();
        }
        for channel in frame.iter_mut() {
            *channel = mixed;
        }
    }

    voices.retain(|v| !v.finished());
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn voice_runs_for_half_a_second() {
        let mut voice = Voice::new(440.0, SAMPLE_RATE);
        let expected = (TONE_SECS * SAMPLE_RATE as f64) as u64;

        let mut produced = 0u64;
        while !voice.finished() {
            voice.sample();
            produced += 1;
        }

        assert_eq!(produced, expected);
    }

    #[test]
    fn envelope_decays_toward_the_floor() {
        let mut voice = Voice::new(261.63, SAMPLE_RATE);
        let mut previous_gain = voice.gain;

        while !voice.finished() {
            voice.sample();
            assert!(voice.gain <= previous_gain);
            previous_gain = voice.gain;
        }

        // Exponential ramp lands on the floor, never on zero.
        assert!(voice.gain > 0.0);
        assert!((voice.gain - GAIN_END).abs() < 0.005);
    }

    #[test]
    fn samples_stay_inside_the_start_gain() {
        let mut voice = Voice::new(523.25, SAMPLE_RATE);

        while !voice.finished() {
            let sample = voice.sample();
            assert!(sample.abs() <= GAIN_START);
        }
    }

    #[test]
    fn first_sample_starts_at_phase_zero() {
        let mut voice = Voice::new(440.0, SAMPLE_RATE);
        assert!(voice.sample().abs() < 0.001);
    }

    #[test]
    fn mixer_drops_finished_voices() {
        let voices = Mutex::new(vec![Voice::new(440.0, 10.0)]);
        let mut data = vec![0.0f32; 16];

        // 5 samples at 10 Hz sample rate exhausts the half-second voice.
        mix_into(&voices, 2, &mut data);

        assert!(voices.lock().unwrap().is_empty());
    }
}
