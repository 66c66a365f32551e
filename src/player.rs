use crate::engine::ToneEngine;
use crate::model::note::Note;
use crate::model::song::NoteEvent;
use anyhow::bail;
use log::{debug, info, warn};
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

enum ControlMsg {
    Stop,
}

/// A note with its absolute playback offset from the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledNote {
    pub note: Note,
    pub offset_ms: u64,
}

/// Compute absolute fire times for a recorded sequence at the given
/// tempo. The first note fires at zero; every following note waits for
/// the recorded gap or half a beat, whichever is longer, so playback
/// keeps the original pacing but never runs faster than half a beat per
/// note.
pub fn build_schedule(events: &[NoteEvent], tempo: u32) -> Vec<ScheduledNote> {
    let beat_ms = 60_000.0 / tempo.max(1) as f64;
    let floor_ms = beat_ms * 0.5;

    let mut schedule = Vec::with_capacity(events.len());
    let mut offset_ms = 0u64;

    for (i, event) in events.iter().enumerate() {
        if i > 0 {
            let gap_ms = event.time.saturating_sub(events[i - 1].time) as f64;
            offset_ms += gap_ms.max(floor_ms).round() as u64;
        }

        schedule.push(ScheduledNote {
            note: event.note,
            offset_ms,
        });
    }

    schedule
}

/// Replays a recorded sequence against a tone engine on a worker thread.
///
/// The `playing` flag is the sole coordination point: it is checked
/// immediately before every scheduled note, so a `stop` takes effect at
/// the next step rather than preemptively.
pub struct Player<E: ToneEngine> {
    engine: Arc<E>,
    playing: Arc<AtomicBool>,
    fired: Arc<Mutex<Vec<Note>>>,
    control_tx: Mutex<Option<Sender<ControlMsg>>>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<E: ToneEngine + 'static> Player<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            playing: Arc::new(AtomicBool::new(false)),
            fired: Arc::new(Mutex::new(Vec::new())),
            control_tx: Mutex::new(None),
            worker_handle: Mutex::new(None),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Notes the worker has fired since the last drain. The view polls
    /// this to pulse pads during playback.
    pub fn drain_fired(&self) -> Vec<Note> {
        match self.fired.lock() {
            Ok(mut fired) => std::mem::take(&mut *fired),
            Err(_) => Vec::new(),
        }
    }

    /// Start replaying `events`. An empty sequence is ignored, and so is a
    /// start while another run is still in flight.
    pub fn play(&self, events: &[NoteEvent], tempo: u32) -> anyhow::Result<()> {
        if events.is_empty() {
            debug!("Ignoring playback of an empty sequence..!");
            return Ok(());
        }

        if self.playing.swap(true, Ordering::SeqCst) {
            debug!("Playback already running, ignoring..!");
            return Ok(());
        }

        {
            let Ok(mut guard) = self.worker_handle.lock() else {
                self.playing.store(false, Ordering::SeqCst);
                bail!("Failed to lock worker handle..!");
            };

            // The previous run has cleared the flag, so its worker is done;
            // reap the handle before installing a new one.
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }

        let schedule = build_schedule(events, tempo);
        let engine = Arc::clone(&self.engine);
        let playing = Arc::clone(&self.playing);
        let fired = Arc::clone(&self.fired);
        let (tx, rx) = mpsc::channel::<ControlMsg>();

        {
            let Ok(mut ctl) = self.control_tx.lock() else {
                self.playing.store(false, Ordering::SeqCst);
                bail!("Failed to lock control_tx..!");
            };
            *ctl = Some(tx);
        }

        info!(
            "Starting playback of {} notes at {} bpm..!",
            schedule.len(),
            tempo
        );

        let handle = thread::spawn(move || {
            let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);
            let start = Instant::now();
            const MAX_SLEEP_CHUNK_S: f64 = 0.050;

            for step in schedule.into_iter() {
                let target = start + Duration::from_millis(step.offset_ms);

                loop {
                    if rx.try_recv().is_ok() || !playing.load(Ordering::SeqCst) {
                        playing.store(false, Ordering::SeqCst);
                        warn!(
                            "Playback stopped after {} seconds..!",
                            start.elapsed().as_secs()
                        );
                        return;
                    }

                    let now = Instant::now();
                    if now >= target {
                        break;
                    }

                    let remaining = (target - now).as_secs_f64();
                    let chunk = if remaining > MAX_SLEEP_CHUNK_S {
                        MAX_SLEEP_CHUNK_S
                    } else {
                        remaining
                    };

                    sleeper.sleep(Duration::from_secs_f64(chunk));
                }

                if let Err(why) = engine.play(step.note) {
                    warn!(
                        "Tone error for {} at {}ms | why: {:?}",
                        step.note, step.offset_ms, why
                    );
                }

                if let Ok(mut fired) = fired.lock() {
                    fired.push(step.note);
                }
            }

            playing.store(false, Ordering::SeqCst);
            debug!("Playback thread finished all notes..!");
        });

        let Ok(mut guard) = self.worker_handle.lock() else {
            bail!("Failed to lock worker handle..!");
        };
        *guard = Some(handle);

        Ok(())
    }

    /// Ask the worker to halt before its next scheduled note and wait for
    /// it to wind down. Stopping an idle player is a no-op.
    pub fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);

        let tx = {
            let Ok(mut lock) = self.control_tx.lock() else {
                warn!("Failed to lock control_tx..!");
                return;
            };
            lock.take()
        };

        if let Some(tx) = tx {
            let _ = tx.send(ControlMsg::Stop);
        }

        let Ok(mut lock) = self.worker_handle.lock() else {
            warn!("Failed to lock worker_handle..!");
            return;
        };

        if let Some(handle) = lock.take() {
            let _ = handle.join();
            debug!("Playback thread joined..!");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::ToneEngine;
    use crate::model::note::Note;

    fn events(times: &[u64]) -> Vec<NoteEvent> {
        let notes = [Note::C4, Note::E4, Note::G4, Note::B4];
        times
            .iter()
            .enumerate()
            .map(|(i, &time)| NoteEvent {
                note: notes[i % notes.len()],
                time,
            })
            .collect()
    }

    #[test]
    fn wide_gaps_keep_their_recorded_spacing() {
        // Tempo 120 -> beat 500ms, floor 250ms. Both gaps exceed the
        // floor, so the recorded pacing survives.
        let schedule = build_schedule(&events(&[0, 300, 700]), 120);

        let offsets: Vec<u64> = schedule.iter().map(|s| s.offset_ms).collect();
        assert_eq!(offsets, vec![0, 300, 700]);
    }

    #[test]
    fn tight_gaps_are_held_to_the_half_beat_floor() {
        // Tempo 60 -> beat 1000ms, floor 500ms. 50ms gaps get stretched.
        let schedule = build_schedule(&events(&[0, 50, 100]), 60);

        let offsets: Vec<u64> = schedule.iter().map(|s| s.offset_ms).collect();
        assert_eq!(offsets, vec![0, 500, 1000]);
    }

    #[test]
    fn first_note_fires_immediately() {
        let schedule = build_schedule(&events(&[4_000]), 90);

        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].offset_ms, 0);
    }

    #[test]
    fn empty_sequences_schedule_nothing() {
        assert!(build_schedule(&[], 120).is_empty());
    }

    #[test]
    fn raising_the_tempo_never_lengthens_playback() {
        let recorded = events(&[0, 100, 250, 1_000]);

        let slow = build_schedule(&recorded, 60);
        let fast = build_schedule(&recorded, 240);

        assert!(fast.last().unwrap().offset_ms <= slow.last().unwrap().offset_ms);
    }

    #[test]
    fn out_of_order_timestamps_fall_back_to_the_floor() {
        let schedule = build_schedule(&events(&[500, 200]), 120);

        assert_eq!(schedule[1].offset_ms, 250);
    }

    struct CaptureEngine {
        played: Mutex<Vec<Note>>,
    }

    impl CaptureEngine {
        fn new() -> Self {
            Self {
                played: Mutex::new(Vec::new()),
            }
        }

        fn played(&self) -> Vec<Note> {
            self.played.lock().unwrap().clone()
        }
    }

    impl ToneEngine for CaptureEngine {
        fn play(&self, note: Note) -> anyhow::Result<()> {
            self.played.lock().unwrap().push(note);
            Ok(())
        }
    }

    fn wait_until_idle<E: ToneEngine + 'static>(player: &Player<E>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while player.is_playing() {
            assert!(Instant::now() < deadline, "playback never finished");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn plays_every_note_in_order() {
        env_logger::try_init().unwrap_or(());

        let engine = Arc::new(CaptureEngine::new());
        let player = Player::new(Arc::clone(&engine));

        // Tempo 6000 -> floor 5ms; the whole run lasts ~20ms.
        let recorded = events(&[0, 10, 20]);
        player.play(&recorded, 6_000).unwrap();
        wait_until_idle(&player);

        assert_eq!(engine.played(), vec![Note::C4, Note::E4, Note::G4]);
        assert_eq!(player.drain_fired(), vec![Note::C4, Note::E4, Note::G4]);
        assert!(player.drain_fired().is_empty());
    }

    #[test]
    fn overlapping_start_is_silently_refused() {
        let engine = Arc::new(CaptureEngine::new());
        let player = Player::new(Arc::clone(&engine));

        // Tempo 1 -> floor 30s, so the run is still waiting when the
        // second start arrives.
        let recorded = events(&[0, 0, 0]);
        player.play(&recorded, 1).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.played().is_empty() {
            assert!(Instant::now() < deadline, "first note never fired");
            thread::sleep(Duration::from_millis(5));
        }

        assert!(player.play(&recorded, 1).is_ok());
        assert!(player.is_playing());

        player.stop();
        assert!(!player.is_playing());

        // Only the first run's opening note got out before the stop.
        assert_eq!(engine.played(), vec![Note::C4]);
    }

    #[test]
    fn stop_on_an_idle_player_is_a_no_op() {
        let engine = Arc::new(CaptureEngine::new());
        let player: Player<CaptureEngine> = Player::new(Arc::clone(&engine));

        player.stop();
        assert!(!player.is_playing());
        assert!(engine.played().is_empty());
    }

    #[test]
    fn flag_clears_after_a_single_note_sequence() {
        let engine = Arc::new(CaptureEngine::new());
        let player = Player::new(Arc::clone(&engine));

        player.play(&events(&[0]), 120).unwrap();
        wait_until_idle(&player);

        assert_eq!(engine.played().len(), 1);
    }
}
