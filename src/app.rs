use crate::engine::ToneEngine;
use crate::model::note::{Note, pad_for_key};
use crate::model::song::{NoteEvent, Song};
use crate::player::Player;
use crate::store::SongStore;
use crate::util::{now_ms, today};
use crate::view;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{info, warn};
use ratatui::DefaultTerminal;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a status notice stays on screen.
const NOTICE_SECS: u64 = 3;
/// How long a tapped pad stays visually pressed.
const PULSE_MS: u64 = 100;

const TEMPO_STEP: u32 = 5;
const TEMPO_MIN: u32 = 20;
const TEMPO_MAX: u32 = 300;

/// The two screens of the app; exactly one is visible at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Create,
    Library,
}

impl Section {
    fn other(self) -> Self {
        match self {
            Section::Create => Section::Library,
            Section::Library => Section::Create,
        }
    }
}

/// A destructive action waiting on an explicit y/n answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    ClearWorking,
    DeleteSong(u64),
}

/// The sequence being recorded plus the form fields that go with it.
#[derive(Debug, Default)]
pub struct WorkingState {
    pub sequence: Vec<NoteEvent>,
    pub name: String,
    pub tempo: u32,
}

/// Everything the keyboard can ask the app to do. Key events resolve to
/// a command first; the command is applied to the state in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Tap(Note),
    ShowSection(Section),
    PlayWorking,
    StopPlayback,
    ClearWorking,
    SaveWorking,
    EditName,
    TempoUp,
    TempoDown,
    SelectPrev,
    SelectNext,
    LoadSelected,
    PlaySelected,
    DeleteSelected,
    Quit,
}

/// Owns the working state and wires the pads, recorder, player, store,
/// and view together. One instance per run; no ambient globals.
pub struct App<E: ToneEngine + 'static> {
    engine: Arc<E>,
    player: Player<E>,
    store: SongStore,

    pub section: Section,
    pub working: WorkingState,
    pub library: Vec<Song>,
    pub selected: usize,
    pub name_editing: bool,
    pub confirm: Option<Confirm>,
    pub notice: Option<(String, Instant)>,
    pub pulse: Option<(Note, Instant)>,
    pub should_quit: bool,
}

impl<E: ToneEngine + 'static> App<E> {
    pub fn new(engine: Arc<E>, store: SongStore, tempo: u32) -> Self {
        let library = store.list();

        Self {
            player: Player::new(Arc::clone(&engine)),
            engine,
            store,
            section: Section::Create,
            working: WorkingState {
                sequence: Vec::new(),
                name: String::new(),
                tempo: tempo.clamp(TEMPO_MIN, TEMPO_MAX),
            },
            library,
            selected: 0,
            name_editing: false,
            confirm: None,
            notice: None,
            pulse: None,
            should_quit: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Route one key event. Pending confirmations and the name input take
    /// the keys first; only then do the pad and section bindings apply.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.apply(Command::Quit);
            return;
        }

        if self.confirm.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.resolve_confirm(true)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.resolve_confirm(false)
                }
                _ => {}
            }
            return;
        }

        if self.name_editing {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => self.name_editing = false,
                KeyCode::Backspace => {
                    self.working.name.pop();
                }
                KeyCode::Char(c) if self.working.name.len() < 40 => self.working.name.push(c),
                _ => {}
            }
            return;
        }

        if let Some(cmd) = self.command_for(key.code) {
            self.apply(cmd);
        }
    }

    /// The dispatch table: global bindings first, then the active
    /// section's.
    pub fn command_for(&self, code: KeyCode) -> Option<Command> {
        match code {
            KeyCode::Tab => return Some(Command::ShowSection(self.section.other())),
            KeyCode::Char('q') => return Some(Command::Quit),
            _ => {}
        }

        match self.section {
            Section::Create => {
                if let KeyCode::Char(c) = code
                    && let Some(pad) = pad_for_key(c)
                {
                    return Some(Command::Tap(pad.note));
                }

                match code {
                    KeyCode::Char('p') => Some(Command::PlayWorking),
                    KeyCode::Char('s') => Some(Command::StopPlayback),
                    KeyCode::Char('x') => Some(Command::ClearWorking),
                    KeyCode::Char('w') => Some(Command::SaveWorking),
                    KeyCode::Char('n') => Some(Command::EditName),
                    KeyCode::Char('+') | KeyCode::Up => Some(Command::TempoUp),
                    KeyCode::Char('-') | KeyCode::Down => Some(Command::TempoDown),
                    _ => None,
                }
            }
            Section::Library => match code {
                KeyCode::Up | KeyCode::Char('k') => Some(Command::SelectPrev),
                KeyCode::Down | KeyCode::Char('j') => Some(Command::SelectNext),
                KeyCode::Enter => Some(Command::LoadSelected),
                KeyCode::Char('p') => Some(Command::PlaySelected),
                KeyCode::Char('s') => Some(Command::StopPlayback),
                KeyCode::Char('d') => Some(Command::DeleteSelected),
                _ => None,
            },
        }
    }

    pub fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::Tap(note) => self.tap(note),
            Command::ShowSection(section) => self.show_section(section),
            Command::PlayWorking => self.play_working(),
            Command::StopPlayback => self.player.stop(),
            Command::ClearWorking => self.request_clear(),
            Command::SaveWorking => self.save_working(),
            Command::EditName => self.name_editing = true,
            Command::TempoUp => {
                self.working.tempo = (self.working.tempo + TEMPO_STEP).min(TEMPO_MAX)
            }
            Command::TempoDown => {
                self.working.tempo = self
                    .working
                    .tempo
                    .saturating_sub(TEMPO_STEP)
                    .max(TEMPO_MIN)
            }
            Command::SelectPrev => self.selected = self.selected.saturating_sub(1),
            Command::SelectNext => {
                if self.selected + 1 < self.library.len() {
                    self.selected += 1;
                }
            }
            Command::LoadSelected => self.load_selected(),
            Command::PlaySelected => self.play_selected(),
            Command::DeleteSelected => self.request_delete(),
            Command::Quit => {
                self.player.stop();
                self.should_quit = true;
            }
        }
    }

    /// Sound the pad, record the note with its capture timestamp, and
    /// start the visual pulse.
    fn tap(&mut self, note: Note) {
        if let Err(why) = self.engine.play(note) {
            warn!("Tone error for {}..! why: {:?}", note, why);
        }

        self.working.sequence.push(NoteEvent {
            note,
            time: now_ms(),
        });
        self.pulse = Some((note, Instant::now()));
    }

    fn show_section(&mut self, section: Section) {
        // The library view is derived, never cached: re-read the store on
        // every entry.
        if section == Section::Library {
            self.library = self.store.list();
            self.clamp_selection();
        }
        self.section = section;
    }

    fn play_working(&mut self) {
        if self.working.sequence.is_empty() {
            self.notify("No notes in your song yet!");
            return;
        }

        if let Err(why) = self.player.play(&self.working.sequence, self.working.tempo) {
            warn!("Failed to start playback..! why: {:?}", why);
            self.notify("Could not start playback");
        }
    }

    fn request_clear(&mut self) {
        if self.working.sequence.is_empty() {
            self.notify("No song to clear!");
            return;
        }
        self.confirm = Some(Confirm::ClearWorking);
    }

    fn save_working(&mut self) {
        if self.working.sequence.is_empty() {
            self.notify("No notes in your song yet!");
            return;
        }

        let song = Song::new(
            &self.working.name,
            std::mem::take(&mut self.working.sequence),
            self.working.tempo,
            today(),
        );
        let name = song.name.clone();

        match self.store.save(song) {
            Ok(id) => {
                info!("Saved \"{}\" as song {}..!", name, id);
                self.working.name.clear();
                self.library = self.store.list();
                self.notify(format!("\"{}\" saved successfully!", name));
            }
            Err(why) => {
                warn!("Failed to save \"{}\"..! why: {:?}", name, why);
                self.notify("Could not save the song");
            }
        }
    }

    fn load_selected(&mut self) {
        let Some(song) = self.library.get(self.selected) else {
            return;
        };

        self.working.sequence = song.notes.clone();
        self.working.name = song.name.clone();
        self.working.tempo = song.tempo;
        self.section = Section::Create;
        self.notify(format!(
            "\"{}\" loaded! You can now edit and replay it.",
            song.name
        ));
    }

    fn play_selected(&mut self) {
        let Some(song) = self.library.get(self.selected) else {
            return;
        };

        // Playing from the library adopts the song's notes and tempo as
        // the working state, same as the load-then-play path.
        self.working.sequence = song.notes.clone();
        self.working.tempo = song.tempo;

        if let Err(why) = self.player.play(&self.working.sequence, self.working.tempo) {
            warn!("Failed to start playback..! why: {:?}", why);
            self.notify("Could not start playback");
        }
    }

    fn request_delete(&mut self) {
        let Some(song) = self.library.get(self.selected) else {
            return;
        };
        self.confirm = Some(Confirm::DeleteSong(song.id));
    }

    fn resolve_confirm(&mut self, yes: bool) {
        let Some(confirm) = self.confirm.take() else {
            return;
        };

        if !yes {
            return;
        }

        match confirm {
            Confirm::ClearWorking => {
                self.player.stop();
                self.working.sequence.clear();
            }
            Confirm::DeleteSong(id) => match self.store.delete(id) {
                Ok(()) => {
                    self.library = self.store.list();
                    self.clamp_selection();
                    self.notify("Song deleted!");
                }
                Err(why) => {
                    warn!("Failed to delete song {}..! why: {:?}", id, why);
                    self.notify("Could not delete the song");
                }
            },
        }
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.library.len() {
            self.selected = self.library.len().saturating_sub(1);
        }
    }

    fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some((message.into(), Instant::now()));
    }

    /// Expire the status notice and the pad pulse, and pulse the pads for
    /// notes the playback worker fired since the last tick.
    pub fn tick(&mut self) {
        if let Some(note) = self.player.drain_fired().into_iter().last() {
            self.pulse = Some((note, Instant::now()));
        }

        if let Some((_, at)) = &self.notice
            && at.elapsed() > Duration::from_secs(NOTICE_SECS)
        {
            self.notice = None;
        }

        if let Some((_, at)) = &self.pulse
            && at.elapsed() > Duration::from_millis(PULSE_MS)
        {
            self.pulse = None;
        }
    }
}

/// Drive the app until quit: draw, poll for one key event, expire timers.
pub fn run<E: ToneEngine + 'static>(
    app: &mut App<E>,
    terminal: &mut DefaultTerminal,
) -> anyhow::Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| view::draw(frame, app))?;

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.handle_key(key);
        }

        app.tick();
    }

    Ok(())
}
