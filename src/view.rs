use crate::app::{App, Confirm, Section};
use crate::engine::ToneEngine;
use crate::model::note::{Note, PADS};
use crate::model::song::{NoteEvent, Song};
use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};

const ACCENT: Color = Color::Yellow;

pub fn draw<E: ToneEngine + 'static>(frame: &mut Frame<'_>, app: &App<E>) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_nav(frame, header, app.section);

    match app.section {
        Section::Create => draw_create(frame, body, app),
        Section::Library => draw_library(frame, body, app),
    }

    draw_status(frame, footer, app);

    if let Some(confirm) = app.confirm {
        draw_confirm(frame, confirm);
    }
}

fn draw_nav(frame: &mut Frame<'_>, area: Rect, section: Section) {
    let tabs = Tabs::new(vec!["Create", "Library"])
        .select(match section {
            Section::Create => 0,
            Section::Library => 1,
        })
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Zed Song Creator "),
        );

    frame.render_widget(tabs, area);
}

fn draw_create<E: ToneEngine + 'static>(frame: &mut Frame<'_>, area: Rect, app: &App<E>) {
    let [pads, form, timeline] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let pulsed = app.pulse.map(|(note, _)| note);
    let pad_block = Block::default().borders(Borders::ALL).title(" Pads ");
    let pad_lines = vec![
        pad_row(pulsed),
        Line::from(Span::styled(
            " c    d    e    f    g    a    b   spc",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(pad_lines).block(pad_block), pads);

    let name = if app.name_editing {
        format!("{}_", app.working.name)
    } else if app.working.name.is_empty() {
        String::from("(untitled)")
    } else {
        app.working.name.clone()
    };
    let form_line = Line::from(vec![
        Span::raw(" Name: "),
        Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("   Tempo: "),
        Span::styled(
            format!("{} bpm", app.working.tempo),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        if app.is_playing() {
            Span::styled("   ♪ playing", Style::default().fg(ACCENT))
        } else {
            Span::raw("")
        },
    ]);
    frame.render_widget(
        Paragraph::new(form_line).block(Block::default().borders(Borders::ALL).title(" Song ")),
        form,
    );

    let timeline_block = Block::default().borders(Borders::ALL).title(" Timeline ");
    let paragraph = if app.working.sequence.is_empty() {
        Paragraph::new("Your song will appear here...")
            .style(Style::default().fg(Color::DarkGray))
            .block(timeline_block)
    } else {
        Paragraph::new(timeline_line(&app.working.sequence))
            .wrap(Wrap { trim: true })
            .block(timeline_block)
    };
    frame.render_widget(paragraph, timeline);
}

/// One chip per pad, the pulsed one rendered pressed.
fn pad_row(pulsed: Option<Note>) -> Line<'static> {
    let mut spans = Vec::with_capacity(PADS.len() * 2);

    for pad in PADS {
        let style = if pulsed == Some(pad.note) {
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        };

        spans.push(Span::styled(format!(" {} ", pad.label), style));
        spans.push(Span::raw(" "));
    }

    Line::from(spans)
}

/// One labeled chip per recorded note, in musical order.
fn timeline_line(sequence: &[NoteEvent]) -> Line<'static> {
    let mut spans = Vec::with_capacity(sequence.len() * 2);

    for event in sequence {
        spans.push(Span::styled(
            format!("[{}]", event.note),
            Style::default().fg(ACCENT),
        ));
        spans.push(Span::raw(" "));
    }

    Line::from(spans)
}

fn draw_library<E: ToneEngine + 'static>(frame: &mut Frame<'_>, area: Rect, app: &App<E>) {
    let block = Block::default().borders(Borders::ALL).title(" Library ");

    if app.library.is_empty() {
        let empty = Paragraph::new("No songs saved yet. Create one to get started!")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem<'_>> = app.library.iter().map(song_card).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");

    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn song_card(song: &Song) -> ListItem<'static> {
    ListItem::new(vec![
        Line::from(Span::styled(
            song.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            song_summary(song),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ])
}

fn song_summary(song: &Song) -> String {
    format!(
        "   {} BPM · {} notes · created {}",
        song.tempo,
        song.notes.len(),
        song.date_created
    )
}

fn draw_status<E: ToneEngine + 'static>(frame: &mut Frame<'_>, area: Rect, app: &App<E>) {
    let line = if let Some((message, _)) = &app.notice {
        Line::from(Span::styled(
            format!(" {}", message),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
    } else {
        let hint = match app.section {
            Section::Create => " p play · s stop · x clear · w save · n name · +/- tempo · tab library · q quit",
            Section::Library => " ↑/↓ select · enter load · p play · d delete · tab create · q quit",
        };
        Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn draw_confirm(frame: &mut Frame<'_>, confirm: Confirm) {
    let message = match confirm {
        Confirm::ClearWorking => "Are you sure you want to clear your song?",
        Confirm::DeleteSong(_) => "Are you sure you want to delete this song?",
    };

    let area = centered(frame.area(), 46, 5);
    let body = Paragraph::new(vec![
        Line::from(message),
        Line::from(""),
        Line::from(Span::styled(
            "y confirm · n cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Confirm ")
            .border_style(Style::default().fg(ACCENT)),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(body, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timeline_has_one_chip_per_note() {
        let sequence = vec![
            NoteEvent {
                note: Note::C4,
                time: 0,
            },
            NoteEvent {
                note: Note::G4,
                time: 350,
            },
        ];

        let line = timeline_line(&sequence);
        let chips: Vec<String> = line
            .spans
            .iter()
            .map(|s| s.content.to_string())
            .filter(|c| c.starts_with('['))
            .collect();

        assert_eq!(chips, vec!["[C4]", "[G4]"]);
    }

    #[test]
    fn pad_row_marks_the_pulsed_pad() {
        let quiet = pad_row(None);
        let pulsed = pad_row(Some(Note::A4));

        assert_eq!(quiet.spans.len(), pulsed.spans.len());

        let changed = quiet
            .spans
            .iter()
            .zip(pulsed.spans.iter())
            .filter(|(a, b)| a.style != b.style)
            .count();
        assert_eq!(changed, 1);
    }

    #[test]
    fn song_summary_reads_like_a_card() {
        let song = Song {
            id: 1,
            name: String::from("Waltz"),
            notes: vec![
                NoteEvent {
                    note: Note::C4,
                    time: 0,
                },
                NoteEvent {
                    note: Note::E4,
                    time: 400,
                },
                NoteEvent {
                    note: Note::G4,
                    time: 800,
                },
            ],
            tempo: 90,
            date_created: String::from("2026-08-07"),
        };

        let summary = song_summary(&song);
        assert!(summary.contains("90 BPM"));
        assert!(summary.contains("3 notes"));
        assert!(summary.contains("2026-08-07"));
    }

    #[test]
    fn centered_rect_fits_inside_its_parent() {
        let parent = Rect::new(0, 0, 100, 30);
        let inner = centered(parent, 46, 5);

        assert_eq!(inner.width, 46);
        assert_eq!(inner.height, 5);
        assert!(inner.x > parent.x && inner.y > parent.y);
    }
}
