pub mod charting;
pub mod history;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, AppState, MENU_LEN};
use crate::arena::ActiveGame;
use crate::difficulty::StroopMode;
use crate::game::{FeedbackKind, GameSession, GameType, SessionStatus};
use crate::games::{AuditoryGame, MemoryGame, SchulteGame, StroopGame};
use crate::record::RecordMetrics;
use crate::trial::{ColorName, MemoryMode};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
/// Terminal columns per grid cell.
const CELL_WIDTH: usize = 5;

/// Background colours for grid cells, indexed by the trial's colour index.
const GRID_COLORS: [Color; 6] = [
    Color::Rgb(0xFF, 0x6B, 0x6B),
    Color::Rgb(0x4E, 0xCD, 0xC4),
    Color::Rgb(0x45, 0xB7, 0xD1),
    Color::Rgb(0x96, 0xCE, 0xB4),
    Color::Rgb(0xFF, 0xEA, 0xA7),
    Color::Rgb(0xDD, 0xA0, 0xDD),
];

fn ink(color: ColorName) -> Color {
    let (r, g, b) = color.rgb();
    Color::Rgb(r, g, b)
}

/// Pad `text` to `width` terminal columns, centred. CJK words are two
/// columns per character.
fn center_pad(text: &str, width: usize) -> String {
    let used = text.width();
    if used >= width {
        return text.to_string();
    }
    let left = (width - used) / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(width - used - left))
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Menu => render_menu(self, area, buf),
            AppState::Playing => render_game(self, area, buf),
            AppState::Result => {
                render_game(self, area, buf);
                render_result(self, area, buf);
            }
            // drawn by the history screen
            AppState::History => {}
        }
    }
}

fn render_menu(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let mut lines = vec![
        Line::from(Span::styled("braingym", bold_style.fg(Color::Cyan))),
        Line::from(""),
    ];
    for idx in 0..MENU_LEN {
        let label = match GameType::ALL.get(idx) {
            Some(game) => format!("{}. {}", idx + 1, game.title()),
            None => "History".to_string(),
        };
        let style = if idx == app.menu_index {
            bold_style.add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(label, style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            "sound: {}",
            if app.config.sound_enabled { "on" } else { "off" }
        ),
        Style::default().add_modifier(Modifier::DIM),
    )));
    lines.push(Line::from(Span::styled(
        "(↑/↓) select / (enter) play / (h)istory / (s)ound / (q)uit",
        italic_style,
    )));

    let height = lines.len() as u16;
    let top = area.height.saturating_sub(height) / 2;
    let target = Rect::new(area.x, area.y + top, area.width, height.min(area.height));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(target, buf);
}

fn render_game(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(active) = app.arena.active() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(1),
            Constraint::Min(1),    // board
            Constraint::Length(1), // feedback
            Constraint::Length(1), // legend
        ])
        .split(area);

    let session = active.session();
    let title = Span::styled(
        session.game_type().title(),
        Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
    );
    let status = match active {
        ActiveGame::Grid(g) => format!(
            "level {}   next {}   {:.1}s left   errors {}",
            g.level() + 1,
            g.trial().map(|t| t.label_for(g.next_item())).unwrap_or_default(),
            g.time_remaining().as_secs_f64(),
            g.error_count()
        ),
        ActiveGame::Interference(g) => format!(
            "question {}/{}   correct {}   wrong {}{}",
            g.question_number(),
            g.settings().question_count,
            g.correct_count(),
            g.incorrect_count(),
            g.time_remaining()
                .map(|d| format!("   {:.1}s", d.as_secs_f64()))
                .unwrap_or_default()
        ),
        ActiveGame::Memory(g) => format!(
            "length {}   streak {}   best {}",
            g.difficulty().sequence_length,
            g.difficulty().correct_streak,
            g.difficulty().best_span
        ),
        ActiveGame::Auditory(g) => format!(
            "level {}   length {}",
            g.difficulty().level,
            g.difficulty().sequence_length
        ),
    };
    Paragraph::new(Line::from(vec![
        title,
        Span::raw("   "),
        Span::styled(status, Style::default().add_modifier(Modifier::DIM)),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    match active {
        ActiveGame::Grid(g) => render_grid(app, g, chunks[2], buf),
        ActiveGame::Interference(g) => render_interference(g, chunks[2], buf),
        ActiveGame::Memory(g) => render_memory(g, chunks[2], buf),
        ActiveGame::Auditory(g) => render_auditory(app, g, chunks[2], buf),
    }

    if let Some(kind) = app.last_feedback {
        let (text, color) = match kind {
            FeedbackKind::Correct => ("correct", Color::Green),
            FeedbackKind::Incorrect => ("wrong", Color::Red),
            FeedbackKind::Timeout => ("time's up", Color::Yellow),
            FeedbackKind::LevelComplete => ("level complete", Color::Green),
            FeedbackKind::GameComplete => ("complete", Color::Green),
            FeedbackKind::GameOver => ("game over", Color::Red),
        };
        Paragraph::new(Span::styled(
            text,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }

    let legend = match session.game_type() {
        GameType::GridSearch => "(arrows) move / (enter) pick / (esc) stop",
        GameType::Interference => "(1-6) answer / (esc) stop",
        GameType::SequenceMemory => {
            "(0-9) enter / (enter) submit / (bksp) undo / (del) clear / (esc) stop"
        }
        GameType::AuditoryAttention => {
            "(←/→) move / (space) mark / (enter) submit / (r)eplay / (esc) stop"
        }
    };
    Paragraph::new(Span::styled(
        legend,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[4], buf);
}

fn render_grid(app: &App, game: &SchulteGame, area: Rect, buf: &mut Buffer) {
    let Some(trial) = game.trial() else {
        return;
    };
    let mut lines = Vec::with_capacity(trial.size);
    for row in 0..trial.size {
        let spans: Vec<Span> = (0..trial.size)
            .map(|col| {
                let cell = trial.cell(row, col);
                let mut style = Style::default()
                    .fg(Color::Black)
                    .bg(GRID_COLORS[cell.color % GRID_COLORS.len()])
                    .add_modifier(Modifier::BOLD);
                if cell.value < game.next_item() {
                    style = style.add_modifier(Modifier::DIM);
                }
                if app.cursor == (row, col) && game.status().accepts_input() {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Span::styled(center_pad(&cell.label, CELL_WIDTH), style)
            })
            .collect();
        lines.push(Line::from(spans));
    }
    render_centered(lines, area, buf);
}

fn render_interference(game: &StroopGame, area: Rect, buf: &mut Buffer) {
    let Some(trial) = game.trial() else {
        return;
    };
    let instruction = match game.settings().mode {
        StroopMode::Classic => "name the INK of the marked word",
        StroopMode::Reverse => "name the WORD that is marked",
    };

    let mut lines = vec![
        Line::from(Span::styled(
            instruction,
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        Line::from(""),
    ];
    for (r, row) in trial.matrix.iter().enumerate() {
        let spans: Vec<Span> = row
            .iter()
            .enumerate()
            .map(|(c, cell)| {
                let mut style = Style::default().fg(ink(cell.ink)).bg(Color::DarkGray);
                let text = if (r, c) == trial.target {
                    style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                    format!("[{}]", cell.word.word())
                } else {
                    cell.word.word().to_string()
                };
                Span::styled(center_pad(&text, 8), style)
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    let options: Vec<Span> = trial
        .options
        .iter()
        .enumerate()
        .map(|(i, color)| Span::raw(format!(" ({}) {} ", i + 1, color.word())))
        .collect();
    lines.push(Line::from(options));
    render_centered(lines, area, buf);
}

fn render_memory(game: &MemoryGame, area: Rect, buf: &mut Buffer) {
    let presenting = game.status() == SessionStatus::Presenting;
    let expected = game.trial().map(|t| t.items.clone()).unwrap_or_default();
    let mut lines = Vec::new();

    match game.mode() {
        MemoryMode::Visual => {
            for row in 0..3u8 {
                let spans: Vec<Span> = (1..=3u8)
                    .map(|col| {
                        let pos = row * 3 + col;
                        let lit = presenting && game.showing() == Some(pos);
                        let picked = game.response().contains(&pos);
                        let style = match (lit, picked) {
                            (true, _) => Style::default().bg(Color::Yellow).fg(Color::Black),
                            (_, true) => Style::default().bg(Color::Cyan).fg(Color::Black),
                            _ => Style::default().bg(Color::DarkGray),
                        };
                        Span::styled(center_pad(&pos.to_string(), CELL_WIDTH), style)
                    })
                    .collect();
                lines.push(Line::from(spans));
            }
        }
        MemoryMode::Digit => {
            let shown = match game.showing() {
                Some(d) if presenting => d.to_string(),
                _ => String::from(" "),
            };
            lines.push(Line::from(Span::styled(
                shown,
                Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow),
            )));
        }
    }

    lines.push(Line::from(""));
    let typed: String = game.response().iter().map(|d| d.to_string()).collect();
    lines.push(Line::from(format!("your answer: {}", typed)));
    if game.revealed() {
        let answer: String = expected.iter().map(|d| d.to_string()).collect();
        lines.push(Line::from(Span::styled(
            format!("correct answer: {}", answer),
            Style::default().fg(Color::Green),
        )));
    }
    render_centered(lines, area, buf);
}

fn render_auditory(app: &App, game: &AuditoryGame, area: Rect, buf: &mut Buffer) {
    let Some(trial) = game.trial() else {
        return;
    };
    let mut lines = vec![
        Line::from(vec![
            Span::raw("target sound: "),
            Span::styled(
                trial.target.name(),
                Style::default().add_modifier(Modifier::BOLD).fg(Color::Magenta),
            ),
        ]),
        Line::from(""),
    ];

    let presenting = game.status() == SessionStatus::Presenting;
    let spans: Vec<Span> = (1..=trial.sequence.len())
        .map(|pos| {
            let mut style = Style::default().bg(Color::DarkGray);
            if presenting && game.playing() == Some(pos - 1) {
                style = Style::default().bg(Color::Yellow).fg(Color::Black);
            } else if game.response().contains(&pos) {
                style = Style::default().bg(Color::Cyan).fg(Color::Black);
            }
            if !presenting && app.position_cursor == pos {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Span::styled(center_pad(&pos.to_string(), 4), style)
        })
        .collect();
    lines.push(Line::from(spans));

    if presenting {
        if let Some(sound) = game.playing().and_then(|i| trial.sequence.get(i)) {
            lines.push(Line::from(""));
            lines.push(Line::from(format!("♪ {}", sound.name())));
        }
    }
    render_centered(lines, area, buf);
}

fn render_centered(lines: Vec<Line>, area: Rect, buf: &mut Buffer) {
    let height = (lines.len() as u16).min(area.height);
    let top = area.height.saturating_sub(height) / 2;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(Rect::new(area.x, area.y + top, area.width, height), buf);
}

fn render_result(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(outcome) = &app.result else {
        return;
    };
    let record = &outcome.record;
    let bold_style = Style::default().add_modifier(Modifier::BOLD);

    let summary = match &record.metrics {
        RecordMetrics::GridSearch(m) if m.timeout => format!(
            "time's up: {}/{} found, {:.0}% accuracy",
            m.completed_items, m.total_items, m.accuracy
        ),
        RecordMetrics::GridSearch(m) => format!(
            "{}x{} in {:.2}s with {} errors",
            m.grid_size, m.grid_size, m.time, m.error_count
        ),
        RecordMetrics::Interference(m) => format!(
            "{}/{} correct, {:.0}% accuracy, {:.2}s average",
            m.correct_count, m.question_count, m.accuracy, m.average_response_time
        ),
        RecordMetrics::SequenceMemory(m) => format!("best span {}", m.level),
        RecordMetrics::AuditoryAttention(m) => format!(
            "reached level {}, {:.0}% of targets on the last",
            m.level,
            m.accuracy * 100.0
        ),
    };

    let mut lines = vec![
        Line::from(Span::styled(summary, bold_style)),
        Line::from(Span::styled(
            record.comment().to_string(),
            Style::default().fg(Color::Cyan),
        )),
    ];
    if !outcome.persisted {
        lines.push(Line::from(Span::styled(
            "(not saved)",
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "(r)etry / (h)istory / (m)enu",
        Style::default().add_modifier(Modifier::ITALIC),
    )));

    let width = area.width.min(60);
    let height = (lines.len() as u16 + 2).min(area.height);
    let overlay = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );
    Clear.render(overlay, buf);
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Result"))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(overlay, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::config::Config;
    use crate::stats::MemorySink;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::time::Duration;

    fn create_test_app() -> App {
        App::new(Arena::new(Box::new(MemorySink::default())), Config::default()).with_seed(11)
    }

    fn rendered(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    fn press(app: &mut App, c: char) {
        app.on_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }

    #[test]
    fn test_center_pad_counts_columns() {
        assert_eq!(center_pad("7", 5), "  7  ");
        assert_eq!(center_pad("红色", 6), " 红色 ");
        assert_eq!(center_pad("toolong", 3), "toolong");
    }

    #[test]
    fn test_menu_lists_every_game() {
        let app = create_test_app();
        let text = rendered(&app, Rect::new(0, 0, 80, 24));
        for game in GameType::ALL {
            assert!(text.contains(game.title()), "missing {}", game.title());
        }
        assert!(text.contains("History"));
    }

    #[test]
    fn test_grid_screen_shows_labels() {
        let mut app = create_test_app();
        press(&mut app, '1');
        let text = rendered(&app, Rect::new(0, 0, 80, 24));
        assert!(text.contains("Schulte Grid"));
        for v in 1..=9 {
            assert!(text.contains(&v.to_string()));
        }
    }

    #[test]
    fn test_stroop_screen_lists_options() {
        let mut app = create_test_app();
        press(&mut app, '2');
        let text = rendered(&app, Rect::new(0, 0, 100, 30));
        assert!(text.contains("(1)"));
        assert!(text.contains("INK"));
    }

    #[test]
    fn test_result_overlay_after_timeout() {
        let mut app = create_test_app();
        press(&mut app, '1');
        app.on_tick(Duration::from_secs(15));
        let text = rendered(&app, Rect::new(0, 0, 80, 24));
        assert!(text.contains("Result"));
        assert!(text.contains("(r)etry"));
    }

    #[test]
    fn test_tiny_area_does_not_panic() {
        let mut app = create_test_app();
        press(&mut app, '4');
        app.on_tick(Duration::from_secs(3));
        for (w, h) in [(10, 5), (1, 1), (200, 60)] {
            let area = Rect::new(0, 0, w, h);
            let mut buffer = Buffer::empty(area);
            (&app).render(area, &mut buffer);
            assert_eq!(*buffer.area(), area);
        }
    }

    #[test]
    fn test_ui_constants() {
        assert_eq!(HORIZONTAL_MARGIN, 5);
        assert_eq!(VERTICAL_MARGIN, 2);
    }
}
