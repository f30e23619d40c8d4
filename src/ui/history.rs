use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table},
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::app::App;
use crate::game::GameType;
use crate::record::{Record, RecordMetrics};
use crate::time_series::trend;
use crate::ui::charting::{compute_chart_params, format_label};
use crate::util::std_dev;

/// What the headline number means for each game.
fn headline_label(game: GameType) -> &'static str {
    match game {
        GameType::GridSearch => "seconds",
        GameType::Interference => "score",
        GameType::SequenceMemory => "span",
        GameType::AuditoryAttention => "level",
    }
}

/// "3 minutes ago" style age of a record.
pub fn humanize_age(record: &Record) -> String {
    let age = Local::now()
        .signed_duration_since(record.timestamp)
        .to_std()
        .unwrap_or_default();
    HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past)
}

fn detail(record: &Record) -> String {
    match &record.metrics {
        RecordMetrics::GridSearch(m) => format!(
            "{0}x{0} {1}/{2} {3} err",
            m.grid_size, m.completed_items, m.total_items, m.error_count
        ),
        RecordMetrics::Interference(m) => format!(
            "{} {}/{} {:.2}s",
            m.mode, m.correct_count, m.question_count, m.average_response_time
        ),
        RecordMetrics::SequenceMemory(m) => format!("{} len {}", m.mode, m.sequence_length),
        RecordMetrics::AuditoryAttention(m) => format!("{:.0}% hit", m.accuracy * 100.0),
    }
}

pub fn present_row(record: &Record) -> Row<'static> {
    let headline = record
        .headline()
        .map(format_label)
        .unwrap_or_else(|| "-".to_string());
    let headline_style = if record.completed {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Red)
    };
    Row::new(vec![
        Cell::from(humanize_age(record)),
        Cell::from(headline).style(headline_style),
        Cell::from(detail(record)),
        Cell::from(record.comment().to_string()),
    ])
}

/// Render the history screen for `app.history_game`
pub fn render_history(app: &mut App, f: &mut Frame) {
    let game = app.history_game;
    let records = app.history();
    let stats = app.history_stats();
    let bold_style = Style::default().add_modifier(Modifier::BOLD);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),  // title
            Constraint::Min(6),     // trend
            Constraint::Length(1),  // stats
            Constraint::Length(12), // table
            Constraint::Length(1),  // legend
        ])
        .split(f.area());

    let title = Paragraph::new(format!("{} history", game.title()))
        .block(Block::default().borders(Borders::ALL).title("History"))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let points = trend(&records);
    if points.is_empty() {
        f.render_widget(
            Paragraph::new("no records yet").alignment(Alignment::Center),
            chunks[1],
        );
    } else {
        let (plays, top) = compute_chart_params(&points);
        let tuples: Vec<(f64, f64)> = points.iter().copied().map(Into::into).collect();
        let datasets = vec![Dataset::default()
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&tuples)];
        let chart = Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title("plays")
                    .bounds([1.0, plays])
                    .labels(vec![
                        Span::styled("1", bold_style),
                        Span::styled(format_label(plays), bold_style),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title(headline_label(game))
                    .bounds([0.0, top])
                    .labels(vec![
                        Span::styled("0", bold_style),
                        Span::styled(format_label(top), bold_style),
                    ]),
            );
        f.render_widget(chart, chunks[1]);
    }

    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let summary = format!(
        "best {}   average {}   {:.2} sd   {} plays",
        stats.best.map(format_label).unwrap_or_else(|| "-".into()),
        stats
            .average
            .map(|a| format!("{a:.2}"))
            .unwrap_or_else(|| "-".into()),
        std_dev(&ys).unwrap_or(0.0),
        stats.total_count
    );
    f.render_widget(
        Paragraph::new(Span::styled(summary, bold_style)).alignment(Alignment::Center),
        chunks[2],
    );

    let header = Row::new(vec!["when", headline_label(game), "detail", "comment"]).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );
    let visible = chunks[3].height.saturating_sub(3) as usize;
    let rows: Vec<Row> = records.iter().take(visible).map(present_row).collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(20),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Recent"));
    f.render_widget(table, chunks[3]);

    f.render_widget(
        Paragraph::new(Span::styled(
            "(←/→) switch game / (esc) back",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        chunks[4],
    );
}
