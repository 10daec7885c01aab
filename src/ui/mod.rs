mod detail;
mod popup;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{App, DetailState, Phase};
use crate::types::{NoticeLevel, StarStatus};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    match app.phase {
        Phase::Loading => render_loading(frame, app, chunks[1]),
        Phase::LoadFailed => render_load_error(frame, app, chunks[1]),
        Phase::Ready => detail::render(frame, app, chunks[1]),
    }

    render_status_bar(frame, app, chunks[2]);

    if app.confirm_delete {
        popup::render_confirm(
            frame,
            "Delete repository",
            &format!(
                "Permanently delete {}? This cannot be undone.",
                app.detail.repo.id
            ),
        );
    }
}

fn star_glyph(detail: &DetailState) -> (&'static str, Color) {
    match detail.star {
        StarStatus::Starred => ("★", Color::Yellow),
        StarStatus::NotStarred => ("☆", Color::Gray),
        StarStatus::Unknown if detail.star_check_failed => ("?", Color::Red),
        StarStatus::Unknown => ("·", Color::DarkGray),
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let (glyph, glyph_color) = star_glyph(&app.detail);

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("starboard - {}", app.detail.repo.id),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(glyph, Style::default().fg(glyph_color)),
    ]))
    .style(Style::default().bg(Color::DarkGray));

    frame.render_widget(header, area);
}

fn render_loading(frame: &mut Frame, app: &App, area: Rect) {
    let text = format!("Loading {}...", app.detail.repo.id);
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::Yellow))
        .alignment(ratatui::layout::Alignment::Center);
    frame.render_widget(paragraph, centered_line(area));
}

fn render_load_error(frame: &mut Frame, app: &App, area: Rect) {
    let error = app
        .load_error
        .as_deref()
        .unwrap_or("repository could not be loaded");
    let lines = vec![
        Line::from(Span::styled(
            format!("Could not load {}", app.detail.repo.id),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(error, Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            "r: retry | q: quit",
            Style::default().fg(Color::Gray),
        )),
    ];
    let paragraph = Paragraph::new(lines).alignment(ratatui::layout::Alignment::Center);
    frame.render_widget(paragraph, centered_line(area));
}

/// Vertically center a few lines of text inside the body area.
fn centered_line(area: Rect) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .split(area);
    chunks[1]
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(notice) = &app.notice {
        let color = match notice.level {
            NoticeLevel::Info => Color::Green,
            NoticeLevel::Error => Color::Red,
        };
        Line::from(Span::styled(
            notice.text.clone(),
            Style::default().fg(color),
        ))
    } else if app.loading {
        Line::from(Span::styled(
            "Loading...",
            Style::default().fg(Color::Yellow),
        ))
    } else {
        let help = match app.phase {
            Phase::Loading | Phase::LoadFailed => "r: retry | q: quit".to_string(),
            Phase::Ready => {
                // The star command only appears once the status is known.
                let star = app
                    .detail
                    .star_action_label()
                    .map(|label| format!("s: {} | ", label))
                    .unwrap_or_default();
                format!(
                    "{}f: fork | D: delete | r: refresh | o: open | y: copy url | Tab/n/c/m/i: tabs | j/k: nav | q: quit",
                    star
                )
            }
        };
        Line::from(Span::styled(help, Style::default().fg(Color::Gray)))
    };

    let status_bar = Paragraph::new(status).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status_bar, area);
}
