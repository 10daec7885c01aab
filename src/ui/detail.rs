use chrono::Utc;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs};
use ratatui::Frame;

use crate::action::DetailTab;
use crate::app::App;
use crate::types::{IssueState, TreeEntryKind};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    render_meta(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_tab_content(frame, app, chunks[2]);
}

fn render_meta(frame: &mut Frame, app: &App, area: Rect) {
    let repo = &app.detail.repo;

    let description = repo.description.clone().unwrap_or_default();
    let updated = repo
        .updated_at
        .map(|d| format!("updated {}", format_age(d)))
        .unwrap_or_default();

    let lines = vec![
        Line::from(Span::styled(description, Style::default().fg(Color::Gray))),
        Line::from(vec![
            Span::styled(
                format!("★ {}", repo.stars),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw("  "),
            Span::styled(
                format!("⑂ {}", repo.forks),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  "),
            Span::styled(
                repo.default_branch.clone(),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  "),
            Span::styled(updated, Style::default().fg(Color::DarkGray)),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles = vec!["[n] News", "[c] Code", "[m] Commits", "[i] Issues"];

    let tabs = Tabs::new(titles)
        .block(
            Block::default().borders(Borders::ALL).title(Span::styled(
                format!(" {} ", app.detail.repo.id),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
        )
        .select(match app.tab {
            DetailTab::News => 0,
            DetailTab::Code => 1,
            DetailTab::Commits => 2,
            DetailTab::Issues => 3,
        })
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(tabs, area);
}

fn render_tab_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.tab {
        DetailTab::News => render_news(frame, app, area),
        DetailTab::Code => render_code(frame, app, area),
        DetailTab::Commits => render_commits(frame, app, area),
        DetailTab::Issues => render_issues(frame, app, area),
    }
}

fn render_news(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" News ({}) ", app.events.len()));

    if app.events.is_empty() && !app.loading {
        let empty = Paragraph::new("No recent activity")
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .events
        .iter()
        .enumerate()
        .map(|(i, event)| {
            let style = if i == app.cursor {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let kind = event.kind.strip_suffix("Event").unwrap_or(&event.kind);
            let label = match &event.detail {
                Some(detail) => format!("{} {}", kind, detail),
                None => kind.to_string(),
            };

            let actor = truncate(&event.actor, 15);

            let age = format_age(event.created_at);

            let line = Line::from(vec![
                Span::styled(format!("@{:<15}", actor), Style::default().fg(Color::Cyan)),
                Span::raw(" "),
                Span::styled(label, style),
                Span::raw(" "),
                Span::styled(format!("{:>3}", age), Style::default().fg(Color::DarkGray)),
            ]);

            ListItem::new(line)
        })
        .collect();

    render_list(frame, app, area, block, items, app.events.len());
}

fn render_code(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(format!(
        " Code: {} ({}) ",
        app.detail.repo.default_branch,
        app.entries.len()
    ));

    if app.entries.is_empty() && !app.loading {
        let empty = Paragraph::new("Empty tree")
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if i == app.cursor {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let (icon, icon_color) = match entry.kind {
                TreeEntryKind::Dir => ("▸", Color::Blue),
                TreeEntryKind::File => (" ", Color::Gray),
                TreeEntryKind::Submodule => ("◆", Color::Magenta),
            };

            let size = entry.size.map(format_size).unwrap_or_default();

            let line = Line::from(vec![
                Span::styled(format!("{} ", icon), Style::default().fg(icon_color)),
                Span::styled(format!("{:<40}", entry.path), style),
                Span::raw(" "),
                Span::styled(format!("{:>8}", size), Style::default().fg(Color::DarkGray)),
            ]);

            ListItem::new(line)
        })
        .collect();

    render_list(frame, app, area, block, items, app.entries.len());
}

fn render_commits(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Commits ({}) ", app.commits.len()));

    if app.commits.is_empty() && !app.loading {
        let empty = Paragraph::new("No commits found")
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let w = area.width.saturating_sub(2) as usize;
    let fixed = 29; // sha(7) + space(1) + space(1) + @author(16) + space(1) + age(3)
    let flex = w.saturating_sub(fixed).max(10);

    let items: Vec<ListItem> = app
        .commits
        .iter()
        .enumerate()
        .map(|(i, commit)| {
            let style = if i == app.cursor {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let message = truncate(&commit.message, flex);
            let author = truncate(&commit.author, 15);

            let age = format_age(commit.date);
            let short_sha = commit.sha.get(..7).unwrap_or(&commit.sha);

            let line = Line::from(vec![
                Span::styled(short_sha, Style::default().fg(Color::Yellow)),
                Span::raw(" "),
                Span::styled(format!("{:<flex$}", message), style),
                Span::raw(" "),
                Span::styled(format!("@{:<15}", author), Style::default().fg(Color::Cyan)),
                Span::raw(" "),
                Span::styled(format!("{:>3}", age), Style::default().fg(Color::DarkGray)),
            ]);

            ListItem::new(line)
        })
        .collect();

    render_list(frame, app, area, block, items, app.commits.len());
}

fn render_issues(frame: &mut Frame, app: &App, area: Rect) {
    if !app.detail.repo.has_issues {
        let block = Block::default().borders(Borders::ALL).title(" Issues ");
        let empty = Paragraph::new("Issues are disabled for this repository")
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Issues ({}) ", app.issues.len()));

    if app.issues.is_empty() && !app.loading {
        let empty = Paragraph::new("No open issues")
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let w = area.width.saturating_sub(2) as usize;
    let fixed = 50; // #num(6) + space(1) + state(6) + space(1) + space(1) + labels(18) + space(1) + @author(16)
    let flex = w.saturating_sub(fixed).max(10);

    let items: Vec<ListItem> = app
        .issues
        .iter()
        .enumerate()
        .map(|(i, issue)| {
            let style = if i == app.cursor {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let state_color = match issue.state {
                IssueState::Open => Color::Green,
                IssueState::Closed => Color::Red,
            };

            let title = truncate(&issue.title, flex);

            let labels = if issue.labels.is_empty() {
                String::new()
            } else {
                format!("[{}]", truncate(&issue.labels.join(", "), 15))
            };

            let author = truncate(&issue.author, 15);

            let line = Line::from(vec![
                Span::styled(
                    format!("#{:<5}", issue.number),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(" "),
                Span::styled(
                    format!("{:6}", issue.state),
                    Style::default().fg(state_color),
                ),
                Span::raw(" "),
                Span::styled(format!("{:<flex$}", title), style),
                Span::raw(" "),
                Span::styled(
                    format!("{:<18}", labels),
                    Style::default().fg(Color::Magenta),
                ),
                Span::raw(" "),
                Span::styled(format!("@{:<15}", author), Style::default().fg(Color::Gray)),
            ]);

            ListItem::new(line)
        })
        .collect();

    render_list(frame, app, area, block, items, app.issues.len());
}

fn render_list(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    block: Block,
    items: Vec<ListItem>,
    len: usize,
) {
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    if len > 0 {
        state.select(Some(app.cursor.min(len - 1)));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

/// Shorten `s` to at most `max` characters, appending "..." when cut.
/// Counts characters rather than bytes so multi-byte text never gets
/// split inside a UTF-8 sequence.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn format_age(dt: chrono::DateTime<chrono::Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(dt);

    if duration.num_days() > 0 {
        format!("{}d", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{}h", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{}m", duration.num_minutes())
    } else {
        "now".to_string()
    }
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use tokio::sync::mpsc;

    use super::*;
    use crate::app::{App, Phase};
    use crate::error::{Result, StarboardError};
    use crate::forge::Forge;
    use crate::types::{Commit, Issue, NewsEvent, Owner, RepoId, Repository, TreeEntry};

    #[derive(Debug)]
    struct OfflineForge;

    #[async_trait::async_trait]
    impl Forge for OfflineForge {
        fn name(&self) -> &str {
            "offline"
        }

        async fn get_repo(&self, _id: &RepoId) -> Result<Repository> {
            Err(StarboardError::Api("offline".to_string()))
        }

        async fn is_starred(&self, _id: &RepoId) -> Result<bool> {
            Err(StarboardError::Api("offline".to_string()))
        }

        async fn star(&self, _id: &RepoId) -> Result<()> {
            Err(StarboardError::Api("offline".to_string()))
        }

        async fn unstar(&self, _id: &RepoId) -> Result<()> {
            Err(StarboardError::Api("offline".to_string()))
        }

        async fn fork(&self, _id: &RepoId) -> Result<Repository> {
            Err(StarboardError::Api("offline".to_string()))
        }

        async fn delete_repo(&self, _id: &RepoId) -> Result<()> {
            Err(StarboardError::Api("offline".to_string()))
        }

        async fn list_events(&self, _id: &RepoId) -> Result<Vec<NewsEvent>> {
            Err(StarboardError::Api("offline".to_string()))
        }

        async fn list_tree(&self, _id: &RepoId, _branch: &str) -> Result<Vec<TreeEntry>> {
            Err(StarboardError::Api("offline".to_string()))
        }

        async fn list_commits(&self, _id: &RepoId) -> Result<Vec<Commit>> {
            Err(StarboardError::Api("offline".to_string()))
        }

        async fn list_issues(&self, _id: &RepoId) -> Result<Vec<Issue>> {
            Err(StarboardError::Api("offline".to_string()))
        }
    }

    fn ready_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let repo = Repository {
            id: RepoId::parse("octocat/Hello-World").unwrap(),
            owner: Owner {
                login: "octocat".to_string(),
                avatar_url: Some("https://avatars.githubusercontent.com/u/583231".to_string()),
            },
            description: Some("Mon premier dépôt".to_string()),
            html_url: Some("https://github.com/octocat/Hello-World".to_string()),
            default_branch: "master".to_string(),
            stars: 1,
            forks: 0,
            has_issues: true,
            updated_at: None,
        };
        let mut app = App::new(Arc::new(OfflineForge), repo, tx);
        app.phase = Phase::Ready;
        app
    }

    fn draw_narrow(app: &App) {
        let backend = TestBackend::new(40, 16);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render(frame, app, frame.area()))
            .unwrap();
    }

    #[test]
    fn truncate_cuts_on_character_boundaries() {
        assert_eq!(truncate("ééééééééé", 6), "ééé...");
        assert_eq!(truncate("ééééééééé", 9), "ééééééééé");
        assert_eq!(truncate("short", 15), "short");
        assert_eq!(truncate("a-plain-ascii-name", 15), "a-plain-asci...");
    }

    #[test]
    fn multibyte_issue_row_renders_in_narrow_terminal() {
        let mut app = ready_app();
        app.tab = DetailTab::Issues;
        app.issues = vec![Issue {
            number: 42,
            title: "é".repeat(30),
            state: IssueState::Open,
            author: "sébastien-le-grand".to_string(),
            labels: vec!["crítica".to_string(), "más-alta".to_string()],
            comments: 3,
            updated_at: Utc::now(),
        }];

        draw_narrow(&app);
    }

    #[test]
    fn multibyte_commit_row_renders_in_narrow_terminal() {
        let mut app = ready_app();
        app.tab = DetailTab::Commits;
        app.commits = vec![Commit {
            sha: "7fd1a60b01f91b314f59955a4e4d4e80d8edf11d".to_string(),
            message: "é".repeat(24),
            author: "aéééééééééééééééé".to_string(),
            date: Utc::now(),
        }];

        draw_narrow(&app);
    }

    #[test]
    fn multibyte_actor_renders_in_news_feed() {
        let mut app = ready_app();
        app.tab = DetailTab::News;
        app.events = vec![NewsEvent {
            kind: "PushEvent".to_string(),
            actor: "ß".repeat(20),
            detail: Some("master".to_string()),
            created_at: Utc::now(),
        }];

        draw_narrow(&app);
    }
}
