mod action;
mod app;
mod auth;
mod config;
mod error;
mod event;
mod forge;
mod github;
mod tui;
mod types;
mod ui;

use std::panic;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::action::Action;
use crate::app::App;
use crate::config::Config;
use crate::event::Event;
use crate::github::GitHub;
use crate::tui::EventHandler;
use crate::types::{RepoId, Repository};

#[derive(Parser, Debug)]
#[command(
    name = "starboard",
    version,
    about = "Terminal viewer for a single GitHub repository"
)]
struct Args {
    /// Repository to open, as owner/name
    repo: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let Some(repo_id) = RepoId::parse(&args.repo) else {
        return Err(format!(
            "invalid repository '{}': expected owner/name",
            args.repo
        )
        .into());
    };

    let config = Config::load();
    let token = auth::resolve_token(&config)?;
    let github = GitHub::new(token)?;

    // Restore the terminal before the default panic output
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let result = run(github, repo_id).await;

    tui::restore()?;

    // The exit notice (e.g. after a delete) survives the alternate screen
    match result {
        Ok(Some(notice)) => {
            println!("{}", notice);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    }
}

async fn run(github: GitHub, repo_id: RepoId) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let mut terminal = tui::init()?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let repo = Repository::stub(repo_id);
    let mut app = App::new(Arc::new(github), repo, action_tx.clone());

    let tick_rate = Duration::from_millis(250);
    let render_rate = Duration::from_millis(16); // ~60fps
    let mut events = EventHandler::new(tick_rate, render_rate);

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                if event.is_quit() {
                    break;
                }

                match event {
                    Event::Render => {
                        terminal.draw(|frame| ui::render(frame, &app))?;
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                app.update(action);
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Cancel whatever is still in flight before tearing the screen down
    app.teardown();

    Ok(app.exit_notice.take())
}
