use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::action::{Action, ConfirmChoice, DetailTab};
use crate::event::Event;
use crate::forge::Forge;
use crate::types::{Commit, Issue, NewsEvent, Notice, Repository, StarStatus, TreeEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the initial metadata fetch.
    Loading,
    /// Metadata complete, tabs and commands active.
    Ready,
    /// Initial fetch failed; `r` retries.
    LoadFailed,
}

/// Snapshot of the repository-detail state. Replaced wholesale on every
/// transition so the render layer only ever observes a consistent value.
#[derive(Debug, Clone)]
pub struct DetailState {
    pub repo: Repository,
    pub star: StarStatus,
    /// The last star check failed; the status is Unknown and shown as such
    /// rather than silently stale.
    pub star_check_failed: bool,
}

impl DetailState {
    fn new(repo: Repository) -> Self {
        Self {
            repo,
            star: StarStatus::Unknown,
            star_check_failed: false,
        }
    }

    fn with_star(&self, star: StarStatus) -> Self {
        Self {
            repo: self.repo.clone(),
            star,
            star_check_failed: false,
        }
    }

    fn with_star_unknown(&self, check_failed: bool) -> Self {
        Self {
            repo: self.repo.clone(),
            star: StarStatus::Unknown,
            star_check_failed: check_failed,
        }
    }

    /// Label for the star keybinding, or None while the status is Unknown
    /// (the affordance is hidden until a check has resolved).
    pub fn star_action_label(&self) -> Option<&'static str> {
        match self.star {
            StarStatus::Starred => Some("unstar"),
            StarStatus::NotStarred => Some("star"),
            StarStatus::Unknown => None,
        }
    }
}

pub struct App {
    pub phase: Phase,
    pub detail: DetailState,
    pub load_error: Option<String>,

    pub tab: DetailTab,
    pub events: Vec<NewsEvent>,
    pub entries: Vec<TreeEntry>,
    pub commits: Vec<Commit>,
    pub issues: Vec<Issue>,
    pub cursor: usize,
    pub loading: bool,

    pub notice: Option<Notice>,
    pub confirm_delete: bool,
    pub should_quit: bool,
    /// Printed after terminal restore so it survives the alternate screen.
    pub exit_notice: Option<String>,

    star_toggle_inflight: bool,
    load_id: u64,
    repo_load: u64,
    star_load: u64,
    tab_load: u64,
    shutdown: CancellationToken,
    forge: Arc<dyn Forge>,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl App {
    pub fn new(
        forge: Arc<dyn Forge>,
        repo: Repository,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        Self {
            phase: Phase::Loading,
            detail: DetailState::new(repo),
            load_error: None,

            tab: DetailTab::default(),
            events: Vec::new(),
            entries: Vec::new(),
            commits: Vec::new(),
            issues: Vec::new(),
            cursor: 0,
            loading: false,

            notice: None,
            confirm_delete: false,
            should_quit: false,
            exit_notice: None,

            star_toggle_inflight: false,
            load_id: 0,
            repo_load: 0,
            star_load: 0,
            tab_load: 0,
            shutdown: CancellationToken::new(),
            forge,
            action_tx,
        }
    }

    /// Cancel all in-flight requests. Called once when the screen closes.
    pub fn teardown(&self) {
        self.shutdown.cancel();
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Init => Action::Refresh,
            Event::Tick => Action::Tick,
            Event::Key(key) => self.handle_key(key),
            Event::Render => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        if self.confirm_delete {
            return match key.code {
                KeyCode::Char('y') => Action::Confirm(ConfirmChoice::ConfirmDelete),
                KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => {
                    Action::Confirm(ConfirmChoice::CancelDelete)
                }
                _ => Action::None,
            };
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
            KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
            KeyCode::Char('g') => Action::GoToTop,
            KeyCode::Char('G') => Action::GoToBottom,
            KeyCode::Tab => Action::NextTab,
            KeyCode::Char('n') => Action::SwitchTab(DetailTab::News),
            KeyCode::Char('c') => Action::SwitchTab(DetailTab::Code),
            KeyCode::Char('m') => Action::SwitchTab(DetailTab::Commits),
            KeyCode::Char('i') => Action::SwitchTab(DetailTab::Issues),
            KeyCode::Char('s') => Action::ToggleStar,
            KeyCode::Char('f') => Action::Fork,
            KeyCode::Char('D') => Action::RequestDelete,
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Char('o') => Action::OpenInBrowser,
            KeyCode::Char('y') => Action::YankUrl,
            _ => Action::None,
        }
    }

    pub fn update(&mut self, action: Action) {
        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::Tick => {
                if self.notice.as_ref().is_some_and(Notice::is_expired) {
                    self.notice = None;
                }
            }

            Action::ScrollUp => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                }
            }
            Action::ScrollDown => {
                let len = self.current_list_len();
                if len > 0 && self.cursor < len - 1 {
                    self.cursor += 1;
                }
            }
            Action::GoToTop => {
                self.cursor = 0;
            }
            Action::GoToBottom => {
                self.cursor = self.current_list_len().saturating_sub(1);
            }

            Action::SwitchTab(tab) => {
                if self.phase == Phase::Ready {
                    self.tab = tab;
                    self.cursor = 0;
                    self.load_tab();
                }
            }
            Action::NextTab => {
                self.update(Action::SwitchTab(self.tab.next()));
            }

            Action::Refresh => match self.phase {
                Phase::Loading | Phase::LoadFailed => self.ensure_complete(),
                Phase::Ready => {
                    self.check_star_status();
                    self.load_tab();
                }
            },

            Action::ToggleStar => {
                // Single-flight: a toggle racing another is dropped, not queued.
                if self.phase == Phase::Ready && !self.star_toggle_inflight {
                    if let Some(target) = self.detail.star.toggled() {
                        self.star_toggle_inflight = true;
                        self.spawn_toggle_star(target);
                    } else {
                        self.notice = Some(Notice::error("Star status not known yet"));
                    }
                }
            }
            Action::StarToggled(status) => {
                self.star_toggle_inflight = false;
                self.detail = self.detail.with_star(status);
                let verb = match status {
                    StarStatus::Starred => "Starred",
                    _ => "Unstarred",
                };
                self.notice = Some(Notice::info(format!("{} {}", verb, self.detail.repo.id)));
            }
            Action::StarToggleFailed(msg) => {
                self.star_toggle_inflight = false;
                self.notice = Some(Notice::error(msg));
            }

            Action::Fork => {
                if self.phase == Phase::Ready {
                    self.notice = Some(Notice::info(format!("Forking {}...", self.detail.repo.id)));
                    self.spawn_fork();
                }
            }
            Action::Forked(fork) => {
                let url = fork.url();
                self.notice = Some(match open::that(&url) {
                    Ok(()) => Notice::info(format!("Forked to {}", fork.id)),
                    Err(e) => {
                        Notice::error(format!("Forked to {}, but browser failed: {}", fork.id, e))
                    }
                });
            }
            Action::ForkFailed(msg) => {
                self.notice = Some(Notice::error(msg));
            }

            Action::RequestDelete => {
                if self.phase == Phase::Ready {
                    self.confirm_delete = true;
                }
            }
            Action::Confirm(choice) => {
                self.confirm_delete = false;
                if choice == ConfirmChoice::ConfirmDelete {
                    self.spawn_delete();
                }
            }
            Action::Deleted => {
                self.exit_notice = Some(format!("Deleted {}", self.detail.repo.id));
                self.should_quit = true;
            }
            Action::DeleteFailed(msg) => {
                self.notice = Some(Notice::error(msg));
            }

            Action::OpenInBrowser => {
                let url = self.detail.repo.url();
                if let Err(e) = open::that(&url) {
                    self.notice = Some(Notice::error(format!("Could not open browser: {}", e)));
                }
            }
            Action::YankUrl => {
                let url = self.detail.repo.url();
                self.notice = Some(
                    match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(url.clone())) {
                        Ok(()) => Notice::info(format!("Copied {}", url)),
                        Err(e) => Notice::error(format!("Clipboard failed: {}", e)),
                    },
                );
            }

            Action::RepoLoaded(repo, load_id) => {
                if load_id != self.repo_load {
                    tracing::debug!(load_id, "dropping stale repository load");
                    return;
                }
                self.detail = DetailState::new(*repo);
                self.enter_ready();
            }
            Action::RepoLoadFailed(msg, load_id) => {
                if load_id != self.repo_load {
                    return;
                }
                self.loading = false;
                self.phase = Phase::LoadFailed;
                self.load_error = Some(msg);
            }

            Action::StarStatusLoaded(status, load_id) => {
                if load_id != self.star_load {
                    tracing::debug!(load_id, "dropping stale star status");
                    return;
                }
                self.detail = self.detail.with_star(status);
            }
            Action::StarCheckFailed(msg, load_id) => {
                if load_id != self.star_load {
                    return;
                }
                tracing::warn!(error = %msg, "star status check failed");
                self.detail = self.detail.with_star_unknown(true);
                self.notice = Some(Notice::error(format!("Could not check star status: {}", msg)));
            }

            Action::EventsLoaded(events, load_id) => {
                if load_id != self.tab_load {
                    return;
                }
                self.loading = false;
                self.events = events;
                self.cursor = 0;
            }
            Action::TreeLoaded(entries, load_id) => {
                if load_id != self.tab_load {
                    return;
                }
                self.loading = false;
                self.entries = entries;
                self.cursor = 0;
            }
            Action::CommitsLoaded(commits, load_id) => {
                if load_id != self.tab_load {
                    return;
                }
                self.loading = false;
                self.commits = commits;
                self.cursor = 0;
            }
            Action::IssuesLoaded(issues, load_id) => {
                if load_id != self.tab_load {
                    return;
                }
                self.loading = false;
                self.issues = issues;
                self.cursor = 0;
            }
            Action::TabLoadFailed(msg, load_id) => {
                if load_id != self.tab_load {
                    return;
                }
                self.loading = false;
                self.notice = Some(Notice::error(msg));
            }

            Action::None => {}
        }
    }

    fn current_list_len(&self) -> usize {
        match self.tab {
            DetailTab::News => self.events.len(),
            DetailTab::Code => self.entries.len(),
            DetailTab::Commits => self.commits.len(),
            DetailTab::Issues => self.issues.len(),
        }
    }

    /// Issue the initial fetch only when metadata is missing; a complete
    /// repository goes straight to Ready without a remote call.
    fn ensure_complete(&mut self) {
        if self.detail.repo.is_complete() {
            self.enter_ready();
        } else {
            self.phase = Phase::Loading;
            self.load_error = None;
            self.loading = true;
            self.spawn_fetch_repo();
        }
    }

    fn enter_ready(&mut self) {
        self.phase = Phase::Ready;
        self.loading = false;
        self.check_star_status();
        self.load_tab();
    }

    /// Reset the status to Unknown, then query. The affordance stays hidden
    /// until the answer arrives.
    fn check_star_status(&mut self) {
        self.detail = self.detail.with_star_unknown(false);
        self.spawn_check_star();
    }

    fn load_tab(&mut self) {
        match self.tab {
            DetailTab::News => {
                self.loading = true;
                self.spawn_load_events();
            }
            DetailTab::Code => {
                self.loading = true;
                self.spawn_load_tree();
            }
            DetailTab::Commits => {
                self.loading = true;
                self.spawn_load_commits();
            }
            DetailTab::Issues => {
                if self.detail.repo.has_issues {
                    self.loading = true;
                    self.spawn_load_issues();
                }
            }
        }
    }

    fn next_load_id(&mut self) -> u64 {
        self.load_id += 1;
        self.load_id
    }

    fn spawn_fetch_repo(&mut self) {
        let load_id = self.next_load_id();
        self.repo_load = load_id;
        let id = self.detail.repo.id.clone();
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let cancel = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = forge.get_repo(&id) => {
                    let action = match result {
                        Ok(repo) => Action::RepoLoaded(Box::new(repo), load_id),
                        Err(e) => Action::RepoLoadFailed(e.to_string(), load_id),
                    };
                    tx.send(action).ok();
                }
            }
        });
    }

    fn spawn_check_star(&mut self) {
        let load_id = self.next_load_id();
        self.star_load = load_id;
        let id = self.detail.repo.id.clone();
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let cancel = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = forge.is_starred(&id) => {
                    let action = match result {
                        Ok(true) => Action::StarStatusLoaded(StarStatus::Starred, load_id),
                        Ok(false) => Action::StarStatusLoaded(StarStatus::NotStarred, load_id),
                        Err(e) => Action::StarCheckFailed(e.to_string(), load_id),
                    };
                    tx.send(action).ok();
                }
            }
        });
    }

    fn spawn_toggle_star(&self, target: StarStatus) {
        let id = self.detail.repo.id.clone();
        let unstarring = self.detail.star == StarStatus::Starred;
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let cancel = self.shutdown.clone();
        tokio::spawn(async move {
            let request = async {
                if unstarring {
                    forge.unstar(&id).await
                } else {
                    forge.star(&id).await
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = request => {
                    let action = match result {
                        Ok(()) => Action::StarToggled(target),
                        Err(e) => Action::StarToggleFailed(e.to_string()),
                    };
                    tx.send(action).ok();
                }
            }
        });
    }

    fn spawn_fork(&self) {
        let id = self.detail.repo.id.clone();
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let cancel = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = forge.fork(&id) => {
                    let action = match result {
                        Ok(fork) => Action::Forked(Box::new(fork)),
                        Err(e) => Action::ForkFailed(e.to_string()),
                    };
                    tx.send(action).ok();
                }
            }
        });
    }

    fn spawn_delete(&self) {
        let id = self.detail.repo.id.clone();
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let cancel = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = forge.delete_repo(&id) => {
                    let action = match result {
                        Ok(()) => Action::Deleted,
                        Err(e) => Action::DeleteFailed(e.to_string()),
                    };
                    tx.send(action).ok();
                }
            }
        });
    }

    fn spawn_load_events(&mut self) {
        let load_id = self.next_load_id();
        self.tab_load = load_id;
        let id = self.detail.repo.id.clone();
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let cancel = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = forge.list_events(&id) => {
                    let action = match result {
                        Ok(events) => Action::EventsLoaded(events, load_id),
                        Err(e) => Action::TabLoadFailed(e.to_string(), load_id),
                    };
                    tx.send(action).ok();
                }
            }
        });
    }

    fn spawn_load_tree(&mut self) {
        let load_id = self.next_load_id();
        self.tab_load = load_id;
        let id = self.detail.repo.id.clone();
        let branch = self.detail.repo.default_branch.clone();
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let cancel = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = forge.list_tree(&id, &branch) => {
                    let action = match result {
                        Ok(entries) => Action::TreeLoaded(entries, load_id),
                        Err(e) => Action::TabLoadFailed(e.to_string(), load_id),
                    };
                    tx.send(action).ok();
                }
            }
        });
    }

    fn spawn_load_commits(&mut self) {
        let load_id = self.next_load_id();
        self.tab_load = load_id;
        let id = self.detail.repo.id.clone();
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let cancel = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = forge.list_commits(&id) => {
                    let action = match result {
                        Ok(commits) => Action::CommitsLoaded(commits, load_id),
                        Err(e) => Action::TabLoadFailed(e.to_string(), load_id),
                    };
                    tx.send(action).ok();
                }
            }
        });
    }

    fn spawn_load_issues(&mut self) {
        let load_id = self.next_load_id();
        self.tab_load = load_id;
        let id = self.detail.repo.id.clone();
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let cancel = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = forge.list_issues(&id) => {
                    let action = match result {
                        Ok(issues) => Action::IssuesLoaded(issues, load_id),
                        Err(e) => Action::TabLoadFailed(e.to_string(), load_id),
                    };
                    tx.send(action).ok();
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::error::{Result, StarboardError};
    use crate::types::{Owner, RepoId};

    #[derive(Debug, Default)]
    struct FakeForge {
        calls: Mutex<Vec<String>>,
        starred: bool,
        fail_toggle: bool,
        fail_star_check: bool,
        fail_fork: bool,
    }

    impl FakeForge {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn complete_repo() -> Repository {
        Repository {
            id: RepoId::parse("octocat/Hello-World").unwrap(),
            owner: Owner {
                login: "octocat".to_string(),
                avatar_url: Some("https://avatars.githubusercontent.com/u/583231".to_string()),
            },
            description: Some("My first repository on GitHub!".to_string()),
            html_url: Some("https://github.com/octocat/Hello-World".to_string()),
            default_branch: "master".to_string(),
            stars: 1,
            forks: 0,
            has_issues: true,
            updated_at: None,
        }
    }

    #[async_trait::async_trait]
    impl Forge for FakeForge {
        fn name(&self) -> &str {
            "fake"
        }

        async fn get_repo(&self, _id: &RepoId) -> Result<Repository> {
            self.record("get_repo");
            Ok(complete_repo())
        }

        async fn is_starred(&self, _id: &RepoId) -> Result<bool> {
            self.record("is_starred");
            if self.fail_star_check {
                Err(StarboardError::Api("check failed".to_string()))
            } else {
                Ok(self.starred)
            }
        }

        async fn star(&self, _id: &RepoId) -> Result<()> {
            self.record("star");
            if self.fail_toggle {
                Err(StarboardError::Api("star failed".to_string()))
            } else {
                Ok(())
            }
        }

        async fn unstar(&self, _id: &RepoId) -> Result<()> {
            self.record("unstar");
            if self.fail_toggle {
                Err(StarboardError::Api("unstar failed".to_string()))
            } else {
                Ok(())
            }
        }

        async fn fork(&self, _id: &RepoId) -> Result<Repository> {
            self.record("fork");
            if self.fail_fork {
                Err(StarboardError::Incomplete(
                    "Fork accepted but no repository returned".to_string(),
                ))
            } else {
                Ok(complete_repo())
            }
        }

        async fn delete_repo(&self, _id: &RepoId) -> Result<()> {
            self.record("delete_repo");
            Ok(())
        }

        async fn list_events(&self, _id: &RepoId) -> Result<Vec<NewsEvent>> {
            self.record("list_events");
            Ok(vec![])
        }

        async fn list_tree(&self, _id: &RepoId, _branch: &str) -> Result<Vec<TreeEntry>> {
            self.record("list_tree");
            Ok(vec![])
        }

        async fn list_commits(&self, _id: &RepoId) -> Result<Vec<Commit>> {
            self.record("list_commits");
            Ok(vec![])
        }

        async fn list_issues(&self, _id: &RepoId) -> Result<Vec<Issue>> {
            self.record("list_issues");
            Ok(vec![])
        }
    }

    struct Harness {
        app: App,
        rx: mpsc::UnboundedReceiver<Action>,
        forge: Arc<FakeForge>,
    }

    fn harness(forge: FakeForge, repo: Repository) -> Harness {
        let forge = Arc::new(forge);
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(forge.clone(), repo, tx);
        Harness { app, rx, forge }
    }

    async fn next_action(rx: &mut mpsc::UnboundedReceiver<Action>) -> Action {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for action")
            .expect("action channel closed")
    }

    async fn assert_no_action(rx: &mut mpsc::UnboundedReceiver<Action>) {
        assert!(
            timeout(Duration::from_millis(50), rx.recv()).await.is_err(),
            "expected no pending action"
        );
    }

    /// Drain and apply `n` completions regardless of arrival order.
    async fn drain(h: &mut Harness, n: usize) {
        for _ in 0..n {
            let action = next_action(&mut h.rx).await;
            h.app.update(action);
        }
    }

    #[tokio::test]
    async fn complete_repository_issues_no_fetch() {
        let mut h = harness(FakeForge::default(), complete_repo());

        h.app.update(Action::Refresh);
        assert_eq!(h.app.phase, Phase::Ready);

        // star check + initial tab load
        drain(&mut h, 2).await;
        assert!(!h.forge.calls().contains(&"get_repo".to_string()));
    }

    #[tokio::test]
    async fn incomplete_repository_fetches_exactly_once() {
        let repo = Repository::stub(RepoId::parse("octocat/Hello-World").unwrap());
        let mut h = harness(FakeForge::default(), repo);

        h.app.update(Action::Refresh);
        assert_eq!(h.app.phase, Phase::Loading);

        let action = next_action(&mut h.rx).await;
        assert!(matches!(action, Action::RepoLoaded(..)));
        h.app.update(action);

        assert_eq!(h.app.phase, Phase::Ready);
        assert!(h.app.detail.repo.is_complete());

        drain(&mut h, 2).await;
        let fetches = h.forge.calls().iter().filter(|c| *c == "get_repo").count();
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn star_check_resets_status_before_resolving() {
        let forge = FakeForge {
            starred: true,
            ..FakeForge::default()
        };
        let mut h = harness(forge, complete_repo());

        h.app.update(Action::Refresh);
        assert_eq!(h.app.detail.star, StarStatus::Unknown);

        drain(&mut h, 2).await;
        assert_eq!(h.app.detail.star, StarStatus::Starred);

        // A refresh drops back to Unknown until the new check resolves.
        h.app.update(Action::Refresh);
        assert_eq!(h.app.detail.star, StarStatus::Unknown);
    }

    #[tokio::test]
    async fn failed_star_check_is_surfaced_as_unknown() {
        let forge = FakeForge {
            fail_star_check: true,
            ..FakeForge::default()
        };
        let mut h = harness(forge, complete_repo());

        h.app.update(Action::Refresh);
        drain(&mut h, 2).await;

        assert_eq!(h.app.detail.star, StarStatus::Unknown);
        assert!(h.app.detail.star_check_failed);
        assert_eq!(h.app.detail.star_action_label(), None);
        assert!(h.app.notice.is_some());
    }

    #[tokio::test]
    async fn toggle_from_starred_unstars_on_success() {
        let mut h = harness(FakeForge::default(), complete_repo());
        h.app.phase = Phase::Ready;
        h.app.detail = h.app.detail.with_star(StarStatus::Starred);

        h.app.update(Action::ToggleStar);
        let action = next_action(&mut h.rx).await;
        assert!(matches!(action, Action::StarToggled(StarStatus::NotStarred)));
        h.app.update(action);

        assert_eq!(h.app.detail.star, StarStatus::NotStarred);
        assert_eq!(h.forge.calls(), vec!["unstar"]);
    }

    #[tokio::test]
    async fn toggle_failure_keeps_status() {
        let forge = FakeForge {
            fail_toggle: true,
            ..FakeForge::default()
        };
        let mut h = harness(forge, complete_repo());
        h.app.phase = Phase::Ready;
        h.app.detail = h.app.detail.with_star(StarStatus::NotStarred);

        h.app.update(Action::ToggleStar);
        let action = next_action(&mut h.rx).await;
        assert!(matches!(action, Action::StarToggleFailed(_)));
        h.app.update(action);

        assert_eq!(h.app.detail.star, StarStatus::NotStarred);
        assert_eq!(h.forge.calls(), vec!["star"]);
        assert!(h.app.notice.is_some());
    }

    #[tokio::test]
    async fn toggle_is_single_flight() {
        let mut h = harness(FakeForge::default(), complete_repo());
        h.app.phase = Phase::Ready;
        h.app.detail = h.app.detail.with_star(StarStatus::Starred);

        h.app.update(Action::ToggleStar);
        h.app.update(Action::ToggleStar);

        drain(&mut h, 1).await;
        assert_no_action(&mut h.rx).await;
        assert_eq!(h.forge.calls(), vec!["unstar"]);

        // Once the first toggle resolved, a new one goes through.
        h.app.update(Action::ToggleStar);
        drain(&mut h, 1).await;
        assert_eq!(h.forge.calls(), vec!["unstar", "star"]);
    }

    #[tokio::test]
    async fn toggle_from_unknown_is_rejected() {
        let mut h = harness(FakeForge::default(), complete_repo());
        h.app.phase = Phase::Ready;

        h.app.update(Action::ToggleStar);
        assert_no_action(&mut h.rx).await;
        assert!(h.forge.calls().is_empty());
        assert!(h.app.notice.is_some());
    }

    #[tokio::test]
    async fn confirmed_delete_issues_one_call() {
        let mut h = harness(FakeForge::default(), complete_repo());
        h.app.phase = Phase::Ready;

        h.app.update(Action::RequestDelete);
        assert!(h.app.confirm_delete);

        h.app.update(Action::Confirm(ConfirmChoice::ConfirmDelete));
        assert!(!h.app.confirm_delete);

        let action = next_action(&mut h.rx).await;
        assert!(matches!(action, Action::Deleted));
        h.app.update(action);

        assert!(h.app.should_quit);
        assert!(h.app.exit_notice.is_some());
        assert_eq!(h.forge.calls(), vec!["delete_repo"]);
    }

    #[tokio::test]
    async fn cancelled_delete_issues_no_call() {
        let mut h = harness(FakeForge::default(), complete_repo());
        h.app.phase = Phase::Ready;

        h.app.update(Action::RequestDelete);
        h.app.update(Action::Confirm(ConfirmChoice::CancelDelete));

        assert!(!h.app.confirm_delete);
        assert_no_action(&mut h.rx).await;
        assert!(h.forge.calls().is_empty());
    }

    #[tokio::test]
    async fn stale_star_completion_is_dropped() {
        let forge = FakeForge {
            starred: true,
            ..FakeForge::default()
        };
        let mut h = harness(forge, complete_repo());
        h.app.update(Action::Refresh);

        // A completion from a superseded check must not land.
        h.app
            .update(Action::StarStatusLoaded(StarStatus::NotStarred, 999));
        assert_eq!(h.app.detail.star, StarStatus::Unknown);

        drain(&mut h, 2).await;
        assert_eq!(h.app.detail.star, StarStatus::Starred);
    }

    #[tokio::test]
    async fn stale_tab_completion_is_dropped() {
        let mut h = harness(FakeForge::default(), complete_repo());
        h.app.update(Action::Refresh);
        // star check + News load
        drain(&mut h, 2).await;

        // Switching tabs supersedes the News load; a late payload from it
        // must not land.
        h.app.update(Action::SwitchTab(DetailTab::Commits));
        let late = NewsEvent {
            kind: "PushEvent".to_string(),
            actor: "octocat".to_string(),
            detail: Some("master".to_string()),
            created_at: chrono::Utc::now(),
        };
        h.app.update(Action::EventsLoaded(vec![late], 999));
        assert!(h.app.events.is_empty());
        assert!(h.app.loading);

        drain(&mut h, 1).await;
        assert!(!h.app.loading);
        assert!(h.app.events.is_empty());
    }

    #[tokio::test]
    async fn stale_repo_completion_is_dropped() {
        let repo = Repository::stub(RepoId::parse("octocat/Hello-World").unwrap());
        let mut h = harness(FakeForge::default(), repo);
        h.app.update(Action::Refresh);

        // Metadata from a superseded fetch must not flip the screen to ready.
        h.app
            .update(Action::RepoLoaded(Box::new(complete_repo()), 999));
        assert_eq!(h.app.phase, Phase::Loading);
        assert!(!h.app.detail.repo.is_complete());

        // current fetch, then star check + tab load from the transition
        drain(&mut h, 1).await;
        assert_eq!(h.app.phase, Phase::Ready);
        drain(&mut h, 2).await;
    }

    #[tokio::test]
    async fn fork_failure_surfaces_notice() {
        let forge = FakeForge {
            fail_fork: true,
            ..FakeForge::default()
        };
        let mut h = harness(forge, complete_repo());
        h.app.phase = Phase::Ready;

        h.app.update(Action::Fork);
        let action = next_action(&mut h.rx).await;
        assert!(matches!(action, Action::ForkFailed(_)));
        h.app.update(action);

        assert_eq!(h.forge.calls(), vec!["fork"]);
        assert!(h.app.notice.is_some());
    }

    #[tokio::test]
    async fn load_star_and_toggle_scenario() {
        let forge = FakeForge {
            starred: true,
            ..FakeForge::default()
        };
        let repo = Repository::stub(RepoId::parse("octocat/Hello-World").unwrap());
        let mut h = harness(forge, repo);

        h.app.update(Action::Refresh);
        drain(&mut h, 1).await; // RepoLoaded
        assert!(h.app.detail.repo.is_complete());

        drain(&mut h, 2).await; // star check + tab load
        assert_eq!(h.app.detail.star, StarStatus::Starred);
        assert_eq!(h.app.detail.star_action_label(), Some("unstar"));

        h.app.update(Action::ToggleStar);
        drain(&mut h, 1).await;
        assert_eq!(h.app.detail.star, StarStatus::NotStarred);
        assert_eq!(h.app.detail.star_action_label(), Some("star"));
    }
}
