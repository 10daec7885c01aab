use crate::types::{Commit, Issue, NewsEvent, Repository, StarStatus, TreeEntry};

/// Tab selection for the detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailTab {
    #[default]
    News,
    Code,
    Commits,
    Issues,
}

impl DetailTab {
    pub fn next(self) -> Self {
        match self {
            DetailTab::News => DetailTab::Code,
            DetailTab::Code => DetailTab::Commits,
            DetailTab::Commits => DetailTab::Issues,
            DetailTab::Issues => DetailTab::News,
        }
    }
}

/// Outcome of the delete confirmation prompt. An explicit choice, deliberately
/// decoupled from which key or button produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    ConfirmDelete,
    CancelDelete,
}

#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    Tick,
    ScrollUp,
    ScrollDown,
    GoToTop,
    GoToBottom,
    SwitchTab(DetailTab),
    NextTab,

    // User commands
    Refresh,
    ToggleStar,
    Fork,
    RequestDelete,
    Confirm(ConfirmChoice),
    OpenInBrowser,
    YankUrl,

    // Completions from spawned requests. Load-type completions carry the
    // generation they were issued under; stale ones are dropped.
    RepoLoaded(Box<Repository>, u64),
    RepoLoadFailed(String, u64),
    StarStatusLoaded(StarStatus, u64),
    StarCheckFailed(String, u64),
    StarToggled(StarStatus),
    StarToggleFailed(String),
    Forked(Box<Repository>),
    ForkFailed(String),
    Deleted,
    DeleteFailed(String),
    EventsLoaded(Vec<NewsEvent>, u64),
    TreeLoaded(Vec<TreeEntry>, u64),
    CommitsLoaded(Vec<Commit>, u64),
    IssuesLoaded(Vec<Issue>, u64),
    TabLoadFailed(String, u64),

    None,
}
