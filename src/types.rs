use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Repository coordinates: owner login + repository name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    /// Parse `owner/name` as given on the command line.
    pub fn parse(input: &str) -> Option<Self> {
        let (owner, name) = input.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository owner as embedded in repository metadata.
#[derive(Debug, Clone)]
pub struct Owner {
    pub login: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Repository {
    pub id: RepoId,
    pub owner: Owner,
    pub description: Option<String>,
    pub html_url: Option<String>,
    pub default_branch: String,
    pub stars: u32,
    pub forks: u32,
    pub has_issues: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Repository {
    /// A repository known only by its coordinates, before any metadata fetch.
    pub fn stub(id: RepoId) -> Self {
        let owner = Owner {
            login: id.owner.clone(),
            avatar_url: None,
        };
        Self {
            id,
            owner,
            description: None,
            html_url: None,
            default_branch: "HEAD".to_string(),
            stars: 0,
            forks: 0,
            has_issues: true,
            updated_at: None,
        }
    }

    /// Full metadata has been fetched. The avatar URL is the completeness
    /// marker: it is never present on navigation input, always on a fetch.
    pub fn is_complete(&self) -> bool {
        self.owner.avatar_url.is_some()
    }

    /// Canonical web URL, falling back to github.com when metadata is missing.
    pub fn url(&self) -> String {
        self.html_url
            .clone()
            .unwrap_or_else(|| format!("https://github.com/{}", self.id))
    }
}

/// Whether the authenticated user has starred the repository. Starts Unknown
/// and transitions only via an explicit check or toggle, never by inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StarStatus {
    #[default]
    Unknown,
    Starred,
    NotStarred,
}

impl StarStatus {
    /// The status after a successful toggle. None while Unknown: toggling is
    /// only valid once a check has resolved.
    pub fn toggled(self) -> Option<StarStatus> {
        match self {
            StarStatus::Starred => Some(StarStatus::NotStarred),
            StarStatus::NotStarred => Some(StarStatus::Starred),
            StarStatus::Unknown => None,
        }
    }
}

/// An entry in the repository's public event feed (the News tab).
#[derive(Debug, Clone)]
pub struct NewsEvent {
    pub kind: String,
    pub actor: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of the default branch's root tree (the Code tab).
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub path: String,
    pub kind: TreeEntryKind,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEntryKind {
    File,
    Dir,
    Submodule,
}

/// Git commit (summary for the Commits tab).
#[derive(Debug, Clone)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: DateTime<Utc>,
}

/// GitHub issue (summary for the Issues tab).
#[derive(Debug, Clone)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub author: String,
    pub labels: Vec<String>,
    pub comments: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueState::Open => write!(f, "Open"),
            IssueState::Closed => write!(f, "Closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient status-bar message, expired by the tick event.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
    expires_at: Instant,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: NoticeLevel::Info,
            expires_at: Instant::now() + Duration::from_secs(4),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: NoticeLevel::Error,
            expires_at: Instant::now() + Duration::from_secs(6),
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_id_parses_owner_and_name() {
        let id = RepoId::parse("octocat/Hello-World").unwrap();
        assert_eq!(id.owner, "octocat");
        assert_eq!(id.name, "Hello-World");
        assert_eq!(id.to_string(), "octocat/Hello-World");
    }

    #[test]
    fn repo_id_rejects_malformed_input() {
        assert!(RepoId::parse("no-slash").is_none());
        assert!(RepoId::parse("/name").is_none());
        assert!(RepoId::parse("owner/").is_none());
        assert!(RepoId::parse("a/b/c").is_none());
    }

    #[test]
    fn stub_repository_is_incomplete() {
        let repo = Repository::stub(RepoId::parse("octocat/Hello-World").unwrap());
        assert!(!repo.is_complete());
        assert_eq!(repo.url(), "https://github.com/octocat/Hello-World");
    }

    #[test]
    fn fetched_avatar_marks_repository_complete() {
        let mut repo = Repository::stub(RepoId::parse("octocat/Hello-World").unwrap());
        repo.owner.avatar_url = Some("https://avatars.githubusercontent.com/u/583231".to_string());
        assert!(repo.is_complete());
    }

    #[test]
    fn star_status_toggles_between_known_states() {
        assert_eq!(StarStatus::Starred.toggled(), Some(StarStatus::NotStarred));
        assert_eq!(StarStatus::NotStarred.toggled(), Some(StarStatus::Starred));
        assert_eq!(StarStatus::Unknown.toggled(), None);
    }
}
