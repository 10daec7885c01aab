use async_trait::async_trait;
use octocrab::models::IssueState as OctoIssueState;
use octocrab::Octocrab;
use reqwest::StatusCode;

use crate::error::{Result, StarboardError};
use crate::forge::Forge;
use crate::types::{
    Commit, Issue, IssueState, NewsEvent, Owner, RepoId, Repository, TreeEntry, TreeEntryKind,
};

const USER_AGENT: &str = "starboard";

pub struct GitHub {
    client: Octocrab,
    http: reqwest::Client,
    token: String,
}

impl std::fmt::Debug for GitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHub").finish_non_exhaustive()
    }
}

impl From<octocrab::Error> for StarboardError {
    fn from(err: octocrab::Error) -> Self {
        StarboardError::Api(err.to_string())
    }
}

impl GitHub {
    pub fn new(token: String) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token.clone())
            .build()
            .map_err(|e| StarboardError::Auth(e.to_string()))?;

        Ok(Self {
            client,
            http: reqwest::Client::new(),
            token,
        })
    }

    /// Raw REST request for the endpoints where the response status code is
    /// the payload (star check) or that octocrab does not model (star/unstar,
    /// fork, delete).
    async fn raw(&self, method: reqwest::Method, path: &str) -> Result<reqwest::Response> {
        let url = format!("https://api.github.com{}", path);
        self.http
            .request(method, &url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| StarboardError::Api(e.to_string()))
    }
}

#[async_trait]
impl Forge for GitHub {
    fn name(&self) -> &str {
        "GitHub"
    }

    async fn get_repo(&self, id: &RepoId) -> Result<Repository> {
        let repo = self.client.repos(&id.owner, &id.name).get().await?;

        let owner = repo
            .owner
            .map(|o| Owner {
                login: o.login,
                avatar_url: Some(o.avatar_url.to_string()),
            })
            .unwrap_or_else(|| Owner {
                login: id.owner.clone(),
                avatar_url: None,
            });

        Ok(Repository {
            id: RepoId {
                owner: owner.login.clone(),
                name: repo.name,
            },
            owner,
            description: repo.description,
            html_url: repo.html_url.map(|u| u.to_string()),
            default_branch: repo.default_branch.unwrap_or_else(|| "HEAD".to_string()),
            stars: repo.stargazers_count.unwrap_or(0),
            forks: repo.forks_count.unwrap_or(0),
            has_issues: repo.has_issues.unwrap_or(false),
            updated_at: repo.updated_at,
        })
    }

    async fn is_starred(&self, id: &RepoId) -> Result<bool> {
        let path = format!("/user/starred/{}/{}", id.owner, id.name);
        let response = self.raw(reqwest::Method::GET, &path).await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StarboardError::Api(format!(
                "Star check failed: {}",
                status
            ))),
        }
    }

    async fn star(&self, id: &RepoId) -> Result<()> {
        let path = format!("/user/starred/{}/{}", id.owner, id.name);
        let response = self.raw(reqwest::Method::PUT, &path).await?;

        if !response.status().is_success() {
            return Err(StarboardError::Api(format!(
                "Starring failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn unstar(&self, id: &RepoId) -> Result<()> {
        let path = format!("/user/starred/{}/{}", id.owner, id.name);
        let response = self.raw(reqwest::Method::DELETE, &path).await?;

        if !response.status().is_success() {
            return Err(StarboardError::Api(format!(
                "Unstarring failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn fork(&self, id: &RepoId) -> Result<Repository> {
        let path = format!("/repos/{}/{}/forks", id.owner, id.name);
        let response = self.raw(reqwest::Method::POST, &path).await?;

        if !response.status().is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(StarboardError::Api(format!("Fork failed: {}", text)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StarboardError::Api(e.to_string()))?;

        let owner_login = body
            .get("owner")
            .and_then(|o| o.get("login"))
            .and_then(|l| l.as_str());
        let name = body.get("name").and_then(|n| n.as_str());
        let html_url = body.get("html_url").and_then(|u| u.as_str());

        // The fork endpoint may acknowledge without a usable payload while
        // the copy is still being scheduled server-side.
        let (Some(owner_login), Some(name), Some(html_url)) = (owner_login, name, html_url) else {
            return Err(StarboardError::Incomplete(
                "Fork accepted but no repository returned".to_string(),
            ));
        };

        Ok(Repository {
            id: RepoId {
                owner: owner_login.to_string(),
                name: name.to_string(),
            },
            owner: Owner {
                login: owner_login.to_string(),
                avatar_url: body
                    .get("owner")
                    .and_then(|o| o.get("avatar_url"))
                    .and_then(|u| u.as_str())
                    .map(|s| s.to_string()),
            },
            description: body
                .get("description")
                .and_then(|d| d.as_str())
                .map(|s| s.to_string()),
            html_url: Some(html_url.to_string()),
            default_branch: body
                .get("default_branch")
                .and_then(|b| b.as_str())
                .unwrap_or("HEAD")
                .to_string(),
            stars: 0,
            forks: 0,
            has_issues: false,
            updated_at: None,
        })
    }

    async fn delete_repo(&self, id: &RepoId) -> Result<()> {
        let path = format!("/repos/{}/{}", id.owner, id.name);
        let response = self.raw(reqwest::Method::DELETE, &path).await?;

        if !response.status().is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(StarboardError::Api(format!("Delete failed: {}", text)));
        }
        Ok(())
    }

    async fn list_events(&self, id: &RepoId) -> Result<Vec<NewsEvent>> {
        let url = format!("/repos/{}/{}/events?per_page=50", id.owner, id.name);
        let response: serde_json::Value = self.client.get(&url, None::<&()>).await?;

        let events = response
            .as_array()
            .map(|events| {
                events
                    .iter()
                    .filter_map(|event| {
                        Some(NewsEvent {
                            kind: event.get("type")?.as_str()?.to_string(),
                            actor: event
                                .get("actor")
                                .and_then(|a| a.get("login"))
                                .and_then(|l| l.as_str())
                                .unwrap_or("unknown")
                                .to_string(),
                            detail: event
                                .get("payload")
                                .and_then(|p| p.get("action"))
                                .and_then(|a| a.as_str())
                                .map(|s| s.to_string()),
                            created_at: event
                                .get("created_at")
                                .and_then(|d| d.as_str())
                                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                                .map(|d| d.with_timezone(&chrono::Utc))
                                .unwrap_or_else(chrono::Utc::now),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(events)
    }

    async fn list_tree(&self, id: &RepoId, branch: &str) -> Result<Vec<TreeEntry>> {
        let url = format!("/repos/{}/{}/git/trees/{}", id.owner, id.name, branch);
        let response: serde_json::Value = self.client.get(&url, None::<&()>).await?;

        let mut entries: Vec<TreeEntry> = response
            .get("tree")
            .and_then(|t| t.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let kind = match entry.get("type")?.as_str()? {
                            "blob" => TreeEntryKind::File,
                            "tree" => TreeEntryKind::Dir,
                            "commit" => TreeEntryKind::Submodule,
                            _ => return None,
                        };
                        Some(TreeEntry {
                            path: entry.get("path")?.as_str()?.to_string(),
                            kind,
                            size: entry.get("size").and_then(|s| s.as_u64()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        // Directories first, then alphabetical, as the web UI lists them.
        entries.sort_by(|a, b| {
            let a_dir = a.kind == TreeEntryKind::Dir;
            let b_dir = b.kind == TreeEntryKind::Dir;
            b_dir.cmp(&a_dir).then_with(|| a.path.cmp(&b.path))
        });

        Ok(entries)
    }

    async fn list_commits(&self, id: &RepoId) -> Result<Vec<Commit>> {
        let commits = self
            .client
            .repos(&id.owner, &id.name)
            .list_commits()
            .per_page(50)
            .send()
            .await?;

        let result = commits
            .items
            .into_iter()
            .map(|c| {
                let message = c.commit.message.lines().next().unwrap_or("").to_string();
                let author = c
                    .author
                    .map(|a| a.login)
                    .or_else(|| c.commit.author.as_ref().map(|a| a.name.clone()))
                    .unwrap_or_else(|| "unknown".to_string());
                let date = c
                    .commit
                    .author
                    .and_then(|a| a.date)
                    .unwrap_or_else(chrono::Utc::now);

                Commit {
                    sha: c.sha,
                    message,
                    author,
                    date,
                }
            })
            .collect();

        Ok(result)
    }

    async fn list_issues(&self, id: &RepoId) -> Result<Vec<Issue>> {
        let issues = self
            .client
            .issues(&id.owner, &id.name)
            .list()
            .state(octocrab::params::State::Open)
            .sort(octocrab::params::issues::Sort::Updated)
            .direction(octocrab::params::Direction::Descending)
            .per_page(50)
            .send()
            .await?;

        let result = issues
            .items
            .into_iter()
            .filter(|i| i.pull_request.is_none()) // Filter out PRs
            .map(|issue| Issue {
                number: issue.number,
                title: issue.title,
                state: match issue.state {
                    OctoIssueState::Closed => IssueState::Closed,
                    _ => IssueState::Open,
                },
                author: issue.user.login,
                labels: issue.labels.into_iter().map(|l| l.name).collect(),
                comments: issue.comments,
                updated_at: issue.updated_at,
            })
            .collect();

        Ok(result)
    }
}
