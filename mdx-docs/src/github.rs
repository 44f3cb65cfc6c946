//! GitHub REST v3 implementation of [`RepositoryHost`].
//!
//! One method, one HTTP call. Non-2xx answers become
//! [`HostError::Api`] carrying GitHub's own `message`; the only status given
//! a meaning of its own is 404 on the contents lookup, which means "no file".

use async_trait::async_trait;
use mdx_docs_core::contract::{FileCommit, NewPullRequest, RepositoryFile, RepositoryHost};
use mdx_docs_core::error::HostError;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::load_config::GitHubSettings;

const USER_AGENT: &str = concat!("mdx-docs/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    api_base: Url,
}

#[derive(Debug, Deserialize)]
struct RepositoryInfo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentsWrite {
    commit: GitObject,
}

#[derive(Debug, Deserialize)]
struct PullRequestInfo {
    html_url: String,
}

impl GitHubClient {
    /// `Ok(None)` when no token is configured.
    pub fn from_settings(settings: &GitHubSettings) -> Result<Option<Self>, HostError> {
        let Some(token) = settings.token.clone() else {
            return Ok(None);
        };
        let api_base = Url::parse(&settings.api_base)
            .map_err(|e| HostError::Decode(format!("invalid GitHub API URL '{}': {e}", settings.api_base)))?;
        info!(api_base = %api_base, "Initialized GitHubClient");
        Ok(Some(Self {
            http: reqwest::Client::new(),
            token,
            api_base,
        }))
    }

    /// `{api_base}/repos/{owner}/{repo}/{rest...}` with every segment escaped.
    /// `rest` entries may contain `/`, which separates further segments.
    fn repo_url(&self, owner: &str, repo: &str, rest: &[&str]) -> Result<Url, HostError> {
        repo_url(&self.api_base, owner, repo, rest)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, HostError> {
        let response = builder
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(HostError::Api {
            status: status.as_u16(),
            message: api_message(&body, status),
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, HostError> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| HostError::Decode(e.to_string()))
    }
}

fn repo_url(base: &Url, owner: &str, repo: &str, rest: &[&str]) -> Result<Url, HostError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| HostError::Decode(format!("GitHub API URL '{base}' cannot carry a path")))?
        .pop_if_empty()
        .extend(["repos", owner, repo])
        .extend(
            rest.iter()
                .flat_map(|part| part.split('/'))
                .filter(|segment| !segment.is_empty()),
        );
    Ok(url)
}

/// GitHub's `message` field, or the raw body when there is none.
fn api_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| match body.trim() {
            "" => status.canonical_reason().unwrap_or("request failed").to_string(),
            raw => raw.to_string(),
        })
}

/// Entry names of a contents listing; a single file yields its own name.
fn entry_names(listing: &Value) -> Vec<String> {
    let name = |entry: &Value| entry.get("name").and_then(Value::as_str).map(str::to_owned);
    match listing {
        Value::Array(entries) => entries.iter().filter_map(name).collect(),
        other => name(other).into_iter().collect(),
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn default_branch(&self, owner: &str, repo: &str) -> Result<String, HostError> {
        let url = self.repo_url(owner, repo, &[])?;
        let info: RepositoryInfo = self.send_json(self.request(Method::GET, url)).await?;
        debug!(owner = %owner, repo = %repo, default_branch = %info.default_branch, "Fetched repository");
        Ok(info.default_branch)
    }

    async fn branch_sha(&self, owner: &str, repo: &str, branch: &str) -> Result<String, HostError> {
        let url = self.repo_url(owner, repo, &["git", "ref", "heads", branch])?;
        let reference: GitRef = self.send_json(self.request(Method::GET, url)).await?;
        Ok(reference.object.sha)
    }

    async fn create_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), HostError> {
        let url = self.repo_url(owner, repo, &["git", "refs"])?;
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": sha });
        self.send(self.request(Method::POST, url).json(&body)).await?;
        Ok(())
    }

    async fn get_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<Option<RepositoryFile>, HostError> {
        let mut url = self.repo_url(owner, repo, &["contents", path])?;
        url.query_pairs_mut().append_pair("ref", reference);

        let listing: Value = match self.send_json(self.request(Method::GET, url)).await {
            Ok(listing) => listing,
            Err(HostError::Api { status: 404, .. }) => {
                debug!(path = %path, reference = %reference, "File does not exist yet");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if listing.is_array() {
            warn!(path = %path, "Target path is a directory, treating as absent");
            return Ok(None);
        }
        let sha = listing
            .get("sha")
            .and_then(Value::as_str)
            .ok_or_else(|| HostError::Decode("contents response has no sha".to_string()))?;
        Ok(Some(RepositoryFile {
            path: path.to_string(),
            sha: sha.to_string(),
        }))
    }

    async fn put_file(&self, commit: &FileCommit) -> Result<String, HostError> {
        let url = self.repo_url(&commit.owner, &commit.repo, &["contents", &commit.path])?;
        let mut body = json!({
            "message": commit.message,
            "content": commit.content_base64,
            "branch": commit.branch,
        });
        if let Some(sha) = &commit.sha {
            body["sha"] = json!(sha);
        }
        let written: ContentsWrite = self
            .send_json(self.request(Method::PUT, url).json(&body))
            .await?;
        Ok(written.commit.sha)
    }

    async fn create_pull_request(&self, pull: &NewPullRequest) -> Result<String, HostError> {
        let url = self.repo_url(&pull.owner, &pull.repo, &["pulls"])?;
        let body = json!({
            "title": pull.title,
            "head": pull.head,
            "base": pull.base,
            "body": pull.body,
        });
        let created: PullRequestInfo = self
            .send_json(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(created.html_url)
    }

    async fn list_directory(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<String>, HostError> {
        let url = self.repo_url(owner, repo, &["contents", path])?;
        let listing: Value = self.send_json(self.request(Method::GET, url)).await?;
        Ok(entry_names(&listing))
    }
}
