//! Repository publisher: one file, one branch, one pull request.
//!
//! # Sequence
//! 1. resolve the repository's default branch
//! 2. read the tip SHA of `heads/{default}`
//! 3. create `refs/heads/{branch}` at that SHA
//! 4. look up the target path on the new branch (404 means "new file")
//! 5. write the base64-encoded content, passing the old blob SHA on update
//! 6. open the pull request `head = branch`, `base = default`
//!
//! # Error Handling
//! The first failing step aborts the sequence with a [`PublishError`] naming
//! that step. Nothing is rolled back; a branch created in step 3 stays behind.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::PublishDefaults;
use crate::contract::{
    FileCommit, NewPullRequest, PullRequestRequest, PullRequestResult, RepositoryHost,
};
use crate::error::{PublishError, PublishStep};

pub struct Publisher<H> {
    host: H,
    defaults: PublishDefaults,
}

impl<H> Publisher<H>
where
    H: RepositoryHost,
{
    pub fn new(host: H, defaults: PublishDefaults) -> Self {
        Self { host, defaults }
    }

    /// Branch name used when the request does not carry one.
    pub fn generate_branch_name(&self) -> String {
        format!("{}{}", self.defaults.branch_prefix, Utc::now().timestamp_millis())
    }

    pub async fn create_pull_request_with_content(
        &self,
        request: &PullRequestRequest,
    ) -> Result<PullRequestResult, PublishError> {
        let owner = request.owner.as_str();
        let repo = request.repo.as_str();
        let branch = request
            .branch_name
            .clone()
            .unwrap_or_else(|| self.generate_branch_name());
        info!(owner = %owner, repo = %repo, branch = %branch, path = %request.file_path, "[PUBLISH] Starting pull request workflow");

        let result = self.publish(request, &branch).await;
        if let Err(e) = &result {
            error!(owner = %owner, repo = %repo, branch = %branch, step = %e.step, error = %e.source, "[PUBLISH][ERROR] Pull request workflow aborted");
        }
        result
    }

    async fn publish(
        &self,
        request: &PullRequestRequest,
        branch: &str,
    ) -> Result<PullRequestResult, PublishError> {
        let owner = request.owner.as_str();
        let repo = request.repo.as_str();

        let base = self
            .host
            .default_branch(owner, repo)
            .await
            .map_err(PublishError::at(PublishStep::ResolveDefaultBranch))?;
        let base_sha = self
            .host
            .branch_sha(owner, repo, &base)
            .await
            .map_err(PublishError::at(PublishStep::ResolveBranchSha))?;
        info!(base = %base, sha = %base_sha, "[PUBLISH] Resolved default branch");

        self.host
            .create_branch(owner, repo, branch, &base_sha)
            .await
            .map_err(PublishError::at(PublishStep::CreateBranch))?;
        info!(branch = %branch, "[PUBLISH] Created branch");

        let existing = self
            .host
            .get_file(owner, repo, &request.file_path, branch)
            .await
            .map_err(PublishError::at(PublishStep::LookupExistingFile))?;
        if let Some(file) = &existing {
            info!(path = %file.path, sha = %file.sha, "[PUBLISH] Updating existing file");
        }

        let commit = FileCommit {
            owner: request.owner.clone(),
            repo: request.repo.clone(),
            path: request.file_path.clone(),
            message: request.commit_message.clone(),
            content_base64: STANDARD.encode(request.content.as_bytes()),
            branch: branch.to_string(),
            sha: existing.map(|f| f.sha),
        };
        let commit_sha = self
            .host
            .put_file(&commit)
            .await
            .map_err(PublishError::at(PublishStep::WriteFile))?;
        info!(commit = %commit_sha, "[PUBLISH] Committed file");

        let pull = NewPullRequest {
            owner: request.owner.clone(),
            repo: request.repo.clone(),
            title: request.pr_title.clone(),
            head: branch.to_string(),
            base,
            body: request
                .pr_description
                .clone()
                .unwrap_or_else(|| self.defaults.default_description.clone()),
        };
        let pull_request_url = self
            .host
            .create_pull_request(&pull)
            .await
            .map_err(PublishError::at(PublishStep::OpenPullRequest))?;
        info!(url = %pull_request_url, "[PUBLISH] Opened pull request");

        Ok(PullRequestResult {
            pull_request_url,
            branch_name: branch.to_string(),
            commit_sha,
        })
    }

    /// Whether the configured credentials can see `owner/repo`.
    pub async fn check_repository_access(&self, owner: &str, repo: &str) -> bool {
        match self.host.default_branch(owner, repo).await {
            Ok(_) => true,
            Err(e) => {
                warn!(owner = %owner, repo = %repo, error = %e, "Repository is not accessible");
                false
            }
        }
    }

    /// Entry names under `path`; a file path yields its own name.
    pub async fn list_repository_files(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<String>, PublishError> {
        self.host
            .list_directory(owner, repo, path)
            .await
            .map_err(|e| {
                error!(owner = %owner, repo = %repo, path = %path, error = %e, "Failed to list repository files");
                PublishError::at(PublishStep::ListFiles)(e)
            })
    }
}
