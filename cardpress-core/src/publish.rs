//! Publishing the staged site with the `git` CLI, plus the GitHub reachability probe.

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::contract::{AccessToken, PublishReceipt, PublishTarget, Publisher};
use crate::error::{PublishError, PublishPhase};

pub const BOT_NAME: &str = "Digital Business Cards Bot";
pub const BOT_EMAIL: &str = "noreply@system.local";
pub const REMOTE_NAME: &str = "origin";
pub const DEFAULT_BRANCH: &str = "main";

const REDACTED: &str = "***";

/// Splice the token into the authority of an http(s) URL:
/// `https://host/path` → `https://<token>@host/path`. Other schemes and
/// plain filesystem paths come back unchanged.
pub fn authenticated_remote_url(
    repository_url: &str,
    token: &AccessToken,
) -> Result<String, PublishError> {
    let Ok(mut url) = Url::parse(repository_url) else {
        return Ok(repository_url.to_string());
    };
    if !matches!(url.scheme(), "https" | "http") {
        return Ok(repository_url.to_string());
    }
    url.set_password(None)
        .and_then(|_| url.set_username(token.expose()))
        .map_err(|_| PublishError {
            phase: PublishPhase::AddRemote,
            message: format!("repository URL cannot carry credentials: {repository_url}"),
        })?;
    Ok(url.into())
}

/// Replace every occurrence of the token in `text`.
pub fn redact(text: &str, token: &AccessToken) -> String {
    if token.expose().is_empty() {
        return text.to_string();
    }
    text.replace(token.expose(), REDACTED)
}

pub fn commit_message(record_count: usize, timestamp: &str) -> String {
    format!("Deploy {record_count} digital business cards - {timestamp}")
}

/// Runs `git` inside the staging directory: init, bot identity, remote,
/// add, commit, force-push.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    git: String,
    branch: String,
}

impl Default for GitPublisher {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

impl GitPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn git(
        &self,
        dir: &Path,
        phase: PublishPhase,
        args: &[&str],
        token: &AccessToken,
    ) -> Result<String, PublishError> {
        debug!(phase = %phase, "Running git step");
        let output = Command::new(&self.git)
            .arg("-C")
            .arg(dir)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                error!(error = ?e, phase = %phase, "Failed to launch git process");
                PublishError {
                    phase,
                    message: format!("failed to launch git: {e}"),
                }
            })?;

        let stdout = redact(&String::from_utf8_lossy(&output.stdout), token);
        if output.status.success() {
            return Ok(stdout);
        }
        let stderr = redact(&String::from_utf8_lossy(&output.stderr), token);
        let detail = if stderr.trim().is_empty() { stdout } else { stderr };
        error!(phase = %phase, status = %output.status, stderr = %detail.trim(), "Git step failed");
        Err(PublishError {
            phase,
            message: format!("git exited with {}: {}", output.status, detail.trim()),
        })
    }
}

#[async_trait]
impl Publisher for GitPublisher {
    async fn publish(
        &self,
        staging_dir: &Path,
        target: &PublishTarget,
        commit_message: &str,
    ) -> Result<PublishReceipt, PublishError> {
        let token = &target.access_token;
        let remote = authenticated_remote_url(&target.repository_url, token)?;

        self.git(staging_dir, PublishPhase::Init, &["init", "--quiet"], token).await?;
        for (key, value) in [
            ("user.name", BOT_NAME),
            ("user.email", BOT_EMAIL),
            ("commit.gpgsign", "false"),
        ] {
            self.git(staging_dir, PublishPhase::ConfigureIdentity, &["config", key, value], token)
                .await?;
        }
        self.git(
            staging_dir,
            PublishPhase::AddRemote,
            &["remote", "add", REMOTE_NAME, remote.as_str()],
            token,
        )
        .await?;
        info!(remote = %redact(&remote, token), "Registered remote");

        self.git(staging_dir, PublishPhase::Stage, &["add", "--all", "."], token).await?;
        self.git(
            staging_dir,
            PublishPhase::Commit,
            &["commit", "--quiet", "-m", commit_message],
            token,
        )
        .await?;

        let refspec = format!("HEAD:refs/heads/{}", self.branch);
        self.git(
            staging_dir,
            PublishPhase::Push,
            &["push", "--force", "--quiet", REMOTE_NAME, refspec.as_str()],
            token,
        )
        .await?;

        let commit = self
            .git(staging_dir, PublishPhase::Inspect, &["rev-parse", "HEAD"], token)
            .await?
            .trim()
            .to_string();
        info!(commit = %commit, branch = %self.branch, "Force-pushed deployment");
        Ok(PublishReceipt {
            commit,
            branch: self.branch.clone(),
        })
    }
}

/// Result of `test-connection`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConnectionReport {
    pub success: bool,
    pub details: String,
}

impl ConnectionReport {
    fn failed(details: impl Into<String>) -> Self {
        Self {
            success: false,
            details: details.into(),
        }
    }
}

/// Checks through the GitHub REST API that the repository exists and the
/// token may push to it.
pub struct GitHubProbe {
    client: reqwest::Client,
    api_base: String,
}

pub const GITHUB_API_BASE: &str = "https://api.github.com";

impl Default for GitHubProbe {
    fn default() -> Self {
        Self::new(GITHUB_API_BASE)
    }
}

impl GitHubProbe {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// `owner/repo` from a GitHub repository URL.
    pub fn repository_slug(repository_url: &str) -> Option<(String, String)> {
        let url = Url::parse(repository_url).ok()?;
        if !url.host_str()?.contains("github.com") {
            return None;
        }
        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
        let owner = segments.next()?.to_string();
        let repo = segments.next()?.trim_end_matches(".git").to_string();
        if repo.is_empty() {
            return None;
        }
        Some((owner, repo))
    }

    pub async fn probe(&self, target: &PublishTarget) -> ConnectionReport {
        let token = &target.access_token;
        let Some((owner, repo)) = Self::repository_slug(&target.repository_url) else {
            return ConnectionReport::failed(format!(
                "not a GitHub repository URL: {}",
                target.repository_url
            ));
        };
        let url = format!("{}/repos/{owner}/{repo}", self.api_base);
        info!(url = %url, "Probing GitHub repository");

        let response = match self
            .client
            .get(&url)
            .bearer_auth(token.expose())
            .header(reqwest::header::USER_AGENT, "cardpress")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let details = redact(&format!("request to GitHub failed: {e}"), token);
                error!(details = %details, "GitHub probe failed");
                return ConnectionReport::failed(details);
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "GitHub API returned error");
            return ConnectionReport::failed(format!(
                "GitHub API returned {status} for {owner}/{repo}"
            ));
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return ConnectionReport::failed(redact(
                    &format!("unreadable GitHub API response: {e}"),
                    token,
                ))
            }
        };
        let push = body
            .get("permissions")
            .and_then(|p| p.get("push"))
            .and_then(|p| p.as_bool());
        match push {
            Some(false) => ConnectionReport::failed(format!(
                "token has no push permission on {owner}/{repo}"
            )),
            _ => ConnectionReport {
                success: true,
                details: format!("GitHub connection test passed for {owner}/{repo}"),
            },
        }
    }
}
