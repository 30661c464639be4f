//! Settings keys and the typed views the pipeline reads from a [`SettingsStore`].

use reqwest::Url;
use serde::Serialize;
use tracing::{info, warn};

use crate::contract::{AccessToken, PublishTarget, SettingsStore};
use crate::error::SettingsError;

pub const GITHUB_REPOSITORY_URL: &str = "github_repository_url";
pub const GITHUB_ACCESS_TOKEN: &str = "github_access_token";
pub const DEPLOYMENT_ENABLED: &str = "deployment_enabled";
pub const LAST_DEPLOYMENT_TIME: &str = "last_deployment_time";

/// GitHub deployment configuration as stored in settings.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub repository_url: Option<String>,
    pub access_token: Option<AccessToken>,
    pub is_configured: bool,
}

impl DeploymentConfig {
    pub fn new(repository_url: Option<String>, access_token: Option<String>) -> Self {
        let repository_url = repository_url.filter(|v| !v.trim().is_empty());
        let access_token = access_token
            .filter(|v| !v.trim().is_empty())
            .map(AccessToken::new);
        let is_configured = repository_url.is_some() && access_token.is_some();
        Self {
            repository_url,
            access_token,
            is_configured,
        }
    }

    /// The publish target, or `None` unless both URL and token are present.
    pub fn target(&self) -> Option<PublishTarget> {
        match (&self.repository_url, &self.access_token) {
            (Some(url), Some(token)) if self.is_configured => Some(PublishTarget {
                repository_url: url.clone(),
                access_token: token.clone(),
            }),
            _ => None,
        }
    }
}

/// Snapshot returned by the `status` command.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeploymentStatus {
    pub deployment_enabled: bool,
    pub github_configured: bool,
    pub repository_url: Option<String>,
    pub last_deployment: Option<String>,
}

fn store_err(e: crate::error::BoxError) -> SettingsError {
    SettingsError::Store(e.to_string())
}

pub async fn deployment_config(
    store: &dyn SettingsStore,
) -> Result<DeploymentConfig, SettingsError> {
    let repository_url = store.get(GITHUB_REPOSITORY_URL).await.map_err(store_err)?;
    let access_token = store.get(GITHUB_ACCESS_TOKEN).await.map_err(store_err)?;
    Ok(DeploymentConfig::new(repository_url, access_token))
}

/// Deployment is enabled only when the toggle holds exactly `"true"`.
pub async fn is_deployment_enabled(store: &dyn SettingsStore) -> Result<bool, SettingsError> {
    let value = store.get(DEPLOYMENT_ENABLED).await.map_err(store_err)?;
    Ok(value.as_deref() == Some("true"))
}

pub async fn deployment_status(
    store: &dyn SettingsStore,
) -> Result<DeploymentStatus, SettingsError> {
    let config = deployment_config(store).await?;
    Ok(DeploymentStatus {
        deployment_enabled: is_deployment_enabled(store).await?,
        github_configured: config.is_configured,
        repository_url: config.repository_url,
        last_deployment: store.get(LAST_DEPLOYMENT_TIME).await.map_err(store_err)?,
    })
}

/// Validate and store GitHub credentials, enabling deployment in the same batch.
pub async fn configure_github(
    store: &dyn SettingsStore,
    repository_url: &str,
    access_token: &str,
) -> Result<(), SettingsError> {
    let repository_url = repository_url.trim();
    let access_token = access_token.trim();

    if repository_url.is_empty() {
        return Err(SettingsError::Validation("Repository URL is required".into()));
    }
    let parsed = Url::parse(repository_url)
        .map_err(|_| SettingsError::Validation("Repository URL must be a valid URL".into()))?;
    if !parsed.host_str().is_some_and(|h| h.contains("github.com")) {
        return Err(SettingsError::Validation(
            "Repository URL must be a GitHub URL".into(),
        ));
    }

    if access_token.is_empty() {
        return Err(SettingsError::Validation("Access token is required".into()));
    }
    let len = access_token.chars().count();
    if !(40..=100).contains(&len) {
        warn!(len, "Rejected access token with invalid length");
        return Err(SettingsError::Validation(
            "Access token must be between 40 and 100 characters".into(),
        ));
    }
    if !access_token.starts_with("ghp_") && !access_token.starts_with("github_pat_") {
        return Err(SettingsError::Validation(
            "Access token must be a valid GitHub Personal Access Token".into(),
        ));
    }

    store
        .set_many(vec![
            (GITHUB_REPOSITORY_URL.to_string(), repository_url.to_string()),
            (GITHUB_ACCESS_TOKEN.to_string(), access_token.to_string()),
            (DEPLOYMENT_ENABLED.to_string(), "true".to_string()),
        ])
        .await
        .map_err(store_err)?;
    info!(repository_url = %repository_url, "GitHub configuration updated");
    Ok(())
}

/// Clear the stored URL and token and switch deployment off, in one batch.
pub async fn reset_github(store: &dyn SettingsStore) -> Result<(), SettingsError> {
    store
        .set_many(vec![
            (GITHUB_REPOSITORY_URL.to_string(), String::new()),
            (GITHUB_ACCESS_TOKEN.to_string(), String::new()),
            (DEPLOYMENT_ENABLED.to_string(), "false".to_string()),
        ])
        .await
        .map_err(store_err)?;
    info!("GitHub configuration reset");
    Ok(())
}
