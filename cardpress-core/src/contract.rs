#![allow(unused)]

//! # contract: collaborator interfaces consumed by the deployment pipeline
//!
//! The pipeline never talks to a database, a template engine, the photo upload
//! area, or git directly. It goes through the traits below, so the CLI can wire
//! file-backed implementations while tests plug in `mockall` mocks.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall` (`MockRecordSource`,
//!   `MockSettingsStore`, `MockTemplateRenderer`, `MockPhotoStore`,
//!   `MockPublisher`) when built with the default `test-export-mocks` feature.
//!
//! ## Error Handling
//! - Store-like contracts return [`BoxError`]; the pipeline maps them into
//!   [`crate::error::DeployError`] with the phase attached.
//! - The publisher returns a [`PublishError`] that already names its phase and
//!   never contains the access token.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;

use mockall::{automock, predicate::*};

use crate::error::{BoxError, PublishError, RenderError};
use crate::record::UserRecord;

/// Secret credential injected into the remote URL at push time.
///
/// No `Display` impl. `Debug` prints `AccessToken(***)`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for the publisher and the probe only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Remote to publish to, only constructed from a configured [`crate::settings::DeploymentConfig`].
#[derive(Debug, Clone)]
pub struct PublishTarget {
    pub repository_url: String,
    pub access_token: AccessToken,
}

/// What a successful publish produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub commit: String,
    pub branch: String,
}

/// Supplies the records to publish.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All records, ordered by `employee_id` ascending.
    async fn list_all_records(&self) -> Result<Vec<UserRecord>, BoxError>;
}

/// Key/value settings (GitHub configuration, deployment toggle, last deployment time).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError>;

    /// Insert or overwrite a single value.
    async fn set(&self, key: &str, value: &str) -> Result<(), BoxError>;

    /// Apply several values as one ordered write.
    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), BoxError>;
}

/// Renders a named template against a JSON context. Must be side-effect free.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait TemplateRenderer: Send + Sync {
    fn render(
        &self,
        template_name: &str,
        context: &serde_json::Value,
    ) -> Result<String, RenderError>;
}

/// Read access to uploaded photos.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait PhotoStore: Send + Sync {
    /// `Ok(None)` when no such photo exists. Any other failure is an error.
    fn read(&self, file_name: &str) -> Result<Option<Vec<u8>>, std::io::Error>;
}

/// Publishes a staged directory to a remote repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        staging_dir: &Path,
        target: &PublishTarget,
        commit_message: &str,
    ) -> Result<PublishReceipt, PublishError>;
}
