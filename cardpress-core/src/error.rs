//! Error taxonomy for the deployment pipeline.
//!
//! Per-record failures ([`GenerationError`]) are collected into the outcome
//! report. Everything else aborts the run and surfaces as a single
//! [`DeployError`] whose [`DeployError::phase`] names the failed step.
//! No variant ever carries the access token.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployState;
use crate::outcome::RecordDetail;

/// Boxed error used by the collaborator contracts.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("configuration required: {0}")]
    Configuration(String),

    #[error("deployment functionality is disabled")]
    Disabled,

    #[error("no users found to deploy")]
    NoData,

    #[error("a deployment is already in progress (lock file {lock}, {holder})")]
    InProgress { lock: PathBuf, holder: LockHolder },

    #[error("failed to load user records: {0}")]
    RecordSource(String),

    #[error("settings store failed: {0}")]
    Settings(String),

    #[error("staging failed: {0}")]
    Staging(StagingError),

    #[error(
        "every record failed generation, refusing to publish an empty site: {}",
        failure_summary(.0)
    )]
    NothingGenerated(Vec<RecordDetail>),

    #[error("deployment failed: {0}")]
    Publish(#[from] PublishError),

    #[error("published, but recording the outcome failed: {0}")]
    Outcome(String),
}

impl DeployError {
    /// The state-machine phase in which the run failed.
    pub fn phase(&self) -> DeployState {
        match self {
            DeployError::Configuration(_) | DeployError::Disabled | DeployError::Settings(_) => {
                DeployState::ValidatingConfig
            }
            DeployError::NoData | DeployError::RecordSource(_) => DeployState::LoadingRecords,
            DeployError::InProgress { .. } | DeployError::Staging(_) => DeployState::Staging,
            DeployError::NothingGenerated(_) => DeployState::Generating,
            DeployError::Publish(_) => DeployState::Publishing,
            DeployError::Outcome(_) => DeployState::RecordingOutcome,
        }
    }
}

impl From<StagingError> for DeployError {
    fn from(e: StagingError) -> Self {
        match e {
            StagingError::Locked { path, holder } => DeployError::InProgress { lock: path, holder },
            other => DeployError::Staging(other),
        }
    }
}

/// `employee_id: error` for each failed record, `; `-separated.
fn failure_summary(details: &[RecordDetail]) -> String {
    details
        .iter()
        .filter_map(|d| match d {
            RecordDetail::Failed {
                employee_id, error, ..
            } => Some(format!("{employee_id}: {error}")),
            RecordDetail::Generated { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Pid recorded in an existing lock file, if it could be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockHolder(pub Option<u32>);

impl fmt::Display for LockHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(pid) => write!(f, "held by pid {pid}; remove the file if that process is gone"),
            None => f.write_str("holder unknown"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("staging area is locked by another deployment: {path} ({holder})")]
    Locked { path: PathBuf, holder: LockHolder },

    #[error("staging directory must name a directory: {0}")]
    InvalidRoot(PathBuf),

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StagingError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        StagingError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Step of the publish sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPhase {
    Init,
    ConfigureIdentity,
    AddRemote,
    Stage,
    Commit,
    Push,
    Inspect,
}

impl fmt::Display for PublishPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishPhase::Init => "init",
            PublishPhase::ConfigureIdentity => "configure_identity",
            PublishPhase::AddRemote => "add_remote",
            PublishPhase::Stage => "stage",
            PublishPhase::Commit => "commit",
            PublishPhase::Push => "push",
            PublishPhase::Inspect => "inspect",
        };
        f.write_str(name)
    }
}

/// A failed publish step. `message` has already been scrubbed of the token.
#[derive(Debug, Error)]
#[error("{phase} step failed: {message}")]
pub struct PublishError {
    pub phase: PublishPhase,
    pub message: String,
}

/// Why a single record could not be generated.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    InvalidRecord(#[from] RecordError),

    #[error("template rendering failed: {0}")]
    Template(#[from] RenderError),

    #[error("failed to read photo {file}: {message}")]
    Photo { file: String, message: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unclosed section '{0}'")]
    UnclosedSection(String),
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to read records file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse records file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid record {employee_id:?}: {reason}")]
    Invalid { employee_id: String, reason: String },

    #[error("duplicate employee_id {0}")]
    Duplicate(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings store failed: {0}")]
    Store(String),
}
