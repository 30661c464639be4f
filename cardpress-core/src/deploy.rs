//! Deployment state machine: guards, staging, generation, publish, outcome.
//!
//! ```text
//! Idle → ValidatingConfig → LoadingRecords → Staging → Generating
//!      → Publishing → RecordingOutcome → Idle
//! ```
//!
//! Any step may fall into `Error`. The guards (configuration present,
//! deployment enabled, at least one record) run before anything touches the
//! filesystem, so a rejected run leaves neither a lock file nor a staging
//! directory behind. Once staging is prepared the [`StagingArea`] guard removes
//! the tree on every exit path.

use chrono::Utc;
use std::fmt;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::SiteConfig;
use crate::contract::{PhotoStore, Publisher, RecordSource, SettingsStore, TemplateRenderer};
use crate::error::DeployError;
use crate::outcome::{format_timestamp, record_outcome, DeploymentOutcome};
use crate::publish::commit_message;
use crate::settings::{deployment_config, is_deployment_enabled};
use crate::site::{self, DeploymentPreview, SiteBuilder};
use crate::staging::StagingArea;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    Idle,
    ValidatingConfig,
    LoadingRecords,
    Staging,
    Generating,
    Publishing,
    RecordingOutcome,
    Error,
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployState::Idle => "idle",
            DeployState::ValidatingConfig => "validating_config",
            DeployState::LoadingRecords => "loading_records",
            DeployState::Staging => "staging",
            DeployState::Generating => "generating",
            DeployState::Publishing => "publishing",
            DeployState::RecordingOutcome => "recording_outcome",
            DeployState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Logs every state change of a single run.
struct Transitions {
    current: DeployState,
}

impl Transitions {
    fn new() -> Self {
        Self {
            current: DeployState::Idle,
        }
    }

    fn enter(&mut self, next: DeployState) {
        info!(from = %self.current, to = %next, "Deployment state transition");
        self.current = next;
    }

    fn fail(&mut self, e: DeployError) -> DeployError {
        error!(phase = %e.phase(), error = %e, "Deployment failed");
        self.enter(DeployState::Error);
        e
    }
}

/// The collaborators one deployment runs against.
pub struct Deployment<'a> {
    pub records: &'a dyn RecordSource,
    pub settings: &'a dyn SettingsStore,
    pub renderer: &'a dyn TemplateRenderer,
    pub photos: Option<&'a dyn PhotoStore>,
    pub publisher: &'a dyn Publisher,
    pub site: &'a SiteConfig,
}

impl<'a> Deployment<'a> {
    /// Run one full deployment inside a `deploy` span tagged with a fresh `run_id`.
    pub async fn run(&self) -> Result<DeploymentOutcome, DeployError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("deploy", run_id = %run_id);
        async {
            let mut states = Transitions::new();
            let result = self.execute(&mut states).await;
            match result {
                Ok(outcome) => {
                    states.enter(DeployState::Idle);
                    Ok(outcome)
                }
                Err(e) => Err(states.fail(e)),
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, states: &mut Transitions) -> Result<DeploymentOutcome, DeployError> {
        states.enter(DeployState::ValidatingConfig);
        let config = deployment_config(self.settings)
            .await
            .map_err(|e| DeployError::Settings(e.to_string()))?;
        let Some(target) = config.target() else {
            return Err(DeployError::Configuration(
                "GitHub repository URL and access token must be configured".into(),
            ));
        };
        let enabled = is_deployment_enabled(self.settings)
            .await
            .map_err(|e| DeployError::Settings(e.to_string()))?;
        if !enabled {
            return Err(DeployError::Disabled);
        }

        states.enter(DeployState::LoadingRecords);
        let records = self
            .records
            .list_all_records()
            .await
            .map_err(|e| DeployError::RecordSource(e.to_string()))?;
        if records.is_empty() {
            return Err(DeployError::NoData);
        }
        info!(records = records.len(), "Loaded records");

        states.enter(DeployState::Staging);
        let staging = StagingArea::prepare(&self.site.staging_dir)?;

        states.enter(DeployState::Generating);
        let generated_at = Utc::now();
        let builder = SiteBuilder::new(self.site, self.renderer, self.photos);
        let report = builder.build_all(&records, &staging, generated_at);
        if report.succeeded == 0 {
            return Err(DeployError::NothingGenerated(report.details));
        }
        if report.succeeded < records.len() {
            warn!(
                failed = records.len() - report.succeeded,
                "Some records failed generation and are left out of this deployment"
            );
        }

        states.enter(DeployState::Publishing);
        let message = commit_message(records.len(), &format_timestamp(generated_at));
        let receipt = self.publisher.publish(staging.root(), &target, &message).await?;
        info!(commit = %receipt.commit, branch = %receipt.branch, "Published site");

        states.enter(DeployState::RecordingOutcome);
        let outcome = record_outcome(
            self.settings,
            records.len(),
            report.files_generated,
            report.details,
            Utc::now(),
        )
        .await
        .map_err(|e| DeployError::Outcome(e.to_string()))?;

        if let Err(e) = staging.cleanup() {
            warn!(error = %e, "Failed to clean up staging area after deployment");
        }
        Ok(outcome)
    }
}

/// What a deployment of the current records would produce, without writing anything.
pub async fn preview(
    records: &dyn RecordSource,
    site: &SiteConfig,
) -> Result<DeploymentPreview, DeployError> {
    let records = records
        .list_all_records()
        .await
        .map_err(|e| DeployError::RecordSource(e.to_string()))?;
    info!(records = records.len(), "Built deployment preview");
    Ok(site::preview(&records, site))
}
