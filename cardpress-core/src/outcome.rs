//! Deployment report and the persisted "last deployment" marker.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::contract::SettingsStore;
use crate::error::BoxError;
use crate::record::UserRecord;
use crate::settings::LAST_DEPLOYMENT_TIME;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeploymentSummary {
    pub total_users: usize,
    pub files_generated: usize,
    pub deployment_time: String,
}

/// Per-record line of the report.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RecordDetail {
    Generated {
        employee_id: String,
        full_name: String,
        files: Vec<String>,
        url: String,
    },
    Failed {
        employee_id: String,
        full_name: String,
        error: String,
    },
}

impl RecordDetail {
    pub fn generated(record: &UserRecord, files: Vec<String>) -> Self {
        RecordDetail::Generated {
            employee_id: record.employee_id.clone(),
            full_name: record.full_name.clone(),
            files,
            url: record.url_path(),
        }
    }

    pub fn failed(record: &UserRecord, error: String) -> Self {
        RecordDetail::Failed {
            employee_id: record.employee_id.clone(),
            full_name: record.full_name.clone(),
            error,
        }
    }

    pub fn employee_id(&self) -> &str {
        match self {
            RecordDetail::Generated { employee_id, .. }
            | RecordDetail::Failed { employee_id, .. } => employee_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RecordDetail::Generated { .. })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeploymentOutcome {
    pub summary: DeploymentSummary,
    pub details: Vec<RecordDetail>,
}

impl DeploymentOutcome {
    pub fn successes(&self) -> impl Iterator<Item = &RecordDetail> {
        self.details.iter().filter(|d| d.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordDetail> {
        self.details.iter().filter(|d| !d.is_success())
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Persist `last_deployment_time` (overwriting any previous value) and
/// assemble the report.
pub async fn record_outcome(
    settings: &dyn SettingsStore,
    total_users: usize,
    files_generated: usize,
    details: Vec<RecordDetail>,
    finished_at: DateTime<Utc>,
) -> Result<DeploymentOutcome, BoxError> {
    let deployment_time = format_timestamp(finished_at);
    if let Err(e) = settings.set(LAST_DEPLOYMENT_TIME, &deployment_time).await {
        error!(error = %e, "Failed to persist last deployment time");
        return Err(e);
    }
    info!(deployment_time = %deployment_time, "Recorded deployment time");

    Ok(DeploymentOutcome {
        summary: DeploymentSummary {
            total_users,
            files_generated,
            deployment_time,
        },
        details,
    })
}
