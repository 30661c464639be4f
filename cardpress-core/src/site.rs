//! Turns records into the static card site inside a [`StagingArea`].
//!
//! Per record the builder writes `<employee_id>/index.html`,
//! `<employee_id>/contact.vcf` and, when a photo exists,
//! `assets/<employee_id>-photo.jpg`. A record that fails is reported and
//! skipped; the rest of the batch carries on.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::SiteConfig;
use crate::contract::{PhotoStore, TemplateRenderer};
use crate::error::GenerationError;
use crate::outcome::RecordDetail;
use crate::record::UserRecord;
use crate::render::BUSINESS_CARD;
use crate::staging::{StagingArea, ASSETS_DIR};
use crate::vcard::{render_vcard, VCardOptions};

pub const INDEX_FILE: &str = "index.html";
pub const VCARD_FILE: &str = "contact.vcf";

/// Everything produced for one record, before it touches the disk.
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    pub employee_id: String,
    pub html: String,
    pub vcard: String,
    pub photo: Option<Vec<u8>>,
}

impl GeneratedArtifact {
    /// Staging-relative paths, in write order.
    pub fn files(&self) -> Vec<String> {
        let mut files = vec![
            format!("{}/{INDEX_FILE}", self.employee_id),
            format!("{}/{VCARD_FILE}", self.employee_id),
        ];
        if self.photo.is_some() {
            files.push(format!("{ASSETS_DIR}/{}-photo.jpg", self.employee_id));
        }
        files
    }
}

/// Result of building every record into the staging tree.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub files_generated: usize,
    pub succeeded: usize,
    pub details: Vec<RecordDetail>,
}

pub struct SiteBuilder<'a> {
    site: &'a SiteConfig,
    renderer: &'a dyn TemplateRenderer,
    photos: Option<&'a dyn PhotoStore>,
    vcard: VCardOptions,
}

impl<'a> SiteBuilder<'a> {
    pub fn new(
        site: &'a SiteConfig,
        renderer: &'a dyn TemplateRenderer,
        photos: Option<&'a dyn PhotoStore>,
    ) -> Self {
        Self {
            site,
            renderer,
            photos,
            vcard: site.vcard_options(),
        }
    }

    /// Produce HTML, vCard and photo bytes for one record. The record is
    /// validated first; its `employee_id` becomes a directory name.
    pub fn generate(
        &self,
        record: &UserRecord,
        now: DateTime<Utc>,
    ) -> Result<GeneratedArtifact, GenerationError> {
        record.validate()?;
        let photo = self.load_photo(record)?;
        let context = self.template_context(record, photo.is_some(), now);
        let html = self.renderer.render(BUSINESS_CARD, &context)?;
        let vcard = render_vcard(record, &self.vcard, now, photo.is_some());
        Ok(GeneratedArtifact {
            employee_id: record.employee_id.clone(),
            html,
            vcard,
            photo,
        })
    }

    /// One record's artifact stamped with the current time. Nothing is written.
    pub fn render_single(&self, record: &UserRecord) -> Result<GeneratedArtifact, GenerationError> {
        self.generate(record, Utc::now())
    }

    /// Build the shared assets and every record.
    pub fn build_all(
        &self,
        records: &[UserRecord],
        staging: &StagingArea,
        now: DateTime<Utc>,
    ) -> BuildReport {
        let mut report = BuildReport {
            files_generated: self.copy_shared_assets(staging),
            ..BuildReport::default()
        };

        for record in records {
            match self.build_record(record, staging, now) {
                Ok(files) => {
                    debug!(
                        employee_id = %record.employee_id,
                        files = files.len(),
                        "Generated card"
                    );
                    report.files_generated += files.len();
                    report.succeeded += 1;
                    report.details.push(RecordDetail::generated(record, files));
                }
                Err(e) => {
                    error!(
                        employee_id = %record.employee_id,
                        error = %e,
                        "Failed to generate card, skipping"
                    );
                    report.details.push(RecordDetail::failed(record, e.to_string()));
                }
            }
        }

        info!(
            records = records.len(),
            succeeded = report.succeeded,
            files = report.files_generated,
            "Site generation finished"
        );
        report
    }

    /// Generate and write one record. On a write failure the record's
    /// partial files are removed again.
    pub fn build_record(
        &self,
        record: &UserRecord,
        staging: &StagingArea,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, GenerationError> {
        let artifact = self.generate(record, now)?;
        let record_dir = staging.record_dir(&record.employee_id);
        let photo_path = staging.assets_dir().join(record.photo_asset_name());

        let written = write_artifact(&artifact, &record_dir, &photo_path);
        if written.is_err() {
            let _ = fs::remove_dir_all(&record_dir);
            let _ = fs::remove_file(&photo_path);
        }
        written?;
        Ok(artifact.files())
    }

    /// Copy the logo into `assets/`. Returns the number of files copied.
    pub fn copy_shared_assets(&self, staging: &StagingArea) -> usize {
        let Some((source, name)) = self.logo() else {
            return 0;
        };
        let target = staging.assets_dir().join(name);
        match fs::copy(source, &target) {
            Ok(_) => {
                debug!(path = %target.display(), "Copied shared logo");
                1
            }
            Err(e) => {
                warn!(error = %e, path = %source.display(), "Logo file not found, skipping");
                0
            }
        }
    }

    fn logo(&self) -> Option<(&Path, String)> {
        let path = self.site.logo_path.as_deref()?;
        let name = path.file_name()?.to_string_lossy().into_owned();
        Some((path, name))
    }

    fn load_photo(&self, record: &UserRecord) -> Result<Option<Vec<u8>>, GenerationError> {
        let Some(photo_url) = record.photo_url.as_deref() else {
            return Ok(None);
        };
        let Some(store) = self.photos else {
            warn!(employee_id = %record.employee_id, "No photo store configured, skipping photo");
            return Ok(None);
        };
        let file = photo_file_name(photo_url);
        match store.read(&file) {
            Ok(Some(bytes)) => Ok(Some(bytes)),
            Ok(None) => {
                warn!(employee_id = %record.employee_id, file = %file, "Photo not found, skipping");
                Ok(None)
            }
            Err(e) => Err(GenerationError::Photo {
                file,
                message: e.to_string(),
            }),
        }
    }

    fn template_context(&self, record: &UserRecord, has_photo: bool, now: DateTime<Utc>) -> Value {
        let photo_asset = has_photo.then(|| format!("{ASSETS_DIR}/{}", record.photo_asset_name()));
        json!({
            "user": {
                "employee_id": record.employee_id,
                "full_name": record.full_name,
                "title": record.title,
                "department": record.department,
                "unit": record.unit,
                "email": record.email,
                "phone": record.phone,
                "address": record.address,
                "linkedin_url": web_url(record.linkedin_url.as_deref()),
                "github_url": web_url(record.github_url.as_deref()),
                "photo_url": record.photo_url,
                "photo_asset": photo_asset,
                "vcard_path": format!("{}/{VCARD_FILE}", record.employee_id),
                "url_path": record.url_path(),
            },
            "logo_asset": self.logo().map(|(_, name)| name),
            "base_url": self.site.base_url(),
            "generated_at": now.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

fn write_artifact(
    artifact: &GeneratedArtifact,
    record_dir: &Path,
    photo_path: &Path,
) -> Result<(), GenerationError> {
    let write_err = |path: PathBuf| move |source| GenerationError::Write { path, source };

    fs::create_dir_all(record_dir).map_err(write_err(record_dir.to_path_buf()))?;
    let index = record_dir.join(INDEX_FILE);
    fs::write(&index, &artifact.html).map_err(write_err(index.clone()))?;
    let vcf = record_dir.join(VCARD_FILE);
    fs::write(&vcf, &artifact.vcard).map_err(write_err(vcf.clone()))?;
    if let Some(photo) = &artifact.photo {
        fs::write(photo_path, photo).map_err(write_err(photo_path.to_path_buf()))?;
    }
    Ok(())
}

/// Last path segment of a stored photo URL, e.g. `/uploads/photos/a.jpg` → `a.jpg`.
pub fn photo_file_name(photo_url: &str) -> String {
    let without_query = photo_url.split(['?', '#']).next().unwrap_or(photo_url);
    without_query
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(without_query)
        .to_string()
}

/// Only http(s) links are placed into `href` attributes.
fn web_url(url: Option<&str>) -> Option<&str> {
    url.filter(|u| {
        let lower = u.to_ascii_lowercase();
        lower.starts_with("https://") || lower.starts_with("http://")
    })
}

/// Shape returned by `preview`: what a deployment would publish.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPreview {
    pub total_users: usize,
    pub users: Vec<PreviewUser>,
    pub structure: PreviewStructure,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewUser {
    pub employee_id: String,
    pub full_name: String,
    pub url_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewStructure {
    pub assets: Vec<String>,
    pub users: BTreeMap<String, PreviewEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewEntry {
    pub name: String,
    pub files: Vec<String>,
    pub photo: Option<String>,
}

/// Describe the file tree a deployment of `records` would produce. No I/O.
pub fn preview(records: &[UserRecord], site: &SiteConfig) -> DeploymentPreview {
    let mut assets: Vec<String> = site
        .logo_path
        .as_deref()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .into_iter()
        .collect();
    let mut users = BTreeMap::new();

    for record in records {
        let photo = record.photo_url.as_ref().map(|_| record.photo_asset_name());
        if let Some(name) = &photo {
            assets.push(name.clone());
        }
        users.insert(
            record.employee_id.clone(),
            PreviewEntry {
                name: record.full_name.clone(),
                files: vec![INDEX_FILE.to_string(), VCARD_FILE.to_string()],
                photo,
            },
        );
    }

    DeploymentPreview {
        total_users: records.len(),
        users: records
            .iter()
            .map(|r| PreviewUser {
                employee_id: r.employee_id.clone(),
                full_name: r.full_name.clone(),
                url_path: r.url_path(),
            })
            .collect(),
        structure: PreviewStructure { assets, users },
    }
}
