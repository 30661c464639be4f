use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::vcard::{VCardOptions, DEFAULT_COUNTRY, DEFAULT_NOTE};

/// Where the site is built and which shared inputs it draws from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub staging_dir: PathBuf,
    #[serde(default)]
    pub template_dir: Option<PathBuf>,
    #[serde(default)]
    pub photo_dir: Option<PathBuf>,
    #[serde(default)]
    pub logo_path: Option<PathBuf>,
    /// Public URL the site is served from. Empty means root-relative links.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_note")]
    pub vcard_note: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_note() -> String {
    DEFAULT_NOTE.to_string()
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl SiteConfig {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            template_dir: None,
            photo_dir: None,
            logo_path: None,
            base_url: String::new(),
            vcard_note: default_note(),
            country: default_country(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn vcard_options(&self) -> VCardOptions {
        VCardOptions {
            base_url: self.base_url().to_string(),
            note: self.vcard_note.clone(),
            country: self.country.clone(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            staging_dir = %self.staging_dir.display(),
            base_url = %self.base_url,
            "Loaded SiteConfig"
        );
        debug!(?self, "SiteConfig loaded (full debug)");
    }
}
