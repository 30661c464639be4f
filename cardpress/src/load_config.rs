/// `load_config` module: reads the YAML deployment config and turns it into the
/// paths and [`SiteConfig`] the CLI wires into the pipeline.
///
/// # Responsibilities
/// - Parse the user-supplied YAML into typed structs
/// - Resolve every relative path against the directory holding the config file,
///   so the CLI behaves the same from any working directory
/// - Fail with a readable message naming the file on any read or parse error
///
/// Secrets never live in this file. The access token is stored through
/// `cardpress configure` in the settings file.
use anyhow::Result;
use cardpress_core::config::SiteConfig;
use cardpress_core::publish::GITHUB_API_BASE;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// YAML list of user records.
    pub records: PathBuf,
    /// JSON settings document (GitHub config, toggle, last deployment).
    pub settings: PathBuf,
    pub site: SiteConfig,
    #[serde(default)]
    pub github: GithubSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubSection {
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    GITHUB_API_BASE.to_string()
}

impl CliConfig {
    fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.records = resolve(self.records);
        self.settings = resolve(self.settings);
        self.site.staging_dir = resolve(self.site.staging_dir);
        self.site.template_dir = self.site.template_dir.map(resolve);
        self.site.photo_dir = self.site.photo_dir.map(resolve);
        self.site.logo_path = self.site.logo_path.map(resolve);
        self
    }
}

/// Loads the YAML config at `path` with relative paths resolved against its directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let base = path_ref
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let config = raw.resolve_paths(base);
    config.site.trace_loaded();
    Ok(config)
}
