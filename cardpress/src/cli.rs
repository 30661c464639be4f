///
/// This module implements the CLI interface for cardpress: command parsing,
/// wiring of the file-backed collaborators, and printing of reports.
///
/// All pipeline logic lives in the [`cardpress-core`] crate. This module is
/// strictly glue.
///
/// ## Output
/// - Every command prints its report as pretty JSON on stdout, except
///   `render`, which prints the page or vCard itself.
/// - Logs go to stderr (see `main.rs`), so stdout stays machine-readable.
/// - Failures surface as `anyhow` errors and a non-zero exit code.
///
/// [`cardpress-core`]: ../../cardpress-core/
use crate::load_config::{load_config, CliConfig};
use anyhow::{anyhow, Result};
use cardpress_core::contract::{PhotoStore, RecordSource};
use cardpress_core::deploy::{self, Deployment};
use cardpress_core::publish::{GitHubProbe, GitPublisher};
use cardpress_core::render::FsTemplateRenderer;
use cardpress_core::settings::{
    configure_github, deployment_config, deployment_status, reset_github,
};
use cardpress_core::site::SiteBuilder;
use cardpress_core::store::{DirPhotoStore, JsonSettingsStore, YamlRecordSource};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

/// CLI for cardpress: build digital business card sites and publish them to GitHub.
#[derive(Parser)]
#[clap(
    name = "cardpress",
    version,
    about = "Build digital business card pages and vCards and force-push them to GitHub"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the site and force-push it to the configured repository
    Deploy {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Show what a deployment would publish, without writing anything
    Preview {
        #[clap(long)]
        config: PathBuf,
    },
    /// Show the stored deployment configuration and last deployment time
    Status {
        #[clap(long)]
        config: PathBuf,
    },
    /// Check that the repository exists and the token may push to it
    TestConnection {
        #[clap(long)]
        config: PathBuf,
    },
    /// Store the GitHub repository URL and access token, enabling deployment
    Configure {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        repository_url: String,
        #[clap(long, env = "CARDPRESS_GITHUB_TOKEN", hide_env_values = true)]
        access_token: String,
    },
    /// Clear the stored repository URL and token and disable deployment
    Reset {
        #[clap(long)]
        config: PathBuf,
    },
    /// Print one record's card page, or its vCard, without staging anything
    Render {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        employee_id: String,
        /// Print the vCard instead of the HTML page
        #[clap(long)]
        vcard: bool,
    },
}

#[derive(Serialize)]
struct ResetReport {
    success: bool,
    message: &'static str,
}

#[derive(Serialize)]
struct ConfigureReport<'a> {
    success: bool,
    repository_url: &'a str,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Async CLI entrypoint used by `main()` and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Deploy { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "deploy", "Starting deployment");
            run_deploy(&config).await
        }
        Commands::Preview { config } => {
            let config = load_config(config)?;
            let records = YamlRecordSource::new(&config.records);
            let preview = deploy::preview(&records, &config.site).await?;
            print_json(&preview)
        }
        Commands::Status { config } => {
            let config = load_config(config)?;
            let settings = JsonSettingsStore::new(&config.settings);
            let status = deployment_status(&settings).await?;
            print_json(&status)
        }
        Commands::TestConnection { config } => {
            let config = load_config(config)?;
            let settings = JsonSettingsStore::new(&config.settings);
            let target = deployment_config(&settings).await?.target().ok_or_else(|| {
                anyhow!("GitHub repository URL and access token must be configured")
            })?;
            let report = GitHubProbe::new(config.github.api_base.clone())
                .probe(&target)
                .await;
            print_json(&report)?;
            if report.success {
                Ok(())
            } else {
                Err(anyhow!("GitHub connection test failed: {}", report.details))
            }
        }
        Commands::Configure {
            config,
            repository_url,
            access_token,
        } => {
            let config = load_config(config)?;
            let settings = JsonSettingsStore::new(&config.settings);
            configure_github(&settings, &repository_url, &access_token).await?;
            print_json(&ConfigureReport {
                success: true,
                repository_url: repository_url.trim(),
            })
        }
        Commands::Reset { config } => {
            let config = load_config(config)?;
            let settings = JsonSettingsStore::new(&config.settings);
            reset_github(&settings).await?;
            print_json(&ResetReport {
                success: true,
                message: "GitHub configuration reset successfully",
            })
        }
        Commands::Render {
            config,
            employee_id,
            vcard,
        } => {
            let config = load_config(config)?;
            run_render(&config, &employee_id, vcard).await
        }
    }
}

async fn run_render(config: &CliConfig, employee_id: &str, vcard: bool) -> Result<()> {
    let wanted = employee_id.trim().to_uppercase();
    let records = YamlRecordSource::new(&config.records)
        .list_all_records()
        .await
        .map_err(|e| anyhow!("Failed to load user records: {e}"))?;
    let record = records
        .iter()
        .find(|r| r.employee_id == wanted)
        .ok_or_else(|| anyhow!("No user with employee_id {wanted}"))?;

    let renderer = FsTemplateRenderer::new(config.site.template_dir.clone());
    let photo_store = config.site.photo_dir.clone().map(DirPhotoStore::new);
    let builder = SiteBuilder::new(
        &config.site,
        &renderer,
        photo_store.as_ref().map(|p| p as &dyn PhotoStore),
    );
    let artifact = builder.render_single(record)?;
    tracing::info!(command = "render", employee_id = %record.employee_id, vcard, "Rendered card");
    if vcard {
        print!("{}", artifact.vcard);
    } else {
        println!("{}", artifact.html);
    }
    Ok(())
}

async fn run_deploy(config: &CliConfig) -> Result<()> {
    let records = YamlRecordSource::new(&config.records);
    let settings = JsonSettingsStore::new(&config.settings);
    let renderer = FsTemplateRenderer::new(config.site.template_dir.clone());
    let photo_store = config.site.photo_dir.clone().map(DirPhotoStore::new);
    let publisher = GitPublisher::new();

    let deployment = Deployment {
        records: &records,
        settings: &settings,
        renderer: &renderer,
        photos: photo_store.as_ref().map(|p| p as &dyn PhotoStore),
        publisher: &publisher,
        site: &config.site,
    };
    match deployment.run().await {
        Ok(outcome) => {
            tracing::info!(
                command = "deploy",
                total_users = outcome.summary.total_users,
                files_generated = outcome.summary.files_generated,
                "Deployment complete"
            );
            print_json(&outcome)
        }
        Err(e) => {
            tracing::error!(
                command = "deploy",
                phase = %e.phase(),
                error = %e,
                "Deployment failed"
            );
            Err(e.into())
        }
    }
}
