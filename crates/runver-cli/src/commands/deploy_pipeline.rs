use anyhow::Context;
use runver_build::workspace::{prepare_workspace, write_deployment_files};
use runver_build::{ProjectTemplates, generate_deployment_files};
use runver_cloud::{BuildOutput, GcloudClient, GcloudExecutor};
use runver_core::names::{self, ResourceNames};
use runver_core::{DeployConfig, HookContext, RunverConfig};
use std::path::{Path, PathBuf};

/// Result of a successful deploy pipeline run.
#[derive(Debug)]
pub(crate) struct DeployOutcome {
    pub version: String,
    pub url: String,
    /// Artifacts written to the project root.
    pub files: Vec<PathBuf>,
}

/// Run the full deploy pipeline against the local gcloud CLI.
pub(crate) async fn run(project_dir: &Path, raw_version: &str) -> anyhow::Result<DeployOutcome> {
    run_with(&GcloudClient::new(), project_dir, raw_version).await
}

/// names → permissions → hooks → artifacts → build → public access → URL.
///
/// The version is validated before anything touches gcloud or the disk, and
/// `validate_environment` runs before any artifact is written.
pub(crate) async fn run_with<E: GcloudExecutor>(
    client: &GcloudClient<E>,
    project_dir: &Path,
    raw_version: &str,
) -> anyhow::Result<DeployOutcome> {
    let version = names::sanitize_version(raw_version)?;
    if version != raw_version {
        tracing::info!("version {raw_version:?} sanitized to {version:?}");
    }

    // Load configuration
    let file = RunverConfig::load(project_dir)?;

    let project_id = match file.project.gcp_project_id.clone() {
        Some(id) => id,
        None => client.current_project().await.context(
            "gcp_project_id not set in runver.toml and no active gcloud project; \
             set [project].gcp_project_id or run `gcloud config set project <id>`",
        )?,
    };

    let resources = ResourceNames::resolve(
        &project_id,
        &version,
        &file.project.region,
        &file.project.repository,
    )?;
    tracing::info!(
        service = %resources.service_name,
        image = %resources.image_path,
        "deploying version {version}"
    );

    // Permissions
    client.validate_gcloud_permissions(&project_id).await?;
    tracing::info!("permissions validated");

    let ctx = HookContext::new(
        &project_id,
        &resources.version,
        &file.project.region,
        &file.project.repository,
    );

    let secret_config = if file.hooks.runtime_config.env_from_secret {
        let grant = client.setup_secret_manager(&project_id).await?;
        tracing::debug!(?grant, "secret accessor ensured");
        Some(client.get_secret_config(&project_id, &version).await?)
    } else {
        None
    };
    let hooks = super::hooks::bind(&file.hooks, &ctx, secret_config)?;
    let config = DeployConfig::new(file.project, hooks);

    if let Some(validate) = &config.hooks.validate_environment {
        validate(&ctx)
            .await
            .context("validate_environment hook failed")?;
        tracing::info!("environment validated");
    }

    // Artifacts
    prepare_workspace(project_dir)?;
    let templates = ProjectTemplates::new(project_dir);
    let generated = generate_deployment_files(&templates, &config.hooks, &ctx).await?;
    let files = write_deployment_files(project_dir, &generated)?;
    tracing::info!(count = files.len(), "deployment files written");

    // Build and deploy
    let project_number = client.get_project_number(&project_id).await?;
    let build_account = names::compute_service_account_email(&project_number);
    client
        .submit_build(project_dir, &project_id, &build_account, BuildOutput::Stream)
        .await?;
    tracing::info!("Cloud Build completed");

    let grant = client
        .grant_public_access(&project_id, &version, &config.region)
        .await?;
    tracing::info!(?grant, "public access ensured");

    let url = client
        .service_url(&resources.service_name, &project_id, &config.region)
        .await?;

    if let Some(post_deploy) = &config.hooks.post_deploy {
        post_deploy(&version, &url)
            .await
            .context("post_deploy hook failed")?;
    }

    Ok(DeployOutcome {
        version,
        url,
        files,
    })
}
