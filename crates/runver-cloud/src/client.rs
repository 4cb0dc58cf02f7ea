use std::path::Path;

use crate::executor::{GcloudExecutor, RealExecutor};
use crate::gcloud::GcloudError;
use crate::readiness::PollPolicy;

/// GCP operations client, parameterized over the executor for testability.
pub struct GcloudClient<E: GcloudExecutor = RealExecutor> {
    pub(crate) executor: E,
    pub(crate) poll: PollPolicy,
}

impl GcloudClient<RealExecutor> {
    pub fn new() -> Self {
        Self::with_executor(RealExecutor)
    }
}

impl Default for GcloudClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

/// How `gcloud builds submit` output is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildOutput {
    /// Forward build logs to the terminal.
    #[default]
    Stream,
    /// Capture build logs and return them.
    Capture,
}

impl<E: GcloudExecutor> GcloudClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor,
            poll: PollPolicy::default(),
        }
    }

    /// Override the polling policy used by readiness waits.
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    // ── Active configuration ──

    /// Project selected in the local gcloud configuration.
    pub async fn current_project(&self) -> Result<String, DeployError> {
        self.config_value("project").await
    }

    /// Account gcloud is authenticated as.
    pub async fn current_account(&self) -> Result<String, DeployError> {
        self.config_value("account").await
    }

    async fn config_value(&self, key: &'static str) -> Result<String, DeployError> {
        let output = self
            .executor
            .exec(&args(["config", "get-value", key]))
            .await
            .map_err(|e| DeployError::Query {
                what: key,
                source: e,
            })?;

        non_empty(output, key)
    }

    pub async fn get_project_number(&self, project_id: &str) -> Result<String, DeployError> {
        let output = self
            .executor
            .exec(&args([
                "projects",
                "describe",
                project_id,
                "--format",
                "value(projectNumber)",
            ]))
            .await
            .map_err(|e| DeployError::Query {
                what: "project number",
                source: e,
            })?;

        non_empty(output, "project number")
    }

    // ── Cloud Build ──

    /// Submit `cloudbuild.yaml` from `project_dir`, impersonating
    /// `service_account`.
    ///
    /// Returns the build log when `output` is [`BuildOutput::Capture`].
    pub async fn submit_build(
        &self,
        project_dir: &Path,
        project_id: &str,
        service_account: &str,
        output: BuildOutput,
    ) -> Result<Option<String>, CloudBuildError> {
        let dir = project_dir
            .to_str()
            .ok_or_else(|| CloudBuildError::InvalidPath(project_dir.to_path_buf()))?;
        let config = project_dir.join("cloudbuild.yaml");
        let config = config
            .to_str()
            .ok_or_else(|| CloudBuildError::InvalidPath(config.clone()))?;

        let cmd = args([
            "beta",
            "builds",
            "submit",
            dir,
            "--config",
            config,
            "--project",
            project_id,
            "--impersonate-service-account",
            service_account,
        ]);

        tracing::info!(project = project_id, "submitting Cloud Build");
        match output {
            BuildOutput::Stream => {
                self.executor
                    .exec_streaming(&cmd)
                    .await
                    .map_err(|e| CloudBuildError::Submit { source: e })?;
                Ok(None)
            }
            BuildOutput::Capture => {
                let log = self
                    .executor
                    .exec(&cmd)
                    .await
                    .map_err(|e| CloudBuildError::Submit { source: e })?;
                Ok(Some(log))
            }
        }
    }

    // ── Cloud Run ──

    /// URL of a deployed service as reported by Cloud Run.
    pub async fn service_url(
        &self,
        service_name: &str,
        project_id: &str,
        region: &str,
    ) -> Result<String, DeployError> {
        let output = self
            .executor
            .exec(&args([
                "run",
                "services",
                "describe",
                service_name,
                "--project",
                project_id,
                "--region",
                region,
                "--format",
                "value(status.url)",
            ]))
            .await
            .map_err(|e| DeployError::Query {
                what: "service URL",
                source: e,
            })?;

        non_empty(output, "service URL")
    }
}

// ── Helper ──

pub(crate) fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

fn non_empty(output: String, what: &'static str) -> Result<String, DeployError> {
    // unset config keys print nothing on stdout
    if output.is_empty() {
        return Err(DeployError::Empty { what });
    }
    Ok(output)
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum CloudBuildError {
    #[error("project path is not valid UTF-8: {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("cloud build submission failed")]
    Submit { source: GcloudError },
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("failed to read {what} from gcloud")]
    Query {
        what: &'static str,
        source: GcloudError,
    },

    #[error("gcloud returned no {what}")]
    Empty { what: &'static str },
}
