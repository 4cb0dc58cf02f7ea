//! Per-version runtime configuration stored in Secret Manager.

use runver_core::names;
use serde_json::Value;

use crate::client::{DeployError, GcloudClient, args};
use crate::executor::GcloudExecutor;
use crate::gcloud::GcloudError;
use crate::iam::{Grant, IamError};
use crate::readiness::{ReadinessError, ResourceKind};

pub const SECRET_MANAGER_API: &str = "secretmanager.googleapis.com";
pub const SECRET_ACCESSOR_ROLE: &str = "roles/secretmanager.secretAccessor";

impl<E: GcloudExecutor> GcloudClient<E> {
    /// Enable Secret Manager and let the build service account read secrets.
    pub async fn setup_secret_manager(&self, project_id: &str) -> Result<Grant, SecretError> {
        self.executor
            .exec(&args([
                "services",
                "enable",
                SECRET_MANAGER_API,
                "--project",
                project_id,
            ]))
            .await
            .map_err(|e| SecretError::EnableApi { source: e })?;

        let project_number = self
            .get_project_number(project_id)
            .await
            .map_err(|e| SecretError::Lookup { source: e })?;
        let member = format!(
            "serviceAccount:{}",
            names::compute_service_account_email(&project_number)
        );

        let grant = self
            .ensure_project_binding(project_id, &member, SECRET_ACCESSOR_ROLE)
            .await
            .map_err(|e| SecretError::Grant { source: e })?;

        tracing::info!(project = project_id, "Secret Manager setup complete");
        Ok(grant)
    }

    /// Read and parse the JSON configuration secret of `version`.
    pub async fn get_secret_config(
        &self,
        project_id: &str,
        version: &str,
    ) -> Result<Value, SecretError> {
        let name = names::secret_name(version)?;
        tracing::debug!(secret = %name, "reading secret config");

        match self
            .wait_for_ready(ResourceKind::Secret, &name, &[("project", project_id)])
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() || e.last_error().is_none() => {
                tracing::debug!(error = %e, "secret never became readable");
                return Err(SecretError::NotFound { name });
            }
            Err(e) => return Err(SecretError::Unavailable { name, source: e }),
        }

        let secret_flag = format!("--secret={name}");
        let project_flag = format!("--project={project_id}");
        let payload = match self
            .executor
            .exec(&args([
                "secrets",
                "versions",
                "access",
                "latest",
                &secret_flag,
                &project_flag,
            ]))
            .await
        {
            Ok(payload) => payload,
            Err(e) if e.is_not_found() => return Err(SecretError::NotFound { name }),
            Err(e) => return Err(SecretError::Access { name, source: e }),
        };

        serde_json::from_str(&payload).map_err(|e| SecretError::InvalidFormat { name, source: e })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error(transparent)]
    Params(#[from] runver_core::Error),

    #[error(
        "secret {name} not found. Create it with:\n\
         gcloud secrets create {name} --replication-policy=\"automatic\"\n\
         echo '{{your-config-json}}' | gcloud secrets versions add {name} --data-file=-"
    )]
    NotFound { name: String },

    #[error("failed to check secret {name}")]
    Unavailable {
        name: String,
        source: ReadinessError,
    },

    #[error("invalid format of secret {name}: must be valid JSON")]
    InvalidFormat {
        name: String,
        source: serde_json::Error,
    },

    #[error("failed to access secret {name}")]
    Access { name: String, source: GcloudError },

    #[error("failed to enable {}", SECRET_MANAGER_API)]
    EnableApi { source: GcloudError },

    #[error("failed to look up the build service account")]
    Lookup { source: DeployError },

    #[error("failed to grant {} to the build service account", SECRET_ACCESSOR_ROLE)]
    Grant { source: IamError },
}
