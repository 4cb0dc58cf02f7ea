//! IAM policy checks and idempotent grants.
//!
//! Every mutation follows the same order: wait for the resource, read its
//! policy, and add a binding only when the member does not already hold the
//! role. Re-running a deployment therefore never duplicates a grant.

use runver_core::names;
use serde::Deserialize;

use crate::client::{DeployError, GcloudClient, args};
use crate::executor::GcloudExecutor;
use crate::gcloud::GcloudError;
use crate::readiness::{ReadinessError, ResourceKind};

/// Member that makes a Cloud Run service public.
pub const PUBLIC_MEMBER: &str = "allUsers";
pub const INVOKER_ROLE: &str = "roles/run.invoker";

/// Roles the deploying user needs to impersonate the build identity.
pub const USER_REQUIRED_ROLES: &[&str] = &[
    "roles/iam.serviceAccountUser",
    "roles/iam.serviceAccountTokenCreator",
];

/// Roles the Compute Engine default service account needs to run the build.
pub const CLOUD_BUILD_REQUIRED_ROLES: &[&str] = &[
    "roles/iam.serviceAccountUser",
    "roles/iam.securityAdmin",
    "roles/run.admin",
    "roles/run.developer",
    "roles/run.invoker",
    "roles/cloudbuild.builds.builder",
    "roles/iam.serviceAccountAdmin",
];

pub const PERMISSIONS_GUIDANCE: &str = "Please run the setup script from the project README:\n\
     $ bash ./scripts/setup-gcloud-permissions.sh";

// ── Policy model ──

/// The parts of an IAM policy document runver reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IamPolicy {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl IamPolicy {
    /// True iff a binding for exactly `role` lists `member`.
    pub fn has_binding(&self, member: &str, role: &str) -> bool {
        self.bindings
            .iter()
            .any(|b| b.role == role && b.members.iter().any(|m| m == member))
    }
}

/// A resource carrying an IAM policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IamResource<'a> {
    Project {
        project_id: &'a str,
    },
    CloudRunService {
        name: &'a str,
        project_id: &'a str,
        region: &'a str,
    },
}

impl IamResource<'_> {
    fn policy_command(&self) -> Vec<String> {
        match *self {
            Self::Project { project_id } => {
                args(["projects", "get-iam-policy", project_id, "--format", "json"])
            }
            Self::CloudRunService {
                name,
                project_id,
                region,
            } => args([
                "run",
                "services",
                "get-iam-policy",
                name,
                "--region",
                region,
                "--project",
                project_id,
                "--format",
                "json",
            ]),
        }
    }

    fn add_binding_command(&self, member: &str, role: &str) -> Vec<String> {
        match *self {
            Self::Project { project_id } => args([
                "projects",
                "add-iam-policy-binding",
                project_id,
                "--member",
                member,
                "--role",
                role,
                "--quiet",
            ]),
            Self::CloudRunService {
                name,
                project_id,
                region,
            } => args([
                "run",
                "services",
                "add-iam-policy-binding",
                name,
                "--member",
                member,
                "--role",
                role,
                "--region",
                region,
                "--project",
                project_id,
                "--quiet",
            ]),
        }
    }
}

impl std::fmt::Display for IamResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project { project_id } => write!(f, "project {project_id}"),
            Self::CloudRunService { name, .. } => write!(f, "service {name}"),
        }
    }
}

/// Outcome of an idempotent grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Granted,
    AlreadyGranted,
}

/// Fail with [`IamError::MissingRoles`] listing every role in
/// `required_roles` that `member` does not hold in `policy`.
pub fn validate_permissions(
    policy: &IamPolicy,
    member: &str,
    display_name: &str,
    required_roles: &[&str],
) -> Result<(), IamError> {
    tracing::debug!(member, "validating {display_name} permissions");

    let missing: Vec<String> = required_roles
        .iter()
        .filter(|role| !policy.has_binding(member, role))
        .map(|role| (*role).to_owned())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(IamError::MissingRoles {
            display_name: display_name.to_owned(),
            member: member.to_owned(),
            roles: missing,
        })
    }
}

// ── Client operations ──

impl<E: GcloudExecutor> GcloudClient<E> {
    pub async fn iam_policy(&self, resource: IamResource<'_>) -> Result<IamPolicy, IamError> {
        let output = self
            .executor
            .exec(&resource.policy_command())
            .await
            .map_err(|e| IamError::Policy {
                resource: resource.to_string(),
                source: e,
            })?;

        if output.is_empty() {
            return Ok(IamPolicy::default());
        }
        serde_json::from_str(&output).map_err(|e| IamError::PolicyParse {
            resource: resource.to_string(),
            source: e,
        })
    }

    /// Whether `member` holds `role` on `resource`.
    ///
    /// A resource gcloud reports as `NOT_FOUND` has no bindings yet.
    pub async fn has_binding(
        &self,
        resource: IamResource<'_>,
        member: &str,
        role: &str,
    ) -> Result<bool, IamError> {
        match self.iam_policy(resource).await {
            Ok(policy) => Ok(policy.has_binding(member, role)),
            Err(IamError::Policy { source, .. }) if source.is_not_found() => {
                tracing::debug!(%resource, "no policy yet");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Add `member`/`role` to `resource` unless it is already bound.
    pub async fn ensure_binding(
        &self,
        resource: IamResource<'_>,
        member: &str,
        role: &str,
    ) -> Result<Grant, IamError> {
        if self.has_binding(resource, member, role).await? {
            tracing::debug!(%resource, member, role, "role already granted");
            return Ok(Grant::AlreadyGranted);
        }

        self.executor
            .exec(&resource.add_binding_command(member, role))
            .await
            .map_err(|e| IamError::AddBinding {
                resource: resource.to_string(),
                member: member.to_owned(),
                role: role.to_owned(),
                source: e,
            })?;

        tracing::info!(%resource, member, role, "granted role");
        Ok(Grant::Granted)
    }

    pub async fn ensure_project_binding(
        &self,
        project_id: &str,
        member: &str,
        role: &str,
    ) -> Result<Grant, IamError> {
        self.ensure_binding(IamResource::Project { project_id }, member, role)
            .await
    }

    /// Make the version's Cloud Run service publicly invokable.
    ///
    /// Waits for the service to report a URL first; the binding is added only
    /// when `allUsers` does not already hold `roles/run.invoker`.
    pub async fn grant_public_access(
        &self,
        project_id: &str,
        version: &str,
        region: &str,
    ) -> Result<Grant, IamError> {
        for (field, value) in [
            ("projectId", project_id),
            ("version", version),
            ("region", region),
        ] {
            if value.is_empty() {
                return Err(runver_core::Error::MissingParameter { field }.into());
            }
        }

        let service = names::service_name(project_id, version)?;
        self.wait_for_ready(
            ResourceKind::Service,
            &service,
            &[("region", region), ("project", project_id)],
        )
        .await?;

        let resource = IamResource::CloudRunService {
            name: &service,
            project_id,
            region,
        };
        self.ensure_binding(resource, PUBLIC_MEMBER, INVOKER_ROLE)
            .await
    }

    /// Check that the active user and the build service account hold every
    /// role a deployment needs.
    pub async fn validate_gcloud_permissions(&self, project_id: &str) -> Result<(), IamError> {
        let project_number = self
            .get_project_number(project_id)
            .await
            .map_err(|e| IamError::Lookup { source: e })?;
        let compute_account = names::compute_service_account_email(&project_number);
        let user = self
            .current_account()
            .await
            .map_err(|e| IamError::Lookup { source: e })?;

        let policy = self.iam_policy(IamResource::Project { project_id }).await?;

        validate_permissions(
            &policy,
            &format!("user:{user}"),
            "User account",
            USER_REQUIRED_ROLES,
        )?;
        validate_permissions(
            &policy,
            &format!("serviceAccount:{compute_account}"),
            "Compute Engine service account",
            CLOUD_BUILD_REQUIRED_ROLES,
        )?;

        tracing::debug!(project = project_id, "all required permissions present");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IamError {
    #[error(transparent)]
    Params(#[from] runver_core::Error),

    #[error(transparent)]
    NotReady(#[from] ReadinessError),

    #[error(
        "{display_name} ({member}) is missing required roles:\n{}\n\n{}",
        .roles.join("\n"),
        PERMISSIONS_GUIDANCE
    )]
    MissingRoles {
        display_name: String,
        member: String,
        roles: Vec<String>,
    },

    #[error(
        "failed to validate Google Cloud permissions; ensure you are logged in \
         (`gcloud auth login`)\n\n{}",
        PERMISSIONS_GUIDANCE
    )]
    Lookup { source: DeployError },

    #[error("failed to read IAM policy of {resource}")]
    Policy {
        resource: String,
        source: GcloudError,
    },

    #[error("IAM policy of {resource} is not valid JSON")]
    PolicyParse {
        resource: String,
        source: serde_json::Error,
    },

    #[error("failed to grant {role} to {member} on {resource}")]
    AddBinding {
        resource: String,
        member: String,
        role: String,
        source: GcloudError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(json: &str) -> IamPolicy {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn binding_requires_exact_role_and_member() {
        let p = policy(
            r#"{"bindings":[{"role":"roles/run.invoker","members":["allUsers"]},
                            {"role":"roles/run.admin","members":["user:a@example.com"]}]}"#,
        );
        assert!(p.has_binding("allUsers", "roles/run.invoker"));
        assert!(!p.has_binding("allUsers", "roles/run.admin"));
        assert!(!p.has_binding("user:a@example.com", "roles/run.invoker"));
        assert!(!p.has_binding("user:a@example.com", "roles/run"));
    }

    #[test]
    fn policy_without_bindings_parses() {
        assert_eq!(policy(r#"{"etag":"BwX"}"#), IamPolicy::default());
        let p = policy(r#"{"bindings":[{"role":"roles/viewer"}]}"#);
        assert!(!p.has_binding("allUsers", "roles/viewer"));
    }

    #[test]
    fn missing_roles_lists_every_absent_role() {
        let p = policy(
            r#"{"bindings":[{"role":"roles/iam.serviceAccountUser","members":["user:dev@example.com"]}]}"#,
        );
        let err = validate_permissions(
            &p,
            "user:dev@example.com",
            "User account",
            &[
                "roles/iam.serviceAccountUser",
                "roles/iam.serviceAccountTokenCreator",
                "roles/run.admin",
            ],
        )
        .unwrap_err();

        let IamError::MissingRoles { roles, .. } = &err else {
            panic!("expected MissingRoles, got {err:?}");
        };
        assert_eq!(
            roles,
            &["roles/iam.serviceAccountTokenCreator", "roles/run.admin"]
        );

        let message = err.to_string();
        assert!(message.starts_with("User account (user:dev@example.com) is missing required roles:"));
        assert!(message.contains("roles/iam.serviceAccountTokenCreator\nroles/run.admin"));
        assert!(message.contains("setup-gcloud-permissions.sh"));
    }

    #[test]
    fn all_roles_present_passes() {
        let p = policy(
            r#"{"bindings":[{"role":"roles/a","members":["user:x"]},{"role":"roles/b","members":["user:x"]}]}"#,
        );
        validate_permissions(&p, "user:x", "User account", &["roles/a", "roles/b"]).unwrap();
    }

    #[test]
    fn resource_display() {
        let svc = IamResource::CloudRunService {
            name: "p-feature-x",
            project_id: "p",
            region: "us-central1",
        };
        assert_eq!(svc.to_string(), "service p-feature-x");
        assert_eq!(
            IamResource::Project { project_id: "p" }.to_string(),
            "project p"
        );
    }
}
