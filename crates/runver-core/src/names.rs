//! Cloud resource naming derived from a deployment version.
//!
//! Every name is a pure projection of `(project id, version, region,
//! repository)`. Nothing here is cached: callers recompute names whenever they
//! need them, so a name can never drift from the inputs it was built from.
//!
//! | Resource | Shape | Limit |
//! |---|---|---|
//! | version | `[a-z][a-z0-9-]*` | 1–20 chars |
//! | project ID | as given | ≤ 30 chars |
//! | Cloud Run service | `{project}-{version}` | ≤ 63 chars |
//! | service account ID | `{version}-sa` | 6–30 chars |

use crate::{Error, Result};

pub const MAX_VERSION_LEN: usize = 20;
pub const MAX_PROJECT_ID_LEN: usize = 30;
pub const MAX_SERVICE_NAME_LEN: usize = 63;
pub const MIN_SERVICE_ACCOUNT_ID_LEN: usize = 6;
pub const MAX_SERVICE_ACCOUNT_ID_LEN: usize = 30;

/// Domain suffix of Cloud Run service URLs.
pub const RUN_APP_DOMAIN: &str = "run.app";

/// Normalize a raw version (usually a branch name) to the Cloud Run naming rules.
///
/// ASCII letters are lowercased and every character outside `[a-z0-9-]` becomes
/// a hyphen.
///
/// # Examples
///
/// ```
/// use runver_core::names::sanitize_version;
///
/// assert_eq!(sanitize_version("Feature_Branch.1").unwrap(), "feature-branch-1");
/// assert!(sanitize_version("1-feature").is_err());
/// ```
///
/// # Errors
///
/// [`Error::InvalidVersion`] if `raw` is empty, or the sanitized form does not
/// start with a letter or is longer than [`MAX_VERSION_LEN`].
pub fn sanitize_version(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(invalid_version(raw, "version name is required"));
    }

    let sanitized: String = raw
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '-') => c,
            _ => '-',
        })
        .collect();

    if !sanitized.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(invalid_version(raw, "version name must start with a letter"));
    }

    let len = sanitized.chars().count();
    if !(1..=MAX_VERSION_LEN).contains(&len) {
        return Err(invalid_version(
            raw,
            "version name must be between 1 and 20 characters",
        ));
    }

    Ok(sanitized)
}

fn invalid_version(raw: &str, reason: &'static str) -> Error {
    Error::InvalidVersion {
        version: raw.to_owned(),
        reason,
    }
}

/// Cloud Run service name: `{project_id}-{sanitized version}`.
///
/// The 30-character project ID ceiling is checked before, and independently
/// of, the 63-character ceiling on the combined name.
pub fn service_name(project_id: &str, version: &str) -> Result<String> {
    if project_id.is_empty() {
        return Err(Error::MissingParameter {
            field: "projectId",
        });
    }

    let project_len = project_id.chars().count();
    if project_len > MAX_PROJECT_ID_LEN {
        return Err(Error::InvalidProjectId {
            project_id: project_id.to_owned(),
            len: project_len,
            max: MAX_PROJECT_ID_LEN,
        });
    }

    let version = sanitize_version(version)?;
    let name = format!("{project_id}-{version}");
    let len = name.chars().count();

    // Unreachable with today's limits (30 + 1 + 20 < 63); kept as a ceiling
    // in case the project or version limits are raised.
    if len > MAX_SERVICE_NAME_LEN {
        return Err(Error::NameTooLong {
            name,
            len,
            max: MAX_SERVICE_NAME_LEN,
            project_len,
            version_len: version.len(),
        });
    }

    Ok(name)
}

/// Per-version service account ID: `{sanitized version}-sa`.
pub fn service_account_id(version: &str) -> Result<String> {
    let id = format!("{}-sa", sanitize_version(version)?);
    let len = id.len();

    if !(MIN_SERVICE_ACCOUNT_ID_LEN..=MAX_SERVICE_ACCOUNT_ID_LEN).contains(&len) {
        return Err(Error::InvalidServiceAccountId {
            id,
            len,
            min: MIN_SERVICE_ACCOUNT_ID_LEN,
            max: MAX_SERVICE_ACCOUNT_ID_LEN,
        });
    }

    Ok(id)
}

pub fn service_account_email(project_id: &str, version: &str) -> Result<String> {
    let id = service_account_id(version)?;
    Ok(format!("{id}@{project_id}.iam.gserviceaccount.com"))
}

/// Artifact Registry image path for the version.
pub fn image_path(project_id: &str, version: &str, region: &str, repository: &str) -> Result<String> {
    let version = sanitize_version(version)?;
    Ok(format!(
        "{region}-docker.pkg.dev/{project_id}/{repository}/{version}"
    ))
}

pub fn service_url(project_id: &str, version: &str, region: &str) -> Result<String> {
    let service = service_name(project_id, version)?;
    Ok(format!("https://{service}-{region}.{RUN_APP_DOMAIN}"))
}

/// Default compute service account, used to run and impersonate Cloud Build.
pub fn compute_service_account_email(project_number: &str) -> String {
    format!("{project_number}-compute@developer.gserviceaccount.com")
}

/// Secret Manager secret holding the per-version application config.
pub fn secret_name(version: &str) -> Result<String> {
    let version = sanitize_version(version)?;
    Ok(format!("APP_CONFIG_{}", version.to_ascii_uppercase()))
}

/// Every derived resource name for one deployment, validated together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub version: String,
    pub service_name: String,
    pub image_path: String,
    pub service_account: String,
    pub service_url: String,
}

impl ResourceNames {
    /// Validate all inputs and derive every resource name.
    ///
    /// # Errors
    ///
    /// [`Error::MissingParameter`] for the first empty input, otherwise any
    /// naming error from the individual projections.
    pub fn resolve(
        project_id: &str,
        version: &str,
        region: &str,
        repository: &str,
    ) -> Result<Self> {
        for (field, value) in [
            ("projectId", project_id),
            ("version", version),
            ("region", region),
            ("repository", repository),
        ] {
            if value.is_empty() {
                return Err(Error::MissingParameter { field });
            }
        }

        Ok(Self {
            version: sanitize_version(version)?,
            service_name: service_name(project_id, version)?,
            image_path: image_path(project_id, version, region, repository)?,
            service_account: service_account_email(project_id, version)?,
            service_url: service_url(project_id, version, region)?,
        })
    }
}
