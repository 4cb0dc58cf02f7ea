//! User hook slots.
//!
//! Hooks are a closed set of named, optional slots. An empty slot is a valid
//! state: generators treat it as "inject nothing" and the deploy pipeline
//! skips it. Every hook is asynchronous so it can do I/O (run a command,
//! fetch a secret) before producing its result.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;

/// Structured payload of the runtime config file (`next.config.js`).
pub type RuntimeConfig = serde_json::Map<String, serde_json::Value>;

pub type HookFuture<T> = Pin<Box<dyn Future<Output = Result<T, HookError>> + Send>>;

/// Produces a text fragment injected after a template marker.
pub type FragmentHook = Arc<dyn Fn(&HookContext) -> HookFuture<String> + Send + Sync>;

/// Checks the environment before any artifact is generated.
pub type ValidateHook = Arc<dyn Fn(&HookContext) -> HookFuture<()> + Send + Sync>;

/// Receives the assembled runtime config and returns a modified one.
pub type ConfigHook =
    Arc<dyn Fn(RuntimeConfig, &HookContext) -> HookFuture<RuntimeConfig> + Send + Sync>;

/// Runs after a successful deployment with `(version, url)`.
pub type PostDeployHook = Arc<dyn Fn(&str, &str) -> HookFuture<()> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Context every hook is invoked with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookContext {
    pub project_id: String,
    pub version: String,
    pub region: String,
    pub repository: String,
}

impl HookContext {
    pub fn new(
        project_id: impl Into<String>,
        version: impl Into<String>,
        region: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            version: version.into(),
            region: region.into(),
            repository: repository.into(),
        }
    }

    /// Fail with [`crate::Error::MissingParameter`] naming the first empty
    /// field among `version`, `region` and `repository`.
    pub fn require_deploy_params(&self) -> crate::Result<()> {
        for (field, value) in [
            ("version", &self.version),
            ("region", &self.region),
            ("repository", &self.repository),
        ] {
            if value.is_empty() {
                return Err(crate::Error::MissingParameter { field });
            }
        }
        Ok(())
    }

    /// Environment variables exposing the context to external commands.
    pub fn env_vars(&self) -> [(&'static str, &str); 4] {
        [
            ("RUNVER_PROJECT_ID", &self.project_id),
            ("RUNVER_VERSION", &self.version),
            ("RUNVER_REGION", &self.region),
            ("RUNVER_REPOSITORY", &self.repository),
        ]
    }
}

// ── Hook groups ──

/// Fragments injected into `cloudbuild.yaml`.
#[derive(Clone, Default)]
pub struct CloudBuildHooks {
    pub before_deploy: Option<FragmentHook>,
    pub before_build: Option<FragmentHook>,
    pub before_service_deploy: Option<FragmentHook>,
    pub after_deploy: Option<FragmentHook>,
}

/// Fragments injected into the generated shell utilities script.
#[derive(Clone, Default)]
pub struct ShellUtilsHooks {
    pub validate_environment: Option<FragmentHook>,
    pub before_deploy: Option<FragmentHook>,
    pub after_deploy: Option<FragmentHook>,
}

/// Fragments injected into the `Dockerfile`.
#[derive(Clone, Default)]
pub struct DockerfileHooks {
    pub additional_stages: Option<FragmentHook>,
    pub after_deps: Option<FragmentHook>,
    pub before_build: Option<FragmentHook>,
    pub additional_build_args: Option<FragmentHook>,
    pub additional_env: Option<FragmentHook>,
    pub before_copy: Option<FragmentHook>,
    pub additional_copy: Option<FragmentHook>,
}

/// Every hook slot a deployment can fill.
#[derive(Clone, Default)]
pub struct Hooks {
    pub validate_environment: Option<ValidateHook>,
    pub configure_runtime_config: Option<ConfigHook>,
    pub post_deploy: Option<PostDeployHook>,
    pub cloud_build: CloudBuildHooks,
    pub shell_utils: ShellUtilsHooks,
    pub dockerfile: DockerfileHooks,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("validate_environment", &self.validate_environment.is_some())
            .field(
                "configure_runtime_config",
                &self.configure_runtime_config.is_some(),
            )
            .field("post_deploy", &self.post_deploy.is_some())
            .finish_non_exhaustive()
    }
}

// ── Constructors ──

/// Wrap an async function as a [`FragmentHook`].
///
/// ```
/// use runver_core::hooks::{fragment_hook, HookContext};
///
/// let hook = fragment_hook(|ctx: HookContext| async move {
///     Ok(format!("ENV APP_VERSION={}", ctx.version))
/// });
/// # let _ = hook;
/// ```
pub fn fragment_hook<F, Fut>(f: F) -> FragmentHook
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, HookError>> + Send + 'static,
{
    Arc::new(move |ctx: &HookContext| -> HookFuture<String> { Box::pin(f(ctx.clone())) })
}

/// A [`FragmentHook`] that always returns the same text.
pub fn static_fragment(text: impl Into<String>) -> FragmentHook {
    let text = text.into();
    fragment_hook(move |_| {
        let text = text.clone();
        async move { Ok(text) }
    })
}

pub fn validate_hook<F, Fut>(f: F) -> ValidateHook
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    Arc::new(move |ctx: &HookContext| -> HookFuture<()> { Box::pin(f(ctx.clone())) })
}

pub fn config_hook<F, Fut>(f: F) -> ConfigHook
where
    F: Fn(RuntimeConfig, HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RuntimeConfig, HookError>> + Send + 'static,
{
    Arc::new(
        move |config: RuntimeConfig, ctx: &HookContext| -> HookFuture<RuntimeConfig> {
            Box::pin(f(config, ctx.clone()))
        },
    )
}

pub fn post_deploy_hook<F, Fut>(f: F) -> PostDeployHook
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    Arc::new(move |version: &str, url: &str| -> HookFuture<()> {
        Box::pin(f(version.to_owned(), url.to_owned()))
    })
}
