//! Deployment artifact generation for runver.
//!
//! # Artifacts
//!
//! ```text
//! runver <version>
//!   1. cloudbuild.yaml  ── CloudBuildGenerator     (hooks + fixed substitutions)
//!   2. Dockerfile       ── DockerfileGenerator     (hooks)
//!   3. next.config.js   ── RuntimeConfigGenerator  (config hook + forced standalone)
//!   4. runver-utils.sh  ── ShellUtilsGenerator     (hooks, written 0755)
//! ```
//!
//! # Hook injection
//!
//! Templates carry marker lines (`# [HOOK: name]`). Each generator invokes the
//! matching hook with the [`HookContext`] and inserts its output on the line
//! after the marker; see [`template::substitute`]. Generators return strings
//! only; [`workspace::write_deployment_files`] persists them.
//!
//! # Templates
//!
//! Defaults are embedded in the binary. A project can override any of them by
//! placing a file of the same name in `.runver/templates/`.

pub mod cloudbuild;
pub mod dockerfile;
pub mod runtime_config;
pub mod shell_utils;
pub mod template;
pub mod templates;
pub mod workspace;

pub use cloudbuild::CloudBuildGenerator;
pub use dockerfile::DockerfileGenerator;
pub use runtime_config::RuntimeConfigGenerator;
pub use shell_utils::ShellUtilsGenerator;
pub use templates::{EmbeddedTemplates, ProjectTemplates, TemplateName, TemplateStore};

use runver_core::{HookContext, HookError, Hooks};

/// The four generated artifacts of one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentFiles {
    pub cloud_build: String,
    pub dockerfile: String,
    pub shell_utils: String,
    pub runtime_config: String,
}

impl DeploymentFiles {
    pub fn entries(&self) -> [(TemplateName, &str); 4] {
        [
            (TemplateName::CloudBuild, &self.cloud_build),
            (TemplateName::ShellUtils, &self.shell_utils),
            (TemplateName::Dockerfile, &self.dockerfile),
            (TemplateName::RuntimeConfig, &self.runtime_config),
        ]
    }
}

/// Run every generator in sequence for one deployment.
pub async fn generate_deployment_files<T: TemplateStore>(
    templates: &T,
    hooks: &Hooks,
    ctx: &HookContext,
) -> Result<DeploymentFiles, GenerateError> {
    let cloud_build = CloudBuildGenerator::new(templates, &hooks.cloud_build)
        .render(ctx)
        .await?;
    tracing::debug!("generated cloudbuild.yaml");

    let shell_utils = ShellUtilsGenerator::new(templates, &hooks.shell_utils)
        .render(ctx)
        .await?;
    tracing::debug!("generated runver-utils.sh");

    let dockerfile = DockerfileGenerator::new(templates, &hooks.dockerfile)
        .render(ctx)
        .await?;
    tracing::debug!("generated Dockerfile");

    let runtime_config =
        RuntimeConfigGenerator::new(templates, hooks.configure_runtime_config.as_ref())
            .render(ctx)
            .await?;
    tracing::debug!("generated next.config.js");

    Ok(DeploymentFiles {
        cloud_build,
        dockerfile,
        shell_utils,
        runtime_config,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Params(#[from] runver_core::Error),

    #[error(transparent)]
    Template(#[from] templates::TemplateError),

    #[error("hook `{hook}` failed")]
    Hook {
        hook: &'static str,
        source: HookError,
    },

    #[error("generated cloudbuild.yaml is not valid YAML")]
    CloudBuildParse { source: serde_yaml::Error },

    #[error("generated cloudbuild.yaml is not a mapping at the top level")]
    CloudBuildNotMapping,

    #[error("failed to serialize cloudbuild.yaml")]
    CloudBuildSerialize { source: serde_yaml::Error },

    #[error("failed to serialize next.config.js")]
    RuntimeConfigSerialize { source: serde_json::Error },
}
