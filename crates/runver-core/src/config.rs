use serde::{Deserialize, Serialize};

use crate::hooks::Hooks;

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "runver.toml";

/// runver.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunverConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub hooks: HooksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// GCP region (defaults to us-central1)
    #[serde(default = "default_region")]
    pub region: String,
    /// Artifact Registry repository (defaults to cloud-run-source-deploy)
    #[serde(default = "default_repository")]
    pub repository: String,
    /// GCP project ID (defaults to `gcloud config get-value project`)
    pub gcp_project_id: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            repository: default_repository(),
            gcp_project_id: None,
        }
    }
}

/// Declarative hook definitions. Each table merges key by key with the
/// defaults, so setting one hook never clears another.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Command run before any artifact is generated; failure aborts the deploy.
    pub validate_environment: Option<HookSpec>,
    /// Command run after the service is live, with `RUNVER_URL` set.
    pub post_deploy: Option<HookSpec>,
    #[serde(default)]
    pub cloud_build: CloudBuildHookSpecs,
    #[serde(default)]
    pub shell_utils: ShellUtilsHookSpecs,
    #[serde(default)]
    pub dockerfile: DockerfileHookSpecs,
    #[serde(default)]
    pub runtime_config: RuntimeConfigHookSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudBuildHookSpecs {
    pub before_deploy: Option<HookSpec>,
    pub before_build: Option<HookSpec>,
    pub before_service_deploy: Option<HookSpec>,
    pub after_deploy: Option<HookSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellUtilsHookSpecs {
    pub validate_environment: Option<HookSpec>,
    pub before_deploy: Option<HookSpec>,
    pub after_deploy: Option<HookSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockerfileHookSpecs {
    pub additional_stages: Option<HookSpec>,
    pub after_deps: Option<HookSpec>,
    pub before_build: Option<HookSpec>,
    pub additional_build_args: Option<HookSpec>,
    pub additional_env: Option<HookSpec>,
    pub before_copy: Option<HookSpec>,
    pub additional_copy: Option<HookSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfigHookSpec {
    /// Inject the `APP_CONFIG_<VERSION>` secret as `env.APP_CONFIG`.
    #[serde(default)]
    pub env_from_secret: bool,
    /// Top-level keys merged over the generated runtime config.
    #[serde(default)]
    pub overrides: Option<toml::Table>,
}

impl RuntimeConfigHookSpec {
    pub fn is_empty(&self) -> bool {
        !self.env_from_secret && self.overrides.is_none()
    }
}

/// One hook definition in runver.toml.
///
/// ```toml
/// before_build = "RUN npm run lint"
/// additional_env = ["ENV A=1", "ENV B=2"]
/// before_deploy = { command = "./scripts/steps.sh" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookSpec {
    Text(String),
    Lines(Vec<String>),
    Command { command: String },
}

impl HookSpec {
    /// Fixed text of a non-command spec; lines are joined with `\n`.
    pub fn static_text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Lines(lines) => Some(lines.join("\n")),
            Self::Command { .. } => None,
        }
    }

    /// The spec as a shell script. Text forms run as written.
    pub fn script(&self) -> String {
        match self {
            Self::Command { command } => command.clone(),
            Self::Text(text) => text.clone(),
            Self::Lines(lines) => lines.join("\n"),
        }
    }
}

impl RunverConfig {
    /// Load from runver.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &std::path::Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            tracing::debug!(path = %config_path.display(), "loading config");
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            tracing::info!("no {CONFIG_FILE_NAME} found, using defaults");
            Ok(Self::default())
        }
    }
}

/// Configuration a single deployment run consumes: project settings plus
/// bound hook slots. Immutable for the run.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub region: String,
    pub repository: String,
    pub gcp_project_id: Option<String>,
    pub hooks: Hooks,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self::new(ProjectConfig::default(), Hooks::default())
    }
}

impl DeployConfig {
    pub fn new(project: ProjectConfig, hooks: Hooks) -> Self {
        Self {
            region: project.region,
            repository: project.repository,
            gcp_project_id: project.gcp_project_id,
            hooks,
        }
    }
}

fn default_region() -> String {
    "us-central1".to_owned()
}

fn default_repository() -> String {
    "cloud-run-source-deploy".to_owned()
}
