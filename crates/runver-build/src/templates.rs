use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Directory (relative to the project) holding per-project template overrides.
pub const OVERRIDE_DIR: &str = ".runver/templates";

/// Logical names of the templates the generators consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateName {
    CloudBuild,
    Dockerfile,
    ShellUtils,
    RuntimeConfig,
}

impl TemplateName {
    pub const ALL: [TemplateName; 4] = [
        TemplateName::CloudBuild,
        TemplateName::Dockerfile,
        TemplateName::ShellUtils,
        TemplateName::RuntimeConfig,
    ];

    /// File name of both the template and the artifact generated from it.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::CloudBuild => "cloudbuild.yaml",
            Self::Dockerfile => "Dockerfile",
            Self::ShellUtils => "runver-utils.sh",
            Self::RuntimeConfig => "next.config.js",
        }
    }

    fn embedded(self) -> &'static str {
        match self {
            Self::CloudBuild => embedded::CLOUD_BUILD,
            Self::Dockerfile => embedded::DOCKERFILE,
            Self::ShellUtils => embedded::SHELL_UTILS,
            Self::RuntimeConfig => embedded::RUNTIME_CONFIG,
        }
    }
}

impl std::fmt::Display for TemplateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

mod embedded {
    pub static CLOUD_BUILD: &str = include_str!("../templates/cloudbuild.yaml");
    pub static DOCKERFILE: &str = include_str!("../templates/Dockerfile");
    pub static SHELL_UTILS: &str = include_str!("../templates/runver-utils.sh");
    pub static RUNTIME_CONFIG: &str = include_str!("../templates/next.config.js");
}

/// Source of template text, looked up by logical name.
pub trait TemplateStore {
    fn load(&self, name: TemplateName) -> Result<Cow<'static, str>, TemplateError>;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplates;

impl TemplateStore for EmbeddedTemplates {
    fn load(&self, name: TemplateName) -> Result<Cow<'static, str>, TemplateError> {
        Ok(Cow::Borrowed(name.embedded()))
    }
}

/// Project-local overrides in `.runver/templates/`, falling back to the
/// embedded templates for any file that is not present.
#[derive(Debug, Clone)]
pub struct ProjectTemplates {
    dir: PathBuf,
}

impl ProjectTemplates {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            dir: project_dir.join(OVERRIDE_DIR),
        }
    }

    /// Check if the project overrides the given template.
    pub fn is_overridden(&self, name: TemplateName) -> bool {
        self.dir.join(name.file_name()).exists()
    }
}

impl TemplateStore for ProjectTemplates {
    fn load(&self, name: TemplateName) -> Result<Cow<'static, str>, TemplateError> {
        if !self.is_overridden(name) {
            return EmbeddedTemplates.load(name);
        }

        let path = self.dir.join(name.file_name());
        tracing::debug!(template = %name, path = %path.display(), "using project template");
        std::fs::read_to_string(&path)
            .map(Cow::Owned)
            .map_err(|e| TemplateError::Read { path, source: e })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template at {path}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_embedded_templates_exist() {
        for name in TemplateName::ALL {
            let template = EmbeddedTemplates.load(name).unwrap();
            assert!(!template.is_empty(), "template {name} should not be empty");
        }
    }

    #[test]
    fn embedded_templates_contain_hook_markers() {
        for name in TemplateName::ALL {
            let template = EmbeddedTemplates.load(name).unwrap();
            assert!(
                template.contains("[HOOK: "),
                "template {name} should contain a hook marker"
            );
        }
    }

    #[test]
    fn project_templates_fall_back_to_embedded() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = ProjectTemplates::new(tmp.path());

        assert!(!store.is_overridden(TemplateName::Dockerfile));
        assert_eq!(
            store.load(TemplateName::Dockerfile).unwrap(),
            EmbeddedTemplates.load(TemplateName::Dockerfile).unwrap()
        );
    }

    #[test]
    fn project_templates_prefer_override() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join(OVERRIDE_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Dockerfile"), "FROM scratch\n").unwrap();

        let store = ProjectTemplates::new(tmp.path());
        assert!(store.is_overridden(TemplateName::Dockerfile));
        assert_eq!(store.load(TemplateName::Dockerfile).unwrap(), "FROM scratch\n");
        assert!(!store.is_overridden(TemplateName::CloudBuild));
    }
}
