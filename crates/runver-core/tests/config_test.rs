use runver_core::{DeployConfig, HookSpec, RunverConfig};
use tempfile::TempDir;

#[test]
fn load_returns_defaults_when_no_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = RunverConfig::load(tmp.path()).unwrap();

    assert_eq!(config.project.region, "us-central1");
    assert_eq!(config.project.repository, "cloud-run-source-deploy");
    assert!(config.project.gcp_project_id.is_none());
    assert!(config.hooks.validate_environment.is_none());
    assert!(config.hooks.post_deploy.is_none());
    assert!(config.hooks.cloud_build.before_build.is_none());
    assert!(config.hooks.runtime_config.is_empty());
}

#[test]
fn load_parses_full_config() {
    let tmp = TempDir::new().unwrap();
    let toml = r#"
[project]
region = "asia-northeast1"
repository = "my-repo"
gcp_project_id = "my-gcp-project"

[hooks]
validate_environment = { command = "test -n \"$RUNVER_VERSION\"" }
post_deploy = { command = "echo $RUNVER_URL" }

[hooks.cloud_build]
before_build = "  - id: lint\n    name: node:18"

[hooks.shell_utils]
after_deploy = ["echo one", "echo two"]

[hooks.dockerfile]
additional_env = ["ENV EXTRA_VAR=extra"]

[hooks.runtime_config]
env_from_secret = true
overrides = { images = { unoptimized = true } }
"#;
    std::fs::write(tmp.path().join("runver.toml"), toml).unwrap();

    let config = RunverConfig::load(tmp.path()).unwrap();

    assert_eq!(config.project.region, "asia-northeast1");
    assert_eq!(config.project.repository, "my-repo");
    assert_eq!(
        config.project.gcp_project_id.as_deref(),
        Some("my-gcp-project")
    );
    assert_eq!(
        config.hooks.validate_environment,
        Some(HookSpec::Command {
            command: "test -n \"$RUNVER_VERSION\"".to_owned()
        })
    );
    assert_eq!(
        config.hooks.cloud_build.before_build,
        Some(HookSpec::Text("  - id: lint\n    name: node:18".to_owned()))
    );
    assert_eq!(
        config.hooks.shell_utils.after_deploy,
        Some(HookSpec::Lines(vec![
            "echo one".to_owned(),
            "echo two".to_owned()
        ]))
    );
    assert!(config.hooks.runtime_config.env_from_secret);
    let overrides = config.hooks.runtime_config.overrides.unwrap();
    assert_eq!(overrides["images"]["unoptimized"].as_bool(), Some(true));
}

#[test]
fn load_partial_config_fills_defaults() {
    let tmp = TempDir::new().unwrap();
    let toml = r#"
[project]
gcp_project_id = "partial-project"
"#;
    std::fs::write(tmp.path().join("runver.toml"), toml).unwrap();

    let config = RunverConfig::load(tmp.path()).unwrap();

    assert_eq!(
        config.project.gcp_project_id.as_deref(),
        Some("partial-project")
    );
    // Defaults preserved per key
    assert_eq!(config.project.region, "us-central1");
    assert_eq!(config.project.repository, "cloud-run-source-deploy");
}

#[test]
fn hook_tables_merge_key_by_key() {
    let tmp = TempDir::new().unwrap();
    let toml = r#"
[hooks.dockerfile]
before_copy = "RUN echo before"
"#;
    std::fs::write(tmp.path().join("runver.toml"), toml).unwrap();

    let config = RunverConfig::load(tmp.path()).unwrap();

    assert!(config.hooks.dockerfile.before_copy.is_some());
    assert!(config.hooks.dockerfile.additional_env.is_none());
    assert!(config.hooks.cloud_build.after_deploy.is_none());
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("runver.toml"), "not valid {{{{ toml").unwrap();

    let result = RunverConfig::load(tmp.path());
    assert!(result.is_err());

    let err = result.unwrap_err().to_string();
    assert!(err.contains("parse"));
}

#[test]
fn load_empty_config_returns_defaults() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("runver.toml"), "").unwrap();

    let config = RunverConfig::load(tmp.path()).unwrap();
    assert_eq!(config.project.region, "us-central1");
}

// ── HookSpec ──

#[test]
fn static_text_joins_lines() {
    let spec = HookSpec::Lines(vec!["ARG A".to_owned(), "ARG B".to_owned()]);
    assert_eq!(spec.static_text().as_deref(), Some("ARG A\nARG B"));
}

#[test]
fn command_spec_has_no_static_text() {
    let spec = HookSpec::Command {
        command: "echo hi".to_owned(),
    };
    assert!(spec.static_text().is_none());
    assert_eq!(spec.script(), "echo hi");
}

#[test]
fn text_specs_run_as_scripts() {
    assert_eq!(HookSpec::Text("make check".to_owned()).script(), "make check");
    let lines = HookSpec::Lines(vec!["set -e".to_owned(), "make check".to_owned()]);
    assert_eq!(lines.script(), "set -e\nmake check");
}

// ── DeployConfig ──

#[test]
fn deploy_config_takes_project_settings() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("runver.toml"),
        "[project]\nregion = \"europe-west1\"\n",
    )
    .unwrap();

    let file = RunverConfig::load(tmp.path()).unwrap();
    let config = DeployConfig::new(file.project, Default::default());

    assert_eq!(config.region, "europe-west1");
    assert_eq!(config.repository, "cloud-run-source-deploy");
    assert!(config.hooks.post_deploy.is_none());
}
