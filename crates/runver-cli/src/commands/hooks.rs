//! Binding of runver.toml hook definitions to hook slots.
//!
//! Text specs become fixed fragments. Command specs run through `sh -c` with
//! the deployment context in `RUNVER_*` environment variables; their stdout,
//! minus trailing whitespace, becomes the fragment.

use std::process::Stdio;

use runver_core::hooks::{
    CloudBuildHooks, ConfigHook, DockerfileHooks, FragmentHook, ShellUtilsHooks, config_hook,
    fragment_hook, post_deploy_hook, static_fragment, validate_hook,
};
use runver_core::{HookContext, HookError, HookSpec, Hooks, HooksConfig, RuntimeConfig};
use serde_json::Value;

/// Runtime-config key the version's secret payload is exposed under.
const SECRET_ENV_KEY: &str = "APP_CONFIG";

/// Build the hook slots described by `config`.
///
/// `secret_config` is the parsed `APP_CONFIG_<VERSION>` secret, fetched by the
/// caller when `runtime_config.env_from_secret` is set.
pub(crate) fn bind(
    config: &HooksConfig,
    ctx: &HookContext,
    secret_config: Option<Value>,
) -> anyhow::Result<Hooks> {
    let cloud_build = &config.cloud_build;
    let shell_utils = &config.shell_utils;
    let dockerfile = &config.dockerfile;

    Ok(Hooks {
        validate_environment: config.validate_environment.as_ref().map(|spec| {
            let script = spec.script();
            validate_hook(move |ctx| {
                let script = script.clone();
                async move {
                    let output = run_script(script, &ctx, Vec::new()).await?;
                    if !output.is_empty() {
                        tracing::info!("{output}");
                    }
                    Ok::<_, HookError>(())
                }
            })
        }),
        configure_runtime_config: runtime_config(config, secret_config)?,
        post_deploy: config.post_deploy.as_ref().map(|spec| {
            let script = spec.script();
            let ctx = ctx.clone();
            post_deploy_hook(move |version, url| {
                let script = script.clone();
                let ctx = ctx.clone();
                async move {
                    let env = vec![("RUNVER_VERSION", version), ("RUNVER_URL", url)];
                    let output = run_script(script, &ctx, env).await?;
                    if !output.is_empty() {
                        println!("{output}");
                    }
                    Ok::<_, HookError>(())
                }
            })
        }),
        cloud_build: CloudBuildHooks {
            before_deploy: fragment(&cloud_build.before_deploy),
            before_build: fragment(&cloud_build.before_build),
            before_service_deploy: fragment(&cloud_build.before_service_deploy),
            after_deploy: fragment(&cloud_build.after_deploy),
        },
        shell_utils: ShellUtilsHooks {
            validate_environment: fragment(&shell_utils.validate_environment),
            before_deploy: fragment(&shell_utils.before_deploy),
            after_deploy: fragment(&shell_utils.after_deploy),
        },
        dockerfile: DockerfileHooks {
            additional_stages: fragment(&dockerfile.additional_stages),
            after_deps: fragment(&dockerfile.after_deps),
            before_build: fragment(&dockerfile.before_build),
            additional_build_args: fragment(&dockerfile.additional_build_args),
            additional_env: fragment(&dockerfile.additional_env),
            before_copy: fragment(&dockerfile.before_copy),
            additional_copy: fragment(&dockerfile.additional_copy),
        },
    })
}

fn fragment(spec: &Option<HookSpec>) -> Option<FragmentHook> {
    let spec = spec.as_ref()?;
    Some(match spec.static_text() {
        Some(text) => static_fragment(text),
        None => {
            let script = spec.script();
            fragment_hook(move |ctx| {
                let script = script.clone();
                async move { run_script(script, &ctx, Vec::new()).await }
            })
        }
    })
}

fn runtime_config(
    config: &HooksConfig,
    secret_config: Option<Value>,
) -> anyhow::Result<Option<ConfigHook>> {
    let spec = &config.runtime_config;
    if spec.is_empty() {
        return Ok(None);
    }

    let overrides = match &spec.overrides {
        Some(table) => match serde_json::to_value(table)? {
            Value::Object(map) => map,
            _ => RuntimeConfig::new(),
        },
        None => RuntimeConfig::new(),
    };
    // Next.js only inlines string env values
    let secret = secret_config.map(|value| Value::String(value.to_string()));

    Ok(Some(config_hook(move |mut runtime: RuntimeConfig, _ctx| {
        let overrides = overrides.clone();
        let secret = secret.clone();
        async move {
            runtime.extend(overrides);
            if let Some(secret) = secret {
                let env = runtime
                    .entry("env")
                    .or_insert_with(|| Value::Object(RuntimeConfig::new()));
                match env {
                    Value::Object(env) => {
                        env.insert(SECRET_ENV_KEY.to_owned(), secret);
                    }
                    _ => return Err(HookError::new("runtime config `env` must be a table")),
                }
            }
            Ok(runtime)
        }
    })))
}

/// Run `script` with `sh -c` and return its stdout without trailing
/// whitespace. A non-zero exit is a hook failure carrying stderr.
async fn run_script(
    script: String,
    ctx: &HookContext,
    extra_env: Vec<(&'static str, String)>,
) -> Result<String, HookError> {
    tracing::debug!(%script, "running hook command");

    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(&script)
        .envs(ctx.env_vars())
        .envs(extra_env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| HookError::new(format!("failed to run `{script}`: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HookError::new(format!(
            "`{script}` exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> HookContext {
        HookContext::new("test-project", "feature-x", "us-central1", "my-app-repo")
    }

    fn parse(toml_text: &str) -> HooksConfig {
        let file: runver_core::RunverConfig = toml::from_str(toml_text).unwrap();
        file.hooks
    }

    #[tokio::test]
    async fn empty_config_binds_nothing() {
        let hooks = bind(&HooksConfig::default(), &ctx(), None).unwrap();
        assert!(hooks.validate_environment.is_none());
        assert!(hooks.configure_runtime_config.is_none());
        assert!(hooks.post_deploy.is_none());
        assert!(hooks.dockerfile.additional_env.is_none());
    }

    #[tokio::test]
    async fn text_and_lines_become_fixed_fragments() {
        let config = parse(
            r#"
            [hooks.dockerfile]
            additional_env = ["ENV A=1", "ENV B=2"]

            [hooks.cloud_build]
            before_build = "  - id: lint"
            "#,
        );
        let hooks = bind(&config, &ctx(), None).unwrap();

        let env = hooks.dockerfile.additional_env.unwrap();
        assert_eq!(env(&ctx()).await.unwrap(), "ENV A=1\nENV B=2");
        let lint = hooks.cloud_build.before_build.unwrap();
        assert_eq!(lint(&ctx()).await.unwrap(), "  - id: lint");
    }

    #[tokio::test]
    async fn command_fragment_sees_context_env() {
        let config = parse(
            r#"
            [hooks.shell_utils]
            before_deploy = { command = "printf '  echo %s-%s\n' \"$RUNVER_VERSION\" \"$RUNVER_REGION\"" }
            "#,
        );
        let hooks = bind(&config, &ctx(), None).unwrap();

        let hook = hooks.shell_utils.before_deploy.unwrap();
        assert_eq!(hook(&ctx()).await.unwrap(), "  echo feature-x-us-central1");
    }

    #[tokio::test]
    async fn failing_validate_command_is_an_error() {
        let config = parse(
            r#"
            [hooks]
            validate_environment = { command = "echo missing tool >&2; exit 3" }
            "#,
        );
        let hooks = bind(&config, &ctx(), None).unwrap();

        let validate = hooks.validate_environment.unwrap();
        let err = validate(&ctx()).await.unwrap_err();
        assert!(err.to_string().contains("missing tool"));
    }

    #[tokio::test]
    async fn post_deploy_receives_url() {
        let config = parse(
            r#"
            [hooks]
            post_deploy = "test \"$RUNVER_URL\" = https://svc.run.app && test \"$RUNVER_PROJECT_ID\" = test-project"
            "#,
        );
        let hooks = bind(&config, &ctx(), None).unwrap();

        let post = hooks.post_deploy.unwrap();
        post("feature-x", "https://svc.run.app").await.unwrap();
        assert!(post("feature-x", "https://other.run.app").await.is_err());
    }

    #[tokio::test]
    async fn runtime_overrides_merge_top_level_keys() {
        let config = parse(
            r#"
            [hooks.runtime_config]
            overrides = { basePath = "/docs", images = { unoptimized = true } }
            "#,
        );
        let hooks = bind(&config, &ctx(), None).unwrap();

        let mut base = RuntimeConfig::new();
        base.insert("reactStrictMode".to_owned(), Value::Bool(true));
        let hook = hooks.configure_runtime_config.unwrap();
        let out = hook(base, &ctx()).await.unwrap();

        assert_eq!(out["basePath"], "/docs");
        assert_eq!(out["images"], json!({ "unoptimized": true }));
        assert_eq!(out["reactStrictMode"], true);
    }

    #[tokio::test]
    async fn secret_is_exposed_as_string_env() {
        let config = parse(
            r#"
            [hooks.runtime_config]
            env_from_secret = true
            "#,
        );
        let secret = json!({ "apiUrl": "https://api.example.com" });
        let hooks = bind(&config, &ctx(), Some(secret.clone())).unwrap();

        let hook = hooks.configure_runtime_config.unwrap();
        let out = hook(RuntimeConfig::new(), &ctx()).await.unwrap();

        let exposed = out["env"]["APP_CONFIG"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(exposed).unwrap(), secret);
    }
}
