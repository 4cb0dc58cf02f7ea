//! `next.config.js` generation.
//!
//! The configuration is held as structured data and rendered as a JSON
//! object literal, which JavaScript parses as-is. No source text is ever
//! evaluated to obtain it.

use runver_core::hooks::ConfigHook;
use runver_core::{HookContext, RuntimeConfig};
use serde_json::Value;

use crate::GenerateError;
use crate::template::{Replacements, substitute};
use crate::templates::{TemplateName, TemplateStore};

pub const CONFIG_MARKER: &str = "// [HOOK: nextConfig]";

/// Cloud Run needs a self-contained server bundle.
pub const STANDALONE_OUTPUT: &str = "standalone";

/// Container path the standalone bundle traces files from.
pub const TRACING_ROOT: &str = "/app";

pub struct RuntimeConfigGenerator<'a, T: TemplateStore> {
    templates: &'a T,
    hook: Option<&'a ConfigHook>,
}

impl<'a, T: TemplateStore> RuntimeConfigGenerator<'a, T> {
    pub fn new(templates: &'a T, hook: Option<&'a ConfigHook>) -> Self {
        Self { templates, hook }
    }

    /// Assemble the config object, run the hook, and re-apply `output`.
    pub async fn build_config(&self, ctx: &HookContext) -> Result<RuntimeConfig, GenerateError> {
        let mut config = platform_config(RuntimeConfig::new());

        if let Some(hook) = self.hook {
            tracing::debug!("running runtime config hook");
            config = hook(config, ctx).await.map_err(|e| GenerateError::Hook {
                hook: "configureRuntimeConfig",
                source: e,
            })?;
        }

        config.insert("output".to_owned(), Value::from(STANDALONE_OUTPUT));
        Ok(config)
    }

    pub async fn render(&self, ctx: &HookContext) -> Result<String, GenerateError> {
        ctx.require_deploy_params()?;

        let template = self.templates.load(TemplateName::RuntimeConfig)?;
        let config = self.build_config(ctx).await?;

        let literal = serde_json::to_string_pretty(&Value::Object(config))
            .map_err(|e| GenerateError::RuntimeConfigSerialize { source: e })?;

        let mut replacements = Replacements::new();
        replacements.insert(
            CONFIG_MARKER.to_owned(),
            format!("const nextConfig = {literal};"),
        );
        Ok(substitute(&template, &replacements))
    }
}

/// Apply the settings Cloud Run deployment depends on over `base`.
fn platform_config(mut config: RuntimeConfig) -> RuntimeConfig {
    config.insert("output".to_owned(), Value::from(STANDALONE_OUTPUT));

    let mut experimental = match config.remove("experimental") {
        Some(Value::Object(existing)) => existing,
        _ => serde_json::Map::new(),
    };
    experimental.insert(
        "outputFileTracingRoot".to_owned(),
        Value::from(TRACING_ROOT),
    );
    config.insert("experimental".to_owned(), Value::Object(experimental));

    config.insert("reactStrictMode".to_owned(), Value::Bool(true));
    config.insert("swcMinify".to_owned(), Value::Bool(true));
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn platform_config_keeps_base_experimental_keys() {
        let base = json!({ "experimental": { "serverActions": true }, "basePath": "/docs" });
        let Value::Object(base) = base else {
            unreachable!()
        };

        let config = platform_config(base);

        assert_eq!(config["output"], "standalone");
        assert_eq!(config["basePath"], "/docs");
        assert_eq!(config["experimental"]["serverActions"], true);
        assert_eq!(config["experimental"]["outputFileTracingRoot"], "/app");
        assert_eq!(config["reactStrictMode"], true);
    }

    #[test]
    fn platform_config_replaces_non_object_experimental() {
        let mut base = RuntimeConfig::new();
        base.insert("experimental".to_owned(), Value::from("nonsense"));

        let config = platform_config(base);
        assert_eq!(config["experimental"], json!({ "outputFileTracingRoot": "/app" }));
    }
}
