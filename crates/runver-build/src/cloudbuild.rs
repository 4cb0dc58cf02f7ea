use runver_core::HookContext;
use runver_core::hooks::CloudBuildHooks;
use serde_yaml::{Mapping, Value};

use crate::GenerateError;
use crate::template::{HookPoint, collect_replacements, substitute};
use crate::templates::{TemplateName, TemplateStore};

pub const BEFORE_DEPLOY: &str = "# [HOOK: beforeDeploy]";
pub const BEFORE_BUILD: &str = "# [HOOK: beforeBuild]";
pub const BEFORE_SERVICE_DEPLOY: &str = "# [HOOK: beforeServiceDeploy]";
pub const AFTER_DEPLOY: &str = "# [HOOK: afterDeploy]";

/// Generates `cloudbuild.yaml`.
///
/// Hook fragments are spliced into the template text first; the result is
/// then parsed and its `substitutions` mapping replaced wholesale, so
/// `_APP_VERSION`, `_REGION` and `_REPOSITORY` always reflect the deployment
/// no matter what a hook emitted.
pub struct CloudBuildGenerator<'a, T: TemplateStore> {
    templates: &'a T,
    hooks: &'a CloudBuildHooks,
}

impl<'a, T: TemplateStore> CloudBuildGenerator<'a, T> {
    pub fn new(templates: &'a T, hooks: &'a CloudBuildHooks) -> Self {
        Self { templates, hooks }
    }

    pub async fn render(&self, ctx: &HookContext) -> Result<String, GenerateError> {
        ctx.require_deploy_params()?;

        let template = self.templates.load(TemplateName::CloudBuild)?;
        let points = [
            HookPoint::new(
                "beforeDeploy",
                BEFORE_DEPLOY,
                self.hooks.before_deploy.as_ref(),
            ),
            HookPoint::new("beforeBuild", BEFORE_BUILD, self.hooks.before_build.as_ref()),
            HookPoint::new(
                "beforeServiceDeploy",
                BEFORE_SERVICE_DEPLOY,
                self.hooks.before_service_deploy.as_ref(),
            ),
            HookPoint::new("afterDeploy", AFTER_DEPLOY, self.hooks.after_deploy.as_ref()),
        ];
        let replacements = collect_replacements(&points, ctx).await?;
        let text = substitute(&template, &replacements);

        let mut document: Value =
            serde_yaml::from_str(&text).map_err(|e| GenerateError::CloudBuildParse { source: e })?;
        let root = document
            .as_mapping_mut()
            .ok_or(GenerateError::CloudBuildNotMapping)?;
        root.insert(Value::from("substitutions"), substitutions(ctx));

        tracing::debug!(version = %ctx.version, "rendered cloudbuild.yaml");
        // serde_yaml emits scalars without line folding
        serde_yaml::to_string(&document).map_err(|e| GenerateError::CloudBuildSerialize { source: e })
    }
}

fn substitutions(ctx: &HookContext) -> Value {
    let mut map = Mapping::new();
    map.insert(Value::from("_APP_VERSION"), Value::from(ctx.version.as_str()));
    map.insert(Value::from("_REGION"), Value::from(ctx.region.as_str()));
    map.insert(
        Value::from("_REPOSITORY"),
        Value::from(ctx.repository.as_str()),
    );
    Value::Mapping(map)
}
