use runver_core::HookContext;
use runver_core::hooks::ShellUtilsHooks;

use crate::GenerateError;
use crate::template::{HookPoint, collect_replacements, substitute};
use crate::templates::{TemplateName, TemplateStore};

pub const VALIDATE_ENVIRONMENT: &str = "# [HOOK: validateEnvironment]";
pub const BEFORE_DEPLOY: &str = "# [HOOK: beforeDeploy]";
pub const AFTER_DEPLOY: &str = "# [HOOK: afterDeploy]";

/// Generates the bash helpers every Cloud Build step sources.
pub struct ShellUtilsGenerator<'a, T: TemplateStore> {
    templates: &'a T,
    hooks: &'a ShellUtilsHooks,
}

impl<'a, T: TemplateStore> ShellUtilsGenerator<'a, T> {
    pub fn new(templates: &'a T, hooks: &'a ShellUtilsHooks) -> Self {
        Self { templates, hooks }
    }

    pub async fn render(&self, ctx: &HookContext) -> Result<String, GenerateError> {
        ctx.require_deploy_params()?;

        let template = self.templates.load(TemplateName::ShellUtils)?;
        let points = [
            HookPoint::new(
                "validateEnvironment",
                VALIDATE_ENVIRONMENT,
                self.hooks.validate_environment.as_ref(),
            ),
            HookPoint::new(
                "beforeDeploy",
                BEFORE_DEPLOY,
                self.hooks.before_deploy.as_ref(),
            ),
            HookPoint::new("afterDeploy", AFTER_DEPLOY, self.hooks.after_deploy.as_ref()),
        ];
        let replacements = collect_replacements(&points, ctx).await?;

        Ok(substitute(&template, &replacements))
    }
}
