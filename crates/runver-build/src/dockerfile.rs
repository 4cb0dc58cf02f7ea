use runver_core::HookContext;
use runver_core::hooks::DockerfileHooks;

use crate::GenerateError;
use crate::template::{HookPoint, collect_replacements, substitute};
use crate::templates::{TemplateName, TemplateStore};

pub const ADDITIONAL_STAGES: &str = "# [HOOK: additionalStages]";
pub const AFTER_DEPS: &str = "# [HOOK: afterDeps]";
pub const BEFORE_BUILD: &str = "# [HOOK: beforeBuild]";
pub const ADDITIONAL_BUILD_ARGS: &str = "# [HOOK: additionalBuildArgs]";
pub const ADDITIONAL_ENV: &str = "# [HOOK: additionalEnv]";
pub const BEFORE_COPY: &str = "# [HOOK: beforeCopy]";
pub const ADDITIONAL_COPY: &str = "# [HOOK: additionalCopy]";

/// Generates the multi-stage Next.js standalone `Dockerfile`.
pub struct DockerfileGenerator<'a, T: TemplateStore> {
    templates: &'a T,
    hooks: &'a DockerfileHooks,
}

impl<'a, T: TemplateStore> DockerfileGenerator<'a, T> {
    pub fn new(templates: &'a T, hooks: &'a DockerfileHooks) -> Self {
        Self { templates, hooks }
    }

    pub async fn render(&self, ctx: &HookContext) -> Result<String, GenerateError> {
        ctx.require_deploy_params()?;

        let template = self.templates.load(TemplateName::Dockerfile)?;
        let hooks = self.hooks;
        let points = [
            HookPoint::new(
                "additionalStages",
                ADDITIONAL_STAGES,
                hooks.additional_stages.as_ref(),
            ),
            HookPoint::new("afterDeps", AFTER_DEPS, hooks.after_deps.as_ref()),
            HookPoint::new("beforeBuild", BEFORE_BUILD, hooks.before_build.as_ref()),
            HookPoint::new(
                "additionalBuildArgs",
                ADDITIONAL_BUILD_ARGS,
                hooks.additional_build_args.as_ref(),
            ),
            HookPoint::new(
                "additionalEnv",
                ADDITIONAL_ENV,
                hooks.additional_env.as_ref(),
            ),
            HookPoint::new("beforeCopy", BEFORE_COPY, hooks.before_copy.as_ref()),
            HookPoint::new(
                "additionalCopy",
                ADDITIONAL_COPY,
                hooks.additional_copy.as_ref(),
            ),
        ];
        let replacements = collect_replacements(&points, ctx).await?;

        Ok(substitute(&template, &replacements))
    }
}
