//! Marker-based hook substitution.
//!
//! A marker is a literal line such as `# [HOOK: beforeBuild]`. Substitution
//! inserts hook output on the line after the marker and keeps the marker
//! itself, so a regenerated artifact still shows where each hook landed.
//! The engine knows nothing about the target format.

use std::collections::BTreeMap;

use runver_core::HookContext;
use runver_core::hooks::FragmentHook;

use crate::GenerateError;

/// Marker → content to insert after it.
pub type Replacements = BTreeMap<String, String>;

/// One injection point declared by a generator.
pub struct HookPoint<'a> {
    /// Hook name used in errors and logs.
    pub name: &'static str,
    pub marker: &'static str,
    pub hook: Option<&'a FragmentHook>,
}

impl<'a> HookPoint<'a> {
    pub fn new(name: &'static str, marker: &'static str, hook: Option<&'a FragmentHook>) -> Self {
        Self { name, marker, hook }
    }
}

/// Insert each replacement after the first occurrence of its marker.
///
/// Markers missing from the template are ignored, and an empty replacement
/// leaves the template untouched.
///
/// ```
/// use runver_build::template::{substitute, Replacements};
///
/// let mut replacements = Replacements::new();
/// replacements.insert("# MARK".to_owned(), "X".to_owned());
/// assert_eq!(substitute("A\n# MARK\nB", &replacements), "A\n# MARK\nX\nB");
/// ```
pub fn substitute(template: &str, replacements: &Replacements) -> String {
    let mut content = template.to_owned();

    for (marker, replacement) in replacements {
        if replacement.is_empty() {
            continue;
        }
        let Some(pos) = content.find(marker.as_str()) else {
            tracing::debug!(marker = %marker, "marker not in template; skipping");
            continue;
        };
        let end = pos + marker.len();
        content.insert_str(end, &format!("\n{replacement}"));
    }

    content
}

/// Invoke every declared hook with the context and collect their output.
///
/// Absent hooks contribute empty content. The first hook error aborts
/// collection.
pub async fn collect_replacements(
    points: &[HookPoint<'_>],
    ctx: &HookContext,
) -> Result<Replacements, GenerateError> {
    let mut replacements = Replacements::new();

    for point in points {
        let content = match point.hook {
            Some(hook) => {
                tracing::debug!(hook = point.name, "running hook");
                hook(ctx).await.map_err(|e| GenerateError::Hook {
                    hook: point.name,
                    source: e,
                })?
            }
            None => String::new(),
        };
        replacements.insert(point.marker.to_owned(), content);
    }

    Ok(replacements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use runver_core::HookError;
    use runver_core::hooks::{fragment_hook, static_fragment};

    fn one(marker: &str, content: &str) -> Replacements {
        let mut r = Replacements::new();
        r.insert(marker.to_owned(), content.to_owned());
        r
    }

    #[test]
    fn inserts_after_marker_and_keeps_marker() {
        let out = substitute("A\n# MARK\nB", &one("# MARK", "X"));
        assert_eq!(out, "A\n# MARK\nX\nB");
    }

    #[test]
    fn multi_line_content_is_inserted_verbatim() {
        let out = substitute("A\n# MARK\nB", &one("# MARK", "X\nY"));
        assert_eq!(out, "A\n# MARK\nX\nY\nB");
    }

    #[test]
    fn empty_content_leaves_template_unchanged() {
        let template = "A\n# MARK\nB\n";
        assert_eq!(substitute(template, &one("# MARK", "")), template);
    }

    #[test]
    fn no_replacements_is_byte_identical() {
        let template = "line 1\n  # [HOOK: x]\nline 3";
        assert_eq!(substitute(template, &Replacements::new()), template);
    }

    #[test]
    fn missing_marker_is_ignored() {
        let template = "A\nB";
        assert_eq!(substitute(template, &one("# NOPE", "X")), template);
    }

    #[test]
    fn only_first_occurrence_is_expanded() {
        let out = substitute("# M\n# M\n", &one("# M", "X"));
        assert_eq!(out, "# M\nX\n# M\n");
    }

    #[test]
    fn marker_at_end_of_text() {
        assert_eq!(substitute("A\n# M", &one("# M", "X")), "A\n# M\nX");
    }

    #[tokio::test]
    async fn collect_defaults_absent_hooks_to_empty() {
        let hook = static_fragment("RUN echo hi");
        let points = [
            HookPoint::new("present", "# [HOOK: present]", Some(&hook)),
            HookPoint::new("absent", "# [HOOK: absent]", None),
        ];
        let replacements = collect_replacements(&points, &HookContext::default())
            .await
            .unwrap();

        assert_eq!(replacements["# [HOOK: present]"], "RUN echo hi");
        assert_eq!(replacements["# [HOOK: absent]"], "");
    }

    #[tokio::test]
    async fn collect_passes_context() {
        let hook = fragment_hook(|ctx: HookContext| async move { Ok(ctx.version) });
        let points = [HookPoint::new("v", "# V", Some(&hook))];
        let ctx = HookContext::new("p", "feature-x", "r", "repo");

        let replacements = collect_replacements(&points, &ctx).await.unwrap();
        assert_eq!(replacements["# V"], "feature-x");
    }

    #[tokio::test]
    async fn collect_fails_fast_on_hook_error() {
        let failing = fragment_hook(|_| async { Err(HookError::new("boom")) });
        let points = [HookPoint::new("failing", "# F", Some(&failing))];

        let err = collect_replacements(&points, &HookContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Hook { hook: "failing", .. }));
        assert!(err.to_string().contains("failing"));
    }
}
