use serde::Deserialize;

use super::{push_list, push_optional, DEFAULT_IF_NO_CHANGES, DEFAULT_MAX_PATCH_SIZE};
use crate::expression::{pull_request_context, Condition};
use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::{validate_if_no_changes, BaseSafeOutputConfig, SafeOutputKind};

/// `push-to-pull-request-branch`: push the agent's patch onto an existing
/// pull request branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PushToPullRequestBranchConfig {
    #[serde(flatten)]
    pub base: BaseSafeOutputConfig,
    pub target: Option<String>,
    pub if_no_changes: Option<String>,
    /// Only push to pull requests whose title starts with this.
    pub title_prefix: Option<String>,
    /// Only push to pull requests carrying all of these labels.
    #[serde(default)]
    pub labels: Vec<String>,
    pub commit_title_suffix: Option<String>,
    pub max_patch_size: Option<u32>,
}

impl SafeOutputKind for PushToPullRequestBranchConfig {
    const KEY: &'static str = "push-to-pull-request-branch";
    const JOB: &'static str = "push_to_pull_request_branch";
    const ENV_PREFIX: &'static str = "PUSH";
    const FIELDS: &'static [&'static str] = &[
        "target",
        "if-no-changes",
        "title-prefix",
        "labels",
        "commit-title-suffix",
        "max-patch-size",
    ];
    const TARGETED: bool = true;

    fn base(&self) -> &BaseSafeOutputConfig {
        &self.base
    }

    fn permissions(&self) -> Permissions {
        Permissions::from_pairs(&[
            (Scope::Contents, Level::Write),
            (Scope::PullRequests, Level::Read),
            (Scope::Issues, Level::Read),
        ])
    }

    fn triggering_context(&self) -> Option<Condition> {
        Some(pull_request_context())
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self) -> Vec<(String, String)> {
        let mut env = vec![(
            "GH_AW_PUSH_IF_NO_CHANGES".to_string(),
            self.if_no_changes
                .as_deref()
                .unwrap_or(DEFAULT_IF_NO_CHANGES)
                .to_string(),
        )];
        push_optional(&mut env, "PR_TITLE_PREFIX", self.title_prefix.as_ref());
        push_list(&mut env, "PR_LABELS", &self.labels);
        push_optional(&mut env, "COMMIT_TITLE_SUFFIX", self.commit_title_suffix.as_ref());
        env.push((
            "GH_AW_MAX_PATCH_SIZE".to_string(),
            self.max_patch_size.unwrap_or(DEFAULT_MAX_PATCH_SIZE).to_string(),
        ));
        env
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["branch_name", "commit_sha", "push_url"]
    }

    fn writes_branch(&self) -> bool {
        true
    }

    fn validate(&self) -> crate::Result<()> {
        validate_if_no_changes(Self::KEY, self.if_no_changes.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safe_outputs::{build_job, JobContext, SafeOutputSettings};

    #[test]
    fn test_permissions() {
        assert_eq!(
            PushToPullRequestBranchConfig::default().permissions().render(),
            vec!["contents: write", "issues: read", "pull-requests: read"]
        );
    }

    #[test]
    fn test_job_outputs_and_context() {
        let config = PushToPullRequestBranchConfig {
            commit_title_suffix: Some(" [skip ci]".to_string()),
            ..Default::default()
        };
        let settings = SafeOutputSettings::default();
        let ctx = JobContext {
            workflow_name: "Fixer",
            command: None,
            settings: &settings,
        };
        let job = build_job(Some(&config), &ctx).unwrap();
        assert!(job.condition.unwrap().contains("github.event.issue.pull_request"));
        assert_eq!(
            job.outputs.keys().collect::<Vec<_>>(),
            vec!["branch_name", "commit_sha", "push_url"]
        );
        let env = &job.steps.last().unwrap().env;
        assert_eq!(env["GH_AW_PUSH_TARGET"], "triggering");
        assert_eq!(env["GH_AW_COMMIT_TITLE_SUFFIX"], " [skip ci]");
        assert_eq!(env["GH_AW_PUSH_IF_NO_CHANGES"], "warn");
    }
}
