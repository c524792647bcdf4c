use serde::Deserialize;

use super::{push_list, push_optional, DEFAULT_IF_NO_CHANGES, DEFAULT_MAX_PATCH_SIZE};
use crate::error::WardenError;
use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::{validate_if_no_changes, BaseSafeOutputConfig, SafeOutputKind};

/// `create-pull-request`: open a pull request from the agent's patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreatePullRequestConfig {
    #[serde(flatten)]
    pub base: BaseSafeOutputConfig,
    pub title_prefix: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Defaults to a draft.
    pub draft: Option<bool>,
    pub if_no_changes: Option<String>,
    /// Limit in KiB.
    pub max_patch_size: Option<u32>,
}

impl SafeOutputKind for CreatePullRequestConfig {
    const KEY: &'static str = "create-pull-request";
    const JOB: &'static str = "create_pull_request";
    const ENV_PREFIX: &'static str = "PR";
    const FIELDS: &'static [&'static str] = &[
        "title-prefix",
        "labels",
        "draft",
        "if-no-changes",
        "max-patch-size",
    ];

    fn base(&self) -> &BaseSafeOutputConfig {
        &self.base
    }

    fn permissions(&self) -> Permissions {
        Permissions::from_pairs(&[
            (Scope::Contents, Level::Write),
            (Scope::Issues, Level::Write),
            (Scope::PullRequests, Level::Write),
        ])
    }

    fn env(&self) -> Vec<(String, String)> {
        let mut env = vec![(
            "GH_AW_BASE_BRANCH".to_string(),
            "${{ github.ref_name }}".to_string(),
        )];
        push_optional(&mut env, "PR_TITLE_PREFIX", self.title_prefix.as_ref());
        push_list(&mut env, "PR_LABELS", &self.labels);
        env.push((
            "GH_AW_PR_DRAFT".to_string(),
            self.draft.unwrap_or(true).to_string(),
        ));
        env.push((
            "GH_AW_PR_IF_NO_CHANGES".to_string(),
            self.if_no_changes
                .as_deref()
                .unwrap_or(DEFAULT_IF_NO_CHANGES)
                .to_string(),
        ));
        env.push((
            "GH_AW_MAX_PATCH_SIZE".to_string(),
            self.max_patch_size.unwrap_or(DEFAULT_MAX_PATCH_SIZE).to_string(),
        ));
        env
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["pull_request_number", "pull_request_url", "branch_name"]
    }

    fn writes_branch(&self) -> bool {
        true
    }

    fn validate(&self) -> crate::Result<()> {
        validate_if_no_changes(Self::KEY, self.if_no_changes.as_deref())?;
        if self.max_patch_size == Some(0) {
            return Err(WardenError::InvalidSafeOutput(
                Self::KEY.to_string(),
                "'max-patch-size' must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
