use serde::Deserialize;

use crate::expression::{pull_request_context, Condition};
use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::builder::allowed_env;
use crate::safe_outputs::{BaseSafeOutputConfig, SafeOutputKind};

/// `add-reviewer`: request reviews on a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddReviewerConfig {
    #[serde(flatten)]
    pub base: BaseSafeOutputConfig,
    /// Reviewers the agent may request. Empty allows any.
    #[serde(default)]
    pub reviewers: Vec<String>,
    pub target: Option<String>,
}

impl SafeOutputKind for AddReviewerConfig {
    const KEY: &'static str = "add-reviewer";
    const JOB: &'static str = "add_reviewer";
    const ENV_PREFIX: &'static str = "REVIEWERS";
    const FIELDS: &'static [&'static str] = &["reviewers", "target"];
    const DEFAULT_MAX: u32 = 3;
    const TARGETED: bool = true;

    fn base(&self) -> &BaseSafeOutputConfig {
        &self.base
    }

    fn permissions(&self) -> Permissions {
        Permissions::from_pairs(&[
            (Scope::Contents, Level::Read),
            (Scope::PullRequests, Level::Write),
        ])
    }

    fn triggering_context(&self) -> Option<Condition> {
        Some(pull_request_context())
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self) -> Vec<(String, String)> {
        vec![allowed_env(Self::ENV_PREFIX, &self.reviewers)]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["reviewers_added"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reviewers_env() {
        let config: AddReviewerConfig =
            serde_json::from_value(json!({ "reviewers": ["octocat", "copilot"], "max": 2 })).unwrap();
        assert_eq!(config.max(), 2);
        assert_eq!(
            config.env(),
            vec![("GH_AW_REVIEWERS_ALLOWED".to_string(), "octocat,copilot".to_string())]
        );
        assert_eq!(AddReviewerConfig::default().max(), 3);
    }
}
