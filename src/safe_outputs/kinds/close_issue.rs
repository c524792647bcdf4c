use serde::Deserialize;

use super::{push_list, push_optional};
use crate::expression::{issue_context, Condition};
use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::{BaseSafeOutputConfig, SafeOutputKind};

/// `close-issue`: close issues that match the required filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CloseIssueConfig {
    #[serde(flatten)]
    pub base: BaseSafeOutputConfig,
    /// The issue must carry at least one of these labels.
    #[serde(default)]
    pub required_labels: Vec<String>,
    pub required_title_prefix: Option<String>,
    pub target: Option<String>,
}

impl SafeOutputKind for CloseIssueConfig {
    const KEY: &'static str = "close-issue";
    const JOB: &'static str = "close_issue";
    const ENV_PREFIX: &'static str = "CLOSE_ISSUE";
    const FIELDS: &'static [&'static str] = &["required-labels", "required-title-prefix", "target"];
    const TARGETED: bool = true;

    fn base(&self) -> &BaseSafeOutputConfig {
        &self.base
    }

    fn permissions(&self) -> Permissions {
        Permissions::from_pairs(&[(Scope::Contents, Level::Read), (Scope::Issues, Level::Write)])
    }

    fn triggering_context(&self) -> Option<Condition> {
        Some(issue_context())
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        push_list(&mut env, "CLOSE_ISSUE_REQUIRED_LABELS", &self.required_labels);
        push_optional(
            &mut env,
            "CLOSE_ISSUE_REQUIRED_TITLE_PREFIX",
            self.required_title_prefix.as_ref(),
        );
        env
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["issue_number", "issue_url", "comment_url"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_filters() {
        let config: CloseIssueConfig = serde_json::from_value(json!({
            "required-labels": ["stale"],
            "required-title-prefix": "[bot]",
            "target": "*"
        }))
        .unwrap();
        assert_eq!(config.target(), Some("*"));
        assert_eq!(
            config.env(),
            vec![
                ("GH_AW_CLOSE_ISSUE_REQUIRED_LABELS".to_string(), "stale".to_string()),
                ("GH_AW_CLOSE_ISSUE_REQUIRED_TITLE_PREFIX".to_string(), "[bot]".to_string()),
            ]
        );
    }
}
