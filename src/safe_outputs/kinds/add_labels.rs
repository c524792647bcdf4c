use serde::Deserialize;

use crate::expression::{issue_or_pr_context, Condition};
use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::builder::allowed_env;
use crate::safe_outputs::{BaseSafeOutputConfig, SafeOutputKind};

/// `add-labels`: label the target issue or pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddLabelsConfig {
    #[serde(flatten)]
    pub base: BaseSafeOutputConfig,
    /// Labels the agent may apply. Empty allows any.
    #[serde(default)]
    pub allowed: Vec<String>,
    pub target: Option<String>,
}

impl SafeOutputKind for AddLabelsConfig {
    const KEY: &'static str = "add-labels";
    const JOB: &'static str = "add_labels";
    const ENV_PREFIX: &'static str = "LABELS";
    const FIELDS: &'static [&'static str] = &["allowed", "target"];
    const DEFAULT_MAX: u32 = 3;
    const TARGETED: bool = true;

    fn base(&self) -> &BaseSafeOutputConfig {
        &self.base
    }

    fn permissions(&self) -> Permissions {
        Permissions::from_pairs(&[
            (Scope::Contents, Level::Read),
            (Scope::Issues, Level::Write),
            (Scope::PullRequests, Level::Write),
        ])
    }

    fn triggering_context(&self) -> Option<Condition> {
        Some(issue_or_pr_context())
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self) -> Vec<(String, String)> {
        vec![allowed_env(Self::ENV_PREFIX, &self.allowed)]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["labels_added"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_max_is_three() {
        assert_eq!(AddLabelsConfig::default().max(), 3);
    }

    #[test]
    fn test_allowed_env_always_present() {
        assert_eq!(
            AddLabelsConfig::default().env(),
            vec![("GH_AW_LABELS_ALLOWED".to_string(), String::new())]
        );
        let config: AddLabelsConfig =
            serde_json::from_value(json!({ "allowed": ["bug", "enhancement"] })).unwrap();
        assert_eq!(config.env()[0].1, "bug,enhancement");
    }
}
