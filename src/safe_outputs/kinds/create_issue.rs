use serde::Deserialize;

use super::{push_list, push_optional};
use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::{BaseSafeOutputConfig, SafeOutputKind};

/// `create-issue`: open new issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreateIssueConfig {
    #[serde(flatten)]
    pub base: BaseSafeOutputConfig,
    pub title_prefix: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
}

impl SafeOutputKind for CreateIssueConfig {
    const KEY: &'static str = "create-issue";
    const JOB: &'static str = "create_issue";
    const ENV_PREFIX: &'static str = "ISSUE";
    const FIELDS: &'static [&'static str] = &["title-prefix", "labels", "assignees"];

    fn base(&self) -> &BaseSafeOutputConfig {
        &self.base
    }

    fn permissions(&self) -> Permissions {
        Permissions::from_pairs(&[(Scope::Contents, Level::Read), (Scope::Issues, Level::Write)])
    }

    fn env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        push_optional(&mut env, "ISSUE_TITLE_PREFIX", self.title_prefix.as_ref());
        push_list(&mut env, "ISSUE_LABELS", &self.labels);
        push_list(&mut env, "ISSUE_ASSIGNEES", &self.assignees);
        env
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["issue_number", "issue_url"]
    }
}
