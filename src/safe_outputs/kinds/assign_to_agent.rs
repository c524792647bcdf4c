use serde::Deserialize;

use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::token::TokenFallback;
use crate::safe_outputs::{BaseSafeOutputConfig, SafeOutputKind};

const DEFAULT_AGENT: &str = "copilot";

/// `assign-to-agent`: hand an issue or pull request to a coding agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AssignToAgentConfig {
    #[serde(flatten)]
    pub base: BaseSafeOutputConfig,
    /// Agent assigned when the request does not name one.
    pub name: Option<String>,
    pub target: Option<String>,
}

impl SafeOutputKind for AssignToAgentConfig {
    const KEY: &'static str = "assign-to-agent";
    const JOB: &'static str = "assign_to_agent";
    const ENV_PREFIX: &'static str = "AGENT";
    const FIELDS: &'static [&'static str] = &["name", "target"];
    const TARGETED: bool = true;

    fn base(&self) -> &BaseSafeOutputConfig {
        &self.base
    }

    fn permissions(&self) -> Permissions {
        Permissions::from_pairs(&[
            (Scope::Actions, Level::Write),
            (Scope::Contents, Level::Write),
            (Scope::Issues, Level::Write),
            (Scope::PullRequests, Level::Write),
        ])
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn token_fallback(&self) -> TokenFallback {
        TokenFallback::Agent
    }

    fn env(&self) -> Vec<(String, String)> {
        vec![(
            "GH_AW_AGENT_DEFAULT".to_string(),
            self.name.as_deref().unwrap_or(DEFAULT_AGENT).to_string(),
        )]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["assigned_agents"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safe_outputs::{build_job, JobContext, SafeOutputSettings};

    #[test]
    fn test_exact_permissions() {
        assert_eq!(
            AssignToAgentConfig::default().permissions().render(),
            vec![
                "actions: write",
                "contents: write",
                "issues: write",
                "pull-requests: write"
            ]
        );
    }

    #[test]
    fn test_agent_token_chain_and_env() {
        let settings = SafeOutputSettings::default();
        let ctx = JobContext {
            workflow_name: "Dispatcher",
            command: None,
            settings: &settings,
        };
        let job = build_job(Some(&AssignToAgentConfig::default()), &ctx).unwrap();
        let script = job.steps.last().unwrap();
        assert!(script.with["github-token"].starts_with("${{ secrets.GH_AW_AGENT_TOKEN"));
        assert_eq!(script.env["GH_AW_AGENT_DEFAULT"], "copilot");
        assert_eq!(script.env["GH_AW_AGENT_MAX_COUNT"], "1");
        assert_eq!(script.env["GH_AW_AGENT_TARGET"], "triggering");
        assert!(!job.condition.unwrap().contains("github.event.issue.number"));
    }
}
