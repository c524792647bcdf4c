use serde::Deserialize;

use crate::expression::{issue_pr_or_discussion_context, Condition};
use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::{BaseSafeOutputConfig, SafeOutputKind};

/// `add-comment`: comment on an issue, pull request, or discussion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddCommentConfig {
    #[serde(flatten)]
    pub base: BaseSafeOutputConfig,
    /// `triggering` (default), `*`, or an explicit number.
    pub target: Option<String>,
}

impl SafeOutputKind for AddCommentConfig {
    const KEY: &'static str = "add-comment";
    const JOB: &'static str = "add_comment";
    const ENV_PREFIX: &'static str = "COMMENT";
    const FIELDS: &'static [&'static str] = &["target"];
    const TARGETED: bool = true;

    fn base(&self) -> &BaseSafeOutputConfig {
        &self.base
    }

    fn permissions(&self) -> Permissions {
        Permissions::from_pairs(&[
            (Scope::Contents, Level::Read),
            (Scope::Issues, Level::Write),
            (Scope::PullRequests, Level::Write),
            (Scope::Discussions, Level::Write),
        ])
    }

    fn triggering_context(&self) -> Option<Condition> {
        Some(issue_pr_or_discussion_context())
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["comment_id", "comment_url"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_cover_all_targets() {
        let rendered = AddCommentConfig::default().permissions().render();
        assert_eq!(
            rendered,
            vec![
                "contents: read",
                "discussions: write",
                "issues: write",
                "pull-requests: write"
            ]
        );
    }

    #[test]
    fn test_context_includes_discussions() {
        let context = AddCommentConfig::default().triggering_context().unwrap().render();
        assert!(context.contains("github.event.discussion.number"));
    }
}
