use serde::Deserialize;

use super::push_optional;
use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::{BaseSafeOutputConfig, SafeOutputKind};

/// `create-discussion`: open new discussions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreateDiscussionConfig {
    #[serde(flatten)]
    pub base: BaseSafeOutputConfig,
    pub title_prefix: Option<String>,
    /// Category name, slug, or node id.
    pub category: Option<String>,
}

impl SafeOutputKind for CreateDiscussionConfig {
    const KEY: &'static str = "create-discussion";
    const JOB: &'static str = "create_discussion";
    const ENV_PREFIX: &'static str = "DISCUSSION";
    const FIELDS: &'static [&'static str] = &["title-prefix", "category"];

    fn base(&self) -> &BaseSafeOutputConfig {
        &self.base
    }

    fn permissions(&self) -> Permissions {
        Permissions::from_pairs(&[
            (Scope::Contents, Level::Read),
            (Scope::Discussions, Level::Write),
        ])
    }

    fn env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        push_optional(&mut env, "DISCUSSION_TITLE_PREFIX", self.title_prefix.as_ref());
        push_optional(&mut env, "DISCUSSION_CATEGORY", self.category.as_ref());
        env
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["discussion_number", "discussion_url"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_env() {
        let config: CreateDiscussionConfig =
            serde_json::from_value(json!({ "category": "announcements" })).unwrap();
        assert_eq!(
            config.env(),
            vec![("GH_AW_DISCUSSION_CATEGORY".to_string(), "announcements".to_string())]
        );
        assert_eq!(config.permissions().get(Scope::Discussions), Some(Level::Write));
        assert_eq!(config.permissions().get(Scope::Issues), None);
    }
}
