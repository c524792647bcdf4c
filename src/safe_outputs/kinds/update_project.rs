use serde::Deserialize;

use super::push_optional;
use crate::error::WardenError;
use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::token::TokenFallback;
use crate::safe_outputs::{BaseSafeOutputConfig, SafeOutputKind};

/// `update-project`: add items to a project board and set their fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpdateProjectConfig {
    #[serde(flatten)]
    pub base: BaseSafeOutputConfig,
    /// Default project URL when the agent does not name one.
    pub project: Option<String>,
}

impl SafeOutputKind for UpdateProjectConfig {
    const KEY: &'static str = "update-project";
    const JOB: &'static str = "update_project";
    const ENV_PREFIX: &'static str = "PROJECT";
    const FIELDS: &'static [&'static str] = &["project"];
    const DEFAULT_MAX: u32 = 10;

    fn base(&self) -> &BaseSafeOutputConfig {
        &self.base
    }

    fn permissions(&self) -> Permissions {
        Permissions::from_pairs(&[
            (Scope::Contents, Level::Read),
            (Scope::OrganizationProjects, Level::Write),
        ])
    }

    fn token_fallback(&self) -> TokenFallback {
        TokenFallback::Project
    }

    fn env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        push_optional(&mut env, "PROJECT_URL", self.project.as_ref());
        env
    }

    fn validate(&self) -> crate::Result<()> {
        if let Some(url) = &self.project {
            if !url.starts_with("https://") || !url.contains("/projects/") {
                return Err(WardenError::InvalidSafeOutput(
                    Self::KEY.to_string(),
                    format!("'project' must be a project URL like https://github.com/orgs/acme/projects/1, got '{url}'"),
                ));
            }
        }
        Ok(())
    }
}
