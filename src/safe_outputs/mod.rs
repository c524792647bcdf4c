//! Safe outputs: auditable side-effects the agent requests but a dedicated
//! downstream job performs.
//!
//! Each kind lives in its own module under [`kinds`] and implements
//! [`SafeOutputKind`]. [`builder::build_job`] turns any kind's configuration
//! into a [`Job`](crate::job::Job).

pub mod builder;
pub mod kinds;
pub mod token;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::WardenError;
use crate::expression::Condition;
use crate::job::DEFAULT_RUNNER;
use crate::permissions::Permissions;
use kinds::{
    AddCommentConfig, AddLabelsConfig, AddReviewerConfig, AssignToAgentConfig, CloseIssueConfig,
    CreateDiscussionConfig, CreateIssueConfig, CreatePullRequestConfig,
    PushToPullRequestBranchConfig, UpdateProjectConfig,
};
use token::TokenFallback;

pub use builder::{build_job, JobContext};

/// Keys every kind accepts.
pub const BASE_KEYS: &[&str] = &["max", "min", "github-token", "target-repo"];

/// Workflow-level keys under `safe-outputs`.
const SETTINGS_KEYS: &[&str] = &[
    "github-token",
    "staged",
    "env",
    "allowed-domains",
    "threat-detection",
    "runs-on",
];

/// Shape shared by every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BaseSafeOutputConfig {
    pub max: Option<u32>,
    #[serde(default)]
    pub min: u32,
    pub github_token: Option<String>,
    pub target_repo: Option<String>,
}

/// A side-effect kind with its own job.
pub trait SafeOutputKind: DeserializeOwned {
    /// Declaration key, e.g. `create-issue`.
    const KEY: &'static str;
    /// Job name and output type, e.g. `create_issue`.
    const JOB: &'static str;
    /// Env var stem after `GH_AW_`, e.g. `ISSUE`.
    const ENV_PREFIX: &'static str;
    /// Keys accepted in addition to [`BASE_KEYS`].
    const FIELDS: &'static [&'static str];
    const DEFAULT_MAX: u32 = 1;
    /// The kind acts on a target item and honors a `target` field.
    const TARGETED: bool = false;

    fn base(&self) -> &BaseSafeOutputConfig;

    /// Minimal permission set for the API calls the script makes.
    fn permissions(&self) -> Permissions;

    /// Event context required when acting on the triggering item.
    fn triggering_context(&self) -> Option<Condition> {
        None
    }

    fn target(&self) -> Option<&str> {
        None
    }

    fn token_fallback(&self) -> TokenFallback {
        TokenFallback::Standard
    }

    /// Kind-specific env vars as full names.
    fn env(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Outputs the script step declares.
    fn outputs(&self) -> &'static [&'static str] {
        &[]
    }

    /// The job pushes commits and needs the patch, a checkout, and git credentials.
    fn writes_branch(&self) -> bool {
        false
    }

    /// Extra checks beyond what deserialization enforces.
    fn validate(&self) -> crate::Result<()> {
        Ok(())
    }

    fn max(&self) -> u32 {
        self.base().max.unwrap_or(Self::DEFAULT_MAX)
    }
}

/// Workflow-level settings under `safe-outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SafeOutputSettings {
    pub github_token: Option<String>,
    #[serde(default)]
    pub staged: bool,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    #[serde(default)]
    pub threat_detection: bool,
    #[serde(default = "default_runs_on")]
    pub runs_on: String,
}

impl Default for SafeOutputSettings {
    fn default() -> Self {
        SafeOutputSettings {
            github_token: None,
            staged: false,
            env: BTreeMap::new(),
            allowed_domains: Vec::new(),
            threat_detection: false,
            runs_on: default_runs_on(),
        }
    }
}

fn default_runs_on() -> String {
    DEFAULT_RUNNER.to_string()
}

/// Parsed `safe-outputs` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeOutputsConfig {
    pub settings: SafeOutputSettings,
    pub create_issue: Option<CreateIssueConfig>,
    pub create_discussion: Option<CreateDiscussionConfig>,
    pub add_comment: Option<AddCommentConfig>,
    pub add_labels: Option<AddLabelsConfig>,
    pub close_issue: Option<CloseIssueConfig>,
    pub create_pull_request: Option<CreatePullRequestConfig>,
    pub push_to_pull_request_branch: Option<PushToPullRequestBranchConfig>,
    pub add_reviewer: Option<AddReviewerConfig>,
    pub update_project: Option<UpdateProjectConfig>,
    pub assign_to_agent: Option<AssignToAgentConfig>,
}

/// Every kind key, sorted.
pub fn known_kinds() -> Vec<&'static str> {
    let mut keys = vec![
        CreateIssueConfig::KEY,
        CreateDiscussionConfig::KEY,
        AddCommentConfig::KEY,
        AddLabelsConfig::KEY,
        CloseIssueConfig::KEY,
        CreatePullRequestConfig::KEY,
        PushToPullRequestBranchConfig::KEY,
        AddReviewerConfig::KEY,
        UpdateProjectConfig::KEY,
        AssignToAgentConfig::KEY,
    ];
    keys.sort_unstable();
    keys
}

impl SafeOutputsConfig {
    /// Parse the raw `safe-outputs` mapping.
    pub fn from_value(raw: &Value) -> crate::Result<Self> {
        let Some(map) = raw.as_object() else {
            return Err(WardenError::InvalidSafeOutput(
                "safe-outputs".to_string(),
                "expected a mapping".to_string(),
            ));
        };

        // 1. Reject unknown top-level keys
        let kinds = known_kinds();
        for key in map.keys() {
            if !kinds.contains(&key.as_str()) && !SETTINGS_KEYS.contains(&key.as_str()) {
                return Err(WardenError::InvalidSafeOutput(
                    key.clone(),
                    format!(
                        "unknown safe output; valid keys are: {}, {}",
                        kinds.join(", "),
                        SETTINGS_KEYS.join(", ")
                    ),
                ));
            }
        }

        // 2. Workflow-level settings
        let settings_map: Map<String, Value> = map
            .iter()
            .filter(|(k, _)| SETTINGS_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let settings: SafeOutputSettings = serde_json::from_value(Value::Object(settings_map))
            .map_err(|e| WardenError::InvalidSafeOutput("safe-outputs".to_string(), e.to_string()))?;

        // 3. Each declared kind
        Ok(SafeOutputsConfig {
            settings,
            create_issue: parse_kind(map)?,
            create_discussion: parse_kind(map)?,
            add_comment: parse_kind(map)?,
            add_labels: parse_kind(map)?,
            close_issue: parse_kind(map)?,
            create_pull_request: parse_kind(map)?,
            push_to_pull_request_branch: parse_kind(map)?,
            add_reviewer: parse_kind(map)?,
            update_project: parse_kind(map)?,
            assign_to_agent: parse_kind(map)?,
        })
    }

    /// True when no kind is configured.
    pub fn is_empty(&self) -> bool {
        self.create_issue.is_none()
            && self.create_discussion.is_none()
            && self.add_comment.is_none()
            && self.add_labels.is_none()
            && self.close_issue.is_none()
            && self.create_pull_request.is_none()
            && self.push_to_pull_request_branch.is_none()
            && self.add_reviewer.is_none()
            && self.update_project.is_none()
            && self.assign_to_agent.is_none()
    }

    /// Output types the agent may emit, sorted.
    pub fn enabled_jobs(&self) -> Vec<&'static str> {
        let mut jobs = Vec::new();
        let mut push = |enabled: bool, job: &'static str| {
            if enabled {
                jobs.push(job);
            }
        };
        push(self.create_issue.is_some(), CreateIssueConfig::JOB);
        push(self.create_discussion.is_some(), CreateDiscussionConfig::JOB);
        push(self.add_comment.is_some(), AddCommentConfig::JOB);
        push(self.add_labels.is_some(), AddLabelsConfig::JOB);
        push(self.close_issue.is_some(), CloseIssueConfig::JOB);
        push(self.create_pull_request.is_some(), CreatePullRequestConfig::JOB);
        push(
            self.push_to_pull_request_branch.is_some(),
            PushToPullRequestBranchConfig::JOB,
        );
        push(self.add_reviewer.is_some(), AddReviewerConfig::JOB);
        push(self.update_project.is_some(), UpdateProjectConfig::JOB);
        push(self.assign_to_agent.is_some(), AssignToAgentConfig::JOB);
        jobs.sort_unstable();
        jobs
    }
}

/// Parse one kind if its key is present. `null` means all defaults.
fn parse_kind<K: SafeOutputKind>(map: &Map<String, Value>) -> crate::Result<Option<K>> {
    let Some(raw) = map.get(K::KEY) else {
        return Ok(None);
    };
    let body = match raw {
        Value::Null => Map::new(),
        Value::Object(body) => body.clone(),
        _ => {
            return Err(WardenError::InvalidSafeOutput(
                K::KEY.to_string(),
                "expected a mapping".to_string(),
            ));
        }
    };

    let mut unknown: Vec<&String> = body
        .keys()
        .filter(|k| !BASE_KEYS.contains(&k.as_str()) && !K::FIELDS.contains(&k.as_str()))
        .collect();
    unknown.sort();
    if let Some(key) = unknown.first() {
        let mut valid: Vec<&str> = BASE_KEYS.iter().chain(K::FIELDS).copied().collect();
        valid.sort_unstable();
        return Err(WardenError::InvalidSafeOutput(
            K::KEY.to_string(),
            format!("unknown property '{key}'; valid properties are: {}", valid.join(", ")),
        ));
    }

    let config: K = serde_json::from_value(Value::Object(body))
        .map_err(|e| WardenError::InvalidSafeOutput(K::KEY.to_string(), e.to_string()))?;
    validate_base::<K>(config.base())?;
    config.validate()?;
    tracing::debug!(kind = K::KEY, "parsed safe output configuration");
    Ok(Some(config))
}

fn validate_base<K: SafeOutputKind>(base: &BaseSafeOutputConfig) -> crate::Result<()> {
    let invalid = |msg: String| WardenError::InvalidSafeOutput(K::KEY.to_string(), msg);

    let max = base.max.unwrap_or(K::DEFAULT_MAX);
    if max == 0 {
        return Err(invalid("'max' must be at least 1".to_string()));
    }
    if base.min > max {
        return Err(invalid(format!(
            "'min' ({}) cannot exceed 'max' ({max})",
            base.min
        )));
    }
    if let Some(repo) = &base.target_repo {
        if repo == "*" {
            return Err(invalid(
                "'target-repo' cannot be '*'; name a single repository as owner/repo".to_string(),
            ));
        }
        let valid = matches!(repo.split_once('/'), Some((owner, name))
            if !owner.is_empty() && !name.is_empty() && !name.contains('/'));
        if !valid {
            return Err(invalid(format!(
                "'target-repo' must be in owner/repo form, got '{repo}'"
            )));
        }
    }
    Ok(())
}

/// Validate an `if-no-changes` policy value.
pub(crate) fn validate_if_no_changes(kind: &str, value: Option<&str>) -> crate::Result<()> {
    match value {
        None | Some("warn") | Some("error") | Some("ignore") => Ok(()),
        Some(other) => Err(WardenError::InvalidSafeOutput(
            kind.to_string(),
            format!("'if-no-changes' must be one of warn, error, ignore; got '{other}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value) -> crate::Result<SafeOutputsConfig> {
        SafeOutputsConfig::from_value(&raw)
    }

    #[test]
    fn test_null_kind_uses_defaults() {
        let config = parse(json!({ "create-issue": null })).unwrap();
        let issue = config.create_issue.unwrap();
        assert_eq!(issue.max(), 1);
        assert_eq!(issue.base().min, 0);
        assert!(config.add_comment.is_none());
    }

    #[test]
    fn test_settings() {
        let config = parse(json!({
            "staged": true,
            "github-token": "${{ secrets.BOT }}",
            "env": { "TEAM": "core" },
            "add-comment": {}
        }))
        .unwrap();
        assert!(config.settings.staged);
        assert_eq!(config.settings.github_token.as_deref(), Some("${{ secrets.BOT }}"));
        assert_eq!(config.settings.env["TEAM"], "core");
        assert_eq!(config.settings.runs_on, "ubuntu-latest");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = parse(json!({ "create-isue": {} })).unwrap_err();
        assert!(matches!(err, WardenError::InvalidSafeOutput(ref k, ref msg)
            if k == "create-isue" && msg.contains("create-issue")));
    }

    #[test]
    fn test_unknown_kind_property_rejected() {
        let err = parse(json!({ "create-issue": { "title_prefix": "[bot] " } })).unwrap_err();
        assert!(matches!(err, WardenError::InvalidSafeOutput(ref k, ref msg)
            if k == "create-issue" && msg.contains("title-prefix")));
    }

    #[test]
    fn test_wildcard_target_repo_rejected() {
        let err = parse(json!({ "create-issue": { "target-repo": "*" } })).unwrap_err();
        assert!(matches!(err, WardenError::InvalidSafeOutput(_, ref msg) if msg.contains("cannot be '*'")));

        let err = parse(json!({ "create-issue": { "target-repo": "just-a-name" } })).unwrap_err();
        assert!(matches!(err, WardenError::InvalidSafeOutput(_, ref msg) if msg.contains("owner/repo")));

        assert!(parse(json!({ "create-issue": { "target-repo": "acme/infra" } })).is_ok());
    }

    #[test]
    fn test_min_cannot_exceed_max() {
        let err = parse(json!({ "add-labels": { "min": 5, "max": 2 } })).unwrap_err();
        assert!(matches!(err, WardenError::InvalidSafeOutput(ref k, _) if k == "add-labels"));
        let err = parse(json!({ "add-labels": { "max": 0 } })).unwrap_err();
        assert!(matches!(err, WardenError::InvalidSafeOutput(_, ref msg) if msg.contains("at least 1")));
    }

    #[test]
    fn test_enabled_jobs_sorted() {
        let config = parse(json!({ "update-project": {}, "add-comment": null, "create-issue": {} })).unwrap();
        assert_eq!(
            config.enabled_jobs(),
            vec!["add_comment", "create_issue", "update_project"]
        );
        assert!(!config.is_empty());
        assert!(SafeOutputsConfig::default().is_empty());
    }

    #[test]
    fn test_if_no_changes_values() {
        assert!(validate_if_no_changes("x", None).is_ok());
        assert!(validate_if_no_changes("x", Some("ignore")).is_ok());
        assert!(validate_if_no_changes("x", Some("skip")).is_err());
    }
}
