//! One module per safe-output kind.

mod add_comment;
mod add_labels;
mod add_reviewer;
mod assign_to_agent;
mod close_issue;
mod create_discussion;
mod create_issue;
mod create_pull_request;
mod push_to_pull_request_branch;
mod update_project;

pub use add_comment::AddCommentConfig;
pub use add_labels::AddLabelsConfig;
pub use add_reviewer::AddReviewerConfig;
pub use assign_to_agent::AssignToAgentConfig;
pub use close_issue::CloseIssueConfig;
pub use create_discussion::CreateDiscussionConfig;
pub use create_issue::CreateIssueConfig;
pub use create_pull_request::CreatePullRequestConfig;
pub use push_to_pull_request_branch::PushToPullRequestBranchConfig;
pub use update_project::UpdateProjectConfig;

/// Patch size limit in KiB when none is configured.
pub(crate) const DEFAULT_MAX_PATCH_SIZE: u32 = 1024;

/// Policy when the agent produced no changes.
pub(crate) const DEFAULT_IF_NO_CHANGES: &str = "warn";

/// Push `GH_AW_<name>` when the value is set.
pub(crate) fn push_optional(env: &mut Vec<(String, String)>, name: &str, value: Option<&String>) {
    if let Some(value) = value {
        env.push((format!("GH_AW_{name}"), value.clone()));
    }
}

/// Push `GH_AW_<name>` as a comma-joined list when non-empty.
pub(crate) fn push_list(env: &mut Vec<(String, String)>, name: &str, values: &[String]) {
    if !values.is_empty() {
        env.push((format!("GH_AW_{name}"), values.join(",")));
    }
}
