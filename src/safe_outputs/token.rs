//! Credential resolution for safe-output jobs.
//!
//! Priority: per-kind `github-token`, then the workflow-level
//! `safe-outputs.github-token`, then a fallback expression that prefers the
//! shared token secret and ends at the platform default.

/// Runtime fallback chain used when no token is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFallback {
    /// Shared workflow token, else the platform default.
    Standard,
    /// Agent-assignment token, else the standard chain.
    Agent,
    /// Project token; project APIs reject the platform default.
    Project,
}

impl TokenFallback {
    pub fn expression(self) -> &'static str {
        match self {
            TokenFallback::Standard => "${{ secrets.GH_AW_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}",
            TokenFallback::Agent => {
                "${{ secrets.GH_AW_AGENT_TOKEN || secrets.GH_AW_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}"
            }
            TokenFallback::Project => "${{ secrets.GH_AW_PROJECT_GITHUB_TOKEN }}",
        }
    }
}

/// Where a job's token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    PerKind(String),
    Workflow(String),
    Fallback(TokenFallback),
}

impl TokenSource {
    pub fn expression(&self) -> String {
        match self {
            TokenSource::PerKind(token) | TokenSource::Workflow(token) => token.clone(),
            TokenSource::Fallback(fallback) => fallback.expression().to_string(),
        }
    }
}

pub fn resolve_token(
    per_kind: Option<&str>,
    workflow: Option<&str>,
    fallback: TokenFallback,
) -> TokenSource {
    match (per_kind, workflow) {
        (Some(token), _) => TokenSource::PerKind(token.to_string()),
        (None, Some(token)) => TokenSource::Workflow(token.to_string()),
        (None, None) => TokenSource::Fallback(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_kind_wins() {
        let source = resolve_token(
            Some("${{ secrets.ISSUE_TOKEN }}"),
            Some("${{ secrets.WORKFLOW_TOKEN }}"),
            TokenFallback::Standard,
        );
        assert_eq!(source.expression(), "${{ secrets.ISSUE_TOKEN }}");
    }

    #[test]
    fn test_workflow_before_fallback() {
        let source = resolve_token(None, Some("${{ secrets.WORKFLOW_TOKEN }}"), TokenFallback::Agent);
        assert_eq!(source, TokenSource::Workflow("${{ secrets.WORKFLOW_TOKEN }}".to_string()));
    }

    #[test]
    fn test_fallback_chains() {
        assert_eq!(
            resolve_token(None, None, TokenFallback::Standard).expression(),
            "${{ secrets.GH_AW_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}"
        );
        let agent = resolve_token(None, None, TokenFallback::Agent).expression();
        assert!(agent.starts_with("${{ secrets.GH_AW_AGENT_TOKEN ||"));
        assert!(agent.ends_with("secrets.GITHUB_TOKEN }}"));
    }
}
