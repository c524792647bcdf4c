//! Job permission sets.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

/// Token scope a job can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Actions,
    Attestations,
    Checks,
    Contents,
    Deployments,
    Discussions,
    IdToken,
    Issues,
    Models,
    Packages,
    Pages,
    PullRequests,
    RepositoryProjects,
    OrganizationProjects,
    SecurityEvents,
    Statuses,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Actions => "actions",
            Scope::Attestations => "attestations",
            Scope::Checks => "checks",
            Scope::Contents => "contents",
            Scope::Deployments => "deployments",
            Scope::Discussions => "discussions",
            Scope::IdToken => "id-token",
            Scope::Issues => "issues",
            Scope::Models => "models",
            Scope::Packages => "packages",
            Scope::Pages => "pages",
            Scope::PullRequests => "pull-requests",
            Scope::RepositoryProjects => "repository-projects",
            Scope::OrganizationProjects => "organization-projects",
            Scope::SecurityEvents => "security-events",
            Scope::Statuses => "statuses",
        }
    }

    /// Scopes granted through a token rather than job permissions.
    fn is_token_only(self) -> bool {
        matches!(self, Scope::OrganizationProjects)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Read,
    Write,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Read => write!(f, "read"),
            Level::Write => write!(f, "write"),
        }
    }
}

/// Scope → level. Absent scopes are `none`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    grants: BTreeMap<Scope, Level>,
}

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(scope, level)` pairs, merging duplicates.
    pub fn from_pairs(pairs: &[(Scope, Level)]) -> Self {
        let mut perms = Self::new();
        for (scope, level) in pairs {
            perms.grant(*scope, *level);
        }
        perms
    }

    /// Grant a level, keeping the higher one if already present.
    pub fn grant(&mut self, scope: Scope, level: Level) {
        self.grants
            .entry(scope)
            .and_modify(|existing| *existing = (*existing).max(level))
            .or_insert(level);
    }

    pub fn merge(&mut self, other: &Permissions) {
        for (scope, level) in &other.grants {
            self.grant(*scope, *level);
        }
    }

    pub fn get(&self, scope: Scope) -> Option<Level> {
        self.grants.get(&scope).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Scopes in declaration order, paired with their level.
    pub fn iter(&self) -> impl Iterator<Item = (Scope, Level)> + '_ {
        self.grants.iter().map(|(s, l)| (*s, *l))
    }

    /// `scope: level` lines sorted by scope name, token-only scopes skipped.
    pub fn render(&self) -> Vec<String> {
        self.renderable()
            .into_iter()
            .map(|(scope, level)| format!("{scope}: {level}"))
            .collect()
    }

    fn renderable(&self) -> BTreeMap<&'static str, Level> {
        self.grants
            .iter()
            .filter(|(scope, _)| !scope.is_token_only())
            .map(|(scope, level)| (scope.as_str(), *level))
            .collect()
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.renderable().serialize(serializer)
    }
}
