//! Network egress policy: allow-list expansion and firewall sub-configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::WardenError;
use crate::network::domain::{classify_domain, DomainEntry};
use crate::network::ecosystem::ecosystem_domains;

const VALID_LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];
const DEFAULT_CLEANUP_SCRIPT: &str = "./scripts/ci/cleanup.sh";

/// `network:` as written in the declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NetworkDeclaration {
    /// Shorthand mode, currently only `defaults`.
    Mode(String),
    Rules(NetworkRules),
}

impl Default for NetworkDeclaration {
    fn default() -> Self {
        NetworkDeclaration::Mode("defaults".to_string())
    }
}

/// Explicit allow-list plus optional firewall settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkRules {
    #[serde(default)]
    pub allowed: Vec<String>,
    pub firewall: Option<FirewallDeclaration>,
}

/// `firewall:` accepts either a toggle or a settings table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FirewallDeclaration {
    Toggle(bool),
    Settings(FirewallSettings),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirewallSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub version: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, alias = "log-level")]
    pub log_level: Option<String>,
    /// Script run after the agent to remove firewall containers.
    #[serde(default, alias = "cleanup-script")]
    pub cleanup_script: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Resolved firewall settings attached to the agent job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallConfig {
    pub enabled: bool,
    pub version: Option<String>,
    pub args: Vec<String>,
    pub log_level: String,
    pub cleanup_script: String,
}

impl FirewallConfig {
    fn disabled() -> Self {
        FirewallConfig {
            enabled: false,
            version: None,
            args: Vec::new(),
            log_level: "info".to_string(),
            cleanup_script: DEFAULT_CLEANUP_SCRIPT.to_string(),
        }
    }

    fn enabled() -> Self {
        FirewallConfig {
            enabled: true,
            ..FirewallConfig::disabled()
        }
    }
}

/// Validated network policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkPolicy {
    #[serde(skip)]
    pub entries: Vec<DomainEntry>,
    /// Expanded allow-list, sorted and deduplicated.
    pub allowed_domains: Vec<String>,
    pub firewall: FirewallConfig,
}

/// Validate every entry in an allow-list, reporting the first failure with
/// its list position (e.g. `network.allowed[2]`).
pub fn validate_allow_list(location: &str, values: &[String]) -> crate::Result<Vec<DomainEntry>> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            classify_domain(value)
                .map_err(|e| WardenError::InvalidDomain(format!("{location}[{i}]"), e))
        })
        .collect()
}

/// Expand entries into the flat domain list the firewall consumes.
///
/// Explicit and wildcard entries pass through unchanged. Unknown ecosystem
/// identifiers are kept literally so a typo never widens the list.
pub fn expand_entries(entries: &[DomainEntry]) -> Vec<String> {
    let mut domains = BTreeSet::new();
    for entry in entries {
        match entry {
            DomainEntry::Ecosystem(name) => match ecosystem_domains(name) {
                Some(expanded) => domains.extend(expanded.iter().map(|d| d.to_string())),
                None => {
                    tracing::warn!(ecosystem = %name, "unknown ecosystem identifier, keeping it literally");
                    domains.insert(name.clone());
                }
            },
            other => {
                domains.insert(other.to_pattern());
            }
        }
    }
    domains.into_iter().collect()
}

impl NetworkPolicy {
    /// Build the policy from the declaration's network section.
    pub fn from_declaration(decl: &NetworkDeclaration) -> crate::Result<Self> {
        match decl {
            NetworkDeclaration::Mode(mode) if mode == "defaults" => {
                let entries = vec![DomainEntry::Ecosystem("defaults".to_string())];
                Ok(NetworkPolicy {
                    allowed_domains: expand_entries(&entries),
                    entries,
                    firewall: FirewallConfig::disabled(),
                })
            }
            NetworkDeclaration::Mode(other) => Err(WardenError::InvalidNetwork(format!(
                "unknown network mode '{other}'; use 'defaults' or a table with 'allowed'"
            ))),
            NetworkDeclaration::Rules(rules) => Self::from_rules(rules),
        }
    }

    fn from_rules(rules: &NetworkRules) -> crate::Result<Self> {
        // 1. Validate every allow-list entry
        let entries = validate_allow_list("network.allowed", &rules.allowed)?;

        // 2. Resolve firewall settings; explicit allow-lists turn it on by default
        let firewall = match &rules.firewall {
            None => FirewallConfig::enabled(),
            Some(FirewallDeclaration::Toggle(true)) => FirewallConfig::enabled(),
            Some(FirewallDeclaration::Toggle(false)) => FirewallConfig::disabled(),
            Some(FirewallDeclaration::Settings(settings)) => resolve_firewall(settings)?,
        };

        if !firewall.enabled && !entries.is_empty() {
            tracing::warn!("network allow-list is declared but the firewall is disabled");
        }

        Ok(NetworkPolicy {
            allowed_domains: expand_entries(&entries),
            entries,
            firewall,
        })
    }

    /// Arguments handed to the egress firewall wrapper.
    pub fn firewall_args(&self) -> Vec<String> {
        if !self.firewall.enabled {
            return Vec::new();
        }
        let mut args = vec![
            "--allow-domains".to_string(),
            self.allowed_domains.join(","),
            "--log-level".to_string(),
            self.firewall.log_level.clone(),
        ];
        args.extend(self.firewall.args.iter().cloned());
        args
    }
}

fn resolve_firewall(settings: &FirewallSettings) -> crate::Result<FirewallConfig> {
    let log_level = settings.log_level.as_deref().unwrap_or("info");
    if !VALID_LOG_LEVELS.contains(&log_level) {
        return Err(WardenError::InvalidNetwork(format!(
            "firewall log_level '{}' is not one of: {}",
            log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(FirewallConfig {
        enabled: settings.enabled,
        version: settings.version.clone(),
        args: settings.args.clone(),
        log_level: log_level.to_string(),
        cleanup_script: settings
            .cleanup_script
            .clone()
            .unwrap_or_else(|| DEFAULT_CLEANUP_SCRIPT.to_string()),
    })
}
