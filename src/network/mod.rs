//! Network allow-list validation and firewall policy.

pub mod domain;
pub mod ecosystem;
pub mod policy;

pub use domain::{classify_domain, validate_domain_pattern, DomainEntry, DomainPatternError};
pub use policy::{validate_allow_list, FirewallConfig, NetworkDeclaration, NetworkPolicy};
