//! Error types for workflow synthesis.

use thiserror::Error;

use crate::network::domain::DomainPatternError;

/// Main error type for Warden compilation
#[derive(Error, Debug)]
pub enum WardenError {
    /// Tool declaration carries a key that is not a recognized property
    #[error("unknown property '{1}' in tool '{0}'. Valid properties are: {2}. Example:\n{3}")]
    UnknownProperty(String, String, String, String),

    /// Server variant could not be inferred from the declared fields
    #[error(
        "unable to determine MCP type for tool '{0}': set 'type', 'url', 'command', or 'container'. Example:\n{1}"
    )]
    TypeIndeterminate(String, String),

    /// Network-addressed server declared without a URL
    #[error("http MCP tool '{0}' is missing required 'url' field. Example:\n{1}")]
    MissingUrl(String, String),

    /// Explicit variant string is not one we know
    #[error("unsupported MCP type '{1}' for tool '{0}'. Valid types are: http, stdio. Example:\n{2}")]
    UnsupportedType(String, String, String),

    /// Property present with the wrong value shape
    #[error("invalid property '{1}' in tool '{0}': {2}")]
    InvalidProperty(String, String, String),

    /// Two properties that cannot be combined
    #[error("conflicting properties in tool '{0}': {1}")]
    ConflictingProperties(String, String),

    /// Allow-list entry failed pattern validation
    #[error("{0}: {1}")]
    InvalidDomain(String, DomainPatternError),

    /// Network section is malformed
    #[error("invalid network configuration: {0}")]
    InvalidNetwork(String),

    /// Safe-output configuration for a named kind is malformed
    #[error("invalid safe-outputs configuration for '{0}': {1}")]
    InvalidSafeOutput(String, String),

    /// A builder was invoked without its parsed configuration
    #[error("safe output '{0}' was requested but has no configuration")]
    ConfigMissing(String),

    /// Job graph failed structural checks
    #[error("invalid job graph at '{0}': {1}")]
    InvalidJobGraph(String, String),

    /// Declaration input could not be read or parsed
    #[error("failed to load declaration '{0}': {1}")]
    Declaration(String, String),

    /// Unexpected fault caught at the top-level entry point
    #[error("internal error while compiling '{0}', this is a bug, please file an issue: {1}")]
    Internal(String, String),
}

/// Result type alias for Warden operations
pub type Result<T> = std::result::Result<T, WardenError>;
