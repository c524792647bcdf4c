//! Warden: workflow configuration synthesis.
//! Compiles a workflow declaration (tool servers, controlled side-effects,
//! network egress policy) into a CI job manifest with an embedded,
//! engine-specific MCP configuration and least-privilege side-effect jobs.

pub mod compiler;
pub mod declaration;
pub mod engine;
pub mod error;
pub mod expression;
pub mod graph;
pub mod job;
pub mod mcp;
pub mod network;
pub mod permissions;
pub mod safe_outputs;

pub use compiler::{compile, compile_batch, CompiledWorkflow};
pub use declaration::{load_declaration, SandboxConfig, WorkflowDeclaration};
pub use engine::{EngineCapabilities, EngineKind, Grammar};
pub use error::{Result, WardenError};
pub use graph::JobGraph;
pub use job::{Job, Step};
pub use mcp::{build_servers, normalize_server, render_mcp_config, render_server, McpServerSpec, RenderOptions, ServerVariant};
pub use network::{classify_domain, validate_domain_pattern, DomainEntry, DomainPatternError, NetworkPolicy};
pub use permissions::{Level, Permissions, Scope};
pub use safe_outputs::{build_job, JobContext, SafeOutputKind, SafeOutputsConfig};
