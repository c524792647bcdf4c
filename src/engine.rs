//! Consuming engines and the MCP configuration shape each one expects.

use serde::{Deserialize, Serialize};

/// AI engine that executes the agent job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Claude,
    Copilot,
    Codex,
    Custom,
}

/// Output grammar for the embedded MCP configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Json,
    Toml,
}

/// What an engine's MCP configuration schema requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCapabilities {
    pub grammar: Grammar,
    /// Emit explicit `type` and `tools` fields.
    pub type_and_tools_fields: bool,
    /// Lift header credential references into the engine's environment.
    pub header_secret_passthrough: bool,
}

impl EngineKind {
    pub fn id(self) -> &'static str {
        match self {
            EngineKind::Claude => "claude",
            EngineKind::Copilot => "copilot",
            EngineKind::Codex => "codex",
            EngineKind::Custom => "custom",
        }
    }

    pub fn capabilities(self) -> EngineCapabilities {
        match self {
            EngineKind::Copilot => EngineCapabilities {
                grammar: Grammar::Json,
                type_and_tools_fields: true,
                header_secret_passthrough: true,
            },
            EngineKind::Codex => EngineCapabilities {
                grammar: Grammar::Toml,
                type_and_tools_fields: false,
                header_secret_passthrough: false,
            },
            EngineKind::Claude | EngineKind::Custom => EngineCapabilities {
                grammar: Grammar::Json,
                type_and_tools_fields: false,
                header_secret_passthrough: false,
            },
        }
    }
}
