//! Canonical MCP server specification.
//!
//! A server is either a locally launched process (`Stdio`) or a remote
//! endpoint (`Network`). Each variant carries only its legal fields.
//!
//! A stdio server goes through two phases. While *declared*, its launch is
//! `StdioLaunch::Container`. After the container transform it is
//! *launch-ready* and holds `StdioLaunch::Command`. The enum keeps the two
//! phases mutually exclusive.

use std::collections::BTreeMap;

/// Validated server specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpServerSpec {
    Stdio(StdioServer),
    Network(NetworkServer),
}

impl McpServerSpec {
    pub fn name(&self) -> &str {
        match self {
            McpServerSpec::Stdio(s) => &s.name,
            McpServerSpec::Network(n) => &n.name,
        }
    }

    pub fn variant(&self) -> ServerVariant {
        match self {
            McpServerSpec::Stdio(_) => ServerVariant::Stdio,
            McpServerSpec::Network(_) => ServerVariant::Network,
        }
    }

    /// Allowed tool names, `None` meaning all tools.
    pub fn allowed(&self) -> Option<&[String]> {
        match self {
            McpServerSpec::Stdio(s) => s.allowed.as_deref(),
            McpServerSpec::Network(n) => n.allowed.as_deref(),
        }
    }
}

/// Discriminant used by the renderer's field-order table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerVariant {
    Stdio,
    Network,
}

impl ServerVariant {
    /// Value emitted in an explicit `type` field.
    pub fn type_name(self) -> &'static str {
        match self {
            ServerVariant::Stdio => "stdio",
            ServerVariant::Network => "http",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdioServer {
    pub name: String,
    pub launch: StdioLaunch,
    pub env: BTreeMap<String, String>,
    pub proxy_args: Vec<String>,
    pub registry: Option<String>,
    pub allowed: Option<Vec<String>>,
    pub toolsets: Vec<String>,
}

/// How a stdio server is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdioLaunch {
    /// Launch-ready: run `command` with `args`.
    Command { command: String, args: Vec<String> },
    /// Declared: run an image through the container launcher.
    Container(ContainerLaunch),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerLaunch {
    pub image: String,
    pub version: Option<String>,
    pub entrypoint: Option<String>,
    pub entrypoint_args: Vec<String>,
    pub mounts: Vec<String>,
    /// User-supplied launcher flags, inserted before the image reference.
    pub extra_args: Vec<String>,
}

impl ContainerLaunch {
    /// Image reference with optional `:version` suffix.
    pub fn image_ref(&self) -> String {
        match &self.version {
            Some(version) => format!("{}:{}", self.image, version),
            None => self.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkServer {
    pub name: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub registry: Option<String>,
    pub allowed: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref_with_and_without_version() {
        let mut launch = ContainerLaunch {
            image: "ghcr.io/acme/tool".to_string(),
            ..Default::default()
        };
        assert_eq!(launch.image_ref(), "ghcr.io/acme/tool");
        launch.version = Some("1.2".to_string());
        assert_eq!(launch.image_ref(), "ghcr.io/acme/tool:1.2");
    }

    #[test]
    fn test_variant_type_names() {
        assert_eq!(ServerVariant::Stdio.type_name(), "stdio");
        assert_eq!(ServerVariant::Network.type_name(), "http");
    }
}
