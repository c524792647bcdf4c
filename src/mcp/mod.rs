//! MCP tool-server configuration: normalize, containerize, render.

pub mod builtin;
pub mod container;
pub mod launchers;
pub mod normalize;
pub mod render;
pub mod secrets;
pub mod spec;

use std::collections::BTreeMap;

use serde_json::Value;

pub use normalize::normalize_server;
pub use render::{render_mcp_config, render_server, RenderOptions};
pub use spec::{McpServerSpec, ServerVariant};

/// Turn the declaration's `tools` section into launch-ready server specs,
/// sorted by name.
pub fn build_servers(tools: &BTreeMap<String, Value>) -> crate::Result<Vec<McpServerSpec>> {
    let mut servers = Vec::new();
    for (name, raw) in tools {
        if builtin::NON_SERVER_TOOLS.contains(&name.as_str()) {
            tracing::debug!(tool = %name, "skipping non-server tool");
            continue;
        }
        let declared = match builtin::get_builtin(name) {
            Some(server) => builtin::build_builtin(server.as_ref(), raw)?,
            None => normalize_server(name, raw)?,
        };
        servers.push(container::to_launch_ready(declared));
    }
    Ok(servers)
}
