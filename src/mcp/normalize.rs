//! Normalizer: raw tool declaration → canonical [`McpServerSpec`].
//!
//! The variant is inferred from which keys are present:
//! explicit `type` (or `mode`) → `url` → `command` → `container`.
//! Unknown keys are rejected so typos in security-relevant declarations
//! never pass silently.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::WardenError;
use crate::mcp::launchers::well_known_launcher;
use crate::mcp::spec::{
    ContainerLaunch, McpServerSpec, NetworkServer, ServerVariant, StdioLaunch, StdioServer,
};

/// Every property a custom tool declaration may carry.
pub const VALID_PROPERTIES: &[&str] = &[
    "type",
    "mode",
    "command",
    "container",
    "version",
    "args",
    "entrypoint",
    "entrypointArgs",
    "mounts",
    "env",
    "proxy-args",
    "url",
    "headers",
    "registry",
    "allowed",
    "toolsets",
];

/// Keys that only make sense for a stdio server.
const STDIO_ONLY: &[&str] = &[
    "command",
    "container",
    "version",
    "args",
    "entrypoint",
    "entrypointArgs",
    "mounts",
    "env",
    "proxy-args",
];

/// Keys that only make sense for a network server.
const NETWORK_ONLY: &[&str] = &["url", "headers"];

/// Keys that require `container`.
const CONTAINER_ONLY: &[&str] = &["version", "entrypoint", "entrypointArgs", "mounts"];

const PROPERTY_EXAMPLE: &str = r#"[tools.my-tool]
command = "npx"
args = ["-y", "@my/tool"]"#;

const TYPE_EXAMPLE: &str = r#"[tools.my-tool]
type = "stdio"
container = "ghcr.io/acme/my-tool"
version = "1.0"

[tools.my-remote-tool]
url = "https://api.example.com/mcp""#;

const URL_EXAMPLE: &str = r#"[tools.my-tool]
type = "http"
url = "https://api.example.com/mcp"
headers = { Authorization = "Bearer ${{ secrets.API_KEY }}" }"#;

/// Normalize one tool's raw declaration.
pub fn normalize_server(name: &str, raw: &Value) -> crate::Result<McpServerSpec> {
    let Some(map) = raw.as_object() else {
        return Err(WardenError::InvalidProperty(
            name.to_string(),
            name.to_string(),
            "tool configuration must be a mapping".to_string(),
        ));
    };

    // 1. Reject unknown keys, reporting the lexicographically first offender
    let mut unknown: Vec<&String> = map
        .keys()
        .filter(|k| !VALID_PROPERTIES.contains(&k.as_str()))
        .collect();
    unknown.sort();
    if let Some(key) = unknown.first() {
        return Err(WardenError::UnknownProperty(
            name.to_string(),
            key.to_string(),
            valid_property_list(),
            PROPERTY_EXAMPLE.to_string(),
        ));
    }

    // 2. Infer the variant
    let variant = infer_variant(name, map)?;
    tracing::debug!(server = %name, variant = variant.type_name(), "inferred MCP server type");

    // 3. Build the variant, rejecting fields that belong to the other one.
    //    A network server inferred from `url` ignores stdio-only keys instead.
    let explicit = ["type", "mode"]
        .iter()
        .any(|k| map.get(*k).is_some_and(|v| !v.is_null()));
    match variant {
        ServerVariant::Stdio => build_stdio(name, map).map(McpServerSpec::Stdio),
        ServerVariant::Network => {
            build_network(name, map, !explicit).map(McpServerSpec::Network)
        }
    }
}

fn valid_property_list() -> String {
    let mut props = VALID_PROPERTIES.to_vec();
    props.sort_unstable();
    props.join(", ")
}

/// Infer the server variant from an explicit type or from which keys are present.
pub fn infer_variant(name: &str, map: &Map<String, Value>) -> crate::Result<ServerVariant> {
    let explicit = match (get_string(name, map, "type")?, get_string(name, map, "mode")?) {
        (Some(t), Some(m)) if t != m => {
            return Err(WardenError::ConflictingProperties(
                name.to_string(),
                format!("'type' is '{t}' but 'mode' is '{m}'; set only one of them"),
            ));
        }
        (Some(t), _) => Some(t),
        (None, m) => m,
    };

    if let Some(kind) = explicit {
        return match kind.as_str() {
            "stdio" | "local" => Ok(ServerVariant::Stdio),
            "http" | "network" => Ok(ServerVariant::Network),
            _ => Err(WardenError::UnsupportedType(
                name.to_string(),
                kind,
                TYPE_EXAMPLE.to_string(),
            )),
        };
    }

    if map.contains_key("url") {
        Ok(ServerVariant::Network)
    } else if map.contains_key("command") || map.contains_key("container") {
        Ok(ServerVariant::Stdio)
    } else {
        Err(WardenError::TypeIndeterminate(
            name.to_string(),
            TYPE_EXAMPLE.to_string(),
        ))
    }
}

fn build_stdio(name: &str, map: &Map<String, Value>) -> crate::Result<StdioServer> {
    if let Some(key) = NETWORK_ONLY.iter().find(|k| map.contains_key(**k)) {
        return Err(WardenError::ConflictingProperties(
            name.to_string(),
            format!("property '{key}' is only valid for http servers"),
        ));
    }

    let command = get_string(name, map, "command")?;
    let container = get_string(name, map, "container")?;
    let args = get_string_list(name, map, "args")?;

    let launch = match (command, container) {
        (Some(_), Some(_)) => {
            return Err(WardenError::ConflictingProperties(
                name.to_string(),
                "'command' and 'container' cannot both be set".to_string(),
            ));
        }
        (None, None) => {
            return Err(WardenError::InvalidProperty(
                name.to_string(),
                "command".to_string(),
                "stdio servers require 'command' or 'container'".to_string(),
            ));
        }
        (None, Some(image)) => StdioLaunch::Container(ContainerLaunch {
            image,
            version: get_string(name, map, "version")?,
            entrypoint: get_string(name, map, "entrypoint")?,
            entrypoint_args: get_string_list(name, map, "entrypointArgs")?,
            mounts: get_string_list(name, map, "mounts")?,
            extra_args: args,
        }),
        (Some(command), None) => {
            if let Some(key) = CONTAINER_ONLY.iter().find(|k| map.contains_key(**k)) {
                return Err(WardenError::ConflictingProperties(
                    name.to_string(),
                    format!("property '{key}' requires 'container'"),
                ));
            }
            auto_containerize(name, command, args)
        }
    };

    Ok(StdioServer {
        name: name.to_string(),
        launch,
        env: get_string_map(name, map, "env")?,
        proxy_args: get_string_list(name, map, "proxy-args")?,
        registry: get_string(name, map, "registry")?,
        allowed: get_optional_list(name, map, "allowed")?,
        toolsets: get_string_list(name, map, "toolsets")?,
    })
}

/// Move a well-known package runner into its default container.
fn auto_containerize(name: &str, command: String, args: Vec<String>) -> StdioLaunch {
    match well_known_launcher(&command) {
        Some(launcher) => {
            tracing::debug!(server = %name, image = launcher.image, "auto-containerizing well-known launcher");
            let mut entrypoint_args = Vec::with_capacity(args.len() + 1);
            entrypoint_args.push(command);
            entrypoint_args.extend(args);
            StdioLaunch::Container(ContainerLaunch {
                image: launcher.image.to_string(),
                version: None,
                entrypoint: Some(launcher.entrypoint.to_string()),
                entrypoint_args,
                mounts: Vec::new(),
                extra_args: Vec::new(),
            })
        }
        None => StdioLaunch::Command { command, args },
    }
}

fn build_network(
    name: &str,
    map: &Map<String, Value>,
    inferred: bool,
) -> crate::Result<NetworkServer> {
    let stdio_keys: Vec<&str> = STDIO_ONLY
        .iter()
        .copied()
        .filter(|k| map.contains_key(*k))
        .collect();
    if let Some(key) = stdio_keys.first() {
        if !inferred {
            return Err(WardenError::ConflictingProperties(
                name.to_string(),
                format!("property '{key}' is only valid for stdio servers"),
            ));
        }
        tracing::warn!(server = %name, ignored = ?stdio_keys, "'url' selects an http server; ignoring stdio-only properties");
    }

    let url = match get_string(name, map, "url")? {
        Some(url) if !url.trim().is_empty() => url,
        _ => {
            return Err(WardenError::MissingUrl(
                name.to_string(),
                URL_EXAMPLE.to_string(),
            ));
        }
    };

    Ok(NetworkServer {
        name: name.to_string(),
        url,
        headers: get_string_map(name, map, "headers")?,
        registry: get_string(name, map, "registry")?,
        allowed: get_optional_list(name, map, "allowed")?,
    })
}

pub(crate) fn get_string(name: &str, map: &Map<String, Value>, key: &str) -> crate::Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(WardenError::InvalidProperty(
            name.to_string(),
            key.to_string(),
            "expected a string".to_string(),
        )),
    }
}

pub(crate) fn get_optional_list(
    name: &str,
    map: &Map<String, Value>,
    key: &str,
) -> crate::Result<Option<Vec<String>>> {
    if map.get(key).is_none_or(Value::is_null) {
        return Ok(None);
    }
    get_string_list(name, map, key).map(Some)
}

pub(crate) fn get_string_list(name: &str, map: &Map<String, Value>, key: &str) -> crate::Result<Vec<String>> {
    let invalid = || {
        WardenError::InvalidProperty(
            name.to_string(),
            key.to_string(),
            "expected a list of strings".to_string(),
        )
    };
    match map.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        Some(_) => Err(invalid()),
    }
}

fn get_string_map(
    name: &str,
    map: &Map<String, Value>,
    key: &str,
) -> crate::Result<BTreeMap<String, String>> {
    let invalid = || {
        WardenError::InvalidProperty(
            name.to_string(),
            key.to_string(),
            "expected a mapping of string values".to_string(),
        )
    };
    match map.get(key) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(k, v)| {
                v.as_str()
                    .map(|s| (k.clone(), s.to_string()))
                    .ok_or_else(invalid)
            })
            .collect(),
        Some(_) => Err(invalid()),
    }
}
