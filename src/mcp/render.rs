//! Multi-format MCP configuration renderer.
//!
//! Which fields appear, and in what order, is looked up in [`FIELD_LAYOUTS`]
//! by (variant, grammar, explicit type/tools). The render path itself has no
//! per-engine branches.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::engine::{EngineCapabilities, Grammar};
use crate::mcp::container::container_run_args;
use crate::mcp::secrets::{env_reference, extract_secrets_from_headers, substitute_secret_refs};
use crate::mcp::spec::{McpServerSpec, ServerVariant, StdioLaunch};

/// Address that reaches the host network namespace from inside the sandbox.
pub const SANDBOX_HOST_BRIDGE: &str = "host.docker.internal";

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

/// Renderer inputs besides the server itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub capabilities: EngineCapabilities,
    /// The agent runs inside an isolating sandbox.
    pub sandbox_localhost_rewrite: bool,
}

/// A renderable field of a server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Type,
    Command,
    Args,
    Env,
    Url,
    Headers,
    Tools,
}

/// One row of the layout table.
#[derive(Debug)]
pub struct FieldLayout {
    pub variant: ServerVariant,
    pub grammar: Grammar,
    pub type_and_tools_fields: bool,
    pub fields: &'static [Field],
}

pub const FIELD_LAYOUTS: &[FieldLayout] = &[
    FieldLayout {
        variant: ServerVariant::Stdio,
        grammar: Grammar::Json,
        type_and_tools_fields: false,
        fields: &[Field::Command, Field::Args, Field::Env],
    },
    FieldLayout {
        variant: ServerVariant::Stdio,
        grammar: Grammar::Json,
        type_and_tools_fields: true,
        fields: &[Field::Type, Field::Command, Field::Args, Field::Env, Field::Tools],
    },
    FieldLayout {
        variant: ServerVariant::Network,
        grammar: Grammar::Json,
        type_and_tools_fields: false,
        fields: &[Field::Url, Field::Headers],
    },
    FieldLayout {
        variant: ServerVariant::Network,
        grammar: Grammar::Json,
        type_and_tools_fields: true,
        fields: &[Field::Type, Field::Url, Field::Headers, Field::Tools],
    },
    FieldLayout {
        variant: ServerVariant::Stdio,
        grammar: Grammar::Toml,
        type_and_tools_fields: false,
        fields: &[Field::Command, Field::Args, Field::Env],
    },
    FieldLayout {
        variant: ServerVariant::Stdio,
        grammar: Grammar::Toml,
        type_and_tools_fields: true,
        fields: &[Field::Type, Field::Command, Field::Args, Field::Env, Field::Tools],
    },
    FieldLayout {
        variant: ServerVariant::Network,
        grammar: Grammar::Toml,
        type_and_tools_fields: false,
        fields: &[Field::Url, Field::Headers],
    },
    FieldLayout {
        variant: ServerVariant::Network,
        grammar: Grammar::Toml,
        type_and_tools_fields: true,
        fields: &[Field::Type, Field::Url, Field::Headers, Field::Tools],
    },
];

/// Field order for one (variant, grammar, explicit type/tools) combination.
pub fn field_order(
    variant: ServerVariant,
    grammar: Grammar,
    type_and_tools_fields: bool,
) -> &'static [Field] {
    FIELD_LAYOUTS
        .iter()
        .find(|l| {
            l.variant == variant
                && l.grammar == grammar
                && l.type_and_tools_fields == type_and_tools_fields
        })
        .map(|l| l.fields)
        .unwrap_or(&[])
}

impl Field {
    fn key(self, grammar: Grammar) -> &'static str {
        match (self, grammar) {
            (Field::Type, _) => "type",
            (Field::Command, _) => "command",
            (Field::Args, _) => "args",
            (Field::Env, _) => "env",
            (Field::Url, _) => "url",
            (Field::Headers, Grammar::Json) => "headers",
            (Field::Headers, Grammar::Toml) => "http_headers",
            (Field::Tools, _) => "tools",
        }
    }
}

enum FieldValue {
    Str(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

/// Rewrite a loopback URL to the sandbox host bridge. Idempotent.
pub fn rewrite_localhost_url(url: &str) -> String {
    for scheme in ["http://", "https://"] {
        let Some(rest) = url.strip_prefix(scheme) else {
            continue;
        };
        for host in LOOPBACK_HOSTS {
            if let Some(tail) = rest.strip_prefix(host) {
                if tail.is_empty() || tail.starts_with([':', '/', '?']) {
                    return format!("{scheme}{SANDBOX_HOST_BRIDGE}{tail}");
                }
            }
        }
    }
    url.to_string()
}

fn field_value(spec: &McpServerSpec, field: Field, opts: &RenderOptions) -> Option<FieldValue> {
    match (spec, field) {
        (_, Field::Type) => Some(FieldValue::Str(spec.variant().type_name().to_string())),
        (_, Field::Tools) => Some(FieldValue::List(
            spec.allowed()
                .map(<[String]>::to_vec)
                .unwrap_or_else(|| vec!["*".to_string()]),
        )),
        (McpServerSpec::Stdio(server), Field::Command) => Some(FieldValue::Str(match &server.launch {
            StdioLaunch::Command { command, .. } => command.clone(),
            StdioLaunch::Container(_) => crate::mcp::container::CONTAINER_LAUNCHER.to_string(),
        })),
        (McpServerSpec::Stdio(server), Field::Args) => Some(FieldValue::List(match &server.launch {
            StdioLaunch::Command { args, .. } => args.clone(),
            StdioLaunch::Container(container) => container_run_args(container, server.env.keys()),
        })),
        (McpServerSpec::Stdio(server), Field::Env) if !server.env.is_empty() => {
            Some(FieldValue::Map(server.env.clone()))
        }
        (McpServerSpec::Network(server), Field::Url) => {
            let url = if opts.sandbox_localhost_rewrite {
                rewrite_localhost_url(&server.url)
            } else {
                server.url.clone()
            };
            Some(FieldValue::Str(url))
        }
        (McpServerSpec::Network(server), Field::Headers) if !server.headers.is_empty() => {
            let headers = if opts.capabilities.header_secret_passthrough {
                server
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), substitute_secret_refs(v, env_reference)))
                    .collect()
            } else {
                server.headers.clone()
            };
            Some(FieldValue::Map(headers))
        }
        _ => None,
    }
}

/// Render one server entry.
pub fn render_server(spec: &McpServerSpec, opts: &RenderOptions) -> String {
    let grammar = opts.capabilities.grammar;
    let fields: Vec<(Field, FieldValue)> = field_order(
        spec.variant(),
        grammar,
        opts.capabilities.type_and_tools_fields,
    )
    .iter()
    .filter_map(|f| field_value(spec, *f, opts).map(|v| (*f, v)))
    .collect();

    match grammar {
        Grammar::Json => render_json_entry(spec.name(), &fields),
        Grammar::Toml => render_toml_table(spec.name(), &fields),
    }
}

/// Render a complete configuration document, servers in name order.
pub fn render_mcp_config(specs: &[McpServerSpec], opts: &RenderOptions) -> String {
    let mut sorted: Vec<&McpServerSpec> = specs.iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));

    match opts.capabilities.grammar {
        Grammar::Json => {
            let entries: Vec<String> = sorted
                .iter()
                .map(|s| indent(&render_server(s, opts), "    "))
                .collect();
            if entries.is_empty() {
                return "{\n  \"mcpServers\": {}\n}\n".to_string();
            }
            format!("{{\n  \"mcpServers\": {{\n{}\n  }}\n}}\n", entries.join(",\n"))
        }
        Grammar::Toml => {
            let tables: Vec<String> = sorted.iter().map(|s| render_server(s, opts)).collect();
            let mut out = tables.join("\n");
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out
        }
    }
}

/// Environment the engine must export for header passthrough:
/// variable name → original credential expression.
pub fn passthrough_env(specs: &[McpServerSpec], opts: &RenderOptions) -> BTreeMap<String, String> {
    if !opts.capabilities.header_secret_passthrough {
        return BTreeMap::new();
    }
    let mut env = BTreeMap::new();
    for spec in specs {
        if let McpServerSpec::Network(server) = spec {
            for (var, expr) in extract_secrets_from_headers(&server.headers) {
                env.entry(var).or_insert(expr);
            }
        }
    }
    env
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn toml_string(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}

fn toml_key(s: &str) -> String {
    let bare = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare { s.to_string() } else { toml_string(s) }
}

fn render_json_entry(name: &str, fields: &[(Field, FieldValue)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {{", json_string(name));
    for (i, (field, value)) in fields.iter().enumerate() {
        let comma = if i + 1 < fields.len() { "," } else { "" };
        let key = json_string(field.key(Grammar::Json));
        match value {
            FieldValue::Str(s) => {
                let _ = writeln!(out, "  {key}: {}{comma}", json_string(s));
            }
            FieldValue::List(items) if items.is_empty() => {
                let _ = writeln!(out, "  {key}: []{comma}");
            }
            FieldValue::List(items) => {
                let _ = writeln!(out, "  {key}: [");
                let body: Vec<String> = items
                    .iter()
                    .map(|item| format!("    {}", json_string(item)))
                    .collect();
                let _ = writeln!(out, "{}", body.join(",\n"));
                let _ = writeln!(out, "  ]{comma}");
            }
            FieldValue::Map(entries) => {
                let _ = writeln!(out, "  {key}: {{");
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("    {}: {}", json_string(k), json_string(v)))
                    .collect();
                let _ = writeln!(out, "{}", body.join(",\n"));
                let _ = writeln!(out, "  }}{comma}");
            }
        }
    }
    out.push('}');
    out
}

fn render_toml_table(name: &str, fields: &[(Field, FieldValue)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[mcp_servers.{}]", toml_key(name));
    for (field, value) in fields {
        let key = field.key(Grammar::Toml);
        match value {
            FieldValue::Str(s) => {
                let _ = writeln!(out, "{key} = {}", toml_string(s));
            }
            FieldValue::List(items) if items.is_empty() => {
                let _ = writeln!(out, "{key} = []");
            }
            FieldValue::List(items) => {
                let _ = writeln!(out, "{key} = [");
                for item in items {
                    let _ = writeln!(out, "  {},", toml_string(item));
                }
                let _ = writeln!(out, "]");
            }
            FieldValue::Map(entries) => {
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{} = {}", toml_string(k), toml_string(v)))
                    .collect();
                let _ = writeln!(out, "{key} = {{ {} }}", body.join(", "));
            }
        }
    }
    out
}
