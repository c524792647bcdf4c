//! Built-in tool servers.
//!
//! Each built-in knows how to turn its own short declaration into a canonical
//! containerized [`McpServerSpec`]. Custom servers go through the normalizer
//! instead.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::WardenError;
use crate::mcp::normalize::{get_optional_list, get_string, get_string_list};
use crate::mcp::secrets::{env_reference, extract_secret_refs, substitute_secret_refs};
use crate::mcp::spec::{ContainerLaunch, McpServerSpec, StdioLaunch, StdioServer};
use crate::network::policy::validate_allow_list;

/// Tool names that configure agent capabilities rather than MCP servers.
pub const NON_SERVER_TOOLS: &[&str] = &["bash", "edit", "web-fetch", "web-search"];

const PLAYWRIGHT_IMAGE: &str = "mcr.microsoft.com/playwright/mcp";
const PLAYWRIGHT_LOG_DIR: &str = "/tmp/gh-aw/mcp-logs/playwright";
const MCP_LOGS_MOUNT: &str = "/tmp/gh-aw/mcp-logs:/tmp/gh-aw/mcp-logs:rw";

const GITHUB_IMAGE: &str = "ghcr.io/github/github-mcp-server";
const GITHUB_DEFAULT_VERSION: &str = "v0.26.3";
const GITHUB_DEFAULT_TOKEN: &str = "${{ secrets.GH_AW_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}";

/// A tool server the compiler knows how to build from a short declaration.
pub trait BuiltinServer: Send + Sync {
    /// Tool name as written in the declaration (e.g. "playwright").
    fn name(&self) -> &'static str;

    /// Properties the short declaration may carry.
    fn valid_properties(&self) -> &'static [&'static str];

    /// A complete declaration shown when a property is rejected.
    fn example(&self) -> &'static str;

    /// Build the declared (not yet launch-ready) specification.
    fn build(&self, config: &Map<String, Value>) -> crate::Result<McpServerSpec>;
}

/// Resolve a built-in server by tool name.
pub fn get_builtin(name: &str) -> Option<Box<dyn BuiltinServer>> {
    match name {
        "playwright" => Some(Box::new(PlaywrightServer)),
        "github" => Some(Box::new(GithubServer)),
        _ => None,
    }
}

/// Build a built-in server, checking its properties first.
///
/// A `null` declaration (e.g. `playwright:` with no body) means defaults.
pub fn build_builtin(builtin: &dyn BuiltinServer, raw: &Value) -> crate::Result<McpServerSpec> {
    let empty = Map::new();
    let config = match raw {
        Value::Null => &empty,
        Value::Object(map) => map,
        _ => {
            return Err(WardenError::InvalidProperty(
                builtin.name().to_string(),
                builtin.name().to_string(),
                "tool configuration must be a mapping".to_string(),
            ));
        }
    };

    let valid = builtin.valid_properties();
    let mut unknown: Vec<&String> = config
        .keys()
        .filter(|k| !valid.contains(&k.as_str()))
        .collect();
    unknown.sort();
    if let Some(key) = unknown.first() {
        let mut props = valid.to_vec();
        props.sort_unstable();
        return Err(WardenError::UnknownProperty(
            builtin.name().to_string(),
            key.to_string(),
            props.join(", "),
            builtin.example().to_string(),
        ));
    }

    builtin.build(config)
}

/// Browser automation server.
pub struct PlaywrightServer;

impl BuiltinServer for PlaywrightServer {
    fn name(&self) -> &'static str {
        "playwright"
    }

    fn valid_properties(&self) -> &'static [&'static str] {
        &["allowed_domains", "version", "args"]
    }

    fn example(&self) -> &'static str {
        r#"[tools.playwright]
allowed_domains = ["example.com", "*.example.org"]
version = "latest""#
    }

    fn build(&self, config: &Map<String, Value>) -> crate::Result<McpServerSpec> {
        let domains = get_string_list(self.name(), config, "allowed_domains")?;
        let custom_args = get_string_list(self.name(), config, "args")?;

        // 1. Validate literal domains; credential references are resolved at runtime
        let literal: Vec<String> = domains
            .iter()
            .filter(|d| extract_secret_refs(d).is_empty())
            .cloned()
            .collect();
        validate_allow_list("tools.playwright.allowed_domains", &literal)?;

        // 2. Lift credential references into env so they never appear in args
        let mut env = BTreeMap::new();
        for value in domains.iter().chain(custom_args.iter()) {
            for (secret, expr) in extract_secret_refs(value) {
                env.entry(playwright_env_var(&secret)).or_insert(expr);
            }
        }
        let replace = |v: &String| substitute_secret_refs(v, |s| env_reference(&playwright_env_var(s)));
        let domains: Vec<String> = domains.iter().map(replace).collect();

        // 3. Entrypoint args: output dir, host/origin allow-list, then custom args
        let mut entrypoint_args = vec!["--output-dir".to_string(), PLAYWRIGHT_LOG_DIR.to_string()];
        if !domains.is_empty() {
            let joined = domains.join(";");
            entrypoint_args.extend([
                "--allowed-hosts".to_string(),
                joined.clone(),
                "--allowed-origins".to_string(),
                joined,
            ]);
        }
        entrypoint_args.extend(custom_args.iter().map(replace));

        Ok(McpServerSpec::Stdio(StdioServer {
            name: self.name().to_string(),
            launch: StdioLaunch::Container(ContainerLaunch {
                image: PLAYWRIGHT_IMAGE.to_string(),
                version: get_string(self.name(), config, "version")?,
                entrypoint: None,
                entrypoint_args,
                mounts: vec![MCP_LOGS_MOUNT.to_string()],
                extra_args: vec!["--init".to_string(), "--network".to_string(), "host".to_string()],
            }),
            env,
            proxy_args: Vec::new(),
            registry: None,
            allowed: None,
            toolsets: Vec::new(),
        }))
    }
}

fn playwright_env_var(secret: &str) -> String {
    format!("PLAYWRIGHT_ALLOWED_DOMAIN_{secret}")
}

/// Repository API server.
pub struct GithubServer;

impl BuiltinServer for GithubServer {
    fn name(&self) -> &'static str {
        "github"
    }

    fn valid_properties(&self) -> &'static [&'static str] {
        &["version", "toolsets", "read-only", "github-token", "allowed"]
    }

    fn example(&self) -> &'static str {
        r#"[tools.github]
toolsets = ["repos", "issues"]
read-only = true"#
    }

    fn build(&self, config: &Map<String, Value>) -> crate::Result<McpServerSpec> {
        let toolsets = get_string_list(self.name(), config, "toolsets")?;
        let token = get_string(self.name(), config, "github-token")?
            .unwrap_or_else(|| GITHUB_DEFAULT_TOKEN.to_string());

        let mut env = BTreeMap::new();
        env.insert("GITHUB_PERSONAL_ACCESS_TOKEN".to_string(), token);
        if !toolsets.is_empty() {
            env.insert("GITHUB_TOOLSETS".to_string(), toolsets.join(","));
        }
        match config.get("read-only") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {}
            Some(Value::Bool(true)) => {
                env.insert("GITHUB_READ_ONLY".to_string(), "1".to_string());
            }
            Some(_) => {
                return Err(WardenError::InvalidProperty(
                    self.name().to_string(),
                    "read-only".to_string(),
                    "expected a boolean".to_string(),
                ));
            }
        }

        let allowed = get_optional_list(self.name(), config, "allowed")?;

        Ok(McpServerSpec::Stdio(StdioServer {
            name: self.name().to_string(),
            launch: StdioLaunch::Container(ContainerLaunch {
                image: GITHUB_IMAGE.to_string(),
                version: Some(
                    get_string(self.name(), config, "version")?
                        .unwrap_or_else(|| GITHUB_DEFAULT_VERSION.to_string()),
                ),
                ..Default::default()
            }),
            env,
            proxy_args: Vec::new(),
            registry: None,
            allowed,
            toolsets,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::container::to_launch_ready;
    use serde_json::json;

    fn build(name: &str, raw: Value) -> crate::Result<McpServerSpec> {
        let builtin = get_builtin(name).expect("known builtin");
        build_builtin(builtin.as_ref(), &raw)
    }

    fn container(spec: &McpServerSpec) -> &ContainerLaunch {
        match spec {
            McpServerSpec::Stdio(StdioServer {
                launch: StdioLaunch::Container(c),
                ..
            }) => c,
            other => panic!("expected container launch, got {other:?}"),
        }
    }

    #[test]
    fn test_playwright_allowed_domains() {
        let spec = build("playwright", json!({ "allowed_domains": ["example.com"] })).unwrap();
        let c = container(&spec);
        assert_eq!(c.image, PLAYWRIGHT_IMAGE);
        assert_eq!(
            c.entrypoint_args,
            vec![
                "--output-dir",
                PLAYWRIGHT_LOG_DIR,
                "--allowed-hosts",
                "example.com",
                "--allowed-origins",
                "example.com",
            ]
        );
        assert_eq!(c.mounts, vec![MCP_LOGS_MOUNT]);
    }

    #[test]
    fn test_playwright_without_domains() {
        let spec = build("playwright", Value::Null).unwrap();
        assert_eq!(container(&spec).entrypoint_args, vec!["--output-dir", PLAYWRIGHT_LOG_DIR]);
    }

    #[test]
    fn test_playwright_launch_args() {
        let spec = to_launch_ready(build("playwright", json!({ "allowed_domains": ["a.example.com", "b.example.com"] })).unwrap());
        let McpServerSpec::Stdio(StdioServer { launch: StdioLaunch::Command { command, args }, .. }) = spec else {
            panic!("expected launch-ready");
        };
        assert_eq!(command, "docker");
        assert_eq!(
            args,
            vec![
                "run", "--rm", "-i", "-v", MCP_LOGS_MOUNT, "--init", "--network", "host",
                PLAYWRIGHT_IMAGE, "--output-dir", PLAYWRIGHT_LOG_DIR,
                "--allowed-hosts", "a.example.com;b.example.com",
                "--allowed-origins", "a.example.com;b.example.com",
            ]
        );
    }

    #[test]
    fn test_playwright_secret_domains_become_env() {
        let spec = build(
            "playwright",
            json!({ "allowed_domains": ["example.com", "${{ secrets.INTERNAL_HOST }}"] }),
        )
        .unwrap();
        let McpServerSpec::Stdio(server) = &spec else {
            panic!("expected stdio");
        };
        assert_eq!(
            server.env.get("PLAYWRIGHT_ALLOWED_DOMAIN_INTERNAL_HOST").map(String::as_str),
            Some("${{ secrets.INTERNAL_HOST }}")
        );
        assert!(container(&spec)
            .entrypoint_args
            .contains(&"example.com;${PLAYWRIGHT_ALLOWED_DOMAIN_INTERNAL_HOST}".to_string()));
    }

    #[test]
    fn test_playwright_rejects_bad_domain() {
        let err = build("playwright", json!({ "allowed_domains": ["*"] })).unwrap_err();
        assert!(matches!(err, WardenError::InvalidDomain(ref loc, _) if loc == "tools.playwright.allowed_domains[0]"));
    }

    #[test]
    fn test_playwright_unknown_property() {
        let err = build("playwright", json!({ "allowed-domains": ["example.com"] })).unwrap_err();
        assert!(matches!(err, WardenError::UnknownProperty(ref tool, ref key, _, _)
            if tool == "playwright" && key == "allowed-domains"));
    }

    #[test]
    fn test_unknown_property_example_is_a_real_declaration() {
        for name in ["playwright", "github"] {
            let err = build(name, json!({ "bogus": true })).unwrap_err();
            let WardenError::UnknownProperty(_, _, _, example) = err else {
                panic!("expected unknown property for {name}");
            };
            assert!(example.starts_with(&format!("[tools.{name}]")));
            assert!(!example.contains("..."));
            let parsed: toml::Table = toml::from_str(&example).expect("example parses as TOML");
            let body = serde_json::to_value(&parsed["tools"][name]).unwrap();
            assert!(build(name, body).is_ok(), "example for {name} should build");
        }
    }

    #[test]
    fn test_builtin_values_must_be_strings() {
        let err = build("github", json!({ "version": 1 })).unwrap_err();
        assert!(matches!(err, WardenError::InvalidProperty(ref tool, ref key, _)
            if tool == "github" && key == "version"));
    }

    #[test]
    fn test_github_defaults() {
        let spec = build("github", json!({ "toolsets": ["repos", "issues"], "read-only": true })).unwrap();
        let McpServerSpec::Stdio(server) = &spec else {
            panic!("expected stdio");
        };
        assert_eq!(container(&spec).image_ref(), "ghcr.io/github/github-mcp-server:v0.26.3");
        assert_eq!(server.env["GITHUB_TOOLSETS"], "repos,issues");
        assert_eq!(server.env["GITHUB_READ_ONLY"], "1");
        assert_eq!(server.env["GITHUB_PERSONAL_ACCESS_TOKEN"], GITHUB_DEFAULT_TOKEN);
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(get_builtin("serena").is_none());
        assert!(NON_SERVER_TOOLS.contains(&"bash"));
    }
}
