//! Workflow declaration: deserialization, validation, and file loading.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::engine::EngineKind;
use crate::error::WardenError;
use crate::network::NetworkDeclaration;

/// One workflow as authored, before compilation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WorkflowDeclaration {
    pub name: String,
    #[serde(default)]
    pub engine: EngineKind,
    /// Slash command (without the `/`) that triggers the workflow.
    pub command: Option<String>,
    /// Tool name → raw declaration, handed to the normalizer untouched.
    #[serde(default)]
    pub tools: BTreeMap<String, Value>,
    #[serde(default)]
    pub network: NetworkDeclaration,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    pub safe_outputs: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SandboxConfig {
    /// Run the agent inside the isolating sandbox.
    #[serde(default = "default_agent_sandbox")]
    pub agent: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            agent: default_agent_sandbox(),
        }
    }
}

fn default_agent_sandbox() -> bool {
    true
}

impl WorkflowDeclaration {
    /// Structural checks that do not belong to any one section.
    pub fn validate(&self) -> crate::Result<()> {
        // 1. Name is required
        if self.name.trim().is_empty() {
            return Err(WardenError::Declaration(
                "name".to_string(),
                "workflow name cannot be empty".to_string(),
            ));
        }

        // 2. Command is a bare word
        if let Some(command) = &self.command {
            if command.is_empty()
                || command.starts_with('/')
                || command.chars().any(char::is_whitespace)
            {
                return Err(WardenError::Declaration(
                    self.name.clone(),
                    format!("command '{command}' must be a single word without a leading '/'"),
                ));
            }
        }

        // 3. Tool names are non-empty
        if self.tools.keys().any(|k| k.trim().is_empty()) {
            return Err(WardenError::Declaration(
                self.name.clone(),
                "tool names cannot be empty".to_string(),
            ));
        }

        // 4. safe-outputs is a mapping
        if let Some(raw) = &self.safe_outputs {
            if !raw.is_object() {
                return Err(WardenError::InvalidSafeOutput(
                    "safe-outputs".to_string(),
                    "expected a mapping".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Read and parse a declaration file. `.json` files are parsed as JSON,
/// everything else as TOML.
pub fn load_declaration(path: &Path) -> crate::Result<WorkflowDeclaration> {
    let location = path.display().to_string();
    let content = std::fs::read_to_string(path)
        .map_err(|e| WardenError::Declaration(location.clone(), e.to_string()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let declaration = if is_json {
        parse_json(&content)
    } else {
        parse_toml(&content)
    }
    .map_err(|msg| WardenError::Declaration(location.clone(), msg))?;

    tracing::debug!(path = %location, workflow = %declaration.name, "loaded declaration");
    Ok(declaration)
}

fn parse_toml(content: &str) -> Result<WorkflowDeclaration, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}

fn parse_json(content: &str) -> Result<WorkflowDeclaration, String> {
    serde_json::from_str(content).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(toml_str: &str) -> WorkflowDeclaration {
        parse_toml(toml_str).expect("valid TOML")
    }

    fn temp_with_suffix(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut temp = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        write!(temp, "{content}").expect("write to temp file");
        temp
    }

    #[test]
    fn test_defaults() {
        let decl = parse(r#"name = "triage""#);
        assert_eq!(decl.engine, EngineKind::Claude);
        assert!(decl.tools.is_empty());
        assert!(decl.sandbox.agent);
        assert!(matches!(decl.network, NetworkDeclaration::Mode(ref m) if m == "defaults"));
        assert!(decl.safe_outputs.is_none());
        assert!(decl.validate().is_ok());
    }

    #[test]
    fn test_full_toml() {
        let decl = parse(
            r#"
            name = "triage"
            engine = "codex"
            command = "triage"

            [tools.search]
            url = "https://search.example.com/mcp"
            headers = { Authorization = "Bearer ${{ secrets.SEARCH_KEY }}" }

            [network]
            allowed = ["defaults", "*.example.com"]

            [sandbox]
            agent = false

            [safe-outputs.add-comment]
            max = 2
            "#,
        );
        assert_eq!(decl.engine, EngineKind::Codex);
        assert_eq!(decl.tools["search"]["url"], "https://search.example.com/mcp");
        assert!(!decl.sandbox.agent);
        assert_eq!(decl.safe_outputs.unwrap()["add-comment"]["max"], 2);
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        assert!(parse_toml("name = \"x\"\nengines = \"codex\"").is_err());
    }

    #[test]
    fn test_validate_command() {
        let mut decl = parse(r#"name = "triage""#);
        decl.command = Some("/triage".to_string());
        assert!(matches!(decl.validate(), Err(WardenError::Declaration(_, ref msg)) if msg.contains("leading '/'")));
        decl.command = Some("two words".to_string());
        assert!(decl.validate().is_err());
    }

    #[test]
    fn test_validate_empty_name() {
        let decl = parse(r#"name = " ""#);
        assert!(matches!(decl.validate(), Err(WardenError::Declaration(ref k, _)) if k == "name"));
    }

    #[test]
    fn test_load_toml_file() {
        let temp = temp_with_suffix(".toml", "name = \"from-file\"\nengine = \"copilot\"\n");
        let decl = load_declaration(temp.path()).unwrap();
        assert_eq!(decl.name, "from-file");
        assert_eq!(decl.engine, EngineKind::Copilot);
    }

    #[test]
    fn test_load_json_file() {
        let temp = temp_with_suffix(
            ".json",
            r#"{ "name": "json-flow", "tools": { "github": null }, "safe-outputs": { "create-issue": {} } }"#,
        );
        let decl = load_declaration(temp.path()).unwrap();
        assert_eq!(decl.name, "json-flow");
        assert!(decl.tools["github"].is_null());
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let temp = temp_with_suffix(".toml", "this is not valid toml {{");
        let err = load_declaration(temp.path()).unwrap_err();
        let location = temp.path().display().to_string();
        assert!(matches!(err, WardenError::Declaration(ref path, _) if *path == location));

        let missing = load_declaration(Path::new("/nonexistent/workflow.toml")).unwrap_err();
        assert!(matches!(missing, WardenError::Declaration(_, _)));
    }
}
