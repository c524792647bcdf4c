//! Top-level compile entry: declaration in, job manifest out.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::declaration::WorkflowDeclaration;
use crate::engine::{EngineKind, Grammar};
use crate::error::WardenError;
use crate::expression::{command_match, detection_success, Condition, AGENT_JOB, DETECTION_JOB};
use crate::graph::JobGraph;
use crate::job::{Job, Step};
use crate::mcp::render::passthrough_env;
use crate::mcp::{build_servers, render_mcp_config, McpServerSpec, RenderOptions};
use crate::network::{validate_allow_list, NetworkPolicy};
use crate::permissions::{Level, Permissions, Scope};
use crate::safe_outputs::builder::ACTIVATION_JOB;
use crate::safe_outputs::{build_job, JobContext, SafeOutputKind, SafeOutputsConfig};

const MCP_CONFIG_DIR: &str = "/tmp/gh-aw/mcp-config";
const PROMPT_PATH: &str = "/tmp/gh-aw/aw-prompts/prompt.txt";
const SAFE_OUTPUTS_PATH: &str = "/tmp/gh-aw/safeoutputs/outputs.jsonl";
const FIREWALL_RELEASES: &str = "https://github.com/githubnext/gh-aw-firewall/releases";

/// Result of compiling one declaration.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledWorkflow {
    pub name: String,
    pub engine: EngineKind,
    /// Jobs in dependency order.
    pub jobs: Vec<Job>,
    /// Rendered MCP configuration embedded in the agent job.
    pub mcp_config: String,
    pub network: NetworkPolicy,
    #[serde(skip)]
    pub servers: Vec<McpServerSpec>,
}

impl CompiledWorkflow {
    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

/// Compile one declaration.
pub fn compile(decl: &WorkflowDeclaration) -> crate::Result<CompiledWorkflow> {
    tracing::info!(workflow = %decl.name, engine = decl.engine.id(), "compiling workflow");

    // 1. Declaration
    decl.validate()?;

    // 2. Network policy
    let network = NetworkPolicy::from_declaration(&decl.network)?;

    // 3. Tool servers
    let servers = build_servers(&decl.tools)?;
    let opts = RenderOptions {
        capabilities: decl.engine.capabilities(),
        sandbox_localhost_rewrite: decl.sandbox.agent,
    };
    let mcp_config = render_mcp_config(&servers, &opts);
    let passthrough = passthrough_env(&servers, &opts);

    // 4. Safe outputs
    let safe_outputs = match &decl.safe_outputs {
        Some(raw) => SafeOutputsConfig::from_value(raw)?,
        None => SafeOutputsConfig::default(),
    };
    let output_entries = validate_allow_list(
        "safe-outputs.allowed-domains",
        &safe_outputs.settings.allowed_domains,
    )?;
    let output_domains: Vec<String> = output_entries.iter().map(|e| e.to_pattern()).collect();

    // 5. Jobs
    let mut graph = JobGraph::new();
    graph.add_setup_job(activation_job(decl))?;
    graph.add_setup_job(agent_job(
        decl,
        &mcp_config,
        &passthrough,
        &network,
        &safe_outputs,
        &output_domains,
    ))?;

    let detection = safe_outputs.settings.threat_detection && !safe_outputs.is_empty();
    if detection {
        graph.add_setup_job(detection_job())?;
    }

    let ctx = JobContext {
        workflow_name: &decl.name,
        command: decl.command.as_deref(),
        settings: &safe_outputs.settings,
    };
    for mut job in safe_output_jobs(&safe_outputs, &ctx)? {
        if detection {
            gate_on_detection(&mut job);
        }
        graph.add_safe_output_job(job)?;
    }

    let jobs = graph.assemble()?;
    tracing::info!(workflow = %decl.name, jobs = jobs.len(), "compiled workflow");
    Ok(CompiledWorkflow {
        name: decl.name.clone(),
        engine: decl.engine,
        jobs,
        mcp_config,
        network,
        servers,
    })
}

/// Compile many declarations. A panic inside one compilation becomes
/// [`WardenError::Internal`] for that declaration and the rest still run.
pub fn compile_batch(decls: &[WorkflowDeclaration]) -> Vec<crate::Result<CompiledWorkflow>> {
    compile_each(decls, compile)
}

fn compile_each<F>(decls: &[WorkflowDeclaration], f: F) -> Vec<crate::Result<CompiledWorkflow>>
where
    F: Fn(&WorkflowDeclaration) -> crate::Result<CompiledWorkflow>,
{
    decls
        .iter()
        .map(|decl| match panic::catch_unwind(AssertUnwindSafe(|| f(decl))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(workflow = %decl.name, error = %message, "compilation panicked");
                Err(WardenError::Internal(decl.name.clone(), message))
            }
        })
        .collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn activation_job(decl: &WorkflowDeclaration) -> Job {
    let mut job = Job::new(ACTIVATION_JOB);
    job.condition = decl.command.as_deref().map(|c| command_match(c).render());
    job.permissions = Permissions::from_pairs(&[(Scope::Contents, Level::Read)]);
    job.steps.push(
        Step::uses("Checkout workflows", "actions/checkout@v5")
            .with_input("sparse-checkout", ".github"),
    );
    job.steps.push(Step::run(
        "Create prompt",
        format!(
            "mkdir -p \"$(dirname {PROMPT_PATH})\"\ncp \".github/workflows/{}.md\" {PROMPT_PATH}",
            workflow_slug(&decl.name)
        ),
    ));
    job.steps.push(
        Step::uses("Upload prompt", "actions/upload-artifact@v4")
            .with_input("name", "prompt")
            .with_input("path", PROMPT_PATH),
    );
    job
}

fn agent_job(
    decl: &WorkflowDeclaration,
    mcp_config: &str,
    passthrough: &BTreeMap<String, String>,
    network: &NetworkPolicy,
    safe_outputs: &SafeOutputsConfig,
    output_domains: &[String],
) -> Job {
    let mut job = Job::new(AGENT_JOB);
    job.add_need(ACTIVATION_JOB);
    job.timeout_minutes = 20;
    job.permissions = Permissions::from_pairs(&[
        (Scope::Contents, Level::Read),
        (Scope::Issues, Level::Read),
        (Scope::PullRequests, Level::Read),
    ]);
    job.env.insert(
        "GH_AW_SAFE_OUTPUTS".to_string(),
        SAFE_OUTPUTS_PATH.to_string(),
    );

    // 1. Workspace and prompt
    job.steps.push(Step::uses("Checkout repository", "actions/checkout@v5"));
    job.steps.push(
        Step::uses("Download prompt", "actions/download-artifact@v4")
            .with_input("name", "prompt")
            .with_input("path", "/tmp/gh-aw/aw-prompts/"),
    );

    // 2. MCP configuration
    let config_path = mcp_config_path(decl.engine);
    job.steps.push(Step::run(
        "Write MCP configuration",
        format!(
            "mkdir -p {MCP_CONFIG_DIR}\ncat > {config_path} << 'EOF'\n{mcp_config}EOF"
        ),
    ));

    // 3. Firewall
    if network.firewall.enabled {
        job.steps.push(firewall_install_step(network.firewall.version.as_deref()));
    }

    // 4. Agent execution
    match engine_command(decl.engine, &config_path) {
        Some(command) => {
            let run = if network.firewall.enabled {
                let args: Vec<String> = network.firewall_args().iter().map(|a| shell_quote(a)).collect();
                format!("sudo -E awf --env-all {} -- {command}", args.join(" "))
            } else {
                command
            };
            let mut step = Step::run(format!("Execute {} agent", decl.engine.id()), run);
            step.env = passthrough.clone();
            job.steps.push(step);
        }
        None => {
            tracing::debug!(workflow = %decl.name, "custom engine, no execution step emitted");
        }
    }

    if network.firewall.enabled {
        job.steps.push(Step::run(
            "Clean up firewall",
            format!("{} || true", network.firewall.cleanup_script),
        ));
    }

    // 5. Collect outputs for the safe-output jobs
    if !safe_outputs.is_empty() {
        let mut collect = Step::uses("Collect agent output", "actions/github-script@v8")
            .with_id("collect_output")
            .with_input(
                "script",
                "const { main } = require('/opt/gh-aw/actions/collect_output.cjs');\nawait main();",
            )
            .with_env("GH_AW_SAFE_OUTPUTS_TYPES", safe_outputs.enabled_jobs().join(","));
        if !output_domains.is_empty() {
            collect = collect.with_env("GH_AW_ALLOWED_DOMAINS", output_domains.join(","));
        }
        job.steps.push(collect);
        job.steps.push(
            Step::uses("Upload agent output", "actions/upload-artifact@v4")
                .with_input("name", "agent_output.json")
                .with_input("path", SAFE_OUTPUTS_PATH),
        );
        if safe_outputs.create_pull_request.is_some() || safe_outputs.push_to_pull_request_branch.is_some() {
            job.steps.push(
                Step::run("Generate patch", "git format-patch --stdout origin/HEAD > /tmp/gh-aw/aw.patch || true"),
            );
            job.steps.push(
                Step::uses("Upload patch", "actions/upload-artifact@v4")
                    .with_input("name", "aw.patch")
                    .with_input("path", "/tmp/gh-aw/aw.patch"),
            );
        }
        for output in ["output", "output_types"] {
            job.outputs.insert(
                output.to_string(),
                format!("${{{{ steps.collect_output.outputs.{output} }}}}"),
            );
        }
    }

    job
}

fn detection_job() -> Job {
    let mut job = Job::new(DETECTION_JOB);
    job.add_need(AGENT_JOB);
    job.permissions = Permissions::from_pairs(&[(Scope::Contents, Level::Read)]);
    job.steps.push(
        Step::uses("Download agent output artifact", "actions/download-artifact@v4")
            .with_input("name", "agent_output.json")
            .with_input("path", "/tmp/gh-aw/threat-detection/"),
    );
    job.steps.push(
        Step::uses("Detect threats", "actions/github-script@v8")
            .with_id("detection_conclusion")
            .with_input(
                "script",
                "const { main } = require('/opt/gh-aw/actions/detect_threats.cjs');\nawait main();",
            ),
    );
    job.outputs.insert(
        "success".to_string(),
        "${{ steps.detection_conclusion.outputs.success }}".to_string(),
    );
    job
}

/// Require a successful threat scan before the job may act.
fn gate_on_detection(job: &mut Job) {
    job.add_need(DETECTION_JOB);
    let gated = match job.condition.take() {
        Some(existing) => Condition::Expr(existing).and(detection_success()),
        None => detection_success(),
    };
    job.condition = Some(gated.render());
}

fn safe_output_jobs(config: &SafeOutputsConfig, ctx: &JobContext<'_>) -> crate::Result<Vec<Job>> {
    let mut jobs = Vec::new();
    push_job(&mut jobs, config.create_issue.as_ref(), ctx)?;
    push_job(&mut jobs, config.create_discussion.as_ref(), ctx)?;
    push_job(&mut jobs, config.add_comment.as_ref(), ctx)?;
    push_job(&mut jobs, config.add_labels.as_ref(), ctx)?;
    push_job(&mut jobs, config.close_issue.as_ref(), ctx)?;
    push_job(&mut jobs, config.create_pull_request.as_ref(), ctx)?;
    push_job(&mut jobs, config.push_to_pull_request_branch.as_ref(), ctx)?;
    push_job(&mut jobs, config.add_reviewer.as_ref(), ctx)?;
    push_job(&mut jobs, config.update_project.as_ref(), ctx)?;
    push_job(&mut jobs, config.assign_to_agent.as_ref(), ctx)?;
    Ok(jobs)
}

fn push_job<K: SafeOutputKind>(
    jobs: &mut Vec<Job>,
    config: Option<&K>,
    ctx: &JobContext<'_>,
) -> crate::Result<()> {
    if config.is_some() {
        jobs.push(build_job(config, ctx)?);
    }
    Ok(())
}

fn mcp_config_path(engine: EngineKind) -> String {
    let file = match engine.capabilities().grammar {
        Grammar::Json => "mcp-servers.json",
        Grammar::Toml => "config.toml",
    };
    format!("{MCP_CONFIG_DIR}/{file}")
}

fn engine_command(engine: EngineKind, config_path: &str) -> Option<String> {
    let prompt = format!("\"$(cat {PROMPT_PATH})\"");
    match engine {
        EngineKind::Claude => Some(format!("claude --print --mcp-config {config_path} {prompt}")),
        EngineKind::Copilot => Some(format!(
            "copilot --additional-mcp-config @{config_path} --prompt {prompt}"
        )),
        EngineKind::Codex => Some(format!(
            "CODEX_HOME={MCP_CONFIG_DIR} codex exec --full-auto {prompt}"
        )),
        EngineKind::Custom => None,
    }
}

fn firewall_install_step(version: Option<&str>) -> Step {
    let url = match version {
        Some(v) => format!("{FIREWALL_RELEASES}/download/{v}/awf-linux-x64"),
        None => format!("{FIREWALL_RELEASES}/latest/download/awf-linux-x64"),
    };
    Step::run(
        "Install awf binary",
        format!(
            "curl -fsSL -o /tmp/awf \"{url}\"\nchmod +x /tmp/awf\nsudo mv /tmp/awf /usr/local/bin/awf\nawf --version"
        ),
    )
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./,:=@".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

fn workflow_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::spec::StdioLaunch;

    fn parse(toml_str: &str) -> WorkflowDeclaration {
        toml::from_str(toml_str).expect("valid TOML")
    }

    fn names(compiled: &CompiledWorkflow) -> Vec<&str> {
        compiled.jobs.iter().map(|j| j.name.as_str()).collect()
    }

    #[test]
    fn test_browser_allow_list_end_to_end() {
        let decl = parse(
            r#"
            name = "browse"

            [tools.playwright]
            allowed_domains = ["example.com"]

            [network]
            allowed = ["example.com"]
            "#,
        );
        let compiled = compile(&decl).unwrap();

        assert_eq!(compiled.network.allowed_domains, vec!["example.com".to_string()]);

        let playwright = compiled.servers.iter().find(|s| s.name() == "playwright").unwrap();
        let McpServerSpec::Stdio(server) = playwright else {
            panic!("playwright should be a stdio server");
        };
        let StdioLaunch::Command { command, args } = &server.launch else {
            panic!("playwright should be launch-ready");
        };
        assert_eq!(command, "docker");
        assert!(args.windows(2).any(|w| w[0] == "--allowed-hosts" && w[1] == "example.com"));
        assert!(args.windows(2).any(|w| w[0] == "--allowed-origins" && w[1] == "example.com"));

        let agent = compiled.job("agent").unwrap();
        let execute = agent.steps.iter().find(|s| s.name == "Execute claude agent").unwrap();
        assert!(execute
            .run
            .as_deref()
            .unwrap()
            .starts_with("sudo -E awf --env-all --allow-domains example.com --log-level info -- claude"));
    }

    #[test]
    fn test_minimal_workflow() {
        let compiled = compile(&parse(r#"name = "hello""#)).unwrap();
        assert_eq!(names(&compiled), vec!["activation", "agent"]);
        assert_eq!(compiled.mcp_config, "{\n  \"mcpServers\": {}\n}\n");
        assert!(compiled.job("agent").unwrap().outputs.is_empty());
    }

    #[test]
    fn test_safe_outputs_and_detection() {
        let decl = parse(
            r#"
            name = "triage"
            command = "triage"

            [safe-outputs]
            threat-detection = true

            [safe-outputs.add-labels]
            allowed = ["bug"]

            [safe-outputs.create-issue]
            "#,
        );
        let compiled = compile(&decl).unwrap();
        assert_eq!(
            names(&compiled),
            vec!["activation", "agent", "detection", "add_labels", "create_issue"]
        );

        let issue = compiled.job("create_issue").unwrap();
        assert_eq!(issue.needs, vec!["agent", "detection"]);
        let condition = issue.condition.as_deref().unwrap();
        assert!(condition.ends_with("&& (needs.detection.outputs.success == 'true')"));
        assert!(condition.contains("startsWith(github.event.comment.body, '/triage')"));

        let agent = compiled.job("agent").unwrap();
        assert_eq!(agent.outputs["output_types"], "${{ steps.collect_output.outputs.output_types }}");
        assert!(compiled.job("activation").unwrap().condition.is_some());
    }

    #[test]
    fn test_codex_renders_toml() {
        let decl = parse(
            r#"
            name = "codex-flow"
            engine = "codex"

            [tools.search]
            url = "http://localhost:8080/mcp"
            "#,
        );
        let compiled = compile(&decl).unwrap();
        assert!(compiled.mcp_config.starts_with("[mcp_servers.search]\n"));
        assert!(compiled.mcp_config.contains("host.docker.internal:8080"));
    }

    #[test]
    fn test_sandbox_off_keeps_localhost() {
        let decl = parse(
            r#"
            name = "local"

            [tools.search]
            url = "http://localhost:8080/mcp"

            [sandbox]
            agent = false
            "#,
        );
        let compiled = compile(&decl).unwrap();
        assert!(compiled.mcp_config.contains("http://localhost:8080/mcp"));
    }

    #[test]
    fn test_copilot_passthrough_env_on_execute_step() {
        let decl = parse(
            r#"
            name = "copilot-flow"
            engine = "copilot"

            [tools.search]
            url = "https://search.example.com/mcp"
            headers = { Authorization = "Bearer ${{ secrets.SEARCH_KEY }}" }
            "#,
        );
        let compiled = compile(&decl).unwrap();
        let agent = compiled.job("agent").unwrap();
        let execute = agent.steps.iter().find(|s| s.name == "Execute copilot agent").unwrap();
        assert_eq!(execute.env["SEARCH_KEY"], "${{ secrets.SEARCH_KEY }}");
        assert!(!compiled.mcp_config.contains("secrets.SEARCH_KEY"));
    }

    #[test]
    fn test_errors_propagate() {
        let decl = parse(
            r#"
            name = "bad"
            [network]
            allowed = ["*"]
            "#,
        );
        assert!(matches!(compile(&decl), Err(WardenError::InvalidDomain(_, _))));
    }

    #[test]
    fn test_batch_isolates_panics() {
        let decls = vec![parse(r#"name = "first""#), parse(r#"name = "second""#)];
        let results = compile_each(&decls, |decl| {
            if decl.name == "first" {
                panic!("boom");
            }
            compile(decl)
        });
        assert!(matches!(&results[0], Err(WardenError::Internal(name, msg)) if name == "first" && msg == "boom"));
        assert!(results[1].is_ok());
        assert!(results[0]
            .as_ref()
            .unwrap_err()
            .to_string()
            .contains("this is a bug, please file an issue"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("example.com,*.github.com"), "'example.com,*.github.com'");
        assert_eq!(shell_quote("--log-level"), "--log-level");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }
}
