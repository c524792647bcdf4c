//! Container transform: declared container launch → launch-ready command.
//!
//! The argument list is built in a fixed order because the compiled output is
//! committed and diffed:
//!
//! 1. base run invocation
//! 2. `-e KEY` per environment key, sorted
//! 3. `-v MOUNT` per mount, sorted
//! 4. user-supplied extra flags
//! 5. `--entrypoint` override, if set
//! 6. image reference
//! 7. entrypoint arguments, verbatim

use crate::mcp::spec::{ContainerLaunch, McpServerSpec, StdioLaunch, StdioServer};

/// Binary that runs containers.
pub const CONTAINER_LAUNCHER: &str = "docker";

const BASE_RUN_ARGS: &[&str] = &["run", "--rm", "-i"];

/// Rewrite a declared container launch into a launcher command.
///
/// Servers that are already launch-ready, and network servers, are returned
/// unchanged.
pub fn to_launch_ready(spec: McpServerSpec) -> McpServerSpec {
    match spec {
        McpServerSpec::Stdio(server) => McpServerSpec::Stdio(transform_stdio(server)),
        other => other,
    }
}

fn transform_stdio(server: StdioServer) -> StdioServer {
    let StdioLaunch::Container(container) = &server.launch else {
        return server;
    };
    let args = container_run_args(container, server.env.keys());
    tracing::debug!(server = %server.name, image = %container.image, "transformed container launch");
    StdioServer {
        launch: StdioLaunch::Command {
            command: CONTAINER_LAUNCHER.to_string(),
            args,
        },
        ..server
    }
}

/// Build the launcher argument list for a container.
///
/// Environment values are never placed on the command line; only the key is
/// forwarded so the value is inherited from the launching process.
pub fn container_run_args<'a>(
    container: &ContainerLaunch,
    env_keys: impl IntoIterator<Item = &'a String>,
) -> Vec<String> {
    let mut args: Vec<String> = BASE_RUN_ARGS.iter().map(|s| s.to_string()).collect();

    let mut keys: Vec<&String> = env_keys.into_iter().collect();
    keys.sort();
    for key in keys {
        args.push("-e".to_string());
        args.push(key.clone());
    }

    let mut mounts: Vec<&String> = container.mounts.iter().collect();
    mounts.sort();
    for mount in mounts {
        args.push("-v".to_string());
        args.push(mount.clone());
    }

    args.extend(container.extra_args.iter().cloned());

    if let Some(entrypoint) = &container.entrypoint {
        args.push("--entrypoint".to_string());
        args.push(entrypoint.clone());
    }

    args.push(container.image_ref());
    args.extend(container.entrypoint_args.iter().cloned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn server(container: ContainerLaunch, env: &[(&str, &str)]) -> McpServerSpec {
        McpServerSpec::Stdio(StdioServer {
            name: "tool".to_string(),
            launch: StdioLaunch::Container(container),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            proxy_args: Vec::new(),
            registry: None,
            allowed: None,
            toolsets: Vec::new(),
        })
    }

    fn launch_args(spec: McpServerSpec) -> (String, Vec<String>) {
        match spec {
            McpServerSpec::Stdio(StdioServer {
                launch: StdioLaunch::Command { command, args },
                ..
            }) => (command, args),
            other => panic!("not launch-ready: {other:?}"),
        }
    }

    #[test]
    fn test_full_construction_order() {
        let container = ContainerLaunch {
            image: "ghcr.io/acme/tool".to_string(),
            version: Some("2.1".to_string()),
            entrypoint: Some("/bin/tool".to_string()),
            entrypoint_args: vec!["--zeta".to_string(), "--alpha".to_string()],
            mounts: vec!["/b:/b:ro".to_string(), "/a:/a:rw".to_string()],
            extra_args: vec!["--network".to_string(), "host".to_string()],
        };
        let (command, args) = launch_args(to_launch_ready(server(
            container,
            &[("B", "2"), ("A", "1")],
        )));
        assert_eq!(command, "docker");
        assert_eq!(
            args,
            vec![
                "run", "--rm", "-i", "-e", "A", "-e", "B", "-v", "/a:/a:rw", "-v", "/b:/b:ro",
                "--network", "host", "--entrypoint", "/bin/tool", "ghcr.io/acme/tool:2.1",
                "--zeta", "--alpha",
            ]
        );
    }

    #[test]
    fn test_empty_env_and_mounts_add_no_flags() {
        let container = ContainerLaunch {
            image: "alpine".to_string(),
            ..Default::default()
        };
        let (_, args) = launch_args(to_launch_ready(server(container, &[])));
        assert_eq!(args, vec!["run", "--rm", "-i", "alpine"]);
    }

    #[test]
    fn test_launch_ready_is_unchanged() {
        let spec = McpServerSpec::Stdio(StdioServer {
            name: "plain".to_string(),
            launch: StdioLaunch::Command {
                command: "my-mcp".to_string(),
                args: vec!["--stdio".to_string()],
            },
            env: BTreeMap::new(),
            proxy_args: Vec::new(),
            registry: None,
            allowed: None,
            toolsets: Vec::new(),
        });
        assert_eq!(to_launch_ready(spec.clone()), spec);
    }
}
