//! Well-known package-runner launchers and their default container images.

/// A package runner that can be moved into a container without changing
/// runtime behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnownLauncher {
    pub command: &'static str,
    pub image: &'static str,
    pub entrypoint: &'static str,
}

const LAUNCHERS: &[WellKnownLauncher] = &[
    WellKnownLauncher {
        command: "npx",
        image: "node:lts-alpine",
        entrypoint: "npx",
    },
    WellKnownLauncher {
        command: "uvx",
        image: "ghcr.io/astral-sh/uv:python3.12-alpine",
        entrypoint: "uvx",
    },
];

/// Look up a launcher by exact command name.
pub fn well_known_launcher(command: &str) -> Option<&'static WellKnownLauncher> {
    LAUNCHERS.iter().find(|l| l.command == command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npx_maps_to_node_image() {
        let launcher = well_known_launcher("npx").unwrap();
        assert_eq!(launcher.image, "node:lts-alpine");
        assert_eq!(launcher.entrypoint, "npx");
    }

    #[test]
    fn test_exact_match_only() {
        assert!(well_known_launcher("uvx").is_some());
        assert!(well_known_launcher("npx @acme/tool").is_none());
        assert!(well_known_launcher("node").is_none());
    }
}
