//! Ecosystem identifier expansion.

/// Canonical domain sets per ecosystem identifier.
const ECOSYSTEMS: &[(&str, &[&str])] = &[
    (
        "defaults",
        &[
            "crl3.digicert.com",
            "crl4.digicert.com",
            "json-schema.org",
            "ocsp.digicert.com",
            "archive.ubuntu.com",
            "security.ubuntu.com",
            "api.snapcraft.io",
            "packages.microsoft.com",
        ],
    ),
    (
        "github",
        &[
            "github.com",
            "api.github.com",
            "raw.githubusercontent.com",
            "objects.githubusercontent.com",
            "codeload.github.com",
        ],
    ),
    (
        "node",
        &[
            "registry.npmjs.org",
            "registry.yarnpkg.com",
            "nodejs.org",
            "npmjs.com",
            "npm.pkg.github.com",
        ],
    ),
    (
        "python",
        &[
            "pypi.org",
            "files.pythonhosted.org",
            "pypi.python.org",
            "bootstrap.pypa.io",
            "conda.anaconda.org",
        ],
    ),
    (
        "containers",
        &[
            "ghcr.io",
            "quay.io",
            "mcr.microsoft.com",
            "*.docker.io",
            "docker.io",
            "*.docker.com",
            "docker.com",
        ],
    ),
    (
        "go",
        &["proxy.golang.org", "sum.golang.org", "go.dev", "golang.org"],
    ),
    (
        "rust",
        &["crates.io", "index.crates.io", "static.crates.io", "static.rust-lang.org"],
    ),
];

/// Domains for an ecosystem identifier, or `None` if the name is unknown.
pub fn ecosystem_domains(name: &str) -> Option<&'static [&'static str]> {
    ECOSYSTEMS
        .iter()
        .find(|(id, _)| *id == name)
        .map(|(_, domains)| *domains)
}

/// All known ecosystem identifiers, sorted.
pub fn known_ecosystems() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = ECOSYSTEMS.iter().map(|(id, _)| *id).collect();
    names.sort_unstable();
    names
}
