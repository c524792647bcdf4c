//! Allow-list entry classification and pattern validation.
//!
//! An entry is either an ecosystem identifier (no dot, no protocol separator,
//! expanded elsewhere) or a domain pattern with an optional `http://` or
//! `https://` prefix and at most one leading `*.` wildcard.

use std::fmt;

/// Classification of a single allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEntry {
    /// Short name expanded to an ecosystem's domain set (e.g. `python`).
    Ecosystem(String),
    /// Exact host, e.g. `api.example.com`.
    Explicit {
        protocol: Option<Protocol>,
        host: String,
    },
    /// Leading wildcard, e.g. `*.example.com` (stores `example.com`).
    Wildcard {
        protocol: Option<Protocol>,
        base: String,
    },
}

/// Protocol prefix permitted on an allow-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl DomainEntry {
    /// Render the entry back to the form the firewall consumes.
    pub fn to_pattern(&self) -> String {
        match self {
            DomainEntry::Ecosystem(name) => name.clone(),
            DomainEntry::Explicit { protocol, host } => {
                format!("{}{}", protocol_prefix(*protocol), host)
            }
            DomainEntry::Wildcard { protocol, base } => {
                format!("{}*.{}", protocol_prefix(*protocol), base)
            }
        }
    }
}

fn protocol_prefix(protocol: Option<Protocol>) -> &'static str {
    match protocol {
        Some(Protocol::Http) => "http://",
        Some(Protocol::Https) => "https://",
        None => "",
    }
}

/// One variant per violation class, each with its own message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainPatternError {
    Empty,
    WildcardOnly,
    WildcardWithoutBase(String),
    MissingHost(String),
    MultipleWildcards(String),
    MisplacedWildcard(String),
    UnsupportedProtocol(String, String),
    InvalidCharacter(String, char),
    LeadingDot(String),
    TrailingDot(String),
    ConsecutiveDots(String),
}

impl fmt::Display for DomainPatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainPatternError::Empty => write!(f, "domain cannot be empty"),
            DomainPatternError::WildcardOnly => write!(
                f,
                "wildcard-only domain '*' is not allowed; use a pattern such as '*.example.com'"
            ),
            DomainPatternError::WildcardWithoutBase(d) => write!(
                f,
                "wildcard pattern '{d}' must have a domain after '*.', e.g. '*.example.com'"
            ),
            DomainPatternError::MissingHost(d) => {
                write!(f, "domain '{d}' has no host after the protocol")
            }
            DomainPatternError::MultipleWildcards(d) => write!(
                f,
                "domain '{d}' contains multiple wildcards; only a single leading '*.' is allowed"
            ),
            DomainPatternError::MisplacedWildcard(d) => write!(
                f,
                "domain '{d}' has a wildcard in invalid position; wildcards may only appear as a leading '*.' segment"
            ),
            DomainPatternError::UnsupportedProtocol(d, proto) => write!(
                f,
                "domain '{d}' uses unsupported protocol '{proto}://'; only http:// and https:// are allowed"
            ),
            DomainPatternError::InvalidCharacter(d, c) => write!(
                f,
                "domain '{d}' contains invalid character '{c}'; labels may only contain letters, digits, and hyphens"
            ),
            DomainPatternError::LeadingDot(d) => {
                write!(f, "domain '{d}' cannot start with a dot")
            }
            DomainPatternError::TrailingDot(d) => write!(f, "domain '{d}' cannot end with a dot"),
            DomainPatternError::ConsecutiveDots(d) => {
                write!(f, "domain '{d}' cannot contain consecutive dots")
            }
        }
    }
}

impl std::error::Error for DomainPatternError {}

/// True when the value names an ecosystem rather than a host.
pub fn is_ecosystem_identifier(value: &str) -> bool {
    !value.is_empty() && !value.contains('.') && !value.contains("://") && !value.contains('*')
}

/// Validate one allow-list entry without classifying it.
pub fn validate_domain_pattern(value: &str) -> Result<(), DomainPatternError> {
    classify_domain(value).map(|_| ())
}

/// Classify and validate one allow-list entry.
pub fn classify_domain(value: &str) -> Result<DomainEntry, DomainPatternError> {
    let trimmed = value.trim();

    // 1. Empty and bare wildcard come first; neither contains a dot
    if trimmed.is_empty() {
        return Err(DomainPatternError::Empty);
    }
    if trimmed == "*" {
        return Err(DomainPatternError::WildcardOnly);
    }
    if is_ecosystem_identifier(trimmed) {
        return Ok(DomainEntry::Ecosystem(trimmed.to_string()));
    }

    // 2. Optional protocol prefix
    let (protocol, rest) = split_protocol(trimmed)?;

    // 3. Wildcard placement
    let wildcards = rest.matches('*').count();
    if wildcards > 1 {
        return Err(DomainPatternError::MultipleWildcards(trimmed.to_string()));
    }
    let (is_wildcard, host) = match rest.strip_prefix("*.") {
        Some(base) => (true, base),
        None if wildcards == 1 => {
            return Err(DomainPatternError::MisplacedWildcard(trimmed.to_string()));
        }
        None => (false, rest),
    };
    if host.is_empty() {
        return Err(if is_wildcard {
            DomainPatternError::WildcardWithoutBase(trimmed.to_string())
        } else {
            DomainPatternError::MissingHost(trimmed.to_string())
        });
    }

    // 4. Dot structure
    if host.starts_with('.') {
        return Err(DomainPatternError::LeadingDot(trimmed.to_string()));
    }
    if host.ends_with('.') {
        return Err(DomainPatternError::TrailingDot(trimmed.to_string()));
    }
    if host.contains("..") {
        return Err(DomainPatternError::ConsecutiveDots(trimmed.to_string()));
    }

    // 5. Label characters
    if let Some(c) = host
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '.'))
    {
        return Err(DomainPatternError::InvalidCharacter(trimmed.to_string(), c));
    }

    let host = host.to_string();
    Ok(if is_wildcard {
        DomainEntry::Wildcard {
            protocol,
            base: host,
        }
    } else {
        DomainEntry::Explicit { protocol, host }
    })
}

fn split_protocol(value: &str) -> Result<(Option<Protocol>, &str), DomainPatternError> {
    if let Some(rest) = value.strip_prefix("https://") {
        return Ok((Some(Protocol::Https), rest));
    }
    if let Some(rest) = value.strip_prefix("http://") {
        return Ok((Some(Protocol::Http), rest));
    }
    match value.split_once("://") {
        Some((proto, _)) => Err(DomainPatternError::UnsupportedProtocol(
            value.to_string(),
            proto.to_string(),
        )),
        None => Ok((None, value)),
    }
}
