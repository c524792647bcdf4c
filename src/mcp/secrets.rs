//! Credential-reference extraction for header passthrough.
//!
//! Some engines cannot evaluate `${{ secrets.NAME }}` inside their own MCP
//! configuration. For those, every reference is lifted into an environment
//! variable and the header value points at `${NAME}` instead.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

fn secret_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{\{\s*secrets\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex")
    })
}

/// All credential references in one value, left to right, as
/// `(variable name, original expression)` pairs.
pub fn extract_secret_refs(value: &str) -> Vec<(String, String)> {
    secret_ref_pattern()
        .captures_iter(value)
        .map(|caps| (caps[1].to_string(), caps[0].to_string()))
        .collect()
}

/// Variable name → original expression across all header values.
///
/// A value may hold several references. When the same variable is referenced
/// more than once, the first expression seen (in header-name order) is kept.
pub fn extract_secrets_from_headers(
    headers: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut secrets = BTreeMap::new();
    for value in headers.values() {
        for (var, expr) in extract_secret_refs(value) {
            secrets.entry(var).or_insert(expr);
        }
    }
    secrets
}

/// Replace each credential reference with the string `reference(name)` returns.
pub fn substitute_secret_refs(value: &str, reference: impl Fn(&str) -> String) -> String {
    secret_ref_pattern()
        .replace_all(value, |caps: &regex::Captures<'_>| reference(&caps[1]))
        .into_owned()
}

/// Shell-style `${NAME}` reference used for passthrough.
pub fn env_reference(name: &str) -> String {
    format!("${{{name}}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_single_reference() {
        let secrets = extract_secrets_from_headers(&headers(&[(
            "Authorization",
            "Bearer ${{ secrets.API_KEY }}",
        )]));
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets["API_KEY"], "${{ secrets.API_KEY }}");
    }

    #[test]
    fn test_multiple_references_in_one_value() {
        let refs = extract_secret_refs("${{ secrets.USER }}:${{secrets.PASS}}");
        assert_eq!(
            refs,
            vec![
                ("USER".to_string(), "${{ secrets.USER }}".to_string()),
                ("PASS".to_string(), "${{secrets.PASS}}".to_string()),
            ]
        );
    }

    #[test]
    fn test_distinct_entries_across_headers() {
        let secrets = extract_secrets_from_headers(&headers(&[
            ("A", "${{ secrets.TOKEN }}"),
            ("B", "x-${{ secrets.TOKEN }}-${{ secrets.OTHER }}"),
            ("C", "plain"),
        ]));
        assert_eq!(
            secrets.keys().cloned().collect::<Vec<_>>(),
            vec!["OTHER", "TOKEN"]
        );
    }

    #[test]
    fn test_non_secret_expressions_ignored() {
        assert!(extract_secret_refs("${{ github.token }}").is_empty());
        assert!(extract_secret_refs("${API_KEY}").is_empty());
    }

    #[test]
    fn test_substitute() {
        let out = substitute_secret_refs("Bearer ${{ secrets.API_KEY }}", env_reference);
        assert_eq!(out, "Bearer ${API_KEY}");
        assert_eq!(substitute_secret_refs("no refs", env_reference), "no refs");
    }
}
