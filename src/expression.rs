//! Job trigger condition expressions.
//!
//! Conditions are built as a tree and rendered once, so parenthesization is
//! decided in one place instead of by string concatenation at every call site.

/// Name of the agent-execution job every safe-output job depends on.
pub const AGENT_JOB: &str = "agent";

/// Name of the optional threat-detection job.
pub const DETECTION_JOB: &str = "detection";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Pre-rendered expression text.
    Expr(String),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Paren(Box<Condition>),
    /// Flat OR over many terms, avoiding deep nesting.
    Disjunction(Vec<Condition>),
    FunctionCall(String, Vec<Condition>),
    Property(String),
    StringLiteral(String),
    Comparison(Box<Condition>, &'static str, Box<Condition>),
}

impl Condition {
    pub fn render(&self) -> String {
        match self {
            Condition::Expr(e) => e.clone(),
            Condition::And(l, r) => format!("({}) && ({})", l.render(), r.render()),
            Condition::Or(l, r) => format!("({}) || ({})", l.render(), r.render()),
            // `!cancelled()` rather than `!(cancelled())`
            Condition::Not(child) => match child.as_ref() {
                Condition::FunctionCall(..) => format!("!{}", child.render()),
                _ => format!("!({})", child.render()),
            },
            Condition::Paren(child) => format!("({})", child.render()),
            Condition::Disjunction(terms) => terms
                .iter()
                .map(Condition::render)
                .collect::<Vec<_>>()
                .join(" || "),
            Condition::FunctionCall(name, args) => format!(
                "{}({})",
                name,
                args.iter().map(Condition::render).collect::<Vec<_>>().join(", ")
            ),
            Condition::Property(path) => path.clone(),
            Condition::StringLiteral(s) => format!("'{s}'"),
            Condition::Comparison(l, op, r) => format!("{} {} {}", l.render(), op, r.render()),
        }
    }

    pub fn and(self, other: Condition) -> Condition {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Condition {
        Condition::Or(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> Condition {
        Condition::Not(Box::new(self))
    }
}

pub fn property(path: impl Into<String>) -> Condition {
    Condition::Property(path.into())
}

pub fn string_literal(value: impl Into<String>) -> Condition {
    Condition::StringLiteral(value.into())
}

pub fn function_call(name: impl Into<String>, args: Vec<Condition>) -> Condition {
    Condition::FunctionCall(name.into(), args)
}

pub fn equals(left: Condition, right: Condition) -> Condition {
    Condition::Comparison(Box::new(left), "==", Box::new(right))
}

pub fn not_equals(left: Condition, right: Condition) -> Condition {
    Condition::Comparison(Box::new(left), "!=", Box::new(right))
}

/// Fold terms into a left-nested AND. `None` for an empty list.
pub fn all_of(terms: Vec<Condition>) -> Option<Condition> {
    terms.into_iter().reduce(Condition::and)
}

/// Run when the agent produced at least one output of `kind`.
///
/// With `min > 0` the job must run even with no outputs so the script can
/// enforce the minimum, so only the base check is kept.
pub fn safe_output_type(kind: &str, min: u32) -> Condition {
    let base = function_call("cancelled", vec![]).not().and(not_equals(
        property(format!("needs.{AGENT_JOB}.result")),
        string_literal("skipped"),
    ));
    if min > 0 {
        return Condition::Paren(Box::new(base));
    }
    base.and(function_call(
        "contains",
        vec![
            property(format!("needs.{AGENT_JOB}.outputs.output_types")),
            string_literal(kind),
        ],
    ))
}

/// The triggering event text starts a `/command` invocation.
pub fn command_match(command: &str) -> Condition {
    let needle = format!("/{command}");
    Condition::Disjunction(
        [
            "github.event.issue.body",
            "github.event.comment.body",
            "github.event.pull_request.body",
            "github.event.discussion.body",
        ]
        .into_iter()
        .map(|path| function_call("startsWith", vec![property(path), string_literal(needle.as_str())]))
        .collect(),
    )
}

/// Threat detection passed.
pub fn detection_success() -> Condition {
    equals(
        property(format!("needs.{DETECTION_JOB}.outputs.success")),
        string_literal("true"),
    )
}

/// Triggered from an issue or an issue comment.
pub fn issue_context() -> Condition {
    property("github.event.issue.number")
}

/// Triggered from a pull request, or from an issue comment on one.
pub fn pull_request_context() -> Condition {
    Condition::Paren(Box::new(
        property("github.event.issue.number").and(property("github.event.issue.pull_request")),
    ))
    .or(property("github.event.pull_request"))
}

/// Triggered from an issue, pull request, or discussion.
pub fn issue_pr_or_discussion_context() -> Condition {
    Condition::Disjunction(vec![
        property("github.event.issue.number"),
        property("github.event.pull_request.number"),
        property("github.event.discussion.number"),
    ])
}

/// Triggered from an issue or a pull request.
pub fn issue_or_pr_context() -> Condition {
    Condition::Disjunction(vec![
        property("github.event.issue.number"),
        property("github.event.pull_request.number"),
    ])
}
