//! Job and step records handed to the manifest writer.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::permissions::Permissions;

pub const DEFAULT_RUNNER: &str = "ubuntu-latest";

/// One job of the compiled workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub name: String,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(rename = "runs-on")]
    pub runs_on: String,
    pub permissions: Permissions,
    #[serde(rename = "timeout-minutes")]
    pub timeout_minutes: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, String>,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Job {
            name: name.into(),
            condition: None,
            runs_on: DEFAULT_RUNNER.to_string(),
            permissions: Permissions::new(),
            timeout_minutes: 10,
            needs: Vec::new(),
            env: BTreeMap::new(),
            steps: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Add a dependency unless already present.
    pub fn add_need(&mut self, job: &str) {
        if !self.needs.iter().any(|n| n == job) {
            self.needs.push(job.to_string());
        }
    }
}

/// One step of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Step {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Step {
    pub fn uses(name: impl Into<String>, action: impl Into<String>) -> Self {
        Step {
            name: name.into(),
            uses: Some(action.into()),
            ..Default::default()
        }
    }

    pub fn run(name: impl Into<String>, script: impl Into<String>) -> Self {
        Step {
            name: name.into(),
            run: Some(script.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_need_deduplicates() {
        let mut job = Job::new("create_issue");
        job.add_need("agent");
        job.add_need("agent");
        job.add_need("detection");
        assert_eq!(job.needs, vec!["agent", "detection"]);
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let mut job = Job::new("noop");
        job.steps.push(Step::run("Say hi", "echo hi"));
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["runs-on"], "ubuntu-latest");
        assert!(value.get("if").is_none());
        assert!(value.get("needs").is_none());
        assert_eq!(value["steps"][0]["run"], "echo hi");
        assert!(value["steps"][0].get("uses").is_none());
    }
}
