//! JobGraph: assembles setup and safe-output jobs into a validated,
//! stably ordered job list.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::WardenError;
use crate::job::Job;

/// Collects jobs and checks their dependency edges on assembly.
#[derive(Debug, Default)]
pub struct JobGraph {
    jobs: BTreeMap<String, Job>,
    /// Names of jobs added through [`JobGraph::add_safe_output_job`].
    safe_output_jobs: BTreeSet<String>,
}

impl JobGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add activation, agent, or detection.
    pub fn add_setup_job(&mut self, job: Job) -> crate::Result<()> {
        self.insert(job)
    }

    pub fn add_safe_output_job(&mut self, job: Job) -> crate::Result<()> {
        let name = job.name.clone();
        self.insert(job)?;
        self.safe_output_jobs.insert(name);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    fn insert(&mut self, job: Job) -> crate::Result<()> {
        if self.jobs.contains_key(&job.name) {
            return Err(WardenError::InvalidJobGraph(
                job.name.clone(),
                "duplicate job name".to_string(),
            ));
        }
        self.jobs.insert(job.name.clone(), job);
        Ok(())
    }

    /// Validate every edge and return the jobs in topological order.
    ///
    /// Among jobs whose dependencies are all satisfied, the one with the
    /// smallest name comes first, so the output is stable across runs.
    pub fn assemble(mut self) -> crate::Result<Vec<Job>> {
        // 1. Edge checks
        for job in self.jobs.values() {
            for need in &job.needs {
                if !self.jobs.contains_key(need) {
                    return Err(WardenError::InvalidJobGraph(
                        job.name.clone(),
                        format!("depends on unknown job '{need}'"),
                    ));
                }
                if self.safe_output_jobs.contains(&job.name) && self.safe_output_jobs.contains(need) {
                    return Err(WardenError::InvalidJobGraph(
                        job.name.clone(),
                        format!("safe output jobs cannot depend on each other (needs '{need}')"),
                    ));
                }
            }
        }

        // 2. Kahn's algorithm with a name-ordered ready set
        let mut pending: BTreeMap<String, usize> = self
            .jobs
            .values()
            .map(|job| (job.name.clone(), job.needs.len()))
            .collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for job in self.jobs.values() {
            for need in &job.needs {
                dependents.entry(need.as_str()).or_default().push(job.name.as_str());
            }
        }
        let mut ready: BTreeSet<String> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| name.clone())
            .collect();

        let mut order = Vec::with_capacity(self.jobs.len());
        while let Some(name) = ready.pop_first() {
            pending.remove(&name);
            if let Some(children) = dependents.get(name.as_str()) {
                for child in children {
                    if let Some(count) = pending.get_mut(*child) {
                        *count -= 1;
                        if *count == 0 {
                            ready.insert(child.to_string());
                        }
                    }
                }
            }
            order.push(name);
        }

        if let Some(stuck) = pending.keys().next() {
            return Err(WardenError::InvalidJobGraph(
                stuck.clone(),
                "dependency cycle".to_string(),
            ));
        }

        tracing::debug!(order = ?order, "assembled job graph");
        Ok(order
            .into_iter()
            .filter_map(|name| self.jobs.remove(&name))
            .collect())
    }
}
