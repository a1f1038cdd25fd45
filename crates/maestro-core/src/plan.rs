//! Pipeline plans
//!
//! A [`PipelinePlan`] is an immutable, validated dependency graph of agent
//! steps. Construction rejects unknown dependencies and cycles, and assigns
//! every step a parallel group by topological layering: a step lands one
//! group after the latest of its dependencies, so steps with no mutual
//! dependency share a group and can fan out together.
//!
//! Re-planning never mutates a plan; [`PipelinePlan::replan`] builds a new
//! one that records the id it supersedes.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Step description before validation (template or caller supplied)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    /// Step key, unique within the plan
    pub key: String,
    /// Agent type the host should run
    pub agent_type: String,
    /// Instruction handed to the agent
    pub instruction: String,
    /// Keys of steps that must succeed first
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl StepSpec {
    /// Create a step spec
    pub fn new(
        key: impl Into<String>,
        agent_type: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            agent_type: agent_type.into(),
            instruction: instruction.into(),
            depends_on: Vec::new(),
        }
    }

    /// Add a dependency on another step key
    #[must_use]
    pub fn after(mut self, key: impl Into<String>) -> Self {
        self.depends_on.push(key.into());
        self
    }
}

/// A validated step of a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Session-unique task id (`<plan short id>-<key>`)
    pub task_id: String,
    /// Step key from the `StepSpec`
    pub key: String,
    /// Agent type the host should run
    pub agent_type: String,
    /// Instruction handed to the agent
    pub instruction: String,
    /// Task ids this step waits for
    pub depends_on: BTreeSet<String>,
    /// Fan-out group; groups run strictly in ascending order
    pub parallel_group: u32,
}

/// Immutable multi-agent plan for one instruction
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelinePlan {
    id: Uuid,
    template: String,
    steps: Vec<PlanStep>,
    supersedes: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl PipelinePlan {
    /// Build and validate a plan
    pub fn build(template: impl Into<String>, specs: Vec<StepSpec>) -> Result<Self> {
        Self::build_inner(template.into(), specs, None)
    }

    /// Build a replacement plan that supersedes this one
    pub fn replan(&self, template: impl Into<String>, specs: Vec<StepSpec>) -> Result<Self> {
        Self::build_inner(template.into(), specs, Some(self.id))
    }

    fn build_inner(template: String, specs: Vec<StepSpec>, supersedes: Option<Uuid>) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::Configuration(format!(
                "plan template '{}' has no steps",
                template
            )));
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, spec) in specs.iter().enumerate() {
            if spec.key.trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "plan template '{}' has a step without a key",
                    template
                )));
            }
            if index.insert(spec.key.as_str(), i).is_some() {
                return Err(Error::Configuration(format!(
                    "plan template '{}' repeats step '{}'",
                    template, spec.key
                )));
            }
        }
        for spec in &specs {
            for dep in &spec.depends_on {
                if !index.contains_key(dep.as_str()) {
                    return Err(Error::Configuration(format!(
                        "step '{}' depends on unknown step '{}'",
                        spec.key, dep
                    )));
                }
            }
        }

        let groups = layer(&specs, &index)?;

        let id = Uuid::new_v4();
        let short = id.simple().to_string()[..8].to_string();
        let task_id = |key: &str| format!("{}-{}", short, key);

        let mut steps: Vec<PlanStep> = specs
            .iter()
            .zip(groups)
            .map(|(spec, group)| PlanStep {
                task_id: task_id(spec.key.as_str()),
                key: spec.key.clone(),
                agent_type: spec.agent_type.clone(),
                instruction: spec.instruction.clone(),
                depends_on: spec.depends_on.iter().map(|d| task_id(d.as_str())).collect(),
                parallel_group: group,
            })
            .collect();
        // Stable: declaration order within a group
        steps.sort_by_key(|s| s.parallel_group);

        Ok(Self {
            id,
            template,
            steps,
            supersedes,
            created_at: Utc::now(),
        })
    }

    /// Plan id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// First eight hex digits of the id (task id prefix)
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    /// Template the plan was built from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Steps ordered by group
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Plan this one replaced, if any
    pub fn supersedes(&self) -> Option<Uuid> {
        self.supersedes
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Look up a step by task id
    pub fn step(&self, task_id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.task_id == task_id)
    }

    /// Number of parallel groups
    pub fn group_count(&self) -> usize {
        self.steps
            .last()
            .map(|s| s.parallel_group as usize + 1)
            .unwrap_or(0)
    }

    /// Steps grouped by parallel group, in execution order
    pub fn groups(&self) -> Vec<Vec<&PlanStep>> {
        let mut groups: Vec<Vec<&PlanStep>> = vec![Vec::new(); self.group_count()];
        for step in &self.steps {
            groups[step.parallel_group as usize].push(step);
        }
        groups
    }

    /// One-line human readable outline, e.g. `[a, b] -> [c]`
    pub fn outline(&self) -> String {
        self.groups()
            .iter()
            .map(|g| {
                let keys: Vec<&str> = g.iter().map(|s| s.key.as_str()).collect();
                format!("[{}]", keys.join(", "))
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Kahn's algorithm with layer tracking. Returns the group of each spec, or
/// `PlanCycle` naming the steps that could not be ordered.
fn layer(specs: &[StepSpec], index: &HashMap<&str, usize>) -> Result<Vec<u32>> {
    let n = specs.len();
    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, spec) in specs.iter().enumerate() {
        let deps: BTreeSet<&str> = spec.depends_on.iter().map(String::as_str).collect();
        for dep in deps {
            let d = index[dep];
            indegree[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut group = vec![0u32; n];
    let mut ready: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut placed = 0;

    while let Some(i) = ready.pop() {
        placed += 1;
        for &next in &dependents[i] {
            group[next] = group[next].max(group[i] + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push(next);
            }
        }
    }

    if placed < n {
        let mut stuck: Vec<&str> = (0..n)
            .filter(|&i| indegree[i] > 0)
            .map(|i| specs[i].key.as_str())
            .collect();
        stuck.sort_unstable();
        return Err(Error::PlanCycle(stuck.join(", ")));
    }

    Ok(group)
}

#[cfg(test)]
mod tests;
