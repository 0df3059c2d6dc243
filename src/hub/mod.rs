//! Knowledge hub
//!
//! In-process [`KnowledgeStore`] serving seed policies, the tool catalog, a
//! small runbook and per-task memory, plus a deterministic
//! [`SimulatedTools`] executor. Remote deployments can point the engine at
//! another store; nothing in the core depends on this one.

mod simulator;

pub use simulator::SimulatedTools;

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::RwLock;
use tracing::debug;
use vigil_core::{
    KnowledgeStore, MemoryEntry, PolicySnippet, Result, SearchHit, ToolDescriptor,
};

/// A titled runbook entry
#[derive(Debug, Clone)]
pub struct RunbookEntry {
    /// Short title
    pub title: String,
    /// Guidance text
    pub text: String,
}

/// Seeded in-memory knowledge store
pub struct KnowledgeHub {
    policies: RwLock<Vec<PolicySnippet>>,
    tools: Vec<ToolDescriptor>,
    runbook: Vec<RunbookEntry>,
    memory: DashMap<String, Vec<MemoryEntry>>,
}

impl Default for KnowledgeHub {
    fn default() -> Self {
        Self::seeded()
    }
}

impl KnowledgeHub {
    /// Empty hub
    #[must_use]
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            policies: RwLock::new(Vec::new()),
            tools,
            runbook: Vec::new(),
            memory: DashMap::new(),
        }
    }

    /// Hub with the default policies, tools and runbook
    #[must_use]
    pub fn seeded() -> Self {
        let mut hub = Self::new(vec![
            ToolDescriptor::new("run_script", "Executes a script or shell command."),
            ToolDescriptor::new("fetch_data", "Fetches data from an API."),
            ToolDescriptor::new("restart_service", "Restarts a local service by name."),
        ]);
        hub.policies = RwLock::new(
            ["Disallow: delete", "Disallow: shutdown", "Disallow: rm -rf"]
                .into_iter()
                .map(|p| PolicySnippet::new(p, "global"))
                .collect(),
        );
        hub.runbook = vec![
            RunbookEntry {
                title: "Delete operations".into(),
                text: "Never run 'rm -rf' on production. Archive to backup first. Only the operations team may approve deletions.".into(),
            },
            RunbookEntry {
                title: "Shutdown procedure".into(),
                text: "Planned shutdowns must be scheduled and approved; an emergency shutdown needs signoff from on-call.".into(),
            },
            RunbookEntry {
                title: "Deploy checklist".into(),
                text: "Deploy to staging first. Run health checks: check disk, check database connections, run smoke tests.".into(),
            },
        ];
        hub
    }

    /// Add a policy at runtime
    pub fn add_policy(&self, snippet: PolicySnippet) {
        self.policies
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(snippet);
    }

    /// Memory recorded for a task, oldest first
    #[must_use]
    pub fn memory_for(&self, task_id: &str) -> Vec<MemoryEntry> {
        self.memory
            .get(task_id)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    fn policies(&self) -> Vec<PolicySnippet> {
        self.policies
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| w.len() > 1)
        .map(str::to_string)
        .collect()
}

/// Share of query words present in `text`
fn keyword_score(query: &HashSet<String>, text: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let hits = words(text).intersection(query).count();
    hits as f64 / query.len() as f64
}

#[async_trait::async_trait]
impl KnowledgeStore for KnowledgeHub {
    async fn get_policies(&self, context: &str) -> Result<Vec<PolicySnippet>> {
        debug!(context_len = context.len(), "Serving policies");
        Ok(self.policies())
    }

    async fn get_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.tools.clone())
    }

    async fn append_memory(&self, entry: MemoryEntry) -> Result<()> {
        self.memory
            .entry(entry.task_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let query = words(query);
        let mut hits: Vec<SearchHit> = Vec::new();

        for entry in &self.runbook {
            hits.push(SearchHit {
                text: format!("{}: {}", entry.title, entry.text),
                source: "runbook".into(),
                score: keyword_score(&query, &format!("{} {}", entry.title, entry.text)),
            });
        }
        for policy in self.policies() {
            hits.push(SearchHit {
                score: keyword_score(&query, &policy.text),
                text: policy.text,
                source: "policy".into(),
            });
        }
        for tool in &self.tools {
            hits.push(SearchHit {
                text: format!("Tool {}: {}", tool.name, tool.description),
                source: "tool".into(),
                score: keyword_score(&query, &format!("{} {}", tool.name, tool.description)),
            });
        }
        for entries in self.memory.iter() {
            for m in entries.value() {
                let text = format!("{} {} {}", m.thought, m.action, m.observation);
                hits.push(SearchHit {
                    score: keyword_score(&query, &text),
                    text,
                    source: "memory".into(),
                });
            }
        }

        hits.retain(|h| h.score > 0.0);
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn memory_entry(task_id: &str, thought: &str, action: &str, observation: &str) -> MemoryEntry {
        MemoryEntry {
            task_id: task_id.to_string(),
            thought: thought.to_string(),
            action: action.to_string(),
            observation: observation.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_seeded_catalog_and_policies() {
        let hub = KnowledgeHub::seeded();
        let tools = hub.get_tools().await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["run_script", "fetch_data", "restart_service"]);

        let policies = hub.get_policies("restart web").await.unwrap();
        assert_eq!(policies.len(), 3);
        assert!(policies.iter().all(|p| p.text.starts_with("Disallow:")));
    }

    #[tokio::test]
    async fn test_memory_is_per_task_and_ordered() {
        let hub = KnowledgeHub::seeded();
        hub.append_memory(memory_entry("task-a", "t1", "run_script ls", "ok"))
            .await
            .unwrap();
        hub.append_memory(memory_entry("task-a", "t2", "fetch_data", "200"))
            .await
            .unwrap();
        hub.append_memory(memory_entry("task-b", "t", "x", "y"))
            .await
            .unwrap();

        let a = hub.memory_for("task-a");
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].thought, "t1");
        assert!(hub.memory_for("task-c").is_empty());
    }

    #[tokio::test]
    async fn test_search_ranks_and_limits() {
        let hub = KnowledgeHub::seeded();
        let hits = hub.search("shutdown procedure", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "runbook");
        assert!(hits[0].text.contains("Shutdown procedure"));
        assert!(hits[0].score >= hits[1].score);

        assert!(hub.search("zzz", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_added_policy_is_served() {
        let hub = KnowledgeHub::seeded();
        hub.add_policy(PolicySnippet::new("Disallow: drop table", "dba").with_weight(0.8));
        let policies = hub.get_policies("").await.unwrap();
        assert_eq!(policies.len(), 4);
        assert_eq!(policies[3].weight, 0.8);
    }
}
