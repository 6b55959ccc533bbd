// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hone-graph: the job dependency graph and its parallel scheduler.
//!
//! Nodes are stored in a petgraph arena and addressed by index; the job
//! handle and the completion channel live on the node, so nothing holds
//! a reference cycle.

mod scheduler;

use hone_core::{hash, BuildError, Job};
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Per-node state: the job and its completion channel.
///
/// The channel flips to `true` exactly once, after the job's error slot
/// has been written, so any observer woken by it reads the final error.
#[derive(Debug)]
pub struct Node {
    pub job: Arc<Job>,
    done: Arc<watch::Sender<bool>>,
}

impl Node {
    fn new(job: Arc<Job>) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            job,
            done: Arc::new(done),
        }
    }
}

/// Directed graph of jobs; an edge `dep → job` means the dep completes
/// first.
#[derive(Debug)]
pub struct JobGraph {
    graph: DiGraph<Node, ()>,
    ids: HashMap<i64, NodeIndex>,
}

impl JobGraph {
    /// Build the graph, one node per job keyed by the CRC of its name.
    ///
    /// Unknown dependency names fail with `UnknownDep`; two distinct
    /// names hashing to the same CRC are a configuration error.
    /// Duplicate edges collapse. Cycles are caught later, at sort time.
    pub fn build(jobs: &[Arc<Job>]) -> Result<JobGraph, BuildError> {
        let by_name: HashMap<&str, &Arc<Job>> =
            jobs.iter().map(|job| (job.name.as_str(), job)).collect();

        let mut graph = DiGraph::new();
        let mut ids = HashMap::new();

        let insert = |graph: &mut DiGraph<Node, ()>,
                          ids: &mut HashMap<i64, NodeIndex>,
                          job: &Arc<Job>|
         -> Result<NodeIndex, BuildError> {
            let id = job.id();
            if let Some(&idx) = ids.get(&id) {
                let existing: &Node = &graph[idx];
                if existing.job.name != job.name {
                    return Err(BuildError::InvalidJob {
                        job: job.name.clone(),
                        rule: format!("name collides with {} (same CRC)", existing.job.name),
                    });
                }
                return Ok(idx);
            }
            let idx = graph.add_node(Node::new(job.clone()));
            ids.insert(id, idx);
            Ok(idx)
        };

        for job in jobs {
            let job_idx = insert(&mut graph, &mut ids, job)?;

            for dep in job.deps.iter().flatten() {
                let dep_job = by_name
                    .get(dep.as_str())
                    .copied()
                    .ok_or_else(|| BuildError::UnknownDep(dep.clone()))?;
                let dep_idx = insert(&mut graph, &mut ids, dep_job)?;
                graph.update_edge(dep_idx, job_idx, ());
            }
        }

        Ok(JobGraph { graph, ids })
    }

    /// Topologically sorted indices of the nodes with a path to the
    /// target (the target included).
    fn sorted_reachable(&self, target: &str) -> Result<Vec<NodeIndex>, BuildError> {
        let target_idx = *self
            .ids
            .get(&hash::job_id(target))
            .ok_or_else(|| BuildError::UnknownTarget(target.to_string()))?;

        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            BuildError::CyclicGraph(self.graph[cycle.node_id()].job.name.clone())
        })?;

        Ok(sorted
            .into_iter()
            .filter(|&idx| has_path_connecting(&self.graph, idx, target_idx, None))
            .collect())
    }

    /// Visit every node leading to `target` in topological order.
    ///
    /// Errors from `f` are accumulated; iteration does not stop on the
    /// first one.
    pub fn iter_target(
        &self,
        target: &str,
        mut f: impl FnMut(&Node) -> Result<(), BuildError>,
    ) -> Vec<BuildError> {
        let indices = match self.sorted_reachable(target) {
            Ok(indices) => indices,
            Err(err) => return vec![err],
        };

        let mut errors = Vec::new();
        for idx in indices {
            if let Err(err) = f(&self.graph[idx]) {
                errors.push(err);
            }
        }
        errors
    }

    /// Length of the longest reachable job name; sets the log column
    /// width.
    pub fn longest_target(&self, target: &str) -> (usize, Vec<BuildError>) {
        let mut longest = 0;
        let errors = self.iter_target(target, |node| {
            longest = longest.max(node.job.name.len());
            Ok(())
        });
        (longest, errors)
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
