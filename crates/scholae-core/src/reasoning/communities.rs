//! Author collaboration communities as connected components.

use super::GraphReasoningEngine;
use crate::capabilities::GraphPattern;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

const MIN_JOINT_PAPERS: u64 = 2;
const PAIR_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub members: Vec<String>,
    pub size: usize,
    /// Constant label; no modularity score is computed.
    pub cohesion: String,
}

/// Connected components of an undirected graph given as edges, in order of the
/// first edge touching each component. Members are sorted.
pub fn connected_components(edges: &[(String, String)]) -> Vec<Vec<String>> {
    let mut order: Vec<&str> = Vec::new();
    let mut adjacency: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for (a, b) in edges {
        for (x, y) in [(a.as_str(), b.as_str()), (b.as_str(), a.as_str())] {
            adjacency
                .entry(x)
                .or_insert_with(|| {
                    order.push(x);
                    BTreeSet::new()
                })
                .insert(y);
        }
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut components = Vec::new();
    for start in order {
        if visited.contains(start) {
            continue;
        }
        let mut component: Vec<String> = Vec::new();
        let mut queue = VecDeque::from([start]);
        visited.insert(start);
        while let Some(node) = queue.pop_front() {
            component.push(node.to_string());
            for &next in adjacency.get(node).into_iter().flatten() {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}

impl GraphReasoningEngine {
    /// Groups of authors linked by at least two joint papers.
    pub async fn communities(&self, min_size: usize) -> Vec<Community> {
        tracing::info!(target: "scholae::reasoning", min_size, "detecting research communities");
        let pattern = GraphPattern::CoAuthorships {
            min_joint: MIN_JOINT_PAPERS,
            limit: PAIR_LIMIT,
        };
        let edges: Vec<(String, String)> = self
            .rows_or_empty("communities", &pattern)
            .await
            .iter()
            .filter(|r| r.u64("collaborations").unwrap_or(0) >= MIN_JOINT_PAPERS)
            .filter_map(|r| Some((r.string("author1")?, r.string("author2")?)))
            .collect();

        connected_components(&edges)
            .into_iter()
            .filter(|c| c.len() >= min_size)
            .map(|members| Community {
                size: members.len(),
                members,
                cohesion: "high".to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn splits_disjoint_components() {
        let comps = connected_components(&[e("a", "b"), e("c", "d"), e("b", "e")]);
        assert_eq!(comps, vec![vec!["a", "b", "e"], vec!["c", "d"]]);
    }

    #[test]
    fn empty_edges_no_components() {
        assert!(connected_components(&[]).is_empty());
    }
}
