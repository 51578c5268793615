use crate::{Edge, Network, Node};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::{HashSet, VecDeque};

/// One electrically connected set of in-service buses.
#[derive(Debug, Clone)]
pub struct Island {
    pub island_id: usize,
    /// Bus nodes in discovery order; the first one seeded the search
    pub buses: Vec<NodeIndex>,
}

/// Aggregated island analysis result.
#[derive(Debug, Clone, Default)]
pub struct IslandAnalysis {
    pub islands: Vec<Island>,
}

/// Labels connected components of in-service buses (breadth-first search).
///
/// Only closed branches between two in-service buses connect; out-of-service
/// buses belong to no island. Islands are numbered in order of their lowest
/// bus node index, which makes the numbering deterministic for a given graph.
pub fn find_islands(network: &Network) -> IslandAnalysis {
    let graph = &network.graph;
    let in_service = |idx: NodeIndex| matches!(&graph[idx], Node::Bus(bus) if bus.in_service);

    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    let mut island_id = 0;
    for start in graph.node_indices() {
        if !in_service(start) || visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(node);
            for edge in graph.edges(node) {
                let Edge::Branch(branch) = edge.weight();
                let neighbor = if edge.source() == node {
                    edge.target()
                } else {
                    edge.source()
                };
                if branch.status && in_service(neighbor) && !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        islands.push(Island {
            island_id,
            buses: members,
        });
        island_id += 1;
    }
    IslandAnalysis { islands }
}
