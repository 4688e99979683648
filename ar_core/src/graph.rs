//! The waypoint graph.
//!
//! Geo-referenced nodes connected by weighted undirected edges, with
//! nearest-node lookup, name search, and shortest-path queries. Iteration
//! and all tie-breaking are deterministic in insertion order.
//!
//! Queries are linear scans and the path search runs synchronously to
//! completion; that is fine for the small-to-moderate graphs interactive
//! editing produces and is the documented scalability ceiling. The graph
//! has no internal locking: callers must serialize edits and searches on
//! one thread (or add a lock at the integration layer).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use tracing::debug;

use crate::geo::{GeoFrame, GeoPoint};
use crate::math::Vec3;

/// Opaque node id. Ids increase in insertion order and are never reused,
/// so they double as the deterministic tie-break key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// A waypoint: a node of the graph.
///
/// Exactly one of the two position representations is the source of
/// truth, depending on how the node was created: a geo-anchored node
/// carries its GPS coordinates (and a local position derived through a
/// [`GeoFrame`]); a purely virtual node carries only the local position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoNode {
    /// Local Cartesian position, always usable.
    pub position: Vec3,
    /// GPS coordinates, present iff the node is geo-anchored.
    pub gps: Option<GeoPoint>,
    pub name: String,
    pub description: String,
}

impl GeoNode {
    /// A purely virtual node: the local position is authoritative.
    pub fn virtual_at(position: Vec3, name: impl Into<String>) -> Self {
        Self {
            position,
            gps: None,
            name: name.into(),
            description: String::new(),
        }
    }

    /// A geo-anchored node: the GPS position is authoritative and the
    /// local position is derived through the given frame.
    pub fn geo_anchored(gps: GeoPoint, frame: &GeoFrame, name: impl Into<String>) -> Self {
        Self {
            position: frame.to_local(&gps),
            gps: Some(gps),
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Re-derives the local position of a geo-anchored node, e.g. after
    /// the zero reference moved. Virtual nodes are left alone.
    pub fn refresh_local_position(&mut self, frame: &GeoFrame) {
        if let Some(gps) = self.gps {
            self.position = frame.to_local(&gps);
        }
    }
}

/// An undirected edge between two member nodes.
///
/// The weight is a snapshot taken at creation; it is not recomputed if
/// the endpoints later move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub a: NodeId,
    pub b: NodeId,
    pub weight: f32,
}

/// Graph operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphError {
    /// An edge endpoint is not a member of the graph.
    EndpointNotInGraph,
    /// The referenced node does not exist.
    NodeNotFound,
    /// Explicit edge weights must be non-negative (Dijkstra precondition).
    NegativeWeight,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::EndpointNotInGraph => write!(f, "edge endpoint is not in the graph"),
            GraphError::NodeNotFound => write!(f, "node not found in the graph"),
            GraphError::NegativeWeight => write!(f, "edge weight must be non-negative"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Seam for the UI layer that highlights path-search results. The core
/// only reports which nodes to mark or unmark.
pub trait PathMarker {
    fn mark(&mut self, id: NodeId, node: &GeoNode);
    fn unmark(&mut self, id: NodeId, node: &GeoNode);
}

/// A graph of waypoints. One instance per world/session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoGraph {
    nodes: HashMap<u64, GeoNode>,
    /// Insertion order; drives iteration and tie-breaking.
    order: Vec<NodeId>,
    edges: Vec<GraphEdge>,
    next_id: u64,
}

impl GeoGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id.0)
    }

    pub fn node(&self, id: NodeId) -> Option<&GeoNode> {
        self.nodes.get(&id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GeoNode> {
        self.nodes.get_mut(&id.0)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GeoNode)> {
        self.order.iter().map(|id| (*id, &self.nodes[&id.0]))
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Inserts a node. O(1) amortized.
    pub fn add_node(&mut self, node: GeoNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        debug!(id = id.0, name = %node.name, "adding waypoint");
        self.nodes.insert(id.0, node);
        self.order.push(id);
        id
    }

    /// Removes a node and cascade-deletes its incident edges.
    pub fn remove_node(&mut self, id: NodeId) -> Result<GeoNode, GraphError> {
        let node = self.nodes.remove(&id.0).ok_or(GraphError::NodeNotFound)?;
        self.order.retain(|n| *n != id);
        let before = self.edges.len();
        self.edges.retain(|e| e.a != id && e.b != id);
        debug!(
            id = id.0,
            dropped_edges = before - self.edges.len(),
            "removed waypoint"
        );
        Ok(node)
    }

    /// Connects two member nodes. With `weight` unspecified, the Euclidean
    /// distance between the nodes' local positions at this moment is used.
    /// Fails without modifying the graph if either endpoint is absent or
    /// an explicit weight is negative.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId, weight: Option<f32>) -> Result<(), GraphError> {
        if !self.contains(a) || !self.contains(b) {
            return Err(GraphError::EndpointNotInGraph);
        }
        if let Some(w) = weight {
            if w < 0.0 {
                return Err(GraphError::NegativeWeight);
            }
        }
        let weight = weight.unwrap_or_else(|| {
            self.nodes[&a.0].position.distance_to(self.nodes[&b.0].position)
        });
        debug!(a = a.0, b = b.0, weight, "adding edge");
        self.edges.push(GraphEdge { a, b, weight });
        Ok(())
    }

    /// First node (in insertion order) whose name or description equals or
    /// contains the query, case-insensitively. Returns `None` on no match
    /// or an empty query.
    pub fn find_best_node_for(&self, query: &str) -> Option<NodeId> {
        if query.is_empty() {
            return None;
        }
        let query = query.to_lowercase();
        self.nodes().find_map(|(id, node)| {
            let hit = node.name.to_lowercase().contains(&query)
                || node.description.to_lowercase().contains(&query);
            hit.then_some(id)
        })
    }

    /// Node with minimum Euclidean distance to `position` in the local
    /// frame. Ties resolve to the first node added. O(n) per query.
    pub fn closest_node_to(&self, position: Vec3) -> Option<NodeId> {
        let mut best: Option<(NodeId, f32)> = None;
        for (id, node) in self.nodes() {
            let d = node.position.distance_to(position);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Shortest path between two member nodes over the undirected weighted
    /// graph (Dijkstra; all weights are non-negative by construction).
    ///
    /// Returns a sub-graph containing exactly the nodes and edges of one
    /// shortest path, with node ids preserved, or `None` when the nodes
    /// are disconnected or absent. `start == goal` yields a single-node,
    /// zero-edge sub-graph.
    pub fn find_path(&self, start: NodeId, goal: NodeId) -> Option<GeoGraph> {
        if !self.contains(start) || !self.contains(goal) {
            return None;
        }
        if start == goal {
            let mut sub = GeoGraph::new();
            sub.insert_with_id(start, self.nodes[&start.0].clone());
            return Some(sub);
        }

        let mut adjacency: HashMap<NodeId, Vec<(NodeId, usize)>> = HashMap::new();
        for (idx, e) in self.edges.iter().enumerate() {
            adjacency.entry(e.a).or_default().push((e.b, idx));
            adjacency.entry(e.b).or_default().push((e.a, idx));
        }

        let mut dist: HashMap<NodeId, f32> = HashMap::new();
        let mut prev: HashMap<NodeId, (NodeId, usize)> = HashMap::new();
        let mut heap = BinaryHeap::new();
        dist.insert(start, 0.0);
        heap.push(QueueEntry {
            cost: 0.0,
            id: start,
        });

        while let Some(QueueEntry { cost, id }) = heap.pop() {
            if id == goal {
                break;
            }
            if cost > dist.get(&id).copied().unwrap_or(f32::INFINITY) {
                continue; // stale entry
            }
            let Some(neighbors) = adjacency.get(&id) else {
                continue;
            };
            for &(next, edge_idx) in neighbors {
                let next_cost = cost + self.edges[edge_idx].weight;
                let known = dist.get(&next).copied().unwrap_or(f32::INFINITY);
                if next_cost < known {
                    dist.insert(next, next_cost);
                    prev.insert(next, (id, edge_idx));
                    heap.push(QueueEntry {
                        cost: next_cost,
                        id: next,
                    });
                }
            }
        }

        if !prev.contains_key(&goal) {
            debug!(start = start.0, goal = goal.0, "no route found");
            return None;
        }

        // Walk back from the goal, then emit the sub-graph start-first.
        let mut path_nodes = vec![goal];
        let mut path_edges = Vec::new();
        let mut cursor = goal;
        while cursor != start {
            let (from, edge_idx) = prev[&cursor];
            path_edges.push(self.edges[edge_idx]);
            path_nodes.push(from);
            cursor = from;
        }
        path_nodes.reverse();
        path_edges.reverse();

        debug!(
            start = start.0,
            goal = goal.0,
            hops = path_edges.len(),
            cost = dist[&goal],
            "route found"
        );

        let mut sub = GeoGraph::new();
        for id in path_nodes {
            sub.insert_with_id(id, self.nodes[&id.0].clone());
        }
        sub.edges = path_edges;
        Some(sub)
    }

    /// Total edge weight of this graph; for a path sub-graph, the cost.
    pub fn total_weight(&self) -> f32 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    /// Asks the UI seam to highlight every node of this graph.
    pub fn mark_all(&self, marker: &mut dyn PathMarker) {
        for (id, node) in self.nodes() {
            marker.mark(id, node);
        }
    }

    /// Asks the UI seam to clear the highlight on every node.
    pub fn unmark_all(&self, marker: &mut dyn PathMarker) {
        for (id, node) in self.nodes() {
            marker.unmark(id, node);
        }
    }

    /// Inserts a node keeping its id from the parent graph, so sub-graph
    /// results stay addressable in the original.
    fn insert_with_id(&mut self, id: NodeId, node: GeoNode) {
        self.nodes.insert(id.0, node);
        self.order.push(id);
        self.next_id = self.next_id.max(id.0 + 1);
    }
}

/// Min-heap entry; ties resolve to the earlier-inserted node so searches
/// are deterministic. Costs are finite and non-negative by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
struct QueueEntry {
    cost: f32,
    id: NodeId,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
