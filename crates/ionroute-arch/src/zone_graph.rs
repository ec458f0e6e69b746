//! Static zone-level connectivity.
//!
//! ## Performance
//!
//! On construction, all-pairs distances and predecessors are precomputed with
//! one BFS per zone (every shuttle hop costs 1). Distance lookups are O(1)
//! and path reconstruction is O(path length).

use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::error::{ArchError, ArchResult};
use crate::spec::{ArchitectureSpec, PortId, ZoneId};

const UNREACHABLE: usize = usize::MAX;

/// Zone adjacency with precomputed shortest paths.
#[derive(Debug, Clone)]
pub struct ZoneGraph {
    /// Neighbours of each zone, in connection order.
    adjacency: Vec<Vec<ZoneId>>,
    /// Ports used by the connection `(from, to)`, seen from `from`.
    connection_ports: FxHashMap<(ZoneId, ZoneId), (PortId, PortId)>,
    /// `dist_matrix[from][to]` in shuttle hops, or `UNREACHABLE`.
    dist_matrix: Vec<Vec<usize>>,
    /// `pred_matrix[from][to]` is the zone before `to` on the path from `from`.
    pred_matrix: Vec<Vec<usize>>,
    gate_zones: Vec<ZoneId>,
    memory_zones: Vec<ZoneId>,
}

impl ZoneGraph {
    /// Build the zone graph of a validated architecture.
    pub fn new(spec: &ArchitectureSpec) -> Self {
        let n = spec.n_zones();
        let mut adjacency = vec![Vec::new(); n];
        let mut connection_ports = FxHashMap::default();
        for connection in spec.connections() {
            let (a, b) = (connection.a, connection.b);
            adjacency[a.zone].push(b.zone);
            adjacency[b.zone].push(a.zone);
            connection_ports.insert((a.zone, b.zone), (a.port, b.port));
            connection_ports.insert((b.zone, a.zone), (b.port, a.port));
        }

        let mut graph = Self {
            adjacency,
            connection_ports,
            dist_matrix: vec![],
            pred_matrix: vec![],
            gate_zones: spec.gate_zones(),
            memory_zones: spec.memory_zones(),
        };
        graph.precompute_distances();
        graph
    }

    fn precompute_distances(&mut self) {
        let n = self.adjacency.len();
        self.dist_matrix = vec![vec![UNREACHABLE; n]; n];
        self.pred_matrix = vec![vec![UNREACHABLE; n]; n];

        for src in 0..n {
            self.dist_matrix[src][src] = 0;
            let mut queue = VecDeque::from([src]);
            while let Some(current) = queue.pop_front() {
                for &neighbor in &self.adjacency[current] {
                    if self.dist_matrix[src][neighbor] == UNREACHABLE {
                        self.dist_matrix[src][neighbor] = self.dist_matrix[src][current] + 1;
                        self.pred_matrix[src][neighbor] = current;
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    /// Number of zones.
    #[inline]
    pub fn n_zones(&self) -> usize {
        self.adjacency.len()
    }

    /// Directly connected zones.
    pub fn neighbors(&self, zone: ZoneId) -> &[ZoneId] {
        &self.adjacency[zone]
    }

    /// Zones that can execute gates.
    pub fn gate_zones(&self) -> &[ZoneId] {
        &self.gate_zones
    }

    /// Memory-only zones.
    pub fn memory_zones(&self) -> &[ZoneId] {
        &self.memory_zones
    }

    /// Whether any zone is memory only.
    pub fn has_memory_zones(&self) -> bool {
        !self.memory_zones.is_empty()
    }

    /// Shuttle hops between two zones, `None` if disconnected.
    pub fn distance(&self, from: ZoneId, to: ZoneId) -> Option<usize> {
        match self.dist_matrix[from][to] {
            UNREACHABLE => None,
            d => Some(d),
        }
    }

    /// Shortest zone path including both endpoints.
    pub fn shortest_path(&self, from: ZoneId, to: ZoneId) -> Option<Vec<ZoneId>> {
        self.distance(from, to)?;
        let mut path = vec![to];
        let mut current = to;
        while current != from {
            current = self.pred_matrix[from][current];
            path.push(current);
        }
        path.reverse();
        Some(path)
    }

    /// Ports of the direct connection between `from` and `to`, as
    /// `(port of from, port of to)`.
    pub fn connection_ports(&self, from: ZoneId, to: ZoneId) -> ArchResult<(PortId, PortId)> {
        self.connection_ports
            .get(&(from, to))
            .copied()
            .ok_or(ArchError::NoConnection {
                zone0: from,
                zone1: to,
            })
    }

    /// Breadth-first layers starting at `start`; layer 0 is `[start]`.
    pub fn bfs_layers(&self, start: ZoneId) -> Vec<Vec<ZoneId>> {
        let mut seen = vec![false; self.n_zones()];
        seen[start] = true;
        let mut layers = vec![vec![start]];
        loop {
            let mut next = Vec::new();
            for &zone in layers.last().into_iter().flatten() {
                for &neighbor in &self.adjacency[zone] {
                    if !seen[neighbor] {
                        seen[neighbor] = true;
                        next.push(neighbor);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            layers.push(next);
        }
        layers
    }
}
