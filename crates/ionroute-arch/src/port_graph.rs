//! Occupancy-aware transport graph over zone ports.
//!
//! Every zone contributes two nodes (node index `2 * zone + port`) joined by a
//! capacity edge whose weight tracks the zone's current occupancy. Every
//! shuttle connection contributes a fixed-cost edge between two ports of
//! different zones. Passing `n` qubits through a zone costs
//! `n * occupancy * swap_cost` and needs `n` units of free transport space.

use petgraph::algo::astar;
use petgraph::graph::{EdgeIndex, EdgeReference, NodeIndex, UnGraph};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use tracing::trace;

use crate::spec::{ArchitectureSpec, PortId, ZoneId};

/// Fixed cost of crossing one shuttle connection.
pub const SHUTTLE_COST: u64 = 1;

/// Edge weight of the port graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEdge {
    /// Internal edge between the two ports of one zone.
    Capacity {
        /// Zone this edge belongs to.
        zone: ZoneId,
        /// Transport capacity of the empty zone.
        max_transport_capacity: usize,
        /// Current number of qubits in the zone.
        occupancy: usize,
        /// Remaining free transport space.
        transport_capacity: usize,
        /// Cost of passing one qubit through the zone.
        transport_cost: u64,
    },
    /// Shuttle connection between two zones.
    Shuttle {
        /// Cost of one crossing.
        transport_cost: u64,
    },
}

impl PortEdge {
    /// Whether this edge models a shuttle connection.
    pub fn is_shuttle_edge(&self) -> bool {
        matches!(self, PortEdge::Shuttle { .. })
    }
}

/// Node index of a zone port.
#[inline]
pub fn port_node(zone: ZoneId, port: PortId) -> NodeIndex {
    NodeIndex::new(2 * zone + port.index())
}

/// Zone and port of a node index.
#[inline]
pub fn node_zone_port(node: NodeIndex) -> (ZoneId, PortId) {
    let index = node.index();
    let port = if index % 2 == 0 { PortId::P0 } else { PortId::P1 };
    (index / 2, port)
}

/// Result of a port path search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPath {
    /// Visited zones, start and target included.
    pub zones: Vec<ZoneId>,
    /// Total transport cost.
    pub cost: u64,
    /// Port through which the target zone is entered.
    pub target_port: PortId,
}

/// Weighted port graph.
#[derive(Debug, Clone)]
pub struct PortGraph {
    graph: UnGraph<(), PortEdge>,
    capacity_edges: Vec<EdgeIndex>,
    swap_costs: Vec<u64>,
}

impl PortGraph {
    /// Build the port graph of an architecture with every zone empty.
    pub fn new(spec: &ArchitectureSpec) -> Self {
        let n_zones = spec.n_zones();
        let mut graph =
            UnGraph::with_capacity(2 * n_zones, n_zones + spec.connections().len());
        for _ in 0..2 * n_zones {
            graph.add_node(());
        }

        let mut capacity_edges = Vec::with_capacity(n_zones);
        for (zone_id, zone) in spec.zones().iter().enumerate() {
            let edge = graph.add_edge(
                port_node(zone_id, PortId::P0),
                port_node(zone_id, PortId::P1),
                PortEdge::Capacity {
                    zone: zone_id,
                    max_transport_capacity: zone.transport_capacity,
                    occupancy: 0,
                    transport_capacity: zone.transport_capacity,
                    transport_cost: 0,
                },
            );
            capacity_edges.push(edge);
        }

        for connection in spec.connections() {
            graph.add_edge(
                port_node(connection.a.zone, connection.a.port),
                port_node(connection.b.zone, connection.b.port),
                PortEdge::Shuttle {
                    transport_cost: SHUTTLE_COST,
                },
            );
        }

        Self {
            graph,
            capacity_edges,
            swap_costs: spec.zones().iter().map(|zone| zone.swap_cost).collect(),
        }
    }

    /// Number of zones.
    pub fn n_zones(&self) -> usize {
        self.capacity_edges.len()
    }

    /// The capacity edge weight of a zone.
    pub fn capacity_edge(&self, zone: ZoneId) -> &PortEdge {
        &self.graph[self.capacity_edges[zone]]
    }

    /// Refresh the capacity edge of `zone` for a new occupancy.
    pub fn update_zone_occupancy_weight(&mut self, zone: ZoneId, new_occupancy: usize) {
        let swap_cost = self.swap_costs[zone];
        if let PortEdge::Capacity {
            max_transport_capacity,
            occupancy,
            transport_capacity,
            transport_cost,
            ..
        } = &mut self.graph[self.capacity_edges[zone]]
        {
            *occupancy = new_occupancy;
            *transport_capacity = max_transport_capacity.saturating_sub(new_occupancy);
            *transport_cost = new_occupancy as u64 * swap_cost;
        }
    }

    /// Cheapest path moving `n_move` qubits out of `start_zone` through
    /// `start_port` into either port of `target_zone`.
    ///
    /// Intermediate zones are only traversable with at least `n_move` units
    /// of free transport space. The capacity edges of the start and target
    /// zones are never used. Returns `None` when no such path exists.
    pub fn shortest_port_path_length(
        &self,
        start_zone: ZoneId,
        start_port: PortId,
        target_zone: ZoneId,
        n_move: usize,
    ) -> Option<PortPath> {
        if start_zone == target_zone {
            return Some(PortPath {
                zones: vec![start_zone],
                cost: 0,
                target_port: start_port,
            });
        }

        let filtered =
            EdgeFiltered::from_fn(&self.graph, |edge: EdgeReference<'_, PortEdge>| {
                match edge.weight() {
                    PortEdge::Shuttle { .. } => true,
                    PortEdge::Capacity {
                        zone,
                        transport_capacity,
                        ..
                    } => {
                        *zone != start_zone
                            && *zone != target_zone
                            && *transport_capacity >= n_move
                    }
                }
            });
        let goals = [
            port_node(target_zone, PortId::P0),
            port_node(target_zone, PortId::P1),
        ];
        let n_move = n_move as u64;

        let (cost, nodes) = astar(
            &filtered,
            port_node(start_zone, start_port),
            |node| goals.contains(&node),
            |edge| match edge.weight() {
                PortEdge::Shuttle { transport_cost } => *transport_cost,
                PortEdge::Capacity { transport_cost, .. } => transport_cost * n_move,
            },
            |_| 0,
        )?;

        let mut zones: Vec<ZoneId> = Vec::with_capacity(nodes.len() / 2 + 1);
        for &node in &nodes {
            let (zone, _) = node_zone_port(node);
            if zones.last() != Some(&zone) {
                zones.push(zone);
            }
        }
        let (_, target_port) = node_zone_port(*nodes.last()?);
        trace!(start_zone, target_zone, n_move, cost, "port path found");

        Some(PortPath {
            zones,
            cost,
            target_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::named;
    use crate::spec::{Zone, ZoneConnection};

    #[test]
    fn test_port_node_roundtrip() {
        let node = port_node(3, PortId::P1);
        assert_eq!(node.index(), 7);
        assert_eq!(node_zone_port(node), (3, PortId::P1));
        assert_eq!(node_zone_port(port_node(0, PortId::P0)), (0, PortId::P0));
    }

    #[test]
    fn test_empty_line_paths() {
        let graph = PortGraph::new(&named::four_zones_in_a_line());
        let path = graph
            .shortest_port_path_length(0, PortId::P1, 3, 1)
            .unwrap();
        assert_eq!(path.zones, vec![0, 1, 2, 3]);
        assert_eq!(path.cost, 3);
        assert_eq!(path.target_port, PortId::P0);

        let back = graph
            .shortest_port_path_length(3, PortId::P0, 1, 1)
            .unwrap();
        assert_eq!(back.zones, vec![3, 2, 1]);
        assert_eq!(back.target_port, PortId::P1);
    }

    #[test]
    fn test_start_port_on_the_far_side_has_no_path() {
        let graph = PortGraph::new(&named::four_zones_in_a_line());
        // Port 0 of zone 0 is not connected and the start zone's own
        // capacity edge is never traversed.
        assert!(graph.shortest_port_path_length(0, PortId::P0, 1, 1).is_none());
    }

    #[test]
    fn test_same_zone_is_free() {
        let graph = PortGraph::new(&named::four_zones_in_a_line());
        let path = graph
            .shortest_port_path_length(2, PortId::P1, 2, 4)
            .unwrap();
        assert_eq!(path.zones, vec![2]);
        assert_eq!(path.cost, 0);
        assert_eq!(path.target_port, PortId::P1);
    }

    #[test]
    fn test_occupancy_changes_cost() {
        let mut graph = PortGraph::new(&named::four_zones_in_a_line());
        graph.update_zone_occupancy_weight(1, 3);
        graph.update_zone_occupancy_weight(2, 2);
        let path = graph
            .shortest_port_path_length(0, PortId::P1, 3, 2)
            .unwrap();
        // Three shuttles plus (3 + 2) swaps for each of the two qubits.
        assert_eq!(path.cost, 3 + 2 * 5);

        match graph.capacity_edge(1) {
            PortEdge::Capacity {
                occupancy,
                transport_capacity,
                transport_cost,
                ..
            } => {
                assert_eq!(*occupancy, 3);
                assert_eq!(*transport_capacity, 4);
                assert_eq!(*transport_cost, 3);
            }
            PortEdge::Shuttle { .. } => panic!("expected a capacity edge"),
        }
    }

    #[test]
    fn test_full_pass_through_zone_blocks() {
        // A - B - C, B at full transport capacity.
        let spec = ArchitectureSpec::new(
            8,
            vec![Zone::gate(2), Zone::gate(2), Zone::gate(2)],
            vec![ZoneConnection::chain(0, 1), ZoneConnection::chain(1, 2)],
        )
        .unwrap();
        let mut graph = PortGraph::new(&spec);
        graph.update_zone_occupancy_weight(1, 3);
        assert!(graph.shortest_port_path_length(0, PortId::P1, 2, 1).is_none());

        graph.update_zone_occupancy_weight(1, 2);
        let path = graph
            .shortest_port_path_length(0, PortId::P1, 2, 1)
            .unwrap();
        assert_eq!(path.zones, vec![0, 1, 2]);
        assert!(graph.shortest_port_path_length(0, PortId::P1, 2, 2).is_none());
    }

    #[test]
    fn test_ring_picks_cheaper_side() {
        let mut graph = PortGraph::new(&named::four_zones_ring());
        // Ring 0-1-3-2-0. Going 0 -> 3 passes either zone 1 or zone 2.
        graph.update_zone_occupancy_weight(1, 5);
        let via_one = graph
            .shortest_port_path_length(0, PortId::P1, 3, 1)
            .unwrap();
        let via_two = graph
            .shortest_port_path_length(0, PortId::P0, 3, 1)
            .unwrap();
        assert_eq!(via_one.zones, vec![0, 1, 3]);
        assert_eq!(via_two.zones, vec![0, 2, 3]);
        assert!(via_two.cost < via_one.cost);
        assert_eq!(via_two.target_port, PortId::P1);
    }

    #[test]
    fn test_shuttle_edge_flag() {
        assert!(PortEdge::Shuttle { transport_cost: 1 }.is_shuttle_edge());
    }
}
