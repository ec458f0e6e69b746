//! Mutable snapshot of a trap during routing.
//!
//! [`DynamicArch`] combines the static architecture (zone graph, capacities)
//! with the current qubit placement. Every mutation keeps the per-qubit
//! `(zone, position)` cache, the occupancy counts and the port graph weights
//! in sync with the placement.

use tracing::trace;

use crate::error::{ArchError, ArchResult};
use crate::placement::{TrapConfiguration, ZonePlacement, qubit_to_zone_pos};
use crate::port_graph::{PortGraph, PortPath};
use crate::spec::{ArchitectureSpec, PortId, ZoneId};
use crate::zone_graph::ZoneGraph;

/// Static shortest path together with its bottleneck capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuttlePath {
    /// Number of shuttle hops.
    pub length: usize,
    /// Zones along the path, both endpoints included.
    pub path: Vec<ZoneId>,
    /// Smallest free transport space over every zone after the first.
    /// `usize::MAX` for an empty move.
    pub capacity: usize,
}

/// Live trap state: placement, caches and the occupancy-weighted port graph.
#[derive(Debug, Clone)]
pub struct DynamicArch {
    spec: ArchitectureSpec,
    zone_graph: ZoneGraph,
    port_graph: PortGraph,
    config: TrapConfiguration,
    qubit_to_zone_pos: Vec<(ZoneId, usize)>,
    zone_occupancy: Vec<usize>,
    n_gate_zone_spots: usize,
    largest_gate_zone_max_capacity: usize,
}

impl DynamicArch {
    /// Start from a validated configuration.
    pub fn new(spec: &ArchitectureSpec, config: TrapConfiguration) -> ArchResult<Self> {
        config.validate(spec)?;

        let zone_graph = ZoneGraph::new(spec);
        let mut port_graph = PortGraph::new(spec);
        let zone_occupancy: Vec<usize> = config.zone_placement.iter().map(Vec::len).collect();
        for (zone, &occupancy) in zone_occupancy.iter().enumerate() {
            port_graph.update_zone_occupancy_weight(zone, occupancy);
        }
        let gate_caps = zone_graph
            .gate_zones()
            .iter()
            .map(|&zone| spec.zone(zone).gate_capacity);
        let n_gate_zone_spots: usize = gate_caps.clone().sum();
        let largest_gate_zone_max_capacity = gate_caps.max().unwrap_or(0);

        Ok(Self {
            qubit_to_zone_pos: qubit_to_zone_pos(config.n_qubits, &config.zone_placement),
            spec: spec.clone(),
            zone_graph,
            port_graph,
            config,
            zone_occupancy,
            n_gate_zone_spots,
            largest_gate_zone_max_capacity,
        })
    }

    /// The static architecture.
    pub fn spec(&self) -> &ArchitectureSpec {
        &self.spec
    }

    /// The static zone graph.
    pub fn zone_graph(&self) -> &ZoneGraph {
        &self.zone_graph
    }

    /// The occupancy-weighted port graph.
    pub fn port_graph(&self) -> &PortGraph {
        &self.port_graph
    }

    /// The current configuration.
    pub fn trap_configuration(&self) -> &TrapConfiguration {
        &self.config
    }

    /// The current placement.
    pub fn placement(&self) -> &ZonePlacement {
        &self.config.zone_placement
    }

    /// Number of zones.
    pub fn n_zones(&self) -> usize {
        self.spec.n_zones()
    }

    /// Number of qubits.
    pub fn n_qubits(&self) -> usize {
        self.config.n_qubits
    }

    /// Zone currently holding `qubit`.
    ///
    /// # Panics
    ///
    /// Panics if `qubit >= n_qubits`.
    #[inline]
    pub fn current_zone(&self, qubit: usize) -> ZoneId {
        self.qubit_to_zone_pos[qubit].0
    }

    /// Chain position of `qubit` inside its zone, counted from port 0.
    #[inline]
    pub fn position(&self, qubit: usize) -> usize {
        self.qubit_to_zone_pos[qubit].1
    }

    /// Qubits of a zone in chain order.
    pub fn zone_occupants(&self, zone: ZoneId) -> &[usize] {
        self.config.zone_placement.zone(zone)
    }

    /// Number of qubits in a zone.
    #[inline]
    pub fn zone_occupancy(&self, zone: ZoneId) -> usize {
        self.zone_occupancy[zone]
    }

    /// Zones that can execute gates.
    pub fn gate_zones(&self) -> &[ZoneId] {
        self.zone_graph.gate_zones()
    }

    /// Memory-only zones.
    pub fn memory_zones(&self) -> &[ZoneId] {
        self.zone_graph.memory_zones()
    }

    /// Whether any zone is memory only.
    pub fn has_memory_zones(&self) -> bool {
        self.zone_graph.has_memory_zones()
    }

    /// Whether gates can execute in `zone`.
    pub fn is_gate_zone(&self, zone: ZoneId) -> bool {
        !self.spec.zone(zone).memory_only
    }

    /// Gate capacity of a zone.
    #[inline]
    pub fn zone_max_gate_cap(&self, zone: ZoneId) -> usize {
        self.spec.zone(zone).gate_capacity
    }

    /// Transport capacity of a zone.
    #[inline]
    pub fn zone_max_transport_cap(&self, zone: ZoneId) -> usize {
        self.spec.zone(zone).transport_capacity
    }

    /// Remaining transport capacity of a zone.
    #[inline]
    pub fn transport_free_space(&self, zone: ZoneId) -> usize {
        self.zone_max_transport_cap(zone)
            .saturating_sub(self.zone_occupancy[zone])
    }

    /// Cost of one positional swap in a zone.
    pub fn zone_swap_cost(&self, zone: ZoneId) -> u64 {
        self.spec.zone(zone).swap_cost
    }

    /// Summed gate capacity of all gate zones.
    pub fn n_gate_zone_spots(&self) -> usize {
        self.n_gate_zone_spots
    }

    /// Largest gate capacity of any gate zone.
    pub fn largest_gate_zone_max_capacity(&self) -> usize {
        self.largest_gate_zone_max_capacity
    }

    /// Ports of the direct connection between two zones, seen from `zone1`.
    pub fn connection_ports(&self, zone1: ZoneId, zone2: ZoneId) -> ArchResult<(PortId, PortId)> {
        self.zone_graph.connection_ports(zone1, zone2)
    }

    /// Breadth-first zone layers from `zone`, layer 0 is `[zone]`.
    pub fn bfs_layers(&self, zone: ZoneId) -> Vec<Vec<ZoneId>> {
        self.zone_graph.bfs_layers(zone)
    }

    /// Static shortest path between two zones with its bottleneck transport
    /// capacity, ignoring swap costs. `None` if the zones are disconnected.
    pub fn shuttle_only_shortest_path_and_path_capacity(
        &self,
        src_zone: ZoneId,
        trg_zone: ZoneId,
    ) -> Option<ShuttlePath> {
        let path = self.zone_graph.shortest_path(src_zone, trg_zone)?;
        let capacity = path[1..]
            .iter()
            .map(|&zone| self.transport_free_space(zone))
            .min()
            .unwrap_or(usize::MAX);
        Some(ShuttlePath {
            length: path.len() - 1,
            path,
            capacity,
        })
    }

    /// Cheapest occupancy-aware path, see
    /// [`PortGraph::shortest_port_path_length`].
    pub fn shortest_port_path_length(
        &self,
        src_zone: ZoneId,
        src_port: PortId,
        trg_zone: ZoneId,
        n_move: usize,
    ) -> Option<PortPath> {
        self.port_graph
            .shortest_port_path_length(src_zone, src_port, trg_zone, n_move)
    }

    /// Shuttle `qubits` from `src_zone` into `trg_zone` through `trg_port`.
    ///
    /// The qubits are prepended (port 0) or appended (port 1) to the target
    /// chain in the given order. Fails without mutating anything when a qubit
    /// is not in `src_zone` or listed twice, when the zones coincide or when
    /// the target would exceed its transport capacity.
    pub fn move_qubits(
        &mut self,
        qubits: &[usize],
        src_zone: ZoneId,
        trg_zone: ZoneId,
        trg_port: PortId,
    ) -> ArchResult<()> {
        if src_zone == trg_zone {
            return Err(ArchError::NoOpMove { zone: src_zone });
        }
        for (i, &qubit) in qubits.iter().enumerate() {
            if qubit >= self.n_qubits() {
                return Err(ArchError::QubitOutOfRange {
                    qubit,
                    n_qubits: self.n_qubits(),
                });
            }
            if qubits[..i].contains(&qubit) {
                return Err(ArchError::DuplicateQubit { qubit });
            }
            if self.current_zone(qubit) != src_zone {
                return Err(ArchError::QubitNotInZone {
                    qubit,
                    zone: src_zone,
                });
            }
        }
        let new_occupancy = self.zone_occupancy[trg_zone] + qubits.len();
        let capacity = self.zone_max_transport_cap(trg_zone);
        if new_occupancy > capacity {
            return Err(ArchError::TransportCapacityExceeded {
                zone: trg_zone,
                occupancy: new_occupancy,
                capacity,
            });
        }

        let placement = &mut self.config.zone_placement;
        placement.zone_mut(src_zone).retain(|q| !qubits.contains(q));
        let target = placement.zone_mut(trg_zone);
        match trg_port {
            PortId::P0 => {
                target.splice(0..0, qubits.iter().copied());
            }
            PortId::P1 => target.extend_from_slice(qubits),
        }

        self.zone_occupancy[src_zone] -= qubits.len();
        self.zone_occupancy[trg_zone] = new_occupancy;
        for zone in [src_zone, trg_zone] {
            self.refresh_zone(zone);
        }
        trace!(?qubits, src_zone, trg_zone, %trg_port, "moved qubits");
        Ok(())
    }

    /// Exchange the qubits at `left_index` and `left_index + 1` of a chain.
    pub fn swap_adjacent(&mut self, zone: ZoneId, left_index: usize) -> ArchResult<()> {
        let chain = self.config.zone_placement.zone_mut(zone);
        if left_index + 1 >= chain.len() {
            return Err(ArchError::PositionOutOfRange {
                zone,
                position: left_index + 1,
            });
        }
        chain.swap(left_index, left_index + 1);
        let (left, right) = (chain[left_index], chain[left_index + 1]);
        self.qubit_to_zone_pos[left] = (zone, left_index);
        self.qubit_to_zone_pos[right] = (zone, left_index + 1);
        Ok(())
    }

    fn refresh_zone(&mut self, zone: ZoneId) {
        for (position, &qubit) in self.config.zone_placement.zone(zone).iter().enumerate() {
            self.qubit_to_zone_pos[qubit] = (zone, position);
        }
        self.port_graph
            .update_zone_occupancy_weight(zone, self.zone_occupancy[zone]);
    }

    /// Verify that caches, occupancy counts and capacities agree with the
    /// placement.
    pub fn check_invariants(&self) -> ArchResult<()> {
        let mut total = 0;
        for (zone, qubits) in self.config.zone_placement.iter().enumerate() {
            if qubits.len() != self.zone_occupancy[zone] {
                return Err(ArchError::OccupancyMismatch {
                    zone,
                    cached: self.zone_occupancy[zone],
                    actual: qubits.len(),
                });
            }
            let capacity = self.zone_max_transport_cap(zone);
            if qubits.len() > capacity {
                return Err(ArchError::TransportCapacityExceeded {
                    zone,
                    occupancy: qubits.len(),
                    capacity,
                });
            }
            for (position, &qubit) in qubits.iter().enumerate() {
                if self.qubit_to_zone_pos.get(qubit) != Some(&(zone, position)) {
                    return Err(ArchError::QubitNotInZone { qubit, zone });
                }
            }
            total += qubits.len();
        }
        if total != self.n_qubits() {
            let qubit = (0..self.n_qubits())
                .find(|&q| {
                    let (zone, position) = self.qubit_to_zone_pos[q];
                    self.zone_occupants(zone).get(position) != Some(&q)
                })
                .unwrap_or(total);
            return Err(ArchError::MissingQubit { qubit });
        }
        Ok(())
    }
}
