//! Move cost models.
//!
//! [`CostModel::ShuttlePSwap`] prices a move as the occupancy-aware port
//! graph path plus the positional swaps needed to bring the moving qubits to
//! the departure port. [`CostModel::ShuttleOnly`] counts shuttle hops on the
//! static zone graph and only checks the path's bottleneck capacity.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use ionroute_arch::{ArchError, DynamicArch, PortId, ZoneId};

use crate::error::CompileResult;

/// Cheapest way found to move a set of qubits between two zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCost {
    /// Zones along the path, both endpoints included.
    pub path: Vec<ZoneId>,
    /// Path cost plus swap cost.
    pub cost: u64,
    /// Departure port of the source zone.
    pub src_port: PortId,
    /// Arrival port of the target zone.
    pub trg_port: PortId,
}

/// Cost model used by the gate selectors and the router.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModel {
    /// Port graph path plus intra-zone swaps.
    #[default]
    ShuttlePSwap,
    /// Static shortest path, swaps ignored.
    ShuttleOnly,
}

impl CostModel {
    /// Cheapest move of `qubits` from `src_zone` to `trg_zone` over both
    /// departure ports. `Ok(None)` if no path can carry them.
    pub fn move_cost(
        &self,
        arch: &DynamicArch,
        qubits: &[usize],
        src_zone: ZoneId,
        trg_zone: ZoneId,
    ) -> CompileResult<Option<MoveCost>> {
        check_in_zone(arch, qubits, src_zone)?;
        let port0 = self.move_cost_from_port(arch, qubits, src_zone, trg_zone, PortId::P0);
        let port1 = self.move_cost_from_port(arch, qubits, src_zone, trg_zone, PortId::P1);
        Ok(match (port0, port1) {
            (Some(a), Some(b)) => Some(if a.cost <= b.cost { a } else { b }),
            (a, b) => a.or(b),
        })
    }

    /// Cost of moving `qubits` out of `src_zone` through `src_port`.
    ///
    /// The qubits must all be in `src_zone`.
    pub fn move_cost_from_port(
        &self,
        arch: &DynamicArch,
        qubits: &[usize],
        src_zone: ZoneId,
        trg_zone: ZoneId,
        src_port: PortId,
    ) -> Option<MoveCost> {
        match self {
            CostModel::ShuttlePSwap => {
                let n_move = qubits.len();
                let path = arch.shortest_port_path_length(src_zone, src_port, trg_zone, n_move)?;
                let swaps = swap_count(arch, qubits, src_zone, src_port);
                Some(MoveCost {
                    path: path.zones,
                    cost: path.cost + swaps * arch.zone_swap_cost(src_zone),
                    src_port,
                    trg_port: path.target_port,
                })
            }
            CostModel::ShuttleOnly => {
                let shuttle = arch.shuttle_only_shortest_path_and_path_capacity(src_zone, trg_zone)?;
                if shuttle.capacity < qubits.len() {
                    return None;
                }
                let path = &shuttle.path;
                let (src_port, trg_port) = if path.len() < 2 {
                    (src_port, src_port)
                } else {
                    let last = path.len() - 1;
                    let (src_port, _) = arch.connection_ports(path[0], path[1]).ok()?;
                    let (_, trg_port) = arch.connection_ports(path[last - 1], path[last]).ok()?;
                    (src_port, trg_port)
                };
                Some(MoveCost {
                    cost: shuttle.length as u64,
                    path: shuttle.path,
                    src_port,
                    trg_port,
                })
            }
        }
    }

    /// Cost of moving a single qubit, `None` if it cannot move.
    pub fn single_move_cost(
        &self,
        arch: &DynamicArch,
        qubit: usize,
        src_zone: ZoneId,
        trg_zone: ZoneId,
    ) -> Option<u64> {
        PortId::BOTH
            .iter()
            .filter_map(|&port| self.move_cost_from_port(arch, &[qubit], src_zone, trg_zone, port))
            .map(|cost| cost.cost)
            .min()
    }

    /// All zones except `src_zone`, nearest first.
    ///
    /// Zones are ordered by breadth-first layer from `src_zone`, then by the
    /// cost of moving `qubit` there. Zones `qubit` cannot reach right now
    /// come last within their layer.
    pub fn closest_zones(&self, arch: &DynamicArch, qubit: usize, src_zone: ZoneId) -> Vec<ZoneId> {
        let mut zones = Vec::with_capacity(arch.n_zones());
        for layer in arch.bfs_layers(src_zone).into_iter().skip(1) {
            let mut costed: Vec<(ZoneId, Option<u64>)> = layer
                .into_iter()
                .map(|zone| (zone, self.single_move_cost(arch, qubit, src_zone, zone)))
                .collect();
            costed.sort_by(|a, b| compare_costs(a.1, b.1));
            zones.extend(costed.into_iter().map(|(zone, _)| zone));
        }
        zones
    }
}

/// Orders known costs ascending with unknown costs last.
pub(crate) fn compare_costs(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Number of adjacent swaps that line `qubits` up at `port`, keeping their
/// relative order.
pub fn swap_count(arch: &DynamicArch, qubits: &[usize], zone: ZoneId, port: PortId) -> u64 {
    let n = qubits.len() as u64;
    let already_in_place = n * n.saturating_sub(1) / 2;
    let distance: u64 = match port {
        PortId::P0 => qubits.iter().map(|&q| arch.position(q) as u64).sum(),
        PortId::P1 => {
            let edge = arch.zone_occupancy(zone).saturating_sub(1);
            qubits
                .iter()
                .map(|&q| edge.saturating_sub(arch.position(q)) as u64)
                .sum()
        }
    };
    distance.saturating_sub(already_in_place)
}

fn check_in_zone(arch: &DynamicArch, qubits: &[usize], zone: ZoneId) -> CompileResult<()> {
    match qubits.iter().find(|&&q| arch.current_zone(q) != zone) {
        Some(&qubit) => Err(ArchError::QubitNotInZone { qubit, zone }.into()),
        None => Ok(()),
    }
}
