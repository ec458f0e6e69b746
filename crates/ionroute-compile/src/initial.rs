//! Initial qubit placement.
//!
//! Qubit order and manual placement need nothing but the architecture. The
//! graph partition placement builds a weighted qubit interaction graph from
//! the first depth-list rounds, partitions it into one part per zone and
//! then maps the parts onto the zone graph so that parts sharing many gates
//! end up in neighbouring zones.

use rustc_hash::FxHashMap;
use tracing::debug;

use ionroute_arch::{ArchitectureSpec, ZoneGraph, ZoneId, ZonePlacement, validate_placement};
use ionroute_ir::{Circuit, Instruction};

use crate::depth::{GatePair, depth_list_from_commands};
use crate::error::{CompileError, CompileResult};
use crate::partition::{GraphData, Partitioner};
use crate::settings::InitialPlacementSettings;

/// Zones holding at most this many ions keep a single spot free.
const SMALL_ZONE_CAPACITY: usize = 3;

/// Edge weight of a depth-0 gate in the interaction graph.
const GRAPH_MAX_WEIGHT: f64 = 1_048_576.0;

/// Placement of the qubits of `circuit` before any gate is routed.
///
/// Qubit order fills zones in index order with consecutive qubits and keeps
/// `zone_free_space` spots free in every zone. A manual placement is checked
/// against the architecture and returned unchanged. Graph partition placement
/// uses the built-in partitioner, see [`graph_partition_placement`].
pub fn initial_placement(
    settings: &InitialPlacementSettings,
    spec: &ArchitectureSpec,
    circuit: &Circuit,
) -> CompileResult<ZonePlacement> {
    settings.validate()?;
    let n_qubits = circuit.num_qubits();
    spec.check_n_qubits(n_qubits)?;
    match settings {
        InitialPlacementSettings::QubitOrder { zone_free_space } => {
            qubit_order(spec, n_qubits, *zone_free_space)
        }
        InitialPlacementSettings::Manual { placement } => {
            validate_placement(spec, n_qubits, placement)?;
            Ok(placement.clone())
        }
        #[cfg(feature = "partition")]
        InitialPlacementSettings::GraphPartition {
            zone_free_space,
            max_depth,
            seed,
        } => graph_partition_placement(
            spec,
            circuit,
            *zone_free_space,
            *max_depth,
            &crate::partition::LocalSearchPartitioner::new(*seed),
        ),
    }
}

fn qubit_order(
    spec: &ArchitectureSpec,
    n_qubits: usize,
    zone_free_space: usize,
) -> CompileResult<ZonePlacement> {
    let mut placement = ZonePlacement::empty(spec.n_zones());
    let mut next = 0;
    for zone in 0..spec.n_zones() {
        let available = spec.zone(zone).gate_capacity.saturating_sub(zone_free_space);
        let end = (next + available).min(n_qubits);
        placement.zone_mut(zone).extend(next..end);
        next = end;
    }
    if next < n_qubits {
        let available = (0..spec.n_zones())
            .map(|zone| spec.zone(zone).gate_capacity.saturating_sub(zone_free_space))
            .sum();
        return Err(CompileError::QubitsDoNotFit {
            n_qubits,
            available,
        });
    }
    debug!(n_qubits, zone_free_space, "qubit order placement");
    Ok(placement)
}

/// Place qubits by partitioning their interaction graph with `partitioner`.
///
/// The graph has one vertex per usable spot of the trap, so every part is
/// filled exactly up to its zone's usable capacity. The first `n_qubits`
/// vertices are the qubits; gates at depth `i <= max_depth` add
/// `ceil(exp(-i) * 2^20)` to the edge of their pair.
pub fn graph_partition_placement(
    spec: &ArchitectureSpec,
    circuit: &Circuit,
    zone_free_space: usize,
    max_depth: usize,
    partitioner: &dyn Partitioner,
) -> CompileResult<ZonePlacement> {
    let n_qubits = circuit.num_qubits();
    spec.check_n_qubits(n_qubits)?;
    let n_zones = spec.n_zones();
    let block_weights = block_weights(spec, zone_free_space);
    let n_vertices: usize = block_weights.iter().sum();
    if n_vertices < n_qubits {
        return Err(CompileError::QubitsDoNotFit {
            n_qubits,
            available: n_vertices,
        });
    }

    let edges = circuit_graph(n_qubits, circuit.instructions(), max_depth);
    let data = GraphData::new(
        n_vertices,
        vec![1; n_vertices],
        edges.iter().map(|&((a, b), _)| vec![a, b]).collect(),
        edges.iter().map(|&(_, weight)| weight).collect(),
        vec![None; n_vertices],
        block_weights.iter().map(|&w| w as u64).collect(),
    )?;
    let vertex_to_part = partitioner.partition(&data, n_zones)?;
    data.check_assignment(&vertex_to_part)?;
    let qubit_to_part = &vertex_to_part[..n_qubits];

    let mut part_sizes = vec![0usize; n_zones];
    for &part in qubit_to_part {
        part_sizes[part] += 1;
    }
    let part_edges = part_graph(qubit_to_part, &edges);
    let part_to_zone = map_parts_to_zones(
        &ZoneGraph::new(spec),
        &part_edges,
        &part_sizes,
        &block_weights,
    );

    let mut placement = ZonePlacement::empty(n_zones);
    for (qubit, &part) in qubit_to_part.iter().enumerate() {
        placement.zone_mut(part_to_zone[part]).push(qubit);
    }
    validate_placement(spec, n_qubits, &placement)?;
    debug!(
        n_qubits,
        n_edges = edges.len(),
        cut = data.km1(&vertex_to_part),
        ?part_to_zone,
        "graph partition placement"
    );
    Ok(placement)
}

/// Usable spots per zone when `zone_free_space` spots stay free.
fn block_weights(spec: &ArchitectureSpec, zone_free_space: usize) -> Vec<usize> {
    spec.zones()
        .iter()
        .map(|zone| {
            let free = if zone.gate_capacity > SMALL_ZONE_CAPACITY {
                zone_free_space
            } else {
                1
            };
            zone.gate_capacity.saturating_sub(free)
        })
        .collect()
}

/// Weighted qubit interaction edges in order of first appearance. Repeated
/// pairs accumulate their weights.
fn circuit_graph(
    n_qubits: usize,
    instructions: &[Instruction],
    max_depth: usize,
) -> Vec<(GatePair, u64)> {
    let rounds = depth_list_from_commands(n_qubits, instructions);
    let mut index: FxHashMap<GatePair, usize> = FxHashMap::default();
    let mut edges: Vec<(GatePair, u64)> = Vec::new();
    for (depth, pairs) in rounds.iter().enumerate().take(max_depth.saturating_add(1)) {
        let weight = ((-(depth as f64)).exp() * GRAPH_MAX_WEIGHT).ceil() as u64;
        for &pair in pairs {
            match index.get(&pair) {
                Some(&i) => edges[i].1 += weight,
                None => {
                    index.insert(pair, edges.len());
                    edges.push((pair, weight));
                }
            }
        }
    }
    edges
}

/// Condense qubit edges into edges between the parts holding their qubits.
fn part_graph(qubit_to_part: &[usize], edges: &[(GatePair, u64)]) -> Vec<(GatePair, u64)> {
    let mut condensed: FxHashMap<GatePair, u64> = FxHashMap::default();
    for &((a, b), weight) in edges {
        let (pa, pb) = (qubit_to_part[a], qubit_to_part[b]);
        if pa != pb {
            *condensed.entry((pa.min(pb), pa.max(pb))).or_default() += weight;
        }
    }
    let mut condensed: Vec<(GatePair, u64)> = condensed.into_iter().collect();
    condensed.sort_unstable();
    condensed
}

/// Assign every part a distinct zone, minimizing the sum of part edge
/// weights times zone distance.
///
/// Starts from the identity and applies improving exchanges of two parts'
/// zones while each part still fits the usable spots of its new zone.
fn map_parts_to_zones(
    zones: &ZoneGraph,
    part_edges: &[(GatePair, u64)],
    part_sizes: &[usize],
    capacity: &[usize],
) -> Vec<ZoneId> {
    let n = part_sizes.len();
    let unreachable = zones.n_zones() as u64;
    let distance = |a: ZoneId, b: ZoneId| zones.distance(a, b).map_or(unreachable, |d| d as u64);
    let cost = |mapping: &[ZoneId]| -> u64 {
        part_edges
            .iter()
            .map(|&((a, b), weight)| weight * distance(mapping[a], mapping[b]))
            .sum()
    };

    let mut mapping: Vec<ZoneId> = (0..n).collect();
    let mut best = cost(&mapping[..]);
    let mut improved = true;
    while improved {
        improved = false;
        for p in 0..n {
            for q in p + 1..n {
                if part_sizes[p] > capacity[mapping[q]] || part_sizes[q] > capacity[mapping[p]] {
                    continue;
                }
                mapping.swap(p, q);
                let candidate = cost(&mapping[..]);
                if candidate < best {
                    best = candidate;
                    improved = true;
                } else {
                    mapping.swap(p, q);
                }
            }
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use ionroute_arch::{ArchError, named};
    use ionroute_ir::QubitId;

    fn empty(n_qubits: u32) -> Circuit {
        Circuit::with_size("empty", n_qubits, 0)
    }

    #[test]
    fn test_qubit_order() {
        let spec = named::four_zones_in_a_line();
        let placement =
            initial_placement(&InitialPlacementSettings::default(), &spec, &empty(10)).unwrap();
        assert_eq!(
            placement.into_inner(),
            vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9], vec![]]
        );
    }

    #[test]
    fn test_qubit_order_does_not_fit() {
        let spec = named::four_zones_in_a_line();
        let settings = InitialPlacementSettings::QubitOrder { zone_free_space: 3 };
        assert!(matches!(
            initial_placement(&settings, &spec, &empty(13)),
            Err(CompileError::QubitsDoNotFit {
                n_qubits: 13,
                available: 12
            })
        ));
    }

    #[test]
    fn test_qubit_order_fills_memory_zones() {
        let spec = named::memory_and_gate_zones();
        let placement =
            initial_placement(&InitialPlacementSettings::default(), &spec, &empty(20)).unwrap();
        assert_eq!(placement.zone(0), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(placement.zone(2).len(), 4);
        assert!(placement.zone(3).is_empty());
    }

    #[test]
    fn test_too_many_qubits() {
        let spec = named::four_zones_in_a_line();
        assert!(matches!(
            initial_placement(&InitialPlacementSettings::default(), &spec, &empty(17)),
            Err(CompileError::Arch(ArchError::TooManyQubits { .. }))
        ));
    }

    #[test]
    fn test_manual() {
        let spec = named::four_zones_in_a_line();
        let placement = ZonePlacement::new(vec![vec![2], vec![0, 1], vec![], vec![3]]);
        let settings = InitialPlacementSettings::Manual {
            placement: placement.clone(),
        };
        assert_eq!(initial_placement(&settings, &spec, &empty(4)).unwrap(), placement);

        let settings = InitialPlacementSettings::Manual {
            placement: ZonePlacement::new(vec![vec![2], vec![0, 1], vec![], vec![]]),
        };
        assert!(matches!(
            initial_placement(&settings, &spec, &empty(4)),
            Err(CompileError::Arch(ArchError::MissingQubit { qubit: 3 }))
        ));
    }

    #[test]
    fn test_block_weights() {
        assert_eq!(
            block_weights(&named::four_zones_in_a_line(), 2),
            vec![4, 4, 4, 4]
        );
        // Small zones keep one spot free whatever is requested.
        let small = named::linear_zones(3, 3, 9).unwrap();
        assert_eq!(block_weights(&small, 2), vec![2, 2, 2]);
        assert_eq!(block_weights(&small, 1), vec![2, 2, 2]);
        let tiny = named::linear_zones(2, 1, 2).unwrap();
        assert_eq!(block_weights(&tiny, 2), vec![0, 0]);
    }

    #[test]
    fn test_circuit_graph_weights() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit.cz(QubitId(0), QubitId(1)).unwrap();
        circuit.cz(QubitId(2), QubitId(1)).unwrap();
        circuit.cz(QubitId(1), QubitId(0)).unwrap();

        // (0,1) at depths 0 and 2, (1,2) at depth 1.
        let edges = circuit_graph(3, circuit.instructions(), 200);
        assert_eq!(edges, vec![((0, 1), 1_048_576 + 141_910), ((1, 2), 385_750)]);

        let edges = circuit_graph(3, circuit.instructions(), 1);
        assert_eq!(edges, vec![((0, 1), 1_048_576), ((1, 2), 385_750)]);

        let edges = circuit_graph(3, circuit.instructions(), 0);
        assert_eq!(edges, vec![((0, 1), 1_048_576)]);
    }

    #[test]
    fn test_part_graph() {
        let edges = vec![((0, 1), 5), ((1, 2), 3), ((0, 3), 2), ((2, 3), 1), ((0, 2), 4)];
        let parts = part_graph(&[0, 0, 1, 2], &edges);
        assert_eq!(parts, vec![((0, 1), 7), ((0, 2), 2), ((1, 2), 1)]);
    }

    #[test]
    fn test_map_parts_to_zones() {
        let zones = ZoneGraph::new(&named::four_zones_in_a_line());
        // Parts 0 and 3 interact heavily and must end up adjacent.
        let mapping = map_parts_to_zones(&zones, &[((0, 3), 100), ((1, 2), 1)], &[2; 4], &[4; 4]);
        let mut sorted = mapping.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
        assert_eq!(zones.distance(mapping[0], mapping[3]), Some(1));

        // Exchanges that overfill a zone are rejected.
        let mapping = map_parts_to_zones(
            &zones,
            &[((0, 3), 100)],
            &[4, 0, 0, 1],
            &[4, 1, 1, 1],
        );
        assert_eq!(mapping[0], 0);
        assert_eq!(zones.distance(mapping[0], mapping[3]), Some(1));
    }

    #[cfg(feature = "partition")]
    #[test]
    fn test_graph_partition_clusters() {
        let spec = named::four_zones_in_a_line();
        let mut circuit = Circuit::with_size("clusters", 6, 0);
        for _ in 0..3 {
            circuit.cz(QubitId(0), QubitId(1)).unwrap();
            circuit.cz(QubitId(1), QubitId(2)).unwrap();
            circuit.cz(QubitId(3), QubitId(4)).unwrap();
            circuit.cz(QubitId(4), QubitId(5)).unwrap();
        }
        let settings = InitialPlacementSettings::GraphPartition {
            zone_free_space: 2,
            max_depth: 200,
            seed: 0,
        };
        let placement = initial_placement(&settings, &spec, &circuit).unwrap();
        validate_placement(&spec, 6, &placement).unwrap();

        let zone_of = placement.qubit_to_zone(6);
        assert_eq!(zone_of[0], zone_of[1]);
        assert_eq!(zone_of[1], zone_of[2]);
        assert_eq!(zone_of[3], zone_of[4]);
        assert_eq!(zone_of[4], zone_of[5]);
        assert_ne!(zone_of[0], zone_of[3]);
        assert!(placement.iter().all(|zone| zone.len() <= 4));
    }

    #[cfg(feature = "partition")]
    #[test]
    fn test_graph_partition_respects_free_space() {
        let spec = named::linear_zones(3, 3, 9).unwrap();
        let settings = InitialPlacementSettings::GraphPartition {
            zone_free_space: 2,
            max_depth: 200,
            seed: 1,
        };
        let circuit = Circuit::ghz(6).unwrap();
        let placement = initial_placement(&settings, &spec, &circuit).unwrap();
        assert!(placement.iter().all(|zone| zone.len() == 2));

        assert!(matches!(
            initial_placement(&settings, &spec, &Circuit::ghz(7).unwrap()),
            Err(CompileError::QubitsDoNotFit {
                n_qubits: 7,
                available: 6
            })
        ));
    }
}
