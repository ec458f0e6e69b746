//! Gate selection by graph partitioning.
//!
//! Qubits become vertices of a graph with one fixed anchor vertex per zone
//! and enough free filler vertices that every part is exactly as large as
//! its zone (`gate_capacity + 1` including the anchor). Gate edges pull
//! interacting qubits together with a weight decaying in depth, anchor edges
//! keep qubits near their current zone, and the partitioner cuts the graph
//! into one part per zone.

use std::sync::Arc;

use tracing::{debug, trace};

use ionroute_arch::{DynamicArch, ZonePlacement};
use ionroute_ir::Instruction;

use crate::cost::CostModel;
use crate::depth::{DepthBlocks, DepthInfo, DepthList, depth_info, depth_list, gate_pairs};
use crate::error::{CompileError, CompileResult};
use crate::partition::{GraphData, Partitioner};
use crate::selection::greedy::{handle_only_single_qubits_remaining, handle_unused_qubits};
use crate::selection::tracker::QubitTracker;
use crate::settings::RoutingSettings;

/// Shuttle penalties decay as `exp(-SHUTTLE_DECAY * cost)` in graph mode.
const SHUTTLE_DECAY: f64 = 0.8;

/// Partition based gate selector.
#[derive(Debug, Clone)]
pub struct PartitionGateSelector {
    cost_model: CostModel,
    settings: RoutingSettings,
    partitioner: Arc<dyn Partitioner>,
}

impl PartitionGateSelector {
    /// Create a selector.
    pub fn new(
        cost_model: CostModel,
        settings: RoutingSettings,
        partitioner: Arc<dyn Partitioner>,
    ) -> Self {
        Self {
            cost_model,
            settings,
            partitioner,
        }
    }

    /// The cost model.
    pub fn cost_model(&self) -> CostModel {
        self.cost_model
    }

    /// Target placement for the next gates of `remaining`.
    pub fn next_config(
        &self,
        arch: &DynamicArch,
        remaining: &[Instruction],
    ) -> CompileResult<ZonePlacement> {
        let n_qubits = arch.n_qubits();
        let pairs = gate_pairs(remaining);
        if pairs.is_empty() {
            let mut tracker = QubitTracker::new(arch);
            handle_only_single_qubits_remaining(arch, self.cost_model, remaining, &mut tracker);
            handle_unused_qubits(arch, self.cost_model, &mut tracker)?;
            return Ok(tracker.into_placement());
        }

        let data = if self.settings.use_hypergraph {
            let info = depth_info(n_qubits, &pairs);
            log_rounds(&info.depth_list, &info.blocks);
            self.hypergraph_data(arch, &info)?
        } else {
            let rounds = depth_list(n_qubits, &pairs);
            log_rounds(&rounds, &[]);
            self.graph_data(arch, &rounds)?
        };
        let assignment = self.partitioner.partition(&data, arch.n_zones())?;
        data.check_assignment(&assignment)?;
        placement_from_assignment(arch, &assignment)
    }

    /// Qubit-zone graph with gate edges of the first `max_depth + 1` rounds.
    pub fn graph_data(&self, arch: &DynamicArch, rounds: &DepthList) -> CompileResult<GraphData> {
        let n_qubits = arch.n_qubits();
        let decay = self.settings.weight_decay;
        let max_weight = decay.max_weight();
        let mut edges: Vec<Vec<usize>> = Vec::new();
        let mut weights: Vec<u64> = Vec::new();

        for (depth, round) in rounds.iter().enumerate().take(self.settings.max_depth + 1) {
            let weight = decay.weight(depth);
            for &(a, b) in round {
                edges.push(vec![a, b]);
                weights.push(weight);
            }
        }

        // Qubits of the next gates belong in gate zones.
        if arch.has_memory_zones() {
            if let Some(front) = rounds.first() {
                for &(a, b) in front {
                    for qubit in [a, b] {
                        for &zone in arch.gate_zones() {
                            edges.push(vec![qubit, n_qubits + zone]);
                            weights.push(max_weight);
                        }
                    }
                }
            }
        }

        let max_shuttle_weight = max_weight.div_ceil(2) as f64;
        for (zone, qubits) in arch.placement().iter().enumerate() {
            for &qubit in qubits {
                for target in 0..arch.n_zones() {
                    let Some(cost) = self.cost_model.single_move_cost(arch, qubit, zone, target)
                    else {
                        continue;
                    };
                    let weight = ((-SHUTTLE_DECAY * cost as f64).exp() * max_shuttle_weight).ceil();
                    if weight < 1.0 {
                        continue;
                    }
                    edges.push(vec![n_qubits + target, qubit]);
                    weights.push(weight as u64);
                }
            }
        }

        build_graph_data(arch, edges, weights)
    }

    /// Qubit-zone hypergraph with one net per depth block.
    ///
    /// Blocks are used up to the first depth whose smallest block no longer
    /// fits into the largest gate zone.
    pub fn hypergraph_data(&self, arch: &DynamicArch, info: &DepthInfo) -> CompileResult<GraphData> {
        let n_qubits = arch.n_qubits();
        let decay = self.settings.weight_decay;
        let largest = arch.largest_gate_zone_max_capacity();

        let mut cutoff = 1;
        for blocks in info.blocks.iter().skip(1) {
            let smallest = blocks.iter().map(Vec::len).min().unwrap_or(0);
            if smallest > largest {
                break;
            }
            cutoff += 1;
        }
        let cutoff = cutoff.min(self.settings.max_depth + 1);
        trace!(cutoff, "hypergraph depth cutoff");

        let mut nets: Vec<Vec<usize>> = Vec::new();
        let mut weights: Vec<u64> = Vec::new();
        for (depth, blocks) in info.blocks.iter().enumerate().take(cutoff) {
            let weight = decay.weight(depth);
            for block in blocks {
                if arch.has_memory_zones() {
                    for &zone in arch.gate_zones() {
                        let mut net = block.clone();
                        net.push(n_qubits + zone);
                        nets.push(net);
                        weights.push(weight);
                    }
                } else {
                    nets.push(block.clone());
                    weights.push(weight);
                }
            }
        }

        let max_shuttle_weight = (decay.max_weight() as f64 * 0.8).floor();
        for (zone, qubits) in arch.placement().iter().enumerate() {
            for &qubit in qubits {
                for target in 0..arch.n_zones() {
                    // Staying is never penalized.
                    let penalty = if target == zone {
                        0.0
                    } else {
                        match self.cost_model.single_move_cost(arch, qubit, zone, target) {
                            Some(cost) => (cost as f64 * max_shuttle_weight * 0.05).floor(),
                            None => continue,
                        }
                    };
                    let weight = max_shuttle_weight - penalty;
                    if weight < 1.0 {
                        continue;
                    }
                    nets.push(vec![qubit, n_qubits + target]);
                    weights.push(weight as u64);
                }
            }
        }

        build_graph_data(arch, nets, weights)
    }
}

/// Vertex layout shared by both models: qubits, one anchor per zone, fillers.
fn build_graph_data(
    arch: &DynamicArch,
    edges: Vec<Vec<usize>>,
    edge_weights: Vec<u64>,
) -> CompileResult<GraphData> {
    let n_qubits = arch.n_qubits();
    let n_zones = arch.n_zones();
    let part_max_sizes: Vec<u64> = (0..n_zones)
        .map(|zone| arch.zone_max_gate_cap(zone) as u64 + 1)
        .collect();
    let n_vertices = part_max_sizes.iter().sum::<u64>() as usize;
    if n_vertices < n_qubits + n_zones {
        return Err(CompileError::Partition(format!(
            "{n_qubits} qubits exceed the gate capacity of the architecture"
        )));
    }

    let mut fixed = vec![None; n_vertices];
    for zone in 0..n_zones {
        fixed[n_qubits + zone] = Some(zone);
    }
    GraphData::new(
        n_vertices,
        vec![1; n_vertices],
        edges,
        edge_weights,
        fixed,
        part_max_sizes,
    )
}

/// Read the zone of every qubit off the part of its zone's anchor.
fn placement_from_assignment(
    arch: &DynamicArch,
    assignment: &[usize],
) -> CompileResult<ZonePlacement> {
    let n_qubits = arch.n_qubits();
    let n_zones = arch.n_zones();
    let mut part_to_zone = vec![None; n_zones];
    for zone in 0..n_zones {
        part_to_zone[assignment[n_qubits + zone]] = Some(zone);
    }

    let mut placement = ZonePlacement::empty(n_zones);
    for (qubit, &part) in assignment.iter().enumerate().take(n_qubits) {
        let zone = part_to_zone[part].ok_or_else(|| {
            CompileError::Partition(format!("part {part} of qubit {qubit} has no zone anchor"))
        })?;
        placement.zone_mut(zone).push(qubit);
    }
    Ok(placement)
}

fn log_rounds(rounds: &DepthList, blocks: &[DepthBlocks]) {
    for (depth, round) in rounds.iter().enumerate().take(4) {
        match blocks.get(depth) {
            Some(blocks) => debug!(depth, ?round, ?blocks, "depth round"),
            None => debug!(depth, ?round, "depth round"),
        }
    }
}
