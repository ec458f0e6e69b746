//! Routed circuits.
//!
//! A [`ZonedCircuit`] is the output of routing: per-zone initialisation
//! records, the interleaved stream of gates and routing operations, and the
//! placement the trap ends up in. [`ZonedCircuit::validate`] replays the
//! stream on a fresh [`DynamicArch`] and checks every gate runs inside a
//! single gate zone.

use serde::{Deserialize, Serialize};

use ionroute_arch::{
    ArchError, ArchitectureSpec, DynamicArch, PortId, TrapConfiguration, ZoneId, ZonePlacement,
};
use ionroute_ir::Instruction;

use crate::error::{CompileError, CompileResult};
use crate::ops::RoutingOp;

/// Qubits loaded into a zone before the first operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneInit {
    /// The zone.
    pub zone: ZoneId,
    /// Qubits in chain order.
    pub qubits: Vec<usize>,
}

/// One entry of a routed circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZonedOp {
    /// A circuit instruction.
    Gate(Instruction),
    /// A physical move.
    Routing(RoutingOp),
}

/// A circuit routed onto a multi-zone trap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonedCircuit {
    name: String,
    n_qubits: usize,
    n_clbits: usize,
    inits: Vec<ZoneInit>,
    ops: Vec<ZonedOp>,
    final_placement: ZonePlacement,
}

impl ZonedCircuit {
    /// An empty routed circuit starting from `initial`.
    pub fn new(
        name: impl Into<String>,
        n_qubits: usize,
        n_clbits: usize,
        initial: &ZonePlacement,
    ) -> Self {
        let inits = initial
            .iter()
            .enumerate()
            .map(|(zone, qubits)| ZoneInit {
                zone,
                qubits: qubits.clone(),
            })
            .collect();
        Self {
            name: name.into(),
            n_qubits,
            n_clbits,
            inits,
            ops: Vec::new(),
            final_placement: initial.clone(),
        }
    }

    /// Append a circuit instruction.
    pub fn push_gate(&mut self, instruction: Instruction) {
        self.ops.push(ZonedOp::Gate(instruction));
    }

    /// Append routing operations.
    pub fn extend_routing(&mut self, ops: impl IntoIterator<Item = RoutingOp>) {
        self.ops.extend(ops.into_iter().map(ZonedOp::Routing));
    }

    pub(crate) fn set_final_placement(&mut self, placement: ZonePlacement) {
        self.final_placement = placement;
    }

    /// Circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of qubits.
    pub fn n_qubits(&self) -> usize {
        self.n_qubits
    }

    /// Number of classical bits.
    pub fn n_clbits(&self) -> usize {
        self.n_clbits
    }

    /// Initialisation records, one per zone.
    pub fn inits(&self) -> &[ZoneInit] {
        &self.inits
    }

    /// The placement before the first operation.
    pub fn initial_placement(&self) -> ZonePlacement {
        ZonePlacement::new(self.inits.iter().map(|init| init.qubits.clone()).collect())
    }

    /// The placement after the last operation.
    pub fn final_placement(&self) -> &ZonePlacement {
        &self.final_placement
    }

    /// All operations in execution order.
    pub fn ops(&self) -> &[ZonedOp] {
        &self.ops
    }

    /// Circuit instructions only.
    pub fn gates(&self) -> impl Iterator<Item = &Instruction> {
        self.ops.iter().filter_map(|op| match op {
            ZonedOp::Gate(instruction) => Some(instruction),
            ZonedOp::Routing(_) => None,
        })
    }

    /// Routing operations only.
    pub fn routing_ops(&self) -> impl Iterator<Item = &RoutingOp> {
        self.ops.iter().filter_map(|op| match op {
            ZonedOp::Routing(op) => Some(op),
            ZonedOp::Gate(_) => None,
        })
    }

    /// Number of shuttles.
    pub fn n_shuttles(&self) -> usize {
        self.routing_ops().filter(|op| op.is_shuttle()).count()
    }

    /// Number of positional swaps.
    pub fn n_pswaps(&self) -> usize {
        self.routing_ops().filter(|op| op.is_pswap()).count()
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> CompileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replay every operation on `spec` and check the result.
    ///
    /// Gates must act on qubits sharing one gate zone. Shuttles must move a
    /// cohort sitting at the departure port across an existing connection,
    /// swaps must exchange neighbours. The replayed placement must equal the
    /// recorded final placement.
    pub fn validate(&self, spec: &ArchitectureSpec) -> CompileResult<()> {
        let config = TrapConfiguration::new(self.n_qubits, self.initial_placement());
        let mut arch = DynamicArch::new(spec, config)?;

        for (index, op) in self.ops.iter().enumerate() {
            match op {
                ZonedOp::Gate(instruction) => check_gate(&arch, index, instruction)?,
                ZonedOp::Routing(op) => replay(&mut arch, op).map_err(|reason| {
                    CompileError::InvalidRoutingOp { index, reason }
                })?,
            }
        }

        if arch.placement() != &self.final_placement {
            return Err(CompileError::InvalidRoutingOp {
                index: self.ops.len(),
                reason: "replayed placement differs from the recorded final placement".into(),
            });
        }
        Ok(())
    }
}

fn check_gate(arch: &DynamicArch, index: usize, instruction: &Instruction) -> CompileResult<()> {
    if instruction.is_barrier() {
        return Ok(());
    }
    let mut zones = Vec::with_capacity(instruction.qubits.len());
    for qubit in &instruction.qubits {
        let qubit = qubit.index();
        if qubit >= arch.n_qubits() {
            return Err(ArchError::QubitOutOfRange {
                qubit,
                n_qubits: arch.n_qubits(),
            }
            .into());
        }
        zones.push(arch.current_zone(qubit));
    }
    let Some(&zone) = zones.first() else {
        return Ok(());
    };
    if zones.iter().any(|&z| z != zone) {
        return Err(CompileError::AcrossZoneOperation {
            index,
            name: instruction.name().to_string(),
            zones,
        });
    }
    if !arch.is_gate_zone(zone) {
        return Err(CompileError::GateInMemoryZone {
            index,
            name: instruction.name().to_string(),
            zone,
        });
    }
    Ok(())
}

fn replay(arch: &mut DynamicArch, op: &RoutingOp) -> Result<(), String> {
    match op {
        RoutingOp::Shuttle {
            qubits,
            source_zone,
            target_zone,
            source_port,
            target_port,
        } => {
            let ports = arch
                .connection_ports(*source_zone, *target_zone)
                .map_err(|e| e.to_string())?;
            if ports != (*source_port, *target_port) {
                return Err(format!(
                    "zones {source_zone} and {target_zone} are connected through {} and {}",
                    ports.0, ports.1
                ));
            }
            let chain = arch.zone_occupants(*source_zone);
            let n = qubits.len();
            if n > chain.len() {
                return Err(format!("zone {source_zone} holds fewer than {n} qubits"));
            }
            let at_port = match source_port {
                PortId::P0 => &chain[..n],
                PortId::P1 => &chain[chain.len() - n..],
            };
            if at_port != qubits.as_slice() {
                return Err(format!(
                    "qubits {qubits:?} are not lined up at {source_port} of zone {source_zone}"
                ));
            }
            arch.move_qubits(qubits, *source_zone, *target_zone, *target_port)
                .map_err(|e| e.to_string())
        }
        RoutingOp::PSwap {
            zone,
            qubit0,
            qubit1,
        } => {
            for &qubit in [qubit0, qubit1] {
                if qubit >= arch.n_qubits() || arch.current_zone(qubit) != *zone {
                    return Err(format!("qubit {qubit} is not in zone {zone}"));
                }
            }
            let left = arch.position(*qubit0);
            if arch.position(*qubit1) != left + 1 {
                return Err(format!(
                    "qubits {qubit0} and {qubit1} are not left and right neighbours"
                ));
            }
            arch.swap_adjacent(*zone, left).map_err(|e| e.to_string())
        }
        RoutingOp::RoutingBarrier => Ok(()),
    }
}
