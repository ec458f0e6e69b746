//! Error types for routing and compilation.

use thiserror::Error;

use ionroute_arch::{ArchError, ZoneId};
use ionroute_ir::IrError;

/// Errors raised while selecting placements, routing qubits or validating
/// routed circuits.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Architecture or placement error.
    #[error(transparent)]
    Arch(#[from] ArchError),

    /// Circuit error.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// The partition gate selector was requested without a partitioner.
    #[error("Partition gate selection requires a partitioner, none is available")]
    MissingPartitioner,

    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// An instruction acts on more qubits than the router supports.
    #[error("Instruction '{name}' acts on {n_qubits} qubits, at most 2 are supported")]
    TooManyOperands {
        /// Instruction name.
        name: String,
        /// Number of operands.
        n_qubits: usize,
    },

    /// The circuit does not fit into the requested initial placement.
    #[error("{n_qubits} qubits do not fit, the initial placement leaves room for {available}")]
    QubitsDoNotFit {
        /// Number of qubits to place.
        n_qubits: usize,
        /// Number of available spots.
        available: usize,
    },

    /// A gate selector could not assign a zone to a qubit.
    #[error("Qubit {qubit} could not be assigned to any zone")]
    Unplaceable {
        /// The qubit.
        qubit: usize,
    },

    /// A target placement puts more qubits in a zone than it can hold.
    #[error("Target placement puts {occupancy} qubits into zone {zone}, capacity is {capacity}")]
    TargetOverCapacity {
        /// The zone.
        zone: ZoneId,
        /// Requested occupancy.
        occupancy: usize,
        /// Gate capacity of the zone.
        capacity: usize,
    },

    /// No remaining move can be executed.
    #[error("Routing is infeasible, {remaining} qubits cannot reach their target zones")]
    RoutingInfeasible {
        /// Number of qubits still waiting to move.
        remaining: usize,
    },

    /// The routing loop stopped making progress.
    #[error("Routing stalled with {remaining} instructions left")]
    RoutingStalled {
        /// Number of instructions not yet emitted.
        remaining: usize,
    },

    /// The partitioner failed or returned an unusable assignment.
    #[error("Partitioning failed: {0}")]
    Partition(String),

    /// A gate acts on qubits in different zones.
    #[error("Operation {index} '{name}' involves qubits across zones {zones:?}")]
    AcrossZoneOperation {
        /// Index of the operation in the routed stream.
        index: usize,
        /// Gate name.
        name: String,
        /// Zone of every operand.
        zones: Vec<ZoneId>,
    },

    /// A gate executes in a memory-only zone.
    #[error("Operation {index} '{name}' executes in memory zone {zone}")]
    GateInMemoryZone {
        /// Index of the operation in the routed stream.
        index: usize,
        /// Gate name.
        name: String,
        /// The zone.
        zone: ZoneId,
    },

    /// A routing operation does not match the trap state it is replayed on.
    #[error("Routing operation {index} is inconsistent: {reason}")]
    InvalidRoutingOp {
        /// Index of the operation in the routed stream.
        index: usize,
        /// What went wrong.
        reason: String,
    },

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
