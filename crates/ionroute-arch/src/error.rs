//! Error types for the architecture crate.

use thiserror::Error;

use crate::spec::{PortId, ZoneId};

/// Errors raised while building or mutating an architecture model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchError {
    /// The architecture has no zones.
    #[error("Architecture must contain at least one zone")]
    EmptyArchitecture,

    /// Every architecture needs a zone that can execute gates.
    #[error("Architecture has no gate zones, every zone is memory only")]
    NoGateZones,

    /// A zone index is out of range.
    #[error("Zone {zone} does not exist (architecture has {n_zones} zones)")]
    InvalidZone {
        /// The offending zone.
        zone: ZoneId,
        /// Number of zones in the architecture.
        n_zones: usize,
    },

    /// Transport capacity below gate capacity.
    #[error("Zone {zone}: transport capacity {transport} is smaller than gate capacity {gate}")]
    CapacityOrder {
        /// The offending zone.
        zone: ZoneId,
        /// Gate capacity.
        gate: usize,
        /// Transport capacity.
        transport: usize,
    },

    /// A connection joins a zone to itself.
    #[error("Zone {zone} cannot be connected to itself")]
    SelfConnection {
        /// The offending zone.
        zone: ZoneId,
    },

    /// More than one connection between the same two zones.
    #[error(
        "Two connections between zones {zone0} and {zone1} specified, only one is allowed"
    )]
    DuplicateConnection {
        /// First zone.
        zone0: ZoneId,
        /// Second zone.
        zone1: ZoneId,
    },

    /// A port already carries a connection.
    #[error("Port {port} of zone {zone} already has a connection")]
    PortInUse {
        /// The zone.
        zone: ZoneId,
        /// The port.
        port: PortId,
    },

    /// Two zones are not directly connected.
    #[error("No connection exists between zones {zone0} and {zone1}")]
    NoConnection {
        /// First zone.
        zone0: ZoneId,
        /// Second zone.
        zone1: ZoneId,
    },

    /// More qubits than the architecture supports.
    #[error("Circuit has {n_qubits} qubits, architecture supports at most {n_qubits_max}")]
    TooManyQubits {
        /// Requested number of qubits.
        n_qubits: usize,
        /// Architecture limit.
        n_qubits_max: usize,
    },

    /// A placement lists a different number of zones than the architecture.
    #[error("Placement describes {got} zones, architecture has {expected}")]
    ZoneCountMismatch {
        /// Number of zones of the architecture.
        expected: usize,
        /// Number of zones in the placement.
        got: usize,
    },

    /// A qubit index is out of range.
    #[error("Qubit {qubit} is out of range for {n_qubits} qubits")]
    QubitOutOfRange {
        /// The qubit.
        qubit: usize,
        /// Number of qubits.
        n_qubits: usize,
    },

    /// A qubit is listed more than once in a placement or move.
    #[error("Qubit {qubit} appears more than once")]
    DuplicateQubit {
        /// The qubit.
        qubit: usize,
    },

    /// A qubit is not placed at all.
    #[error("Qubit {qubit} is not placed in any zone")]
    MissingQubit {
        /// The qubit.
        qubit: usize,
    },

    /// A zone holds more qubits than its gate capacity.
    #[error("Zone {zone} holds {occupancy} qubits, gate capacity is {capacity}")]
    GateCapacityExceeded {
        /// The zone.
        zone: ZoneId,
        /// Requested occupancy.
        occupancy: usize,
        /// Gate capacity.
        capacity: usize,
    },

    /// A move would push a zone past its transport capacity.
    #[error("Zone {zone} would hold {occupancy} qubits, transport capacity is {capacity}")]
    TransportCapacityExceeded {
        /// The zone.
        zone: ZoneId,
        /// Occupancy after the move.
        occupancy: usize,
        /// Transport capacity.
        capacity: usize,
    },

    /// A qubit is not where a move expects it.
    #[error("Qubit {qubit} is not in zone {zone}")]
    QubitNotInZone {
        /// The qubit.
        qubit: usize,
        /// The expected zone.
        zone: ZoneId,
    },

    /// A move with identical source and target.
    #[error("Requested move has no effect, source and target are zone {zone}")]
    NoOpMove {
        /// The zone.
        zone: ZoneId,
    },

    /// A chain position is out of range.
    #[error("Position {position} is out of range in zone {zone}")]
    PositionOutOfRange {
        /// The zone.
        zone: ZoneId,
        /// The position.
        position: usize,
    },

    /// Cached occupancy disagrees with the placement.
    #[error("Zone {zone} caches occupancy {cached} but holds {actual} qubits")]
    OccupancyMismatch {
        /// The zone.
        zone: ZoneId,
        /// Cached count.
        cached: usize,
        /// Actual chain length.
        actual: usize,
    },

    /// JSON (de)serialization failed.
    #[error("Architecture serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for architecture operations.
pub type ArchResult<T> = Result<T, ArchError>;
