//! ionroute circuit representation
//!
//! This crate provides the circuit data structures consumed by the ionroute
//! multi-zone router: qubit ids, gates, instructions and an ordered
//! [`Circuit`] instruction stream.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`]
//! - **Gates**: [`StandardGate`] for built-in gates and [`CustomGate`] for
//!   opaque user operations
//! - **Instructions**: [`Instruction`] combining gates with their operands
//! - **Circuit**: [`Circuit`] builder with JSON (de)serialization
//!
//! # Example
//!
//! ```rust
//! use ionroute_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("pair", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.rxx(0.5, QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_two_qubit_gates(), 1);
//! ```

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{CustomGate, Gate, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use qubit::{ClbitId, QubitId};
