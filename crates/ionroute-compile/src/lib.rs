//! ionroute routing engine
//!
//! Routes quantum circuits onto multi-zone trapped-ion traps. Two-qubit
//! gates need both operands in the same gate zone, so the compiler inserts
//! shuttles between zones and positional swaps inside zones until every
//! instruction can execute.
//!
//! # Core Components
//!
//! - **Depth analysis**: [`depth`] groups upcoming two-qubit gates into rounds
//! - **Gate selection**: [`GateSelector`] proposes the next target placement,
//!   greedily or through a [`Partitioner`]
//! - **Routing**: [`GeneralRouter`] turns a target placement into
//!   [`RoutingOp`]s under gate and transport capacity limits
//! - **Driver**: [`RoutingContext`] and [`compile`] run the loop and produce
//!   a validated [`ZonedCircuit`]
//!
//! # Example
//!
//! ```rust
//! use ionroute_arch::named;
//! use ionroute_compile::{compile, CompilationSettings};
//! use ionroute_ir::Circuit;
//!
//! let spec = named::four_zones_in_a_line();
//! let circuit = Circuit::ghz(8).unwrap();
//!
//! let routed = compile(&spec, &circuit, &CompilationSettings::default()).unwrap();
//! routed.validate(&spec).unwrap();
//! println!("{} shuttles, {} swaps", routed.n_shuttles(), routed.n_pswaps());
//! ```

pub mod circuit;
pub mod cost;
pub mod depth;
pub mod error;
pub mod initial;
pub mod ops;
pub mod partition;
pub mod route;
pub mod router;
pub mod selection;
pub mod settings;

pub use circuit::{ZoneInit, ZonedCircuit, ZonedOp};
pub use cost::{CostModel, MoveCost};
pub use error::{CompileError, CompileResult};
pub use initial::{graph_partition_placement, initial_placement};
#[cfg(feature = "partition")]
pub use partition::LocalSearchPartitioner;
pub use partition::{GraphData, Partitioner};
pub use ops::{RoutingOp, RoutingResult};
pub use route::{RoutingContext, compile, compile_with_partitioner, filter_implementable, route_circuit};
pub use router::GeneralRouter;
pub use selection::{GateSelector, GreedyGateSelector, PartitionGateSelector};
pub use settings::{
    CompilationSettings, InitialPlacementSettings, RoutingAlgorithm, RoutingSettings, WeightDecay,
};
