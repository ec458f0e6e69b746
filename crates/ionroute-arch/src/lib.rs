//! ionroute trap architecture model
//!
//! Describes multi-zone trapped-ion hardware and tracks where qubits live
//! while a circuit is routed.
//!
//! # Core Components
//!
//! - **Static description**: [`ArchitectureSpec`] with [`Zone`]s and
//!   [`ZoneConnection`]s, validated once on construction
//! - **Zone graph**: [`ZoneGraph`] with precomputed shortest zone paths
//! - **Port graph**: [`PortGraph`], two nodes per zone, capacity edges
//!   weighted by current occupancy
//! - **Placements**: [`ZonePlacement`] and [`TrapConfiguration`]
//! - **Live state**: [`DynamicArch`], the only mutable state during routing
//!
//! # Example
//!
//! ```rust
//! use ionroute_arch::{named, DynamicArch, PortId, TrapConfiguration, ZonePlacement};
//!
//! let spec = named::four_zones_in_a_line();
//! let config = TrapConfiguration::new(
//!     3,
//!     ZonePlacement::new(vec![vec![0, 1], vec![2], vec![], vec![]]),
//! );
//! let mut arch = DynamicArch::new(&spec, config).unwrap();
//!
//! arch.move_qubits(&[1], 0, 1, PortId::P0).unwrap();
//! assert_eq!(arch.zone_occupants(1), &[1, 2]);
//! ```

pub mod dynamic;
pub mod error;
pub mod named;
pub mod placement;
pub mod port_graph;
pub mod spec;
pub mod zone_graph;

pub use dynamic::{DynamicArch, ShuttlePath};
pub use error::{ArchError, ArchResult};
pub use placement::{TrapConfiguration, ZonePlacement, validate_placement};
pub use port_graph::{PortEdge, PortGraph, PortPath};
pub use spec::{ArchitectureSpec, PortId, Zone, ZoneConnection, ZoneId, ZonePort};
pub use zone_graph::ZoneGraph;
