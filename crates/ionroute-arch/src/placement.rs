//! Qubit placements over zones.
//!
//! A [`ZonePlacement`] lists, for every zone, the qubits it holds in chain
//! order from port 0 to port 1. A [`TrapConfiguration`] pairs a placement with
//! the number of qubits it must contain.
//!
//! # Example
//!
//! ```
//! use ionroute_arch::{named, TrapConfiguration, ZonePlacement};
//!
//! let spec = named::four_zones_in_a_line();
//! let placement = ZonePlacement::new(vec![vec![0, 1], vec![2], vec![], vec![3]]);
//! let config = TrapConfiguration::new(4, placement);
//! config.validate(&spec).unwrap();
//! assert_eq!(config.zone_of(2), Some(1));
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Index;

use crate::error::{ArchError, ArchResult};
use crate::spec::{ArchitectureSpec, ZoneId};

/// Ordered qubit lists per zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZonePlacement(Vec<Vec<usize>>);

impl ZonePlacement {
    /// Wrap per-zone qubit lists.
    pub fn new(zones: Vec<Vec<usize>>) -> Self {
        Self(zones)
    }

    /// A placement with `n_zones` empty zones.
    pub fn empty(n_zones: usize) -> Self {
        Self(vec![Vec::new(); n_zones])
    }

    /// Number of zones.
    pub fn n_zones(&self) -> usize {
        self.0.len()
    }

    /// Qubits of a zone in chain order.
    pub fn zone(&self, zone: ZoneId) -> &[usize] {
        &self.0[zone]
    }

    /// Mutable chain of a zone.
    pub fn zone_mut(&mut self, zone: ZoneId) -> &mut Vec<usize> {
        &mut self.0[zone]
    }

    /// Iterate over the zones in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Vec<usize>> {
        self.0.iter()
    }

    /// Total number of placed qubits.
    pub fn n_placed(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    /// Zone of every qubit in `0..n_qubits`, `None` for unplaced qubits.
    pub fn qubit_to_zone(&self, n_qubits: usize) -> Vec<Option<ZoneId>> {
        let mut zones = vec![None; n_qubits];
        for (zone, qubits) in self.0.iter().enumerate() {
            for &qubit in qubits {
                if qubit < n_qubits {
                    zones[qubit] = Some(zone);
                }
            }
        }
        zones
    }

    /// Unwrap into per-zone lists.
    pub fn into_inner(self) -> Vec<Vec<usize>> {
        self.0
    }
}

impl Index<ZoneId> for ZonePlacement {
    type Output = Vec<usize>;

    fn index(&self, zone: ZoneId) -> &Self::Output {
        &self.0[zone]
    }
}

impl From<Vec<Vec<usize>>> for ZonePlacement {
    fn from(zones: Vec<Vec<usize>>) -> Self {
        Self(zones)
    }
}

/// A full assignment of `n_qubits` qubits to zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapConfiguration {
    /// Number of qubits.
    pub n_qubits: usize,
    /// Per-zone chains.
    pub zone_placement: ZonePlacement,
}

impl TrapConfiguration {
    /// Create a configuration. Use [`TrapConfiguration::validate`] before
    /// handing it to a [`DynamicArch`](crate::DynamicArch).
    pub fn new(n_qubits: usize, zone_placement: ZonePlacement) -> Self {
        Self {
            n_qubits,
            zone_placement,
        }
    }

    /// Zone currently holding `qubit`.
    pub fn zone_of(&self, qubit: usize) -> Option<ZoneId> {
        self.zone_placement
            .iter()
            .position(|chain| chain.contains(&qubit))
    }

    /// Check the configuration against an architecture: matching zone count,
    /// qubit count within `n_qubits_max`, every qubit placed exactly once and
    /// no zone above its gate capacity.
    pub fn validate(&self, spec: &ArchitectureSpec) -> ArchResult<()> {
        spec.check_n_qubits(self.n_qubits)?;
        validate_placement(spec, self.n_qubits, &self.zone_placement)
    }
}

/// Validate a placement of `n_qubits` qubits against `spec`.
pub fn validate_placement(
    spec: &ArchitectureSpec,
    n_qubits: usize,
    placement: &ZonePlacement,
) -> ArchResult<()> {
    if placement.n_zones() != spec.n_zones() {
        return Err(ArchError::ZoneCountMismatch {
            expected: spec.n_zones(),
            got: placement.n_zones(),
        });
    }

    let mut seen = vec![false; n_qubits];
    for (zone, qubits) in placement.iter().enumerate() {
        let capacity = spec.zone(zone).gate_capacity;
        if qubits.len() > capacity {
            return Err(ArchError::GateCapacityExceeded {
                zone,
                occupancy: qubits.len(),
                capacity,
            });
        }
        for &qubit in qubits {
            if qubit >= n_qubits {
                return Err(ArchError::QubitOutOfRange { qubit, n_qubits });
            }
            if seen[qubit] {
                return Err(ArchError::DuplicateQubit { qubit });
            }
            seen[qubit] = true;
        }
    }

    match seen.iter().position(|placed| !placed) {
        Some(qubit) => Err(ArchError::MissingQubit { qubit }),
        None => Ok(()),
    }
}

/// `(zone, position)` of every qubit, indexed by qubit.
///
/// The placement must contain every qubit in `0..n_qubits` exactly once.
pub fn qubit_to_zone_pos(n_qubits: usize, placement: &ZonePlacement) -> Vec<(ZoneId, usize)> {
    let mut result = vec![(0, 0); n_qubits];
    for (zone, qubits) in placement.iter().enumerate() {
        for (position, &qubit) in qubits.iter().enumerate() {
            result[qubit] = (zone, position);
        }
    }
    result
}
