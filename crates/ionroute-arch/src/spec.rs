//! Static architecture description: zones, ports and shuttle connections.
//!
//! An [`ArchitectureSpec`] is validated once on construction and never
//! mutated afterwards. Zones are addressed by dense indices into the zone
//! list; every zone has two shuttle ports, [`PortId::P0`] at the head of its
//! ion chain and [`PortId::P1`] at the tail.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ArchError, ArchResult};

/// Dense zone index.
pub type ZoneId = usize;

/// One of the two shuttling edges of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PortId {
    /// The "left" edge, next to chain position 0.
    P0,
    /// The "right" edge, next to the last chain position.
    P1,
}

impl PortId {
    /// Both ports, in index order.
    pub const BOTH: [PortId; 2] = [PortId::P0, PortId::P1];

    /// Port index (0 or 1).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            PortId::P0 => 0,
            PortId::P1 => 1,
        }
    }

    /// Port from its index.
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PortId::P0),
            1 => Some(PortId::P1),
            _ => None,
        }
    }

    /// The opposite edge of the same zone.
    #[inline]
    pub fn other(self) -> Self {
        match self {
            PortId::P0 => PortId::P1,
            PortId::P1 => PortId::P0,
        }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.index())
    }
}

fn default_swap_cost() -> u64 {
    1
}

/// A trap zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Maximum number of ions while gates are executed.
    pub gate_capacity: usize,
    /// Maximum number of ions while ions pass through during transport.
    pub transport_capacity: usize,
    /// Storage only, no gates.
    #[serde(default)]
    pub memory_only: bool,
    /// Cost of one positional swap inside the chain.
    #[serde(default = "default_swap_cost")]
    pub swap_cost: u64,
}

impl Zone {
    /// A gate zone with one unit of transport slack.
    pub fn gate(gate_capacity: usize) -> Self {
        Self {
            gate_capacity,
            transport_capacity: gate_capacity + 1,
            memory_only: false,
            swap_cost: default_swap_cost(),
        }
    }

    /// A memory-only zone with one unit of transport slack.
    pub fn memory(capacity: usize) -> Self {
        Self {
            memory_only: true,
            ..Self::gate(capacity)
        }
    }

    /// Override the transport capacity.
    #[must_use]
    pub fn with_transport_capacity(mut self, transport_capacity: usize) -> Self {
        self.transport_capacity = transport_capacity;
        self
    }

    /// Override the swap cost.
    #[must_use]
    pub fn with_swap_cost(mut self, swap_cost: u64) -> Self {
        self.swap_cost = swap_cost;
        self
    }
}

/// A `(zone, port)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZonePort {
    /// The zone.
    pub zone: ZoneId,
    /// The port of that zone.
    pub port: PortId,
}

impl ZonePort {
    /// Create a new zone port.
    pub fn new(zone: ZoneId, port: PortId) -> Self {
        Self { zone, port }
    }
}

/// A shuttle link between two zone ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConnection {
    /// First endpoint.
    pub a: ZonePort,
    /// Second endpoint.
    pub b: ZonePort,
}

impl ZoneConnection {
    /// Connect `(zone_a, port_a)` with `(zone_b, port_b)`.
    pub fn new(zone_a: ZoneId, port_a: PortId, zone_b: ZoneId, port_b: PortId) -> Self {
        Self {
            a: ZonePort::new(zone_a, port_a),
            b: ZonePort::new(zone_b, port_b),
        }
    }

    /// Connect the tail of `left` to the head of `right`.
    pub fn chain(left: ZoneId, right: ZoneId) -> Self {
        Self::new(left, PortId::P1, right, PortId::P0)
    }
}

/// Immutable description of a multi-zone trap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureSpec {
    /// Maximum number of qubits a circuit may use.
    n_qubits_max: usize,
    /// Zones, indexed by [`ZoneId`].
    zones: Vec<Zone>,
    /// Shuttle connections.
    connections: Vec<ZoneConnection>,
}

impl ArchitectureSpec {
    /// Create and validate an architecture.
    pub fn new(
        n_qubits_max: usize,
        zones: Vec<Zone>,
        connections: Vec<ZoneConnection>,
    ) -> ArchResult<Self> {
        let spec = Self {
            n_qubits_max,
            zones,
            connections,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Assemble a spec whose validity is guaranteed by the caller.
    pub(crate) fn from_parts_unchecked(
        n_qubits_max: usize,
        zones: Vec<Zone>,
        connections: Vec<ZoneConnection>,
    ) -> Self {
        Self {
            n_qubits_max,
            zones,
            connections,
        }
    }

    /// Parse an architecture from JSON and validate it.
    pub fn from_json(source: &str) -> ArchResult<Self> {
        let spec: Self = serde_json::from_str(source)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Check zone capacities and connection rules.
    ///
    /// Deserialized specs must pass this before use.
    pub fn validate(&self) -> ArchResult<()> {
        if self.zones.is_empty() {
            return Err(ArchError::EmptyArchitecture);
        }
        if self.zones.iter().all(|zone| zone.memory_only) {
            return Err(ArchError::NoGateZones);
        }
        for (id, zone) in self.zones.iter().enumerate() {
            if zone.transport_capacity < zone.gate_capacity {
                return Err(ArchError::CapacityOrder {
                    zone: id,
                    gate: zone.gate_capacity,
                    transport: zone.transport_capacity,
                });
            }
        }

        let n_zones = self.zones.len();
        let mut port_used = vec![[false; 2]; n_zones];
        for (i, connection) in self.connections.iter().enumerate() {
            for end in [connection.a, connection.b] {
                if end.zone >= n_zones {
                    return Err(ArchError::InvalidZone {
                        zone: end.zone,
                        n_zones,
                    });
                }
            }
            if connection.a.zone == connection.b.zone {
                return Err(ArchError::SelfConnection {
                    zone: connection.a.zone,
                });
            }
            let duplicate = self.connections[..i].iter().any(|other| {
                (other.a.zone == connection.a.zone && other.b.zone == connection.b.zone)
                    || (other.a.zone == connection.b.zone && other.b.zone == connection.a.zone)
            });
            if duplicate {
                return Err(ArchError::DuplicateConnection {
                    zone0: connection.a.zone,
                    zone1: connection.b.zone,
                });
            }
            for end in [connection.a, connection.b] {
                let used = &mut port_used[end.zone][end.port.index()];
                if *used {
                    return Err(ArchError::PortInUse {
                        zone: end.zone,
                        port: end.port,
                    });
                }
                *used = true;
            }
        }
        Ok(())
    }

    /// Maximum number of qubits.
    #[inline]
    pub fn n_qubits_max(&self) -> usize {
        self.n_qubits_max
    }

    /// Number of zones.
    #[inline]
    pub fn n_zones(&self) -> usize {
        self.zones.len()
    }

    /// All zones.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// A single zone.
    ///
    /// # Panics
    ///
    /// Panics if `zone` is out of range.
    #[inline]
    pub fn zone(&self, zone: ZoneId) -> &Zone {
        &self.zones[zone]
    }

    /// All shuttle connections.
    pub fn connections(&self) -> &[ZoneConnection] {
        &self.connections
    }

    /// Ids of zones that can execute gates.
    pub fn gate_zones(&self) -> Vec<ZoneId> {
        (0..self.n_zones())
            .filter(|&z| !self.zones[z].memory_only)
            .collect()
    }

    /// Ids of memory-only zones.
    pub fn memory_zones(&self) -> Vec<ZoneId> {
        (0..self.n_zones())
            .filter(|&z| self.zones[z].memory_only)
            .collect()
    }

    /// Sum of gate capacities over all zones.
    pub fn total_gate_capacity(&self) -> usize {
        self.zones.iter().map(|z| z.gate_capacity).sum()
    }

    /// Reject circuits wider than the architecture.
    pub fn check_n_qubits(&self, n_qubits: usize) -> ArchResult<()> {
        if n_qubits > self.n_qubits_max {
            return Err(ArchError::TooManyQubits {
                n_qubits,
                n_qubits_max: self.n_qubits_max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<ZoneConnection> {
        (0..n - 1).map(|z| ZoneConnection::chain(z, z + 1)).collect()
    }

    #[test]
    fn test_valid_line() {
        let spec = ArchitectureSpec::new(8, vec![Zone::gate(4); 3], line(3)).unwrap();
        assert_eq!(spec.n_zones(), 3);
        assert_eq!(spec.gate_zones(), vec![0, 1, 2]);
        assert!(spec.memory_zones().is_empty());
        assert_eq!(spec.total_gate_capacity(), 12);
        assert_eq!(spec.zone(1).transport_capacity, 5);
    }

    #[test]
    fn test_duplicate_connection_rejected() {
        let connections = vec![
            ZoneConnection::chain(0, 1),
            ZoneConnection::new(1, PortId::P1, 0, PortId::P0),
        ];
        let err = ArchitectureSpec::new(4, vec![Zone::gate(2); 2], connections).unwrap_err();
        assert!(matches!(
            err,
            ArchError::DuplicateConnection { zone0: 1, zone1: 0 }
        ));
    }

    #[test]
    fn test_port_reuse_rejected() {
        let connections = vec![ZoneConnection::chain(0, 1), ZoneConnection::chain(0, 2)];
        let err = ArchitectureSpec::new(4, vec![Zone::gate(2); 3], connections).unwrap_err();
        assert!(matches!(
            err,
            ArchError::PortInUse {
                zone: 0,
                port: PortId::P1
            }
        ));
    }

    #[test]
    fn test_capacity_order_rejected() {
        let zones = vec![Zone::gate(4).with_transport_capacity(3)];
        let err = ArchitectureSpec::new(4, zones, vec![]).unwrap_err();
        assert!(matches!(err, ArchError::CapacityOrder { zone: 0, .. }));
    }

    #[test]
    fn test_needs_gate_zone() {
        let err = ArchitectureSpec::new(4, vec![Zone::memory(4)], vec![]).unwrap_err();
        assert!(matches!(err, ArchError::NoGateZones));
    }

    #[test]
    fn test_invalid_zone_and_self_connection() {
        let err = ArchitectureSpec::new(4, vec![Zone::gate(2)], vec![ZoneConnection::chain(0, 3)])
            .unwrap_err();
        assert!(matches!(err, ArchError::InvalidZone { zone: 3, .. }));

        let err = ArchitectureSpec::new(
            4,
            vec![Zone::gate(2)],
            vec![ZoneConnection::new(0, PortId::P0, 0, PortId::P1)],
        )
        .unwrap_err();
        assert!(matches!(err, ArchError::SelfConnection { zone: 0 }));
    }

    #[test]
    fn test_json_validates() {
        let spec = ArchitectureSpec::new(4, vec![Zone::gate(2); 2], line(2)).unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(ArchitectureSpec::from_json(&json).unwrap(), spec);

        let bad = r#"{"n_qubits_max":2,"zones":[{"gate_capacity":2,"transport_capacity":1}],"connections":[]}"#;
        assert!(ArchitectureSpec::from_json(bad).is_err());
    }

    #[test]
    fn test_check_n_qubits() {
        let spec = ArchitectureSpec::new(4, vec![Zone::gate(4)], vec![]).unwrap();
        assert!(spec.check_n_qubits(4).is_ok());
        assert!(matches!(
            spec.check_n_qubits(5),
            Err(ArchError::TooManyQubits { n_qubits: 5, .. })
        ));
    }
}
