//! Predefined trap architectures.

use crate::error::ArchResult;
use crate::spec::{ArchitectureSpec, PortId, Zone, ZoneConnection};

/// Names accepted by [`by_name`].
pub const NAMES: &[&str] = &[
    "four_zones_in_a_line",
    "four_zones_ring",
    "memory_and_gate_zones",
];

/// Look up a predefined architecture.
pub fn by_name(name: &str) -> Option<ArchitectureSpec> {
    match name {
        "four_zones_in_a_line" => Some(four_zones_in_a_line()),
        "four_zones_ring" => Some(four_zones_ring()),
        "memory_and_gate_zones" => Some(memory_and_gate_zones()),
        _ => None,
    }
}

/// `n_zones` gate zones of equal capacity in a line, tail to head.
pub fn linear_zones(
    n_zones: usize,
    gate_capacity: usize,
    n_qubits_max: usize,
) -> ArchResult<ArchitectureSpec> {
    ArchitectureSpec::new(n_qubits_max, vec![Zone::gate(gate_capacity); n_zones], line(n_zones))
}

fn line(n_zones: usize) -> Vec<ZoneConnection> {
    (1..n_zones)
        .map(|z| ZoneConnection::chain(z - 1, z))
        .collect()
}

/// Four gate zones of capacity 6 in a line, up to 16 qubits.
pub fn four_zones_in_a_line() -> ArchitectureSpec {
    build(16, vec![Zone::gate(6); 4], line(4))
}

/// Four gate zones of capacity 6 connected in a ring 0-1-3-2-0.
pub fn four_zones_ring() -> ArchitectureSpec {
    build(
        16,
        vec![Zone::gate(6); 4],
        vec![
            ZoneConnection::chain(0, 1),
            ZoneConnection::chain(1, 3),
            ZoneConnection::new(3, PortId::P1, 2, PortId::P1),
            ZoneConnection::new(2, PortId::P0, 0, PortId::P0),
        ],
    )
}

/// Eight zones of capacity 10 in a line. Zones 3 and 4 execute gates, the
/// three zones on either side are memory only.
pub fn memory_and_gate_zones() -> ArchitectureSpec {
    let zones = (0..8)
        .map(|z| {
            if z == 3 || z == 4 {
                Zone::gate(10)
            } else {
                Zone::memory(10)
            }
        })
        .collect();
    build(40, zones, line(8))
}

fn build(n_qubits_max: usize, zones: Vec<Zone>, connections: Vec<ZoneConnection>) -> ArchitectureSpec {
    let spec = ArchitectureSpec::from_parts_unchecked(n_qubits_max, zones, connections);
    debug_assert!(spec.validate().is_ok());
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_architectures_validate() {
        for name in NAMES {
            let spec = by_name(name).unwrap();
            spec.validate().unwrap();
        }
        assert!(by_name("nope").is_none());
    }

    #[test]
    fn test_memory_and_gate_zones() {
        let spec = memory_and_gate_zones();
        assert_eq!(spec.gate_zones(), vec![3, 4]);
        assert_eq!(spec.memory_zones().len(), 6);
    }

    #[test]
    fn test_linear_zones() {
        let spec = linear_zones(5, 3, 10).unwrap();
        assert_eq!(spec.n_zones(), 5);
        assert_eq!(spec.connections().len(), 4);
        assert_eq!(spec.n_qubits_max(), 10);
        assert!(linear_zones(0, 3, 10).is_err());
    }
}
