//! Physical routing operations emitted by the router.

use serde::{Deserialize, Serialize};
use std::fmt;

use ionroute_arch::{PortId, ZoneId};

/// A physical operation that changes where qubits sit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RoutingOp {
    /// Move a cohort of qubits across one connection.
    Shuttle {
        /// Moved qubits in chain order.
        qubits: Vec<usize>,
        /// Zone left.
        source_zone: ZoneId,
        /// Zone entered.
        target_zone: ZoneId,
        /// Port of the source zone.
        source_port: PortId,
        /// Port of the target zone.
        target_port: PortId,
    },
    /// Exchange two neighbouring qubits of a chain. `qubit0` is the one
    /// closer to port 0 before the swap.
    #[serde(rename = "pswap")]
    PSwap {
        /// Zone of the chain.
        zone: ZoneId,
        /// Left qubit before the swap.
        qubit0: usize,
        /// Right qubit before the swap.
        qubit1: usize,
    },
    /// Marks the boundary of one move step.
    RoutingBarrier,
}

impl RoutingOp {
    /// Whether this is a shuttle.
    pub fn is_shuttle(&self) -> bool {
        matches!(self, RoutingOp::Shuttle { .. })
    }

    /// Whether this is a positional swap.
    pub fn is_pswap(&self) -> bool {
        matches!(self, RoutingOp::PSwap { .. })
    }

    /// Whether this is a barrier.
    pub fn is_barrier(&self) -> bool {
        matches!(self, RoutingOp::RoutingBarrier)
    }
}

impl fmt::Display for RoutingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingOp::Shuttle {
                qubits,
                source_zone,
                target_zone,
                source_port,
                target_port,
            } => write!(
                f,
                "shuttle {qubits:?} z{source_zone}.{source_port} -> z{target_zone}.{target_port}"
            ),
            RoutingOp::PSwap {
                zone,
                qubit0,
                qubit1,
            } => write!(f, "pswap z{zone} q{qubit0} <-> q{qubit1}"),
            RoutingOp::RoutingBarrier => write!(f, "routing_barrier"),
        }
    }
}

/// Output of one router invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingResult {
    /// Summed cost of all executed moves.
    pub cost_estimate: f64,
    /// Operations in execution order.
    pub routing_ops: Vec<RoutingOp>,
}

impl RoutingResult {
    /// Number of shuttles.
    pub fn n_shuttles(&self) -> usize {
        self.routing_ops.iter().filter(|op| op.is_shuttle()).count()
    }

    /// Number of positional swaps.
    pub fn n_pswaps(&self) -> usize {
        self.routing_ops.iter().filter(|op| op.is_pswap()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let op = RoutingOp::Shuttle {
            qubits: vec![3, 4],
            source_zone: 0,
            target_zone: 1,
            source_port: PortId::P1,
            target_port: PortId::P0,
        };
        assert_eq!(op.to_string(), "shuttle [3, 4] z0.p1 -> z1.p0");
        let swap = RoutingOp::PSwap {
            zone: 2,
            qubit0: 5,
            qubit1: 1,
        };
        assert_eq!(swap.to_string(), "pswap z2 q5 <-> q1");
    }

    #[test]
    fn test_serde_tags() {
        let json = serde_json::to_value(RoutingOp::PSwap {
            zone: 0,
            qubit0: 1,
            qubit1: 2,
        })
        .unwrap();
        assert_eq!(json["op"], "pswap");
        let barrier = serde_json::to_value(RoutingOp::RoutingBarrier).unwrap();
        assert_eq!(barrier["op"], "routing_barrier");
    }

    #[test]
    fn test_counts() {
        let result = RoutingResult {
            cost_estimate: 2.0,
            routing_ops: vec![
                RoutingOp::RoutingBarrier,
                RoutingOp::PSwap {
                    zone: 0,
                    qubit0: 0,
                    qubit1: 1,
                },
                RoutingOp::Shuttle {
                    qubits: vec![1],
                    source_zone: 0,
                    target_zone: 1,
                    source_port: PortId::P1,
                    target_port: PortId::P0,
                },
                RoutingOp::RoutingBarrier,
            ],
        };
        assert_eq!(result.n_shuttles(), 1);
        assert_eq!(result.n_pswaps(), 1);
    }
}
