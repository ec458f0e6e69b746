//! Gate types.
//!
//! The router never inspects gate semantics; it only needs a gate's name,
//! arity and parameters to carry it through to the routed output.

use serde::{Deserialize, Serialize};

/// Standard gates understood by the emitters.
///
/// Angles are plain radians. The native trapped-ion set is `R` (phased X
/// rotation), `Rz` and the Molmer-Sorensen style `Rxx`; the remaining gates
/// are kept so that unconverted circuits can still be routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// S gate.
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate.
    T,
    /// T-dagger gate.
    Tdg,
    /// Rotation around X.
    Rx(f64),
    /// Rotation around Y.
    Ry(f64),
    /// Rotation around Z.
    Rz(f64),
    /// Phased X rotation `R(theta, phi)`.
    R(f64, f64),
    /// Controlled-X gate.
    CX,
    /// Controlled-Z gate.
    CZ,
    /// SWAP gate.
    Swap,
    /// XX interaction.
    Rxx(f64),
    /// ZZ interaction.
    Rzz(f64),
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::R(_, _) => "r",
            StandardGate::CX => "cx",
            StandardGate::CZ => "cz",
            StandardGate::Swap => "swap",
            StandardGate::Rxx(_) => "rxx",
            StandardGate::Rzz(_) => "rzz",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::CX
            | StandardGate::CZ
            | StandardGate::Swap
            | StandardGate::Rxx(_)
            | StandardGate::Rzz(_) => 2,
            _ => 1,
        }
    }

    /// Get the parameters of this gate.
    pub fn parameters(&self) -> Vec<f64> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::Rxx(p)
            | StandardGate::Rzz(p) => vec![*p],
            StandardGate::R(theta, phi) => vec![*theta, *phi],
            _ => vec![],
        }
    }
}

/// A user-defined gate, opaque to the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGate {
    /// Name of the gate.
    pub name: String,
    /// Number of qubits.
    pub num_qubits: u32,
    /// Parameters.
    pub params: Vec<f64>,
}

impl CustomGate {
    /// Create a new custom gate without parameters.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            params: vec![],
        }
    }

    /// Set the parameters.
    #[must_use]
    pub fn with_params(mut self, params: Vec<f64>) -> Self {
        self.params = params;
        self
    }
}

/// Either a standard or a custom gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Gate {
    /// A standard gate.
    Standard(StandardGate),
    /// A custom gate.
    Custom(CustomGate),
}

impl Gate {
    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        match self {
            Gate::Standard(g) => g.name(),
            Gate::Custom(g) => &g.name,
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        match self {
            Gate::Standard(g) => g.num_qubits(),
            Gate::Custom(g) => g.num_qubits,
        }
    }

    /// Get the gate parameters.
    pub fn parameters(&self) -> Vec<f64> {
        match self {
            Gate::Standard(g) => g.parameters(),
            Gate::Custom(g) => g.params.clone(),
        }
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::Standard(gate)
    }
}

impl From<CustomGate> for Gate {
    fn from(gate: CustomGate) -> Self {
        Gate::Custom(gate)
    }
}
