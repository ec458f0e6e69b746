//! Bookkeeping of qubits that already have a target zone this round.

use ionroute_arch::{DynamicArch, ZoneId, ZonePlacement};

/// Tracks which qubits are locked into which zone while a new placement is
/// assembled.
///
/// `current` starts as a copy of the live placement and loses every qubit
/// that gets locked. `new` collects the locked qubits per target zone.
/// `qubit_to_zone` holds the live zone of unlocked qubits and the target zone
/// of locked ones.
#[derive(Debug, Clone)]
pub struct QubitTracker {
    current: Vec<Vec<usize>>,
    new: Vec<Vec<usize>>,
    qubit_to_zone: Vec<ZoneId>,
    locked: Vec<bool>,
}

impl QubitTracker {
    /// Start from the live placement with nothing locked.
    pub fn new(arch: &DynamicArch) -> Self {
        Self {
            current: arch.placement().iter().cloned().collect(),
            new: vec![Vec::new(); arch.n_zones()],
            qubit_to_zone: (0..arch.n_qubits()).map(|q| arch.current_zone(q)).collect(),
            locked: vec![false; arch.n_qubits()],
        }
    }

    /// Lock `qubit` into `lock_zone`. `old_zone` is its current zone.
    pub fn lock_qubit(&mut self, qubit: usize, old_zone: ZoneId, lock_zone: ZoneId) {
        self.current[old_zone].retain(|&q| q != qubit);
        self.new[lock_zone].push(qubit);
        self.qubit_to_zone[qubit] = lock_zone;
        self.locked[qubit] = true;
    }

    /// Whether `qubit` has been locked.
    pub fn is_locked(&self, qubit: usize) -> bool {
        self.locked[qubit]
    }

    /// Target zone if locked, live zone otherwise.
    pub fn current_zone(&self, qubit: usize) -> ZoneId {
        self.qubit_to_zone[qubit]
    }

    /// Number of qubits locked into `zone`.
    pub fn n_new_occupants(&self, zone: ZoneId) -> usize {
        self.new[zone].len()
    }

    /// Unlocked qubits still sitting in `zone`.
    pub fn current_occupants(&self, zone: ZoneId) -> &[usize] {
        &self.current[zone]
    }

    /// Unlocked qubits of every zone.
    pub fn unlocked_placement(&self) -> &[Vec<usize>] {
        &self.current
    }

    /// Number of locked qubits.
    pub fn n_locked(&self) -> usize {
        self.new.iter().map(Vec::len).sum()
    }

    /// The placement assembled so far.
    pub fn new_placement(&self) -> ZonePlacement {
        ZonePlacement::new(self.new.clone())
    }

    /// Consume the tracker into the assembled placement.
    pub fn into_placement(self) -> ZonePlacement {
        ZonePlacement::new(self.new)
    }
}
