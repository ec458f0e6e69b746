//! First come, first served gate selection.
//!
//! Gate pairs are visited round by round. A pair whose qubits can share a
//! gate zone gets both qubits *locked* into that zone. A pair that cannot be
//! served marks its qubits as *must wait*, and so does every later pair that
//! touches a waiting qubit. Qubits that end the round unlocked stay where they
//! are when there is room, otherwise they go to the nearest zone with a free
//! spot.

use tracing::{debug, trace};

use ionroute_arch::{DynamicArch, ZoneId, ZonePlacement};
use ionroute_ir::Instruction;

use crate::cost::CostModel;
use crate::depth::{GatePair, depth_list_from_commands};
use crate::error::{CompileError, CompileResult};
use crate::selection::tracker::QubitTracker;

/// Greedy gate selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreedyGateSelector {
    cost_model: CostModel,
}

/// Qubits that cannot take part in any further gate this round, in the order
/// they were marked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MustWait {
    order: Vec<usize>,
    flags: Vec<bool>,
}

impl MustWait {
    fn new(n_qubits: usize) -> Self {
        Self {
            order: Vec::new(),
            flags: vec![false; n_qubits],
        }
    }

    fn contains(&self, qubit: usize) -> bool {
        self.flags[qubit]
    }

    fn mark(&mut self, qubit: usize) {
        if !self.flags[qubit] {
            self.flags[qubit] = true;
            self.order.push(qubit);
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    /// Marked qubits in marking order.
    pub(crate) fn qubits(&self) -> &[usize] {
        &self.order
    }

    /// Mark the partner of a waiting qubit. Returns whether either qubit
    /// waits.
    fn propagate(&mut self, qubit0: usize, qubit1: usize) -> bool {
        match (self.contains(qubit0), self.contains(qubit1)) {
            (false, false) => false,
            (true, false) => {
                self.mark(qubit1);
                true
            }
            (false, true) => {
                self.mark(qubit0);
                true
            }
            (true, true) => true,
        }
    }
}

impl GreedyGateSelector {
    /// Create a selector using `cost_model` to rank zones.
    pub fn new(cost_model: CostModel) -> Self {
        Self { cost_model }
    }

    /// The cost model.
    pub fn cost_model(&self) -> CostModel {
        self.cost_model
    }

    /// Target placement serving as many of the next gates of `remaining` as
    /// possible.
    pub fn next_config(
        &self,
        arch: &DynamicArch,
        remaining: &[Instruction],
    ) -> CompileResult<ZonePlacement> {
        let mut tracker = QubitTracker::new(arch);
        let rounds = depth_list_from_commands(arch.n_qubits(), remaining);
        if rounds.is_empty() {
            handle_only_single_qubits_remaining(arch, self.cost_model, remaining, &mut tracker);
        } else {
            let must_wait = self.handle_depth_list(arch, &rounds, &mut tracker);
            debug!(
                locked = tracker.n_locked(),
                must_wait = must_wait.len(),
                "greedy round assigned"
            );
            trace!(waiting = ?must_wait.qubits(), "qubits held back");
        }
        handle_unused_qubits(arch, self.cost_model, &mut tracker)?;
        Ok(tracker.into_placement())
    }

    /// Lock gate pairs into gate zones, round by round.
    pub(crate) fn handle_depth_list(
        &self,
        arch: &DynamicArch,
        rounds: &[Vec<GatePair>],
        tracker: &mut QubitTracker,
    ) -> MustWait {
        let n_qubits = arch.n_qubits();
        let mut must_wait = MustWait::new(n_qubits);

        'rounds: for round in rounds {
            for &(qubit0, qubit1) in round {
                let max_free = arch
                    .gate_zones()
                    .iter()
                    .map(|&zone| gate_free_space(arch, tracker, zone))
                    .max()
                    .unwrap_or(0);
                if must_wait.len() == n_qubits || max_free == 0 {
                    break 'rounds;
                }

                if must_wait.propagate(qubit0, qubit1) {
                    continue;
                }

                match (tracker.is_locked(qubit0), tracker.is_locked(qubit1)) {
                    (true, true) => {
                        if tracker.current_zone(qubit0) != tracker.current_zone(qubit1) {
                            must_wait.mark(qubit0);
                            must_wait.mark(qubit1);
                        }
                    }
                    (true, false) => {
                        if !lock_next_to(arch, tracker, qubit0, qubit1) {
                            must_wait.mark(qubit1);
                        }
                    }
                    (false, true) => {
                        if !lock_next_to(arch, tracker, qubit1, qubit0) {
                            must_wait.mark(qubit0);
                        }
                    }
                    (false, false) => {
                        if !self.lock_pair(arch, tracker, qubit0, qubit1) {
                            must_wait.mark(qubit0);
                            must_wait.mark(qubit1);
                        }
                    }
                }
            }
        }
        must_wait
    }

    /// Lock two unlocked qubits into a common gate zone: the zone of either
    /// qubit if it has two free spots, otherwise the cheapest gate zone.
    fn lock_pair(
        &self,
        arch: &DynamicArch,
        tracker: &mut QubitTracker,
        qubit0: usize,
        qubit1: usize,
    ) -> bool {
        let zone0 = tracker.current_zone(qubit0);
        let zone1 = tracker.current_zone(qubit1);
        let has_room = |tracker: &QubitTracker, zone: ZoneId| {
            arch.is_gate_zone(zone) && gate_free_space(arch, tracker, zone) >= 2
        };

        let target = if has_room(&*tracker, zone0) {
            Some(zone0)
        } else if has_room(&*tracker, zone1) {
            Some(zone1)
        } else {
            find_best_gate_zone(
                arch,
                self.cost_model,
                &[(qubit0, zone0), (qubit1, zone1)],
                tracker,
            )
        };
        match target {
            Some(zone) => {
                tracker.lock_qubit(qubit0, zone0, zone);
                tracker.lock_qubit(qubit1, zone1, zone);
                true
            }
            None => false,
        }
    }
}

/// Gate spots of `zone` not yet claimed by locked qubits.
pub(crate) fn gate_free_space(arch: &DynamicArch, tracker: &QubitTracker, zone: ZoneId) -> usize {
    arch.zone_max_gate_cap(zone)
        .saturating_sub(tracker.n_new_occupants(zone))
}

/// Lock `other` into the zone of the locked qubit `locked` if a spot is left.
fn lock_next_to(
    arch: &DynamicArch,
    tracker: &mut QubitTracker,
    locked: usize,
    other: usize,
) -> bool {
    let zone = tracker.current_zone(locked);
    if gate_free_space(arch, tracker, zone) == 0 {
        return false;
    }
    let other_zone = tracker.current_zone(other);
    tracker.lock_qubit(other, other_zone, zone);
    true
}

/// Gate zone with room for every qubit of `qubit_zones` and the lowest summed
/// move cost. Zones some qubit cannot reach are skipped.
pub(crate) fn find_best_gate_zone(
    arch: &DynamicArch,
    cost_model: CostModel,
    qubit_zones: &[(usize, ZoneId)],
    tracker: &QubitTracker,
) -> Option<ZoneId> {
    let mut best: Option<(u64, ZoneId)> = None;
    for &gate_zone in arch.gate_zones() {
        if gate_free_space(arch, tracker, gate_zone) < qubit_zones.len() {
            continue;
        }
        let metric: Option<u64> = qubit_zones
            .iter()
            .map(|&(qubit, zone)| cost_model.single_move_cost(arch, qubit, zone, gate_zone))
            .sum();
        if let Some(metric) = metric {
            if best.is_none_or(|(min, _)| metric < min) {
                best = Some((metric, gate_zone));
            }
        }
    }
    best.map(|(_, zone)| zone)
}

/// Bring the qubits of the remaining single-qubit operations into gate
/// zones, in program order, until no gate spot is left.
pub(crate) fn handle_only_single_qubits_remaining(
    arch: &DynamicArch,
    cost_model: CostModel,
    remaining: &[Instruction],
    tracker: &mut QubitTracker,
) {
    for inst in remaining {
        if inst.is_barrier() {
            continue;
        }
        let Some(qubit) = inst.qubits.first().map(|q| q.index()) else {
            continue;
        };
        if tracker.is_locked(qubit) {
            continue;
        }
        let zone = tracker.current_zone(qubit);
        if arch.is_gate_zone(zone) && gate_free_space(arch, tracker, zone) >= 1 {
            tracker.lock_qubit(qubit, zone, zone);
            continue;
        }
        match find_best_gate_zone(arch, cost_model, &[(qubit, zone)], tracker) {
            Some(target) => tracker.lock_qubit(qubit, zone, target),
            None => break,
        }
    }
}

/// Place every qubit that is still unlocked.
///
/// Qubits keep their zone while it has gate spots left. The rest of a zone's
/// leftovers go to the nearest zones with free spots.
pub(crate) fn handle_unused_qubits(
    arch: &DynamicArch,
    cost_model: CostModel,
    tracker: &mut QubitTracker,
) -> CompileResult<()> {
    for zone in 0..arch.n_zones() {
        let leftovers = tracker.current_occupants(zone).to_vec();
        let free = gate_free_space(arch, tracker, zone);
        for &qubit in leftovers.iter().take(free) {
            tracker.lock_qubit(qubit, zone, zone);
        }
    }

    for zone in 0..arch.n_zones() {
        let mut leftovers = tracker.current_occupants(zone).to_vec();
        let Some(&first) = leftovers.first() else {
            continue;
        };
        for target in cost_model.closest_zones(arch, first, zone) {
            let mut free = gate_free_space(arch, tracker, target);
            while free > 0 {
                let Some(qubit) = leftovers.pop() else {
                    break;
                };
                tracker.lock_qubit(qubit, zone, target);
                free -= 1;
            }
            if leftovers.is_empty() {
                break;
            }
        }
        if let Some(&qubit) = leftovers.first() {
            return Err(CompileError::Unplaceable { qubit });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ionroute_arch::{TrapConfiguration, named};
    use ionroute_ir::{Circuit, QubitId};

    fn arch(spec: &ionroute_arch::ArchitectureSpec, zones: Vec<Vec<usize>>) -> DynamicArch {
        let n = zones.iter().map(Vec::len).sum();
        DynamicArch::new(spec, TrapConfiguration::new(n, ZonePlacement::new(zones))).unwrap()
    }

    #[test]
    fn test_chain_must_wait_propagation() {
        let spec = named::linear_zones(4, 2, 8).unwrap();
        let arch = arch(&spec, vec![vec![0], vec![1], vec![2], vec![3]]);
        let selector = GreedyGateSelector::default();
        let mut tracker = QubitTracker::new(&arch);

        let rounds = vec![vec![(0, 1)], vec![(1, 2)], vec![(2, 3)]];
        let must_wait = selector.handle_depth_list(&arch, &rounds, &mut tracker);

        assert!(tracker.is_locked(0) && tracker.is_locked(1));
        assert_eq!(tracker.current_zone(0), tracker.current_zone(1));
        assert_eq!(must_wait.qubits(), &[2, 3]);
    }

    #[test]
    fn test_pair_locks_into_own_zone() {
        let spec = named::four_zones_in_a_line();
        let arch = arch(&spec, vec![vec![0, 1], vec![2], vec![], vec![]]);
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit.cz(QubitId(0), QubitId(2)).unwrap();
        let placement = GreedyGateSelector::default()
            .next_config(&arch, circuit.instructions())
            .unwrap();
        // Zone 0 has room for both, qubit 1 stays.
        assert_eq!(placement, ZonePlacement::new(vec![vec![0, 2, 1], vec![], vec![], vec![]]));
    }

    #[test]
    fn test_full_zones_fall_back_to_best_gate_zone() {
        let spec = named::linear_zones(3, 2, 6).unwrap();
        let arch = arch(&spec, vec![vec![0, 1], vec![2, 3], vec![]]);
        let mut circuit = Circuit::with_size("c", 4, 0);
        circuit.cz(QubitId(0), QubitId(1)).unwrap();
        circuit.cz(QubitId(2), QubitId(3)).unwrap();
        circuit.cz(QubitId(1), QubitId(2)).unwrap();
        let placement = GreedyGateSelector::default()
            .next_config(&arch, circuit.instructions())
            .unwrap();
        // Both round-0 pairs are served in place, (1, 2) has to wait.
        assert_eq!(placement, ZonePlacement::new(vec![vec![0, 1], vec![2, 3], vec![]]));
    }

    #[test]
    fn test_single_qubit_ops_pull_into_gate_zone() {
        let spec = named::memory_and_gate_zones();
        let arch = arch(
            &spec,
            vec![vec![], vec![], vec![0, 1], vec![], vec![], vec![], vec![], vec![]],
        );
        let mut circuit = Circuit::with_size("c", 2, 0);
        circuit.h(QubitId(1)).unwrap();
        let placement = GreedyGateSelector::default()
            .next_config(&arch, circuit.instructions())
            .unwrap();
        assert_eq!(placement.zone(3), &[1]);
        assert_eq!(placement.zone(2), &[0]);
    }

    #[test]
    fn test_displaced_qubits_go_to_closest_zone() {
        let spec = named::linear_zones(3, 2, 6).unwrap();
        let arch = arch(&spec, vec![vec![0, 1], vec![2], vec![3]]);
        let mut tracker = QubitTracker::new(&arch);
        // Qubits 2 and 3 claim zone 0, displacing 0 and 1.
        tracker.lock_qubit(2, 1, 0);
        tracker.lock_qubit(3, 2, 0);
        handle_unused_qubits(&arch, CostModel::ShuttlePSwap, &mut tracker).unwrap();
        let placement = tracker.into_placement();
        assert_eq!(placement.zone(0), &[2, 3]);
        assert_eq!(placement.zone(1), &[1, 0]);
    }

    #[test]
    fn test_unplaceable_qubit() {
        use ionroute_arch::{ArchitectureSpec, Zone};
        // Two unconnected zones with one spot each.
        let spec = ArchitectureSpec::new(2, vec![Zone::gate(1); 2], vec![]).unwrap();
        let arch = arch(&spec, vec![vec![0], vec![1]]);
        let mut tracker = QubitTracker::new(&arch);
        tracker.lock_qubit(1, 1, 0);
        assert!(matches!(
            handle_unused_qubits(&arch, CostModel::ShuttlePSwap, &mut tracker),
            Err(CompileError::Unplaceable { qubit: 0 })
        ));
    }
}
