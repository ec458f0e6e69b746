//! Turning a target placement into physical moves.
//!
//! The router compares the live placement with a target placement, groups
//! the qubits that have to change zone by `(source, target)` and repeatedly
//! executes the cheapest feasible batch. Every batch is lined up at its
//! departure port with positional swaps, then shuttled hop by hop along its
//! path.
//!
//! Steady state placements respect gate capacity. When every target zone is
//! full, the router enters *soft-lock*: one qubit of transport slack per zone
//! may be used, and a zone pushed above its gate capacity must be drained
//! by the very next move.

use std::collections::BTreeMap;

use tracing::{debug, instrument, trace};

use ionroute_arch::{ArchError, DynamicArch, PortId, ZoneId, ZonePlacement, validate_placement};

use crate::cost::{CostModel, MoveCost};
use crate::error::{CompileError, CompileResult};
use crate::ops::{RoutingOp, RoutingResult};

/// Router between placements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneralRouter {
    cost_model: CostModel,
}

/// A batch chosen for execution.
#[derive(Debug)]
struct Candidate {
    src: ZoneId,
    trg: ZoneId,
    qubits: Vec<usize>,
    cost: MoveCost,
}

impl Candidate {
    fn cost_per_qubit(&self) -> f64 {
        self.cost.cost as f64 / self.qubits.len() as f64
    }
}

/// Outcome of one routing call with the soft-lock flag.
#[derive(Debug)]
pub(crate) struct RouteOutcome {
    pub(crate) result: RoutingResult,
    pub(crate) soft_locked: bool,
}

impl GeneralRouter {
    /// Router ranking moves with `cost_model`.
    pub fn new(cost_model: CostModel) -> Self {
        Self { cost_model }
    }

    /// Move qubits until `arch` holds the zones of `target`.
    ///
    /// The order of qubits inside a target zone is not prescribed; only zone
    /// membership is. On success the live placement has exactly the target's
    /// zone sets.
    pub fn route_source_to_target_config(
        &self,
        arch: &mut DynamicArch,
        target: &ZonePlacement,
    ) -> CompileResult<RoutingResult> {
        self.route(arch, target).map(|outcome| outcome.result)
    }

    #[instrument(skip_all, fields(n_qubits = arch.n_qubits()))]
    pub(crate) fn route(
        &self,
        arch: &mut DynamicArch,
        target: &ZonePlacement,
    ) -> CompileResult<RouteOutcome> {
        validate_placement(arch.spec(), arch.n_qubits(), target).map_err(|e| match e {
            ArchError::GateCapacityExceeded {
                zone,
                occupancy,
                capacity,
            } => CompileError::TargetOverCapacity {
                zone,
                occupancy,
                capacity,
            },
            other => other.into(),
        })?;

        let mut groups: BTreeMap<(ZoneId, ZoneId), Vec<usize>> = BTreeMap::new();
        for (trg, qubits) in target.iter().enumerate() {
            for &qubit in qubits {
                let src = arch.current_zone(qubit);
                if src != trg {
                    groups.entry((src, trg)).or_default().push(qubit);
                }
            }
        }

        let mut result = RoutingResult::default();
        let mut soft_locked = false;
        let mut forced_zone: Option<ZoneId> = None;

        while !groups.is_empty() {
            let remaining: usize = groups.values().map(Vec::len).sum();

            if !soft_locked && total_free_space(arch, &groups, false) == 0 {
                debug!(remaining, "all target zones full, entering soft-lock");
                soft_locked = true;
            }
            if total_free_space(arch, &groups, soft_locked) == 0 {
                return Err(CompileError::RoutingInfeasible { remaining });
            }

            let candidate = match self.best_candidate(arch, &groups, forced_zone, soft_locked) {
                Some(candidate) => candidate,
                None if !soft_locked => {
                    debug!(remaining, "no feasible move, entering soft-lock");
                    soft_locked = true;
                    continue;
                }
                None => return Err(CompileError::RoutingInfeasible { remaining }),
            };

            trace!(
                src = candidate.src,
                trg = candidate.trg,
                qubits = ?candidate.qubits,
                cost = candidate.cost.cost,
                "executing move"
            );
            result.cost_estimate += candidate.cost.cost as f64;
            execute_move(arch, &candidate, &mut result.routing_ops)?;

            let key = (candidate.src, candidate.trg);
            if let Some(group) = groups.get_mut(&key) {
                group.retain(|q| !candidate.qubits.contains(q));
                if group.is_empty() {
                    groups.remove(&key);
                }
            }
            forced_zone = (arch.zone_occupancy(candidate.trg) > arch.zone_max_gate_cap(candidate.trg))
                .then_some(candidate.trg);
        }

        if !result.routing_ops.is_empty() {
            result.routing_ops.push(RoutingOp::RoutingBarrier);
        }
        debug!(
            shuttles = result.n_shuttles(),
            pswaps = result.n_pswaps(),
            cost = result.cost_estimate,
            soft_locked,
            "routed to target placement"
        );
        Ok(RouteOutcome {
            result,
            soft_locked,
        })
    }

    /// Cheapest batch per moved qubit. Groups leaving `forced_zone` go first;
    /// the others are only tried when none of those can move.
    fn best_candidate(
        &self,
        arch: &DynamicArch,
        groups: &BTreeMap<(ZoneId, ZoneId), Vec<usize>>,
        forced_zone: Option<ZoneId>,
        soft_locked: bool,
    ) -> Option<Candidate> {
        if let Some(zone) = forced_zone {
            let forced = groups
                .iter()
                .filter(|((src, _), _)| *src == zone)
                .filter_map(|(&(src, trg), qubits)| {
                    self.group_candidate(arch, src, trg, qubits, soft_locked)
                });
            if let Some(best) = cheapest(forced) {
                return Some(best);
            }
        }
        cheapest(groups.iter().filter_map(|(&(src, trg), qubits)| {
            self.group_candidate(arch, src, trg, qubits, soft_locked)
        }))
    }

    /// Best batch of one group: for each departure port, the largest batch
    /// of qubits nearest that port that has a path.
    fn group_candidate(
        &self,
        arch: &DynamicArch,
        src: ZoneId,
        trg: ZoneId,
        qubits: &[usize],
        soft_locked: bool,
    ) -> Option<Candidate> {
        let max_n = qubits.len().min(free_space(arch, trg, soft_locked));
        if max_n == 0 {
            return None;
        }
        let per_port = PortId::BOTH.iter().filter_map(|&port| {
            let mut by_distance = qubits.to_vec();
            match port {
                PortId::P0 => by_distance.sort_by_key(|&q| arch.position(q)),
                PortId::P1 => by_distance.sort_by_key(|&q| std::cmp::Reverse(arch.position(q))),
            }
            (1..=max_n).rev().find_map(|n| {
                let mut batch = by_distance[..n].to_vec();
                batch.sort_by_key(|&q| arch.position(q));
                self.cost_model
                    .move_cost_from_port(arch, &batch, src, trg, port)
                    .map(|cost| Candidate {
                        src,
                        trg,
                        qubits: batch,
                        cost,
                    })
            })
        });
        cheapest(per_port)
    }
}

fn cheapest(candidates: impl Iterator<Item = Candidate>) -> Option<Candidate> {
    candidates.fold(None, |best: Option<Candidate>, candidate| match best {
        Some(best) if best.cost_per_qubit() <= candidate.cost_per_qubit() => Some(best),
        _ => Some(candidate),
    })
}

/// Spots a zone can take right now. Soft-lock allows one spot above gate
/// capacity, never above transport capacity.
fn free_space(arch: &DynamicArch, zone: ZoneId, soft_locked: bool) -> usize {
    let occupancy = arch.zone_occupancy(zone);
    let gate = (arch.zone_max_gate_cap(zone) + usize::from(soft_locked)).saturating_sub(occupancy);
    gate.min(arch.zone_max_transport_cap(zone).saturating_sub(occupancy))
}

fn total_free_space(
    arch: &DynamicArch,
    groups: &BTreeMap<(ZoneId, ZoneId), Vec<usize>>,
    soft_locked: bool,
) -> usize {
    let mut targets: Vec<ZoneId> = groups.keys().map(|&(_, trg)| trg).collect();
    targets.sort_unstable();
    targets.dedup();
    targets
        .into_iter()
        .map(|zone| free_space(arch, zone, soft_locked))
        .sum()
}

/// Emit and apply the swaps and shuttles of one batch.
fn execute_move(
    arch: &mut DynamicArch,
    candidate: &Candidate,
    ops: &mut Vec<RoutingOp>,
) -> CompileResult<()> {
    ops.push(RoutingOp::RoutingBarrier);
    let qubits = &candidate.qubits;
    let path = &candidate.cost.path;
    if path.len() < 2 {
        return Ok(());
    }
    align_to_port(arch, candidate.src, qubits, candidate.cost.src_port, ops)?;

    let mut entry_port: Option<PortId> = None;
    for hop in path.windows(2) {
        let (zone, next) = (hop[0], hop[1]);
        let (exit_port, next_port) = arch.connection_ports(zone, next)?;
        if entry_port.is_some_and(|entry| entry != exit_port) {
            align_to_port(arch, zone, qubits, exit_port, ops)?;
        }
        let mut cohort = qubits.clone();
        cohort.sort_by_key(|&q| arch.position(q));
        ops.push(RoutingOp::Shuttle {
            qubits: cohort.clone(),
            source_zone: zone,
            target_zone: next,
            source_port: exit_port,
            target_port: next_port,
        });
        arch.move_qubits(&cohort, zone, next, next_port)?;
        entry_port = Some(next_port);
    }
    Ok(())
}

/// Bring `qubits` to the `port` end of the chain of `zone` with adjacent
/// swaps, keeping their relative order.
fn align_to_port(
    arch: &mut DynamicArch,
    zone: ZoneId,
    qubits: &[usize],
    port: PortId,
    ops: &mut Vec<RoutingOp>,
) -> CompileResult<()> {
    let mut ordered = qubits.to_vec();
    ordered.sort_by_key(|&q| arch.position(q));
    let occupancy = arch.zone_occupancy(zone);

    match port {
        PortId::P0 => {
            for (slot, &qubit) in ordered.iter().enumerate() {
                while arch.position(qubit) > slot {
                    let left = arch.position(qubit) - 1;
                    pswap(arch, zone, left, ops)?;
                }
            }
        }
        PortId::P1 => {
            for (i, &qubit) in ordered.iter().rev().enumerate() {
                let slot = occupancy - 1 - i;
                while arch.position(qubit) < slot {
                    let left = arch.position(qubit);
                    pswap(arch, zone, left, ops)?;
                }
            }
        }
    }
    Ok(())
}

fn pswap(
    arch: &mut DynamicArch,
    zone: ZoneId,
    left: usize,
    ops: &mut Vec<RoutingOp>,
) -> CompileResult<()> {
    let chain = arch.zone_occupants(zone);
    let (qubit0, qubit1) = (chain[left], chain[left + 1]);
    arch.swap_adjacent(zone, left)?;
    ops.push(RoutingOp::PSwap {
        zone,
        qubit0,
        qubit1,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ionroute_arch::{ArchitectureSpec, TrapConfiguration, Zone, named};

    fn arch(spec: &ArchitectureSpec, zones: Vec<Vec<usize>>) -> DynamicArch {
        let n = zones.iter().map(Vec::len).sum();
        DynamicArch::new(spec, TrapConfiguration::new(n, ZonePlacement::new(zones))).unwrap()
    }

    fn zone_sets(placement: &ZonePlacement) -> Vec<Vec<usize>> {
        placement
            .iter()
            .map(|zone| {
                let mut zone = zone.clone();
                zone.sort_unstable();
                zone
            })
            .collect()
    }

    #[test]
    fn test_single_qubit_into_free_slot() {
        let spec = named::linear_zones(2, 4, 8).unwrap();
        let mut arch = arch(&spec, vec![vec![0, 1, 2, 3], vec![4, 5, 6]]);
        let target = ZonePlacement::new(vec![vec![1, 2, 3], vec![4, 5, 6, 0]]);

        let outcome = GeneralRouter::default().route(&mut arch, &target).unwrap();
        assert!(!outcome.soft_locked);
        let ops = &outcome.result.routing_ops;
        assert_eq!(outcome.result.n_shuttles(), 1);
        // Qubit 0 walks from the far end of zone 0 to port 1.
        assert_eq!(outcome.result.n_pswaps(), 3);
        assert_eq!(
            ops[4],
            RoutingOp::Shuttle {
                qubits: vec![0],
                source_zone: 0,
                target_zone: 1,
                source_port: PortId::P1,
                target_port: PortId::P0,
            }
        );
        assert!(ops.first().unwrap().is_barrier() && ops.last().unwrap().is_barrier());
        assert_eq!(arch.zone_occupants(1), &[0, 4, 5, 6]);
        assert_eq!(outcome.result.cost_estimate, 4.0);
        arch.check_invariants().unwrap();
    }

    #[test]
    fn test_no_op_routing() {
        let spec = named::four_zones_in_a_line();
        let mut arch = arch(&spec, vec![vec![0, 1], vec![2], vec![], vec![3]]);
        let target = ZonePlacement::new(vec![vec![1, 0], vec![2], vec![], vec![3]]);
        let result = GeneralRouter::default()
            .route_source_to_target_config(&mut arch, &target)
            .unwrap();
        assert!(result.routing_ops.is_empty());
        assert_eq!(result.cost_estimate, 0.0);
    }

    #[test]
    fn test_exchange_between_full_zones_uses_soft_lock() {
        let spec = named::linear_zones(2, 2, 4).unwrap();
        let mut arch = arch(&spec, vec![vec![0, 1], vec![2, 3]]);
        let target = ZonePlacement::new(vec![vec![0, 2], vec![1, 3]]);
        let outcome = GeneralRouter::default().route(&mut arch, &target).unwrap();
        assert!(outcome.soft_locked);
        assert_eq!(zone_sets(arch.placement()), vec![vec![0, 2], vec![1, 3]]);
        assert_eq!(outcome.result.n_shuttles(), 2);
        arch.check_invariants().unwrap();
    }

    #[test]
    fn test_packed_line_swaps_ends_through_full_zones() {
        let spec = named::linear_zones(4, 2, 8).unwrap();
        let mut arch = arch(&spec, vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6, 7]]);
        let target = ZonePlacement::new(vec![vec![6, 7], vec![2, 3], vec![4, 5], vec![0, 1]]);
        let outcome = GeneralRouter::default().route(&mut arch, &target).unwrap();

        assert!(outcome.soft_locked);
        assert_eq!(zone_sets(arch.placement()), zone_sets(&target));
        let ops = &outcome.result.routing_ops;
        let steps = ops.iter().filter(|op| op.is_barrier()).count() - 1;
        assert!(steps <= 4);
        // Four ions leave their end zones.
        assert!(outcome.result.n_shuttles() >= 4);
        arch.check_invariants().unwrap();
    }

    #[test]
    fn test_pass_through_realigns() {
        let spec = named::four_zones_in_a_line();
        let mut arch = arch(&spec, vec![vec![0], vec![1, 2], vec![], vec![]]);
        let target = ZonePlacement::new(vec![vec![], vec![1, 2], vec![0], vec![]]);
        let result = GeneralRouter::default()
            .route_source_to_target_config(&mut arch, &target)
            .unwrap();
        // Enter zone 1 at port 0, swap past both residents, leave at port 1.
        assert_eq!(result.n_shuttles(), 2);
        assert_eq!(result.n_pswaps(), 2);
        assert_eq!(arch.zone_occupants(1), &[1, 2]);
        assert_eq!(arch.zone_occupants(2), &[0]);
        // Two shuttles plus one qubit passing a chain of two.
        assert_eq!(result.cost_estimate, 4.0);
    }

    #[test]
    fn test_batch_moves_together() {
        let spec = named::four_zones_in_a_line();
        let mut arch = arch(&spec, vec![vec![0, 1, 2], vec![], vec![], vec![]]);
        let target = ZonePlacement::new(vec![vec![0], vec![1, 2], vec![], vec![]]);
        let result = GeneralRouter::default()
            .route_source_to_target_config(&mut arch, &target)
            .unwrap();
        assert_eq!(result.n_shuttles(), 1);
        assert_eq!(result.n_pswaps(), 0);
        assert_eq!(arch.zone_occupants(1), &[1, 2]);
    }

    #[test]
    fn test_target_over_capacity() {
        let spec = named::linear_zones(2, 2, 4).unwrap();
        let mut arch = arch(&spec, vec![vec![0, 1], vec![2]]);
        let target = ZonePlacement::new(vec![vec![0, 1, 2], vec![]]);
        assert!(matches!(
            GeneralRouter::default().route_source_to_target_config(&mut arch, &target),
            Err(CompileError::TargetOverCapacity { zone: 0, .. })
        ));
    }

    #[test]
    fn test_unreachable_target_is_infeasible() {
        let spec = ArchitectureSpec::new(2, vec![Zone::gate(2); 2], vec![]).unwrap();
        let mut arch = arch(&spec, vec![vec![0], vec![1]]);
        let target = ZonePlacement::new(vec![vec![0, 1], vec![]]);
        assert!(matches!(
            GeneralRouter::default().route_source_to_target_config(&mut arch, &target),
            Err(CompileError::RoutingInfeasible { remaining: 1 })
        ));
    }

    #[test]
    fn test_shuttle_only_model() {
        let spec = named::four_zones_in_a_line();
        let mut arch = arch(&spec, vec![vec![0, 1], vec![], vec![], vec![2]]);
        let target = ZonePlacement::new(vec![vec![1], vec![], vec![], vec![2, 0]]);
        let result = GeneralRouter::new(CostModel::ShuttleOnly)
            .route_source_to_target_config(&mut arch, &target)
            .unwrap();
        assert_eq!(result.n_shuttles(), 3);
        assert_eq!(result.cost_estimate, 3.0);
        assert_eq!(arch.zone_occupants(3), &[0, 2]);
    }
}
