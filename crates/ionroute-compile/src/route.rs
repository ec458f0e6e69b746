//! The routing loop.
//!
//! [`RoutingContext`] owns the live trap state together with the gate
//! selector and the router. Each iteration emits the instructions the
//! current placement can execute, asks the selector for a placement serving
//! the next gates and lets the router move qubits there.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::{debug, info, instrument, warn};

use ionroute_arch::{ArchitectureSpec, DynamicArch, TrapConfiguration, ZonePlacement};
use ionroute_ir::{Circuit, Instruction};

use crate::circuit::ZonedCircuit;
use crate::depth::{DepthList, depth_list_from_commands, updated_depth_list};
use crate::error::{CompileError, CompileResult};
use crate::initial::initial_placement;
use crate::partition::Partitioner;
use crate::router::GeneralRouter;
use crate::selection::{GateSelector, GreedyGateSelector};
use crate::settings::{CompilationSettings, RoutingSettings};

/// Selection used after an iteration that executed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    Configured,
    Greedy,
    /// Only bring qubits of waiting single-qubit operations to gate zones.
    SingleQubit,
}

impl Fallback {
    /// Stage after an iteration that executed nothing, `None` once every
    /// stage has failed. With no two-qubit gate left to bring together only
    /// the single-qubit stage can help.
    fn next(self, partition: bool, pairs_blocked: bool) -> Option<Fallback> {
        match self {
            Fallback::SingleQubit => None,
            _ if !pairs_blocked => Some(Fallback::SingleQubit),
            Fallback::Configured if partition => Some(Fallback::Greedy),
            Fallback::Configured | Fallback::Greedy => Some(Fallback::SingleQubit),
        }
    }
}

/// Live state of one routing run.
#[derive(Debug)]
pub struct RoutingContext {
    arch: DynamicArch,
    settings: RoutingSettings,
    selector: GateSelector,
    router: GeneralRouter,
}

impl RoutingContext {
    /// Start routing `n_qubits` qubits from `initial`.
    ///
    /// Fails before any routing when the settings are invalid, the partition
    /// selector has no partitioner or `initial` does not fit the trap.
    pub fn new(
        spec: &ArchitectureSpec,
        n_qubits: usize,
        initial: ZonePlacement,
        settings: &RoutingSettings,
        partitioner: Option<Arc<dyn Partitioner>>,
    ) -> CompileResult<Self> {
        settings.validate()?;
        let selector = GateSelector::from_settings(settings, partitioner)?;
        let arch = DynamicArch::new(spec, TrapConfiguration::new(n_qubits, initial))?;
        Ok(Self {
            arch,
            settings: settings.clone(),
            router: GeneralRouter::new(settings.cost_model()),
            selector,
        })
    }

    /// The live trap state.
    pub fn arch(&self) -> &DynamicArch {
        &self.arch
    }

    /// The routing settings.
    pub fn settings(&self) -> &RoutingSettings {
        &self.settings
    }

    /// The configured gate selector.
    pub fn selector(&self) -> &GateSelector {
        &self.selector
    }

    /// Route every instruction of `circuit`.
    #[instrument(skip_all, fields(circuit = circuit.name(), selector = self.selector.name()))]
    pub fn route(&mut self, circuit: &Circuit) -> CompileResult<ZonedCircuit> {
        check_operands(circuit.instructions())?;

        let mut zoned = ZonedCircuit::new(
            circuit.name(),
            circuit.num_qubits(),
            circuit.num_clbits(),
            self.arch.placement(),
        );
        let (ready, mut remaining) =
            filter_implementable(&self.arch, circuit.instructions().to_vec());
        ready.into_iter().for_each(|inst| zoned.push_gate(inst));

        let greedy = GreedyGateSelector::new(self.selector.cost_model());
        let mut fallback = Fallback::Configured;
        let mut iterations = 0usize;

        while !remaining.is_empty() {
            iterations += 1;
            if tracing::enabled!(tracing::Level::DEBUG) {
                debug!(
                    instructions = remaining.len(),
                    blocked_rounds = self.pending_rounds(&remaining).len(),
                    "selecting next placement"
                );
            }

            let target = match fallback {
                Fallback::Configured => self.selector.next_config(&self.arch, &remaining)?,
                Fallback::Greedy => greedy.next_config(&self.arch, &remaining)?,
                Fallback::SingleQubit => {
                    let single: Vec<Instruction> = remaining
                        .iter()
                        .filter(|inst| !inst.is_barrier() && inst.qubits.len() == 1)
                        .cloned()
                        .collect();
                    greedy.next_config(&self.arch, &single)?
                }
            };
            let outcome = self.router.route(&mut self.arch, &target)?;
            let result = outcome.result;
            debug!(
                iteration = iterations,
                shuttles = result.n_shuttles(),
                pswaps = result.n_pswaps(),
                cost = result.cost_estimate,
                soft_locked = outcome.soft_locked,
                "placement updated"
            );
            zoned.extend_routing(result.routing_ops);

            let (ready, rest) = filter_implementable(&self.arch, remaining);
            remaining = rest;
            if !ready.is_empty() {
                fallback = Fallback::Configured;
                ready.into_iter().for_each(|inst| zoned.push_gate(inst));
                continue;
            }
            let pairs_blocked = !self.pending_rounds(&remaining).is_empty();
            let partition = matches!(self.selector, GateSelector::Partition(_));
            fallback = fallback.next(partition, pairs_blocked).ok_or(
                CompileError::RoutingStalled {
                    remaining: remaining.len(),
                },
            )?;
            warn!(
                remaining = remaining.len(),
                ?fallback,
                "no instruction became executable, retrying"
            );
        }

        zoned.set_final_placement(self.arch.placement().clone());
        info!(
            iterations,
            shuttles = zoned.n_shuttles(),
            pswaps = zoned.n_pswaps(),
            "routing complete"
        );
        Ok(zoned)
    }

    /// Rounds of two-qubit gates whose operands are not yet co-located in
    /// a gate zone.
    fn pending_rounds(&self, remaining: &[Instruction]) -> DepthList {
        let arch = &self.arch;
        let rounds = depth_list_from_commands(arch.n_qubits(), remaining);
        updated_depth_list(arch.n_qubits(), &rounds, |(a, b)| {
            let zone = arch.current_zone(a);
            zone == arch.current_zone(b) && arch.is_gate_zone(zone)
        })
    }
}

/// Split `instructions` into the prefix executable under the current
/// placement and the rest, preserving program order per qubit.
///
/// A qubit becomes a straggler once one of its operations cannot run. All
/// later operations touching a straggler wait, and a blocked two-qubit gate
/// or barrier makes every operand a straggler.
pub fn filter_implementable(
    arch: &DynamicArch,
    instructions: Vec<Instruction>,
) -> (Vec<Instruction>, Vec<Instruction>) {
    let n_qubits = arch.n_qubits();
    let mut stragglers: FxHashSet<usize> = FxHashSet::default();
    let mut ready = Vec::new();
    let mut waiting = Vec::new();
    let mut instructions = instructions.into_iter();

    for inst in instructions.by_ref() {
        let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
        let blocked = if inst.is_barrier() {
            qubits.iter().any(|q| stragglers.contains(q))
        } else {
            match qubits.as_slice() {
                [] => false,
                [q] => stragglers.contains(q) || !arch.is_gate_zone(arch.current_zone(*q)),
                [a, b, ..] => {
                    let zone = arch.current_zone(*a);
                    stragglers.contains(a)
                        || stragglers.contains(b)
                        || zone != arch.current_zone(*b)
                        || !arch.is_gate_zone(zone)
                }
            }
        };

        if blocked {
            stragglers.extend(qubits);
            waiting.push(inst);
            if stragglers.len() >= n_qubits {
                break;
            }
        } else {
            ready.push(inst);
        }
    }
    waiting.extend(instructions);
    (ready, waiting)
}

fn check_operands(instructions: &[Instruction]) -> CompileResult<()> {
    match instructions
        .iter()
        .find(|inst| !inst.is_barrier() && inst.qubits.len() > 2)
    {
        Some(inst) => Err(CompileError::TooManyOperands {
            name: inst.name().to_string(),
            n_qubits: inst.qubits.len(),
        }),
        None => Ok(()),
    }
}

/// Route `circuit` from `initial` with the built-in partitioner.
pub fn route_circuit(
    spec: &ArchitectureSpec,
    circuit: &Circuit,
    initial: ZonePlacement,
    settings: &RoutingSettings,
) -> CompileResult<ZonedCircuit> {
    RoutingContext::new(spec, circuit.num_qubits(), initial, settings, None)?.route(circuit)
}

/// Place and route `circuit`.
#[instrument(skip_all, fields(circuit = circuit.name(), n_qubits = circuit.num_qubits()))]
pub fn compile(
    spec: &ArchitectureSpec,
    circuit: &Circuit,
    settings: &CompilationSettings,
) -> CompileResult<ZonedCircuit> {
    compile_with_partitioner(spec, circuit, settings, None)
}

/// Place and route `circuit`, using `partitioner` for the partition selector.
pub fn compile_with_partitioner(
    spec: &ArchitectureSpec,
    circuit: &Circuit,
    settings: &CompilationSettings,
    partitioner: Option<Arc<dyn Partitioner>>,
) -> CompileResult<ZonedCircuit> {
    settings.validate()?;
    let initial = initial_placement(&settings.initial_placement, spec, circuit)?;
    debug!(?initial, "initial placement");
    RoutingContext::new(
        spec,
        circuit.num_qubits(),
        initial,
        &settings.routing,
        partitioner,
    )?
    .route(circuit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ionroute_arch::named;
    use ionroute_ir::{ClbitId, QubitId};

    fn arch(spec: &ArchitectureSpec, zones: Vec<Vec<usize>>) -> DynamicArch {
        let n = zones.iter().map(Vec::len).sum();
        DynamicArch::new(spec, TrapConfiguration::new(n, ZonePlacement::new(zones))).unwrap()
    }

    fn names(instructions: &[Instruction]) -> Vec<String> {
        instructions
            .iter()
            .map(|inst| {
                let qubits: Vec<String> = inst.qubits.iter().map(|q| q.0.to_string()).collect();
                format!("{}({})", inst.name(), qubits.join(","))
            })
            .collect()
    }

    #[test]
    fn test_fallback_ladder() {
        assert_eq!(Fallback::Configured.next(true, true), Some(Fallback::Greedy));
        assert_eq!(Fallback::Greedy.next(true, true), Some(Fallback::SingleQubit));
        assert_eq!(Fallback::Configured.next(false, true), Some(Fallback::SingleQubit));
        // Nothing to pair up: skip straight to single-qubit routing.
        assert_eq!(Fallback::Configured.next(true, false), Some(Fallback::SingleQubit));
        assert_eq!(Fallback::SingleQubit.next(true, true), None);
        assert_eq!(Fallback::SingleQubit.next(false, false), None);
    }

    #[test]
    fn test_pending_rounds() {
        let spec = named::memory_and_gate_zones();
        let mut zones = vec![Vec::new(); 8];
        zones[2] = vec![0, 1];
        zones[3] = vec![2, 3];
        let context =
            RoutingContext::new(&spec, 4, ZonePlacement::new(zones), &RoutingSettings::default(), None)
                .unwrap();
        let mut circuit = Circuit::with_size("p", 4, 0);
        circuit
            .cx(QubitId(2), QubitId(3))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap();
        // 2 and 3 share a gate zone; 0 and 1 sit in a memory zone.
        assert_eq!(context.pending_rounds(circuit.instructions()), vec![vec![(0, 1)]]);

        let mut local = Circuit::with_size("l", 4, 0);
        local.cx(QubitId(2), QubitId(3)).unwrap().h(QubitId(0)).unwrap();
        assert!(context.pending_rounds(local.instructions()).is_empty());
    }

    #[test]
    fn test_filter_stragglers() {
        let spec = named::four_zones_in_a_line();
        let arch = arch(&spec, vec![vec![0, 1], vec![2, 3], vec![], vec![]]);
        let mut circuit = Circuit::with_size("f", 4, 0);
        circuit
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .cx(QubitId(1), QubitId(2))
            .unwrap()
            .h(QubitId(1))
            .unwrap()
            .h(QubitId(3))
            .unwrap()
            .cx(QubitId(2), QubitId(3))
            .unwrap();

        let (ready, waiting) = filter_implementable(&arch, circuit.instructions().to_vec());
        assert_eq!(names(&ready), vec!["cx(0,1)", "h(3)"]);
        assert_eq!(names(&waiting), vec!["cx(1,2)", "h(1)", "cx(2,3)"]);
    }

    #[test]
    fn test_filter_memory_zone() {
        let spec = named::memory_and_gate_zones();
        let mut zones = vec![Vec::new(); 8];
        zones[2] = vec![0];
        zones[3] = vec![1];
        let arch = arch(&spec, zones);
        let mut circuit = Circuit::with_size("m", 2, 2);
        circuit
            .h(QubitId(0))
            .unwrap()
            .h(QubitId(1))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .measure(QubitId(1), ClbitId(1))
            .unwrap();

        let (ready, waiting) = filter_implementable(&arch, circuit.instructions().to_vec());
        assert_eq!(names(&ready), vec!["h(1)", "measure(1)"]);
        assert_eq!(names(&waiting), vec!["h(0)", "measure(0)"]);
    }

    #[test]
    fn test_filter_barrier_spreads_stragglers() {
        let spec = named::four_zones_in_a_line();
        let arch = arch(&spec, vec![vec![0], vec![1], vec![2], vec![]]);
        let mut circuit = Circuit::with_size("b", 3, 0);
        circuit
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .barrier([QubitId(1), QubitId(2)])
            .unwrap()
            .h(QubitId(2))
            .unwrap();

        let (ready, waiting) = filter_implementable(&arch, circuit.instructions().to_vec());
        assert!(ready.is_empty());
        assert_eq!(waiting.len(), 3);
    }

    #[test]
    fn test_route_ghz() {
        let spec = named::four_zones_in_a_line();
        let circuit = Circuit::ghz(10).unwrap();
        let settings = CompilationSettings::default();
        let zoned = compile(&spec, &circuit, &settings).unwrap();

        assert_eq!(zoned.gates().count(), circuit.instructions().len());
        assert!(zoned.n_shuttles() > 0);
        zoned.validate(&spec).unwrap();
    }

    #[test]
    fn test_no_routing_needed() {
        let spec = named::four_zones_in_a_line();
        let mut circuit = Circuit::with_size("local", 4, 0);
        circuit
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .cx(QubitId(2), QubitId(3))
            .unwrap();
        let initial = ZonePlacement::new(vec![vec![0, 1], vec![2, 3], vec![], vec![]]);
        let zoned =
            route_circuit(&spec, &circuit, initial.clone(), &RoutingSettings::default()).unwrap();
        assert_eq!(zoned.routing_ops().count(), 0);
        assert_eq!(zoned.final_placement(), &initial);
    }

    #[test]
    fn test_waiting_single_qubit_behind_barrier() {
        let spec = named::memory_and_gate_zones();
        let mut zones = vec![Vec::new(); 8];
        zones[2] = vec![0];
        zones[3] = vec![1, 2];
        let initial = ZonePlacement::new(zones);
        let mut circuit = Circuit::with_size("fence", 3, 0);
        circuit
            .h(QubitId(0))
            .unwrap()
            .barrier_all()
            .unwrap()
            .cx(QubitId(1), QubitId(2))
            .unwrap();

        let zoned = route_circuit(&spec, &circuit, initial, &RoutingSettings::default()).unwrap();
        assert_eq!(zoned.gates().count(), 3);
        let zone_of_0 = zoned.final_placement().qubit_to_zone(3)[0].unwrap();
        assert!(!spec.zone(zone_of_0).memory_only);
        zoned.validate(&spec).unwrap();
    }

    #[test]
    fn test_too_many_operands() {
        let spec = named::four_zones_in_a_line();
        let mut circuit = Circuit::with_size("ccx", 3, 0);
        circuit
            .apply(Instruction::gate(
                ionroute_ir::CustomGate::new("ccx", 3),
                [QubitId(0), QubitId(1), QubitId(2)],
            ))
            .unwrap();
        let err = compile(&spec, &circuit, &CompilationSettings::default()).unwrap_err();
        assert!(matches!(err, CompileError::TooManyOperands { n_qubits: 3, .. }));
    }

    #[test]
    fn test_invalid_settings_fail_before_routing() {
        let spec = named::four_zones_in_a_line();
        let circuit = Circuit::ghz(4).unwrap();
        let settings = CompilationSettings::default()
            .with_routing(RoutingSettings::default().with_max_depth(0));
        assert!(matches!(
            compile(&spec, &circuit, &settings),
            Err(CompileError::InvalidSettings(_))
        ));
    }

    #[cfg(feature = "partition")]
    #[test]
    fn test_route_partition() {
        use crate::settings::RoutingAlgorithm;

        let spec = named::four_zones_in_a_line();
        let circuit = Circuit::ghz(10).unwrap();
        let settings = CompilationSettings::default().with_routing(
            RoutingSettings::default()
                .with_algorithm(RoutingAlgorithm::Partition)
                .with_partition_seed(7),
        );
        let zoned = compile(&spec, &circuit, &settings).unwrap();
        assert_eq!(zoned.gates().count(), circuit.instructions().len());
        zoned.validate(&spec).unwrap();
    }

    #[cfg(feature = "partition")]
    #[test]
    fn test_compile_from_graph_partition_placement() {
        use crate::settings::InitialPlacementSettings;

        let spec = named::four_zones_ring();
        let circuit = Circuit::ghz(12).unwrap();
        let settings =
            CompilationSettings::default().with_initial_placement(InitialPlacementSettings::GraphPartition {
                zone_free_space: 2,
                max_depth: 200,
                seed: 5,
            });
        let zoned = compile(&spec, &circuit, &settings).unwrap();
        assert!(zoned.initial_placement().iter().all(|zone| zone.len() <= 4));
        assert_eq!(zoned.gates().count(), circuit.instructions().len());
        zoned.validate(&spec).unwrap();
    }
}
