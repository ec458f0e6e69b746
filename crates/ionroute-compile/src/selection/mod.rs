//! Gate selection: deciding where qubits should go next.
//!
//! A gate selector looks at the instructions that still have to run and
//! proposes a complete target placement under which as many of the next
//! two-qubit gates as possible share a gate zone. The router then turns the
//! difference between the live and the target placement into moves.

pub mod greedy;
pub mod partition;
pub mod tracker;

use std::sync::Arc;

use ionroute_arch::{DynamicArch, ZonePlacement};
use ionroute_ir::Instruction;

use crate::cost::CostModel;
use crate::error::{CompileError, CompileResult};
use crate::partition::Partitioner;
use crate::settings::{RoutingAlgorithm, RoutingSettings};

pub use greedy::GreedyGateSelector;
pub use partition::PartitionGateSelector;
pub use tracker::QubitTracker;

/// The available gate selection strategies.
#[derive(Debug, Clone)]
pub enum GateSelector {
    /// [`GreedyGateSelector`].
    Greedy(GreedyGateSelector),
    /// [`PartitionGateSelector`].
    Partition(PartitionGateSelector),
}

impl GateSelector {
    /// Build the selector requested by `settings`.
    ///
    /// `partitioner` overrides the built-in one. Without the `partition`
    /// feature a partitioner must be supplied for
    /// [`RoutingAlgorithm::Partition`].
    pub fn from_settings(
        settings: &RoutingSettings,
        partitioner: Option<Arc<dyn Partitioner>>,
    ) -> CompileResult<Self> {
        let cost_model = settings.cost_model();
        match settings.algorithm {
            RoutingAlgorithm::Greedy => Ok(GateSelector::Greedy(GreedyGateSelector::new(cost_model))),
            RoutingAlgorithm::Partition => {
                let partitioner = partitioner
                    .or_else(|| default_partitioner(settings))
                    .ok_or(CompileError::MissingPartitioner)?;
                Ok(GateSelector::Partition(PartitionGateSelector::new(
                    cost_model,
                    settings.clone(),
                    partitioner,
                )))
            }
        }
    }

    /// Target placement for the next gates of `remaining`.
    pub fn next_config(
        &self,
        arch: &DynamicArch,
        remaining: &[Instruction],
    ) -> CompileResult<ZonePlacement> {
        match self {
            GateSelector::Greedy(selector) => selector.next_config(arch, remaining),
            GateSelector::Partition(selector) => selector.next_config(arch, remaining),
        }
    }

    /// The cost model used to rank moves.
    pub fn cost_model(&self) -> CostModel {
        match self {
            GateSelector::Greedy(selector) => selector.cost_model(),
            GateSelector::Partition(selector) => selector.cost_model(),
        }
    }

    /// Selector name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            GateSelector::Greedy(_) => "greedy",
            GateSelector::Partition(_) => "partition",
        }
    }
}

#[cfg(feature = "partition")]
fn default_partitioner(settings: &RoutingSettings) -> Option<Arc<dyn Partitioner>> {
    Some(Arc::new(crate::partition::LocalSearchPartitioner::new(
        settings.partition_seed,
    )))
}

#[cfg(not(feature = "partition"))]
fn default_partitioner(_settings: &RoutingSettings) -> Option<Arc<dyn Partitioner>> {
    None
}
