//! Routing and compilation settings.
//!
//! All settings are plain serde structs so they can be loaded from JSON or
//! YAML. Every field has a default; [`CompilationSettings::validate`] checks
//! the combination before routing starts.

use serde::{Deserialize, Serialize};

use ionroute_arch::ZonePlacement;

use crate::cost::CostModel;
use crate::error::{CompileError, CompileResult};

/// Gate selection algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAlgorithm {
    /// First come, first served locking of gate pairs.
    #[default]
    Greedy,
    /// Graph or hypergraph partitioning of qubits onto zones.
    Partition,
}

/// How gate weights decay with depth in the partition gate selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightDecay {
    /// `ceil(exp(-2 d) * 2^18)`.
    #[default]
    Exponential,
    /// `50000 - floor(500 d)`, never below 1.
    Linear,
}

const EXP_MAX_WEIGHT: f64 = 262_144.0;
const LINEAR_MAX_WEIGHT: u64 = 50_000;

impl WeightDecay {
    /// Weight of a gate at `depth`.
    pub fn weight(self, depth: usize) -> u64 {
        match self {
            WeightDecay::Exponential => {
                ((-2.0 * depth as f64).exp() * EXP_MAX_WEIGHT).ceil() as u64
            }
            WeightDecay::Linear => LINEAR_MAX_WEIGHT
                .saturating_sub(depth as u64 * LINEAR_MAX_WEIGHT / 100)
                .max(1),
        }
    }

    /// Weight of a depth-0 gate.
    pub fn max_weight(self) -> u64 {
        self.weight(0)
    }
}

fn default_max_depth() -> usize {
    50
}

/// Settings of the routing loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// Gate selection algorithm.
    pub algorithm: RoutingAlgorithm,
    /// Number of depth-list rounds the partition selector looks ahead.
    pub max_depth: usize,
    /// Ignore intra-zone swap costs and use static shortest paths.
    pub ignore_swap_costs: bool,
    /// Gate weight decay of the partition selector.
    pub weight_decay: WeightDecay,
    /// Use depth blocks as hyperedges instead of gate pairs as edges.
    pub use_hypergraph: bool,
    /// Seed of the built-in partitioner.
    pub partition_seed: u64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            algorithm: RoutingAlgorithm::default(),
            max_depth: default_max_depth(),
            ignore_swap_costs: false,
            weight_decay: WeightDecay::default(),
            use_hypergraph: false,
            partition_seed: 0,
        }
    }
}

impl RoutingSettings {
    /// Settings with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gate selection algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: RoutingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the lookahead depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Ignore swap costs.
    #[must_use]
    pub fn with_ignore_swap_costs(mut self, ignore: bool) -> Self {
        self.ignore_swap_costs = ignore;
        self
    }

    /// Set the gate weight decay.
    #[must_use]
    pub fn with_weight_decay(mut self, decay: WeightDecay) -> Self {
        self.weight_decay = decay;
        self
    }

    /// Use the hypergraph model.
    #[must_use]
    pub fn with_hypergraph(mut self, use_hypergraph: bool) -> Self {
        self.use_hypergraph = use_hypergraph;
        self
    }

    /// Set the partitioner seed.
    #[must_use]
    pub fn with_partition_seed(mut self, seed: u64) -> Self {
        self.partition_seed = seed;
        self
    }

    /// The cost model implied by these settings.
    pub fn cost_model(&self) -> CostModel {
        if self.ignore_swap_costs {
            CostModel::ShuttleOnly
        } else {
            CostModel::ShuttlePSwap
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> CompileResult<()> {
        if self.max_depth == 0 {
            return Err(CompileError::InvalidSettings(
                "max_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Smallest number of spots qubit-order placement leaves free per zone.
pub const MIN_ZONE_FREE_SPACE: usize = 1;

fn default_zone_free_space() -> usize {
    2
}

#[cfg(feature = "partition")]
fn default_placement_max_depth() -> usize {
    200
}

/// How qubits are placed before routing starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum InitialPlacementSettings {
    /// Fill zones in index order with qubits in index order, leaving
    /// `zone_free_space` spots free in each zone.
    QubitOrder {
        /// Spots left free per zone.
        #[serde(default = "default_zone_free_space")]
        zone_free_space: usize,
    },
    /// Use the given placement.
    Manual {
        /// Qubits per zone.
        placement: ZonePlacement,
    },
    /// Partition the qubit interaction graph into one part per zone and map
    /// the parts onto the zone graph.
    #[cfg(feature = "partition")]
    GraphPartition {
        /// Spots left free per zone. Zones holding at most three ions keep
        /// exactly one spot free.
        #[serde(default = "default_zone_free_space")]
        zone_free_space: usize,
        /// Deepest depth-list round that contributes edges.
        #[serde(default = "default_placement_max_depth")]
        max_depth: usize,
        /// Seed of the built-in partitioner.
        #[serde(default)]
        seed: u64,
    },
}

impl Default for InitialPlacementSettings {
    fn default() -> Self {
        InitialPlacementSettings::QubitOrder {
            zone_free_space: default_zone_free_space(),
        }
    }
}

impl InitialPlacementSettings {
    /// Check value ranges.
    pub fn validate(&self) -> CompileResult<()> {
        let zone_free_space = match self {
            InitialPlacementSettings::QubitOrder { zone_free_space } => *zone_free_space,
            #[cfg(feature = "partition")]
            InitialPlacementSettings::GraphPartition {
                zone_free_space, ..
            } => *zone_free_space,
            InitialPlacementSettings::Manual { .. } => return Ok(()),
        };
        if zone_free_space < MIN_ZONE_FREE_SPACE {
            return Err(CompileError::InvalidSettings(format!(
                "zone_free_space must be at least {MIN_ZONE_FREE_SPACE}"
            )));
        }
        Ok(())
    }
}

/// Initial placement plus routing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilationSettings {
    /// Initial placement.
    pub initial_placement: InitialPlacementSettings,
    /// Routing loop.
    pub routing: RoutingSettings,
}

impl CompilationSettings {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the initial placement settings.
    #[must_use]
    pub fn with_initial_placement(mut self, initial_placement: InitialPlacementSettings) -> Self {
        self.initial_placement = initial_placement;
        self
    }

    /// Replace the routing settings.
    #[must_use]
    pub fn with_routing(mut self, routing: RoutingSettings) -> Self {
        self.routing = routing;
        self
    }

    /// Validate both parts.
    pub fn validate(&self) -> CompileResult<()> {
        self.initial_placement.validate()?;
        self.routing.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_decay() {
        assert_eq!(WeightDecay::Exponential.weight(0), 262_144);
        assert_eq!(WeightDecay::Exponential.weight(1), 35_478);
        assert!(WeightDecay::Exponential.weight(20) >= 1);
        assert_eq!(WeightDecay::Linear.weight(0), 50_000);
        assert_eq!(WeightDecay::Linear.weight(3), 48_500);
        assert_eq!(WeightDecay::Linear.weight(500), 1);
    }

    #[test]
    fn test_defaults_and_builders() {
        let settings = RoutingSettings::new()
            .with_algorithm(RoutingAlgorithm::Partition)
            .with_max_depth(10)
            .with_hypergraph(true);
        assert_eq!(settings.algorithm, RoutingAlgorithm::Partition);
        assert_eq!(settings.max_depth, 10);
        assert!(settings.use_hypergraph);
        assert_eq!(settings.cost_model(), CostModel::ShuttlePSwap);
        assert_eq!(
            settings.with_ignore_swap_costs(true).cost_model(),
            CostModel::ShuttleOnly
        );
        assert_eq!(RoutingSettings::default().max_depth, 50);
    }

    #[test]
    fn test_validation() {
        assert!(RoutingSettings::new().with_max_depth(0).validate().is_err());
        let bad = CompilationSettings::new().with_initial_placement(
            InitialPlacementSettings::QubitOrder { zone_free_space: 0 },
        );
        assert!(matches!(
            bad.validate(),
            Err(CompileError::InvalidSettings(_))
        ));
        CompilationSettings::default().validate().unwrap();
    }

    #[test]
    fn test_deserialize_partial_json() {
        let settings: CompilationSettings = serde_json::from_str(
            r#"{
                "routing": { "algorithm": "partition", "use_hypergraph": true },
                "initial_placement": { "algorithm": "manual", "placement": [[0, 1], [2]] }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.routing.algorithm, RoutingAlgorithm::Partition);
        assert_eq!(settings.routing.max_depth, 50);
        assert!(matches!(
            settings.initial_placement,
            InitialPlacementSettings::Manual { .. }
        ));

        let order: InitialPlacementSettings =
            serde_json::from_str(r#"{ "algorithm": "qubit_order" }"#).unwrap();
        assert_eq!(order, InitialPlacementSettings::default());
    }

    #[cfg(feature = "partition")]
    #[test]
    fn test_graph_partition_settings() {
        let settings: InitialPlacementSettings =
            serde_json::from_str(r#"{ "algorithm": "graph_partition", "seed": 3 }"#).unwrap();
        assert_eq!(
            settings,
            InitialPlacementSettings::GraphPartition {
                zone_free_space: 2,
                max_depth: 200,
                seed: 3,
            }
        );
        settings.validate().unwrap();

        let bad = InitialPlacementSettings::GraphPartition {
            zone_free_space: 0,
            max_depth: 200,
            seed: 0,
        };
        assert!(matches!(
            bad.validate(),
            Err(CompileError::InvalidSettings(_))
        ));
    }
}
