//! Graph partitioning seam of the partition gate selector.
//!
//! The selector describes its problem as a [`GraphData`] hypergraph: weighted
//! vertices, weighted nets, optional fixed part assignments and a maximum
//! weight per part. Any [`Partitioner`] can solve it. The objective is the
//! connectivity metric `km1`: every net costs its weight times the number of
//! parts it spans minus one.
//!
//! [`LocalSearchPartitioner`] (feature `partition`) is a deterministic,
//! seeded greedy placement followed by move and swap refinement.

use std::fmt;

use crate::error::{CompileError, CompileResult};

/// A hypergraph partitioning problem. Plain graphs use two-pin nets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphData {
    /// Number of vertices.
    pub n_vertices: usize,
    /// Weight of every vertex.
    pub vertex_weights: Vec<u64>,
    /// Pins of every net.
    pub edges: Vec<Vec<usize>>,
    /// Weight of every net.
    pub edge_weights: Vec<u64>,
    /// Part a vertex is pinned to, if any.
    pub fixed: Vec<Option<usize>>,
    /// Maximum total vertex weight per part.
    pub part_max_sizes: Vec<u64>,
}

impl GraphData {
    /// Build and validate a problem.
    pub fn new(
        n_vertices: usize,
        vertex_weights: Vec<u64>,
        edges: Vec<Vec<usize>>,
        edge_weights: Vec<u64>,
        fixed: Vec<Option<usize>>,
        part_max_sizes: Vec<u64>,
    ) -> CompileResult<Self> {
        let data = Self {
            n_vertices,
            vertex_weights,
            edges,
            edge_weights,
            fixed,
            part_max_sizes,
        };
        data.validate()?;
        Ok(data)
    }

    /// Number of parts.
    pub fn n_parts(&self) -> usize {
        self.part_max_sizes.len()
    }

    /// Check that all lengths and indices agree.
    pub fn validate(&self) -> CompileResult<()> {
        if self.vertex_weights.len() != self.n_vertices || self.fixed.len() != self.n_vertices {
            return Err(CompileError::Partition(format!(
                "expected {} vertex weights and fixed entries, got {} and {}",
                self.n_vertices,
                self.vertex_weights.len(),
                self.fixed.len()
            )));
        }
        if self.edges.len() != self.edge_weights.len() {
            return Err(CompileError::Partition(format!(
                "{} nets but {} net weights",
                self.edges.len(),
                self.edge_weights.len()
            )));
        }
        if let Some(pin) = self.edges.iter().flatten().find(|&&pin| pin >= self.n_vertices) {
            return Err(CompileError::Partition(format!(
                "net pin {pin} out of range for {} vertices",
                self.n_vertices
            )));
        }
        if let Some(part) = self.fixed.iter().flatten().find(|&&part| part >= self.n_parts()) {
            return Err(CompileError::Partition(format!(
                "fixed part {part} out of range for {} parts",
                self.n_parts()
            )));
        }
        Ok(())
    }

    /// Connectivity objective of an assignment.
    pub fn km1(&self, assignment: &[usize]) -> u64 {
        let mut seen = vec![false; self.n_parts()];
        self.edges
            .iter()
            .zip(&self.edge_weights)
            .map(|(net, &weight)| {
                seen.iter_mut().for_each(|s| *s = false);
                let mut span = 0u64;
                for &pin in net {
                    let part = assignment[pin];
                    if !seen[part] {
                        seen[part] = true;
                        span += 1;
                    }
                }
                weight * span.saturating_sub(1)
            })
            .sum()
    }

    /// Check that an assignment honours fixed vertices and part sizes.
    pub fn check_assignment(&self, assignment: &[usize]) -> CompileResult<()> {
        if assignment.len() != self.n_vertices {
            return Err(CompileError::Partition(format!(
                "assignment covers {} of {} vertices",
                assignment.len(),
                self.n_vertices
            )));
        }
        let mut load = vec![0u64; self.n_parts()];
        for (vertex, &part) in assignment.iter().enumerate() {
            if part >= self.n_parts() {
                return Err(CompileError::Partition(format!(
                    "vertex {vertex} assigned to unknown part {part}"
                )));
            }
            if self.fixed[vertex].is_some_and(|fixed| fixed != part) {
                return Err(CompileError::Partition(format!(
                    "fixed vertex {vertex} moved to part {part}"
                )));
            }
            load[part] += self.vertex_weights[vertex];
        }
        for (part, (&load, &max)) in load.iter().zip(&self.part_max_sizes).enumerate() {
            if load > max {
                return Err(CompileError::Partition(format!(
                    "part {part} holds weight {load}, maximum is {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Assigns every vertex of a [`GraphData`] to one of `n_parts` parts.
pub trait Partitioner: Send + Sync + fmt::Debug {
    /// Partition `data`. The result has one part index per vertex.
    fn partition(&self, data: &GraphData, n_parts: usize) -> CompileResult<Vec<usize>>;
}

#[cfg(feature = "partition")]
pub use local_search::LocalSearchPartitioner;

#[cfg(feature = "partition")]
mod local_search {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use tracing::{debug, trace};

    use super::{GraphData, Partitioner};
    use crate::error::{CompileError, CompileResult};

    /// Greedy placement plus move/swap refinement.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LocalSearchPartitioner {
        /// Seed for tie breaking.
        pub seed: u64,
        /// Maximum number of refinement passes.
        pub max_passes: usize,
    }

    impl Default for LocalSearchPartitioner {
        fn default() -> Self {
            Self {
                seed: 0,
                max_passes: 16,
            }
        }
    }

    impl LocalSearchPartitioner {
        /// Partitioner with the given seed.
        pub fn new(seed: u64) -> Self {
            Self {
                seed,
                ..Self::default()
            }
        }

        /// Set the maximum number of refinement passes.
        #[must_use]
        pub fn with_max_passes(mut self, max_passes: usize) -> Self {
            self.max_passes = max_passes;
            self
        }
    }

    impl Partitioner for LocalSearchPartitioner {
        fn partition(&self, data: &GraphData, n_parts: usize) -> CompileResult<Vec<usize>> {
            if n_parts != data.n_parts() {
                return Err(CompileError::Partition(format!(
                    "asked for {n_parts} parts, sizes given for {}",
                    data.n_parts()
                )));
            }
            data.validate()?;

            let mut state = State::new(data);
            state.place_fixed()?;
            let order = state.free_order(self.seed);
            for &vertex in &order {
                state.place_greedy(vertex)?;
            }
            let initial = data.km1(&state.assignment());
            let mut passes = 0;
            while passes < self.max_passes && state.refine(&order) {
                passes += 1;
            }
            let assignment = state.assignment();
            debug!(
                initial,
                refined = data.km1(&assignment),
                passes,
                "local search partition"
            );
            Ok(assignment)
        }
    }

    /// Mutable partitioning state with per-net pin counts.
    struct State<'a> {
        data: &'a GraphData,
        part: Vec<Option<usize>>,
        load: Vec<u64>,
        incident: Vec<Vec<usize>>,
        pins_in_part: Vec<Vec<u32>>,
    }

    impl<'a> State<'a> {
        fn new(data: &'a GraphData) -> Self {
            let mut incident = vec![Vec::new(); data.n_vertices];
            for (net, pins) in data.edges.iter().enumerate() {
                for &pin in pins {
                    incident[pin].push(net);
                }
            }
            Self {
                data,
                part: vec![None; data.n_vertices],
                load: vec![0; data.n_parts()],
                incident,
                pins_in_part: vec![vec![0; data.n_parts()]; data.edges.len()],
            }
        }

        fn assignment(&self) -> Vec<usize> {
            self.part.iter().map(|part| part.unwrap_or(0)).collect()
        }

        fn has_room(&self, vertex: usize, part: usize) -> bool {
            self.load[part] + self.data.vertex_weights[vertex] <= self.data.part_max_sizes[part]
        }

        fn assign(&mut self, vertex: usize, part: usize) {
            self.part[vertex] = Some(part);
            self.load[part] += self.data.vertex_weights[vertex];
            for &net in &self.incident[vertex] {
                self.pins_in_part[net][part] += 1;
            }
        }

        fn unassign(&mut self, vertex: usize, part: usize) {
            self.part[vertex] = None;
            self.load[part] -= self.data.vertex_weights[vertex];
            for &net in &self.incident[vertex] {
                self.pins_in_part[net][part] -= 1;
            }
        }

        fn place_fixed(&mut self) -> CompileResult<()> {
            for vertex in 0..self.data.n_vertices {
                if let Some(part) = self.data.fixed[vertex] {
                    if !self.has_room(vertex, part) {
                        return Err(CompileError::Partition(format!(
                            "fixed vertices exceed the size of part {part}"
                        )));
                    }
                    self.assign(vertex, part);
                }
            }
            Ok(())
        }

        /// Free vertices, heaviest connected first. Ties are broken by a
        /// seeded shuffle.
        fn free_order(&self, seed: u64) -> Vec<usize> {
            let mut order: Vec<usize> = (0..self.data.n_vertices)
                .filter(|&vertex| self.data.fixed[vertex].is_none())
                .collect();
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
            let strength: Vec<u64> = (0..self.data.n_vertices)
                .map(|vertex| {
                    self.incident[vertex]
                        .iter()
                        .map(|&net| self.data.edge_weights[net])
                        .sum()
                })
                .collect();
            order.sort_by(|&a, &b| strength[b].cmp(&strength[a]));
            order
        }

        /// Weight of the nets of `vertex` that already have a pin in `part`.
        fn gain(&self, vertex: usize, part: usize) -> u64 {
            self.incident[vertex]
                .iter()
                .filter(|&&net| self.pins_in_part[net][part] > 0)
                .map(|&net| self.data.edge_weights[net])
                .sum()
        }

        fn place_greedy(&mut self, vertex: usize) -> CompileResult<()> {
            let best = (0..self.data.n_parts())
                .filter(|&part| self.has_room(vertex, part))
                .map(|part| {
                    let room = self.data.part_max_sizes[part] - self.load[part];
                    (self.gain(vertex, part), room, std::cmp::Reverse(part))
                })
                .max();
            match best {
                Some((_, _, std::cmp::Reverse(part))) => {
                    self.assign(vertex, part);
                    Ok(())
                }
                None => Err(CompileError::Partition(format!(
                    "no part has room for vertex {vertex}"
                ))),
            }
        }

        /// Change of km1 when the assigned `vertex` leaves its part for `to`.
        fn move_delta(&self, vertex: usize, to: usize) -> i64 {
            let Some(from) = self.part[vertex] else {
                return 0;
            };
            self.incident[vertex]
                .iter()
                .map(|&net| {
                    let weight = self.data.edge_weights[net] as i64;
                    let pins = &self.pins_in_part[net];
                    let left = i64::from(pins[from] == 1);
                    let joined = i64::from(pins[to] == 0);
                    weight * (joined - left)
                })
                .sum()
        }

        /// One pass of improving moves and swaps. Returns whether anything
        /// improved.
        fn refine(&mut self, order: &[usize]) -> bool {
            let mut improved = false;

            for &vertex in order {
                let Some(from) = self.part[vertex] else {
                    continue;
                };
                let best = (0..self.data.n_parts())
                    .filter(|&to| to != from && self.has_room(vertex, to))
                    .map(|to| (self.move_delta(vertex, to), to))
                    .min();
                if let Some((delta, to)) = best {
                    if delta < 0 {
                        self.unassign(vertex, from);
                        self.assign(vertex, to);
                        improved = true;
                    }
                }
            }

            for (i, &a) in order.iter().enumerate() {
                if self.incident[a].is_empty() {
                    continue;
                }
                for &b in &order[i + 1..] {
                    if self.try_swap(a, b) {
                        improved = true;
                    }
                }
            }
            trace!(improved, "refinement pass");
            improved
        }

        /// Swap two vertices of different parts if that lowers km1.
        fn try_swap(&mut self, a: usize, b: usize) -> bool {
            let (Some(part_a), Some(part_b)) = (self.part[a], self.part[b]) else {
                return false;
            };
            if part_a == part_b {
                return false;
            }
            let weights = &self.data.vertex_weights;
            let max = &self.data.part_max_sizes;
            if self.load[part_a] - weights[a] + weights[b] > max[part_a]
                || self.load[part_b] - weights[b] + weights[a] > max[part_b]
            {
                return false;
            }

            let first = self.move_delta(a, part_b);
            self.unassign(a, part_a);
            self.assign(a, part_b);
            let second = self.move_delta(b, part_a);
            if first + second < 0 {
                self.unassign(b, part_b);
                self.assign(b, part_a);
                return true;
            }
            self.unassign(a, part_b);
            self.assign(a, part_a);
            false
        }
    }
}
