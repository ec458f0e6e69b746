//! Depth analysis of two-qubit gate sequences.
//!
//! A depth list groups the two-qubit gates of a circuit into rounds that act
//! on disjoint qubits. Round `d` holds every gate whose operands were last
//! used in round `d - 1` or earlier. The gate selectors look at the first
//! rounds to decide where qubits should go next.

use ionroute_ir::Instruction;

/// Operands of a two-qubit gate, smaller index first.
pub type GatePair = (usize, usize);

/// Gate pairs per logical depth.
pub type DepthList = Vec<Vec<GatePair>>;

/// Qubit sets connected by gates up to some depth.
pub type DepthBlocks = Vec<Vec<usize>>;

/// Two-qubit gate operands in program order.
///
/// Barriers, measurements, resets and single-qubit gates are skipped.
pub fn gate_pairs(instructions: &[Instruction]) -> Vec<GatePair> {
    instructions
        .iter()
        .filter(|inst| inst.is_two_qubit_gate())
        .map(|inst| {
            let a = inst.qubits[0].index();
            let b = inst.qubits[1].index();
            (a.min(b), a.max(b))
        })
        .collect()
}

/// Schedule gate pairs into rounds.
///
/// A pair repeating one already scheduled in the round before its own joins
/// that round instead of opening a new one.
pub fn depth_list(n_qubits: usize, pairs: &[GatePair]) -> DepthList {
    let mut last = vec![0usize; n_qubits];
    let mut rounds: DepthList = Vec::new();
    for &(a, b) in pairs {
        let depth = last[a].max(last[b]);
        if depth > 0 && rounds[depth - 1].contains(&(a, b)) {
            rounds[depth - 1].push((a, b));
            continue;
        }
        if depth == rounds.len() {
            rounds.push(Vec::new());
        }
        rounds[depth].push((a, b));
        last[a] = depth + 1;
        last[b] = depth + 1;
    }
    rounds
}

/// [`depth_list`] of the two-qubit gates in `instructions`.
pub fn depth_list_from_commands(n_qubits: usize, instructions: &[Instruction]) -> DepthList {
    depth_list(n_qubits, &gate_pairs(instructions))
}

/// Remove pairs that are already co-located and rebuild the rounds.
///
/// Pairs of round 0 for which `is_satisfied` holds are dropped. In later
/// rounds a satisfied pair is only dropped while neither of its qubits has
/// been touched by a pair that stays, so no gate overtakes another on the
/// same qubit.
pub fn updated_depth_list<F>(n_qubits: usize, rounds: &[Vec<GatePair>], is_satisfied: F) -> DepthList
where
    F: Fn(GatePair) -> bool,
{
    let mut touched = vec![false; n_qubits];
    let mut remaining = Vec::new();
    for (depth, round) in rounds.iter().enumerate() {
        for &(a, b) in round {
            let prunable = depth == 0 || !(touched[a] || touched[b]);
            if prunable && is_satisfied((a, b)) {
                continue;
            }
            touched[a] = true;
            touched[b] = true;
            remaining.push((a, b));
        }
    }
    depth_list(n_qubits, &remaining)
}

/// Depth list plus the qubit blocks connected at every depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepthInfo {
    /// The rounds.
    pub depth_list: DepthList,
    /// `blocks[d]`: disjoint qubit sets connected by the gates of rounds
    /// `0..=d`. Only qubits used by some gate appear.
    pub blocks: Vec<DepthBlocks>,
}

impl DepthInfo {
    /// Number of rounds.
    pub fn depth(&self) -> usize {
        self.depth_list.len()
    }
}

/// Compute the rounds and their qubit blocks.
pub fn depth_info(n_qubits: usize, pairs: &[GatePair]) -> DepthInfo {
    let rounds = depth_list(n_qubits, pairs);
    let mut blocks: Vec<DepthBlocks> = Vec::with_capacity(rounds.len());

    let mut current: DepthBlocks = Vec::new();
    let mut block_of: Vec<Option<usize>> = vec![None; n_qubits];
    for (depth, round) in rounds.iter().enumerate() {
        for &(a, b) in round {
            match (block_of[a], block_of[b]) {
                (Some(x), Some(y)) if x == y => {}
                (Some(x), Some(y)) => {
                    let moved = std::mem::take(&mut current[y]);
                    for &q in &moved {
                        block_of[q] = Some(x);
                    }
                    current[x].extend(moved);
                }
                (Some(x), None) => {
                    current[x].push(b);
                    block_of[b] = Some(x);
                }
                (None, Some(y)) => {
                    current[y].push(a);
                    block_of[a] = Some(y);
                }
                (None, None) => {
                    debug_assert!(depth == 0, "fresh pair ({a}, {b}) at depth {depth}");
                    block_of[a] = Some(current.len());
                    block_of[b] = Some(current.len());
                    current.push(vec![a, b]);
                }
            }
        }

        current.retain(|block| !block.is_empty());
        for (index, block) in current.iter().enumerate() {
            for &q in block {
                block_of[q] = Some(index);
            }
        }
        blocks.push(current.clone());
    }

    DepthInfo {
        depth_list: rounds,
        blocks,
    }
}
