//! The weighted revealed-preference graph in CSR form.
//!
//! One vertex per observation period. A directed edge v→u exists iff
//! bundle u was affordable when v was chosen (p_v·q_v ≥ p_v·q_u); its
//! weight
//!
//! ```text
//! w(v→u) = p_v·(q_v − q_u) / p_v·q_v   ∈ [0, 1]
//! ```
//!
//! is the fraction of v's income saved by switching to u. Weight 0 is a
//! *weak* revealed preference (u sits exactly on v's budget line), weight
//! > 0 a *strict* one.
//!
//! # Storage
//!
//! Compressed sparse row: `offsets[0..=T]`, `heads[0..E)`, `weights[0..E)`,
//! plus a `tails` array for O(1) edge→source lookup during cycle
//! reconstruction. Out-edges of each vertex are sorted stably by
//! (weight ascending, head ascending); this single deterministic order
//! serves reproducibility and the per-vertex prefix encoding of the
//! level-removal indices. The graph is immutable once built — algorithms
//! that need a subgraph carry an [`EdgeMask`] instead of rebuilding.
//!
//! Self-loops never occur in the base graph. The symmetric extension
//! ([`RpGraph::build_symmetric`]) may produce strict self-loops, which
//! downstream code treats as trivial 1-cycles.

use serde::{Deserialize, Serialize};

use crate::{MrtError, MrtResult, Observations};

/// Relative tolerance separating weak from strict revealed preference.
///
/// A normalized weight at or below this threshold is weak; the same
/// tolerance gives edge existence a little slack on the affordable side so
/// budget-line coincidences land at weight 0 instead of flickering in and
/// out of the graph.
pub const STRICT_TOL: f64 = 1e-9;

/// Weighted revealed-preference graph over T observation vertices, CSR form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpGraph {
    vertices: usize,
    offsets: Vec<usize>,
    heads: Vec<u32>,
    tails: Vec<u32>,
    weights: Vec<f64>,
}

impl RpGraph {
    /// Build the revealed-preference graph of a dataset.
    ///
    /// Forms the T×T expenditure-gap matrix E[v,u] = p_v·q_v − p_v·q_u and
    /// keeps every off-diagonal entry with E ≥ 0 (up to tolerance) as an
    /// edge of weight E/w_v.
    pub fn build(obs: &Observations) -> Self {
        let t = obs.periods();
        let mut gaps = vec![f64::NEG_INFINITY; t * t];
        for v in 0..t {
            let w_v = obs.income(v);
            for u in 0..t {
                if u != v {
                    gaps[v * t + u] = w_v - obs.expenditure(v, u);
                }
            }
        }
        Self::from_gap_matrix(t, &gaps, obs)
    }

    /// Build the symmetric-utility extension of the graph.
    ///
    /// For every permutation π of the goods, period u's bundle is relabeled
    /// and compared against v's budget; the edge weight becomes the maximum
    /// saving over all G! relabelings. Permuting bundles alone suffices
    /// (permuting prices instead yields the same gaps). Self-comparisons
    /// are kept when some non-trivial relabeling yields a strictly positive
    /// saving; the identity permutation's exact zero on the diagonal is
    /// suppressed.
    ///
    /// Enumerates all G! permutations, so G is capped at 9.
    pub fn build_symmetric(obs: &Observations) -> MrtResult<Self> {
        let g = obs.goods();
        if g > 9 {
            return Err(MrtError::InvalidInput(format!(
                "symmetric mode enumerates G! permutations; G={g} exceeds the supported maximum of 9"
            )));
        }
        let t = obs.periods();
        let mut gaps = vec![f64::NEG_INFINITY; t * t];
        let mut perm: Vec<usize> = (0..g).collect();
        let mut permuted = vec![0.0; g];

        // Heap's algorithm, iterative form.
        let mut counters = vec![0usize; g];
        let apply = |perm: &[usize], gaps: &mut [f64], permuted: &mut [f64]| {
            for u in 0..t {
                let q_u = obs.quantity(u);
                for (slot, &src) in permuted.iter_mut().zip(perm) {
                    *slot = q_u[src];
                }
                for v in 0..t {
                    let cost: f64 = obs
                        .price(v)
                        .iter()
                        .zip(permuted.iter())
                        .map(|(p, q)| p * q)
                        .sum();
                    let gap = obs.income(v) - cost;
                    let cell = &mut gaps[v * t + u];
                    if gap > *cell {
                        *cell = gap;
                    }
                }
            }
        };

        apply(&perm, &mut gaps, &mut permuted);
        let mut i = 0;
        while i < g {
            if counters[i] < i {
                if i % 2 == 0 {
                    perm.swap(0, i);
                } else {
                    perm.swap(counters[i], i);
                }
                apply(&perm, &mut gaps, &mut permuted);
                counters[i] += 1;
                i = 0;
            } else {
                counters[i] = 0;
                i += 1;
            }
        }

        // Diagonal entries stay only when some relabeling beats the
        // identity's exact zero.
        for v in 0..t {
            let cell = &mut gaps[v * t + v];
            if *cell <= STRICT_TOL * obs.income(v) {
                *cell = f64::NEG_INFINITY;
            }
        }

        Ok(Self::from_gap_matrix(t, &gaps, obs))
    }

    fn from_gap_matrix(t: usize, gaps: &[f64], obs: &Observations) -> Self {
        // (weight, head) per tail, sorted stably so ties keep head order.
        let mut offsets = Vec::with_capacity(t + 1);
        let mut heads = Vec::new();
        let mut tails = Vec::new();
        let mut weights = Vec::new();
        let mut row: Vec<(f64, u32)> = Vec::with_capacity(t);

        offsets.push(0);
        for v in 0..t {
            let w_v = obs.income(v);
            row.clear();
            for u in 0..t {
                let gap = gaps[v * t + u];
                if gap >= -STRICT_TOL * w_v {
                    let weight = (gap / w_v).clamp(0.0, 1.0);
                    row.push((weight, u as u32));
                }
            }
            row.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
            for &(weight, head) in &row {
                heads.push(head);
                tails.push(v as u32);
                weights.push(weight);
            }
            offsets.push(heads.len());
        }

        Self {
            vertices: t,
            offsets,
            heads,
            tails,
            weights,
        }
    }

    /// Number of vertices (observation periods).
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices
    }

    /// Number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.heads.len()
    }

    /// Edge-id range of vertex v's out-edges, weight-ascending.
    #[inline]
    pub fn out_edges(&self, v: usize) -> std::ops::Range<usize> {
        self.offsets[v]..self.offsets[v + 1]
    }

    /// Head (target) vertex of an edge.
    #[inline]
    pub fn head(&self, e: usize) -> usize {
        self.heads[e] as usize
    }

    /// Tail (source) vertex of an edge.
    #[inline]
    pub fn tail(&self, e: usize) -> usize {
        self.tails[e] as usize
    }

    /// Normalized weight of an edge, in [0, 1].
    #[inline]
    pub fn weight(&self, e: usize) -> f64 {
        self.weights[e]
    }

    /// Whether the edge is a strict revealed preference.
    #[inline]
    pub fn is_strict(&self, e: usize) -> bool {
        self.weights[e] > STRICT_TOL
    }

    #[inline]
    pub fn is_self_loop(&self, e: usize) -> bool {
        self.heads[e] == self.tails[e]
    }

    /// Edge id of v→u if present. Linear in v's out-degree.
    pub fn find_edge(&self, v: usize, u: usize) -> Option<usize> {
        self.out_edges(v).find(|&e| self.head(e) == u)
    }

    /// Whether any non-self-loop edge is weak (weight 0 up to tolerance).
    pub fn has_weak_edges(&self) -> bool {
        (0..self.edge_count()).any(|e| !self.is_strict(e) && !self.is_self_loop(e))
    }

    /// In-edge adjacency, built on demand for the inverse level-removal
    /// index. Per-vertex in-edges are sorted by (weight ascending, tail
    /// ascending) — the ordering must be by weight on the *incoming* side,
    /// which the forward CSR cannot provide by transposition tricks.
    pub fn reverse(&self) -> ReverseAdjacency {
        let t = self.vertices;
        let mut offsets = vec![0usize; t + 1];
        for &h in &self.heads {
            offsets[h as usize + 1] += 1;
        }
        for v in 1..=t {
            offsets[v] += offsets[v - 1];
        }
        let mut edges = vec![0u32; self.heads.len()];
        let mut cursor = offsets.clone();
        // Forward edge ids ascend within a head bucket; re-sorted by weight
        // below.
        for e in 0..self.heads.len() {
            let h = self.heads[e] as usize;
            edges[cursor[h]] = e as u32;
            cursor[h] += 1;
        }
        for v in 0..t {
            edges[offsets[v]..offsets[v + 1]].sort_by(|&a, &b| {
                let (wa, wb) = (self.weights[a as usize], self.weights[b as usize]);
                wa.partial_cmp(&wb)
                    .unwrap()
                    .then(self.tails[a as usize].cmp(&self.tails[b as usize]))
            });
        }
        ReverseAdjacency { offsets, edges }
    }
}

/// In-edge view of an [`RpGraph`]: `edges` holds forward edge ids grouped by
/// head vertex, each group weight-ascending.
#[derive(Debug, Clone)]
pub struct ReverseAdjacency {
    offsets: Vec<usize>,
    edges: Vec<u32>,
}

impl ReverseAdjacency {
    /// Forward edge ids of v's in-edges, weight-ascending.
    #[inline]
    pub fn in_edges(&self, v: usize) -> &[u32] {
        &self.edges[self.offsets[v]..self.offsets[v + 1]]
    }
}

/// Bitmask over edge ids, used to restrict SCC/DFS/Johnson traversals to a
/// subgraph without materializing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMask {
    bits: Vec<u64>,
    len: usize,
}

impl EdgeMask {
    /// All-clear mask over `len` edges.
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Number of edges covered by the mask.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mark edge e as removed.
    #[inline]
    pub fn set(&mut self, e: usize) {
        self.bits[e / 64] |= 1 << (e % 64);
    }

    /// Un-remove edge e.
    #[inline]
    pub fn clear(&mut self, e: usize) {
        self.bits[e / 64] &= !(1 << (e % 64));
    }

    /// Whether edge e is removed.
    #[inline]
    pub fn contains(&self, e: usize) -> bool {
        self.bits[e / 64] & (1 << (e % 64)) != 0
    }

    /// Clear every bit.
    pub fn reset(&mut self) {
        self.bits.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_period_crossing() -> Observations {
        // Classic crossing budget lines: each bundle affordable at the
        // other's prices, both revealed preferences strict.
        Observations::new(2, 2, vec![2.0, 1.0, 1.0, 2.0], vec![2.0, 1.0, 1.0, 2.0]).unwrap()
    }

    #[test]
    fn test_base_graph_weights() {
        let obs = two_period_crossing();
        let g = RpGraph::build(&obs);
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 2);
        let e01 = g.find_edge(0, 1).unwrap();
        let e10 = g.find_edge(1, 0).unwrap();
        assert!((g.weight(e01) - 0.2).abs() < 1e-12);
        assert!((g.weight(e10) - 0.2).abs() < 1e-12);
        assert!(g.is_strict(e01) && g.is_strict(e10));
    }

    #[test]
    fn test_no_self_loops_in_base_graph() {
        let obs = two_period_crossing();
        let g = RpGraph::build(&obs);
        assert!((0..g.edge_count()).all(|e| !g.is_self_loop(e)));
    }

    #[test]
    fn test_edges_sorted_by_weight_then_head() {
        let obs = Observations::new(
            2,
            3,
            vec![1.0, 2.0, 2.0, 1.0, 1.0, 1.0],
            vec![1.0, 2.0, 2.0, 1.0, 2.0, 2.0],
        )
        .unwrap();
        let g = RpGraph::build(&obs);
        for v in 0..g.vertex_count() {
            let es: Vec<usize> = g.out_edges(v).collect();
            for pair in es.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                assert!(
                    g.weight(a) < g.weight(b)
                        || (g.weight(a) == g.weight(b) && g.head(a) < g.head(b))
                );
            }
        }
    }

    #[test]
    fn test_weak_edge_on_budget_boundary() {
        // Bundles sit exactly on each other's budget lines.
        let obs =
            Observations::new(2, 2, vec![1.0, 1.0, 1.0, 1.0], vec![2.0, 0.0, 0.0, 2.0]).unwrap();
        let g = RpGraph::build(&obs);
        assert_eq!(g.edge_count(), 2);
        assert!(g.has_weak_edges());
        assert!((0..2).all(|e| !g.is_strict(e)));
    }

    #[test]
    fn test_symmetric_self_loop_from_fosd_example() {
        // T=1, p=(1,2), x=(1,2): swapping the goods saves 1 of 5 units of
        // income, so the symmetric graph has a strict self-loop of weight
        // 1/5.
        let obs = Observations::new(2, 1, vec![1.0, 2.0], vec![1.0, 2.0]).unwrap();
        let base = RpGraph::build(&obs);
        assert_eq!(base.edge_count(), 0);
        let sym = RpGraph::build_symmetric(&obs).unwrap();
        assert_eq!(sym.edge_count(), 1);
        assert!(sym.is_self_loop(0));
        assert!((sym.weight(0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_identity_loop_suppressed() {
        // A symmetric bundle gains nothing from relabeling; no self-loop.
        let obs = Observations::new(2, 1, vec![1.0, 2.0], vec![2.0, 2.0]).unwrap();
        let sym = RpGraph::build_symmetric(&obs).unwrap();
        assert_eq!(sym.edge_count(), 0);
    }

    #[test]
    fn test_symmetric_weights_dominate_base() {
        let obs = two_period_crossing();
        let base = RpGraph::build(&obs);
        let sym = RpGraph::build_symmetric(&obs).unwrap();
        for v in 0..2 {
            for u in 0..2 {
                if let Some(e) = base.find_edge(v, u) {
                    let se = sym.find_edge(v, u).expect("symmetric keeps base edges");
                    assert!(sym.weight(se) >= base.weight(e) - 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_symmetric_rejects_large_g() {
        let g = 10;
        let obs = Observations::new(g, 1, vec![1.0; g], vec![1.0; g]).unwrap();
        assert!(RpGraph::build_symmetric(&obs).is_err());
    }

    #[test]
    fn test_reverse_adjacency_sorted_by_weight() {
        let obs = Observations::new(
            2,
            3,
            vec![1.0, 2.0, 2.0, 1.0, 1.0, 1.0],
            vec![1.0, 2.0, 2.0, 1.0, 2.0, 2.0],
        )
        .unwrap();
        let g = RpGraph::build(&obs);
        let rev = g.reverse();
        let mut seen = 0;
        for v in 0..g.vertex_count() {
            let ins = rev.in_edges(v);
            seen += ins.len();
            for &e in ins {
                assert_eq!(g.head(e as usize), v);
            }
            for pair in ins.windows(2) {
                assert!(g.weight(pair[0] as usize) <= g.weight(pair[1] as usize));
            }
        }
        assert_eq!(seen, g.edge_count());
    }

    #[test]
    fn test_edge_mask() {
        let mut mask = EdgeMask::new(130);
        assert!(!mask.contains(129));
        mask.set(129);
        mask.set(0);
        assert!(mask.contains(129) && mask.contains(0));
        mask.clear(0);
        assert!(!mask.contains(0));
        mask.reset();
        assert!(!mask.contains(129));
    }
}
