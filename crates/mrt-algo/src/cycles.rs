//! Cycle discovery on the revealed-preference graph.
//!
//! All of the index solvers consume cycles through the same flat
//! [`CycleSet`] slab; the searches in this module produce them:
//!
//! - [`two_cycles`]: O(E·deg) scan for v↔u pairs with a strict edge —
//!   cheap seed constraints before any DFS runs.
//! - [`has_cycle`]: plain three-state DFS existence check, used for early
//!   exits before the heavier enumeration passes.
//! - [`critical_cycles`]: DFS that, on closing a cycle, records it and
//!   immediately cuts its cheapest edge (by the caller's residual weight)
//!   from further traversal, unwinding to the cut edge's tail. One pass
//!   per outer solver iteration; a pass that finds nothing certifies the
//!   residual subgraph acyclic.
//! - [`afriat_estimate`]: the same breaking search specialized to Afriat's
//!   index — the estimate starts at 0, edges at or below it are skipped,
//!   and every discovered cycle raises it to that cycle's minimum weight.
//!   Repeated until a clean pass; the final estimate is the exact max-min
//!   over the component's cycles.
//!
//! Cycles are recorded as edge-id slices in path order. Rotations are not
//! deduplicated; downstream constraint rows tolerate the redundancy.

use std::cell::Cell;

use mrt_core::{EdgeMask, RpGraph, STRICT_TOL};

/// Append-only cycle collection: one contiguous edge-id slab plus a
/// parallel length array. Keeps constraint building cache-friendly and
/// avoids per-cycle allocations.
#[derive(Debug, Clone, Default)]
pub struct CycleSet {
    edges: Vec<u32>,
    sizes: Vec<u32>,
}

impl CycleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cycles stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Append a cycle given as edge ids in path order.
    pub fn push(&mut self, cycle: &[usize]) {
        debug_assert!(!cycle.is_empty());
        self.edges.extend(cycle.iter().map(|&e| e as u32));
        self.sizes.push(cycle.len() as u32);
    }

    /// Append every cycle of another set.
    pub fn extend_from(&mut self, other: &CycleSet) {
        self.edges.extend_from_slice(&other.edges);
        self.sizes.extend_from_slice(&other.sizes);
    }

    /// Iterate cycles as edge-id slices.
    pub fn iter(&self) -> impl Iterator<Item = &[u32]> {
        let mut offset = 0;
        self.sizes.iter().map(move |&len| {
            let slice = &self.edges[offset..offset + len as usize];
            offset += len as usize;
            slice
        })
    }
}

#[inline]
fn in_component(graph: &RpGraph, labels: &[usize], comp: usize, e: usize) -> bool {
    !graph.is_self_loop(e) && labels[graph.head(e)] == comp
}

/// Record every 2-cycle of the component that contains at least one strict
/// edge. Returns the number of cycles appended.
pub fn two_cycles(
    graph: &RpGraph,
    labels: &[usize],
    comp: usize,
    comp_vertices: &[usize],
    out: &mut CycleSet,
) -> usize {
    let mut found = 0;
    for &v in comp_vertices {
        for e in graph.out_edges(v) {
            let u = graph.head(e);
            if u <= v || labels[u] != comp {
                continue;
            }
            if let Some(back) = graph.find_edge(u, v) {
                if graph.is_strict(e) || graph.is_strict(back) {
                    out.push(&[e, back]);
                    found += 1;
                }
            }
        }
    }
    found
}

/// Whether the component contains a cycle among edges passing `live`.
/// Self-loops are ignored (they are scanned separately as 1-cycles).
pub fn has_cycle<L: Fn(usize) -> bool>(
    graph: &RpGraph,
    labels: &[usize],
    comp: usize,
    comp_vertices: &[usize],
    live: L,
) -> bool {
    let t = graph.vertex_count();
    let mut color = vec![0u8; t];
    let mut frames: Vec<(usize, std::ops::Range<usize>)> = Vec::new();

    for &s in comp_vertices {
        if color[s] != 0 {
            continue;
        }
        color[s] = 1;
        frames.push((s, graph.out_edges(s)));
        while !frames.is_empty() {
            let descend = {
                let (_, cursor) = frames.last_mut().expect("nonempty frame stack");
                let mut descend = None;
                for e in cursor.by_ref() {
                    if !in_component(graph, labels, comp, e) || !live(e) {
                        continue;
                    }
                    let u = graph.head(e);
                    match color[u] {
                        0 => {
                            descend = Some(u);
                            break;
                        }
                        1 => {
                            frames.clear();
                            return true;
                        }
                        _ => {}
                    }
                }
                descend
            };
            match descend {
                Some(u) => {
                    color[u] = 1;
                    frames.push((u, graph.out_edges(u)));
                }
                None => {
                    let (v, _) = frames.pop().expect("nonempty frame stack");
                    color[v] = 2;
                }
            }
        }
    }
    false
}

struct Frame {
    vertex: usize,
    cursor: std::ops::Range<usize>,
    /// Edge that entered this frame; `usize::MAX` for DFS roots.
    entry: usize,
}

/// One breaking DFS pass over the component.
///
/// Traverses edges for which `live` holds; on closing a cycle, hands the
/// edge-id slice to `on_cycle`, which picks the position of the edge to
/// cut. The cut edge is removed from the rest of the pass and the search
/// unwinds to its tail. Returns the number of cycles handled.
fn breaking_pass<L, C>(
    graph: &RpGraph,
    labels: &[usize],
    comp: usize,
    comp_vertices: &[usize],
    live: L,
    mut on_cycle: C,
) -> usize
where
    L: Fn(usize) -> bool,
    C: FnMut(&[usize]) -> usize,
{
    let t = graph.vertex_count();
    let mut color = vec![0u8; t];
    let mut pos = vec![0u32; t];
    let mut cut_edges = EdgeMask::new(graph.edge_count());
    let mut frames: Vec<Frame> = Vec::new();
    let mut cycle: Vec<usize> = Vec::new();
    let mut found = 0;

    enum Step {
        Descend(usize, usize),
        Close(usize, usize),
        Retreat,
    }

    for &s in comp_vertices {
        if color[s] != 0 {
            continue;
        }
        color[s] = 1;
        pos[s] = 0;
        frames.push(Frame {
            vertex: s,
            cursor: graph.out_edges(s),
            entry: usize::MAX,
        });

        while !frames.is_empty() {
            let step = {
                let frame = frames.last_mut().expect("nonempty frame stack");
                let mut step = Step::Retreat;
                for e in frame.cursor.by_ref() {
                    if cut_edges.contains(e) || !in_component(graph, labels, comp, e) || !live(e) {
                        continue;
                    }
                    let u = graph.head(e);
                    match color[u] {
                        0 => {
                            step = Step::Descend(e, u);
                            break;
                        }
                        1 => {
                            step = Step::Close(e, u);
                            break;
                        }
                        _ => {}
                    }
                }
                step
            };

            match step {
                Step::Descend(e, u) => {
                    color[u] = 1;
                    pos[u] = frames.len() as u32;
                    frames.push(Frame {
                        vertex: u,
                        cursor: graph.out_edges(u),
                        entry: e,
                    });
                }
                Step::Close(e, u) => {
                    let anchor = pos[u] as usize;
                    cycle.clear();
                    cycle.extend(frames[anchor + 1..].iter().map(|f| f.entry));
                    cycle.push(e);
                    found += 1;
                    let p = on_cycle(&cycle);
                    debug_assert!(p < cycle.len());
                    cut_edges.set(cycle[p]);
                    if p + 1 < cycle.len() {
                        // The cut edge entered frame anchor+1+p; unwind to
                        // its tail and let that frame's cursor resume.
                        while frames.len() > anchor + 1 + p {
                            let f = frames.pop().expect("nonempty frame stack");
                            color[f.vertex] = 0;
                        }
                    }
                    // Cutting the closing edge itself leaves the stack
                    // intact; the cursor is already past it.
                }
                Step::Retreat => {
                    let f = frames.pop().expect("nonempty frame stack");
                    color[f.vertex] = 2;
                }
            }
        }
    }
    found
}

/// Critical-cycle search: record every cycle found among edges whose
/// residual weight exceeds tolerance, cutting each cycle's
/// minimum-residual edge on discovery. Appends cycles to `out` and
/// returns how many were found.
///
/// A return of 0 certifies that the residual subgraph of the component is
/// acyclic — the pass degenerates to a plain full DFS.
pub fn critical_cycles<R: Fn(usize) -> f64>(
    graph: &RpGraph,
    labels: &[usize],
    comp: usize,
    comp_vertices: &[usize],
    residual: R,
    out: &mut CycleSet,
) -> usize {
    breaking_pass(
        graph,
        labels,
        comp,
        comp_vertices,
        |e| residual(e) > STRICT_TOL,
        |cycle| {
            out.push(cycle);
            let mut best = 0;
            for (i, &e) in cycle.iter().enumerate() {
                if residual(e) < residual(cycle[best]) {
                    best = i;
                }
            }
            best
        },
    )
}

/// Afriat's index of one component: the maximum over its cycles of the
/// minimum edge weight, computed by estimate-raising passes.
pub fn afriat_estimate(
    graph: &RpGraph,
    labels: &[usize],
    comp: usize,
    comp_vertices: &[usize],
) -> f64 {
    let est = Cell::new(0.0f64);
    loop {
        let found = breaking_pass(
            graph,
            labels,
            comp,
            comp_vertices,
            |e| {
                let w = graph.weight(e);
                w > STRICT_TOL && w > est.get()
            },
            |cycle| {
                let mut best = 0;
                for (i, &e) in cycle.iter().enumerate() {
                    if graph.weight(e) < graph.weight(cycle[best]) {
                        best = i;
                    }
                }
                // Edges already on the path may have sunk below an
                // estimate raised by an earlier cycle in this pass; the
                // estimate only ratchets upward.
                est.set(est.get().max(graph.weight(cycle[best])));
                best
            },
        );
        if found == 0 {
            return est.get();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scc::strongly_connected_components;
    use mrt_core::Observations;

    fn crossing_pair() -> RpGraph {
        let obs =
            Observations::new(2, 2, vec![2.0, 1.0, 1.0, 2.0], vec![2.0, 1.0, 1.0, 2.0]).unwrap();
        RpGraph::build(&obs)
    }

    #[test]
    fn test_cycle_set_slab_layout() {
        let mut set = CycleSet::new();
        set.push(&[3, 1, 4]);
        set.push(&[2, 7]);
        assert_eq!(set.len(), 2);
        let cycles: Vec<Vec<u32>> = set.iter().map(|c| c.to_vec()).collect();
        assert_eq!(cycles, vec![vec![3, 1, 4], vec![2, 7]]);

        let mut other = CycleSet::new();
        other.push(&[9]);
        set.extend_from(&other);
        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().last().unwrap(), &[9][..]);
    }

    #[test]
    fn test_two_cycle_scanner_finds_strict_pair() {
        let g = crossing_pair();
        let scc = strongly_connected_components(&g);
        let mut out = CycleSet::new();
        let n = two_cycles(&g, &scc.labels, 1, &[0, 1], &mut out);
        assert_eq!(n, 1);
        let cycle = out.iter().next().unwrap();
        assert_eq!(cycle.len(), 2);
    }

    #[test]
    fn test_two_cycle_scanner_skips_all_weak_pair() {
        let obs =
            Observations::new(2, 2, vec![1.0, 1.0, 1.0, 1.0], vec![2.0, 0.0, 0.0, 2.0]).unwrap();
        let g = RpGraph::build(&obs);
        let scc = strongly_connected_components(&g);
        assert_eq!(scc.count, 1);
        let mut out = CycleSet::new();
        assert_eq!(two_cycles(&g, &scc.labels, 1, &[0, 1], &mut out), 0);
    }

    #[test]
    fn test_has_cycle_respects_live_filter() {
        let g = crossing_pair();
        let scc = strongly_connected_components(&g);
        assert!(has_cycle(&g, &scc.labels, 1, &[0, 1], |_| true));
        // Killing either edge breaks the only cycle.
        assert!(!has_cycle(&g, &scc.labels, 1, &[0, 1], |e| e != 0));
    }

    #[test]
    fn test_critical_cycles_breaks_two_cycle() {
        let g = crossing_pair();
        let scc = strongly_connected_components(&g);
        let mut out = CycleSet::new();
        let n = critical_cycles(&g, &scc.labels, 1, &[0, 1], |e| g.weight(e), &mut out);
        assert_eq!(n, 1);
        assert_eq!(out.iter().next().unwrap().len(), 2);
        // With both edges already residual-free there is nothing to find.
        let mut out2 = CycleSet::new();
        assert_eq!(
            critical_cycles(&g, &scc.labels, 1, &[0, 1], |_| 0.0, &mut out2),
            0
        );
    }

    #[test]
    fn test_afriat_estimate_on_two_cycle() {
        let g = crossing_pair();
        let scc = strongly_connected_components(&g);
        let est = afriat_estimate(&g, &scc.labels, 1, &[0, 1]);
        assert!((est - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_afriat_estimate_ignores_vertices_off_the_cycle() {
        // Vertex 2 points into the 0↔1 cycle but nothing points back at
        // it, so it stays outside the component and the estimate is the
        // 2-cycle's common weight.
        let obs = Observations::new(
            2,
            3,
            vec![2.0, 1.0, 1.0, 2.0, 1.0, 1.0],
            vec![2.0, 1.0, 1.0, 2.0, 1.8, 1.8],
        )
        .unwrap();
        let g = RpGraph::build(&obs);
        let scc = strongly_connected_components(&g);
        assert_eq!(scc.count, 1);
        assert_eq!(scc.labels[2], 0);
        let comp: Vec<usize> = (0..3).filter(|&v| scc.labels[v] == 1).collect();
        let est = afriat_estimate(&g, &scc.labels, 1, &comp);
        assert!((est - 0.2).abs() < 1e-12);
    }
}
