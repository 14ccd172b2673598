//! Level-ordered breadth-first worklists.
//!
//! The forward iterator drains levels in ascending order, the backward
//! iterator in descending order. Within a level the owner visits vertices in
//! parallel (a read-only compute phase) and commits results sequentially;
//! the level barrier guarantees that every admissible fanin (forward) or
//! fanout (backward) of a vertex has been finished before the vertex is
//! visited.
//!
//! `enqueue` is idempotent and `in_queue` observable. A vertex whose level
//! changes while queued is removed and re-enqueued by the owner; removal
//! just clears the membership flag and the stale bucket entry is skipped at
//! drain time.

use tempo_graph::{Graph, Level, VertexId};

/// Traversal direction of a worklist.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BfsDir {
    /// Ascending levels (arrival search).
    Fwd,
    /// Descending levels (required search).
    Bkwd,
}

/// A level-bucketed worklist.
#[derive(Debug)]
pub struct BfsIterator {
    dir: BfsDir,
    buckets: Vec<Vec<VertexId>>,
    in_queue: Vec<bool>,
    pending: usize,
}

impl BfsIterator {
    /// Creates an empty worklist for the given direction.
    pub fn new(dir: BfsDir) -> Self {
        Self {
            dir,
            buckets: Vec::new(),
            in_queue: Vec::new(),
            pending: 0,
        }
    }

    /// Returns the traversal direction.
    pub fn dir(&self) -> BfsDir {
        self.dir
    }

    /// Grows internal storage to cover the graph's current size.
    pub fn ensure_size(&mut self, graph: &Graph) {
        let vertex_count = graph.vertex_count();
        if self.in_queue.len() < vertex_count {
            self.in_queue.resize(vertex_count, false);
        }
        let max_level = graph
            .vertex_ids()
            .map(|v| graph.vertex(v).level)
            .max()
            .unwrap_or(0) as usize;
        if self.buckets.len() <= max_level {
            self.buckets.resize_with(max_level + 1, Vec::new);
        }
    }

    /// Enqueues `vertex` at its current level. Idempotent.
    pub fn enqueue(&mut self, graph: &Graph, vertex: VertexId) {
        self.ensure_size(graph);
        let idx = vertex.as_raw() as usize;
        if !self.in_queue[idx] {
            self.in_queue[idx] = true;
            self.pending += 1;
            let level = graph.vertex(vertex).level as usize;
            self.buckets[level].push(vertex);
        }
    }

    /// Returns `true` if `vertex` is queued.
    pub fn in_queue(&self, vertex: VertexId) -> bool {
        self.in_queue
            .get(vertex.as_raw() as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Removes `vertex` from the worklist if queued.
    pub fn remove(&mut self, vertex: VertexId) {
        let idx = vertex.as_raw() as usize;
        if idx < self.in_queue.len() && self.in_queue[idx] {
            self.in_queue[idx] = false;
            self.pending -= 1;
        }
    }

    /// Returns `true` if no vertices are queued.
    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Discards all pending work.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.in_queue.fill(false);
        self.pending = 0;
    }

    /// Takes the next non-empty level within the bound and returns its
    /// vertices, removing them from the worklist.
    ///
    /// Forward iteration visits levels `0..=bound` ascending; backward
    /// iteration visits levels `bound..` descending down to `bound`.
    /// Vertices removed since enqueue are skipped.
    pub fn take_next_level(&mut self, bound: Level) -> Option<(Level, Vec<VertexId>)> {
        if self.buckets.is_empty() || self.pending == 0 {
            return None;
        }
        let levels: Box<dyn Iterator<Item = usize>> = match self.dir {
            BfsDir::Fwd => Box::new(0..=(bound as usize).min(self.buckets.len().saturating_sub(1))),
            BfsDir::Bkwd => Box::new((bound as usize..self.buckets.len()).rev()),
        };
        for level in levels {
            if self.buckets[level].is_empty() {
                continue;
            }
            let bucket = std::mem::take(&mut self.buckets[level]);
            let mut vertices: Vec<VertexId> = bucket
                .into_iter()
                .filter(|v| self.in_queue[v.as_raw() as usize])
                .collect();
            if vertices.is_empty() {
                continue;
            }
            vertices.sort();
            vertices.dedup();
            for &v in &vertices {
                self.in_queue[v.as_raw() as usize] = false;
                self.pending -= 1;
            }
            return Some((level as Level, vertices));
        }
        None
    }
}

impl Default for BfsIterator {
    fn default() -> Self {
        Self::new(BfsDir::Fwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_common::{Interner, PerMinMax, TimingSense};
    use tempo_graph::{Levelize, Network, PortDirection, Role, TimingArcSet};

    fn chain_graph(n: usize) -> (Graph, Vec<VertexId>) {
        let interner = Interner::new();
        let mut net = Network::new();
        let mut g = Graph::new();
        let arcs = g.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::both(1.0),
            1,
        ));
        let vs: Vec<VertexId> = (0..n)
            .map(|i| {
                let p = net.add_pin(
                    interner.get_or_intern(&format!("v{i}")),
                    PortDirection::Input,
                );
                g.add_vertex(p)
            })
            .collect();
        for w in vs.windows(2) {
            g.add_edge(w[0], w[1], Role::Comb, arcs);
        }
        Levelize::new(&mut g);
        (g, vs)
    }

    #[test]
    fn enqueue_is_idempotent() {
        let (g, vs) = chain_graph(3);
        let mut bfs = BfsIterator::new(BfsDir::Fwd);
        bfs.enqueue(&g, vs[1]);
        bfs.enqueue(&g, vs[1]);
        assert!(bfs.in_queue(vs[1]));
        let (level, vertices) = bfs.take_next_level(10).unwrap();
        assert_eq!(level, 1);
        assert_eq!(vertices, vec![vs[1]]);
        assert!(bfs.is_empty());
    }

    #[test]
    fn forward_drains_ascending() {
        let (g, vs) = chain_graph(3);
        let mut bfs = BfsIterator::new(BfsDir::Fwd);
        bfs.enqueue(&g, vs[2]);
        bfs.enqueue(&g, vs[0]);
        let (l0, v0) = bfs.take_next_level(10).unwrap();
        assert_eq!((l0, v0), (0, vec![vs[0]]));
        let (l2, v2) = bfs.take_next_level(10).unwrap();
        assert_eq!((l2, v2), (2, vec![vs[2]]));
        assert!(bfs.take_next_level(10).is_none());
    }

    #[test]
    fn backward_drains_descending() {
        let (g, vs) = chain_graph(3);
        let mut bfs = BfsIterator::new(BfsDir::Bkwd);
        bfs.enqueue(&g, vs[0]);
        bfs.enqueue(&g, vs[2]);
        let (l2, _) = bfs.take_next_level(0).unwrap();
        assert_eq!(l2, 2);
        let (l0, _) = bfs.take_next_level(0).unwrap();
        assert_eq!(l0, 0);
    }

    #[test]
    fn level_bound_respected() {
        let (g, vs) = chain_graph(4);
        let mut bfs = BfsIterator::new(BfsDir::Fwd);
        bfs.enqueue(&g, vs[1]);
        bfs.enqueue(&g, vs[3]);
        let (l1, _) = bfs.take_next_level(2).unwrap();
        assert_eq!(l1, 1);
        // vs[3] is at level 3, beyond the bound.
        assert!(bfs.take_next_level(2).is_none());
        assert!(!bfs.is_empty());
        let (l3, _) = bfs.take_next_level(3).unwrap();
        assert_eq!(l3, 3);
    }

    #[test]
    fn remove_skips_stale_entries() {
        let (g, vs) = chain_graph(3);
        let mut bfs = BfsIterator::new(BfsDir::Fwd);
        bfs.enqueue(&g, vs[1]);
        bfs.remove(vs[1]);
        assert!(!bfs.in_queue(vs[1]));
        assert!(bfs.is_empty());
        assert!(bfs.take_next_level(10).is_none());
    }

    #[test]
    fn clear_discards_pending() {
        let (g, vs) = chain_graph(3);
        let mut bfs = BfsIterator::new(BfsDir::Fwd);
        bfs.enqueue(&g, vs[0]);
        bfs.enqueue(&g, vs[2]);
        bfs.clear();
        assert!(bfs.is_empty());
        assert!(bfs.take_next_level(10).is_none());
    }
}
