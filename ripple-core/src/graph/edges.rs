//! Dependency Edges
//!
//! An [`EdgeSet`] is one effect's view of the graph: the cells it read, in
//! the order it first read them, each stamped with the generation (run
//! number) that last read it.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;

use crate::reactive::{CellId, Source};

/// A dependency on one cell.
#[derive(Clone)]
pub struct Edge {
    source: Weak<dyn Source>,
    generation: u64,
}

impl Edge {
    /// The run that most recently read the cell.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The cell, if it is still alive.
    pub fn source(&self) -> Option<Arc<dyn Source>> {
        self.source.upgrade()
    }
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edge")
            .field("generation", &self.generation)
            .field("alive", &(self.source.strong_count() > 0))
            .finish()
    }
}

/// The cells one effect depends on.
///
/// Edges hold the cell weakly; the cell's subscription list is what keeps
/// the effect alive, never the other way round.
#[derive(Debug, Default)]
pub struct EdgeSet {
    edges: IndexMap<CellId, Edge>,
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read of `source` during run `generation`.
    ///
    /// Returns `true` if the cell was not in the set yet.
    pub fn record(&mut self, source: &Arc<dyn Source>, generation: u64) -> bool {
        match self.edges.get_mut(&source.id()) {
            Some(edge) => {
                edge.generation = edge.generation.max(generation);
                false
            }
            None => {
                self.edges.insert(
                    source.id(),
                    Edge {
                        source: Arc::downgrade(source),
                        generation,
                    },
                );
                true
            }
        }
    }

    /// Remove every edge last read before `generation`, returning the cells
    /// that are still alive so the caller can unsubscribe from them.
    pub fn prune(&mut self, generation: u64) -> Vec<Arc<dyn Source>> {
        let stale: Vec<Arc<dyn Source>> = self
            .edges
            .values()
            .filter(|edge| edge.generation() < generation)
            .filter_map(Edge::source)
            .collect();
        self.edges.retain(|_, edge| edge.generation() >= generation);
        stale
    }

    /// Remove every edge, returning the cells that are still alive.
    pub fn drain(&mut self) -> Vec<Arc<dyn Source>> {
        self.edges.drain(..).filter_map(|(_, edge)| edge.source()).collect()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, cell: CellId) -> Option<&Edge> {
        self.edges.get(&cell)
    }

    pub fn contains(&self, cell: CellId) -> bool {
        self.edges.contains_key(&cell)
    }

    /// Cell IDs in first-read order.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.edges.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::ObservableCell;

    fn source() -> Arc<dyn Source> {
        Arc::new(ObservableCell::new(0))
    }

    #[test]
    fn record_inserts_once_and_restamps() {
        let mut edges = EdgeSet::new();
        let a = source();

        assert!(edges.record(&a, 1));
        assert!(!edges.record(&a, 2));
        assert!(!edges.record(&a, 1));

        assert_eq!(edges.len(), 1);
        assert_eq!(edges.get(a.id()).map(Edge::generation), Some(2));
    }

    #[test]
    fn cells_keep_first_read_order() {
        let mut edges = EdgeSet::new();
        let (a, b, c) = (source(), source(), source());

        edges.record(&b, 1);
        edges.record(&a, 1);
        edges.record(&c, 1);
        edges.record(&b, 2);

        assert_eq!(edges.cells().collect::<Vec<_>>(), vec![b.id(), a.id(), c.id()]);
    }

    #[test]
    fn prune_removes_edges_not_read_this_generation() {
        let mut edges = EdgeSet::new();
        let (a, b) = (source(), source());

        edges.record(&a, 1);
        edges.record(&b, 1);
        edges.record(&a, 2);

        let stale = edges.prune(2);

        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id(), b.id());
        assert!(edges.contains(a.id()));
        assert!(!edges.contains(b.id()));
    }

    #[test]
    fn prune_skips_dropped_cells() {
        let mut edges = EdgeSet::new();
        let a = source();
        edges.record(&a, 1);
        drop(a);

        assert!(edges.prune(2).is_empty());
        assert!(edges.is_empty());
    }

    #[test]
    fn drain_empties_the_set() {
        let mut edges = EdgeSet::new();
        let (a, b) = (source(), source());
        edges.record(&a, 1);
        edges.record(&b, 3);

        let drained = edges.drain();

        assert_eq!(drained.len(), 2);
        assert!(edges.is_empty());
    }
}
