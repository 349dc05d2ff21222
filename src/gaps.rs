use log::debug;

use crate::{arena::NodeArena, list::NodeId, utils::above_fill_factor};

/// Entries the gap index starts with. Grown alongside the node arena.
pub(crate) const GAP_INDEX_INIT_CAPACITY: usize = 40;

const EXPAND_FACTOR: usize = 2;

/// One gap known to the index: its size, and the record it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GapEntry {
    pub size: usize,
    pub node: NodeId,
}

/// Secondary index over the gap segments of a pool.
///
/// This list only stores `(size, node)` pairs for the segments that are
/// currently gaps. We don't need anything else here: the segment list
/// already knows where every gap sits, this index exists so best-fit can
/// find the smallest sufficient gap without walking the whole region.
///
/// The entries are kept sorted by size ascending and, within one size, by
/// the referenced segment's base ascending. That ordering gives us two
/// things at once:
///
/// - best-fit is "first entry at least as large as the request", and
/// - ties land on the lowest address, so fragmentation doesn't drift
///   towards the high end of the region.
///
/// The index stays small in practice (a pool can't have more gaps than
/// live allocations plus one), so a sorted vector with linear insertion
/// beats a tree here.
#[derive(Debug)]
pub(crate) struct GapIndex {
    entries: Vec<GapEntry>,
}

impl GapIndex {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(GAP_INDEX_INIT_CAPACITY),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records `node` as a gap of `size` bytes.
    ///
    /// The entry is appended and then bubbled up towards the front until
    /// the (size, base) order holds again. The arena is only consulted to
    /// read bases for the tie-break.
    pub fn insert(&mut self, arena: &NodeArena, size: usize, node: NodeId) {
        self.maybe_grow();
        self.entries.push(GapEntry { size, node });

        let mut at = self.entries.len() - 1;
        while at > 0 {
            let entry = self.entries[at];
            let before = self.entries[at - 1];

            let smaller = entry.size < before.size
                || (entry.size == before.size
                    && arena.get(entry.node).base < arena.get(before.node).base);
            if !smaller {
                break;
            }

            self.entries.swap(at, at - 1);
            at -= 1;
        }
    }

    /// Drops the entry referencing `node`, preserving the order of the
    /// rest. The shift stops at the last live entry.
    ///
    /// Returns `None` when no entry references `node`; the caller treats
    /// that as corruption, since every gap segment must be indexed.
    pub fn remove(&mut self, node: NodeId) -> Option<GapEntry> {
        let at = self.entries.iter().position(|entry| entry.node == node)?;
        Some(self.entries.remove(at))
    }

    /// Whether `node` has an entry in the index.
    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.iter().any(|entry| entry.node == node)
    }

    /// The smallest gap that can hold `size` bytes; lowest base on ties.
    pub fn best_fit(&self, size: usize) -> Option<NodeId> {
        self.entries
            .iter()
            .find(|entry| entry.size >= size)
            .map(|entry| entry.node)
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[GapEntry] {
        &self.entries
    }

    fn maybe_grow(&mut self) {
        if above_fill_factor(self.entries.len(), self.entries.capacity()) {
            let target = self.entries.capacity() * EXPAND_FACTOR;
            self.entries.reserve_exact(target - self.entries.len());
            debug!("gap index grown to {} entries", self.entries.capacity());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Arena with one gap record per `(base, size)` pair, plus a matching
    /// index built by inserting them in the given order.
    fn indexed(gaps: &[(usize, usize)]) -> (NodeArena, GapIndex) {
        let mut arena = NodeArena::with_capacity(gaps.len().max(1));
        let mut index = GapIndex::new();

        for &(base, size) in gaps {
            let id = arena.acquire().unwrap();
            arena.get_mut(id).base = base;
            arena.get_mut(id).size = size;
            index.insert(&arena, size, id);
        }

        (arena, index)
    }

    fn sizes(index: &GapIndex) -> Vec<usize> {
        index.entries().iter().map(|entry| entry.size).collect()
    }

    #[test]
    fn insert_keeps_sizes_ascending() {
        let (_, index) = indexed(&[(0, 50), (50, 10), (60, 30)]);
        assert_eq!(sizes(&index), vec![10, 30, 50]);
    }

    #[test]
    fn equal_sizes_order_by_base() {
        let (arena, index) = indexed(&[(100, 20), (0, 20), (50, 20)]);

        let bases: Vec<usize> = index
            .entries()
            .iter()
            .map(|entry| arena.get(entry.node).base)
            .collect();
        assert_eq!(bases, vec![0, 50, 100]);
    }

    #[test]
    fn best_fit_picks_smallest_sufficient() {
        let (_, index) = indexed(&[(0, 10), (10, 40), (50, 80)]);

        // node ids follow insertion order: 0 -> 10B, 1 -> 40B, 2 -> 80B
        assert_eq!(index.best_fit(5), Some(0));
        assert_eq!(index.best_fit(11), Some(1));
        assert_eq!(index.best_fit(40), Some(1));
        assert_eq!(index.best_fit(81), None);
    }

    #[test]
    fn remove_last_entry_is_in_bounds() {
        let (_, mut index) = indexed(&[(0, 10), (10, 20)]);

        // node 1 holds the 20-byte gap, sorted into the final slot.
        let entry = index.remove(1).unwrap();
        assert_eq!(entry.size, 20);
        assert_eq!(index.len(), 1);
        assert_eq!(index.remove(1), None);
    }

    #[test]
    fn contains_tracks_membership() {
        let (_, mut index) = indexed(&[(0, 10), (10, 20)]);

        assert!(index.contains(0));
        assert!(index.contains(1));
        assert!(!index.contains(7));

        index.remove(0).unwrap();
        assert!(!index.contains(0));
        assert!(index.contains(1));
    }

    #[test]
    fn remove_preserves_relative_order() {
        let (_, mut index) = indexed(&[(0, 10), (10, 20), (30, 30), (60, 40)]);

        index.remove(1).unwrap();
        assert_eq!(sizes(&index), vec![10, 30, 40]);
    }
}
