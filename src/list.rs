use crate::{arena::NodeArena, segment::Segment};

/// Stable index of a [`Segment`] record in the [`NodeArena`].
pub(crate) type NodeId = usize;

/// Optional link to another record.
pub(crate) type Link = Option<NodeId>;

/// The address-ordered list of segments covering a region.
///
/// The records themselves live in the [`NodeArena`]; this struct only
/// remembers where the list starts. Because the links are arena indices
/// rather than pointers, every operation takes the arena as an explicit
/// argument instead of chasing memory addresses.
///
/// ```text
///    head
///     |
///    [A] <-> [G] <-> [A] <-> [A] <-> [G]        base ascending ->
/// ```
///
/// The head is always the segment at the very start of the region, and
/// walking `next` visits segments in strictly ascending base order.
#[derive(Debug)]
pub(crate) struct SegmentList {
    head: Link,
    len: usize,
}

impl SegmentList {
    /// A list holding the single segment `first`, which is expected to
    /// span the whole region.
    pub fn new(first: NodeId) -> Self {
        Self {
            head: Some(first),
            len: 1,
        }
    }

    /// Links `node` in immediately after `after`.
    ///
    /// This is the only way segments enter the list after creation: a
    /// split always places the residual gap right after the segment it
    /// was carved from, which keeps the list in base order without ever
    /// having to search for an insertion point.
    pub fn insert_after(&mut self, arena: &mut NodeArena, after: NodeId, node: NodeId) {
        let next = arena.get(after).next;

        arena.get_mut(node).prev = Some(after);
        arena.get_mut(node).next = next;

        if let Some(next) = next {
            arena.get_mut(next).prev = Some(node);
        }
        arena.get_mut(after).next = Some(node);

        self.len += 1;
    }

    /// Splices `node` out of the list and clears its links.
    ///
    /// The record itself is not returned to the arena here; the caller
    /// decides what happens to it (coalescing hands the record back,
    /// other callers may want to keep reading it first).
    pub fn remove(&mut self, arena: &mut NodeArena, node: NodeId) {
        let prev = arena.get(node).prev;
        let next = arena.get(node).next;

        match prev {
            Some(prev) => arena.get_mut(prev).next = next,
            None => self.head = next,
        }
        if let Some(next) = next {
            arena.get_mut(next).prev = prev;
        }

        arena.get_mut(node).prev = None;
        arena.get_mut(node).next = None;

        self.len -= 1;
    }

    /// Walks the list in base order.
    pub fn iter<'a>(&self, arena: &'a NodeArena) -> Iter<'a> {
        Iter {
            arena,
            current: self.head,
            remaining: self.len,
        }
    }
}

pub(crate) struct Iter<'a> {
    arena: &'a NodeArena,
    current: Link,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (NodeId, &'a Segment);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let segment = self.arena.get(id);

        self.current = segment.next;
        self.remaining -= 1;

        Some((id, segment))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three adjacent segments of 10 bytes each, in list order.
    fn three_segments() -> (NodeArena, SegmentList) {
        let mut arena = NodeArena::with_capacity(4);

        let a = arena.acquire().unwrap();
        let mut list = SegmentList::new(a);

        for step in 1..3 {
            let id = arena.acquire().unwrap();
            arena.get_mut(id).base = step * 10;
            list.insert_after(&mut arena, id - 1, id);
        }
        for id in 0..3 {
            arena.get_mut(id).size = 10;
        }

        (arena, list)
    }

    fn bases(list: &SegmentList, arena: &NodeArena) -> Vec<usize> {
        list.iter(arena).map(|(_, segment)| segment.base).collect()
    }

    #[test]
    fn insert_after_keeps_base_order() {
        let (arena, list) = three_segments();

        assert_eq!(list.len, 3);
        assert_eq!(bases(&list, &arena), vec![0, 10, 20]);

        // Links are symmetric.
        assert_eq!(arena.get(1).prev, Some(0));
        assert_eq!(arena.get(1).next, Some(2));
        assert_eq!(arena.get(2).next, None);
    }

    #[test]
    fn remove_middle_splices_neighbours() {
        let (mut arena, mut list) = three_segments();

        list.remove(&mut arena, 1);

        assert_eq!(bases(&list, &arena), vec![0, 20]);
        assert_eq!(arena.get(0).next, Some(2));
        assert_eq!(arena.get(2).prev, Some(0));
        assert_eq!(arena.get(1).prev, None);
        assert_eq!(arena.get(1).next, None);
    }

    #[test]
    fn remove_head_moves_the_head() {
        let (mut arena, mut list) = three_segments();

        list.remove(&mut arena, 0);

        assert_eq!(list.head, Some(1));
        assert_eq!(arena.get(1).prev, None);
        assert_eq!(bases(&list, &arena), vec![10, 20]);
    }

    #[test]
    fn remove_tail_keeps_next_none() {
        let (mut arena, mut list) = three_segments();

        list.remove(&mut arena, 2);

        assert_eq!(arena.get(1).next, None);
        assert_eq!(bases(&list, &arena), vec![0, 10]);
    }

    #[test]
    fn iter_reports_remaining() {
        let (arena, list) = three_segments();

        let mut iter = list.iter(&arena);
        assert_eq!(iter.size_hint(), (3, Some(3)));
        iter.next();
        assert_eq!(iter.size_hint(), (2, Some(2)));
    }
}
