use crate::list::Link;

/// One segment of a pool's region.
///
/// Segments tile the region exactly: every byte of the region belongs to
/// exactly one segment, each segment ends where the next one begins, and a
/// segment is either a live allocation or a gap.
///
/// ```text
///               base     base + size
///                 |          |
/// +---------------+----------+--------------------+
/// |    . . .      | Segment  |       . . .        |   Region
/// +---------------+----------+--------------------+
/// ```
///
/// Records live in the [`NodeArena`] and reference each other by arena
/// index, never by pointer. Growing the arena moves the backing storage,
/// but an index keeps naming the same record, so the links (and the
/// handles given out to callers) stay valid.
///
/// [`NodeArena`]: crate::arena::NodeArena
#[derive(Debug, Clone)]
pub(crate) struct Segment {
    /// Offset of the first byte, from the start of the region.
    pub base: usize,
    /// Length in bytes. Always greater than zero while the record is live.
    pub size: usize,
    /// `true` for a live allocation, `false` for a gap.
    pub allocated: bool,
    /// `true` while the record is part of the segment list. A record with
    /// `used == false` is a free arena slot waiting to be handed out again.
    pub used: bool,
    /// Neighbour with the next lower base, if any.
    pub prev: Link,
    /// Neighbour with the next higher base, if any.
    pub next: Link,
}

impl Segment {
    /// A cleared, unused record. Arena slots start out like this and are
    /// reset to it when a segment is spliced out of the list.
    pub(crate) const UNUSED: Segment = Segment {
        base: 0,
        size: 0,
        allocated: false,
        used: false,
        prev: None,
        next: None,
    };
}
