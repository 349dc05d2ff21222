use log::debug;

use crate::{list::NodeId, segment::Segment, utils::above_fill_factor};

/// Records the node arena starts with. Enough for a pool that never
/// fragments past twenty-odd live allocations.
pub(crate) const NODE_ARENA_INIT_CAPACITY: usize = 40;

const EXPAND_FACTOR: usize = 2;

/// Pre-sized backing storage for [`Segment`] records.
///
/// The allocator cannot go to the system heap every time a split needs a
/// fresh record, so records are carved out of this dense slab instead.
/// A slot is either live (`used == true`, part of the segment list) or
/// waiting to be handed out again.
///
/// Slots are addressed by [`NodeId`] everywhere: the segment list links,
/// the gap index entries and the handles given out to callers all hold
/// indices into this vector. Growing it can move the records in memory
/// without invalidating any of them.
#[derive(Debug)]
pub(crate) struct NodeArena {
    slots: Vec<Segment>,
    used: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::with_capacity(NODE_ARENA_INIT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(capacity, || Segment::UNUSED);
        Self { slots, used: 0 }
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Segment {
        &self.slots[id]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Segment {
        &mut self.slots[id]
    }

    /// Bounds-checked lookup for ids that come from outside the engine.
    #[inline]
    pub fn try_get(&self, id: NodeId) -> Option<&Segment> {
        self.slots.get(id)
    }

    /// Hands out the first unused slot, marked used.
    ///
    /// Returns `None` only when every slot is taken, which cannot happen
    /// if the caller ran [`NodeArena::maybe_grow`] first.
    pub fn acquire(&mut self) -> Option<NodeId> {
        let id = self.slots.iter().position(|slot| !slot.used)?;
        self.slots[id].used = true;
        self.used += 1;
        Some(id)
    }

    /// Returns a record to the arena. The slot is cleared so a stale
    /// handle pointing at it can be told apart from a live one.
    pub fn release(&mut self, id: NodeId) {
        self.slots[id] = Segment::UNUSED;
        self.used -= 1;
    }

    #[cfg(test)]
    pub fn used(&self) -> usize {
        self.used
    }

    /// Doubles the slab once more than three quarters of it is live.
    ///
    /// Called before any operation that might need a fresh record, so
    /// [`NodeArena::acquire`] never comes up empty mid-operation.
    pub fn maybe_grow(&mut self) {
        if above_fill_factor(self.used, self.slots.len()) {
            let new_capacity = self.slots.len() * EXPAND_FACTOR;
            self.slots.resize_with(new_capacity, || Segment::UNUSED);
            debug!("node arena grown to {new_capacity} records");
        }
    }
}
