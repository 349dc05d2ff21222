//! MemPool is a fixed-region memory pool allocator.
//!
//! A [`Pool`] owns one contiguous byte region, requested from the kernel
//! once at open using:
//!
//! [`mmap`](https://man7.org/linux/man-pages/man2/mmap.2.html) on Unix
//! [`VirtualAlloc`](https://learn.microsoft.com/en-us/windows/win32/api/memoryapi/nf-memoryapi-virtualalloc)
//! on Windows.
//!
//! Sub-allocations are carved out of that region without ever going back
//! to the system heap. Internally the region is described by three
//! cooperating structures:
//!
//! ```text
//!  Region        +--------+------------+--------+-------------------+
//!  (the bytes)   | alloc  |    gap     | alloc  |        gap        |
//!                +--------+------------+--------+-------------------+
//!                    ^          ^          ^             ^
//!                    |          |          |             |
//!  Segment list     [A]  <->   [G]  <->   [A]    <->    [G]
//!  (address order)              |                        |
//!                               |                        |
//!  Gap index               (12, node)  ->  (19, node)
//!  (size order)
//! ```
//!
//! The segment list tiles the region exactly, in address order. The gap
//! index only knows about the gaps, sorted by size so that best-fit
//! placement is a single forward scan.
//!
//! The main optimizations which are implemented are:
//! - **Gap splitting**: an allocation takes the front of a gap and leaves
//!   the rest behind as a smaller gap
//! - **Gap coalescing**: releasing merges the freed segment with adjacent
//!   gaps, so two gaps are never neighbours
//!
//! Two placement policies are available, chosen per pool at open:
//! first-fit (first sufficient gap in address order) and best-fit
//! (smallest sufficient gap, lowest address on ties).
//!
//! The main structure is [`Pool`], you can follow the codebase from
//! there. [`PoolStore`] is a small registry for programs juggling several
//! pools at once.

mod arena;
mod error;
mod gaps;
mod kernel;
mod list;
mod pool;
mod region;
mod segment;
mod store;
mod utils;

pub use error::{AllocError, Result};
pub use pool::{Allocation, Policy, Pool, PoolStats, SegmentInfo};
pub use store::{PoolId, PoolStore};
