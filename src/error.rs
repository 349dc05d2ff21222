//! Error types for pool operations.

use thiserror::Error;

/// Everything that can go wrong while talking to a pool.
///
/// Every operation reports its failure through this enum instead of
/// panicking. A caller mistake (releasing a stale handle, requesting more
/// than any gap can hold) always leaves the pool in the exact state it was
/// in before the call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    /// The operating system refused to map the backing region.
    #[error("the operating system refused to map the requested memory")]
    OutOfMemory,

    /// No gap is large enough for the request. The pool is unchanged.
    #[error("no gap can hold {requested} bytes")]
    OutOfSpace {
        /// Size of the failed request.
        requested: usize,
    },

    /// Zero-size pools and allocations are not representable.
    #[error("size must be greater than zero")]
    InvalidSize,

    /// Close was refused because live allocations are still outstanding.
    #[error("pool still holds live allocations")]
    NotFreed,

    /// The handle does not name a live allocation of this pool. Either it
    /// was already released, or it belongs to a different pool.
    #[error("handle does not name a live allocation of this pool")]
    InvalidHandle,

    /// Internal bookkeeping disagreed with itself. This is a bug in the
    /// allocator, not in the caller; the operation was abandoned without
    /// touching the counters.
    #[error("allocator bookkeeping is corrupted")]
    Corrupted,
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, AllocError>;
