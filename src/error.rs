use thiserror::Error;

use crate::block::Address;

/// Errors that can occur while managing the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
    /// The manager was asked for an arena of zero bytes.
    #[error("invalid capacity (must be non-zero)")]
    InvalidCapacity,
    /// Zero-sized allocation request.
    #[error("invalid size (must be non-zero)")]
    InvalidSize,
    /// No free block is large enough for the request.
    #[error("out of memory: no free block of {requested} bytes (largest free block is {largest_free} bytes)")]
    OutOfMemory { requested: usize, largest_free: usize },
    /// The address is not the start of any block.
    #[error("invalid free: no block starts at {0}")]
    InvalidFree(Address),
    /// The block starting at the address is already free.
    #[error("double free of block at {0}")]
    DoubleFree(Address),
    /// The address does not start a live allocation.
    #[error("no allocated block starts at {0}")]
    NotAllocated(Address),
}

pub type Result<T> = core::result::Result<T, HeapError>;
