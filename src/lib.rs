//! # memmanager
//!
//! A first-fit heap manager over a single fixed-size arena. The manager
//! owns the arena bytes and an ordered list of blocks describing them;
//! allocation splits blocks, deallocation coalesces them.
//!
//! ```text
//!   capacity 100, after allocate(30), allocate(20):
//!
//!   +----------------+------------+--------------------------+
//!   | 30 (allocated) | 20 (alloc) |        50 (free)         |
//!   +----------------+------------+--------------------------+
//!   0               30           50                        100
//!
//!   deallocate(0x0):   [30, free] -> [20, allocated] -> [50, free]
//!   deallocate(0x1e):  [100, free]
//! ```
//!
//! ## Allocation
//!
//! [`MemoryManager::allocate`] walks the blocks from the lowest address and
//! takes the first free block large enough for the request. An exact fit is
//! handed out as is; a larger block is split into an allocated prefix and a
//! free remainder.
//!
//! ## Deallocation
//!
//! [`MemoryManager::deallocate`] frees the block starting at the given
//! address and immediately merges it with free neighbours, so two free
//! blocks are never adjacent.
//!
//! ## Usage
//!
//! ```rust
//! use memmanager::{BlockState, MemoryManager};
//!
//! let mut manager = MemoryManager::new(100).unwrap();
//!
//! let a = manager.allocate(30).unwrap();
//! let b = manager.allocate(20).unwrap();
//! assert_eq!(manager.to_string(), "[30, allocated] -> [20, allocated] -> [50, free]");
//!
//! manager.deallocate(a).unwrap();
//! manager.deallocate(b).unwrap();
//! assert_eq!(manager.render(), vec![(100, BlockState::Free)]);
//! ```
//!
//! The manager is single threaded. Wrap it in a `Mutex` to share it.

use std::fmt;

use tracing::{debug, warn};

mod arena;
mod block;
mod blocks;
mod error;
mod list;
mod stats;

pub use block::{Address, Block, BlockState};
pub use blocks::InvariantViolation;
pub use error::{HeapError, Result};
pub use stats::HeapStats;

use arena::Arena;
use blocks::BlockList;

/// First-fit manager of a fixed-size arena.
pub struct MemoryManager {
    arena: Arena,
    blocks: BlockList,
}

impl MemoryManager {
    /// Creates a manager over a zeroed arena of `capacity` bytes, starting
    /// as one free block.
    ///
    /// # Errors
    ///
    /// - `HeapError::InvalidCapacity` if `capacity` is zero
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(HeapError::InvalidCapacity);
        }

        debug!(capacity, "created memory manager");

        Ok(Self {
            arena: Arena::new(capacity),
            blocks: BlockList::new(capacity),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Pointer to the first byte of the arena. Block addresses are offsets
    /// from here.
    #[inline]
    pub fn base(&self) -> *const u8 {
        self.arena.base()
    }

    /// Allocates `size` bytes from the first free block that can hold them.
    ///
    /// # Errors
    ///
    /// - `HeapError::InvalidSize` if `size` is zero
    /// - `HeapError::OutOfMemory` if no single free block is large enough.
    ///   The blocks are left as they were.
    pub fn allocate(&mut self, size: usize) -> Result<Address> {
        if size == 0 {
            return Err(HeapError::InvalidSize);
        }

        let Some(node) = self.blocks.find_free_block(size) else {
            let largest_free = self.stats().largest_free;
            debug!(size, largest_free, "no free block fits");

            return Err(HeapError::OutOfMemory {
                requested: size,
                largest_free,
            });
        };

        let address = self.blocks.take(node, size);
        debug_assert_eq!(self.check_invariants(), Ok(()));

        Ok(address)
    }

    /// Frees the allocated block starting at `address` and merges it with
    /// any free neighbour.
    ///
    /// Rejected calls never modify the blocks, so the result can be ignored
    /// by callers that want a silent no-op.
    ///
    /// # Errors
    ///
    /// - `HeapError::InvalidFree` if no block starts at `address`
    /// - `HeapError::DoubleFree` if the block is already free
    pub fn deallocate(&mut self, address: Address) -> Result<()> {
        if let Err(err) = self.blocks.release(address) {
            warn!(%address, %err, "rejected deallocation");
            return Err(err);
        }

        debug_assert_eq!(self.check_invariants(), Ok(()));

        Ok(())
    }

    /// Block with the lowest address. Always present, since the arena is
    /// never empty.
    pub fn head(&self) -> Option<&Block> {
        self.blocks.head()
    }

    /// Iterates over the blocks in address order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter()
    }

    /// `(size, state)` of every block in address order.
    pub fn render(&self) -> Vec<(usize, BlockState)> {
        self.blocks().map(|b| (b.size(), b.state())).collect()
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats::collect(self.blocks())
    }

    /// Bytes of the live allocation starting at `address`.
    ///
    /// # Errors
    ///
    /// - `HeapError::NotAllocated` if no allocated block starts there
    pub fn bytes(&self, address: Address) -> Result<&[u8]> {
        let size = self.allocated_size(address)?;

        self.arena
            .slice(address, size)
            .ok_or(HeapError::NotAllocated(address))
    }

    /// Mutable bytes of the live allocation starting at `address`.
    ///
    /// # Errors
    ///
    /// - `HeapError::NotAllocated` if no allocated block starts there
    pub fn bytes_mut(&mut self, address: Address) -> Result<&mut [u8]> {
        let size = self.allocated_size(address)?;

        self.arena
            .slice_mut(address, size)
            .ok_or(HeapError::NotAllocated(address))
    }

    fn allocated_size(&self, address: Address) -> Result<usize> {
        if !self.arena.contains(address) {
            return Err(HeapError::NotAllocated(address));
        }

        self.blocks()
            .find(|b| b.address() == address && !b.is_free())
            .map(Block::size)
            .ok_or(HeapError::NotAllocated(address))
    }

    /// Checks that the blocks partition the arena exactly, in address
    /// order, with no adjacent free blocks left unmerged.
    pub fn check_invariants(&self) -> core::result::Result<(), InvariantViolation> {
        self.blocks.check(self.capacity())
    }
}

impl fmt::Display for MemoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{block}")?;
        }

        Ok(())
    }
}

impl fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryManager")
            .field("capacity", &self.capacity())
            .field("blocks", &self.blocks.len())
            .finish()
    }
}
