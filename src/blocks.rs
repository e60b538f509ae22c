use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    block::{Address, Block, BlockState},
    error::{HeapError, Result},
    list::{Iter, Link, List, NodeId},
};

/// Ordered partition of the arena into [`Block`]s.
///
/// The list always satisfies the following:
///
/// - The first block starts at offset 0 and the sizes add up to the arena
///   capacity.
/// - Every block ends where its successor starts, so there are no gaps and
///   no overlaps, and list order is address order.
/// - No block has size zero.
/// - No two neighbours are both free. Freed blocks are coalesced on the
///   spot, never lazily.
///
/// ```text
///   +-------------+    +-------------+    +-------------+
///   |  Block      | -> |  Block      | -> |  Block      |
///   |  0..30      |    |  30..50     |    |  50..100    |
///   |  allocated  | <- |  allocated  | <- |  free       |
///   +-------------+    +-------------+    +-------------+
/// ```
pub(crate) struct BlockList {
    blocks: List<Block>,
}

/// A broken [`BlockList`] property, reported by [`BlockList::check`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("block list is empty")]
    Empty,
    #[error("first block starts at {0} instead of 0x0")]
    MisplacedHead(Address),
    #[error("block at {0} has size zero")]
    ZeroSize(Address),
    #[error("block at {address} is followed by {next}, expected {expected}")]
    NotContiguous {
        address: Address,
        expected: Address,
        next: Address,
    },
    #[error("links around block at {0} do not mirror each other")]
    BrokenLink(Address),
    #[error("free blocks at {0} and {1} were not coalesced")]
    Uncoalesced(Address, Address),
    #[error("blocks cover {total} bytes but the arena holds {capacity}")]
    SizeMismatch { total: usize, capacity: usize },
}

impl BlockList {
    /// Creates a list holding a single free block that spans `capacity`
    /// bytes.
    pub fn new(capacity: usize) -> Self {
        let mut blocks = List::new();
        blocks.append(Block::free(Address::new(0), capacity));

        Self { blocks }
    }

    /// Block with the lowest address.
    pub fn head(&self) -> Option<&Block> {
        self.blocks.first().map(|id| &self.blocks[id].data)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn iter(&self) -> Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Returns the first free block that can hold `size` bytes, scanning
    /// from the lowest address. Earlier blocks always win.
    pub fn find_free_block(&self, size: usize) -> Link {
        let mut current = self.blocks.first();

        while let Some(id) = current {
            let node = &self.blocks[id];

            if node.data.is_free() && node.data.size >= size {
                return Some(id);
            }

            trace!(
                address = %node.data.address,
                size = node.data.size,
                state = %node.data.state,
                "block does not fit"
            );
            current = node.next;
        }

        None
    }

    /// Returns the block starting exactly at `address`.
    pub fn find_by_address(&self, address: Address) -> Link {
        let mut current = self.blocks.first();

        while let Some(id) = current {
            let block = &self.blocks[id].data;

            if block.address == address {
                return Some(id);
            }
            // Ordered by address, nothing further down can match.
            if block.address > address {
                return None;
            }

            current = self.blocks[id].next;
        }

        None
    }

    /// Hands out `size` bytes from the free block `node`. The block is used
    /// whole when it fits exactly, otherwise it is split first.
    pub fn take(&mut self, node: NodeId, size: usize) -> Address {
        let block = &mut self.blocks[node].data;
        debug_assert!(block.is_free() && block.size >= size);

        if block.size == size {
            block.state = BlockState::Allocated;
            debug!(address = %block.address, size, "allocated whole block");
        } else {
            self.split(node, size);
        }

        self.blocks[node].data.address
    }

    /// Shrinks `node` to `size` bytes, marks it allocated and inserts the
    /// remainder right after it as a new free block.
    ///
    /// `size` must be strictly smaller than the block, so the remainder is
    /// never empty.
    fn split(&mut self, node: NodeId, size: usize) {
        let block = &mut self.blocks[node].data;
        debug_assert!(block.size > size);

        let remainder = Block::free(block.address.add(size), block.size - size);
        block.size = size;
        block.state = BlockState::Allocated;

        debug!(
            address = %block.address,
            size,
            remainder = remainder.size,
            "split block"
        );

        self.blocks.insert_after(node, remainder);
    }

    /// Marks the allocated block starting at `address` as free and
    /// coalesces it with its free neighbours. Returns the number of bytes
    /// released.
    ///
    /// The list is left untouched when `address` does not start a block or
    /// the block is already free.
    pub fn release(&mut self, address: Address) -> Result<usize> {
        let node = self
            .find_by_address(address)
            .ok_or(HeapError::InvalidFree(address))?;

        let block = &mut self.blocks[node].data;
        if block.is_free() {
            return Err(HeapError::DoubleFree(address));
        }

        block.state = BlockState::Free;
        let size = block.size;
        debug!(%address, size, "freed block");

        self.coalesce(node);

        Ok(size)
    }

    /// Merges the free block `node` with whichever neighbours are free.
    ///
    /// With both neighbours free, the block is first folded into its
    /// predecessor and the result then absorbs the successor.
    fn coalesce(&mut self, mut node: NodeId) {
        self.merge_with_prev(&mut node);
        self.merge_with_next(node);
    }

    /// Folds `node` into its predecessor if there is one and it is free.
    /// On success `node` is updated to point to the predecessor.
    fn merge_with_prev(&mut self, node: &mut NodeId) {
        let Some(prev) = self.blocks[*node].prev else {
            return;
        };

        if self.blocks[prev].data.is_free() {
            self.merge(prev);
            *node = prev;
        }
    }

    /// Absorbs the successor of `node` if there is one and it is free.
    fn merge_with_next(&mut self, node: NodeId) {
        let Some(next) = self.blocks[node].next else {
            return;
        };

        if self.blocks[next].data.is_free() {
            self.merge(node);
        }
    }

    /// Merges the direct successor of `node` into it: `node` grows by the
    /// successor's size and the successor is removed from the list. The
    /// state of `node` is not changed.
    ///
    /// `node` must have a successor. Debug builds panic otherwise; release
    /// builds leave the list untouched.
    fn merge(&mut self, node: NodeId) {
        debug_assert!(
            self.blocks[node].next.is_some(),
            "merge needs a successor block"
        );

        let Some(next) = self.blocks[node].next else {
            return;
        };
        let Some(absorbed) = self.blocks.remove(next) else {
            return;
        };

        let block = &mut self.blocks[node].data;
        block.size += absorbed.size;

        debug!(
            address = %block.address,
            absorbed = %absorbed.address,
            size = block.size,
            "merged blocks"
        );
    }

    /// Verifies every structural property of the list against an arena of
    /// `capacity` bytes.
    pub fn check(&self, capacity: usize) -> core::result::Result<(), InvariantViolation> {
        let first = self.blocks.first().ok_or(InvariantViolation::Empty)?;

        let head = &self.blocks[first];
        if head.data.address != Address::new(0) {
            return Err(InvariantViolation::MisplacedHead(head.data.address));
        }
        if head.prev.is_some() {
            return Err(InvariantViolation::BrokenLink(head.data.address));
        }

        let mut total = 0;
        let mut current = Some(first);

        while let Some(id) = current {
            let node = &self.blocks[id];
            let block = &node.data;

            if block.size == 0 {
                return Err(InvariantViolation::ZeroSize(block.address));
            }
            total += block.size;

            if let Some(next_id) = node.next {
                let next = &self.blocks[next_id];

                if next.prev != Some(id) {
                    return Err(InvariantViolation::BrokenLink(block.address));
                }
                if next.data.address != block.end() {
                    return Err(InvariantViolation::NotContiguous {
                        address: block.address,
                        expected: block.end(),
                        next: next.data.address,
                    });
                }
                if block.is_free() && next.data.is_free() {
                    return Err(InvariantViolation::Uncoalesced(
                        block.address,
                        next.data.address,
                    ));
                }
            } else if self.blocks.last() != Some(id) {
                return Err(InvariantViolation::BrokenLink(block.address));
            }

            current = node.next;
        }

        if total != capacity {
            return Err(InvariantViolation::SizeMismatch { total, capacity });
        }

        Ok(())
    }
}
