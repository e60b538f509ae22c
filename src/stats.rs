use std::fmt;

use crate::block::Block;

/// Snapshot of how the arena is currently partitioned.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub capacity: usize,
    pub allocated: usize,
    pub free: usize,
    pub blocks: usize,
    pub allocated_blocks: usize,
    pub free_blocks: usize,
    /// Size of the largest request that can currently succeed.
    pub largest_free: usize,
}

impl HeapStats {
    pub(crate) fn collect<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Self {
        blocks.into_iter().fold(Self::default(), |mut stats, block| {
            stats.capacity += block.size();
            stats.blocks += 1;

            if block.is_free() {
                stats.free += block.size();
                stats.free_blocks += 1;
                stats.largest_free = stats.largest_free.max(block.size());
            } else {
                stats.allocated += block.size();
                stats.allocated_blocks += 1;
            }

            stats
        })
    }

    /// Share of free memory that is not part of the largest free block,
    /// between 0.0 (one hole) and close to 1.0 (many small holes).
    pub fn fragmentation(&self) -> f64 {
        if self.free == 0 {
            return 0.0;
        }

        1.0 - self.largest_free as f64 / self.free as f64
    }
}

impl fmt::Display for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity={} allocated={} ({} blocks) free={} ({} blocks) largest_free={} fragmentation={:.2}",
            self.capacity,
            self.allocated,
            self.allocated_blocks,
            self.free,
            self.free_blocks,
            self.largest_free,
            self.fragmentation(),
        )
    }
}
