use crate::block::Address;

/// Fixed-size byte buffer managed by a [`crate::MemoryManager`].
///
/// The arena is allocated once, zero-filled, and never resized. It knows
/// nothing about blocks; the block list decides which ranges are live.
pub(crate) struct Arena {
    bytes: Box<[u8]>,
}

impl Arena {
    /// Creates an arena of `capacity` bytes. Callers reject zero before
    /// getting here.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Pointer to the first byte of the arena.
    #[inline]
    pub fn base(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Whether `address` lies inside `[0, capacity)`.
    #[inline]
    pub fn contains(&self, address: Address) -> bool {
        address.offset() < self.capacity()
    }

    /// Bytes in `[address, address + len)`, or `None` if the range leaves
    /// the arena.
    pub fn slice(&self, address: Address, len: usize) -> Option<&[u8]> {
        let start = address.offset();
        self.bytes.get(start..start.checked_add(len)?)
    }

    pub fn slice_mut(&mut self, address: Address, len: usize) -> Option<&mut [u8]> {
        let start = address.offset();
        self.bytes.get_mut(start..start.checked_add(len)?)
    }
}
