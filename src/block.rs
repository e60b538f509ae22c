use std::fmt;

/// Location of a block inside the arena, expressed as a byte offset from
/// the start of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
    #[inline]
    pub const fn new(offset: usize) -> Self {
        Self(offset)
    }

    #[inline]
    pub const fn offset(self) -> usize {
        self.0
    }

    /// Address `bytes` past this one.
    #[inline]
    pub(crate) const fn add(self, bytes: usize) -> Self {
        Self(self.0 + bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockState {
    Free,
    Allocated,
}

impl BlockState {
    #[inline]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("free"),
            Self::Allocated => f.write_str("allocated"),
        }
    }
}

/// Descriptor of one partition of the arena.
///
/// Blocks never store user data themselves, they only describe a range of
/// the arena. The bytes live in [`crate::arena::Arena`]:
///
/// ```text
///  Block list:  [ 30, allocated ] -> [ 20, allocated ] -> [ 50, free ]
///                     |                     |                  |
///                     v                     v                  v
///  Arena:       +-------------------+--------------+----------------------+
///               0                  30             50                    100
/// ```
///
/// Blocks are kept in address order and always cover the arena without
/// gaps, see [`crate::blocks::BlockList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Size of the block in bytes. Never zero.
    pub(crate) size: usize,
    /// Offset of the first byte of the block.
    pub(crate) address: Address,
    /// Whether the block is handed out or available.
    pub(crate) state: BlockState,
}

impl Block {
    pub(crate) const fn free(address: Address, size: usize) -> Self {
        Self {
            size,
            address,
            state: BlockState::Free,
        }
    }

    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub const fn address(&self) -> Address {
        self.address
    }

    #[inline]
    pub const fn state(&self) -> BlockState {
        self.state
    }

    #[inline]
    pub const fn is_free(&self) -> bool {
        self.state.is_free()
    }

    /// Address one past the last byte of the block.
    #[inline]
    pub const fn end(&self) -> Address {
        self.address.add(self.size)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.size, self.state)
    }
}
