use std::ops::{Index, IndexMut};

/// Handle to a node stored in a [`List`]. Handles stay valid until the node
/// is removed; after that the slot may be reused by another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

/// Optional link to another node of the list.
pub(crate) type Link = Option<NodeId>;

pub(crate) struct Node<T> {
    /// Link to the next node of the list
    pub next: Link,
    /// Link to the previous node of the list
    pub prev: Link,
    /// Element of the node
    pub data: T,
}

enum Slot<T> {
    Occupied(Node<T>),
    Vacant { next_vacant: Option<usize> },
}

/// Doubly linked list whose nodes live in a slot table instead of being
/// individually allocated.
///
/// ```text
///   slots:  [ 0: Occupied ] [ 1: Vacant ] [ 2: Occupied ] [ 3: Occupied ]
///                 |                              ^   |           ^
///                 +------------------------------+   +-----------+
///                 head                                          tail
/// ```
///
/// Links are plain indices, so removing a node never leaves a dangling
/// pointer behind: the slot is marked vacant and threaded onto a chain of
/// reusable slots.
pub(crate) struct List<T> {
    slots: Vec<Slot<T>>,
    vacant: Option<usize>,
    head: Link,
    tail: Link,
    len: usize,
}

pub(crate) struct Iter<'a, T> {
    list: &'a List<T>,
    current: Link,
    remaining: usize,
}

impl<T> List<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: None,
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn first(&self) -> Link {
        self.head
    }

    #[inline]
    pub fn last(&self) -> Link {
        self.tail
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        match self.slots.get(id.0) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    /// Stores `node` in a free slot (or a new one) and returns its handle.
    /// The node is not linked into the list yet.
    fn store(&mut self, node: Node<T>) -> NodeId {
        match self.vacant {
            Some(index) => {
                if let Slot::Vacant { next_vacant } = &self.slots[index] {
                    self.vacant = *next_vacant;
                }
                self.slots[index] = Slot::Occupied(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Appends a new node at the end of the list.
    pub fn append(&mut self, data: T) -> NodeId {
        let node = self.store(Node {
            next: None,
            prev: self.tail,
            data,
        });

        match self.tail {
            Some(tail) => self[tail].next = Some(node),
            None => self.head = Some(node),
        }

        self.tail = Some(node);
        self.len += 1;

        node
    }

    /// Inserts a new node right after `at`, which must be part of the list.
    /// The former successor of `at` becomes the successor of the new node.
    pub fn insert_after(&mut self, at: NodeId, data: T) -> NodeId {
        let next = self[at].next;
        let node = self.store(Node {
            next,
            prev: Some(at),
            data,
        });

        self[at].next = Some(node);
        match next {
            Some(next) => self[next].prev = Some(node),
            None => self.tail = Some(node),
        }

        self.len += 1;

        node
    }

    /// Unlinks `node` from the list and returns its element. Returns `None`
    /// if the handle does not point to a live node.
    pub fn remove(&mut self, node: NodeId) -> Option<T> {
        let (prev, next) = {
            let node = self.get(node)?;
            (node.prev, node.next)
        };

        match prev {
            Some(prev) => self[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self[next].prev = prev,
            None => self.tail = prev,
        }

        let slot = std::mem::replace(
            &mut self.slots[node.0],
            Slot::Vacant {
                next_vacant: self.vacant,
            },
        );
        self.vacant = Some(node.0);
        self.len -= 1;

        match slot {
            Slot::Occupied(node) => Some(node.data),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
            remaining: self.len,
        }
    }
}

impl<T> Index<NodeId> for List<T> {
    type Output = Node<T>;

    /// Panics if `id` refers to a removed node.
    fn index(&self, id: NodeId) -> &Self::Output {
        match &self.slots[id.0] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("stale list node {id:?}"),
        }
    }
}

impl<T> IndexMut<NodeId> for List<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match &mut self.slots[id.0] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("stale list node {id:?}"),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.list;
        let node = &list[self.current?];

        self.current = node.next;
        self.remaining -= 1;

        Some(&node.data)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
