//! Fixed-capacity ring of move blocks.

use crate::error::AdmissionError;

use super::block::MoveBlock;

/// Look-ahead queue of up to `N` blocks.
///
/// Slots are pre-allocated; blocks are copied in on enqueue and out on
/// dequeue. Index 0 is always the head (oldest) block.
#[derive(Debug, Clone)]
pub struct MoveQueue<const N: usize> {
    slots: [MoveBlock; N],
    head: usize,
    len: usize,
}

impl<const N: usize> Default for MoveQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MoveQueue<N> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            slots: [MoveBlock::EMPTY; N],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    fn slot(&self, index: usize) -> usize {
        (self.head + index) % N
    }

    /// Append a block at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::NoBufferSpace`] if every slot is taken.
    pub fn enqueue(&mut self, block: MoveBlock) -> Result<(), AdmissionError> {
        if self.is_full() {
            return Err(AdmissionError::NoBufferSpace);
        }
        let slot = self.slot(self.len);
        self.slots[slot] = block;
        self.len += 1;
        Ok(())
    }

    /// Remove and return the head block.
    pub fn dequeue_head(&mut self) -> Option<MoveBlock> {
        if self.is_empty() {
            return None;
        }
        let block = self.slots[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(block)
    }

    /// Oldest block.
    #[inline]
    pub fn peek_head(&self) -> Option<&MoveBlock> {
        self.get(0)
    }

    /// Oldest block, mutable.
    #[inline]
    pub fn peek_head_mut(&mut self) -> Option<&mut MoveBlock> {
        self.get_mut(0)
    }

    /// Newest block.
    #[inline]
    pub fn peek_tail(&self) -> Option<&MoveBlock> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Block at position `index` from the head.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&MoveBlock> {
        if index < self.len {
            Some(&self.slots[self.slot(index)])
        } else {
            None
        }
    }

    /// Block at position `index` from the head, mutable.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut MoveBlock> {
        if index < self.len {
            let slot = self.slot(index);
            Some(&mut self.slots[slot])
        } else {
            None
        }
    }

    /// Blocks from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &MoveBlock> + '_ {
        (0..self.len).map(move |i| &self.slots[self.slot(i)])
    }

    /// Number of queued blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Total number of slots.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Free slots.
    #[inline]
    pub fn available(&self) -> usize {
        N - self.len
    }

    /// Whether no block is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether every slot is taken.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Drop every block.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}
