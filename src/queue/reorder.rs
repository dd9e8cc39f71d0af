//! Sliding-window reassembly buffer
//!
//! Results for one listing page complete in whatever order the network
//! delivers them. The buffer accepts each one at its absolute position and
//! releases them strictly in ascending position order once a contiguous run
//! is available, much like a TCP receive window.

use std::collections::VecDeque;
use thiserror::Error;

/// Violations of the buffer's slot discipline
///
/// Every variant indicates a bug in position assignment and are never
/// expected during a correct crawl.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("position {position} was already released (base index is {base_index})")]
    AlreadyReleased { position: usize, base_index: usize },

    #[error("slot {position} is already filled")]
    DuplicateSlot { position: usize },

    #[error("position {position} is outside a page of {expected_count} items")]
    OutOfRange {
        position: usize,
        expected_count: usize,
    },
}

/// Per-page reorder buffer
///
/// `slots[i]` holds the item for absolute position `base_index + i`, or
/// `None` while that position is still outstanding.
#[derive(Debug, Clone)]
pub struct ReorderBuffer<T> {
    base_index: usize,
    slots: VecDeque<Option<T>>,
    expected_count: usize,
}

impl<T> ReorderBuffer<T> {
    /// Creates an empty buffer that expects `expected_count` items
    ///
    /// A buffer expecting zero items is drained and complete from the start.
    pub fn new(expected_count: usize) -> Self {
        Self {
            base_index: 0,
            slots: VecDeque::new(),
            expected_count,
        }
    }

    /// Stores `item` at absolute `position`
    ///
    /// # Errors
    ///
    /// * `BufferError::AlreadyReleased` - `position` is below the base index
    /// * `BufferError::DuplicateSlot` - the slot at `position` is already filled
    /// * `BufferError::OutOfRange` - `position` is not below the expected count
    pub fn insert(&mut self, position: usize, item: T) -> Result<(), BufferError> {
        if position >= self.expected_count {
            return Err(BufferError::OutOfRange {
                position,
                expected_count: self.expected_count,
            });
        }

        if position < self.base_index {
            return Err(BufferError::AlreadyReleased {
                position,
                base_index: self.base_index,
            });
        }

        let offset = position - self.base_index;
        if offset >= self.slots.len() {
            self.slots.resize_with(offset + 1, || None);
        }

        let slot = &mut self.slots[offset];
        if slot.is_some() {
            return Err(BufferError::DuplicateSlot { position });
        }
        *slot = Some(item);

        Ok(())
    }

    /// Releases the contiguous run of filled slots starting at the base index
    ///
    /// The returned iterator is lazy: each call to `next` advances the base
    /// index by one. Dropping it early leaves the remaining items in place,
    /// so `drain` can simply be called again after more insertions land.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { buffer: self }
    }

    /// Returns true once every expected item has been inserted and released
    pub fn is_drained_and_complete(&self) -> bool {
        self.base_index == self.expected_count
    }

    /// The smallest position that has not been released yet
    pub fn base_index(&self) -> usize {
        self.base_index
    }

    /// Total number of items this buffer expects
    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    /// Number of filled slots waiting behind a gap
    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Lazy iterator returned by [`ReorderBuffer::drain`]
pub struct Drain<'a, T> {
    buffer: &'a mut ReorderBuffer<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if !matches!(self.buffer.slots.front(), Some(Some(_))) {
            return None;
        }
        let item = self.buffer.slots.pop_front().flatten()?;
        self.buffer.base_index += 1;
        Some(item)
    }
}
