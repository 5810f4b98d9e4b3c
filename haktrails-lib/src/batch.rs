//! Batch accumulation for the submit command.

use crate::types::WorkItem;

/// Ordered buffer of items waiting to be submitted together.
///
/// Each submit worker owns its own buffer, so with more than one worker the
/// batches are cut from each worker's share of the input. The global batch
/// size is therefore only approximate when concurrency is above one: three
/// workers with `batch_size = 100` may send three partial batches at the
/// end of the input instead of one.
#[derive(Debug)]
pub struct BatchBuffer {
    items: Vec<WorkItem>,
    capacity: usize,
}

impl BatchBuffer {
    /// Create a buffer flushing every `capacity` items. A zero capacity is
    /// treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Vec::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append an item; returns the full batch when the buffer reaches its
    /// capacity, leaving the buffer empty.
    pub fn push(&mut self, item: WorkItem) -> Option<Vec<WorkItem>> {
        self.items.push(item);
        if self.items.len() >= self.capacity {
            Some(std::mem::take(&mut self.items))
        } else {
            None
        }
    }

    /// Drain whatever is left at end of input. Never returns an empty batch.
    pub fn finish(&mut self) -> Option<Vec<WorkItem>> {
        if self.items.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.items))
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
