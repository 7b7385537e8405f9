use std::collections::BTreeSet;

use crate::error::{Result, SimulatorError};

/// Free list of simulator slot indices.
///
/// `allocate` always hands out the lowest free index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocator {
    capacity: usize,
    free: BTreeSet<usize>,
}

impl Allocator {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free: (0..capacity).collect(),
        }
    }

    pub fn allocate(&mut self) -> Result<usize> {
        self.free
            .pop_first()
            .ok_or(SimulatorError::AllocatorExhausted)
    }

    pub fn deallocate(&mut self, index: usize) -> Result<()> {
        if !self.is_allocated(index) {
            return Err(SimulatorError::NotAllocated(index));
        }
        self.free.insert(index);
        Ok(())
    }

    #[must_use]
    pub fn is_allocated(&self, index: usize) -> bool {
        index < self.capacity && !self.free.contains(&index)
    }

    #[must_use]
    pub fn available_count(&self) -> usize {
        self.free.len()
    }

    #[must_use]
    pub fn outstanding_count(&self) -> usize {
        self.capacity - self.free.len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
