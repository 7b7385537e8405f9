use super::{Allocator, Simulator, SlotArray};
use crate::error::Result;

/// Stores arrays but never computes; outputs stay zero.
#[derive(Debug, Clone)]
pub struct NoOpSimulator {
    slots: SlotArray,
}

impl NoOpSimulator {
    #[must_use]
    pub fn new(size: usize, state_size: usize, input_size: usize, output_size: usize) -> Self {
        Self {
            slots: SlotArray::new(size, state_size, input_size, output_size),
        }
    }
}

impl Simulator for NoOpSimulator {
    fn allocator(&mut self) -> &mut Allocator {
        &mut self.slots.allocator
    }

    fn size(&self) -> usize {
        self.slots.slots.len()
    }

    fn state_size(&self) -> usize {
        self.slots.state_size
    }

    fn input_size(&self) -> usize {
        self.slots.input_size
    }

    fn output_size(&self) -> usize {
        self.slots.output_size
    }

    fn get_state(&mut self, index: usize, state: &mut [i32]) -> Result<()> {
        self.slots.get_state(index, state)
    }

    fn set_state(&mut self, index: usize, state: &[i32]) -> Result<()> {
        self.slots.set_state(index, state)
    }

    fn set_input_map(&mut self, index: usize, map: &[i32]) -> Result<()> {
        self.slots.set_input_map(index, map)
    }

    fn set_input(&mut self, index: usize, input: &[i32]) -> Result<()> {
        self.slots.set_input(index, input)
    }

    fn set_output_map(&mut self, index: usize, map: &[i32]) -> Result<()> {
        self.slots.set_output_map(index, map)
    }

    fn get_output(&mut self, index: usize, output: &mut [i32]) -> Result<()> {
        self.slots.get_output(index, output)
    }

    fn update(&mut self) -> Result<()> {
        Ok(())
    }
}
