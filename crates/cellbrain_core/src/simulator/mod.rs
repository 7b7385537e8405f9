//! Fixed-capacity arrays of automata.
//!
//! A [`Simulator`] owns `size()` slots. Every slot has a state, an input and
//! an output array whose lengths are fixed at construction. Slot lifetime is
//! tracked by the simulator's [`Allocator`]; the arrays themselves are never
//! cleared on release.
//!
//! # Maps
//!
//! The input map routes `input[i]` into `state[map[i] % state_size]` at the
//! start of every `update()`. Input map entries that were never set (or are
//! negative) are skipped. The output map fills `output[i]` from
//! `state[map[i] % state_size]` at the end of every `update()`; unset output
//! map entries read state index 0.

mod allocator;
mod bitwise;
mod composite;
mod factory;
mod interpreted;
mod noop;
mod random;

pub use allocator::Allocator;
pub use bitwise::BitwiseSimulator;
pub use composite::CompositeSimulator;
pub use factory::{SimulatorConfig, SimulatorFactory, SimulatorKind};
pub use interpreted::InterpretedSimulator;
pub use noop::NoOpSimulator;
pub use random::RandomSimulator;

use crate::error::{Result, SimulatorError};

/// An array of automata advanced together.
///
/// Callers drive a simulator from a single thread; implementations may use
/// parallelism inside [`Simulator::update`].
pub trait Simulator: Send {
    fn allocator(&mut self) -> &mut Allocator;

    /// Number of slots.
    fn size(&self) -> usize;

    fn state_size(&self) -> usize;

    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    /// Copies the slot's state into `state`, which must hold at least
    /// `state_size()` values.
    fn get_state(&mut self, index: usize, state: &mut [i32]) -> Result<()>;

    /// Overwrites the first `state.len()` state values of the slot.
    fn set_state(&mut self, index: usize, state: &[i32]) -> Result<()>;

    fn set_input_map(&mut self, index: usize, map: &[i32]) -> Result<()>;

    fn set_input(&mut self, index: usize, input: &[i32]) -> Result<()>;

    fn set_output_map(&mut self, index: usize, map: &[i32]) -> Result<()>;

    fn get_output(&mut self, index: usize, output: &mut [i32]) -> Result<()>;

    /// Advances every slot.
    fn update(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Arrays of one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SlotBuffers {
    pub state: Vec<i32>,
    pub input: Vec<i32>,
    pub output: Vec<i32>,
    pub input_map: Vec<i32>,
    pub output_map: Vec<i32>,
}

impl SlotBuffers {
    pub(crate) fn new(state_size: usize, input_size: usize, output_size: usize) -> Self {
        Self {
            state: vec![0; state_size],
            input: vec![0; input_size],
            output: vec![0; output_size],
            input_map: vec![-1; input_size],
            output_map: vec![0; output_size],
        }
    }

    /// Routes mapped inputs into the state.
    pub(crate) fn apply_input_map(&mut self) {
        let size = self.state.len();
        if size == 0 {
            return;
        }
        for (&target, &value) in self.input_map.iter().zip(&self.input) {
            if target >= 0 {
                self.state[target as usize % size] = value;
            }
        }
    }

    /// Copies mapped state values into the output.
    pub(crate) fn apply_output_map(&mut self) {
        let size = self.state.len();
        if size == 0 {
            return;
        }
        for (value, &source) in self.output.iter_mut().zip(&self.output_map) {
            *value = self.state[source.unsigned_abs() as usize % size];
        }
    }
}

/// Bookkeeping shared by simulators that keep their slots in memory.
#[derive(Debug, Clone)]
pub(crate) struct SlotArray {
    pub slots: Vec<SlotBuffers>,
    pub allocator: Allocator,
    pub state_size: usize,
    pub input_size: usize,
    pub output_size: usize,
}

impl SlotArray {
    pub(crate) fn new(size: usize, state_size: usize, input_size: usize, output_size: usize) -> Self {
        Self {
            slots: (0..size)
                .map(|_| SlotBuffers::new(state_size, input_size, output_size))
                .collect(),
            allocator: Allocator::new(size),
            state_size,
            input_size,
            output_size,
        }
    }

    pub(crate) fn slot(&self, index: usize) -> Result<&SlotBuffers> {
        let size = self.slots.len();
        self.slots
            .get(index)
            .ok_or(SimulatorError::SlotOutOfRange { index, size })
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Result<&mut SlotBuffers> {
        let size = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(SimulatorError::SlotOutOfRange { index, size })
    }

    pub(crate) fn get_state(&self, index: usize, state: &mut [i32]) -> Result<()> {
        let slot = self.slot(index)?;
        copy_out("state", &slot.state, state)
    }

    pub(crate) fn set_state(&mut self, index: usize, state: &[i32]) -> Result<()> {
        let slot = self.slot_mut(index)?;
        copy_in("state", state, &mut slot.state)
    }

    pub(crate) fn set_input(&mut self, index: usize, input: &[i32]) -> Result<()> {
        let slot = self.slot_mut(index)?;
        copy_in("input", input, &mut slot.input)
    }

    pub(crate) fn get_output(&self, index: usize, output: &mut [i32]) -> Result<()> {
        let slot = self.slot(index)?;
        copy_out("output", &slot.output, output)
    }

    pub(crate) fn set_input_map(&mut self, index: usize, map: &[i32]) -> Result<()> {
        let slot = self.slot_mut(index)?;
        copy_map("input", map, &mut slot.input_map)
    }

    pub(crate) fn set_output_map(&mut self, index: usize, map: &[i32]) -> Result<()> {
        let slot = self.slot_mut(index)?;
        copy_map("output", map, &mut slot.output_map)
    }
}

pub(crate) fn copy_out(what: &'static str, source: &[i32], dest: &mut [i32]) -> Result<()> {
    if dest.len() < source.len() {
        return Err(SimulatorError::buffer_too_small(what, source.len(), dest.len()));
    }
    dest[..source.len()].copy_from_slice(source);
    Ok(())
}

pub(crate) fn copy_in(what: &'static str, source: &[i32], dest: &mut [i32]) -> Result<()> {
    if source.len() > dest.len() {
        return Err(SimulatorError::buffer_too_small(what, source.len(), dest.len()));
    }
    dest[..source.len()].copy_from_slice(source);
    Ok(())
}

pub(crate) fn copy_map(what: &'static str, map: &[i32], dest: &mut [i32]) -> Result<()> {
    if map.len() > dest.len() {
        return Err(SimulatorError::MapTooLarge {
            what,
            len: map.len(),
            max: dest.len(),
        });
    }
    dest[..map.len()].copy_from_slice(map);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_map_skips_unset_entries() {
        let mut slot = SlotBuffers::new(4, 3, 1);
        slot.state = vec![9, 9, 9, 9];
        slot.input = vec![1, 2, 3];
        slot.input_map[0] = 6;
        slot.input_map[2] = 1;
        slot.apply_input_map();
        assert_eq!(slot.state, vec![9, 3, 1, 9]);
    }

    #[test]
    fn test_output_map_wraps_indices() {
        let mut slot = SlotBuffers::new(3, 1, 2);
        slot.state = vec![10, 20, 30];
        slot.output_map = vec![4, -2];
        slot.apply_output_map();
        assert_eq!(slot.output, vec![20, 30]);
    }

    #[test]
    fn test_copy_contracts() {
        let mut small = [0; 2];
        assert!(matches!(
            copy_out("state", &[1, 2, 3], &mut small),
            Err(SimulatorError::BufferTooSmall { needed: 3, actual: 2, .. })
        ));
        let mut dest = [0; 3];
        copy_in("input", &[7], &mut dest).unwrap();
        assert_eq!(dest, [7, 0, 0]);
        assert!(matches!(
            copy_map("output", &[0, 1, 2, 3], &mut dest),
            Err(SimulatorError::MapTooLarge { len: 4, max: 3, .. })
        ));
    }

    #[test]
    fn test_slot_out_of_range() {
        let array = SlotArray::new(2, 1, 1, 1);
        assert!(matches!(
            array.slot(2),
            Err(SimulatorError::SlotOutOfRange { index: 2, size: 2 })
        ));
    }
}
