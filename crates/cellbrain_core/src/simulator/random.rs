use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{Allocator, Simulator, SlotArray};
use crate::error::Result;

/// Produces uniformly random outputs on every update.
///
/// The generator is seeded explicitly, so two simulators with the same seed
/// produce the same output sequence.
#[derive(Debug, Clone)]
pub struct RandomSimulator {
    slots: SlotArray,
    rng: ChaCha8Rng,
}

impl RandomSimulator {
    #[must_use]
    pub fn new(
        size: usize,
        state_size: usize,
        input_size: usize,
        output_size: usize,
        seed: u64,
    ) -> Self {
        Self {
            slots: SlotArray::new(size, state_size, input_size, output_size),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Simulator for RandomSimulator {
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
        for slot in &mut self.slots.slots {
            self.rng.fill(slot.output.as_mut_slice());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(seed: u64) -> Vec<i32> {
        let mut sim = RandomSimulator::new(2, 1, 1, 4, seed);
        sim.update().unwrap();
        let mut out = vec![0; 4];
        sim.get_output(1, &mut out).unwrap();
        out
    }

    #[test]
    fn test_same_seed_same_outputs() {
        assert_eq!(outputs(7), outputs(7));
        assert_ne!(outputs(7), outputs(8));
    }
}
