//! Bit-lane packing of several automata into one physical slot.
//!
//! Virtual automaton `v` lives in physical slot `v * b / 32` at bit offset
//! `(v * b) % 32` of every word, where `b` is the number of bits per
//! entity. Each virtual array has the same length as the physical one; word
//! `k` of a virtual array is the `b`-bit field of word `k` of the physical
//! array.

use tracing::debug;

use super::{Allocator, Simulator};
use crate::error::{Result, SimulatorError};

const WORD_BITS: u32 = i32::BITS;

/// Position of a virtual automaton inside the physical words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Lane {
    slot: usize,
    offset: u32,
    mask: u32,
}

impl Lane {
    fn new(index: usize, bits_per_entity: u32) -> Self {
        let bit = index * bits_per_entity as usize;
        Self {
            slot: bit / WORD_BITS as usize,
            offset: (bit % WORD_BITS as usize) as u32,
            mask: (1u32 << bits_per_entity) - 1,
        }
    }

    fn get(self, word: i32) -> i32 {
        ((word as u32 >> self.offset) & self.mask) as i32
    }

    fn set(self, word: i32, value: i32) -> i32 {
        let field = self.mask << self.offset;
        ((word as u32 & !field) | ((value as u32 & self.mask) << self.offset)) as i32
    }
}

/// Copy of one physical array for every physical slot.
#[derive(Debug, Clone)]
struct WordCache {
    words: Vec<Vec<i32>>,
    valid: Vec<bool>,
    dirty: Vec<bool>,
}

impl WordCache {
    fn new(slots: usize, len: usize, valid: bool) -> Self {
        Self {
            words: vec![vec![0; len]; slots],
            valid: vec![valid; slots],
            dirty: vec![false; slots],
        }
    }

    fn invalidate(&mut self) {
        self.valid.fill(false);
    }

    fn read(&self, lane: Lane, dest: &mut [i32]) {
        for (value, &word) in dest.iter_mut().zip(&self.words[lane.slot]) {
            *value = lane.get(word);
        }
    }

    fn write(&mut self, lane: Lane, source: &[i32]) {
        for (word, &value) in self.words[lane.slot].iter_mut().zip(source) {
            *word = lane.set(*word, value);
        }
        self.dirty[lane.slot] = true;
    }
}

/// Multiplies the capacity of a simulator by `32 / bits_per_entity`.
///
/// Values read back are the low `bits_per_entity` bits of what was written.
/// Input and output maps are per physical slot, so all virtual automata in
/// one slot share them.
pub struct BitwiseSimulator {
    inner: Box<dyn Simulator>,
    bits_per_entity: u32,
    size: usize,
    allocator: Allocator,
    state: WordCache,
    input: WordCache,
    output: WordCache,
}

impl BitwiseSimulator {
    pub fn new(inner: Box<dyn Simulator>, bits_per_entity: u32) -> Result<Self> {
        if bits_per_entity == 0
            || bits_per_entity >= WORD_BITS
            || WORD_BITS % bits_per_entity != 0
        {
            return Err(SimulatorError::InvalidBitsPerEntity(bits_per_entity));
        }
        let slots = inner.size();
        let size = slots * (WORD_BITS / bits_per_entity) as usize;
        debug!(physical = slots, virtual_size = size, bits_per_entity, "Created bitwise simulator");
        Ok(Self {
            state: WordCache::new(slots, inner.state_size(), false),
            input: WordCache::new(slots, inner.input_size(), true),
            output: WordCache::new(slots, inner.output_size(), false),
            inner,
            bits_per_entity,
            size,
            allocator: Allocator::new(size),
        })
    }

    #[must_use]
    pub fn bits_per_entity(&self) -> u32 {
        self.bits_per_entity
    }

    fn lane(&self, index: usize) -> Result<Lane> {
        if index >= self.size {
            return Err(SimulatorError::SlotOutOfRange {
                index,
                size: self.size,
            });
        }
        Ok(Lane::new(index, self.bits_per_entity))
    }

    fn load_state(&mut self, slot: usize) -> Result<()> {
        if !self.state.valid[slot] {
            self.inner.get_state(slot, &mut self.state.words[slot])?;
            self.state.valid[slot] = true;
        }
        Ok(())
    }

    fn load_output(&mut self, slot: usize) -> Result<()> {
        if !self.output.valid[slot] {
            self.inner.get_output(slot, &mut self.output.words[slot])?;
            self.output.valid[slot] = true;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for slot in 0..self.state.words.len() {
            if self.state.dirty[slot] {
                self.inner.set_state(slot, &self.state.words[slot])?;
                self.state.dirty[slot] = false;
            }
            if self.input.dirty[slot] {
                self.inner.set_input(slot, &self.input.words[slot])?;
                self.input.dirty[slot] = false;
            }
        }
        Ok(())
    }
}

fn check_len(what: &'static str, len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(SimulatorError::buffer_too_small(what, len, max));
    }
    Ok(())
}

impl Simulator for BitwiseSimulator {
    fn allocator(&mut self) -> &mut Allocator {
        &mut self.allocator
    }

    fn size(&self) -> usize {
        self.size
    }

    fn state_size(&self) -> usize {
        self.inner.state_size()
    }

    fn input_size(&self) -> usize {
        self.inner.input_size()
    }

    fn output_size(&self) -> usize {
        self.inner.output_size()
    }

    fn get_state(&mut self, index: usize, state: &mut [i32]) -> Result<()> {
        let lane = self.lane(index)?;
        let needed = self.inner.state_size();
        if state.len() < needed {
            return Err(SimulatorError::buffer_too_small("state", needed, state.len()));
        }
        self.load_state(lane.slot)?;
        self.state.read(lane, state);
        Ok(())
    }

    fn set_state(&mut self, index: usize, state: &[i32]) -> Result<()> {
        let lane = self.lane(index)?;
        check_len("state", state.len(), self.inner.state_size())?;
        self.load_state(lane.slot)?;
        self.state.write(lane, state);
        Ok(())
    }

    fn set_input_map(&mut self, index: usize, map: &[i32]) -> Result<()> {
        let lane = self.lane(index)?;
        let max = self.inner.input_size();
        if map.len() > max {
            return Err(SimulatorError::MapTooLarge {
                what: "input",
                len: map.len(),
                max,
            });
        }
        self.inner.set_input_map(lane.slot, map)
    }

    fn set_input(&mut self, index: usize, input: &[i32]) -> Result<()> {
        let lane = self.lane(index)?;
        check_len("input", input.len(), self.inner.input_size())?;
        self.input.write(lane, input);
        Ok(())
    }

    fn set_output_map(&mut self, index: usize, map: &[i32]) -> Result<()> {
        let lane = self.lane(index)?;
        self.inner.set_output_map(lane.slot, map)
    }

    fn get_output(&mut self, index: usize, output: &mut [i32]) -> Result<()> {
        let lane = self.lane(index)?;
        let needed = self.inner.output_size();
        if output.len() < needed {
            return Err(SimulatorError::buffer_too_small("output", needed, output.len()));
        }
        self.load_output(lane.slot)?;
        self.output.read(lane, output);
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        self.flush()?;
        self.inner.update()?;
        self.state.invalidate();
        self.output.invalidate();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}
