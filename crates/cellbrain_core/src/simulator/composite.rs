use tracing::{debug, warn};

use super::{Allocator, Simulator};
use crate::error::{Result, SimulatorError};

/// Presents several member simulators as one address space.
///
/// At construction the composite claims every free slot of every member,
/// taking one slot from each member in turn, so consecutive virtual indices
/// are spread across members. Array sizes are reported from the first
/// member.
pub struct CompositeSimulator {
    members: Vec<Box<dyn Simulator>>,
    /// Virtual index to `(member, physical index)`.
    mapping: Vec<(usize, usize)>,
    allocator: Allocator,
}

impl CompositeSimulator {
    pub fn new(mut members: Vec<Box<dyn Simulator>>) -> Result<Self> {
        if members.is_empty() {
            return Err(SimulatorError::EmptyComposite);
        }

        let mut mapping = Vec::new();
        let mut remaining: Vec<usize> = (0..members.len()).collect();
        while !remaining.is_empty() {
            let mut exhausted = Vec::new();
            for &member in &remaining {
                let allocator = members[member].allocator();
                if allocator.available_count() > 0 {
                    mapping.push((member, allocator.allocate()?));
                } else {
                    exhausted.push(member);
                }
            }
            remaining.retain(|m| !exhausted.contains(m));
        }

        debug!(
            members = members.len(),
            size = mapping.len(),
            "Created composite simulator"
        );
        let allocator = Allocator::new(mapping.len());
        Ok(Self {
            members,
            mapping,
            allocator,
        })
    }

    /// `(member, physical index)` behind a virtual index.
    pub fn resolve(&self, index: usize) -> Result<(usize, usize)> {
        self.mapping
            .get(index)
            .copied()
            .ok_or(SimulatorError::SlotOutOfRange {
                index,
                size: self.mapping.len(),
            })
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    fn member(&mut self, index: usize) -> Result<(&mut dyn Simulator, usize)> {
        let (member, physical) = self.resolve(index)?;
        Ok((self.members[member].as_mut(), physical))
    }
}

impl Simulator for CompositeSimulator {
    fn allocator(&mut self) -> &mut Allocator {
        &mut self.allocator
    }

    fn size(&self) -> usize {
        self.mapping.len()
    }

    fn state_size(&self) -> usize {
        self.members[0].state_size()
    }

    fn input_size(&self) -> usize {
        self.members[0].input_size()
    }

    fn output_size(&self) -> usize {
        self.members[0].output_size()
    }

    fn get_state(&mut self, index: usize, state: &mut [i32]) -> Result<()> {
        let (member, physical) = self.member(index)?;
        member.get_state(physical, state)
    }

    fn set_state(&mut self, index: usize, state: &[i32]) -> Result<()> {
        let (member, physical) = self.member(index)?;
        member.set_state(physical, state)
    }

    fn set_input_map(&mut self, index: usize, map: &[i32]) -> Result<()> {
        let (member, physical) = self.member(index)?;
        member.set_input_map(physical, map)
    }

    fn set_input(&mut self, index: usize, input: &[i32]) -> Result<()> {
        let (member, physical) = self.member(index)?;
        member.set_input(physical, input)
    }

    fn set_output_map(&mut self, index: usize, map: &[i32]) -> Result<()> {
        let (member, physical) = self.member(index)?;
        member.set_output_map(physical, map)
    }

    fn get_output(&mut self, index: usize, output: &mut [i32]) -> Result<()> {
        let (member, physical) = self.member(index)?;
        member.get_output(physical, output)
    }

    fn update(&mut self) -> Result<()> {
        for member in &mut self.members {
            member.update()?;
        }
        Ok(())
    }

    /// Closes every member, reporting all failures together.
    fn close(&mut self) -> Result<()> {
        let errors: Vec<SimulatorError> = self
            .members
            .iter_mut()
            .filter_map(|member| member.close().err())
            .collect();
        if errors.is_empty() {
            return Ok(());
        }
        warn!(failures = errors.len(), "Failed to close composite members");
        Err(SimulatorError::Close { errors })
    }
}
