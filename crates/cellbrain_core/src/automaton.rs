//! Per-entity view of one automaton slot.
//!
//! A [`SimulatorCellularAutomaton`] owns a local copy of its slot's state
//! and addresses it as a grid of cells: the automaton is
//! `height * lu_height` cells tall and `width * lu_width` cells wide, each
//! logical unit tile repeating the model's cell matrix.
//!
//! # Maps
//!
//! Before the first tick, callers register which cell outputs travel
//! through the slot's narrow input and output arrays. The maps are handed
//! to the simulator and frozen on the first call to
//! [`SimulatorCellularAutomaton::update_inputs`],
//! [`SimulatorCellularAutomaton::update`] or
//! [`SimulatorCellularAutomaton::refresh_outputs`].

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ModelError, Result, SimulatorError};
use crate::model::{CellInfo, Model};
use crate::simulator::Simulator;

/// A simulator shared by the façades bound to its slots.
pub type SharedSimulator = Rc<RefCell<Box<dyn Simulator>>>;

/// Wraps a simulator for sharing between façades.
#[must_use]
pub fn share(simulator: Box<dyn Simulator>) -> SharedSimulator {
    Rc::new(RefCell::new(simulator))
}

pub struct SimulatorCellularAutomaton {
    simulator: SharedSimulator,
    model: Arc<Model>,
    slot: usize,
    state: Vec<i32>,
    input: Vec<i32>,
    output: Vec<i32>,
    input_map: Vec<usize>,
    output_map: Vec<usize>,
    frozen: bool,
    released: bool,
}

impl SimulatorCellularAutomaton {
    /// Allocates a slot of `simulator` for an automaton running `model`.
    pub fn new(simulator: SharedSimulator, model: Arc<Model>) -> Result<Self> {
        let slot = simulator.borrow_mut().allocator().allocate()?;
        match Self::with_slot(Rc::clone(&simulator), model, slot) {
            Ok(automaton) => Ok(automaton),
            Err(err) => {
                simulator.borrow_mut().allocator().deallocate(slot)?;
                Err(err)
            }
        }
    }

    /// Binds an already allocated slot.
    pub fn with_slot(simulator: SharedSimulator, model: Arc<Model>, slot: usize) -> Result<Self> {
        let (size, state_size, input_size, output_size) = {
            let sim = simulator.borrow();
            (sim.size(), sim.state_size(), sim.input_size(), sim.output_size())
        };
        if slot >= size {
            return Err(SimulatorError::SlotOutOfRange { index: slot, size });
        }
        if state_size < model.state_size() {
            return Err(SimulatorError::buffer_too_small(
                "state",
                model.state_size(),
                state_size,
            ));
        }
        debug!(slot, state_size, "Bound automaton to slot");
        Ok(Self {
            simulator,
            model,
            slot,
            state: vec![0; state_size],
            input: vec![0; input_size],
            output: vec![0; output_size],
            input_map: Vec::new(),
            output_map: Vec::new(),
            frozen: false,
            released: false,
        })
    }

    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Width in cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.model.width() * self.model.logical_unit().width
    }

    /// Height in cells.
    #[must_use]
    pub fn height(&self) -> usize {
        self.model.height() * self.model.logical_unit().height
    }

    pub fn cell(&self, row: usize, col: usize) -> Result<CellView<'_>> {
        let (info, lu_index) = self.locate(row, col)?;
        Ok(CellView {
            info,
            lu_index,
            automaton: self,
        })
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Result<CellViewMut<'_>> {
        let (info, lu_index) = self.locate(row, col)?;
        let cell = info.row * self.model.logical_unit().width + info.col;
        Ok(CellViewMut {
            model: Arc::clone(&self.model),
            cell,
            lu_index,
            state: &mut self.state,
        })
    }

    fn locate(&self, row: usize, col: usize) -> Result<(&CellInfo, usize)> {
        let (height, width) = (self.height(), self.width());
        let out_of_range = SimulatorError::CellOutOfRange {
            row,
            col,
            height,
            width,
        };
        if row >= height || col >= width {
            return Err(out_of_range);
        }
        let lu = self.model.logical_unit();
        let lu_index = (row / lu.height) * self.model.width() + col / lu.width;
        let info = lu
            .cell_at(row % lu.height, col % lu.width)
            .ok_or(out_of_range)?;
        Ok((info, lu_index))
    }

    /// Routes output `output` of the cell at `(row, col)` through the
    /// slot's input array. Returns the input position.
    pub fn add_output_to_input_map(&mut self, row: usize, col: usize, output: usize) -> Result<usize> {
        self.ensure_unfrozen("input")?;
        let index = self.cell(row, col)?.output_state_index(output)?;
        if self.input_map.len() >= self.input.len() {
            return Err(SimulatorError::MapTooLarge {
                what: "input",
                len: self.input_map.len() + 1,
                max: self.input.len(),
            });
        }
        self.input_map.push(index);
        Ok(self.input_map.len() - 1)
    }

    /// Routes output `output` of the cell at `(row, col)` through the
    /// slot's output array. Returns the output position.
    pub fn add_output_to_output_map(
        &mut self,
        row: usize,
        col: usize,
        output: usize,
    ) -> Result<usize> {
        self.ensure_unfrozen("output")?;
        let index = self.cell(row, col)?.output_state_index(output)?;
        if self.output_map.len() >= self.output.len() {
            return Err(SimulatorError::MapTooLarge {
                what: "output",
                len: self.output_map.len() + 1,
                max: self.output.len(),
            });
        }
        self.output_map.push(index);
        Ok(self.output_map.len() - 1)
    }

    fn ensure_unfrozen(&self, what: &'static str) -> Result<()> {
        if self.frozen {
            Err(SimulatorError::MapFrozen(what))
        } else {
            Ok(())
        }
    }

    fn freeze(&mut self) -> Result<()> {
        if self.frozen {
            return Ok(());
        }
        let input_map: Vec<i32> = self.input_map.iter().map(|&i| i as i32).collect();
        let output_map: Vec<i32> = self.output_map.iter().map(|&i| i as i32).collect();
        let mut sim = self.simulator.borrow_mut();
        sim.set_input_map(self.slot, &input_map)?;
        sim.set_output_map(self.slot, &output_map)?;
        self.frozen = true;
        debug!(
            slot = self.slot,
            inputs = input_map.len(),
            outputs = output_map.len(),
            "Froze automaton maps"
        );
        Ok(())
    }

    /// Pushes the input-mapped state values into the slot's input array.
    pub fn update_inputs(&mut self) -> Result<()> {
        self.freeze()?;
        for (value, &index) in self.input.iter_mut().zip(&self.input_map) {
            *value = self.state[index];
        }
        self.simulator.borrow_mut().set_input(self.slot, &self.input)
    }

    /// Copies the local state into the slot.
    pub fn push_state(&mut self) -> Result<()> {
        self.freeze()?;
        self.simulator.borrow_mut().set_state(self.slot, &self.state)
    }

    /// Replaces the local state with the slot's state.
    pub fn pull_state(&mut self) -> Result<()> {
        self.simulator
            .borrow_mut()
            .get_state(self.slot, &mut self.state)
    }

    /// Pushes the local state, advances the simulator and pulls the result.
    ///
    /// This advances every slot of the shared simulator; drivers running
    /// many automata call [`Self::push_state`] and [`Self::pull_state`]
    /// around a single simulator update instead.
    pub fn update(&mut self) -> Result<()> {
        self.push_state()?;
        self.simulator.borrow_mut().update()?;
        self.pull_state()
    }

    /// Pulls only the output-mapped values back into the local state.
    pub fn refresh_outputs(&mut self) -> Result<()> {
        self.freeze()?;
        self.simulator
            .borrow_mut()
            .get_output(self.slot, &mut self.output)?;
        for (&value, &index) in self.output.iter().zip(&self.output_map) {
            self.state[index] = value;
        }
        Ok(())
    }

    /// Raw state values, for persistence.
    #[must_use]
    pub fn state(&self) -> &[i32] {
        &self.state
    }

    /// Overwrites the leading local state values.
    pub fn set_state(&mut self, state: &[i32]) -> Result<()> {
        if state.len() > self.state.len() {
            return Err(SimulatorError::buffer_too_small(
                "state",
                state.len(),
                self.state.len(),
            ));
        }
        self.state[..state.len()].copy_from_slice(state);
        Ok(())
    }

    #[must_use]
    pub fn output_values(&self) -> &[i32] {
        &self.output
    }

    /// Returns the slot to the simulator's allocator.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        let slot = self.slot;
        self.simulator.borrow_mut().allocator().deallocate(slot)
    }
}

impl Drop for SimulatorCellularAutomaton {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(mut sim) = self.simulator.try_borrow_mut() else {
            warn!(slot = self.slot, "Simulator busy while dropping automaton; slot not released");
            return;
        };
        let allocator = sim.allocator();
        // The slot may already be free if it was bound with `with_slot`.
        if !allocator.is_allocated(self.slot) {
            debug!(slot = self.slot, "Dropped automaton on an unallocated slot");
            return;
        }
        if let Err(err) = allocator.deallocate(self.slot) {
            warn!(slot = self.slot, %err, "Failed to release slot");
        }
    }
}

/// Read-only view of one cell.
pub struct CellView<'a> {
    info: &'a CellInfo,
    lu_index: usize,
    automaton: &'a SimulatorCellularAutomaton,
}

impl CellView<'_> {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.info.id
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.info.output_var_names().len()
    }

    pub fn output(&self, output: usize) -> Result<i32> {
        Ok(self.automaton.state[self.output_state_index(output)?])
    }

    pub fn param(&self, param_id: &str) -> Result<i32> {
        let name = self
            .info
            .param_var_name(param_id)
            .ok_or_else(|| unknown(param_id))?;
        Ok(self.automaton.state[self.state_index(name)?])
    }

    pub fn output_param(&self, output: usize, param_id: &str) -> Result<i32> {
        let name = self
            .info
            .output_param_var_name(output, param_id)
            .ok_or_else(|| unknown(param_id))?;
        Ok(self.automaton.state[self.state_index(name)?])
    }

    /// Parameter ids, including `out{o}_{p}` ids of output parameters.
    #[must_use]
    pub fn param_names(&self) -> Vec<String> {
        self.info.param_ids().map(str::to_string).collect()
    }

    #[must_use]
    pub fn output_param_names(&self, output: usize) -> Vec<String> {
        self.info
            .output_param_ids(output)
            .map(str::to_string)
            .collect()
    }

    fn output_state_index(&self, output: usize) -> Result<usize> {
        let name = self
            .info
            .output_var_name(output)
            .ok_or(SimulatorError::OutputOutOfRange {
                index: output,
                count: self.output_count(),
            })?;
        self.state_index(name)
    }

    fn state_index(&self, name: &str) -> Result<usize> {
        self.automaton
            .model
            .state_index(name, self.lu_index)
            .ok_or_else(|| unknown(name))
    }
}

/// Mutable view of one cell.
pub struct CellViewMut<'a> {
    model: Arc<Model>,
    cell: usize,
    lu_index: usize,
    state: &'a mut [i32],
}

impl CellViewMut<'_> {
    fn info(&self) -> &CellInfo {
        &self.model.logical_unit().cells[self.cell]
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.info().output_var_names().len()
    }

    pub fn output(&self, output: usize) -> Result<i32> {
        let index = self.output_state_index(output)?;
        Ok(self.state[index])
    }

    pub fn set_output(&mut self, output: usize, value: i32) -> Result<()> {
        let index = self.output_state_index(output)?;
        self.state[index] = value;
        Ok(())
    }

    pub fn param(&self, param_id: &str) -> Result<i32> {
        let index = self.param_state_index(param_id)?;
        Ok(self.state[index])
    }

    pub fn set_param(&mut self, param_id: &str, value: i32) -> Result<()> {
        let index = self.param_state_index(param_id)?;
        self.state[index] = value;
        Ok(())
    }

    pub fn output_param(&self, output: usize, param_id: &str) -> Result<i32> {
        let index = self.output_param_state_index(output, param_id)?;
        Ok(self.state[index])
    }

    pub fn set_output_param(&mut self, output: usize, param_id: &str, value: i32) -> Result<()> {
        let index = self.output_param_state_index(output, param_id)?;
        self.state[index] = value;
        Ok(())
    }

    fn output_state_index(&self, output: usize) -> Result<usize> {
        let info = self.info();
        let name = info
            .output_var_name(output)
            .ok_or(SimulatorError::OutputOutOfRange {
                index: output,
                count: info.output_var_names().len(),
            })?;
        self.state_index(name)
    }

    fn param_state_index(&self, param_id: &str) -> Result<usize> {
        let name = self
            .info()
            .param_var_name(param_id)
            .ok_or_else(|| unknown(param_id))?;
        self.state_index(name)
    }

    fn output_param_state_index(&self, output: usize, param_id: &str) -> Result<usize> {
        let name = self
            .info()
            .output_param_var_name(output, param_id)
            .ok_or_else(|| unknown(param_id))?;
        self.state_index(name)
    }

    fn state_index(&self, name: &str) -> Result<usize> {
        self.model
            .state_index(name, self.lu_index)
            .ok_or_else(|| unknown(name))
    }
}

fn unknown(name: &str) -> SimulatorError {
    ModelError::UnknownStateVariable(name.to_string()).into()
}
