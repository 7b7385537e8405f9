//! Name-addressed construction of automaton state arrays.

use crate::error::{ModelError, ModelResult};
use crate::model::Model;

/// Builds a full automaton state vector by variable name.
///
/// ```ignore
/// let mut builder = StateBuilder::new(&model);
/// builder.unit(0, 1).set("cell_1_out1", 5)?;
/// let state = builder.build();
/// ```
#[derive(Debug, Clone)]
pub struct StateBuilder<'m> {
    model: &'m Model,
    state: Vec<i32>,
}

impl<'m> StateBuilder<'m> {
    #[must_use]
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            state: vec![0; model.state_size()],
        }
    }

    /// Starts from an existing state; extra values are dropped and missing
    /// ones zeroed.
    #[must_use]
    pub fn from_state(model: &'m Model, state: &[i32]) -> Self {
        let mut builder = Self::new(model);
        let len = state.len().min(builder.state.len());
        builder.state[..len].copy_from_slice(&state[..len]);
        builder
    }

    /// Logical unit at `(lu_row, lu_col)`; coordinates wrap around the grid.
    pub fn unit(&mut self, lu_row: usize, lu_col: usize) -> UnitState<'_, 'm> {
        let (width, height) = (self.model.width().max(1), self.model.height().max(1));
        let lu_index = (lu_row % height) * width + lu_col % width;
        UnitState {
            builder: self,
            lu_index,
        }
    }

    /// Sets `var_name` to `value` in every logical unit.
    pub fn set_all(&mut self, var_name: &str, value: i32) -> ModelResult<&mut Self> {
        for lu_index in 0..self.model.logical_unit_count() {
            let index = self.index(var_name, lu_index)?;
            self.state[index] = value;
        }
        Ok(self)
    }

    fn index(&self, var_name: &str, lu_index: usize) -> ModelResult<usize> {
        self.model
            .state_index(var_name, lu_index)
            .ok_or_else(|| ModelError::UnknownStateVariable(var_name.to_string()))
    }

    #[must_use]
    pub fn state(&self) -> &[i32] {
        &self.state
    }

    #[must_use]
    pub fn build(self) -> Vec<i32> {
        self.state
    }
}

/// State of one logical unit inside a [`StateBuilder`].
pub struct UnitState<'b, 'm> {
    builder: &'b mut StateBuilder<'m>,
    lu_index: usize,
}

impl UnitState<'_, '_> {
    pub fn set(&mut self, var_name: &str, value: i32) -> ModelResult<&mut Self> {
        let index = self.builder.index(var_name, self.lu_index)?;
        self.builder.state[index] = value;
        Ok(self)
    }

    pub fn get(&self, var_name: &str) -> ModelResult<i32> {
        let index = self.builder.index(var_name, self.lu_index)?;
        Ok(self.builder.state[index])
    }
}
