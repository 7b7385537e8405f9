use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use super::{Allocator, Simulator, SlotArray, SlotBuffers};
use crate::codegen::{Program, StagingStatement};
use crate::error::Result;
use crate::expr::{Scope, VarRef};
use crate::model::Model;

/// Executes a compiled [`Program`] in process.
///
/// Every iteration reads a snapshot of the previous state, so the order of
/// cells and logical units never affects the result.
#[derive(Debug, Clone)]
pub struct InterpretedSimulator {
    program: Arc<Program>,
    logical_unit_count: usize,
    slots: SlotArray,
}

impl InterpretedSimulator {
    pub fn new(model: &Model, size: usize, input_size: usize, output_size: usize) -> Result<Self> {
        let program = Program::compile(model)?;
        Ok(Self::from_program(
            Arc::new(program),
            model.logical_unit_count(),
            size,
            input_size,
            output_size,
        ))
    }

    #[must_use]
    pub fn from_program(
        program: Arc<Program>,
        logical_unit_count: usize,
        size: usize,
        input_size: usize,
        output_size: usize,
    ) -> Self {
        let state_size = program.unit_state_size * logical_unit_count;
        debug!(size, state_size, input_size, output_size, "Created interpreted simulator");
        Self {
            program,
            logical_unit_count,
            slots: SlotArray::new(size, state_size, input_size, output_size),
        }
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }
}

impl Simulator for InterpretedSimulator {
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
        let program = &*self.program;
        let lu_count = self.logical_unit_count;

        #[cfg(feature = "parallel")]
        self.slots
            .slots
            .par_iter_mut()
            .for_each(|slot| advance(program, lu_count, slot));
        #[cfg(not(feature = "parallel"))]
        self.slots
            .slots
            .iter_mut()
            .for_each(|slot| advance(program, lu_count, slot));

        Ok(())
    }
}

struct UnitScope<'a> {
    state: &'a [i32],
    lu_index: usize,
    lu_count: usize,
    externals: &'a [i32],
    temps: &'a [i32],
    input: &'a [i32],
}

impl Scope for UnitScope<'_> {
    fn var(&self, var: VarRef) -> i32 {
        match var {
            VarRef::State(idx) => self.state[idx * self.lu_count + self.lu_index],
            VarRef::External(idx) => self.externals[idx],
            VarRef::Temp(idx) => self.temps[idx],
        }
    }

    fn input(&self) -> &[i32] {
        self.input
    }
}

/// Runs one `update()` on a single slot.
fn advance(program: &Program, lu_count: usize, slot: &mut SlotBuffers) {
    if slot.state.is_empty() {
        return;
    }
    slot.apply_input_map();

    let mut externals = vec![0; program.external_reads.len()];
    let mut temps = vec![0; program.temp_names.len()];

    if !program.constant_staging.is_empty() || !program.constant_updates.is_empty() {
        // Every unit sees its neighbors as they were before the constants ran.
        let before = slot.state.clone();
        for lu_index in 0..lu_count {
            read_externals(program, lu_count, lu_index, &before, &mut externals);
            temps.fill(0);
            run_staging(
                &program.constant_staging,
                &slot.state,
                lu_index,
                lu_count,
                &externals,
                &mut temps,
                &slot.input,
            );
            for statement in &program.constant_updates {
                let value = statement.value.eval(&UnitScope {
                    state: &slot.state,
                    lu_index,
                    lu_count,
                    externals: &externals,
                    temps: &temps,
                    input: &slot.input,
                });
                slot.state[statement.state_index * lu_count + lu_index] = value;
            }
        }
    }

    let mut next = slot.state.clone();
    for _ in 0..program.iterations_per_update {
        for lu_index in 0..lu_count {
            read_externals(program, lu_count, lu_index, &slot.state, &mut externals);
            temps.fill(0);
            run_staging(
                &program.staging,
                &slot.state,
                lu_index,
                lu_count,
                &externals,
                &mut temps,
                &slot.input,
            );
            let scope = UnitScope {
                state: &slot.state,
                lu_index,
                lu_count,
                externals: &externals,
                temps: &temps,
                input: &slot.input,
            };
            for statement in &program.updates {
                next[statement.state_index * lu_count + lu_index] = statement.value.eval(&scope);
            }
        }
        slot.state.copy_from_slice(&next);
    }

    slot.apply_output_map();
}

fn read_externals(
    program: &Program,
    lu_count: usize,
    lu_index: usize,
    state: &[i32],
    externals: &mut [i32],
) {
    let lu_row = lu_index / program.width;
    let lu_col = lu_index % program.width;
    for (value, read) in externals.iter_mut().zip(&program.external_reads) {
        let unit = read.neighbor_unit(lu_row, lu_col, program.width, program.height);
        *value = state[read.source_state_index * lu_count + unit];
    }
}

fn run_staging(
    statements: &[StagingStatement],
    state: &[i32],
    lu_index: usize,
    lu_count: usize,
    externals: &[i32],
    temps: &mut [i32],
    input: &[i32],
) {
    for statement in statements {
        let value = statement.value.eval(&UnitScope {
            state,
            lu_index,
            lu_count,
            externals,
            temps,
            input,
        });
        temps[statement.temp] = value;
    }
}
