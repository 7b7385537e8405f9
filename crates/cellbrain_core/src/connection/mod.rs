//! Neighbor wiring of the logical unit.
//!
//! Each builder visits the matrix in row-major order and produces, for every
//! cell, one [`Input`] per direction. Directions are paired with a fixed
//! source output index so that a cell's output `k` always faces the same
//! direction regardless of its position. Output indices wrap modulo the
//! source cell's output count.
//!
//! Neighbors outside the matrix become external cells carrying the relative
//! logical-unit offset and the id of the cell on the opposite edge; which
//! physical unit that is gets decided at runtime.

mod eight;
mod four;
mod three;

pub use eight::EightNeighborConnections;
pub use four::FourNeighborConnections;
pub use three::ThreeNeighborConnections;

use cellbrain_data::NeighborConnections;

use crate::model::{Input, EXTERNAL_INPUT_ID_PREFIX};

/// A cell of the logical unit matrix as seen by the connection builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixCell {
    pub id: String,
    pub output_ids: Vec<String>,
}

/// Boundary-crossing reference produced during wiring.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalCell {
    pub id: String,
    pub relative_unit_row: i32,
    pub relative_unit_col: i32,
    pub cell_id: String,
    pub output_id: String,
}

/// Result of wiring a logical unit.
#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    /// Inputs per cell, row-major.
    pub inputs: Vec<Vec<Input>>,
    pub external_cells: Vec<ExternalCell>,
}

/// Directional wiring rule for one neighbor arity.
pub trait ConnectionBuilder {
    fn arity(&self) -> usize;

    /// Inputs of the cell at `(row, col)`, in direction order.
    fn connect(&self, wiring: &mut Wiring<'_>, row: usize, col: usize) -> Vec<Input>;

    fn build(&self, cells: &[Vec<MatrixCell>]) -> ConnectionInfo {
        let mut wiring = Wiring::new(cells);
        let mut inputs = Vec::with_capacity(cells.iter().map(Vec::len).sum());
        for row in 0..cells.len() {
            for col in 0..cells[row].len() {
                inputs.push(self.connect(&mut wiring, row, col));
            }
        }
        ConnectionInfo {
            inputs,
            external_cells: wiring.external_cells,
        }
    }
}

/// Returns the builder for the given arity.
#[must_use]
pub fn builder_for(connections: NeighborConnections) -> Box<dyn ConnectionBuilder> {
    match connections {
        NeighborConnections::Three => Box::new(ThreeNeighborConnections),
        NeighborConnections::Four => Box::new(FourNeighborConnections),
        NeighborConnections::Eight => Box::new(EightNeighborConnections),
    }
}

/// Wires the matrix with the builder for `connections`.
#[must_use]
pub fn connect(cells: &[Vec<MatrixCell>], connections: NeighborConnections) -> ConnectionInfo {
    builder_for(connections).build(cells)
}

/// Mutable wiring context shared by the builders.
pub struct Wiring<'a> {
    cells: &'a [Vec<MatrixCell>],
    external_cells: Vec<ExternalCell>,
}

impl<'a> Wiring<'a> {
    fn new(cells: &'a [Vec<MatrixCell>]) -> Self {
        Self {
            cells,
            external_cells: Vec::new(),
        }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn col_count(&self, row: usize) -> usize {
        self.cells[row].len()
    }

    fn flat_index(&self, row: usize, col: usize) -> usize {
        self.cells[..row].iter().map(Vec::len).sum::<usize>() + col
    }

    /// Direct link to output `output_idx` of the cell at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize, output_idx: usize) -> Input {
        let count = self.cells[row][col].output_ids.len().max(1);
        Input::Cell {
            cell: self.flat_index(row, col),
            output: output_idx % count,
        }
    }

    /// Link to output `output_idx` of the cell at `(row, col)` in the logical
    /// unit offset by `(relative_row, relative_col)`.
    pub fn external(
        &mut self,
        relative_row: i32,
        relative_col: i32,
        row: usize,
        col: usize,
        output_idx: usize,
    ) -> Input {
        let source = &self.cells[row][col];
        let output_id = source
            .output_ids
            .get(output_idx % source.output_ids.len().max(1))
            .cloned()
            .unwrap_or_default();

        let existing = self.external_cells.iter().position(|e| {
            e.relative_unit_row == relative_row
                && e.relative_unit_col == relative_col
                && e.cell_id == source.id
                && e.output_id == output_id
        });
        if let Some(idx) = existing {
            return Input::External(idx);
        }

        let id = format!("{EXTERNAL_INPUT_ID_PREFIX}{}", self.external_cells.len() + 1);
        self.external_cells.push(ExternalCell {
            id,
            relative_unit_row: relative_row,
            relative_unit_col: relative_col,
            cell_id: source.id.clone(),
            output_id,
        });
        Input::External(self.external_cells.len() - 1)
    }
}
