//! Immutable simulation model compiled from a descriptor.
//!
//! The model assigns every cell output, parameter and output parameter of
//! the logical unit a dense index into a per-unit state vector. The full
//! automaton state is laid out structure-of-arrays style:
//!
//! ```text
//! state[state_index * logical_unit_count + lu_index]
//! ```
//!
//! where `lu_index = lu_row * width + lu_col`.
//!
//! Cell variables (`vars`) are per-tick temporaries and have no state index.

pub mod builder;

use std::collections::HashMap;
use std::sync::Arc;

use cellbrain_data::{CellType, CellularAutomatonDescriptor, NeighborConnections, Output};

pub use builder::ModelBuilder;

/// Prefix of synthesized external cell ids (`in1`, `in2`, ...).
pub const EXTERNAL_INPUT_ID_PREFIX: &str = "in";

/// Source of one of a cell's neighbor inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    /// Output `output` of the cell at position `cell` (row-major) in the logical unit.
    Cell { cell: usize, output: usize },
    /// Index into [`LogicalUnitInfo::external_cells`].
    External(usize),
}

/// A boundary-crossing connection, resolved against the neighboring logical
/// unit at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCellInfo {
    pub id: String,
    pub relative_unit_row: i32,
    pub relative_unit_col: i32,
    pub cell_id: String,
    pub output_id: String,
    /// Name of the value read from the neighbor unit, `ex_{id}`.
    pub var_name: String,
}

impl ExternalCellInfo {
    /// Name of the state variable this external cell reads in the neighbor unit.
    #[must_use]
    pub fn source_var_name(&self) -> String {
        output_var_name(&self.cell_id, &self.output_id)
    }
}

/// Index of the logical unit `(relative_row, relative_col)` away from the
/// unit at `(lu_row, lu_col)` in a `width x height` grid.
#[must_use]
pub fn neighbor_unit(
    lu_row: usize,
    lu_col: usize,
    relative_row: i32,
    relative_col: i32,
    width: usize,
    height: usize,
) -> usize {
    let row = wrap(lu_row as i64 + i64::from(relative_row), height);
    let col = wrap(lu_col as i64 + i64::from(relative_col), width);
    row * width + col
}

fn wrap(value: i64, modulus: usize) -> usize {
    value.rem_euclid(modulus as i64) as usize
}

/// A resolved cell of the logical unit.
#[derive(Debug, Clone)]
pub struct CellInfo {
    pub id: String,
    pub row: usize,
    pub col: usize,
    pub cell_type: Arc<CellType>,
    pub inputs: Vec<Input>,
    pub(crate) output_var_names: Vec<String>,
    /// `(param id, var name)`; includes output parameters under their `out{o}_{p}` ids.
    pub(crate) param_var_names: Vec<(String, String)>,
    pub(crate) var_names: Vec<(String, String)>,
    /// Per output: `(param id, out{o}_{p} id)`.
    pub(crate) output_param_ids: Vec<Vec<(String, String)>>,
}

impl CellInfo {
    #[must_use]
    pub fn outputs(&self) -> &[Output] {
        &self.cell_type.outputs
    }

    #[must_use]
    pub fn output_var_name(&self, output: usize) -> Option<&str> {
        self.output_var_names.get(output).map(String::as_str)
    }

    #[must_use]
    pub fn output_var_names(&self) -> &[String] {
        &self.output_var_names
    }

    #[must_use]
    pub fn param_var_name(&self, param_id: &str) -> Option<&str> {
        lookup(&self.param_var_names, param_id)
    }

    pub fn param_var_names(&self) -> impl Iterator<Item = &str> {
        self.param_var_names.iter().map(|(_, v)| v.as_str())
    }

    /// Parameter ids, including the `out{o}_{p}` ids of output parameters.
    pub fn param_ids(&self) -> impl Iterator<Item = &str> {
        self.param_var_names.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn var_name(&self, var_id: &str) -> Option<&str> {
        lookup(&self.var_names, var_id)
    }

    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.var_names.iter().map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn output_param_var_name(&self, output: usize, param_id: &str) -> Option<&str> {
        let full_id = lookup(self.output_param_ids.get(output)?, param_id)?;
        self.param_var_name(full_id)
    }

    /// Declared parameter ids of one output.
    pub fn output_param_ids(&self, output: usize) -> impl Iterator<Item = &str> {
        self.output_param_ids
            .get(output)
            .into_iter()
            .flat_map(|ids| ids.iter().map(|(k, _)| k.as_str()))
    }

    /// Number of state values owned by this cell.
    #[must_use]
    pub fn state_size(&self) -> usize {
        self.output_var_names.len() + self.param_var_names.len()
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Cells, external cells and the state-index bijection of one logical unit.
#[derive(Debug, Clone)]
pub struct LogicalUnitInfo {
    pub width: usize,
    pub height: usize,
    pub neighbor_connections: NeighborConnections,
    pub cells: Vec<CellInfo>,
    pub external_cells: Vec<ExternalCellInfo>,
    state_indices: HashMap<String, usize>,
    var_names: Vec<String>,
}

impl LogicalUnitInfo {
    pub(crate) fn new(
        width: usize,
        height: usize,
        neighbor_connections: NeighborConnections,
        cells: Vec<CellInfo>,
        external_cells: Vec<ExternalCellInfo>,
        var_names: Vec<String>,
    ) -> Self {
        let state_indices = var_names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self {
            width,
            height,
            neighbor_connections,
            cells,
            external_cells,
            state_indices,
            var_names,
        }
    }

    #[must_use]
    pub fn cell(&self, id: &str) -> Option<&CellInfo> {
        self.cells.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&CellInfo> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.cells.get(row * self.width + col)
    }

    #[must_use]
    pub fn external_cell(&self, id: &str) -> Option<&ExternalCellInfo> {
        self.external_cells.iter().find(|c| c.id == id)
    }

    /// Per-unit state index of a variable.
    #[must_use]
    pub fn state_index(&self, var_name: &str) -> Option<usize> {
        self.state_indices.get(var_name).copied()
    }

    /// Variable names ordered by state index.
    #[must_use]
    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    /// Number of state values per logical unit.
    #[must_use]
    pub fn state_size(&self) -> usize {
        self.var_names.len()
    }

    /// Name of the variable an input reads.
    #[must_use]
    pub fn input_var_name(&self, input: Input) -> Option<&str> {
        match input {
            Input::Cell { cell, output } => self.cells.get(cell)?.output_var_name(output),
            Input::External(idx) => self.external_cells.get(idx).map(|e| e.var_name.as_str()),
        }
    }
}

/// Compiled, read-only model shared by every slot running one descriptor.
#[derive(Debug, Clone)]
pub struct Model {
    descriptor: CellularAutomatonDescriptor,
    cell_types: HashMap<String, Arc<CellType>>,
    logical_unit: LogicalUnitInfo,
}

impl Model {
    pub(crate) fn new(
        descriptor: CellularAutomatonDescriptor,
        cell_types: HashMap<String, Arc<CellType>>,
        logical_unit: LogicalUnitInfo,
    ) -> Self {
        Self {
            descriptor,
            cell_types,
            logical_unit,
        }
    }

    /// Builds a model; shorthand for [`ModelBuilder::build`].
    pub fn build(descriptor: &CellularAutomatonDescriptor) -> crate::error::ModelResult<Self> {
        ModelBuilder::new().build(descriptor)
    }

    #[must_use]
    pub fn descriptor(&self) -> &CellularAutomatonDescriptor {
        &self.descriptor
    }

    /// Preprocessed cell type, including derived restricted-output types.
    #[must_use]
    pub fn cell_type(&self, id: &str) -> Option<&Arc<CellType>> {
        self.cell_types.get(id)
    }

    #[must_use]
    pub fn logical_unit(&self) -> &LogicalUnitInfo {
        &self.logical_unit
    }

    /// Number of logical units per grid row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.descriptor.width
    }

    /// Number of logical unit rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.descriptor.height
    }

    #[must_use]
    pub fn logical_unit_count(&self) -> usize {
        self.descriptor.logical_unit_count()
    }

    #[must_use]
    pub fn iterations_per_update(&self) -> usize {
        self.descriptor.iterations_per_update()
    }

    #[must_use]
    pub fn value_type(&self) -> &str {
        self.descriptor.value_type()
    }

    /// Total state values of one automaton.
    #[must_use]
    pub fn state_size(&self) -> usize {
        self.logical_unit.state_size() * self.logical_unit_count()
    }

    #[must_use]
    pub fn state_size_bytes(&self) -> usize {
        self.state_size() * std::mem::size_of::<i32>()
    }

    /// Number of state values that hold cell outputs.
    #[must_use]
    pub fn cell_output_state_size(&self) -> usize {
        let per_unit: usize = self
            .logical_unit
            .cells
            .iter()
            .map(|c| c.output_var_names.len())
            .sum();
        per_unit * self.logical_unit_count()
    }

    /// Cell of the logical unit; coordinates wrap around the unit.
    #[must_use]
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&CellInfo> {
        let lu = &self.logical_unit;
        if lu.width == 0 || lu.height == 0 {
            return None;
        }
        lu.cell_at(row % lu.height, col % lu.width)
    }

    /// Index into the automaton state of `var_name` in logical unit `lu_index`.
    #[must_use]
    pub fn state_index(&self, var_name: &str, lu_index: usize) -> Option<usize> {
        let idx = self.logical_unit.state_index(var_name)?;
        Some(idx * self.logical_unit_count() + lu_index)
    }
}

pub(crate) fn output_var_name(cell_id: &str, output_id: &str) -> String {
    format!("cell_{cell_id}_out{output_id}")
}

pub(crate) fn external_var_name(external_id: &str) -> String {
    format!("ex_{external_id}")
}

pub(crate) fn param_var_name(cell_id: &str, param_id: &str) -> String {
    format!("cell_{cell_id}_{param_id}")
}

pub(crate) fn output_param_id(output_id: &str, param_id: &str) -> String {
    format!("out{output_id}_{param_id}")
}

pub(crate) fn output_param_var_name(cell_id: &str, output_id: &str, param_id: &str) -> String {
    format!("cell_{cell_id}_out{output_id}_{param_id}")
}
