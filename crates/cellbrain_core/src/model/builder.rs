//! Compiles a [`CellularAutomatonDescriptor`] into a [`Model`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cellbrain_data::{Cell, CellType, CellularAutomatonDescriptor, Output, DEFAULT_VALUE_TYPE};
use tracing::debug;

use super::{
    external_var_name, output_param_id, output_param_var_name, output_var_name, param_var_name,
    CellInfo, ExternalCellInfo, LogicalUnitInfo, Model,
};
use crate::connection::{self, ConnectionInfo, ExternalCell, MatrixCell};
use crate::error::{ModelError, ModelResult};

/// Builds the immutable simulation model of a descriptor.
///
/// Building never mutates the descriptor; cells without ids and cells that
/// restrict their outputs are resolved on private copies.
#[derive(Debug, Default, Clone)]
pub struct ModelBuilder;

impl ModelBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, descriptor: &CellularAutomatonDescriptor) -> ModelResult<Model> {
        if descriptor.value_type() != DEFAULT_VALUE_TYPE {
            return Err(ModelError::UnsupportedValueType(
                descriptor.value_type().to_string(),
            ));
        }
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(ModelError::InvalidGridSize {
                width: descriptor.width,
                height: descriptor.height,
            });
        }

        let mut cell_types: HashMap<String, Arc<CellType>> = descriptor
            .cell_types
            .iter()
            .map(|t| (t.id.clone(), Arc::new(expand_outputs(t))))
            .collect();

        let matrix = self.build_matrix(descriptor, &mut cell_types)?;
        let matrix_cells: Vec<Vec<MatrixCell>> = matrix
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(cell, cell_type)| MatrixCell {
                        id: cell.id.clone().unwrap_or_default(),
                        output_ids: cell_type.outputs.iter().map(|o| o.id.clone()).collect(),
                    })
                    .collect()
            })
            .collect();

        let neighbor_connections = descriptor.logical_unit.neighbor_connections();
        let ConnectionInfo {
            inputs,
            external_cells,
        } = connection::connect(&matrix_cells, neighbor_connections);

        let width = matrix_cells[0].len();
        let height = matrix_cells.len();
        let mut cells = Vec::with_capacity(width * height);
        for ((idx, (cell, cell_type)), inputs) in
            matrix.into_iter().flatten().enumerate().zip(inputs)
        {
            cells.push(build_cell_info(
                cell,
                cell_type,
                idx / width,
                idx % width,
                inputs,
            )?);
        }
        let external_cells: Vec<ExternalCellInfo> =
            external_cells.into_iter().map(external_cell_info).collect();

        let var_names = state_var_order(&cells, &external_cells);
        let mut seen = HashSet::with_capacity(var_names.len());
        for name in &var_names {
            if !seen.insert(name.as_str()) {
                return Err(ModelError::DuplicateStateVariable(name.clone()));
            }
        }

        debug!(
            cells = cells.len(),
            external_cells = external_cells.len(),
            unit_state_size = var_names.len(),
            ?neighbor_connections,
            "Built logical unit"
        );

        let logical_unit = LogicalUnitInfo::new(
            width,
            height,
            neighbor_connections,
            cells,
            external_cells,
            var_names,
        );
        Ok(Model::new(descriptor.clone(), cell_types, logical_unit))
    }

    /// Resolves ids and types of every cell in the logical unit.
    fn build_matrix(
        &self,
        descriptor: &CellularAutomatonDescriptor,
        cell_types: &mut HashMap<String, Arc<CellType>>,
    ) -> ModelResult<Vec<Vec<(Cell, Arc<CellType>)>>> {
        let unit = &descriptor.logical_unit;
        let width = unit.width();
        if unit.rows.is_empty() || width == 0 {
            return Err(ModelError::EmptyLogicalUnit);
        }

        let mut next_id = 1usize;
        let mut ids = HashSet::new();
        let mut matrix = Vec::with_capacity(unit.rows.len());
        for (row_idx, row) in unit.rows.iter().enumerate() {
            if row.cells.len() != width {
                return Err(ModelError::RaggedLogicalUnit {
                    row: row_idx,
                    expected: width,
                    found: row.cells.len(),
                });
            }
            let mut resolved = Vec::with_capacity(width);
            for cell in &row.cells {
                let mut cell = cell.clone();
                let id = match cell.id.clone() {
                    Some(id) => id,
                    None => {
                        let id = next_id.to_string();
                        next_id += 1;
                        cell.id = Some(id.clone());
                        id
                    }
                };
                if !ids.insert(id.clone()) {
                    return Err(ModelError::DuplicateCellId(id));
                }

                let base = cell_types.get(&cell.cell_type).cloned().ok_or_else(|| {
                    ModelError::UnknownCellType {
                        cell: id.clone(),
                        cell_type: cell.cell_type.clone(),
                    }
                })?;
                let cell_type = match cell.outputs.as_deref() {
                    Some(selection) => {
                        let restricted = Arc::new(restrict_outputs(&base, selection, &id));
                        cell.cell_type = restricted.id.clone();
                        cell_types.insert(restricted.id.clone(), Arc::clone(&restricted));
                        restricted
                    }
                    None => base,
                };
                if cell_type.outputs.is_empty() {
                    return Err(ModelError::NoOutputs {
                        cell: id,
                        cell_type: cell_type.id.clone(),
                    });
                }
                resolved.push((cell, cell_type));
            }
            matrix.push(resolved);
        }
        Ok(matrix)
    }
}

/// Splits every output whose id names several outputs (`"{1,2,3}"`) into one
/// output per digit group. Ids without digits are kept unchanged.
fn expand_outputs(cell_type: &CellType) -> CellType {
    let mut expanded = CellType {
        id: cell_type.id.clone(),
        outputs: Vec::with_capacity(cell_type.outputs.len()),
        params: cell_type.params.clone(),
        vars: cell_type.vars.clone(),
    };
    for output in &cell_type.outputs {
        let ids = digit_groups(&output.id);
        if ids.is_empty() {
            expanded.outputs.push(output.clone());
            continue;
        }
        expanded.outputs.extend(ids.into_iter().map(|id| Output {
            id: id.to_string(),
            ..output.clone()
        }));
    }
    expanded
}

/// Derived type `{type}_e{cell}` holding only the selected outputs, in
/// selection order. Unknown selections are skipped.
fn restrict_outputs(base: &CellType, selection: &str, cell_id: &str) -> CellType {
    CellType {
        id: format!("{}_e{cell_id}", base.id),
        outputs: digit_groups(selection)
            .into_iter()
            .filter_map(|id| base.output(id).cloned())
            .collect(),
        params: base.params.clone(),
        vars: base.vars.clone(),
    }
}

fn digit_groups(text: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut start = None;
    for (idx, ch) in text.char_indices() {
        match (ch.is_ascii_digit(), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                groups.push(&text[s..idx]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        groups.push(&text[s..]);
    }
    groups
}

fn build_cell_info(
    cell: Cell,
    cell_type: Arc<CellType>,
    row: usize,
    col: usize,
    inputs: Vec<super::Input>,
) -> ModelResult<CellInfo> {
    let id = cell.id.unwrap_or_default();

    let mut param_var_names: Vec<(String, String)> = Vec::new();
    for param in &cell_type.params {
        if param_var_names.iter().any(|(k, _)| *k == param.id) {
            return Err(ModelError::DuplicateParameter {
                cell: id,
                param: param.id.clone(),
            });
        }
        param_var_names.push((param.id.clone(), param_var_name(&id, &param.id)));
    }

    let mut var_names: Vec<(String, String)> = Vec::new();
    for var in &cell_type.vars {
        if var_names.iter().any(|(k, _)| *k == var.id) {
            return Err(ModelError::DuplicateVariable {
                cell: id,
                var: var.id.clone(),
            });
        }
        var_names.push((var.id.clone(), param_var_name(&id, &var.id)));
    }

    let mut output_var_names = Vec::with_capacity(cell_type.outputs.len());
    let mut output_param_ids = Vec::with_capacity(cell_type.outputs.len());
    for output in &cell_type.outputs {
        output_var_names.push(output_var_name(&id, &output.id));
        let mut ids = Vec::with_capacity(output.params.len());
        for param in &output.params {
            let full_id = output_param_id(&output.id, &param.id);
            if param_var_names.iter().any(|(k, _)| *k == full_id) {
                return Err(ModelError::DuplicateParameter {
                    cell: id,
                    param: full_id,
                });
            }
            param_var_names.push((
                full_id.clone(),
                output_param_var_name(&id, &output.id, &param.id),
            ));
            ids.push((param.id.clone(), full_id));
        }
        output_param_ids.push(ids);
    }

    Ok(CellInfo {
        id,
        row,
        col,
        cell_type,
        inputs,
        output_var_names,
        param_var_names,
        var_names,
        output_param_ids,
    })
}

fn external_cell_info(external: ExternalCell) -> ExternalCellInfo {
    let var_name = external_var_name(&external.id);
    ExternalCellInfo {
        id: external.id,
        relative_unit_row: external.relative_unit_row,
        relative_unit_col: external.relative_unit_col,
        cell_id: external.cell_id,
        output_id: external.output_id,
        var_name,
    }
}

/// State variables in layout order: outputs read by an external cell, then
/// the remaining outputs, then per cell its params followed by its output
/// params.
fn state_var_order(cells: &[CellInfo], external_cells: &[ExternalCellInfo]) -> Vec<String> {
    let feeds_external = |cell: &CellInfo, output: &Output| {
        external_cells
            .iter()
            .any(|e| e.cell_id == cell.id && e.output_id == output.id)
    };

    let mut names = Vec::new();
    for external_first in [true, false] {
        for cell in cells {
            for (output, name) in cell.outputs().iter().zip(cell.output_var_names()) {
                if feeds_external(cell, output) == external_first {
                    names.push(name.clone());
                }
            }
        }
    }
    for cell in cells {
        names.extend(cell.param_var_names().map(str::to_string));
    }
    names
}
