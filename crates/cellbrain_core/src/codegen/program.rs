//! Backend-neutral statement list compiled from a [`Model`].

use std::collections::HashMap;

use tracing::debug;

use super::resolver::var_mapped_string;
use crate::error::{ModelError, ModelResult};
use crate::expr::{parse_expr, parse_statements, ExprError, Node, VarRef};
use crate::model::{neighbor_unit, CellInfo, Model};

/// Reads one external cell value from a neighboring logical unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRead {
    pub var_name: String,
    pub relative_unit_row: i32,
    pub relative_unit_col: i32,
    /// Per-unit state index of the source output in the neighbor unit.
    pub source_state_index: usize,
}

impl ExternalRead {
    /// Logical unit this read resolves to for the unit at `(lu_row, lu_col)`.
    #[must_use]
    pub fn neighbor_unit(&self, lu_row: usize, lu_col: usize, width: usize, height: usize) -> usize {
        neighbor_unit(
            lu_row,
            lu_col,
            self.relative_unit_row,
            self.relative_unit_col,
            width,
            height,
        )
    }
}

/// Assignment of a cell variable by a before-update block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingStatement {
    pub cell_id: String,
    pub temp: usize,
    pub target: String,
    /// Resolved right-hand side.
    pub text: String,
    pub value: Node,
}

/// Assignment of a cell output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatement {
    pub cell_id: String,
    pub state_index: usize,
    pub target: String,
    /// Resolved update expression.
    pub text: String,
    pub value: Node,
}

/// Resolved and parsed update rules of one logical unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub width: usize,
    pub height: usize,
    pub iterations_per_update: usize,
    /// State values per logical unit.
    pub unit_state_size: usize,
    /// Per-unit state variable names, by state index.
    pub state_var_names: Vec<String>,
    pub external_reads: Vec<ExternalRead>,
    /// Cell variable names, by temporary index.
    pub temp_names: Vec<String>,
    pub constant_staging: Vec<StagingStatement>,
    pub constant_updates: Vec<UpdateStatement>,
    pub staging: Vec<StagingStatement>,
    pub updates: Vec<UpdateStatement>,
}

impl Program {
    /// Resolves every output of the model. Fails on the first cell whose
    /// expressions cannot be resolved or parsed.
    pub fn compile(model: &Model) -> ModelResult<Self> {
        let unit = model.logical_unit();

        let mut external_reads = Vec::with_capacity(unit.external_cells.len());
        for external in &unit.external_cells {
            let source = external.source_var_name();
            let source_state_index = unit
                .state_index(&source)
                .ok_or(ModelError::UnknownStateVariable(source))?;
            external_reads.push(ExternalRead {
                var_name: external.var_name.clone(),
                relative_unit_row: external.relative_unit_row,
                relative_unit_col: external.relative_unit_col,
                source_state_index,
            });
        }

        let temp_names: Vec<String> = unit
            .cells
            .iter()
            .flat_map(|c| c.var_names().map(str::to_string))
            .collect();

        let names = NameTable {
            externals: external_reads
                .iter()
                .enumerate()
                .map(|(idx, e)| (e.var_name.clone(), idx))
                .collect(),
            temps: temp_names
                .iter()
                .enumerate()
                .map(|(idx, name)| (name.clone(), idx))
                .collect(),
            model,
        };

        let mut program = Self {
            width: model.width(),
            height: model.height(),
            iterations_per_update: model.iterations_per_update(),
            unit_state_size: unit.state_size(),
            state_var_names: unit.var_names().to_vec(),
            external_reads,
            temp_names,
            constant_staging: Vec::new(),
            constant_updates: Vec::new(),
            staging: Vec::new(),
            updates: Vec::new(),
        };

        for cell in &unit.cells {
            for (output_idx, output) in cell.outputs().iter().enumerate() {
                if let Some(before) = output.before_update.as_deref() {
                    let statements = names.staging(cell, output_idx, before)?;
                    if output.constant {
                        program.constant_staging.extend(statements);
                    } else {
                        program.staging.extend(statements);
                    }
                }
            }
        }
        for cell in &unit.cells {
            for (output_idx, output) in cell.outputs().iter().enumerate() {
                if let Some(expression) = output.update_expression.as_deref() {
                    let statement = names.update(cell, output_idx, expression)?;
                    if output.constant {
                        program.constant_updates.push(statement);
                    } else {
                        program.updates.push(statement);
                    }
                }
            }
        }

        debug!(
            externals = program.external_reads.len(),
            temps = program.temp_names.len(),
            constants = program.constant_updates.len(),
            staging = program.staging.len(),
            updates = program.updates.len(),
            "Compiled program"
        );
        Ok(program)
    }

    /// Every statement in execution order, constants first.
    pub fn statements(&self) -> impl Iterator<Item = (&str, &str)> {
        self.constant_staging
            .iter()
            .map(StagingStatement::parts)
            .chain(self.constant_updates.iter().map(UpdateStatement::parts))
            .chain(self.staging.iter().map(StagingStatement::parts))
            .chain(self.updates.iter().map(UpdateStatement::parts))
    }
}

impl StagingStatement {
    fn parts(&self) -> (&str, &str) {
        (self.target.as_str(), self.text.as_str())
    }
}

impl UpdateStatement {
    fn parts(&self) -> (&str, &str) {
        (self.target.as_str(), self.text.as_str())
    }
}

struct NameTable<'m> {
    externals: HashMap<String, usize>,
    temps: HashMap<String, usize>,
    model: &'m Model,
}

impl NameTable<'_> {
    fn lookup(&self, name: &str) -> Option<VarRef> {
        if let Some(idx) = self.model.logical_unit().state_index(name) {
            return Some(VarRef::State(idx));
        }
        if let Some(idx) = self.externals.get(name) {
            return Some(VarRef::External(*idx));
        }
        self.temps.get(name).map(|idx| VarRef::Temp(*idx))
    }

    fn lower(&self, cell: &CellInfo, expr: &crate::expr::Expr) -> ModelResult<Node> {
        expr.lower(&mut |name| self.lookup(name))
            .map_err(|err| expression_error(cell, err))
    }

    fn staging(
        &self,
        cell: &CellInfo,
        output: usize,
        text: &str,
    ) -> ModelResult<Vec<StagingStatement>> {
        let resolved = var_mapped_string(text, self.model.logical_unit(), cell, output)?;
        let assignments =
            parse_statements(&resolved).map_err(|err| expression_error(cell, err))?;
        assignments
            .into_iter()
            .map(|assignment| {
                if !cell.var_names().any(|v| v == assignment.target) {
                    return Err(ModelError::InvalidStagingTarget {
                        cell: cell.id.clone(),
                        target: assignment.target,
                    });
                }
                let temp = self.temps.get(&assignment.target).copied().ok_or_else(|| {
                    ModelError::UnknownStateVariable(assignment.target.clone())
                })?;
                let value = self.lower(cell, &assignment.value)?;
                Ok(StagingStatement {
                    cell_id: cell.id.clone(),
                    temp,
                    text: assignment.value.to_string(),
                    target: assignment.target,
                    value,
                })
            })
            .collect()
    }

    fn update(&self, cell: &CellInfo, output: usize, text: &str) -> ModelResult<UpdateStatement> {
        let resolved = var_mapped_string(text, self.model.logical_unit(), cell, output)?;
        let expr = parse_expr(&resolved).map_err(|err| expression_error(cell, err))?;
        let value = self.lower(cell, &expr)?;
        let target = cell
            .output_var_name(output)
            .map(str::to_string)
            .unwrap_or_default();
        let state_index = self
            .model
            .logical_unit()
            .state_index(&target)
            .ok_or_else(|| ModelError::UnknownStateVariable(target.clone()))?;
        Ok(UpdateStatement {
            cell_id: cell.id.clone(),
            state_index,
            target,
            text: resolved,
            value,
        })
    }
}

fn expression_error(cell: &CellInfo, err: ExprError) -> ModelError {
    match err {
        ExprError::UnknownIdentifier(ident) => ModelError::UnknownIdentifier {
            cell: cell.id.clone(),
            ident,
        },
        other => ModelError::expression(cell.id.clone(), other.to_string()),
    }
}
