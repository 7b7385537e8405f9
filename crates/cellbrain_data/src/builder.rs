//! Helpers for assembling descriptors in code.
//!
//! Used by tests, benches and the demo binary; production descriptors are
//! normally read from JSON.

use crate::descriptor::{
    Cell, CellType, CellularAutomatonDescriptor, LogicalUnit, NeighborConnections, Output, Param,
    Row, Var,
};

pub const INPUT_TYPE: &str = "input";
pub const ROUTING_TYPE: &str = "routing3in3out";
pub const TOGGLE_TYPE: &str = "toggle";

/// Creates a descriptor whose logical unit is a `unit_rows x unit_cols`
/// matrix of cells of one type.
#[must_use]
pub fn new_cellular_automaton(
    width: usize,
    height: usize,
    cell_type: CellType,
    unit_rows: usize,
    unit_cols: usize,
) -> CellularAutomatonDescriptor {
    let type_id = cell_type.id.clone();
    let rows = (0..unit_rows)
        .map(|_| Row {
            cells: (0..unit_cols).map(|_| new_cell(&type_id)).collect(),
        })
        .collect();
    CellularAutomatonDescriptor {
        width,
        height,
        iterations_per_update: None,
        value_type: None,
        cell_types: vec![cell_type],
        logical_unit: LogicalUnit {
            rows,
            neighbor_connections: None,
        },
    }
}

/// Creates an output with an update expression and the given output parameters.
#[must_use]
pub fn new_output(id: &str, expression: &str, param_ids: &[&str]) -> Output {
    Output {
        id: id.to_string(),
        update_expression: Some(expression.to_string()),
        before_update: None,
        constant: false,
        params: param_ids.iter().map(|p| new_param(p)).collect(),
    }
}

#[must_use]
pub fn new_param(id: &str) -> Param {
    Param { id: id.to_string() }
}

#[must_use]
pub fn new_var(id: &str) -> Var {
    Var { id: id.to_string() }
}

#[must_use]
pub fn new_cell(cell_type: &str) -> Cell {
    Cell {
        id: None,
        cell_type: cell_type.to_string(),
        outputs: None,
    }
}

/// A cell that copies one slot of the automaton input.
#[must_use]
pub fn input_cell_type() -> CellType {
    CellType {
        id: INPUT_TYPE.to_string(),
        outputs: vec![new_output(
            "1",
            "automatonInput[{idx} % automatonInputLength]",
            &["idx"],
        )],
        params: Vec::new(),
        vars: Vec::new(),
    }
}

/// A three-input three-output routing cell. Each output is the masked
/// combination of the two inputs it does not face.
#[must_use]
pub fn routing_cell_type() -> CellType {
    CellType {
        id: ROUTING_TYPE.to_string(),
        outputs: vec![
            new_output(
                "1",
                "({input2} & {input2Mask}) | ({input3} & {input3Mask})",
                &["input2Mask", "input3Mask"],
            ),
            new_output(
                "2",
                "({input1} & {input1Mask}) | ({input3} & {input3Mask})",
                &["input1Mask", "input3Mask"],
            ),
            new_output(
                "3",
                "({input1} & {input1Mask}) | ({input2} & {input2Mask})",
                &["input1Mask", "input2Mask"],
            ),
        ],
        params: Vec::new(),
        vars: Vec::new(),
    }
}

/// A cell whose outputs invert themselves every tick.
#[must_use]
pub fn toggle_cell_type(output_count: usize) -> CellType {
    CellType {
        id: TOGGLE_TYPE.to_string(),
        outputs: (1..=output_count)
            .map(|n| new_output(&n.to_string(), &format!("~{{output{n}}}"), &[]))
            .collect(),
        params: Vec::new(),
        vars: Vec::new(),
    }
}

/// Builds a [`LogicalUnit`] filled with one default cell type.
#[derive(Debug, Clone)]
pub struct LogicalUnitBuilder {
    width: usize,
    height: usize,
    neighbor_connections: NeighborConnections,
    default_cell_type: String,
}

impl Default for LogicalUnitBuilder {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            neighbor_connections: NeighborConnections::Four,
            default_cell_type: String::new(),
        }
    }
}

impl LogicalUnitBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    #[must_use]
    pub fn height(mut self, height: usize) -> Self {
        self.height = height;
        self
    }

    #[must_use]
    pub fn neighbor_connections(mut self, connections: NeighborConnections) -> Self {
        self.neighbor_connections = connections;
        self
    }

    #[must_use]
    pub fn default_cell_type(mut self, cell_type: &str) -> Self {
        self.default_cell_type = cell_type.to_string();
        self
    }

    #[must_use]
    pub fn build(self) -> LogicalUnit {
        let rows = (0..self.height)
            .map(|_| Row {
                cells: (0..self.width)
                    .map(|_| new_cell(&self.default_cell_type))
                    .collect(),
            })
            .collect();
        LogicalUnit {
            rows,
            neighbor_connections: Some(self.neighbor_connections),
        }
    }
}
