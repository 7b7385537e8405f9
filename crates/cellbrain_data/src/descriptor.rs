use serde::{Deserialize, Serialize};

/// Value type assumed when a descriptor does not name one.
pub const DEFAULT_VALUE_TYPE: &str = "int";

/// Top-level description of a cellular automaton.
///
/// The automaton is a `width x height` grid of identical logical units.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CellularAutomatonDescriptor {
    pub width: usize,
    pub height: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations_per_update: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default)]
    pub cell_types: Vec<CellType>,
    pub logical_unit: LogicalUnit,
}

impl CellularAutomatonDescriptor {
    #[must_use]
    pub fn iterations_per_update(&self) -> usize {
        self.iterations_per_update.unwrap_or(1)
    }

    #[must_use]
    pub fn value_type(&self) -> &str {
        self.value_type.as_deref().unwrap_or(DEFAULT_VALUE_TYPE)
    }

    /// Number of logical units in the automaton grid.
    #[must_use]
    pub fn logical_unit_count(&self) -> usize {
        self.width * self.height
    }

    #[must_use]
    pub fn cell_type(&self, id: &str) -> Option<&CellType> {
        self.cell_types.iter().find(|t| t.id == id)
    }
}

/// A reusable cell rule template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CellType {
    pub id: String,
    #[serde(default)]
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub vars: Vec<Var>,
}

impl CellType {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn output(&self, id: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.id.eq_ignore_ascii_case(id))
    }
}

/// One output of a cell type.
///
/// The id may name several outputs at once (`"{1,2,3}"`); the model builder
/// expands every digit group into its own output.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_update: Option<String>,
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub params: Vec<Param>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub id: String,
}

/// Per-tick temporary, not part of the persisted state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub id: String,
}

/// A cell instance inside the logical unit matrix.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub cell_type: String,
    /// Restricts the cell to a subset of its type's outputs, e.g. `"1,3"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

/// Number of neighbors each cell is wired to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NeighborConnections {
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[default]
    #[serde(rename = "8")]
    Eight,
}

impl NeighborConnections {
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Three => 3,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogicalUnit {
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbor_connections: Option<NeighborConnections>,
}

impl LogicalUnit {
    #[must_use]
    pub fn neighbor_connections(&self) -> NeighborConnections {
        self.neighbor_connections.unwrap_or_default()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Width of the first row; the model builder rejects ragged matrices.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.cells.len())
    }
}
