//! Error types for model construction and simulation.
//!
//! Model errors are configuration errors raised while building or compiling
//! a model; they always name the offending cell or placeholder. Simulator
//! errors cover slot bookkeeping and buffer contracts at runtime.

use thiserror::Error;

/// Errors raised while building a [`crate::model::Model`] or compiling its program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Parameter {param} is defined more than once for cell {cell}")]
    DuplicateParameter { cell: String, param: String },

    #[error("Variable {var} is defined more than once for cell {cell}")]
    DuplicateVariable { cell: String, var: String },

    #[error("State variable {0} is defined more than once")]
    DuplicateStateVariable(String),

    #[error("Cell {cell} references unknown cell type {cell_type}")]
    UnknownCellType { cell: String, cell_type: String },

    #[error("Cell id {0} is used more than once")]
    DuplicateCellId(String),

    #[error("Logical unit has no cells")]
    EmptyLogicalUnit,

    #[error("Logical unit row {row} has {found} cells, expected {expected}")]
    RaggedLogicalUnit {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid automaton grid size {width}x{height}")]
    InvalidGridSize { width: usize, height: usize },

    #[error("Cell {cell} of type {cell_type} has no outputs")]
    NoOutputs { cell: String, cell_type: String },

    #[error("Unable to process cell {cell}: Invalid parameter {placeholder}")]
    UnresolvedPlaceholder { cell: String, placeholder: String },

    #[error("Unable to process cell {cell}: {message}")]
    Expression { cell: String, message: String },

    #[error("Unable to process cell {cell}: {target} is not a variable of the cell")]
    InvalidStagingTarget { cell: String, target: String },

    #[error("Unable to process cell {cell}: unknown identifier {ident}")]
    UnknownIdentifier { cell: String, ident: String },

    #[error("Unsupported value type {0}")]
    UnsupportedValueType(String),

    #[error("Unknown state variable {0}")]
    UnknownStateVariable(String),
}

/// Errors raised by simulators, allocators and the per-entity façade.
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("No automata are available for allocation")]
    AllocatorExhausted,

    #[error("Automaton {0} is not allocated")]
    NotAllocated(usize),

    #[error("Automaton index {index} is out of range (size {size})")]
    SlotOutOfRange { index: usize, size: usize },

    #[error("{what} buffer too small: need {needed}, got {actual}")]
    BufferTooSmall {
        what: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("{what} map has {len} entries, maximum is {max}")]
    MapTooLarge {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Bits per entity must divide 32 and lie in [1, 31], got {0}")]
    InvalidBitsPerEntity(u32),

    #[error("A composite simulator needs at least one member")]
    EmptyComposite,

    #[error("An error occurred while closing a composite simulator: {}", .errors.first().map(ToString::to_string).unwrap_or_default())]
    Close { errors: Vec<SimulatorError> },

    #[error("Simulator update failed: {0}")]
    Update(String),

    #[error("The {0} map can no longer be modified")]
    MapFrozen(&'static str),

    #[error("Cell ({row}, {col}) is outside the {height}x{width} automaton")]
    CellOutOfRange {
        row: usize,
        col: usize,
        height: usize,
        width: usize,
    },

    #[error("Output index {index} is out of range for a cell with {count} outputs")]
    OutputOutOfRange { index: usize, count: usize },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, SimulatorError>;

/// Result type alias for model construction.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

impl ModelError {
    #[must_use]
    pub fn expression<C: Into<String>, M: Into<String>>(cell: C, message: M) -> Self {
        Self::Expression {
            cell: cell.into(),
            message: message.into(),
        }
    }
}

impl SimulatorError {
    #[must_use]
    pub fn buffer_too_small(what: &'static str, needed: usize, actual: usize) -> Self {
        Self::BufferTooSmall {
            what,
            needed,
            actual,
        }
    }

    #[must_use]
    pub fn update<S: Into<String>>(msg: S) -> Self {
        Self::Update(msg.into())
    }
}
