//! # Cellbrain Data
//!
//! Plain data types describing a cellular automaton brain, shared by the
//! model builder, the simulators and the I/O layer.
//!
//! A descriptor is a catalogue of cell types plus one logical unit: a small
//! matrix of cell instances that is tiled `width x height` times to form the
//! whole automaton.

/// Descriptor object graph (cell types, outputs, logical unit)
pub mod descriptor;
/// Helpers for assembling descriptors in code
pub mod builder;

pub use builder::{
    input_cell_type, new_cell, new_cellular_automaton, new_output, new_param, new_var,
    routing_cell_type, toggle_cell_type, LogicalUnitBuilder, INPUT_TYPE, ROUTING_TYPE, TOGGLE_TYPE,
};
pub use descriptor::{
    Cell, CellType, CellularAutomatonDescriptor, LogicalUnit, NeighborConnections, Output, Param,
    Row, Var, DEFAULT_VALUE_TYPE,
};
