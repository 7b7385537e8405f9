//! # Cellbrain Core
//!
//! Compiles cellular automaton descriptors into flat, index-addressed
//! simulation models and runs many automata side by side.
//!
//! This crate contains:
//! - Neighbor wiring for 3, 4 and 8 connected logical units
//! - The model builder and its state-index layout
//! - The expression language, program IR and kernel source generator
//! - Simulators, slot allocation and the composite and bitwise adapters
//! - The per-entity façade over one simulator slot
//! - Cycle and activity analysis
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use cellbrain_core::automaton::{share, SimulatorCellularAutomaton};
//! use cellbrain_core::model::Model;
//! use cellbrain_core::simulator::InterpretedSimulator;
//! use cellbrain_data::{new_cellular_automaton, toggle_cell_type, NeighborConnections};
//!
//! let mut descriptor = new_cellular_automaton(1, 1, toggle_cell_type(1), 1, 1);
//! descriptor.logical_unit.neighbor_connections = Some(NeighborConnections::Four);
//! let model = Arc::new(Model::build(&descriptor).unwrap());
//!
//! let simulator = InterpretedSimulator::new(&model, 1, 1, 1).unwrap();
//! let mut automaton = SimulatorCellularAutomaton::new(share(Box::new(simulator)), model).unwrap();
//! automaton.update().unwrap();
//! assert_eq!(automaton.cell(0, 0).unwrap().output(0).unwrap(), !0);
//! ```

/// Cycle detection and bit activity of an automaton's history
pub mod analysis;
/// Per-entity façade over one simulator slot
pub mod automaton;
/// Kernel source generation and the compiled program IR
pub mod codegen;
/// Runner configuration loaded from `config.toml`
pub mod config;
/// Neighbor wiring of the logical unit
pub mod connection;
/// Error types
pub mod error;
/// Expression language of cell update rules
pub mod expr;
/// Tick metrics and logging setup
pub mod metrics;
/// Simulation model and its builder
pub mod model;
/// Simulators, allocation and adapters
pub mod simulator;
/// Name-addressed state construction
pub mod state;

pub use automaton::{share, SharedSimulator, SimulatorCellularAutomaton};
pub use codegen::{KernelGenerator, Program, SimulationGenerator};
pub use error::{ModelError, ModelResult, Result, SimulatorError};
pub use model::{Model, ModelBuilder};
pub use simulator::{Simulator, SimulatorConfig, SimulatorFactory, SimulatorKind};
pub use state::StateBuilder;
