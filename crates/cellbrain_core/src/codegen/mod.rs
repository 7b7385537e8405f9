//! Expression resolution and code generation.
//!
//! [`Program::compile`] resolves the placeholders of every output once and
//! parses the result into backend-neutral statements. The interpreted
//! simulator evaluates those statements directly; [`KernelGenerator`]
//! renders the same statements as compute-kernel source.

pub mod kernel;
pub mod program;
pub mod resolver;

pub use kernel::{KernelGenerator, SimulationGenerator, KERNEL_NAME, KERNEL_PRELUDE};
pub use program::{ExternalRead, Program, StagingStatement, UpdateStatement};
pub use resolver::var_mapped_string;
