use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    BitwiseSimulator, CompositeSimulator, InterpretedSimulator, NoOpSimulator, RandomSimulator,
    Simulator,
};
use crate::codegen::Program;
use crate::error::Result;
use crate::model::Model;

/// Backend that advances the automata.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimulatorKind {
    #[default]
    Interpreted,
    #[serde(alias = "noop")]
    NoOp,
    Random,
}

/// Shape of the simulator stack built by [`SimulatorFactory`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Number of automata the stack must hold.
    pub num_automata: usize,
    pub input_size: usize,
    pub output_size: usize,
    pub kind: SimulatorKind,
    /// Seed of the random backend.
    pub seed: u64,
    /// Packs this many bits per automaton when set.
    pub bits_per_entity: Option<u32>,
    /// Splits the physical slots across this many member simulators.
    pub members: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            num_automata: 1,
            input_size: 1,
            output_size: 1,
            kind: SimulatorKind::Interpreted,
            seed: 0,
            bits_per_entity: None,
            members: 1,
        }
    }
}

pub struct SimulatorFactory;

impl SimulatorFactory {
    /// Builds `members` backends (wrapped in a composite when more than
    /// one), then a bitwise adapter on top when `bits_per_entity` is set.
    pub fn create(config: &SimulatorConfig, model: &Model) -> Result<Box<dyn Simulator>> {
        let lanes = config
            .bits_per_entity
            .filter(|&b| b > 0)
            .map_or(1, |b| (i32::BITS / b).max(1) as usize);
        let physical = config.num_automata.div_ceil(lanes);
        let members = config.members.max(1);
        let per_member = physical.div_ceil(members);

        let program = match config.kind {
            SimulatorKind::Interpreted => Some(std::sync::Arc::new(Program::compile(model)?)),
            SimulatorKind::NoOp | SimulatorKind::Random => None,
        };

        let mut simulators: Vec<Box<dyn Simulator>> = Vec::with_capacity(members);
        for member in 0..members {
            let simulator: Box<dyn Simulator> = match (&program, config.kind) {
                (Some(program), _) => Box::new(InterpretedSimulator::from_program(
                    std::sync::Arc::clone(program),
                    model.logical_unit_count(),
                    per_member,
                    config.input_size,
                    config.output_size,
                )),
                (None, SimulatorKind::Random) => Box::new(RandomSimulator::new(
                    per_member,
                    model.state_size(),
                    config.input_size,
                    config.output_size,
                    config.seed.wrapping_add(member as u64),
                )),
                (None, _) => Box::new(NoOpSimulator::new(
                    per_member,
                    model.state_size(),
                    config.input_size,
                    config.output_size,
                )),
            };
            simulators.push(simulator);
        }

        let mut simulator = if simulators.len() == 1 {
            simulators.remove(0)
        } else {
            Box::new(CompositeSimulator::new(simulators)?)
        };
        if let Some(bits) = config.bits_per_entity {
            simulator = Box::new(BitwiseSimulator::new(simulator, bits)?);
        }

        info!(
            kind = ?config.kind,
            size = simulator.size(),
            members,
            bits_per_entity = ?config.bits_per_entity,
            "Simulator ready"
        );
        Ok(simulator)
    }
}
