//! Raw state snapshots for persisting automata between runs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use cellbrain_core::SimulatorCellularAutomaton;

use crate::error::{IoError, Result};
use crate::serialization::{read_json_file, write_json_file};

/// State arrays of a set of automata, keyed by slot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct StateSnapshot {
    /// Per-automaton state length.
    pub state_size: usize,
    pub automata: Vec<AutomatonState>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AutomatonState {
    pub slot: usize,
    pub state: Vec<i32>,
}

impl StateSnapshot {
    /// Captures the local state of every automaton.
    #[must_use]
    pub fn capture<'a, I>(automata: I) -> Self
    where
        I: IntoIterator<Item = &'a SimulatorCellularAutomaton>,
    {
        let automata: Vec<AutomatonState> = automata
            .into_iter()
            .map(|a| AutomatonState {
                slot: a.slot(),
                state: a.state().to_vec(),
            })
            .collect();
        let state_size = automata.first().map_or(0, |a| a.state.len());
        Self {
            state_size,
            automata,
        }
    }

    /// Writes each captured state into the automaton bound to the same slot.
    /// Automata without a captured state are left untouched.
    pub fn restore<'a, I>(&self, automata: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a mut SimulatorCellularAutomaton>,
    {
        for automaton in automata {
            if let Some(saved) = self.automata.iter().find(|s| s.slot == automaton.slot()) {
                automaton
                    .set_state(&saved.state)
                    .map_err(|e| IoError::validation(e.to_string()))?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for automaton in &self.automata {
            if automaton.state.len() != self.state_size {
                return Err(IoError::validation(format!(
                    "Slot {} has {} state values, expected {}",
                    automaton.slot,
                    automaton.state.len(),
                    self.state_size
                )));
            }
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json_file(self, path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let snapshot: Self = read_json_file(path)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
