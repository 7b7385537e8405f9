//! Cycle and activity analysis of an automaton's output history.
//!
//! Only the cell output prefix of the state is tracked; params are
//! constant between ticks and never distinguish two states.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::automaton::SimulatorCellularAutomaton;
use crate::error::Result;
use crate::model::Model;

/// A repeating stretch of the history: the state recorded at
/// `start + length` equals the one at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cycle {
    pub start: usize,
    pub length: usize,
}

/// Summary of an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub cycle: Option<Cycle>,
    /// Number of states recorded, including the initial one.
    pub states: usize,
    pub average_state_difference: u64,
    pub average_set_bit_count: u64,
}

/// Records successive states until the first repeat.
#[derive(Debug, Clone)]
pub struct Analyzer {
    output_state_size: usize,
    history: Vec<Vec<i32>>,
    seen: HashMap<Vec<i32>, usize>,
    cycle: Option<Cycle>,
}

impl Analyzer {
    #[must_use]
    pub fn new(model: &Model) -> Self {
        Self::with_output_state_size(model.cell_output_state_size())
    }

    #[must_use]
    pub fn with_output_state_size(output_state_size: usize) -> Self {
        Self {
            output_state_size,
            history: Vec::new(),
            seen: HashMap::new(),
            cycle: None,
        }
    }

    /// Records the next state. Once a cycle is found further states are
    /// ignored and the cycle is returned.
    pub fn record(&mut self, state: &[i32]) -> Option<Cycle> {
        if self.cycle.is_some() {
            return self.cycle;
        }
        let outputs = state[..self.output_state_size.min(state.len())].to_vec();
        let index = self.history.len();
        self.history.push(outputs.clone());
        if let Some(&start) = self.seen.get(&outputs) {
            let cycle = Cycle {
                start,
                length: index - start,
            };
            debug!(start, length = cycle.length, "Detected cycle");
            self.cycle = Some(cycle);
        } else {
            self.seen.insert(outputs, index);
        }
        self.cycle
    }

    #[must_use]
    pub fn cycle(&self) -> Option<Cycle> {
        self.cycle
    }

    #[must_use]
    pub fn states(&self) -> usize {
        self.history.len()
    }

    /// States the averages run over: the cycle including its closing
    /// repeat, or the whole history when no cycle was found.
    fn window(&self) -> &[Vec<i32>] {
        match self.cycle {
            Some(Cycle { start, length }) => &self.history[start..=start + length],
            None => &self.history,
        }
    }

    /// Mean number of differing bits between consecutive states.
    ///
    /// Over a cycle the sum is divided by the cycle length; without one it
    /// is divided by the number of recorded states.
    #[must_use]
    pub fn average_state_difference(&self) -> u64 {
        let window = self.window();
        let total: u64 = window
            .windows(2)
            .map(|pair| difference_in_bits(&pair[0], &pair[1]))
            .sum();
        let divisor = match self.cycle {
            Some(cycle) => cycle.length,
            None => window.len(),
        };
        if divisor == 0 {
            0
        } else {
            total / divisor as u64
        }
    }

    /// Mean number of set bits per state.
    #[must_use]
    pub fn average_set_bit_count(&self) -> u64 {
        let window = self.window();
        if window.is_empty() {
            return 0;
        }
        let total: u64 = window.iter().map(|state| set_bit_count(state)).sum();
        total / window.len() as u64
    }

    #[must_use]
    pub fn analysis(&self) -> Analysis {
        Analysis {
            cycle: self.cycle,
            states: self.states(),
            average_state_difference: self.average_state_difference(),
            average_set_bit_count: self.average_set_bit_count(),
        }
    }
}

/// Updates `automaton` until its outputs repeat or `max_ticks` updates ran.
///
/// The state before the first update is recorded as state 0.
pub fn analyze(automaton: &mut SimulatorCellularAutomaton, max_ticks: usize) -> Result<Analysis> {
    let mut analyzer = Analyzer::new(automaton.model());
    analyzer.record(automaton.state());
    for _ in 0..max_ticks {
        automaton.update()?;
        if analyzer.record(automaton.state()).is_some() {
            break;
        }
    }
    Ok(analyzer.analysis())
}

#[must_use]
pub fn set_bit_count(values: &[i32]) -> u64 {
    values.iter().map(|v| u64::from(v.count_ones())).sum()
}

/// Number of differing bits between two states of equal length.
#[must_use]
pub fn difference_in_bits(a: &[i32], b: &[i32]) -> u64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| u64::from((x ^ y).count_ones()))
        .sum()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::automaton::share;
    use crate::simulator::InterpretedSimulator;
    use cellbrain_data::{
        new_cellular_automaton, new_output, new_param, toggle_cell_type, CellType,
        NeighborConnections,
    };

    fn automaton(cell_type: CellType, width: usize) -> SimulatorCellularAutomaton {
        let mut descriptor = new_cellular_automaton(width, 1, cell_type, 1, 1);
        descriptor.logical_unit.neighbor_connections = Some(NeighborConnections::Four);
        let model = Arc::new(Model::build(&descriptor).unwrap());
        let sim = InterpretedSimulator::new(&model, 1, 1, 1).unwrap();
        SimulatorCellularAutomaton::new(share(Box::new(sim)), model).unwrap()
    }

    #[test]
    fn test_toggle_cycles_every_two_ticks() {
        let mut automaton = automaton(toggle_cell_type(1), 2);
        let analysis = analyze(&mut automaton, 10).unwrap();
        assert_eq!(analysis.cycle, Some(Cycle { start: 0, length: 2 }));
        assert_eq!(analysis.states, 3);
        // Both cells flip all 32 bits each tick.
        assert_eq!(analysis.average_state_difference, 64);
        assert_eq!(analysis.average_set_bit_count, 64 / 3);
    }

    #[test]
    fn test_constant_cell_cycles_immediately() {
        let mut hold = CellType::new("hold");
        hold.outputs.push(new_output("1", "{output1}", &[]));
        let mut automaton = automaton(hold, 1);
        automaton.set_state(&[0x0F]).unwrap();
        let analysis = analyze(&mut automaton, 10).unwrap();
        assert_eq!(analysis.cycle, Some(Cycle { start: 0, length: 1 }));
        assert_eq!(analysis.average_state_difference, 0);
        assert_eq!(analysis.average_set_bit_count, 4);
    }

    #[test]
    fn test_params_are_ignored() {
        let mut cell_type = CellType::new("param");
        cell_type.params.push(new_param("p"));
        cell_type.outputs.push(new_output("1", "{output1}", &[]));
        let mut descriptor = new_cellular_automaton(1, 1, cell_type, 1, 1);
        descriptor.logical_unit.neighbor_connections = Some(NeighborConnections::Four);
        let model = Model::build(&descriptor).unwrap();
        let mut analyzer = Analyzer::new(&model);
        assert_eq!(analyzer.record(&[5, 1]), None);
        assert_eq!(analyzer.record(&[5, 2]), Some(Cycle { start: 0, length: 1 }));
    }

    #[test]
    fn test_no_cycle_averages_whole_history() {
        let mut analyzer = Analyzer::with_output_state_size(1);
        for value in [0, 1, 3, 7] {
            assert_eq!(analyzer.record(&[value]), None);
        }
        // Three single-bit steps over four states.
        assert_eq!(analyzer.average_state_difference(), 0);
        assert_eq!(analyzer.average_set_bit_count(), 6 / 4);
        assert_eq!(analyzer.analysis().cycle, None);
    }

    #[test]
    fn test_states_after_cycle_are_ignored() {
        let mut analyzer = Analyzer::with_output_state_size(1);
        analyzer.record(&[1]);
        analyzer.record(&[2]);
        let cycle = analyzer.record(&[1]);
        assert_eq!(cycle, Some(Cycle { start: 0, length: 2 }));
        assert_eq!(analyzer.record(&[9]), cycle);
        assert_eq!(analyzer.states(), 3);
    }

    #[test]
    fn test_bit_counts() {
        assert_eq!(set_bit_count(&[0, -1, 0b1011]), 35);
        assert_eq!(difference_in_bits(&[0, 5], &[-1, 4]), 33);
    }
}
