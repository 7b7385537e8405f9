use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use cellbrain_core::analysis::{analyze, Analysis};
use cellbrain_core::automaton::{share, SharedSimulator, SimulatorCellularAutomaton};
use cellbrain_core::config::AppConfig;
use cellbrain_core::metrics::Metrics;
use cellbrain_core::simulator::InterpretedSimulator;
use cellbrain_core::{Model, SimulatorFactory};
use cellbrain_data::{
    new_cellular_automaton, toggle_cell_type, CellularAutomatonDescriptor, NeighborConnections,
};

/// Loads `config.toml`, falling back to defaults when the file is missing
/// or invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> AppConfig {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(content) => match AppConfig::from_toml(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                AppConfig::default()
            }
        },
        Err(_) => {
            warn!(path = %path.display(), "Config not found, using defaults");
            AppConfig::default()
        }
    }
}

/// A 2x2 unit of four-output toggle cells tiled over a 4x4 grid.
#[must_use]
pub fn demo_descriptor() -> CellularAutomatonDescriptor {
    let mut descriptor = new_cellular_automaton(4, 4, toggle_cell_type(4), 2, 2);
    descriptor.logical_unit.neighbor_connections = Some(NeighborConnections::Four);
    descriptor
}

/// Runs a single automaton of `model` from the zero state until its
/// outputs repeat or `max_ticks` updates pass.
pub fn analyze_model(model: Model, max_ticks: usize) -> anyhow::Result<Analysis> {
    let model = Arc::new(model);
    let simulator = InterpretedSimulator::new(&model, 1, 0, 0)
        .context("Failed to compile model for analysis")?;
    let mut automaton = SimulatorCellularAutomaton::new(share(Box::new(simulator)), model)?;
    let analysis = analyze(&mut automaton, max_ticks)?;
    info!(
        cycle = ?analysis.cycle,
        states = analysis.states,
        average_state_difference = analysis.average_state_difference,
        "Analyzed automaton"
    );
    automaton.release()?;
    Ok(analysis)
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub automata: usize,
    pub mean_tick_us: u64,
    /// Sum of the last mapped outputs of every automaton.
    pub output_checksum: i64,
}

/// Drives every entity's automaton through one shared simulator.
pub struct Runner {
    model: Arc<Model>,
    simulator: SharedSimulator,
    automata: Vec<SimulatorCellularAutomaton>,
    metrics: Metrics,
    ticks: u64,
}

impl Runner {
    pub fn new(model: Model, config: &AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let model = Arc::new(model);
        let simulator = share(
            SimulatorFactory::create(&config.simulator, &model)
                .context("creating simulator")?,
        );

        let mut rng = ChaCha8Rng::seed_from_u64(config.simulator.seed);
        let mut automata = Vec::with_capacity(config.run.entities);
        for _ in 0..config.run.entities {
            let mut automaton =
                SimulatorCellularAutomaton::new(Rc::clone(&simulator), Arc::clone(&model))?;
            map_outputs(&mut automaton)?;
            let state: Vec<i32> = (0..model.cell_output_state_size())
                .map(|_| rng.gen())
                .collect();
            automaton.set_state(&state)?;
            automata.push(automaton);
        }

        info!(
            automata = automata.len(),
            state_size = model.state_size(),
            ticks = config.run.ticks,
            "Runner ready"
        );
        Ok(Self {
            model,
            simulator,
            automata,
            metrics: Metrics::new(config.run.log_interval),
            ticks: config.run.ticks,
        })
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[must_use]
    pub fn automata(&self) -> &[SimulatorCellularAutomaton] {
        &self.automata
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Advances every automaton by one simulator update.
    pub fn tick(&mut self) -> anyhow::Result<()> {
        let start = Instant::now();
        for automaton in &mut self.automata {
            automaton.update_inputs()?;
            automaton.push_state()?;
        }
        self.simulator.borrow_mut().update()?;
        for automaton in &mut self.automata {
            automaton.pull_state()?;
            automaton.refresh_outputs()?;
        }
        self.metrics.record_tick(start.elapsed(), self.automata.len());
        Ok(())
    }

    pub fn run(&mut self) -> anyhow::Result<RunSummary> {
        for _ in 0..self.ticks {
            self.tick()?;
        }
        let summary = RunSummary {
            ticks: self.metrics.tick_count(),
            automata: self.automata.len(),
            mean_tick_us: self.metrics.mean_tick_time().as_micros() as u64,
            output_checksum: self.output_checksum(),
        };
        info!(?summary, "Run finished");
        Ok(summary)
    }

    fn output_checksum(&self) -> i64 {
        self.automata
            .iter()
            .flat_map(|a| a.output_values())
            .map(|&v| i64::from(v))
            .sum()
    }

    /// Releases every slot back to the simulator.
    pub fn close(self) -> anyhow::Result<()> {
        for automaton in self.automata {
            automaton.release()?;
        }
        self.simulator.borrow_mut().close()?;
        Ok(())
    }
}

/// Maps cell outputs in row-major order until the output array is full.
fn map_outputs(automaton: &mut SimulatorCellularAutomaton) -> anyhow::Result<()> {
    let capacity = automaton.output_values().len();
    let mut mapped = 0;
    'cells: for row in 0..automaton.height() {
        for col in 0..automaton.width() {
            let outputs = automaton.cell(row, col)?.output_count();
            for output in 0..outputs {
                if mapped == capacity {
                    break 'cells;
                }
                automaton.add_output_to_output_map(row, col, output)?;
                mapped += 1;
            }
        }
    }
    debug!(slot = automaton.slot(), mapped, "Mapped automaton outputs");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellbrain_core::simulator::{SimulatorConfig, SimulatorKind};

    fn config(kind: SimulatorKind, entities: usize, ticks: u64) -> AppConfig {
        let mut config = AppConfig::default();
        config.simulator = SimulatorConfig {
            num_automata: entities,
            output_size: 2,
            kind,
            ..SimulatorConfig::default()
        };
        config.run.entities = entities;
        config.run.ticks = ticks;
        config.run.log_interval = 0;
        config
    }

    #[test]
    fn test_toggle_run_is_periodic() {
        let model = Model::build(&demo_descriptor()).unwrap();
        let mut runner = Runner::new(model, &config(SimulatorKind::Interpreted, 3, 2)).unwrap();
        let before: Vec<Vec<i32>> = runner.automata().iter().map(|a| a.state().to_vec()).collect();
        let summary = runner.run().unwrap();
        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.automata, 3);
        let after: Vec<Vec<i32>> = runner.automata().iter().map(|a| a.state().to_vec()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_noop_run_zeroes_mapped_outputs() {
        let model = Model::build(&demo_descriptor()).unwrap();
        let mut runner = Runner::new(model, &config(SimulatorKind::NoOp, 2, 3)).unwrap();
        let before = runner.automata()[1].state().to_vec();
        let summary = runner.run().unwrap();
        assert_eq!(summary.output_checksum, 0);
        // Only the two mapped outputs are overwritten with the zero outputs.
        let mapped: Vec<usize> = ["cell_1_out1", "cell_1_out2"]
            .iter()
            .map(|name| runner.model().state_index(name, 0).unwrap())
            .collect();
        let after = runner.automata()[1].state();
        for (index, (&a, &b)) in after.iter().zip(&before).enumerate() {
            if mapped.contains(&index) {
                assert_eq!(a, 0);
            } else {
                assert_eq!(a, b);
            }
        }
        runner.close().unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let model = Model::build(&demo_descriptor()).unwrap();
        let mut config = config(SimulatorKind::Interpreted, 1, 1);
        config.run.entities = 5;
        assert!(Runner::new(model, &config).is_err());
    }

    #[test]
    fn test_demo_model_analysis_finds_toggle_cycle() {
        let analysis = analyze_model(Model::build(&demo_descriptor()).unwrap(), 8).unwrap();
        assert_eq!(analysis.cycle.map(|c| (c.start, c.length)), Some((0, 2)));
        assert_eq!(analysis.states, 3);
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let config = load_config("/nonexistent/cellbrain/config.toml");
        assert_eq!(config, AppConfig::default());
    }
}
