use anyhow::Result;
use clap::Parser;
use tracing::info;

use cellbrain_core::codegen::{KernelGenerator, SimulationGenerator};
use cellbrain_core::metrics::init_logging;
use cellbrain_core::{Model, SimulatorKind};
use cellbrain_lib::{demo_descriptor, load_config, Runner};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Descriptor JSON file; a built-in toggle automaton when absent
    #[arg(short, long)]
    descriptor: Option<String>,

    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Number of ticks, overriding the config
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Simulator backend, overriding the config
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Print the generated kernel source and exit
    #[arg(long)]
    kernel: bool,

    /// Run one automaton until its outputs repeat, up to this many ticks,
    /// and print the cycle analysis
    #[arg(long, value_name = "MAX_TICKS")]
    analyze: Option<usize>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Interpreted,
    Noop,
    Random,
}

impl From<Mode> for SimulatorKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Interpreted => SimulatorKind::Interpreted,
            Mode::Noop => SimulatorKind::NoOp,
            Mode::Random => SimulatorKind::Random,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let model = match &args.descriptor {
        Some(path) => cellbrain_io::load_model(path)?,
        None => Model::build(&demo_descriptor())?,
    };

    if args.kernel {
        print!("{}", KernelGenerator::new(&model)?.generate_string()?);
        return Ok(());
    }

    if let Some(max_ticks) = args.analyze {
        let analysis = cellbrain_lib::analyze_model(model, max_ticks)?;
        println!("{}", serde_json::to_string(&analysis)?);
        return Ok(());
    }

    let mut config = load_config(&args.config);
    if let Some(ticks) = args.ticks {
        config.run.ticks = ticks;
    }
    if let Some(mode) = args.mode {
        config.simulator.kind = mode.into();
    }

    info!(
        units = model.logical_unit_count(),
        state_size = model.state_size(),
        kind = ?config.simulator.kind,
        "Running in HEADLESS mode"
    );
    let mut runner = Runner::new(model, &config)?;
    let summary = runner.run()?;
    println!("{}", serde_json::to_string(&summary)?);
    runner.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing_defaults() {
        let args = Args::parse_from(["cellbrain"]);
        assert_eq!(args.config, "config.toml");
        assert!(args.descriptor.is_none());
        assert!(args.mode.is_none());
        assert!(!args.kernel);
        assert!(args.analyze.is_none());
    }

    #[test]
    fn test_args_parsing_custom() {
        let args = Args::parse_from([
            "cellbrain", "-d", "ant.json", "--ticks", "50", "--mode", "noop",
        ]);
        assert_eq!(args.descriptor.as_deref(), Some("ant.json"));
        assert_eq!(args.ticks, Some(50));
        assert_eq!(Args::parse_from(["cellbrain", "--analyze", "64"]).analyze, Some(64));
        assert_eq!(args.mode, Some(Mode::Noop));
        assert_eq!(SimulatorKind::from(Mode::Noop), SimulatorKind::NoOp);
    }
}
