use std::fs;

use clap::Parser;
use cellbrain_core::codegen::{KernelGenerator, Program, SimulationGenerator};
use cellbrain_core::Model;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generates kernel source for a cellular automaton descriptor", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "brain.json")]
    input: String,

    /// Output file; standard output when absent.
    #[arg(short, long)]
    output: Option<String>,

    /// Print the resolved statements instead of kernel source.
    #[arg(long)]
    statements: bool,
}

fn render(model: &Model, statements: bool) -> anyhow::Result<String> {
    if statements {
        let program = Program::compile(model)?;
        let mut text = String::new();
        for (target, expression) in program.statements() {
            text.push_str(&format!("{target} = {expression};\n"));
        }
        return Ok(text);
    }
    Ok(KernelGenerator::new(model)?.generate_string()?)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let model = cellbrain_io::load_model(&args.input)?;
    let source = render(&model, args.statements)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &source)?;
            eprintln!(
                "Wrote {} bytes for {}x{} units of state size {} to {}",
                source.len(),
                model.width(),
                model.height(),
                model.logical_unit().state_size(),
                path
            );
        }
        None => print!("{source}"),
    }

    Ok(())
}
