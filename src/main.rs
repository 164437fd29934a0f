use std::collections::HashSet;
use std::path::PathBuf;

use clap::Parser;
use rust_op_registry::{
    OpError, OpRegistry, Place, ProgramValidator, ValidatorOptions, load_program_from_path,
    program_to_dot,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Validate operator programs against the op registry", long_about = None)]
struct Cli {
    /// Path to a JSON file describing a single-block program.
    program: Option<PathBuf>,
    /// Device the kernels are resolved for (`cpu`, `gpu` or `gpu:N`).
    #[arg(long, default_value = "cpu")]
    place: Place,
    /// Skip checking ops against their registered schemas.
    #[arg(long)]
    skip_schema: bool,
    /// Optional path to write a Graphviz DOT export of the program.
    #[arg(long)]
    export_dot: Option<PathBuf>,
    /// Print the backward op descriptors as JSON.
    #[arg(long)]
    backward: bool,
    /// Variables excluded from gradient computation.
    #[arg(long = "no-grad", value_delimiter = ',')]
    no_grad: Vec<String>,
    /// Print the schema of every registered operator.
    #[arg(long)]
    list_ops: bool,
}

fn run() -> Result<(), OpError> {
    let cli = Cli::parse();
    let registry = OpRegistry::with_defaults()?;

    if cli.list_ops {
        for op_type in registry.registered_ops() {
            match registry.proto(&op_type) {
                Some(proto) => println!("{}", proto.to_markdown()),
                None => println!("## {}\n\n(no schema)\n", op_type),
            }
        }
    }

    let Some(path) = cli.program else {
        return Ok(());
    };
    let program = load_program_from_path(&path)?;
    let options = ValidatorOptions {
        place: cli.place,
        check_schema: !cli.skip_schema,
    };
    let validator = ProgramValidator::new(&registry, options);
    let artifacts = validator.validate(&program)?;

    println!(
        "Validated program from `{}` with {} variables and {} ops.",
        path.display(),
        program.vars.len(),
        program.ops.len()
    );
    println!("Variables:");
    for (name, var) in artifacts.vars.iter() {
        println!("  - {}: {:?} {:?}", name, var.data_type, var.shape);
    }
    println!("Kernels:");
    for selection in &artifacts.kernel_keys {
        println!(
            "  - #{} {} -> {}",
            selection.op_index, selection.op_type, selection.key
        );
    }
    println!("In-place candidates:");
    for candidate in &artifacts.inplace_candidates {
        println!(
            "  - #{} {} -> {}",
            candidate.op_index, candidate.input, candidate.output
        );
    }

    if let Some(dot_path) = cli.export_dot {
        let dot = program_to_dot(&program);
        std::fs::write(&dot_path, dot).map_err(|err| OpError::export(dot_path.clone(), err))?;
        println!("Exported Graphviz DOT to `{}`.", dot_path.display());
    }

    if cli.backward {
        let no_grad: HashSet<String> = cli.no_grad.into_iter().collect();
        let grads = validator.grad_ops(&program, &no_grad)?;
        println!("{}", serde_json::to_string_pretty(&grads)?);
    }
    Ok(())
}

fn main() {
    rust_op_registry::debug::init_logging();
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
