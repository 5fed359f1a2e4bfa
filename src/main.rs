use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use flowsh::eval::Evaluator;
use flowsh::parse::parse_flow_file;

/// Interprets a flow file, materializing one named component's output
/// on standard output.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the flow file.
    flow_file: PathBuf,

    /// Name of the component to evaluate.
    component: String,

    /// Increase logging verbosity (-v for info, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let catalog = match parse_flow_file(&args.flow_file) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut evaluator = Evaluator::new(&catalog);
    match evaluator.evaluate(&args.component, &io::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}
