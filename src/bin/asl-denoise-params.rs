use asl_denoise::logging::init_tracing;
use asl_denoise::AslDenoiseParams;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
struct Args {
    /// path to the parameter file to write
    parameter_file: PathBuf,
    /// number of workers to record in the file instead of the detected core count
    #[arg(long)]
    max_workers: Option<usize>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let params = AslDenoiseParams { max_workers: args.max_workers, ..Default::default() };
    init_tracing(&params.log_filter);

    if let Err(e) = params.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    match params.to_file(&args.parameter_file) {
        Ok(filename) => {
            info!("wrote default parameter file to {}", filename.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("failed to write {}: {e}", args.parameter_file.display());
            ExitCode::FAILURE
        }
    }
}
