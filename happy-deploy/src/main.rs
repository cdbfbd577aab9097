use std::io;
use std::process::ExitCode;

use clap::Parser;
use happy_deploy::cli::{self, Args};
use happy_deploy::{config, logging};

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);
    let token = config::token_from_env();
    match cli::execute(&args, token, &mut io::stdout().lock()) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
