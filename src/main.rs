//! dupefind - concurrent duplicate file finder
//!
//! Entry point for the dupefind CLI.

use clap::Parser;
use dupefind::{
    cli::Cli,
    error::{ExitCode, StructuredError},
};

fn main() {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match dupefind::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::for_error(&err);

            let structured = json_errors
                .then(|| serde_json::to_string_pretty(&StructuredError::new(&err, exit_code)).ok())
                .flatten();
            match structured {
                Some(json) => eprintln!("{json}"),
                None => eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err),
            }

            std::process::exit(exit_code.as_i32());
        }
    }
}
