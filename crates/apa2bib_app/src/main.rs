mod platform;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = platform::cli::Cli::parse();
    match platform::run_app(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("apa2bib: {err:#}");
            ExitCode::FAILURE
        }
    }
}
