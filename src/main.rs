// verify-release - Main entry point
use clap::Parser;
use std::process;
use verify_release::cli::Cli;

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.run() {
        Ok(code) => code,
        Err(e) => {
            cli.report_failure(&e);
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
