use clap::Parser;
use splitquant::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
