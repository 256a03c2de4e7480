mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, discover, interfaces};
use terminal::{logging, print};
use whodis_common::error;

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();

    let machine_output = matches!(&commands.command, Commands::Discover(args) if args.json);
    if let Err(e) = logging::init(commands.quiet || machine_output, machine_output) {
        eprintln!("failed to initialize logging: {e:#}");
    }

    print::banner(commands.quiet || machine_output);

    let result = match commands.command {
        Commands::Discover(args) => discover::discover(args, commands.quiet).await,
        Commands::Interfaces { target } => {
            print::header("network interfaces", commands.quiet);
            interfaces::interfaces(target)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
