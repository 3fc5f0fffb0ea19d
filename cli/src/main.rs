mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{centers, records};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    match &cli.command {
        Commands::Centers(args) => centers::run(&cli, args),
        Commands::Records(args) => records::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
