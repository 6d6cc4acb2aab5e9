use clap::Parser;

use crate::{cli::Cli, shell::start_shell};

mod cli;
mod shell;

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    start_shell(&cli);
}
