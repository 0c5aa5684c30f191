mod commands;
mod terminal;

use std::process::ExitCode;

use autodisco_common::run::RunStatus;
use commands::{CommandLine, Commands, scan};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let commands = CommandLine::parse_args();
    logging::init(commands.verbose);
    print::banner();

    let cfg = commands.config();
    let inventory = commands.inventory.as_deref();

    let status = match commands.command {
        Commands::Range { cidr, simulate } => {
            print::header("sweeping network");
            scan::range(&cidr, simulate, cfg, inventory).await?
        }
        Commands::Cisco {
            host,
            community,
            simulate,
        } => {
            print::header("walking switch");
            scan::cisco(&host, &community, simulate, cfg, inventory).await?
        }
    };

    print::end_of_program();
    Ok(match status {
        RunStatus::Success => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
