//! # CLI Dispatch
//!
//! Two states: with no command the help text is printed and nothing else
//! happens (no configuration is read, no client is built). Otherwise the
//! command is looked up, its arguments parsed, and only then is a client
//! built from the environment and the command run.
//!
//! Exit status is 0 for results, help, usage and unknown-command messages,
//! and 1 when the command could not connect or an error propagated (the
//! latter is reported by `main`).

use super::render::{render_help, render_result, render_unknown, render_usage};
use super::setup::Cli;
use clap::Parser;
use odq::client::RpcClient;
use odq::commands::{self, Command, Invocation};
use odq::config::ConnectionConfig;
use odq::error::Result;
use tracing::debug;

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let Some(name) = cli.command else {
        print!("{}", render_help());
        return Ok(());
    };

    match commands::parse(&name, &cli.args)? {
        Invocation::Unknown(name) => {
            print!("{}", render_unknown(&name, &commands::names()));
            Ok(())
        }
        Invocation::Usage(spec) => {
            print!("{}", render_usage(spec));
            Ok(())
        }
        Invocation::Run(Command::Help) => {
            print!("{}", render_help());
            Ok(())
        }
        Invocation::Run(command) => {
            let config = ConnectionConfig::from_env();
            debug!(?config, "resolved configuration");

            let mut client = RpcClient::from_config(&config);
            let result = commands::run(&mut client, command)?;
            print!("{}", render_result(&result));

            if result.aborted {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
