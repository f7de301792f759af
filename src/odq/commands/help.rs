use crate::commands::{CmdResult, Command, Report};
use crate::error::Result;

pub fn parse(_args: &[String]) -> Result<Option<Command>> {
    Ok(Some(Command::Help))
}

/// Help needs no session; the CLI renders it from the dispatch table.
pub fn run() -> CmdResult {
    CmdResult::default().with_report(Report::Help)
}
