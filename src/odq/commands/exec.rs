use crate::client::RpcClient;
use crate::commands::helpers::{non_empty, require_session};
use crate::commands::{CmdResult, Command, Report};
use crate::error::Result;
use crate::literal;
use crate::transport::Connector;
use crate::value::{Kwargs, Value};

pub fn parse(args: &[String]) -> Result<Option<Command>> {
    let (Some(model), Some(method)) = (non_empty(args.first()), non_empty(args.get(1))) else {
        return Ok(None);
    };
    let args = match args.get(2) {
        Some(text) => literal::parse_arguments(text)?,
        None => Vec::new(),
    };
    Ok(Some(Command::Exec {
        model,
        method,
        args,
    }))
}

pub fn run<C: Connector>(
    client: &mut RpcClient<C>,
    model: &str,
    method: &str,
    args: Vec<Value>,
) -> Result<CmdResult> {
    if let Err(aborted) = require_session(client) {
        return Ok(aborted);
    }

    let answer = client.execute(model, method, args, Kwargs::new())?;
    Ok(CmdResult::default().with_report(Report::Raw(answer)))
}
