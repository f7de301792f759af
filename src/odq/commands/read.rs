use crate::client::RpcClient;
use crate::commands::helpers::{non_empty, parse_ids, require_session, split_list};
use crate::commands::search::RecordListing;
use crate::commands::{CmdResult, Command, Report};
use crate::error::{OdqError, Result};
use crate::transport::Connector;

pub fn parse(args: &[String]) -> Result<Option<Command>> {
    let (Some(model), Some(ids)) = (non_empty(args.first()), args.get(1)) else {
        return Ok(None);
    };
    let ids = parse_ids(ids)?;
    if ids.is_empty() {
        return Err(OdqError::InvalidId(args[1].clone()));
    }
    let fields = args
        .get(2)
        .map(|t| split_list(t))
        .filter(|fields| !fields.is_empty());

    Ok(Some(Command::Read { model, ids, fields }))
}

pub fn run<C: Connector>(
    client: &mut RpcClient<C>,
    model: &str,
    ids: &[i64],
    fields: Option<&[String]>,
) -> Result<CmdResult> {
    if let Err(aborted) = require_session(client) {
        return Ok(aborted);
    }

    let records = client.read(model, ids, fields)?;
    Ok(CmdResult::default().with_report(Report::Records(RecordListing {
        model: model.to_string(),
        records,
        limit: None,
        total: None,
    })))
}
