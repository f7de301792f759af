use crate::client::{FieldDescriptor, RpcClient};
use crate::commands::helpers::{non_empty, require_session};
use crate::commands::{CmdResult, Command, Report};
use crate::error::Result;
use crate::transport::Connector;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldListing {
    pub model: String,
    /// Sorted by field name.
    pub fields: Vec<(String, FieldDescriptor)>,
}

pub fn parse(args: &[String]) -> Result<Option<Command>> {
    let Some(model) = non_empty(args.first()) else {
        return Ok(None);
    };
    Ok(Some(Command::Fields {
        model,
        filter: non_empty(args.get(1)),
    }))
}

pub fn run<C: Connector>(
    client: &mut RpcClient<C>,
    model: &str,
    filter: Option<&str>,
) -> Result<CmdResult> {
    if let Err(aborted) = require_session(client) {
        return Ok(aborted);
    }

    let needle = filter.map(str::to_lowercase);
    // fields_get answers with a BTreeMap, so iteration is already name-ordered.
    let fields = client
        .fields_get(model, None)?
        .into_iter()
        .filter(|(name, _)| {
            needle
                .as_ref()
                .map_or(true, |needle| name.to_lowercase().contains(needle))
        })
        .collect();

    Ok(CmdResult::default().with_report(Report::Fields(FieldListing {
        model: model.to_string(),
        fields,
    })))
}
