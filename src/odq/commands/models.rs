use crate::client::{ModelInfo, RpcClient};
use crate::commands::helpers::{non_empty, require_session};
use crate::commands::{CmdResult, Command, Report};
use crate::error::Result;
use crate::transport::Connector;

/// Rows shown before the listing is cut short.
pub const DISPLAY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelListing {
    pub shown: Vec<ModelInfo>,
    /// Number of matching record types, including those not shown.
    pub total: usize,
}

impl ModelListing {
    pub fn hidden(&self) -> usize {
        self.total.saturating_sub(self.shown.len())
    }
}

pub fn parse(args: &[String]) -> Result<Option<Command>> {
    Ok(Some(Command::Models {
        filter: non_empty(args.first()),
    }))
}

pub fn run<C: Connector>(client: &mut RpcClient<C>, filter: Option<&str>) -> Result<CmdResult> {
    if let Err(aborted) = require_session(client) {
        return Ok(aborted);
    }

    let needle = filter.map(str::to_lowercase);
    let matching: Vec<ModelInfo> = client
        .get_models()?
        .into_iter()
        .filter(|m| match &needle {
            Some(needle) => {
                m.model.to_lowercase().contains(needle) || m.name.to_lowercase().contains(needle)
            }
            None => true,
        })
        .collect();

    let total = matching.len();
    let shown = matching.into_iter().take(DISPLAY_LIMIT).collect();
    Ok(CmdResult::default().with_report(Report::Models(ModelListing { shown, total })))
}
