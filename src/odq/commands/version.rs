use crate::client::{RpcClient, ServiceVersion, Uid};
use crate::commands::helpers::connection_failure;
use crate::commands::{CmdMessage, CmdResult, Command, Report};
use crate::config::{API_KEY_VAR, USERNAME_VAR};
use crate::error::Result;
use crate::transport::Connector;

#[derive(Debug, Clone, PartialEq)]
pub struct VersionReport {
    pub url: String,
    pub database: String,
    /// Absent when the service could not be reached.
    pub version: Option<ServiceVersion>,
    /// Present only when authentication succeeded.
    pub uid: Option<Uid>,
}

pub fn parse(_args: &[String]) -> Result<Option<Command>> {
    Ok(Some(Command::Version))
}

/// The connection target is always reported, even when the probe fails.
pub fn run<C: Connector>(client: &mut RpcClient<C>) -> Result<CmdResult> {
    let mut report = VersionReport {
        url: client.config().url.clone(),
        database: client.config().database.clone(),
        version: None,
        uid: None,
    };

    match client.version() {
        Ok(version) => report.version = Some(version),
        Err(err) => {
            let mut result = CmdResult::aborted(format!("Connection failed: {err}"));
            result.report = Some(Report::Version(report));
            return Ok(result);
        }
    }

    if client.connect() {
        report.uid = client.uid();
    }
    let authenticated = report.uid.is_some();

    let mut result = CmdResult::default().with_report(Report::Version(report));
    if !authenticated {
        result.add_message(CmdMessage::error(connection_failure(client)));
        result.add_message(CmdMessage::info(format!(
            "Check {USERNAME_VAR} and {API_KEY_VAR} for database '{}'",
            client.config().database
        )));
    }
    Ok(result)
}
