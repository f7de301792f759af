use crate::client::RpcClient;
use crate::commands::helpers::{domain_arg, non_empty, require_session};
use crate::commands::{CmdResult, Command, Report};
use crate::domain::Domain;
use crate::error::Result;
use crate::transport::Connector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountReport {
    pub model: String,
    pub count: u64,
}

pub fn parse(args: &[String]) -> Result<Option<Command>> {
    let Some(model) = non_empty(args.first()) else {
        return Ok(None);
    };
    Ok(Some(Command::Count {
        model,
        domain: domain_arg(args.get(1))?,
    }))
}

pub fn run<C: Connector>(client: &mut RpcClient<C>, model: &str, domain: &Domain) -> Result<CmdResult> {
    if let Err(aborted) = require_session(client) {
        return Ok(aborted);
    }

    let count = client.count(model, domain)?;
    Ok(CmdResult::default().with_report(Report::Count(CountReport {
        model: model.to_string(),
        count,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SearchOptions;
    use crate::transport::memory::fixtures;

    fn count_of(result: CmdResult) -> u64 {
        match result.report {
            Some(Report::Count(report)) => report.count,
            other => panic!("expected count, got {:?}", other),
        }
    }

    #[test]
    fn counts_everything_by_default() {
        let mut client = RpcClient::new(&fixtures::config(), fixtures::service());
        let Some(Command::Count { domain, .. }) = parse(&["res.partner".to_string()]).unwrap() else {
            panic!("expected count");
        };
        assert_eq!(count_of(run(&mut client, "res.partner", &domain).unwrap()), 4);
    }

    #[test]
    fn count_equals_search_read_length() {
        let mut client = RpcClient::new(&fixtures::config(), fixtures::service());
        let domain = Domain::parse("[('email','!=',None)]").unwrap();

        let counted = count_of(run(&mut client, "res.partner", &domain).unwrap());
        let rows = client
            .search_read("res.partner", &domain, None, SearchOptions::default())
            .unwrap();
        assert_eq!(counted, rows.len() as u64);
        assert_eq!(counted, 2);
    }

    #[test]
    fn remote_fault_surfaces() {
        let mut client = RpcClient::new(&fixtures::config(), fixtures::service());
        let domain = Domain::all().with_clause("id", "~", 1);
        assert!(run(&mut client, "res.partner", &domain).is_err());
    }
}
