use crate::client::{RpcClient, SearchOptions};
use crate::commands::helpers::{domain_arg, non_empty, require_session, split_list};
use crate::commands::{CmdResult, Command, Report};
use crate::domain::Domain;
use crate::error::{OdqError, Result};
use crate::transport::Connector;
use crate::value::Record;

pub const DEFAULT_FIELDS: &[&str] = &["id", "name", "display_name"];
pub const DEFAULT_LIMIT: u32 = 10;

/// Records returned by `search` or `read`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordListing {
    pub model: String,
    pub records: Vec<Record>,
    /// Requested page size, for searches.
    pub limit: Option<u32>,
    /// Number of records matching the domain, for searches.
    pub total: Option<u64>,
}

pub fn parse(args: &[String]) -> Result<Option<Command>> {
    let Some(model) = non_empty(args.first()) else {
        return Ok(None);
    };
    let domain = domain_arg(args.get(1))?;
    let fields = match args.get(2).map(|t| split_list(t)) {
        Some(fields) if !fields.is_empty() => fields,
        _ => DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
    };
    let limit = match args.get(3) {
        Some(token) => token
            .trim()
            .parse::<u32>()
            .map_err(|_| OdqError::InvalidLimit(token.clone()))?,
        None => DEFAULT_LIMIT,
    };

    Ok(Some(Command::Search {
        model,
        domain,
        fields,
        limit,
    }))
}

pub fn run<C: Connector>(
    client: &mut RpcClient<C>,
    model: &str,
    domain: &Domain,
    fields: &[String],
    limit: u32,
) -> Result<CmdResult> {
    if let Err(aborted) = require_session(client) {
        return Ok(aborted);
    }

    let records = client.search_read(model, domain, Some(fields), SearchOptions::default().limit(limit))?;
    let total = client.count(model, domain)?;

    Ok(CmdResult::default().with_report(Report::Records(RecordListing {
        model: model.to_string(),
        records,
        limit: Some(limit),
        total: Some(total),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::fixtures;
    use crate::transport::Service;
    use crate::value::Value;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn listing(result: CmdResult) -> RecordListing {
        match result.report {
            Some(Report::Records(listing)) => listing,
            other => panic!("expected records, got {:?}", other),
        }
    }

    #[test]
    fn applies_defaults() {
        let command = parse(&args(&["res.partner"])).unwrap().unwrap();
        assert_eq!(
            command,
            Command::Search {
                model: "res.partner".into(),
                domain: Domain::all(),
                fields: vec!["id".into(), "name".into(), "display_name".into()],
                limit: DEFAULT_LIMIT,
            }
        );
    }

    #[test]
    fn parses_all_arguments() {
        let command = parse(&args(&["res.partner", "[('email', '!=', False)]", "name,email", "3"]))
            .unwrap()
            .unwrap();
        let Command::Search { domain, fields, limit, .. } = command else {
            panic!("expected search");
        };
        assert_eq!(domain.to_string(), "[['email', '!=', False]]");
        assert_eq!(fields, vec!["name", "email"]);
        assert_eq!(limit, 3);
    }

    #[test]
    fn rejects_bad_limit() {
        let err = parse(&args(&["res.partner", "[]", "name", "ten"])).unwrap_err();
        assert!(matches!(err, OdqError::InvalidLimit(_)));
    }

    #[test]
    fn rejects_limit_beyond_wire_range() {
        for token in ["18446744073709551615", "4294967296", "-1"] {
            let err = parse(&args(&["res.partner", "[]", "id", token])).unwrap_err();
            assert!(matches!(err, OdqError::InvalidLimit(t) if t == token));
        }
        let command = parse(&args(&["res.partner", "[]", "id", "4294967295"])).unwrap().unwrap();
        assert!(matches!(command, Command::Search { limit: u32::MAX, .. }));
    }

    #[test]
    fn reads_page_before_counting() {
        let service = fixtures::service();
        let mut client = RpcClient::new(&fixtures::config(), service.clone());
        run(&mut client, "res.partner", &Domain::all(), &["name".to_string()], 2).unwrap();

        let calls: Vec<_> = service
            .calls()
            .into_iter()
            .map(|c| (c.service, c.method, c.target))
            .collect();
        let target = |op: &str| Some(("res.partner".to_string(), op.to_string()));
        assert_eq!(
            calls,
            vec![
                (Service::Common, "authenticate".to_string(), None),
                (Service::Object, "execute_kw".to_string(), target("search_read")),
                (Service::Object, "execute_kw".to_string(), target("search_count")),
            ]
        );
    }

    #[test]
    fn total_agrees_with_unlimited_search() {
        let mut client = RpcClient::new(&fixtures::config(), fixtures::service());
        let domain = Domain::parse("[('email', '!=', None)]").unwrap();
        let fields = vec!["name".to_string(), "email".to_string()];

        let limited = listing(run(&mut client, "res.partner", &domain, &fields, 1).unwrap());
        assert_eq!(limited.records.len(), 1);
        assert_eq!(limited.total, Some(2));

        let full = listing(run(&mut client, "res.partner", &domain, &fields, 100).unwrap());
        assert_eq!(full.records.len() as u64, full.total.unwrap());
        assert!(full
            .records
            .iter()
            .all(|r| matches!(r.get("email"), Some(Value::String(_)))));
    }
}
