use crate::client::RpcClient;
use crate::commands::CmdResult;
use crate::domain::Domain;
use crate::error::{OdqError, Result};
use crate::transport::Connector;

/// Split a comma-separated token, dropping blanks.
pub fn split_list(token: &str) -> Vec<String> {
    token
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_ids(token: &str) -> Result<Vec<i64>> {
    token
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| OdqError::InvalidId(part.to_string()))
        })
        .collect()
}

/// Domain from an optional literal argument; absent means unrestricted.
pub fn domain_arg(token: Option<&String>) -> Result<Domain> {
    match token {
        Some(text) if !text.trim().is_empty() => Domain::parse(text),
        _ => Ok(Domain::all()),
    }
}

pub fn non_empty(token: Option<&String>) -> Option<String> {
    token
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Authenticate, or build the aborted result explaining why that failed.
pub fn require_session<C: Connector>(client: &mut RpcClient<C>) -> std::result::Result<(), CmdResult> {
    if client.connect() {
        return Ok(());
    }
    Err(CmdResult::aborted(connection_failure(client)))
}

pub fn connection_failure<C: Connector>(client: &RpcClient<C>) -> String {
    format!(
        "Connection failed: {}",
        client.last_failure().unwrap_or("unknown error")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_lists() {
        assert_eq!(split_list("name, email,,"), vec!["name", "email"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn parses_id_lists() {
        assert_eq!(parse_ids("1,2, 3").unwrap(), vec![1, 2, 3]);
        assert!(matches!(parse_ids("1,two"), Err(OdqError::InvalidId(id)) if id == "two"));
    }

    #[test]
    fn blank_domain_is_unrestricted() {
        assert!(domain_arg(None).unwrap().is_empty());
        assert!(domain_arg(Some(&" ".to_string())).unwrap().is_empty());
        assert_eq!(domain_arg(Some(&"[('id', '=', 1)]".to_string())).unwrap().terms().len(), 1);
    }
}
