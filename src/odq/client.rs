//! # RPC Client
//!
//! `RpcClient` owns one session against the remote service. It authenticates
//! lazily, at most once, and opens each endpoint handle the first time it is
//! needed. After that every call reuses the cached uid and handles.
//!
//! The single generic entry point is [`RpcClient::execute`]: any method on any
//! record type, with positional and keyword arguments, returning the raw
//! [`Value`]. The typed helpers (`search`, `read`, `fields_get`, ...) are thin
//! wrappers that build the arguments and check the shape of the answer.

use crate::config::ConnectionConfig;
use crate::domain::Domain;
use crate::error::{OdqError, Result};
use crate::transport::http::HttpConnector;
use crate::transport::{Connector, Endpoint, Service};
use crate::value::{Kwargs, Record, Value};
use once_cell::unsync::OnceCell;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Attributes requested from `fields_get` when the caller names none.
pub const DEFAULT_FIELD_ATTRIBUTES: &[&str] = &["string", "type", "required", "readonly", "relation"];

const MODEL_REGISTRY: &str = "ir.model";

/// Numeric identity of the authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Uid(pub i64);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Unconnected,
    Connected(Uid),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceVersion {
    pub server_version: String,
    pub server_serie: String,
    pub protocol_version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub model: String,
    pub name: String,
}

/// Schema metadata for one field, kept exactly as the service sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    attributes: BTreeMap<String, Value>,
}

impl FieldDescriptor {
    pub fn new(attributes: BTreeMap<String, Value>) -> Self {
        Self { attributes }
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    pub fn field_type(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    /// The human label (the `string` attribute).
    pub fn label(&self) -> Option<&str> {
        self.get("string").and_then(Value::as_str)
    }

    pub fn is_required(&self) -> bool {
        self.get("required").is_some_and(Value::is_truthy)
    }

    pub fn is_readonly(&self) -> bool {
        self.get("readonly").is_some_and(Value::is_truthy)
    }

    /// Target record type of a relational field.
    pub fn relation(&self) -> Option<&str> {
        self.get("relation")
            .filter(|v| v.is_truthy())
            .and_then(Value::as_str)
    }
}

/// Paging and ordering for searches. Unset options are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order: Option<String>,
}

impl SearchOptions {
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    fn apply(&self, kwargs: &mut Kwargs) {
        if let Some(limit) = self.limit {
            kwargs.insert("limit".to_string(), Value::Int(i64::from(limit)));
        }
        if let Some(offset) = self.offset {
            kwargs.insert("offset".to_string(), Value::Int(i64::from(offset)));
        }
        if let Some(order) = &self.order {
            kwargs.insert("order".to_string(), Value::from(order.as_str()));
        }
    }
}

pub struct RpcClient<C: Connector> {
    config: ConnectionConfig,
    connector: C,
    common: OnceCell<C::Endpoint>,
    object: OnceCell<C::Endpoint>,
    session: Session,
    last_failure: Option<String>,
}

impl RpcClient<HttpConnector> {
    /// A client speaking XML-RPC over HTTP to `config.url`.
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(config, HttpConnector::new(config))
    }
}

impl<C: Connector> RpcClient<C> {
    pub fn new(config: &ConnectionConfig, connector: C) -> Self {
        Self {
            config: config.clone(),
            connector,
            common: OnceCell::new(),
            object: OnceCell::new(),
            session: Session::Unconnected,
            last_failure: None,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn uid(&self) -> Option<Uid> {
        match self.session {
            Session::Connected(uid) => Some(uid),
            Session::Unconnected => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.uid().is_some()
    }

    /// Message of the most recent failed `connect()`.
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    fn endpoint(&self, service: Service) -> Result<&C::Endpoint> {
        let cell = match service {
            Service::Common => &self.common,
            Service::Object => &self.object,
        };
        cell.get_or_try_init(|| self.connector.open(service))
    }

    /// Server version information. Needs no authentication.
    pub fn version(&self) -> Result<ServiceVersion> {
        let info = self.endpoint(Service::Common)?.call("version", &[])?;
        let info = info
            .into_struct()
            .ok_or_else(|| OdqError::UnexpectedResponse("version did not return a struct".into()))?;

        let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_string);
        let server_version = text("server_version").ok_or_else(|| {
            OdqError::UnexpectedResponse("version is missing server_version".into())
        })?;
        Ok(ServiceVersion {
            server_serie: text("server_serie").unwrap_or_else(|| server_version.clone()),
            protocol_version: info
                .get("protocol_version")
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            server_version,
        })
    }

    /// Authenticate unless already connected, surfacing any failure.
    pub fn try_connect(&mut self) -> Result<Uid> {
        if let Session::Connected(uid) = self.session {
            return Ok(uid);
        }

        let params = [
            Value::from(self.config.database.as_str()),
            Value::from(self.config.username.as_str()),
            Value::from(self.config.api_key.as_str()),
            Value::Struct(Kwargs::new()),
        ];
        let answer = self.endpoint(Service::Common)?.call("authenticate", &params)?;

        match answer {
            Value::Int(id) if id > 0 => {
                let uid = Uid(id);
                info!(
                    uid = uid.0,
                    username = %self.config.username,
                    database = %self.config.database,
                    "authenticated"
                );
                self.session = Session::Connected(uid);
                self.last_failure = None;
                Ok(uid)
            }
            _ => Err(OdqError::AuthenticationRejected {
                username: self.config.username.clone(),
                database: self.config.database.clone(),
            }),
        }
    }

    /// Authenticate unless already connected. Failures are logged and kept in
    /// [`last_failure`](Self::last_failure); the return value says whether a
    /// session is available.
    pub fn connect(&mut self) -> bool {
        match self.try_connect() {
            Ok(_) => true,
            Err(e) => {
                warn!(url = %self.config.url, error = %e, "connection failed");
                self.last_failure = Some(e.to_string());
                false
            }
        }
    }

    /// Invoke `method` on `model` through `execute_kw`, authenticating first
    /// if needed. The answer is returned as sent.
    pub fn execute(
        &mut self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> Result<Value> {
        let uid = self.try_connect()?;
        debug!(model, method, args = args.len(), kwargs = kwargs.len(), "execute_kw");

        let params = [
            Value::from(self.config.database.as_str()),
            Value::Int(uid.0),
            Value::from(self.config.api_key.as_str()),
            Value::from(model),
            Value::from(method),
            Value::Array(args),
            Value::Struct(kwargs),
        ];
        self.endpoint(Service::Object)?.call("execute_kw", &params)
    }

    pub fn search(&mut self, model: &str, domain: &Domain, options: SearchOptions) -> Result<Vec<i64>> {
        let mut kwargs = Kwargs::new();
        options.apply(&mut kwargs);
        let answer = self.execute(model, "search", vec![domain.to_value()], kwargs)?;
        ids(answer, "search")
    }

    /// Read records by id. `fields` is sent only when given; otherwise the
    /// service returns every field.
    pub fn read(&mut self, model: &str, ids: &[i64], fields: Option<&[String]>) -> Result<Vec<Record>> {
        let mut args = vec![Value::from(ids.to_vec())];
        if let Some(fields) = fields {
            args.push(Value::from(fields.to_vec()));
        }
        let answer = self.execute(model, "read", args, Kwargs::new())?;
        records(answer, "read")
    }

    /// Search and read in one round trip.
    pub fn search_read(
        &mut self,
        model: &str,
        domain: &Domain,
        fields: Option<&[String]>,
        options: SearchOptions,
    ) -> Result<Vec<Record>> {
        let mut kwargs = Kwargs::new();
        if let Some(fields) = fields {
            kwargs.insert("fields".to_string(), Value::from(fields.to_vec()));
        }
        options.apply(&mut kwargs);
        let answer = self.execute(model, "search_read", vec![domain.to_value()], kwargs)?;
        records(answer, "search_read")
    }

    pub fn count(&mut self, model: &str, domain: &Domain) -> Result<u64> {
        let answer = self.execute(model, "search_count", vec![domain.to_value()], Kwargs::new())?;
        answer
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| {
                OdqError::UnexpectedResponse(format!(
                    "search_count returned {} instead of a count",
                    answer.kind()
                ))
            })
    }

    /// Field schema of `model`, limited to `attributes`
    /// (default: [`DEFAULT_FIELD_ATTRIBUTES`]).
    pub fn fields_get(
        &mut self,
        model: &str,
        attributes: Option<&[&str]>,
    ) -> Result<BTreeMap<String, FieldDescriptor>> {
        let attributes = attributes.unwrap_or(DEFAULT_FIELD_ATTRIBUTES);
        let mut kwargs = Kwargs::new();
        kwargs.insert("attributes".to_string(), Value::from(attributes.to_vec()));

        let answer = self.execute(model, "fields_get", Vec::new(), kwargs)?;
        let described = answer
            .into_struct()
            .ok_or_else(|| OdqError::UnexpectedResponse("fields_get did not return a struct".into()))?;

        described
            .into_iter()
            .map(|(name, attrs)| match attrs {
                Value::Struct(attrs) => Ok((name, FieldDescriptor::new(attrs))),
                other => Err(OdqError::UnexpectedResponse(format!(
                    "fields_get returned {} for field '{}'",
                    other.kind(),
                    name
                ))),
            })
            .collect()
    }

    /// Every installed record type, ordered by technical name.
    pub fn get_models(&mut self) -> Result<Vec<ModelInfo>> {
        let fields = ["model".to_string(), "name".to_string()];
        let rows = self.search_read(
            MODEL_REGISTRY,
            &Domain::all(),
            Some(&fields[..]),
            SearchOptions::default().order("model"),
        )?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let text = |key: &str| {
                    row.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                ModelInfo {
                    model: text("model"),
                    name: text("name"),
                }
            })
            .collect())
    }

    pub fn create(&mut self, model: &str, values: Record) -> Result<i64> {
        let answer = self.execute(model, "create", vec![Value::Struct(values)], Kwargs::new())?;
        answer.as_i64().ok_or_else(|| {
            OdqError::UnexpectedResponse(format!("create returned {} instead of an id", answer.kind()))
        })
    }

    pub fn write(&mut self, model: &str, ids: &[i64], values: Record) -> Result<bool> {
        let args = vec![Value::from(ids.to_vec()), Value::Struct(values)];
        Ok(self.execute(model, "write", args, Kwargs::new())?.is_truthy())
    }

    pub fn unlink(&mut self, model: &str, ids: &[i64]) -> Result<bool> {
        let args = vec![Value::from(ids.to_vec())];
        Ok(self.execute(model, "unlink", args, Kwargs::new())?.is_truthy())
    }
}

fn ids(answer: Value, method: &str) -> Result<Vec<i64>> {
    let items = answer.into_array().ok_or_else(|| {
        OdqError::UnexpectedResponse(format!("{} did not return a list", method))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_i64().ok_or_else(|| {
                OdqError::UnexpectedResponse(format!("{} returned a non-integer id", method))
            })
        })
        .collect()
}

fn records(answer: Value, method: &str) -> Result<Vec<Record>> {
    let items = answer.into_array().ok_or_else(|| {
        OdqError::UnexpectedResponse(format!("{} did not return a list", method))
    })?;
    items
        .into_iter()
        .map(|item| {
            item.into_struct().ok_or_else(|| {
                OdqError::UnexpectedResponse(format!("{} returned a non-record item", method))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::{fixtures, MemoryService};

    fn client() -> (RpcClient<MemoryService>, MemoryService) {
        let service = fixtures::service();
        (RpcClient::new(&fixtures::config(), service.clone()), service)
    }

    fn with_email() -> Domain {
        Domain::parse("[('email', '!=', None)]").unwrap()
    }

    #[test]
    fn connect_is_memoized() {
        let (mut client, service) = client();
        assert!(client.connect());
        assert!(client.connect());
        assert_eq!(client.uid(), Some(Uid(fixtures::UID)));
        assert_eq!(service.authentications(), 1);
    }

    #[test]
    fn many_executes_authenticate_once() {
        let (mut client, service) = client();
        for _ in 0..3 {
            client.count("res.partner", &Domain::all()).unwrap();
        }
        client.search("res.partner", &Domain::all(), SearchOptions::default()).unwrap();
        assert_eq!(service.authentications(), 1);
        assert_eq!(service.opened(Service::Common), 1);
        assert_eq!(service.opened(Service::Object), 1);
    }

    #[test]
    fn rejected_credentials_are_reported_not_raised() {
        let service = fixtures::service();
        let config = ConnectionConfig {
            api_key: "wrong".into(),
            ..fixtures::config()
        };
        let mut client = RpcClient::new(&config, service.clone());

        assert!(!client.connect());
        assert!(!client.is_connected());
        assert!(client.last_failure().unwrap().contains("admin"));

        let err = client.execute("res.partner", "search", vec![Value::Array(vec![])], Kwargs::new());
        assert!(matches!(err, Err(OdqError::AuthenticationRejected { .. })));
        assert_eq!(service.executions("search"), 0);
    }

    #[test]
    fn unreachable_service_fails_connect_and_version() {
        let service = fixtures::service().unreachable();
        let mut client = RpcClient::new(&fixtures::config(), service);
        assert!(!client.connect());
        assert!(client.last_failure().is_some());
        assert!(client.version().is_err());
    }

    #[test]
    fn version_does_not_authenticate() {
        let (client, service) = client();
        let version = client.version().unwrap();
        assert_eq!(version.server_version, "17.0");
        assert_eq!(version.protocol_version, 1);
        assert_eq!(service.authentications(), 0);
    }

    #[test]
    fn count_matches_search_length() {
        let (mut client, _) = client();
        for domain in [Domain::all(), with_email(), Domain::parse("[('is_company', '=', True)]").unwrap()] {
            let ids = client.search("res.partner", &domain, SearchOptions::default()).unwrap();
            let count = client.count("res.partner", &domain).unwrap();
            assert_eq!(count, ids.len() as u64, "domain {}", domain);
        }
    }

    #[test]
    fn search_read_honours_limit_and_domain() {
        let (mut client, _) = client();
        let all = client.search("res.partner", &with_email(), SearchOptions::default()).unwrap();
        let fields = vec!["name".to_string(), "email".to_string()];
        let rows = client
            .search_read("res.partner", &with_email(), Some(fields.as_slice()), SearchOptions::default().limit(1))
            .unwrap();

        assert_eq!(rows.len(), 1);
        let id = rows[0]["id"].as_i64().unwrap();
        assert!(all.contains(&id));
        assert_eq!(client.count("res.partner", &with_email()).unwrap(), all.len() as u64);
    }

    #[test]
    fn read_sends_fields_only_when_given() {
        let (mut client, service) = client();
        let fields = vec!["name".to_string(), "email".to_string()];
        let rows = client.read("res.partner", &[1, 2], Some(fields.as_slice())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["email"], Value::Bool(false));
        assert_eq!(rows[0].len(), 3);

        let full = client.read("res.partner", &[3], None).unwrap();
        assert!(full[0].contains_key("country_id"));
        assert_eq!(service.executions("read"), 2);
    }

    #[test]
    fn fields_get_describes_schema() {
        let (mut client, _) = client();
        let fields = client.fields_get("res.partner", None).unwrap();
        let country = &fields["country_id"];
        assert_eq!(country.field_type(), Some("many2one"));
        assert_eq!(country.relation(), Some("res.country"));
        assert!(fields["name"].is_required());
        assert!(fields["create_uid"].is_readonly());
        assert_eq!(fields["email"].relation(), None);

        let types_only = client.fields_get("res.partner", Some(&["type"][..])).unwrap();
        assert_eq!(types_only["email"].attributes().len(), 1);
    }

    #[test]
    fn get_models_lists_registry_in_order() {
        let (mut client, _) = client();
        let models: Vec<String> = client.get_models().unwrap().into_iter().map(|m| m.model).collect();
        assert_eq!(models, vec!["ir.model", "res.country", "res.partner", "res.users"]);
    }

    #[test]
    fn remote_faults_propagate_unchanged() {
        let (mut client, _) = client();
        let err = client
            .execute("res.partner", "no_such_method", Vec::new(), Kwargs::new())
            .unwrap_err();
        match err {
            OdqError::Fault { message, .. } => assert!(message.contains("no_such_method")),
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn create_write_unlink() {
        let (mut client, _) = client();
        let mut values = Record::new();
        values.insert("name".into(), "Eve Park".into());
        let id = client.create("res.partner", values).unwrap();

        let mut update = Record::new();
        update.insert("email".into(), "eve@example.com".into());
        assert!(client.write("res.partner", &[id], update).unwrap());
        let rows = client.read("res.partner", &[id], Some(&["email".to_string()][..])).unwrap();
        assert_eq!(rows[0]["email"], Value::from("eve@example.com"));

        assert!(client.unlink("res.partner", &[id]).unwrap());
        assert!(client.read("res.partner", &[id], None).is_err());
    }
}
