//! An in-process stand-in for the remote service.
//!
//! `MemoryService` answers the same `common` and `object` calls the real
//! service does (authentication, version, and the ORM verbs used by the
//! client) over a small set of models held in memory. Every call is recorded
//! so tests can assert on round trips, authentication attempts and endpoint
//! handles.
//!
//! Domain filtering supports the prefix operators `&`, `|`, `!` and the
//! comparison operators `=`, `!=`, `<`, `>`, `<=`, `>=`, `like`, `ilike`,
//! `not like`, `not ilike`, `in`, `not in`. As on the real service, `None` and
//! `False` both mean "unset".

use super::{Connector, Endpoint, Service};
use crate::domain::{Domain, DomainTerm, LogicOp};
use crate::error::{OdqError, Result};
use crate::value::{Kwargs, Record, Value};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

const MODEL_REGISTRY: &str = "ir.model";

/// Schema entry for one field of a fake model.
#[derive(Debug, Clone)]
pub struct MemoryField {
    pub name: String,
    pub field_type: String,
    pub label: String,
    pub required: bool,
    pub readonly: bool,
    pub relation: Option<String>,
}

impl MemoryField {
    pub fn new(name: &str, field_type: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            label: label.to_string(),
            required: false,
            readonly: false,
            relation: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn relation(mut self, model: &str) -> Self {
        self.relation = Some(model.to_string());
        self
    }

    fn attributes(&self) -> BTreeMap<String, Value> {
        let mut attrs = BTreeMap::new();
        attrs.insert("string".to_string(), Value::from(self.label.as_str()));
        attrs.insert("type".to_string(), Value::from(self.field_type.as_str()));
        attrs.insert("required".to_string(), Value::Bool(self.required));
        attrs.insert("readonly".to_string(), Value::Bool(self.readonly));
        if let Some(relation) = &self.relation {
            attrs.insert("relation".to_string(), Value::from(relation.as_str()));
        }
        attrs
    }
}

/// One recorded call, as seen by the fake service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub service: Service,
    pub method: String,
    /// Model and ORM method for `execute_kw` calls.
    pub target: Option<(String, String)>,
}

#[derive(Debug)]
struct User {
    login: String,
    key: String,
    uid: i64,
}

#[derive(Debug, Default)]
struct Model {
    fields: BTreeMap<String, MemoryField>,
    records: BTreeMap<i64, Record>,
    next_id: i64,
}

impl Model {
    fn insert(&mut self, mut values: Record) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        values.insert("id".to_string(), Value::Int(id));
        self.records.insert(id, values);
        id
    }
}

#[derive(Debug)]
struct State {
    database: String,
    server_version: String,
    users: Vec<User>,
    models: BTreeMap<String, Model>,
    calls: Vec<CallRecord>,
    opened: Vec<Service>,
    unreachable: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryService {
    state: Rc<RefCell<State>>,
}

impl MemoryService {
    /// A service hosting `database`, with only the model registry defined.
    pub fn new(database: &str) -> Self {
        let service = Self {
            state: Rc::new(RefCell::new(State {
                database: database.to_string(),
                server_version: "17.0".to_string(),
                users: Vec::new(),
                models: BTreeMap::new(),
                calls: Vec::new(),
                opened: Vec::new(),
                unreachable: false,
            })),
        };
        service.with_model(
            MODEL_REGISTRY,
            "Models",
            vec![
                MemoryField::new("model", "char", "Model").required(),
                MemoryField::new("name", "char", "Model Description").required(),
            ],
        )
    }

    pub fn with_user(self, login: &str, key: &str, uid: i64) -> Self {
        self.state.borrow_mut().users.push(User {
            login: login.to_string(),
            key: key.to_string(),
            uid,
        });
        self
    }

    pub fn with_server_version(self, version: &str) -> Self {
        self.state.borrow_mut().server_version = version.to_string();
        self
    }

    /// Register a model and list it in the model registry.
    pub fn with_model(self, model: &str, label: &str, fields: Vec<MemoryField>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let entry = state.models.entry(model.to_string()).or_default();
            for field in fields {
                entry.fields.insert(field.name.clone(), field);
            }
            let mut registration = Record::new();
            registration.insert("model".to_string(), Value::from(model));
            registration.insert("name".to_string(), Value::from(label));
            if let Some(registry) = state.models.get_mut(MODEL_REGISTRY) {
                registry.insert(registration);
            }
        }
        self
    }

    pub fn with_record(self, model: &str, values: Record) -> Self {
        if let Some(entry) = self.state.borrow_mut().models.get_mut(model) {
            entry.insert(values);
        }
        self
    }

    /// Make every call fail as if the service were down.
    pub fn unreachable(self) -> Self {
        self.state.borrow_mut().unreachable = true;
        self
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.borrow().calls.clone()
    }

    pub fn authentications(&self) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.service == Service::Common && c.method == "authenticate")
            .count()
    }

    /// Number of `execute_kw` calls running the given ORM method.
    pub fn executions(&self, operation: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| matches!(&c.target, Some((_, op)) if op == operation))
            .count()
    }

    /// Number of endpoint handles opened for `service`.
    pub fn opened(&self, service: Service) -> usize {
        self.state
            .borrow()
            .opened
            .iter()
            .filter(|s| **s == service)
            .count()
    }
}

impl Connector for MemoryService {
    type Endpoint = MemoryEndpoint;

    fn open(&self, service: Service) -> Result<MemoryEndpoint> {
        self.state.borrow_mut().opened.push(service);
        Ok(MemoryEndpoint {
            service,
            state: Rc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct MemoryEndpoint {
    service: Service,
    state: Rc<RefCell<State>>,
}

impl Endpoint for MemoryEndpoint {
    fn call(&self, method: &str, params: &[Value]) -> Result<Value> {
        let mut state = self.state.borrow_mut();
        let target = match (self.service, params) {
            (Service::Object, [_, _, _, Value::String(model), Value::String(op), ..]) => {
                Some((model.clone(), op.clone()))
            }
            _ => None,
        };
        state.calls.push(CallRecord {
            service: self.service,
            method: method.to_string(),
            target,
        });

        if state.unreachable {
            return Err(OdqError::Http {
                status: 503,
                url: format!("memory://{}", self.service),
            });
        }

        match (self.service, method) {
            (Service::Common, "version") => Ok(version_info(&state.server_version)),
            (Service::Common, "authenticate") => authenticate(&state, params),
            (Service::Object, "execute_kw") => execute_kw(&mut state, params),
            (service, other) => Err(fault(format!(
                "method \"{}\" is not supported by service {}",
                other, service
            ))),
        }
    }
}

fn fault(message: impl Into<String>) -> OdqError {
    OdqError::Fault {
        code: "1".to_string(),
        message: message.into(),
    }
}

fn version_info(server_version: &str) -> Value {
    let mut info = BTreeMap::new();
    info.insert("server_version".to_string(), Value::from(server_version));
    info.insert("server_serie".to_string(), Value::from(server_version));
    info.insert("protocol_version".to_string(), Value::Int(1));
    Value::Struct(info)
}

fn authenticate(state: &State, params: &[Value]) -> Result<Value> {
    let (db, login, key) = match params {
        [Value::String(db), Value::String(login), Value::String(key), ..] => (db, login, key),
        _ => return Err(fault("authenticate expects (db, login, password, user_agent_env)")),
    };
    if *db != state.database {
        return Err(fault(format!("database \"{}\" does not exist", db)));
    }
    Ok(state
        .users
        .iter()
        .find(|u| u.login == *login && u.key == *key)
        .map(|u| Value::Int(u.uid))
        .unwrap_or(Value::Bool(false)))
}

fn execute_kw(state: &mut State, params: &[Value]) -> Result<Value> {
    let (db, uid, key, model, op, args, kwargs) = match params {
        [Value::String(db), uid, Value::String(key), Value::String(model), Value::String(op), Value::Array(args), Value::Struct(kwargs)] => {
            (db, uid, key, model, op, args, kwargs)
        }
        _ => return Err(fault("execute_kw expects 7 parameters")),
    };

    let uid = uid.as_i64();
    let authorized = *db == state.database
        && state
            .users
            .iter()
            .any(|u| Some(u.uid) == uid && u.key == *key);
    if !authorized {
        return Err(OdqError::Fault {
            code: "3".to_string(),
            message: "Access Denied".to_string(),
        });
    }

    let entry = state
        .models
        .get_mut(model.as_str())
        .ok_or_else(|| fault(format!("Object {} doesn't exist", model)))?;

    match op.as_str() {
        "search" => {
            let ids = select(entry, args.first(), kwargs)?;
            Ok(Value::Array(ids.into_iter().map(Value::Int).collect()))
        }
        "search_count" => {
            let domain = parse_domain(args.first())?;
            let mut count = 0;
            for record in entry.records.values() {
                if matches_domain(domain.terms(), record)? {
                    count += 1;
                }
            }
            Ok(Value::Int(count))
        }
        "search_read" => {
            let entry = &*entry;
            let ids = select(entry, args.first(), kwargs)?;
            let fields = field_list(args.get(1).or_else(|| kwarg(kwargs, "fields")));
            let records = ids
                .iter()
                .map(|id| project(model, entry, &entry.records[id], fields.as_deref()))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(records))
        }
        "read" => {
            let entry = &*entry;
            let ids = id_list(args.first())?;
            let fields = field_list(args.get(1).or_else(|| kwarg(kwargs, "fields")));
            let records = ids
                .iter()
                .map(|id| {
                    let record = entry.records.get(id).ok_or_else(|| {
                        fault(format!("Record does not exist or has been deleted: {}({})", model, id))
                    })?;
                    project(model, entry, record, fields.as_deref())
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(records))
        }
        "fields_get" => {
            let wanted = field_list(kwarg(kwargs, "attributes"));
            let described = entry
                .fields
                .values()
                .map(|field| {
                    let attrs = field
                        .attributes()
                        .into_iter()
                        .filter(|(k, _)| wanted.as_ref().map_or(true, |w| w.contains(k)))
                        .collect();
                    (field.name.clone(), Value::Struct(attrs))
                })
                .collect();
            Ok(Value::Struct(described))
        }
        "name_search" => {
            let needle = args
                .first()
                .or_else(|| kwarg(kwargs, "name"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_lowercase();
            let pairs = entry
                .records
                .iter()
                .filter_map(|(id, record)| {
                    let name = display_name(model, record);
                    name.to_lowercase()
                        .contains(&needle)
                        .then(|| Value::Array(vec![Value::Int(*id), Value::String(name)]))
                })
                .collect();
            Ok(Value::Array(pairs))
        }
        "create" => {
            let values = match args.first() {
                Some(Value::Struct(values)) => values.clone(),
                _ => return Err(fault("create expects a dict of values")),
            };
            check_fields(model, entry, &values)?;
            if let Some(missing) = entry
                .fields
                .values()
                .find(|f| f.required && !values.get(&f.name).is_some_and(Value::is_truthy))
            {
                return Err(fault(format!(
                    "missing required value for field '{}' on {}",
                    missing.name, model
                )));
            }
            Ok(Value::Int(entry.insert(values)))
        }
        "write" => {
            let ids = id_list(args.first())?;
            let values = match args.get(1) {
                Some(Value::Struct(values)) => values.clone(),
                _ => return Err(fault("write expects ids and a dict of values")),
            };
            check_fields(model, entry, &values)?;
            for id in ids {
                let record = entry.records.get_mut(&id).ok_or_else(|| {
                    fault(format!("Record does not exist or has been deleted: {}({})", model, id))
                })?;
                record.extend(values.clone());
            }
            Ok(Value::Bool(true))
        }
        "unlink" => {
            for id in id_list(args.first())? {
                entry.records.remove(&id);
            }
            Ok(Value::Bool(true))
        }
        other => Err(fault(format!(
            "The method '{}' does not exist on the model '{}'",
            other, model
        ))),
    }
}

fn kwarg<'a>(kwargs: &'a Kwargs, key: &str) -> Option<&'a Value> {
    kwargs.get(key).filter(|v| v.is_truthy())
}

fn parse_domain(value: Option<&Value>) -> Result<Domain> {
    match value {
        None => Ok(Domain::all()),
        Some(v) => Domain::from_value(v.clone()).map_err(|e| fault(e.to_string())),
    }
}

fn id_list(value: Option<&Value>) -> Result<Vec<i64>> {
    match value {
        Some(Value::Int(id)) => Ok(vec![*id]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_i64().ok_or_else(|| fault("ids must be integers")))
            .collect(),
        _ => Err(fault("expected a list of ids")),
    }
}

fn field_list(value: Option<&Value>) -> Option<Vec<String>> {
    let names: Vec<String> = value?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    (!names.is_empty()).then_some(names)
}

fn check_fields(model: &str, entry: &Model, values: &Record) -> Result<()> {
    match values.keys().find(|k| !entry.fields.contains_key(*k)) {
        Some(unknown) => Err(fault(format!("Invalid field '{}' on model '{}'", unknown, model))),
        None => Ok(()),
    }
}

fn display_name(model: &str, record: &Record) -> String {
    match record.get("name") {
        Some(Value::String(name)) => name.clone(),
        _ => format!(
            "{},{}",
            model,
            record.get("id").and_then(Value::as_i64).unwrap_or_default()
        ),
    }
}

fn project(model: &str, entry: &Model, record: &Record, fields: Option<&[String]>) -> Result<Value> {
    let mut out = Record::new();
    out.insert("id".to_string(), record.get("id").cloned().unwrap_or(Value::Nil));

    let names: Vec<String> = match fields {
        Some(fields) => fields.to_vec(),
        None => entry
            .fields
            .keys()
            .cloned()
            .chain(std::iter::once("display_name".to_string()))
            .collect(),
    };

    for name in names {
        let value = match name.as_str() {
            "id" => continue,
            "display_name" => Value::String(display_name(model, record)),
            field if entry.fields.contains_key(field) => {
                record.get(field).cloned().unwrap_or(Value::Bool(false))
            }
            field => {
                return Err(fault(format!("Invalid field '{}' on model '{}'", field, model)))
            }
        };
        out.insert(name, value);
    }
    Ok(Value::Struct(out))
}

/// Ids of matching records after ordering, offset and limit.
fn select(entry: &Model, domain: Option<&Value>, kwargs: &Kwargs) -> Result<Vec<i64>> {
    let domain = parse_domain(domain)?;
    let mut matched = Vec::new();
    for record in entry.records.values() {
        if matches_domain(domain.terms(), record)? {
            matched.push(record);
        }
    }

    if let Some(order) = kwarg(kwargs, "order").and_then(Value::as_str) {
        let keys: Vec<(String, bool)> = order
            .split(',')
            .filter_map(|part| {
                let mut words = part.split_whitespace();
                let field = words.next()?.to_string();
                let desc = words.next().is_some_and(|w| w.eq_ignore_ascii_case("desc"));
                Some((field, desc))
            })
            .collect();
        matched.sort_by(|a, b| {
            keys.iter()
                .map(|(field, desc)| {
                    let ord = cmp_values(field_value(a, field), field_value(b, field));
                    if *desc {
                        ord.reverse()
                    } else {
                        ord
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    let offset = kwarg(kwargs, "offset").and_then(Value::as_i64).unwrap_or(0).max(0) as usize;
    let limit = kwarg(kwargs, "limit")
        .and_then(Value::as_i64)
        .map(|l| l.max(0) as usize)
        .unwrap_or(usize::MAX);

    Ok(matched
        .into_iter()
        .skip(offset)
        .take(limit)
        .filter_map(|r| r.get("id").and_then(Value::as_i64))
        .collect())
}

fn field_value<'a>(record: &'a Record, field: &str) -> &'a Value {
    const UNSET: &Value = &Value::Bool(false);
    record.get(field).unwrap_or(UNSET)
}

fn matches_domain(terms: &[DomainTerm], record: &Record) -> Result<bool> {
    let mut pos = 0;
    let mut result = true;
    while pos < terms.len() {
        let matched = eval_term(terms, &mut pos, record)?;
        result = result && matched;
    }
    Ok(result)
}

fn eval_term(terms: &[DomainTerm], pos: &mut usize, record: &Record) -> Result<bool> {
    let term = terms
        .get(*pos)
        .ok_or_else(|| fault("domain operator is missing an operand"))?;
    *pos += 1;
    match term {
        DomainTerm::Logic(LogicOp::And) => {
            let a = eval_term(terms, pos, record)?;
            let b = eval_term(terms, pos, record)?;
            Ok(a && b)
        }
        DomainTerm::Logic(LogicOp::Or) => {
            let a = eval_term(terms, pos, record)?;
            let b = eval_term(terms, pos, record)?;
            Ok(a || b)
        }
        DomainTerm::Logic(LogicOp::Not) => Ok(!eval_term(terms, pos, record)?),
        DomainTerm::Constant(truth) => Ok(*truth),
        DomainTerm::Clause {
            field,
            operator,
            value,
        } => compare(field_value(record, field), operator, value),
    }
}

fn is_unset(value: &Value) -> bool {
    matches!(value, Value::Nil | Value::Bool(false))
}

/// Many2one values travel as `[id, name]`; comparisons use the id.
fn comparable(value: &Value) -> &Value {
    match value {
        Value::Array(pair) if pair.len() == 2 && matches!(pair[0], Value::Int(_)) => &pair[0],
        other => other,
    }
}

fn loose_eq(actual: &Value, expected: &Value) -> bool {
    let actual = comparable(actual);
    if is_unset(actual) && is_unset(expected) {
        return true;
    }
    match (actual, expected) {
        (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => (*a as f64) == *b,
        _ => actual == expected,
    }
}

fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (comparable(a), comparable(b)) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Int(x), Value::Double(y)) => (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Double(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (x, y) => is_unset(y).cmp(&is_unset(x)),
    }
}

fn compare(actual: &Value, operator: &str, expected: &Value) -> Result<bool> {
    let text_match = |case_insensitive: bool| match (actual, expected) {
        (Value::String(a), Value::String(b)) if case_insensitive => {
            a.to_lowercase().contains(&b.to_lowercase())
        }
        (Value::String(a), Value::String(b)) => a.contains(b.as_str()),
        _ => false,
    };
    let member = || match expected {
        Value::Array(items) => items.iter().any(|item| loose_eq(actual, item)),
        single => loose_eq(actual, single),
    };

    Ok(match operator {
        "=" | "==" => loose_eq(actual, expected),
        "!=" | "<>" => !loose_eq(actual, expected),
        "<" | ">" | "<=" | ">=" => {
            if is_unset(actual) || is_unset(expected) {
                return Ok(false);
            }
            let ord = cmp_values(actual, expected);
            match operator {
                "<" => ord == Ordering::Less,
                ">" => ord == Ordering::Greater,
                "<=" => ord != Ordering::Greater,
                _ => ord != Ordering::Less,
            }
        }
        "like" => text_match(false),
        "ilike" => text_match(true),
        "not like" => !text_match(false),
        "not ilike" => !text_match(true),
        "in" => member(),
        "not in" => !member(),
        other => return Err(fault(format!("Invalid domain operator '{}'", other))),
    })
}
