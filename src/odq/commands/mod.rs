//! # Command Layer
//!
//! Each command has a small token grammar (`parse`) and a pure `run` function
//! that talks to the service through an [`RpcClient`] and returns a
//! [`CmdResult`]. Nothing here prints; the CLI decides how a result looks.
//!
//! Parsing happens before any remote call, so a malformed domain literal or a
//! non-numeric id fails without touching the network. Handlers that need a
//! session call `connect()` and return an aborted result carrying the
//! diagnostic when it fails.

use crate::client::RpcClient;
use crate::error::Result;
use crate::transport::Connector;
use crate::value::Value;

pub mod count;
pub mod exec;
pub mod fields;
pub mod helpers;
pub mod help;
pub mod models;
pub mod read;
pub mod search;
pub mod version;

/// Grammar of one command: `None` means the tokens do not fit and the usage
/// text should be shown instead.
pub type ParseFn = fn(&[String]) -> Result<Option<Command>>;

pub struct CommandSpec {
    pub name: &'static str,
    /// Argument synopsis shown after the name, e.g. `<model> [filter]`.
    pub synopsis: &'static str,
    pub summary: &'static str,
    /// Usage and example lines shown when the arguments do not parse.
    pub usage: &'static [&'static str],
    pub parse: ParseFn,
}

/// The dispatch table, in help order.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "version",
        synopsis: "",
        summary: "Show server version and test the connection",
        usage: &["Usage: version"],
        parse: version::parse,
    },
    CommandSpec {
        name: "models",
        synopsis: "[filter]",
        summary: "List record types, optionally filtered",
        usage: &["Usage: models [filter]", "Example: models partner"],
        parse: models::parse,
    },
    CommandSpec {
        name: "fields",
        synopsis: "<model> [filter]",
        summary: "Show the fields of a record type",
        usage: &[
            "Usage: fields <model> [filter]",
            "Example: fields res.partner",
            "Example: fields res.partner email",
        ],
        parse: fields::parse,
    },
    CommandSpec {
        name: "search",
        synopsis: "<model> [domain] [fields] [limit]",
        summary: "Search records",
        usage: &[
            "Usage: search <model> [domain] [fields] [limit]",
            "Example: search res.partner",
            "Example: search res.partner \"[('email', '!=', False)]\" \"name,email\" 10",
        ],
        parse: search::parse,
    },
    CommandSpec {
        name: "read",
        synopsis: "<model> <id[,id...]> [fields]",
        summary: "Read records by id",
        usage: &[
            "Usage: read <model> <id> [fields]",
            "Example: read res.partner 1",
            "Example: read res.partner 1,2,3 name,email",
        ],
        parse: read::parse,
    },
    CommandSpec {
        name: "count",
        synopsis: "<model> [domain]",
        summary: "Count records",
        usage: &[
            "Usage: count <model> [domain]",
            "Example: count res.partner \"[('is_company', '=', True)]\"",
        ],
        parse: count::parse,
    },
    CommandSpec {
        name: "exec",
        synopsis: "<model> <method> [args]",
        summary: "Execute a model method",
        usage: &[
            "Usage: exec <model> <method> [args]",
            "Example: exec res.partner name_search \"['admin']\"",
        ],
        parse: exec::parse,
    },
    CommandSpec {
        name: "help",
        synopsis: "",
        summary: "Show this help",
        usage: &["Usage: help"],
        parse: help::parse,
    },
];

/// Find a command by name, ignoring case.
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name.eq_ignore_ascii_case(name))
}

pub fn names() -> Vec<&'static str> {
    COMMANDS.iter().map(|spec| spec.name).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Version,
    Models {
        filter: Option<String>,
    },
    Fields {
        model: String,
        filter: Option<String>,
    },
    Search {
        model: String,
        domain: crate::domain::Domain,
        fields: Vec<String>,
        limit: u32,
    },
    Read {
        model: String,
        ids: Vec<i64>,
        fields: Option<Vec<String>>,
    },
    Count {
        model: String,
        domain: crate::domain::Domain,
    },
    Exec {
        model: String,
        method: String,
        args: Vec<Value>,
    },
    Help,
}

/// Outcome of matching a command line against the dispatch table.
#[derive(Debug)]
pub enum Invocation {
    Run(Command),
    Usage(&'static CommandSpec),
    Unknown(String),
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec").field("name", &self.name).finish()
    }
}

/// Resolve `name` and parse its arguments. Fails only on malformed literals
/// or numbers; a missing argument yields [`Invocation::Usage`].
pub fn parse(name: &str, args: &[String]) -> Result<Invocation> {
    let Some(spec) = lookup(name) else {
        return Ok(Invocation::Unknown(name.to_string()));
    };
    Ok(match (spec.parse)(args)? {
        Some(command) => Invocation::Run(command),
        None => Invocation::Usage(spec),
    })
}

pub fn run<C: Connector>(client: &mut RpcClient<C>, command: Command) -> Result<CmdResult> {
    match command {
        Command::Version => version::run(client),
        Command::Models { filter } => models::run(client, filter.as_deref()),
        Command::Fields { model, filter } => fields::run(client, &model, filter.as_deref()),
        Command::Search {
            model,
            domain,
            fields,
            limit,
        } => search::run(client, &model, &domain, &fields, limit),
        Command::Read { model, ids, fields } => read::run(client, &model, &ids, fields.as_deref()),
        Command::Count { model, domain } => count::run(client, &model, &domain),
        Command::Exec {
            model,
            method,
            args,
        } => exec::run(client, &model, &method, args),
        Command::Help => Ok(help::run()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// What a command produced, for the CLI to render.
#[derive(Debug, Clone)]
pub enum Report {
    Version(version::VersionReport),
    Models(models::ModelListing),
    Fields(fields::FieldListing),
    Records(search::RecordListing),
    Count(count::CountReport),
    Raw(Value),
    Help,
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub report: Option<Report>,
    pub messages: Vec<CmdMessage>,
    /// Set when the command could not reach the service.
    pub aborted: bool,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_report(mut self, report: Report) -> Self {
        self.report = Some(report);
        self
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            report: None,
            messages: vec![CmdMessage::error(message)],
            aborted: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OdqError;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(lookup("SEARCH").map(|s| s.name), Some("search"));
        assert_eq!(lookup("Version").map(|s| s.name), Some("version"));
        assert!(lookup("drop").is_none());
    }

    #[test]
    fn names_follow_table_order() {
        assert_eq!(
            names(),
            vec!["version", "models", "fields", "search", "read", "count", "exec", "help"]
        );
    }

    #[test]
    fn unknown_and_usage_are_distinguished() {
        assert!(matches!(
            parse("frobnicate", &[]).unwrap(),
            Invocation::Unknown(name) if name == "frobnicate"
        ));
        assert!(matches!(
            parse("fields", &[]).unwrap(),
            Invocation::Usage(spec) if spec.name == "fields"
        ));
        assert!(matches!(
            parse("read", &args(&["res.partner"])).unwrap(),
            Invocation::Usage(_)
        ));
    }

    #[test]
    fn malformed_input_is_an_error_not_usage() {
        let err = parse("count", &args(&["res.partner", "[('a', '=', open('x'))]"])).unwrap_err();
        assert!(matches!(err, OdqError::Literal(_)));

        let err = parse("read", &args(&["res.partner", "1,x"])).unwrap_err();
        assert!(matches!(err, OdqError::InvalidId(ref id) if id == "x"));
    }

    #[test]
    fn every_command_has_usage() {
        for spec in COMMANDS {
            assert!(!spec.summary.is_empty(), "{}", spec.name);
            assert!(spec.usage[0].starts_with("Usage:"), "{}", spec.name);
        }
    }
}
