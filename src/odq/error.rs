use crate::literal::LiteralError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OdqError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: String, message: String },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed XML-RPC payload: {0}")]
    MalformedXml(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Authentication rejected for '{username}' on database '{database}'")]
    AuthenticationRejected { username: String, database: String },

    #[error("Invalid expression: {0}")]
    Literal(#[from] LiteralError),

    #[error("Invalid domain: {0}")]
    Domain(String),

    #[error("Invalid record id: '{0}'")]
    InvalidId(String),

    #[error("Invalid limit: '{0}'")]
    InvalidLimit(String),
}

pub type Result<T> = std::result::Result<T, OdqError>;
