//! # Transport Layer
//!
//! The client talks to two remote services: `common` (authentication and the
//! version probe) and `object` (generic method execution). Each is reached
//! through an [`Endpoint`] handle that a [`Connector`] opens on demand.
//!
//! ## Implementations
//!
//! - [`http::HttpConnector`]: XML-RPC over blocking HTTP, used by the binary
//! - [`memory::MemoryService`]: an in-process fake service for tests
//!
//! The client never constructs handles itself; it asks its connector once per
//! service and caches the result, so swapping the connector swaps the whole
//! remote side.

use crate::error::Result;
use crate::value::Value;
use std::fmt;

pub mod http;
pub mod memory;

/// The remote services, addressed as `{url}/xmlrpc/2/{path}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Common,
    Object,
}

impl Service {
    pub fn path(&self) -> &'static str {
        match self {
            Service::Common => "common",
            Service::Object => "object",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A handle on one remote service.
pub trait Endpoint {
    /// Call `method` with positional `params`, returning the decoded result.
    fn call(&self, method: &str, params: &[Value]) -> Result<Value>;
}

/// Opens endpoint handles.
pub trait Connector {
    type Endpoint: Endpoint;

    fn open(&self, service: Service) -> Result<Self::Endpoint>;
}
