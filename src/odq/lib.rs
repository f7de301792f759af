//! # odq Architecture
//!
//! odq is a **schema-agnostic query library** for an Odoo-compatible
//! object-relational service reached over XML-RPC. Record types and fields are
//! discovered at runtime; nothing about the remote schema is compiled in. The
//! `odq` binary is one client of this library.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Captures arguments, renders results, sets exit status    │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Dispatch table, token grammars, pure `run` functions     │
//! │  - Returns `CmdResult`, never prints                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  RPC Client (client.rs)                                     │
//! │  - Lazy session, cached endpoint handles                    │
//! │  - Generic `execute` plus typed ORM helpers                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Transport (transport/, xmlrpc.rs)                          │
//! │  - Connector/Endpoint traits                                │
//! │  - HttpConnector (production), MemoryService (testing)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Literal Input
//!
//! Domains and method arguments arrive on the command line as literal text,
//! e.g. `[('email', '!=', False)]`. [`literal`] parses exactly that: lists,
//! tuples, dicts, strings, numbers and the three constants. Names, calls and
//! operators are rejected, so caller input is never evaluated as code.
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `commands` inward, code takes plain Rust arguments, returns
//! `Result<..>`, and never writes to stdout/stderr or exits the process.
//! Diagnostics go through `tracing`.
//!
//! ## Testing Strategy
//!
//! 1. **Commands** and **client**: unit tests against
//!    [`transport::memory::MemoryService`], which answers the same calls as the
//!    real service and records them, so tests can count round trips and
//!    authentications.
//! 2. **Codec** (`xmlrpc.rs`, `literal.rs`): unit tests on concrete payloads.
//! 3. **CLI** (`tests/`): drives the binary for paths that never reach the
//!    network (help, unknown commands, usage, malformed literals).
//!
//! ## Module Overview
//!
//! - **[`config`]**: `ConnectionConfig` resolved from `ODOO_*` variables
//! - **[`value`]**: the `Value` sum type exchanged with the service
//! - **[`literal`]**: restricted literal parser and printer
//! - **[`domain`]**: typed search domains
//! - **[`xmlrpc`]**: request encoding, response and fault decoding
//! - **[`transport`]**: endpoint handles over HTTP or in memory
//! - **[`client`]**: `RpcClient`
//! - **[`commands`]**: the command dispatch table
//! - **[`error`]**: `OdqError` and the crate `Result`

pub mod client;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod literal;
pub mod transport;
pub mod value;
pub mod xmlrpc;
