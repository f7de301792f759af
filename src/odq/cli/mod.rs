//! # CLI Behavior
//!
//! One client of the odq library. This is the only place that touches
//! stdout/stderr, exit codes and terminal styling.
//!
//! `odq <command> [args...]`: there are no flags. `help` and `version` are
//! ordinary commands, and every token after the command is passed through
//! untouched, so domains such as `"[('id', '>', -1)]"` need no escaping.
//!
//! ## Module Structure
//!
//! - `commands`: dispatch and exit status
//! - `render`: `CmdResult` to text
//! - `setup`: clap capture, logging, help content
//! - `styles`: the theme
//! - `templates`: embedded output templates

mod commands;
mod render;
pub mod setup;
mod styles;
mod templates;

pub use commands::run;
