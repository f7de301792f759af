//! Output templates, kept as standalone files and embedded at compile time.
//!
//! Templates are minijinja (through `outstanding`). Layout math such as
//! column gaps is done in `render.rs`; templates only place values and pick
//! semantic style names.

pub const HELP_TEMPLATE: &str = include_str!("templates/help.tmp");
pub const USAGE_TEMPLATE: &str = include_str!("templates/usage.tmp");
pub const UNKNOWN_TEMPLATE: &str = include_str!("templates/unknown.tmp");
pub const VERSION_TEMPLATE: &str = include_str!("templates/version.tmp");
pub const MODELS_TEMPLATE: &str = include_str!("templates/models.tmp");
pub const FIELDS_TEMPLATE: &str = include_str!("templates/fields.tmp");
pub const RECORDS_TEMPLATE: &str = include_str!("templates/records.tmp");
pub const COUNT_TEMPLATE: &str = include_str!("templates/count.tmp");
pub const MESSAGES_TEMPLATE: &str = include_str!("templates/messages.tmp");
