//! Named styles for terminal output.
//!
//! Templates refer to styles by semantic name (`model`, `field`, `count`);
//! the theme below maps those names to colors. Every name used in a template
//! must be registered here, otherwise `outstanding` marks the text as missing.
use console::Style;
use once_cell::sync::Lazy;
use outstanding::{rgb_to_ansi256, Theme};

/// Style identifiers shared between templates and renderers.
pub mod names {
    pub const TITLE: &str = "title";
    pub const HEADER: &str = "header";
    pub const FAINT: &str = "faint";
    pub const MUTED: &str = "muted";
    pub const COMMAND: &str = "command";
    pub const MODEL: &str = "model";
    pub const FIELD: &str = "field";
    pub const TYPE: &str = "type";
    pub const REQUIRED: &str = "required";
    pub const RELATION: &str = "relation";
    pub const COUNT: &str = "count";
    pub const SUCCESS: &str = "success";
    pub const INFO: &str = "info";
    pub const WARNING: &str = "warning";
    pub const ERROR: &str = "error";
}

pub static ODQ_THEME: Lazy<Theme> = Lazy::new(|| {
    let grey = rgb_to_ansi256((154, 154, 154));
    Theme::new()
        .add(names::TITLE, Style::new().bold())
        .add(names::HEADER, Style::new().bold().underlined())
        .add(names::FAINT, Style::new().color256(grey))
        .add(names::MUTED, Style::new().color256(grey).italic())
        .add(names::COMMAND, Style::new().cyan())
        .add(names::MODEL, Style::new().cyan())
        .add(names::FIELD, Style::new().cyan())
        .add(names::TYPE, Style::new().magenta())
        .add(names::REQUIRED, Style::new().yellow())
        .add(names::RELATION, Style::new().blue())
        .add(names::COUNT, Style::new().bold())
        .add(names::SUCCESS, Style::new().green())
        .add(names::INFO, Style::new().color256(grey))
        .add(names::WARNING, Style::new().yellow())
        .add(names::ERROR, Style::new().red())
});
