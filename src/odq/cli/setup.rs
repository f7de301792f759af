use clap::Parser;
use odq::config::{ConnectionConfig, API_KEY_VAR, DATABASE_VAR, TIMEOUT_VAR, URL_VAR, USERNAME_VAR};
use tracing_subscriber::EnvFilter;

/// Log filter directive, e.g. `ODQ_LOG=odq=debug`.
pub const LOG_VAR: &str = "ODQ_LOG";

pub const EXAMPLES: &[&str] = &[
    "odq models partner",
    "odq fields res.partner email",
    "odq search res.partner \"[('email', '!=', False)]\" name,email 5",
    "odq read res.partner 1,2,3 name,email",
    "odq count res.partner \"[('is_company', '=', True)]\"",
    "odq exec res.partner name_search \"['admin']\"",
];

/// Every token is positional: the first names the command, the rest are
/// handed to it verbatim, including ones that start with `-`.
#[derive(Parser, Debug)]
#[command(
    name = "odq",
    bin_name = "odq",
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
#[command(about = "Query and introspect a remote object-relational service", long_about = None)]
pub struct Cli {
    #[arg(allow_hyphen_values = true)]
    pub command: Option<String>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Install the stderr subscriber; stdout stays reserved for results.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Variable names with a description and the default in effect.
pub fn environment_help() -> Vec<(&'static str, String)> {
    let defaults = ConnectionConfig::default();
    vec![
        (URL_VAR, format!("Service base URL (default {})", defaults.url)),
        (DATABASE_VAR, format!("Database name (default {})", defaults.database)),
        (USERNAME_VAR, format!("Login (default {})", defaults.username)),
        (API_KEY_VAR, "API key or password".to_string()),
        (TIMEOUT_VAR, "Request timeout in seconds (default none)".to_string()),
        (LOG_VAR, "Log filter, e.g. debug (default warn)".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_command_and_raw_arguments() {
        let cli = Cli::try_parse_from(["odq", "search", "res.partner", "-1", "--weird"]).unwrap();
        assert_eq!(cli.command.as_deref(), Some("search"));
        assert_eq!(cli.args, vec!["res.partner", "-1", "--weird"]);
    }

    #[test]
    fn help_and_version_are_commands() {
        let cli = Cli::try_parse_from(["odq", "help"]).unwrap();
        assert_eq!(cli.command.as_deref(), Some("help"));
        let cli = Cli::try_parse_from(["odq", "version"]).unwrap();
        assert_eq!(cli.command.as_deref(), Some("version"));
    }

    #[test]
    fn no_arguments_means_no_command() {
        let cli = Cli::try_parse_from(["odq"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.args.is_empty());
    }
}
