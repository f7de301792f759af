//! # Rendering
//!
//! Turns `CmdResult`s into terminal text through `outstanding` templates.
//! Column widths and gaps are computed here with `unicode-width`, since styled
//! text carries escape codes that would throw off any padding done in a
//! template. Records are shown as pretty JSON; raw `exec` answers use the
//! literal printer so they read like the arguments that produced them.

use super::setup::{environment_help, EXAMPLES};
use super::styles::{names, ODQ_THEME};
use super::templates::{
    COUNT_TEMPLATE, FIELDS_TEMPLATE, HELP_TEMPLATE, MESSAGES_TEMPLATE, MODELS_TEMPLATE,
    RECORDS_TEMPLATE, UNKNOWN_TEMPLATE, USAGE_TEMPLATE, VERSION_TEMPLATE,
};
use odq::commands::count::CountReport;
use odq::commands::fields::FieldListing;
use odq::commands::models::ModelListing;
use odq::commands::search::RecordListing;
use odq::commands::version::VersionReport;
use odq::commands::{CmdMessage, CmdResult, CommandSpec, MessageLevel, Report, COMMANDS};
use odq::literal;
use odq::value::Value;
use outstanding::{render, render_with_color, ThemeChoice};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

const RULE_WIDTH: usize = 80;
const MODEL_COLUMN: usize = 40;
const FIELD_NAME_COLUMN: usize = 30;
const FIELD_TYPE_COLUMN: usize = 12;
const LITERAL_WIDTH: usize = 80;

#[derive(Serialize)]
struct HelpCommand {
    usage: String,
    gap: String,
    summary: &'static str,
}

#[derive(Serialize)]
struct HelpVariable {
    name: &'static str,
    gap: String,
    description: String,
}

#[derive(Serialize)]
struct HelpData {
    version: &'static str,
    about: &'static str,
    commands: Vec<HelpCommand>,
    variables: Vec<HelpVariable>,
    examples: &'static [&'static str],
}

#[derive(Serialize)]
struct UsageData {
    lines: &'static [&'static str],
}

#[derive(Serialize)]
struct UnknownData<'a> {
    name: &'a str,
    available: String,
}

#[derive(Serialize)]
struct VersionData<'a> {
    url: &'a str,
    database: &'a str,
    server_version: Option<&'a str>,
    protocol_version: Option<i64>,
    uid: Option<i64>,
}

#[derive(Serialize)]
struct ModelRow<'a> {
    model: &'a str,
    gap: String,
    name: &'a str,
}

#[derive(Serialize)]
struct ModelsData<'a> {
    header_gap: String,
    rule: String,
    rows: Vec<ModelRow<'a>>,
    hidden: usize,
    total: usize,
}

#[derive(Serialize)]
struct FieldRow<'a> {
    name: &'a str,
    name_gap: String,
    field_type: &'a str,
    type_gap: String,
    label: &'a str,
    required: bool,
    relation: Option<&'a str>,
}

#[derive(Serialize)]
struct FieldsData<'a> {
    model: &'a str,
    rule: String,
    fields: Vec<FieldRow<'a>>,
    total: usize,
}

#[derive(Serialize)]
struct RecordsData<'a> {
    search: bool,
    model: &'a str,
    limit: Option<u32>,
    rule: String,
    records: Vec<String>,
    shown: usize,
    total: Option<u64>,
}

#[derive(Serialize)]
struct CountData<'a> {
    model: &'a str,
    count: u64,
}

#[derive(Serialize)]
struct MessageData {
    content: String,
    style: &'static str,
}

#[derive(Serialize)]
struct MessagesData {
    messages: Vec<MessageData>,
}

fn render_template<T: Serialize>(template: &str, data: &T, use_color: Option<bool>) -> String {
    let theme = ThemeChoice::from(&*ODQ_THEME);
    let rendered = match use_color {
        Some(c) => render_with_color(template, data, theme, c),
        None => render(template, data, theme),
    };
    match rendered {
        Ok(mut text) => {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text
        }
        Err(e) => format!("Render error: {}\n", e),
    }
}

/// Spaces that pad `text` to `column` and then separate it from the next one.
fn gap(text: &str, column: usize) -> String {
    " ".repeat(column.saturating_sub(text.width()) + 1)
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn render_help() -> String {
    render_help_internal(None)
}

fn render_help_internal(use_color: Option<bool>) -> String {
    let usages: Vec<String> = COMMANDS
        .iter()
        .map(|spec| format!("{} {}", spec.name, spec.synopsis).trim_end().to_string())
        .collect();
    let usage_column = usages.iter().map(|u| u.width()).max().unwrap_or(0) + 1;

    let commands = COMMANDS
        .iter()
        .zip(usages)
        .map(|(spec, usage)| HelpCommand {
            gap: gap(&usage, usage_column),
            usage,
            summary: spec.summary,
        })
        .collect();

    let environment = environment_help();
    let name_column = environment.iter().map(|(n, _)| n.width()).max().unwrap_or(0) + 1;
    let variables = environment
        .into_iter()
        .map(|(name, description)| HelpVariable {
            name,
            gap: gap(name, name_column),
            description,
        })
        .collect();

    let data = HelpData {
        version: env!("CARGO_PKG_VERSION"),
        about: env!("CARGO_PKG_DESCRIPTION"),
        commands,
        variables,
        examples: EXAMPLES,
    };
    render_template(HELP_TEMPLATE, &data, use_color)
}

pub fn render_usage(spec: &CommandSpec) -> String {
    render_template(USAGE_TEMPLATE, &UsageData { lines: spec.usage }, None)
}

pub fn render_unknown(name: &str, available: &[&str]) -> String {
    render_unknown_internal(name, available, None)
}

fn render_unknown_internal(name: &str, available: &[&str], use_color: Option<bool>) -> String {
    let data = UnknownData {
        name,
        available: available.join(", "),
    };
    render_template(UNKNOWN_TEMPLATE, &data, use_color)
}

/// Report first, then any messages.
pub fn render_result(result: &CmdResult) -> String {
    render_result_internal(result, None)
}

fn render_result_internal(result: &CmdResult, use_color: Option<bool>) -> String {
    let mut output = match &result.report {
        Some(report) => render_report(report, use_color),
        None => String::new(),
    };
    output.push_str(&render_messages(&result.messages, use_color));
    output
}

fn render_report(report: &Report, use_color: Option<bool>) -> String {
    match report {
        Report::Version(report) => render_version(report, use_color),
        Report::Models(listing) => render_models(listing, use_color),
        Report::Fields(listing) => render_fields(listing, use_color),
        Report::Records(listing) => render_records(listing, use_color),
        Report::Count(report) => render_count(report, use_color),
        Report::Raw(value) => render_raw(value),
        Report::Help => render_help_internal(use_color),
    }
}

fn render_version(report: &VersionReport, use_color: Option<bool>) -> String {
    let data = VersionData {
        url: &report.url,
        database: &report.database,
        server_version: report.version.as_ref().map(|v| v.server_version.as_str()),
        protocol_version: report.version.as_ref().map(|v| v.protocol_version),
        uid: report.uid.map(|uid| uid.0),
    };
    render_template(VERSION_TEMPLATE, &data, use_color)
}

fn render_models(listing: &ModelListing, use_color: Option<bool>) -> String {
    let rows = listing
        .shown
        .iter()
        .map(|m| ModelRow {
            model: &m.model,
            gap: gap(&m.model, MODEL_COLUMN),
            name: &m.name,
        })
        .collect();

    let data = ModelsData {
        header_gap: gap("Model", MODEL_COLUMN),
        rule: rule(),
        rows,
        hidden: listing.hidden(),
        total: listing.total,
    };
    render_template(MODELS_TEMPLATE, &data, use_color)
}

fn render_fields(listing: &FieldListing, use_color: Option<bool>) -> String {
    let fields = listing
        .fields
        .iter()
        .map(|(name, descriptor)| {
            let field_type = descriptor.field_type().unwrap_or("?");
            FieldRow {
                name,
                name_gap: gap(name, FIELD_NAME_COLUMN),
                field_type,
                type_gap: gap(field_type, FIELD_TYPE_COLUMN),
                label: descriptor.label().unwrap_or(""),
                required: descriptor.is_required(),
                relation: descriptor.relation(),
            }
        })
        .collect();

    let data = FieldsData {
        model: &listing.model,
        rule: rule(),
        fields,
        total: listing.fields.len(),
    };
    render_template(FIELDS_TEMPLATE, &data, use_color)
}

fn render_records(listing: &RecordListing, use_color: Option<bool>) -> String {
    let records = listing
        .records
        .iter()
        .map(|record| {
            serde_json::to_string_pretty(record)
                .unwrap_or_else(|e| format!("<unprintable record: {}>", e))
        })
        .collect();

    let data = RecordsData {
        search: listing.total.is_some(),
        model: &listing.model,
        limit: listing.limit,
        rule: rule(),
        records,
        shown: listing.records.len(),
        total: listing.total,
    };
    render_template(RECORDS_TEMPLATE, &data, use_color)
}

fn render_count(report: &CountReport, use_color: Option<bool>) -> String {
    let data = CountData {
        model: &report.model,
        count: report.count,
    };
    render_template(COUNT_TEMPLATE, &data, use_color)
}

fn render_raw(value: &Value) -> String {
    let mut text = literal::pretty(value, LITERAL_WIDTH);
    text.push('\n');
    text
}

fn render_messages(messages: &[CmdMessage], use_color: Option<bool>) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let messages = messages
        .iter()
        .map(|msg| MessageData {
            content: msg.content.clone(),
            style: match msg.level {
                MessageLevel::Info => names::INFO,
                MessageLevel::Warning => names::WARNING,
                MessageLevel::Error => names::ERROR,
            },
        })
        .collect();
    render_template(MESSAGES_TEMPLATE, &MessagesData { messages }, use_color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use odq::client::{FieldDescriptor, ModelInfo, ServiceVersion, Uid};
    use odq::value::Record;
    use std::collections::BTreeMap;

    fn plain(report: Report) -> String {
        render_result_internal(&CmdResult::default().with_report(report), Some(false))
    }

    fn descriptor(attrs: &[(&str, Value)]) -> FieldDescriptor {
        FieldDescriptor::new(
            attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn help_lists_every_command() {
        let output = render_help_internal(Some(false));
        for spec in COMMANDS {
            assert!(output.contains(spec.summary), "missing {}", spec.name);
        }
        assert!(output.contains("ODOO_URL"));
        assert!(output.contains("Usage: odq <command> [args...]"));
        assert!(!output.contains("(!?)"));
    }

    #[test]
    fn unknown_command_names_alternatives() {
        let output = render_unknown_internal("drop", &["version", "models"], Some(false));
        assert_eq!(output, "Unknown command: drop\nAvailable: version, models\n");
    }

    #[test]
    fn model_table_pads_and_counts() {
        let listing = ModelListing {
            shown: vec![ModelInfo {
                model: "res.partner".into(),
                name: "Contact".into(),
            }],
            total: 51,
        };
        let output = plain(Report::Models(listing));
        let row = format!("res.partner{}Contact", " ".repeat(MODEL_COLUMN - "res.partner".len() + 1));
        assert!(output.contains(&row), "{}", output);
        assert!(output.contains("... and 50 more (use filter to narrow)"));
        assert!(output.ends_with("Total: 51 models\n"));
    }

    #[test]
    fn field_rows_show_flags_and_relations() {
        let listing = FieldListing {
            model: "res.partner".into(),
            fields: vec![
                (
                    "country_id".into(),
                    descriptor(&[
                        ("type", "many2one".into()),
                        ("string", "Country".into()),
                        ("relation", "res.country".into()),
                    ]),
                ),
                (
                    "name".into(),
                    descriptor(&[
                        ("type", "char".into()),
                        ("string", "Name".into()),
                        ("required", true.into()),
                    ]),
                ),
            ],
        };
        let output = plain(Report::Fields(listing));
        assert!(output.contains("Fields for res.partner:"));
        assert!(output.contains("Country → res.country"));
        assert!(output.contains("Name (req)"));
        assert!(output.contains("Total: 2 fields"));
    }

    #[test]
    fn search_results_show_totals() {
        let mut record = Record::new();
        record.insert("id".into(), Value::Int(7));
        record.insert("name".into(), "Ada".into());
        let listing = RecordListing {
            model: "res.partner".into(),
            records: vec![record.clone()],
            limit: Some(10),
            total: Some(3),
        };
        let output = plain(Report::Records(listing));
        assert!(output.contains("Results from res.partner (limit 10):"));
        assert!(output.contains("\"name\": \"Ada\""));
        assert!(output.contains("Showing 1 of 3 total records"));

        let read = RecordListing {
            model: "res.partner".into(),
            records: vec![record],
            limit: None,
            total: None,
        };
        let output = plain(Report::Records(read));
        assert!(output.starts_with('{'));
        assert!(!output.contains("Showing"));
    }

    #[test]
    fn version_omits_uid_when_unauthenticated() {
        let mut report = VersionReport {
            url: "http://localhost:8069".into(),
            database: "crearis".into(),
            version: Some(ServiceVersion {
                server_version: "17.0".into(),
                server_serie: "17.0".into(),
                protocol_version: 1,
            }),
            uid: None,
        };
        let output = plain(Report::Version(report.clone()));
        assert!(output.contains("Odoo 17.0"));
        assert!(!output.contains("UID"));

        report.uid = Some(Uid(2));
        assert!(plain(Report::Version(report)).contains("Authenticated as UID: 2"));
    }

    #[test]
    fn version_names_target_when_unreachable() {
        let mut result = CmdResult::aborted("Connection failed: HTTP 503 from http://localhost:8069");
        result.report = Some(Report::Version(VersionReport {
            url: "http://localhost:8069".into(),
            database: "crearis".into(),
            version: None,
            uid: None,
        }));
        let output = render_result_internal(&result, Some(false));
        assert!(output.starts_with("Connecting to: http://localhost:8069\nDatabase: crearis\n"));
        assert!(output.contains("Connection failed: HTTP 503"));
        assert!(!output.contains("Odoo"));
        assert!(!output.contains("Protocol"));
    }

    #[test]
    fn raw_answers_print_as_literals() {
        let value = Value::Array(vec![Value::Array(vec![Value::Int(3), "Ada".into()])]);
        assert_eq!(plain(Report::Raw(value)), "[[3, 'Ada']]\n");
    }

    #[test]
    fn messages_follow_report() {
        let mut result = CmdResult::default().with_report(Report::Count(CountReport {
            model: "res.partner".into(),
            count: 4,
        }));
        result.add_message(CmdMessage::warning("careful"));
        let output = render_result_internal(&result, Some(false));
        assert!(output.ends_with("res.partner: 4 records\ncareful\n"), "{}", output);
    }
}
