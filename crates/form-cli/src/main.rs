mod wizard;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use component_form::{
    dispatch, render_json_ui as component_render_json_ui, render_text as component_render_text,
    validate_field as component_validate_field,
};
use form_spec::dates::{parse_date, today as local_today};
use form_spec::{
    StepSpec, StepValidation, ValidationContext, ValueStore, step_schema, validate_step,
};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wizard::{
    AnswerParseError, FieldKind, PromptContext, Verbosity, WizardField, WizardPayload,
    WizardPresenter,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Text-based runner for quote form steps",
    long_about = "Walks, validates, and renders quote form steps backed by the form component"
)]
struct Cli {
    /// Reference date (YYYY-MM-DD) for relative date rules; defaults to the local date.
    #[arg(long, global = true, value_name = "DATE")]
    today: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Walk a step interactively in a text shell.
    Wizard {
        /// Path to the step configuration JSON.
        #[arg(long, value_name = "STEP")]
        step: PathBuf,
        /// Optional JSON file containing initial values.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Show verbose output (status, group position, displayed fields).
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Print the submitted values as JSON.
        #[arg(long)]
        values_json: bool,
        /// Also print each rendered view in this format.
        #[arg(long, value_enum)]
        format: Option<RenderMode>,
    },
    /// Validate a values file against a step.
    Validate {
        /// Path to the step configuration JSON.
        #[arg(long, value_name = "STEP")]
        step: PathBuf,
        /// Path to the values JSON file.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
    },
    /// Render the current view of a step.
    Render {
        /// Path to the step configuration JSON.
        #[arg(long, value_name = "STEP")]
        step: PathBuf,
        /// Optional JSON file containing values.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Optional JSON file containing a saved engine state.
        #[arg(long, value_name = "STATE")]
        state: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Print the JSON Schema of the step configuration format.
    Schema {
        /// Write the schema to this file instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    let today = cli.today;
    match cli.command {
        Command::Wizard {
            step,
            values,
            verbose,
            values_json,
            format,
        } => run_wizard(step, values, today, verbose, values_json, format),
        Command::Validate { step, values } => run_validate(step, values, today),
        Command::Render {
            step,
            values,
            state,
            format,
        } => run_render(step, values, state, today, format),
        Command::Schema { out } => run_schema(out),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_step(path: &Path) -> CliResult<(String, StepSpec)> {
    let json = fs::read_to_string(path)?;
    let step = StepSpec::from_json(&json)?;
    tracing::debug!(step = %step.title, fields = step.fields.len(), "loaded step");
    Ok((json, step))
}

fn read_json(path: Option<&PathBuf>) -> CliResult<Value> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(Value::Object(Map::new())),
    }
}

fn component_config(step_json: &str, today: Option<&str>) -> String {
    let mut config = json!({ "step_json": step_json });
    if let Some(today) = today {
        config["today"] = Value::String(today.to_string());
    }
    config.to_string()
}

fn reference_date(today: Option<&str>) -> CliResult<NaiveDate> {
    match today {
        Some(text) => {
            parse_date(text).ok_or_else(|| format!("invalid --today value '{}'", text).into())
        }
        None => Ok(local_today()),
    }
}

fn run_validate(step_path: PathBuf, values_path: PathBuf, today: Option<String>) -> CliResult<()> {
    let (_, step) = load_step(&step_path)?;
    let values = ValueStore::from_json(&read_json(Some(&values_path))?);
    let ctx = ValidationContext::at(&values, reference_date(today.as_deref())?);

    let result = validate_step(&step.fields, &ctx);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &StepValidation) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!("  {} - {}", error.path, error.message);
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required values: {}",
            result.missing_required.join(", ")
        );
    }
}

fn run_render(
    step_path: PathBuf,
    values_path: Option<PathBuf>,
    state_path: Option<PathBuf>,
    today: Option<String>,
    format: RenderMode,
) -> CliResult<()> {
    let (step_json, step) = load_step(&step_path)?;
    let config_json = component_config(&step_json, today.as_deref());
    let mut session = json!({ "values": read_json(values_path.as_ref())? });
    if let Some(path) = state_path.as_ref() {
        session["state"] = read_json(Some(path))?;
    }
    let session = session.to_string();
    match format {
        RenderMode::Text => {
            let text = component_render_text(&step.id, &config_json, &session);
            parse_component_text(&text)?;
            println!("{}", text);
        }
        RenderMode::Json => {
            let ui = parse_component_result(&component_render_json_ui(
                &step.id,
                &config_json,
                &session,
            ))?;
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }
    }
    Ok(())
}

fn run_schema(out: Option<PathBuf>) -> CliResult<()> {
    let pretty = serde_json::to_string_pretty(&step_schema())?;
    match out {
        Some(path) => {
            fs::write(&path, format!("{}\n", pretty))?;
            println!("Schema written to {}", path.display());
        }
        None => println!("{}", pretty),
    }
    Ok(())
}

/// One interactive session: the engine's values and state, round-tripped
/// through the host facade.
struct WizardSession {
    step_id: String,
    config_json: String,
    document: Value,
}

impl WizardSession {
    fn render(&self) -> CliResult<(String, Value)> {
        let raw =
            component_render_json_ui(&self.step_id, &self.config_json, &self.session_json());
        let ui = parse_component_result(&raw)?;
        Ok((raw, ui))
    }

    fn session_json(&self) -> String {
        self.document.to_string()
    }

    fn send(&mut self, event: Value) -> CliResult<Vec<Value>> {
        tracing::debug!(%event, "dispatching");
        let response = parse_component_result(&dispatch(
            &self.step_id,
            &self.config_json,
            &self.session_json(),
            &event.to_string(),
        ))?;
        self.document = json!({
            "values": response["values"].clone(),
            "state": response["state"].clone(),
        });
        Ok(response["effects"].as_array().cloned().unwrap_or_default())
    }

    fn field_error(&self, name: &str) -> CliResult<Option<String>> {
        let response = parse_component_result(&component_validate_field(
            &self.step_id,
            &self.config_json,
            &self.document["values"].to_string(),
            name,
        ))?;
        if response["valid"].as_bool().unwrap_or(false) {
            Ok(None)
        } else {
            Ok(Some(
                response["error"]
                    .as_str()
                    .unwrap_or("invalid value")
                    .to_string(),
            ))
        }
    }

    fn member_count(&self, name: &str) -> usize {
        self.document["values"][name]
            .as_str()
            .and_then(|raw| serde_json::from_str::<Vec<Value>>(raw).ok())
            .map(|members| members.len())
            .unwrap_or(0)
    }
}

fn run_wizard(
    step_path: PathBuf,
    values_path: Option<PathBuf>,
    today: Option<String>,
    verbose: bool,
    values_json: bool,
    format: Option<RenderMode>,
) -> CliResult<()> {
    let (step_json, step) = load_step(&step_path)?;
    let mut session = WizardSession {
        step_id: step.id.clone(),
        config_json: component_config(&step_json, today.as_deref()),
        document: json!({ "values": read_json(values_path.as_ref())? }),
    };
    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), values_json);

    loop {
        let (ui_raw, ui) = session.render()?;
        print_render_output(format, &session, &ui_raw);
        let payload =
            WizardPayload::from_json(&ui).map_err(|err| format!("wizard UI error: {}", err))?;
        presenter.show_header(&payload);
        presenter.show_status(&payload);

        let Some(field) = payload.pending_field() else {
            let effects = session.send(json!({ "event": "group_advance" }))?;
            if let Some(submitted) = submitted_payload(&effects) {
                presenter.show_completion(&submitted);
                break;
            }
            if effects.iter().any(|effect| effect["effect"] == "blocked") {
                return Err("the active group is blocked by validation errors".into());
            }
            continue;
        };

        presenter.show_prompt(&PromptContext::new(field, &payload));
        let events = if field.kind == FieldKind::Repeatable {
            prompt_members(&step, field, &mut session, &presenter)?
        } else {
            let raw = prompt_line("> ")?;
            match parse_answer(field, &raw) {
                Ok(events) => events,
                Err(err) => {
                    presenter.show_parse_error(&err);
                    continue;
                }
            }
        };
        for event in events {
            session.send(event)?;
        }
        session.send(json!({ "event": "field_touched", "name": field.name }))?;
        session.send(json!({ "event": "field_confirmed", "name": field.name }))?;
        if let Some(error) = session.field_error(&field.name)? {
            presenter.show_field_error(&field.label, &error);
        }
    }

    Ok(())
}

fn submitted_payload(effects: &[Value]) -> Option<BTreeMap<String, String>> {
    effects
        .iter()
        .find(|effect| effect["effect"] == "submit")
        .and_then(|effect| serde_json::from_value(effect["payload"].clone()).ok())
}

/// Collects one member at a time until the group validates and the user
/// stops adding.
fn prompt_members(
    step: &StepSpec,
    field: &WizardField,
    session: &mut WizardSession,
    presenter: &WizardPresenter,
) -> CliResult<Vec<Value>> {
    let descriptor = step
        .field(&field.name)
        .ok_or_else(|| format!("step has no field '{}'", field.name))?;
    loop {
        session.send(json!({ "event": "repeatable_add", "name": field.name }))?;
        println!("{} {}:", field.label, session.member_count(&field.name));
        for sub_field in &descriptor.fields {
            let prompt = if sub_field.required {
                format!("  {} *: ", sub_field.display_label())
            } else {
                format!("  {}: ", sub_field.display_label())
            };
            let raw = prompt_line(&prompt)?;
            session.send(json!({
                "event": "repeatable_set",
                "name": field.name,
                "field": sub_field.name,
                "value": raw,
            }))?;
        }

        if let Some(error) = session.field_error(&field.name)? {
            presenter.show_field_error(&field.label, &error);
            let last = session.member_count(&field.name).saturating_sub(1);
            session.send(json!({
                "event": "repeatable_remove",
                "name": field.name,
                "index": last,
            }))?;
            continue;
        }
        if !prompt_bool(&format!("Add another {}?", field.label.to_lowercase()))? {
            return Ok(Vec::new());
        }
    }
}

/// Turns one typed line into the engine events it stands for.
fn parse_answer(field: &WizardField, raw: &str) -> Result<Vec<Value>, AnswerParseError> {
    let raw = raw.trim();
    let name = field.name.as_str();
    match field.kind {
        FieldKind::Choice => {
            if raw.is_empty() {
                return Ok(vec![change_event(name, "")]);
            }
            let value = resolve_option(field, raw)?;
            Ok(vec![change_event(name, &value)])
        }
        FieldKind::Combobox => {
            let query = match raw.parse::<usize>() {
                Ok(_) => resolve_option(field, raw).map(|value| option_label(field, &value))?,
                Err(_) => raw.to_string(),
            };
            let needle = query.to_lowercase();
            if !field
                .options
                .iter()
                .any(|option| option.label.to_lowercase().contains(&needle))
            {
                return Err(AnswerParseError::new(
                    format!("No option matches '{}'.", raw),
                    Some(format!("options: {}", option_labels(field))),
                ));
            }
            Ok(vec![
                json!({ "event": "combobox_query", "name": name, "query": query }),
                json!({ "event": "combobox_key", "key": "enter" }),
            ])
        }
        FieldKind::Checkbox => {
            let wanted = parse_yes_no(raw)?;
            let checked = field.value == "true";
            if wanted == checked {
                Ok(Vec::new())
            } else {
                Ok(vec![toggle_event(name, "")])
            }
        }
        FieldKind::CheckboxGroup => {
            let wanted = raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| resolve_option(field, part))
                .collect::<Result<Vec<_>, _>>()?;
            let current: Vec<&str> = field
                .value
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect();
            Ok(field
                .options
                .iter()
                .filter(|option| {
                    wanted.contains(&option.value) != current.contains(&option.value.as_str())
                })
                .map(|option| toggle_event(name, &option.value))
                .collect())
        }
        FieldKind::Text | FieldKind::Date | FieldKind::Number | FieldKind::Repeatable => {
            Ok(vec![change_event(name, raw)])
        }
    }
}

fn change_event(name: &str, value: &str) -> Value {
    json!({ "event": "field_changed", "name": name, "value": value })
}

fn toggle_event(name: &str, option: &str) -> Value {
    json!({ "event": "option_toggled", "name": name, "option": option })
}

/// Accepts a 1-based option number, a label, or a value (case-insensitive).
fn resolve_option(field: &WizardField, raw: &str) -> Result<String, AnswerParseError> {
    if let Ok(index) = raw.parse::<usize>()
        && let Some(option) = index.checked_sub(1).and_then(|idx| field.options.get(idx))
    {
        return Ok(option.value.clone());
    }
    field
        .options
        .iter()
        .find(|option| {
            option.label.eq_ignore_ascii_case(raw) || option.value.eq_ignore_ascii_case(raw)
        })
        .map(|option| option.value.clone())
        .ok_or_else(|| {
            AnswerParseError::new(
                format!("Choose one of: {}.", option_labels(field)),
                Some(format!("got '{}'", raw)),
            )
        })
}

fn option_label(field: &WizardField, value: &str) -> String {
    field
        .options
        .iter()
        .find(|option| option.value == value)
        .map(|option| option.label.clone())
        .unwrap_or_else(|| value.to_string())
}

fn option_labels(field: &WizardField) -> String {
    field
        .options
        .iter()
        .map(|option| option.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_yes_no(raw: &str) -> Result<bool, AnswerParseError> {
    match raw.to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Ok(true),
        "n" | "no" | "false" | "0" | "" => Ok(false),
        _ => Err(AnswerParseError::new(
            "Please answer yes or no.",
            Some("expected yes/no, y/n, true/false".to_string()),
        )),
    }
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

/// Text responses are plain unless the call failed.
fn parse_component_text(response: &str) -> CliResult<()> {
    if response.starts_with('{')
        && let Ok(value) = serde_json::from_str::<Value>(response)
        && let Some(error) = value.get("error").and_then(Value::as_str)
    {
        return Err(error.into());
    }
    Ok(())
}

fn print_render_output(mode: Option<RenderMode>, session: &WizardSession, ui_raw: &str) {
    match mode {
        None => {}
        Some(RenderMode::Text) => {
            let text = component_render_text(
                &session.step_id,
                &session.config_json,
                &session.session_json(),
            );
            println!("{}", text);
        }
        Some(RenderMode::Json) => println!("JSON UI:\n{}", ui_raw),
    }
}

fn prompt_line(prompt: &str) -> CliResult<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err("input closed before the step was completed".into());
    }
    Ok(line.trim().to_string())
}

fn prompt_bool(prompt: &str) -> CliResult<bool> {
    loop {
        let raw = prompt_line(&format!("{} [y/N]: ", prompt))?;
        match parse_yes_no(&raw) {
            Ok(value) => return Ok(value),
            Err(err) => println!("{}", err.user_message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wizard::WizardOption;

    fn field(kind: FieldKind, value: &str) -> WizardField {
        WizardField {
            name: "make".into(),
            label: "Vehicle make".into(),
            kind,
            required: true,
            value: value.into(),
            valid: false,
            error: None,
            active: true,
            placeholder: None,
            options: vec![
                WizardOption {
                    label: "Toyota".into(),
                    value: "toyota".into(),
                },
                WizardOption {
                    label: "Nissan".into(),
                    value: "nissan".into(),
                },
            ],
        }
    }

    #[test]
    fn choices_accept_numbers_labels_and_values() {
        let choice = field(FieldKind::Choice, "");
        for raw in ["2", "nissan", "NISSAN", "Nissan"] {
            let events = parse_answer(&choice, raw).expect("valid choice");
            assert_eq!(events, vec![change_event("make", "nissan")]);
        }
        assert!(parse_answer(&choice, "7").is_err());
        assert!(parse_answer(&choice, "Subaru").is_err());
    }

    #[test]
    fn combobox_answers_become_query_and_enter() {
        let combobox = field(FieldKind::Combobox, "");
        let events = parse_answer(&combobox, "toy").expect("matching query");
        assert_eq!(events[0]["event"], "combobox_query");
        assert_eq!(events[0]["query"], "toy");
        assert_eq!(events[1]["key"], "enter");

        let events = parse_answer(&combobox, "2").expect("numbered option");
        assert_eq!(events[0]["query"], "Nissan");
        assert!(parse_answer(&combobox, "zzz").is_err());
    }

    #[test]
    fn checkbox_groups_toggle_only_differences() {
        let group = field(FieldKind::CheckboxGroup, "toyota");
        let events = parse_answer(&group, "nissan").expect("valid options");
        assert_eq!(
            events,
            vec![toggle_event("make", "toyota"), toggle_event("make", "nissan")]
        );
        assert!(parse_answer(&group, "toyota").expect("same").is_empty());
    }

    #[test]
    fn checkboxes_toggle_when_answer_differs() {
        let checkbox = field(FieldKind::Checkbox, "");
        assert_eq!(
            parse_answer(&checkbox, "yes").expect("yes"),
            vec![toggle_event("make", "")]
        );
        assert!(parse_answer(&checkbox, "no").expect("no").is_empty());
        assert!(parse_answer(&checkbox, "maybe").is_err());
    }

    #[test]
    fn text_answers_are_sent_as_typed() {
        let text = field(FieldKind::Text, "");
        assert_eq!(
            parse_answer(&text, "  Ada  ").expect("text"),
            vec![change_event("make", "Ada")]
        );
    }

    #[test]
    fn config_carries_reference_date() {
        let config: Value =
            serde_json::from_str(&component_config("{}", Some("2026-10-19"))).expect("json");
        assert_eq!(config["today"], "2026-10-19");
        assert_eq!(config["step_json"], "{}");
    }

    #[test]
    fn load_step_reads_and_checks_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("step.json");
        fs::write(&path, r#"{"title": "Tiny", "fields": [{"name": "a", "label": "A"}]}"#)
            .expect("write step");
        let (json, step) = load_step(&path).expect("step loads");
        assert!(json.contains("Tiny"));
        assert_eq!(step.fields.len(), 1);

        fs::write(&path, r#"{"title": "Tiny", "fields": [{"name": ""}]}"#).expect("write step");
        assert!(load_step(&path).is_err());
    }

    #[test]
    fn submitted_payload_reads_submit_effect() {
        let effects = vec![
            json!({ "effect": "value_changed", "name": "a", "value": "1" }),
            json!({ "effect": "submit", "payload": { "a": "1" } }),
        ];
        let payload = submitted_payload(&effects).expect("payload");
        assert_eq!(payload.get("a").map(String::as_str), Some("1"));
        assert!(submitted_payload(&effects[..1]).is_none());
    }
}
