use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use form_spec::dates::parse_date;
use form_spec::{
    EngineState, FormEvent, RenderPayload, SpecError, StepSpec, ValidationContext, ValueStore,
    build_render_payload, reduce, render_json_ui as form_render_json_ui,
    render_text as form_render_text, step_schema, validate_field as form_validate_field,
    validate_step,
};

/// Step served when the config does not carry one.
pub const DEFAULT_STEP: &str = include_str!("../../form-spec/tests/fixtures/motor_quote.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("invalid step: {0}")]
    Step(#[from] SpecError),
    #[error("step '{0}' is not available")]
    StepUnavailable(String),
    #[error("field '{0}' is not part of the step")]
    UnknownField(String),
    #[error("invalid reference date '{0}'")]
    InvalidToday(String),
    #[error("failed to parse session: {0}")]
    SessionParse(#[source] serde_json::Error),
    #[error("failed to parse event: {0}")]
    EventParse(#[source] serde_json::Error),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    step_json: Option<String>,
    /// Pins the reference date (`YYYY-MM-DD`) instead of reading the clock.
    #[serde(default)]
    today: Option<String>,
}

/// A loaded step plus the date validations run against.
struct Loaded {
    step: StepSpec,
    today: NaiveDate,
}

fn parse_config(config_json: &str) -> Result<ComponentConfig, ComponentError> {
    if config_json.trim().is_empty() {
        return Ok(ComponentConfig::default());
    }
    serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)
}

fn load(step_id: &str, config_json: &str) -> Result<Loaded, ComponentError> {
    let config = parse_config(config_json)?;
    let step = StepSpec::from_json(config.step_json.as_deref().unwrap_or(DEFAULT_STEP))?;
    if step.id != step_id {
        return Err(ComponentError::StepUnavailable(step_id.to_string()));
    }
    let today = match config.today.as_deref() {
        Some(text) => {
            parse_date(text).ok_or_else(|| ComponentError::InvalidToday(text.to_string()))?
        }
        None => form_spec::dates::today(),
    };
    Ok(Loaded { step, today })
}

/// Values are read leniently: non-string scalars are stringified and a
/// missing or non-object document is an empty store.
fn parse_values(values_json: &str) -> ValueStore {
    serde_json::from_str::<Value>(values_json)
        .map(|value| ValueStore::from_json(&value))
        .unwrap_or_default()
}

/// Serialized engine session: `{"values": {...}, "state": {...}}`.
struct Session {
    values: ValueStore,
    state: EngineState,
}

fn parse_session(step: &StepSpec, session_json: &str) -> Result<Session, ComponentError> {
    let document: Value = if session_json.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(session_json).map_err(ComponentError::SessionParse)?
    };
    let values = document
        .get("values")
        .map(ValueStore::from_json)
        .unwrap_or_default();
    let mut state = match document.get("state") {
        Some(Value::Null) | None => EngineState::for_step(step),
        Some(state) => {
            serde_json::from_value(state.clone()).map_err(ComponentError::SessionParse)?
        }
    };
    state.sync_step(step);
    Ok(Session { values, state })
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => {
            tracing::debug!(error = %err, "component call failed");
            json!({ "error": err.to_string() }).to_string()
        }
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

pub fn describe(step_id: &str, config_json: &str) -> String {
    respond(load(step_id, config_json).and_then(|loaded| {
        serde_json::to_value(loaded.step).map_err(ComponentError::JsonEncode)
    }))
}

/// JSON Schema of the step configuration format.
pub fn get_config_schema() -> String {
    respond(Ok(step_schema()))
}

/// Validates every visible field of the step against `values_json`.
pub fn validate_values(step_id: &str, config_json: &str, values_json: &str) -> String {
    respond(load(step_id, config_json).and_then(|loaded| {
        let values = parse_values(values_json);
        let ctx = ValidationContext::at(&values, loaded.today);
        serde_json::to_value(validate_step(&loaded.step.fields, &ctx))
            .map_err(ComponentError::JsonEncode)
    }))
}

/// Validates one field's stored value, with the other values as context for
/// cross-field rules.
pub fn validate_field(step_id: &str, config_json: &str, values_json: &str, field: &str) -> String {
    respond(load(step_id, config_json).and_then(|loaded| {
        let descriptor = loaded
            .step
            .field(field)
            .ok_or_else(|| ComponentError::UnknownField(field.to_string()))?;
        let values = parse_values(values_json);
        let ctx = ValidationContext::at(&values, loaded.today);
        serde_json::to_value(form_validate_field(descriptor, None, &ctx))
            .map_err(ComponentError::JsonEncode)
    }))
}

fn render_payload(
    step_id: &str,
    config_json: &str,
    session_json: &str,
) -> Result<RenderPayload, ComponentError> {
    let loaded = load(step_id, config_json)?;
    let session = parse_session(&loaded.step, session_json)?;
    Ok(build_render_payload(
        &loaded.step,
        &session.values,
        &session.state,
        loaded.today,
    ))
}

pub fn render_text(step_id: &str, config_json: &str, session_json: &str) -> String {
    respond_string(
        render_payload(step_id, config_json, session_json)
            .map(|payload| form_render_text(&payload)),
    )
}

pub fn render_json_ui(step_id: &str, config_json: &str, session_json: &str) -> String {
    respond(
        render_payload(step_id, config_json, session_json)
            .map(|payload| form_render_json_ui(&payload)),
    )
}

/// Runs one reducer step. The response carries the next session
/// (`values`, `state`), the emitted `effects`, and the rendered `view`.
pub fn dispatch(step_id: &str, config_json: &str, session_json: &str, event_json: &str) -> String {
    respond(load(step_id, config_json).and_then(|loaded| {
        let mut session = parse_session(&loaded.step, session_json)?;
        let event: FormEvent =
            serde_json::from_str(event_json).map_err(ComponentError::EventParse)?;
        let transition = reduce(&session.state, &loaded.step, &session.values, loaded.today, event);
        for effect in &transition.effects {
            if let form_spec::Effect::ValueChanged { name, value } = effect {
                session.values.set(name.clone(), value.clone());
            }
        }
        let view = form_render_json_ui(&build_render_payload(
            &loaded.step,
            &session.values,
            &transition.state,
            loaded.today,
        ));
        Ok(json!({
            "values": session.values.to_json(),
            "state": serde_json::to_value(&transition.state).map_err(ComponentError::JsonEncode)?,
            "effects": serde_json::to_value(&transition.effects).map_err(ComponentError::JsonEncode)?,
            "view": view,
        }))
    }))
}
