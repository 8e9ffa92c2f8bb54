use chrono::NaiveDate;
use serde_json::{Map, Value, json};

use crate::combobox::ComboboxState;
use crate::engine::EngineState;
use crate::navigator::{Navigation, group_range, navigation};
use crate::repeatable::{clamp_active, parse_members};
use crate::reveal::{DisplayMode, displayed_fields};
use crate::spec::field::{FieldDescriptor, FieldOption, FieldType};
use crate::spec::step::StepSpec;
use crate::validate::{ValidationContext, ValidationError, validate_field};
use crate::values::ValueStore;
use crate::visibility::visible_fields;

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// At least one visible field is still invalid.
    NeedInput,
    /// Every visible field validates.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }
}

/// Progress counters exposed to renderers.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub valid: usize,
    pub total: usize,
}

/// Open-menu details for a combobox field.
#[derive(Debug, Clone)]
pub struct RenderCombobox {
    pub open: bool,
    pub query: String,
    pub active_index: usize,
    pub filtered: Vec<FieldOption>,
}

/// Member summary for a repeatable-group field.
#[derive(Debug, Clone)]
pub struct RenderMembers {
    pub count: usize,
    pub active: usize,
    pub fields: Vec<String>,
}

/// A single displayed field.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub name: String,
    pub label: String,
    pub placeholder: Option<String>,
    pub optional_label: Option<String>,
    pub kind: FieldType,
    pub required: bool,
    pub value: String,
    pub valid: bool,
    /// Only set when the error should be surfaced (touched or show-errors).
    pub error: Option<String>,
    /// Whether the field belongs to the active group.
    pub active: bool,
    pub options: Vec<FieldOption>,
    pub combobox: Option<RenderCombobox>,
    pub members: Option<RenderMembers>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub step_id: String,
    pub step_title: String,
    pub description: Option<String>,
    pub mode: DisplayMode,
    pub status: RenderStatus,
    pub navigation: Navigation,
    pub progress: RenderProgress,
    pub fields: Vec<RenderField>,
    /// Surfaced errors of the active group.
    pub errors: Vec<ValidationError>,
}

/// Build the renderer payload from the step, values, and engine state.
pub fn build_render_payload(
    step: &StepSpec,
    values: &ValueStore,
    state: &EngineState,
    today: NaiveDate,
) -> RenderPayload {
    let ctx = ValidationContext::at(values, today);
    let mode = DisplayMode::from_auto_advance(step.auto_advance);
    let size = step.effective_group_size();
    let visible = visible_fields(&step.fields, values);
    let nav = navigation(step, &visible, state.active_group, &ctx);
    let active_range = group_range(nav.group_index, size, visible.len());
    let active_names: Vec<&str> = visible[active_range]
        .iter()
        .map(|field| field.name.as_str())
        .collect();

    let valid = visible
        .iter()
        .filter(|field| validate_field(field, None, &ctx).valid)
        .count();

    let fields: Vec<RenderField> =
        displayed_fields(&step.fields, &ctx, size, mode, nav.group_index)
            .into_iter()
            .map(|field| {
                render_field(
                    field,
                    values,
                    state,
                    &ctx,
                    active_names.contains(&field.name.as_str()),
                )
            })
            .collect();

    let errors = fields
        .iter()
        .filter(|field| field.active)
        .filter_map(|field| {
            field.error.as_ref().map(|message| ValidationError {
                field: field.name.clone(),
                path: format!("/{}", field.name),
                message: message.clone(),
                code: None,
            })
        })
        .collect();

    let status = if valid == visible.len() {
        RenderStatus::Complete
    } else {
        RenderStatus::NeedInput
    };

    RenderPayload {
        step_id: step.id.clone(),
        step_title: step.title.clone(),
        description: step.description.clone(),
        mode,
        status,
        navigation: nav,
        progress: RenderProgress {
            valid,
            total: visible.len(),
        },
        fields,
        errors,
    }
}

fn render_field(
    field: &FieldDescriptor,
    values: &ValueStore,
    state: &EngineState,
    ctx: &ValidationContext<'_>,
    active: bool,
) -> RenderField {
    let outcome = validate_field(field, None, ctx);
    let error = (!outcome.valid && active && state.surfaces_error(&field.name))
        .then_some(outcome.error);
    let combobox = (field.kind == FieldType::Combobox)
        .then(|| render_combobox(field, &state.combobox));
    let members = (field.kind == FieldType::RepeatableGroup).then(|| {
        let count = parse_members(values.get(&field.name)).len();
        RenderMembers {
            count,
            active: clamp_active(count, state.repeatable_index(&field.name)),
            fields: field.fields.iter().map(|sub| sub.name.clone()).collect(),
        }
    });

    RenderField {
        name: field.name.clone(),
        label: field.label.clone(),
        placeholder: field.placeholder.clone(),
        optional_label: field.optional_label.clone(),
        kind: field.kind,
        required: field.required,
        value: values.get(&field.name).to_string(),
        valid: outcome.valid,
        error,
        active,
        options: field.options.clone(),
        combobox,
        members,
    }
}

fn render_combobox(field: &FieldDescriptor, state: &ComboboxState) -> RenderCombobox {
    let open = state.is_open_for(&field.name);
    let (query, active_index) = if open {
        (state.query.clone(), state.active_index)
    } else {
        (String::new(), 0)
    };
    RenderCombobox {
        open,
        filtered: crate::combobox::filter_options(&field.options, &query)
            .into_iter()
            .cloned()
            .collect(),
        query,
        active_index,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("name".into(), Value::String(field.name.clone()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert("type".into(), Value::String(field.kind.as_str().to_string()));
            map.insert("required".into(), Value::Bool(field.required));
            if let Some(placeholder) = &field.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            if let Some(optional_label) = &field.optional_label {
                map.insert("optional_label".into(), Value::String(optional_label.clone()));
            }
            map.insert("value".into(), Value::String(field.value.clone()));
            map.insert("valid".into(), Value::Bool(field.valid));
            map.insert(
                "error".into(),
                field.error.clone().map(Value::String).unwrap_or(Value::Null),
            );
            map.insert("active".into(), Value::Bool(field.active));
            if !field.options.is_empty() {
                map.insert("options".into(), options_json(&field.options));
            }
            if let Some(combobox) = &field.combobox {
                map.insert(
                    "combobox".into(),
                    json!({
                        "open": combobox.open,
                        "query": combobox.query,
                        "active_index": combobox.active_index,
                        "filtered": options_json(&combobox.filtered),
                    }),
                );
            }
            if let Some(members) = &field.members {
                map.insert(
                    "members".into(),
                    json!({
                        "count": members.count,
                        "active": members.active,
                        "fields": members.fields,
                    }),
                );
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    let errors = payload
        .errors
        .iter()
        .map(|error| json!({ "field": error.field, "message": error.message }))
        .collect::<Vec<_>>();

    json!({
        "step_id": payload.step_id,
        "step_title": payload.step_title,
        "description": payload.description,
        "mode": match payload.mode {
            DisplayMode::Standard => "standard",
            DisplayMode::AutoAdvance => "auto_advance",
        },
        "status": payload.status.as_str(),
        "navigation": {
            "group_index": payload.navigation.group_index,
            "total_groups": payload.navigation.total_groups,
            "can_advance": payload.navigation.can_advance,
            "can_go_back": payload.navigation.can_go_back,
            "is_last_group": payload.navigation.is_last_group,
            "forward_label": payload.navigation.forward_label,
        },
        "progress": {
            "valid": payload.progress.valid,
            "total": payload.progress.total,
        },
        "fields": fields,
        "errors": errors,
    })
}

fn options_json(options: &[FieldOption]) -> Value {
    Value::Array(
        options
            .iter()
            .map(|option| json!({ "label": option.label, "value": option.value }))
            .collect(),
    )
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Step: {}", payload.step_title));
    if let Some(description) = &payload.description {
        lines.push(description.clone());
    }
    lines.push(format!(
        "Status: {} ({}/{} valid)",
        payload.status.as_str(),
        payload.progress.valid,
        payload.progress.total
    ));
    if payload.navigation.total_groups > 0 {
        lines.push(format!(
            "Group {} of {}",
            payload.navigation.group_index + 1,
            payload.navigation.total_groups
        ));
    }

    for field in &payload.fields {
        let marker = if field.active { ">" } else { " " };
        let mut entry = format!("{} {} ({})", marker, field.label_or_name(), field.name);
        if field.required {
            entry.push_str(" [required]");
        } else if let Some(optional) = &field.optional_label {
            entry.push_str(&format!(" [{}]", optional));
        }
        if !field.value.is_empty() {
            entry.push_str(&format!(" = {}", field.value));
        }
        lines.push(entry);
        if let Some(members) = &field.members {
            lines.push(format!(
                "    members: {} (editing #{})",
                members.count,
                members.active + 1
            ));
        }
        if let Some(error) = &field.error {
            lines.push(format!("    ! {}", error));
        }
    }

    let mut controls = Vec::new();
    if payload.navigation.can_go_back {
        controls.push("Back".to_string());
    }
    if payload.navigation.can_advance {
        controls.push(payload.navigation.forward_label.clone());
    } else {
        controls.push(format!("{} (disabled)", payload.navigation.forward_label));
    }
    lines.push(format!("Actions: {}", controls.join(" | ")));

    lines.join("\n")
}

impl RenderField {
    pub fn label_or_name(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}
