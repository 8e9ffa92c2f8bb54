use std::collections::BTreeMap;

use serde_json::Value;

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: field prompts only.
    Clean,
    /// Verbose output: status, group position, displayed fields.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts and progress while the engine walks the step.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_values_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_values_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_values_json,
        }
    }

    pub fn show_header(&mut self, payload: &WizardPayload) {
        if self.header_printed {
            return;
        }
        println!("Step: {}", payload.step_title);
        if let Some(description) = &payload.description {
            println!("{}", description);
        }
        self.header_printed = true;
    }

    pub fn show_status(&self, payload: &WizardPayload) {
        if !self.verbosity.is_verbose() {
            return;
        }
        println!(
            "Status: {} ({}/{} valid), group {} of {}",
            payload.status,
            payload.progress.valid,
            payload.progress.total,
            payload.group_index + 1,
            payload.total_groups.max(1)
        );
        println!("Displayed fields:");
        for field in &payload.fields {
            let marker = if field.active { "*" } else { "-" };
            let mut entry = format!(" {} {} ({})", marker, field.name, field.label);
            if field.required {
                entry.push_str(" [required]");
            }
            if !field.value.is_empty() {
                entry.push_str(&format!(" = {}", field.value));
            }
            println!("{}", entry);
            if let Some(error) = &field.error {
                println!("     ! {}", error);
            }
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.group, prompt.total_groups, prompt.label);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{}", line);
        if !prompt.options.is_empty() {
            for (idx, option) in prompt.options.iter().enumerate() {
                println!("  {}) {}", idx + 1, option.label);
            }
        }
        if self.verbosity.is_verbose()
            && let Some(placeholder) = &prompt.placeholder
        {
            println!("Example: {}", placeholder);
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_field_error(&self, label: &str, message: &str) {
        eprintln!("{}: {}", label, message);
    }

    pub fn show_completion(&self, payload: &BTreeMap<String, String>) {
        println!("Done ✅");
        if self.show_values_json {
            match serde_json::to_string_pretty(payload) {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Failed to serialize values to JSON: {}", err),
            }
        } else {
            for (name, value) in payload {
                println!("  {}: {}", name, value);
            }
        }
    }
}

/// View extracted from the host facade's JSON rendering.
pub struct WizardPayload {
    pub step_title: String,
    pub description: Option<String>,
    pub status: String,
    pub group_index: usize,
    pub total_groups: usize,
    pub progress: RenderProgress,
    pub fields: Vec<WizardField>,
}

impl WizardPayload {
    pub fn from_json(json: &Value) -> Result<Self, String> {
        let step_title = json
            .get("step_title")
            .and_then(Value::as_str)
            .ok_or_else(|| "wizard payload missing step_title".to_string())?
            .to_string();
        let description = json
            .get("description")
            .and_then(Value::as_str)
            .map(String::from);
        let status = json
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("need_input")
            .to_string();
        let navigation = json
            .get("navigation")
            .ok_or_else(|| "wizard payload missing navigation".to_string())?;
        let group_index = navigation
            .get("group_index")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let total_groups = navigation
            .get("total_groups")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let progress = json
            .get("progress")
            .and_then(Value::as_object)
            .ok_or_else(|| "wizard payload missing progress".to_string())?;
        let valid = progress.get("valid").and_then(Value::as_u64).unwrap_or(0) as usize;
        let total = progress.get("total").and_then(Value::as_u64).unwrap_or(0) as usize;
        let fields = json
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| "wizard payload missing fields".to_string())?
            .iter()
            .map(WizardField::from_json)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            step_title,
            description,
            status,
            group_index,
            total_groups,
            progress: RenderProgress { valid, total },
            fields,
        })
    }

    /// First field of the active group that still needs input.
    pub fn pending_field(&self) -> Option<&WizardField> {
        self.fields
            .iter()
            .find(|field| field.active && !field.valid)
    }
}

pub struct RenderProgress {
    pub valid: usize,
    pub total: usize,
}

#[derive(Clone)]
pub struct WizardOption {
    pub label: String,
    pub value: String,
}

/// Minimal view of a displayed field used for prompting.
pub struct WizardField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub value: String,
    pub valid: bool,
    pub error: Option<String>,
    pub active: bool,
    pub placeholder: Option<String>,
    pub options: Vec<WizardOption>,
}

impl WizardField {
    fn from_json(value: &Value) -> Result<Self, String> {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "field missing name".to_string())?
            .to_string();
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(&name)
            .to_string();
        let kind =
            FieldKind::from_label(value.get("type").and_then(Value::as_str).unwrap_or("text"));
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(String::from);
        let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
        let options = value
            .get("options")
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|option| {
                        Some(WizardOption {
                            label: option.get("label")?.as_str()?.to_string(),
                            value: option.get("value")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            required: flag("required"),
            valid: flag("valid"),
            active: flag("active"),
            value: text("value").unwrap_or_default(),
            error: text("error"),
            placeholder: text("placeholder"),
            name,
            label,
            kind,
            options,
        })
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub group: usize,
    pub total_groups: usize,
    pub label: String,
    pub required: bool,
    pub hint: Option<String>,
    pub placeholder: Option<String>,
    pub options: Vec<WizardOption>,
}

impl PromptContext {
    pub fn new(field: &WizardField, payload: &WizardPayload) -> Self {
        Self {
            group: payload.group_index + 1,
            total_groups: payload.total_groups.max(1),
            label: field.label.clone(),
            required: field.required,
            hint: field.kind.hint(),
            placeholder: field.placeholder.clone(),
            options: field.options.clone(),
        }
    }
}

/// Prompting strategies, keyed by the field `type`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Number,
    Choice,
    Combobox,
    Checkbox,
    CheckboxGroup,
    Repeatable,
}

impl FieldKind {
    pub fn from_label(label: &str) -> Self {
        match label {
            "date" => FieldKind::Date,
            "number" => FieldKind::Number,
            "select" | "radio" => FieldKind::Choice,
            "combobox" => FieldKind::Combobox,
            "checkbox" => FieldKind::Checkbox,
            "checkbox-group" => FieldKind::CheckboxGroup,
            "repeatable-group" => FieldKind::Repeatable,
            _ => FieldKind::Text,
        }
    }

    fn hint(&self) -> Option<String> {
        let hint = match self {
            FieldKind::Date => "(YYYY-MM-DD)",
            FieldKind::Number => "(number)",
            FieldKind::Choice => "(number or label)",
            FieldKind::Combobox => "(type to search)",
            FieldKind::Checkbox => "(yes/no)",
            FieldKind::CheckboxGroup => "(comma-separated numbers or labels)",
            FieldKind::Repeatable => "(one entry at a time)",
            FieldKind::Text => return None,
        };
        Some(hint.to_string())
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}
