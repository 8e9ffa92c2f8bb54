use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dates::{format_date, parse_date, resolve_date_bound, today, years_before};
use crate::repeatable::{member_values, parse_members};
use crate::spec::field::{FieldDescriptor, FieldType};
use crate::values::ValueStore;
use crate::visibility::{is_visible, visible_fields};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$").expect("static email regex")
});
static UG_MOBILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+2567\d{8}|07\d{8})$").expect("static mobile regex"));
static NIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(CM|CF)\d{11}$").expect("static nin regex"));

/// Outcome of validating one field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldValidation {
    pub valid: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: String::new(),
            code: None,
        }
    }

    fn fail(code: &str, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: message.into(),
            code: Some(code.to_string()),
        }
    }
}

/// Values and the reference date a validation runs against.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub values: &'a ValueStore,
    pub today: NaiveDate,
}

impl<'a> ValidationContext<'a> {
    pub fn new(values: &'a ValueStore) -> Self {
        Self::at(values, today())
    }

    pub fn at(values: &'a ValueStore, today: NaiveDate) -> Self {
        Self { values, today }
    }
}

/// Validates `field` against `candidate`, or its stored value when `None`.
pub fn validate_field(
    field: &FieldDescriptor,
    candidate: Option<&str>,
    ctx: &ValidationContext<'_>,
) -> FieldValidation {
    let raw = candidate.unwrap_or_else(|| ctx.values.get(&field.name));
    let label = field.display_label();

    if field.kind == FieldType::RepeatableGroup {
        return validate_repeatable(field, raw, ctx.today);
    }

    let value = raw.trim();
    if value.is_empty() {
        if field.required {
            return FieldValidation::fail("required", format!("{} is required", label));
        }
        return FieldValidation::ok();
    }

    let length = value.chars().count();
    if let Some(min_length) = field.min_length
        && length < min_length
    {
        return FieldValidation::fail(
            "min_length",
            format!("{} must be at least {} characters", label, min_length),
        );
    }
    if let Some(max_length) = field.max_length
        && length > max_length
    {
        return FieldValidation::fail(
            "max_length",
            format!("{} must be at most {} characters", label, max_length),
        );
    }
    if let Some(pattern) = &field.pattern
        && let Some(regex) = compile_pattern(field, pattern)
        && !regex.is_match(value)
    {
        let message = field
            .pattern_message
            .clone()
            .unwrap_or_else(|| format!("{} is not in the expected format", label));
        return FieldValidation::fail("pattern", message);
    }

    if field.kind == FieldType::Email && !EMAIL.is_match(value) {
        return FieldValidation::fail("email", "Enter a valid email address");
    }
    if field.name == "mobile" {
        let compact: String = value.chars().filter(|c| *c != ' ' && *c != '-').collect();
        if !UG_MOBILE.is_match(&compact) {
            return FieldValidation::fail(
                "mobile",
                "Enter a valid mobile number, e.g. 0712345678 or +256712345678",
            );
        }
    }
    if field.name == "nin" && !NIN.is_match(value) {
        return FieldValidation::fail(
            "nin",
            "Enter a valid NIN: CM or CF followed by 11 digits",
        );
    }

    match field.kind {
        FieldType::Date => validate_date(field, value, ctx),
        FieldType::Number => validate_number(field, value),
        _ => FieldValidation::ok(),
    }
}

pub fn is_valid(field: &FieldDescriptor, ctx: &ValidationContext<'_>) -> bool {
    validate_field(field, None, ctx).valid
}

fn compile_pattern(field: &FieldDescriptor, pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            tracing::warn!(field = %field.name, %pattern, error = %err, "ignoring malformed pattern");
            None
        }
    }
}

fn validate_repeatable(field: &FieldDescriptor, raw: &str, today: NaiveDate) -> FieldValidation {
    let members = parse_members(raw);
    if members.is_empty() {
        if field.required {
            return FieldValidation::fail(
                "required",
                format!("{} is required", field.display_label()),
            );
        }
        return FieldValidation::ok();
    }

    for (idx, member) in members.iter().enumerate() {
        let values = member_values(member);
        let ctx = ValidationContext::at(&values, today);
        for sub_field in visible_fields(&field.fields, &values) {
            let outcome = validate_field(sub_field, None, &ctx);
            if !outcome.valid {
                return FieldValidation {
                    valid: false,
                    error: format!("{} {}: {}", field.display_label(), idx + 1, outcome.error),
                    code: outcome.code,
                };
            }
        }
    }
    FieldValidation::ok()
}

fn validate_date(
    field: &FieldDescriptor,
    value: &str,
    ctx: &ValidationContext<'_>,
) -> FieldValidation {
    let label = field.display_label();
    let Some(date) = parse_date(value) else {
        return FieldValidation::fail("invalid_date", format!("{} must be a valid date", label));
    };

    if let Some(bound) = date_bound(field, field.min_date.as_deref(), ctx)
        && date < bound
    {
        return FieldValidation::fail(
            "min_date",
            format!("{} must be on or after {}", label, format_date(bound)),
        );
    }
    if let Some(bound) = date_bound(field, field.max_date.as_deref(), ctx)
        && date > bound
    {
        return FieldValidation::fail(
            "max_date",
            format!("{} must be on or before {}", label, format_date(bound)),
        );
    }

    if let Some(bound) = sibling_date(field.min_date_field.as_deref(), ctx)
        && date < bound
    {
        let message = field
            .min_date_field_message
            .clone()
            .unwrap_or_else(|| format!("{} must be on or after {}", label, format_date(bound)));
        return FieldValidation::fail("min_date_field", message);
    }
    if let Some(bound) = sibling_date(field.max_date_field.as_deref(), ctx)
        && date > bound
    {
        let message = field
            .max_date_field_message
            .clone()
            .unwrap_or_else(|| format!("{} must be on or before {}", label, format_date(bound)));
        return FieldValidation::fail("max_date_field", message);
    }

    if let Some(years) = field.min_age_years
        && date > years_before(ctx.today, years)
    {
        return FieldValidation::fail("min_age", format!("Must be at least {} years old", years));
    }
    if let Some(years) = field.max_age_years
        && date < years_before(ctx.today, years)
    {
        return FieldValidation::fail("max_age", format!("Must be at most {} years old", years));
    }

    FieldValidation::ok()
}

fn date_bound(
    field: &FieldDescriptor,
    expr: Option<&str>,
    ctx: &ValidationContext<'_>,
) -> Option<NaiveDate> {
    let expr = expr?;
    let bound = resolve_date_bound(expr, ctx.today);
    if bound.is_none() {
        tracing::warn!(field = %field.name, bound = %expr, "ignoring unparsable date bound");
    }
    bound
}

fn sibling_date(name: Option<&str>, ctx: &ValidationContext<'_>) -> Option<NaiveDate> {
    name.map(|name| ctx.values.get(name)).and_then(parse_date)
}

/// Parses a number typed with optional thousands separators or spaces.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|number| number.is_finite())
}

fn validate_number(field: &FieldDescriptor, value: &str) -> FieldValidation {
    let label = field.display_label();
    let Some(number) = parse_number(value) else {
        return FieldValidation::fail("invalid_number", format!("{} must be a number", label));
    };
    if field.integer && number.fract() != 0.0 {
        return FieldValidation::fail("integer", format!("{} must be a whole number", label));
    }
    if let Some(min) = field.min
        && number < min
    {
        return FieldValidation::fail("min", format!("{} must be at least {}", label, min));
    }
    if let Some(max) = field.max
        && number > max
    {
        return FieldValidation::fail("max", format!("{} must be at most {}", label, max));
    }
    FieldValidation::ok()
}

/// A failed field reported by [`validate_step`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    pub field: String,
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Result of validating every visible field of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StepValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_required: Vec<String>,
}

fn is_blank(field: &FieldDescriptor, raw: &str) -> bool {
    if field.kind == FieldType::RepeatableGroup {
        parse_members(raw).is_empty()
    } else {
        raw.trim().is_empty()
    }
}

pub fn validate_step(fields: &[FieldDescriptor], ctx: &ValidationContext<'_>) -> StepValidation {
    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for field in fields {
        if !is_visible(field, ctx.values) {
            continue;
        }
        let outcome = validate_field(field, None, ctx);
        if outcome.valid {
            continue;
        }
        if is_blank(field, ctx.values.get(&field.name)) {
            missing_required.push(field.name.clone());
        } else {
            errors.push(ValidationError {
                field: field.name.clone(),
                path: format!("/{}", field.name),
                message: outcome.error,
                code: outcome.code,
            });
        }
    }

    StepValidation {
        valid: errors.is_empty() && missing_required.is_empty(),
        errors,
        missing_required,
    }
}
