use chrono::NaiveDate;
use serde_json::json;

use form_spec::spec::field::{FieldDescriptor, FieldType};
use form_spec::{StepSpec, ValidationContext, ValueStore, validate_field, validate_step};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

fn field(value: serde_json::Value) -> FieldDescriptor {
    serde_json::from_value(value).expect("deserialize field")
}

fn check(field: &FieldDescriptor, value: &str) -> form_spec::FieldValidation {
    let values = ValueStore::new();
    let ctx = ValidationContext::at(&values, today());
    validate_field(field, Some(value), &ctx)
}

#[test]
fn required_rejects_blank_values() {
    let name = field(json!({ "name": "full_name", "label": "Full name", "required": true }));
    let outcome = check(&name, "   ");
    assert!(!outcome.valid);
    assert_eq!(outcome.error, "Full name is required");
    assert_eq!(outcome.code.as_deref(), Some("required"));
    assert!(check(&name, "Ada").valid);
}

#[test]
fn optional_blank_values_pass_every_rule() {
    let email = field(json!({ "name": "email", "type": "email", "minLength": 5 }));
    assert!(check(&email, "").valid);
}

#[test]
fn stored_value_is_used_without_candidate() {
    let name = field(json!({ "name": "full_name", "required": true }));
    let values: ValueStore = [("full_name", "Grace")].into_iter().collect();
    let ctx = ValidationContext::at(&values, today());
    assert!(validate_field(&name, None, &ctx).valid);
    assert!(!validate_field(&name, Some(""), &ctx).valid);
}

#[test]
fn length_bounds_use_trimmed_characters() {
    let name = field(json!({ "name": "n", "label": "Name", "minLength": 3, "maxLength": 4 }));
    assert_eq!(check(&name, " ab ").code.as_deref(), Some("min_length"));
    assert!(check(&name, "  abc  ").valid);
    assert!(check(&name, "éèêë").valid);
    assert_eq!(check(&name, "abcde").code.as_deref(), Some("max_length"));
}

#[test]
fn pattern_uses_configured_message() {
    let plate = field(json!({
        "name": "plate",
        "pattern": "^U[A-Z]{2} \\d{3}[A-Z]$",
        "patternMessage": "Use the format UAB 123C"
    }));
    assert!(check(&plate, "UAB 123C").valid);
    let outcome = check(&plate, "123");
    assert_eq!(outcome.error, "Use the format UAB 123C");
}

#[test]
fn malformed_pattern_is_ignored() {
    let broken = field(json!({ "name": "x", "pattern": "([a-z" }));
    assert!(check(&broken, "anything").valid);
}

#[test]
fn email_shape_is_case_insensitive() {
    let email = field(json!({ "name": "email", "type": "email" }));
    assert!(check(&email, "Ada@Example.COM").valid);
    assert!(!check(&email, "ada@example").valid);
    assert!(!check(&email, "ada example.com").valid);
}

#[test]
fn mobile_rule_is_keyed_by_name() {
    let mobile = field(json!({ "name": "mobile", "type": "tel" }));
    assert!(check(&mobile, "0712345678").valid);
    assert!(check(&mobile, "+256712345678").valid);
    assert!(check(&mobile, "+256 712-345-678").valid);
    assert!(!check(&mobile, "12345").valid);
    assert!(!check(&mobile, "0812345678").valid);

    let other = field(json!({ "name": "office_phone", "type": "tel" }));
    assert!(check(&other, "12345").valid);
}

#[test]
fn nin_rule_is_keyed_by_name() {
    let nin = field(json!({ "name": "nin" }));
    assert!(check(&nin, "CM12345678901").valid);
    assert!(check(&nin, "CF12345678901").valid);
    assert_eq!(check(&nin, "CX12345678901").code.as_deref(), Some("nin"));
    assert!(!check(&nin, "CM1234567890").valid);
}

#[test]
fn relative_min_date_names_the_bound() {
    let start = field(json!({ "name": "start", "label": "Start date", "type": "date", "minDate": "today+1" }));
    let outcome = check(&start, "2026-10-19");
    assert!(!outcome.valid);
    assert_eq!(outcome.error, "Start date must be on or after 2026-10-20");
    assert!(check(&start, "2026-10-20").valid);
}

#[test]
fn absolute_max_date_and_unparsable_bounds() {
    let date = field(json!({ "name": "d", "type": "date", "maxDate": "2026-12-31", "minDate": "whenever" }));
    assert!(check(&date, "1900-01-01").valid);
    assert_eq!(check(&date, "2027-01-01").code.as_deref(), Some("max_date"));
    assert_eq!(check(&date, "next tuesday").code.as_deref(), Some("invalid_date"));
}

#[test]
fn sibling_date_bounds_use_current_values() {
    let ret = field(json!({
        "name": "return",
        "type": "date",
        "minDateField": "departure",
        "minDateFieldMessage": "Return date must be after departure"
    }));
    let values: ValueStore = [("departure", "2026-11-10")].into_iter().collect();
    let ctx = ValidationContext::at(&values, today());
    let outcome = validate_field(&ret, Some("2026-11-01"), &ctx);
    assert_eq!(outcome.error, "Return date must be after departure");
    assert!(validate_field(&ret, Some("2026-11-10"), &ctx).valid);

    let empty = ValueStore::new();
    let ctx = ValidationContext::at(&empty, today());
    assert!(validate_field(&ret, Some("2026-11-01"), &ctx).valid);
}

#[test]
fn max_date_field_bound() {
    let issued = field(json!({ "name": "issued", "type": "date", "maxDateField": "expires" }));
    let values: ValueStore = [("expires", "2026-01-01")].into_iter().collect();
    let ctx = ValidationContext::at(&values, today());
    assert_eq!(
        validate_field(&issued, Some("2026-02-01"), &ctx).code.as_deref(),
        Some("max_date_field")
    );
}

#[test]
fn age_bounds() {
    let dob = field(json!({ "name": "dob", "type": "date", "maxAgeYears": 65, "minAgeYears": 18 }));
    assert_eq!(check(&dob, "1960-10-19").code.as_deref(), Some("max_age"));
    assert!(check(&dob, "1962-10-19").valid);
    assert!(check(&dob, "2008-10-19").valid);
    assert_eq!(check(&dob, "2008-10-20").code.as_deref(), Some("min_age"));
}

#[test]
fn numbers_accept_separators_and_bounds() {
    let value = field(json!({
        "name": "vehicle_value",
        "label": "Vehicle value",
        "type": "number",
        "integer": true,
        "min": 1000000,
        "max": 500000000
    }));
    assert!(check(&value, "25,000,000").valid);
    assert!(check(&value, "25 000 000").valid);
    assert_eq!(check(&value, "abc").code.as_deref(), Some("invalid_number"));
    assert_eq!(check(&value, "1500000.5").code.as_deref(), Some("integer"));
    let low = check(&value, "999");
    assert_eq!(low.error, "Vehicle value must be at least 1000000");
    assert_eq!(check(&value, "600,000,000").code.as_deref(), Some("max"));
    assert_eq!(check(&value, "inf").code.as_deref(), Some("invalid_number"));
}

#[test]
fn unknown_types_only_honor_required() {
    let widget = field(json!({ "name": "widget", "type": "signature-pad" }));
    assert_eq!(widget.kind, FieldType::Unknown);
    assert!(check(&widget, "").valid);
    let required = field(json!({ "name": "widget", "type": "signature-pad", "required": true }));
    assert!(!check(&required, "").valid);
}

fn travellers() -> FieldDescriptor {
    field(json!({
        "name": "travellers",
        "label": "Traveller",
        "type": "repeatable-group",
        "required": true,
        "fields": [
            { "name": "dob", "label": "Date of birth", "type": "date", "required": true },
            { "name": "passport", "label": "Passport", "required": true,
              "showIf": { "field": "abroad", "value": "yes" } }
        ]
    }))
}

#[test]
fn repeatable_required_needs_a_member() {
    let group = travellers();
    let outcome = check(&group, "[]");
    assert!(!outcome.valid);
    assert_eq!(outcome.error, "Traveller is required");
    assert!(!check(&group, "not json").valid);
}

#[test]
fn repeatable_members_validate_their_sub_fields() {
    let group = travellers();
    assert!(check(&group, r#"[{"dob":"1990-01-01"}]"#).valid);

    let outcome = check(&group, r#"[{"dob":"1990-01-01"},{"dob":""}]"#);
    assert_eq!(outcome.error, "Traveller 2: Date of birth is required");
    assert_eq!(outcome.code.as_deref(), Some("required"));

    let outcome = check(&group, r#"[{"dob":"1990-01-01","abroad":"yes"}]"#);
    assert_eq!(outcome.error, "Traveller 1: Passport is required");
}

#[test]
fn optional_repeatable_without_sub_fields_passes() {
    let group = field(json!({ "name": "extras", "type": "repeatable-group" }));
    assert!(check(&group, "").valid);
    assert!(check(&group, "[{}]").valid);
}

#[test]
fn step_validation_reports_missing_and_errors() {
    let step: StepSpec =
        serde_json::from_str(include_str!("fixtures/motor_quote.json")).expect("deserialize");
    let values: ValueStore = [
        ("full_name", "Ada Lovelace"),
        ("mobile", "12345"),
        ("cover_type", "third_party"),
        ("vehicle_value", "12"),
    ]
    .into_iter()
    .collect();
    let ctx = ValidationContext::at(&values, today());
    let result = validate_step(&step.fields, &ctx);
    assert!(!result.valid);
    assert_eq!(result.missing_required, vec!["make", "start_date"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].field, "mobile");
    assert_eq!(result.errors[0].path, "/mobile");
}
