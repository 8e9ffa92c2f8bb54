use assert_cmd::Command;
use assert_fs::prelude::*;
use serde_json::{Value, json};

const MOTOR: &str = include_str!("../../form-spec/tests/fixtures/motor_quote.json");
const TRAVEL: &str = include_str!("../../form-spec/tests/fixtures/travel_quote.json");
const TODAY: &str = "2026-10-19";

fn quote_form() -> Command {
    let mut cmd = Command::cargo_bin("quote-form").expect("binary builds");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn schema_prints_step_schema() -> Result<(), Box<dyn std::error::Error>> {
    let output = quote_form().arg("schema").assert().success().get_output().clone();
    let schema: Value = serde_json::from_str(&stdout_of(&output))?;
    assert!(schema["properties"]["fields"].is_object());
    Ok(())
}

#[test]
fn schema_can_be_written_to_a_file() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let out = workspace.child("step.schema.json");
    quote_form()
        .arg("schema")
        .arg("--out")
        .arg(out.path())
        .assert()
        .success();
    let schema: Value = serde_json::from_str(&std::fs::read_to_string(out.path())?)?;
    assert!(schema["properties"].is_object());
    Ok(())
}

#[test]
fn validate_accepts_complete_values() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let step = workspace.child("motor.json");
    step.write_str(MOTOR)?;
    let values = workspace.child("values.json");
    values.write_str(
        &json!({
            "full_name": "Ada Lovelace",
            "mobile": "0712345678",
            "cover_type": "third_party",
            "make": "toyota",
            "start_date": "2026-10-20"
        })
        .to_string(),
    )?;

    let output = quote_form()
        .args(["--today", TODAY, "validate", "--step"])
        .arg(step.path())
        .arg("--values")
        .arg(values.path())
        .assert()
        .success()
        .get_output()
        .clone();
    assert!(stdout_of(&output).contains("Validation result: valid"));
    Ok(())
}

#[test]
fn validate_fails_on_missing_values() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let step = workspace.child("motor.json");
    step.write_str(MOTOR)?;
    let values = workspace.child("values.json");
    values.write_str(r#"{"full_name": "Ada Lovelace", "mobile": "12345", "cover_type": "third_party"}"#)?;

    let output = quote_form()
        .arg("validate")
        .arg("--step")
        .arg(step.path())
        .arg("--values")
        .arg(values.path())
        .arg("--today")
        .arg(TODAY)
        .assert()
        .failure()
        .get_output()
        .clone();
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Validation result: invalid"));
    assert!(stdout.contains("/mobile - Enter a valid mobile number"));
    assert!(stdout.contains("Missing required values: make, start_date"));
    Ok(())
}

#[test]
fn invalid_steps_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let step = workspace.child("broken.json");
    step.write_str(r#"{"title": "Broken", "fields": [{"name": "a"}, {"name": "a"}]}"#)?;
    let values = workspace.child("values.json");
    values.write_str("{}")?;

    let output = quote_form()
        .arg("validate")
        .arg("--step")
        .arg(step.path())
        .arg("--values")
        .arg(values.path())
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(String::from_utf8_lossy(&output.stderr).contains("DuplicateField"));
    Ok(())
}

#[test]
fn render_text_shows_the_first_group() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let step = workspace.child("motor.json");
    step.write_str(MOTOR)?;

    let output = quote_form()
        .args(["--today", TODAY, "render", "--step"])
        .arg(step.path())
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Step: Motor insurance quote"));
    assert!(stdout.contains("Group 1 of 3"));
    Ok(())
}

#[test]
fn render_json_uses_saved_state() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let step = workspace.child("motor.json");
    step.write_str(MOTOR)?;
    let state = workspace.child("state.json");
    state.write_str(r#"{"step_key": "", "active_group": 2}"#)?;

    let output = quote_form()
        .args(["--today", TODAY, "render", "--format", "json", "--step"])
        .arg(step.path())
        .arg("--state")
        .arg(state.path())
        .assert()
        .success()
        .get_output()
        .clone();
    let ui: Value = serde_json::from_str(&stdout_of(&output))?;
    assert_eq!(ui["step_id"], "motor-quote");
    // A state saved for another step identity starts over at the first group.
    assert_eq!(ui["navigation"]["group_index"], 0);
    Ok(())
}

#[test]
fn wizard_walks_the_motor_step() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let step = workspace.child("motor.json");
    step.write_str(MOTOR)?;
    let answers = ["Ada Lovelace", "0712345678", "2", "toy", "2026-10-20"];
    let stdin = format!("{}\n", answers.join("\n"));

    let output = quote_form()
        .args(["--today", TODAY, "wizard", "--step"])
        .arg(step.path())
        .write_stdin(stdin)
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Step: Motor insurance quote"));
    assert!(stdout.contains("Done ✅"));
    assert!(stdout.contains("cover_type: third_party"));
    assert!(stdout.contains("make: toyota"));
    assert!(stdout.contains("mobile: 0712345678"));
    Ok(())
}

#[test]
fn wizard_collects_repeatable_members() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let step = workspace.child("travel.json");
    step.write_str(TRAVEL)?;
    let answers = ["1", "2026-11-01", "2026-11-08", "Ada", "1990-05-01", "n"];
    let stdin = format!("{}\n", answers.join("\n"));

    let output = quote_form()
        .args(["--today", TODAY, "wizard", "--values-json", "--step"])
        .arg(step.path())
        .write_stdin(stdin)
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = stdout_of(&output);
    let json_start = stdout.find('{').expect("submitted values json");
    let submitted: Value = serde_json::from_str(stdout[json_start..].trim())?;
    assert_eq!(submitted["destination"], "ke");
    let travellers: Value = serde_json::from_str(
        submitted["travellers"].as_str().expect("travellers value"),
    )?;
    assert_eq!(travellers, json!([{ "name": "Ada", "dob": "1990-05-01" }]));
    Ok(())
}

#[test]
fn wizard_fails_when_input_ends_early() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let step = workspace.child("motor.json");
    step.write_str(MOTOR)?;

    let output = quote_form()
        .args(["--today", TODAY, "wizard", "--step"])
        .arg(step.path())
        .write_stdin("Ada Lovelace\n")
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(String::from_utf8_lossy(&output.stderr).contains("input closed"));
    Ok(())
}
