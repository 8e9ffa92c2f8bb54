#![allow(missing_docs)]

pub mod combobox;
pub mod dates;
pub mod engine;
pub mod masking;
pub mod navigator;
pub mod render;
pub mod repeatable;
pub mod reveal;
pub mod spec;
pub mod validate;
pub mod values;
pub mod visibility;

pub use combobox::{ComboKey, ComboboxState, filter_options};
pub use engine::{EngineState, Effect, FormEngine, FormEvent, Transition, reduce};
pub use masking::apply_input_mask;
pub use navigator::{Navigation, navigation, total_groups};
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use reveal::{DisplayMode, displayed_fields, displayed_in_group, reveal_count};
pub use spec::{
    FieldDescriptor, FieldOption, FieldType, ShowIf, ShowIfValue, SpecError, StepKey, StepSpec,
};
pub use validate::{
    FieldValidation, StepValidation, ValidationContext, ValidationError, validate_field,
    validate_step,
};
pub use values::ValueStore;
pub use visibility::{VisibilityMap, is_visible, resolve_visibility, visible_fields};

/// JSON Schema of the step configuration format.
pub fn step_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(StepSpec)).unwrap_or(serde_json::Value::Null)
}
