//! Event reducer driving one active step.
//!
//! [`reduce`] is pure: it takes the current state, configuration, values and
//! date, and returns the next state together with the effects the caller must
//! act on. Value writes are reported as [`Effect::ValueChanged`] and are
//! never applied behind the caller's back; [`FormEngine`] is the small owner
//! that applies them to its own store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::combobox::{ComboKey, ComboboxState};
use crate::dates::today;
use crate::masking::apply_input_mask;
use crate::navigator::{clamp_group_index, group_is_valid, group_slice, total_groups};
use crate::render::{RenderPayload, build_render_payload};
use crate::repeatable::{
    add_member, clamp_active, move_active, parse_members, remove_member, set_member_field,
};
use crate::reveal::{DisplayMode, displayed_fields};
use crate::spec::field::{FieldDescriptor, FieldType};
use crate::spec::step::{StepKey, StepSpec};
use crate::validate::{FieldValidation, ValidationContext, ValidationError, validate_field};
use crate::values::{ValueStore, toggle_checkbox, toggle_multi};
use crate::visibility::visible_fields;

/// Transient state owned by the engine for one active step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EngineState {
    #[serde(default)]
    pub step_key: StepKey,
    #[serde(default)]
    pub active_group: usize,
    #[serde(default)]
    pub repeatable_active: BTreeMap<String, usize>,
    #[serde(default)]
    pub combobox: ComboboxState,
    #[serde(default)]
    pub touched: BTreeSet<String>,
    #[serde(default)]
    pub show_errors: bool,
}

impl EngineState {
    pub fn for_step(step: &StepSpec) -> Self {
        Self {
            step_key: step.key(),
            ..Default::default()
        }
    }

    /// Resets everything when `step` has a different identity.
    /// Returns `true` when a reset happened.
    pub fn sync_step(&mut self, step: &StepSpec) -> bool {
        let key = step.key();
        if self.step_key == key {
            return false;
        }
        tracing::debug!(step = %step.title, "step identity changed; resetting engine state");
        *self = Self {
            step_key: key,
            ..Default::default()
        };
        true
    }

    /// Whether `name`'s error should be shown right now.
    pub fn surfaces_error(&self, name: &str) -> bool {
        self.show_errors || self.touched.contains(name)
    }

    pub fn repeatable_index(&self, name: &str) -> usize {
        self.repeatable_active.get(name).copied().unwrap_or(0)
    }

    fn reset_group_flags(&mut self) {
        self.touched.clear();
        self.show_errors = false;
        self.combobox.close();
    }
}

/// Interactions the engine reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormEvent {
    FieldChanged { name: String, value: String },
    FieldTouched { name: String },
    /// A field's value was confirmed (Enter, option pick). May auto-advance.
    FieldConfirmed { name: String },
    /// Toggles an option of a checkbox-group, or a single checkbox.
    OptionToggled {
        name: String,
        #[serde(default)]
        option: String,
    },
    GroupAdvance,
    GroupBack,
    ShowErrors,
    ComboboxFocus { name: String },
    ComboboxQuery { name: String, query: String },
    ComboboxKey { key: ComboKey },
    ComboboxSelect { index: usize },
    /// Pointer interaction outside the open menu.
    ComboboxDismiss,
    RepeatableAdd { name: String },
    RepeatableRemove { name: String, index: usize },
    RepeatableSet { name: String, field: String, value: String },
    RepeatableMove { name: String, delta: isize },
}

/// Outputs the caller must act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// The `onChange` sink: write `value` under `name`.
    ValueChanged { name: String, value: String },
    Advanced { group_index: usize },
    Retreated { group_index: usize },
    /// Next was pressed on an invalid group; the errors are now surfaced.
    Blocked { errors: Vec<ValidationError> },
    /// Next was pressed on a valid last group.
    Submit { payload: BTreeMap<String, String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: EngineState,
    pub effects: Vec<Effect>,
}

/// Computes the state after `event`, and the effects it produces.
pub fn reduce(
    state: &EngineState,
    step: &StepSpec,
    values: &ValueStore,
    today: NaiveDate,
    event: FormEvent,
) -> Transition {
    let mut reducer = Reducer {
        state: state.clone(),
        step,
        values: values.clone(),
        today,
        effects: Vec::new(),
    };
    reducer.state.sync_step(step);
    reducer.clamp_group();
    reducer.apply(event);
    reducer.clamp_group();
    Transition {
        state: reducer.state,
        effects: reducer.effects,
    }
}

struct Reducer<'s> {
    state: EngineState,
    step: &'s StepSpec,
    /// Values with this event's own writes already applied.
    values: ValueStore,
    today: NaiveDate,
    effects: Vec<Effect>,
}

impl<'s> Reducer<'s> {
    fn apply(&mut self, event: FormEvent) {
        match event {
            FormEvent::FieldChanged { name, value } => {
                let Some(field) = self.step.field(&name) else {
                    tracing::debug!(%name, "ignoring change for unknown field");
                    return;
                };
                let masked = apply_input_mask(field, &value);
                self.change(&name, masked);
            }
            FormEvent::FieldTouched { name } => {
                self.state.touched.insert(name);
            }
            FormEvent::FieldConfirmed { name } => self.confirm(&name),
            FormEvent::OptionToggled { name, option } => self.toggle(&name, &option),
            FormEvent::GroupAdvance => self.group_advance(),
            FormEvent::GroupBack => self.group_back(),
            FormEvent::ShowErrors => self.state.show_errors = true,
            FormEvent::ComboboxFocus { name } => {
                if self.combobox_field(&name).is_some() {
                    self.state.combobox.focus(&name);
                }
            }
            FormEvent::ComboboxQuery { name, query } => {
                if self.combobox_field(&name).is_some() {
                    self.state.combobox.set_query(&name, &query);
                }
            }
            FormEvent::ComboboxKey { key } => self.combobox_key(key),
            FormEvent::ComboboxSelect { index } => self.combobox_select(index),
            FormEvent::ComboboxDismiss => self.state.combobox.close(),
            FormEvent::RepeatableAdd { name } => {
                if self.repeatable_field(&name).is_some() {
                    let edit = add_member(self.values.get(&name));
                    self.state.repeatable_active.insert(name.clone(), edit.active);
                    self.change(&name, edit.value);
                }
            }
            FormEvent::RepeatableRemove { name, index } => {
                if self.repeatable_field(&name).is_some()
                    && let Some(edit) = remove_member(self.values.get(&name), index)
                {
                    self.state.repeatable_active.insert(name.clone(), edit.active);
                    self.change(&name, edit.value);
                }
            }
            FormEvent::RepeatableSet { name, field, value } => {
                self.repeatable_set(&name, &field, &value)
            }
            FormEvent::RepeatableMove { name, delta } => {
                if self.repeatable_field(&name).is_some() {
                    let current = self.state.repeatable_index(&name);
                    let moved = move_active(self.values.get(&name), current, delta);
                    self.state.repeatable_active.insert(name, moved);
                }
            }
        }
    }

    fn ctx(&self) -> ValidationContext<'_> {
        ValidationContext::at(&self.values, self.today)
    }

    fn change(&mut self, name: &str, value: String) {
        self.values.set(name, value.clone());
        self.effects.push(Effect::ValueChanged {
            name: name.to_string(),
            value,
        });
    }

    fn group_size(&self) -> usize {
        self.step.effective_group_size()
    }

    fn clamp_group(&mut self) {
        let visible = visible_fields(&self.step.fields, &self.values).len();
        let total = total_groups(visible, self.group_size());
        let clamped = clamp_group_index(self.state.active_group, total);
        if clamped != self.state.active_group {
            tracing::debug!(from = self.state.active_group, to = clamped, "clamping active group");
            self.state.active_group = clamped;
        }
    }

    fn combobox_field(&self, name: &str) -> Option<&'s FieldDescriptor> {
        self.step
            .field(name)
            .filter(|field| field.kind == FieldType::Combobox)
    }

    fn repeatable_field(&self, name: &str) -> Option<&'s FieldDescriptor> {
        self.step
            .field(name)
            .filter(|field| field.kind == FieldType::RepeatableGroup)
    }

    /// The shared "confirm field" hook.
    fn confirm(&mut self, name: &str) {
        self.state.touched.insert(name.to_string());
        if !self.step.auto_advance {
            return;
        }
        let step = self.step;
        let size = self.group_size();
        let visible = visible_fields(&step.fields, &self.values);
        let total = total_groups(visible.len(), size);
        let index = self.state.active_group;
        let group = group_slice(&visible, index, size);
        let is_last_in_group = group.last().is_some_and(|field| field.name == name);
        let ctx = self.ctx();
        if is_last_in_group && index + 1 < total && group_is_valid(group, &ctx) {
            self.advance();
        }
    }

    fn toggle(&mut self, name: &str, option: &str) {
        let Some(field) = self.step.field(name) else {
            return;
        };
        let current = self.values.get(name);
        let next = match field.kind {
            FieldType::CheckboxGroup => toggle_multi(current, option),
            FieldType::Checkbox => toggle_checkbox(current),
            _ => return,
        };
        self.state.touched.insert(name.to_string());
        self.change(name, next);
    }

    fn group_advance(&mut self) {
        let step = self.step;
        let size = self.group_size();
        let visible = visible_fields(&step.fields, &self.values);
        let total = total_groups(visible.len(), size);
        let index = self.state.active_group;
        let group = group_slice(&visible, index, size);
        let ctx = self.ctx();

        let errors: Vec<ValidationError> = group
            .iter()
            .filter_map(|field| {
                let outcome = validate_field(field, None, &ctx);
                (!outcome.valid).then(|| ValidationError {
                    field: field.name.clone(),
                    path: format!("/{}", field.name),
                    message: outcome.error,
                    code: outcome.code,
                })
            })
            .collect();

        if !errors.is_empty() {
            tracing::debug!(group = index, errors = errors.len(), "group blocked by validation");
            self.state.show_errors = true;
            self.effects.push(Effect::Blocked { errors });
            return;
        }

        if index + 1 >= total {
            let payload = visible
                .iter()
                .filter_map(|field| {
                    self.values
                        .get_opt(&field.name)
                        .map(|value| (field.name.clone(), value.to_string()))
                })
                .collect();
            tracing::info!(step = %step.title, "step submitted");
            self.effects.push(Effect::Submit { payload });
            return;
        }

        self.advance();
    }

    fn advance(&mut self) {
        self.state.active_group += 1;
        self.state.reset_group_flags();
        tracing::debug!(group = self.state.active_group, "advanced to group");
        self.effects.push(Effect::Advanced {
            group_index: self.state.active_group,
        });
    }

    fn group_back(&mut self) {
        if self.step.auto_advance || self.state.active_group == 0 {
            return;
        }
        self.state.active_group -= 1;
        self.state.reset_group_flags();
        tracing::debug!(group = self.state.active_group, "went back to group");
        self.effects.push(Effect::Retreated {
            group_index: self.state.active_group,
        });
    }

    fn combobox_key(&mut self, key: ComboKey) {
        let Some(name) = self.state.combobox.open_field.clone() else {
            return;
        };
        let Some(field) = self.combobox_field(&name) else {
            self.state.combobox.close();
            return;
        };
        if let Some(value) = self.state.combobox.handle_key(field, key) {
            self.commit_option(&name, value);
        }
    }

    fn combobox_select(&mut self, index: usize) {
        let Some(name) = self.state.combobox.open_field.clone() else {
            return;
        };
        let Some(field) = self.combobox_field(&name) else {
            self.state.combobox.close();
            return;
        };
        if let Some(value) = self.state.combobox.select(field, index) {
            self.commit_option(&name, value);
        }
    }

    fn commit_option(&mut self, name: &str, value: String) {
        self.change(name, value);
        self.confirm(name);
    }

    fn repeatable_set(&mut self, name: &str, sub_name: &str, value: &str) {
        let Some(field) = self.repeatable_field(name) else {
            return;
        };
        let Some(sub_field) = field.fields.iter().find(|sub| sub.name == sub_name) else {
            tracing::debug!(%name, %sub_name, "ignoring change for unknown member field");
            return;
        };
        let masked = apply_input_mask(sub_field, value);
        let active = self.state.repeatable_index(name);
        let edit = set_member_field(self.values.get(name), active, sub_name, &masked);
        self.state.repeatable_active.insert(name.to_string(), edit.active);
        self.change(name, edit.value);
    }
}

/// Owns the state and value store of one active step and applies the
/// reducer's value writes to its store.
#[derive(Debug, Clone)]
pub struct FormEngine {
    step: StepSpec,
    state: EngineState,
    values: ValueStore,
    today: Option<NaiveDate>,
}

impl FormEngine {
    pub fn new(step: StepSpec, values: ValueStore) -> Self {
        let state = EngineState::for_step(&step);
        Self {
            step,
            state,
            values,
            today: None,
        }
    }

    /// Pins "today" instead of reading the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Replaces the configuration; transient state resets when the step's
    /// identity changes. Values carry over.
    pub fn load_step(&mut self, step: StepSpec) {
        self.state.sync_step(&step);
        self.step = step;
    }

    pub fn dispatch(&mut self, event: FormEvent) -> Vec<Effect> {
        let transition = reduce(&self.state, &self.step, &self.values, self.today(), event);
        self.state = transition.state;
        for effect in &transition.effects {
            if let Effect::ValueChanged { name, value } = effect {
                self.values.set(name.clone(), value.clone());
            }
        }
        transition.effects
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(today)
    }

    pub fn step(&self) -> &StepSpec {
        &self.step
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn mode(&self) -> DisplayMode {
        DisplayMode::from_auto_advance(self.step.auto_advance)
    }

    /// Fields on screen right now, in order.
    pub fn displayed(&self) -> Vec<&FieldDescriptor> {
        let ctx = ValidationContext::at(&self.values, self.today());
        displayed_fields(
            &self.step.fields,
            &ctx,
            self.step.effective_group_size(),
            self.mode(),
            self.state.active_group,
        )
    }

    /// Validates a top-level field against `candidate` or its stored value.
    pub fn validate(&self, name: &str, candidate: Option<&str>) -> Option<FieldValidation> {
        let field = self.step.field(name)?;
        let ctx = ValidationContext::at(&self.values, self.today());
        Some(validate_field(field, candidate, &ctx))
    }

    /// Members of a repeatable field and which one is active.
    pub fn members(&self, name: &str) -> (usize, usize) {
        let len = parse_members(self.values.get(name)).len();
        (len, clamp_active(len, self.state.repeatable_index(name)))
    }

    pub fn render(&self) -> RenderPayload {
        build_render_payload(&self.step, &self.values, &self.state, self.today())
    }
}
