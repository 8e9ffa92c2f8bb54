use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::spec::field::{FieldDescriptor, FieldType};

pub const DEFAULT_GROUP_SIZE: usize = 2;
pub const DEFAULT_NEXT_LABEL: &str = "Next";
pub const DEFAULT_SUBMIT_LABEL: &str = "Submit";

/// Problems with step configuration detected at load time.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to parse step configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("step '{step}' declares field '{field}' more than once")]
    DuplicateField { step: String, field: String },
    #[error("repeatable group '{field}' declares sub-field '{sub_field}' more than once")]
    DuplicateSubField { field: String, sub_field: String },
    #[error("field '{field}' has an empty name")]
    EmptyName { field: usize },
}

/// One page of the guided flow: a title plus an ordered field list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_size: Option<usize>,
    #[serde(default)]
    pub auto_advance: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
}

impl StepSpec {
    pub fn new(title: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            description: None,
            fields,
            group_size: None,
            auto_advance: false,
            next_label: None,
            submit_label: None,
        }
    }

    /// Parses and checks a step from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SpecError> {
        let step: StepSpec = serde_json::from_str(text)?;
        step.check()?;
        Ok(step)
    }

    /// Rejects configurations that break the name-as-join-key invariant.
    pub fn check(&self) -> Result<(), SpecError> {
        let mut seen = BTreeSet::new();
        for (idx, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(SpecError::EmptyName { field: idx });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SpecError::DuplicateField {
                    step: self.title.clone(),
                    field: field.name.clone(),
                });
            }
            if field.kind == FieldType::RepeatableGroup {
                let mut nested = BTreeSet::new();
                for sub in &field.fields {
                    if !nested.insert(sub.name.as_str()) {
                        return Err(SpecError::DuplicateSubField {
                            field: field.name.clone(),
                            sub_field: sub.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Effective group size: default 2, never below 1.
    pub fn effective_group_size(&self) -> usize {
        self.group_size.unwrap_or(DEFAULT_GROUP_SIZE).max(1)
    }

    pub fn next_label(&self) -> &str {
        self.next_label.as_deref().unwrap_or(DEFAULT_NEXT_LABEL)
    }

    pub fn submit_label(&self) -> &str {
        self.submit_label.as_deref().unwrap_or(DEFAULT_SUBMIT_LABEL)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn key(&self) -> StepKey {
        StepKey::of(self)
    }
}

/// Structural identity of a step: title plus each field's name and type.
/// A change in this key resets all transient engine state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StepKey(String);

impl StepKey {
    pub fn of(step: &StepSpec) -> Self {
        let mut key = step.title.clone();
        for field in &step.fields {
            key.push('|');
            key.push_str(&field.name);
            key.push(':');
            key.push_str(field.kind.as_str());
        }
        StepKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
