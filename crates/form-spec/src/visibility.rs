use crate::spec::field::{FieldDescriptor, ShowIfValue};
use crate::values::ValueStore;

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Whether a field is currently eligible to appear in the form.
pub fn is_visible(field: &FieldDescriptor, values: &ValueStore) -> bool {
    let Some(rule) = &field.show_if else {
        return true;
    };
    let current = values.get(&rule.field);
    match &rule.value {
        ShowIfValue::AnyOf(allowed) => allowed.iter().any(|candidate| candidate == current),
        ShowIfValue::Equals(expected) => expected == current,
    }
}

/// Visible fields, in configuration order.
pub fn visible_fields<'a>(
    fields: &'a [FieldDescriptor],
    values: &ValueStore,
) -> Vec<&'a FieldDescriptor> {
    fields
        .iter()
        .filter(|field| is_visible(field, values))
        .collect()
}

pub fn resolve_visibility(fields: &[FieldDescriptor], values: &ValueStore) -> VisibilityMap {
    fields
        .iter()
        .map(|field| (field.name.clone(), is_visible(field, values)))
        .collect()
}
