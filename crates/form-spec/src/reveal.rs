use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::navigator::{clamp_group_index, group_range, total_groups};
use crate::spec::field::FieldDescriptor;
use crate::validate::{ValidationContext, is_valid};
use crate::visibility::visible_fields;

/// How a step presents its groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Only the active group is shown; Back is available.
    #[default]
    Standard,
    /// Earlier groups stay on screen; navigation is forward-only.
    AutoAdvance,
}

impl DisplayMode {
    pub fn from_auto_advance(auto_advance: bool) -> Self {
        if auto_advance {
            DisplayMode::AutoAdvance
        } else {
            DisplayMode::Standard
        }
    }
}

/// How many leading fields of `group` are revealed: up to and including the
/// first invalid field, or all of them.
pub fn reveal_count(group: &[&FieldDescriptor], ctx: &ValidationContext<'_>) -> usize {
    if group.len() <= 1 {
        return group.len();
    }
    group
        .iter()
        .position(|field| !is_valid(field, ctx))
        .map(|idx| idx + 1)
        .unwrap_or(group.len())
}

/// Revealed fields of `group` minus completed `hideWhenValid` fields. The
/// last revealed field is always kept.
pub fn displayed_in_group<'a>(
    group: &[&'a FieldDescriptor],
    ctx: &ValidationContext<'_>,
) -> Vec<&'a FieldDescriptor> {
    let revealed = &group[..reveal_count(group, ctx)];
    let last = revealed.len().saturating_sub(1);
    revealed
        .iter()
        .enumerate()
        .filter(|(idx, field)| !(field.hide_when_valid && *idx != last && is_valid(field, ctx)))
        .map(|(_, field)| *field)
        .collect()
}

/// The fields to display for the given step layout, in order.
pub fn displayed_fields<'a>(
    fields: &'a [FieldDescriptor],
    ctx: &ValidationContext<'_>,
    group_size: usize,
    mode: DisplayMode,
    active_group: usize,
) -> Vec<&'a FieldDescriptor> {
    let visible = visible_fields(fields, ctx.values);
    let size = group_size.max(1);
    let index = clamp_group_index(active_group, total_groups(visible.len(), size));
    let range = group_range(index, size, visible.len());
    let active = displayed_in_group(&visible[range.clone()], ctx);
    match mode {
        DisplayMode::Standard => active,
        DisplayMode::AutoAdvance => visible[..range.start]
            .iter()
            .copied()
            .chain(active)
            .collect(),
    }
}
