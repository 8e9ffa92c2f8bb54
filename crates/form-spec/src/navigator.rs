use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::spec::field::FieldDescriptor;
use crate::spec::step::StepSpec;
use crate::validate::{ValidationContext, is_valid};

/// Number of fixed-size groups needed for `visible` fields.
pub fn total_groups(visible: usize, group_size: usize) -> usize {
    visible.div_ceil(group_size.max(1))
}

/// Pulls a group index back inside `[0, total - 1]`.
pub fn clamp_group_index(index: usize, total: usize) -> usize {
    index.min(total.saturating_sub(1))
}

pub fn group_range(index: usize, group_size: usize, len: usize) -> Range<usize> {
    let size = group_size.max(1);
    let start = index.saturating_mul(size).min(len);
    let end = start.saturating_add(size).min(len);
    start..end
}

/// The fields of group `index` within the visible list.
pub fn group_slice<'b, 'a>(
    visible: &'b [&'a FieldDescriptor],
    index: usize,
    group_size: usize,
) -> &'b [&'a FieldDescriptor] {
    &visible[group_range(index, group_size, visible.len())]
}

pub fn group_is_valid(group: &[&FieldDescriptor], ctx: &ValidationContext<'_>) -> bool {
    group.iter().all(|field| is_valid(field, ctx))
}

/// What the forward/back controls should offer for the active group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Navigation {
    pub group_index: usize,
    pub total_groups: usize,
    pub can_advance: bool,
    pub can_go_back: bool,
    pub is_last_group: bool,
    pub forward_label: String,
}

/// Derives the navigation controls for `index` over `visible`.
pub fn navigation(
    step: &StepSpec,
    visible: &[&FieldDescriptor],
    index: usize,
    ctx: &ValidationContext<'_>,
) -> Navigation {
    let size = step.effective_group_size();
    let total = total_groups(visible.len(), size);
    let index = clamp_group_index(index, total);
    let is_last_group = index + 1 >= total;
    let group = group_slice(visible, index, size);
    Navigation {
        group_index: index,
        total_groups: total,
        can_advance: group_is_valid(group, ctx),
        can_go_back: !step.auto_advance && index > 0,
        is_last_group,
        forward_label: if is_last_group {
            step.submit_label().to_string()
        } else {
            step.next_label().to_string()
        },
    }
}
