pub mod field;
pub mod step;

pub use field::{FieldDescriptor, FieldOption, FieldType, ShowIf, ShowIfValue};
pub use step::{
    DEFAULT_GROUP_SIZE, DEFAULT_NEXT_LABEL, DEFAULT_SUBMIT_LABEL, SpecError, StepKey, StepSpec,
};
