//! Field mapping: best-element selection, gap closing for residual
//! elements, and concrete input value assignment.

pub mod mapper;
pub mod unmapped;
pub mod values;

pub use mapper::FieldMapper;
pub use unmapped::UnmappedHandler;
pub use values::{assign_values, FieldInput, InputValue};
