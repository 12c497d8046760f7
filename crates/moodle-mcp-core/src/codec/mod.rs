//! Moodle wire codec
//!
//! - `encode_params` / `flatten_params`: nested JSON arguments to the flat,
//!   bracket-indexed form encoding Moodle's REST server parses into PHP arrays
//! - `repair`: undo PHP's `[]` for empty objects using the declared output shape

mod wire;
mod repair;

pub use wire::{encode_params, flatten_params, scalar_to_wire};
pub use repair::{repair, repair_all};
