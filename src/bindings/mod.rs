//! Foreign-language bindings.
pub mod python;
