//! # Warden Forms
//!
//! Observable form state for the policy console: fields that hold a value,
//! validate it (synchronously or against the server) after a debounce, and
//! forms that aggregate fields into validity, a JSON payload and a summary of
//! error messages.
//!
//! Everything here is headless. Screens subscribe to the `*_signal` methods
//! and render however they like.

#![forbid(unsafe_code)]

mod debounce;
pub mod field;
pub mod form;
pub mod validation;

pub use field::{FieldDefinition, FieldState, ReactiveField};
pub use form::{FormValidation, ReactiveForm};
pub use validation::{
    is_blank, rules, Settled, ValidationContext, ValidationOutcome, ValidationRejection,
    Validator, ValidatorSpec,
};
