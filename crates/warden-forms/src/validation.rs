//! Validator contract shared by synchronous and asynchronous checks.
//!
//! A validator inspects a [`ValidationContext`] and answers with a
//! [`ValidationOutcome`]. Remote checks (name uniqueness, quota lookups) return
//! [`ValidationOutcome::Pending`] wrapping the future that settles them.

use crate::field::FieldState;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Result of running a validator once.
pub enum ValidationOutcome {
    /// The value is acceptable
    Valid,
    /// The value is rejected; `None` falls back to the configured message
    Invalid(Option<String>),
    /// The verdict arrives later
    Pending(BoxFuture<'static, ValidationOutcome>),
}

/// Payload an asynchronous check rejects with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ValidationRejection {
    /// Server- or validator-supplied message
    #[serde(default)]
    pub error: Option<String>,
}

impl ValidationRejection {
    /// Rejection carrying a message.
    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
        }
    }
}

impl ValidationOutcome {
    /// Invalid with the configured message.
    pub fn invalid() -> Self {
        Self::Invalid(None)
    }

    /// Invalid with a message specific to this failure.
    pub fn invalid_with(message: impl Into<String>) -> Self {
        Self::Invalid(Some(message.into()))
    }

    /// Wrap an asynchronous check that resolves on success and rejects with
    /// a [`ValidationRejection`]. Rejection messages are trimmed; a blank one
    /// falls back to the configured message.
    pub fn from_future<F>(check: F) -> Self
    where
        F: Future<Output = Result<(), ValidationRejection>> + Send + 'static,
    {
        Self::Pending(
            check
                .map(|result| match result {
                    Ok(()) => Self::Valid,
                    Err(rejection) => {
                        let message = rejection
                            .error
                            .map(|e| e.trim().to_string())
                            .filter(|e| !e.is_empty());
                        Self::Invalid(message)
                    }
                })
                .boxed(),
        )
    }

    /// Drive a possibly-pending outcome to its final verdict.
    pub async fn settle(self) -> Settled {
        let mut outcome = self;
        loop {
            match outcome {
                Self::Valid => return Settled::Valid,
                Self::Invalid(message) => return Settled::Invalid(message),
                Self::Pending(future) => outcome = future.await,
            }
        }
    }

    /// Whether the verdict is already known.
    pub fn is_ready(&self) -> bool {
        !matches!(self, Self::Pending(_))
    }
}

impl From<bool> for ValidationOutcome {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid(None)
        }
    }
}

impl fmt::Debug for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("Valid"),
            Self::Invalid(message) => f.debug_tuple("Invalid").field(message).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// A settled verdict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settled {
    /// Accepted
    Valid,
    /// Rejected, optionally with a specific message
    Invalid(Option<String>),
}

/// What a validator gets to look at.
pub struct ValidationContext<'a> {
    /// The field being validated
    pub field: &'a FieldState,
    /// Every field of the owning form, keyed by field key (includes `field`)
    pub fields: &'a IndexMap<String, FieldState>,
    /// The model bound to the form, for edit flows
    pub model: Option<&'a Value>,
}

impl<'a> ValidationContext<'a> {
    /// The field's current value.
    pub fn value(&self) -> &'a Value {
        &self.field.value
    }

    /// The value as text; non-strings yield `None`.
    pub fn text(&self) -> Option<&'a str> {
        self.field.value.as_str()
    }

    /// A sibling field's state.
    pub fn sibling(&self, key: &str) -> Option<&'a FieldState> {
        self.fields.get(key)
    }
}

/// A field validator.
pub trait Validator: Send + Sync {
    /// Judge the field described by `ctx`.
    fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome;
}

impl<F> Validator for F
where
    F: Fn(&ValidationContext<'_>) -> ValidationOutcome + Send + Sync,
{
    fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        self(ctx)
    }
}

/// Validator configuration attached to a field definition.
#[derive(Clone)]
pub struct ValidatorSpec {
    pub(crate) error_message: String,
    pub(crate) validator: Arc<dyn Validator>,
    pub(crate) interactive: bool,
}

impl ValidatorSpec {
    /// Validator with the message shown when it fails without its own.
    pub fn new<F>(error_message: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&ValidationContext<'_>) -> ValidationOutcome + Send + Sync + 'static,
    {
        Self::from_validator(error_message, validator)
    }

    /// Same as [`ValidatorSpec::new`] for types implementing [`Validator`] directly.
    pub fn from_validator(
        error_message: impl Into<String>,
        validator: impl Validator + 'static,
    ) -> Self {
        Self {
            error_message: error_message.into(),
            validator: Arc::new(validator),
            interactive: true,
        }
    }

    /// Non-interactive fields clear their validation on change instead of
    /// re-validating; forced validation still runs.
    #[must_use]
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// The configured failure message.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Whether changes trigger validation.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }
}

impl fmt::Debug for ValidatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorSpec")
            .field("error_message", &self.error_message)
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

/// Emptiness as forms understand it: null, blank text, empty array or object.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Stock validators for common console fields.
pub mod rules {
    use super::{is_blank, ValidationContext, ValidationOutcome};

    /// Non-blank value.
    pub fn required() -> impl Fn(&ValidationContext<'_>) -> ValidationOutcome + Send + Sync {
        |ctx: &ValidationContext<'_>| ValidationOutcome::from(!is_blank(ctx.value()))
    }

    /// Text of at least `min` characters (after trimming).
    pub fn min_length(
        min: usize,
    ) -> impl Fn(&ValidationContext<'_>) -> ValidationOutcome + Send + Sync {
        move |ctx: &ValidationContext<'_>| {
            let len = ctx.text().map_or(0, |s| s.trim().chars().count());
            ValidationOutcome::from(len >= min)
        }
    }

    /// Text of at most `max` characters.
    pub fn max_length(
        max: usize,
    ) -> impl Fn(&ValidationContext<'_>) -> ValidationOutcome + Send + Sync {
        move |ctx: &ValidationContext<'_>| {
            let len = ctx.text().map_or(0, |s| s.chars().count());
            ValidationOutcome::from(len <= max)
        }
    }

    /// Required text of bounded length, with a message per failure:
    /// `required_message` when blank, `"Max {max} characters"` when too long.
    pub fn required_max(
        max: usize,
        required_message: &'static str,
    ) -> impl Fn(&ValidationContext<'_>) -> ValidationOutcome + Send + Sync {
        move |ctx: &ValidationContext<'_>| {
            if is_blank(ctx.value()) {
                ValidationOutcome::invalid_with(required_message)
            } else if ctx.text().map_or(0, |s| s.chars().count()) > max {
                ValidationOutcome::invalid_with(format!("Max {max} characters"))
            } else {
                ValidationOutcome::Valid
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> FieldState {
        FieldState {
            value,
            ..FieldState::default()
        }
    }

    fn run(validator: &dyn Validator, value: Value) -> Settled {
        let field = state(value);
        let fields = IndexMap::new();
        let ctx = ValidationContext {
            field: &field,
            fields: &fields,
            model: None,
        };
        futures::executor::block_on(validator.validate(&ctx).settle())
    }

    #[test]
    fn test_bool_conversion() {
        assert!(matches!(ValidationOutcome::from(true), ValidationOutcome::Valid));
        assert!(matches!(
            ValidationOutcome::from(false),
            ValidationOutcome::Invalid(None)
        ));
    }

    #[test]
    fn test_required_rule() {
        let rule = rules::required();
        assert_eq!(run(&rule, json!("   ")), Settled::Invalid(None));
        assert_eq!(run(&rule, json!([])), Settled::Invalid(None));
        assert_eq!(run(&rule, json!(0)), Settled::Valid);
        assert_eq!(run(&rule, json!("x")), Settled::Valid);
    }

    #[test]
    fn test_required_max_messages() {
        let rule = rules::required_max(4, "Required!");
        assert_eq!(
            run(&rule, json!("")),
            Settled::Invalid(Some("Required!".to_string()))
        );
        assert_eq!(
            run(&rule, json!("abcdef")),
            Settled::Invalid(Some("Max 4 characters".to_string()))
        );
        assert_eq!(run(&rule, json!("abcd")), Settled::Valid);
    }

    #[test]
    fn test_future_rejection_is_trimmed() {
        let outcome = ValidationOutcome::from_future(async {
            Err(ValidationRejection::with_error("  Name already taken \n"))
        });
        assert!(!outcome.is_ready());
        assert_eq!(
            futures::executor::block_on(outcome.settle()),
            Settled::Invalid(Some("Name already taken".to_string()))
        );
    }

    #[test]
    fn test_blank_rejection_falls_back() {
        let outcome =
            ValidationOutcome::from_future(async { Err(ValidationRejection::with_error("  ")) });
        assert_eq!(
            futures::executor::block_on(outcome.settle()),
            Settled::Invalid(None)
        );
    }

    #[test]
    fn test_rejection_payload_deserializes() {
        let rejection: ValidationRejection =
            serde_json::from_value(json!({"error": "taken"})).unwrap();
        assert_eq!(rejection.error.as_deref(), Some("taken"));
        let empty: ValidationRejection = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.error, None);
    }
}
