//! # Reactive Field
//!
//! One observable, validated form value.
//!
//! A field is presumed valid until the user has changed it (or validation is
//! forced), so a pristine required field never shows an error on first render.
//! Changes are validated after a debounce quiet period; a burst of keystrokes
//! yields one validation pass over the last value.

use crate::debounce::Debouncer;
use crate::validation::{Settled, ValidationContext, ValidationOutcome, ValidatorSpec};
use futures_signals::signal::{Mutable, Signal};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Plain-data view of a field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldState {
    /// Serialized name (falls back to the field key when empty)
    pub name: String,
    /// Current value
    pub value: Value,
    /// Value restored by `clear_form`
    pub default_value: Value,
    /// The value has been changed at least once since the last reset
    pub interacted: bool,
    /// Result of the last validation pass
    pub valid: bool,
    /// Message of the last failed validation
    pub error_message: String,
    /// An asynchronous validation is outstanding
    pub validating: bool,
    /// Free-form options for input components (`required`, `placeholder`, ...)
    pub opts: Map<String, Value>,
}

impl Default for FieldState {
    fn default() -> Self {
        Self {
            name: String::new(),
            value: Value::String(String::new()),
            default_value: Value::String(String::new()),
            interacted: false,
            valid: true,
            error_message: String::new(),
            validating: false,
            opts: Map::new(),
        }
    }
}

/// How to build one field.
#[derive(Clone, Debug, Default)]
pub struct FieldDefinition {
    /// Initial and reset value; `null` becomes the empty string
    pub default_value: Value,
    /// Serialized name; `None` uses the field key
    pub name: Option<String>,
    /// Options for input components
    pub field_opts: Map<String, Value>,
    /// Validator, if the field is validated
    pub validator: Option<ValidatorSpec>,
}

impl FieldDefinition {
    /// Definition with a default value.
    pub fn new(default_value: impl Into<Value>) -> Self {
        Self {
            default_value: default_value.into(),
            ..Self::default()
        }
    }

    /// Serialize under `name` instead of the field key.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set an input option.
    #[must_use]
    pub fn opt(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field_opts.insert(key.into(), value.into());
        self
    }

    /// Mark the field required for `first_invalid_field` lookups.
    #[must_use]
    pub fn required(self) -> Self {
        self.opt("required", true)
    }

    /// Attach a validator.
    #[must_use]
    pub fn validated_by(mut self, validator: ValidatorSpec) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// Access a field has to the form that owns it.
pub(crate) trait FieldScope: Send + Sync {
    /// Snapshot of every field plus the bound model.
    fn snapshot(&self) -> (IndexMap<String, FieldState>, Option<Value>);

    /// A field's observable state changed.
    fn field_changed(&self);
}

struct FieldInner {
    key: RwLock<String>,
    state: Mutable<FieldState>,
    validator: Option<ValidatorSpec>,
    skip_validation: AtomicBool,
    generation: AtomicU64,
    debouncer: Debouncer,
    scope: RwLock<Option<Weak<dyn FieldScope>>>,
}

/// An observable form field. Clones share state.
#[derive(Clone)]
pub struct ReactiveField {
    inner: Arc<FieldInner>,
}

impl ReactiveField {
    /// Build a standalone field.
    pub fn new(key: impl Into<String>, definition: FieldDefinition, debounce: Duration) -> Self {
        let default_value = match definition.default_value {
            Value::Null => Value::String(String::new()),
            other => other,
        };
        let state = FieldState {
            name: definition.name.unwrap_or_default(),
            value: default_value.clone(),
            default_value,
            opts: definition.field_opts,
            ..FieldState::default()
        };

        Self {
            inner: Arc::new(FieldInner {
                key: RwLock::new(key.into()),
                state: Mutable::new(state),
                validator: definition.validator,
                skip_validation: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                debouncer: Debouncer::new(debounce),
                scope: RwLock::new(None),
            }),
        }
    }

    pub(crate) fn attach(&self, scope: Weak<dyn FieldScope>) {
        *self.inner.scope.write() = Some(scope);
    }

    pub(crate) fn set_key(&self, key: impl Into<String>) {
        *self.inner.key.write() = key.into();
    }

    // ─── Reads ───────────────────────────────────────────────

    /// Key under which the owning form stores this field.
    pub fn key(&self) -> String {
        self.inner.key.read().clone()
    }

    /// Serialized name, empty when the key is used.
    pub fn name(&self) -> String {
        self.inner.state.lock_ref().name.clone()
    }

    /// Current value. Always an owned copy, so callers cannot mutate the
    /// stored sequence behind the field's back.
    pub fn value(&self) -> Value {
        self.inner.state.lock_ref().value.clone()
    }

    /// Reset value.
    pub fn default_value(&self) -> Value {
        self.inner.state.lock_ref().default_value.clone()
    }

    /// Result of the last validation pass.
    pub fn is_valid(&self) -> bool {
        self.inner.state.lock_ref().valid
    }

    /// An asynchronous validation is outstanding.
    pub fn is_validating(&self) -> bool {
        self.inner.state.lock_ref().validating
    }

    /// Validation is scheduled or running.
    pub fn has_pending_validation(&self) -> bool {
        self.is_validating() || self.inner.debouncer.is_scheduled()
    }

    /// Changed at least once since the last reset.
    pub fn interacted(&self) -> bool {
        self.inner.state.lock_ref().interacted
    }

    /// Message of the last failed validation, empty when valid.
    pub fn error_message(&self) -> String {
        self.inner.state.lock_ref().error_message.clone()
    }

    /// Full snapshot.
    pub fn state(&self) -> FieldState {
        self.inner.state.lock_ref().clone()
    }

    /// One input option.
    pub fn opt(&self, key: &str) -> Option<Value> {
        self.inner.state.lock_ref().opts.get(key).cloned()
    }

    /// Whether the `required` option is set.
    pub fn is_required(&self) -> bool {
        self.opt("required").and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Attached validator.
    pub fn validator(&self) -> Option<&ValidatorSpec> {
        self.inner.validator.as_ref()
    }

    /// Whether changes trigger validation.
    pub fn is_interactive(&self) -> bool {
        self.inner.validator.as_ref().map_or(true, ValidatorSpec::is_interactive)
    }

    // ─── Signals ─────────────────────────────────────────────

    /// Signal of the value.
    pub fn value_signal(&self) -> impl Signal<Item = Value> + Send + Sync + 'static {
        self.inner.state.signal_ref(|s| s.value.clone())
    }

    /// Signal of validity.
    pub fn valid_signal(&self) -> impl Signal<Item = bool> + Send + Sync + 'static {
        self.inner.state.signal_ref(|s| s.valid)
    }

    /// Signal of the error message.
    pub fn error_signal(&self) -> impl Signal<Item = String> + Send + Sync + 'static {
        self.inner.state.signal_ref(|s| s.error_message.clone())
    }

    /// Signal of the full state.
    pub fn state_signal(&self) -> impl Signal<Item = FieldState> + Send + Sync + 'static {
        self.inner.state.signal_cloned()
    }

    // ─── Writes ──────────────────────────────────────────────

    /// User-driven change.
    ///
    /// Equal values are ignored. Otherwise the field is marked interacted and,
    /// unless validation is being skipped, an interactive field schedules a
    /// debounced validation while a non-interactive one clears its validation.
    pub fn set_value(&self, value: Value) {
        if self.inner.state.lock_ref().value == value {
            return;
        }
        {
            let mut state = self.inner.state.lock_mut();
            state.value = value;
            state.interacted = true;
        }
        self.inner.generation.fetch_add(1, Ordering::AcqRel);

        if !self.inner.skip_validation.load(Ordering::Acquire) {
            if let Some(spec) = &self.inner.validator {
                if spec.interactive {
                    let field = self.clone();
                    self.inner.debouncer.schedule(async move {
                        field.validate(false).await;
                    });
                } else {
                    self.clear_validation_quietly();
                }
            }
        }
        self.notify_scope();
    }

    /// Programmatic change that leaves the field pristine: no validation,
    /// interaction and validation state cleared afterwards.
    pub fn reset_value(&self, value: Value) {
        self.inner.skip_validation.store(true, Ordering::Release);
        self.set_value(value);
        self.inner.skip_validation.store(false, Ordering::Release);
        self.inner.debouncer.cancel();
        {
            let mut state = self.inner.state.lock_mut();
            state.interacted = false;
            state.valid = true;
            state.error_message.clear();
            state.validating = false;
        }
        self.notify_scope();
    }

    /// Restore the default value and pristine state.
    pub fn reset_to_default(&self) {
        self.reset_value(self.default_value());
    }

    /// Load a value without touching interaction state. A field the user has
    /// already interacted with is re-validated so a bad loaded value shows.
    pub(crate) fn assign(&self, value: Value) {
        let interacted = {
            let state = self.inner.state.lock_ref();
            if state.value == value {
                return;
            }
            state.interacted
        };
        self.inner.state.lock_mut().value = value;
        self.inner.generation.fetch_add(1, Ordering::AcqRel);

        if interacted {
            if let Some(spec) = &self.inner.validator {
                if spec.interactive {
                    let field = self.clone();
                    self.inner.debouncer.schedule(async move {
                        field.validate(false).await;
                    });
                } else {
                    self.clear_validation_quietly();
                }
            }
        }
        self.notify_scope();
    }

    /// Mark valid and drop the error message.
    pub fn clear_validation(&self) {
        self.clear_validation_quietly();
        self.notify_scope();
    }

    /// Forget that the user changed the value.
    pub fn reset_interaction(&self) {
        self.inner.state.lock_mut().interacted = false;
        self.notify_scope();
    }

    /// Run the validator.
    ///
    /// Without a validator this is a no-op. Without `force`, a field the user
    /// never changed is marked valid regardless of the validator. Results of an
    /// asynchronous check are dropped if the value changed while it ran.
    pub async fn validate(&self, force: bool) -> bool {
        let Some(spec) = self.inner.validator.clone() else {
            return self.is_valid();
        };
        if !force && !self.interacted() {
            self.clear_validation();
            return true;
        }

        let generation = self.inner.generation.load(Ordering::Acquire);
        let outcome = self.run_validator(&spec);

        let settled = match outcome {
            ValidationOutcome::Valid => Settled::Valid,
            ValidationOutcome::Invalid(message) => Settled::Invalid(message),
            pending @ ValidationOutcome::Pending(_) => {
                self.set_validating(true);
                let settled = pending.settle().await;
                if self.inner.generation.load(Ordering::Acquire) != generation {
                    tracing::debug!(field = %self.key(), "dropping stale validation result");
                    self.set_validating(false);
                    return self.is_valid();
                }
                settled
            }
        };

        let valid = matches!(settled, Settled::Valid);
        {
            let mut state = self.inner.state.lock_mut();
            state.validating = false;
            state.valid = valid;
            state.error_message = match settled {
                Settled::Valid => String::new(),
                Settled::Invalid(Some(message)) => message,
                Settled::Invalid(None) => spec.error_message.clone(),
            };
        }
        self.notify_scope();
        valid
    }

    fn run_validator(&self, spec: &ValidatorSpec) -> ValidationOutcome {
        let key = self.key();
        let scope = self.inner.scope.read().as_ref().and_then(Weak::upgrade);
        let (mut fields, model) = match scope {
            Some(scope) => scope.snapshot(),
            None => (IndexMap::new(), None),
        };
        let field = match fields.get(&key) {
            Some(state) => state.clone(),
            None => {
                let state = self.state();
                fields.insert(key, state.clone());
                state
            }
        };

        let ctx = ValidationContext {
            field: &field,
            fields: &fields,
            model: model.as_ref(),
        };
        spec.validator.validate(&ctx)
    }

    fn set_validating(&self, validating: bool) {
        self.inner.state.lock_mut().validating = validating;
        self.notify_scope();
    }

    fn clear_validation_quietly(&self) {
        let mut state = self.inner.state.lock_mut();
        state.valid = true;
        state.error_message.clear();
        state.validating = false;
    }

    fn notify_scope(&self) {
        let scope = self.inner.scope.read().as_ref().and_then(Weak::upgrade);
        if let Some(scope) = scope {
            scope.field_changed();
        }
    }
}

impl std::fmt::Debug for ReactiveField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveField")
            .field("key", &self.key())
            .field("state", &self.state())
            .finish()
    }
}
