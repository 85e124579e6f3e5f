//! # Reactive Form
//!
//! An ordered map of [`ReactiveField`]s with aggregate validity, JSON
//! serialization and bulk load/reset.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let form = ReactiveForm::new([
//!     ("name".to_string(), FieldDefinition::new("").required()
//!         .validated_by(ValidatorSpec::new("Required!", rules::required()))),
//!     ("tags".to_string(), FieldDefinition::new(json!([]))),
//! ]);
//!
//! form.refresh(&policy_json);            // edit flow
//! let report = form.validate().await;    // before submit
//! if report.valid {
//!     store.update(id, form.to_json(), opts).await?;
//! }
//! ```

use crate::field::{FieldDefinition, FieldScope, FieldState, ReactiveField};
use crate::validation::is_blank;
use futures_signals::signal::{Mutable, Signal, SignalExt};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use std::time::Duration;
use warden_core::{FormsConfig, WardenError};

/// Outcome of [`ReactiveForm::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormValidation {
    /// Every field passed
    pub valid: bool,
    /// Key of the first failing field in declaration order
    pub first_invalid: Option<String>,
}

struct FormInner {
    fields: RwLock<IndexMap<String, ReactiveField>>,
    model: RwLock<Option<Value>>,
    validating: Mutable<bool>,
    revision: Mutable<u64>,
    debounce: Duration,
}

impl FieldScope for FormInner {
    fn snapshot(&self) -> (IndexMap<String, FieldState>, Option<Value>) {
        let fields = self
            .fields
            .read()
            .iter()
            .map(|(key, field)| (key.clone(), field.state()))
            .collect();
        (fields, self.model.read().clone())
    }

    fn field_changed(&self) {
        self.revision.replace_with(|r| r.wrapping_add(1));
    }
}

/// An observable form. Clones share state.
#[derive(Clone)]
pub struct ReactiveForm {
    inner: Arc<FormInner>,
}

impl ReactiveForm {
    /// Build a form from field definitions with the default debounce.
    pub fn new(definitions: impl IntoIterator<Item = (String, FieldDefinition)>) -> Self {
        Self::with_config(definitions, &FormsConfig::default())
    }

    /// Build a form from field definitions.
    pub fn with_config(
        definitions: impl IntoIterator<Item = (String, FieldDefinition)>,
        config: &FormsConfig,
    ) -> Self {
        let form = Self {
            inner: Arc::new(FormInner {
                fields: RwLock::new(IndexMap::new()),
                model: RwLock::new(None),
                validating: Mutable::new(false),
                revision: Mutable::new(0),
                debounce: config.debounce(),
            }),
        };
        for (key, definition) in definitions {
            form.add_field(key, definition);
        }
        form
    }

    fn scope(&self) -> Weak<dyn FieldScope> {
        let weak: Weak<FormInner> = Arc::downgrade(&self.inner);
        weak
    }

    fn bump(&self) {
        self.inner.field_changed();
    }

    // ─── Field management ────────────────────────────────────

    /// Insert a field, replacing any field with the same key.
    pub fn add_field(&self, key: impl Into<String>, definition: FieldDefinition) -> ReactiveField {
        let key = key.into();
        let field = ReactiveField::new(key.clone(), definition, self.inner.debounce);
        field.attach(self.scope());
        self.inner.fields.write().insert(key, field.clone());
        self.bump();
        field
    }

    /// Remove one field.
    pub fn remove_field(&self, key: &str) -> Option<ReactiveField> {
        let removed = self.inner.fields.write().shift_remove(key);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Remove several fields. Returns how many existed.
    pub fn remove_fields<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> usize {
        let removed = {
            let mut fields = self.inner.fields.write();
            keys.into_iter()
                .filter(|key| fields.shift_remove(*key).is_some())
                .count()
        };
        if removed > 0 {
            self.bump();
        }
        removed
    }

    /// Rename a field key in place, keeping its position and state.
    pub fn update_field_key(&self, old_key: &str, new_key: impl Into<String>) -> Result<(), WardenError> {
        let new_key = new_key.into();
        {
            let mut fields = self.inner.fields.write();
            if fields.contains_key(&new_key) {
                return Err(WardenError::invalid(format!("field {new_key} already exists")));
            }
            let Some((index, _, field)) = fields.shift_remove_full(old_key) else {
                return Err(WardenError::not_found(format!("field {old_key}")));
            };
            field.set_key(new_key.clone());
            fields.shift_insert(index, new_key, field);
        }
        self.bump();
        Ok(())
    }

    /// Field by key.
    pub fn field(&self, key: &str) -> Option<ReactiveField> {
        self.inner.fields.read().get(key).cloned()
    }

    /// Field keys in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.fields.read().keys().cloned().collect()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> Vec<(String, ReactiveField)> {
        self.inner
            .fields
            .read()
            .iter()
            .map(|(k, f)| (k.clone(), f.clone()))
            .collect()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.inner.fields.read().len()
    }

    /// Whether the form has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ─── Model binding ───────────────────────────────────────

    /// Bind the record being edited. Validators see it as `ctx.model`.
    pub fn set_model(&self, model: Option<Value>) {
        *self.inner.model.write() = model;
        self.bump();
    }

    /// The bound record.
    pub fn model(&self) -> Option<Value> {
        self.inner.model.read().clone()
    }

    /// Load the bound record into the fields.
    pub fn refresh_from_model(&self) {
        if let Some(Value::Object(model)) = self.model() {
            self.refresh(&model);
        }
    }

    // ─── Value operations ────────────────────────────────────

    /// Set one field's value.
    ///
    /// With `reset`, the change is programmatic: no validation runs and the
    /// field ends pristine. Without it, the change behaves like user input.
    pub fn update_field(&self, key: &str, value: Value, reset: bool) -> Result<(), WardenError> {
        let field = self
            .field(key)
            .ok_or_else(|| WardenError::not_found(format!("field {key}")))?;
        if reset {
            field.reset_value(value);
        } else {
            field.set_value(value);
        }
        Ok(())
    }

    /// Load values into every field whose key is present in `values`
    /// (including falsy values such as `0` or `false`). Interaction state is
    /// kept, so a field the user already touched re-validates the loaded value.
    pub fn refresh(&self, values: &Map<String, Value>) {
        for (key, field) in self.fields() {
            if let Some(value) = values.get(&key) {
                field.assign(value.clone());
            }
        }
    }

    /// Restore every field to its default and pristine state.
    pub fn clear_form(&self) {
        for (_, field) in self.fields() {
            field.reset_to_default();
        }
    }

    // ─── Validation ──────────────────────────────────────────

    /// Force validation of every field, one after another in declaration
    /// order. The form reads as invalid until the pass completes.
    pub async fn validate(&self) -> FormValidation {
        self.inner.validating.set(true);
        self.bump();

        let mut first_invalid = None;
        for (key, field) in self.fields() {
            let valid = field.validate(true).await;
            if !valid && first_invalid.is_none() {
                first_invalid = Some(key);
            }
        }

        self.inner.validating.set(false);
        self.bump();
        tracing::debug!(first_invalid = ?first_invalid, "form validated");

        FormValidation {
            valid: first_invalid.is_none(),
            first_invalid,
        }
    }

    /// Whether a form-wide pass is running.
    pub fn is_validating(&self) -> bool {
        self.inner.validating.get()
    }

    /// Valid only when no validation is in flight and every field is valid.
    pub fn is_valid(&self) -> bool {
        if self.inner.validating.get() {
            return false;
        }
        self.inner
            .fields
            .read()
            .values()
            .all(|f| f.is_valid() && !f.is_validating())
    }

    /// Whether any field has been changed by the user.
    pub fn interacted(&self) -> bool {
        self.inner.fields.read().values().any(ReactiveField::interacted)
    }

    /// Non-empty error messages in declaration order.
    pub fn summary(&self) -> Vec<String> {
        self.inner
            .fields
            .read()
            .values()
            .map(ReactiveField::error_message)
            .filter(|m| !m.is_empty())
            .collect()
    }

    /// Key of the field a screen should bring into view: the first invalid
    /// field, or failing that the first empty required one.
    pub fn first_invalid_field(&self) -> Option<String> {
        let fields = self.inner.fields.read();
        fields
            .iter()
            .find(|(_, f)| !f.is_valid())
            .or_else(|| fields.iter().find(|(_, f)| f.is_required() && is_blank(&f.value())))
            .map(|(key, _)| key.clone())
    }

    /// Plain object of field values keyed by field name (or key). Text is
    /// trimmed; other values pass through unchanged.
    pub fn to_json(&self) -> Value {
        let fields = self.inner.fields.read();
        let mut out = Map::with_capacity(fields.len());
        for (key, field) in fields.iter() {
            let name = field.name();
            let name = if name.is_empty() { key.clone() } else { name };
            let value = match field.value() {
                Value::String(s) => Value::String(s.trim().to_string()),
                other => other,
            };
            out.insert(name, value);
        }
        Value::Object(out)
    }

    // ─── Signals ─────────────────────────────────────────────

    /// Ticks on every change to any field or to the form itself.
    pub fn revision_signal(&self) -> impl Signal<Item = u64> + Send + Sync + 'static {
        self.inner.revision.signal()
    }

    /// Signal of [`ReactiveForm::is_valid`].
    pub fn valid_signal(&self) -> impl Signal<Item = bool> + Send + Sync + 'static {
        let form = self.clone();
        self.inner
            .revision
            .signal()
            .map(move |_| form.is_valid())
            .dedupe()
    }

    /// Signal of [`ReactiveForm::summary`].
    pub fn summary_signal(&self) -> impl Signal<Item = Vec<String>> + Send + Sync + 'static {
        let form = self.clone();
        self.inner
            .revision
            .signal()
            .map(move |_| form.summary())
            .dedupe_cloned()
    }
}

impl std::fmt::Debug for ReactiveForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveForm")
            .field("fields", &self.keys())
            .field("validating", &self.is_validating())
            .finish()
    }
}
