//! Form and field behaviour observed through the public API.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warden_core::FormsConfig;
use warden_forms::{
    FieldDefinition, ReactiveForm, ValidationContext, ValidationOutcome, ValidationRejection,
    ValidatorSpec,
};

const QUIET: Duration = Duration::from_millis(310);

fn name_rule(ctx: &ValidationContext<'_>) -> ValidationOutcome {
    let text = ctx.text().unwrap_or_default().trim();
    if text.is_empty() {
        ValidationOutcome::invalid()
    } else if text.chars().count() < 3 {
        ValidationOutcome::invalid_with("Min 3 characters")
    } else {
        ValidationOutcome::Valid
    }
}

fn name_form() -> ReactiveForm {
    ReactiveForm::new([(
        "name".to_string(),
        FieldDefinition::new("").validated_by(ValidatorSpec::new("Required!", name_rule)),
    )])
}

#[tokio::test(start_paused = true)]
async fn required_min_length_walkthrough() {
    let form = name_form();
    let field = form.field("name").unwrap();

    field.set_value(json!(""));
    assert!(field.is_valid());

    assert!(!field.validate(true).await);
    assert_eq!(field.error_message(), "Required!");

    form.update_field("name", json!("ab"), false).unwrap();
    tokio::time::sleep(QUIET).await;
    assert!(!field.is_valid());
    assert_eq!(field.error_message(), "Min 3 characters");

    form.update_field("name", json!("abc"), false).unwrap();
    tokio::time::sleep(QUIET).await;
    assert!(field.is_valid());
    assert_eq!(field.error_message(), "");
    assert!(form.is_valid());
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_validate_once_with_last_value() {
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let recorder = seen.clone();
    let form = ReactiveForm::new([(
        "host".to_string(),
        FieldDefinition::new("").validated_by(ValidatorSpec::new(
            "bad host",
            move |ctx: &ValidationContext<'_>| {
                recorder.lock().unwrap().push(ctx.value().clone());
                ValidationOutcome::Valid
            },
        )),
    )]);

    for text in ["d", "db", "db.", "db.internal"] {
        form.update_field("host", json!(text), false).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(QUIET).await;

    assert_eq!(*seen.lock().unwrap(), vec![json!("db.internal")]);
}

#[tokio::test(start_paused = true)]
async fn configured_debounce_is_honoured() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let form = ReactiveForm::with_config(
        [(
            "port".to_string(),
            FieldDefinition::new(0).validated_by(ValidatorSpec::new(
                "bad port",
                move |_: &ValidationContext<'_>| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ValidationOutcome::Valid
                },
            )),
        )],
        &FormsConfig { debounce_ms: 50 },
    );

    form.update_field("port", json!(8080), false).unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn form_is_invalid_while_async_check_runs() {
    let (release, gate) = tokio::sync::oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate)));
    let form = ReactiveForm::new([(
        "name".to_string(),
        FieldDefinition::new("web").validated_by(ValidatorSpec::new(
            "Unavailable",
            move |_: &ValidationContext<'_>| {
                let gate = gate.lock().unwrap().take();
                ValidationOutcome::from_future(async move {
                    if let Some(gate) = gate {
                        let _ = gate.await;
                    }
                    Err(ValidationRejection::with_error("Name already exists"))
                })
            },
        )),
    )]);

    let running = tokio::spawn({
        let form = form.clone();
        async move { form.validate().await }
    });
    tokio::task::yield_now().await;
    assert!(form.is_validating());
    assert!(!form.is_valid());

    release.send(()).unwrap();
    let report = running.await.unwrap();
    assert!(!report.valid);
    assert_eq!(report.first_invalid.as_deref(), Some("name"));
    assert_eq!(form.summary(), vec!["Name already exists".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn refresh_revalidates_touched_fields_only() {
    let form = ReactiveForm::new([
        (
            "name".to_string(),
            FieldDefinition::new("").validated_by(ValidatorSpec::new("Required!", name_rule)),
        ),
        (
            "alias".to_string(),
            FieldDefinition::new("").validated_by(ValidatorSpec::new("Required!", name_rule)),
        ),
    ]);

    form.update_field("name", json!("valid-name"), false).unwrap();
    tokio::time::sleep(QUIET).await;

    form.refresh(json!({"name": "x", "alias": "y"}).as_object().unwrap());
    tokio::time::sleep(QUIET).await;

    assert!(!form.field("name").unwrap().is_valid());
    assert!(form.field("alias").unwrap().is_valid());
}

#[tokio::test]
async fn revision_signal_ticks_on_change() {
    use futures::StreamExt;
    use futures_signals::signal::SignalExt;

    let form = name_form();
    let mut revisions = form.revision_signal().to_stream();
    let first = revisions.next().await.unwrap();

    form.update_field("name", json!("abc"), true).unwrap();
    let next = revisions.next().await.unwrap();
    assert!(next > first);
}

proptest! {
    #[test]
    fn to_json_trims_every_text_value(values in proptest::collection::vec("[ a-z]{0,12}", 1..6)) {
        let form = ReactiveForm::new(
            values
                .iter()
                .enumerate()
                .map(|(i, _)| (format!("f{i}"), FieldDefinition::new(""))),
        );
        for (i, value) in values.iter().enumerate() {
            form.update_field(&format!("f{i}"), json!(value), true).unwrap();
        }

        let payload = form.to_json();
        for (i, value) in values.iter().enumerate() {
            prop_assert_eq!(&payload[format!("f{i}")], &json!(value.trim()));
        }
    }
}
