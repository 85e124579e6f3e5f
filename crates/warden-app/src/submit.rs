//! Form submission: validate, then create or update through a store.

use crate::handlers::{ErrorOptions, ResponseHandlers};
use warden_client::{ClientError, EntityStore, StoreOptions};
use warden_core::{Record, RecordKey};
use warden_forms::ReactiveForm;

/// Why a submission did not produce a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    /// The form failed validation; nothing was sent
    #[error("Form is invalid (first invalid field: {field:?})")]
    Invalid {
        /// First failing field in declaration order
        field: Option<String>,
    },

    /// The server rejected the request
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The server accepted the request but returned no record
    #[error("Server returned no record")]
    Empty,
}

/// Validate `form` and send it: PUT to `id` when editing, POST otherwise.
///
/// On success a toast with `success_message` is shown. Failures go through
/// [`ResponseHandlers::handle_error`] with `error_opts`, so the user sees the
/// server's message and the modal OK button comes back.
pub async fn submit_form<M: Record>(
    form: &ReactiveForm,
    store: &EntityStore<M>,
    id: Option<&RecordKey>,
    handlers: &ResponseHandlers,
    success_message: &str,
    error_opts: ErrorOptions,
) -> Result<M, SubmitError> {
    let report = form.validate().await;
    if !report.valid {
        tracing::debug!(first_invalid = ?report.first_invalid, "submit blocked by validation");
        if let Some(modal) = &error_opts.modal {
            modal.enable_ok();
        }
        return Err(SubmitError::Invalid {
            field: report.first_invalid,
        });
    }

    let payload = form.to_json();
    let opts = StoreOptions::default();
    let result = match id {
        Some(id) => store.update(id, payload, &opts).await,
        None => store.create(payload, &opts).await,
    };

    match result {
        Ok(fetched) => {
            let record = fetched.into_one().ok_or(SubmitError::Empty)?;
            handlers.notify_success(success_message);
            Ok(record)
        }
        Err(err) => {
            handlers.handle_error::<M, _>(None, error_opts, |_| {})(err.clone());
            Err(SubmitError::Client(err))
        }
    }
}
