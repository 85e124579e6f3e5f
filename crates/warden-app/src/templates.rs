//! Server error message templating.
//!
//! Parametrized server errors arrive as a code plus arguments, for example
//! `{"msgCode": "POLICY_LIMIT", "messageList": ["web", "10"]}`. A template such
//! as `"Policy {0} exceeds the limit of {1}"` turns that into a readable
//! message. Codes without a template fall back to the server's own text.

use serde_json::Value;
use std::collections::HashMap;
use warden_client::client::error_message;
use warden_client::ClientError;

/// Generic message when nothing better is available.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Code-to-template lookup.
#[derive(Clone, Debug, Default)]
pub struct ErrorTemplates {
    templates: HashMap<String, String>,
}

impl ErrorTemplates {
    /// Empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template.
    #[must_use]
    pub fn with(mut self, code: impl Into<String>, template: impl Into<String>) -> Self {
        self.insert(code, template);
        self
    }

    /// Register a template.
    pub fn insert(&mut self, code: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(code.into(), template.into());
    }

    /// Templated message for a structured error body, if its code is known.
    pub fn render(&self, data: &Value) -> Option<String> {
        let code = ["msgCode", "errorCode", "code"]
            .iter()
            .find_map(|key| data.get(*key).and_then(scalar_text))?;
        let template = self.templates.get(&code)?;

        let args: Vec<String> = ["messageList", "params"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_array))
            .map(|items| items.iter().filter_map(scalar_text).collect())
            .unwrap_or_default();
        Some(fill(template, &args))
    }

    /// The message a user should see for `err`.
    pub fn message_for(&self, err: &ClientError) -> String {
        let data = normalize_payload(err.data());
        self.render(&data)
            .or_else(|| error_message(&data))
            .unwrap_or_else(|| match err {
                ClientError::Status { message, .. } if !message.is_empty() => message.clone(),
                ClientError::Transport { .. } | ClientError::Decode { .. } => {
                    FALLBACK_MESSAGE.to_string()
                }
                other => other.to_string(),
            })
    }
}

/// Error bodies sometimes arrive as JSON-encoded strings; decode those.
pub fn normalize_payload(data: &Value) -> Value {
    match data {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
            _ => data.clone(),
        },
        other => other.clone(),
    }
}

/// Replace `{0}`, `{1}`, ... with the matching argument. Placeholders without
/// an argument are left as they are. The template is scanned once, so braces
/// inside an argument are copied literally.
pub fn fill(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let arg = after.find('}').and_then(|close| {
            let index = &after[..close];
            let arg = if index.bytes().all(|b| b.is_ascii_digit()) {
                index.parse::<usize>().ok().and_then(|i| args.get(i))
            } else {
                None
            };
            arg.map(|arg| (arg, close))
        });
        match arg {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn templates() -> ErrorTemplates {
        ErrorTemplates::new().with("POLICY_LIMIT", "Policy {0} exceeds the limit of {1}")
    }

    #[test]
    fn test_render_fills_arguments() {
        let data = json!({"msgCode": "POLICY_LIMIT", "messageList": ["web", 10]});
        assert_eq!(
            templates().render(&data).as_deref(),
            Some("Policy web exceeds the limit of 10")
        );
    }

    #[test]
    fn test_unknown_code_falls_back_to_server_text() {
        let err = ClientError::status(400, "bad", json!({"msgCode": "OTHER", "msgDesc": "Name taken"}));
        assert_eq!(templates().message_for(&err), "Name taken");
    }

    #[test]
    fn test_string_payload_is_parsed() {
        let body = json!({"msgCode": "POLICY_LIMIT", "params": ["db"]}).to_string();
        let err = ClientError::status(422, "Unprocessable", Value::String(body));
        assert_eq!(
            templates().message_for(&err),
            "Policy db exceeds the limit of {1}"
        );
    }

    #[test]
    fn test_fill_does_not_resubstitute_arguments() {
        let args = vec!["{1}".to_string(), "10".to_string()];
        assert_eq!(
            fill("Policy {0} exceeds the limit of {1}", &args),
            "Policy {1} exceeds the limit of 10"
        );
        assert_eq!(fill("{x} {2} {", &args), "{x} {2} {");
        assert_eq!(fill("{1}{0}", &args), "10{1}");
    }

    #[test]
    fn test_plain_errors() {
        let err = ClientError::status(500, "Request failed with status code 500", Value::Null);
        assert_eq!(templates().message_for(&err), "Request failed with status code 500");
        assert_eq!(
            templates().message_for(&ClientError::transport("reset")),
            FALLBACK_MESSAGE
        );
    }
}
