//! Inbound email models

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// State of a support mailbox thread
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "thread_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Open,
    Closed,
}

/// Direction of a stored email message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "message_direction", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// Inbound email webhook payload.
///
/// Accepts both the lower-case field names and the PascalCase names used by
/// common inbound-mail providers. When a payload carries several spellings of
/// one field, the first non-null one in the order listed below wins.
#[derive(Debug, Clone, Default)]
pub struct InboundEmail {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub message_id: Option<String>,
}

const FROM_KEYS: &[&str] = &["from", "From"];
const TO_KEYS: &[&str] = &["to", "To"];
const SUBJECT_KEYS: &[&str] = &["subject", "Subject"];
const TEXT_KEYS: &[&str] = &["text", "body_text", "TextBody"];
const HTML_KEYS: &[&str] = &["html", "body_html", "HtmlBody"];
const MESSAGE_ID_KEYS: &[&str] = &["message_id", "messageId", "MessageID"];

fn pick<E: de::Error>(fields: &Map<String, Value>, keys: &[&str]) -> Result<Option<String>, E> {
    for key in keys {
        match fields.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(value)) => return Ok(Some(value.clone())),
            Some(other) => {
                return Err(E::custom(format!(
                    "invalid type for `{}`: expected a string, found {}",
                    key, other
                )))
            }
        }
    }
    Ok(None)
}

impl<'de> Deserialize<'de> for InboundEmail {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(InboundEmail {
            from: pick(&fields, FROM_KEYS)?,
            to: pick(&fields, TO_KEYS)?,
            subject: pick(&fields, SUBJECT_KEYS)?,
            text: pick(&fields, TEXT_KEYS)?,
            html: pick(&fields, HTML_KEYS)?,
            message_id: pick(&fields, MESSAGE_ID_KEYS)?,
        })
    }
}

/// Subject stored for messages that arrive without one
pub const EMPTY_SUBJECT: &str = "(no subject)";

impl InboundEmail {
    pub fn subject_or_default(&self) -> String {
        self.subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(EMPTY_SUBJECT)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_aliases() {
        let email: InboundEmail = serde_json::from_value(serde_json::json!({
            "From": "Karim <karim@example.com>",
            "Subject": "Course access",
            "TextBody": "Hello",
            "MessageID": "abc@mail"
        }))
        .unwrap();
        assert_eq!(email.from.as_deref(), Some("Karim <karim@example.com>"));
        assert_eq!(email.text.as_deref(), Some("Hello"));
        assert_eq!(email.message_id.as_deref(), Some("abc@mail"));
    }

    #[test]
    fn test_duplicate_spellings() {
        let email: InboundEmail = serde_json::from_value(serde_json::json!({
            "from": "a@example.com",
            "From": "A <a@example.com>",
            "Subject": "Hi",
            "subject": null,
            "TextBody": "Body",
            "body_text": "Plain"
        }))
        .unwrap();
        assert_eq!(email.from.as_deref(), Some("a@example.com"));
        assert_eq!(email.subject.as_deref(), Some("Hi"));
        assert_eq!(email.text.as_deref(), Some("Plain"));
    }

    #[test]
    fn test_non_string_field_rejected() {
        let result: Result<InboundEmail, _> =
            serde_json::from_value(serde_json::json!({ "from": 42 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_default_subject() {
        let email = InboundEmail {
            subject: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(email.subject_or_default(), EMPTY_SUBJECT);
    }
}
