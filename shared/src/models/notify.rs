//! Enrollment notification payload

use serde::{Deserialize, Serialize};

/// Details of a new enrollment, forwarded to the staff chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentNotification {
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub student_email: Option<String>,
    #[serde(default)]
    pub student_phone: Option<String>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Escape text for the chat bot's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

impl EnrollmentNotification {
    /// Render the chat message body (HTML parse mode)
    pub fn to_html_message(&self) -> String {
        let field = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(escape_html)
                .unwrap_or_else(|| "N/A".to_string())
        };
        let amount = match &self.amount {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => escape_html(s.trim()),
            _ => "N/A".to_string(),
        };

        let mut lines = vec![
            "🎓 <b>New Enrollment</b>".to_string(),
            String::new(),
            format!("👤 <b>Student:</b> {}", field(&self.student_name)),
            format!("📧 <b>Email:</b> {}", field(&self.student_email)),
        ];
        if self.student_phone.is_some() {
            lines.push(format!("📱 <b>Phone:</b> {}", field(&self.student_phone)));
        }
        lines.push(format!("📚 <b>Course:</b> {}", field(&self.course_name)));
        lines.push(format!("💰 <b>Amount:</b> {}", amount));
        if self.payment_method.is_some() {
            lines.push(format!("💳 <b>Method:</b> {}", field(&self.payment_method)));
        }
        if self.transaction_id.is_some() {
            lines.push(format!("🧾 <b>Transaction:</b> {}", field(&self.transaction_id)));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>A & B</b>"), "&lt;b&gt;A &amp; B&lt;/b&gt;");
    }

    #[test]
    fn test_message_contains_fields() {
        let n = EnrollmentNotification {
            student_name: Some("Nadia <script>".to_string()),
            student_email: Some("nadia@example.com".to_string()),
            course_name: Some("Web Design".to_string()),
            amount: Some(serde_json::json!(2500)),
            ..Default::default()
        };
        let msg = n.to_html_message();
        assert!(msg.contains("Nadia &lt;script&gt;"));
        assert!(msg.contains("Web Design"));
        assert!(msg.contains("2500"));
        assert!(!msg.contains("Phone"));
    }

    #[test]
    fn test_missing_fields_render_placeholder() {
        let msg = EnrollmentNotification::default().to_html_message();
        assert!(msg.contains("<b>Student:</b> N/A"));
        assert!(msg.contains("<b>Amount:</b> N/A"));
    }
}
