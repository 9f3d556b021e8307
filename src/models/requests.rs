//! Request DTOs for the share API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for creating a text share (POST /api/share/text)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTextRequest {
    /// The text to share
    #[serde(default)]
    pub text_content: String,
    /// Render as rich text
    #[serde(default)]
    pub rich_text: bool,
}

impl CreateTextRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.text_content.is_empty() {
            return Some("Text content cannot be empty".to_string());
        }
        None
    }
}

/// Parses the `richText` multipart field; anything but "true"/"1"/"on" is false.
pub fn parse_rich_text_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_text_request_deserialize() {
        let json = r#"{"textContent": "hello", "richText": true}"#;
        let req: CreateTextRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.text_content, "hello");
        assert!(req.rich_text);
    }

    #[test]
    fn test_rich_text_defaults_false() {
        let req: CreateTextRequest = serde_json::from_str(r#"{"textContent": "x"}"#).unwrap();
        assert!(!req.rich_text);
    }

    #[test]
    fn test_validate_empty_text() {
        let req: CreateTextRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_parse_rich_text_flag() {
        assert!(parse_rich_text_flag("true"));
        assert!(parse_rich_text_flag(" TRUE "));
        assert!(parse_rich_text_flag("1"));
        assert!(!parse_rich_text_flag("false"));
        assert!(!parse_rich_text_flag(""));
    }
}
