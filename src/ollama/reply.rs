// Helpers for interpreting model output

use serde_json::Value;

/// Pull a JSON object out of free-form model output.
///
/// Tries the whole text first, then the span from the first `{` to the last `}`
/// (models like to wrap JSON in prose or code fences).
pub fn extract_json_object(text: &str) -> Option<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Case-insensitive check that `model` appears in a model listing
pub fn model_available(listing: &[String], model: &str) -> bool {
    let wanted = model.to_lowercase();
    listing.iter().any(|name| name.to_lowercase().contains(&wanted))
}

/// First `max_chars` characters of `text`, never splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        let value = extract_json_object(r#"{"importance_score": 0.7}"#).unwrap();
        assert_eq!(value["importance_score"], 0.7);
    }

    #[test]
    fn test_wrapped_json() {
        let text = "Here is my analysis:\n```json\n{\"key_insight\": \"uses cache\"}\n```\nHope it helps!";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["key_insight"], "uses cache");
    }

    #[test]
    fn test_no_json() {
        assert!(extract_json_object("no braces here").is_none());
        assert!(extract_json_object("} backwards {").is_none());
        assert!(extract_json_object("{not: valid json}").is_none());
    }

    #[test]
    fn test_array_is_not_object() {
        assert!(extract_json_object("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_model_available() {
        let listing = vec!["Mistral:7b".to_string(), "llama2:13b".to_string()];
        assert!(model_available(&listing, "mistral:7b"));
        assert!(!model_available(&listing, "mixtral:8x7b"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
