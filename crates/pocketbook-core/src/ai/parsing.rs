//! JSON parsing helpers for classifier responses
//!
//! Models asked for strict JSON still wrap it in prose or markdown fences, so
//! extraction tries a direct parse, then the outermost braces, then the text
//! with fences stripped.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

use super::types::{CategorySuggestion, ClassifiedIntent, Intent, INTENT_TYPES};

/// Fallback reply for an unrecognised intent without a model message
pub const DEFAULT_UNKNOWN_MESSAGE: &str = "I didn't understand that.";

fn truncate(text: &str) -> String {
    if text.chars().count() > 100 {
        format!("{}...", text.chars().take(100).collect::<String>())
    } else {
        text.to_string()
    }
}

fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn extract_delimited(text: &str, open: char, close: char) -> Result<Value> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    match (text.find(open), text.rfind(close)) {
        (Some(s), Some(e)) if s < e => {
            if let Ok(value) = serde_json::from_str::<Value>(&text[s..=e]) {
                return Ok(value);
            }
            serde_json::from_str::<Value>(&strip_fences(text))
                .map_err(|_| Error::InvalidData("Failed to parse AI JSON response.".into()))
        }
        _ => Err(Error::InvalidData(format!(
            "No JSON found in AI response: {}",
            truncate(text)
        ))),
    }
}

/// Extract a JSON object from a model response
pub fn extract_json(text: &str) -> Result<Value> {
    extract_delimited(text, '{', '}')
}

/// Extract a JSON array from a model response
pub fn extract_json_array(text: &str) -> Result<Value> {
    extract_delimited(text, '[', ']')
}

/// Parse a classifier response into an intent
///
/// A `type` outside the closed set (or missing) becomes [`Intent::Unknown`]
/// carrying the model's `message`, or a generic fallback.
pub fn parse_intent(text: &str) -> Result<ClassifiedIntent> {
    let mut value = extract_json(text)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| Error::InvalidData(format!("Expected JSON object: {}", truncate(text))))?;

    let next_prompts = match object.remove("nextPrompts") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let type_name = object
        .get("type")
        .and_then(Value::as_str)
        .map(|t| t.trim().to_lowercase())
        .unwrap_or_default();

    if !INTENT_TYPES.contains(&type_name.as_str()) {
        debug!(intent_type = %type_name, "Unrecognised intent type, treating as unknown");
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_UNKNOWN_MESSAGE);
        return Ok(ClassifiedIntent {
            intent: Intent::unknown(message),
            next_prompts,
        });
    }

    object.insert("type".to_string(), Value::String(type_name.clone()));
    let intent = serde_json::from_value::<Intent>(value)
        .map_err(|e| Error::InvalidData(format!("Invalid {} intent from AI: {}", type_name, e)))?;

    Ok(ClassifiedIntent {
        intent,
        next_prompts,
    })
}

/// Parse category suggestions; entries without an id or category are dropped
pub fn parse_category_suggestions(text: &str) -> Result<Vec<CategorySuggestion>> {
    let value = extract_json_array(text)?;
    let items = match value {
        Value::Array(items) => items,
        // Some models wrap the list: {"suggestions": [...]}
        Value::Object(mut map) => match map.values_mut().find(|v| v.is_array()) {
            Some(v) => match v.take() {
                Value::Array(items) => items,
                _ => Vec::new(),
            },
            None => Vec::new(),
        },
        _ => Vec::new(),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<CategorySuggestion>(item).ok())
        .filter(|s| !s.id.is_empty() && !s.category.trim().is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{QueryEntity, QueryOperation, Target};
    use crate::models::{Recurrence, TransactionType};
    use chrono::NaiveDate;

    #[test]
    fn test_extract_json_direct() {
        let value = extract_json(r#"{"type": "greeting"}"#).unwrap();
        assert_eq!(value["type"], "greeting");
    }

    #[test]
    fn test_extract_json_with_prose() {
        let value = extract_json("Sure! Here you go: {\"type\": \"subscription\"} Hope that helps").unwrap();
        assert_eq!(value["type"], "subscription");
    }

    #[test]
    fn test_extract_json_fenced() {
        let value = extract_json("```json\n{\"type\": \"health_score\"}\n```").unwrap();
        assert_eq!(value["type"], "health_score");
    }

    #[test]
    fn test_extract_json_none() {
        let err = extract_json("I cannot help with that").unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_extract_json_broken() {
        assert!(extract_json("{\"type\": \"query\", \"filters\": {").is_err());
    }

    #[test]
    fn test_parse_unknown_keeps_message() {
        let parsed = parse_intent(r#"{"type": "unknown", "message": "I only do money."}"#).unwrap();
        assert_eq!(parsed.intent, Intent::unknown("I only do money."));
        assert!(parsed.next_prompts.is_empty());
    }

    #[test]
    fn test_parse_unrecognised_type_becomes_unknown() {
        let parsed = parse_intent(r#"{"type": "weather", "message": "Sunny"}"#).unwrap();
        assert_eq!(parsed.intent, Intent::unknown("Sunny"));

        let parsed = parse_intent(r#"{"amount": 5}"#).unwrap();
        assert_eq!(parsed.intent, Intent::unknown(DEFAULT_UNKNOWN_MESSAGE));
    }

    #[test]
    fn test_parse_transaction_lenient_amount() {
        let parsed = parse_intent(
            r#"{"type": "transaction", "transactionType": "income", "amount": "5,000",
                "category": "Salary", "description": "March salary", "date": "2024-03-01",
                "tags": ["work"], "nextPrompts": ["Show income", "Set a budget"]}"#,
        )
        .unwrap();
        match parsed.intent {
            Intent::Transaction(draft) => {
                assert_eq!(draft.transaction_type, TransactionType::Income);
                assert_eq!(draft.amount, 5000.0);
                assert_eq!(draft.date, NaiveDate::from_ymd_opt(2024, 3, 1));
                assert_eq!(draft.tags, vec!["work"]);
            }
            other => panic!("expected transaction, got {:?}", other),
        }
        assert_eq!(parsed.next_prompts, vec!["Show income", "Set a budget"]);
    }

    #[test]
    fn test_parse_query_defaults() {
        let parsed = parse_intent(
            r#"{"type": "query", "entity": "transaction", "filters": null, "operation": "compare"}"#,
        )
        .unwrap();
        match parsed.intent {
            Intent::Query(q) => {
                assert_eq!(q.entity, QueryEntity::Transaction);
                assert_eq!(q.operation, QueryOperation::List);
                assert_eq!(q.limit_or(10), 10);
                assert!(q.filters.category.is_none());
            }
            other => panic!("expected query, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unit_variants_ignore_extra_fields() {
        let parsed = parse_intent(r#"{"type": "cleanup_categories", "nextPrompts": ["Go"], "note": 1}"#).unwrap();
        assert_eq!(parsed.intent, Intent::CleanupCategories);
        assert_eq!(parsed.next_prompts, vec!["Go"]);
    }

    #[test]
    fn test_parse_edit_last() {
        let parsed = parse_intent(
            r#"{"type": "edit", "target": "last", "searchCriteria": {}, "changes": {"amount": 300}}"#,
        )
        .unwrap();
        match parsed.intent {
            Intent::Edit(edit) => {
                assert_eq!(edit.target, Target::Last);
                assert_eq!(edit.changes.amount, Some(300.0));
            }
            other => panic!("expected edit, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_reminder_recurrence() {
        let parsed = parse_intent(
            r#"{"type": "reminder", "title": "Rent", "amount": 15000, "transactionType": "expense",
                "date": "2024-04-01", "recurrence": "Monthly", "tags": []}"#,
        )
        .unwrap();
        match parsed.intent {
            Intent::Reminder(draft) => assert_eq!(draft.recurrence, Recurrence::Monthly),
            other => panic!("expected reminder, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_category_suggestions() {
        let suggestions = parse_category_suggestions(
            r#"Here: [{"id": "t1", "category": "Food"}, {"id": "t2"}, {"id": "t3", "category": "Transport"}]"#,
        )
        .unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[1].category, "Transport");

        let wrapped =
            parse_category_suggestions(r#"{"suggestions": [{"id": "t1", "category": "Food"}]}"#).unwrap();
        assert_eq!(wrapped.len(), 1);
    }
}
