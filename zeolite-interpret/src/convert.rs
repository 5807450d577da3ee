use chrono::NaiveDate;
use serde_json::{Value, json};
use zeolite_core::{DATE_KEY_FORMAT, MAX_RANGE_DAYS, MAX_RESULT_COUNT, Query};

use crate::error::InterpretationError;

fn system_prompt(today: NaiveDate) -> String {
    format!(
        "You turn calendar availability requests into JSON. Today is {today} ({weekday}).\n\
         Reply with one JSON object and nothing else:\n\
         {{\"intent\": \"find_days\" | \"find_slots\" | \"suggest_times\",\n \
         \"dateRange\": {{\"start\": \"YYYY-MM-DD\", \"end\": \"YYYY-MM-DD\"}},\n \
         \"timePreference\": \"morning\" | \"afternoon\" | \"evening\" | \"any\",\n \
         \"slotDuration\": \"one_hour\" | \"half_day\" | \"full_day\",\n \
         \"resultCount\": integer}}\n\
         intent and dateRange are required; omit the other fields when the request does not mention them.\n\
         The range may cover at most {MAX_RANGE_DAYS} days and resultCount must be between 1 and {MAX_RESULT_COUNT}.\n\
         Use find_days for whole free days, find_slots for free hours or blocks, suggest_times when asked for the best options.\n\
         When no dates are mentioned, use the next 14 days starting today.",
        today = today.format(DATE_KEY_FORMAT),
        weekday = today.format("%A"),
    )
}

/// Builds the chat-completions request body for one interpretation.
pub fn build_request_body(model: &str, text: &str, today: NaiveDate) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system_prompt(today) },
            { "role": "user", "content": text }
        ],
        "temperature": 0,
        "response_format": { "type": "json_object" }
    })
}

/// Strips a Markdown code fence some models wrap around JSON.
fn unfence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Extracts and validates the query from a chat-completions response.
pub fn parse_response(response: &Value) -> Result<Query, InterpretationError> {
    let choice = response
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| InterpretationError::MalformedResponse("no choices in response".to_string()))?;

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| InterpretationError::MalformedResponse("no message content in choice".to_string()))?;

    let value: Value = serde_json::from_str(unfence(content))?;
    Ok(Query::from_json(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeolite_core::{Intent, TimePreference};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 14).unwrap()
    }

    fn response(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[test]
    fn request_body_shape() {
        let body = build_request_body("openai/gpt-4o-mini", "free mornings", today());
        assert_eq!(body["model"], "openai/gpt-4o-mini");
        assert_eq!(body["messages"][1]["content"], "free mornings");
        assert!(body["messages"][0]["content"].as_str().unwrap().contains("2026-01-14 (Wednesday)"));
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn parses_plain_and_fenced_json() {
        let content = r#"{"intent":"find_days","dateRange":{"start":"2026-01-19","end":"2026-01-25"},"timePreference":"morning"}"#;
        let query = parse_response(&response(content)).unwrap();
        assert_eq!(query.intent, Intent::FindDays);
        assert_eq!(query.time_preference, Some(TimePreference::Morning));

        let fenced = format!("```json\n{content}\n```");
        assert_eq!(parse_response(&response(&fenced)).unwrap(), query);
    }

    #[test]
    fn rejects_invalid_queries() {
        let content = r#"{"intent":"find_days","dateRange":{"start":"2026-01-01","end":"2026-12-31"}}"#;
        assert!(matches!(
            parse_response(&response(content)),
            Err(InterpretationError::Validation(err)) if err.field == "dateRange"
        ));
        assert!(matches!(
            parse_response(&response("sure! here you go")),
            Err(InterpretationError::Json(_))
        ));
        assert!(matches!(
            parse_response(&json!({ "choices": [] })),
            Err(InterpretationError::MalformedResponse(_))
        ));
    }
}
