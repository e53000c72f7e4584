//! Prompt text and response schemas sent to the generation service.

use campaign_core::{CustomerRecord, Tone};
use serde_json::{json, Value};

pub const DRAFT_FIELDS: [&str; 6] = [
    "subject",
    "content",
    "complianceScore",
    "aiConfidence",
    "complianceAnalysis",
    "strategyLogic",
];

pub const LEAD_ADVISOR_INSTRUCTION: &str =
    "You are a senior banking advisor. Be concise, ethical and professional.";

pub fn synthesis_prompt(record: &CustomerRecord, objective: &str, tone: Tone) -> String {
    format!(
        "You are a senior strategist and compliance officer for a bank's marketing team.\n\
         CUSTOMER DATA: {customer}\n\
         CAMPAIGN GOAL: {objective}\n\
         TARGET TONE: {tone}\n\
         \n\
         Write one personalised marketing message for this customer and return:\n\
         1. subject and content of the message.\n\
         2. complianceAnalysis: how the message meets financial-services marketing standards.\n\
         3. strategyLogic: why this message fits this customer.\n\
         4. complianceScore: an integer from 0 to 100.\n\
         5. aiConfidence: an integer from 0 to 100.",
        customer = record.to_json(),
        objective = objective.trim(),
        tone = tone.label(),
    )
}

/// Structured-output schema requiring every draft field.
pub fn draft_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "subject": { "type": "STRING" },
            "content": { "type": "STRING" },
            "complianceScore": { "type": "INTEGER" },
            "aiConfidence": { "type": "INTEGER" },
            "complianceAnalysis": { "type": "STRING" },
            "strategyLogic": { "type": "STRING" }
        },
        "required": DRAFT_FIELDS
    })
}

pub fn marketing_prompt(prompt: &str, tone: Tone, channel: &str) -> String {
    format!(
        "Generate professional financial-services marketing content: {}. Tone: {}. Channel: {}.",
        prompt.trim(),
        tone.label(),
        channel.trim()
    )
}

pub fn marketing_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "subject": { "type": "STRING" },
            "content": { "type": "STRING" },
            "hashtags": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["content"]
    })
}

pub fn lead_strategy_prompt(lead: &str) -> String {
    format!(
        "Analyze this lead for a banking sales strategy and suggest follow-up steps: {}",
        lead.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_prompt_embeds_record_goal_and_tone() {
        let record = CustomerRecord::from_pairs(1, [("id", "C9"), ("segment", "Gold")]);
        let prompt = synthesis_prompt(&record, "  Upsell travel cards ", Tone::Urgent);
        assert!(prompt.contains(r#"{"id":"C9","segment":"Gold"}"#));
        assert!(prompt.contains("CAMPAIGN GOAL: Upsell travel cards\n"));
        assert!(prompt.contains("TARGET TONE: Urgent"));
    }

    #[test]
    fn draft_schema_requires_all_fields() {
        let schema = draft_response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, DRAFT_FIELDS);
        assert_eq!(schema["properties"]["complianceScore"]["type"], "INTEGER");
    }
}
