//! Campaign data model: customer records, briefs, drafts and result entries.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ID_COLUMNS: &[&str] = &["customerid", "id"];
const NAME_COLUMNS: &[&str] = &["name", "customername", "fullname"];

/// A single scalar cell value from an ingested row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// Infer a typed value from raw cell text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return FieldValue::Integer(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_finite() {
                return FieldValue::Float(value);
            }
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => FieldValue::Bool(true),
            "false" => FieldValue::Bool(false),
            _ => FieldValue::Text(trimmed.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value}"),
            FieldValue::Bool(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// One customer row. Immutable once built; identity fields are resolved at
/// construction so every reader sees the same id and display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    row_number: usize,
    id: String,
    display_name: String,
    fields: BTreeMap<String, FieldValue>,
}

impl CustomerRecord {
    /// Build a record for the 1-based data row `row_number`.
    pub fn new(row_number: usize, fields: BTreeMap<String, FieldValue>) -> Self {
        let id = lookup(&fields, ID_COLUMNS).unwrap_or_else(|| format!("ROW_{row_number}"));
        let display_name =
            lookup(&fields, NAME_COLUMNS).unwrap_or_else(|| format!("Customer {row_number}"));
        Self {
            row_number,
            id,
            display_name,
            fields,
        }
    }

    pub fn from_pairs<K, V, I>(row_number: usize, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let fields = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::new(row_number, fields)
    }

    pub fn row_number(&self) -> usize {
        self.row_number
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column)
    }

    /// The raw fields as a JSON object, the form the generator receives.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.fields).unwrap_or(serde_json::Value::Null)
    }
}

fn normalize_column(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | ' ' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn lookup(fields: &BTreeMap<String, FieldValue>, candidates: &[&str]) -> Option<String> {
    for candidate in candidates {
        let found = fields
            .iter()
            .find(|(key, value)| normalize_column(key) == *candidate && !value.is_blank());
        if let Some((_, value)) = found {
            return Some(value.to_string());
        }
    }
    None
}

#[derive(Debug, Error)]
#[error("Unknown tone '{0}', expected one of Professional, Friendly, Urgent, Bold")]
pub struct ToneParseError(pub String);

/// Voice the generated message should take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Urgent,
    Bold,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Professional, Tone::Friendly, Tone::Urgent, Tone::Bold];

    pub fn label(&self) -> &'static str {
        match self {
            Tone::Professional => "Professional",
            Tone::Friendly => "Friendly",
            Tone::Urgent => "Urgent",
            Tone::Bold => "Bold",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tone {
    type Err = ToneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|tone| tone.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ToneParseError(s.to_string()))
    }
}

/// Campaign objective plus the tone to write it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignBrief {
    pub objective: String,
    pub tone: Tone,
}

impl CampaignBrief {
    pub fn new(objective: impl Into<String>, tone: Tone) -> Self {
        Self {
            objective: objective.into(),
            tone,
        }
    }

    /// A brief with a blank objective cannot start a run.
    pub fn is_ready(&self) -> bool {
        !self.objective.trim().is_empty()
    }
}

/// Structured output of one successful synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    pub subject: String,
    pub content: String,
    pub compliance_score: u8,
    pub ai_confidence: u8,
    pub compliance_analysis: String,
    pub strategy_logic: String,
}

/// Terminal (or in-flight) status of one row within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOutcome {
    Pending,
    Succeeded,
    SkippedAfterRetries,
}

/// Per-row result: input identity, the draft once produced, and the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    customer_id: String,
    customer_name: String,
    row_number: usize,
    tone: Tone,
    outcome: EntryOutcome,
    draft: Option<MessageDraft>,
    attempts: u32,
    failure: Option<String>,
}

impl ResultEntry {
    pub fn pending(record: &CustomerRecord, tone: Tone) -> Self {
        Self {
            customer_id: record.id().to_string(),
            customer_name: record.display_name().to_string(),
            row_number: record.row_number(),
            tone,
            outcome: EntryOutcome::Pending,
            draft: None,
            attempts: 0,
            failure: None,
        }
    }

    pub fn succeeded(mut self, draft: MessageDraft, attempts: u32) -> Self {
        self.outcome = EntryOutcome::Succeeded;
        self.draft = Some(draft);
        self.attempts = attempts;
        self.failure = None;
        self
    }

    pub fn skipped(mut self, attempts: u32, reason: impl Into<String>) -> Self {
        self.outcome = EntryOutcome::SkippedAfterRetries;
        self.draft = None;
        self.attempts = attempts;
        self.failure = Some(reason.into());
        self
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn row_number(&self) -> usize {
        self.row_number
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn outcome(&self) -> EntryOutcome {
        self.outcome
    }

    pub fn draft(&self) -> Option<&MessageDraft> {
        self.draft.as_ref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.outcome == EntryOutcome::Pending
    }

    /// Replace only the body content. Returns false when there is no draft.
    pub(crate) fn replace_content(&mut self, content: String) -> bool {
        match self.draft.as_mut() {
            Some(draft) => {
                draft.content = content;
                true
            }
            None => false,
        }
    }
}
