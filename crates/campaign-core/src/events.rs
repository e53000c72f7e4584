use serde::{Deserialize, Serialize};

use crate::report::ReportStats;

/// Progress notifications emitted by a synthesis run. Advisory only: the
/// terminal run state is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SynthesisEvent {
    RunStarted {
        run_id: String,
        /// Rows in the source dataset.
        total: usize,
        /// Rows this run will process after the batch cap.
        batch_size: usize,
    },

    RecordStarted {
        index: usize,
        row_number: usize,
        customer_id: String,
    },

    /// A retryable failure; the same record will be attempted again.
    RetryScheduled {
        index: usize,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },

    RecordSucceeded {
        index: usize,
        processed: usize,
        total: usize,
        compliance_score: u8,
    },

    RecordSkipped {
        index: usize,
        processed: usize,
        total: usize,
        attempts: u32,
        reason: String,
    },

    RunCompleted {
        stats: ReportStats,
    },

    RunAborted {
        reason: String,
    },
}

impl SynthesisEvent {
    /// Fraction of the batch finished, for events that carry progress.
    pub fn progress(&self) -> Option<f32> {
        match self {
            SynthesisEvent::RecordSucceeded {
                processed, total, ..
            }
            | SynthesisEvent::RecordSkipped {
                processed, total, ..
            } if *total > 0 => Some(*processed as f32 / *total as f32),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SynthesisEvent::RecordStarted {
            index: 0,
            row_number: 1,
            customer_id: "C1".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "record_started");
        assert_eq!(value["customer_id"], "C1");

        let parsed: SynthesisEvent = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn progress_only_on_record_outcomes() {
        let done = SynthesisEvent::RecordSucceeded {
            index: 1,
            processed: 2,
            total: 4,
            compliance_score: 90,
        };
        assert_eq!(done.progress(), Some(0.5));

        let aborted = SynthesisEvent::RunAborted {
            reason: "missing key".to_string(),
        };
        assert_eq!(aborted.progress(), None);
    }
}
