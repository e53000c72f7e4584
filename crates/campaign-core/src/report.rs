//! Campaign report built from a completed run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CampaignBrief, EntryOutcome, ResultEntry};

/// Compliance score at or above which a draft needs no manual review.
pub const PASS_THRESHOLD: u8 = 90;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReportError {
    #[error("No entry at position {0}")]
    EntryNotFound(usize),

    #[error("Entry at position {0} has no generated draft")]
    NoDraft(usize),
}

/// Aggregate counts over the entries of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    /// Rounded mean compliance over succeeded entries.
    pub mean_compliance: Option<u8>,
    pub mean_confidence: Option<u8>,
    pub passed: usize,
    pub needs_review: usize,
}

impl ReportStats {
    pub fn from_entries(entries: &[ResultEntry]) -> Self {
        let drafts: Vec<_> = entries.iter().filter_map(ResultEntry::draft).collect();
        let skipped = entries
            .iter()
            .filter(|entry| entry.outcome() == EntryOutcome::SkippedAfterRetries)
            .count();
        let passed = drafts
            .iter()
            .filter(|draft| draft.compliance_score >= PASS_THRESHOLD)
            .count();

        Self {
            total: entries.len(),
            succeeded: drafts.len(),
            skipped,
            mean_compliance: rounded_mean(drafts.iter().map(|d| d.compliance_score)),
            mean_confidence: rounded_mean(drafts.iter().map(|d| d.ai_confidence)),
            passed,
            needs_review: drafts.len() - passed,
        }
    }
}

fn rounded_mean(scores: impl Iterator<Item = u8>) -> Option<u8> {
    let (sum, count) = scores.fold((0u32, 0u32), |(sum, count), score| {
        (sum + u32::from(score), count + 1)
    });
    if count == 0 {
        return None;
    }
    let mean = (f64::from(sum) / f64::from(count)).round();
    Some(mean.clamp(0.0, 100.0) as u8)
}

/// Reviewable, editable result of a completed run. Owns its entries; edits
/// never reorder them or touch anything but body content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignReport {
    run_id: String,
    brief: CampaignBrief,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    entries: Vec<ResultEntry>,
}

impl CampaignReport {
    pub fn new(
        run_id: impl Into<String>,
        brief: CampaignBrief,
        started_at: DateTime<Utc>,
        entries: Vec<ResultEntry>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            brief,
            started_at,
            finished_at: Utc::now(),
            entries,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn brief(&self) -> &CampaignBrief {
        &self.brief
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&ResultEntry> {
        self.entries.get(index)
    }

    pub fn stats(&self) -> ReportStats {
        ReportStats::from_entries(&self.entries)
    }

    /// Replace the body content of the draft at `index`.
    pub fn edit_content(
        &mut self,
        index: usize,
        content: impl Into<String>,
    ) -> Result<(), ReportError> {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(ReportError::EntryNotFound(index))?;
        if entry.replace_content(content.into()) {
            log::debug!("[{}] Edited content of entry {}", self.run_id, index);
            Ok(())
        } else {
            Err(ReportError::NoDraft(index))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomerRecord, MessageDraft, Tone};

    fn draft(score: u8, confidence: u8) -> MessageDraft {
        MessageDraft {
            subject: format!("Offer {score}"),
            content: "Original body".to_string(),
            compliance_score: score,
            ai_confidence: confidence,
            compliance_analysis: "Clear APR disclosure".to_string(),
            strategy_logic: "High balance, low engagement".to_string(),
        }
    }

    fn succeeded(id: &str, row: usize, score: u8) -> ResultEntry {
        let record = CustomerRecord::from_pairs(row, [("id", id)]);
        ResultEntry::pending(&record, Tone::Professional).succeeded(draft(score, 70), 1)
    }

    fn skipped(id: &str, row: usize) -> ResultEntry {
        let record = CustomerRecord::from_pairs(row, [("id", id)]);
        ResultEntry::pending(&record, Tone::Professional).skipped(3, "rate limited")
    }

    fn report(entries: Vec<ResultEntry>) -> CampaignReport {
        CampaignReport::new(
            "run-1",
            CampaignBrief::new("Cross-sell credit cards", Tone::Professional),
            Utc::now(),
            entries,
        )
    }

    #[test]
    fn stats_match_reference_scenario() {
        let report = report(vec![
            succeeded("C1", 1, 95),
            succeeded("C2", 2, 70),
            succeeded("C3", 3, 88),
        ]);
        let stats = report.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.succeeded, 3);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.mean_compliance, Some(84));
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.needs_review, 2);
    }

    #[test]
    fn stats_ignore_skipped_entries_in_means() {
        let report = report(vec![succeeded("C1", 1, 91), skipped("C2", 2)]);
        let stats = report.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.mean_compliance, Some(91));
        assert_eq!(stats.mean_confidence, Some(70));
    }

    #[test]
    fn stats_without_successes_have_no_mean() {
        let stats = ReportStats::from_entries(&[skipped("C1", 1)]);
        assert_eq!(stats.mean_compliance, None);
        assert_eq!(stats.passed, 0);
    }

    #[test]
    fn mean_rounds_half_up() {
        assert_eq!(rounded_mean([84, 85].into_iter()), Some(85));
        assert_eq!(rounded_mean([84, 84, 85].into_iter()), Some(84));
    }

    #[test]
    fn edit_changes_only_target_content() {
        let mut report = report(vec![
            succeeded("C1", 1, 95),
            succeeded("C2", 2, 70),
            succeeded("C3", 3, 88),
        ]);
        let before = report.entries().to_vec();

        report.edit_content(1, "Rewritten body").unwrap();

        let edited = report.entry(1).and_then(ResultEntry::draft).unwrap();
        let original = before[1].draft().unwrap();
        assert_eq!(edited.content, "Rewritten body");
        assert_eq!(edited.subject, original.subject);
        assert_eq!(edited.compliance_score, original.compliance_score);
        assert_eq!(edited.compliance_analysis, original.compliance_analysis);
        assert_eq!(edited.strategy_logic, original.strategy_logic);
        assert_eq!(report.entry(1).unwrap().customer_id(), "C2");
        assert_eq!(report.entries()[0], before[0]);
        assert_eq!(report.entries()[2], before[2]);
    }

    #[test]
    fn edit_rejects_missing_and_skipped_entries() {
        let mut report = report(vec![succeeded("C1", 1, 95), skipped("C2", 2)]);
        assert_eq!(
            report.edit_content(5, "x"),
            Err(ReportError::EntryNotFound(5))
        );
        assert_eq!(report.edit_content(1, "x"), Err(ReportError::NoDraft(1)));
    }
}
