//! CSV output: the downloadable upload template and report exports.

use std::io::Write;

use campaign_core::{CampaignReport, EntryOutcome};

use crate::error::Result;

pub const SAMPLE_TEMPLATE_HEADER: [&str; 7] = [
    "customerId",
    "name",
    "email",
    "age",
    "segment",
    "productInterest",
    "accountBalance",
];

const SAMPLE_TEMPLATE_ROW: [&str; 7] = [
    "CUST001",
    "Priya Sharma",
    "priya.sharma@example.com",
    "34",
    "Salaried Professional",
    "Credit Card",
    "125000",
];

const REPORT_HEADER: [&str; 13] = [
    "rowNumber",
    "customerId",
    "customerName",
    "status",
    "attempts",
    "tone",
    "subject",
    "content",
    "complianceScore",
    "aiConfidence",
    "complianceAnalysis",
    "strategyLogic",
    "failureReason",
];

/// The upload template: fixed header plus one example row, UTF-8.
pub fn sample_template_csv() -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SAMPLE_TEMPLATE_HEADER)?;
    writer.write_record(SAMPLE_TEMPLATE_ROW)?;
    let bytes = writer
        .into_inner()
        .map_err(|error| csv::Error::from(error.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write one CSV row per report entry, in report order.
pub fn write_report_csv<W: Write>(report: &CampaignReport, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(REPORT_HEADER)?;

    for entry in report.entries() {
        let status = match entry.outcome() {
            EntryOutcome::Succeeded => "succeeded",
            EntryOutcome::SkippedAfterRetries => "skipped",
            EntryOutcome::Pending => "pending",
        };
        let row_number = entry.row_number().to_string();
        let attempts = entry.attempts().to_string();
        let (subject, content, compliance, confidence, analysis, strategy) = match entry.draft() {
            Some(draft) => (
                draft.subject.as_str(),
                draft.content.as_str(),
                draft.compliance_score.to_string(),
                draft.ai_confidence.to_string(),
                draft.compliance_analysis.as_str(),
                draft.strategy_logic.as_str(),
            ),
            None => ("", "", String::new(), String::new(), "", ""),
        };
        csv_writer.write_record([
            row_number.as_str(),
            entry.customer_id(),
            entry.customer_name(),
            status,
            attempts.as_str(),
            entry.tone().label(),
            subject,
            content,
            compliance.as_str(),
            confidence.as_str(),
            analysis,
            strategy,
            entry.failure().unwrap_or(""),
        ])?;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    log::debug!(
        "[{}] Exported {} entries",
        report.run_id(),
        report.entries().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use campaign_core::{CampaignBrief, CustomerRecord, MessageDraft, ResultEntry, Tone};

    use super::*;
    use crate::source::RowSource;

    #[test]
    fn template_has_header_and_one_row() {
        let csv = sample_template_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "customerId,name,email,age,segment,productInterest,accountBalance"
        );
    }

    #[test]
    fn template_round_trips_through_ingestion() {
        let csv = sample_template_csv().unwrap();
        let source = RowSource::from_csv_reader("template.csv", csv.as_bytes()).unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(source.rows()[0].id(), "CUST001");
        assert_eq!(source.rows()[0].display_name(), "Priya Sharma");
    }

    #[test]
    fn report_export_writes_every_entry() {
        let first = CustomerRecord::from_pairs(1, [("id", "C1"), ("name", "Asha")]);
        let second = CustomerRecord::from_pairs(2, [("id", "C2")]);
        let entries = vec![
            ResultEntry::pending(&first, Tone::Friendly).succeeded(
                MessageDraft {
                    subject: "Hello".to_string(),
                    content: "Body, with comma".to_string(),
                    compliance_score: 92,
                    ai_confidence: 81,
                    compliance_analysis: "ok".to_string(),
                    strategy_logic: "why".to_string(),
                },
                1,
            ),
            ResultEntry::pending(&second, Tone::Friendly).skipped(3, "rate limited"),
        ];
        let report = CampaignReport::new(
            "run-x",
            CampaignBrief::new("Promote savings", Tone::Friendly),
            chrono::Utc::now(),
            entries,
        );

        let mut out = Vec::new();
        write_report_csv(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,C1,Asha,succeeded,1,Friendly,Hello,\"Body, with comma\",92,81"));
        assert!(lines[2].starts_with("2,C2,Customer 2,skipped,3,Friendly"));
        assert!(lines[2].ends_with("rate limited"));
    }
}
