use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use campaign_core::{CampaignBrief, CampaignReport, EntryOutcome, SynthesisConfig, SynthesisEvent, Tone};
use campaign_ingest::{sample_template_csv, write_report_csv, RowSource};
use campaign_llm::{GeminiGenerator, MarketingRequest, TimeoutGenerator};
use campaign_pipeline::{PipelineConfig, SynthesisPipeline};
use colored::Colorize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub async fn run(
    file: PathBuf,
    objective: String,
    tone: Tone,
    export: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let config = SynthesisConfig::new();
    let source = RowSource::from_path(&file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let generator = GeminiGenerator::from_config(&config)?;
    let generator = TimeoutGenerator::new(
        generator,
        Duration::from_secs(config.request_timeout_secs.max(1)),
    );
    let pipeline = SynthesisPipeline::new(
        Arc::new(generator),
        PipelineConfig::from_synthesis_config(&config),
    );
    let brief = CampaignBrief::new(objective, tone);

    println!(
        "{}",
        format!(
            "🚀 Synthesising {} of {} records from {} ({} tone)",
            source.len().min(pipeline.config().batch_cap),
            source.len(),
            source.name(),
            tone
        )
        .cyan()
    );

    let cancel_token = CancellationToken::new();
    {
        let cancel_token = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupt received, stopping after the current record");
                cancel_token.cancel();
            }
        });
    }

    let (event_tx, mut event_rx) = mpsc::channel::<SynthesisEvent>(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let outcome = pipeline
        .run(source.rows(), &brief, event_tx, cancel_token)
        .await?;
    join_printer(printer).await;

    let report = match outcome.into_report() {
        Ok(report) => report,
        Err(failure) => bail!(failure.message),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(path) = export {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_report_csv(&report, file)?;
        println!("{}", format!("📦 Report written to {}", path.display()).green());
    }
    Ok(())
}

pub fn template(output: Option<PathBuf>) -> anyhow::Result<()> {
    let csv = sample_template_csv()?;
    match output {
        Some(path) => {
            std::fs::write(&path, csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", format!("✅ Template written to {}", path.display()).green());
        }
        None => print!("{}", csv),
    }
    Ok(())
}

pub fn inspect(file: PathBuf) -> anyhow::Result<()> {
    let source = RowSource::from_path(&file)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    println!("{}", format!("📄 {}: {} records", source.name(), source.len()).cyan());
    println!("{}", format!("   Columns: {}", source.columns().join(", ")).dimmed());
    for record in source.rows().iter().take(10) {
        println!(
            "   row {:>4}  {:<12} {}",
            record.row_number(),
            record.id(),
            record.display_name()
        );
    }
    if source.len() > 10 {
        println!("{}", format!("   ... {} more", source.len() - 10).dimmed());
    }
    Ok(())
}

pub async fn content(prompt: String, tone: Tone, channel: String) -> anyhow::Result<()> {
    let generator = GeminiGenerator::from_config(&SynthesisConfig::new())?;
    let content = generator
        .generate_marketing_content(&MarketingRequest {
            prompt,
            tone,
            channel,
        })
        .await?;

    if let Some(subject) = &content.subject {
        println!("{}", subject.bold());
    }
    println!("{}", content.content);
    if !content.hashtags.is_empty() {
        println!("{}", content.hashtags.join(" ").dimmed());
    }
    Ok(())
}

pub async fn lead(lead: String) -> anyhow::Result<()> {
    let generator = GeminiGenerator::from_config(&SynthesisConfig::new())?;
    println!("{}", generator.analyze_lead_strategy(&lead).await);
    Ok(())
}

/// Wait for the progress printer. Returns false if it panicked or was cancelled.
async fn join_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(error) => {
            log::warn!("Progress printer stopped early: {}", error);
            false
        }
    }
}

fn print_event(event: &SynthesisEvent) {
    match event {
        SynthesisEvent::RecordSucceeded {
            index,
            processed,
            total,
            compliance_score,
        } => println!(
            "{}",
            format!(
                "✅ [{}/{}] record {} drafted (compliance {})",
                processed, total, index, compliance_score
            )
            .green()
        ),
        SynthesisEvent::RecordSkipped {
            processed,
            total,
            index,
            reason,
            ..
        } => println!(
            "{}",
            format!("⚠️  [{}/{}] record {} skipped: {}", processed, total, index, reason).yellow()
        ),
        SynthesisEvent::RetryScheduled {
            index,
            attempt,
            delay_ms,
            ..
        } => println!(
            "{}",
            format!(
                "   record {} attempt {} failed, retrying in {}ms",
                index, attempt, delay_ms
            )
            .dimmed()
        ),
        SynthesisEvent::RunAborted { reason } => {
            println!("{}", format!("❌ {}", reason).red())
        }
        _ => log::debug!("{:?}", event),
    }
}

fn print_report(report: &CampaignReport) {
    let stats = report.stats();
    println!();
    println!("{}", "─".repeat(60).dimmed());
    for (index, entry) in report.entries().iter().enumerate() {
        match (entry.outcome(), entry.draft()) {
            (EntryOutcome::Succeeded, Some(draft)) => {
                println!(
                    "{} {} ({}) compliance {} / confidence {}",
                    format!("#{}", index).bold(),
                    entry.customer_name(),
                    entry.customer_id(),
                    draft.compliance_score,
                    draft.ai_confidence
                );
                println!("   {}", draft.subject.bold());
                println!("   {}", draft.content);
                println!("{}", format!("   Compliance: {}", draft.compliance_analysis).dimmed());
                println!("{}", format!("   Strategy: {}", draft.strategy_logic).dimmed());
            }
            _ => println!(
                "{}",
                format!(
                    "#{} {} ({}) skipped: {}",
                    index,
                    entry.customer_name(),
                    entry.customer_id(),
                    entry.failure().unwrap_or("unknown")
                )
                .yellow()
            ),
        }
    }
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "Total {}  Succeeded {}  Skipped {}  Passed {}  Review {}  Avg compliance {}",
        stats.total,
        stats.succeeded,
        stats.skipped,
        stats.passed,
        stats.needs_review,
        stats
            .mean_compliance
            .map(|score| format!("{}%", score))
            .unwrap_or_else(|| "n/a".to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_printer_reports_clean_exit() {
        let (tx, mut rx) = mpsc::channel::<SynthesisEvent>(4);
        let printer = tokio::spawn(async move { while rx.recv().await.is_some() {} });
        drop(tx);
        assert!(join_printer(printer).await);
    }

    #[tokio::test]
    async fn join_printer_survives_a_panicked_printer() {
        let printer = tokio::spawn(async { panic!("terminal closed") });
        assert!(!join_printer(printer).await);
    }

    #[tokio::test]
    async fn join_printer_survives_an_aborted_printer() {
        let printer = tokio::spawn(std::future::pending::<()>());
        printer.abort();
        assert!(!join_printer(printer).await);
    }
}
