use std::path::PathBuf;

use campaign_core::Tone;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "campaign-synth")]
#[command(about = "Generate compliant, personalised campaign messages from a customer file")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesise one message per customer for the first rows of a file
    Run {
        /// CSV or workbook with a header row
        #[arg(long, short)]
        file: PathBuf,

        /// Campaign objective
        #[arg(long, short)]
        objective: String,

        /// Professional, Friendly, Urgent or Bold
        #[arg(long, short, default_value = "professional")]
        tone: Tone,

        /// Write the finished report as CSV
        #[arg(long)]
        export: Option<PathBuf>,

        /// Print the report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Write the sample customer template
    Template {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show what a customer file parses to without calling the service
    Inspect {
        #[arg(long, short)]
        file: PathBuf,
    },
    /// Generate one block of marketing copy
    Content {
        prompt: String,

        #[arg(long, short, default_value = "professional")]
        tone: Tone,

        #[arg(long, short, default_value = "Email")]
        channel: String,
    },
    /// Suggest a follow-up strategy for a lead
    Lead {
        /// Free-text lead description
        lead: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.debug);

    let result = match cli.command {
        Commands::Run {
            file,
            objective,
            tone,
            export,
            json,
        } => commands::run(file, objective, tone, export, json).await,
        Commands::Template { output } => commands::template(output),
        Commands::Inspect { file } => commands::inspect(file),
        Commands::Content {
            prompt,
            tone,
            channel,
        } => commands::content(prompt, tone, channel).await,
        Commands::Lead { lead } => commands::lead(lead).await,
    };

    if let Err(error) = result {
        eprintln!("{}", format!("❌ {:#}", error).red());
        std::process::exit(1);
    }
}
