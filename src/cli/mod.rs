//! Command-line interface for reelforge.
//!
//! Provides commands for running a batch, inspecting the resolved
//! configuration, and reading back the ledger.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;
use crate::core::{JsonlLedger, Orchestrator};
use crate::domain::{BatchReport, LedgerEntry, RecordKind};

/// reelforge - Batch pipeline from ideas to published short videos
#[derive(Parser, Debug)]
#[command(name = "reelforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate ideas and run them through the pipeline
    Run {
        /// Number of ideas to generate (defaults to the configured count)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Maximum render attempts per video
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Base wait between render attempts, in seconds
        #[arg(long)]
        base_wait_secs: Option<u64>,

        /// Timeout for a single remote call, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Content niche for idea generation
        #[arg(long)]
        niche: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,

    /// Show recent ledger records
    Ledger {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Only show records of this kind
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
    },
}

/// Ledger record kind for CLI filtering
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Idea,
    Video,
    Error,
}

impl From<KindArg> for RecordKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Idea => RecordKind::Idea,
            KindArg::Video => RecordKind::Video,
            KindArg::Error => RecordKind::Error,
        }
    }
}

/// Flag values that take priority over config and environment
#[derive(Debug, Default)]
struct RunOverrides {
    max_attempts: Option<u32>,
    base_wait_secs: Option<u64>,
    timeout_secs: Option<u64>,
    niche: Option<String>,
}

impl RunOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(base_wait_secs) = self.base_wait_secs {
            config.retry.base_wait_secs = base_wait_secs;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.retry.timeout_secs = timeout_secs;
        }
        if let Some(niche) = self.niche {
            config.content.niche = niche;
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run {
                count,
                max_attempts,
                base_wait_secs,
                timeout_secs,
                niche,
            } => {
                let overrides = RunOverrides {
                    max_attempts,
                    base_wait_secs,
                    timeout_secs,
                    niche,
                };
                run_batch(count, overrides).await
            }
            Commands::Config => show_config(),
            Commands::Ledger { limit, kind } => show_ledger(limit, kind).await,
        }
    }
}

/// Run one batch end to end
async fn run_batch(count: Option<usize>, overrides: RunOverrides) -> Result<()> {
    let mut config = Config::load()?;
    overrides.apply(&mut config);
    let count = count.unwrap_or(config.content.num_ideas);

    let orchestrator = Orchestrator::from_config(&config).await?;

    eprintln!("🚀 Starting video pipeline");
    eprintln!("   Run:   {}", orchestrator.run_id());
    eprintln!("   Niche: {}", config.content.niche);
    eprintln!("   Ideas: {}", count);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing current item");
            ctrl_c.cancel();
        }
    });

    let report = orchestrator
        .run(count, &cancel)
        .await
        .context("Idea generation failed, nothing was processed")?;

    print_summary(&report, &config);
    Ok(())
}

fn print_summary(report: &BatchReport, config: &Config) {
    let stats = &report.stats;

    eprintln!();
    eprintln!("{}", "=".repeat(50));
    eprintln!("📊 PIPELINE SUMMARY");
    eprintln!("{}", "=".repeat(50));
    eprintln!("✅ Successful: {}/{}", stats.successful, stats.total);
    eprintln!("❌ Failed:     {}/{}", stats.failed, stats.total);
    eprintln!(
        "⏱️  Duration:   {:.1} minutes",
        stats.elapsed().as_secs_f64() / 60.0
    );
    if report.cancelled {
        eprintln!("🛑 Run was cancelled before all ideas were processed");
    }
    eprintln!("{}", "=".repeat(50));

    for item in report.published() {
        if let Some(video) = &item.published {
            println!("{}", video.url);
        }
    }

    if stats.successful > 0 {
        eprintln!("\n🎉 Pipeline completed. Videos are live.");
    } else {
        eprintln!(
            "\n⚠️  No videos published. Check errors with: reelforge ledger --kind error ({})",
            config.ledger_path.display()
        );
    }
}

fn show_config() -> Result<()> {
    let cfg = Config::load()?;

    println!("reelforge configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:      {}", cfg.home.display());
    println!("  Ledger:    {}", cfg.ledger_path.display());
    println!("  Artifacts: {}", cfg.artifacts_dir.display());
    println!();
    println!("Content:");
    println!("  Niche:     {}", cfg.content.niche);
    println!("  Ideas:     {}", cfg.content.num_ideas);
    println!();
    println!("Models:");
    println!("  Text:      {}", cfg.text_model.model);
    println!("  Video:     {}", cfg.video.model);
    println!(
        "  Render:    {}s @ {}fps, {}x{} ({} frames)",
        cfg.video.duration_secs,
        cfg.video.fps,
        cfg.video.height,
        cfg.video.width,
        cfg.video.num_frames()
    );
    println!();
    println!("Retry:");
    println!("  Max attempts: {}", cfg.retry.max_attempts);
    println!("  Base wait:    {}s", cfg.retry.base_wait_secs);
    println!("  Timeout:      {}s", cfg.retry.timeout_secs);
    println!();
    println!("Credentials:");
    println!("  ANTHROPIC_API_KEY:    {}", presence(cfg.text_model.api_key.is_some()));
    println!("  HF_TOKEN:             {}", presence(cfg.video.api_token.is_some()));
    println!("  YOUTUBE_ACCESS_TOKEN: {}", presence(cfg.publish.access_token.is_some()));

    Ok(())
}

fn presence(set: bool) -> &'static str {
    if set {
        "set"
    } else {
        "missing"
    }
}

async fn show_ledger(limit: usize, kind: Option<KindArg>) -> Result<()> {
    let cfg = Config::load()?;
    let records = JsonlLedger::recent(&cfg.ledger_path, kind.map(RecordKind::from), limit).await?;

    if records.is_empty() {
        println!("No ledger records found");
        return Ok(());
    }

    println!("{:<20} {:<6} {:<40} {}", "TIMESTAMP", "KIND", "TITLE", "DETAIL");
    println!("{}", "-".repeat(100));

    for record in &records {
        let detail = match &record.entry {
            LedgerEntry::Idea { virality_score, .. } => format!("score {}/10", virality_score),
            LedgerEntry::Video { url, .. } => url.clone(),
            LedgerEntry::Error { stage, error, .. } => format!("[{}] {}", stage, error),
        };
        println!(
            "{:<20} {:<6} {:<40} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.kind(),
            truncate(record.title(), 38),
            detail
        );
    }

    println!("\nTotal: {} records", records.len());
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars - 3).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::parse_from([
            "reelforge",
            "run",
            "-n",
            "5",
            "--max-attempts",
            "4",
            "--niche",
            "stoicism",
        ]);
        match cli.command {
            Commands::Run {
                count,
                max_attempts,
                niche,
                base_wait_secs,
                ..
            } => {
                assert_eq!(count, Some(5));
                assert_eq!(max_attempts, Some(4));
                assert_eq!(niche.as_deref(), Some("stoicism"));
                assert_eq!(base_wait_secs, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ledger_kind_parses() {
        let cli = Cli::parse_from(["reelforge", "ledger", "--kind", "error", "--limit", "3"]);
        match cli.command {
            Commands::Ledger { limit, kind } => {
                assert_eq!(limit, 3);
                assert_eq!(kind.map(RecordKind::from), Some(RecordKind::Error));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = Config::resolve(None, |_| None).unwrap();
        RunOverrides {
            max_attempts: Some(3),
            base_wait_secs: Some(1),
            timeout_secs: None,
            niche: Some("cooking".to_string()),
        }
        .apply(&mut config);

        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_wait_secs, 1);
        assert_eq!(config.retry.timeout_secs, 300);
        assert_eq!(config.content.niche, "cooking");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title here", 10), "a much ...");
    }
}
