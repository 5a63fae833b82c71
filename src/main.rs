//! Field Pulse binary entrypoint.
//! One-shot batch commands for generating and delivering the pulse
//! report, plus a small HTTP service mode.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use field_pulse::agent::PulseAgent;
use field_pulse::ai::{build_completion_client, load_ai_config};
use field_pulse::api::{create_router, AppState};
use field_pulse::knowledge::cutoff_start_of_day;
use field_pulse::maturity::MaturityAuditor;
use field_pulse::metrics::Metrics;
use field_pulse::notify::{chat::ChatNotifier, email::EmailSender, issues::IssueNotifier};
use field_pulse::sink::StdoutSink;
use field_pulse::store::MemoryStore;

#[derive(Parser)]
#[command(name = "field-pulse", version, about = "Browse and promote AI platform knowledge")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the field promotion report locally.
    Report {
        /// Number of days to look back
        #[arg(short, long, default_value_t = 1)]
        days: i64,
    },
    /// Scan and post the report to a chat webhook.
    Chat {
        #[arg(long, env = "PULSE_CHAT_WEBHOOK_URL")]
        webhook_url: String,
        #[arg(short, long, default_value_t = 1)]
        days: i64,
    },
    /// Scan and send the report via email.
    Email {
        /// Recipient email address
        recipient: String,
        #[arg(short, long, default_value_t = 1)]
        days: i64,
    },
    /// Dispatch the report as a GitHub issue.
    Github {
        #[arg(short, long, default_value_t = 1)]
        days: i64,
    },
    /// Query the pulse store (RAG).
    Query {
        text: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Audit a package's registry history and maturity.
    Audit {
        package: String,
    },
    /// Launch the HTTP service.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("field_pulse=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn build_agent() -> PulseAgent {
    let agent = PulseAgent::from_env();
    match std::env::var("PULSE_STORE").as_deref() {
        Ok("memory") => agent.with_store(Arc::new(MemoryStore::new())),
        _ => agent,
    }
}

fn date_range(days: i64) -> String {
    let now = Utc::now();
    let cutoff = cutoff_start_of_day(now, days);
    format!("{} to {}", cutoff.format("%Y-%m-%d"), now.format("%Y-%m-%d"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Report { days } => {
            let agent = build_agent();
            let report = agent.pulse(days).await;
            agent.promote(&report, days, &StdoutSink);
        }
        Command::Chat { webhook_url, days } => {
            let agent = build_agent();
            let report = agent.pulse(days).await;
            ChatNotifier::new(webhook_url).post_report(&report).await?;
        }
        Command::Email { recipient, days } => {
            let agent = build_agent();
            let report = agent.pulse(days).await;
            match EmailSender::from_env(&recipient) {
                Ok(sender) => {
                    sender
                        .send_report(&report, Some(&date_range(days)))
                        .await?;
                }
                Err(e) => tracing::warn!(error = ?e, "email channel not configured; skipping"),
            }
        }
        Command::Github { days } => {
            let agent = build_agent();
            let report = agent.pulse(days).await;
            match IssueNotifier::from_env() {
                Some(notifier) => {
                    notifier
                        .post_report(&report, Some(&date_range(days)))
                        .await?;
                }
                None => tracing::warn!(
                    "GITHUB_REPOSITORY or GITHUB_TOKEN not set; skipping issue channel"
                ),
            }
        }
        Command::Query { text, top_k } => {
            let agent = build_agent();
            let hits = agent.query(&text, top_k).await?;
            if hits.is_empty() {
                println!("No relevant pulses found.");
            } else {
                for hit in hits {
                    let snippet: String = hit.document.chars().take(200).collect();
                    println!("[{}] {}\n{snippet}\n", hit.source, hit.id);
                }
            }
        }
        Command::Audit { package } => {
            let cfg = load_ai_config();
            let auditor = MaturityAuditor::new(build_completion_client(&cfg));
            let report = auditor.audit(&package).await?;
            println!(
                "{} {}: {} downloads (last release {})",
                report.name, report.version, report.downloads, report.last_release_at
            );
            println!("\n{}", report.wisdom);
        }
        Command::Serve { host, port } => {
            let metrics = Metrics::init();
            let state = AppState {
                agent: Arc::new(build_agent()),
            };
            let router = create_router(state).merge(metrics.router());
            let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
            tracing::info!(%host, port, "field-pulse agent listening");
            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
