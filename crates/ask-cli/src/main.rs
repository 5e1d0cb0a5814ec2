//! Ask CLI - Command-line client
//!
//! Usage:
//!   ask query <question> [--top-k N]
//!   ask health
//!   ask config

use anyhow::{anyhow, Context};
use ask_api::error::ApiError;
use ask_api::handlers::ask::{AskRequest, AskResponse};
use ask_core::AppConfig;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;

/// Longest chunk excerpt printed per context row
const EXCERPT_CHARS: usize = 200;

#[derive(Parser)]
#[command(name = "ask")]
#[command(about = "Ask questions to the RAG gateway")]
#[command(version)]
struct Cli {
    /// Gateway base URL
    #[arg(long, global = true, env = "ASK_SERVER", default_value = "http://localhost:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question
    Query {
        /// Question to ask
        question: String,
        /// Number of context rows to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<u64>,
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
    /// Check that the gateway is alive
    Health,
    /// Print the effective server configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base = cli.server.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Query {
            question,
            top_k,
            json,
        } => {
            tracing::debug!(server = %base, "Sending question");
            let response = client
                .post(format!("{base}/ask"))
                .json(&AskRequest { question, top_k })
                .send()
                .await
                .with_context(|| format!("Failed to reach {base}"))?;

            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(anyhow!("{status}: {message}"));
            }

            if json {
                println!("{body}");
            } else {
                let answer: AskResponse =
                    serde_json::from_str(&body).context("Unexpected response body")?;
                print!("{}", render_answer(&answer));
            }
        }
        Commands::Health => {
            let response = client
                .get(format!("{base}/health"))
                .send()
                .await
                .with_context(|| format!("Failed to reach {base}"))?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(anyhow!("{status}: {body}"));
            }
            println!("{body}");
        }
        Commands::Config => {
            let config = match std::env::var("ASK_CONFIG") {
                Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
                Err(_) => AppConfig::from_env()?,
            };
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn render_answer(answer: &AskResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", answer.answer);

    if answer.context.is_empty() {
        return out;
    }

    let _ = writeln!(out, "\nContext:");
    for (i, item) in answer.context.iter().enumerate() {
        let _ = writeln!(
            out,
            "[{}] {} ({}, score {:.3})",
            i + 1,
            item.source,
            item.modality,
            item.score
        );
        let excerpt: String = item.chunk.chars().take(EXCERPT_CHARS).collect();
        let ellipsis = if item.chunk.chars().count() > EXCERPT_CHARS {
            "..."
        } else {
            ""
        };
        let _ = writeln!(out, "    {excerpt}{ellipsis}");
    }

    out
}
