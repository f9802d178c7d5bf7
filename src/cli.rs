//! CLI - Command-line argument parsing and the terminal chat
//!
//! `serve` runs the HTTP server; `chat` talks to the assistant from a
//! terminal, keeping the conversation locally and sending it with every turn.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::services::{AgentService, ChatRequest};
use crate::utils::error::AppResult;
use yojna_setu_core::{Conversation, UserProfile};

/// Yojna Setu scheme-eligibility assistant
#[derive(Debug, Parser)]
#[command(name = "yojna-setu")]
#[command(about = "Yojna Setu - AI caseworker for government scheme applications", long_about = None)]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "YOJNA_SETU_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve,

    /// Chat with the assistant in the terminal
    Chat {
        /// Phone number the conversation belongs to
        #[arg(long, default_value = DEMO_CHAT_PHONE)]
        phone: String,

        /// Use the configured database instead of a throwaway demo profile
        #[arg(long)]
        persist: bool,
    },
}

/// Phone of the built-in demo user
pub const DEMO_CHAT_PHONE: &str = "9999999999";

/// Profile the terminal chat starts from unless `--persist` is given
pub fn demo_profile(phone: &str) -> UserProfile {
    UserProfile::new(phone)
        .with_field("name", "Arijeet")
        .with_field("occupation", "Farmer")
        .with_field("location", "West Bengal")
}

fn is_exit(line: &str) -> bool {
    matches!(line.to_lowercase().as_str(), "exit" | "quit")
}

/// Read messages from `input` until EOF or `exit`/`quit`, printing replies.
pub async fn run_chat<R, W>(
    agent: &AgentService,
    phone: &str,
    input: R,
    mut output: W,
) -> AppResult<Conversation>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut conversation = Conversation::new();
    let mut lines = input.lines();

    output
        .write_all(b"Yojna Setu chat. Type 'exit' or 'quit' to leave.\n")
        .await?;

    loop {
        output.write_all(b"You: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if is_exit(message) {
            break;
        }

        let request = ChatRequest::new(phone, message).with_history(conversation.to_raw());
        let outcome = agent.chat(request).await;

        output
            .write_all(format!("Yojna Setu: {}\n", outcome.reply).as_bytes())
            .await?;
        if let Some(receipt) = &outcome.application {
            let note = if receipt.duplicate {
                format!(
                    "[Already applied for {}: {}]\n",
                    receipt.scheme, receipt.application_id
                )
            } else {
                format!(
                    "[Application {} submitted for {}]\n",
                    receipt.application_id, receipt.scheme
                )
            };
            output.write_all(note.as_bytes()).await?;
        }

        conversation.record_exchange(message, outcome.reply);
    }

    output.write_all(b"Dhanyavaad!\n").await?;
    output.flush().await?;
    Ok(conversation)
}
