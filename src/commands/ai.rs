use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use ironlog::{
    ai::{
        self, AnthropicClient, ChatHistory, ChatProxy, ChatRequest, MAX_HISTORY_TURNS, RateLimiter,
        Role, prompts::load_context, proxy::ANONYMOUS,
    },
    types::emit,
};
use tracing::warn;

use super::App;
use crate::cli::AiCmd;

pub async fn handle(cmd: AiCmd, app: &App) -> Result<()> {
    match cmd {
        AiCmd::Ask { feature, message } => {
            let message = message.join(" ");
            let mut history = ChatHistory::load(Box::new(app.state_store()?))
                .context("Failed to load chat history")?;

            let proxy = proxy(app)?;
            let context = load_context(&app.db)
                .await
                .context("Failed to gather training context")?;
            let req = ChatRequest {
                message: message.clone(),
                feature,
                context: Some(context),
                conversation_history: history.recent_turns(MAX_HISTORY_TURNS),
            };

            let res = match proxy.handle(ANONYMOUS, req).await {
                Ok(res) => res,
                Err(e) => {
                    // Keep the user-facing text free of upstream detail.
                    warn!(error = %e, "ai ask failed");
                    anyhow::bail!(e.public_message());
                }
            };

            let now = app.clock.now();
            history.push(Role::User, message, Some(feature), now)?;
            history.push(Role::Assistant, res.message.clone(), Some(feature), now)?;

            emit(app.fmt, &res, || {
                println!("{} {}", "Assistant:".cyan().bold(), feature.as_str().dimmed());
                println!("{}", res.message);
                println!(
                    "{}",
                    format!(
                        "({} in / {} out tokens)",
                        res.usage.input_tokens, res.usage.output_tokens
                    )
                    .dimmed()
                );
            })?;
        }

        AiCmd::History => {
            let history = ChatHistory::load(Box::new(app.state_store()?))
                .context("Failed to load chat history")?;
            let messages: Vec<_> = history.messages().collect();

            emit(app.fmt, &messages, || {
                if messages.is_empty() {
                    println!("{}", "  (no chat history)".dimmed());
                    return;
                }
                for m in &messages {
                    let who = match m.role {
                        Role::User => "You:".green().bold(),
                        Role::Assistant => "Assistant:".cyan().bold(),
                    };
                    println!(
                        "{} {}",
                        who,
                        m.timestamp
                            .with_timezone(&Local)
                            .format("%Y-%m-%d %H:%M")
                            .to_string()
                            .dimmed()
                    );
                    println!("{}\n", m.content);
                }
            })?;
        }

        AiCmd::Clear => {
            let mut history = ChatHistory::load(Box::new(app.state_store()?))
                .context("Failed to load chat history")?;
            let n = history.len();
            history.clear()?;
            println!("{} cleared {} message{}", "ok:".green().bold(), n, if n == 1 { "" } else { "s" });
        }
    }
    Ok(())
}

pub async fn serve(addr: Option<SocketAddr>, app: &App) -> Result<()> {
    let addr = addr.unwrap_or(app.settings.serve_addr);
    let proxy = Arc::new(proxy(app)?);
    println!(
        "{} serving POST {} on http://{}",
        "info:".blue().bold(),
        ai::server::CHAT_PATH,
        addr
    );
    ai::server::serve(addr, proxy).await
}

fn proxy(app: &App) -> Result<ChatProxy> {
    let client = AnthropicClient::new(app.settings.ai.clone())
        .context("The AI assistant needs ANTHROPIC_API_KEY to be set")?;
    Ok(ChatProxy::new(
        Arc::new(client),
        RateLimiter::with_defaults(app.clock.clone()),
    ))
}
