//! Text console standing in for the microphone and speaker.
//!
//! One line of input is one user turn. A new line while a turn is still being
//! processed cancels that turn, the same way speaking over the agent would.

use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::llm::client::LLMError;
use crate::llm::integration::{IntegrationError, LLMIntegration};
use crate::llm::prompts::ConversationTemplates;
use crate::persona::Persona;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Quit,
    Reset,
    Context,
    Say(String),
    Empty,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => ConsoleCommand::Empty,
            "/quit" | "/exit" => ConsoleCommand::Quit,
            "/reset" => ConsoleCommand::Reset,
            "/context" => ConsoleCommand::Context,
            _ => ConsoleCommand::Say(line.to_string()),
        }
    }
}

type Turn = (JoinHandle<()>, CancellationToken);

fn cancel_turn(current: &mut Option<Turn>) -> bool {
    match current.take() {
        Some((handle, cancel_token)) => {
            cancel_token.cancel();
            handle.abort();
            true
        }
        None => false,
    }
}

fn spawn_turn(integration: Arc<Mutex<LLMIntegration>>, text: String) -> Turn {
    let cancel_token = CancellationToken::new();
    let cancel_token_clone = cancel_token.clone();

    let handle = tokio::spawn(async move {
        let mut llm = integration.lock().await;
        match llm.process_user_instruction(&text, cancel_token_clone).await {
            Ok(Some(response)) => {
                println!("🗣️  {}", response);
                log::info!("LLM response: {}", response);
            }
            Ok(None) => {
                log::info!("Turn finished without a reply");
            }
            Err(IntegrationError::Cancelled) => {
                log::info!("🛑 Turn cancelled");
            }
            Err(e) => {
                log::error!("Failed to process user instruction: {}", e);
                let kind = match e {
                    IntegrationError::LLM(LLMError::Request(_)) => "network",
                    _ => "processing",
                };
                println!("🗣️  {}", ConversationTemplates::voice_error(kind));
            }
        }
    });

    (handle, cancel_token)
}

/// Greet, then read turns from stdin until `/quit`, end of input or Ctrl+C
pub async fn run_console(integration: LLMIntegration, persona: Persona) -> Result<()> {
    let mut integration = integration;
    let greeting = persona.greeting();
    integration.add_greeting(greeting);

    println!("🎧 {} agent ready. Type to talk; /reset clears the conversation, /quit exits.", persona);
    println!("   Press Ctrl+C to interrupt a reply");
    println!("🗣️  {}", greeting);

    let stdin = BufReader::new(tokio::io::stdin());
    run_session(Arc::new(Mutex::new(integration)), stdin).await
}

/// Drive turns from any line source
pub async fn run_session<R>(integration: Arc<Mutex<LLMIntegration>>, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut current_turn: Option<Turn> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // end of input: let the last turn finish before leaving
                    if let Some((handle, _)) = current_turn.take() {
                        let _ = handle.await;
                    }
                    break;
                };

                match ConsoleCommand::parse(&line) {
                    ConsoleCommand::Empty => {}
                    ConsoleCommand::Quit => {
                        cancel_turn(&mut current_turn);
                        println!("👋 {}", ConversationTemplates::goodbye());
                        break;
                    }
                    ConsoleCommand::Reset => {
                        cancel_turn(&mut current_turn);
                        integration.lock().await.clear_context();
                        println!("🧹 Conversation cleared");
                    }
                    ConsoleCommand::Context => {
                        println!("📋 {}", integration.lock().await.context_summary());
                    }
                    ConsoleCommand::Say(text) => {
                        if cancel_turn(&mut current_turn) {
                            log::info!("🛑 Cancelling current processing for new instruction");
                        }
                        log::info!("Received instruction: {}", text);
                        current_turn = Some(spawn_turn(Arc::clone(&integration), text));
                    }
                }
            }

            Some(result) = async {
                if let Some((ref mut handle, _)) = current_turn {
                    Some(handle.await)
                } else {
                    None
                }
            } => {
                current_turn = None;
                if let Err(e) = result {
                    if !e.is_cancelled() {
                        log::error!("Processing task failed: {}", e);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                if cancel_turn(&mut current_turn) {
                    log::info!("Received Ctrl+C, cancelling the current turn");
                    println!("🗣️  {}", ConversationTemplates::cancelled());
                } else {
                    log::info!("Received Ctrl+C, shutting down...");
                    println!("\n👋 {}", ConversationTemplates::goodbye());
                    break;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{LLMClient, LLMResponse, Message};
    use crate::llm::tools::ToolRegistry;

    struct EchoLLM;

    #[async_trait::async_trait]
    impl LLMClient for EchoLLM {
        async fn complete_with_internal_tools(
            &self,
            messages: Vec<Message>,
            _tools: &[serde_json::Value],
        ) -> std::result::Result<LLMResponse, LLMError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(LLMResponse {
                content: format!("You said {}", last),
                ..Default::default()
            })
        }
    }

    fn integration() -> Arc<Mutex<LLMIntegration>> {
        Arc::new(Mutex::new(LLMIntegration::with_client(
            Box::new(EchoLLM),
            ToolRegistry::new(),
            "test",
        )))
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse("  /QUIT "), ConsoleCommand::Quit);
        assert_eq!(ConsoleCommand::parse("/reset"), ConsoleCommand::Reset);
        assert_eq!(ConsoleCommand::parse("/context"), ConsoleCommand::Context);
        assert_eq!(ConsoleCommand::parse(""), ConsoleCommand::Empty);
        assert_eq!(
            ConsoleCommand::parse(" show me mugs "),
            ConsoleCommand::Say("show me mugs".to_string())
        );
    }

    #[tokio::test]
    async fn test_last_turn_finishes_at_end_of_input() {
        let integration = integration();
        let input = BufReader::new(&b"namaste\n"[..]);

        run_session(integration.clone(), input).await.unwrap();

        let llm = integration.lock().await;
        let messages = llm.context().get_messages();
        assert_eq!(messages.last().unwrap().content, "You said namaste");
    }

    #[tokio::test]
    async fn test_reset_clears_context() {
        let integration = integration();
        integration.lock().await.add_greeting("Hi");

        let input = BufReader::new(&b"/reset\n/quit\n"[..]);
        run_session(integration.clone(), input).await.unwrap();

        assert!(integration.lock().await.context().is_empty());
    }
}
