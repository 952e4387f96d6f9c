use super::client::{GroqLLM, LLMClient, LLMConfig, LLMError, Message, ToolCall};
use super::context::ConversationContext;
use super::tools::{ToolError, ToolRegistry, ToolResult};
use crate::config::{AgentConfig, ApiConfig};
use crate::persona::Persona;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Model round trips that may request tools before a turn is abandoned
pub const MAX_TOOL_ROUNDS: usize = 5;

#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("LLM error: {0}")]
    LLM(#[from] LLMError),
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Operation was cancelled")]
    Cancelled,
    #[error("Model kept calling tools after {0} rounds")]
    TooManyToolRounds(usize),
}

pub struct LLMIntegration {
    llm: Box<dyn LLMClient>,
    tool_registry: ToolRegistry,
    context: ConversationContext,
}

impl LLMIntegration {
    /// Groq-backed integration for one persona, with its toolbox already registered
    pub fn new(
        api: &ApiConfig,
        agent: &AgentConfig,
        persona: Persona,
    ) -> Result<Self, IntegrationError> {
        let llm = GroqLLM::with_config(
            api.groq_key().to_string(),
            &agent.base_url,
            LLMConfig::for_agent(agent),
        )?;
        let tool_registry = persona
            .build_registry(agent)
            .map_err(|e| IntegrationError::Config(e.to_string()))?;

        log::info!(
            "🤖 {} agent ready with model {} and {} tools",
            persona,
            llm.model(),
            tool_registry.get_tools().len()
        );

        Ok(Self::with_client(
            Box::new(llm),
            tool_registry,
            &persona.instructions(),
        ))
    }

    /// Build around any client, e.g. a scripted one in tests
    pub fn with_client(
        llm: Box<dyn LLMClient>,
        tool_registry: ToolRegistry,
        system_prompt: &str,
    ) -> Self {
        let mut context = ConversationContext::with_defaults();
        context.set_system_message(system_prompt);

        Self {
            llm,
            tool_registry,
            context,
        }
    }

    /// Record the agent's opening line so the model knows it was already said
    pub fn add_greeting(&mut self, greeting: &str) {
        self.context.add_assistant_message(greeting);
    }

    /// Run one user turn to completion and return what the agent says back.
    ///
    /// Empty input is a silent no-op (`Ok(None)`). Tool results are fed back
    /// to the model as a system message until it answers in plain text.
    /// The user message joins the history only together with a reply, so a
    /// failed or cancelled turn leaves the context as it was.
    pub async fn process_user_instruction(
        &mut self,
        user_input: &str,
        cancel_token: CancellationToken,
    ) -> Result<Option<String>, IntegrationError> {
        if cancel_token.is_cancelled() {
            return Err(IntegrationError::Cancelled);
        }

        if user_input.trim().is_empty() {
            log::info!("Empty transcript received, aborting silently");
            return Ok(None);
        }

        let user_message = Message::user(user_input.trim());
        let tools = self.tool_registry.get_tool_definitions();
        let mut tool_notes: Vec<Message> = Vec::new();

        for round in 0..=MAX_TOOL_ROUNDS {
            let mut messages = self.context.get_messages();
            messages.push(user_message.clone());
            messages.extend(tool_notes.iter().cloned());

            let response = tokio::select! {
                result = self.llm.complete_with_internal_tools(messages, &tools) => {
                    result?
                }
                _ = cancel_token.cancelled() => {
                    return Err(IntegrationError::Cancelled);
                }
            };

            if response.tool_calls.is_empty() {
                let content = response.content.trim().to_string();
                if content.is_empty() {
                    log::warn!("⚠️  Model returned an empty reply");
                    return Ok(None);
                }
                self.context.add_message(user_message);
                self.context.add_assistant_message(&content);
                return Ok(Some(content));
            }

            if round == MAX_TOOL_ROUNDS {
                break;
            }

            log::info!(
                "🔧 Round {}: model requested {}",
                round + 1,
                response
                    .tool_calls
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            let results = self
                .process_tool_calls(&response.tool_calls, cancel_token.clone())
                .await?;
            tool_notes.push(Message::system(Self::process_tool_results_for_llm(
                user_input.trim(),
                &results,
            )));
        }

        log::error!("❌ Giving up after {} tool rounds", MAX_TOOL_ROUNDS);
        Err(IntegrationError::TooManyToolRounds(MAX_TOOL_ROUNDS))
    }

    /// Execute every requested tool in order.
    ///
    /// Failures the model can recover from (unknown tool, bad arguments) are
    /// reported back as text; cancellation aborts the turn.
    async fn process_tool_calls(
        &self,
        tool_calls: &[ToolCall],
        cancel_token: CancellationToken,
    ) -> Result<Vec<(String, String)>, IntegrationError> {
        let mut results = Vec::with_capacity(tool_calls.len());

        for tool_call in tool_calls {
            let result = tokio::select! {
                result = self.tool_registry.execute_tool(
                    &tool_call.name,
                    tool_call.arguments.clone(),
                    cancel_token.clone()
                ) => result,
                _ = cancel_token.cancelled() => {
                    return Err(IntegrationError::Cancelled);
                }
            };

            let text = match result {
                Ok(result) => {
                    if let ToolResult::Escalation(reason) = &result {
                        log::info!("↩️  Tool '{}' escalated: {}", tool_call.name, reason);
                    }
                    result.for_llm(&tool_call.name)
                }
                Err(ToolError::Cancelled) => return Err(IntegrationError::Cancelled),
                Err(e) => {
                    log::warn!("⚠️  Tool '{}' failed: {}", tool_call.name, e);
                    format!("Tool '{}' failed: {}", tool_call.name, e)
                }
            };
            results.push((tool_call.name.clone(), text));
        }

        Ok(results)
    }

    fn process_tool_results_for_llm(user_input: &str, results: &[(String, String)]) -> String {
        let listed = results
            .iter()
            .map(|(_, text)| format!("- {}", text))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "The user said: \"{}\"\n\nTool results:\n{}\n\nINSTRUCTIONS: Use these results to answer the user in a short spoken reply. \
             Call another tool only if the request still needs it. Never read ids or prices you did not get from a tool.",
            user_input, listed
        )
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    /// Get conversation context summary for debugging
    pub fn context_summary(&self) -> String {
        self.context.summary()
    }

    /// Clear conversation context
    pub fn clear_context(&mut self) {
        self.context.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::LLMResponse;

    struct SilentLLM;

    #[async_trait::async_trait]
    impl LLMClient for SilentLLM {
        async fn complete_with_internal_tools(
            &self,
            _messages: Vec<Message>,
            _tools: &[serde_json::Value],
        ) -> Result<LLMResponse, LLMError> {
            Ok(LLMResponse {
                content: "Namaste!".to_string(),
                ..Default::default()
            })
        }
    }

    struct FailingLLM;

    #[async_trait::async_trait]
    impl LLMClient for FailingLLM {
        async fn complete_with_internal_tools(
            &self,
            _messages: Vec<Message>,
            _tools: &[serde_json::Value],
        ) -> Result<LLMResponse, LLMError> {
            Err(LLMError::ApiError {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
        }
    }

    fn integration() -> LLMIntegration {
        LLMIntegration::with_client(Box::new(SilentLLM), ToolRegistry::new(), "You are Ramu Kaka")
    }

    #[test]
    fn test_context_summary() {
        let integration = integration();
        assert!(integration.context_summary().contains("Context:"));
        assert_eq!(
            integration.context().system_message().unwrap().content,
            "You are Ramu Kaka"
        );
    }

    #[tokio::test]
    async fn test_empty_input_is_silent() {
        let mut integration = integration();
        let reply = integration
            .process_user_instruction("   ", CancellationToken::new())
            .await
            .unwrap();
        assert!(reply.is_none());
        assert!(integration.context().is_empty());
    }

    #[tokio::test]
    async fn test_plain_reply_and_clear() {
        let mut integration = integration();
        integration.add_greeting("Welcome to Dr Abhishek Shop!");

        let reply = integration
            .process_user_instruction("hello", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("Namaste!"));
        assert_eq!(integration.context().len(), 3);

        integration.clear_context();
        assert!(integration.context().is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_no_unanswered_message() {
        let mut integration =
            LLMIntegration::with_client(Box::new(FailingLLM), ToolRegistry::new(), "You are Ramu Kaka");
        integration.add_greeting("Welcome to Dr Abhishek Shop!");

        let result = integration
            .process_user_instruction("show me mugs", CancellationToken::new())
            .await;
        assert!(matches!(result, Err(IntegrationError::LLM(_))));

        let history = integration.context().get_messages();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, "assistant");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut integration = integration();
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();

        let result = integration
            .process_user_instruction("hello", cancel_token)
            .await;
        assert!(matches!(result, Err(IntegrationError::Cancelled)));
        assert!(integration.context().is_empty());
    }

    #[test]
    fn test_tool_results_message() {
        let text = LLMIntegration::process_tool_results_for_llm(
            "show me mugs",
            &[("show_catalog".to_string(), "Tool 'show_catalog' returned: 2 mugs".to_string())],
        );
        assert!(text.contains("The user said: \"show me mugs\""));
        assert!(text.contains("- Tool 'show_catalog' returned: 2 mugs"));
        assert!(text.contains("INSTRUCTIONS"));
    }
}
