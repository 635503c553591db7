//! Model-backed provider speaking through the LLM client.

use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::game::{PlayerId, Role};
use crate::llm_client::LlmClient;
use crate::personas::Persona;
use crate::prompts;

use super::{BeliefUpdate, DecisionProvider, PlayerView, ProviderError, VoteChoice};

/// Re-prompts allowed after an invalid structured reply.
const STRUCTURED_RETRIES: usize = 2;

/// Structured outputs that carry their own well-formedness rules.
trait Validated: DeserializeOwned {
    fn check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

impl Validated for BeliefUpdate {}

impl Validated for VoteChoice {
    fn check(&self) -> Result<(), ProviderError> {
        self.validate()
    }
}

/// Provider that prompts a chat model for every decision.
///
/// Structured decisions are parsed from JSON and re-prompted a bounded number
/// of times; a reply that never parses surfaces as a [`ProviderError`] for
/// the engine's fallback policy. The provider holds no random source.
pub struct ModelProvider {
    id: PlayerId,
    role: Role,
    persona: Persona,
    client: LlmClient,
    message_char_limit: usize,
}

impl ModelProvider {
    /// Creates a model-backed provider for player `id`.
    pub fn new(
        id: PlayerId,
        role: Role,
        persona: Persona,
        client: LlmClient,
        message_char_limit: usize,
    ) -> Self {
        Self {
            id,
            role,
            persona,
            client,
            message_char_limit,
        }
    }

    /// One plain-text completion, trimmed.
    async fn plain_invoke(&self, prompt: &str) -> Result<String, ProviderError> {
        let raw = self
            .client
            .generate(prompts::SYSTEM_PROMPT, prompt)
            .await
            .map_err(|e| ProviderError::new(format!("LLM call failed: {}", e.message)))?;
        Ok(raw.trim().to_string())
    }

    /// One structured completion, re-prompting on invalid JSON.
    ///
    /// Each failed attempt wraps the prompt in a correction preamble before
    /// trying again. The last parse error is surfaced once the budget runs
    /// out.
    #[instrument(skip(self, prompt), fields(player = self.id))]
    async fn structured_invoke<T: Validated>(&self, prompt: String) -> Result<T, ProviderError> {
        let mut prompt = prompt;
        let mut last_error = String::new();
        for attempt in 0..=STRUCTURED_RETRIES {
            let raw = self.plain_invoke(&prompt).await?;
            match parse_json_block::<T>(&raw).and_then(|value| {
                value.check()?;
                Ok(value)
            }) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    last_error = format!("parse_error: {}", e.message);
                    debug!(attempt, error = %last_error, "Structured reply invalid, re-prompting");
                    prompt = format!(
                        "You must output valid JSON ONLY.\n{prompt}\nYour previous output was invalid. Follow the schema exactly."
                    );
                }
            }
        }
        warn!(player = self.id, error = %last_error, "Structured reply never parsed");
        Err(ProviderError::new(last_error))
    }
}

/// Parses `raw` as JSON, tolerating prose or code fences around the object.
fn parse_json_block<T: DeserializeOwned>(raw: &str) -> Result<T, ProviderError> {
    let trimmed = raw.trim();
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(first) => {
            if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
                if start < end {
                    return serde_json::from_str(&trimmed[start..=end])
                        .map_err(|e| ProviderError::new(e.to_string()));
                }
            }
            Err(ProviderError::new(first.to_string()))
        }
    }
}

#[async_trait::async_trait]
impl DecisionProvider for ModelProvider {
    async fn update_beliefs(&mut self, view: &PlayerView) -> Result<BeliefUpdate, ProviderError> {
        let prompt = prompts::belief_update_prompt(&self.persona, self.role, view);
        self.structured_invoke(prompt).await
    }

    async fn speak(&mut self, view: &PlayerView) -> Result<String, ProviderError> {
        let prompt =
            prompts::public_discussion_prompt(&self.persona, self.role, view, self.message_char_limit);
        self.plain_invoke(&prompt).await
    }

    async fn vote(&mut self, view: &PlayerView) -> Result<VoteChoice, ProviderError> {
        let prompt = prompts::vote_prompt(&self.persona, self.role, view);
        self.structured_invoke(prompt).await
    }

    async fn traitor_chat(&mut self, view: &PlayerView) -> Result<String, ProviderError> {
        let prompt = prompts::traitor_chat_prompt(&self.persona, self.role, view);
        self.plain_invoke(&prompt).await
    }

    async fn choose_murder(&mut self, view: &PlayerView) -> Result<VoteChoice, ProviderError> {
        let prompt = prompts::murder_prompt(&self.persona, self.role, view);
        self.structured_invoke(prompt).await
    }

    fn name(&self) -> &str {
        self.persona.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let parsed: VoteChoice =
            parse_json_block(r#"{"target_id": 3, "rationale": "quiet all game"}"#).unwrap();
        assert_eq!(parsed.target_id, 3);
    }

    #[test]
    fn parses_json_inside_prose_and_fences() {
        let fenced = "Here is my vote:\n```json\n{\"target_id\": 5, \"rationale\": \"hunch\"}\n```";
        let parsed: VoteChoice = parse_json_block(fenced).unwrap();
        assert_eq!(parsed.target_id, 5);
        assert_eq!(parsed.rationale, "hunch");
    }

    #[test]
    fn rejects_text_without_json() {
        let result: Result<VoteChoice, _> = parse_json_block("I refuse to answer.");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_wrong_shape() {
        let result: Result<BeliefUpdate, _> = parse_json_block(r#"{"target_id": 3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn check_rejects_oversized_rationale() {
        let raw = format!(
            r#"{{"target_id": 2, "rationale": "{}"}}"#,
            "x".repeat(300)
        );
        let parsed: VoteChoice = parse_json_block(&raw).unwrap();
        assert!(parsed.check().is_err());
    }
}
