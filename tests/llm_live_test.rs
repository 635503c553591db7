//! Live connectivity tests for the LLM backends. Gated behind the `api`
//! feature so plain test runs never spend tokens.

use tracing::instrument;

use traitors::{
    builtin_personas, DecisionProvider, LlmClient, LlmConfig, LlmProvider, ModelProvider,
    PlayerView, Role,
};

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn anthropic_connectivity() {
    dotenvy::dotenv().ok();

    let api_key = std::env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY not set");

    let config = LlmConfig::new(
        LlmProvider::Anthropic,
        api_key,
        "claude-3-5-haiku-20241022".to_string(),
        50,
        0.3,
    );

    let client = LlmClient::new(config);

    let response = client
        .generate(
            "You are a helpful assistant.",
            "Say 'Hello, world!' and nothing else.",
        )
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn openai_connectivity() {
    dotenvy::dotenv().ok();

    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");

    let config = LlmConfig::new(
        LlmProvider::OpenAI,
        api_key,
        "gpt-4o-mini".to_string(),
        50,
        0.3,
    );

    let client = LlmClient::new(config);

    let response = client
        .generate(
            "You are a helpful assistant.",
            "Say 'Hello, world!' and nothing else.",
        )
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn model_provider_returns_a_legal_ballot() {
    dotenvy::dotenv().ok();

    let config = LlmConfig::from_env("gpt-4o-mini".to_string(), 0.3).expect("LLM config");
    let client = LlmClient::new(config);
    let persona = builtin_personas().remove(0);
    let mut provider = ModelProvider::new(2, Role::Faithful, persona, client, 400);

    let view = PlayerView {
        round_idx: 1,
        alive_ids: vec![1, 2, 3, 4, 5],
        public_summary: "P4: I don't trust P5. P5: That's rich coming from you.".to_string(),
        memory_summary: String::new(),
        top_suspicions: "P5:0.60, P4:0.55, P1:0.50".to_string(),
        ..PlayerView::default()
    };

    let choice = provider.vote(&view).await.expect("Failed to get a ballot");
    assert!(view.alive_ids.contains(&choice.target_id));
    eprintln!("Ballot: P{} ({})", choice.target_id, choice.rationale);
}
