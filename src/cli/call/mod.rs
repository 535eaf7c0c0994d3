//! Call command - one-shot conversation against a configured provider

use std::fmt::Write as _;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::{LlmProvider, LlmRequest, LlmResponse};
use crate::infrastructure::credentials::EnvCredentialProvider;
use crate::infrastructure::llm::{LlmProviderConfig, LlmProviderFactory};

/// Arguments for the call command
#[derive(Args, Clone, Debug)]
pub struct CallArgs {
    /// User message to send
    pub prompt: String,

    /// Provider name (anthropic, bedrock, openai, gemini, ollama)
    #[arg(short, long, default_value = "anthropic")]
    pub provider: String,

    /// Optional system instruction sent ahead of the prompt
    #[arg(short, long)]
    pub system: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Also print the thinking block, when the provider returned one
    #[arg(long)]
    pub show_thinking: bool,

    /// Print the normalized response as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the call command
pub async fn run(config: &AppConfig, args: CallArgs) -> anyhow::Result<()> {
    let provider_config = LlmProviderConfig::from_providers(&config.providers, &args.provider)?;
    let factory = LlmProviderFactory::new(Arc::new(EnvCredentialProvider::default()))
        .with_http_timeout(config.http.timeout());
    let provider = factory.create(&provider_config).await?;

    let output = execute(provider.as_ref(), &args).await?;
    println!("{}", output);

    Ok(())
}

/// Send the request and render the response for the terminal
pub async fn execute(provider: &dyn LlmProvider, args: &CallArgs) -> anyhow::Result<String> {
    info!(
        provider = provider.provider_name(),
        model = provider.model(),
        "Calling provider"
    );

    let response = provider.call(build_request(args)).await?;

    if args.json {
        return Ok(serde_json::to_string_pretty(&response)?);
    }

    Ok(render(&response, args.show_thinking))
}

fn build_request(args: &CallArgs) -> LlmRequest {
    let mut builder = LlmRequest::builder();

    if let Some(system) = &args.system {
        builder = builder.system(system);
    }
    builder = builder.user(&args.prompt);

    if let Some(temperature) = args.temperature {
        builder = builder.temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }

    builder.build()
}

fn render(response: &LlmResponse, show_thinking: bool) -> String {
    let mut out = String::new();

    if show_thinking {
        if let Some(thinking) = &response.thinking {
            let _ = writeln!(out, "--- thinking ---\n{}\n----------------", thinking.thinking);
        }
    }

    out.push_str(&response.content);

    let usage = &response.usage;
    let count = |n: Option<u32>| n.map_or_else(|| "-".to_string(), |n| n.to_string());
    let _ = write!(
        out,
        "\n\n[tokens] prompt={} completion={} total={}",
        count(usage.prompt_tokens),
        count(usage.completion_tokens),
        count(usage.total_tokens)
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::{MessageRole, ThinkingBlock, Usage};

    fn args(prompt: &str) -> CallArgs {
        CallArgs {
            prompt: prompt.to_string(),
            provider: "anthropic".to_string(),
            system: None,
            temperature: None,
            max_tokens: None,
            show_thinking: false,
            json: false,
        }
    }

    fn response() -> LlmResponse {
        LlmResponse::new("4", serde_json::json!({}))
            .with_usage(Usage::new(9, 1))
            .with_thinking(ThinkingBlock {
                thinking: "2 plus 2".to_string(),
                signature: "sig".to_string(),
            })
    }

    #[tokio::test]
    async fn test_execute_sends_system_and_prompt() {
        let provider = MockLlmProvider::new("mock").with_response(response());
        let args = CallArgs {
            system: Some("be terse".to_string()),
            max_tokens: Some(64),
            ..args("2+2?")
        };

        let output = execute(&provider, &args).await.unwrap();

        assert!(output.starts_with("4"));
        assert!(output.contains("prompt=9 completion=1 total=10"));
        assert!(!output.contains("2 plus 2"));

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let messages = &requests[0].messages;
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].text(), Some("be terse"));
        assert_eq!(messages[1].text(), Some("2+2?"));
        assert_eq!(requests[0].max_tokens, Some(64));
        assert_eq!(requests[0].temperature, None);
    }

    #[tokio::test]
    async fn test_execute_shows_thinking_on_request() {
        let provider = MockLlmProvider::new("mock").with_response(response());
        let args = CallArgs {
            show_thinking: true,
            ..args("2+2?")
        };

        let output = execute(&provider, &args).await.unwrap();

        assert!(output.starts_with("--- thinking ---\n2 plus 2"));
    }

    #[tokio::test]
    async fn test_execute_json_output() {
        let provider = MockLlmProvider::new("mock").with_response(response());
        let args = CallArgs {
            json: true,
            ..args("2+2?")
        };

        let output = execute(&provider, &args).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["content"], "4");
        assert_eq!(value["thinking"]["signature"], "sig");
    }

    #[tokio::test]
    async fn test_execute_propagates_provider_error() {
        let provider = MockLlmProvider::new("mock").with_error("upstream down");

        let err = execute(&provider, &args("Hi")).await.unwrap_err();

        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_render_missing_usage() {
        let response = LlmResponse::new("ok", serde_json::json!({}));

        assert_eq!(
            render(&response, true),
            "ok\n\n[tokens] prompt=- completion=- total=-"
        );
    }
}
