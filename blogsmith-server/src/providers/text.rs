//! Text generation against the OpenAI API. Two call shapes exist: gpt-5
//! family models go through the Responses API with reasoning/verbosity
//! settings, everything else through plain chat completions.

use anyhow::{anyhow, Context, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
    },
};
use serde_json::json;

pub const DEFAULT_TEXT_MODEL: &str = "gpt-5-mini";

const SYSTEM_PROMPT: &str =
    "당신은 전문 블로그 콘텐츠 작가입니다. 주어진 정보를 바탕으로 SEO에 최적화된 고품질 블로그 글을 작성합니다.";

lazy_static::lazy_static! {
    // Evaluated once on first use: a missing key fails the request with a
    // descriptive message instead of aborting process start.
    static ref OPENAI_API_KEY: Result<String, String> =
        dotenvy::var("OPENAI_API_KEY").map_err(|_| "OPENAI_API_KEY is not set".to_string());

    static ref OPENAI_CLIENT: Result<async_openai::Client<OpenAIConfig>, String> =
        OPENAI_API_KEY.clone().map(|key| {
            async_openai::Client::build(
                Default::default(),
                OpenAIConfig::new().with_api_key(key),
                Default::default(),
            )
        });

    static ref REQWEST_CLIENT: reqwest::Client = reqwest::Client::new();

    static ref TITLE_PATTERN: regex::Regex =
        regex::Regex::new(r"(?m)^#\s+(.+)$").expect("valid title pattern");
}

fn openai_client() -> Result<&'static async_openai::Client<OpenAIConfig>> {
    OPENAI_CLIENT.as_ref().map_err(|e| anyhow!("{}", e))
}

/// gpt-5 family models require the Responses API.
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
}

#[derive(Debug, Clone)]
pub struct BlogDraft {
    pub content: String,
    pub tokens_used: i64,
}

pub async fn generate_text(prompt: &str, model: &str) -> Result<BlogDraft> {
    if is_reasoning_model(model) {
        generate_via_responses(prompt, model).await
    } else {
        generate_via_chat(prompt, model).await
    }
}

async fn generate_via_responses(prompt: &str, model: &str) -> Result<BlogDraft> {
    let api_key = OPENAI_API_KEY.as_ref().map_err(|e| anyhow!("{}", e))?;
    let response: serde_json::Value = REQWEST_CLIENT
        .post("https://api.openai.com/v1/responses")
        .bearer_auth(api_key)
        .json(&json!({
            "model": model,
            "instructions": SYSTEM_PROMPT,
            "input": prompt,
            "reasoning": { "effort": "medium" },
            "text": { "verbosity": "high" },
        }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .context("Decoding Responses API payload")?;

    let mut content = String::new();
    for item in response
        .pointer("/output")
        .and_then(|o| o.as_array())
        .map(|a| a.as_slice())
        .unwrap_or_default()
    {
        for part in item
            .pointer("/content")
            .and_then(|c| c.as_array())
            .map(|a| a.as_slice())
            .unwrap_or_default()
        {
            if part.pointer("/type").and_then(|t| t.as_str()) == Some("output_text") {
                if let Some(text) = part.pointer("/text").and_then(|t| t.as_str()) {
                    content.push_str(text);
                }
            }
        }
    }
    if content.is_empty() {
        return Err(anyhow!("No response from model"));
    }

    let input_tokens = response
        .pointer("/usage/input_tokens")
        .and_then(|t| t.as_i64())
        .unwrap_or(0);
    let output_tokens = response
        .pointer("/usage/output_tokens")
        .and_then(|t| t.as_i64())
        .unwrap_or(0);
    Ok(BlogDraft {
        content,
        tokens_used: input_tokens + output_tokens,
    })
}

async fn generate_via_chat(prompt: &str, model: &str) -> Result<BlogDraft> {
    let req_args = CreateChatCompletionRequestArgs::default()
        .model(model)
        .temperature(0.7)
        .max_tokens(4000u32)
        .messages([
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: SYSTEM_PROMPT.into(),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: prompt.into(),
                name: None,
            }),
        ])
        .build()?;
    let response = openai_client()?.chat().create(req_args).await?;
    let content = response
        .choices
        .first()
        .ok_or(anyhow!("No response from model"))?
        .clone()
        .message
        .content
        .ok_or(anyhow!("No response from model"))?;
    let tokens_used = response
        .usage
        .map(|usage| usage.total_tokens as i64)
        .unwrap_or(0);
    Ok(BlogDraft {
        content,
        tokens_used,
    })
}

/// Pull the H1 title out of generated markdown, falling back to the source
/// topic when the model skipped the heading.
pub fn extract_title(content: &str, fallback: &str) -> String {
    TITLE_PATTERN
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| fallback.to_string())
}
