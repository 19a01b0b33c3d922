use crate::matcher::{CampaignMatch, MatchEngine, MatchInput};
use crate::models::{ChatMessage, ChatRequest, ChatResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

/// OpenAI 兼容 Provider（官方 API 或任意兼容网关）
#[derive(Clone)]
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout_secs: Option<u64>,
        max_tokens: Option<usize>,
        temperature: Option<f32>,
    ) -> Result<Self> {
        let timeout = timeout_secs.unwrap_or(60);
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .build()?;

        let base = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            api_key,
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: base.trim_end_matches('/').to_string(),
            client,
            max_tokens,
            temperature,
        })
    }
}

#[async_trait]
impl MatchEngine for OpenAiProvider {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn match_volunteer(&self, input: MatchInput) -> Result<Vec<CampaignMatch>> {
        // 1. 构造 Prompt
        let prompt = crate::prompt::build_match_prompt(&input);

        // 2. 单次调用 chat/completions，不重试不缓存
        let reply = self.call_api(&prompt).await?;

        // 3. 截取 JSON 数组并映射回活动清单
        crate::extract::extract_matches(&reply, &input.campaigns)
    }
}

impl OpenAiProvider {
    /// 调用 chat/completions 接口
    async fn call_api(&self, prompt: &str) -> Result<String> {
        let req = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a coordinator at a volunteer matching platform. \
                              You answer with strict JSON only."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            prompt_length = prompt.len(),
            "Calling chat completion API"
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await
            .context("Failed to reach chat completion API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                "Chat completion request failed"
            );
            anyhow::bail!("chat completion API error {}: {}", status, body);
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        tracing::debug!(usage = ?chat_resp.usage, "Chat completion received");

        chat_resp
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("Empty chat completion response"))
    }
}
