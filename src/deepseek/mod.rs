use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::DeepSeekConfig;
use crate::utils::{RefbotError, RefbotResult};

/// DeepSeek chat completions 请求体（OpenAI 兼容格式）
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// 对话补全接口的抽象，摘要与翻译都经由它调用，测试时可换成桩实现
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// 发送一轮 system + user 消息。json_mode 开启时要求模型仅输出 JSON
    async fn chat(&self, system: &str, user: &str, json_mode: bool) -> RefbotResult<String>;
}

pub struct DeepSeekClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl DeepSeekClient {
    pub fn new(config: &DeepSeekConfig, api_key: String) -> RefbotResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// 调用 API，带重试逻辑
    async fn call_api(&self, request: &ChatRequest) -> RefbotResult<String> {
        let mut last_error = None;

        for attempt in 0..3 {
            if attempt > 0 {
                let delay = std::time::Duration::from_millis(500 * 2u64.pow(attempt as u32));
                info!("API 重试 ({}/3)，等待 {}ms...", attempt + 1, delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            match self.do_request(request).await {
                Ok(content) => {
                    // 速率限制：每次调用后等待 500ms
                    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                    return Ok(content);
                }
                Err(e) => {
                    // 上下文超限属确定性错误，重试无意义，直接交给上层截断
                    if e.to_string().contains("maximum context length") {
                        return Err(e);
                    }
                    warn!("API 调用失败 (尝试 {}/3): {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RefbotError::ApiError("API 调用失败".to_string())))
    }

    async fn do_request(&self, request: &ChatRequest) -> RefbotResult<String> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefbotError::ApiError(format!("API 返回错误 {}: {}", status, body)));
        }

        let chat_response: ChatResponse = response.json().await?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(content)
    }
}

#[async_trait]
impl ChatApi for DeepSeekClient {
    async fn chat(&self, system: &str, user: &str, json_mode: bool) -> RefbotResult<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: 0.3,
            response_format: json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
            stream: false,
        };

        self.call_api(&request).await
    }
}
