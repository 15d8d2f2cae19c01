//! 云端服务（OpenAI 兼容的 chat completions 接口）

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    classify_status, classify_transport_error, strip_enclosing_quotes, TranslateRequest,
    TranslationBackend,
};
use crate::translation::config::{constants, TranslationConfig};
use crate::translation::error::{TranslationError, TranslationResult};

const SERVICE: &str = "OpenAI";

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// 云端翻译后端
pub struct CloudBackend {
    client: Client,
    endpoint_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl CloudBackend {
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        Ok(Self::with_client(super::build_client()?, config))
    }

    pub fn with_client(client: Client, config: &TranslationConfig) -> Self {
        Self {
            client,
            endpoint_url: config.cloud_endpoint_url.trim().to_string(),
            api_key: config.cloud_api_key.trim().to_string(),
            model: config.cloud_model.clone(),
            timeout: config.request_timeout(),
        }
    }

    /// 翻译用的系统提示词
    pub fn system_prompt(target_language: &str) -> String {
        format!(
            "You are a translator. Translate the user's text to {target_language}. \
             Only output the translation, nothing else. Do not add any explanations, \
             notes, or quotation marks."
        )
    }

    /// 发送一次对话请求，返回第一条回复
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> TranslationResult<String> {
        if self.api_key.is_empty() {
            return Err(TranslationError::AuthenticationFailed(
                "OpenAI API key not configured. Please set it in the extension settings."
                    .to_string(),
            ));
        }

        url::Url::parse(&self.endpoint_url)?;
        debug!("发送对话请求到: {}", self.endpoint_url);

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint_url)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, SERVICE))?;

        if !response.status().is_success() {
            return Err(classify_status(response, SERVICE).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| classify_transport_error(e, SERVICE))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TranslationError::MalformedResponse("响应中缺少 choices[0].message.content".to_string()))
    }
}

#[async_trait]
impl TranslationBackend for CloudBackend {
    async fn translate(&self, request: &TranslateRequest) -> TranslationResult<String> {
        let messages = [
            ChatMessage::system(Self::system_prompt(&request.target_language)),
            ChatMessage::user(request.text.clone()),
        ];

        let reply = self
            .complete(&messages, Some(constants::TRANSLATION_TEMPERATURE), None)
            .await?;

        Ok(strip_enclosing_quotes(&reply))
    }

    fn name(&self) -> &str {
        "cloud"
    }
}
