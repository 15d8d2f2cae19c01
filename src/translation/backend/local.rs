//! 本地模型服务（Ollama 兼容接口）

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    classify_status, classify_transport_error, join_endpoint, strip_enclosing_quotes,
    TranslateRequest, TranslationBackend,
};
use crate::translation::config::{constants, TranslationConfig};
use crate::translation::error::{TranslationError, TranslationResult};

const SERVICE: &str = "Ollama";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// 本地翻译后端
pub struct LocalBackend {
    client: Client,
    endpoint_url: String,
    model_name: String,
    timeout: Duration,
}

impl LocalBackend {
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        Ok(Self::with_client(super::build_client()?, config))
    }

    pub fn with_client(client: Client, config: &TranslationConfig) -> Self {
        Self {
            client,
            endpoint_url: config.local_endpoint_url.clone(),
            model_name: config.model_name.clone(),
            timeout: config.request_timeout(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 翻译提示词
    pub fn build_prompt(text: &str, target_language: &str) -> String {
        format!(
            "Translate the following text to {target_language}. Only output the translation, \
             nothing else. Do not add any explanations or notes.\n\n\
             Text to translate:\n{text}\n\nTranslation:"
        )
    }

    /// 调用 `/api/generate`，返回原始回复
    pub async fn generate(&self, model: &str, prompt: &str, temperature: f32) -> TranslationResult<String> {
        let url = join_endpoint(&self.endpoint_url, "api/generate")?;
        debug!("发送生成请求到: {}", url);

        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, SERVICE))?;

        if !response.status().is_success() {
            return Err(classify_status(response, SERVICE).await);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| classify_transport_error(e, SERVICE))?;

        parsed
            .response
            .ok_or_else(|| TranslationError::MalformedResponse("响应中缺少 response 字段".to_string()))
    }

    /// 调用 `/api/tags` 列出已安装的模型
    pub async fn list_models(&self) -> TranslationResult<Vec<String>> {
        let url = join_endpoint(&self.endpoint_url, "api/tags")?;

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, SERVICE))?;

        if !response.status().is_success() {
            return Err(classify_status(response, SERVICE).await);
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| classify_transport_error(e, SERVICE))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl TranslationBackend for LocalBackend {
    async fn translate(&self, request: &TranslateRequest) -> TranslationResult<String> {
        let model = request
            .model_hint
            .as_deref()
            .unwrap_or(self.model_name.as_str());
        let prompt = Self::build_prompt(&request.text, &request.target_language);

        let reply = self
            .generate(model, &prompt, constants::TRANSLATION_TEMPERATURE)
            .await?;

        Ok(strip_enclosing_quotes(&reply))
    }

    fn name(&self) -> &str {
        "local"
    }
}
