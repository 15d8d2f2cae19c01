//! 翻译后端
//!
//! 本地模型服务与云端服务都实现 [`TranslationBackend`]，
//! [`BackendRouter`] 在每次请求时读取设置并分派到对应的后端。

pub mod check;
pub mod cloud;
pub mod local;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::translation::config::{Provider, SettingsStore};
use crate::translation::error::{TranslationError, TranslationResult};

pub use check::{check_connection, ConnectionReport};
pub use cloud::CloudBackend;
pub use local::LocalBackend;

/// 单次翻译请求
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateRequest {
    pub text: String,
    pub target_language: String,
    /// 本地后端可使用的模型名，为空时使用设置中的模型
    pub model_hint: Option<String>,
}

impl TranslateRequest {
    pub fn new(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_language: target_language.into(),
            model_hint: None,
        }
    }

    pub fn with_model_hint(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model_hint = (!model.trim().is_empty()).then_some(model);
        self
    }
}

/// 翻译后端接口
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// 翻译一段文本，返回去掉外层引号后的译文
    async fn translate(&self, request: &TranslateRequest) -> TranslationResult<String>;

    /// 后端名称，用于日志
    fn name(&self) -> &str;
}

/// 根据设置选择后端
pub struct BackendRouter {
    settings: Arc<dyn SettingsStore>,
    client: Client,
}

impl BackendRouter {
    pub fn new(settings: Arc<dyn SettingsStore>) -> TranslationResult<Self> {
        Ok(Self {
            settings,
            client: build_client()?,
        })
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }
}

#[async_trait]
impl TranslationBackend for BackendRouter {
    async fn translate(&self, request: &TranslateRequest) -> TranslationResult<String> {
        let config = self.settings.load()?;
        match config.provider {
            Provider::Local => {
                LocalBackend::with_client(self.client.clone(), &config)
                    .translate(request)
                    .await
            }
            Provider::Cloud => {
                CloudBackend::with_client(self.client.clone(), &config)
                    .translate(request)
                    .await
            }
        }
    }

    fn name(&self) -> &str {
        "router"
    }
}

pub(crate) fn build_client() -> TranslationResult<Client> {
    Client::builder()
        .build()
        .map_err(|e| TranslationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))
}

/// 拼接服务地址与接口路径
pub(crate) fn join_endpoint(base: &str, path: &str) -> TranslationResult<String> {
    let joined = format!("{}/{}", base.trim().trim_end_matches('/'), path);
    url::Url::parse(&joined)?;
    Ok(joined)
}

/// 去掉一层成对的外层引号
pub fn strip_enclosing_quotes(text: &str) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && (first == '"' || first == '\'') => {
            chars.as_str().to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// 传输层错误分类
pub(crate) fn classify_transport_error(error: reqwest::Error, service: &str) -> TranslationError {
    if error.is_builder() {
        TranslationError::ConfigError(format!("{} 请求构造失败: {}", service, error))
    } else if error.is_decode() {
        TranslationError::MalformedResponse(format!("{} 响应无法解析: {}", service, error))
    } else if error.is_timeout() {
        TranslationError::BackendUnreachable(format!("{} request timed out", service))
    } else {
        TranslationError::BackendUnreachable(format!("Cannot connect to {}: {}", service, error))
    }
}

/// 非 2xx 响应分类
pub(crate) async fn classify_status(response: Response, service: &str) -> TranslationError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = error_message_from_body(&body);

    match status {
        401 => TranslationError::AuthenticationFailed(format!(
            "Invalid API key. Please check your {} API key in settings.",
            service
        )),
        429 => TranslationError::QuotaExceeded(
            "Rate limit exceeded. Please try again later.".to_string(),
        ),
        402 => TranslationError::QuotaExceeded(format!(
            "Insufficient credits. Please add credits to your {} account.",
            service
        )),
        _ => TranslationError::BackendRejected { status, message },
    }
}

/// 从错误响应中提取可读信息
fn error_message_from_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("error"))
            .and_then(|v| v.as_str());
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let body = body.trim();
    if body.is_empty() {
        "Unknown error".to_string()
    } else {
        body.chars().take(200).collect()
    }
}
