//! 连接检查
//!
//! 供设置界面使用：把分类后的错误渲染成可读的状态文本。

use serde::Serialize;

use super::cloud::{ChatMessage, CloudBackend};
use super::local::LocalBackend;
use crate::translation::config::{constants, Provider, TranslationConfig};
use crate::translation::error::TranslationError;

/// 检查结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub ok: bool,
    pub message: String,
}

impl ConnectionReport {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// 按当前提供方检查连接
pub async fn check_connection(config: &TranslationConfig) -> ConnectionReport {
    let report = match config.provider {
        Provider::Local => check_local(config).await,
        Provider::Cloud => check_cloud(config).await,
    };

    if report.ok {
        tracing::info!("连接检查通过: {}", report.message);
    } else {
        tracing::warn!("连接检查失败: {}", report.message);
    }
    report
}

async fn check_local(config: &TranslationConfig) -> ConnectionReport {
    let endpoint = config.local_endpoint_url.trim();
    let model = config.model_name.trim();

    if endpoint.is_empty() {
        return ConnectionReport::failed("Please enter the Ollama API URL");
    }
    if model.is_empty() {
        return ConnectionReport::failed("Please enter a model name");
    }

    let backend = match LocalBackend::new(config) {
        Ok(backend) => backend,
        Err(e) => return ConnectionReport::failed(format!("Error: {}", e)),
    };

    // 第一步：服务是否在运行，模型是否存在
    let models = match backend.list_models().await {
        Ok(models) => models,
        Err(TranslationError::BackendUnreachable(_)) => {
            return ConnectionReport::failed(format!(
                "Cannot connect to Ollama at {}. Make sure it is running.",
                endpoint
            ))
        }
        Err(TranslationError::BackendRejected { .. }) => {
            return ConnectionReport::failed("Ollama is not responding. Make sure it is running.")
        }
        Err(e) => return ConnectionReport::failed(format!("Error: {}", e)),
    };

    let model_prefix = format!("{}:", model);
    let model_exists = models
        .iter()
        .any(|name| name == model || name.starts_with(&model_prefix));

    if !model_exists {
        let available = models
            .iter()
            .map(|name| name.split(':').next().unwrap_or(name))
            .collect::<Vec<_>>()
            .join(", ");
        return ConnectionReport::failed(format!(
            "Model \"{}\" not found. Available: {}",
            model, available
        ));
    }

    // 第二步：发送测试消息
    match backend
        .generate(model, "Say \"OK\" if you can read this.", 0.0)
        .await
    {
        Ok(reply) if !reply.trim().is_empty() => {
            let preview: String = reply
                .trim()
                .chars()
                .take(constants::CHECK_REPLY_PREVIEW_CHARS)
                .collect();
            ConnectionReport::ok(format!("Ollama is working! Response: \"{}\"", preview))
        }
        Ok(_) | Err(TranslationError::MalformedResponse(_)) => {
            ConnectionReport::failed("Ollama responded but with empty result.")
        }
        Err(TranslationError::BackendUnreachable(_)) => ConnectionReport::failed(format!(
            "Cannot connect to Ollama at {}. Make sure it is running.",
            endpoint
        )),
        Err(_) => ConnectionReport::failed("Ollama test message failed."),
    }
}

async fn check_cloud(config: &TranslationConfig) -> ConnectionReport {
    let api_key = config.cloud_api_key.trim();

    if api_key.is_empty() {
        return ConnectionReport::failed("Please enter your OpenAI API key");
    }
    if !api_key.starts_with(constants::CLOUD_API_KEY_PREFIX) {
        return ConnectionReport::failed("Invalid API key format. It should start with \"sk-\"");
    }

    let backend = match CloudBackend::new(config) {
        Ok(backend) => backend,
        Err(e) => return ConnectionReport::failed(format!("Error: {}", e)),
    };

    let messages = [ChatMessage::user("Say \"OK\"")];
    match backend
        .complete(&messages, None, Some(constants::CHECK_MAX_TOKENS))
        .await
    {
        Ok(reply) => ConnectionReport::ok(format!("OpenAI is working! Response: \"{}\"", reply.trim())),
        Err(e) => ConnectionReport::failed(describe_cloud_error(&e)),
    }
}

fn describe_cloud_error(error: &TranslationError) -> String {
    match error {
        TranslationError::AuthenticationFailed(_) => {
            "Invalid API key. Please check your key.".to_string()
        }
        TranslationError::QuotaExceeded(message) if message.starts_with("Insufficient") => {
            "Insufficient credits. Add credits to your OpenAI account.".to_string()
        }
        TranslationError::QuotaExceeded(_) => {
            "Rate limit or quota exceeded. Check your OpenAI account.".to_string()
        }
        TranslationError::BackendRejected { message, .. } => format!("Error: {}", message),
        TranslationError::BackendUnreachable(message) => {
            format!("Cannot connect to OpenAI API: {}", message)
        }
        other => format!("Error: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cloud_key_format_is_checked_locally() {
        let config = TranslationConfig {
            provider: Provider::Cloud,
            cloud_api_key: "pk-123".to_string(),
            ..Default::default()
        };
        let report = check_connection(&config).await;
        assert!(!report.ok);
        assert!(report.message.contains("should start with \"sk-\""));
    }

    #[tokio::test]
    async fn local_requires_model_name() {
        let config = TranslationConfig {
            model_name: String::new(),
            ..Default::default()
        };
        let report = check_connection(&config).await;
        assert_eq!(report, ConnectionReport::failed("Please enter a model name"));
    }

    #[test]
    fn cloud_errors_are_rendered() {
        assert_eq!(
            describe_cloud_error(&TranslationError::QuotaExceeded(
                "Insufficient credits. Please add credits to your OpenAI account.".into()
            )),
            "Insufficient credits. Add credits to your OpenAI account."
        );
        assert_eq!(
            describe_cloud_error(&TranslationError::BackendRejected {
                status: 500,
                message: "boom".into()
            }),
            "Error: boom"
        );
    }
}
