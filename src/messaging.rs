//! 宿主消息
//!
//! 设置界面、页面引擎与后端之间传递的 JSON 消息，按 `action` 字段区分类型。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::translation::core::TranslationService;
use crate::translation::error::helpers::log_error;
use crate::translation::error::TranslationResult;

/// 入站消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    /// 单次后端调用
    #[serde(rename_all = "camelCase")]
    Translate {
        text: String,
        #[serde(default)]
        target_language: Option<String>,
        #[serde(default)]
        model_name: Option<String>,
    },
    Ping,
    TranslatePage,
    RevertAll,
    ShowTranslations,
    RemoveTranslations,
}

impl Message {
    pub fn parse(json: &str) -> TranslationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn action(&self) -> &'static str {
        match self {
            Message::Translate { .. } => "translate",
            Message::Ping => "ping",
            Message::TranslatePage => "translatePage",
            Message::RevertAll => "revertAll",
            Message::ShowTranslations => "showTranslations",
            Message::RemoveTranslations => "removeTranslations",
        }
    }
}

/// 出站响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 受影响的覆盖层数量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn with_count(count: usize) -> Self {
        Self {
            success: true,
            count: Some(count),
            ..Default::default()
        }
    }

    pub fn translated(text: String) -> Self {
        Self {
            success: true,
            translated_text: Some(text),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> TranslationResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// 处理一条消息，每种消息对应一个页面命令或一次后端调用
pub async fn handle_message(service: &TranslationService, message: Message) -> Response {
    debug!("收到消息: {}", message.action());

    match message {
        Message::Translate {
            text,
            target_language,
            model_name,
        } => match service
            .translate_text(&text, target_language.as_deref(), model_name.as_deref())
            .await
        {
            Ok(translated) => Response::translated(translated),
            Err(e) => {
                log_error(&e);
                Response::failed(e.to_string())
            }
        },
        Message::Ping => Response::ok(),
        Message::TranslatePage => match service.translate_whole_page().await {
            Ok(report) if report.from_cache => Response::with_count(report.revealed),
            Ok(report) => Response::with_count(report.sequence.translated),
            Err(e) => {
                log_error(&e);
                Response::failed(e.to_string())
            }
        },
        Message::RevertAll => Response::with_count(service.revert_all()),
        Message::ShowTranslations => Response::with_count(service.show_all()),
        Message::RemoveTranslations => Response::with_count(service.remove_all()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_tagged_by_action() {
        assert_eq!(
            Message::parse(r#"{"action":"translatePage"}"#).unwrap(),
            Message::TranslatePage
        );
        assert_eq!(
            Message::parse(
                r#"{"action":"translate","text":"Hello","targetLanguage":"French","modelName":"qwen2"}"#
            )
            .unwrap(),
            Message::Translate {
                text: "Hello".into(),
                target_language: Some("French".into()),
                model_name: Some("qwen2".into()),
            }
        );
        assert!(Message::parse(r#"{"action":"explode"}"#).is_err());
    }

    #[test]
    fn response_omits_empty_fields() {
        assert_eq!(Response::ok().to_json().unwrap(), r#"{"success":true}"#);
        assert_eq!(
            Response::translated("你好".into()).to_json().unwrap(),
            r#"{"success":true,"translatedText":"你好"}"#
        );
        assert_eq!(
            Response::failed("boom").to_json().unwrap(),
            r#"{"success":false,"error":"boom"}"#
        );
    }
}
