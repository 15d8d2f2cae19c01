//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// 无法连接翻译后端（连接失败或超时）
    #[error("无法连接翻译服务: {0}")]
    BackendUnreachable(String),

    /// 凭据无效
    #[error("认证失败: {0}")]
    AuthenticationFailed(String),

    /// 配额或速率限制
    #[error("配额已用尽: {0}")]
    QuotaExceeded(String),

    /// 后端返回其他错误状态
    #[error("翻译服务返回错误 {status}: {message}")]
    BackendRejected { status: u16, message: String },

    /// 待翻译文本为空或只含空白
    #[error("没有需要翻译的文本")]
    EmptyOrWhitespaceInput,

    /// 后端响应缺少翻译结果或无法解析
    #[error("响应格式错误: {0}")]
    MalformedResponse(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// DOM 操作无法完成
    #[error("文档操作失败: {0}")]
    DomError(String),

    /// 状态不允许该操作
    #[error("状态错误: {0}")]
    InvalidState(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// IO 错误
    #[error("IO错误: {0}")]
    IoError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::BackendUnreachable(_) => true,
            TranslationError::QuotaExceeded(_) => false, // 需要等待
            TranslationError::BackendRejected { status, .. } => *status >= 500,
            TranslationError::MalformedResponse(_) => true,
            TranslationError::IoError(_) => true,
            TranslationError::AuthenticationFailed(_)
            | TranslationError::EmptyOrWhitespaceInput
            | TranslationError::ConfigError(_)
            | TranslationError::DomError(_)
            | TranslationError::InvalidState(_)
            | TranslationError::ParseError(_)
            | TranslationError::SerializationError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::EmptyOrWhitespaceInput => ErrorSeverity::Info,
            TranslationError::BackendUnreachable(_) => ErrorSeverity::Warning,
            TranslationError::QuotaExceeded(_) => ErrorSeverity::Warning,
            TranslationError::BackendRejected { .. } => ErrorSeverity::Warning,
            TranslationError::MalformedResponse(_) => ErrorSeverity::Warning,
            TranslationError::AuthenticationFailed(_) => ErrorSeverity::Error,
            TranslationError::DomError(_) => ErrorSeverity::Error,
            TranslationError::InvalidState(_) => ErrorSeverity::Error,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::IoError(_) => ErrorSeverity::Error,
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::BackendUnreachable(_) => ErrorCategory::Network,
            TranslationError::AuthenticationFailed(_) => ErrorCategory::Authentication,
            TranslationError::QuotaExceeded(_) => ErrorCategory::RateLimit,
            TranslationError::BackendRejected { .. } => ErrorCategory::Service,
            TranslationError::MalformedResponse(_) => ErrorCategory::Service,
            TranslationError::EmptyOrWhitespaceInput => ErrorCategory::Input,
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::DomError(_) => ErrorCategory::Document,
            TranslationError::InvalidState(_) => ErrorCategory::Document,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::SerializationError(_) => ErrorCategory::Serialization,
            TranslationError::IoError(_) => ErrorCategory::Io,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let append = |msg: &mut String| *msg = format!("{} (上下文: {})", msg, context);

        match &mut self {
            TranslationError::BackendUnreachable(msg)
            | TranslationError::AuthenticationFailed(msg)
            | TranslationError::QuotaExceeded(msg)
            | TranslationError::MalformedResponse(msg)
            | TranslationError::ConfigError(msg)
            | TranslationError::DomError(msg)
            | TranslationError::InvalidState(msg)
            | TranslationError::ParseError(msg)
            | TranslationError::SerializationError(msg)
            | TranslationError::IoError(msg) => append(msg),
            TranslationError::BackendRejected { message, .. } => append(message),
            TranslationError::EmptyOrWhitespaceInput => {}
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Authentication,
    RateLimit,
    Input,
    Service,
    Document,
    Parsing,
    Serialization,
    Io,
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<toml::ser::Error> for TranslationError {
    fn from(error: toml::ser::Error) -> Self {
        TranslationError::SerializationError(format!("TOML序列化错误: {}", error))
    }
}

impl From<url::ParseError> for TranslationError {
    fn from(error: url::ParseError) -> Self {
        TranslationError::ConfigError(format!("无效的URL: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for TranslationError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        TranslationError::BackendUnreachable(format!("请求超时: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误统计信息
#[derive(Debug, Clone, Default)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub by_category: std::collections::HashMap<ErrorCategory, usize>,
    pub by_severity: std::collections::HashMap<ErrorSeverity, usize>,
    pub retryable_errors: usize,
    pub critical_errors: usize,
}

impl ErrorStats {
    /// 记录错误
    pub fn record_error(&mut self, error: &TranslationError) {
        self.total_errors += 1;

        let category = error.category();
        *self.by_category.entry(category).or_insert(0) += 1;

        let severity = error.severity();
        *self.by_severity.entry(severity).or_insert(0) += 1;

        if error.is_retryable() {
            self.retryable_errors += 1;
        }

        if severity == ErrorSeverity::Critical {
            self.critical_errors += 1;
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Default::default();
    }

    /// 获取错误率
    pub fn error_rate(&self, total_operations: usize) -> f64 {
        if total_operations == 0 {
            0.0
        } else {
            self.total_errors as f64 / total_operations as f64
        }
    }
}

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_of_backend_errors() {
        let err = TranslationError::BackendRejected {
            status: 503,
            message: "busy".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Service);

        let err = TranslationError::AuthenticationFailed("bad key".to_string());
        assert!(!err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn context_is_appended() {
        let err = TranslationError::ConfigError("缺少模型".to_string()).with_context("popup");
        assert!(err.to_string().contains("上下文: popup"));

        let err = TranslationError::EmptyOrWhitespaceInput.with_context("ignored");
        assert_eq!(err, TranslationError::EmptyOrWhitespaceInput);
    }

    #[test]
    fn stats_count_by_category() {
        let mut stats = ErrorStats::default();
        stats.record_error(&TranslationError::BackendUnreachable("x".into()));
        stats.record_error(&TranslationError::ConfigError("y".into()));
        assert_eq!(stats.total_errors, 2);
        assert_eq!(stats.retryable_errors, 1);
        assert_eq!(stats.critical_errors, 1);
        assert_eq!(stats.error_rate(4), 0.5);
    }
}
